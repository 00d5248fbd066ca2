use nonogrid_core::PointerButton;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InputModifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl InputModifiers {
    /// Ctrl on most platforms, Cmd on macOS; either counts.
    pub fn primary(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// A key press as the host reports it. `code` is the physical key code
/// (`"KeyZ"`), not the produced character.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyInput {
    pub code: String,
    pub modifiers: InputModifiers,
    /// A text field has focus; shortcuts stay out of its way.
    pub text_input_focused: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shortcut {
    Undo,
    Redo,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShortcutMatch {
    pub shortcut: Shortcut,
    /// The host must suppress its own handling of the key.
    pub prevent_default: bool,
}

pub fn match_shortcut(key: &KeyInput) -> Option<ShortcutMatch> {
    if key.text_input_focused || !key.modifiers.primary() {
        return None;
    }
    match key.code.as_str() {
        "KeyZ" if key.modifiers.shift => Some(ShortcutMatch {
            shortcut: Shortcut::Redo,
            prevent_default: false,
        }),
        "KeyZ" => Some(ShortcutMatch {
            shortcut: Shortcut::Undo,
            prevent_default: false,
        }),
        "KeyY" => Some(ShortcutMatch {
            shortcut: Shortcut::Redo,
            prevent_default: true,
        }),
        _ => None,
    }
}

pub fn pointer_button(dom_button: i16) -> PointerButton {
    PointerButton::from_dom(dom_button)
}

/// Screen rectangle of the board, used to express the cursor as fractions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoardRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl BoardRect {
    pub fn fraction(&self, client_x: f64, client_y: f64) -> Option<(f64, f64)> {
        if self.width <= 0.0 || self.height <= 0.0 {
            return None;
        }
        Some((
            (client_x - self.left) / self.width,
            (client_y - self.top) / self.height,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: &str, modifiers: InputModifiers) -> KeyInput {
        KeyInput {
            code: code.to_string(),
            modifiers,
            text_input_focused: false,
        }
    }

    #[test]
    fn undo_and_redo_bindings() {
        let ctrl = InputModifiers {
            ctrl: true,
            ..InputModifiers::default()
        };
        let cmd_shift = InputModifiers {
            meta: true,
            shift: true,
            ..InputModifiers::default()
        };
        assert_eq!(
            match_shortcut(&key("KeyZ", ctrl)).map(|m| m.shortcut),
            Some(Shortcut::Undo)
        );
        assert_eq!(
            match_shortcut(&key("KeyZ", cmd_shift)).map(|m| m.shortcut),
            Some(Shortcut::Redo)
        );
        let redo_y = match_shortcut(&key("KeyY", ctrl)).unwrap();
        assert_eq!(redo_y.shortcut, Shortcut::Redo);
        assert!(redo_y.prevent_default);
        assert_eq!(match_shortcut(&key("KeyZ", InputModifiers::default())), None);
    }

    #[test]
    fn focused_text_input_swallows_shortcuts() {
        let mut input = key(
            "KeyZ",
            InputModifiers {
                ctrl: true,
                ..InputModifiers::default()
            },
        );
        input.text_input_focused = true;
        assert_eq!(match_shortcut(&input), None);
    }

    #[test]
    fn middle_button_is_not_a_paint_button() {
        assert_eq!(pointer_button(1), PointerButton::Other);
        assert_eq!(pointer_button(2), PointerButton::Secondary);
    }
}
