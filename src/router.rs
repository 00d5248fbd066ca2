use nonogrid_core::SessionId;
use url::Url;

pub const SESSION_PARAM: &str = "session";
const BOARD_SEGMENT: &str = "board";

/// `/board/<boardId>` with an optional `?session=<id>`. Without a session
/// the game is private and offline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameRoute {
    pub board_id: String,
    pub session: Option<SessionId>,
}

/// Result of reading a location. A session parameter that fails validation
/// is reported so the caller can alert and rewrite the URL without it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedRoute {
    pub route: GameRoute,
    pub rejected_session: Option<String>,
}

impl GameRoute {
    pub fn offline(board_id: impl Into<String>) -> Self {
        Self {
            board_id: board_id.into(),
            session: None,
        }
    }

    /// Parses a full URL or a bare `path?query`.
    pub fn parse(location: &str) -> Option<ParsedRoute> {
        let url = match Url::parse(location) {
            Ok(url) => url,
            Err(_) => Url::parse("http://localhost/").ok()?.join(location).ok()?,
        };
        let mut segments = url.path_segments()?.filter(|segment| !segment.is_empty());
        if segments.next()? != BOARD_SEGMENT {
            return None;
        }
        let board_id = segments.next()?.to_string();
        if segments.next().is_some() {
            return None;
        }
        let raw_session = url
            .query_pairs()
            .find(|(key, _)| key == SESSION_PARAM)
            .map(|(_, value)| value.trim().to_string());
        let (session, rejected_session) = match raw_session {
            None => (None, None),
            Some(raw) => match SessionId::parse(&raw) {
                Ok(id) => (Some(id), None),
                Err(_) => (None, Some(raw)),
            },
        };
        Some(ParsedRoute {
            route: GameRoute { board_id, session },
            rejected_session,
        })
    }

    pub fn to_path(&self) -> String {
        match &self.session {
            Some(session) => format!("/{BOARD_SEGMENT}/{}?{SESSION_PARAM}={session}", self.board_id),
            None => format!("/{BOARD_SEGMENT}/{}", self.board_id),
        }
    }

    pub fn with_session(&self, session: SessionId) -> Self {
        Self {
            board_id: self.board_id.clone(),
            session: Some(session),
        }
    }

    pub fn without_session(&self) -> Self {
        Self::offline(self.board_id.clone())
    }

    /// Absolute link other players can open to join `session`.
    pub fn share_url(&self, base: &str, session: &SessionId) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(base)?;
        let base_path = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{base_path}/{BOARD_SEGMENT}/{}", self.board_id));
        url.set_query(None);
        url.query_pairs_mut()
            .append_pair(SESSION_PARAM, session.as_str());
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_path_and_session() {
        let parsed = GameRoute::parse("/board/abc123?session=Ab12Cd34").unwrap();
        assert_eq!(parsed.route.board_id, "abc123");
        assert_eq!(parsed.route.session.unwrap().as_str(), "Ab12Cd34");
        assert_eq!(parsed.rejected_session, None);
    }

    #[test]
    fn invalid_session_is_reported() {
        let parsed = GameRoute::parse("https://example.com/board/abc?session=nope").unwrap();
        assert_eq!(parsed.route, GameRoute::offline("abc"));
        assert_eq!(parsed.rejected_session.as_deref(), Some("nope"));
        assert_eq!(parsed.route.to_path(), "/board/abc");
    }

    #[test]
    fn other_paths_are_not_games() {
        assert_eq!(GameRoute::parse("/about"), None);
        assert_eq!(GameRoute::parse("/board"), None);
        assert_eq!(GameRoute::parse("/board/a/b"), None);
    }

    #[test]
    fn share_url_keeps_the_base_path() {
        let session = SessionId::parse("Ab12Cd34").unwrap();
        let url = GameRoute::offline("b1")
            .share_url("https://play.example.com/nono/", &session)
            .unwrap();
        assert_eq!(url.as_str(), "https://play.example.com/nono/board/b1?session=Ab12Cd34");
    }
}
