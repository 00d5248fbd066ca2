use std::fmt;

use rand::Rng;

use crate::error::SessionIdError;

pub const SESSION_ID_LEN: usize = 8;
pub const ID_ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Random base62 string; used for session, user and generated puzzle ids.
pub fn random_id<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    let alphabet = ID_ALPHABET.as_bytes();
    (0..len)
        .map(|_| alphabet[rng.random_range(0..alphabet.len())] as char)
        .collect()
}

pub fn is_valid_session_id(value: &str) -> bool {
    SessionId::parse(value).is_ok()
}

/// Identifies a shared session; carried in the `session` query parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(String);

impl SessionId {
    pub fn parse(value: &str) -> Result<Self, SessionIdError> {
        let found = value.chars().count();
        if found != SESSION_ID_LEN {
            return Err(SessionIdError::InvalidLength {
                expected: SESSION_ID_LEN,
                found,
            });
        }
        if let Some((index, ch)) = value
            .chars()
            .enumerate()
            .find(|(_, ch)| !ch.is_ascii_alphanumeric())
        {
            return Err(SessionIdError::InvalidCharacter { ch, index });
        }
        Ok(Self(value.to_string()))
    }

    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(random_id(rng, SESSION_ID_LEN))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for SessionId {
    type Err = SessionIdError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}
