//! Client-held state carried in cookies, and the identity behind a session.

use serde::{Deserialize, Serialize};

/// Contents of the `user-prefs` cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub cacheable: bool,
}

/// Contents of the `supabase-user` cookie.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionCookie {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl SessionCookie {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    /// The stored token, ignoring blank values.
    pub fn token(&self) -> Option<&str> {
        self.token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }
}

/// A user resolved by the identity provider from a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
}

impl AuthUser {
    pub fn display_name(&self) -> &str {
        self.email.as_deref().unwrap_or(self.id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_tokens_are_ignored() {
        let session = SessionCookie::with_token("   ");
        assert_eq!(session.token(), None);
        assert_eq!(SessionCookie::default().token(), None);
        assert_eq!(SessionCookie::with_token("abc").token(), Some("abc"));
    }

    #[test]
    fn empty_session_serializes_without_token() {
        let json = serde_json::to_string(&SessionCookie::default()).expect("serialize");
        assert_eq!(json, "{}");
    }
}
