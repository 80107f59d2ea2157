//! Session token types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Bearer token sent with authenticated requests.
///
/// Opaque to the client and redacted in `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token for the `Authorization` header.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AccessToken").field(&"[REDACTED]").finish()
    }
}

/// Longer-lived token used to obtain a new access token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefreshToken(String);

impl RefreshToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RefreshToken").field(&"[REDACTED]").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_hide_value_in_debug() {
        let access = AccessToken::new("eyJhbGciOiJIUzI1NiJ9.payload");
        assert!(!format!("{:?}", access).contains("eyJ"));

        let refresh = RefreshToken::new("refresh-value");
        assert!(!format!("{:?}", refresh).contains("refresh-value"));
    }

    #[test]
    fn access_token_serializes_as_plain_string() {
        let token = AccessToken::new("abc");
        assert_eq!(serde_json::to_string(&token).unwrap(), "\"abc\"");
    }
}
