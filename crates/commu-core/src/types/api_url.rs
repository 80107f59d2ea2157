//! Backend base URL type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::error::{Error, InvalidInputError};

/// A validated base URL of the Commu REST API.
///
/// Must be absolute and use HTTPS, except for localhost where plain HTTP is
/// accepted for development backends. A trailing slash is removed.
///
/// # Example
///
/// ```
/// use commu_core::ApiUrl;
///
/// let api = ApiUrl::new("https://commu.dev/api/").unwrap();
/// assert_eq!(api.endpoint("posts/42"), "https://commu.dev/api/posts/42");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ApiUrl(Url);

impl ApiUrl {
    /// Create a new API URL from a string, validating the format.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL does not parse or violates the scheme rules.
    pub fn new(s: impl AsRef<str>) -> Result<Self, Error> {
        let s = s.as_ref();
        let url = Url::parse(s).map_err(|e| InvalidInputError::ApiUrl {
            value: s.to_string(),
            reason: e.to_string(),
        })?;

        Self::validate(&url, s)?;

        let mut normalized = url;
        let trimmed = normalized.path().trim_end_matches('/').to_string();
        normalized.set_path(&trimmed);
        normalized.set_query(None);
        normalized.set_fragment(None);

        Ok(Self(normalized))
    }

    /// Returns the full URL of an endpoint path relative to the base.
    pub fn endpoint(&self, path: &str) -> String {
        let base = self.0.as_str().trim_end_matches('/');
        format!("{}/{}", base, path.trim_start_matches('/'))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn host(&self) -> Option<&str> {
        self.0.host_str()
    }

    /// Returns true when the backend runs on this machine.
    pub fn is_localhost(&self) -> bool {
        self.0
            .host_str()
            .is_some_and(|h| h == "localhost" || h == "127.0.0.1" || h == "[::1]")
    }

    fn validate(url: &Url, original: &str) -> Result<(), Error> {
        if url.cannot_be_a_base() {
            return Err(InvalidInputError::ApiUrl {
                value: original.to_string(),
                reason: "must be an absolute URL".to_string(),
            }
            .into());
        }

        if url.host_str().is_none() {
            return Err(InvalidInputError::ApiUrl {
                value: original.to_string(),
                reason: "must have a host".to_string(),
            }
            .into());
        }

        let is_localhost = url
            .host_str()
            .is_some_and(|h| h == "localhost" || h == "127.0.0.1" || h == "[::1]");

        match url.scheme() {
            "https" => Ok(()),
            "http" if is_localhost => Ok(()),
            _ => Err(InvalidInputError::ApiUrl {
                value: original.to_string(),
                reason: "must use HTTPS (HTTP allowed only for localhost)".to_string(),
            }
            .into()),
        }
    }
}

impl fmt::Display for ApiUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str().trim_end_matches('/'))
    }
}

impl FromStr for ApiUrl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for ApiUrl {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ApiUrl {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ApiUrl::new(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn https_url_with_path() {
        let api = ApiUrl::new("https://commu.dev/api").unwrap();
        assert_eq!(api.endpoint("/posts"), "https://commu.dev/api/posts");
        assert_eq!(api.to_string(), "https://commu.dev/api");
    }

    #[test]
    fn trailing_slash_removed() {
        let api = ApiUrl::new("https://commu.dev/api/").unwrap();
        assert_eq!(api.endpoint("tags/popular"), "https://commu.dev/api/tags/popular");
    }

    #[test]
    fn root_url() {
        let api = ApiUrl::new("https://commu.dev").unwrap();
        assert_eq!(api.endpoint("posts"), "https://commu.dev/posts");
    }

    #[test]
    fn http_localhost_allowed() {
        let api = ApiUrl::new("http://localhost:3000/api").unwrap();
        assert!(api.is_localhost());
        assert!(ApiUrl::new("http://127.0.0.1:8080").is_ok());
    }

    #[test]
    fn http_remote_rejected() {
        assert!(ApiUrl::new("http://commu.dev/api").is_err());
    }

    #[test]
    fn other_schemes_rejected() {
        assert!(ApiUrl::new("ftp://commu.dev").is_err());
        assert!(ApiUrl::new("not a url").is_err());
    }
}
