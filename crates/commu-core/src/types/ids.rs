//! Identifier types for posts, comments, users and channels.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, InvalidInputError};

/// Maximum identifier length accepted by the backend.
const MAX_LEN: usize = 128;

fn validate(kind: &'static str, value: &str) -> Result<(), Error> {
    let reason = if value.is_empty() {
        Some("must not be empty")
    } else if value.len() > MAX_LEN {
        Some("too long")
    } else if value.chars().any(|c| c.is_whitespace() || c == '/' || c == '?' || c == '#') {
        Some("must not contain whitespace, '/', '?' or '#'")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(InvalidInputError::Identifier {
            kind,
            value: value.to_string(),
            reason: reason.to_string(),
        }
        .into()),
        None => Ok(()),
    }
}

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier, validating that it is usable as a path segment.
            pub fn new(s: impl AsRef<str>) -> Result<Self, Error> {
                let s = s.as_ref();
                validate($kind, s)?;
                Ok(Self(s.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                // Numeric ids are accepted and kept in their decimal form.
                let value = serde_json::Value::deserialize(deserializer)?;
                let s = match value {
                    serde_json::Value::String(s) => s,
                    serde_json::Value::Number(n) => n.to_string(),
                    other => {
                        return Err(serde::de::Error::custom(format!(
                            "expected string or number for {}, got {}",
                            $kind, other
                        )))
                    }
                };
                $name::new(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

identifier!(
    /// Identifier of a post.
    PostId,
    "post id"
);

identifier!(
    /// Identifier of a comment.
    CommentId,
    "comment id"
);

identifier!(
    /// A user's unique handle.
    Username,
    "username"
);

identifier!(
    /// URL slug of a channel.
    ChannelSlug,
    "channel slug"
);
