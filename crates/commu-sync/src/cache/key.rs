//! Structured cache keys.

use std::fmt;

/// A cache key: a resource name followed by filter segments.
///
/// Displayed as `resource:seg1:seg2`. Prefix matching works on whole
/// segments, so `posts:feed` matches `posts:feed:sort=latest` but not
/// `posts:feeds`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    /// A key naming a whole resource.
    pub fn new(resource: impl Into<String>) -> Self {
        Self(vec![resource.into()])
    }

    /// Append one segment.
    pub fn with(mut self, segment: impl Into<String>) -> Self {
        self.0.push(segment.into());
        self
    }

    /// Append several segments in order.
    pub fn with_all<I, S>(mut self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0.extend(segments.into_iter().map(Into::into));
        self
    }

    pub fn resource(&self) -> &str {
        &self.0[0]
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Whether `prefix` names this key or one of its ancestors.
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(":"))
    }
}
