//! Series identification.

use serde::{Deserialize, Serialize};

/// Identifies a logical time series (e.g., a stock ticker or a feed name).
///
/// A cache holding a single series uses one fixed key. Keys are compared
/// case-sensitively; callers that want case-insensitive symbols should
/// normalize before constructing the key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeriesKey(String);

impl SeriesKey {
    /// Creates a new series key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SeriesKey {
    fn from(key: &str) -> Self {
        Self(key.to_owned())
    }
}

impl From<String> for SeriesKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl std::fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
