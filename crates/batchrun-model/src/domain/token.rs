use std::fmt;

use serde::{Deserialize, Serialize};

/// One unit of an exclusive resource pool (e.g. an accelerator device slot).
///
/// Tokens are plain values: two tokens with the same rendering are interchangeable,
/// and a pool may hold the same value more than once (several slots on one device).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceToken(String);

impl ResourceToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Render a group of tokens the way the resource-selector variable expects them.
    pub fn join(tokens: &[ResourceToken]) -> String {
        tokens
            .iter()
            .map(ResourceToken::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for ResourceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceToken {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ResourceToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<u32> for ResourceToken {
    fn from(n: u32) -> Self {
        Self(n.to_string())
    }
}

impl From<usize> for ResourceToken {
    fn from(n: usize) -> Self {
        Self(n.to_string())
    }
}
