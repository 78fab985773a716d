//! Name-based attribute filtering.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Decides which attributes are propagated to the realized output.
///
/// Serialized as `{"mode": "allow", "names": [...]}`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "names", rename_all = "snake_case")]
pub enum AttributeFilter {
    /// Propagate everything
    #[default]
    All,
    /// Propagate only the listed names
    Allow(BTreeSet<String>),
    /// Propagate everything except the listed names
    Deny(BTreeSet<String>),
}

impl AttributeFilter {
    pub fn allow<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Allow(names.into_iter().map(Into::into).collect())
    }

    pub fn deny<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Deny(names.into_iter().map(Into::into).collect())
    }

    /// True if attribute `name` must not be propagated.
    pub fn allow_skip(&self, name: &str) -> bool {
        match self {
            Self::All => false,
            Self::Allow(names) => !names.contains(name),
            Self::Deny(names) => names.contains(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_modes() {
        assert!(!AttributeFilter::All.allow_skip("uv"));

        let allow = AttributeFilter::allow(["uv"]);
        assert!(!allow.allow_skip("uv"));
        assert!(allow.allow_skip("color"));

        let deny = AttributeFilter::deny(["uv"]);
        assert!(deny.allow_skip("uv"));
        assert!(!deny.allow_skip("color"));
    }

    #[test]
    fn test_filter_json() {
        let f: AttributeFilter = serde_json::from_str(r#"{"mode":"deny","names":["a","b"]}"#).unwrap();
        assert_eq!(f, AttributeFilter::deny(["a", "b"]));
        let all: AttributeFilter = serde_json::from_str(r#"{"mode":"all"}"#).unwrap();
        assert_eq!(all, AttributeFilter::All);
    }
}
