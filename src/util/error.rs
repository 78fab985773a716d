//! Error types for instance realization.

use thiserror::Error;

/// Main error type for realization and geometry construction.
#[derive(Error, Debug)]
pub enum Error {
    /// An object or collection (transitively) instances itself
    #[error("Cyclic instancing through {0}")]
    CyclicInstancing(String),

    /// Realized output would exceed the supported element count
    #[error("Realized {kind} is too large: {count} elements")]
    TooLarge { kind: &'static str, count: usize },

    /// Instance handle does not index a reference
    #[error("Instance reference handle {handle} out of bounds (count: {count})")]
    InvalidHandle { handle: usize, count: usize },

    /// Selected top-level instance does not exist
    #[error("Selected instance {index} out of bounds (count: {count})")]
    InvalidSelection { index: usize, count: usize },

    /// Store key does not resolve to a geometry, object or collection
    #[error("Missing geometry: {0}")]
    MissingGeometry(String),

    /// Attribute layer length does not match its domain size
    #[error("Attribute '{name}' has {actual} values, domain has {expected}")]
    AttributeSize {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// Offsets or indices that do not describe valid topology
    #[error("Invalid topology: {0}")]
    InvalidTopology(String),

    /// Options could not be parsed
    #[error("Invalid realize options: {0}")]
    Options(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create an invalid topology error.
    pub fn topology(msg: impl Into<String>) -> Self {
        Self::InvalidTopology(msg.into())
    }
}

/// Result type alias for realization operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::TooLarge { kind: "mesh", count: 5 };
        assert!(e.to_string().contains("mesh"));
        assert!(e.to_string().contains('5'));

        let e = Error::InvalidHandle { handle: 4, count: 2 };
        assert!(e.to_string().contains('4'));
        assert!(e.to_string().contains('2'));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Options(_)));
    }
}
