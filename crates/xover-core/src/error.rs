//! Error types for parameter decoding.

use thiserror::Error;

/// Errors raised while decoding structural settings from a parameter set.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParamError {
    /// The `configuration` key names no known output mode.
    #[error("unknown output mode: {0}")]
    UnknownMode(String),

    /// A required key is absent.
    #[error("missing required key '{0}'")]
    MissingKey(&'static str),

    /// A key holds a value of the wrong type.
    #[error("key '{key}' expects {expected}, found {found}")]
    WrongType {
        /// Parameter key.
        key: String,
        /// Human-readable description of the expected type.
        expected: &'static str,
        /// The offending value, rendered for diagnostics.
        found: String,
    },
}

impl ParamError {
    /// Create a wrong-type error.
    pub fn wrong_type(key: impl Into<String>, expected: &'static str, found: impl ToString) -> Self {
        ParamError::WrongType {
            key: key.into(),
            expected,
            found: found.to_string(),
        }
    }
}
