//! Error types for asa-to-ifdb

use thiserror::Error;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, AsaError>;

/// Record-level error type shared across the workspace
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AsaError {
    #[error("Missing field '{field}': row has {found} of {expected} fields")]
    MissingField {
        field: &'static str,
        found: usize,
        expected: usize,
    },

    #[error("Invalid number in field '{field}': '{value}'")]
    InvalidNumber { field: &'static str, value: String },
}

impl AsaError {
    /// Create an invalid number error
    pub fn invalid_number(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidNumber {
            field,
            value: value.into(),
        }
    }
}
