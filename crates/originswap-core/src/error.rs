//! Error types for the origin swap system
//!
//! This module defines all error types used throughout the crate. Every
//! variant is fatal to a run: nothing here is retried locally.

use thiserror::Error;

/// Result type alias for origin swap operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the origin swap system
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or malformed required inputs, reported together before any
    /// remote call is made
    #[error("{}", .0.join("\n"))]
    Validation(Vec<String>),

    /// The requested origin index does not exist in the distribution
    #[error("Origin index {index} is out of range: {}", describe_range(.len))]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Number of origins in the distribution
        len: usize,
    },

    /// Distribution not found
    #[error("Distribution not found: {0}")]
    NotFound(String),

    /// The remote configuration changed since it was read
    #[error("Version conflict: {0}")]
    VersionConflict(String),

    /// Transport failure or a transient remote condition (throttling, 5xx)
    #[error("Transient network error: {0}")]
    TransientNetwork(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The configuration document could not be read or rewritten
    #[error("Malformed distribution config: {0}")]
    MalformedDocument(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

fn describe_range(len: &usize) -> String {
    match *len {
        0 => "the distribution has no origins".to_string(),
        1 => "the only valid index is 0".to_string(),
        n => format!("valid indices are 0..={}", n - 1),
    }
}

impl Error {
    /// Create a validation error from a list of problems
    pub fn validation(problems: Vec<String>) -> Self {
        Self::Validation(problems)
    }

    /// Create an index-out-of-range error
    pub fn index_out_of_range(index: usize, len: usize) -> Self {
        Self::IndexOutOfRange { index, len }
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a version conflict error
    pub fn version_conflict(msg: impl Into<String>) -> Self {
        Self::VersionConflict(msg.into())
    }

    /// Create a transient network error
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::TransientNetwork(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a malformed document error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedDocument(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Whether this error happened before any remote call was attempted
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_problems_are_joined_line_by_line() {
        let err = Error::validation(vec![
            "AWS_DISTRIBUTION_ID is required".to_string(),
            "ORIGIN_PATH is required".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "AWS_DISTRIBUTION_ID is required\nORIGIN_PATH is required"
        );
        assert!(err.is_validation());
    }

    #[test]
    fn index_out_of_range_names_the_valid_range() {
        assert_eq!(
            Error::index_out_of_range(5, 2).to_string(),
            "Origin index 5 is out of range: valid indices are 0..=1"
        );
        assert_eq!(
            Error::index_out_of_range(1, 1).to_string(),
            "Origin index 1 is out of range: the only valid index is 0"
        );
        assert_eq!(
            Error::index_out_of_range(0, 0).to_string(),
            "Origin index 0 is out of range: the distribution has no origins"
        );
    }

    #[test]
    fn anyhow_errors_convert_to_other() {
        let err: Error = anyhow::anyhow!("boom").into();
        assert!(matches!(err, Error::Other(ref m) if m == "boom"));
    }
}
