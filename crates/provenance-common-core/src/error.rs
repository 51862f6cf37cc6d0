//! Error types shared across provenance crates.

use thiserror::Error;

/// The general error type for provenance utilities.
#[derive(Error, Debug)]
pub enum Error {
    /// Generic error with custom message.
    #[error("{0}")]
    Generic(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A value could not be parsed.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl Error {
    /// Create a new generic error.
    pub fn new(msg: impl Into<String>) -> Self {
        Self::Generic(msg.into())
    }

    /// Create a new configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<crate::IdParseError> for Error {
    fn from(err: crate::IdParseError) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<crate::TimestampParseError> for Error {
    fn from(err: crate::TimestampParseError) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
