//! Error types for lidarfeat

use thiserror::Error;

/// Main error type for lidarfeat operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Missing attribute: {0}")]
    MissingAttribute(String),

    #[error("Unknown feature: {0}")]
    UnknownFeature(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Algorithm error: {0}")]
    Algorithm(String),
}

impl Error {
    /// Shorthand for building an [`Error::InvalidArgument`]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }
}

/// Result type alias for lidarfeat operations
pub type Result<T> = std::result::Result<T, Error>;
