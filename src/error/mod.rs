//! Error handling for feature extraction.

use std::io;

use arrow::error::ArrowError;

/// Specialized error type for feature extraction
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// Error opening or holding the database connection
    #[error("Connection error: {0}")]
    Connection(#[source] sqlx::Error),

    /// A feature query failed to execute
    #[error("Query error in {operation}: {source}")]
    Query {
        /// Builder that issued the query
        operation: &'static str,
        /// Underlying database error
        #[source]
        source: sqlx::Error,
    },

    /// A caller-supplied parameter was rejected before any query was built
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Configuration could not be read or is inconsistent
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error assembling an output table
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// The blocking runtime could not be created
    #[error("Runtime error: {0}")]
    Runtime(#[from] io::Error),

    /// Row conversion to or from a serialized form failed
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ExtractError {
    /// Create an invalid parameter error
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter(message.into())
    }

    /// Wrap a database error raised while running `operation`
    #[must_use]
    pub fn query(operation: &'static str, source: sqlx::Error) -> Self {
        Self::Query { operation, source }
    }
}

impl From<serde_json::Error> for ExtractError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<serde_arrow::Error> for ExtractError {
    fn from(error: serde_arrow::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

/// Result type for feature extraction operations
pub type Result<T> = std::result::Result<T, ExtractError>;
