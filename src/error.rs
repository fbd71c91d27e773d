//! Error types for the ormtools crate
//!
//! Provides error handling for database operations, query building,
//! encryption, and schema setup.

use std::fmt;

/// Result type alias for ormtools operations
pub type ToolsResult<T> = Result<T, ToolsError>;

/// Error types for behavior and store operations
#[derive(Debug, Clone)]
pub enum ToolsError {
    /// Database connection or query error
    Database(String),
    /// Record not found in database
    NotFound(String),
    /// Primary key is missing or invalid
    MissingPrimaryKey,
    /// Query building error
    Query(String),
    /// Serialization/deserialization error
    Serialization(String),
    /// Encryption of a value failed
    Encryption(String),
    /// Decryption of a value failed (invalid or unauthenticated ciphertext)
    Decryption(String),
    /// A schema grammar does not support a requested column type
    UnsupportedGrammar { grammar: String },
    /// Configuration error
    Configuration(String),
}

impl fmt::Display for ToolsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolsError::Database(msg) => write!(f, "Database error: {}", msg),
            ToolsError::NotFound(what) => write!(f, "Record not found: {}", what),
            ToolsError::MissingPrimaryKey => write!(f, "Primary key is missing or invalid"),
            ToolsError::Query(msg) => write!(f, "Query error: {}", msg),
            ToolsError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            ToolsError::Encryption(msg) => write!(f, "Encryption error: {}", msg),
            ToolsError::Decryption(msg) => write!(f, "Decryption error: {}", msg),
            ToolsError::UnsupportedGrammar { grammar } => write!(
                f,
                "Only the MySQL and SQLite grammars support binary uuid columns. [{}] was used",
                grammar
            ),
            ToolsError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for ToolsError {}

// Convert from sqlx errors
impl From<sqlx::Error> for ToolsError {
    fn from(err: sqlx::Error) -> Self {
        ToolsError::Database(err.to_string())
    }
}

// Convert from serde_json errors
impl From<serde_json::Error> for ToolsError {
    fn from(err: serde_json::Error) -> Self {
        ToolsError::Serialization(err.to_string())
    }
}

// Convert from anyhow errors
impl From<anyhow::Error> for ToolsError {
    fn from(err: anyhow::Error) -> Self {
        ToolsError::Database(err.to_string())
    }
}
