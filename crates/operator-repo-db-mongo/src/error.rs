//! Error types for the MongoDB storage backend.

use mongodb::error::ErrorKind;
use operator_repo_storage::StorageError;

/// Errors specific to the MongoDB storage backend.
#[derive(Debug, thiserror::Error)]
pub enum MongoError {
    /// Error reported by the driver.
    #[error("Database error: {0}")]
    Driver(#[from] mongodb::error::Error),

    /// A document could not be converted to or from BSON.
    #[error("BSON conversion error: {message}")]
    Bson { message: String },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl MongoError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a new BSON conversion error.
    #[must_use]
    pub fn bson(message: impl Into<String>) -> Self {
        Self::Bson {
            message: message.into(),
        }
    }

    /// Returns the server message if it rejected the `$regex` of a search.
    #[must_use]
    pub fn invalid_regex_message(&self) -> Option<&str> {
        match self {
            Self::Driver(e) => match &*e.kind {
                ErrorKind::Command(cmd) if is_regex_error(cmd.code, &cmd.message) => {
                    Some(cmd.message.as_str())
                }
                _ => None,
            },
            _ => None,
        }
    }

    /// Returns `true` if the server could not be reached.
    #[must_use]
    pub fn is_connection(&self) -> bool {
        match self {
            Self::Driver(e) => matches!(
                *e.kind,
                ErrorKind::ServerSelection { .. } | ErrorKind::Io(_) | ErrorKind::DnsResolve { .. }
            ),
            _ => false,
        }
    }
}

/// Server error codes raised for a malformed `$regex`: 51091 on current
/// servers, `BadValue` (2) with a regex message on older ones.
const INVALID_REGEX_CODE: i32 = 51091;
const BAD_VALUE_CODE: i32 = 2;

pub(crate) fn is_regex_error(code: i32, message: &str) -> bool {
    code == INVALID_REGEX_CODE
        || (code == BAD_VALUE_CODE && message.contains("Regular expression is invalid"))
}

impl From<mongodb::bson::ser::Error> for MongoError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        Self::bson(err.to_string())
    }
}

impl From<mongodb::bson::de::Error> for MongoError {
    fn from(err: mongodb::bson::de::Error) -> Self {
        Self::bson(err.to_string())
    }
}

impl From<MongoError> for StorageError {
    fn from(err: MongoError) -> Self {
        if err.is_connection() {
            return StorageError::connection_error(err.to_string());
        }
        if let Some(message) = err.invalid_regex_message() {
            return StorageError::invalid_query(format!("invalid search pattern: {message}"));
        }
        match err {
            MongoError::Driver(e) => StorageError::internal(e.to_string()),
            MongoError::Bson { message } => StorageError::serialization(message),
            MongoError::Config { message } => {
                StorageError::internal(format!("Configuration error: {message}"))
            }
        }
    }
}

/// Result type alias for MongoDB operations.
pub type Result<T> = std::result::Result<T, MongoError>;
