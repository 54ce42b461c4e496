//! Error types for chainql

use thiserror::Error;

/// Result type alias for chainql operations
pub type DbResult<T> = Result<T, DbError>;

/// Boxed source error carried by [`DbError::ExecutionFailed`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error types for query building and execution
#[derive(Debug, Error)]
pub enum DbError {
    /// A terminal operation ran on a builder with no executor attached
    #[error("Connection not established: call connect() before executing queries")]
    ConnectionNotEstablished,

    /// The executor rejected the statement
    #[error("Execution failed{}: {message}", .code.as_deref().map(|c| format!(" [{c}]")).unwrap_or_default())]
    ExecutionFailed {
        /// Vendor error code (SQLSTATE for PostgreSQL)
        code: Option<String>,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Builder state or an argument cannot be rendered into a statement
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// The executor answered with a result of the wrong shape
    #[error("Unexpected result: {0}")]
    UnexpectedResult(String),

    /// Connection setup error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Pool error
    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),
}

impl DbError {
    /// Create an execution error from a vendor code and message.
    pub fn execution(code: Option<impl Into<String>>, message: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            code: code.map(Into::into),
            message: message.into(),
            source: None,
        }
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Vendor error code of an execution failure, if any.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::ExecutionFailed { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Check if this is a missing-connection error
    pub fn is_connection_not_established(&self) -> bool {
        matches!(self, Self::ConnectionNotEstablished)
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        self.code() == Some("23505")
    }

    /// Check if this is a foreign key violation error
    pub fn is_foreign_key_violation(&self) -> bool {
        self.code() == Some("23503")
    }

    /// Wrap a tokio_postgres error, keeping its SQLSTATE code and the original error.
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        let (code, message) = match err.as_db_error() {
            Some(db_err) => {
                let message = match db_err.constraint() {
                    Some(constraint) => format!("{}: {}", constraint, db_err.message()),
                    None => db_err.message().to_string(),
                };
                (Some(db_err.code().code().to_string()), message)
            }
            None => (err.code().map(|c| c.code().to_string()), err.to_string()),
        };
        Self::ExecutionFailed {
            code,
            message,
            source: Some(Box::new(err)),
        }
    }
}

impl From<tokio_postgres::Error> for DbError {
    fn from(err: tokio_postgres::Error) -> Self {
        Self::from_db_error(err)
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for DbError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_error_keeps_code_in_message() {
        let err = DbError::execution(Some("23505"), "users_email_key: duplicate key");
        assert_eq!(
            err.to_string(),
            "Execution failed [23505]: users_email_key: duplicate key"
        );
        assert!(err.is_unique_violation());
        assert!(!err.is_foreign_key_violation());
    }

    #[test]
    fn execution_error_without_code() {
        let err = DbError::execution(None::<String>, "connection reset");
        assert_eq!(err.to_string(), "Execution failed: connection reset");
        assert_eq!(err.code(), None);
    }

    #[test]
    fn connection_not_established_is_distinct() {
        let err = DbError::ConnectionNotEstablished;
        assert!(err.is_connection_not_established());
        assert_eq!(err.code(), None);
    }
}
