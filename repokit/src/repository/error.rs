//! Repository error types
//!
//! Persistence clients produce a [`RepositoryError`] for every failure and the
//! repository hands it to the caller unchanged. The [`RepositoryErrorKind`]
//! lets callers tell a missing row apart from a constraint failure, a bad
//! argument, a cancelled context, or a transient backend problem.
//!
//! # Example
//!
//! ```rust
//! use repokit::repository::{RepositoryError, RepositoryErrorKind};
//!
//! let error = RepositoryError::not_found("users", "42");
//! assert!(matches!(error.kind, RepositoryErrorKind::NotFound));
//! assert!(!error.is_retriable());
//! ```

use std::fmt;
use std::sync::Arc;

use crate::context::ContextError;

/// Result alias for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Persistence primitive being performed when the error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryOperation {
    /// Listing rows matching a query
    Find,
    /// Counting rows matching a query
    Count,
    /// Fetching one row by primary key
    First,
    /// Inserting a row
    Create,
    /// Upserting a row
    Save,
    /// Deleting a row
    Delete,
    /// Validating paging arguments
    Paginate,
    /// Establishing a connection
    Connect,
}

impl fmt::Display for RepositoryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Find => write!(f, "find"),
            Self::Count => write!(f, "count"),
            Self::First => write!(f, "first"),
            Self::Create => write!(f, "create"),
            Self::Save => write!(f, "save"),
            Self::Delete => write!(f, "delete"),
            Self::Paginate => write!(f, "paginate"),
            Self::Connect => write!(f, "connect"),
        }
    }
}

/// Category of repository error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryErrorKind {
    /// Target row does not exist
    NotFound,
    /// Unique, foreign key, or check constraint failed
    ConstraintViolation,
    /// Caller passed arguments outside the accepted range
    InvalidArgument,
    /// Execution context was cancelled
    Cancelled,
    /// Execution context deadline elapsed
    DeadlineExceeded,
    /// Connectivity problem unrelated to the query itself
    ConnectionFailed,
    /// Backend rejected or failed the statement
    DatabaseError,
    /// A row could not be decoded or a value could not be encoded
    SerializationError,
}

impl fmt::Display for RepositoryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::ConstraintViolation => write!(f, "constraint_violation"),
            Self::InvalidArgument => write!(f, "invalid_argument"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::DeadlineExceeded => write!(f, "deadline_exceeded"),
            Self::ConnectionFailed => write!(f, "connection_failed"),
            Self::DatabaseError => write!(f, "database_error"),
            Self::SerializationError => write!(f, "serialization_error"),
        }
    }
}

/// Structured repository error with operation context
///
/// Displays as
/// `Repository not_found error during first: Entity not found [users: 42]`.
#[derive(Debug, Clone)]
pub struct RepositoryError {
    /// The primitive being performed when the error occurred
    pub operation: RepositoryOperation,
    /// The category of error
    pub kind: RepositoryErrorKind,
    /// Human-readable error message
    pub message: String,
    /// Table or entity involved
    pub entity_type: Option<String>,
    /// Primary key involved
    pub entity_id: Option<String>,
    source: Option<Arc<sqlx::Error>>,
}

impl RepositoryError {
    /// Create a new repository error
    pub fn new(
        operation: RepositoryOperation,
        kind: RepositoryErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            entity_type: None,
            entity_id: None,
            source: None,
        }
    }

    /// Create a "not found" error with entity context
    pub fn not_found(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self::new(
            RepositoryOperation::First,
            RepositoryErrorKind::NotFound,
            "Entity not found",
        )
        .with_entity(entity_type, entity_id)
    }

    /// Create an invalid argument error
    pub fn invalid_argument(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::InvalidArgument, message)
    }

    /// Create a constraint violation error
    pub fn constraint_violation(
        operation: RepositoryOperation,
        message: impl Into<String>,
    ) -> Self {
        Self::new(operation, RepositoryErrorKind::ConstraintViolation, message)
    }

    /// Create a connection failed error
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::new(
            RepositoryOperation::Connect,
            RepositoryErrorKind::ConnectionFailed,
            message,
        )
    }

    /// Error for an operation stopped by its context
    pub fn from_context(operation: RepositoryOperation, err: ContextError) -> Self {
        let kind = match err {
            ContextError::Cancelled => RepositoryErrorKind::Cancelled,
            ContextError::DeadlineExceeded => RepositoryErrorKind::DeadlineExceeded,
        };
        Self::new(operation, kind, err.to_string())
    }

    /// Classify a driver error
    ///
    /// The original `sqlx::Error` stays reachable through
    /// [`std::error::Error::source`].
    pub fn from_sqlx(operation: RepositoryOperation, err: sqlx::Error) -> Self {
        let kind = categorize_sqlx_error(&err);
        let mut error = Self::new(operation, kind, err.to_string());
        error.source = Some(Arc::new(err));
        error
    }

    /// Add entity context to an existing error
    #[must_use]
    pub fn with_entity(
        mut self,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Set the operation that caused the error
    #[must_use]
    pub fn with_operation(mut self, operation: RepositoryOperation) -> Self {
        self.operation = operation;
        self
    }

    /// Whether the target row was absent
    pub fn is_not_found(&self) -> bool {
        self.kind == RepositoryErrorKind::NotFound
    }

    /// Whether the execution context stopped the operation
    pub fn is_context_error(&self) -> bool {
        matches!(
            self.kind,
            RepositoryErrorKind::Cancelled | RepositoryErrorKind::DeadlineExceeded
        )
    }

    /// Check if this error is retriable (transient errors that may succeed on retry)
    pub fn is_retriable(&self) -> bool {
        matches!(
            self.kind,
            RepositoryErrorKind::ConnectionFailed | RepositoryErrorKind::DeadlineExceeded
        )
    }
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Repository {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        if let (Some(entity_type), Some(entity_id)) = (&self.entity_type, &self.entity_id) {
            write!(f, " [{}: {}]", entity_type, entity_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for RepositoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|err| err as &(dyn std::error::Error + 'static))
    }
}

fn categorize_sqlx_error(err: &sqlx::Error) -> RepositoryErrorKind {
    use sqlx::error::ErrorKind;
    use sqlx::Error;

    match err {
        Error::RowNotFound => RepositoryErrorKind::NotFound,
        Error::Database(db) => match db.kind() {
            ErrorKind::UniqueViolation
            | ErrorKind::ForeignKeyViolation
            | ErrorKind::NotNullViolation
            | ErrorKind::CheckViolation => RepositoryErrorKind::ConstraintViolation,
            _ => RepositoryErrorKind::DatabaseError,
        },
        Error::Io(_)
        | Error::Tls(_)
        | Error::PoolTimedOut
        | Error::PoolClosed
        | Error::WorkerCrashed => RepositoryErrorKind::ConnectionFailed,
        Error::ColumnDecode { .. } | Error::Decode(_) | Error::Encode(_) => {
            RepositoryErrorKind::SerializationError
        }
        _ => RepositoryErrorKind::DatabaseError,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_repository_operation_display() {
        assert_eq!(RepositoryOperation::Find.to_string(), "find");
        assert_eq!(RepositoryOperation::First.to_string(), "first");
        assert_eq!(RepositoryOperation::Save.to_string(), "save");
        assert_eq!(RepositoryOperation::Paginate.to_string(), "paginate");
    }

    #[test]
    fn test_repository_error_kind_display() {
        assert_eq!(RepositoryErrorKind::NotFound.to_string(), "not_found");
        assert_eq!(
            RepositoryErrorKind::InvalidArgument.to_string(),
            "invalid_argument"
        );
        assert_eq!(
            RepositoryErrorKind::DeadlineExceeded.to_string(),
            "deadline_exceeded"
        );
    }

    #[test]
    fn test_not_found_display() {
        let error = RepositoryError::not_found("products", "8");
        assert_eq!(
            error.to_string(),
            "Repository not_found error during first: Entity not found [products: 8]"
        );
        assert!(error.is_not_found());
    }

    #[test]
    fn test_context_errors_map_to_kinds() {
        let cancelled =
            RepositoryError::from_context(RepositoryOperation::Find, ContextError::Cancelled);
        assert_eq!(cancelled.kind, RepositoryErrorKind::Cancelled);
        assert!(cancelled.is_context_error());
        assert!(!cancelled.is_retriable());

        let expired = RepositoryError::from_context(
            RepositoryOperation::Count,
            ContextError::DeadlineExceeded,
        );
        assert_eq!(expired.kind, RepositoryErrorKind::DeadlineExceeded);
        assert!(expired.is_retriable());
    }

    #[test]
    fn test_sqlx_errors_are_classified() {
        let err = RepositoryError::from_sqlx(RepositoryOperation::First, sqlx::Error::RowNotFound);
        assert_eq!(err.kind, RepositoryErrorKind::NotFound);
        assert!(err.source().is_some());

        let err = RepositoryError::from_sqlx(RepositoryOperation::Find, sqlx::Error::PoolTimedOut);
        assert_eq!(err.kind, RepositoryErrorKind::ConnectionFailed);
        assert!(err.is_retriable());

        let err = RepositoryError::from_sqlx(
            RepositoryOperation::Find,
            sqlx::Error::Protocol("bad frame".to_string()),
        );
        assert_eq!(err.kind, RepositoryErrorKind::DatabaseError);
    }

    #[test]
    fn test_with_operation_and_entity() {
        let error = RepositoryError::connection_failed("refused")
            .with_operation(RepositoryOperation::Save)
            .with_entity("users", "3");
        assert_eq!(error.operation, RepositoryOperation::Save);
        assert_eq!(error.entity_type.as_deref(), Some("users"));
        assert_eq!(error.entity_id.as_deref(), Some("3"));
    }
}
