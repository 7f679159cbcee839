//! Error types for coursectl-store
//!
//! Every failure carries the operation and the identity or procedure it
//! concerns. Nothing here is retried; `is_retryable` tells the caller which
//! failures are worth retrying with backoff.

use thiserror::Error;
use uuid::Uuid;

use crate::models::ValidationError;

/// Result type alias for coursectl-store operations
pub type Result<T> = std::result::Result<T, CatalogError>;

#[derive(Error, Debug)]
pub enum CatalogError {
    /// The backing store could not hand out a connection
    #[error("connection unavailable: {reason}")]
    ConnectionUnavailable {
        reason: String,
        #[source]
        source: Option<sqlx::Error>,
    },

    /// A statement, procedure call or row decode failed
    #[error("query execution failed during {operation}: {source}")]
    QueryExecutionFailed {
        operation: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("not found: {resource} '{id}'")]
    NotFound { resource: &'static str, id: String },

    /// The commit went through but touched no rows
    #[error("{operation} for '{id}' affected zero rows")]
    PersistenceFailed { operation: &'static str, id: Uuid },

    /// Rejected before any round trip to the store
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] ValidationError),

    #[error("concurrent write on course '{id}': expected version {expected}, found {actual}")]
    Conflict { id: Uuid, expected: i64, actual: i64 },

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("configuration error: {reason}")]
    Config { reason: String },
}

impl CatalogError {
    pub fn unavailable(reason: impl Into<String>, source: sqlx::Error) -> Self {
        Self::ConnectionUnavailable {
            reason: reason.into(),
            source: Some(source),
        }
    }

    pub fn query(operation: impl Into<String>, source: sqlx::Error) -> Self {
        Self::QueryExecutionFailed {
            operation: operation.into(),
            source,
        }
    }

    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Only an unreachable store is worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConnectionUnavailable { .. })
    }
}

/// Attaches the operation name to a raw sqlx failure.
pub(crate) trait QueryResultExt<T> {
    fn during(self, operation: &str) -> Result<T>;
}

impl<T> QueryResultExt<T> for std::result::Result<T, sqlx::Error> {
    fn during(self, operation: &str) -> Result<T> {
        self.map_err(|source| CatalogError::query(operation, source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = CatalogError::not_found("course", "abc");
        assert_eq!(err.to_string(), "not found: course 'abc'");

        let id = Uuid::nil();
        let err = CatalogError::PersistenceFailed {
            operation: "course.create",
            id,
        };
        assert_eq!(
            err.to_string(),
            format!("course.create for '{}' affected zero rows", id)
        );
    }

    #[test]
    fn only_unavailable_is_retryable() {
        let err = CatalogError::unavailable("pool timed out", sqlx::Error::PoolTimedOut);
        assert!(err.is_retryable());

        let err = CatalogError::query("usp_ListCourses", sqlx::Error::RowNotFound);
        assert!(!err.is_retryable());

        let err = CatalogError::not_found("course", Uuid::nil());
        assert!(!err.is_retryable());
    }

    #[test]
    fn during_keeps_cause() {
        let raw: std::result::Result<(), sqlx::Error> = Err(sqlx::Error::RowNotFound);
        let err = raw.during("course.delete").unwrap_err();
        match err {
            CatalogError::QueryExecutionFailed { operation, source } => {
                assert_eq!(operation, "course.delete");
                assert!(matches!(source, sqlx::Error::RowNotFound));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
