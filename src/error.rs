use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures surfaced by the engine operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The request carries no project identifier.
    #[error("missing projectId")]
    MissingProjectId,

    /// Malformed request, nothing has been written.
    #[error("invalid input: {0}")]
    Validation(String),

    /// A referenced record does not exist, nothing has been written.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// A uniqueness constraint would be violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A coordinated batch failed and has been rolled back as a whole.
    /// `index` counts the writes applied before the failure, it equals
    /// `total` when the final commit itself failed.
    #[error("batch aborted after {index} of {total} writes, nothing committed: {source}")]
    BatchCommit {
        index: usize,
        total: usize,
        #[source]
        source: WriteFailure,
    },

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl Error {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Error::NotFound { entity, id }
    }

    /// HTTP-like status class for the error.
    pub fn status(&self) -> u16 {
        match self {
            Error::MissingProjectId | Error::Validation(_) => 400,
            Error::NotFound { .. } => 404,
            Error::Conflict(_) => 409,
            Error::BatchCommit { .. } | Error::Storage(_) => 500,
        }
    }

    /// Whether re-running the operation from fresh state may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::BatchCommit {
                source: WriteFailure::Stale(_),
                ..
            }
        )
    }
}

/// Failure of a single write inside a coordinated batch.
#[derive(Debug, Error)]
pub enum WriteFailure {
    #[error(transparent)]
    Storage(#[from] sqlx::Error),

    /// The guard of a conditional write no longer holds.
    #[error("stale write: {0}")]
    Stale(String),

    /// Every write went through but the transaction could not be committed.
    #[error("commit failed: {0}")]
    Commit(#[source] sqlx::Error),
}

impl WriteFailure {
    pub fn is_unique_violation(&self) -> bool {
        match self {
            WriteFailure::Storage(sqlx::Error::Database(e))
            | WriteFailure::Commit(sqlx::Error::Database(e)) => e.is_unique_violation(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classes() {
        assert_eq!(Error::MissingProjectId.status(), 400);
        assert_eq!(Error::not_found("project", 3).status(), 404);
        assert_eq!(Error::Conflict("name".into()).status(), 409);
        let batch = Error::BatchCommit {
            index: 2,
            total: 3,
            source: WriteFailure::Stale("project 7 is no longer unassigned".into()),
        };
        assert_eq!(batch.status(), 500);
        assert!(batch.is_retryable());
        assert_eq!(
            batch.to_string(),
            "batch aborted after 2 of 3 writes, nothing committed: \
             stale write: project 7 is no longer unassigned"
        );
    }

    #[test]
    fn failed_commit_is_a_batch_failure() {
        let err = Error::BatchCommit {
            index: 4,
            total: 4,
            source: WriteFailure::Commit(sqlx::Error::PoolClosed),
        };
        assert_eq!(err.status(), 500);
        assert!(!err.is_retryable());
        assert!(err.to_string().starts_with("batch aborted after 4 of 4 writes"));
    }
}
