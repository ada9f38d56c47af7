//! Ranking error types.

use std::collections::HashMap;
use thiserror::Error;

use super::models::{ClassTypeId, OlympiadId};
use crate::db::{RetryError, StoreError, TransientError};

/// Ranking errors
#[derive(Debug, Error)]
pub enum RankingError {
    #[error("class type not found: {0}")]
    ClassTypeNotFound(ClassTypeId),

    #[error("olympiad not found: {0}")]
    OlympiadNotFound(OlympiadId),

    #[error("invalid medal distribution: {reason}")]
    InvalidMedalDistribution { reason: String },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("transaction failed after {attempts} attempts: {source}")]
    TransactionFailed {
        attempts: u32,
        source: Box<RankingError>,
    },

    #[error("processing failed: {0}")]
    Processing(String),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

pub type RankingResult<T> = Result<T, RankingError>;

impl RankingError {
    /// Stable error code for the API layer and failure reports
    pub fn code(&self) -> &'static str {
        match self {
            RankingError::ClassTypeNotFound(_) => "CLASS_TYPE_NOT_FOUND",
            RankingError::OlympiadNotFound(_) => "OLYMPIAD_NOT_FOUND",
            RankingError::InvalidMedalDistribution { .. } => "INVALID_MEDAL_DISTRIBUTION",
            RankingError::Validation(_) => "VALIDATION_ERROR",
            RankingError::TransactionFailed { .. } => "TRANSACTION_FAILED",
            RankingError::Processing(_) => "PROCESSING_ERROR",
            RankingError::Store(_) => "STORE_ERROR",
        }
    }

    /// Structured diagnostics carried alongside the code
    pub fn context(&self) -> HashMap<&'static str, String> {
        let mut ctx = HashMap::new();
        match self {
            RankingError::ClassTypeNotFound(id) => {
                ctx.insert("class_type_id", id.to_string());
            }
            RankingError::OlympiadNotFound(id) => {
                ctx.insert("olympiad_id", id.to_string());
            }
            RankingError::InvalidMedalDistribution { reason } => {
                ctx.insert("reason", reason.clone());
            }
            RankingError::Validation(reason) | RankingError::Processing(reason) => {
                ctx.insert("reason", reason.clone());
            }
            RankingError::TransactionFailed { attempts, source } => {
                ctx.insert("attempts", attempts.to_string());
                ctx.insert("cause", source.to_string());
            }
            RankingError::Store(e) => {
                ctx.insert("cause", e.to_string());
            }
        }
        ctx
    }
}

impl TransientError for RankingError {
    fn is_transient(&self) -> bool {
        matches!(self, RankingError::Store(e) if e.is_transient())
    }
}

impl From<RetryError<RankingError>> for RankingError {
    fn from(err: RetryError<RankingError>) -> Self {
        match err {
            RetryError::Exhausted { attempts, source } => RankingError::TransactionFailed {
                attempts,
                source: Box::new(source),
            },
            RetryError::Aborted(source) => source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            RankingError::ClassTypeNotFound(Uuid::new_v4()).code(),
            "CLASS_TYPE_NOT_FOUND"
        );
        assert_eq!(
            RankingError::Store(StoreError::Timeout("commit".into())).code(),
            "STORE_ERROR"
        );
    }

    #[test]
    fn test_context_carries_structured_diagnostics() {
        let id = Uuid::new_v4();
        let ctx = RankingError::ClassTypeNotFound(id).context();
        assert_eq!(ctx.get("class_type_id"), Some(&id.to_string()));

        let err = RankingError::TransactionFailed {
            attempts: 4,
            source: Box::new(RankingError::Store(StoreError::Timeout("commit".into()))),
        };
        let ctx = err.context();
        assert_eq!(ctx.get("attempts"), Some(&"4".to_string()));
        assert!(ctx.contains_key("cause"));
    }

    #[test]
    fn test_transient_classification_follows_store() {
        assert!(RankingError::Store(StoreError::Conflict("serialization".into())).is_transient());
        assert!(!RankingError::Validation("bad".into()).is_transient());
    }

    #[test]
    fn test_from_retry_error() {
        let err: RankingError = RetryError::Exhausted {
            attempts: 4,
            source: RankingError::Store(StoreError::Timeout("commit".into())),
        }
        .into();
        match err {
            RankingError::TransactionFailed { attempts, .. } => assert_eq!(attempts, 4),
            other => panic!("unexpected: {other}"),
        }
    }
}
