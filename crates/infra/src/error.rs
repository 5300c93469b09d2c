//! Service-level error taxonomy.

use thiserror::Error;

use stockledger_core::DomainError;

use crate::document_store::StoreError;

pub type LedgerResult<T> = Result<T, LedgerError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LedgerError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: i64, available: i64 },

    #[error("not found: {0}")]
    NotFound(String),

    /// Optimistic concurrency retries were exhausted.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// A stored document could not be decoded into a domain value.
    #[error("corrupt document: {0}")]
    Corrupt(String),

    #[error("invariant violated: {0}")]
    Invariant(String),

    #[error(transparent)]
    Store(StoreError),
}

impl From<DomainError> for LedgerError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => LedgerError::Validation(msg),
            DomainError::InsufficientStock {
                requested,
                available,
            } => LedgerError::InsufficientStock {
                requested,
                available,
            },
            DomainError::InvariantViolation(msg) => LedgerError::Invariant(msg),
            DomainError::NotFound => LedgerError::NotFound("resource".to_string()),
            DomainError::Conflict(msg) => LedgerError::Conflict(msg),
        }
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => LedgerError::StoreUnavailable(msg),
            StoreError::NotFound { collection, id } => LedgerError::NotFound(format!("{collection}/{id}")),
            StoreError::PreconditionFailed { .. } => LedgerError::Conflict(err.to_string()),
            StoreError::Decode(msg) => LedgerError::Corrupt(msg),
            other @ StoreError::InvalidWrite(_) => LedgerError::Store(other),
        }
    }
}
