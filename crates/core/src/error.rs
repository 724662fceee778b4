//! Error types for the concurrency-control core
//!
//! Only programming and state errors live here. Protocol refusals (lock
//! conflicts, wounds, timestamp violations, failed validation) are ordinary
//! outcomes and never become an `Error`.
//!
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use crate::types::{TransactionStatus, TxnId};
use thiserror::Error;

/// Result type alias for concurrency-control operations
pub type Result<T> = std::result::Result<T, Error>;

/// Illegal operation on a transaction's lifecycle state
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// The requested status change is not an edge of the lifecycle graph
    #[error("Transaction {txn_id}: illegal transition {from} -> {to}")]
    IllegalTransition {
        /// Transaction whose status was being changed
        txn_id: TxnId,
        /// Status observed when the transition was attempted
        from: TransactionStatus,
        /// Requested status
        to: TransactionStatus,
    },

    /// `set_timestamp` called on a transaction that already has one
    #[error("Transaction {txn_id}: timestamp already assigned ({current})")]
    TimestampAlreadyAssigned {
        /// Transaction whose timestamp was being set
        txn_id: TxnId,
        /// Timestamp already stored
        current: u64,
    },
}

/// Error types for the concurrency-control core
#[derive(Debug, Error)]
pub enum Error {
    /// Operation named a transaction that is not live
    #[error("Unknown transaction: {0}")]
    UnknownTransaction(TxnId),

    /// Lifecycle state violation
    #[error("Invalid transition: {0}")]
    InvalidTransition(#[from] TransitionError),

    /// Algorithm selector did not name a supported protocol
    #[error("Unsupported concurrency control algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Manager used before `initialize()` or after `shutdown()`
    #[error("Concurrency control manager is not initialized")]
    NotInitialized,

    /// Configuration file could not be read, written, parsed or serialized
    #[error("Configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_unknown_transaction() {
        let err = Error::UnknownTransaction(TxnId(7));
        let msg = err.to_string();
        assert!(msg.contains("Unknown transaction"));
        assert!(msg.contains('7'));
    }

    #[test]
    fn test_error_display_illegal_transition() {
        let err = TransitionError::IllegalTransition {
            txn_id: TxnId(3),
            from: TransactionStatus::Active,
            to: TransactionStatus::Committed,
        };
        let msg = err.to_string();
        assert!(msg.contains("ACTIVE -> COMMITTED"));
        assert!(msg.contains("Transaction 3"));
    }

    #[test]
    fn test_error_display_timestamp_assigned() {
        let err = TransitionError::TimestampAlreadyAssigned {
            txn_id: TxnId(1),
            current: 9,
        };
        assert!(err.to_string().contains("already assigned (9)"));
    }

    #[test]
    fn test_error_from_transition() {
        let err: Error = TransitionError::TimestampAlreadyAssigned {
            txn_id: TxnId(1),
            current: 2,
        }
        .into();
        assert!(matches!(err, Error::InvalidTransition(_)));
    }

    #[test]
    fn test_error_display_unsupported_algorithm() {
        let err = Error::UnsupportedAlgorithm("mvcc".to_string());
        assert!(err.to_string().contains("mvcc"));
    }
}
