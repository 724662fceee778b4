//! Concurrency layer for Strata
//!
//! This crate decides whether transactions may touch objects, using one of
//! three interchangeable protocols:
//! - Lock: strict two-phase locking with non-blocking wound-wait
//! - Timestamp: basic timestamp ordering over per-object watermarks
//! - Validation: optimistic concurrency control with backward validation
//!
//! All operations are non-blocking. A conflict is reported as a refused
//! [`ValidationOutcome`] and retrying is up to the caller.
//!
//! [`ConcurrencyControlManager`] is the entry point; the building blocks
//! are public for embedding and inspection.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod lock;
pub mod manager;
pub mod protocol;
pub mod stats;
pub mod timestamp;
pub mod transaction;
pub mod validation;

pub use config::{ConcurrencyConfig, CONFIG_FILE_NAME};
pub use lock::{LockManager, LockMode, LockOutcome};
pub use manager::ConcurrencyControlManager;
pub use protocol::{
    ConcurrencyProtocol, LockBasedProtocol, OptimisticProtocol, TimestampOrderingProtocol,
    ValidationOutcome,
};
pub use stats::ConcurrencyStats;
pub use timestamp::{TimestampManager, TimestampViolation};
pub use transaction::{Transaction, TransactionTable};
pub use validation::{ConflictType, ValidationManager, ValidationRecord, ValidationResult};

pub use strata_core::TransactionStatus;
