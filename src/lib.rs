//! StrataCC - concurrency-control core for a modular database engine
//!
//! Decides, for every read or write of a named data object, whether the
//! operation may proceed, must be refused, or forces another transaction to
//! abort. Three interchangeable protocols sit behind one facade:
//!
//! - `lock`: strict two-phase locking with wound-wait deadlock avoidance
//! - `timestamp`: basic timestamp ordering
//! - `validation`: optimistic (backward-validation) concurrency control
//!
//! # Quick Start
//!
//! ```
//! use stratacc::{Action, ConcurrencyControlManager};
//!
//! let manager = ConcurrencyControlManager::new("lock")?;
//! manager.initialize()?;
//!
//! let tx = manager.begin_transaction()?;
//! let outcome = manager.validate_object("accounts/42", tx, Action::Write);
//! assert!(outcome.allowed);
//! manager.end_transaction(tx, true)?;
//!
//! manager.shutdown();
//! # Ok::<(), stratacc::Error>(())
//! ```
//!
//! Storage, logging and query execution are external collaborators; only the
//! facade and its supporting types are exposed here.

pub use strata_concurrency::{
    ConcurrencyConfig, ConcurrencyControlManager, ConcurrencyStats, TransactionStatus,
    ValidationOutcome, CONFIG_FILE_NAME,
};
pub use strata_core::{
    Action, Algorithm, Error, RecoveryLog, Result, RowSnapshot, TransitionError, TxnId, Value,
};
