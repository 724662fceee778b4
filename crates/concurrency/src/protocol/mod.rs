//! Protocol engines behind the facade
//!
//! Every engine implements [`ConcurrencyProtocol`]:
//! - [`LockBasedProtocol`]: strict 2PL, non-blocking wound-wait
//! - [`TimestampOrderingProtocol`]: basic timestamp ordering
//! - [`OptimisticProtocol`]: backward-validating OCC
//!
//! Engines own their live [`TransactionTable`] and their counters. The
//! shared commit/abort state walk lives in [`conclude`].

mod lock_based;
mod optimistic;
mod timestamp_ordering;

pub use lock_based::LockBasedProtocol;
pub use optimistic::OptimisticProtocol;
pub use timestamp_ordering::TimestampOrderingProtocol;

use crate::stats::ConcurrencyStats;
use crate::transaction::{Transaction, TransactionTable};
use std::fmt;
use strata_core::{
    Action, Algorithm, Result, RowSnapshot, TransactionStatus, TransitionError, TxnId,
};
use tracing::warn;

/// Answer to a `validate_object` request
///
/// A refusal is an ordinary outcome, never an error: the caller decides
/// whether to retry or abort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    /// Whether the access may proceed
    pub allowed: bool,
    /// Human-readable explanation
    pub reason: String,
}

impl ValidationOutcome {
    /// Access granted
    pub fn allowed(reason: impl Into<String>) -> Self {
        ValidationOutcome {
            allowed: true,
            reason: reason.into(),
        }
    }

    /// Access refused
    pub fn refused(reason: impl Into<String>) -> Self {
        ValidationOutcome {
            allowed: false,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ValidationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.allowed {
            write!(f, "allowed: {}", self.reason)
        } else {
            write!(f, "refused: {}", self.reason)
        }
    }
}

/// Contract shared by the three concurrency-control engines
pub trait ConcurrencyProtocol: Send + Sync {
    /// Which algorithm this engine implements
    fn algorithm(&self) -> Algorithm;

    /// Start a transaction and return its id
    fn begin_transaction(&self) -> Result<TxnId>;

    /// Decide whether `txn_id` may perform `action` on `object_id`
    fn validate_object(&self, object_id: &str, txn_id: TxnId, action: Action) -> ValidationOutcome;

    /// Validate a batch, stopping at the first refusal
    ///
    /// An empty batch is allowed.
    fn validate_objects<S: AsRef<str>>(
        &self,
        object_ids: &[S],
        txn_id: TxnId,
        action: Action,
    ) -> ValidationOutcome
    where
        Self: Sized,
    {
        let mut last = ValidationOutcome::allowed("no objects");
        for object_id in object_ids {
            last = self.validate_object(object_id.as_ref(), txn_id, action);
            if !last.allowed {
                return last;
            }
        }
        last
    }

    /// Commit or abort `txn_id`; returns whether it committed
    ///
    /// # Errors
    /// `UnknownTransaction` if the id is not live, `InvalidTransition` if
    /// the status walk hits an illegal edge.
    fn end_transaction(&self, txn_id: TxnId, commit: bool) -> Result<bool>;

    /// Live transaction table
    fn transactions(&self) -> &TransactionTable;

    /// Counter snapshot
    fn stats(&self) -> ConcurrencyStats;

    /// Force-terminate every live transaction
    fn shutdown(&self);

    /// Buffer a row snapshot in the transaction; no-op for unknown ids
    fn log_object(&self, row: RowSnapshot, txn_id: TxnId) {
        if let Some(txn) = self.transactions().get(txn_id) {
            txn.log_object(row);
        }
    }

    /// Rows buffered by `log_object`, empty for unknown ids
    fn logged_objects(&self, txn_id: TxnId) -> Vec<RowSnapshot> {
        self.transactions()
            .get(txn_id)
            .map(|txn| txn.logged_objects())
            .unwrap_or_default()
    }

    /// Current status of a live transaction
    fn transaction_status(&self, txn_id: TxnId) -> Option<TransactionStatus> {
        self.transactions().get(txn_id).map(|txn| txn.status())
    }

    /// Timestamp of a live transaction, if assigned
    fn transaction_timestamp(&self, txn_id: TxnId) -> Option<u64> {
        self.transactions().get(txn_id).and_then(|txn| txn.timestamp())
    }

    /// Ids of live transactions, ascending
    fn active_transactions(&self) -> Vec<TxnId> {
        self.transactions().ids()
    }
}

/// Walk `txn` to `Terminated`, committing if `commit` and `accept` agree
///
/// Commit: `Active → PartiallyCommitted`, then `Committed` if `accept()`
/// returns true, else `Failed → Aborted`. Abort: `Active → Failed → Aborted`.
/// A transaction already failed or aborted (wounded, refused) is just
/// aborted and terminated. `accept` only runs for a commit that reached
/// `PartiallyCommitted`.
pub(crate) fn conclude<F>(txn: &Transaction, commit: bool, accept: F) -> std::result::Result<bool, TransitionError>
where
    F: FnOnce() -> bool,
{
    if !commit || txn.is_aborted() {
        return terminate_aborted(txn).map(|()| false);
    }

    if let Err(e) = txn.transition(TransactionStatus::PartiallyCommitted) {
        if txn.is_aborted() {
            return terminate_aborted(txn).map(|()| false);
        }
        return Err(e);
    }

    if !accept() {
        return terminate_aborted(txn).map(|()| false);
    }

    if let Err(e) = txn.transition(TransactionStatus::Committed) {
        // Wounded between PartiallyCommitted and Committed
        if txn.is_aborted() {
            return terminate_aborted(txn).map(|()| false);
        }
        return Err(e);
    }
    txn.transition(TransactionStatus::Terminated)?;
    Ok(true)
}

fn terminate_aborted(txn: &Transaction) -> std::result::Result<(), TransitionError> {
    txn.force_abort();
    txn.transition(TransactionStatus::Terminated)
}

/// Best-effort teardown of one live transaction during shutdown
///
/// Committed transactions are terminated as they are; anything else is
/// aborted first. `release` runs between the two, so nothing it frees is
/// ever seen held by a terminated transaction. Transition errors are logged
/// and dropped. Returns whether the transaction had committed.
pub(crate) fn force_terminate(txn: &Transaction, release: impl FnOnce(TxnId)) -> bool {
    let committed = txn.is_committed();
    if !committed {
        txn.force_abort();
    }
    release(txn.id());
    if let Err(e) = txn.transition(TransactionStatus::Terminated) {
        warn!(txn_id = %txn.id(), error = %e, "ignoring transition error during shutdown");
    }
    committed
}
