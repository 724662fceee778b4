//! Optimistic concurrency control
//!
//! The read phase never refuses: accesses are only recorded into the
//! transaction's read or write set. Conflicts are decided once, at commit,
//! by backward validation against the committed ledger. A transaction that
//! fails validation is aborted and its commit returns `Ok(false)`.

use super::{conclude, force_terminate, ConcurrencyProtocol, ValidationOutcome};
use crate::stats::{ConcurrencyStats, StatsRecorder};
use crate::transaction::{Transaction, TransactionTable};
use crate::validation::ValidationManager;
use std::sync::atomic::{AtomicU64, Ordering};
use strata_core::{Action, Algorithm, Error, Result, TxnId};
use tracing::{debug, info};

/// OCC engine
#[derive(Debug, Default)]
pub struct OptimisticProtocol {
    transactions: TransactionTable,
    validation: ValidationManager,
    next_txn_id: AtomicU64,
    stats: StatsRecorder,
}

impl OptimisticProtocol {
    /// Create an empty engine
    pub fn new() -> Self {
        Self::default()
    }

    /// Read/write sets and the committed ledger
    pub fn validation(&self) -> &ValidationManager {
        &self.validation
    }

    fn refuse(&self, reason: impl Into<String>) -> ValidationOutcome {
        self.stats.record_refusal();
        ValidationOutcome::refused(reason)
    }
}

impl ConcurrencyProtocol for OptimisticProtocol {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Validation
    }

    fn begin_transaction(&self) -> Result<TxnId> {
        let id = TxnId(self.next_txn_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.transactions.insert(Transaction::new(id));
        self.stats.record_begin();
        info!(txn_id = %id, algorithm = "validation", "transaction started");
        Ok(id)
    }

    fn validate_object(&self, object_id: &str, txn_id: TxnId, action: Action) -> ValidationOutcome {
        let Some(txn) = self.transactions.get(txn_id) else {
            return self.refuse("unknown transaction");
        };
        if txn.is_aborted() {
            return self.refuse("transaction aborted");
        }
        self.validation.record_access(txn_id, object_id, action);
        debug!(txn_id = %txn_id, object_id, %action, "access recorded");
        ValidationOutcome::allowed(format!("{} recorded", action))
    }

    fn end_transaction(&self, txn_id: TxnId, commit: bool) -> Result<bool> {
        let txn = self
            .transactions
            .remove(txn_id)
            .ok_or(Error::UnknownTransaction(txn_id))?;

        let mut failure = None;
        let outcome = conclude(&txn, commit, || {
            let result = self.validation.validate(txn_id);
            if result.is_valid() {
                true
            } else {
                failure = Some(result.summary());
                false
            }
        });
        let committed = match outcome {
            Ok(committed) => committed,
            Err(e) => {
                self.validation.on_abort(txn_id);
                return Err(e.into());
            }
        };

        self.stats.record_end(committed);
        if committed {
            info!(txn_id = %txn_id, "transaction committed");
        } else {
            self.validation.on_abort(txn_id);
            match failure {
                Some(reason) => info!(txn_id = %txn_id, %reason, "transaction aborted"),
                None => info!(txn_id = %txn_id, requested_commit = commit, "transaction aborted"),
            }
        }
        Ok(committed)
    }

    fn transactions(&self) -> &TransactionTable {
        &self.transactions
    }

    fn stats(&self) -> ConcurrencyStats {
        self.stats.snapshot()
    }

    fn shutdown(&self) {
        let live = self.transactions.snapshot();
        for txn in &live {
            if self.transactions.remove(txn.id()).is_none() {
                continue;
            }
            let committed = force_terminate(txn, |id| self.validation.on_abort(id));
            self.stats.record_end(committed);
        }
        info!(terminated = live.len(), algorithm = "validation", "engine shut down");
    }
}
