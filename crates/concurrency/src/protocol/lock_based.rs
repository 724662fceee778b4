//! Strict two-phase locking with non-blocking wound-wait
//!
//! Reads take shared locks, writes take exclusive locks. Locks are held
//! until `end_transaction`, which releases everything the transaction holds
//! whether it committed or not.
//!
//! A holder wounded by an older requester is aborted but keeps its locks
//! until its own `end_transaction`; the older requester keeps being refused
//! until then.

use super::{conclude, force_terminate, ConcurrencyProtocol, ValidationOutcome};
use crate::lock::{LockManager, LockMode, LockOutcome};
use crate::stats::{ConcurrencyStats, StatsRecorder};
use crate::timestamp::TimestampManager;
use crate::transaction::{Transaction, TransactionTable};
use std::fmt;
use std::sync::Arc;
use strata_core::{Action, Algorithm, Error, RecoveryLog, Result, TxnId};
use tracing::{debug, info};

/// 2PL engine
pub struct LockBasedProtocol {
    transactions: TransactionTable,
    locks: LockManager,
    /// Source of transaction ids and wound-wait ages
    clock: TimestampManager,
    recovery: Option<Arc<dyn RecoveryLog>>,
    stats: StatsRecorder,
}

impl LockBasedProtocol {
    /// Engine without a recovery collaborator
    pub fn new() -> Self {
        LockBasedProtocol {
            transactions: TransactionTable::new(),
            locks: LockManager::new(),
            clock: TimestampManager::new(),
            recovery: None,
            stats: StatsRecorder::default(),
        }
    }

    /// Engine holding a handle to the recovery component
    ///
    /// The handle is only stored; the engine never calls into it.
    pub fn with_recovery(recovery: Arc<dyn RecoveryLog>) -> Self {
        LockBasedProtocol {
            recovery: Some(recovery),
            ..Self::new()
        }
    }

    /// The injected recovery component, if any
    pub fn recovery(&self) -> Option<&Arc<dyn RecoveryLog>> {
        self.recovery.as_ref()
    }

    /// The lock table
    pub fn locks(&self) -> &LockManager {
        &self.locks
    }

    fn refuse(&self, reason: impl Into<String>) -> ValidationOutcome {
        self.stats.record_refusal();
        ValidationOutcome::refused(reason)
    }

    fn refuse_inactive(&self, txn: &Transaction) -> ValidationOutcome {
        if txn.is_aborted() {
            self.refuse("transaction aborted")
        } else {
            self.refuse("transaction no longer active")
        }
    }

    fn release(&self, txn: &Transaction) {
        let released = self.locks.release_all(txn.id());
        debug!(txn_id = %txn.id(), released, "released locks at end of transaction");
    }
}

impl Default for LockBasedProtocol {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LockBasedProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockBasedProtocol")
            .field("transactions", &self.transactions)
            .field("locks", &self.locks)
            .field("clock", &self.clock)
            .field("recovery", &self.recovery.is_some())
            .finish()
    }
}

fn join_ids(ids: &[TxnId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

impl ConcurrencyProtocol for LockBasedProtocol {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Lock
    }

    fn begin_transaction(&self) -> Result<TxnId> {
        let ts = self.clock.next_timestamp();
        let txn = Transaction::new(TxnId(ts));
        txn.set_timestamp(ts)?;
        let txn = self.transactions.insert(txn);
        self.stats.record_begin();
        info!(txn_id = %txn.id(), algorithm = "lock", "transaction started");
        Ok(txn.id())
    }

    fn validate_object(&self, object_id: &str, txn_id: TxnId, action: Action) -> ValidationOutcome {
        let Some(txn) = self.transactions.get(txn_id) else {
            return self.refuse("unknown transaction");
        };
        if !txn.is_active() {
            return self.refuse_inactive(&txn);
        }

        let mode = match action {
            Action::Read => LockMode::Shared,
            Action::Write => LockMode::Exclusive,
        };
        match self.locks.acquire(object_id, &txn, mode) {
            LockOutcome::Granted => ValidationOutcome::allowed(format!("{} lock granted", mode)),
            LockOutcome::Upgraded => ValidationOutcome::allowed("lock upgraded to exclusive"),
            LockOutcome::RequesterInactive => self.refuse_inactive(&txn),
            LockOutcome::Wounded(victims) => {
                self.stats.record_wounds(victims.len());
                self.refuse(format!(
                    "wounded younger holder(s) {}; retry",
                    join_ids(&victims)
                ))
            }
            LockOutcome::Wait(blockers) => self.refuse(format!(
                "{} held by older transaction(s) {}; retry",
                object_id,
                join_ids(&blockers)
            )),
        }
    }

    fn end_transaction(&self, txn_id: TxnId, commit: bool) -> Result<bool> {
        let txn = self
            .transactions
            .remove(txn_id)
            .ok_or(Error::UnknownTransaction(txn_id))?;

        let outcome = conclude(&txn, commit, || true);
        self.release(&txn);

        let committed = outcome?;
        self.stats.record_end(committed);
        if committed {
            info!(txn_id = %txn_id, "transaction committed");
        } else {
            info!(txn_id = %txn_id, requested_commit = commit, "transaction aborted");
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
            let committed = force_terminate(txn, |id| {
                self.locks.release_all(id);
            });
            self.stats.record_end(committed);
        }
        info!(terminated = live.len(), algorithm = "lock", "engine shut down");
    }
}
