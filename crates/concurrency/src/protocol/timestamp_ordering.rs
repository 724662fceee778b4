//! Basic timestamp ordering
//!
//! Each transaction's timestamp is taken from the global counter at begin
//! and doubles as its id. Accesses are checked against per-object read and
//! write watermarks; a violation aborts the transaction, and an aborted
//! transaction is refused everything until it is ended.

use super::{conclude, force_terminate, ConcurrencyProtocol, ValidationOutcome};
use crate::stats::{ConcurrencyStats, StatsRecorder};
use crate::timestamp::TimestampManager;
use crate::transaction::{Transaction, TransactionTable};
use strata_core::{Action, Algorithm, Error, Result, TxnId};
use tracing::{debug, info};

/// Timestamp-ordering engine
#[derive(Debug, Default)]
pub struct TimestampOrderingProtocol {
    transactions: TransactionTable,
    timestamps: TimestampManager,
    stats: StatsRecorder,
}

impl TimestampOrderingProtocol {
    /// Create an engine whose first transaction gets timestamp 1
    pub fn new() -> Self {
        Self::default()
    }

    /// The watermark table
    pub fn timestamps(&self) -> &TimestampManager {
        &self.timestamps
    }

    fn refuse(&self, reason: impl Into<String>) -> ValidationOutcome {
        self.stats.record_refusal();
        ValidationOutcome::refused(reason)
    }
}

impl ConcurrencyProtocol for TimestampOrderingProtocol {
    fn algorithm(&self) -> Algorithm {
        Algorithm::Timestamp
    }

    fn begin_transaction(&self) -> Result<TxnId> {
        let ts = self.timestamps.next_timestamp();
        let txn = Transaction::new(TxnId(ts));
        txn.set_timestamp(ts)?;
        let txn = self.transactions.insert(txn);
        self.stats.record_begin();
        info!(txn_id = %txn.id(), ts, algorithm = "timestamp", "transaction started");
        Ok(txn.id())
    }

    fn validate_object(&self, object_id: &str, txn_id: TxnId, action: Action) -> ValidationOutcome {
        let Some(txn) = self.transactions.get(txn_id) else {
            return self.refuse("unknown transaction");
        };
        if txn.is_aborted() {
            return self.refuse("transaction aborted");
        }
        let Some(ts) = txn.timestamp() else {
            return self.refuse("transaction has no timestamp");
        };

        let checked = match action {
            Action::Read => self.timestamps.check_read(object_id, ts),
            Action::Write => self.timestamps.check_write(object_id, ts),
        };
        match checked {
            Ok(()) => {
                debug!(txn_id = %txn_id, object_id, %action, ts, "access allowed");
                ValidationOutcome::allowed(format!("{} at TS {} allowed", action, ts))
            }
            Err(violation) => {
                txn.force_abort();
                debug!(txn_id = %txn_id, object_id, %violation, "timestamp violation, transaction aborted");
                self.refuse(violation.to_string())
            }
        }
    }

    fn end_transaction(&self, txn_id: TxnId, commit: bool) -> Result<bool> {
        let txn = self
            .transactions
            .remove(txn_id)
            .ok_or(Error::UnknownTransaction(txn_id))?;

        let committed = conclude(&txn, commit, || true)?;
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
            let committed = force_terminate(txn, |_| {});
            self.stats.record_end(committed);
        }
        info!(terminated = live.len(), algorithm = "timestamp", "engine shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::TransactionStatus;

    #[test]
    fn test_ids_are_timestamps() {
        let engine = TimestampOrderingProtocol::new();
        let t1 = engine.begin_transaction().unwrap();
        let t2 = engine.begin_transaction().unwrap();
        assert_eq!(t1, TxnId(1));
        assert_eq!(t2, TxnId(2));
        assert_eq!(engine.transaction_timestamp(t2), Some(2));
    }

    #[test]
    fn test_old_reader_refused_and_aborted() {
        let engine = TimestampOrderingProtocol::new();
        let t1 = engine.begin_transaction().unwrap();
        let t2 = engine.begin_transaction().unwrap();

        assert!(engine.validate_object("X", t2, Action::Write).allowed);
        assert_eq!(engine.timestamps().write_ts("X"), 2);

        let outcome = engine.validate_object("X", t1, Action::Read);
        assert!(!outcome.allowed);
        assert_eq!(outcome.reason, "read at TS 1 is older than write timestamp 2");
        assert_eq!(engine.transaction_status(t1), Some(TransactionStatus::Aborted));

        // Refuses everything until ended
        let outcome = engine.validate_object("Y", t1, Action::Read);
        assert_eq!(outcome.reason, "transaction aborted");
        assert!(!engine.end_transaction(t1, true).unwrap());
    }

    #[test]
    fn test_old_writer_refused_after_young_read() {
        let engine = TimestampOrderingProtocol::new();
        let t1 = engine.begin_transaction().unwrap();
        let t2 = engine.begin_transaction().unwrap();

        assert!(engine.validate_object("X", t2, Action::Read).allowed);
        assert!(!engine.validate_object("X", t1, Action::Write).allowed);
        assert_eq!(engine.timestamps().write_ts("X"), 0);
    }

    #[test]
    fn test_in_order_accesses_allowed() {
        let engine = TimestampOrderingProtocol::new();
        let t1 = engine.begin_transaction().unwrap();
        let t2 = engine.begin_transaction().unwrap();

        assert!(engine.validate_object("X", t1, Action::Read).allowed);
        assert!(engine.validate_object("X", t1, Action::Write).allowed);
        assert!(engine.validate_object("X", t2, Action::Read).allowed);
        assert!(engine.validate_object("X", t2, Action::Write).allowed);
        assert!(engine.end_transaction(t1, true).unwrap());
        assert!(engine.end_transaction(t2, true).unwrap());
        assert_eq!(engine.stats().committed, 2);
    }

    #[test]
    fn test_batch_short_circuits() {
        let engine = TimestampOrderingProtocol::new();
        let t1 = engine.begin_transaction().unwrap();
        let t2 = engine.begin_transaction().unwrap();
        engine.validate_object("b", t2, Action::Write);

        let outcome = engine.validate_objects(&["a", "b", "c"], t1, Action::Read);
        assert!(!outcome.allowed);
        assert_eq!(engine.timestamps().read_ts("a"), 1);
        assert_eq!(engine.timestamps().read_ts("c"), 0);
    }

    #[test]
    fn test_shutdown_clears_live_transactions() {
        let engine = TimestampOrderingProtocol::new();
        engine.begin_transaction().unwrap();
        engine.begin_transaction().unwrap();
        engine.shutdown();
        assert!(engine.active_transactions().is_empty());

        let stats = engine.stats();
        assert_eq!(stats.aborted, 2);
        assert_eq!(stats.in_flight(), 0);
    }
}
