//! Transaction record shared by all protocols
//!
//! A `Transaction` carries a transaction's identity, lifecycle status,
//! ordering timestamp and buffered row snapshots. It is always handled as
//! `Arc<Transaction>`: the owning engine keeps it in the live
//! [`TransactionTable`], and the lock manager keeps extra references inside
//! lock-table entries so that an older transaction can wound a holder.
//!
//! # State Machine
//!
//! ```text
//! Active ──► PartiallyCommitted ──► Committed ──► Terminated
//!   │                │
//!   └──────► Failed ◄┘──► Aborted ──► Terminated
//! ```
//!
//! The status is an atomic tag updated with compare-and-swap, so a wound
//! issued from another thread and the owning caller's own transitions never
//! overwrite each other: every observer sees a path through the graph.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use strata_core::{RowSnapshot, TransactionStatus, TransitionError, TxnId};

/// Timestamp value meaning "not yet assigned"
pub const UNASSIGNED_TIMESTAMP: u64 = 0;

/// One transaction's identity, status, timestamp and write log
#[derive(Debug)]
pub struct Transaction {
    id: TxnId,
    status: AtomicU8,
    timestamp: AtomicU64,
    log: Mutex<Vec<RowSnapshot>>,
    start_time: Instant,
}

impl Transaction {
    /// Create a new `Active` transaction without a timestamp
    ///
    /// # Example
    ///
    /// ```
    /// use strata_concurrency::Transaction;
    /// use strata_core::{TransactionStatus, TxnId};
    ///
    /// let txn = Transaction::new(TxnId(1));
    /// assert_eq!(txn.status(), TransactionStatus::Active);
    /// assert_eq!(txn.timestamp(), None);
    /// ```
    pub fn new(id: TxnId) -> Self {
        Transaction {
            id,
            status: AtomicU8::new(TransactionStatus::Active.to_tag()),
            timestamp: AtomicU64::new(UNASSIGNED_TIMESTAMP),
            log: Mutex::new(Vec::new()),
            start_time: Instant::now(),
        }
    }

    /// Transaction identifier
    pub fn id(&self) -> TxnId {
        self.id
    }

    /// Current lifecycle status
    pub fn status(&self) -> TransactionStatus {
        TransactionStatus::from_tag(self.status.load(Ordering::Acquire))
    }

    /// Ordering timestamp, if one has been assigned
    pub fn timestamp(&self) -> Option<u64> {
        match self.timestamp.load(Ordering::Acquire) {
            UNASSIGNED_TIMESTAMP => None,
            ts => Some(ts),
        }
    }

    /// Assign the ordering timestamp
    ///
    /// Write-once: succeeds only while the timestamp is still unassigned.
    ///
    /// # Errors
    /// Returns `TransitionError::TimestampAlreadyAssigned` on a second call.
    pub fn set_timestamp(&self, ts: u64) -> Result<(), TransitionError> {
        self.timestamp
            .compare_exchange(
                UNASSIGNED_TIMESTAMP,
                ts,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(|_| ())
            .map_err(|current| TransitionError::TimestampAlreadyAssigned {
                txn_id: self.id,
                current,
            })
    }

    /// Move to `next` if it is a legal edge from the current status
    ///
    /// # Errors
    /// Returns `TransitionError::IllegalTransition` when `next` is not
    /// reachable in one step from the status observed at the time of the call.
    pub fn transition(&self, next: TransactionStatus) -> Result<(), TransitionError> {
        let mut current = self.status.load(Ordering::Acquire);
        loop {
            let from = TransactionStatus::from_tag(current);
            if !from.can_transition_to(next) {
                return Err(TransitionError::IllegalTransition {
                    txn_id: self.id,
                    from,
                    to: next,
                });
            }
            match self.status.compare_exchange_weak(
                current,
                next.to_tag(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(()),
                Err(observed) => current = observed,
            }
        }
    }

    /// Drive the transaction to `Aborted` through `Failed`
    ///
    /// Used for wounds, protocol violations and forced cleanup. Each step is a
    /// legal edge, so concurrent transitions by the owner are never lost.
    ///
    /// Returns `true` if the transaction is `Aborted` afterwards, `false` if
    /// it had already reached `Committed` or `Terminated`.
    pub fn force_abort(&self) -> bool {
        loop {
            let step = match self.status() {
                TransactionStatus::Active | TransactionStatus::PartiallyCommitted => {
                    TransactionStatus::Failed
                }
                TransactionStatus::Failed => TransactionStatus::Aborted,
                TransactionStatus::Aborted => return true,
                TransactionStatus::Committed | TransactionStatus::Terminated => return false,
            };
            // A lost race just means someone else moved the status; re-read.
            let _ = self.transition(step);
        }
    }

    /// Failed or Aborted: nothing may be granted to this transaction anymore
    pub fn is_aborted(&self) -> bool {
        self.status().is_aborted()
    }

    /// Check if transaction is in Active state
    pub fn is_active(&self) -> bool {
        self.status() == TransactionStatus::Active
    }

    /// Check if transaction is committed
    pub fn is_committed(&self) -> bool {
        self.status() == TransactionStatus::Committed
    }

    /// Append a row snapshot to the write log
    pub fn log_object(&self, row: RowSnapshot) {
        self.log.lock().push(row);
    }

    /// Buffered row snapshots in the order they were logged
    pub fn logged_objects(&self) -> Vec<RowSnapshot> {
        self.log.lock().clone()
    }

    /// Number of buffered row snapshots
    pub fn log_len(&self) -> usize {
        self.log.lock().len()
    }

    /// Time since the transaction began
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

/// Live transactions of one protocol engine, keyed by id
#[derive(Debug, Default)]
pub struct TransactionTable {
    live: DashMap<TxnId, Arc<Transaction>>,
}

impl TransactionTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transaction and return the shared handle
    pub fn insert(&self, txn: Transaction) -> Arc<Transaction> {
        let txn = Arc::new(txn);
        self.live.insert(txn.id(), Arc::clone(&txn));
        txn
    }

    /// Look up a live transaction
    pub fn get(&self, id: TxnId) -> Option<Arc<Transaction>> {
        self.live.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Remove a transaction from the live set
    pub fn remove(&self, id: TxnId) -> Option<Arc<Transaction>> {
        self.live.remove(&id).map(|(_, txn)| txn)
    }

    /// Ids of all live transactions, ascending
    pub fn ids(&self) -> Vec<TxnId> {
        let mut ids: Vec<TxnId> = self.live.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();
        ids
    }

    /// Snapshot of all live transaction handles, ascending by id
    pub fn snapshot(&self) -> Vec<Arc<Transaction>> {
        let mut all: Vec<Arc<Transaction>> =
            self.live.iter().map(|entry| Arc::clone(entry.value())).collect();
        all.sort_unstable_by_key(|txn| txn.id());
        all
    }

    /// Number of live transactions
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Whether no transaction is live
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}
