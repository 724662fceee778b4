//! Lock table for two-phase locking with wound-wait
//!
//! Acquisition is non-blocking: a request is either granted on the spot or
//! refused, and a refused requester retries from the caller side.
//!
//! ## Wound-Wait
//!
//! On conflict, transaction ages are compared by timestamp (smaller = older):
//! - an older requester **wounds** every younger conflicting holder, forcing
//!   it to `Aborted`
//! - a younger requester **waits** (is refused without side effects)
//!
//! The requester is refused in both cases. Only older transactions ever
//! pre-empt younger ones, so no cycle of waiters can form and the oldest
//! transaction in the system always makes progress.
//!
//! ## Locking discipline
//!
//! Each object id maps to its own `Mutex<LockTableEntry>`; the map itself is
//! a `DashMap` that only guards insertion. Code in this module holds at most
//! one entry mutex at a time.
//!
//! A wounded holder keeps its lock records until its own
//! `end_transaction` releases them.

use crate::transaction::Transaction;
use dashmap::DashMap;
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;
use strata_core::TxnId;
use tracing::{debug, warn};

/// Lock modes for read/write access
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LockMode {
    /// Shared lock for reads (multiple readers allowed)
    Shared,
    /// Exclusive lock for writes (single writer, no readers)
    Exclusive,
}

impl LockMode {
    /// Whether a lock of mode `self` already satisfies a request for `wanted`
    pub fn covers(self, wanted: LockMode) -> bool {
        self >= wanted
    }

    /// Whether a holder in mode `self` blocks another transaction requesting `wanted`
    pub fn conflicts_with(self, wanted: LockMode) -> bool {
        matches!(self, LockMode::Exclusive) || matches!(wanted, LockMode::Exclusive)
    }
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockMode::Shared => write!(f, "shared"),
            LockMode::Exclusive => write!(f, "exclusive"),
        }
    }
}

/// A lock held by a transaction
#[derive(Debug, Clone)]
pub struct LockHolder {
    /// Transaction holding the lock
    pub txn: Arc<Transaction>,
    /// Mode the lock is held in
    pub mode: LockMode,
}

/// Holders of one object id
///
/// Invariant: `mode == Some(Exclusive)` ⇒ exactly one holder;
/// `mode == Some(Shared)` ⇒ every holder is shared; no holders ⇒ `mode == None`.
#[derive(Debug, Default)]
pub struct LockTableEntry {
    holders: SmallVec<[LockHolder; 4]>,
    mode: Option<LockMode>,
}

impl LockTableEntry {
    /// Mode currently held, if any
    pub fn mode(&self) -> Option<LockMode> {
        self.mode
    }

    /// Holders in acquisition order
    pub fn holders(&self) -> &[LockHolder] {
        &self.holders
    }

    fn held_by(&self, txn_id: TxnId) -> Option<LockMode> {
        self.holders
            .iter()
            .find(|h| h.txn.id() == txn_id)
            .map(|h| h.mode)
    }

    fn recompute_mode(&mut self) {
        self.mode = if self.holders.is_empty() {
            None
        } else if self.holders.iter().any(|h| h.mode == LockMode::Exclusive) {
            Some(LockMode::Exclusive)
        } else {
            Some(LockMode::Shared)
        };
    }

    /// Drop every record of `txn_id`; returns how many were removed
    fn release(&mut self, txn_id: TxnId) -> usize {
        let before = self.holders.len();
        self.holders.retain(|h| h.txn.id() != txn_id);
        let released = before - self.holders.len();
        if released > 0 {
            self.recompute_mode();
        }
        released
    }
}

/// Result of a single acquisition attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockOutcome {
    /// The lock is held in (at least) the requested mode
    Granted,
    /// Held shared, sole holder, now exclusive
    Upgraded,
    /// Requester is no longer active (wounded, aborted or already ending); nothing granted
    RequesterInactive,
    /// Requester is older; these younger holders were wounded
    Wounded(Vec<TxnId>),
    /// Requester is younger than (or already wounded) every conflicting holder
    Wait(Vec<TxnId>),
}

impl LockOutcome {
    /// Whether the caller may proceed
    pub fn is_granted(&self) -> bool {
        matches!(self, LockOutcome::Granted | LockOutcome::Upgraded)
    }
}

/// Lock table keyed by object id
#[derive(Debug, Default)]
pub struct LockManager {
    table: DashMap<String, Arc<Mutex<LockTableEntry>>>,
}

impl LockManager {
    /// Create an empty lock table
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry for `object_id`, created lazily and never removed
    fn entry(&self, object_id: &str) -> Arc<Mutex<LockTableEntry>> {
        if let Some(entry) = self.table.get(object_id) {
            return Arc::clone(entry.value());
        }
        Arc::clone(
            self.table
                .entry(object_id.to_string())
                .or_default()
                .value(),
        )
    }

    /// Try to take a shared lock; `false` if it cannot be granted right now
    pub fn acquire_shared(&self, object_id: &str, txn: &Arc<Transaction>) -> bool {
        self.acquire(object_id, txn, LockMode::Shared).is_granted()
    }

    /// Try to take an exclusive lock; `false` if it cannot be granted right now
    pub fn acquire_exclusive(&self, object_id: &str, txn: &Arc<Transaction>) -> bool {
        self.acquire(object_id, txn, LockMode::Exclusive).is_granted()
    }

    /// Single non-blocking acquisition attempt under wound-wait
    pub fn acquire(&self, object_id: &str, txn: &Arc<Transaction>, mode: LockMode) -> LockOutcome {
        let entry = self.entry(object_id);
        let mut entry = entry.lock();

        // Status may have been flipped by a wound or a concurrent end since
        // the caller looked. Checked under the entry lock so release_all
        // cannot miss a holder pushed here.
        if !txn.is_active() {
            return LockOutcome::RequesterInactive;
        }

        let requester = txn.id();
        let held = entry.held_by(requester);
        if let Some(held) = held {
            if held.covers(mode) {
                return LockOutcome::Granted;
            }
        }

        let conflicting: SmallVec<[Arc<Transaction>; 4]> = entry
            .holders
            .iter()
            .filter(|h| h.txn.id() != requester && h.mode.conflicts_with(mode))
            .map(|h| Arc::clone(&h.txn))
            .collect();

        if conflicting.is_empty() {
            if held.is_some() {
                // Shared → exclusive, and nobody else holds the object
                for holder in entry.holders.iter_mut() {
                    if holder.txn.id() == requester {
                        holder.mode = LockMode::Exclusive;
                    }
                }
                entry.mode = Some(LockMode::Exclusive);
                debug!(txn_id = %requester, object_id, "lock upgraded to exclusive");
                return LockOutcome::Upgraded;
            }
            entry.holders.push(LockHolder {
                txn: Arc::clone(txn),
                mode,
            });
            entry.recompute_mode();
            debug!(txn_id = %requester, object_id, %mode, "lock granted");
            return LockOutcome::Granted;
        }

        let requester_age = txn.timestamp().unwrap_or(u64::MAX);
        let mut wounded = Vec::new();
        let mut blockers = Vec::new();
        for holder in conflicting {
            let holder_age = holder.timestamp().unwrap_or(u64::MAX);
            if requester_age < holder_age && !holder.is_aborted() && holder.force_abort() {
                warn!(
                    txn_id = %requester,
                    victim = %holder.id(),
                    object_id,
                    "wounded younger lock holder"
                );
                wounded.push(holder.id());
            } else {
                blockers.push(holder.id());
            }
        }

        if wounded.is_empty() {
            debug!(txn_id = %requester, object_id, %mode, ?blockers, "lock refused, must wait");
            LockOutcome::Wait(blockers)
        } else {
            LockOutcome::Wounded(wounded)
        }
    }

    /// Release every lock held by `txn_id`; returns the number of records dropped
    ///
    /// A no-op for a transaction holding nothing.
    pub fn release_all(&self, txn_id: TxnId) -> usize {
        let entries: Vec<Arc<Mutex<LockTableEntry>>> = self
            .table
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut released = 0;
        for entry in entries {
            released += entry.lock().release(txn_id);
        }
        if released > 0 {
            debug!(txn_id = %txn_id, released, "locks released");
        }
        released
    }

    /// Current holders of `object_id` as `(txn, mode)` pairs
    pub fn holders(&self, object_id: &str) -> Vec<(TxnId, LockMode)> {
        let Some(entry) = self.table.get(object_id).map(|e| Arc::clone(e.value())) else {
            return Vec::new();
        };
        let entry = entry.lock();
        entry.holders.iter().map(|h| (h.txn.id(), h.mode)).collect()
    }

    /// Mode currently held on `object_id`, if any
    pub fn mode(&self, object_id: &str) -> Option<LockMode> {
        let entry = self.table.get(object_id).map(|e| Arc::clone(e.value()))?;
        let mode = entry.lock().mode();
        mode
    }

    /// Number of object ids that have ever been locked
    pub fn entry_count(&self) -> usize {
        self.table.len()
    }
}
