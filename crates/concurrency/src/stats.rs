//! Per-engine counters
//!
//! Every protocol engine owns a `StatsRecorder`; the facade exposes a
//! point-in-time [`ConcurrencyStats`] copy of it.

use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of an engine's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConcurrencyStats {
    /// Transactions started
    pub begun: u64,
    /// Transactions whose commit was accepted
    pub committed: u64,
    /// Transactions that ended aborted (explicitly, refused, or wounded)
    pub aborted: u64,
    /// `validate_object` calls that returned `allowed = false`
    pub refusals: u64,
    /// Holders forced to abort by an older requester
    pub wounds: u64,
}

impl ConcurrencyStats {
    /// Transactions begun but not yet ended
    pub fn in_flight(&self) -> u64 {
        self.begun.saturating_sub(self.committed + self.aborted)
    }
}

/// Lock-free counters updated by the engines
#[derive(Debug, Default)]
pub(crate) struct StatsRecorder {
    begun: AtomicU64,
    committed: AtomicU64,
    aborted: AtomicU64,
    refusals: AtomicU64,
    wounds: AtomicU64,
}

impl StatsRecorder {
    pub(crate) fn record_begin(&self) {
        self.begun.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_end(&self, committed: bool) {
        if committed {
            self.committed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.aborted.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_refusal(&self) {
        self.refusals.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_wounds(&self, count: usize) {
        self.wounds.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> ConcurrencyStats {
        ConcurrencyStats {
            begun: self.begun.load(Ordering::Relaxed),
            committed: self.committed.load(Ordering::Relaxed),
            aborted: self.aborted.load(Ordering::Relaxed),
            refusals: self.refusals.load(Ordering::Relaxed),
            wounds: self.wounds.load(Ordering::Relaxed),
        }
    }
}
