//! Timestamp source and per-object read/write watermarks
//!
//! `TimestampManager` hands out strictly increasing timestamps and tracks,
//! for every object id, the largest timestamp that has read it (`RT`) and
//! written it (`WT`). Both watermarks start at 0 and only ever move up.
//!
//! The timestamp-ordering engine checks and bumps watermarks through
//! [`TimestampManager::check_read`] / [`TimestampManager::check_write`],
//! which do the comparison and the update under one lock.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Read/write watermark pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Watermarks {
    read: u64,
    write: u64,
}

/// Why a timestamp-ordered access was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimestampViolation {
    /// A younger transaction already wrote the object
    ReadTooLate {
        /// Reader's timestamp
        ts: u64,
        /// Current write watermark
        write_ts: u64,
    },
    /// A younger transaction already read the object
    WriteAfterRead {
        /// Writer's timestamp
        ts: u64,
        /// Current read watermark
        read_ts: u64,
    },
    /// A younger transaction already wrote the object
    WriteTooLate {
        /// Writer's timestamp
        ts: u64,
        /// Current write watermark
        write_ts: u64,
    },
}

impl std::fmt::Display for TimestampViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimestampViolation::ReadTooLate { ts, write_ts } => {
                write!(f, "read at TS {} is older than write timestamp {}", ts, write_ts)
            }
            TimestampViolation::WriteAfterRead { ts, read_ts } => {
                write!(f, "write at TS {} is older than read timestamp {}", ts, read_ts)
            }
            TimestampViolation::WriteTooLate { ts, write_ts } => {
                write!(f, "write at TS {} is older than write timestamp {}", ts, write_ts)
            }
        }
    }
}

/// Global timestamp counter plus the per-object watermark table
#[derive(Debug)]
pub struct TimestampManager {
    next: AtomicU64,
    table: Mutex<FxHashMap<String, Watermarks>>,
}

impl TimestampManager {
    /// Create a manager whose first timestamp is 1
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Create a manager whose first timestamp is `last + 1`
    pub fn starting_at(last: u64) -> Self {
        TimestampManager {
            next: AtomicU64::new(last),
            table: Mutex::new(FxHashMap::default()),
        }
    }

    /// Allocate the next timestamp (strictly increasing, never 0)
    pub fn next_timestamp(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Last timestamp handed out (0 if none)
    pub fn current_timestamp(&self) -> u64 {
        self.next.load(Ordering::SeqCst)
    }

    /// Read watermark of `object_id`
    pub fn read_ts(&self, object_id: &str) -> u64 {
        self.table.lock().get(object_id).map_or(0, |w| w.read)
    }

    /// Write watermark of `object_id`
    pub fn write_ts(&self, object_id: &str) -> u64 {
        self.table.lock().get(object_id).map_or(0, |w| w.write)
    }

    /// `RT(obj) = max(RT(obj), ts)`
    pub fn bump_read_ts(&self, object_id: &str, ts: u64) {
        let mut table = self.table.lock();
        let marks = table.entry(object_id.to_string()).or_default();
        marks.read = marks.read.max(ts);
    }

    /// `WT(obj) = max(WT(obj), ts)`
    pub fn bump_write_ts(&self, object_id: &str, ts: u64) {
        let mut table = self.table.lock();
        let marks = table.entry(object_id.to_string()).or_default();
        marks.write = marks.write.max(ts);
    }

    /// Apply the timestamp-ordering read rule atomically
    ///
    /// Rejects when `ts < WT(obj)`; otherwise bumps `RT(obj)` to at least `ts`.
    pub fn check_read(&self, object_id: &str, ts: u64) -> Result<(), TimestampViolation> {
        let mut table = self.table.lock();
        let marks = table.entry(object_id.to_string()).or_default();
        if ts < marks.write {
            return Err(TimestampViolation::ReadTooLate {
                ts,
                write_ts: marks.write,
            });
        }
        marks.read = marks.read.max(ts);
        Ok(())
    }

    /// Apply the timestamp-ordering write rule atomically
    ///
    /// Rejects when `ts < RT(obj)` or `ts < WT(obj)`; otherwise bumps `WT(obj)`.
    pub fn check_write(&self, object_id: &str, ts: u64) -> Result<(), TimestampViolation> {
        let mut table = self.table.lock();
        let marks = table.entry(object_id.to_string()).or_default();
        if ts < marks.read {
            return Err(TimestampViolation::WriteAfterRead {
                ts,
                read_ts: marks.read,
            });
        }
        if ts < marks.write {
            return Err(TimestampViolation::WriteTooLate {
                ts,
                write_ts: marks.write,
            });
        }
        marks.write = marks.write.max(ts);
        Ok(())
    }
}

impl Default for TimestampManager {
    fn default() -> Self {
        Self::new()
    }
}
