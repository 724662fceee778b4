//! Backward validation for optimistic concurrency control
//!
//! Transactions run in three phases:
//! 1. **Read phase**: every access is allowed; the object id is only
//!    recorded into the transaction's read set or write set.
//! 2. **Validation phase** (at commit): the transaction `Tj` is checked
//!    against every transaction `Ti` already in the committed ledger.
//! 3. **Write phase**: performed by the caller once validation passes.
//!
//! `Tj` passes against `Ti` if either
//! - (a) `Ti.finish_ts < Tj.start_ts` (serial, no overlap), or
//! - (b) `Tj.start_ts < Ti.finish_ts < Tj.validation_ts` and
//!   `Ti.write_set ∩ Tj.read_set = ∅`.
//!
//! All bookkeeping lives behind one mutex so a validation sees one
//! consistent snapshot of the read/write sets and the ledger.

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::hash_map::Entry;
use strata_core::{Action, TxnId};
use tracing::debug;

/// Types of conflicts that can occur during transaction validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictType {
    /// An overlapping committed transaction wrote objects this one read
    ReadWriteConflict {
        /// Committed transaction whose writes were missed
        committed: TxnId,
        /// Objects in `committed.write_set ∩ read_set`, sorted
        objects: Vec<String>,
    },
}

/// Result of transaction validation
///
/// Accumulates all conflicts found during validation.
/// A transaction commits only if is_valid() returns true.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// All conflicts detected during validation
    pub conflicts: Vec<ConflictType>,
}

impl ValidationResult {
    /// Create a successful validation result (no conflicts)
    pub fn ok() -> Self {
        ValidationResult {
            conflicts: Vec::new(),
        }
    }

    /// Create a validation result with a single conflict
    pub fn conflict(conflict: ConflictType) -> Self {
        ValidationResult {
            conflicts: vec![conflict],
        }
    }

    /// Check if validation passed (no conflicts)
    pub fn is_valid(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// Merge another validation result into this one
    pub fn merge(&mut self, other: ValidationResult) {
        self.conflicts.extend(other.conflicts);
    }

    /// Get the number of conflicts
    pub fn conflict_count(&self) -> usize {
        self.conflicts.len()
    }

    /// One-line description of the first conflict, for refusal reasons
    pub fn summary(&self) -> String {
        match self.conflicts.first() {
            None => "validation passed".to_string(),
            Some(ConflictType::ReadWriteConflict { committed, objects }) => format!(
                "validation failed: read {} written by committed transaction {} ({} conflict(s))",
                objects.join(","),
                committed,
                self.conflict_count()
            ),
        }
    }
}

/// Validation bookkeeping of one transaction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationRecord {
    /// Assigned on first touch
    pub start_ts: u64,
    /// Assigned when validation begins
    pub validation_ts: Option<u64>,
    /// Assigned only on successful validation
    pub finish_ts: Option<u64>,
    /// Objects read
    pub read_set: FxHashSet<String>,
    /// Objects written
    pub write_set: FxHashSet<String>,
}

#[derive(Debug, Default)]
struct Ledger {
    clock: u64,
    records: FxHashMap<TxnId, ValidationRecord>,
    committed: Vec<TxnId>,
}

impl Ledger {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Record of `txn_id`, stamping `start_ts` on first touch
    fn record_mut(&mut self, txn_id: TxnId) -> &mut ValidationRecord {
        match self.records.entry(txn_id) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                self.clock += 1;
                entry.insert(ValidationRecord {
                    start_ts: self.clock,
                    ..ValidationRecord::default()
                })
            }
        }
    }
}

/// Validate `tj` against one committed transaction `ti`
///
/// Both records belong to the same ledger, so `ti` finished before `tj`
/// started validating.
pub fn validate_against(
    ti_id: TxnId,
    ti: &ValidationRecord,
    tj: &ValidationRecord,
    tj_validation_ts: u64,
) -> ValidationResult {
    let Some(ti_finish) = ti.finish_ts else {
        return ValidationResult::ok();
    };

    // (a) Ti finished before Tj started
    if ti_finish < tj.start_ts {
        return ValidationResult::ok();
    }

    // (b) Overlapping, but Tj read nothing Ti wrote
    if tj.start_ts < ti_finish && ti_finish < tj_validation_ts {
        let mut objects: Vec<String> = ti
            .write_set
            .intersection(&tj.read_set)
            .cloned()
            .collect();
        if objects.is_empty() {
            return ValidationResult::ok();
        }
        objects.sort_unstable();
        return ValidationResult::conflict(ConflictType::ReadWriteConflict {
            committed: ti_id,
            objects,
        });
    }

    // Ti finished after Tj began validating
    ValidationResult::conflict(ConflictType::ReadWriteConflict {
        committed: ti_id,
        objects: Vec::new(),
    })
}

/// Read/write sets, timestamps and the committed ledger
#[derive(Debug, Default)]
pub struct ValidationManager {
    ledger: Mutex<Ledger>,
}

impl ValidationManager {
    /// Create an empty manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an access during the read phase
    pub fn record_access(&self, txn_id: TxnId, object_id: &str, action: Action) {
        let mut ledger = self.ledger.lock();
        let record = ledger.record_mut(txn_id);
        let set = match action {
            Action::Read => &mut record.read_set,
            Action::Write => &mut record.write_set,
        };
        if !set.contains(object_id) {
            set.insert(object_id.to_string());
        }
    }

    /// Run the validation phase for `txn_id`
    ///
    /// On success the transaction gets its finish timestamp and is appended
    /// to the committed ledger. On failure its record is discarded.
    pub fn validate(&self, txn_id: TxnId) -> ValidationResult {
        let mut ledger = self.ledger.lock();
        ledger.record_mut(txn_id);
        let validation_ts = ledger.tick();

        let mut result = ValidationResult::ok();
        if let Some(tj) = ledger.records.get(&txn_id) {
            for ti_id in &ledger.committed {
                let Some(ti) = ledger.records.get(ti_id) else {
                    continue;
                };
                let earlier = ti.validation_ts.map_or(false, |ts| ts < validation_ts);
                if earlier {
                    result.merge(validate_against(*ti_id, ti, tj, validation_ts));
                }
            }
        }

        if !result.is_valid() {
            ledger.records.remove(&txn_id);
            debug!(
                txn_id = %txn_id,
                conflicts = result.conflict_count(),
                "validation failed"
            );
            return result;
        }

        let finish_ts = ledger.tick();
        if let Some(tj) = ledger.records.get_mut(&txn_id) {
            tj.validation_ts = Some(validation_ts);
            tj.finish_ts = Some(finish_ts);
        }
        ledger.committed.push(txn_id);
        debug!(txn_id = %txn_id, validation_ts, finish_ts, "validation passed");
        result
    }

    /// Discard a transaction's record; it never takes part in later validations
    pub fn on_abort(&self, txn_id: TxnId) {
        let mut ledger = self.ledger.lock();
        if !ledger.committed.contains(&txn_id) {
            ledger.records.remove(&txn_id);
        }
    }

    /// Committed transactions in validation order
    pub fn committed(&self) -> Vec<TxnId> {
        self.ledger.lock().committed.clone()
    }

    /// Copy of a transaction's record, if tracked
    pub fn record(&self, txn_id: TxnId) -> Option<ValidationRecord> {
        self.ledger.lock().records.get(&txn_id).cloned()
    }
}
