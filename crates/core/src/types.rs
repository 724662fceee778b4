//! Core identifier and selector types
//!
//! - `TxnId`: transaction identifier handed out by the active protocol
//! - `Action`: whether a validated access reads or writes the object
//! - `Algorithm`: which concurrency-control protocol the facade runs
//! - `TransactionStatus`: lifecycle states shared by all protocols

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique transaction identifier
///
/// Assigned sequentially by the protocol engine at `begin_transaction`.
/// Under timestamp ordering the id doubles as the transaction timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TxnId(pub u64);

impl TxnId {
    /// Create a transaction id from its raw value
    pub const fn new(raw: u64) -> Self {
        TxnId(raw)
    }

    /// Raw numeric value
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TxnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TxnId {
    fn from(raw: u64) -> Self {
        TxnId(raw)
    }
}

impl FromStr for TxnId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(TxnId)
    }
}

/// Kind of access being validated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// The caller is about to read the object
    Read,
    /// The caller is about to write the object
    Write,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Read => write!(f, "read"),
            Action::Write => write!(f, "write"),
        }
    }
}

/// Concurrency-control protocol selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// Two-phase locking with wound-wait deadlock avoidance
    Lock,
    /// Basic timestamp ordering
    Timestamp,
    /// Optimistic concurrency control (backward validation)
    Validation,
}

impl Algorithm {
    /// Canonical configuration name
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Lock => "lock",
            Algorithm::Timestamp => "timestamp",
            Algorithm::Validation => "validation",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lock" | "locking" | "2pl" => Ok(Algorithm::Lock),
            "timestamp" | "ts" | "timestamp-ordering" => Ok(Algorithm::Timestamp),
            "validation" | "occ" | "optimistic" => Ok(Algorithm::Validation),
            _ => Err(Error::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

/// Status of a transaction in its lifecycle
///
/// Legal transitions:
/// - `Active` → `PartiallyCommitted` → `Committed` → `Terminated`
/// - `Active` → `Failed` → `Aborted` → `Terminated`
/// - `PartiallyCommitted` → `Failed`
///
/// No transition may skip a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionStatus {
    /// Executing; may read and write
    Active,
    /// Finished its last operation, commit in progress
    PartiallyCommitted,
    /// Commit accepted
    Committed,
    /// Cannot proceed normally; must roll back
    Failed,
    /// Rolled back
    Aborted,
    /// Removed from the system
    Terminated,
}

impl TransactionStatus {
    /// Whether `self → next` is an edge of the lifecycle graph
    pub fn can_transition_to(self, next: TransactionStatus) -> bool {
        use TransactionStatus::*;
        matches!(
            (self, next),
            (Active, PartiallyCommitted)
                | (Active, Failed)
                | (PartiallyCommitted, Committed)
                | (PartiallyCommitted, Failed)
                | (Failed, Aborted)
                | (Committed, Terminated)
                | (Aborted, Terminated)
        )
    }

    /// Failed or Aborted: the transaction can no longer be granted anything
    pub fn is_aborted(self) -> bool {
        matches!(self, TransactionStatus::Failed | TransactionStatus::Aborted)
    }

    /// Compact tag used by atomic status cells
    pub fn to_tag(self) -> u8 {
        match self {
            TransactionStatus::Active => 0,
            TransactionStatus::PartiallyCommitted => 1,
            TransactionStatus::Committed => 2,
            TransactionStatus::Failed => 3,
            TransactionStatus::Aborted => 4,
            TransactionStatus::Terminated => 5,
        }
    }

    /// Inverse of `to_tag`; unknown tags map to `Terminated`
    pub fn from_tag(tag: u8) -> Self {
        match tag {
            0 => TransactionStatus::Active,
            1 => TransactionStatus::PartiallyCommitted,
            2 => TransactionStatus::Committed,
            3 => TransactionStatus::Failed,
            4 => TransactionStatus::Aborted,
            _ => TransactionStatus::Terminated,
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransactionStatus::Active => "ACTIVE",
            TransactionStatus::PartiallyCommitted => "PARTIALLY_COMMITTED",
            TransactionStatus::Committed => "COMMITTED",
            TransactionStatus::Failed => "FAILED",
            TransactionStatus::Aborted => "ABORTED",
            TransactionStatus::Terminated => "TERMINATED",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_txn_id_display_and_parse() {
        let id = TxnId::new(42);
        assert_eq!(id.to_string(), "42");
        assert_eq!("42".parse::<TxnId>().unwrap(), id);
        assert!("x".parse::<TxnId>().is_err());
    }

    #[test]
    fn test_algorithm_parse_canonical_and_aliases() {
        assert_eq!("lock".parse::<Algorithm>().unwrap(), Algorithm::Lock);
        assert_eq!("2PL".parse::<Algorithm>().unwrap(), Algorithm::Lock);
        assert_eq!("timestamp".parse::<Algorithm>().unwrap(), Algorithm::Timestamp);
        assert_eq!(" ts ".parse::<Algorithm>().unwrap(), Algorithm::Timestamp);
        assert_eq!("validation".parse::<Algorithm>().unwrap(), Algorithm::Validation);
        assert_eq!("occ".parse::<Algorithm>().unwrap(), Algorithm::Validation);
    }

    #[test]
    fn test_algorithm_parse_unsupported() {
        let err = "mvcc".parse::<Algorithm>().unwrap_err();
        assert!(matches!(err, Error::UnsupportedAlgorithm(ref name) if name == "mvcc"));
    }

    #[test]
    fn test_algorithm_round_trips_through_display() {
        for algo in [Algorithm::Lock, Algorithm::Timestamp, Algorithm::Validation] {
            assert_eq!(algo.to_string().parse::<Algorithm>().unwrap(), algo);
        }
    }

    #[test]
    fn test_status_legal_edges() {
        use TransactionStatus::*;
        assert!(Active.can_transition_to(PartiallyCommitted));
        assert!(Active.can_transition_to(Failed));
        assert!(PartiallyCommitted.can_transition_to(Committed));
        assert!(PartiallyCommitted.can_transition_to(Failed));
        assert!(Failed.can_transition_to(Aborted));
        assert!(Committed.can_transition_to(Terminated));
        assert!(Aborted.can_transition_to(Terminated));
    }

    #[test]
    fn test_status_no_skipping() {
        use TransactionStatus::*;
        assert!(!Active.can_transition_to(Committed));
        assert!(!Active.can_transition_to(Aborted));
        assert!(!Active.can_transition_to(Terminated));
        assert!(!Failed.can_transition_to(Terminated));
        assert!(!Committed.can_transition_to(Aborted));
        assert!(!Terminated.can_transition_to(Active));
        assert!(!Active.can_transition_to(Active));
    }

    #[test]
    fn test_status_tag_round_trip() {
        use TransactionStatus::*;
        for s in [Active, PartiallyCommitted, Committed, Failed, Aborted, Terminated] {
            assert_eq!(TransactionStatus::from_tag(s.to_tag()), s);
        }
    }

    #[test]
    fn test_status_is_aborted() {
        use TransactionStatus::*;
        assert!(Failed.is_aborted());
        assert!(Aborted.is_aborted());
        assert!(!Active.is_aborted());
        assert!(!Terminated.is_aborted());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn algorithm_parse_ignores_case_and_padding(
                algo in prop_oneof![
                    Just(Algorithm::Lock),
                    Just(Algorithm::Timestamp),
                    Just(Algorithm::Validation),
                ],
                upper in any::<bool>(),
                pad in 0usize..3,
            ) {
                let name = if upper {
                    algo.as_str().to_ascii_uppercase()
                } else {
                    algo.as_str().to_string()
                };
                let padded = format!("{}{}{}", " ".repeat(pad), name, " ".repeat(pad));
                prop_assert_eq!(padded.parse::<Algorithm>().unwrap(), algo);
            }

            #[test]
            fn txn_id_parse_inverts_display(raw in any::<u64>()) {
                let id = TxnId(raw);
                prop_assert_eq!(id.to_string().parse::<TxnId>().unwrap(), id);
            }

            #[test]
            fn unknown_tags_map_to_terminated(tag in 6u8..) {
                prop_assert_eq!(TransactionStatus::from_tag(tag), TransactionStatus::Terminated);
            }
        }
    }
}
