//! Concurrency-control facade
//!
//! `ConcurrencyControlManager` selects one protocol engine at construction
//! and forwards every call to it. Its own lock only sequences
//! initialize/shutdown/algorithm switching against ordinary calls: those
//! take the read side, so engines see full caller concurrency, while the
//! lifecycle operations take the write side. Engine locks are never held
//! while the facade lock is being acquired.
//!
//! ## Lifecycle
//!
//! ```text
//! new ──► initialize ──► begin / validate / end / log ──► shutdown
//!              ▲                                              │
//!              └──────────────────────────────────────────────┘
//! ```
//!
//! Before `initialize` and after `shutdown`, `begin_transaction` and
//! `end_transaction` return `NotInitialized`, validation is refused and
//! `log_object` does nothing.

use crate::config::ConcurrencyConfig;
use crate::protocol::{
    ConcurrencyProtocol, LockBasedProtocol, OptimisticProtocol, TimestampOrderingProtocol,
    ValidationOutcome,
};
use crate::stats::ConcurrencyStats;
use parking_lot::RwLock;
use std::sync::Arc;
use strata_core::{
    Action, Algorithm, Error, RecoveryLog, Result, RowSnapshot, TransactionStatus, TxnId,
};
use tracing::info;

const NOT_INITIALIZED: &str = "manager not initialized";

/// The engine variant currently selected
#[derive(Debug)]
enum Engine {
    Lock(LockBasedProtocol),
    Timestamp(TimestampOrderingProtocol),
    Validation(OptimisticProtocol),
}

macro_rules! dispatch {
    ($engine:expr, $protocol:ident => $body:expr) => {
        match $engine {
            Engine::Lock($protocol) => $body,
            Engine::Timestamp($protocol) => $body,
            Engine::Validation($protocol) => $body,
        }
    };
}

impl Engine {
    fn build(algorithm: Algorithm, recovery: Option<&Arc<dyn RecoveryLog>>) -> Self {
        match algorithm {
            Algorithm::Lock => Engine::Lock(match recovery {
                Some(recovery) => LockBasedProtocol::with_recovery(Arc::clone(recovery)),
                None => LockBasedProtocol::new(),
            }),
            Algorithm::Timestamp => Engine::Timestamp(TimestampOrderingProtocol::new()),
            Algorithm::Validation => Engine::Validation(OptimisticProtocol::new()),
        }
    }
}

struct FacadeState {
    engine: Engine,
    initialized: bool,
    recovery: Option<Arc<dyn RecoveryLog>>,
}

/// Entry point for transaction concurrency control
///
/// # Example
///
/// ```
/// use strata_concurrency::ConcurrencyControlManager;
/// use strata_core::Action;
///
/// let manager = ConcurrencyControlManager::new("timestamp").unwrap();
/// manager.initialize().unwrap();
///
/// let tx = manager.begin_transaction().unwrap();
/// assert!(manager.validate_object("x", tx, Action::Write).allowed);
/// assert!(manager.end_transaction(tx, true).unwrap());
/// manager.shutdown();
/// ```
pub struct ConcurrencyControlManager {
    state: RwLock<FacadeState>,
}

impl ConcurrencyControlManager {
    /// Create a manager for the named algorithm (`lock`, `timestamp`, `validation` or an alias)
    ///
    /// # Errors
    /// `UnsupportedAlgorithm` for any other name.
    pub fn new(algorithm: &str) -> Result<Self> {
        Ok(Self::with_algorithm(algorithm.parse()?))
    }

    /// Create a manager running `algorithm`
    pub fn with_algorithm(algorithm: Algorithm) -> Self {
        Self::build(algorithm, None)
    }

    /// Create a manager from a loaded configuration
    pub fn from_config(config: &ConcurrencyConfig) -> Result<Self> {
        Ok(Self::with_algorithm(config.algorithm()?))
    }

    /// Create a manager whose lock-based engine holds `recovery`
    ///
    /// The handle survives algorithm switches and is handed to every
    /// lock-based engine this manager builds.
    pub fn with_recovery(algorithm: Algorithm, recovery: Arc<dyn RecoveryLog>) -> Self {
        Self::build(algorithm, Some(recovery))
    }

    fn build(algorithm: Algorithm, recovery: Option<Arc<dyn RecoveryLog>>) -> Self {
        ConcurrencyControlManager {
            state: RwLock::new(FacadeState {
                engine: Engine::build(algorithm, recovery.as_ref()),
                initialized: false,
                recovery,
            }),
        }
    }

    /// Algorithm currently in use
    pub fn algorithm(&self) -> Algorithm {
        dispatch!(&self.state.read().engine, p => p.algorithm())
    }

    /// Whether `initialize` has been called since construction or the last `shutdown`
    pub fn is_initialized(&self) -> bool {
        self.state.read().initialized
    }

    /// Make the manager ready for transactions; calling it again is harmless
    pub fn initialize(&self) -> Result<()> {
        let mut state = self.state.write();
        if !state.initialized {
            state.initialized = true;
            let algorithm = dispatch!(&state.engine, p => p.algorithm());
            info!(%algorithm, "concurrency control initialized");
        }
        Ok(())
    }

    /// Force-terminate every live transaction and stop accepting work
    ///
    /// Best effort: state errors met along the way are logged and dropped.
    pub fn shutdown(&self) {
        let mut state = self.state.write();
        dispatch!(&state.engine, p => p.shutdown());
        if state.initialized {
            state.initialized = false;
            info!("concurrency control shut down");
        }
    }

    /// Replace the running engine
    ///
    /// Live transactions of the old engine are force-terminated first. The
    /// initialized flag is kept.
    pub fn switch_algorithm(&self, algorithm: Algorithm) {
        let mut state = self.state.write();
        let previous = dispatch!(&state.engine, p => p.algorithm());
        if previous == algorithm {
            return;
        }
        dispatch!(&state.engine, p => p.shutdown());
        state.engine = Engine::build(algorithm, state.recovery.as_ref());
        info!(from = %previous, to = %algorithm, "concurrency control algorithm switched");
    }

    /// Start a transaction
    ///
    /// # Errors
    /// `NotInitialized` outside `initialize`..`shutdown`.
    pub fn begin_transaction(&self) -> Result<TxnId> {
        let state = self.state.read();
        if !state.initialized {
            return Err(Error::NotInitialized);
        }
        dispatch!(&state.engine, p => p.begin_transaction())
    }

    /// Ask whether `txn_id` may perform `action` on `object_id`
    pub fn validate_object(&self, object_id: &str, txn_id: TxnId, action: Action) -> ValidationOutcome {
        let state = self.state.read();
        if !state.initialized {
            return ValidationOutcome::refused(NOT_INITIALIZED);
        }
        dispatch!(&state.engine, p => p.validate_object(object_id, txn_id, action))
    }

    /// Validate several objects, returning the first refusal
    pub fn validate_objects<S: AsRef<str>>(
        &self,
        object_ids: &[S],
        txn_id: TxnId,
        action: Action,
    ) -> ValidationOutcome {
        let state = self.state.read();
        if !state.initialized {
            return ValidationOutcome::refused(NOT_INITIALIZED);
        }
        dispatch!(&state.engine, p => p.validate_objects(object_ids, txn_id, action))
    }

    /// Commit (`commit = true`) or abort a transaction; returns whether it committed
    ///
    /// A refused commit (failed validation, wounded transaction) is
    /// `Ok(false)`. The transaction is gone from the live set afterwards
    /// either way.
    ///
    /// # Errors
    /// `NotInitialized`, `UnknownTransaction`, or `InvalidTransition`.
    pub fn end_transaction(&self, txn_id: TxnId, commit: bool) -> Result<bool> {
        let state = self.state.read();
        if !state.initialized {
            return Err(Error::NotInitialized);
        }
        dispatch!(&state.engine, p => p.end_transaction(txn_id, commit))
    }

    /// Buffer a row snapshot in a live transaction
    pub fn log_object(&self, row: RowSnapshot, txn_id: TxnId) {
        let state = self.state.read();
        if state.initialized {
            dispatch!(&state.engine, p => p.log_object(row, txn_id));
        }
    }

    /// Rows buffered for a live transaction
    pub fn logged_objects(&self, txn_id: TxnId) -> Vec<RowSnapshot> {
        dispatch!(&self.state.read().engine, p => p.logged_objects(txn_id))
    }

    /// Status of a live transaction
    pub fn transaction_status(&self, txn_id: TxnId) -> Option<TransactionStatus> {
        dispatch!(&self.state.read().engine, p => p.transaction_status(txn_id))
    }

    /// Timestamp of a live transaction
    pub fn transaction_timestamp(&self, txn_id: TxnId) -> Option<u64> {
        dispatch!(&self.state.read().engine, p => p.transaction_timestamp(txn_id))
    }

    /// Live transaction ids, ascending
    pub fn active_transactions(&self) -> Vec<TxnId> {
        dispatch!(&self.state.read().engine, p => p.active_transactions())
    }

    /// Counters of the running engine
    pub fn stats(&self) -> ConcurrencyStats {
        dispatch!(&self.state.read().engine, p => p.stats())
    }
}

impl std::fmt::Debug for ConcurrencyControlManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("ConcurrencyControlManager")
            .field("engine", &state.engine)
            .field("initialized", &state.initialized)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(algorithm: Algorithm) -> ConcurrencyControlManager {
        let manager = ConcurrencyControlManager::with_algorithm(algorithm);
        manager.initialize().unwrap();
        manager
    }

    #[test]
    fn test_new_parses_names() {
        assert_eq!(
            ConcurrencyControlManager::new("lock").unwrap().algorithm(),
            Algorithm::Lock
        );
        assert_eq!(
            ConcurrencyControlManager::new("timestamp").unwrap().algorithm(),
            Algorithm::Timestamp
        );
        assert_eq!(
            ConcurrencyControlManager::new("validation").unwrap().algorithm(),
            Algorithm::Validation
        );
        assert!(matches!(
            ConcurrencyControlManager::new("mvcc"),
            Err(Error::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_from_config() {
        let config = ConcurrencyConfig::for_algorithm(Algorithm::Validation);
        let manager = ConcurrencyControlManager::from_config(&config).unwrap();
        assert_eq!(manager.algorithm(), Algorithm::Validation);
    }

    #[test]
    fn test_calls_before_initialize() {
        let manager = ConcurrencyControlManager::with_algorithm(Algorithm::Lock);
        assert!(!manager.is_initialized());
        assert!(matches!(manager.begin_transaction(), Err(Error::NotInitialized)));
        assert!(matches!(
            manager.end_transaction(TxnId(1), true),
            Err(Error::NotInitialized)
        ));
        let outcome = manager.validate_object("x", TxnId(1), Action::Read);
        assert_eq!(outcome, ValidationOutcome::refused("manager not initialized"));
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let manager = setup(Algorithm::Timestamp);
        let tx = manager.begin_transaction().unwrap();
        manager.initialize().unwrap();
        assert_eq!(manager.active_transactions(), vec![tx]);
    }

    #[test]
    fn test_end_twice_is_unknown() {
        for algorithm in [Algorithm::Lock, Algorithm::Timestamp, Algorithm::Validation] {
            let manager = setup(algorithm);
            let tx = manager.begin_transaction().unwrap();
            assert!(manager.end_transaction(tx, true).unwrap());
            assert!(matches!(
                manager.end_transaction(tx, true),
                Err(Error::UnknownTransaction(id)) if id == tx
            ));
        }
    }

    #[test]
    fn test_shutdown_terminates_live_transactions() {
        let manager = setup(Algorithm::Lock);
        let t1 = manager.begin_transaction().unwrap();
        manager.begin_transaction().unwrap();
        manager.validate_object("x", t1, Action::Write);

        manager.shutdown();
        assert!(!manager.is_initialized());
        assert!(manager.active_transactions().is_empty());
        assert!(matches!(manager.begin_transaction(), Err(Error::NotInitialized)));

        // Restartable
        manager.initialize().unwrap();
        let t3 = manager.begin_transaction().unwrap();
        assert!(manager.validate_object("x", t3, Action::Write).allowed);
    }

    #[test]
    fn test_log_object_gated_on_initialize() {
        let manager = setup(Algorithm::Validation);
        let tx = manager.begin_transaction().unwrap();
        manager.log_object(RowSnapshot::new("t/1", vec![]), tx);
        assert_eq!(manager.logged_objects(tx).len(), 1);

        manager.shutdown();
        manager.log_object(RowSnapshot::new("t/2", vec![]), tx);
        assert!(manager.logged_objects(tx).is_empty());
    }

    #[test]
    fn test_switch_algorithm() {
        let manager = setup(Algorithm::Lock);
        manager.begin_transaction().unwrap();

        manager.switch_algorithm(Algorithm::Validation);
        assert_eq!(manager.algorithm(), Algorithm::Validation);
        assert!(manager.is_initialized());
        assert!(manager.active_transactions().is_empty());

        let tx = manager.begin_transaction().unwrap();
        assert!(manager.validate_object("x", tx, Action::Read).allowed);
    }

    #[test]
    fn test_stats_follow_engine() {
        let manager = setup(Algorithm::Timestamp);
        let t1 = manager.begin_transaction().unwrap();
        let t2 = manager.begin_transaction().unwrap();
        manager.validate_object("x", t2, Action::Write);
        assert!(!manager.validate_object("x", t1, Action::Read).allowed);
        manager.end_transaction(t1, true).unwrap();
        manager.end_transaction(t2, true).unwrap();

        let stats = manager.stats();
        assert_eq!(stats.begun, 2);
        assert_eq!(stats.committed, 1);
        assert_eq!(stats.aborted, 1);
        assert_eq!(stats.refusals, 1);
        assert_eq!(stats.in_flight(), 0);
    }
}
