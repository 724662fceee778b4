//! Session state: the manager plus request execution.

use strata_concurrency::{ConcurrencyControlManager, ConcurrencyStats, ValidationOutcome};
use strata_core::{Action, Result, TransactionStatus, TxnId};

use crate::parse::Request;

/// Result of executing one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    /// A transaction was started
    Began(TxnId),
    /// Answer to READ/WRITE
    Outcome(ValidationOutcome),
    /// COMMIT/ABORT finished
    Ended {
        /// Transaction
        tx: TxnId,
        /// Whether it committed
        committed: bool,
    },
    /// Status of a transaction; `None` if it is not live
    Status(TxnId, Option<TransactionStatus>),
    /// Engine counters
    Stats(ConcurrencyStats),
    /// Help text requested
    Help,
    /// Session should end
    Exit,
}

/// Owns the manager for the lifetime of the session
pub struct SessionState {
    manager: ConcurrencyControlManager,
}

impl SessionState {
    /// Wrap an already initialized manager
    pub fn new(manager: ConcurrencyControlManager) -> Self {
        SessionState { manager }
    }

    /// The underlying manager
    pub fn manager(&self) -> &ConcurrencyControlManager {
        &self.manager
    }

    /// Run one request against the manager
    pub fn execute(&self, request: Request) -> Result<Output> {
        let output = match request {
            Request::Begin => Output::Began(self.manager.begin_transaction()?),
            Request::Read { tx, object_id } => {
                Output::Outcome(self.manager.validate_object(&object_id, tx, Action::Read))
            }
            Request::Write { tx, object_id } => {
                Output::Outcome(self.manager.validate_object(&object_id, tx, Action::Write))
            }
            Request::Commit(tx) => Output::Ended {
                tx,
                committed: self.manager.end_transaction(tx, true)?,
            },
            Request::Abort(tx) => Output::Ended {
                tx,
                committed: self.manager.end_transaction(tx, false)?,
            },
            Request::Status(tx) => Output::Status(tx, self.manager.transaction_status(tx)),
            Request::Stats => Output::Stats(self.manager.stats()),
            Request::Help => Output::Help,
            Request::Exit => Output::Exit,
        };
        Ok(output)
    }

    /// Prompt shown in interactive mode
    pub fn prompt(&self) -> String {
        let live = self.manager.active_transactions().len();
        if live == 0 {
            format!("strata-cc:{}> ", self.manager.algorithm())
        } else {
            format!("strata-cc:{}({} live)> ", self.manager.algorithm(), live)
        }
    }
}
