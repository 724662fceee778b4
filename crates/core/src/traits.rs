//! Boundary traits for collaborators outside the core
//!
//! The write-ahead log and checkpointing live in a separate recovery
//! component. The lock-based engine accepts a handle to it at construction
//! so the database can wire the two together, but the core itself never
//! calls into it.

use crate::types::TxnId;
use crate::value::RowSnapshot;

/// Recovery/logging collaborator
///
/// Thread safety: implementations are shared across caller threads and must
/// be `Send + Sync`.
pub trait RecoveryLog: Send + Sync {
    /// A transaction started
    fn on_begin(&self, txn_id: TxnId);

    /// A buffered row snapshot belongs to `txn_id`
    fn on_log(&self, txn_id: TxnId, row: &RowSnapshot);

    /// A transaction committed
    fn on_commit(&self, txn_id: TxnId);

    /// A transaction aborted
    fn on_abort(&self, txn_id: TxnId);
}
