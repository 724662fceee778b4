//! Core types and traits for the Strata concurrency-control core
//!
//! This crate defines the foundational types used throughout the system:
//! - TxnId: transaction identifier
//! - Action: read or write access being validated
//! - Algorithm: protocol selector (`lock | timestamp | validation`)
//! - TransactionStatus: lifecycle states and their legal edges
//! - Value / RowSnapshot: row images buffered by `log_object`
//! - Error / TransitionError: error type hierarchy
//! - RecoveryLog: boundary trait for the recovery collaborator

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod traits;
pub mod types;
pub mod value;

pub use error::{Error, Result, TransitionError};
pub use traits::RecoveryLog;
pub use types::{Action, Algorithm, TransactionStatus, TxnId};
pub use value::{RowSnapshot, Value};
