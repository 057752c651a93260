//! Core business logic module
//!
//! This module contains the ledger and settlement components:
//! - `validator` - Amount entry validation and the read-time balance check
//! - `settlement` - Net balances and transfer matching
//! - `ledger_store` - In-memory storage for groups and payments
//! - `engine` - Store side of the ledger edit protocol
//! - `edit_session` - Client side of the protocol (debounced field flushes)
//! - `traits` - The `Ledger` boundary shared by both engines
//! - `async` - Concurrent store, engine and batch processor

pub mod r#async;
pub mod edit_session;
pub mod engine;
pub mod ledger_store;
pub mod settlement;
pub mod traits;
pub mod validator;

pub use edit_session::{EditSession, FieldKey, SessionConfig};
pub use engine::LedgerEngine;
pub use ledger_store::LedgerStore;
pub use r#async::{AsyncLedgerEngine, AsyncLedgerStore, BatchProcessor};
pub use settlement::compute_settlement;
pub use traits::Ledger;
