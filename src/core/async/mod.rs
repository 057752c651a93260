//! Concurrent implementations of core components
//!
//! This module provides thread-safe counterparts of the ledger store and edit
//! engine using DashMap for locking, plus the batch processor that drives
//! them during concurrent replay.
//!
//! # Architecture
//!
//! The async implementations follow the same protocol as the synchronous
//! versions but with concurrent data structures:
//!
//! - **AsyncLedgerStore**: Groups and payments in DashMaps
//! - **AsyncLedgerEngine**: Validates and applies operations, shareable via `Arc`
//! - **BatchProcessor**: Splits batches at group-level barriers and runs each
//!   payment's operations in its own task
//!
//! # Thread Safety
//!
//! - Operations on different payments proceed in parallel
//! - Operations on the same payment are applied in log order
//! - No global locks - fine-grained locking per group and per payment

pub mod batch_processor;
pub mod engine;
pub mod ledger_store;

pub use batch_processor::{BatchProcessor, ProcessingResult};
pub use engine::AsyncLedgerEngine;
pub use ledger_store::AsyncLedgerStore;
