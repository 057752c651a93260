//! Warikan Engine Library
//! # Overview
//!
//! Shared-expense ledger for groups: members record payments with payers
//! (creditors) and owers (debtors), edit them one field at a time, and read
//! back a short list of transfers that settles everyone's net balance.
//!
//! # Architecture
//!
//! - [`types`] - Core data types (Group, Payment, AmountEntry, Settlement, ...)
//! - [`core`] - Business logic components:
//!   - [`core::validator`] - Per-field and whole-form entry validation
//!   - [`core::settlement`] - Net balances and greedy transfer matching
//!   - [`core::engine`] - Store side of the ledger edit protocol
//!   - [`core::edit_session`] - Client side of the protocol (debounced flushes)
//!   - [`core::r#async`] - Concurrent store, engine and batch processor
//! - [`io`] - Operation log parsing and settlement output
//! - [`strategy`] - Sequential and concurrent replay pipelines
//! - [`cli`] - CLI arguments parsing
//! - [`logging`] - tracing subscriber setup
//!
//! # Edit Protocol
//!
//! Entries are addressed by a stable identity, never by position. Each field
//! change is an idempotent "set field F of entry E to V"; insert and remove are
//! explicit structural operations. An edit that arrives for an entry that was
//! already removed is a no-op.
//!
//! # Settlement
//!
//! Settlement is recomputed from scratch on every read. A payment whose
//! creditor and debtor totals differ is flagged and left out rather than
//! failing the whole group.

pub mod cli;
pub mod core;
pub mod io;
pub mod logging;
pub mod strategy;
pub mod types;

pub use core::{
    compute_settlement, AsyncLedgerEngine, EditSession, Ledger, LedgerEngine, SessionConfig,
};
pub use io::{write_settlements_csv, write_settlements_json};
pub use types::{
    AmountEntry, EditOutcome, EntryId, FieldValue, Group, GroupId, LedgerError, ListKind,
    Participant, ParticipantId, Payment, PaymentId, Settlement, Transfer,
};
