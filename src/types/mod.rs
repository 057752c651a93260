//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `ledger`: Groups, participants, payments and amount entries
//! - `operation`: Commands replayed from an operation log
//! - `settlement`: Transfers and settlement reports
//! - `error`: Error types for the ledger and settlement engine

pub mod error;
pub mod ledger;
pub mod operation;
pub mod settlement;

pub use error::{EntryViolation, LedgerError};
pub use ledger::{
    AmountEntry, EditOutcome, EntryDraft, EntryField, EntryId, FieldValue, Group, GroupId,
    GroupRecord, ListKind, Participant, ParticipantId, Payment, PaymentId,
};
pub use operation::{LedgerOperation, OperationRecord};
pub use settlement::{FlaggedPayment, Settlement, Transfer};
