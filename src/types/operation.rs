//! Ledger operations as replayed from an operation log
//!
//! Each row of the log is one command dispatched to the ledger. Entries are
//! addressed by a client-side key (the editor's field key); the engine maps
//! that key to the store-generated [`EntryId`](super::EntryId) when the
//! `insert` for it is applied.

use super::ledger::{FieldValue, GroupId, ListKind, Participant, PaymentId};

/// A single command against the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerOperation {
    /// Create an empty group
    CreateGroup { group: GroupId, title: String },

    /// Rename a group
    RenameGroup { group: GroupId, title: String },

    /// Delete a group together with all of its payments
    DeleteGroup { group: GroupId },

    /// Add a member to a group
    Join {
        group: GroupId,
        participant: Participant,
    },

    /// Create a payment with empty creditor and debtor lists
    CreatePayment {
        group: GroupId,
        payment: PaymentId,
        title: String,
    },

    /// Rename a payment
    SetTitle {
        group: GroupId,
        payment: PaymentId,
        title: String,
    },

    /// Append a blank entry, remembered under `key`
    InsertEntry {
        group: GroupId,
        payment: PaymentId,
        list: ListKind,
        key: String,
    },

    /// Remove the entry remembered under `key`
    RemoveEntry {
        group: GroupId,
        payment: PaymentId,
        list: ListKind,
        key: String,
    },

    /// Set one field of the entry remembered under `key`
    SetField {
        group: GroupId,
        payment: PaymentId,
        list: ListKind,
        key: String,
        value: FieldValue,
    },

    /// Delete a payment and all its entries
    DeletePayment { group: GroupId, payment: PaymentId },
}

impl LedgerOperation {
    /// Short name of the operation, as written in the log
    pub fn name(&self) -> &'static str {
        match self {
            LedgerOperation::CreateGroup { .. } => "group",
            LedgerOperation::RenameGroup { .. } => "retitle_group",
            LedgerOperation::DeleteGroup { .. } => "delete_group",
            LedgerOperation::Join { .. } => "join",
            LedgerOperation::CreatePayment { .. } => "payment",
            LedgerOperation::SetTitle { .. } => "title",
            LedgerOperation::InsertEntry { .. } => "insert",
            LedgerOperation::RemoveEntry { .. } => "remove",
            LedgerOperation::SetField { .. } => "set",
            LedgerOperation::DeletePayment { .. } => "delete",
        }
    }

    pub fn group(&self) -> &GroupId {
        match self {
            LedgerOperation::CreateGroup { group, .. }
            | LedgerOperation::RenameGroup { group, .. }
            | LedgerOperation::DeleteGroup { group }
            | LedgerOperation::Join { group, .. }
            | LedgerOperation::CreatePayment { group, .. }
            | LedgerOperation::SetTitle { group, .. }
            | LedgerOperation::InsertEntry { group, .. }
            | LedgerOperation::RemoveEntry { group, .. }
            | LedgerOperation::SetField { group, .. }
            | LedgerOperation::DeletePayment { group, .. } => group,
        }
    }

    /// The payment this operation is confined to, if any
    ///
    /// Operations that return `None` change group-level state (membership or
    /// the group's payment list) and must be applied in log order relative to
    /// everything else. Operations confined to one payment commute with
    /// operations on other payments.
    pub fn payment_scope(&self) -> Option<&PaymentId> {
        match self {
            LedgerOperation::SetTitle { payment, .. }
            | LedgerOperation::InsertEntry { payment, .. }
            | LedgerOperation::RemoveEntry { payment, .. }
            | LedgerOperation::SetField { payment, .. } => Some(payment),
            LedgerOperation::CreateGroup { .. }
            | LedgerOperation::RenameGroup { .. }
            | LedgerOperation::DeleteGroup { .. }
            | LedgerOperation::Join { .. }
            | LedgerOperation::CreatePayment { .. }
            | LedgerOperation::DeletePayment { .. } => None,
        }
    }
}

/// An operation together with the log line it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRecord {
    pub line: u64,
    pub operation: LedgerOperation,
}
