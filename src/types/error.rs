//! Error types for the settlement engine
//!
//! This module defines all error types that can occur while editing a group's
//! ledger, replaying an operation log, or computing a settlement.
//!
//! # Error Categories
//!
//! - **Edit Errors**: unknown participant, invalid amount. Surfaced per field;
//!   they block that field's commit and nothing else.
//! - **Lookup Errors**: unknown entry (swallowed as a no-op by the protocol),
//!   group or payment not found (aborts the operation).
//! - **Read-time Flags**: unbalanced payment, incomplete entry, arithmetic
//!   overflow. Attached to a settlement report instead of failing it.
//! - **Input Errors**: file not found, I/O, CSV parsing, malformed operations.

use super::ledger::ListKind;
use thiserror::Error;

/// A single entry rejected during whole-form validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryViolation {
    /// Which list the entry was submitted in
    pub list: ListKind,
    /// Position of the entry within the submitted list
    pub index: usize,
    /// Why it was rejected
    pub error: LedgerError,
}

/// Main error type for the ledger and settlement engine
///
/// Each variant carries enough context to be rendered inline next to the
/// offending field or logged against the offending operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// An amount entry references someone who is not a member of the group
    #[error("Participant '{participant}' is not a member of group {group}")]
    UnknownParticipant {
        /// The participant that was referenced
        participant: String,
        /// The group the payment belongs to
        group: String,
    },

    /// Amount is zero, negative, or not an integer in minor units
    #[error("Invalid amount '{amount}': must be a positive integer in minor units")]
    InvalidAmount {
        /// The rejected amount as submitted
        amount: String,
    },

    /// Creditor and debtor totals differ when the payment is read for settlement
    #[error("Payment {payment} is unbalanced: creditors {creditors}, debtors {debtors}")]
    UnbalancedPayment {
        /// Payment identifier
        payment: String,
        /// Sum of complete creditor entries
        creditors: i64,
        /// Sum of complete debtor entries
        debtors: i64,
    },

    /// An entry has one field filled in and the other still blank
    ///
    /// Read-time flag: the payment is left out of settlement until the entry
    /// is completed or removed.
    #[error("Payment {payment} has an incomplete {list} entry {entry}")]
    IncompleteEntry {
        /// Payment identifier
        payment: String,
        /// Which list the entry is in
        list: ListKind,
        /// Entry identifier
        entry: String,
    },

    /// An edit or removal targets an entry that does not exist
    ///
    /// The edit protocol treats this as an idempotent no-op: it legitimately
    /// happens when a buffered edit arrives after its entry was removed.
    #[error("Entry {entry} not found in payment {payment}")]
    UnknownEntry {
        /// Payment identifier
        payment: String,
        /// Entry identifier
        entry: String,
    },

    /// A whole-form submission was rejected as a unit
    ///
    /// Carries every offending entry so each can be surfaced next to its field.
    #[error("Submission rejected: {} invalid entries", violations.len())]
    RejectedSubmission {
        /// One violation per offending entry
        violations: Vec<EntryViolation>,
    },

    /// A group or payment identifier does not resolve
    #[error("{kind} {id} not found")]
    NotFound {
        /// What was looked up ("Group" or "Payment")
        kind: &'static str,
        /// The identifier that failed to resolve
        id: String,
    },

    /// A group with the same identifier already exists
    #[error("Group {group} already exists")]
    DuplicateGroup {
        /// Group identifier
        group: String,
    },

    /// A payment with the same identifier already exists
    #[error("Payment {payment} already exists")]
    DuplicatePayment {
        /// Payment identifier
        payment: String,
    },

    /// Summing amounts would overflow
    #[error("Arithmetic overflow in {operation} for payment {payment}")]
    ArithmeticOverflow {
        /// Operation that would overflow
        operation: String,
        /// Payment identifier
        payment: String,
    },

    /// An operation log row is well-formed CSV but not a valid operation
    #[error("Invalid operation '{op}'{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    InvalidOperation {
        /// The op column as written
        op: String,
        /// Line number (if available)
        line: Option<u64>,
        /// What is wrong with the row
        message: String,
    },

    /// File not found at the specified path
    #[error("File not found: {path}")]
    FileNotFound {
        /// The path that was not found
        path: String,
    },

    /// I/O error occurred while reading or writing
    #[error("I/O error: {message}")]
    IoError {
        /// Description of the I/O error
        message: String,
    },

    /// CSV parsing error occurred
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    ParseError {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        /// Description of the parsing error
        message: String,
    },
}

impl From<std::io::Error> for LedgerError {
    fn from(error: std::io::Error) -> Self {
        if error.kind() == std::io::ErrorKind::NotFound {
            return LedgerError::FileNotFound {
                path: error.to_string(),
            };
        }
        LedgerError::IoError {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for LedgerError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        LedgerError::ParseError {
            line,
            message: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(error: serde_json::Error) -> Self {
        LedgerError::IoError {
            message: error.to_string(),
        }
    }
}

// Helper functions for creating common errors

impl LedgerError {
    /// Create an UnknownParticipant error
    pub fn unknown_participant(participant: impl ToString, group: impl ToString) -> Self {
        LedgerError::UnknownParticipant {
            participant: participant.to_string(),
            group: group.to_string(),
        }
    }

    /// Create an InvalidAmount error
    pub fn invalid_amount(amount: impl ToString) -> Self {
        LedgerError::InvalidAmount {
            amount: amount.to_string(),
        }
    }

    /// Create an UnbalancedPayment error
    pub fn unbalanced_payment(payment: impl ToString, creditors: i64, debtors: i64) -> Self {
        LedgerError::UnbalancedPayment {
            payment: payment.to_string(),
            creditors,
            debtors,
        }
    }

    /// Create an IncompleteEntry error
    pub fn incomplete_entry(payment: impl ToString, list: ListKind, entry: impl ToString) -> Self {
        LedgerError::IncompleteEntry {
            payment: payment.to_string(),
            list,
            entry: entry.to_string(),
        }
    }

    /// Create an UnknownEntry error
    pub fn unknown_entry(payment: impl ToString, entry: impl ToString) -> Self {
        LedgerError::UnknownEntry {
            payment: payment.to_string(),
            entry: entry.to_string(),
        }
    }

    /// Create a NotFound error for a group
    pub fn group_not_found(group: impl ToString) -> Self {
        LedgerError::NotFound {
            kind: "Group",
            id: group.to_string(),
        }
    }

    /// Create a NotFound error for a payment
    pub fn payment_not_found(payment: impl ToString) -> Self {
        LedgerError::NotFound {
            kind: "Payment",
            id: payment.to_string(),
        }
    }

    /// Create a DuplicateGroup error
    pub fn duplicate_group(group: impl ToString) -> Self {
        LedgerError::DuplicateGroup {
            group: group.to_string(),
        }
    }

    /// Create a DuplicatePayment error
    pub fn duplicate_payment(payment: impl ToString) -> Self {
        LedgerError::DuplicatePayment {
            payment: payment.to_string(),
        }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(operation: &str, payment: impl ToString) -> Self {
        LedgerError::ArithmeticOverflow {
            operation: operation.to_string(),
            payment: payment.to_string(),
        }
    }

    /// Create an InvalidOperation error
    pub fn invalid_operation(op: &str, line: Option<u64>, message: impl ToString) -> Self {
        LedgerError::InvalidOperation {
            op: op.to_string(),
            line,
            message: message.to_string(),
        }
    }

    /// Whether the protocol should swallow this error as an idempotent no-op
    pub fn is_benign(&self) -> bool {
        matches!(self, LedgerError::UnknownEntry { .. })
    }
}
