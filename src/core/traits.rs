//! The ledger boundary shared by the synchronous and concurrent engines
//!
//! [`EditSession`](crate::core::EditSession) flushes through this trait, so the
//! same client-side protocol works against either engine.

use crate::core::settlement::compute_settlement;
use crate::types::{
    EditOutcome, EntryId, FieldValue, Group, GroupId, LedgerError, ListKind, Payment, PaymentId,
    Settlement,
};

/// Read and edit access to a ledger, keyed by opaque identifiers
pub trait Ledger {
    /// Group snapshot with all of its payments
    fn get_group(&self, id: &GroupId) -> Result<Group, LedgerError>;

    fn get_payment(&self, id: &PaymentId) -> Result<Payment, LedgerError>;

    /// Set one field of one entry
    ///
    /// Idempotent: applying the same edit again returns
    /// [`EditOutcome::Unchanged`]. An edit for an entry that no longer exists
    /// returns [`EditOutcome::Ignored`].
    fn apply_field_edit(
        &mut self,
        payment: &PaymentId,
        list: ListKind,
        entry: EntryId,
        value: &FieldValue,
    ) -> Result<EditOutcome, LedgerError>;

    /// Append a blank entry and return its freshly generated identity
    fn insert_entry(&mut self, payment: &PaymentId, list: ListKind)
        -> Result<EntryId, LedgerError>;

    /// Remove an entry by identity; absent entries are ignored
    fn remove_entry(
        &mut self,
        payment: &PaymentId,
        list: ListKind,
        entry: EntryId,
    ) -> Result<EditOutcome, LedgerError>;

    /// Recompute the settlement for a group from its current payments
    fn settle(&self, group: &GroupId) -> Result<Settlement, LedgerError> {
        Ok(compute_settlement(&self.get_group(group)?))
    }
}
