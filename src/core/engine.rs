//! Ledger edit engine
//!
//! This module provides the LedgerEngine, the store-side half of the ledger
//! edit protocol. It validates every edit against the group it belongs to and
//! applies it to the [`LedgerStore`].
//!
//! The engine enforces these rules:
//! - Field edits are "set field F of entry E to V": applying one twice leaves
//!   the same state as applying it once.
//! - Insert and remove act on entry identity, never on position.
//! - An edit or removal aimed at an entry that is gone is swallowed as a
//!   no-op. It can legitimately arrive after the entry was removed.
//! - A rejected field (unknown participant, invalid amount) is not committed;
//!   sibling fields are unaffected.
//! - An unknown group or payment aborts the operation with nothing applied.

use crate::core::ledger_store::LedgerStore;
use crate::core::settlement::compute_settlement;
use crate::core::traits::Ledger;
use crate::core::validator::{validate_field, validate_submission};
use crate::types::{
    EditOutcome, EntryDraft, EntryId, FieldValue, Group, GroupId, GroupRecord, LedgerError,
    LedgerOperation, ListKind, OperationRecord, Participant, Payment, PaymentId, Settlement,
};
use std::collections::HashMap;
use tracing::debug;

/// Store-side ledger edit engine
///
/// Owns the [`LedgerStore`] and the mapping from client field keys (as used in
/// an operation log) to store-generated entry identities.
pub struct LedgerEngine {
    store: LedgerStore,
    entry_keys: HashMap<(PaymentId, String), EntryId>,
}

impl LedgerEngine {
    /// Create an engine over an empty store
    pub fn new() -> Self {
        LedgerEngine {
            store: LedgerStore::new(),
            entry_keys: HashMap::new(),
        }
    }

    /// Create an empty group
    ///
    /// # Errors
    ///
    /// Returns `DuplicateGroup` if the id is taken.
    pub fn create_group(&mut self, id: GroupId, title: &str) -> Result<(), LedgerError> {
        self.store.insert_group(GroupRecord::new(id, title))
    }

    pub fn rename_group(&mut self, group: &GroupId, title: &str) -> Result<EditOutcome, LedgerError> {
        self.store
            .update_group(group, |record| Ok(record.set_title(title)))
    }

    /// Delete a group together with its payments
    pub fn delete_group(&mut self, group: &GroupId) -> Result<(), LedgerError> {
        let removed = self.store.remove_group(group)?;
        self.entry_keys
            .retain(|(pid, _), _| !removed.payment_ids.contains(pid));
        Ok(())
    }

    /// Add a member to a group; joining again is a no-op
    pub fn join_group(
        &mut self,
        group: &GroupId,
        participant: Participant,
    ) -> Result<EditOutcome, LedgerError> {
        self.store
            .update_group(group, |record| Ok(record.join(participant)))
    }

    /// Create a payment with empty creditor and debtor lists
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the group does not exist and `DuplicatePayment`
    /// if the payment id is taken.
    pub fn create_payment(
        &mut self,
        group: &GroupId,
        id: PaymentId,
        title: &str,
    ) -> Result<(), LedgerError> {
        self.store
            .insert_payment(Payment::new(id, group.clone(), title))
    }

    pub fn set_title(&mut self, payment: &PaymentId, title: &str) -> Result<EditOutcome, LedgerError> {
        self.store
            .update_payment(payment, |p| Ok(p.set_title(title)))
    }

    /// Delete a payment; it stops contributing to its group's settlement
    pub fn delete_payment(&mut self, payment: &PaymentId) -> Result<(), LedgerError> {
        self.store.remove_payment(payment)?;
        self.entry_keys.retain(|(pid, _), _| pid != payment);
        Ok(())
    }

    /// Replace both entry lists of a payment with a whole-form submission
    ///
    /// The two lists are validated together: if any entry is invalid nothing is
    /// applied and every offending entry is reported in
    /// `LedgerError::RejectedSubmission`.
    pub fn submit_entries(
        &mut self,
        payment: &PaymentId,
        creditors: &[EntryDraft],
        debtors: &[EntryDraft],
    ) -> Result<(), LedgerError> {
        let group = self.owning_group(payment)?;
        validate_submission(group, creditors, debtors)?;
        self.store.update_payment(payment, |p| {
            p.replace_entries(creditors, debtors);
            Ok(())
        })
    }

    /// Process a single operation from an operation log
    ///
    /// Entry keys in the log are mapped to the identities generated on insert.
    /// A key that was never inserted resolves to nothing and the operation is
    /// ignored, like any edit aimed at a missing entry.
    ///
    /// # Returns
    ///
    /// * `Ok(EditOutcome)` - What the operation did
    /// * `Err(LedgerError)` - If the operation was rejected; nothing was applied
    pub fn process(&mut self, record: OperationRecord) -> Result<EditOutcome, LedgerError> {
        let operation = record.operation;
        debug!(line = record.line, op = operation.name(), group = %operation.group(), "processing operation");

        if let Some(payment) = operation.payment_scope() {
            self.check_scope(operation.group(), payment)?;
        }

        match operation {
            LedgerOperation::CreateGroup { group, title } => {
                self.create_group(group, &title)?;
                Ok(EditOutcome::Applied)
            }
            LedgerOperation::RenameGroup { group, title } => self.rename_group(&group, &title),
            LedgerOperation::DeleteGroup { group } => {
                self.delete_group(&group)?;
                Ok(EditOutcome::Applied)
            }
            LedgerOperation::Join { group, participant } => self.join_group(&group, participant),
            LedgerOperation::CreatePayment {
                group,
                payment,
                title,
            } => {
                self.create_payment(&group, payment, &title)?;
                Ok(EditOutcome::Applied)
            }
            LedgerOperation::SetTitle { payment, title, .. } => self.set_title(&payment, &title),
            LedgerOperation::InsertEntry {
                payment, list, key, ..
            } => {
                let entry = self.insert_entry(&payment, list)?;
                self.entry_keys.insert((payment, key), entry);
                Ok(EditOutcome::Applied)
            }
            LedgerOperation::RemoveEntry {
                payment, list, key, ..
            } => match self.resolve_key(&payment, &key) {
                Some(entry) => self.remove_entry(&payment, list, entry),
                None => Ok(EditOutcome::Ignored),
            },
            LedgerOperation::SetField {
                payment,
                list,
                key,
                value,
                ..
            } => match self.resolve_key(&payment, &key) {
                Some(entry) => self.apply_field_edit(&payment, list, entry, &value),
                None => Ok(EditOutcome::Ignored),
            },
            LedgerOperation::DeletePayment { group, payment } => {
                if self.store.payment(&payment).map(|p| &p.group) != Some(&group) {
                    return Err(LedgerError::payment_not_found(&payment));
                }
                self.delete_payment(&payment)?;
                Ok(EditOutcome::Applied)
            }
        }
    }

    /// Settlements for every group, ordered by group id
    pub fn settlements(&self) -> Vec<Settlement> {
        self.store
            .group_ids()
            .iter()
            .filter_map(|id| self.store.group_snapshot(id).ok())
            .map(|group| compute_settlement(&group))
            .collect()
    }

    fn resolve_key(&self, payment: &PaymentId, key: &str) -> Option<EntryId> {
        self.entry_keys
            .get(&(payment.clone(), key.to_string()))
            .copied()
    }

    /// A payment must exist and belong to the group named by the operation
    fn check_scope(&self, group: &GroupId, payment: &PaymentId) -> Result<(), LedgerError> {
        match self.store.payment(payment) {
            Some(p) if &p.group == group => Ok(()),
            _ => Err(LedgerError::payment_not_found(payment)),
        }
    }

    fn owning_group(&self, payment: &PaymentId) -> Result<&GroupRecord, LedgerError> {
        let group = &self
            .store
            .payment(payment)
            .ok_or_else(|| LedgerError::payment_not_found(payment))?
            .group;
        self.store
            .group(group)
            .ok_or_else(|| LedgerError::group_not_found(group))
    }
}

impl Ledger for LedgerEngine {
    fn get_group(&self, id: &GroupId) -> Result<Group, LedgerError> {
        self.store.group_snapshot(id)
    }

    fn get_payment(&self, id: &PaymentId) -> Result<Payment, LedgerError> {
        self.store
            .payment(id)
            .cloned()
            .ok_or_else(|| LedgerError::payment_not_found(id))
    }

    fn apply_field_edit(
        &mut self,
        payment: &PaymentId,
        list: ListKind,
        entry: EntryId,
        value: &FieldValue,
    ) -> Result<EditOutcome, LedgerError> {
        let group = self.owning_group(payment)?;
        if self
            .store
            .payment(payment)
            .and_then(|p| p.entry(list, entry))
            .is_none()
        {
            debug!(error = %LedgerError::unknown_entry(payment, entry), "field edit swallowed");
            return Ok(EditOutcome::Ignored);
        }
        validate_field(group, value)?;

        let outcome = self
            .store
            .update_payment(payment, |p| Ok(p.apply_field(list, entry, value)))?;
        if outcome == EditOutcome::Ignored {
            debug!(error = %LedgerError::unknown_entry(payment, entry), "field edit swallowed");
        }
        Ok(outcome)
    }

    fn insert_entry(&mut self, payment: &PaymentId, list: ListKind) -> Result<EntryId, LedgerError> {
        self.store
            .update_payment(payment, |p| Ok(p.insert_entry(list)))
    }

    fn remove_entry(
        &mut self,
        payment: &PaymentId,
        list: ListKind,
        entry: EntryId,
    ) -> Result<EditOutcome, LedgerError> {
        let outcome = self
            .store
            .update_payment(payment, |p| Ok(p.remove_entry(list, entry)))?;
        if outcome == EditOutcome::Ignored {
            debug!(error = %LedgerError::unknown_entry(payment, entry), "removal swallowed");
        }
        Ok(outcome)
    }
}

impl Default for LedgerEngine {
    fn default() -> Self {
        Self::new()
    }
}
