//! Ledger edit engine for concurrent replay
//!
//! This module provides the `AsyncLedgerEngine` struct, the thread-safe
//! counterpart of [`LedgerEngine`](crate::core::LedgerEngine). It applies the
//! same protocol rules over an [`AsyncLedgerStore`] and can be shared between
//! tokio tasks behind an `Arc`.
//!
//! # Architecture
//!
//! ```text
//! AsyncLedgerEngine
//!     ├── Arc<AsyncLedgerStore>                     (groups and payments)
//!     └── Arc<DashMap<(PaymentId, key), EntryId>>   (client keys from the log)
//! ```
//!
//! # Thread Safety
//!
//! Operations confined to one payment only lock that payment (and briefly
//! read its group's membership). Two tasks working on different payments
//! never wait on each other. Operations that change a group's membership or
//! payment list must not race with edits to the same group; the
//! [`BatchProcessor`](super::BatchProcessor) applies them as barriers.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, error};

use super::AsyncLedgerStore;
use crate::core::settlement::compute_settlement;
use crate::core::traits::Ledger;
use crate::core::validator::{validate_field, validate_submission};
use crate::types::{
    EditOutcome, EntryDraft, EntryId, FieldValue, Group, GroupId, GroupRecord, LedgerError,
    LedgerOperation, ListKind, OperationRecord, Participant, Payment, PaymentId, Settlement,
};

/// Thread-safe ledger edit engine
#[derive(Debug, Clone)]
pub struct AsyncLedgerEngine {
    store: Arc<AsyncLedgerStore>,

    /// Client field keys mapped to store-generated entry identities
    entry_keys: Arc<DashMap<(PaymentId, String), EntryId>>,
}

impl AsyncLedgerEngine {
    /// Create a new AsyncLedgerEngine
    ///
    /// # Arguments
    ///
    /// * `store` - Arc-wrapped store, shared with anything that reads it directly
    pub fn new(store: Arc<AsyncLedgerStore>) -> Self {
        Self {
            store,
            entry_keys: Arc::new(DashMap::new()),
        }
    }

    pub fn create_group(&self, id: GroupId, title: &str) -> Result<(), LedgerError> {
        self.store.insert_group(GroupRecord::new(id, title))
    }

    pub fn rename_group(&self, group: &GroupId, title: &str) -> Result<EditOutcome, LedgerError> {
        self.store
            .update_group(group, |record| Ok(record.set_title(title)))
    }

    /// Delete a group with its payments and forget their entry keys
    pub fn delete_group(&self, group: &GroupId) -> Result<(), LedgerError> {
        let removed = self.store.remove_group(group)?;
        self.entry_keys
            .retain(|(pid, _), _| !removed.payment_ids.contains(pid));
        Ok(())
    }

    pub fn join_group(
        &self,
        group: &GroupId,
        participant: Participant,
    ) -> Result<EditOutcome, LedgerError> {
        self.store
            .update_group(group, |record| Ok(record.join(participant)))
    }

    pub fn create_payment(
        &self,
        group: &GroupId,
        id: PaymentId,
        title: &str,
    ) -> Result<(), LedgerError> {
        self.store
            .insert_payment(Payment::new(id, group.clone(), title))
    }

    pub fn set_title(&self, payment: &PaymentId, title: &str) -> Result<EditOutcome, LedgerError> {
        self.store
            .update_payment(payment, |p| Ok(p.set_title(title)))
    }

    pub fn delete_payment(&self, payment: &PaymentId) -> Result<(), LedgerError> {
        self.store.remove_payment(payment)?;
        self.entry_keys.retain(|(pid, _), _| pid != payment);
        Ok(())
    }

    /// Replace both entry lists of a payment, validated as one unit
    pub fn submit_entries(
        &self,
        payment: &PaymentId,
        creditors: &[EntryDraft],
        debtors: &[EntryDraft],
    ) -> Result<(), LedgerError> {
        let group = self.owning_group(payment)?;
        validate_submission(&group, creditors, debtors)?;
        self.store.update_payment(payment, |p| {
            p.replace_entries(creditors, debtors);
            Ok(())
        })
    }

    /// Set one field of one entry
    ///
    /// Membership is read from a clone of the group record before the payment
    /// lock is taken. An entry that is gone makes the edit a no-op whatever
    /// the value, so it is looked up before the value is validated.
    pub fn apply_field_edit(
        &self,
        payment: &PaymentId,
        list: ListKind,
        entry: EntryId,
        value: &FieldValue,
    ) -> Result<EditOutcome, LedgerError> {
        let group = self.owning_group(payment)?;

        let outcome = self.store.update_payment(payment, |p| {
            if p.entry(list, entry).is_none() {
                return Ok(EditOutcome::Ignored);
            }
            validate_field(&group, value)?;
            Ok(p.apply_field(list, entry, value))
        })?;
        if outcome == EditOutcome::Ignored {
            debug!(error = %LedgerError::unknown_entry(payment, entry), "field edit swallowed");
        }
        Ok(outcome)
    }

    pub fn insert_entry(&self, payment: &PaymentId, list: ListKind) -> Result<EntryId, LedgerError> {
        self.store
            .update_payment(payment, |p| Ok(p.insert_entry(list)))
    }

    pub fn remove_entry(
        &self,
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

    /// Process a single operation from an operation log
    ///
    /// Same semantics as [`LedgerEngine::process`](crate::core::LedgerEngine::process).
    pub fn process(&self, record: OperationRecord) -> Result<EditOutcome, LedgerError> {
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
                self.check_scope(&group, &payment)?;
                self.delete_payment(&payment)?;
                Ok(EditOutcome::Applied)
            }
        }
    }

    /// Settlements for every group, ordered by group id
    ///
    /// Each group is settled in its own task; the results are collected in
    /// group order regardless of which task finishes first.
    pub async fn settlements(&self) -> Vec<Settlement> {
        let tasks: Vec<_> = self
            .store
            .group_ids()
            .into_iter()
            .map(|id| {
                let store = Arc::clone(&self.store);
                tokio::spawn(async move {
                    store
                        .group_snapshot(&id)
                        .map(|group| compute_settlement(&group))
                })
            })
            .collect();

        let mut settlements = Vec::with_capacity(tasks.len());
        for joined in futures::future::join_all(tasks).await {
            match joined {
                Ok(Ok(settlement)) => settlements.push(settlement),
                Ok(Err(e)) => error!(error = %e, "group vanished during settlement"),
                Err(e) => error!(error = ?e, "settlement task panicked"),
            }
        }
        settlements
    }

    fn resolve_key(&self, payment: &PaymentId, key: &str) -> Option<EntryId> {
        self.entry_keys
            .get(&(payment.clone(), key.to_string()))
            .map(|entry| *entry.value())
    }

    fn check_scope(&self, group: &GroupId, payment: &PaymentId) -> Result<(), LedgerError> {
        match self.store.payment_group(payment) {
            Some(owner) if &owner == group => Ok(()),
            _ => Err(LedgerError::payment_not_found(payment)),
        }
    }

    fn owning_group(&self, payment: &PaymentId) -> Result<GroupRecord, LedgerError> {
        let group = self
            .store
            .payment_group(payment)
            .ok_or_else(|| LedgerError::payment_not_found(payment))?;
        self.store
            .group(&group)
            .ok_or_else(|| LedgerError::group_not_found(&group))
    }
}

impl Ledger for AsyncLedgerEngine {
    fn get_group(&self, id: &GroupId) -> Result<Group, LedgerError> {
        self.store.group_snapshot(id)
    }

    fn get_payment(&self, id: &PaymentId) -> Result<Payment, LedgerError> {
        self.store
            .payment(id)
            .ok_or_else(|| LedgerError::payment_not_found(id))
    }

    fn apply_field_edit(
        &mut self,
        payment: &PaymentId,
        list: ListKind,
        entry: EntryId,
        value: &FieldValue,
    ) -> Result<EditOutcome, LedgerError> {
        AsyncLedgerEngine::apply_field_edit(self, payment, list, entry, value)
    }

    fn insert_entry(&mut self, payment: &PaymentId, list: ListKind) -> Result<EntryId, LedgerError> {
        AsyncLedgerEngine::insert_entry(self, payment, list)
    }

    fn remove_entry(
        &mut self,
        payment: &PaymentId,
        list: ListKind,
        entry: EntryId,
    ) -> Result<EditOutcome, LedgerError> {
        AsyncLedgerEngine::remove_entry(self, payment, list, entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EditSession, SessionConfig};
    use crate::types::{ParticipantId, Transfer};
    use rstest::rstest;
    use std::time::Instant;

    fn engine() -> AsyncLedgerEngine {
        let engine = AsyncLedgerEngine::new(Arc::new(AsyncLedgerStore::new()));
        engine.create_group(GroupId::new("g1"), "Trip").unwrap();
        for id in ["A", "B", "C"] {
            engine
                .join_group(&GroupId::new("g1"), Participant::new(id, id))
                .unwrap();
        }
        engine
    }

    fn set_entry(
        engine: &AsyncLedgerEngine,
        payment: &PaymentId,
        list: ListKind,
        participant: &str,
        amount: i64,
    ) {
        let entry = engine.insert_entry(payment, list).unwrap();
        engine
            .apply_field_edit(
                payment,
                list,
                entry,
                &FieldValue::Participant(ParticipantId::new(participant)),
            )
            .unwrap();
        engine
            .apply_field_edit(payment, list, entry, &FieldValue::Amount(amount))
            .unwrap();
    }

    #[test]
    fn test_engine_is_cloneable_and_shares_state() {
        let engine = engine();
        let clone = engine.clone();

        clone
            .create_payment(&GroupId::new("g1"), PaymentId::new("p1"), "Dinner")
            .unwrap();

        assert!(engine.get_payment(&PaymentId::new("p1")).is_ok());
    }

    #[test]
    fn test_rejected_and_ignored_edits() {
        let engine = engine();
        let p1 = PaymentId::new("p1");
        engine.create_payment(&GroupId::new("g1"), p1.clone(), "Dinner").unwrap();
        let entry = engine.insert_entry(&p1, ListKind::Debtor).unwrap();

        assert_eq!(
            engine.apply_field_edit(&p1, ListKind::Debtor, entry, &FieldValue::Amount(-3)),
            Err(LedgerError::invalid_amount(-3))
        );
        engine.remove_entry(&p1, ListKind::Debtor, entry).unwrap();
        assert_eq!(
            engine
                .apply_field_edit(&p1, ListKind::Debtor, entry, &FieldValue::Amount(3))
                .unwrap(),
            EditOutcome::Ignored
        );
    }

    #[rstest]
    #[case::invalid_amount(FieldValue::Amount(0))]
    #[case::unknown_participant(FieldValue::Participant(ParticipantId::new("Z")))]
    fn test_stale_invalid_edit_after_remove_is_ignored(#[case] value: FieldValue) {
        let engine = engine();
        let p1 = PaymentId::new("p1");
        engine.create_payment(&GroupId::new("g1"), p1.clone(), "Dinner").unwrap();
        let entry = engine.insert_entry(&p1, ListKind::Creditor).unwrap();
        engine.remove_entry(&p1, ListKind::Creditor, entry).unwrap();

        assert_eq!(
            engine.apply_field_edit(&p1, ListKind::Creditor, entry, &value),
            Ok(EditOutcome::Ignored)
        );
    }

    #[test]
    fn test_group_rename_and_delete() {
        let engine = engine();
        let g1 = GroupId::new("g1");
        let p1 = PaymentId::new("p1");
        engine.create_payment(&g1, p1.clone(), "Dinner").unwrap();
        engine
            .process(OperationRecord {
                line: 2,
                operation: LedgerOperation::InsertEntry {
                    group: g1.clone(),
                    payment: p1.clone(),
                    list: ListKind::Debtor,
                    key: "d0".to_string(),
                },
            })
            .unwrap();

        assert_eq!(engine.rename_group(&g1, "Ski trip"), Ok(EditOutcome::Applied));
        assert_eq!(engine.get_group(&g1).unwrap().title, "Ski trip");

        let deleted = engine.process(OperationRecord {
            line: 3,
            operation: LedgerOperation::DeleteGroup { group: g1.clone() },
        });

        assert_eq!(deleted, Ok(EditOutcome::Applied));
        assert!(engine.entry_keys.is_empty());
        assert!(engine.get_payment(&p1).is_err());
        assert_eq!(engine.delete_group(&g1), Err(LedgerError::group_not_found("g1")));
    }

    #[test]
    fn test_edit_session_over_async_engine() {
        let mut engine = engine();
        let p1 = PaymentId::new("p1");
        engine.create_payment(&GroupId::new("g1"), p1.clone(), "Dinner").unwrap();
        let mut session = EditSession::new(p1.clone(), SessionConfig::default());
        let now = Instant::now();

        let entry = session.insert(&mut engine, ListKind::Creditor).unwrap();
        session.change(ListKind::Creditor, entry, FieldValue::Amount(70), now);
        session.flush_all(&mut engine).unwrap();

        assert_eq!(
            engine.get_payment(&p1).unwrap().creditors[0].amount,
            Some(70)
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_edits_across_payments() {
        let engine = engine();
        for i in 0..6 {
            engine
                .create_payment(&GroupId::new("g1"), PaymentId::new(format!("p{}", i)), "x")
                .unwrap();
        }

        let tasks: Vec<_> = (0..6)
            .map(|i| {
                let engine = engine.clone();
                tokio::spawn(async move {
                    let payment = PaymentId::new(format!("p{}", i));
                    set_entry(&engine, &payment, ListKind::Creditor, "A", 100);
                    set_entry(&engine, &payment, ListKind::Debtor, "B", 40);
                    set_entry(&engine, &payment, ListKind::Debtor, "C", 60);
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let settlements = engine.settlements().await;
        assert_eq!(settlements.len(), 1);
        assert_eq!(
            settlements[0].transfers,
            vec![Transfer::new("C", "A", 360), Transfer::new("B", "A", 240)]
        );
    }

    #[tokio::test]
    async fn test_settlements_ordered_by_group() {
        let engine = engine();
        engine.create_group(GroupId::new("a0"), "First").unwrap();
        engine.create_group(GroupId::new("z9"), "Last").unwrap();

        let groups: Vec<String> = engine
            .settlements()
            .await
            .into_iter()
            .map(|s| s.group.to_string())
            .collect();
        assert_eq!(groups, vec!["a0", "g1", "z9"]);
    }

    #[test]
    fn test_delete_payment_requires_matching_group() {
        let engine = engine();
        engine.create_group(GroupId::new("g2"), "Other").unwrap();
        engine
            .create_payment(&GroupId::new("g1"), PaymentId::new("p1"), "Dinner")
            .unwrap();

        let result = engine.process(OperationRecord {
            line: 2,
            operation: LedgerOperation::DeletePayment {
                group: GroupId::new("g2"),
                payment: PaymentId::new("p1"),
            },
        });

        assert_eq!(result, Err(LedgerError::payment_not_found("p1")));
        assert!(engine.get_payment(&PaymentId::new("p1")).is_ok());
    }
}
