//! Thread-safe ledger storage for concurrent replay
//!
//! This module provides the `AsyncLedgerStore` struct, which holds groups and
//! payments in `DashMap`s so that edits to different payments can proceed on
//! different threads at once.
//!
//! # Design
//!
//! Locking is per entry: editing a payment locks that payment only, and
//! reading a group's membership locks that group only. No method holds a
//! payment lock while acquiring a group lock. The single nested acquisition is
//! in [`AsyncLedgerStore::insert_payment`], which takes the group first and
//! then the payment, so the two can never deadlock.
//!
//! # Thread Safety
//!
//! Every method takes `&self`. Values are cloned out of the maps rather than
//! handing out guards, so callers never hold a lock across an `await`.

use crate::types::{Group, GroupId, GroupRecord, LedgerError, Payment, PaymentId};
use dashmap::DashMap;

/// Thread-safe store for groups and their payments
#[derive(Debug)]
pub struct AsyncLedgerStore {
    groups: DashMap<GroupId, GroupRecord>,
    payments: DashMap<PaymentId, Payment>,
}

impl AsyncLedgerStore {
    pub fn new() -> Self {
        Self {
            groups: DashMap::new(),
            payments: DashMap::new(),
        }
    }

    /// Store a new group
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the group was stored
    /// * `Err(LedgerError::DuplicateGroup)` - If a group with the same id exists;
    ///   the existing group is left untouched
    pub fn insert_group(&self, group: GroupRecord) -> Result<(), LedgerError> {
        let id = group.id.clone();
        let mut inserted = false;
        self.groups.entry(id.clone()).or_insert_with(|| {
            inserted = true;
            group
        });

        if !inserted {
            return Err(LedgerError::duplicate_group(&id));
        }
        Ok(())
    }

    /// Store a new payment and append it to its group's payment list
    ///
    /// The group entry stays locked while the payment is inserted, so the
    /// payment list and the payment map are updated together.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the payment was stored
    /// * `Err(LedgerError::DuplicatePayment)` - If a payment with the same id exists
    /// * `Err(LedgerError::NotFound)` - If the payment's group does not exist
    pub fn insert_payment(&self, payment: Payment) -> Result<(), LedgerError> {
        let id = payment.id.clone();
        if self.payments.contains_key(&id) {
            return Err(LedgerError::duplicate_payment(&id));
        }

        let mut group = self
            .groups
            .get_mut(&payment.group)
            .ok_or_else(|| LedgerError::group_not_found(&payment.group))?;

        let mut inserted = false;
        self.payments.entry(id.clone()).or_insert_with(|| {
            inserted = true;
            payment
        });
        if !inserted {
            return Err(LedgerError::duplicate_payment(&id));
        }

        group.payment_ids.push(id);
        Ok(())
    }

    /// Remove a payment and drop it from its group's payment list
    pub fn remove_payment(&self, id: &PaymentId) -> Result<Payment, LedgerError> {
        let (_, payment) = self
            .payments
            .remove(id)
            .ok_or_else(|| LedgerError::payment_not_found(id))?;

        if let Some(mut group) = self.groups.get_mut(&payment.group) {
            group.payment_ids.retain(|pid| pid != id);
        }
        Ok(payment)
    }

    /// Remove a group and every payment it owns
    ///
    /// The group is taken out of the map first. An `insert_payment` racing
    /// with the removal either finishes before it (and its payment is removed
    /// here) or no longer finds the group.
    pub fn remove_group(&self, id: &GroupId) -> Result<GroupRecord, LedgerError> {
        let (_, group) = self
            .groups
            .remove(id)
            .ok_or_else(|| LedgerError::group_not_found(id))?;
        for pid in &group.payment_ids {
            self.payments.remove(pid);
        }
        Ok(group)
    }

    /// Clone of a group record
    pub fn group(&self, id: &GroupId) -> Option<GroupRecord> {
        self.groups.get(id).map(|entry| entry.value().clone())
    }

    /// Clone of a payment
    pub fn payment(&self, id: &PaymentId) -> Option<Payment> {
        self.payments.get(id).map(|entry| entry.value().clone())
    }

    /// The group a payment belongs to, without cloning its entries
    pub fn payment_group(&self, id: &PaymentId) -> Option<GroupId> {
        self.payments.get(id).map(|entry| entry.value().group.clone())
    }

    /// Update a group using a closure while its entry is locked
    pub fn update_group<F, T>(&self, id: &GroupId, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut GroupRecord) -> Result<T, LedgerError>,
    {
        match self.groups.get_mut(id) {
            Some(mut entry) => f(entry.value_mut()),
            None => Err(LedgerError::group_not_found(id)),
        }
    }

    /// Update a payment using a closure while its entry is locked
    pub fn update_payment<F, T>(&self, id: &PaymentId, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut Payment) -> Result<T, LedgerError>,
    {
        match self.payments.get_mut(id) {
            Some(mut entry) => f(entry.value_mut()),
            None => Err(LedgerError::payment_not_found(id)),
        }
    }

    /// Assemble a group together with its payments in creation order
    pub fn group_snapshot(&self, id: &GroupId) -> Result<Group, LedgerError> {
        let record = self.group(id).ok_or_else(|| LedgerError::group_not_found(id))?;
        let payments = record
            .payment_ids
            .iter()
            .filter_map(|pid| self.payment(pid))
            .collect();
        Ok(Group::from_record(record, payments))
    }

    /// All group ids, sorted
    pub fn group_ids(&self) -> Vec<GroupId> {
        let mut ids: Vec<GroupId> = self.groups.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        ids
    }
}

impl Default for AsyncLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EditOutcome, FieldValue, ListKind, Participant};
    use std::sync::Arc;
    use std::thread;

    fn store_with_group() -> AsyncLedgerStore {
        let store = AsyncLedgerStore::new();
        store
            .insert_group(GroupRecord::new(GroupId::new("g1"), "Trip"))
            .unwrap();
        store
    }

    #[test]
    fn test_duplicate_group_keeps_first() {
        let store = store_with_group();
        let result = store.insert_group(GroupRecord::new(GroupId::new("g1"), "Again"));

        assert_eq!(result, Err(LedgerError::duplicate_group("g1")));
        assert_eq!(store.group(&GroupId::new("g1")).unwrap().title, "Trip");
    }

    #[test]
    fn test_insert_payment_links_group() {
        let store = store_with_group();
        store
            .insert_payment(Payment::new(PaymentId::new("p1"), GroupId::new("g1"), "Dinner"))
            .unwrap();

        assert_eq!(
            store.group(&GroupId::new("g1")).unwrap().payment_ids,
            vec![PaymentId::new("p1")]
        );
        assert_eq!(store.payment_group(&PaymentId::new("p1")), Some(GroupId::new("g1")));
        assert_eq!(
            store.insert_payment(Payment::new(PaymentId::new("p1"), GroupId::new("g1"), "x")),
            Err(LedgerError::duplicate_payment("p1"))
        );
    }

    #[test]
    fn test_insert_payment_unknown_group() {
        let store = AsyncLedgerStore::new();
        let result = store.insert_payment(Payment::new(PaymentId::new("p1"), GroupId::new("g9"), "x"));

        assert_eq!(result, Err(LedgerError::group_not_found("g9")));
        assert!(store.payment(&PaymentId::new("p1")).is_none());
    }

    #[test]
    fn test_remove_payment() {
        let store = store_with_group();
        store
            .insert_payment(Payment::new(PaymentId::new("p1"), GroupId::new("g1"), "x"))
            .unwrap();

        store.remove_payment(&PaymentId::new("p1")).unwrap();

        assert!(store.group_snapshot(&GroupId::new("g1")).unwrap().payments.is_empty());
        assert!(store.remove_payment(&PaymentId::new("p1")).is_err());
    }

    #[test]
    fn test_remove_group_cascades_to_payments() {
        let store = store_with_group();
        store.insert_group(GroupRecord::new(GroupId::new("g2"), "Other")).unwrap();
        for (id, group) in [("p1", "g1"), ("p2", "g2")] {
            store
                .insert_payment(Payment::new(PaymentId::new(id), GroupId::new(group), id))
                .unwrap();
        }

        let removed = store.remove_group(&GroupId::new("g1")).unwrap();

        assert_eq!(removed.payment_ids, vec![PaymentId::new("p1")]);
        assert!(store.payment(&PaymentId::new("p1")).is_none());
        assert_eq!(store.payment_group(&PaymentId::new("p2")), Some(GroupId::new("g2")));
        assert!(store.group_snapshot(&GroupId::new("g1")).is_err());
        assert_eq!(
            store.remove_group(&GroupId::new("g1")),
            Err(LedgerError::group_not_found("g1"))
        );
    }

    #[test]
    fn test_update_group_and_snapshot() {
        let store = store_with_group();
        let outcome = store
            .update_group(&GroupId::new("g1"), |group| Ok(group.join(Participant::new("a", "Alice"))))
            .unwrap();

        assert_eq!(outcome, EditOutcome::Applied);
        assert_eq!(store.group_snapshot(&GroupId::new("g1")).unwrap().participants.len(), 1);
        assert!(store.update_group(&GroupId::new("g9"), |_| Ok(())).is_err());
    }

    #[test]
    fn test_concurrent_edits_to_different_payments() {
        let store = Arc::new(store_with_group());
        for i in 0..8 {
            store
                .insert_payment(Payment::new(PaymentId::new(format!("p{}", i)), GroupId::new("g1"), "x"))
                .unwrap();
        }

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let id = PaymentId::new(format!("p{}", i));
                    for amount in 1..=50 {
                        store
                            .update_payment(&id, |payment| {
                                let entry = payment.insert_entry(ListKind::Creditor);
                                Ok(payment.apply_field(ListKind::Creditor, entry, &FieldValue::Amount(amount)))
                            })
                            .unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let group = store.group_snapshot(&GroupId::new("g1")).unwrap();
        assert_eq!(group.payments.len(), 8);
        for payment in &group.payments {
            assert_eq!(payment.creditors.len(), 50);
        }
    }

    #[test]
    fn test_group_ids_sorted() {
        let store = store_with_group();
        store.insert_group(GroupRecord::new(GroupId::new("a0"), "x")).unwrap();
        assert_eq!(store.group_ids(), vec![GroupId::new("a0"), GroupId::new("g1")]);
    }
}
