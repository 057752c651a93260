//! In-memory ledger storage
//!
//! This module provides the LedgerStore component that holds groups and
//! payments keyed by their opaque identifiers. It knows nothing about
//! validation; the [`LedgerEngine`](crate::core::LedgerEngine) checks edits
//! before they reach the store.
//!
//! # Layout
//!
//! Groups and payments are stored in separate maps. A group record keeps the
//! ids of its payments in creation order, and [`LedgerStore::group_snapshot`]
//! assembles the two into a [`Group`] for settlement.

use crate::types::{Group, GroupId, GroupRecord, LedgerError, Payment, PaymentId};
use std::collections::HashMap;

/// Ledger store for groups and their payments
pub struct LedgerStore {
    groups: HashMap<GroupId, GroupRecord>,
    payments: HashMap<PaymentId, Payment>,
}

impl LedgerStore {
    /// Create a new empty ledger store
    pub fn new() -> Self {
        LedgerStore {
            groups: HashMap::new(),
            payments: HashMap::new(),
        }
    }

    /// Store a new group
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the group was stored
    /// * `Err(LedgerError::DuplicateGroup)` - If a group with the same id exists
    pub fn insert_group(&mut self, group: GroupRecord) -> Result<(), LedgerError> {
        if self.groups.contains_key(&group.id) {
            return Err(LedgerError::duplicate_group(&group.id));
        }
        self.groups.insert(group.id.clone(), group);
        Ok(())
    }

    /// Store a new payment and append it to its group's payment list
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the payment was stored
    /// * `Err(LedgerError::NotFound)` - If the payment's group does not exist
    /// * `Err(LedgerError::DuplicatePayment)` - If a payment with the same id exists
    pub fn insert_payment(&mut self, payment: Payment) -> Result<(), LedgerError> {
        if self.payments.contains_key(&payment.id) {
            return Err(LedgerError::duplicate_payment(&payment.id));
        }
        let group = self
            .groups
            .get_mut(&payment.group)
            .ok_or_else(|| LedgerError::group_not_found(&payment.group))?;
        group.payment_ids.push(payment.id.clone());
        self.payments.insert(payment.id.clone(), payment);
        Ok(())
    }

    /// Remove a payment and drop it from its group's payment list
    pub fn remove_payment(&mut self, id: &PaymentId) -> Result<Payment, LedgerError> {
        let payment = self
            .payments
            .remove(id)
            .ok_or_else(|| LedgerError::payment_not_found(id))?;
        if let Some(group) = self.groups.get_mut(&payment.group) {
            group.payment_ids.retain(|pid| pid != id);
        }
        Ok(payment)
    }

    /// Remove a group and every payment it owns
    ///
    /// # Returns
    ///
    /// The removed group record; its `payment_ids` name the payments that were
    /// removed with it.
    pub fn remove_group(&mut self, id: &GroupId) -> Result<GroupRecord, LedgerError> {
        let group = self
            .groups
            .remove(id)
            .ok_or_else(|| LedgerError::group_not_found(id))?;
        for pid in &group.payment_ids {
            self.payments.remove(pid);
        }
        Ok(group)
    }

    pub fn group(&self, id: &GroupId) -> Option<&GroupRecord> {
        self.groups.get(id)
    }

    pub fn payment(&self, id: &PaymentId) -> Option<&Payment> {
        self.payments.get(id)
    }

    /// Update a group using a closure
    ///
    /// # Returns
    ///
    /// * `Ok(T)` - Whatever the closure returns
    /// * `Err(LedgerError::NotFound)` - If the group does not exist
    pub fn update_group<F, T>(&mut self, id: &GroupId, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut GroupRecord) -> Result<T, LedgerError>,
    {
        let group = self
            .groups
            .get_mut(id)
            .ok_or_else(|| LedgerError::group_not_found(id))?;
        f(group)
    }

    /// Update a payment using a closure
    ///
    /// # Returns
    ///
    /// * `Ok(T)` - Whatever the closure returns
    /// * `Err(LedgerError::NotFound)` - If the payment does not exist
    pub fn update_payment<F, T>(&mut self, id: &PaymentId, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut Payment) -> Result<T, LedgerError>,
    {
        let payment = self
            .payments
            .get_mut(id)
            .ok_or_else(|| LedgerError::payment_not_found(id))?;
        f(payment)
    }

    /// Assemble a group together with its payments in creation order
    pub fn group_snapshot(&self, id: &GroupId) -> Result<Group, LedgerError> {
        let record = self
            .groups
            .get(id)
            .ok_or_else(|| LedgerError::group_not_found(id))?;
        let payments = record
            .payment_ids
            .iter()
            .filter_map(|pid| self.payments.get(pid).cloned())
            .collect();
        Ok(Group::from_record(record.clone(), payments))
    }

    /// All group ids, sorted
    pub fn group_ids(&self) -> Vec<GroupId> {
        let mut ids: Vec<GroupId> = self.groups.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl Default for LedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ListKind, Participant};

    fn store_with_group() -> LedgerStore {
        let mut store = LedgerStore::new();
        store
            .insert_group(GroupRecord::new(GroupId::new("g1"), "Trip"))
            .unwrap();
        store
    }

    #[test]
    fn test_insert_and_snapshot_group() {
        let mut store = store_with_group();
        store
            .update_group(&GroupId::new("g1"), |group| {
                group.join(Participant::new("a", "Alice"));
                Ok(())
            })
            .unwrap();

        let group = store.group_snapshot(&GroupId::new("g1")).unwrap();
        assert_eq!(group.title, "Trip");
        assert_eq!(group.participants.len(), 1);
        assert!(group.payments.is_empty());
    }

    #[test]
    fn test_duplicate_group_rejected_first_kept() {
        let mut store = store_with_group();
        let result = store.insert_group(GroupRecord::new(GroupId::new("g1"), "Other"));

        assert_eq!(result, Err(LedgerError::duplicate_group("g1")));
        assert_eq!(store.group(&GroupId::new("g1")).unwrap().title, "Trip");
    }

    #[test]
    fn test_payments_kept_in_creation_order() {
        let mut store = store_with_group();
        for id in ["p3", "p1", "p2"] {
            store
                .insert_payment(Payment::new(PaymentId::new(id), GroupId::new("g1"), id))
                .unwrap();
        }

        let group = store.group_snapshot(&GroupId::new("g1")).unwrap();
        let ids: Vec<&str> = group.payments.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p3", "p1", "p2"]);
    }

    #[test]
    fn test_payment_requires_existing_group() {
        let mut store = LedgerStore::new();
        let result = store.insert_payment(Payment::new(PaymentId::new("p1"), GroupId::new("nope"), "x"));
        assert_eq!(result, Err(LedgerError::group_not_found("nope")));
        assert!(store.payment(&PaymentId::new("p1")).is_none());
    }

    #[test]
    fn test_duplicate_payment_rejected() {
        let mut store = store_with_group();
        let payment = Payment::new(PaymentId::new("p1"), GroupId::new("g1"), "x");
        store.insert_payment(payment.clone()).unwrap();

        assert_eq!(
            store.insert_payment(payment),
            Err(LedgerError::duplicate_payment("p1"))
        );
        assert_eq!(store.group(&GroupId::new("g1")).unwrap().payment_ids.len(), 1);
    }

    #[test]
    fn test_remove_payment_detaches_from_group() {
        let mut store = store_with_group();
        store
            .insert_payment(Payment::new(PaymentId::new("p1"), GroupId::new("g1"), "x"))
            .unwrap();

        store.remove_payment(&PaymentId::new("p1")).unwrap();

        assert!(store.payment(&PaymentId::new("p1")).is_none());
        assert!(store.group(&GroupId::new("g1")).unwrap().payment_ids.is_empty());
        assert_eq!(
            store.remove_payment(&PaymentId::new("p1")).unwrap_err(),
            LedgerError::payment_not_found("p1")
        );
    }

    #[test]
    fn test_remove_group_cascades_to_payments() {
        let mut store = store_with_group();
        store
            .insert_group(GroupRecord::new(GroupId::new("g2"), "Other"))
            .unwrap();
        for (id, group) in [("p1", "g1"), ("p2", "g1"), ("p3", "g2")] {
            store
                .insert_payment(Payment::new(PaymentId::new(id), GroupId::new(group), id))
                .unwrap();
        }

        let removed = store.remove_group(&GroupId::new("g1")).unwrap();

        assert_eq!(removed.payment_ids, vec![PaymentId::new("p1"), PaymentId::new("p2")]);
        assert!(store.group(&GroupId::new("g1")).is_none());
        assert!(store.payment(&PaymentId::new("p1")).is_none());
        assert!(store.payment(&PaymentId::new("p2")).is_none());
        assert!(store.payment(&PaymentId::new("p3")).is_some());
        assert_eq!(store.group_ids(), vec![GroupId::new("g2")]);
        assert_eq!(
            store.remove_group(&GroupId::new("g1")).unwrap_err(),
            LedgerError::group_not_found("g1")
        );
    }

    #[test]
    fn test_update_payment_closure_result() {
        let mut store = store_with_group();
        store
            .insert_payment(Payment::new(PaymentId::new("p1"), GroupId::new("g1"), "x"))
            .unwrap();

        let entry = store
            .update_payment(&PaymentId::new("p1"), |payment| {
                Ok(payment.insert_entry(ListKind::Creditor))
            })
            .unwrap();

        let payment = store.payment(&PaymentId::new("p1")).unwrap();
        assert_eq!(payment.creditors[0].id, entry);
    }

    #[test]
    fn test_update_missing_payment() {
        let mut store = store_with_group();
        let result = store.update_payment(&PaymentId::new("p9"), |_| Ok(()));
        assert!(matches!(result, Err(LedgerError::NotFound { kind: "Payment", .. })));
    }
}
