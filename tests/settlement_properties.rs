//! Property tests for the settlement engine and the edit protocol
//!
//! Groups are generated as a handful of members and a list of payments. Each
//! payment has one payer and a few owers; a payment can be skewed so that its
//! creditor total no longer matches its debtor total, in which case it must be
//! flagged and left out of the balances.

use proptest::prelude::*;
use std::collections::BTreeMap;
use warikan_engine::core::settlement::compute_settlement;
use warikan_engine::core::{Ledger, LedgerEngine};
use warikan_engine::types::{
    EditOutcome, EntryDraft, FieldValue, Group, GroupId, ListKind, Participant, ParticipantId,
    Payment, PaymentId,
};

const MEMBERS: usize = 6;

fn member(index: usize) -> String {
    format!("P{}", index)
}

/// (payer, owers with their shares, skew added to the payer's amount)
type PaymentShape = (usize, Vec<(usize, i64)>, i64);

fn payment_shape() -> impl Strategy<Value = PaymentShape> {
    (
        0..MEMBERS,
        prop::collection::vec((0..MEMBERS, 1i64..10_000), 1..4),
        prop_oneof![4 => Just(0i64), 1 => 1i64..50],
    )
}

fn build_group(shapes: &[PaymentShape]) -> Group {
    let payments = shapes
        .iter()
        .enumerate()
        .map(|(index, (payer, owers, skew))| {
            let owed: i64 = owers.iter().map(|(_, amount)| amount).sum();
            let debtors: Vec<EntryDraft> = owers
                .iter()
                .map(|(ower, amount)| EntryDraft::new(member(*ower), *amount))
                .collect();
            let creditors = vec![EntryDraft::new(member(*payer), owed + skew)];

            let mut payment = Payment::new(
                PaymentId::new(format!("p{}", index)),
                GroupId::new("g"),
                format!("Payment {}", index),
            );
            payment.replace_entries(&creditors, &debtors);
            payment
        })
        .collect();

    Group::new(
        "g",
        (0..MEMBERS).map(|index| Participant::new(member(index), member(index))),
        payments,
    )
}

proptest! {
    #[test]
    fn balances_sum_to_zero(shapes in prop::collection::vec(payment_shape(), 0..12)) {
        let settlement = compute_settlement(&build_group(&shapes));
        prop_assert_eq!(settlement.balances.values().sum::<i64>(), 0);
    }

    #[test]
    fn only_skewed_payments_are_flagged(shapes in prop::collection::vec(payment_shape(), 0..12)) {
        let settlement = compute_settlement(&build_group(&shapes));
        let skewed = shapes.iter().filter(|(_, _, skew)| *skew != 0).count();
        prop_assert_eq!(settlement.flagged.len(), skewed);
    }

    #[test]
    fn transfers_zero_every_balance(shapes in prop::collection::vec(payment_shape(), 0..12)) {
        let settlement = compute_settlement(&build_group(&shapes));

        let mut remaining: BTreeMap<ParticipantId, i64> = settlement.balances.clone();
        for transfer in &settlement.transfers {
            prop_assert!(transfer.amount > 0);
            prop_assert_ne!(&transfer.from, &transfer.to);
            *remaining.entry(transfer.from.clone()).or_insert(0) += transfer.amount;
            *remaining.entry(transfer.to.clone()).or_insert(0) -= transfer.amount;
        }

        prop_assert!(remaining.values().all(|balance| *balance == 0));
    }

    #[test]
    fn transfer_count_is_bounded(shapes in prop::collection::vec(payment_shape(), 0..12)) {
        let settlement = compute_settlement(&build_group(&shapes));
        let nonzero = settlement.balances.values().filter(|b| **b != 0).count();
        prop_assert!(settlement.transfers.len() <= nonzero.saturating_sub(1));
    }

    #[test]
    fn settlement_is_deterministic(shapes in prop::collection::vec(payment_shape(), 0..12)) {
        let group = build_group(&shapes);
        prop_assert_eq!(compute_settlement(&group), compute_settlement(&group));
    }

    /// Replaying a field edit a second time changes nothing
    #[test]
    fn field_edits_are_idempotent(
        edits in prop::collection::vec((0..MEMBERS, 1i64..10_000), 1..8),
    ) {
        let group = GroupId::new("g");
        let payment = PaymentId::new("p1");

        let mut engine = LedgerEngine::new();
        engine.create_group(group.clone(), "Trip").unwrap();
        for index in 0..MEMBERS {
            engine
                .join_group(&group, Participant::new(member(index), member(index)))
                .unwrap();
        }
        engine.create_payment(&group, payment.clone(), "Dinner").unwrap();
        let entry = engine.insert_entry(&payment, ListKind::Debtor).unwrap();

        for (participant, amount) in edits {
            let values = [
                FieldValue::Participant(ParticipantId::new(member(participant))),
                FieldValue::Amount(amount),
            ];
            for value in &values {
                engine
                    .apply_field_edit(&payment, ListKind::Debtor, entry, value)
                    .unwrap();
                let before = engine.get_payment(&payment).unwrap();

                let again = engine
                    .apply_field_edit(&payment, ListKind::Debtor, entry, value)
                    .unwrap();
                prop_assert_eq!(again, EditOutcome::Unchanged);
                prop_assert_eq!(engine.get_payment(&payment).unwrap(), before);
            }
        }
    }
}
