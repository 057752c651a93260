//! Settlement engine
//!
//! Reduces a group's payments to a short list of pairwise transfers that zeroes
//! every participant's net balance.
//!
//! # Algorithm
//!
//! 1. Net balance per participant = sum of creditor amounts minus sum of debtor
//!    amounts, over every payment that passes [`check_balanced`]. Payments that
//!    fail (unbalanced, half-filled entries, overflow) are flagged and left
//!    out, so one bad edit cannot skew the whole group.
//! 2. Participants with a positive balance are owed money, negative ones owe,
//!    zero ones are already settled and take no part.
//! 3. Repeatedly match the largest creditor with the largest debtor and
//!    transfer the smaller of the two magnitudes. Every step zeroes at least
//!    one balance, so the loop ends after at most `n - 1` transfers for `n`
//!    non-zero balances.
//! 4. Equal magnitudes are broken by participant id (smallest first), which
//!    makes the output reproducible for identical input.
//!
//! Largest-to-largest matching is a heuristic. Minimising the transfer count
//! exactly is NP-hard in general; the `n - 1` bound is what is guaranteed.
//!
//! # Concurrency
//!
//! [`compute_settlement`] is a pure function of a group snapshot: no I/O, no
//! shared state. It can run on any thread, for many groups at once, and is
//! recomputed on every read rather than cached.

use crate::core::validator::check_balanced;
use crate::types::{FlaggedPayment, Group, LedgerError, ParticipantId, Payment, Settlement, Transfer};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};
use tracing::{debug, warn};

/// Compute the settlement for a group snapshot
///
/// # Arguments
///
/// * `group` - The group with all of its payments
///
/// # Returns
///
/// A [`Settlement`] holding every member's net balance, the transfers in the
/// order they were generated, and any payments that were flagged instead of
/// counted. A group with no payments, or whose balances are all zero, yields
/// no transfers.
pub fn compute_settlement(group: &Group) -> Settlement {
    let (balances, flagged) = net_balances(&group.payments);

    for flag in &flagged {
        warn!(group = %group.id, payment = %flag.payment, reason = %flag.reason, "payment excluded from settlement");
    }

    let transfers = match_transfers(&balances);
    debug!(group = %group.id, transfers = transfers.len(), "settlement computed");

    // Members who never appear in a payment are reported with a zero balance
    let mut balances = balances;
    for participant in group.participants.keys() {
        balances.entry(participant.clone()).or_insert(0);
    }

    Settlement {
        group: group.id.clone(),
        balances,
        transfers,
        flagged,
    }
}

/// Net balance per participant over the balanced payments
///
/// # Returns
///
/// The balances of every participant that appears in a counted payment, and
/// the payments that were excluded together with the reason.
pub fn net_balances(payments: &[Payment]) -> (BTreeMap<ParticipantId, i64>, Vec<FlaggedPayment>) {
    let mut balances: BTreeMap<ParticipantId, i64> = BTreeMap::new();
    let mut flagged = Vec::new();

    for payment in payments {
        let result = check_balanced(payment).and_then(|_| apply_payment(&balances, payment));
        match result {
            Ok(updated) => balances = updated,
            Err(reason) => flagged.push(FlaggedPayment {
                payment: payment.id.clone(),
                title: payment.title.clone(),
                reason,
            }),
        }
    }

    (balances, flagged)
}

/// Apply one payment to a copy of the balances, failing without side effects on overflow
///
/// A balance may never settle at `i64::MIN`; that counts as overflow too.
fn apply_payment(
    balances: &BTreeMap<ParticipantId, i64>,
    payment: &Payment,
) -> Result<BTreeMap<ParticipantId, i64>, LedgerError> {
    let mut updated = balances.clone();

    let credits = payment.creditors.iter().filter_map(|e| e.complete());
    let debits = payment
        .debtors
        .iter()
        .filter_map(|e| e.complete())
        .map(|(p, a)| (p, -a));

    for (participant, delta) in credits.chain(debits) {
        let balance = updated.entry(participant.clone()).or_insert(0);
        *balance = balance
            .checked_add(delta)
            // i64::MIN has no positive counterpart, so a debt that large cannot be matched
            .filter(|b| *b != i64::MIN)
            .ok_or_else(|| LedgerError::arithmetic_overflow("net balance", &payment.id))?;
    }

    Ok(updated)
}

/// Greedy largest-creditor-to-largest-debtor matching
fn match_transfers(balances: &BTreeMap<ParticipantId, i64>) -> Vec<Transfer> {
    // Max-heaps by magnitude; ties go to the smallest participant id
    let mut creditors: BinaryHeap<(i64, Reverse<ParticipantId>)> = BinaryHeap::new();
    let mut debtors: BinaryHeap<(i64, Reverse<ParticipantId>)> = BinaryHeap::new();

    for (participant, &balance) in balances {
        if balance > 0 {
            creditors.push((balance, Reverse(participant.clone())));
        } else if balance < 0 {
            debtors.push((-balance, Reverse(participant.clone())));
        }
    }

    let mut transfers = Vec::new();
    while let (Some((credit, Reverse(to))), Some((debt, Reverse(from)))) =
        (creditors.pop(), debtors.pop())
    {
        let amount = credit.min(debt);
        transfers.push(Transfer {
            from: from.clone(),
            to: to.clone(),
            amount,
        });

        if credit > amount {
            creditors.push((credit - amount, Reverse(to)));
        }
        if debt > amount {
            debtors.push((debt - amount, Reverse(from)));
        }
    }

    transfers
}
