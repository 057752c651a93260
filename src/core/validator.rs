//! Amount entry validation
//!
//! Two kinds of checks live here:
//!
//! - **Edit-time**: each field value is checked before it is committed. A
//!   participant must be a current member of the payment's group and an amount
//!   must be a positive integer in minor units. Zero is rejected rather than
//!   dropped so the editor can show the error inline.
//! - **Read-time**: [`check_balanced`] runs when a payment is read for
//!   settlement. Edits arrive one field at a time, so a payment may be
//!   unbalanced mid-edit; it is flagged at read time, never rejected at edit
//!   time.

use crate::types::{
    EntryDraft, EntryViolation, FieldValue, GroupRecord, LedgerError, ListKind, ParticipantId,
    Payment,
};

/// Check that an amount is a positive integer
pub fn validate_amount(amount: i64) -> Result<(), LedgerError> {
    if amount <= 0 {
        return Err(LedgerError::invalid_amount(amount));
    }
    Ok(())
}

/// Parse a raw amount as submitted by an editor
///
/// Anything that is not a positive integer (decimals, text, zero, negatives)
/// is reported as `InvalidAmount` carrying the raw input.
pub fn parse_amount(raw: &str) -> Result<i64, LedgerError> {
    let amount = raw
        .trim()
        .parse::<i64>()
        .map_err(|_| LedgerError::invalid_amount(raw.trim()))?;
    validate_amount(amount)?;
    Ok(amount)
}

/// Check that a participant is a current member of the group
pub fn validate_participant(
    group: &GroupRecord,
    participant: &ParticipantId,
) -> Result<(), LedgerError> {
    if !group.is_member(participant) {
        return Err(LedgerError::unknown_participant(participant, &group.id));
    }
    Ok(())
}

/// Check a single field value before it is committed
pub fn validate_field(group: &GroupRecord, value: &FieldValue) -> Result<(), LedgerError> {
    match value {
        FieldValue::Participant(participant) => validate_participant(group, participant),
        FieldValue::Amount(amount) => validate_amount(*amount),
    }
}

/// Validate a whole-form submission of both lists as one unit
///
/// Either every entry in both lists is valid, or the submission is rejected
/// with one violation per offending entry. Creditor/debtor totals are not
/// compared here.
pub fn validate_submission(
    group: &GroupRecord,
    creditors: &[EntryDraft],
    debtors: &[EntryDraft],
) -> Result<(), LedgerError> {
    let violations: Vec<EntryViolation> = [(ListKind::Creditor, creditors), (ListKind::Debtor, debtors)]
        .into_iter()
        .flat_map(|(list, drafts)| {
            drafts.iter().enumerate().filter_map(move |(index, draft)| {
                validate_participant(group, &draft.participant)
                    .and_then(|_| validate_amount(draft.amount))
                    .err()
                    .map(|error| EntryViolation { list, index, error })
            })
        })
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(LedgerError::RejectedSubmission { violations })
    }
}

/// Check that a payment's creditor and debtor entries sum to the same total
///
/// Fully blank entries were just inserted and do not count. An entry with
/// only one field filled in makes the payment inconsistent: counting it or
/// dropping it would both misstate what the payment shows.
///
/// # Returns
///
/// * `Ok(total)` - The common total of both lists
/// * `Err(LedgerError::IncompleteEntry)` - If an entry is half filled in
/// * `Err(LedgerError::UnbalancedPayment)` - If the totals differ
/// * `Err(LedgerError::ArithmeticOverflow)` - If a total does not fit in `i64`
pub fn check_balanced(payment: &Payment) -> Result<i64, LedgerError> {
    check_complete(payment)?;
    let creditors = list_total(payment, ListKind::Creditor)?;
    let debtors = list_total(payment, ListKind::Debtor)?;

    if creditors != debtors {
        return Err(LedgerError::unbalanced_payment(
            &payment.id,
            creditors,
            debtors,
        ));
    }
    Ok(creditors)
}

fn check_complete(payment: &Payment) -> Result<(), LedgerError> {
    for list in [ListKind::Creditor, ListKind::Debtor] {
        if let Some(entry) = payment
            .entries(list)
            .iter()
            .find(|entry| !entry.is_blank() && entry.complete().is_none())
        {
            return Err(LedgerError::incomplete_entry(&payment.id, list, entry.id));
        }
    }
    Ok(())
}

fn list_total(payment: &Payment, list: ListKind) -> Result<i64, LedgerError> {
    payment
        .entries(list)
        .iter()
        .filter_map(|entry| entry.complete())
        .try_fold(0i64, |total, (_, amount)| total.checked_add(amount))
        .ok_or_else(|| LedgerError::arithmetic_overflow("payment total", &payment.id))
}
