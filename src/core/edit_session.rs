//! Client side of the ledger edit protocol
//!
//! An [`EditSession`] sits between an editor and a [`Ledger`]. Field changes
//! are buffered per (list, entry, field) and flushed as idempotent set-field
//! operations:
//!
//! - after a quiet period with no further change to that field ([`EditSession::flush_due`])
//! - immediately when the field loses focus ([`EditSession::blur`])
//! - before any structural operation ([`EditSession::insert`], [`EditSession::remove`])
//!
//! Flushes for one field always leave in the order the changes were made, and
//! a removal discards whatever is still buffered for the removed entry.
//!
//! Time is passed in by the caller so the debounce policy can be driven
//! deterministically.

use crate::core::traits::Ledger;
use crate::types::{EditOutcome, EntryField, EntryId, FieldValue, LedgerError, ListKind, PaymentId};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Default quiet period before a changed field is flushed
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);

/// Debounce configuration for an edit session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// How long a field must stay unchanged before it is flushed
    pub debounce: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

/// Address of one editable field
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldKey {
    pub list: ListKind,
    pub entry: EntryId,
    pub field: EntryField,
}

impl FieldKey {
    pub fn new(list: ListKind, entry: EntryId, field: EntryField) -> Self {
        FieldKey { list, entry, field }
    }
}

#[derive(Debug, Clone)]
struct PendingEdit {
    value: FieldValue,
    changed_at: Instant,
    seq: u64,
}

/// Buffered editing of one payment's entry lists
pub struct EditSession {
    payment: PaymentId,
    config: SessionConfig,
    pending: HashMap<FieldKey, PendingEdit>,
    field_errors: HashMap<FieldKey, LedgerError>,
    next_seq: u64,
}

impl EditSession {
    pub fn new(payment: PaymentId, config: SessionConfig) -> Self {
        EditSession {
            payment,
            config,
            pending: HashMap::new(),
            field_errors: HashMap::new(),
            next_seq: 0,
        }
    }

    pub fn payment(&self) -> &PaymentId {
        &self.payment
    }

    /// Buffer a field change and restart that field's quiet period
    ///
    /// A newer change to the same field replaces the buffered value. Any error
    /// previously shown for the field is cleared.
    pub fn change(&mut self, list: ListKind, entry: EntryId, value: FieldValue, now: Instant) {
        let key = FieldKey::new(list, entry, value.field());
        self.field_errors.remove(&key);
        self.pending.insert(
            key,
            PendingEdit {
                value,
                changed_at: now,
                seq: self.next_seq,
            },
        );
        self.next_seq += 1;
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// The rejection shown inline for a field, if its last flush failed
    pub fn field_error(&self, key: &FieldKey) -> Option<&LedgerError> {
        self.field_errors.get(key)
    }

    /// Earliest instant at which [`EditSession::flush_due`] has work to do
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending
            .values()
            .map(|edit| edit.changed_at + self.config.debounce)
            .min()
    }

    /// Flush one field immediately, as when it loses focus
    ///
    /// # Returns
    ///
    /// * `Ok(Some(outcome))` - The buffered value was accepted by the ledger
    /// * `Ok(None)` - Nothing was buffered, or the value was rejected and is
    ///   now available through [`EditSession::field_error`]
    /// * `Ok(Some(EditOutcome::Ignored))` - The entry is gone; the edit is dropped
    /// * `Err(LedgerError)` - The payment could not be reached; the edit stays buffered
    pub fn blur<L: Ledger + ?Sized>(
        &mut self,
        ledger: &mut L,
        key: FieldKey,
    ) -> Result<Option<EditOutcome>, LedgerError> {
        self.flush_key(ledger, key)
    }

    /// Flush every field whose quiet period has elapsed, oldest change first
    ///
    /// Returns the number of edits the ledger accepted.
    pub fn flush_due<L: Ledger + ?Sized>(
        &mut self,
        ledger: &mut L,
        now: Instant,
    ) -> Result<usize, LedgerError> {
        let debounce = self.config.debounce;
        let due = self.keys_in_change_order(|edit| now.duration_since(edit.changed_at) >= debounce);
        self.flush_keys(ledger, due)
    }

    /// Flush everything that is buffered, oldest change first
    pub fn flush_all<L: Ledger + ?Sized>(&mut self, ledger: &mut L) -> Result<usize, LedgerError> {
        let all = self.keys_in_change_order(|_| true);
        self.flush_keys(ledger, all)
    }

    /// Flush pending edits, then append a blank entry
    pub fn insert<L: Ledger + ?Sized>(
        &mut self,
        ledger: &mut L,
        list: ListKind,
    ) -> Result<EntryId, LedgerError> {
        self.flush_all(ledger)?;
        ledger.insert_entry(&self.payment, list)
    }

    /// Flush pending edits for other entries, then remove this one
    ///
    /// Once the removal is accepted, anything still buffered for the removed
    /// entry is dropped instead of being sent.
    pub fn remove<L: Ledger + ?Sized>(
        &mut self,
        ledger: &mut L,
        list: ListKind,
        entry: EntryId,
    ) -> Result<EditOutcome, LedgerError> {
        let others = self.keys_in_change_order(|_| true)
            .into_iter()
            .filter(|key| !(key.list == list && key.entry == entry))
            .collect();
        self.flush_keys(ledger, others)?;

        let outcome = ledger.remove_entry(&self.payment, list, entry)?;

        let before = self.pending.len();
        self.pending
            .retain(|key, _| !(key.list == list && key.entry == entry));
        self.field_errors
            .retain(|key, _| !(key.list == list && key.entry == entry));
        let discarded = before - self.pending.len();
        if discarded > 0 {
            debug!(payment = %self.payment, %entry, discarded, "dropped edits for removed entry");
        }

        Ok(outcome)
    }

    fn keys_in_change_order<F>(&self, select: F) -> Vec<FieldKey>
    where
        F: Fn(&PendingEdit) -> bool,
    {
        let mut keys: Vec<(Instant, u64, FieldKey)> = self
            .pending
            .iter()
            .filter(|(_, edit)| select(edit))
            .map(|(key, edit)| (edit.changed_at, edit.seq, *key))
            .collect();
        keys.sort();
        keys.into_iter().map(|(_, _, key)| key).collect()
    }

    fn flush_keys<L: Ledger + ?Sized>(
        &mut self,
        ledger: &mut L,
        keys: Vec<FieldKey>,
    ) -> Result<usize, LedgerError> {
        let mut accepted = 0;
        for key in keys {
            if self.flush_key(ledger, key)?.is_some() {
                accepted += 1;
            }
        }
        Ok(accepted)
    }

    fn flush_key<L: Ledger + ?Sized>(
        &mut self,
        ledger: &mut L,
        key: FieldKey,
    ) -> Result<Option<EditOutcome>, LedgerError> {
        let Some(edit) = self.pending.remove(&key) else {
            return Ok(None);
        };

        match ledger.apply_field_edit(&self.payment, key.list, key.entry, &edit.value) {
            Ok(outcome) => {
                self.field_errors.remove(&key);
                Ok(Some(outcome))
            }
            Err(error @ (LedgerError::UnknownParticipant { .. } | LedgerError::InvalidAmount { .. })) => {
                warn!(payment = %self.payment, entry = %key.entry, %error, "field edit rejected");
                self.field_errors.insert(key, error);
                Ok(None)
            }
            Err(error) if error.is_benign() => {
                debug!(payment = %self.payment, %error, "flush reached a missing entry");
                self.field_errors.remove(&key);
                Ok(Some(EditOutcome::Ignored))
            }
            Err(error) => {
                self.pending.insert(key, edit);
                Err(error)
            }
        }
    }
}
