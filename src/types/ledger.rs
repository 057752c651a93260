//! Ledger types: groups, participants, payments and their amount entries
//!
//! A [`Group`] owns its [`Payment`]s; each payment holds two ordered lists of
//! [`AmountEntry`] (creditors who paid, debtors who owe). Entries are addressed
//! by a stable [`EntryId`] rather than by position so that structural edits and
//! field edits never hit the wrong entry.
//!
//! Mutations on a [`Payment`] live here so the synchronous and concurrent
//! engines share one implementation; validation against group membership is
//! done beforehand by [`crate::core::validator`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                $name(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                $name(id.to_string())
            }
        }
    };
}

string_id!(
    /// Opaque participant identity, owned by the identity layer
    ParticipantId
);
string_id!(
    /// Opaque group identifier
    GroupId
);
string_id!(
    /// Opaque payment identifier
    PaymentId
);

/// Stable identity of an amount entry, generated by the store on insert
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub Uuid);

impl EntryId {
    /// Generate a fresh random identity
    pub fn generate() -> Self {
        EntryId(Uuid::new_v4())
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A member of a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    /// Display name
    pub name: String,
}

impl Participant {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Participant {
            id: ParticipantId::new(id),
            name: name.into(),
        }
    }
}

/// Which of a payment's two lists an entry belongs to
///
/// Direction of money is encoded by list membership, never by the sign of the
/// amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    /// Someone who paid
    Creditor,
    /// Someone who owes
    Debtor,
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListKind::Creditor => f.write_str("creditor"),
            ListKind::Debtor => f.write_str("debtor"),
        }
    }
}

impl FromStr for ListKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "creditor" | "creditors" => Ok(ListKind::Creditor),
            "debtor" | "debtors" => Ok(ListKind::Debtor),
            other => Err(format!("unknown list '{}'", other)),
        }
    }
}

/// The editable fields of an amount entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryField {
    Participant,
    Amount,
}

/// A typed value for one field of an amount entry
///
/// A field edit is "set field F of entry E to value V"; the field is implied
/// by the variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldValue {
    Participant(ParticipantId),
    Amount(i64),
}

impl FieldValue {
    /// The field this value is written to
    pub fn field(&self) -> EntryField {
        match self {
            FieldValue::Participant(_) => EntryField::Participant,
            FieldValue::Amount(_) => EntryField::Amount,
        }
    }
}

/// Result of applying an idempotent edit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EditOutcome {
    /// State changed
    Applied,
    /// The target already held this value; nothing changed
    Unchanged,
    /// The target entry no longer exists; nothing changed
    Ignored,
}

/// One creditor or debtor line of a payment
///
/// Both fields start blank when an entry is inserted and are filled in by
/// independent field edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountEntry {
    pub id: EntryId,
    pub participant: Option<ParticipantId>,
    /// Amount in minor currency units, always positive once set
    pub amount: Option<i64>,
}

impl AmountEntry {
    /// A blank entry with a fresh identity
    pub fn blank() -> Self {
        AmountEntry {
            id: EntryId::generate(),
            participant: None,
            amount: None,
        }
    }

    /// The (participant, amount) pair if both fields are filled in
    pub fn complete(&self) -> Option<(&ParticipantId, i64)> {
        match (&self.participant, self.amount) {
            (Some(participant), Some(amount)) => Some((participant, amount)),
            _ => None,
        }
    }

    /// Neither field has been filled in yet
    pub fn is_blank(&self) -> bool {
        self.participant.is_none() && self.amount.is_none()
    }

    fn set(&mut self, value: &FieldValue) -> EditOutcome {
        match value {
            FieldValue::Participant(participant) => {
                if self.participant.as_ref() == Some(participant) {
                    return EditOutcome::Unchanged;
                }
                self.participant = Some(participant.clone());
            }
            FieldValue::Amount(amount) => {
                if self.amount == Some(*amount) {
                    return EditOutcome::Unchanged;
                }
                self.amount = Some(*amount);
            }
        }
        EditOutcome::Applied
    }
}

/// A fully specified entry submitted through a whole-form update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryDraft {
    pub participant: ParticipantId,
    pub amount: i64,
}

impl EntryDraft {
    pub fn new(participant: impl Into<String>, amount: i64) -> Self {
        EntryDraft {
            participant: ParticipantId::new(participant),
            amount,
        }
    }
}

/// One recorded transaction with payers and owers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub group: GroupId,
    pub title: String,
    pub creditors: Vec<AmountEntry>,
    pub debtors: Vec<AmountEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// Create a payment with empty creditor and debtor lists
    pub fn new(id: PaymentId, group: GroupId, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Payment {
            id,
            group,
            title: title.into(),
            creditors: Vec::new(),
            debtors: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn entries(&self, list: ListKind) -> &[AmountEntry] {
        match list {
            ListKind::Creditor => &self.creditors,
            ListKind::Debtor => &self.debtors,
        }
    }

    fn entries_mut(&mut self, list: ListKind) -> &mut Vec<AmountEntry> {
        match list {
            ListKind::Creditor => &mut self.creditors,
            ListKind::Debtor => &mut self.debtors,
        }
    }

    pub fn entry(&self, list: ListKind, id: EntryId) -> Option<&AmountEntry> {
        self.entries(list).iter().find(|entry| entry.id == id)
    }

    /// Append a blank entry and return its identity
    pub fn insert_entry(&mut self, list: ListKind) -> EntryId {
        let entry = AmountEntry::blank();
        let id = entry.id;
        self.entries_mut(list).push(entry);
        self.touch();
        id
    }

    /// Remove an entry by identity; absent entries are ignored
    pub fn remove_entry(&mut self, list: ListKind, id: EntryId) -> EditOutcome {
        let entries = self.entries_mut(list);
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        if entries.len() == before {
            return EditOutcome::Ignored;
        }
        self.touch();
        EditOutcome::Applied
    }

    /// Set one field of one entry; absent entries are ignored
    pub fn apply_field(&mut self, list: ListKind, id: EntryId, value: &FieldValue) -> EditOutcome {
        let outcome = match self.entries_mut(list).iter_mut().find(|entry| entry.id == id) {
            Some(entry) => entry.set(value),
            None => EditOutcome::Ignored,
        };
        if outcome == EditOutcome::Applied {
            self.touch();
        }
        outcome
    }

    pub fn set_title(&mut self, title: &str) -> EditOutcome {
        if self.title == title {
            return EditOutcome::Unchanged;
        }
        self.title = title.to_string();
        self.touch();
        EditOutcome::Applied
    }

    /// Replace both lists at once with freshly identified entries
    pub fn replace_entries(&mut self, creditors: &[EntryDraft], debtors: &[EntryDraft]) {
        let build = |drafts: &[EntryDraft]| {
            drafts
                .iter()
                .map(|draft| AmountEntry {
                    id: EntryId::generate(),
                    participant: Some(draft.participant.clone()),
                    amount: Some(draft.amount),
                })
                .collect()
        };
        self.creditors = build(creditors);
        self.debtors = build(debtors);
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// A group as held by the store: members plus the ids of its payments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRecord {
    pub id: GroupId,
    pub title: String,
    pub participants: BTreeMap<ParticipantId, Participant>,
    /// Payment ids in creation order
    pub payment_ids: Vec<PaymentId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GroupRecord {
    pub fn new(id: GroupId, title: impl Into<String>) -> Self {
        let now = Utc::now();
        GroupRecord {
            id,
            title: title.into(),
            participants: BTreeMap::new(),
            payment_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_member(&self, participant: &ParticipantId) -> bool {
        self.participants.contains_key(participant)
    }

    /// Add a member; joining twice keeps the first registration
    pub fn join(&mut self, participant: Participant) -> EditOutcome {
        if self.participants.contains_key(&participant.id) {
            return EditOutcome::Unchanged;
        }
        self.participants.insert(participant.id.clone(), participant);
        self.updated_at = Utc::now();
        EditOutcome::Applied
    }

    pub fn set_title(&mut self, title: &str) -> EditOutcome {
        if self.title == title {
            return EditOutcome::Unchanged;
        }
        self.title = title.to_string();
        self.updated_at = Utc::now();
        EditOutcome::Applied
    }
}

/// A group snapshot with its payments, as consumed by the settlement engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub title: String,
    pub participants: BTreeMap<ParticipantId, Participant>,
    /// Payments in creation order
    pub payments: Vec<Payment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Group {
    /// Assemble a snapshot from a stored record and its payments
    pub fn from_record(record: GroupRecord, payments: Vec<Payment>) -> Self {
        Group {
            id: record.id,
            title: record.title,
            participants: record.participants,
            payments,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }

    /// Build a snapshot directly, mostly useful for callers that hold their own data
    pub fn new(
        id: impl Into<String>,
        participants: impl IntoIterator<Item = Participant>,
        payments: Vec<Payment>,
    ) -> Self {
        let now = Utc::now();
        Group {
            id: GroupId::new(id),
            title: String::new(),
            participants: participants
                .into_iter()
                .map(|participant| (participant.id.clone(), participant))
                .collect(),
            payments,
            created_at: now,
            updated_at: now,
        }
    }
}
