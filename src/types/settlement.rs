//! Settlement output types
//!
//! Transfers and balances are derived data: they are recomputed from a group's
//! payments on every read and never persisted.

use super::error::LedgerError;
use super::ledger::{GroupId, ParticipantId, PaymentId};
use serde::Serialize;
use std::collections::BTreeMap;

/// One pairwise payment that moves money toward settlement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transfer {
    /// Who pays
    pub from: ParticipantId,
    /// Who receives
    pub to: ParticipantId,
    /// Always positive, in minor currency units
    pub amount: i64,
}

impl Transfer {
    pub fn new(from: impl Into<String>, to: impl Into<String>, amount: i64) -> Self {
        Transfer {
            from: ParticipantId::new(from),
            to: ParticipantId::new(to),
            amount,
        }
    }
}

/// A payment excluded from balance math, with the reason it needs attention
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlaggedPayment {
    pub payment: PaymentId,
    pub title: String,
    #[serde(serialize_with = "serialize_reason")]
    pub reason: LedgerError,
}

fn serialize_reason<S: serde::Serializer>(reason: &LedgerError, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&reason.to_string())
}

/// The settlement engine's output for one group snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settlement {
    pub group: GroupId,
    /// Net balance per participant: paid minus owed, over balanced payments only
    pub balances: BTreeMap<ParticipantId, i64>,
    /// Transfers in the order the matching produced them
    pub transfers: Vec<Transfer>,
    /// Payments left out of the balances
    pub flagged: Vec<FlaggedPayment>,
}

impl Settlement {
    /// Whether every payment contributed to the result
    pub fn is_consistent(&self) -> bool {
        self.flagged.is_empty()
    }
}
