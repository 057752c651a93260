//! CSV format handling for the operation log and settlement output
//!
//! # Input Format
//!
//! Each row of the operation log is one command:
//!
//! ```text
//! op,group,payment,list,entry,participant,amount,title
//! group,trip,,,,,,Weekend trip
//! join,trip,,,,alice,,Alice
//! payment,trip,p1,,,,,Dinner
//! insert,trip,p1,creditor,c0,,,
//! set,trip,p1,creditor,c0,alice,,
//! set,trip,p1,creditor,c0,,900,
//! remove,trip,p1,creditor,c0,,,
//! title,trip,p1,,,,,Late dinner
//! delete,trip,p1,,,,,
//! retitle_group,trip,,,,,,Ski trip
//! delete_group,trip,,,,,,
//! ```
//!
//! - `entry` is the editor's key for an entry; it names the entry in later rows
//! - `set` carries exactly one of `participant` or `amount`
//! - for `join`, `title` is the member's display name (defaults to the id)
//!
//! # Output Format
//!
//! CSV with one row per transfer: `group,from,to,amount`, groups in id order
//! and transfers in the order the settlement produced them. JSON output holds
//! the full settlement reports including balances and flagged payments.

use crate::types::{
    FieldValue, GroupId, LedgerError, LedgerOperation, ListKind, OperationRecord, Participant,
    ParticipantId, PaymentId, Settlement,
};
use serde::Deserialize;
use std::io::Write;

/// Raw CSV record as read from the operation log
///
/// Every column but `op` and `group` is optional: which ones are required
/// depends on the op.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct CsvRecord {
    pub op: String,
    pub group: String,
    #[serde(default)]
    pub payment: Option<String>,
    #[serde(default)]
    pub list: Option<String>,
    #[serde(default)]
    pub entry: Option<String>,
    #[serde(default)]
    pub participant: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// Convert a raw CSV record into a validated operation
///
/// Checks that the op is known and that every column it needs is present.
/// Field values are not checked against the ledger here: a `set` to a
/// non-member or to a zero amount converts fine and is rejected when applied.
///
/// # Arguments
///
/// * `csv_record` - The raw record
/// * `line` - Line the record was read from, for error reporting
///
/// # Errors
///
/// * `InvalidOperation` - Unknown op, missing column, or a `set` with zero or
///   two values
/// * `InvalidAmount` - The amount column is not an integer
pub fn convert_csv_record(csv_record: CsvRecord, line: u64) -> Result<OperationRecord, LedgerError> {
    let op = csv_record.op.trim().to_lowercase();
    let row = Row {
        op: &op,
        line,
    };

    let group = GroupId::new(row.required(Some(csv_record.group), "group")?);

    let operation = match op.as_str() {
        "group" => LedgerOperation::CreateGroup {
            group,
            title: csv_record.title.unwrap_or_default(),
        },
        "retitle_group" => LedgerOperation::RenameGroup {
            group,
            title: row.required(csv_record.title, "title")?,
        },
        "delete_group" => LedgerOperation::DeleteGroup { group },
        "join" => {
            let id = row.required(csv_record.participant, "participant")?;
            let name = non_empty(csv_record.title).unwrap_or_else(|| id.clone());
            LedgerOperation::Join {
                group,
                participant: Participant::new(id, name),
            }
        }
        "payment" => LedgerOperation::CreatePayment {
            group,
            payment: PaymentId::new(row.required(csv_record.payment, "payment")?),
            title: csv_record.title.unwrap_or_default(),
        },
        "title" => LedgerOperation::SetTitle {
            group,
            payment: PaymentId::new(row.required(csv_record.payment, "payment")?),
            title: row.required(csv_record.title, "title")?,
        },
        "insert" => LedgerOperation::InsertEntry {
            group,
            payment: PaymentId::new(row.required(csv_record.payment, "payment")?),
            list: row.list(csv_record.list)?,
            key: row.required(csv_record.entry, "entry")?,
        },
        "remove" => LedgerOperation::RemoveEntry {
            group,
            payment: PaymentId::new(row.required(csv_record.payment, "payment")?),
            list: row.list(csv_record.list)?,
            key: row.required(csv_record.entry, "entry")?,
        },
        "set" => {
            let value = match (non_empty(csv_record.participant), non_empty(csv_record.amount)) {
                (Some(participant), None) => FieldValue::Participant(ParticipantId::new(participant)),
                (None, Some(amount)) => FieldValue::Amount(
                    amount
                        .parse::<i64>()
                        .map_err(|_| LedgerError::invalid_amount(&amount))?,
                ),
                _ => {
                    return Err(row.invalid("set needs exactly one of participant or amount"));
                }
            };
            LedgerOperation::SetField {
                group,
                payment: PaymentId::new(row.required(csv_record.payment, "payment")?),
                list: row.list(csv_record.list)?,
                key: row.required(csv_record.entry, "entry")?,
                value,
            }
        }
        "delete" => LedgerOperation::DeletePayment {
            group,
            payment: PaymentId::new(row.required(csv_record.payment, "payment")?),
        },
        _ => return Err(row.invalid("unknown op")),
    };

    Ok(OperationRecord { line, operation })
}

/// Context for reporting problems with one row
struct Row<'a> {
    op: &'a str,
    line: u64,
}

impl Row<'_> {
    fn invalid(&self, message: impl ToString) -> LedgerError {
        LedgerError::invalid_operation(self.op, Some(self.line), message)
    }

    fn required(&self, value: Option<String>, column: &str) -> Result<String, LedgerError> {
        non_empty(value).ok_or_else(|| self.invalid(format!("missing {}", column)))
    }

    fn list(&self, value: Option<String>) -> Result<ListKind, LedgerError> {
        self.required(value, "list")?
            .parse::<ListKind>()
            .map_err(|e| self.invalid(e))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Write settlements as CSV, one row per transfer
///
/// # Format
///
/// ```text
/// group,from,to,amount
/// trip,carol,alice,600
/// trip,bob,alice,300
/// ```
pub fn write_settlements_csv(
    settlements: &[Settlement],
    output: &mut dyn Write,
) -> Result<(), LedgerError> {
    use csv::Writer;

    let mut writer = Writer::from_writer(output);
    writer.write_record(["group", "from", "to", "amount"])?;

    let mut sorted: Vec<&Settlement> = settlements.iter().collect();
    sorted.sort_by(|a, b| a.group.cmp(&b.group));

    for settlement in sorted {
        for transfer in &settlement.transfers {
            writer.write_record(&[
                settlement.group.to_string(),
                transfer.from.to_string(),
                transfer.to.to_string(),
                transfer.amount.to_string(),
            ])?;
        }
    }

    writer.flush()?;
    Ok(())
}

/// Write settlements as a pretty-printed JSON array, ordered by group id
pub fn write_settlements_json(
    settlements: &[Settlement],
    output: &mut dyn Write,
) -> Result<(), LedgerError> {
    let mut sorted: Vec<&Settlement> = settlements.iter().collect();
    sorted.sort_by(|a, b| a.group.cmp(&b.group));

    serde_json::to_writer_pretty(&mut *output, &sorted)?;
    writeln!(output)?;
    output.flush()?;
    Ok(())
}
