//! Processing strategy module for operation log replay
//!
//! This module defines the Strategy pattern for complete replay pipelines,
//! covering CSV parsing, ledger edits and settlement output. This allows
//! different implementations (sequential, concurrent batch) to be selected at
//! runtime.

use crate::cli::{OutputFormat, StrategyType};
use crate::io::csv_format::{write_settlements_csv, write_settlements_json};
use crate::types::{EditOutcome, LedgerError, OperationRecord, Settlement};
use std::io::Write;
use std::path::Path;
use tracing::{debug, warn};

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use sync::SyncProcessingStrategy;

/// Processing strategy trait for complete replay pipelines
///
/// Each strategy reads operations from a CSV file, applies them to a ledger,
/// settles every group and writes the settlements to output.
pub trait ProcessingStrategy: Send + Sync {
    /// Replay an operation log and write the resulting settlements
    ///
    /// # Arguments
    ///
    /// * `input_path` - Path to the operation log
    /// * `output` - Writer for the settlements
    ///
    /// # Returns
    ///
    /// * `Ok(())` if the replay completed, even if some operations were rejected
    /// * `Err(LedgerError)` if a fatal error occurred (file not found, I/O error, etc.)
    ///
    /// Rejected operations and malformed rows are logged and skipped. They
    /// never end the replay.
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), LedgerError>;
}

/// Create a processing strategy based on the specified strategy type
///
/// # Arguments
///
/// * `strategy_type` - The type of processing strategy to create (Sync or Async)
/// * `config` - Optional configuration for async batch processing (ignored for sync)
/// * `format` - How settlements are written
///
/// # Returns
///
/// A boxed trait object implementing the ProcessingStrategy trait
pub fn create_strategy(
    strategy_type: StrategyType,
    config: Option<BatchConfig>,
    format: OutputFormat,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy::new(format)),
        StrategyType::Async => {
            let config = config.unwrap_or_default();
            Box::new(AsyncProcessingStrategy::new(config, format))
        }
    }
}

/// Write settlements in the requested format
pub(crate) fn write_settlements(
    settlements: &[Settlement],
    format: OutputFormat,
    output: &mut dyn Write,
) -> Result<(), LedgerError> {
    match format {
        OutputFormat::Csv => write_settlements_csv(settlements, output),
        OutputFormat::Json => write_settlements_json(settlements, output),
    }
}

/// Log the outcome of one replayed operation
pub(crate) fn log_outcome(record: &OperationRecord, result: &Result<EditOutcome, LedgerError>) {
    let op = record.operation.name();
    match result {
        Ok(EditOutcome::Applied) => {}
        Ok(outcome) => debug!(line = record.line, op, ?outcome, "operation had no effect"),
        Err(e) => warn!(line = record.line, op, error = %e, "operation rejected"),
    }
}
