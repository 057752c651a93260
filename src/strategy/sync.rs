//! Synchronous processing strategy
//!
//! This module provides a single-threaded implementation of the
//! ProcessingStrategy trait. It replays the operation log in order through the
//! [`LedgerEngine`](crate::core::LedgerEngine).
//!
//! # Design
//!
//! The SyncProcessingStrategy focuses on orchestration, delegating:
//! - CSV parsing to `SyncReader` (iterator interface)
//! - Ledger edits and settlement to `LedgerEngine`
//! - Output to the `csv_format` writers
//!
//! # Memory Efficiency
//!
//! Records are read one at a time. Memory usage is O(groups + payments +
//! entries), not O(operations).

use crate::cli::OutputFormat;
use crate::core::LedgerEngine;
use crate::io::sync_reader::SyncReader;
use crate::strategy::{log_outcome, write_settlements, ProcessingStrategy};
use crate::types::LedgerError;
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

/// Sequential replay strategy
#[derive(Debug, Clone, Copy)]
pub struct SyncProcessingStrategy {
    format: OutputFormat,
}

impl SyncProcessingStrategy {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

impl ProcessingStrategy for SyncProcessingStrategy {
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), LedgerError> {
        let mut engine = LedgerEngine::new();
        let reader = SyncReader::new(input_path)?;
        let mut applied = 0usize;

        for result in reader {
            match result {
                Ok(record) => {
                    let result = engine.process(record.clone());
                    log_outcome(&record, &result);
                    applied += usize::from(result.is_ok());
                }
                Err(e) => warn!(error = %e, "skipping row"),
            }
        }

        let settlements = engine.settlements();
        info!(applied, groups = settlements.len(), "replay finished");

        write_settlements(&settlements, self.format, output)
    }
}
