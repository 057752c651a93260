//! Asynchronous batch processing strategy
//!
//! This module provides a multi-threaded implementation of the
//! ProcessingStrategy trait. Operations are read in batches and each batch is
//! replayed with payments processed in parallel.
//!
//! # Architecture
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── BatchConfig (batch_size, max_concurrent_batches)
//!     ├── AsyncReader (batch CSV reading)
//!     ├── BatchProcessor (group-level barriers + per-payment tasks)
//!     └── AsyncLedgerEngine (thread-safe edits)
//!         └── AsyncLedgerStore (DashMap-backed groups and payments)
//! ```
//!
//! # Ordering
//!
//! - Batches are processed one after another, so log order holds across batches
//! - Within a batch, group-level operations are applied in order as barriers
//! - Between barriers, each payment's operations run in their own task, in log order
//! - Settlements are computed per group in parallel once the log is exhausted
//!
//! The settlements written are identical to the sequential strategy's.

use crate::cli::OutputFormat;
use crate::core::r#async::{AsyncLedgerEngine, AsyncLedgerStore, BatchProcessor};
use crate::io::async_reader::AsyncReader;
use crate::strategy::{log_outcome, write_settlements, ProcessingStrategy};
use crate::types::LedgerError;
use std::io::{ErrorKind, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Configuration for batch processing
///
/// Controls how operations are batched and the number of worker threads
/// for parallel processing within each batch.
#[derive(Clone, Debug)]
pub struct BatchConfig {
    /// Number of operations per batch
    pub batch_size: usize,
    /// Number of runtime worker threads
    pub max_concurrent_batches: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent_batches: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a new BatchConfig with custom values
    ///
    /// Zero values fall back to the defaults with a warning.
    pub fn new(batch_size: usize, max_concurrent_batches: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            warn!(
                batch_size,
                default = default.batch_size,
                "invalid batch_size, using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent_batches = if max_concurrent_batches == 0 {
            warn!(
                max_concurrent_batches,
                default = default.max_concurrent_batches,
                "invalid max_concurrent_batches, using default"
            );
            default.max_concurrent_batches
        } else {
            max_concurrent_batches
        };

        Self {
            batch_size,
            max_concurrent_batches,
        }
    }
}

/// Asynchronous batch replay strategy
///
/// # Configuration
///
/// The strategy accepts a BatchConfig with:
/// - `batch_size`: Number of operations per batch (default: 1000)
/// - `max_concurrent_batches`: Number of worker threads (default: CPU cores)
#[derive(Debug, Clone)]
pub struct AsyncProcessingStrategy {
    config: BatchConfig,
    format: OutputFormat,
}

impl AsyncProcessingStrategy {
    /// Create a new AsyncProcessingStrategy
    ///
    /// # Arguments
    ///
    /// * `config` - BatchConfig with batch_size and max_concurrent_batches
    /// * `format` - How settlements are written
    pub fn new(config: BatchConfig, format: OutputFormat) -> Self {
        Self { config, format }
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), LedgerError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.max_concurrent_batches)
            .build()?;

        let settlements = runtime.block_on(async {
            let store = Arc::new(AsyncLedgerStore::new());
            let engine = Arc::new(AsyncLedgerEngine::new(store));
            let processor = BatchProcessor::new(Arc::clone(&engine));

            let file = tokio::fs::File::open(input_path)
                .await
                .map_err(|e| match e.kind() {
                    ErrorKind::NotFound => LedgerError::FileNotFound {
                        path: input_path.display().to_string(),
                    },
                    _ => LedgerError::from(e),
                })?;
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncReader::new(compat_file);

            let mut applied = 0usize;
            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    break;
                }

                for processed in processor.process_batch(batch).await {
                    log_outcome(&processed.record, &processed.result);
                    applied += usize::from(processed.result.is_ok());
                }
            }

            let settlements = engine.settlements().await;
            info!(applied, groups = settlements.len(), "replay finished");
            Ok::<_, LedgerError>(settlements)
        })?;

        write_settlements(&settlements, self.format, output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "op,group,payment,list,entry,participant,amount,title\n";

    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    fn run(rows: &str, config: BatchConfig) -> String {
        let file = create_temp_csv(&format!("{}{}", HEADER, rows));
        let mut output = Vec::new();
        AsyncProcessingStrategy::new(config, OutputFormat::Csv)
            .process(file.path(), &mut output)
            .unwrap();
        String::from_utf8(output).unwrap()
    }

    /// Two groups, edits interleaved across payments
    const INTERLEAVED: &str = "group,trip,,,,,,\n\
                               group,flat,,,,,,\n\
                               join,trip,,,,A,,\n\
                               join,trip,,,,B,,\n\
                               join,flat,,,,X,,\n\
                               join,flat,,,,Y,,\n\
                               payment,trip,p1,,,,,Taxi\n\
                               payment,flat,p2,,,,,Rent\n\
                               insert,trip,p1,creditor,c0,,,\n\
                               insert,flat,p2,creditor,c0,,,\n\
                               set,trip,p1,creditor,c0,A,,\n\
                               set,flat,p2,creditor,c0,Y,,\n\
                               set,trip,p1,creditor,c0,,80,\n\
                               set,flat,p2,creditor,c0,,1000,\n\
                               insert,trip,p1,debtor,d0,,,\n\
                               insert,flat,p2,debtor,d0,,,\n\
                               set,trip,p1,debtor,d0,B,,\n\
                               set,flat,p2,debtor,d0,X,,\n\
                               set,trip,p1,debtor,d0,,80,\n\
                               set,flat,p2,debtor,d0,,1000,\n";

    #[rstest]
    #[case::one_batch(BatchConfig::default())]
    #[case::tiny_batches(BatchConfig::new(2, 2))]
    #[case::single_worker(BatchConfig::new(3, 1))]
    fn test_async_strategy_batch_sizes_agree(#[case] config: BatchConfig) {
        assert_eq!(
            run(INTERLEAVED, config),
            "group,from,to,amount\nflat,X,Y,1000\ntrip,B,A,80\n"
        );
    }

    #[test]
    fn test_async_strategy_handles_missing_file() {
        let strategy = AsyncProcessingStrategy::new(BatchConfig::default(), OutputFormat::Csv);
        let mut output = Vec::new();

        let result = strategy.process(Path::new("nonexistent.csv"), &mut output);
        assert_eq!(
            result,
            Err(LedgerError::FileNotFound {
                path: "nonexistent.csv".to_string()
            })
        );
    }

    #[test]
    fn test_async_strategy_empty_log() {
        assert_eq!(run("", BatchConfig::default()), "group,from,to,amount\n");
    }

    #[rstest]
    #[case::zero_batch_size(0, 4, 1000, 4)]
    #[case::zero_workers(10, 0, 10, num_cpus::get())]
    fn test_batch_config_zero_values_fallback(
        #[case] batch_size: usize,
        #[case] workers: usize,
        #[case] expected_batch_size: usize,
        #[case] expected_workers: usize,
    ) {
        let config = BatchConfig::new(batch_size, workers);
        assert_eq!(config.batch_size, expected_batch_size);
        assert_eq!(config.max_concurrent_batches, expected_workers);
    }
}
