//! Asynchronous CSV reader with batch interface
//!
//! Provides batch reading over an operation log for the concurrent replay.
//!
//! # Design
//!
//! The AsyncReader uses:
//! - csv-async for streaming CSV parsing
//! - futures `AsyncRead`, so a tokio file can be plugged in through tokio-util's compat layer
//! - Batch reading so the replay can work on a bounded number of operations at a time
//!
//! # Architecture
//!
//! ```text
//! CSV Reader → AsyncReader → Batches of OperationRecords
//!                  ↓
//!           csv_format module
//!           (CsvRecord, convert_csv_record)
//! ```
//!
//! Rows that fail to parse or convert are logged and skipped; they never end
//! a batch early.

use crate::io::csv_format::{convert_csv_record, CsvRecord};
use crate::types::{LedgerError, OperationRecord};
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;
use tracing::warn;

/// Asynchronous CSV reader
///
/// Provides batch reading interface over operation records.
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
    /// Line of the most recently read record
    line: u64,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    /// Create a new AsyncReader from any futures `AsyncRead`
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self {
            csv_reader,
            line: 1,
        }
    }

    /// Read up to `batch_size` valid operations
    ///
    /// Returns fewer than `batch_size` only when the input is exhausted, and an
    /// empty batch once there is nothing left.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<OperationRecord> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<CsvRecord>();

        while batch.len() < batch_size {
            let next = match records.next().await {
                Some(next) => next,
                None => break,
            };
            self.line += 1;

            match next {
                Ok(csv_record) => match convert_csv_record(csv_record, self.line) {
                    Ok(record) => batch.push(record),
                    Err(e) => warn!(line = self.line, error = %e, "skipping operation"),
                },
                Err(e) => {
                    let error = LedgerError::ParseError {
                        line: Some(self.line),
                        message: e.to_string(),
                    };
                    warn!(line = self.line, %error, "skipping malformed row");
                }
            }
        }

        batch
    }
}
