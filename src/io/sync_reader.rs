//! Synchronous CSV reader with iterator interface
//!
//! Provides a streaming iterator over operation records from an operation log.
//! Delegates CSV format concerns to the csv_format module.
//!
//! # Iterator Interface
//!
//! SyncReader implements the Iterator trait, yielding
//! `Result<OperationRecord, LedgerError>` for each CSV row:
//!
//! ```no_run
//! use warikan_engine::io::sync_reader::SyncReader;
//! use std::path::Path;
//!
//! let reader = SyncReader::new(Path::new("operations.csv")).unwrap();
//! for result in reader {
//!     match result {
//!         Ok(record) => println!("line {}: {}", record.line, record.operation.name()),
//!         Err(e) => eprintln!("Error: {}", e),
//!     }
//! }
//! ```
//!
//! # Error Handling
//!
//! - Fatal errors (file not found, I/O errors) are returned from `new()`
//! - Individual record errors are yielded as Err variants; iteration goes on
//! - Line numbers count the header as line 1

use crate::io::csv_format::{convert_csv_record, CsvRecord};
use crate::types::{LedgerError, OperationRecord};
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;

/// Synchronous CSV reader over an operation log
#[derive(Debug)]
pub struct SyncReader {
    reader: csv::Reader<File>,
    /// Line of the most recently read record
    line: u64,
}

impl SyncReader {
    /// Open an operation log for reading
    ///
    /// # Errors
    ///
    /// * `FileNotFound` - If nothing exists at `path`
    /// * `IoError` - If the file cannot be opened for another reason
    pub fn new(path: &Path) -> Result<Self, LedgerError> {
        let file = File::open(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => LedgerError::FileNotFound {
                path: path.display().to_string(),
            },
            _ => LedgerError::from(e),
        })?;

        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(file);

        Ok(Self { reader, line: 1 })
    }
}

impl Iterator for SyncReader {
    type Item = Result<OperationRecord, LedgerError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut deserializer = self.reader.deserialize::<CsvRecord>();
        let next = deserializer.next()?;
        self.line += 1;

        Some(match next {
            Ok(csv_record) => convert_csv_record(csv_record, self.line),
            Err(e) => Err(LedgerError::ParseError {
                line: Some(self.line),
                message: e.to_string(),
            }),
        })
    }
}
