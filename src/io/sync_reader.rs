//! Synchronous CSV reader with iterator interface
//!
//! Streams [`LedgerCommand`]s from a command file one row at a time, delegating
//! row conversion to the csv_format module.
//!
//! ```no_run
//! use rust_ledger_engine::io::sync_reader::SyncReader;
//! use std::path::Path;
//!
//! let reader = SyncReader::new(Path::new("commands.csv")).unwrap();
//! for result in reader {
//!     match result {
//!         Ok(command) => println!("Applying {:?}", command),
//!         Err(e) => eprintln!("Skipping row: {}", e),
//!     }
//! }
//! ```
//!
//! # Error Handling
//!
//! - A missing or unreadable file is returned from `new()`
//! - A malformed row is yielded as `ParseError` carrying its line number
//!   (the header is line 1)

use crate::io::csv_format::{convert_csv_record, CsvRecord};
use crate::types::{LedgerCommand, LedgerError};
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::path::Path;

/// Synchronous command reader
#[derive(Debug)]
pub struct SyncReader {
    reader: csv::Reader<File>,
    line_num: u64,
}

impl SyncReader {
    /// Open a command file
    ///
    /// Fields are trimmed and rows may omit trailing optional columns.
    ///
    /// # Errors
    ///
    /// Returns `FileNotFound` if the file does not exist, `IoError` otherwise.
    pub fn new(path: &Path) -> Result<Self, LedgerError> {
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => LedgerError::FileNotFound {
                path: path.display().to_string(),
            },
            _ => LedgerError::from(e),
        })?;

        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(file);

        Ok(Self {
            reader,
            line_num: 1,
        })
    }
}

impl Iterator for SyncReader {
    type Item = Result<LedgerCommand, LedgerError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut deserializer = self.reader.deserialize::<CsvRecord>();
        let row = deserializer.next()?;
        self.line_num += 1;
        let line = self.line_num;

        Some(
            row.map_err(LedgerError::from)
                .and_then(convert_csv_record)
                .map_err(|e| match e {
                    LedgerError::ParseError { .. } => e,
                    other => LedgerError::ParseError {
                        line: Some(line),
                        message: other.to_string(),
                    },
                }),
        )
    }
}
