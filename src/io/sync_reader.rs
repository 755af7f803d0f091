//! Synchronous CSV reader with iterator interface
//!
//! Provides a streaming iterator over ledger commands from a CSV file.
//! Delegates CSV format concerns to the csv_format module.
//!
//! # Design
//!
//! The SyncReader uses csv::Reader to read and deserialize CSV records one at a
//! time, delegating conversion to the csv_format module. The whole file is
//! never loaded into memory.
//!
//! ```no_run
//! use ledger_engine::io::sync_reader::SyncReader;
//! use std::path::Path;
//!
//! let reader = SyncReader::new(Path::new("commands.csv")).unwrap();
//! for result in reader {
//!     match result {
//!         Ok(command) => println!("Processing command: {:?}", command),
//!         Err(e) => eprintln!("Error: {}", e),
//!     }
//! }
//! ```
//!
//! # Error Handling
//!
//! - Fatal errors (file not found, I/O errors) are returned from `new()`
//! - Individual record errors are yielded as Err variants in the iterator,
//!   tagged with the line they came from

use crate::io::csv_format::{convert_csv_record, CsvRecord};
use crate::types::{LedgerCommand, LedgerError};
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;

/// Synchronous CSV reader
///
/// Provides an iterator interface over ledger commands.
#[derive(Debug)]
pub struct SyncReader {
    reader: csv::Reader<File>,
    line_num: u64,
}

impl SyncReader {
    /// Create a new SyncReader from a file path
    ///
    /// The CSV reader trims whitespace from all fields and allows rows with
    /// fewer columns than the header.
    ///
    /// # Errors
    ///
    /// - `FileNotFound` if the file does not exist
    /// - `IoError` if it cannot be opened for another reason
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

        Ok(Self {
            reader,
            line_num: 1,
        })
    }
}

impl Iterator for SyncReader {
    type Item = Result<LedgerCommand, LedgerError>;

    /// Get the next command from the CSV file
    ///
    /// Conversion errors carry the line number of the offending row (the
    /// header is line 1).
    fn next(&mut self) -> Option<Self::Item> {
        let mut deserializer = self.reader.deserialize::<CsvRecord>();
        let record = deserializer.next()?;
        self.line_num += 1;

        Some(
            record
                .map_err(LedgerError::from)
                .and_then(convert_csv_record)
                .map_err(|error| with_line(error, self.line_num)),
        )
    }
}

/// Attach a line number to a parse error that has none yet
pub(crate) fn with_line(error: LedgerError, line: u64) -> LedgerError {
    match error {
        LedgerError::ParseError {
            line: None,
            message,
        } => LedgerError::ParseError {
            line: Some(line),
            message,
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AccountId;
    use rust_decimal_macros::dec;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "command,account,counterparty,amount,owner,email\n";

    /// Helper function to create a temporary CSV file for testing
    fn create_temp_csv(rows: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(HEADER.as_bytes())
            .and_then(|_| file.write_all(rows.as_bytes()))
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    #[test]
    fn test_sync_reader_new_fails_on_missing_file() {
        let result = SyncReader::new(Path::new("nonexistent.csv"));
        assert!(matches!(result, Err(LedgerError::FileNotFound { .. })));
    }

    #[test]
    fn test_sync_reader_iterates_commands() {
        let file = create_temp_csv(
            "open,X,,,Ada Lovelace,ada@bank.test\n\
             credit,X,,100.00,,\n\
             transfer,X,Y,40,,\n\
             close,Y,,,,\n",
        );

        let commands: Vec<LedgerCommand> = SyncReader::new(file.path())
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(commands.len(), 4);
        assert_eq!(commands[0].name(), "open");
        assert_eq!(
            commands[1],
            LedgerCommand::Credit {
                account: AccountId::new("X"),
                amount: dec!(100.00),
            }
        );
        assert_eq!(commands[2].name(), "transfer");
        assert_eq!(commands[3].name(), "close");
    }

    #[test]
    fn test_sync_reader_includes_line_numbers_in_errors() {
        let file = create_temp_csv(
            "credit,X,,1.00,,\n\
             refund,X,,1.00,,\n\
             credit,X,,2.00,,\n",
        );

        let records: Vec<_> = SyncReader::new(file.path()).unwrap().collect();

        assert_eq!(records.len(), 3);
        assert!(records[0].is_ok());
        assert!(records[2].is_ok());
        assert_eq!(
            records[1].as_ref().unwrap_err(),
            &LedgerError::parse_error(Some(3), "unknown command 'refund'")
        );
    }

    #[test]
    fn test_sync_reader_continues_after_invalid_amount() {
        let file = create_temp_csv(
            "credit,X,,ten,,\n\
             credit,X,,1.00,,\n",
        );

        let records: Vec<_> = SyncReader::new(file.path()).unwrap().collect();

        assert!(matches!(records[0], Err(LedgerError::InvalidAmount { .. })));
        assert!(records[1].is_ok());
    }

    #[test]
    fn test_sync_reader_handles_whitespace_and_short_rows() {
        let file = create_temp_csv("  DEBIT  ,  X  ,  ,  5.5\n");

        let records: Vec<_> = SyncReader::new(file.path()).unwrap().collect();

        assert_eq!(
            records[0].as_ref().unwrap(),
            &LedgerCommand::Debit {
                account: AccountId::new("X"),
                amount: dec!(5.50),
            }
        );
    }

    #[test]
    fn test_sync_reader_handles_empty_file_after_header() {
        let file = create_temp_csv("");
        assert_eq!(SyncReader::new(file.path()).unwrap().count(), 0);
    }
}
