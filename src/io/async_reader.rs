//! Asynchronous CSV reader with batch interface
//!
//! Provides a streaming interface over ledger commands from a CSV file,
//! read in batches for the async processing strategy.
//!
//! # Architecture
//!
//! ```text
//! CSV Reader → AsyncReader → Batches of LedgerCommands
//!                  ↓
//!           csv_format module
//!           (CsvRecord, convert_csv_record)
//! ```

use crate::io::csv_format::{convert_csv_record, CsvRecord};
use crate::io::sync_reader::with_line;
use crate::types::{LedgerCommand, LedgerError};
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;
use tracing::warn;

/// Asynchronous CSV reader
///
/// Provides a batch reading interface over ledger commands.
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
    line_num: u64,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    /// Create a new AsyncReader from an async reader
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self {
            csv_reader,
            line_num: 1,
        }
    }

    /// Read a batch of commands
    ///
    /// Reads up to `batch_size` valid commands. Records that fail to parse or
    /// convert are logged and skipped; they do not count towards the batch.
    ///
    /// # Returns
    ///
    /// The commands in file order. An empty vector means end of file.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<LedgerCommand> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<CsvRecord>();

        while batch.len() < batch_size {
            let Some(record) = records.next().await else {
                break;
            };
            self.line_num += 1;

            let command = record
                .map_err(LedgerError::from)
                .and_then(convert_csv_record)
                .map_err(|error| with_line(error, self.line_num));
            match command {
                Ok(command) => batch.push(command),
                Err(error) => warn!(%error, "skipping command record"),
            }
        }

        batch
    }
}
