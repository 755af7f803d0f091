//! Synchronous processing strategy
//!
//! This module provides a single-threaded implementation of the
//! ProcessingStrategy trait. It streams commands from the `SyncReader` and
//! runs them through the `LedgerEngine` one at a time, in file order, on a
//! current-thread tokio runtime.
//!
//! Memory usage is O(accounts + entries): records are read one at a time and
//! never buffered.

use crate::core::{LedgerEngine, LogSink};
use crate::io::sync_reader::SyncReader;
use crate::strategy::{finish, PipelineOptions, ProcessingStrategy};
use crate::types::LedgerError;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// Synchronous processing strategy
///
/// # Examples
///
/// ```no_run
/// use ledger_engine::strategy::{PipelineOptions, ProcessingStrategy, SyncProcessingStrategy};
/// use std::path::Path;
/// use std::io;
///
/// let strategy = SyncProcessingStrategy::new(PipelineOptions::default());
/// let mut output = io::stdout();
///
/// strategy.process(Path::new("commands.csv"), &mut output)
///     .expect("Processing failed");
/// ```
#[derive(Debug, Clone, Default)]
pub struct SyncProcessingStrategy {
    options: PipelineOptions,
}

impl SyncProcessingStrategy {
    pub fn new(options: PipelineOptions) -> Self {
        Self { options }
    }
}

impl ProcessingStrategy for SyncProcessingStrategy {
    /// Process commands from input file and write results to output
    ///
    /// 1. Opens the input with a `SyncReader`
    /// 2. Executes each command through the `LedgerEngine`, in order
    /// 3. Writes the final account states (and the journal, if requested)
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), LedgerError> {
        let reader = SyncReader::new(input_path)?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        runtime.block_on(async {
            let engine = LedgerEngine::new(&self.options.ledger, Arc::new(LogSink));

            for record in reader {
                match record {
                    Ok(command) => {
                        let name = command.name();
                        if let Err(error) = engine.execute(command).await {
                            warn!(command = name, %error, "command rejected");
                        }
                    }
                    Err(error) => warn!(%error, "skipping command record"),
                }
            }

            finish(&engine, output, self.options.journal.as_deref()).await
        })
    }
}
