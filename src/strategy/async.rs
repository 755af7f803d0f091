//! Asynchronous batch processing strategy
//!
//! This module provides a multi-threaded implementation of the
//! ProcessingStrategy trait. Commands are read in batches; each batch is
//! partitioned into groups that share no account or owner e-mail, and the
//! groups run concurrently.
//!
//! # Architecture
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── BatchConfig (batch_size, max_concurrent_batches)
//!     ├── AsyncReader (batch CSV reading)
//!     ├── BatchProcessor (conflict partitioning + tasks)
//!     └── LedgerEngine (thread-safe processing)
//!         ├── AccountStore (per-account locks)
//!         └── TransactionLog (append-only entries)
//! ```
//!
//! # Ordering
//!
//! - Batches are processed one after another, so a command never overtakes
//!   one from an earlier batch
//! - Within a batch, commands that share state stay in file order
//!
//! The resulting account states are identical to the sync strategy's.

use crate::core::{BatchProcessor, LedgerEngine, LogSink};
use crate::io::async_reader::AsyncReader;
use crate::strategy::{finish, PipelineOptions, ProcessingStrategy};
use crate::types::LedgerError;
use std::io::{ErrorKind, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Configuration for batch processing
///
/// Controls how commands are batched and the number of worker threads
/// for parallel processing within each batch.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchConfig {
    /// Number of commands per batch
    pub batch_size: usize,
    /// Number of runtime worker threads running command groups
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
    /// Zero values are invalid and fall back to the defaults with a warning.
    pub fn new(batch_size: usize, max_concurrent_batches: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            warn!(
                default = default.batch_size,
                "invalid batch_size (0), using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent_batches = if max_concurrent_batches == 0 {
            warn!(
                default = default.max_concurrent_batches,
                "invalid max_concurrent_batches (0), using default"
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

/// Asynchronous batch processing strategy
#[derive(Debug, Clone)]
pub struct AsyncProcessingStrategy {
    config: BatchConfig,
    options: PipelineOptions,
}

impl AsyncProcessingStrategy {
    pub fn new(config: BatchConfig, options: PipelineOptions) -> Self {
        Self { config, options }
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    /// Process commands from input file and write results to output
    ///
    /// 1. Builds a multi-threaded runtime with the configured worker count
    /// 2. Reads commands in batches using AsyncReader
    /// 3. Runs each batch through the BatchProcessor and waits for it
    /// 4. Writes the final account states (and the journal, if requested)
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), LedgerError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.max_concurrent_batches)
            .enable_all()
            .build()?;

        runtime.block_on(async {
            let file = tokio::fs::File::open(input_path).await.map_err(|e| match e.kind() {
                ErrorKind::NotFound => LedgerError::FileNotFound {
                    path: input_path.display().to_string(),
                },
                _ => LedgerError::from(e),
            })?;

            // Wrap tokio file in a compatibility layer for csv-async
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncReader::new(compat_file);

            let engine = LedgerEngine::new(&self.options.ledger, Arc::new(LogSink));
            let processor = BatchProcessor::new(engine.clone());

            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    break;
                }

                debug!(commands = batch.len(), "processing batch");
                for result in processor.process_batch(batch).await {
                    if let Err(error) = result.result {
                        warn!(command = result.command.name(), %error, "command rejected");
                    }
                }
            }

            finish(&engine, output, self.options.journal.as_deref()).await
        })
    }
}
