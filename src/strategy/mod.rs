//! Processing strategy module for ledger command files
//!
//! This module defines the Strategy pattern for complete processing pipelines,
//! covering CSV parsing, command execution through the ledger engine and
//! output. Different implementations (synchronous, asynchronous batch) are
//! selected at runtime.

use crate::cli::StrategyType;
use crate::core::{LedgerConfig, LedgerEngine};
use crate::io::csv_format::{write_accounts_csv, write_journal_csv};
use crate::types::LedgerError;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use sync::SyncProcessingStrategy;

/// Settings shared by every strategy
#[derive(Clone, Debug, Default)]
pub struct PipelineOptions {
    /// Engine configuration
    pub ledger: LedgerConfig,
    /// Where to write the ledger journal, if anywhere
    pub journal: Option<PathBuf>,
}

/// Processing strategy trait for complete command pipelines
pub trait ProcessingStrategy: Send + Sync {
    /// Run every command in the input file and write the final account states
    ///
    /// Individual command failures (malformed rows, rejected operations) are
    /// logged and skipped; they never make this method fail.
    ///
    /// # Errors
    ///
    /// - `FileNotFound` / `IoError` if the input cannot be read or an output
    ///   cannot be written
    fn process(&self, input_path: &Path, output: &mut dyn Write) -> Result<(), LedgerError>;
}

/// Create a processing strategy based on the specified strategy type
///
/// # Arguments
///
/// * `strategy_type` - Sync or Async
/// * `config` - Batch settings for the async strategy (ignored for sync)
/// * `options` - Engine configuration and journal output
pub fn create_strategy(
    strategy_type: StrategyType,
    config: Option<BatchConfig>,
    options: PipelineOptions,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy::new(options)),
        StrategyType::Async => {
            let config = config.unwrap_or_default();
            Box::new(AsyncProcessingStrategy::new(config, options))
        }
    }
}

/// Drain notifications, then write accounts and the optional journal
pub(crate) async fn finish(
    engine: &LedgerEngine,
    output: &mut dyn Write,
    journal: Option<&Path>,
) -> Result<(), LedgerError> {
    engine.flush_notifications().await;

    let accounts = engine.accounts().await?;
    write_accounts_csv(&accounts, output)?;

    if let Some(path) = journal {
        let mut file = BufWriter::new(File::create(path)?);
        write_journal_csv(&engine.log().all_entries(), &mut file)?;
        file.flush()?;
    }

    let stats = engine.notification_stats();
    info!(
        accounts = accounts.len(),
        entries = engine.log().len(),
        notifications_delivered = stats.delivered,
        notifications_dropped = stats.dropped,
        "processing finished"
    );
    Ok(())
}
