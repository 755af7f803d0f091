use crate::core::LedgerConfig;
use crate::strategy::{BatchConfig, PipelineOptions};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Run ledger commands from a CSV file and print the resulting accounts
#[derive(Parser, Debug)]
#[command(name = "ledger-engine")]
#[command(about = "Run ledger commands from a CSV file and print the resulting accounts", long_about = None)]
pub struct CliArgs {
    /// Input CSV file path containing command records
    #[arg(value_name = "INPUT", help = "Path to the input CSV file")]
    pub input_file: PathBuf,

    /// Processing strategy
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "async",
        help = "Processing strategy: 'sync' for sequential or 'async' for partitioned batches"
    )]
    pub strategy: StrategyType,

    /// Number of commands per batch (async mode only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of commands per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Worker threads running command groups (async mode only)
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Number of worker threads running command groups (default: CPU cores)"
    )]
    pub max_concurrent_batches: Option<usize>,

    /// Longest wait for one account lock
    #[arg(
        long = "lock-timeout-ms",
        value_name = "MILLIS",
        help = "Longest wait for one account lock in milliseconds (default: 2000)"
    )]
    pub lock_timeout_ms: Option<u64>,

    /// Notification queue capacity
    #[arg(
        long = "notify-capacity",
        value_name = "COUNT",
        help = "Capacity of the notification queue (default: 1024)"
    )]
    pub notify_capacity: Option<usize>,

    /// Optional journal output
    #[arg(
        long = "journal",
        value_name = "PATH",
        help = "Write every ledger entry to this CSV file"
    )]
    pub journal: Option<PathBuf>,
}

/// Available processing strategies
#[derive(Clone, Debug, PartialEq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

impl CliArgs {
    /// Create a BatchConfig from CLI arguments
    ///
    /// Missing values fall back to defaults; zero values are replaced by the
    /// defaults with a warning.
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.max_concurrent_batches.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.max_concurrent_batches
                    .unwrap_or(default.max_concurrent_batches),
            )
        } else {
            BatchConfig::default()
        }
    }

    /// Create a LedgerConfig from CLI arguments
    pub fn to_ledger_config(&self) -> LedgerConfig {
        let default = LedgerConfig::default();
        LedgerConfig::new(
            self.lock_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(default.lock_timeout),
            self.notify_capacity
                .unwrap_or(default.notification_capacity),
        )
    }

    /// Settings shared by both strategies
    pub fn to_pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            ledger: self.to_ledger_config(),
            journal: self.journal.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::default_strategy(&["program", "input.csv"], StrategyType::Async)]
    #[case::explicit_sync(&["program", "--strategy", "sync", "input.csv"], StrategyType::Sync)]
    #[case::explicit_async(&["program", "--strategy", "async", "input.csv"], StrategyType::Async)]
    fn test_strategy_parsing(#[case] args: &[&str], #[case] expected: StrategyType) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert_eq!(parsed.strategy, expected);
    }

    #[rstest]
    #[case::all_defaults(&["program", "input.csv"], 1000, num_cpus::get())]
    #[case::custom_batch_size(&["program", "--batch-size", "2000", "input.csv"], 2000, num_cpus::get())]
    #[case::custom_max_concurrent(&["program", "--max-concurrent", "8", "input.csv"], 1000, 8)]
    #[case::zero_batch_size(&["program", "--batch-size", "0", "input.csv"], 1000, num_cpus::get())]
    fn test_batch_config_conversion(
        #[case] args: &[&str],
        #[case] expected_batch_size: usize,
        #[case] expected_max_concurrent: usize,
    ) {
        let config = CliArgs::try_parse_from(args).unwrap().to_batch_config();

        assert_eq!(config.batch_size, expected_batch_size);
        assert_eq!(config.max_concurrent_batches, expected_max_concurrent);
    }

    #[rstest]
    #[case::defaults(&["program", "input.csv"], 2000, 1024)]
    #[case::custom(
        &["program", "--lock-timeout-ms", "250", "--notify-capacity", "16", "input.csv"],
        250,
        16
    )]
    #[case::zero_timeout(&["program", "--lock-timeout-ms", "0", "input.csv"], 2000, 1024)]
    fn test_ledger_config_conversion(
        #[case] args: &[&str],
        #[case] expected_timeout_ms: u64,
        #[case] expected_capacity: usize,
    ) {
        let config = CliArgs::try_parse_from(args).unwrap().to_ledger_config();

        assert_eq!(config.lock_timeout, Duration::from_millis(expected_timeout_ms));
        assert_eq!(config.notification_capacity, expected_capacity);
    }

    #[test]
    fn test_journal_path_is_passed_through() {
        let parsed =
            CliArgs::try_parse_from(["program", "--journal", "entries.csv", "input.csv"]).unwrap();

        let options = parsed.to_pipeline_options();

        assert_eq!(options.journal, Some(PathBuf::from("entries.csv")));
    }

    #[rstest]
    #[case::missing_input(&["program"])]
    #[case::invalid_strategy(&["program", "--strategy", "invalid", "input.csv"])]
    #[case::negative_timeout(&["program", "--lock-timeout-ms", "-1", "input.csv"])]
    fn test_parsing_errors(#[case] args: &[&str]) {
        assert!(CliArgs::try_parse_from(args).is_err());
    }
}
