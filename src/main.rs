//! Ledger Engine CLI
//!
//! Command-line interface for running ledger commands from CSV files.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- commands.csv > accounts.csv
//! cargo run -- --strategy sync commands.csv > accounts.csv
//! cargo run -- --strategy async --batch-size 2000 --max-concurrent 8 commands.csv > accounts.csv
//! cargo run -- --journal entries.csv --lock-timeout-ms 500 commands.csv > accounts.csv
//! RUST_LOG=debug cargo run -- commands.csv > accounts.csv
//! ```
//!
//! The program reads commands (open, credit, debit, transfer, close) from the
//! input CSV file, runs them through the ledger engine using the selected
//! processing strategy, and writes the final account states to stdout.
//! Diagnostics are logged to stderr.
//!
//! # Processing Strategies
//!
//! - **sync**: one command at a time, in file order
//! - **async**: batches partitioned into independent groups run in parallel (default)
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (missing arguments, file not found, file not readable, etc.)

use ledger_engine::cli;
use ledger_engine::observability;
use ledger_engine::strategy;
use std::process;

fn main() {
    observability::init();

    let args = cli::parse_args();

    let strategy = {
        let config = if matches!(args.strategy, cli::StrategyType::Async) {
            Some(args.to_batch_config())
        } else {
            None
        };
        strategy::create_strategy(args.strategy.clone(), config, args.to_pipeline_options())
    };

    let mut output = std::io::stdout();
    if let Err(e) = strategy.process(&args.input_file, &mut output) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
