//! Core business logic module
//!
//! This module contains the ledger components:
//! - `config` - Engine configuration
//! - `traits` - Seams for external collaborators
//! - `account_store` - Account state, per-account locks and the unit of work
//! - `transaction_log` - Append-only ledger entries
//! - `engine` - Operation orchestration
//! - `notifier` - Post-commit event dispatch
//! - `batch_processor` - Partitioned concurrent command execution

pub mod account_store;
pub mod batch_processor;
pub mod config;
pub mod engine;
pub mod notifier;
pub mod traits;
pub mod transaction_log;

pub use account_store::{AccountStore, OperationStage, UnitOfWork};
pub use batch_processor::{BatchProcessor, ProcessingResult};
pub use config::LedgerConfig;
pub use engine::{BalanceEnquiry, LedgerEngine};
pub use notifier::{DispatchStats, LogSink, NotificationDispatcher};
pub use traits::NotificationSink;
pub use transaction_log::TransactionLog;
