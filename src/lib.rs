//! Ledger Engine Library
//! # Overview
//!
//! This library provides an in-memory, transactional ledger: accounts with
//! fixed-point balances, atomic credit / debit / transfer operations, an
//! append-only transaction log and post-commit notifications. A CSV front end
//! drives it through a sync and an async strategy.
//!
//! # Architecture
//!
//! - [`types`] - Core data types (Account, LedgerEntry, LedgerCommand, LedgerError, ...)
//! - [`cli`] - CLI arguments parsing
//! - [`core`] - Business logic components:
//!   - [`core::account_store`] - Account state, per-account locks, unit of work
//!   - [`core::transaction_log`] - Append-only ledger entries
//!   - [`core::engine`] - Operation orchestration
//!   - [`core::notifier`] - Fire-and-forget notification dispatch
//!   - [`core::batch_processor`] - Partitioned concurrent command execution
//! - [`io`] - CSV readers and writers
//! - [`strategy`] - Sync and async processing pipelines
//! - [`observability`] - Tracing setup
//!
//! # Guarantees
//!
//! - A balance never goes below zero
//! - Every committed balance change has exactly one matching ledger entry,
//!   written in the same unit of work
//! - A transfer commits both legs or neither; both entries share a correlation id
//! - Operations on the same accounts never deadlock: locks are taken in
//!   ascending account id order and every wait is bounded
//! - Notifications are sent after commit and cannot fail an operation
//!
//! # Example
//!
//! ```no_run
//! use ledger_engine::{LedgerConfig, LedgerEngine, LogSink, OpenAccount, Owner, TransferIntent};
//! use rust_decimal::Decimal;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), ledger_engine::LedgerError> {
//! let engine = LedgerEngine::new(&LedgerConfig::default(), Arc::new(LogSink));
//! let x = engine.open_account(OpenAccount { account_id: None, owner: Owner::new("Xavier", "x@bank.test") })?;
//! let y = engine.open_account(OpenAccount { account_id: None, owner: Owner::new("Yvonne", "y@bank.test") })?;
//!
//! engine.credit_account(&x.id, Decimal::new(10000, 2)).await?;
//! let receipt = engine
//!     .transfer(&TransferIntent::new(x.id.clone(), y.id.clone(), Decimal::new(4000, 2)))
//!     .await?;
//! assert_eq!(receipt.source.balance, Decimal::new(6000, 2));
//! # Ok(())
//! # }
//! ```

// Module declarations
pub mod cli;
pub mod core;
pub mod io;
pub mod observability;
pub mod strategy;
pub mod types;

pub use core::{
    AccountStore, BalanceEnquiry, LedgerConfig, LedgerEngine, LogSink, NotificationSink,
    TransactionLog,
};
pub use io::{write_accounts_csv, write_journal_csv};
pub use types::{
    Account, AccountId, AccountStatus, CommandOutcome, CorrelationId, EntryId, EntryType,
    LedgerCommand, LedgerEntry, LedgerError, LedgerEvent, NotifyError, OpenAccount, Owner,
    Posting, TransferIntent, TransferReceipt,
};
