//! Types module
//!
//! Contains core data structures used throughout the application.
//! - `account`: Account, owner and identifier types
//! - `entry`: Ledger entries, transfer intents and posting receipts
//! - `event`: Post-commit notification events
//! - `command`: Commands accepted by the engine
//! - `money`: Fixed-point amount validation
//! - `error`: Error types for the ledger engine

pub mod account;
pub mod command;
pub mod entry;
pub mod error;
pub mod event;
pub mod money;

pub use account::{Account, AccountId, AccountStatus, Owner};
pub use command::{CommandOutcome, LedgerCommand, OpenAccount};
pub use entry::{
    CorrelationId, EntryId, EntryType, LedgerEntry, NewLedgerEntry, Posting, TransferIntent,
    TransferReceipt,
};
pub use error::{LedgerError, NotifyError};
pub use event::LedgerEvent;
