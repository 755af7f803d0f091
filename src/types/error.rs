//! Error types for the ledger engine
//!
//! This module defines every error a ledger operation or the CSV front end can
//! report. Each variant carries enough context to be reported to the caller
//! as a structured result.
//!
//! # Error Categories
//!
//! - **Rejections**: the request failed validation; nothing was applied
//!   (`AccountNotFound`, `InvalidAmount`, `InsufficientFunds`, `AccountClosed`,
//!   `SameAccount`, `AccountExists`, `NonZeroBalance`)
//! - **Contention**: `Busy` (lock wait timed out), `Conflict` (write collided
//!   with an existing record)
//! - **Arithmetic**: `ArithmeticOverflow`, aborts the whole unit of work
//! - **File I/O and CSV**: front-end failures while reading commands

use super::account::AccountId;
use rust_decimal::Decimal;
use thiserror::Error;

/// Main error type for the ledger engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// No account exists with this id
    #[error("Account {account} not found")]
    AccountNotFound { account: AccountId },

    /// Amount is not positive or has the wrong scale
    #[error("Invalid amount '{amount}': {reason}")]
    InvalidAmount { amount: String, reason: String },

    /// Debit would take the balance below zero
    #[error("Insufficient funds in account {account}: available {available}, requested {requested}")]
    InsufficientFunds {
        account: AccountId,
        available: Decimal,
        requested: Decimal,
    },

    /// Account is closed and accepts no postings
    #[error("Account {account} is closed")]
    AccountClosed { account: AccountId },

    /// Transfer source and destination are the same account
    #[error("Cannot transfer from account {account} to itself")]
    SameAccount { account: AccountId },

    /// The account lock could not be acquired in time
    #[error("Account {account} is busy: lock not acquired within {waited_ms} ms")]
    Busy { account: AccountId, waited_ms: u64 },

    /// The write collided with an existing record
    #[error("Write conflict on account {account}: id already taken")]
    Conflict { account: AccountId },

    /// An account is already registered for this owner e-mail
    #[error("An account already exists for {email}")]
    AccountExists { email: String },

    /// Account still holds funds and cannot be closed
    #[error("Account {account} cannot be closed with balance {balance}")]
    NonZeroBalance { account: AccountId, balance: Decimal },

    /// Balance arithmetic would overflow
    #[error("Arithmetic overflow in {operation} for account {account}")]
    ArithmeticOverflow {
        operation: String,
        account: AccountId,
    },

    /// Input file not found at the specified path
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    /// I/O error while reading or writing files
    #[error("I/O error: {message}")]
    IoError { message: String },

    /// Malformed command record
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    ParseError { line: Option<u64>, message: String },
}

impl From<std::io::Error> for LedgerError {
    fn from(error: std::io::Error) -> Self {
        LedgerError::IoError {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for LedgerError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        LedgerError::ParseError {
            line,
            message: error.to_string(),
        }
    }
}

impl From<csv_async::Error> for LedgerError {
    fn from(error: csv_async::Error) -> Self {
        LedgerError::ParseError {
            line: None,
            message: error.to_string(),
        }
    }
}

/// Failure to deliver a notification
///
/// Never surfaced to the caller of a ledger operation; the dispatcher logs it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    /// The downstream channel refused the message
    #[error("Notification rejected: {0}")]
    Rejected(String),

    /// The downstream channel could not be reached
    #[error("Notification channel unavailable: {0}")]
    Unavailable(String),
}

// Helper functions for creating common errors

impl LedgerError {
    pub fn account_not_found(account: &AccountId) -> Self {
        LedgerError::AccountNotFound {
            account: account.clone(),
        }
    }

    pub fn invalid_amount(amount: Decimal, reason: &str) -> Self {
        LedgerError::InvalidAmount {
            amount: amount.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn insufficient_funds(account: &AccountId, available: Decimal, requested: Decimal) -> Self {
        LedgerError::InsufficientFunds {
            account: account.clone(),
            available,
            requested,
        }
    }

    pub fn account_closed(account: &AccountId) -> Self {
        LedgerError::AccountClosed {
            account: account.clone(),
        }
    }

    pub fn same_account(account: &AccountId) -> Self {
        LedgerError::SameAccount {
            account: account.clone(),
        }
    }

    pub fn busy(account: &AccountId, waited_ms: u64) -> Self {
        LedgerError::Busy {
            account: account.clone(),
            waited_ms,
        }
    }

    pub fn conflict(account: &AccountId) -> Self {
        LedgerError::Conflict {
            account: account.clone(),
        }
    }

    pub fn arithmetic_overflow(operation: &str, account: &AccountId) -> Self {
        LedgerError::ArithmeticOverflow {
            operation: operation.to_string(),
            account: account.clone(),
        }
    }

    pub fn parse_error(line: Option<u64>, message: impl Into<String>) -> Self {
        LedgerError::ParseError {
            line,
            message: message.into(),
        }
    }

    /// Whether the failure came from lock contention rather than the request
    pub fn is_contention(&self) -> bool {
        matches!(self, LedgerError::Busy { .. } | LedgerError::Conflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case::not_found(
        LedgerError::account_not_found(&"X".into()),
        "Account X not found"
    )]
    #[case::insufficient_funds(
        LedgerError::insufficient_funds(&"X".into(), dec!(100.00), dec!(150.00)),
        "Insufficient funds in account X: available 100.00, requested 150.00"
    )]
    #[case::closed(LedgerError::account_closed(&"X".into()), "Account X is closed")]
    #[case::same_account(
        LedgerError::same_account(&"X".into()),
        "Cannot transfer from account X to itself"
    )]
    #[case::busy(
        LedgerError::busy(&"X".into(), 250),
        "Account X is busy: lock not acquired within 250 ms"
    )]
    #[case::conflict(
        LedgerError::conflict(&"X".into()),
        "Write conflict on account X: id already taken"
    )]
    #[case::parse_error_with_line(
        LedgerError::parse_error(Some(3), "unknown command"),
        "CSV parse error at line 3: unknown command"
    )]
    #[case::parse_error_without_line(
        LedgerError::parse_error(None, "unknown command"),
        "CSV parse error: unknown command"
    )]
    fn test_error_display(#[case] error: LedgerError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[rstest]
    #[case(LedgerError::busy(&"X".into(), 1), true)]
    #[case(LedgerError::conflict(&"X".into()), true)]
    #[case(LedgerError::account_closed(&"X".into()), false)]
    fn test_is_contention(#[case] error: LedgerError, #[case] expected: bool) {
        assert_eq!(error.is_contention(), expected);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "Permission denied");
        let error: LedgerError = io_error.into();
        assert_eq!(error.to_string(), "I/O error: Permission denied");
    }
}
