//! Ledger entry types
//!
//! This module defines the immutable records written to the transaction log
//! and the transfer intent that decomposes into two of them.

use super::account::AccountId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;
use uuid::Uuid;

/// Ledger entry identifier
///
/// Assigned by the transaction log on append, strictly increasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryId(pub u64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier linking the debit and credit legs of one transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Generate a fresh, time-ordered correlation id
    pub fn new() -> Self {
        CorrelationId(Uuid::now_v7())
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Direction of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    /// Funds added to the account
    Credit,
    /// Funds removed from the account
    Debit,
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryType::Credit => f.write_str("CREDIT"),
            EntryType::Debit => f.write_str("DEBIT"),
        }
    }
}

/// Entry staged inside a unit of work, not yet appended to the log
#[derive(Debug, Clone, PartialEq)]
pub struct NewLedgerEntry {
    pub account_id: AccountId,
    pub entry_type: EntryType,
    pub amount: Decimal,
    pub balance_after: Decimal,
    pub correlation_id: Option<CorrelationId>,
}

/// Committed ledger entry
///
/// Immutable once written. The log hands out clones only.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    /// Log-assigned identifier
    pub id: EntryId,

    /// Account the entry belongs to
    pub account_id: AccountId,

    /// Credit or debit
    pub entry_type: EntryType,

    /// Positive amount moved by this entry
    pub amount: Decimal,

    /// Account balance right after this entry was applied
    pub balance_after: Decimal,

    /// Commit time of the unit of work that wrote the entry
    pub timestamp: DateTime<Utc>,

    /// Shared by both legs of a transfer, `None` for plain postings
    pub correlation_id: Option<CorrelationId>,
}

impl LedgerEntry {
    pub(crate) fn from_new(id: EntryId, entry: NewLedgerEntry, timestamp: DateTime<Utc>) -> Self {
        LedgerEntry {
            id,
            account_id: entry.account_id,
            entry_type: entry.entry_type,
            amount: entry.amount,
            balance_after: entry.balance_after,
            timestamp,
            correlation_id: entry.correlation_id,
        }
    }
}

/// Request to move funds between two accounts
///
/// Not persisted as such; it is decomposed into a debit entry on the source
/// and a credit entry on the destination sharing one correlation id.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferIntent {
    pub source: AccountId,
    pub destination: AccountId,
    pub amount: Decimal,
}

impl TransferIntent {
    pub fn new(source: AccountId, destination: AccountId, amount: Decimal) -> Self {
        TransferIntent {
            source,
            destination,
            amount,
        }
    }
}

/// Result of a committed single-account posting
#[derive(Debug, Clone, PartialEq)]
pub struct Posting {
    pub account_id: AccountId,
    /// Balance after the posting committed
    pub balance: Decimal,
    pub entry_id: EntryId,
}

/// Result of a committed transfer
#[derive(Debug, Clone, PartialEq)]
pub struct TransferReceipt {
    pub correlation_id: CorrelationId,
    pub source: Posting,
    pub destination: Posting,
}
