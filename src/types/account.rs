//! Account-related types for the ledger engine
//!
//! This module defines the Account structure, its identifier and owner,
//! and the lifecycle status an account moves through.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::fmt;

/// Account identifier
///
/// Immutable once assigned. Identifiers are compared lexically, and that
/// ordering is the lock-acquisition order used by multi-account operations.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccountId(String);

impl AccountId {
    /// Wrap a raw account number
    pub fn new(id: impl Into<String>) -> Self {
        AccountId(id.into())
    }

    /// Borrow the raw account number
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the id has the shape of a generated account number
    ///
    /// Generated numbers are a four-digit year followed by at least six
    /// sequence digits.
    pub fn is_generated_shape(&self) -> bool {
        self.0.len() >= 10 && self.0.bytes().all(|b| b.is_ascii_digit())
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        AccountId::new(id)
    }
}

/// Identity of the account holder
///
/// Supplied by the identity provider in front of the engine and trusted
/// as-is. The e-mail address is unique across all accounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
    /// Display name, returned by name enquiries
    pub name: String,

    /// Contact address, also the uniqueness key for account opening
    pub email: String,
}

impl Owner {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Owner {
            name: name.into(),
            email: email.into(),
        }
    }
}

/// Account lifecycle status
///
/// Accounts are never deleted; closing moves them to `Closed`, after which
/// every balance mutation is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountStatus {
    Active,
    Closed,
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountStatus::Active => f.write_str("ACTIVE"),
            AccountStatus::Closed => f.write_str("CLOSED"),
        }
    }
}

/// Account state
///
/// The balance is a fixed-point decimal with two fractional digits and is
/// never negative in any committed state.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    /// Unique account number
    pub id: AccountId,

    /// Holder identity captured at opening
    pub owner: Owner,

    /// Current balance
    pub balance: Decimal,

    /// Whether the account still accepts postings
    pub status: AccountStatus,

    /// When the account was opened
    pub opened_at: DateTime<Utc>,
}

impl Account {
    /// Create a new active account with a zero balance
    ///
    /// # Arguments
    ///
    /// * `id` - The account number
    /// * `owner` - The holder identity
    pub fn new(id: AccountId, owner: Owner) -> Self {
        Account {
            id,
            owner,
            balance: Decimal::new(0, 2),
            status: AccountStatus::Active,
            opened_at: Utc::now(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }
}
