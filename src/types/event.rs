//! Post-commit notification events
//!
//! Events are produced only after a unit of work commits and are handed to
//! the notification dispatcher for out-of-band delivery (e-mail alerts).

use super::account::AccountId;
use rust_decimal::Decimal;

/// Event describing a committed ledger change
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerEvent {
    /// A new account was opened
    AccountOpened {
        account_id: AccountId,
        owner_name: String,
        email: String,
    },

    /// Funds were added to an account
    Credited {
        account_id: AccountId,
        email: String,
        amount: Decimal,
        balance: Decimal,
    },

    /// Funds were removed from an account
    Debited {
        account_id: AccountId,
        email: String,
        amount: Decimal,
        balance: Decimal,
    },

    /// An account was closed
    AccountClosed { account_id: AccountId, email: String },
}

impl LedgerEvent {
    /// Account the event is about
    pub fn account_id(&self) -> &AccountId {
        match self {
            LedgerEvent::AccountOpened { account_id, .. }
            | LedgerEvent::Credited { account_id, .. }
            | LedgerEvent::Debited { account_id, .. }
            | LedgerEvent::AccountClosed { account_id, .. } => account_id,
        }
    }

    /// Alert subject line, mirroring the bank's e-mail templates
    pub fn subject(&self) -> &'static str {
        match self {
            LedgerEvent::AccountOpened { .. } => "ACCOUNT CREATION",
            LedgerEvent::Credited { .. } => "CREDIT ALERT",
            LedgerEvent::Debited { .. } => "DEBIT ALERT",
            LedgerEvent::AccountClosed { .. } => "ACCOUNT CLOSED",
        }
    }
}
