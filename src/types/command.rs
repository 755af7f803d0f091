//! Ledger commands and their outcomes
//!
//! A `LedgerCommand` is one request against the engine, as read from the
//! command CSV. `CommandOutcome` is what the engine returns on success.

use super::account::{Account, AccountId, Owner};
use super::entry::{Posting, TransferIntent, TransferReceipt};
use rust_decimal::Decimal;

const ACCOUNT_SEQUENCE_KEY: &str = "sequence:account-number";

/// Request to open an account
#[derive(Debug, Clone, PartialEq)]
pub struct OpenAccount {
    /// Explicit account number; one is generated when absent
    pub account_id: Option<AccountId>,
    pub owner: Owner,
}

/// One request against the ledger engine
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerCommand {
    Open(OpenAccount),
    Credit { account: AccountId, amount: Decimal },
    Debit { account: AccountId, amount: Decimal },
    Transfer(TransferIntent),
    Close { account: AccountId },
}

impl LedgerCommand {
    /// Keys whose state this command reads or writes
    ///
    /// Commands sharing a key must run in input order. Account ids and owner
    /// e-mails live in separate namespaces so they can never collide.
    pub fn conflict_keys(&self) -> Vec<String> {
        match self {
            LedgerCommand::Open(open) => {
                let mut keys = vec![format!("email:{}", open.owner.email)];
                // Generated numbers come from one shared sequence, and an
                // explicit id of the same shape can take one of them
                match &open.account_id {
                    Some(id) => {
                        keys.push(format!("account:{}", id));
                        if id.is_generated_shape() {
                            keys.push(ACCOUNT_SEQUENCE_KEY.to_string());
                        }
                    }
                    None => keys.push(ACCOUNT_SEQUENCE_KEY.to_string()),
                }
                keys
            }
            LedgerCommand::Credit { account, .. }
            | LedgerCommand::Debit { account, .. }
            | LedgerCommand::Close { account } => vec![format!("account:{}", account)],
            LedgerCommand::Transfer(intent) => vec![
                format!("account:{}", intent.source),
                format!("account:{}", intent.destination),
            ],
        }
    }

    /// Short command name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            LedgerCommand::Open(_) => "open",
            LedgerCommand::Credit { .. } => "credit",
            LedgerCommand::Debit { .. } => "debit",
            LedgerCommand::Transfer(_) => "transfer",
            LedgerCommand::Close { .. } => "close",
        }
    }
}

/// Successful result of a command
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Opened(Account),
    Posted(Posting),
    Transferred(TransferReceipt),
    Closed(Account),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_transfer_conflicts_on_both_accounts() {
        let command = LedgerCommand::Transfer(TransferIntent::new(
            "X".into(),
            "Y".into(),
            dec!(1.00),
        ));

        assert_eq!(command.conflict_keys(), vec!["account:X", "account:Y"]);
    }

    #[test]
    fn test_open_without_id_conflicts_on_number_sequence() {
        let command = LedgerCommand::Open(OpenAccount {
            account_id: None,
            owner: Owner::new("Ada", "ada@bank.test"),
        });

        assert_eq!(
            command.conflict_keys(),
            vec!["email:ada@bank.test", "sequence:account-number"]
        );
    }

    #[test]
    fn test_open_with_number_shaped_id_joins_sequence() {
        let command = LedgerCommand::Open(OpenAccount {
            account_id: Some("2026000001".into()),
            owner: Owner::new("Bob", "bob@bank.test"),
        });

        assert_eq!(
            command.conflict_keys(),
            vec![
                "email:bob@bank.test",
                "account:2026000001",
                "sequence:account-number"
            ]
        );
    }

    #[test]
    fn test_open_with_named_id_stays_independent() {
        let command = LedgerCommand::Open(OpenAccount {
            account_id: Some("1001".into()),
            owner: Owner::new("Bob", "bob@bank.test"),
        });

        assert_eq!(
            command.conflict_keys(),
            vec!["email:bob@bank.test", "account:1001"]
        );
    }
}
