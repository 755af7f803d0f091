//! CSV format handling for command records, account output and the journal
//!
//! This module centralizes all CSV format concerns, providing:
//! - CsvRecord structure for deserialization
//! - Conversion from CSV records to ledger commands
//! - Account and journal output serialization
//!
//! All functions are pure (no file access) for easy testing.

use crate::types::money::parse_amount;
use crate::types::{Account, AccountId, LedgerCommand, LedgerEntry, LedgerError, OpenAccount, Owner, TransferIntent};
use chrono::SecondsFormat;
use csv::Writer;
use serde::Deserialize;
use std::io::Write;

/// CSV record structure for deserialization
///
/// Matches the input CSV format with columns:
/// command, account, counterparty, amount, owner, email.
/// Which fields are required depends on the command.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct CsvRecord {
    pub command: String,
    pub account: Option<String>,
    pub counterparty: Option<String>,
    pub amount: Option<String>,
    pub owner: Option<String>,
    pub email: Option<String>,
}

/// Convert a CsvRecord to a LedgerCommand
///
/// | command    | required fields                  |
/// |------------|----------------------------------|
/// | `open`     | owner, email (account optional)  |
/// | `credit`   | account, amount                  |
/// | `debit`    | account, amount                  |
/// | `transfer` | account, counterparty, amount    |
/// | `close`    | account                          |
///
/// Command names are case-insensitive.
///
/// # Errors
///
/// - `ParseError` for unknown commands or missing fields
/// - `InvalidAmount` if the amount is not a valid posting amount
pub fn convert_csv_record(csv_record: CsvRecord) -> Result<LedgerCommand, LedgerError> {
    let command = csv_record.command.trim().to_lowercase();

    match command.as_str() {
        "open" => Ok(LedgerCommand::Open(OpenAccount {
            account_id: present(&csv_record.account).map(AccountId::new),
            owner: Owner::new(
                required(&csv_record.owner, "owner", &command)?,
                required(&csv_record.email, "email", &command)?,
            ),
        })),
        "credit" => Ok(LedgerCommand::Credit {
            account: AccountId::new(required(&csv_record.account, "account", &command)?),
            amount: parse_amount(&required(&csv_record.amount, "amount", &command)?)?,
        }),
        "debit" => Ok(LedgerCommand::Debit {
            account: AccountId::new(required(&csv_record.account, "account", &command)?),
            amount: parse_amount(&required(&csv_record.amount, "amount", &command)?)?,
        }),
        "transfer" => Ok(LedgerCommand::Transfer(TransferIntent::new(
            AccountId::new(required(&csv_record.account, "account", &command)?),
            AccountId::new(required(&csv_record.counterparty, "counterparty", &command)?),
            parse_amount(&required(&csv_record.amount, "amount", &command)?)?,
        ))),
        "close" => Ok(LedgerCommand::Close {
            account: AccountId::new(required(&csv_record.account, "account", &command)?),
        }),
        _ => Err(LedgerError::parse_error(
            None,
            format!("unknown command '{}'", csv_record.command),
        )),
    }
}

fn present(field: &Option<String>) -> Option<String> {
    field
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn required(field: &Option<String>, name: &str, command: &str) -> Result<String, LedgerError> {
    present(field)
        .ok_or_else(|| LedgerError::parse_error(None, format!("{command} requires {name}")))
}

/// Write account states to CSV format
///
/// Columns: account, owner, balance, status. Accounts are sorted by id for
/// deterministic output and balances are written with two decimals.
pub fn write_accounts_csv(accounts: &[Account], output: &mut dyn Write) -> Result<(), LedgerError> {
    let mut writer = Writer::from_writer(output);

    writer.write_record(["account", "owner", "balance", "status"])?;

    let mut sorted_accounts: Vec<&Account> = accounts.iter().collect();
    sorted_accounts.sort_by(|a, b| a.id.cmp(&b.id));

    for account in sorted_accounts {
        writer.write_record([
            account.id.to_string(),
            account.owner.name.clone(),
            format!("{:.2}", account.balance),
            account.status.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Write ledger entries to CSV format
///
/// Columns: entry, account, type, amount, balance, correlation, timestamp.
/// Entries are written in the order given; the correlation column is empty
/// for single-account postings.
pub fn write_journal_csv(entries: &[LedgerEntry], output: &mut dyn Write) -> Result<(), LedgerError> {
    let mut writer = Writer::from_writer(output);

    writer.write_record([
        "entry",
        "account",
        "type",
        "amount",
        "balance",
        "correlation",
        "timestamp",
    ])?;

    for entry in entries {
        writer.write_record([
            entry.id.to_string(),
            entry.account_id.to_string(),
            entry.entry_type.to_string(),
            format!("{:.2}", entry.amount),
            format!("{:.2}", entry.balance_after),
            entry
                .correlation_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
            entry.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccountStatus, CorrelationId, EntryId, EntryType, NewLedgerEntry};
    use chrono::{TimeZone, Utc};
    use rstest::rstest;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn record(command: &str, account: &str, counterparty: &str, amount: &str) -> CsvRecord {
        let field = |value: &str| (!value.is_empty()).then(|| value.to_string());
        CsvRecord {
            command: command.to_string(),
            account: field(account),
            counterparty: field(counterparty),
            amount: field(amount),
            owner: None,
            email: None,
        }
    }

    #[rstest]
    #[case::credit("credit", LedgerCommand::Credit { account: "X".into(), amount: dec!(10.50) })]
    #[case::debit_upper_case("DEBIT", LedgerCommand::Debit { account: "X".into(), amount: dec!(10.50) })]
    fn test_convert_posting(#[case] command: &str, #[case] expected: LedgerCommand) {
        let result = convert_csv_record(record(command, "X", "", "10.5"));
        assert_eq!(result.unwrap(), expected);
    }

    #[test]
    fn test_convert_transfer() {
        let result = convert_csv_record(record("Transfer", "X", "Y", " 40.00 "));

        assert_eq!(
            result.unwrap(),
            LedgerCommand::Transfer(TransferIntent::new("X".into(), "Y".into(), dec!(40.00)))
        );
    }

    #[rstest]
    #[case::with_id(Some("2026000001"), Some(AccountId::new("2026000001")))]
    #[case::generated(None, None)]
    #[case::blank_id(Some("  "), None)]
    fn test_convert_open(#[case] account: Option<&str>, #[case] expected_id: Option<AccountId>) {
        let csv_record = CsvRecord {
            command: "open".to_string(),
            account: account.map(str::to_string),
            owner: Some("Ada Lovelace".to_string()),
            email: Some("ada@bank.test".to_string()),
            ..CsvRecord::default()
        };

        let command = convert_csv_record(csv_record).unwrap();

        assert_eq!(
            command,
            LedgerCommand::Open(OpenAccount {
                account_id: expected_id,
                owner: Owner::new("Ada Lovelace", "ada@bank.test"),
            })
        );
    }

    #[rstest]
    #[case::unknown_command(record("refund", "X", "", "1.00"), "unknown command 'refund'")]
    #[case::credit_missing_amount(record("credit", "X", "", ""), "credit requires amount")]
    #[case::debit_missing_account(record("debit", "", "", "1.00"), "debit requires account")]
    #[case::transfer_missing_counterparty(record("transfer", "X", "", "1.00"), "transfer requires counterparty")]
    #[case::open_missing_owner(record("open", "X", "", ""), "open requires owner")]
    #[case::negative_amount(record("credit", "X", "", "-5.00"), "must be positive")]
    #[case::too_precise(record("credit", "X", "", "1.001"), "more than 2 fractional digits")]
    #[case::not_a_number(record("credit", "X", "", "ten"), "not a decimal number")]
    fn test_convert_csv_record_errors(#[case] csv_record: CsvRecord, #[case] expected_error: &str) {
        let error = convert_csv_record(csv_record).unwrap_err();
        assert!(
            error.to_string().contains(expected_error),
            "unexpected error: {error}"
        );
    }

    fn account(id: &str, name: &str, balance: Decimal, status: AccountStatus) -> Account {
        let mut account = Account::new(id.into(), Owner::new(name, format!("{id}@bank.test")));
        account.balance = balance;
        account.status = status;
        account
    }

    #[rstest]
    #[case::empty_accounts(vec![], "account,owner,balance,status\n")]
    #[case::sorted_by_account_id(
        vec![
            account("B", "Bob", dec!(5), AccountStatus::Active),
            account("A", "Ada", dec!(60.5), AccountStatus::Active),
        ],
        "account,owner,balance,status\nA,Ada,60.50,ACTIVE\nB,Bob,5.00,ACTIVE\n"
    )]
    #[case::closed_account(
        vec![account("A", "Ada", Decimal::ZERO, AccountStatus::Closed)],
        "account,owner,balance,status\nA,Ada,0.00,CLOSED\n"
    )]
    #[case::owner_with_comma(
        vec![account("A", "Lovelace, Ada", dec!(1.00), AccountStatus::Active)],
        "account,owner,balance,status\nA,\"Lovelace, Ada\",1.00,ACTIVE\n"
    )]
    fn test_write_accounts_csv(#[case] accounts: Vec<Account>, #[case] expected_output: &str) {
        let mut output = Vec::new();
        write_accounts_csv(&accounts, &mut output).unwrap();

        assert_eq!(String::from_utf8(output).unwrap(), expected_output);
    }

    #[test]
    fn test_write_journal_csv() {
        let timestamp = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let correlation = CorrelationId::new();
        let entries = vec![
            LedgerEntry::from_new(
                EntryId(1),
                NewLedgerEntry {
                    account_id: "X".into(),
                    entry_type: EntryType::Credit,
                    amount: dec!(100),
                    balance_after: dec!(100),
                    correlation_id: None,
                },
                timestamp,
            ),
            LedgerEntry::from_new(
                EntryId(2),
                NewLedgerEntry {
                    account_id: "X".into(),
                    entry_type: EntryType::Debit,
                    amount: dec!(40.00),
                    balance_after: dec!(60.00),
                    correlation_id: Some(correlation),
                },
                timestamp,
            ),
        ];

        let mut output = Vec::new();
        write_journal_csv(&entries, &mut output).unwrap();

        let expected = format!(
            "entry,account,type,amount,balance,correlation,timestamp\n\
             1,X,CREDIT,100.00,100.00,,2026-03-01T12:00:00.000000Z\n\
             2,X,DEBIT,40.00,60.00,{correlation},2026-03-01T12:00:00.000000Z\n"
        );
        assert_eq!(String::from_utf8(output).unwrap(), expected);
    }
}
