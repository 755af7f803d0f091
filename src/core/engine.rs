//! Ledger engine
//!
//! This module provides the `LedgerEngine` that validates and applies credit,
//! debit and transfer operations atomically against the `AccountStore`, writes
//! the matching entries to the `TransactionLog` in the same unit of work, and
//! hands post-commit events to the `NotificationDispatcher`.
//!
//! # Operation Lifecycle
//!
//! ```text
//! begin (locks) -> Validated -> Applied -> Logged -> Committed -> notify
//!        \             \____________\_________\
//!         Rejected              Aborted (unit of work dropped, nothing visible)
//! ```
//!
//! A committed operation is never rolled back; notification failures are
//! logged by the dispatcher and never reach the caller.
//!
//! # Architecture
//!
//! ```text
//! LedgerEngine (Clone)
//!     ├── Arc<AccountStore>        (balances, per-account locks)
//!     ├── Arc<TransactionLog>      (append-only entries)
//!     └── NotificationDispatcher   (fire-and-forget event queue)
//! ```

use crate::core::account_store::{AccountStore, OperationStage, UnitOfWork};
use crate::core::config::LedgerConfig;
use crate::core::notifier::{DispatchStats, NotificationDispatcher};
use crate::core::traits::NotificationSink;
use crate::core::transaction_log::TransactionLog;
use crate::types::money::validate_amount;
use crate::types::{
    Account, AccountId, AccountStatus, CommandOutcome, CorrelationId, EntryType, LedgerCommand,
    LedgerEntry, LedgerError, LedgerEvent, NewLedgerEntry, OpenAccount, Posting, TransferIntent,
    TransferReceipt,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::slice;
use std::sync::Arc;
use tracing::debug;

/// Answer to a balance enquiry
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceEnquiry {
    pub account_id: AccountId,
    pub account_name: String,
    pub balance: Decimal,
    pub status: AccountStatus,
}

/// Ledger engine
///
/// Cheap to clone; every clone shares the same store, log and dispatcher and
/// may be used from any number of tasks concurrently.
#[derive(Debug, Clone)]
pub struct LedgerEngine {
    store: Arc<AccountStore>,
    log: Arc<TransactionLog>,
    notifier: NotificationDispatcher,
}

impl LedgerEngine {
    /// Create an engine with an empty store and log
    ///
    /// Must be called from within a tokio runtime, the notification worker is
    /// spawned here.
    ///
    /// # Arguments
    ///
    /// * `config` - Lock timeout and notification queue settings
    /// * `sink` - Destination for post-commit events
    pub fn new(config: &LedgerConfig, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            store: Arc::new(AccountStore::new(config.lock_timeout)),
            log: Arc::new(TransactionLog::new()),
            notifier: NotificationDispatcher::spawn(sink, config.notification_capacity),
        }
    }

    pub fn store(&self) -> &AccountStore {
        &self.store
    }

    pub fn log(&self) -> &TransactionLog {
        &self.log
    }

    /// Open an account (createAccount)
    ///
    /// # Errors
    ///
    /// - `AccountExists` if the owner e-mail already has an account
    /// - `Conflict` if the requested account id is taken
    pub fn open_account(&self, request: OpenAccount) -> Result<Account, LedgerError> {
        let account = self
            .store
            .open(request.account_id, request.owner)
            .inspect_err(|error| debug!(operation = "open", %error, "rejected"))?;

        debug!(operation = "open", account = %account.id, "committed");
        self.notifier.notify(LedgerEvent::AccountOpened {
            account_id: account.id.clone(),
            owner_name: account.owner.name.clone(),
            email: account.owner.email.clone(),
        });
        Ok(account)
    }

    /// Add funds to an account (creditAccount)
    ///
    /// # Errors
    ///
    /// `InvalidAmount`, `AccountNotFound`, `AccountClosed`, `Busy`,
    /// `ArithmeticOverflow`
    pub async fn credit_account(
        &self,
        account_id: &AccountId,
        amount: Decimal,
    ) -> Result<Posting, LedgerError> {
        let amount = validate_amount(amount)?;
        let mut uow = self.store.begin(slice::from_ref(account_id)).await?;

        let result = uow.credit(account_id, amount);
        let balance = settle(&uow, "credit", result)?;
        let email = uow.account(account_id)?.owner.email.clone();

        let entry_id = uow.stage_entry(
            &self.log,
            NewLedgerEntry {
                account_id: account_id.clone(),
                entry_type: EntryType::Credit,
                amount,
                balance_after: balance,
                correlation_id: None,
            },
        );
        uow.commit(&self.log);

        debug!(operation = "credit", account = %account_id, %amount, %balance, "committed");
        self.notifier.notify(LedgerEvent::Credited {
            account_id: account_id.clone(),
            email,
            amount,
            balance,
        });

        Ok(Posting {
            account_id: account_id.clone(),
            balance,
            entry_id,
        })
    }

    /// Remove funds from an account (debitAccount)
    ///
    /// # Errors
    ///
    /// `InvalidAmount`, `AccountNotFound`, `AccountClosed`,
    /// `InsufficientFunds`, `Busy`
    pub async fn debit_account(
        &self,
        account_id: &AccountId,
        amount: Decimal,
    ) -> Result<Posting, LedgerError> {
        let amount = validate_amount(amount)?;
        let mut uow = self.store.begin(slice::from_ref(account_id)).await?;

        let result = uow.debit(account_id, amount);
        let balance = settle(&uow, "debit", result)?;
        let email = uow.account(account_id)?.owner.email.clone();

        let entry_id = uow.stage_entry(
            &self.log,
            NewLedgerEntry {
                account_id: account_id.clone(),
                entry_type: EntryType::Debit,
                amount,
                balance_after: balance,
                correlation_id: None,
            },
        );
        uow.commit(&self.log);

        debug!(operation = "debit", account = %account_id, %amount, %balance, "committed");
        self.notifier.notify(LedgerEvent::Debited {
            account_id: account_id.clone(),
            email,
            amount,
            balance,
        });

        Ok(Posting {
            account_id: account_id.clone(),
            balance,
            entry_id,
        })
    }

    /// Move funds between two accounts atomically
    ///
    /// 1. Reject if source and destination are equal
    /// 2. Lock both accounts in ascending id order
    /// 3. Validate the destination, then the source balance
    /// 4. Stage debit, credit and both correlated entries
    /// 5. Commit, then submit one event per leg
    ///
    /// # Errors
    ///
    /// `SameAccount`, `InvalidAmount`, `AccountNotFound`, `AccountClosed`,
    /// `InsufficientFunds`, `Busy`, `ArithmeticOverflow`
    pub async fn transfer(&self, intent: &TransferIntent) -> Result<TransferReceipt, LedgerError> {
        let TransferIntent {
            source,
            destination,
            amount,
        } = intent;

        if source == destination {
            debug!(operation = "transfer", account = %source, "rejected: same account");
            return Err(LedgerError::same_account(source));
        }
        let amount = validate_amount(*amount)?;
        // Accounts are never removed, so existence checked here still holds under the locks
        for account_id in [destination, source] {
            if !self.store.contains(account_id) {
                return Err(LedgerError::account_not_found(account_id));
            }
        }

        let mut uow = self
            .store
            .begin(&[source.clone(), destination.clone()])
            .await?;

        let result = uow.transfer(source, destination, amount);
        let (source_balance, destination_balance) = settle(&uow, "transfer", result)?;
        let source_email = uow.account(source)?.owner.email.clone();
        let destination_email = uow.account(destination)?.owner.email.clone();

        let correlation_id = CorrelationId::new();
        let source_entry = uow.stage_entry(
            &self.log,
            NewLedgerEntry {
                account_id: source.clone(),
                entry_type: EntryType::Debit,
                amount,
                balance_after: source_balance,
                correlation_id: Some(correlation_id),
            },
        );
        let destination_entry = uow.stage_entry(
            &self.log,
            NewLedgerEntry {
                account_id: destination.clone(),
                entry_type: EntryType::Credit,
                amount,
                balance_after: destination_balance,
                correlation_id: Some(correlation_id),
            },
        );
        uow.commit(&self.log);

        debug!(
            operation = "transfer",
            %source,
            %destination,
            %amount,
            %correlation_id,
            "committed"
        );
        self.notifier.notify(LedgerEvent::Debited {
            account_id: source.clone(),
            email: source_email,
            amount,
            balance: source_balance,
        });
        self.notifier.notify(LedgerEvent::Credited {
            account_id: destination.clone(),
            email: destination_email,
            amount,
            balance: destination_balance,
        });

        Ok(TransferReceipt {
            correlation_id,
            source: Posting {
                account_id: source.clone(),
                balance: source_balance,
                entry_id: source_entry,
            },
            destination: Posting {
                account_id: destination.clone(),
                balance: destination_balance,
                entry_id: destination_entry,
            },
        })
    }

    /// Close an account
    ///
    /// # Errors
    ///
    /// `AccountNotFound`, `AccountClosed`, `NonZeroBalance`, `Busy`
    pub async fn close_account(&self, account_id: &AccountId) -> Result<Account, LedgerError> {
        let mut uow = self.store.begin(slice::from_ref(account_id)).await?;

        let result = uow.close(account_id);
        let closed = settle(&uow, "close", result)?;
        uow.commit(&self.log);

        debug!(operation = "close", account = %account_id, "committed");
        self.notifier.notify(LedgerEvent::AccountClosed {
            account_id: account_id.clone(),
            email: closed.owner.email.clone(),
        });
        Ok(closed)
    }

    /// Current balance and holder of an account (balanceEnquiry)
    pub async fn balance_enquiry(&self, account_id: &AccountId) -> Result<BalanceEnquiry, LedgerError> {
        let account = self.store.get(account_id).await?;
        Ok(BalanceEnquiry {
            account_id: account.id,
            account_name: account.owner.name,
            balance: account.balance,
            status: account.status,
        })
    }

    /// Holder name of an account
    pub async fn name_enquiry(&self, account_id: &AccountId) -> Result<String, LedgerError> {
        Ok(self.store.get(account_id).await?.owner.name)
    }

    /// Every entry of an account, oldest first (transactionHistory)
    ///
    /// Read under the account lock, so the history always matches the balance.
    pub async fn transaction_history(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        let _uow = self.store.begin(slice::from_ref(account_id)).await?;
        Ok(self.log.entries_for(account_id))
    }

    /// Entries of an account committed within `[from, to]`
    pub async fn statement(
        &self,
        account_id: &AccountId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        let _uow = self.store.begin(slice::from_ref(account_id)).await?;
        Ok(self.log.entries_between(account_id, from, to))
    }

    /// Consistent snapshot of every account, sorted by id
    ///
    /// Locks all accounts at once (in id order), so balances are read at a
    /// single point between commits.
    pub async fn accounts(&self) -> Result<Vec<Account>, LedgerError> {
        let ids = self.store.ids();
        let uow = self.store.begin(&ids).await?;
        ids.iter()
            .map(|account_id| uow.account(account_id).cloned())
            .collect()
    }

    /// Run one command
    pub async fn execute(&self, command: LedgerCommand) -> Result<CommandOutcome, LedgerError> {
        match command {
            LedgerCommand::Open(request) => self.open_account(request).map(CommandOutcome::Opened),
            LedgerCommand::Credit { account, amount } => self
                .credit_account(&account, amount)
                .await
                .map(CommandOutcome::Posted),
            LedgerCommand::Debit { account, amount } => self
                .debit_account(&account, amount)
                .await
                .map(CommandOutcome::Posted),
            LedgerCommand::Transfer(intent) => {
                self.transfer(&intent).await.map(CommandOutcome::Transferred)
            }
            LedgerCommand::Close { account } => {
                self.close_account(&account).await.map(CommandOutcome::Closed)
            }
        }
    }

    /// Wait until every event submitted so far reached the notification sink
    pub async fn flush_notifications(&self) {
        self.notifier.flush().await;
    }

    pub fn notification_stats(&self) -> DispatchStats {
        self.notifier.stats()
    }
}

/// Log a rejection; aborts are logged by the unit of work when it drops
fn settle<T>(
    uow: &UnitOfWork,
    operation: &'static str,
    result: Result<T, LedgerError>,
) -> Result<T, LedgerError> {
    if let Err(error) = &result {
        if uow.stage() == OperationStage::Open {
            debug!(operation, %error, "rejected");
        }
    }
    result
}
