//! Account storage and the atomic unit of work
//!
//! This module provides the `AccountStore`, the only owner of balance state,
//! and `UnitOfWork`, the atomic read-modify-write scope every balance mutation
//! runs in.
//!
//! # Design
//!
//! Each account lives in its own slot, an `Arc<tokio::sync::Mutex<Account>>`
//! inside a `DashMap`. The map only guards membership; the per-account mutex
//! is the point of mutual exclusion for balance changes. Operations on
//! disjoint accounts therefore never contend.
//!
//! # Locking Discipline
//!
//! `AccountStore::begin` sorts and deduplicates the requested ids, then locks
//! the slots in that order. Two transfers moving funds in opposite directions
//! between the same pair of accounts lock the pair in the same order, so they
//! serialize instead of deadlocking. All lock waits of one `begin` share a
//! single deadline, the configured timeout, and fail with `Busy` when it runs
//! out.
//!
//! # Atomicity
//!
//! A `UnitOfWork` stages every change on private copies of the locked
//! accounts. `commit` writes the copies back and appends the staged ledger
//! entries while all locks are still held; nothing in that step can fail.
//! Dropping a unit of work without committing discards the staged state, so a
//! failed operation leaves no trace and no reader ever observes half of one.

use crate::core::transaction_log::TransactionLog;
use crate::types::money::validate_amount;
use crate::types::{
    Account, AccountId, AccountStatus, EntryId, LedgerEntry, LedgerError, NewLedgerEntry, Owner,
};
use chrono::{Datelike, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

type Slot = Arc<Mutex<Account>>;

/// Thread-safe account store
#[derive(Debug)]
pub struct AccountStore {
    /// Account slots by id
    accounts: DashMap<AccountId, Slot>,

    /// Owner e-mail to account id, enforces one account per owner
    owners: DashMap<String, AccountId>,

    /// Longest wait for a single account lock
    lock_timeout: Duration,

    /// Sequence behind generated account numbers
    next_number: AtomicU64,
}

impl AccountStore {
    /// Create an empty store
    ///
    /// # Arguments
    ///
    /// * `lock_timeout` - Longest time one `begin` or `get` waits for its locks
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            accounts: DashMap::new(),
            owners: DashMap::new(),
            lock_timeout,
            next_number: AtomicU64::new(1),
        }
    }

    /// Open a new account with a zero balance
    ///
    /// When `account_id` is `None` an account number is generated: the current
    /// year followed by a six-digit sequence number, skipping numbers already
    /// in use.
    ///
    /// # Errors
    ///
    /// - `AccountExists` if the owner e-mail already has an account
    /// - `Conflict` if the explicit account id is already taken
    pub fn open(&self, account_id: Option<AccountId>, owner: Owner) -> Result<Account, LedgerError> {
        if let Some(id) = account_id {
            return self.insert(Account::new(id, owner));
        }

        loop {
            let id = self.next_account_number();
            match self.insert(Account::new(id, owner.clone())) {
                Err(LedgerError::Conflict { account }) => {
                    debug!(%account, "generated account number taken, retrying");
                }
                result => return result,
            }
        }
    }

    /// Insert a fully built account
    ///
    /// The owner index and the account map are updated together: if the id is
    /// taken the e-mail reservation is released again.
    ///
    /// # Errors
    ///
    /// - `AccountExists` if the owner e-mail already has an account
    /// - `Conflict` if the account id is already taken
    pub fn insert(&self, account: Account) -> Result<Account, LedgerError> {
        let owner_entry = match self.owners.entry(account.owner.email.clone()) {
            Entry::Occupied(_) => {
                return Err(LedgerError::AccountExists {
                    email: account.owner.email.clone(),
                })
            }
            Entry::Vacant(vacant) => vacant,
        };

        match self.accounts.entry(account.id.clone()) {
            Entry::Occupied(_) => Err(LedgerError::conflict(&account.id)),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(account.clone())));
                owner_entry.insert(account.id.clone());
                Ok(account)
            }
        }
    }

    /// Read a consistent snapshot of one account
    ///
    /// # Errors
    ///
    /// - `AccountNotFound` if the account does not exist
    /// - `Busy` if the account lock is not acquired in time
    pub async fn get(&self, account_id: &AccountId) -> Result<Account, LedgerError> {
        let guard = self.lock(account_id, self.deadline()).await?;
        Ok(guard.clone())
    }

    pub fn contains(&self, account_id: &AccountId) -> bool {
        self.accounts.contains_key(account_id)
    }

    /// All account ids, sorted
    pub fn ids(&self) -> Vec<AccountId> {
        let mut ids: Vec<AccountId> = self.accounts.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Start a unit of work over the given accounts
    ///
    /// Locks are acquired in ascending id order; duplicates are ignored. On
    /// any failure the locks taken so far are released before returning.
    ///
    /// # Errors
    ///
    /// - `AccountNotFound` if any of the accounts does not exist
    /// - `Busy` if the locks are not all acquired within the lock timeout
    pub async fn begin(&self, account_ids: &[AccountId]) -> Result<UnitOfWork, LedgerError> {
        let mut ordered = account_ids.to_vec();
        ordered.sort();
        ordered.dedup();

        let deadline = self.deadline();
        let mut guards = BTreeMap::new();
        for account_id in ordered {
            let guard = self.lock(&account_id, deadline).await?;
            guards.insert(account_id, guard);
        }

        Ok(UnitOfWork::new(guards))
    }

    fn deadline(&self) -> Instant {
        Instant::now() + self.lock_timeout
    }

    async fn lock(
        &self,
        account_id: &AccountId,
        deadline: Instant,
    ) -> Result<OwnedMutexGuard<Account>, LedgerError> {
        // Clone the slot out so no map shard lock is held while waiting
        let slot = self
            .accounts
            .get(account_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| LedgerError::account_not_found(account_id))?;

        let waited_ms = u64::try_from(self.lock_timeout.as_millis()).unwrap_or(u64::MAX);
        timeout_at(deadline, slot.lock_owned())
            .await
            .map_err(|_| LedgerError::busy(account_id, waited_ms))
    }

    fn next_account_number(&self) -> AccountId {
        let sequence = self.next_number.fetch_add(1, Ordering::Relaxed);
        AccountId::new(format!("{}{:06}", Utc::now().year(), sequence))
    }
}

/// Progress of the operation running inside a unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OperationStage {
    /// Locks held, nothing checked yet
    Open,
    /// Preconditions hold; a failure from here on aborts
    Validated,
    /// Balance changes staged
    Applied,
    /// Ledger entries staged
    Logged,
    /// Changes written back and visible
    Committed,
}

/// Atomic read-modify-write scope over a set of locked accounts
///
/// Created by [`AccountStore::begin`]. Holds the account locks until it is
/// committed or dropped.
#[derive(Debug)]
pub struct UnitOfWork {
    guards: BTreeMap<AccountId, OwnedMutexGuard<Account>>,
    staged: BTreeMap<AccountId, Account>,
    pending: Vec<(EntryId, NewLedgerEntry)>,
    stage: OperationStage,
}

impl UnitOfWork {
    fn new(guards: BTreeMap<AccountId, OwnedMutexGuard<Account>>) -> Self {
        Self {
            guards,
            staged: BTreeMap::new(),
            pending: Vec::new(),
            stage: OperationStage::Open,
        }
    }

    pub fn stage(&self) -> OperationStage {
        self.stage
    }

    /// Current view of a locked account, including staged changes
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the account is not part of this unit of work.
    pub fn account(&self, account_id: &AccountId) -> Result<&Account, LedgerError> {
        if let Some(staged) = self.staged.get(account_id) {
            return Ok(staged);
        }
        self.guards
            .get(account_id)
            .map(|guard| &**guard)
            .ok_or_else(|| LedgerError::account_not_found(account_id))
    }

    /// Add funds to an account
    ///
    /// # Returns
    ///
    /// The staged balance after the credit.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if the amount is not positive or has more than 2 decimals
    /// - `AccountNotFound` if the account is not part of this unit of work
    /// - `AccountClosed` if the account is closed
    /// - `ArithmeticOverflow` if the balance would overflow
    pub fn credit(&mut self, account_id: &AccountId, amount: Decimal) -> Result<Decimal, LedgerError> {
        let amount = validate_amount(amount)?;
        self.active(account_id)?;

        self.stage = OperationStage::Validated;
        self.apply_credit(account_id, amount)
    }

    /// Remove funds from an account
    ///
    /// # Returns
    ///
    /// The staged balance after the debit.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if the amount is not positive or has more than 2 decimals
    /// - `AccountNotFound` if the account is not part of this unit of work
    /// - `AccountClosed` if the account is closed
    /// - `InsufficientFunds` if the balance is smaller than the amount
    pub fn debit(&mut self, account_id: &AccountId, amount: Decimal) -> Result<Decimal, LedgerError> {
        let amount = validate_amount(amount)?;
        self.check_sufficient(account_id, amount)?;

        self.stage = OperationStage::Validated;
        self.apply_debit(account_id, amount)
    }

    /// Move funds from `source` to `destination`
    ///
    /// The destination is validated first, then the source balance. Both legs
    /// are staged together; if the credit leg fails after the debit leg was
    /// staged the whole unit of work must be dropped.
    ///
    /// # Returns
    ///
    /// The staged `(source_balance, destination_balance)`.
    ///
    /// # Errors
    ///
    /// - `SameAccount` if source and destination are equal
    /// - `InvalidAmount`, `AccountNotFound`, `AccountClosed`, `InsufficientFunds`
    ///   as for credit and debit
    /// - `ArithmeticOverflow` if the destination balance would overflow
    pub fn transfer(
        &mut self,
        source: &AccountId,
        destination: &AccountId,
        amount: Decimal,
    ) -> Result<(Decimal, Decimal), LedgerError> {
        if source == destination {
            return Err(LedgerError::same_account(source));
        }
        let amount = validate_amount(amount)?;
        self.active(destination)?;
        self.check_sufficient(source, amount)?;

        self.stage = OperationStage::Validated;
        let source_balance = self.apply_debit(source, amount)?;
        let destination_balance = self.apply_credit(destination, amount)?;
        Ok((source_balance, destination_balance))
    }

    /// Close an account
    ///
    /// # Errors
    ///
    /// - `AccountClosed` if the account is already closed
    /// - `NonZeroBalance` if the account still holds funds
    pub fn close(&mut self, account_id: &AccountId) -> Result<Account, LedgerError> {
        let mut closed = self.active(account_id)?.clone();
        if !closed.balance.is_zero() {
            return Err(LedgerError::NonZeroBalance {
                account: account_id.clone(),
                balance: closed.balance,
            });
        }

        self.stage = OperationStage::Validated;
        closed.status = AccountStatus::Closed;
        self.staged.insert(account_id.clone(), closed.clone());
        self.stage = OperationStage::Applied;
        Ok(closed)
    }

    /// Stage a ledger entry to be appended on commit
    ///
    /// The entry id is reserved from `log` right away.
    pub fn stage_entry(&mut self, log: &TransactionLog, entry: NewLedgerEntry) -> EntryId {
        debug_assert!(self.stage >= OperationStage::Applied);
        let id = log.next_entry_id();
        self.pending.push((id, entry));
        self.stage = OperationStage::Logged;
        id
    }

    /// Write staged changes back and append staged entries to the log
    ///
    /// Runs entirely under the held locks and cannot fail. All entries share
    /// one commit timestamp.
    pub fn commit(mut self, log: &TransactionLog) {
        let staged = std::mem::take(&mut self.staged);
        for (account_id, account) in staged {
            if let Some(guard) = self.guards.get_mut(&account_id) {
                **guard = account;
            }
        }

        let timestamp = Utc::now();
        let entries = std::mem::take(&mut self.pending)
            .into_iter()
            .map(|(id, entry)| LedgerEntry::from_new(id, entry, timestamp))
            .collect();
        log.append_all(entries);

        self.stage = OperationStage::Committed;
    }

    fn active(&self, account_id: &AccountId) -> Result<&Account, LedgerError> {
        let account = self.account(account_id)?;
        if !account.is_active() {
            return Err(LedgerError::account_closed(account_id));
        }
        Ok(account)
    }

    fn check_sufficient(&self, account_id: &AccountId, amount: Decimal) -> Result<(), LedgerError> {
        let account = self.active(account_id)?;
        if account.balance < amount {
            return Err(LedgerError::insufficient_funds(
                account_id,
                account.balance,
                amount,
            ));
        }
        Ok(())
    }

    fn apply_credit(&mut self, account_id: &AccountId, amount: Decimal) -> Result<Decimal, LedgerError> {
        let mut account = self.account(account_id)?.clone();
        account.balance = account
            .balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::arithmetic_overflow("credit", account_id))?;

        let balance = account.balance;
        self.staged.insert(account_id.clone(), account);
        self.stage = OperationStage::Applied;
        Ok(balance)
    }

    fn apply_debit(&mut self, account_id: &AccountId, amount: Decimal) -> Result<Decimal, LedgerError> {
        let mut account = self.account(account_id)?.clone();
        let balance = account
            .balance
            .checked_sub(amount)
            .filter(|balance| *balance >= Decimal::ZERO)
            .ok_or_else(|| LedgerError::insufficient_funds(account_id, account.balance, amount))?;
        account.balance = balance;

        self.staged.insert(account_id.clone(), account);
        self.stage = OperationStage::Applied;
        Ok(balance)
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        if matches!(
            self.stage,
            OperationStage::Validated | OperationStage::Applied | OperationStage::Logged
        ) {
            warn!(
                stage = ?self.stage,
                accounts = ?self.guards.keys().collect::<Vec<_>>(),
                "unit of work aborted, staged changes discarded"
            );
        }
    }
}
