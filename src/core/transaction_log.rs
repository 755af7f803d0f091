//! Append-only transaction log
//!
//! This module provides the `TransactionLog`, the record of every committed
//! balance-affecting operation, keyed by account id.
//!
//! # Append-Only
//!
//! The log exposes no way to mutate or remove an entry. Readers only ever get
//! clones, so a committed `LedgerEntry` can never change.
//!
//! # Consistency With Balances
//!
//! Entries are appended by `UnitOfWork::commit` while the unit of work still
//! holds the locks of every account it touched. All entries of one commit are
//! published under a single write lock, so any reader sees both legs of a
//! transfer or neither.

use crate::types::{AccountId, EntryId, LedgerEntry};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard};

/// Thread-safe, append-only ledger entry store
#[derive(Debug)]
pub struct TransactionLog {
    /// Entries per account, oldest first
    entries: RwLock<HashMap<AccountId, Vec<LedgerEntry>>>,

    /// Next entry id to hand out
    next_id: AtomicU64,
}

impl TransactionLog {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Reserve the next entry id
    ///
    /// Ids are reserved when an entry is staged, so an aborted unit of work
    /// leaves a gap in the sequence. Ids within one account still increase in
    /// commit order because staging happens under the account lock.
    pub fn next_entry_id(&self) -> EntryId {
        EntryId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Append a committed entry and return its id
    pub fn append(&self, entry: LedgerEntry) -> EntryId {
        let id = entry.id;
        self.append_all(vec![entry]);
        id
    }

    /// Append the entries of one commit as a single step
    ///
    /// Readers observe either none or all of `entries`.
    pub fn append_all(&self, entries: Vec<LedgerEntry>) {
        // Entries are plain data, a panicking writer cannot leave them half-built
        let mut by_account = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        for entry in entries {
            by_account
                .entry(entry.account_id.clone())
                .or_default()
                .push(entry);
        }
    }

    /// All entries of an account, oldest first
    ///
    /// Returns an empty vector for accounts without entries.
    pub fn entries_for(&self, account_id: &AccountId) -> Vec<LedgerEntry> {
        self.read()
            .get(account_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Entries of an account committed within `[from, to]`, oldest first
    pub fn entries_between(
        &self,
        account_id: &AccountId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Vec<LedgerEntry> {
        self.read()
            .get(account_id)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|entry| entry.timestamp >= from && entry.timestamp <= to)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every entry in the log, ordered by entry id
    pub fn all_entries(&self) -> Vec<LedgerEntry> {
        let mut entries: Vec<LedgerEntry> = self.read().values().flatten().cloned().collect();
        entries.sort_by_key(|entry| entry.id);
        entries
    }

    /// Total number of entries
    pub fn len(&self) -> usize {
        self.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<AccountId, Vec<LedgerEntry>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for TransactionLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CorrelationId, EntryType, NewLedgerEntry};
    use chrono::Duration;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn append(
        log: &TransactionLog,
        account: &str,
        entry_type: EntryType,
        amount: Decimal,
        timestamp: DateTime<Utc>,
    ) -> EntryId {
        let entry = NewLedgerEntry {
            account_id: account.into(),
            entry_type,
            amount,
            balance_after: amount,
            correlation_id: None,
        };
        log.append(LedgerEntry::from_new(log.next_entry_id(), entry, timestamp))
    }

    #[test]
    fn test_new_log_is_empty() {
        let log = TransactionLog::new();
        assert!(log.is_empty());
        assert!(log.entries_for(&"X".into()).is_empty());
    }

    #[test]
    fn test_append_assigns_increasing_ids() {
        let log = TransactionLog::new();
        let now = Utc::now();

        let first = append(&log, "X", EntryType::Credit, dec!(10.00), now);
        let second = append(&log, "Y", EntryType::Credit, dec!(5.00), now);
        let third = append(&log, "X", EntryType::Debit, dec!(2.00), now);

        assert!(first < second && second < third);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn test_reserved_but_unused_ids_leave_gaps() {
        let log = TransactionLog::new();

        let _abandoned = log.next_entry_id();
        let id = append(&log, "X", EntryType::Credit, dec!(1.00), Utc::now());

        assert_eq!(id, EntryId(2));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_entries_for_keeps_append_order() {
        let log = TransactionLog::new();
        let now = Utc::now();

        append(&log, "X", EntryType::Credit, dec!(10.00), now);
        append(&log, "Y", EntryType::Credit, dec!(5.00), now);
        append(&log, "X", EntryType::Debit, dec!(2.00), now);

        let entries = log.entries_for(&"X".into());
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].entry_type, EntryType::Credit);
        assert_eq!(entries[1].entry_type, EntryType::Debit);
        assert!(entries[0].id < entries[1].id);
    }

    #[test]
    fn test_entries_keep_correlation_id() {
        let log = TransactionLog::new();
        let correlation = CorrelationId::new();
        let entry = NewLedgerEntry {
            account_id: "X".into(),
            entry_type: EntryType::Debit,
            amount: dec!(1.00),
            balance_after: dec!(0.00),
            correlation_id: Some(correlation),
        };

        log.append(LedgerEntry::from_new(log.next_entry_id(), entry, Utc::now()));

        assert_eq!(
            log.entries_for(&"X".into())[0].correlation_id,
            Some(correlation)
        );
    }

    #[test]
    fn test_entries_between_filters_by_timestamp() {
        let log = TransactionLog::new();
        let start = Utc::now();

        append(&log, "X", EntryType::Credit, dec!(1.00), start);
        append(&log, "X", EntryType::Credit, dec!(2.00), start + Duration::days(1));
        append(&log, "X", EntryType::Credit, dec!(3.00), start + Duration::days(2));

        let window = log.entries_between(
            &"X".into(),
            start + Duration::hours(12),
            start + Duration::days(2),
        );
        let amounts: Vec<Decimal> = window.iter().map(|entry| entry.amount).collect();
        assert_eq!(amounts, vec![dec!(2.00), dec!(3.00)]);
    }

    #[test]
    fn test_append_all_publishes_every_entry() {
        let log = TransactionLog::new();
        let correlation = CorrelationId::new();
        let now = Utc::now();
        let legs = [("X", EntryType::Debit), ("Y", EntryType::Credit)].map(|(account, entry_type)| {
            let entry = NewLedgerEntry {
                account_id: account.into(),
                entry_type,
                amount: dec!(4.00),
                balance_after: dec!(4.00),
                correlation_id: Some(correlation),
            };
            LedgerEntry::from_new(log.next_entry_id(), entry, now)
        });

        log.append_all(legs.to_vec());

        assert_eq!(log.len(), 2);
        assert_eq!(log.entries_for(&"X".into())[0].entry_type, EntryType::Debit);
        assert_eq!(log.entries_for(&"Y".into())[0].entry_type, EntryType::Credit);
    }

    #[test]
    fn test_all_entries_ordered_by_id() {
        let log = TransactionLog::new();
        let now = Utc::now();

        append(&log, "B", EntryType::Credit, dec!(1.00), now);
        append(&log, "A", EntryType::Credit, dec!(2.00), now);

        let ids: Vec<u64> = log.all_entries().iter().map(|entry| entry.id.0).collect();
        assert_eq!(ids, vec![1, 2]);
    }
}
