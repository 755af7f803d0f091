//! Batch processing with conflict-based partitioning
//!
//! This module provides the `BatchProcessor` struct, which runs a batch of
//! ledger commands concurrently while keeping every command that touches the
//! same state in input order.
//!
//! # Design
//!
//! Each command names the keys it reads or writes (account ids, owner e-mails,
//! see [`LedgerCommand::conflict_keys`]). Commands sharing a key, directly or
//! through a chain of other commands, are joined into one group with a
//! union-find over the batch. Groups share no state, so they run as separate
//! tokio tasks; inside a group commands run one after another in input order.
//! The final state is therefore the same as running the batch sequentially.
//!
//! # Architecture
//!
//! ```text
//! BatchProcessor
//!     └── LedgerEngine  (shared, cheap to clone)
//! ```

use crate::core::engine::LedgerEngine;
use crate::types::{CommandOutcome, LedgerCommand, LedgerError};
use std::collections::HashMap;
use tracing::error;

/// Result of processing a single command
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    /// Position of the command in its batch
    pub index: usize,

    /// The command that was processed
    pub command: LedgerCommand,

    /// The result of processing (success or error)
    pub result: Result<CommandOutcome, LedgerError>,
}

/// Batch processor with conflict-based partitioning
#[derive(Debug, Clone)]
pub struct BatchProcessor {
    engine: LedgerEngine,
}

impl BatchProcessor {
    pub fn new(engine: LedgerEngine) -> Self {
        Self { engine }
    }

    /// Split a batch into groups of commands that share no state
    ///
    /// Each command is paired with its position in the batch. Groups are
    /// returned in order of their first command, and commands inside a group
    /// keep their input order.
    ///
    /// # Guarantees
    ///
    /// - Each command appears in exactly one group
    /// - Two commands with a common conflict key are in the same group
    pub fn partition(&self, batch: Vec<LedgerCommand>) -> Vec<Vec<(usize, LedgerCommand)>> {
        let mut groups = DisjointSets::new(batch.len());
        let mut owner_of_key: HashMap<String, usize> = HashMap::new();

        for (index, command) in batch.iter().enumerate() {
            for key in command.conflict_keys() {
                match owner_of_key.get(&key) {
                    Some(&first) => groups.union(first, index),
                    None => {
                        owner_of_key.insert(key, index);
                    }
                }
            }
        }

        let mut slot_of_root: HashMap<usize, usize> = HashMap::new();
        let mut partitioned: Vec<Vec<(usize, LedgerCommand)>> = Vec::new();
        for (index, command) in batch.into_iter().enumerate() {
            let root = groups.find(index);
            let slot = *slot_of_root.entry(root).or_insert_with(|| {
                partitioned.push(Vec::new());
                partitioned.len() - 1
            });
            partitioned[slot].push((index, command));
        }

        partitioned
    }

    /// Run one group of commands sequentially, in order
    ///
    /// All commands are processed even if some fail.
    pub async fn process_group(&self, commands: Vec<(usize, LedgerCommand)>) -> Vec<ProcessingResult> {
        let mut results = Vec::with_capacity(commands.len());

        for (index, command) in commands {
            let result = self.engine.execute(command.clone()).await;
            results.push(ProcessingResult {
                index,
                command,
                result,
            });
        }

        results
    }

    /// Process a batch of commands
    ///
    /// 1. Partition the batch into independent groups
    /// 2. Spawn a tokio task per group
    /// 3. Wait for all tasks and collect their results
    ///
    /// # Returns
    ///
    /// One `ProcessingResult` per command, ordered by position in the batch.
    pub async fn process_batch(&self, batch: Vec<LedgerCommand>) -> Vec<ProcessingResult> {
        let groups = self.partition(batch);

        let mut tasks = Vec::with_capacity(groups.len());
        for group in groups {
            let processor = self.clone();
            tasks.push(tokio::spawn(async move { processor.process_group(group).await }));
        }

        let mut results = Vec::new();
        for task in tasks {
            match task.await {
                Ok(group_results) => results.extend(group_results),
                Err(join_error) => error!(%join_error, "command group task failed"),
            }
        }

        results.sort_by_key(|result| result.index);
        results
    }
}

/// Union-find over batch positions
#[derive(Debug)]
struct DisjointSets {
    parent: Vec<usize>,
}

impl DisjointSets {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, mut node: usize) -> usize {
        while self.parent[node] != node {
            // path halving
            self.parent[node] = self.parent[self.parent[node]];
            node = self.parent[node];
        }
        node
    }

    fn union(&mut self, a: usize, b: usize) {
        let (root_a, root_b) = (self.find(a), self.find(b));
        if root_a != root_b {
            // Keep the smaller index as root so group order follows input order
            let (low, high) = if root_a < root_b {
                (root_a, root_b)
            } else {
                (root_b, root_a)
            };
            self.parent[high] = low;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::LedgerConfig;
    use crate::core::notifier::LogSink;
    use crate::types::{AccountId, OpenAccount, Owner, TransferIntent};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn processor() -> BatchProcessor {
        BatchProcessor::new(LedgerEngine::new(&LedgerConfig::default(), Arc::new(LogSink)))
    }

    fn open(id: &str) -> LedgerCommand {
        LedgerCommand::Open(OpenAccount {
            account_id: Some(AccountId::new(id)),
            owner: Owner::new(format!("Holder {id}"), format!("{id}@bank.test")),
        })
    }

    fn credit(id: &str, amount: Decimal) -> LedgerCommand {
        LedgerCommand::Credit {
            account: AccountId::new(id),
            amount,
        }
    }

    fn debit(id: &str, amount: Decimal) -> LedgerCommand {
        LedgerCommand::Debit {
            account: AccountId::new(id),
            amount,
        }
    }

    fn transfer(source: &str, destination: &str, amount: Decimal) -> LedgerCommand {
        LedgerCommand::Transfer(TransferIntent::new(
            AccountId::new(source),
            AccountId::new(destination),
            amount,
        ))
    }

    fn positions(groups: &[Vec<(usize, LedgerCommand)>]) -> Vec<Vec<usize>> {
        groups
            .iter()
            .map(|group| group.iter().map(|(index, _)| *index).collect())
            .collect()
    }

    #[tokio::test]
    async fn test_partition_empty_batch() {
        assert!(processor().partition(vec![]).is_empty());
    }

    #[tokio::test]
    async fn test_partition_separates_unrelated_accounts() {
        let batch = vec![
            credit("A", dec!(1.00)),
            credit("B", dec!(1.00)),
            debit("A", dec!(1.00)),
        ];

        let groups = processor().partition(batch);

        assert_eq!(positions(&groups), vec![vec![0, 2], vec![1]]);
    }

    #[tokio::test]
    async fn test_partition_joins_accounts_through_transfers() {
        let batch = vec![
            credit("A", dec!(1.00)),
            credit("C", dec!(1.00)),
            credit("E", dec!(1.00)),
            transfer("A", "B", dec!(1.00)),
            transfer("B", "C", dec!(1.00)),
        ];

        let groups = processor().partition(batch);

        assert_eq!(positions(&groups), vec![vec![0, 1, 3, 4], vec![2]]);
    }

    #[tokio::test]
    async fn test_partition_joins_opens_sharing_an_email() {
        let first = open("A");
        let second = LedgerCommand::Open(OpenAccount {
            account_id: Some(AccountId::new("B")),
            owner: Owner::new("Someone", "A@bank.test"),
        });

        let groups = processor().partition(vec![first, second]);

        assert_eq!(groups.len(), 1);
    }

    #[tokio::test]
    async fn test_partition_loses_and_duplicates_nothing() {
        let batch: Vec<LedgerCommand> = (0..50)
            .map(|i| credit(&format!("acct-{}", i % 7), dec!(1.00)))
            .collect();

        let groups = processor().partition(batch);

        let mut seen: Vec<usize> = positions(&groups).into_iter().flatten().collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..50).collect::<Vec<_>>());
        assert_eq!(groups.len(), 7);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_process_batch_matches_sequential_order() {
        let processor = processor();
        let batch = vec![
            open("A"),
            open("B"),
            credit("A", dec!(100.00)),
            debit("A", dec!(150.00)),
            transfer("A", "B", dec!(40.00)),
            debit("B", dec!(40.00)),
            credit("Z", dec!(1.00)),
        ];

        let results = processor.process_batch(batch).await;

        let indices: Vec<usize> = results.iter().map(|result| result.index).collect();
        assert_eq!(indices, (0..7).collect::<Vec<_>>());
        assert!(matches!(
            results[3].result,
            Err(LedgerError::InsufficientFunds { .. })
        ));
        assert!(results[5].result.is_ok());
        assert!(matches!(
            results[6].result,
            Err(LedgerError::AccountNotFound { .. })
        ));

        let engine = &processor.engine;
        let a = engine.balance_enquiry(&AccountId::new("A")).await.unwrap();
        let b = engine.balance_enquiry(&AccountId::new("B")).await.unwrap();
        assert_eq!(a.balance, dec!(60.00));
        assert_eq!(b.balance, dec!(0.00));
    }

    #[tokio::test]
    async fn test_process_group_runs_every_command() {
        let processor = processor();
        let group = vec![
            (0, credit("missing", dec!(1.00))),
            (1, open("A")),
            (2, credit("A", dec!(5.00))),
        ];

        let results = processor.process_group(group).await;

        assert_eq!(results.len(), 3);
        assert!(results[0].result.is_err());
        assert!(results[1].result.is_ok());
        assert!(results[2].result.is_ok());
    }
}
