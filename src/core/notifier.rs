//! Fire-and-forget notification dispatch
//!
//! This module provides the `NotificationDispatcher`, which hands committed
//! ledger events to a [`NotificationSink`] on a background task.
//!
//! # Design
//!
//! ```text
//! LedgerEngine --try_send--> bounded mpsc queue --> worker task --> NotificationSink
//! ```
//!
//! Submission never waits: when the queue is full or the worker is gone the
//! event is dropped and a warning is logged. Delivery failures are logged by
//! the worker. Neither ever reaches the operation that produced the event.

use crate::core::traits::NotificationSink;
use crate::types::{LedgerEvent, NotifyError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

enum Envelope {
    Event(LedgerEvent),
    Flush(oneshot::Sender<()>),
}

/// Delivery counters, shared between the dispatcher handle and its worker
#[derive(Debug, Default)]
struct Counters {
    submitted: AtomicU64,
    dropped: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
}

/// Snapshot of the dispatcher counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchStats {
    /// Events accepted into the queue
    pub submitted: u64,
    /// Events dropped because the queue was full or closed
    pub dropped: u64,
    /// Events the sink accepted
    pub delivered: u64,
    /// Events the sink refused
    pub failed: u64,
}

/// Handle for submitting events to the background delivery task
#[derive(Debug, Clone)]
pub struct NotificationDispatcher {
    sender: mpsc::Sender<Envelope>,
    counters: Arc<Counters>,
}

impl std::fmt::Debug for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Envelope::Event(event) => f.debug_tuple("Event").field(event).finish(),
            Envelope::Flush(_) => f.write_str("Flush"),
        }
    }
}

impl NotificationDispatcher {
    /// Start the delivery task and return a handle to it
    ///
    /// Must be called from within a tokio runtime. The task exits once every
    /// handle has been dropped and the queue is drained.
    ///
    /// # Arguments
    ///
    /// * `sink` - Destination of delivered events
    /// * `capacity` - Queue size; events beyond it are dropped
    pub fn spawn(sink: Arc<dyn NotificationSink>, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let counters = Arc::new(Counters::default());

        tokio::spawn(run_worker(receiver, sink, Arc::clone(&counters)));

        Self { sender, counters }
    }

    /// Submit an event without waiting
    pub fn notify(&self, event: LedgerEvent) {
        match self.sender.try_send(Envelope::Event(event)) {
            Ok(()) => {
                self.counters.submitted.fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Full(envelope)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(?envelope, "notification queue full, event dropped");
            }
            Err(TrySendError::Closed(envelope)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(?envelope, "notification worker stopped, event dropped");
            }
        }
    }

    /// Wait until every event submitted before this call reached the sink
    ///
    /// Returns immediately if the worker is no longer running.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.sender.send(Envelope::Flush(done)).await.is_err() {
            return;
        }
        let _ = wait.await;
    }

    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }
}

async fn run_worker(
    mut receiver: mpsc::Receiver<Envelope>,
    sink: Arc<dyn NotificationSink>,
    counters: Arc<Counters>,
) {
    while let Some(envelope) = receiver.recv().await {
        match envelope {
            Envelope::Event(event) => match sink.deliver(&event) {
                Ok(()) => {
                    counters.delivered.fetch_add(1, Ordering::Relaxed);
                }
                Err(error) => {
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        account = %event.account_id(),
                        subject = event.subject(),
                        %error,
                        "notification delivery failed"
                    );
                }
            },
            Envelope::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}

/// Sink that writes every event to the log
///
/// Stands in for e-mail delivery when no real channel is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn deliver(&self, event: &LedgerEvent) -> Result<(), NotifyError> {
        match event {
            LedgerEvent::AccountOpened {
                account_id,
                owner_name,
                email,
            } => info!(subject = event.subject(), %account_id, %owner_name, %email, "alert"),
            LedgerEvent::Credited {
                account_id,
                email,
                amount,
                balance,
            }
            | LedgerEvent::Debited {
                account_id,
                email,
                amount,
                balance,
            } => info!(
                subject = event.subject(),
                %account_id,
                %email,
                %amount,
                %balance,
                "alert"
            ),
            LedgerEvent::AccountClosed { account_id, email } => {
                info!(subject = event.subject(), %account_id, %email, "alert")
            }
        }
        Ok(())
    }
}
