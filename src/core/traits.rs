//! Collaborator seams of the ledger engine
//!
//! The engine receives its external collaborators as trait objects at
//! construction time instead of reaching for process-wide singletons.

use crate::types::{LedgerEvent, NotifyError};

/// Out-of-band delivery of committed ledger events (e-mail alerts and the like)
///
/// Called from the dispatcher's background task, never from inside a unit of
/// work. A failed delivery is logged and dropped; it cannot undo the commit
/// that produced the event.
pub trait NotificationSink: Send + Sync + 'static {
    /// Deliver one event
    fn deliver(&self, event: &LedgerEvent) -> Result<(), NotifyError>;
}
