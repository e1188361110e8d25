//! Correlation table of calls awaiting a response.
//!
//! Entries are inserted by callers, removed by the receive loop when a
//! response arrives, and removed by the caller's guard on timeout or drop.
//! Whichever removal happens first wins; the other finds nothing. The map is
//! sharded, so unrelated entries never contend on the same lock.
//!
//! Once the receive loop has ended the table is closed: no response can
//! arrive any more, so registration is refused instead of waiting out a
//! deadline.

use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use helm_core::{CorrelationId, Envelope};
use tokio::sync::oneshot;

pub(crate) struct PendingTable {
    entries: DashMap<CorrelationId, oneshot::Sender<Envelope>>,
    closed: AtomicBool,
}

impl PendingTable {
    pub(crate) fn new() -> Self {
        Self {
            entries: DashMap::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Register a waiter for `id`, or `None` once the table is closed.
    /// Callers never register an id twice.
    pub(crate) fn register(&self, id: CorrelationId) -> Option<oneshot::Receiver<Envelope>> {
        let (tx, rx) = oneshot::channel();
        let _ = self.entries.insert(id, tx);
        // insert before checking: a concurrent close either sees this entry
        // in its clear or is seen here
        if self.closed.load(Ordering::SeqCst) {
            let _ = self.entries.remove(&id);
            return None;
        }
        Some(rx)
    }

    /// Hand `envelope` to its waiter. Returns `false` when nobody was waiting.
    pub(crate) fn resolve(&self, envelope: Envelope) -> bool {
        match self.entries.remove(&envelope.id) {
            Some((_, tx)) => tx.send(envelope).is_ok(),
            None => false,
        }
    }

    /// Drop the waiter for `id`, if still present.
    pub(crate) fn remove(&self, id: CorrelationId) -> bool {
        self.entries.remove(&id).is_some()
    }

    /// Refuse further registrations and drop every waiter; each sees its
    /// channel close.
    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.entries.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Removes a pending entry when the owning call finishes or is dropped.
pub(crate) struct PendingGuard<'a> {
    table: &'a PendingTable,
    id: CorrelationId,
}

impl<'a> PendingGuard<'a> {
    pub(crate) fn new(table: &'a PendingTable, id: CorrelationId) -> Self {
        Self { table, id }
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        let _ = self.table.remove(self.id);
    }
}
