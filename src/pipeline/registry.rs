//! In-flight request registry.
//!
//! # Responsibilities
//! - Track one pending entry per fingerprint
//! - Cancel the older entry when an identical request supersedes it
//! - Release entries exactly once when their call settles
//!
//! Registration, supersession and release are synchronous map operations;
//! the only await is on the cancellation signal itself.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::oneshot;

use crate::observability::metrics;
use crate::request::Fingerprint;

/// Why a pending request was aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// A newer identical request took its place.
    Superseded,
    /// Explicitly aborted (e.g. `cancel_all` on shutdown).
    Aborted,
}

impl CancelReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CancelReason::Superseded => "superseded by a newer identical request",
            CancelReason::Aborted => "aborted",
        }
    }
}

#[derive(Debug)]
struct PendingEntry {
    id: u64,
    cancel: Option<oneshot::Sender<CancelReason>>,
}

impl PendingEntry {
    fn cancel(&mut self, reason: CancelReason) {
        if let Some(tx) = self.cancel.take() {
            let _ = tx.send(reason);
        }
    }
}

/// Thread-safe registry of pending fingerprints.
#[derive(Debug, Default)]
pub struct InFlightRegistry {
    pending: DashMap<Fingerprint, PendingEntry>,
    next_id: AtomicU64,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pending request, superseding any entry with the same
    /// fingerprint. The returned token releases the entry when dropped.
    pub fn register(self: &Arc<Self>, fingerprint: Fingerprint) -> CancellationToken {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        let entry = PendingEntry { id, cancel: Some(tx) };

        match self.pending.entry(fingerprint.clone()) {
            Entry::Occupied(mut occupied) => {
                let mut previous = occupied.insert(entry);
                previous.cancel(CancelReason::Superseded);
                tracing::debug!(fingerprint = %fingerprint, superseded = previous.id, by = id, "Cancelled duplicate request");
                metrics::record_cancelled(CancelReason::Superseded);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(entry);
            }
        }
        metrics::record_in_flight(self.pending.len());

        CancellationToken {
            signal: Some(rx),
            fired: None,
            registration: Some(Registration {
                registry: Arc::clone(self),
                fingerprint,
                id,
            }),
        }
    }

    /// Remove whatever entry is registered under `fingerprint`.
    ///
    /// Idempotent: releasing an unknown or already-released fingerprint is a
    /// no-op. Returns whether an entry was removed.
    pub fn release(&self, fingerprint: &Fingerprint) -> bool {
        let removed = self.pending.remove(fingerprint).is_some();
        if removed {
            metrics::record_in_flight(self.pending.len());
        }
        removed
    }

    /// Remove the entry only if it still belongs to registration `id`, so a
    /// superseded call never evicts its successor.
    fn release_registration(&self, fingerprint: &Fingerprint, id: u64) -> bool {
        let removed = self.pending.remove_if(fingerprint, |_, entry| entry.id == id).is_some();
        if removed {
            metrics::record_in_flight(self.pending.len());
        }
        removed
    }

    /// Abort and remove every pending entry. Returns how many were aborted.
    pub fn cancel_all(&self) -> usize {
        let mut cancelled = 0;
        self.pending.retain(|_, entry| {
            entry.cancel(CancelReason::Aborted);
            cancelled += 1;
            false
        });
        for _ in 0..cancelled {
            metrics::record_cancelled(CancelReason::Aborted);
        }
        metrics::record_in_flight(0);
        cancelled
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.pending.contains_key(fingerprint)
    }

    /// Number of pending entries.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[derive(Debug)]
struct Registration {
    registry: Arc<InFlightRegistry>,
    fingerprint: Fingerprint,
    id: u64,
}

/// Held by a call for as long as it is in flight.
///
/// Resolves `cancelled()` when the call is superseded or aborted; dropping
/// the token releases its registry entry exactly once.
#[derive(Debug)]
pub struct CancellationToken {
    signal: Option<oneshot::Receiver<CancelReason>>,
    fired: Option<CancelReason>,
    registration: Option<Registration>,
}

impl CancellationToken {
    /// A token for calls that opted out of deduplication: never cancelled,
    /// nothing to release.
    pub fn detached() -> Self {
        Self {
            signal: None,
            fired: None,
            registration: None,
        }
    }

    pub fn is_registered(&self) -> bool {
        self.registration.is_some()
    }

    /// Wait until the call is cancelled.
    pub async fn cancelled(&mut self) -> CancelReason {
        if let Some(reason) = self.fired {
            return reason;
        }
        let reason = match self.signal.as_mut() {
            // A dropped sender means the entry was torn down without a send.
            Some(rx) => rx.await.unwrap_or(CancelReason::Aborted),
            None => std::future::pending().await,
        };
        self.signal = None;
        self.fired = Some(reason);
        reason
    }
}

impl Drop for CancellationToken {
    fn drop(&mut self) {
        if let Some(registration) = self.registration.take() {
            registration
                .registry
                .release_registration(&registration.fingerprint, registration.id);
        }
    }
}
