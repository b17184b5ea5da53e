//! # Event registry: fan-out bus for raw telemetry events.
//!
//! [`Registry`] holds the current set of subscribed [`Observe`]rs and
//! dispatches every submitted event to all of them, synchronously, in the
//! caller's own task. It also owns the sequence counter: events recorded
//! without a sequence number or timestamp get both filled in.
//!
//! ## Architecture
//! ```text
//! Producers (many):                  Consumers (snapshot):
//!   task 1 ──┐
//!   task 2 ──┼── record(event) ──► [fill seq/at] ──► observer 1.observe()
//!   task N ──┘                                  ├──► observer 2.observe()
//!                                               └──► observer M.observe()
//! ```
//!
//! ## Rules
//! - **Snapshot reads**: `record` clones the current `Arc` snapshot under a
//!   brief read lock and never holds it across observer calls; registration
//!   changes replace the whole snapshot under the write lock (rare path).
//! - **Set semantics**: registering the same `Arc` instance twice is a
//!   no-op; one `unregister` removes it entirely.
//! - **Synchronous fan-out**: observers run in the producer's task, in
//!   registration order. A blocking observer stalls the producer — wrap it
//!   in a [`Buffer`](crate::Buffer).
//! - **Counter side effect**: every `record` call advances the sequence
//!   counter exactly once, even if the event is dropped downstream.
//!
//! ## Example
//! ```rust
//! use spanloom::{RawEvent, Registry, SpanContext};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let registry = Registry::new();
//! let seq = registry
//!     .record(RawEvent::start_span("job", SpanContext::new(1, 1)))
//!     .await;
//! assert_eq!(seq, 1);
//! # }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use tokio::sync::RwLock;

use crate::events::{EventId, RawEvent};
use crate::observers::Observe;

/// Fan-out bus over a snapshot of subscribed observers.
///
/// Cheap to share behind an `Arc`; all methods take `&self`. The registry
/// and its consumer set live for as long as the owner keeps them — there is
/// no implicit process-global instance.
pub struct Registry {
    /// Immutable consumer snapshot; replaced wholesale on (de)registration.
    observers: RwLock<Arc<Vec<Arc<dyn Observe>>>>,
    /// Next sequence number. Starts at 1; 0 is the unassigned/root sentinel.
    seq: AtomicU64,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            observers: RwLock::new(Arc::new(Vec::new())),
            seq: AtomicU64::new(1),
        }
    }

    /// Adds an observer to the consumer set.
    ///
    /// Identity is the `Arc` pointer: registering the same instance twice
    /// leaves a single registration.
    pub async fn register(&self, observer: Arc<dyn Observe>) {
        let mut guard = self.observers.write().await;
        if guard.iter().any(|o| Arc::ptr_eq(o, &observer)) {
            return;
        }
        let mut next = Vec::with_capacity(guard.len() + 1);
        next.extend(guard.iter().cloned());
        next.push(observer);
        *guard = Arc::new(next);
    }

    /// Removes an observer from the consumer set.
    ///
    /// Unknown observers are ignored.
    pub async fn unregister(&self, observer: &Arc<dyn Observe>) {
        let mut guard = self.observers.write().await;
        if !guard.iter().any(|o| Arc::ptr_eq(o, observer)) {
            return;
        }
        let next: Vec<Arc<dyn Observe>> = guard
            .iter()
            .filter(|o| !Arc::ptr_eq(o, observer))
            .cloned()
            .collect();
        *guard = Arc::new(next);
    }

    /// Submits one event: fills `seq` and `at` when unset, then invokes
    /// every observer in the current snapshot, in the caller's task.
    ///
    /// Returns the event's sequence number. The counter advances once per
    /// call regardless of what consumers do with the event.
    pub async fn record(&self, mut event: RawEvent) -> EventId {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        if event.seq == 0 {
            event.seq = seq;
        }
        if event.at.is_none() {
            event.at = Some(SystemTime::now());
        }

        let snapshot = { self.observers.read().await.clone() };
        for observer in snapshot.iter() {
            observer.observe(&event).await;
        }
        event.seq
    }

    /// Iterates the current consumer snapshot.
    pub async fn for_each(&self, mut f: impl FnMut(&Arc<dyn Observe>)) {
        let snapshot = { self.observers.read().await.clone() };
        for observer in snapshot.iter() {
            f(observer);
        }
    }

    /// Number of registered observers.
    pub async fn len(&self) -> usize {
        self.observers.read().await.len()
    }

    /// True if no observers are registered.
    pub async fn is_empty(&self) -> bool {
        self.observers.read().await.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
