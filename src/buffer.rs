//! # Backpressure buffer: bounded queue + single draining worker.
//!
//! [`Buffer`] wraps one or more [`Observe`]rs behind a bounded queue so a
//! fast producer is decoupled from slow consumers, at the cost of dropping
//! events on overflow.
//!
//! ## Architecture
//! ```text
//! observe(event) ──try_send──► [bounded queue] ──► worker ──► observer 1
//!        │                                           │    └─► observer 2
//!        └─ queue full → drop, dropped += 1          └─ catch_unwind per call
//! ```
//!
//! ## Rules
//! - **Non-blocking enqueue**: `observe` uses `try_send`; the producer is
//!   never blocked and gets no signal that a drop occurred. Drops are
//!   visible through [`Buffer::dropped`].
//! - **FIFO within one instance**: the single worker forwards strictly in
//!   queue order, to every wrapped observer in turn. There is no ordering
//!   guarantee across producers or across buffer instances.
//! - **Panic isolation**: a panicking consumer is caught and counted; the
//!   worker keeps draining.
//! - **Close discards**: [`Buffer::close`] stops the worker and waits for
//!   it to exit. Nothing is forwarded after `close` returns; events still
//!   queued at that point are discarded, not flushed.
//!
//! ## Conservation
//! For `S` events submitted before close: `enqueued() + dropped() == S`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::events::RawEvent;
use crate::observers::Observe;

/// Bounded decoupling point between producers and slow consumers.
pub struct Buffer {
    tx: mpsc::Sender<RawEvent>,
    worker: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
    enqueued: AtomicU64,
    dropped: AtomicU64,
    panicked: Arc<AtomicU64>,
}

impl Buffer {
    /// Creates a buffer of the given capacity (clamped to a minimum of 1)
    /// over the wrapped observers, and spawns its draining worker.
    #[must_use]
    pub fn new(capacity: usize, observers: Vec<Arc<dyn Observe>>) -> Arc<Self> {
        let capacity = capacity.max(1);
        let (tx, mut rx) = mpsc::channel::<RawEvent>(capacity);
        let cancel = CancellationToken::new();
        let panicked = Arc::new(AtomicU64::new(0));

        let token = cancel.clone();
        let panics = Arc::clone(&panicked);
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    next = rx.recv() => {
                        let Some(event) = next else { break };
                        for observer in &observers {
                            let fut = observer.observe(&event);
                            if std::panic::AssertUnwindSafe(fut).catch_unwind().await.is_err() {
                                panics.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                    }
                }
            }
        });

        Arc::new(Self {
            tx,
            worker: Mutex::new(Some(handle)),
            cancel,
            enqueued: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            panicked,
        })
    }

    /// Stops the worker and waits for it to exit.
    ///
    /// After `close` returns no further event is forwarded to the wrapped
    /// observers. Queued-but-undrained events are discarded. Subsequent
    /// `observe` calls count as drops; calling `close` again is a no-op.
    pub async fn close(&self) {
        self.cancel.cancel();
        let handle = { self.worker.lock().await.take() };
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    /// Events accepted into the queue so far.
    pub fn enqueued(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    /// Events dropped on overflow (or after close) so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Consumer panics caught by the worker so far.
    pub fn panicked(&self) -> u64 {
        self.panicked.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Observe for Buffer {
    async fn observe(&self, event: &RawEvent) {
        if self.cancel.is_cancelled() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        }
        match self.tx.try_send(event.clone()) {
            Ok(()) => {
                self.enqueued.fetch_add(1, Ordering::Relaxed);
            }
            Err(mpsc::error::TrySendError::Full(_))
            | Err(mpsc::error::TrySendError::Closed(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn name(&self) -> &'static str {
        "buffer"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use std::time::Duration;
    use tokio::sync::Mutex as AsyncMutex;

    struct Capture {
        seen: AsyncMutex<Vec<u64>>,
        delay: Duration,
    }

    impl Capture {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                seen: AsyncMutex::new(Vec::new()),
                delay,
            })
        }
    }

    #[async_trait]
    impl Observe for Capture {
        async fn observe(&self, event: &RawEvent) {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.seen.lock().await.push(event.seq);
        }

        fn name(&self) -> &'static str {
            "capture"
        }
    }

    struct Panicker;

    #[async_trait]
    impl Observe for Panicker {
        async fn observe(&self, _event: &RawEvent) {
            panic!("boom");
        }
    }

    fn event(seq: u64) -> RawEvent {
        RawEvent::new(EventKind::Log).with_seq(seq)
    }

    async fn wait_for<F: Fn() -> bool>(cond: F) {
        for _ in 0..200 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached in time");
    }

    #[tokio::test]
    async fn test_fifo_forwarding() {
        let capture = Capture::new(Duration::ZERO);
        let buffer = Buffer::new(16, vec![capture.clone()]);

        for seq in 1..=10 {
            buffer.observe(&event(seq)).await;
        }
        wait_for(|| buffer.enqueued() == 10).await;
        // drain completes once the queue is consumed
        for _ in 0..200 {
            if capture.seen.lock().await.len() == 10 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let seen = capture.seen.lock().await;
        assert_eq!(*seen, (1..=10).collect::<Vec<u64>>());
    }

    #[tokio::test]
    async fn test_conservation_law_under_overflow() {
        let capture = Capture::new(Duration::from_millis(20));
        let buffer = Buffer::new(2, vec![capture.clone()]);

        let submitted = 50u64;
        for seq in 1..=submitted {
            buffer.observe(&event(seq)).await;
        }

        assert_eq!(buffer.enqueued() + buffer.dropped(), submitted);
        assert!(buffer.dropped() > 0, "slow consumer must overflow capacity 2");
        buffer.close().await;
    }

    #[tokio::test]
    async fn test_close_stops_forwarding_and_discards() {
        let capture = Capture::new(Duration::from_millis(50));
        let buffer = Buffer::new(8, vec![capture.clone()]);

        for seq in 1..=5 {
            buffer.observe(&event(seq)).await;
        }
        buffer.close().await;

        let seen_at_close = capture.seen.lock().await.len();
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(
            capture.seen.lock().await.len(),
            seen_at_close,
            "no forwarding after close returns"
        );

        // submissions after close count as drops
        let dropped = buffer.dropped();
        buffer.observe(&event(99)).await;
        assert_eq!(buffer.dropped(), dropped + 1);
    }

    #[tokio::test]
    async fn test_panicking_consumer_is_isolated() {
        let capture = Capture::new(Duration::ZERO);
        let buffer = Buffer::new(8, vec![Arc::new(Panicker), capture.clone()]);

        for seq in 1..=3 {
            buffer.observe(&event(seq)).await;
        }
        for _ in 0..200 {
            if capture.seen.lock().await.len() == 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        assert_eq!(buffer.panicked(), 3);
        assert_eq!(*capture.seen.lock().await, vec![1, 2, 3]);
    }
}
