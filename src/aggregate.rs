//! # Span aggregator: one ordered record per completed span.
//!
//! [`Aggregator`] consumes resolved events and groups them by span
//! identity, delivering a complete [`SpanAggregate`] to its sinks only when
//! the span finishes.
//!
//! ## Architecture
//! ```text
//! read(ResolvedEvent)
//!     │
//!     ├─ no/empty context ───────────► drop, orphaned += 1
//!     ├─ StartSpan ──────────────────► open aggregate
//!     ├─ context matches open span ──► append
//!     ├─ FinishSpan ─────────────────► append, seal, deliver to sinks,
//!     │                                remove table entry
//!     └─ no open aggregate ──────────► drop, orphaned += 1
//! ```
//!
//! ## Rules
//! - Events for a context with no open aggregate (delivered out of order,
//!   or after the span already finished) are dropped and counted.
//! - A duplicate `StartSpan` for an open context replaces the stale
//!   aggregate; the replaced record is counted as orphaned.
//! - Delivery happens after the table entry is removed, so a slow sink
//!   never blocks appends for other spans.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::events::{EventKind, ResolvedEvent, SpanAggregate, SpanContext};
use crate::observers::{Read, ReadSpan};

/// Groups resolved events by span identity.
pub struct Aggregator {
    spans: RwLock<HashMap<SpanContext, SpanAggregate>>,
    sinks: Vec<Arc<dyn ReadSpan>>,
    orphaned: AtomicU64,
}

impl Aggregator {
    /// Creates an aggregator delivering sealed records to the given sinks.
    #[must_use]
    pub fn new(sinks: Vec<Arc<dyn ReadSpan>>) -> Arc<Self> {
        Arc::new(Self {
            spans: RwLock::new(HashMap::new()),
            sinks,
            orphaned: AtomicU64::new(0),
        })
    }

    /// Resolved events dropped without a matching open span so far.
    pub fn orphaned(&self) -> u64 {
        self.orphaned.load(Ordering::Relaxed)
    }

    /// Number of spans currently open.
    pub async fn open_spans(&self) -> usize {
        self.spans.read().await.len()
    }

    fn count_orphan(&self) {
        self.orphaned.fetch_add(1, Ordering::Relaxed);
    }

    async fn deliver(&self, span: &SpanAggregate) {
        for sink in &self.sinks {
            sink.read_span(span).await;
        }
    }
}

#[async_trait]
impl Read for Aggregator {
    async fn read(&self, event: &ResolvedEvent) {
        let Some(context) = event.context else {
            self.count_orphan();
            return;
        };
        if context.is_empty() {
            self.count_orphan();
            return;
        }

        match event.kind {
            EventKind::StartSpan => {
                let name = event.name.clone().unwrap_or_else(|| Arc::from(""));
                let aggregate = SpanAggregate::open(context, name, event.clone());
                let replaced = {
                    let mut spans = self.spans.write().await;
                    spans.insert(context, aggregate)
                };
                if replaced.is_some() {
                    self.count_orphan();
                }
            }
            EventKind::FinishSpan => {
                let sealed = {
                    let mut spans = self.spans.write().await;
                    spans.remove(&context)
                };
                match sealed {
                    Some(mut aggregate) => {
                        aggregate.events.push(event.clone());
                        self.deliver(&aggregate).await;
                    }
                    None => self.count_orphan(),
                }
            }
            _ => {
                let mut spans = self.spans.write().await;
                match spans.get_mut(&context) {
                    Some(aggregate) => aggregate.events.push(event.clone()),
                    None => self.count_orphan(),
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        "aggregator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;
    use tokio::sync::Mutex;

    struct CaptureSink {
        sealed: Mutex<Vec<SpanAggregate>>,
    }

    impl CaptureSink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                sealed: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ReadSpan for CaptureSink {
        async fn read_span(&self, span: &SpanAggregate) {
            self.sealed.lock().await.push(span.clone());
        }

        fn name(&self) -> &'static str {
            "capture"
        }
    }

    fn aggregator() -> (Arc<Aggregator>, Arc<CaptureSink>) {
        let sink = CaptureSink::new();
        let dyn_sink: Arc<dyn ReadSpan> = sink.clone();
        (Aggregator::new(vec![dyn_sink]), sink)
    }

    fn resolved(kind: EventKind, seq: u64, context: Option<SpanContext>) -> ResolvedEvent {
        let mut ev = ResolvedEvent::new(kind, seq, SystemTime::now());
        if let Some(ctx) = context {
            ev = ev.with_context(ctx);
        }
        ev
    }

    #[tokio::test]
    async fn test_span_lifecycle_delivers_ordered_record() {
        let (agg, sink) = aggregator();
        let ctx = SpanContext::new(1, 1);

        agg.read(&resolved(EventKind::StartSpan, 1, Some(ctx)).with_name("job"))
            .await;
        agg.read(&resolved(EventKind::ModifyAttr, 2, Some(ctx))).await;
        agg.read(&resolved(EventKind::Log, 3, Some(ctx))).await;
        agg.read(&resolved(EventKind::FinishSpan, 4, Some(ctx))).await;

        let sealed = sink.sealed.lock().await;
        assert_eq!(sealed.len(), 1);
        let record = &sealed[0];
        assert_eq!(record.name.as_ref(), "job");
        assert_eq!(record.len(), 4);
        let seqs: Vec<u64> = record.events.iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3, 4]);
        assert_eq!(record.events[0].kind, EventKind::StartSpan);
        assert_eq!(record.events.last().expect("events").kind, EventKind::FinishSpan);

        assert_eq!(agg.open_spans().await, 0, "sealed span must leave the table");
    }

    #[tokio::test]
    async fn test_contextless_events_are_counted_orphans() {
        let (agg, sink) = aggregator();

        agg.read(&resolved(EventKind::Log, 1, None)).await;
        agg.read(&resolved(EventKind::Log, 2, Some(SpanContext::EMPTY)))
            .await;

        assert_eq!(agg.orphaned(), 2);
        assert!(sink.sealed.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_events_without_open_span_are_dropped() {
        let (agg, sink) = aggregator();
        let ctx = SpanContext::new(2, 2);

        // arrives before its StartSpan (out of order) — dropped
        agg.read(&resolved(EventKind::ModifyAttr, 1, Some(ctx))).await;
        // finish without an open span — dropped, nothing delivered
        agg.read(&resolved(EventKind::FinishSpan, 2, Some(ctx))).await;

        assert_eq!(agg.orphaned(), 2);
        assert!(sink.sealed.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_events_after_finish_are_dropped() {
        let (agg, _sink) = aggregator();
        let ctx = SpanContext::new(3, 3);

        agg.read(&resolved(EventKind::StartSpan, 1, Some(ctx))).await;
        agg.read(&resolved(EventKind::FinishSpan, 2, Some(ctx))).await;
        agg.read(&resolved(EventKind::Log, 3, Some(ctx))).await;

        assert_eq!(agg.orphaned(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_start_replaces_and_counts() {
        let (agg, sink) = aggregator();
        let ctx = SpanContext::new(4, 4);

        agg.read(&resolved(EventKind::StartSpan, 1, Some(ctx)).with_name("first"))
            .await;
        agg.read(&resolved(EventKind::StartSpan, 2, Some(ctx)).with_name("second"))
            .await;
        agg.read(&resolved(EventKind::FinishSpan, 3, Some(ctx))).await;

        assert_eq!(agg.orphaned(), 1, "replaced aggregate is counted");
        let sealed = sink.sealed.lock().await;
        assert_eq!(sealed.len(), 1);
        assert_eq!(sealed[0].name.as_ref(), "second");
    }

    #[tokio::test]
    async fn test_independent_spans_do_not_interleave() {
        let (agg, sink) = aggregator();
        let a = SpanContext::new(5, 1);
        let b = SpanContext::new(5, 2);

        agg.read(&resolved(EventKind::StartSpan, 1, Some(a)).with_name("a"))
            .await;
        agg.read(&resolved(EventKind::StartSpan, 2, Some(b)).with_name("b"))
            .await;
        agg.read(&resolved(EventKind::Log, 3, Some(a))).await;
        agg.read(&resolved(EventKind::Log, 4, Some(b))).await;
        agg.read(&resolved(EventKind::FinishSpan, 5, Some(b))).await;
        agg.read(&resolved(EventKind::FinishSpan, 6, Some(a))).await;

        let sealed = sink.sealed.lock().await;
        assert_eq!(sealed.len(), 2);
        assert_eq!(sealed[0].name.as_ref(), "b");
        assert_eq!(
            sealed[0].events.iter().map(|e| e.seq).collect::<Vec<_>>(),
            vec![2, 4, 5]
        );
        assert_eq!(
            sealed[1].events.iter().map(|e| e.seq).collect::<Vec<_>>(),
            vec![1, 3, 6]
        );
    }
}
