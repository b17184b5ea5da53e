//! # Scope/span reconstruction engine.
//!
//! [`Reconstructor`] consumes raw events, maintains the table from sequence
//! number to reconstructed scope/span state, resolves attribute inheritance
//! and span parentage, and emits [`ResolvedEvent`]s to its downstream
//! readers.
//!
//! ## Architecture
//! ```text
//! observe(RawEvent)
//!     │  dispatch on kind, state table under one RwLock
//!     ├─ StartSpan   → new span, inherit parent attrs    → emit
//!     ├─ FinishSpan  → duration, accumulated attrs,
//!     │                refcounted cleanup walk           → emit
//!     ├─ NewScope    → derive immutable scope            → (no output)
//!     ├─ ModifyAttr  → derive scope, advance span tail   → emit
//!     ├─ AddEvent/Log→ resolve + merge, not persisted    → emit
//!     ├─ NewMeasure/NewMetric → register metadata        → (no output)
//!     ├─ RecordStats → resolve each measurement's scope  → emit
//!     └─ SetStatus   → set span status in place          → emit
//! ```
//!
//! ## Rules
//! - Mutating handlers hold the write lock for the whole
//!   resolve-then-mutate sequence, so inheritance and cleanup are atomic
//!   per event. Cross-event ordering is the caller's problem.
//! - A protocol violation (unknown or wrong-kind reference) drops the
//!   event and increments a counter in [`ReconstructStats`]; the process
//!   is never terminated and the producer is never told.
//! - Emission happens after the lock is released.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::ReconstructError;
use crate::events::{
    AttrMap, EventId, EventKind, RawEvent, ResolvedEvent, ResolvedMeasurement, Status,
};
use crate::observers::{Observe, Read};
use crate::reconstruct::state::{
    Entry, MeasureState, MetricState, ScopeState, SpanState, Table,
};

/// Snapshot of the engine's drop counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconstructStats {
    /// Events dropped for referencing an unknown scope.
    pub unknown_scope: u64,
    /// Events dropped for targeting a non-span entry.
    pub not_a_span: u64,
    /// Events dropped for referencing an unknown measure.
    pub unknown_measure: u64,
    /// Individual measurements dropped inside `RecordStats` batches.
    pub dropped_measurements: u64,
}

/// The state machine at the heart of the pipeline.
pub struct Reconstructor {
    state: RwLock<Table>,
    readers: Vec<Arc<dyn Read>>,
    unknown_scope: AtomicU64,
    not_a_span: AtomicU64,
    unknown_measure: AtomicU64,
    dropped_measurements: AtomicU64,
}

impl Reconstructor {
    /// Creates an engine emitting to the given downstream readers.
    #[must_use]
    pub fn new(readers: Vec<Arc<dyn Read>>) -> Arc<Self> {
        Arc::new(Self {
            state: RwLock::new(Table::default()),
            readers,
            unknown_scope: AtomicU64::new(0),
            not_a_span: AtomicU64::new(0),
            unknown_measure: AtomicU64::new(0),
            dropped_measurements: AtomicU64::new(0),
        })
    }

    /// Returns a snapshot of the drop counters.
    pub fn stats(&self) -> ReconstructStats {
        ReconstructStats {
            unknown_scope: self.unknown_scope.load(Ordering::Relaxed),
            not_a_span: self.not_a_span.load(Ordering::Relaxed),
            unknown_measure: self.unknown_measure.load(Ordering::Relaxed),
            dropped_measurements: self.dropped_measurements.load(Ordering::Relaxed),
        }
    }

    /// True if the table currently holds an entry for `id`.
    pub async fn contains(&self, id: EventId) -> bool {
        self.state.read().await.contains(id)
    }

    /// Number of live table entries.
    pub async fn table_len(&self) -> usize {
        self.state.read().await.len()
    }

    fn count(&self, err: &ReconstructError) {
        let counter = match err {
            ReconstructError::UnknownScope { .. } => &self.unknown_scope,
            ReconstructError::NotASpan { .. } => &self.not_a_span,
            ReconstructError::UnknownMeasure { .. } => &self.unknown_measure,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    async fn emit(&self, event: ResolvedEvent) {
        for reader in &self.readers {
            reader.read(&event).await;
        }
    }

    async fn apply(&self, ev: &RawEvent) -> Result<Option<ResolvedEvent>, ReconstructError> {
        let at = ev.at.unwrap_or_else(SystemTime::now);
        match ev.kind {
            EventKind::StartSpan => self.on_start_span(ev, at).await.map(Some),
            EventKind::FinishSpan => self.on_finish_span(ev, at).await.map(Some),
            EventKind::NewScope => self.on_derive_scope(ev, at, false).await,
            EventKind::ModifyAttr => self.on_derive_scope(ev, at, true).await,
            EventKind::AddEvent | EventKind::Log => self.on_sub_event(ev, at).await.map(Some),
            EventKind::NewMeasure => self.on_new_measure(ev).await.map(|()| None),
            EventKind::NewMetric => self.on_new_metric(ev).await.map(|()| None),
            EventKind::RecordStats => self.on_record_stats(ev, at).await,
            EventKind::SetStatus => self.on_set_status(ev, at).await.map(Some),
        }
    }

    /// StartSpan: allocate a span with a fresh root scope inheriting the
    /// parent's resolved attributes. A remote parent (no local event id)
    /// contributes no attributes.
    async fn on_start_span(
        &self,
        ev: &RawEvent,
        at: SystemTime,
    ) -> Result<ResolvedEvent, ReconstructError> {
        let context = ev.scope.context;
        let name = ev.text.clone().unwrap_or_else(|| Arc::from(""));

        let mut table = self.state.write().await;

        let mut parent_id = 0;
        let mut parent_context = None;
        let mut parent_attributes: Option<AttrMap> = None;
        if let Some(parent) = ev.parent {
            if parent.event_id != 0 {
                let attrs = table
                    .resolved(parent.event_id)
                    .ok_or(ReconstructError::UnknownScope {
                        seq: ev.seq,
                        scope: parent.event_id,
                    })?
                    .clone();
                parent_id = parent.event_id;
                parent_attributes = Some(attrs);
                parent_context = table
                    .span_of(parent.event_id)
                    .and_then(|sid| table.span(sid))
                    .map(|s| s.context)
                    .or(Some(parent.context))
                    .filter(|c| !c.is_empty());
            } else if !parent.context.is_empty() {
                // remote parent: context known, attributes not
                parent_context = Some(parent.context);
                parent_attributes = Some(AttrMap::new());
            }
        }

        let attributes = parent_attributes.clone().unwrap_or_default();
        table.insert(
            ev.seq,
            Entry::Span(SpanState {
                name: Arc::clone(&name),
                context,
                parent: parent_id,
                started_at: at,
                start_tags: attributes.clone(),
                attributes: attributes.clone(),
                tail: 0,
                derived: Vec::new(),
                status: None,
            }),
        );
        if parent_id != 0 {
            table.retain(parent_id);
        }
        drop(table);

        let mut resolved = ResolvedEvent::new(EventKind::StartSpan, ev.seq, at)
            .with_context(context)
            .with_name(name)
            .with_attributes(attributes.clone())
            .with_start_tags(attributes);
        if let Some(ctx) = parent_context {
            resolved = resolved.with_parent_context(ctx);
        }
        if let Some(attrs) = parent_attributes {
            resolved = resolved.with_parent_attributes(attrs);
        }
        Ok(resolved)
    }

    /// FinishSpan: compute the duration, emit the accumulated attributes
    /// and original start tags, then unwind the span's table state.
    async fn on_finish_span(
        &self,
        ev: &RawEvent,
        at: SystemTime,
    ) -> Result<ResolvedEvent, ReconstructError> {
        let id = ev.scope.event_id;
        let mut table = self.state.write().await;

        if !table.contains(id) {
            return Err(ReconstructError::UnknownScope { seq: ev.seq, scope: id });
        }
        let span = table
            .span(id)
            .ok_or(ReconstructError::NotASpan { seq: ev.seq, scope: id })?
            .clone();

        let attributes = table.resolved(id).cloned().unwrap_or_default();
        let duration = at
            .duration_since(span.started_at)
            .unwrap_or(Duration::ZERO);

        for derived in &span.derived {
            table.release(*derived);
        }
        table.release(id);
        drop(table);

        let mut resolved = ResolvedEvent::new(EventKind::FinishSpan, ev.seq, at)
            .with_context(span.context)
            .with_name(span.name)
            .with_attributes(attributes)
            .with_start_tags(span.start_tags)
            .with_duration(duration);
        if let Some(status) = span.status {
            resolved = resolved.with_status(status);
        }
        Ok(resolved)
    }

    /// NewScope / ModifyAttr: derive a new immutable scope from the base.
    /// Only ModifyAttr advances the owning span's accumulated attributes
    /// and emits downstream.
    async fn on_derive_scope(
        &self,
        ev: &RawEvent,
        at: SystemTime,
        emit: bool,
    ) -> Result<Option<ResolvedEvent>, ReconstructError> {
        let base_id = ev.scope.event_id;
        let mut table = self.state.write().await;

        let (mut attributes, base_span) = if base_id == 0 {
            (AttrMap::new(), None)
        } else {
            let attrs = table
                .resolved(base_id)
                .ok_or(ReconstructError::UnknownScope {
                    seq: ev.seq,
                    scope: base_id,
                })?
                .clone();
            (attrs, table.span_of(base_id))
        };

        if let Some(attr) = &ev.attr {
            attributes.insert(Arc::clone(&attr.key), attr.value.clone());
        }
        if let Some(attrs) = &ev.attrs {
            for attr in attrs {
                attributes.insert(Arc::clone(&attr.key), attr.value.clone());
            }
        }
        if let Some(mutators) = &ev.mutators {
            for mutator in mutators {
                mutator.apply(&mut attributes);
            }
        }

        table.insert(
            ev.seq,
            Entry::Scope(ScopeState {
                parent: base_id,
                span: base_span,
                attributes: attributes.clone(),
            }),
        );
        if base_id != 0 {
            table.retain(base_id);
        }

        let mut context = None;
        let mut start_tags = None;
        if let Some(span_id) = base_span {
            if let Some(span) = table.span_mut(span_id) {
                span.derived.push(ev.seq);
                if emit {
                    span.tail = ev.seq;
                }
                if !span.context.is_empty() {
                    context = Some(span.context);
                }
                start_tags = Some(span.start_tags.clone());
            }
        }
        drop(table);

        if !emit {
            return Ok(None);
        }
        let mut resolved = ResolvedEvent::new(EventKind::ModifyAttr, ev.seq, at)
            .with_attributes(attributes);
        if let Some(ctx) = context {
            resolved = resolved.with_context(ctx);
        }
        if let Some(tags) = start_tags {
            resolved = resolved.with_start_tags(tags);
        }
        Ok(Some(resolved))
    }

    /// AddEvent / Log: resolve the naming scope and merge the event's own
    /// attributes without persisting the merge.
    async fn on_sub_event(
        &self,
        ev: &RawEvent,
        at: SystemTime,
    ) -> Result<ResolvedEvent, ReconstructError> {
        let id = ev.scope.event_id;
        let table = self.state.read().await;

        let (mut attributes, span_id) = if id == 0 {
            (AttrMap::new(), None)
        } else {
            let attrs = table
                .resolved(id)
                .ok_or(ReconstructError::UnknownScope { seq: ev.seq, scope: id })?
                .clone();
            (attrs, table.span_of(id))
        };

        if let Some(attr) = &ev.attr {
            attributes.insert(Arc::clone(&attr.key), attr.value.clone());
        }
        if let Some(attrs) = &ev.attrs {
            for attr in attrs {
                attributes.insert(Arc::clone(&attr.key), attr.value.clone());
            }
        }

        let mut context = None;
        let mut start_tags = None;
        if let Some(span) = span_id.and_then(|sid| table.span(sid)) {
            if !span.context.is_empty() {
                context = Some(span.context);
            }
            start_tags = Some(span.start_tags.clone());
        }
        drop(table);

        let mut resolved =
            ResolvedEvent::new(ev.kind, ev.seq, at).with_attributes(attributes);
        if let Some(name) = ev.text.clone() {
            resolved = resolved.with_name(name);
        }
        if let Some(args) = ev.args.clone() {
            resolved = resolved.with_args(args);
        }
        if let Some(ctx) = context {
            resolved = resolved.with_context(ctx);
        }
        if let Some(tags) = start_tags {
            resolved = resolved.with_start_tags(tags);
        }
        Ok(resolved)
    }

    /// NewMeasure: register measure metadata. Nothing goes downstream.
    async fn on_new_measure(&self, ev: &RawEvent) -> Result<(), ReconstructError> {
        let name = ev.text.clone().unwrap_or_else(|| Arc::from(""));
        let mut table = self.state.write().await;
        table.insert(ev.seq, Entry::Measure(MeasureState { name }));
        Ok(())
    }

    /// NewMetric: register metric metadata referencing its measure's table
    /// entry. Nothing goes downstream.
    async fn on_new_metric(&self, ev: &RawEvent) -> Result<(), ReconstructError> {
        let measure = ev.scope.event_id;
        let name = ev.text.clone().unwrap_or_else(|| Arc::from(""));
        let mut table = self.state.write().await;
        if table.measure_name(measure).is_none() {
            return Err(ReconstructError::UnknownMeasure { seq: ev.seq, measure });
        }
        table.insert(ev.seq, Entry::Metric(MetricState { name, measure }));
        Ok(())
    }

    /// RecordStats: resolve each measurement against its own scope
    /// reference. Unresolvable measurements are dropped and counted; the
    /// batch is emitted if any survive.
    async fn on_record_stats(
        &self,
        ev: &RawEvent,
        at: SystemTime,
    ) -> Result<Option<ResolvedEvent>, ReconstructError> {
        let table = self.state.read().await;

        let mut resolved_measurements = Vec::new();
        let mut dropped = 0u64;
        let batch = ev
            .measurements
            .iter()
            .flatten()
            .chain(ev.measurement.iter());
        for m in batch {
            let Some(name) = table.measure_name(m.measure) else {
                dropped += 1;
                continue;
            };
            let attributes = if m.scope.event_id == 0 {
                AttrMap::new()
            } else {
                match table.resolved(m.scope.event_id) {
                    Some(attrs) => attrs.clone(),
                    None => {
                        dropped += 1;
                        continue;
                    }
                }
            };
            resolved_measurements.push(ResolvedMeasurement {
                name,
                value: m.value,
                attributes,
            });
        }

        let context = if ev.scope.event_id != 0 {
            table
                .span_of(ev.scope.event_id)
                .and_then(|sid| table.span(sid))
                .map(|s| s.context)
                .filter(|c| !c.is_empty())
        } else {
            None
        };
        drop(table);

        if dropped > 0 {
            self.dropped_measurements.fetch_add(dropped, Ordering::Relaxed);
        }
        if resolved_measurements.is_empty() {
            return Ok(None);
        }

        let mut resolved = ResolvedEvent::new(EventKind::RecordStats, ev.seq, at)
            .with_measurements(resolved_measurements);
        if let Some(ctx) = context {
            resolved = resolved.with_context(ctx);
        }
        Ok(Some(resolved))
    }

    /// SetStatus: the one in-place mutation of the otherwise-immutable
    /// scope chain.
    async fn on_set_status(
        &self,
        ev: &RawEvent,
        at: SystemTime,
    ) -> Result<ResolvedEvent, ReconstructError> {
        let id = ev.scope.event_id;
        let code = ev.value.unwrap_or(0.0) as i32;
        let message = ev.text.clone().unwrap_or_else(|| Arc::from(""));
        let status = Status { code, message };

        let mut table = self.state.write().await;
        if !table.contains(id) {
            return Err(ReconstructError::UnknownScope { seq: ev.seq, scope: id });
        }
        let attributes = table.resolved(id).cloned().unwrap_or_default();
        let span = table
            .span_mut(id)
            .ok_or(ReconstructError::NotASpan { seq: ev.seq, scope: id })?;
        span.status = Some(status.clone());
        let context = span.context;
        drop(table);

        Ok(ResolvedEvent::new(EventKind::SetStatus, ev.seq, at)
            .with_context(context)
            .with_attributes(attributes)
            .with_status(status))
    }
}

#[async_trait]
impl Observe for Reconstructor {
    async fn observe(&self, event: &RawEvent) {
        match self.apply(event).await {
            Ok(Some(resolved)) => self.emit(resolved).await,
            Ok(None) => {}
            Err(err) => self.count(&err),
        }
    }

    fn name(&self) -> &'static str {
        "reconstructor"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Measurement, Mutator, ScopeId, SpanContext};
    use tokio::sync::Mutex;

    struct Capture {
        seen: Mutex<Vec<ResolvedEvent>>,
    }

    impl Capture {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
            })
        }

        async fn take(&self) -> Vec<ResolvedEvent> {
            std::mem::take(&mut *self.seen.lock().await)
        }
    }

    #[async_trait]
    impl Read for Capture {
        async fn read(&self, event: &ResolvedEvent) {
            self.seen.lock().await.push(event.clone());
        }

        fn name(&self) -> &'static str {
            "capture"
        }
    }

    fn engine() -> (Arc<Reconstructor>, Arc<Capture>) {
        let capture = Capture::new();
        let reader: Arc<dyn Read> = capture.clone();
        (Reconstructor::new(vec![reader]), capture)
    }

    #[tokio::test]
    async fn test_start_modify_finish_resolves_and_cleans_up() {
        let (engine, capture) = engine();
        let ctx = SpanContext::new(7, 1);

        engine
            .observe(&RawEvent::start_span("a", ctx).with_seq(1))
            .await;
        engine
            .observe(
                &RawEvent::modify_attr(
                    ScopeId::from_event(1),
                    vec![Mutator::upsert("k", "v")],
                )
                .with_seq(2),
            )
            .await;
        engine
            .observe(&RawEvent::finish_span(ScopeId::from_event(1)).with_seq(3))
            .await;

        let seen = capture.take().await;
        assert_eq!(seen.len(), 3);

        assert_eq!(seen[0].kind, EventKind::StartSpan);
        assert!(seen[0].attributes.is_empty());
        assert_eq!(seen[0].context, Some(ctx));

        assert_eq!(seen[1].kind, EventKind::ModifyAttr);
        assert_eq!(seen[1].attributes.get("k"), Some(&"v".into()));
        assert_eq!(seen[1].context, Some(ctx));

        assert_eq!(seen[2].kind, EventKind::FinishSpan);
        assert_eq!(seen[2].attributes.get("k"), Some(&"v".into()));
        assert!(seen[2].duration.expect("duration") >= Duration::ZERO);

        // cleanup removed both table entries
        assert!(!engine.contains(1).await);
        assert!(!engine.contains(2).await);
        assert_eq!(engine.table_len().await, 0);
    }

    #[tokio::test]
    async fn test_attribute_inheritance_is_one_way() {
        let (engine, capture) = engine();

        // root → A(k=1) → B
        engine
            .observe(
                &RawEvent::modify_attr(ScopeId::ROOT, vec![Mutator::upsert("k", 1i64)])
                    .with_seq(1),
            )
            .await;
        engine
            .observe(&RawEvent::new_scope(ScopeId::from_event(1)).with_seq(2))
            .await;

        // B resolves k from A
        engine
            .observe(&RawEvent::log(ScopeId::from_event(2), "peek").with_seq(3))
            .await;

        // B sets k=2; A keeps k=1
        engine
            .observe(
                &RawEvent::modify_attr(
                    ScopeId::from_event(2),
                    vec![Mutator::upsert("k", 2i64)],
                )
                .with_seq(4),
            )
            .await;
        engine
            .observe(&RawEvent::log(ScopeId::from_event(1), "peek").with_seq(5))
            .await;

        let seen = capture.take().await;
        let b_view = &seen[1];
        assert_eq!(b_view.attributes.get("k"), Some(&1i64.into()));
        let b_override = &seen[2];
        assert_eq!(b_override.attributes.get("k"), Some(&2i64.into()));
        let a_view = &seen[3];
        assert_eq!(a_view.attributes.get("k"), Some(&1i64.into()), "no back-propagation");
    }

    #[tokio::test]
    async fn test_child_span_inherits_parent_attributes() {
        let (engine, capture) = engine();
        let parent_ctx = SpanContext::new(9, 1);
        let child_ctx = SpanContext::new(9, 2);

        engine
            .observe(&RawEvent::start_span("parent", parent_ctx).with_seq(1))
            .await;
        engine
            .observe(
                &RawEvent::modify_attr(
                    ScopeId::from_event(1),
                    vec![Mutator::upsert("tenant", "acme")],
                )
                .with_seq(2),
            )
            .await;
        engine
            .observe(
                &RawEvent::start_span("child", child_ctx)
                    .with_parent(ScopeId::new(1, parent_ctx))
                    .with_seq(3),
            )
            .await;

        let seen = capture.take().await;
        let child_start = &seen[2];
        assert_eq!(child_start.kind, EventKind::StartSpan);
        assert_eq!(child_start.parent_context, Some(parent_ctx));
        assert_eq!(
            child_start.attributes.get("tenant"),
            Some(&"acme".into()),
            "child inherits the parent's accumulated attributes"
        );
    }

    #[tokio::test]
    async fn test_remote_parent_has_empty_attributes() {
        let (engine, capture) = engine();
        let remote = SpanContext::new(3, 3);

        engine
            .observe(
                &RawEvent::start_span("edge", SpanContext::new(3, 4))
                    .with_parent(ScopeId::new(0, remote))
                    .with_seq(1),
            )
            .await;

        let seen = capture.take().await;
        assert_eq!(seen[0].parent_context, Some(remote));
        assert_eq!(seen[0].parent_attributes.as_ref().map(AttrMap::len), Some(0));
    }

    #[tokio::test]
    async fn test_unknown_references_are_counted_not_fatal() {
        let (engine, capture) = engine();

        engine
            .observe(&RawEvent::finish_span(ScopeId::from_event(77)).with_seq(1))
            .await;
        engine
            .observe(&RawEvent::log(ScopeId::from_event(88), "orphan").with_seq(2))
            .await;
        engine
            .observe(&RawEvent::new_metric("latency_p99", 99).with_seq(3))
            .await;

        assert!(capture.take().await.is_empty());
        let stats = engine.stats();
        assert_eq!(stats.unknown_scope, 2);
        assert_eq!(stats.unknown_measure, 1);
    }

    #[tokio::test]
    async fn test_finish_on_non_span_entry_is_counted() {
        let (engine, _capture) = engine();

        engine
            .observe(&RawEvent::new_scope(ScopeId::ROOT).with_seq(1))
            .await;
        engine
            .observe(&RawEvent::finish_span(ScopeId::from_event(1)).with_seq(2))
            .await;

        assert_eq!(engine.stats().not_a_span, 1);
        assert!(engine.contains(1).await, "the scope entry is untouched");
    }

    #[tokio::test]
    async fn test_sub_event_merge_is_not_persisted() {
        let (engine, capture) = engine();
        let ctx = SpanContext::new(5, 5);

        engine
            .observe(&RawEvent::start_span("s", ctx).with_seq(1))
            .await;
        engine
            .observe(
                &RawEvent::add_event(ScopeId::from_event(1), "checkpoint")
                    .with_attr(crate::events::Attr::new("local", true))
                    .with_seq(2),
            )
            .await;
        engine
            .observe(&RawEvent::finish_span(ScopeId::from_event(1)).with_seq(3))
            .await;

        let seen = capture.take().await;
        assert_eq!(seen[1].attributes.get("local"), Some(&true.into()));
        assert!(
            !seen[2].attributes.contains_key("local"),
            "sub-event attributes must not leak into the span"
        );
    }

    #[tokio::test]
    async fn test_set_status_mutates_in_place_and_reaches_finish() {
        let (engine, capture) = engine();
        let ctx = SpanContext::new(2, 2);

        engine
            .observe(&RawEvent::start_span("s", ctx).with_seq(1))
            .await;
        engine
            .observe(&RawEvent::set_status(ScopeId::from_event(1), 13, "cancelled").with_seq(2))
            .await;
        engine
            .observe(&RawEvent::finish_span(ScopeId::from_event(1)).with_seq(3))
            .await;

        let seen = capture.take().await;
        let status = seen[1].status.as_ref().expect("status event");
        assert_eq!(status.code, 13);
        assert_eq!(status.message.as_ref(), "cancelled");
        let at_finish = seen[2].status.as_ref().expect("status on finish");
        assert_eq!(at_finish.code, 13);
    }

    #[tokio::test]
    async fn test_record_stats_resolves_per_measurement_scopes() {
        let (engine, capture) = engine();
        let ctx = SpanContext::new(4, 4);

        engine
            .observe(&RawEvent::new_measure("bytes_sent").with_seq(1))
            .await;
        engine
            .observe(&RawEvent::start_span("s", ctx).with_seq(2))
            .await;
        engine
            .observe(
                &RawEvent::modify_attr(
                    ScopeId::from_event(2),
                    vec![Mutator::upsert("peer", "10.0.0.2")],
                )
                .with_seq(3),
            )
            .await;
        engine
            .observe(
                &RawEvent::record_stats(
                    ScopeId::from_event(2),
                    vec![
                        Measurement::new(1, 512.0, ScopeId::from_event(3)),
                        Measurement::new(42, 1.0, ScopeId::from_event(3)), // unknown measure
                    ],
                )
                .with_seq(4),
            )
            .await;

        let seen = capture.take().await;
        let stats_event = seen.last().expect("record_stats emitted");
        assert_eq!(stats_event.kind, EventKind::RecordStats);
        assert_eq!(stats_event.context, Some(ctx));
        let ms = stats_event.measurements.as_ref().expect("measurements");
        assert_eq!(ms.len(), 1);
        assert_eq!(ms[0].name.as_ref(), "bytes_sent");
        assert_eq!(ms[0].value, 512.0);
        assert_eq!(ms[0].attributes.get("peer"), Some(&"10.0.0.2".into()));

        assert_eq!(engine.stats().dropped_measurements, 1);
    }

    #[tokio::test]
    async fn test_shared_scope_survives_sibling_finish() {
        let (engine, _capture) = engine();
        let a = SpanContext::new(6, 1);
        let b = SpanContext::new(6, 2);

        engine
            .observe(&RawEvent::start_span("a", a).with_seq(1))
            .await;
        // resource-level scope under span a, also parent of span b
        engine
            .observe(
                &RawEvent::new_scope(ScopeId::from_event(1))
                    .with_attr(crate::events::Attr::new("pool", "primary"))
                    .with_seq(2),
            )
            .await;
        engine
            .observe(
                &RawEvent::start_span("b", b)
                    .with_parent(ScopeId::from_event(2))
                    .with_seq(3),
            )
            .await;

        engine
            .observe(&RawEvent::finish_span(ScopeId::from_event(1)).with_seq(4))
            .await;
        assert!(
            engine.contains(2).await,
            "scope still referenced by span b must survive span a's cleanup"
        );

        engine
            .observe(&RawEvent::finish_span(ScopeId::from_event(3)).with_seq(5))
            .await;
        assert_eq!(engine.table_len().await, 0, "second finish unwinds everything");
    }
}
