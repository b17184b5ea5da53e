//! # Resolved events: the reconstruction engine's output.
//!
//! A [`ResolvedEvent`] is a raw event after scope resolution: attribute maps
//! are fully materialized, the owning span's context is attached where one
//! exists, and kind-specific enrichment (duration, status, resolved
//! measurements) is filled in. [`SpanAggregate`] groups resolved events that
//! share one span context into a single ordered record.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use super::attrs::AttrMap;
use super::raw::{EventId, EventKind, SpanContext};

/// Span status, set in place by a `SetStatus` event.
#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    /// Numeric status code; `0` = ok.
    pub code: i32,
    /// Human-readable status message.
    pub message: Arc<str>,
}

impl Status {
    /// Creates a status record.
    pub fn new(code: i32, message: impl Into<Arc<str>>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// The ok status.
    pub fn ok() -> Self {
        Status::new(0, "")
    }
}

/// One measurement with its measure name and resolved attribute tags.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedMeasurement {
    /// Name of the measure this value belongs to.
    pub name: Arc<str>,
    /// Recorded value.
    pub value: f64,
    /// Attributes resolved from the measurement's own scope reference.
    pub attributes: AttrMap,
}

/// A semantically-resolved telemetry event.
#[derive(Debug, Clone)]
pub struct ResolvedEvent {
    /// Classification, carried over from the raw event.
    pub kind: EventKind,
    /// Sequence number, carried over from the raw event.
    pub seq: EventId,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Owning span context, if the event's scope chain roots at a span.
    pub context: Option<SpanContext>,
    /// Span/measure/log name, where the kind carries one.
    pub name: Option<Arc<str>>,
    /// Fully-resolved attribute map.
    pub attributes: AttrMap,
    /// The owning span's attribute snapshot captured at start.
    pub start_tags: Option<AttrMap>,
    /// Parent span context (`StartSpan`).
    pub parent_context: Option<SpanContext>,
    /// Parent's resolved attributes (`StartSpan`); empty for remote parents.
    pub parent_attributes: Option<AttrMap>,
    /// Span duration (`FinishSpan`).
    pub duration: Option<Duration>,
    /// Span status (`SetStatus`, `FinishSpan`).
    pub status: Option<Status>,
    /// Free-form arguments (`AddEvent`/`Log`).
    pub args: Option<Vec<Arc<str>>>,
    /// Resolved measurement batch (`RecordStats`).
    pub measurements: Option<Vec<ResolvedMeasurement>>,
}

impl ResolvedEvent {
    /// Creates a bare resolved event; enrichment via `with_*`.
    pub fn new(kind: EventKind, seq: EventId, at: SystemTime) -> Self {
        Self {
            kind,
            seq,
            at,
            context: None,
            name: None,
            attributes: AttrMap::new(),
            start_tags: None,
            parent_context: None,
            parent_attributes: None,
            duration: None,
            status: None,
            args: None,
            measurements: None,
        }
    }

    /// Attaches the owning span context.
    #[inline]
    pub fn with_context(mut self, context: SpanContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Attaches a name.
    #[inline]
    pub fn with_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the resolved attribute map.
    #[inline]
    pub fn with_attributes(mut self, attributes: AttrMap) -> Self {
        self.attributes = attributes;
        self
    }

    /// Attaches the owning span's start tags.
    #[inline]
    pub fn with_start_tags(mut self, start_tags: AttrMap) -> Self {
        self.start_tags = Some(start_tags);
        self
    }

    /// Attaches the parent span context.
    #[inline]
    pub fn with_parent_context(mut self, context: SpanContext) -> Self {
        self.parent_context = Some(context);
        self
    }

    /// Attaches the parent's resolved attributes.
    #[inline]
    pub fn with_parent_attributes(mut self, attributes: AttrMap) -> Self {
        self.parent_attributes = Some(attributes);
        self
    }

    /// Attaches the span duration.
    #[inline]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Attaches the span status.
    #[inline]
    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    /// Attaches free-form arguments.
    #[inline]
    pub fn with_args(mut self, args: Vec<Arc<str>>) -> Self {
        self.args = Some(args);
        self
    }

    /// Attaches a resolved measurement batch.
    #[inline]
    pub fn with_measurements(mut self, measurements: Vec<ResolvedMeasurement>) -> Self {
        self.measurements = Some(measurements);
        self
    }
}

/// All resolved events of one completed span, in emission order.
///
/// Opened by the aggregator on `StartSpan`, sealed and delivered on
/// `FinishSpan`. The first event is always the start, the last the finish.
#[derive(Debug, Clone)]
pub struct SpanAggregate {
    /// The span's externally-visible identity.
    pub context: SpanContext,
    /// Span name, taken from the opening event.
    pub name: Arc<str>,
    /// Resolved events in the order they were read.
    pub events: Vec<ResolvedEvent>,
}

impl SpanAggregate {
    pub(crate) fn open(context: SpanContext, name: Arc<str>, first: ResolvedEvent) -> Self {
        Self {
            context,
            name,
            events: vec![first],
        }
    }

    /// Number of resolved events in the record.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True if the record holds no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Duration reported by the closing `FinishSpan` event, if present.
    pub fn duration(&self) -> Option<Duration> {
        self.events.last().and_then(|e| e.duration)
    }
}
