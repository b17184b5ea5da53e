//! # Raw telemetry events: the wire-level input to the pipeline.
//!
//! A [`RawEvent`] is one discrete record emitted by instrumented code: a span
//! starting or finishing, an attribute mutation, a measurement batch. Before
//! enrichment the only identity an event carries is its sequence number,
//! assigned by the [`Registry`](crate::Registry) when unset.
//!
//! ## Field reuse
//! The scalar slots [`RawEvent::text`] and [`RawEvent::value`] are shared
//! across event kinds:
//! - `StartSpan`: `text` = span name
//! - `NewMeasure` / `NewMetric`: `text` = measure/metric name
//! - `AddEvent` / `Log`: `text` = event/log name
//! - `SetStatus`: `text` = status message, `value` = status code
//!
//! ## Example
//! ```rust
//! use spanloom::{EventKind, RawEvent, ScopeId, SpanContext};
//!
//! let ctx = SpanContext::new(7, 1);
//! let ev = RawEvent::start_span("fetch", ctx);
//! assert_eq!(ev.kind, EventKind::StartSpan);
//! assert_eq!(ev.seq, 0); // unassigned until Registry::record
//! assert_eq!(ev.scope.context, ctx);
//! ```

use std::sync::Arc;
use std::time::SystemTime;

use super::attrs::{Attr, Mutator};

/// Process-wide monotonic event sequence number. `0` means "not yet
/// assigned" on a raw event, and is the root sentinel in scope references.
pub type EventId = u64;

/// Externally-visible span identity, propagated across process boundaries.
///
/// All-zero means "no span" (non-span scopes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SpanContext {
    /// Trace the span belongs to.
    pub trace_id: u64,
    /// Span identity within the trace.
    pub span_id: u64,
}

impl SpanContext {
    /// The empty context (no span).
    pub const EMPTY: SpanContext = SpanContext {
        trace_id: 0,
        span_id: 0,
    };

    /// Creates a context from raw identifiers.
    #[inline]
    pub fn new(trace_id: u64, span_id: u64) -> Self {
        Self { trace_id, span_id }
    }

    /// True if this is the empty (no-span) context.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.trace_id == 0 && self.span_id == 0
    }
}

/// Address of a reconstructed scope: the sequence number of the event that
/// defined it, plus the externally-visible context of the owning span, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ScopeId {
    /// Sequence number of the scope-defining event; `0` = root.
    pub event_id: EventId,
    /// Owning span context; empty for non-span scopes.
    pub context: SpanContext,
}

impl ScopeId {
    /// The root scope reference.
    pub const ROOT: ScopeId = ScopeId {
        event_id: 0,
        context: SpanContext::EMPTY,
    };

    /// References the scope defined by `event_id`, with no span context.
    #[inline]
    pub fn from_event(event_id: EventId) -> Self {
        Self {
            event_id,
            context: SpanContext::EMPTY,
        }
    }

    /// References the scope defined by `event_id` with an explicit context.
    #[inline]
    pub fn new(event_id: EventId, context: SpanContext) -> Self {
        Self { event_id, context }
    }

    /// True if this references the root (no defining event).
    #[inline]
    pub fn is_root(&self) -> bool {
        self.event_id == 0
    }
}

/// Classification of raw events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A span begins. `text` carries the name, `scope.context` the new
    /// span's context, `parent` the parent scope (local or remote).
    StartSpan,
    /// A span ends. `scope` names the span's defining event.
    FinishSpan,
    /// Materializes a derived attribute scope for later reference.
    /// Produces no downstream output.
    NewScope,
    /// Mutates attributes functionally, producing a new scope snapshot.
    ModifyAttr,
    /// A structured sub-event attached to a scope.
    AddEvent,
    /// A free-form log record attached to a scope.
    Log,
    /// Registers measure metadata. Produces no downstream output.
    NewMeasure,
    /// Registers metric metadata referencing a measure. Produces no
    /// downstream output.
    NewMetric,
    /// A batch of measurements, each resolved against its own scope.
    RecordStats,
    /// Sets the owning span's status in place.
    SetStatus,
}

impl EventKind {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            EventKind::StartSpan => "start_span",
            EventKind::FinishSpan => "finish_span",
            EventKind::NewScope => "new_scope",
            EventKind::ModifyAttr => "modify_attr",
            EventKind::AddEvent => "add_event",
            EventKind::Log => "log",
            EventKind::NewMeasure => "new_measure",
            EventKind::NewMetric => "new_metric",
            EventKind::RecordStats => "record_stats",
            EventKind::SetStatus => "set_status",
        }
    }
}

/// One recorded measurement, resolved against its own scope reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    /// Table entry of the measure this value belongs to.
    pub measure: EventId,
    /// Recorded value.
    pub value: f64,
    /// Scope whose attributes tag this measurement.
    pub scope: ScopeId,
}

impl Measurement {
    /// Creates a measurement record.
    pub fn new(measure: EventId, value: f64, scope: ScopeId) -> Self {
        Self {
            measure,
            value,
            scope,
        }
    }
}

/// Wire-level telemetry event.
///
/// Producers build one with [`RawEvent::new`] or a kind-specific helper and
/// hand it to [`Registry::record`](crate::Registry::record), which fills
/// `seq` and `at` when unset. All payload fields are optional; which ones a
/// kind consumes is documented on [`EventKind`].
#[derive(Debug, Clone)]
pub struct RawEvent {
    /// Sequence number; `0` until assigned.
    pub seq: EventId,
    /// Wall-clock timestamp; auto-filled when `None`.
    pub at: Option<SystemTime>,
    /// Event classification.
    pub kind: EventKind,
    /// Enclosing scope reference.
    pub scope: ScopeId,
    /// Parent scope, `StartSpan` only. A parent with `event_id == 0` and a
    /// non-empty context is remote: its attributes are unknown here.
    pub parent: Option<ScopeId>,
    /// String scalar slot, reused across kinds.
    pub text: Option<Arc<str>>,
    /// Float scalar slot, reused across kinds.
    pub value: Option<f64>,
    /// Single attribute payload.
    pub attr: Option<Attr>,
    /// Multi attribute payload.
    pub attrs: Option<Vec<Attr>>,
    /// Attribute mutator payload.
    pub mutators: Option<Vec<Mutator>>,
    /// Free-form argument list (`AddEvent`/`Log`).
    pub args: Option<Vec<Arc<str>>>,
    /// Measurement batch (`RecordStats`).
    pub measurements: Option<Vec<Measurement>>,
    /// Single measurement slot (`RecordStats`).
    pub measurement: Option<Measurement>,
}

impl RawEvent {
    /// Creates an empty event of the given kind.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: 0,
            at: None,
            kind,
            scope: ScopeId::ROOT,
            parent: None,
            text: None,
            value: None,
            attr: None,
            attrs: None,
            mutators: None,
            args: None,
            measurements: None,
            measurement: None,
        }
    }

    /// Pins an explicit sequence number (skips auto-assignment).
    #[inline]
    pub fn with_seq(mut self, seq: EventId) -> Self {
        self.seq = seq;
        self
    }

    /// Pins an explicit timestamp (skips auto-fill).
    #[inline]
    pub fn with_timestamp(mut self, at: SystemTime) -> Self {
        self.at = Some(at);
        self
    }

    /// Attaches the enclosing scope reference.
    #[inline]
    pub fn with_scope(mut self, scope: ScopeId) -> Self {
        self.scope = scope;
        self
    }

    /// Attaches the parent scope (`StartSpan`).
    #[inline]
    pub fn with_parent(mut self, parent: ScopeId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Fills the string scalar slot.
    #[inline]
    pub fn with_text(mut self, text: impl Into<Arc<str>>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Fills the float scalar slot.
    #[inline]
    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    /// Attaches a single attribute.
    #[inline]
    pub fn with_attr(mut self, attr: Attr) -> Self {
        self.attr = Some(attr);
        self
    }

    /// Attaches an attribute list.
    #[inline]
    pub fn with_attrs(mut self, attrs: Vec<Attr>) -> Self {
        self.attrs = Some(attrs);
        self
    }

    /// Attaches a mutator list.
    #[inline]
    pub fn with_mutators(mut self, mutators: Vec<Mutator>) -> Self {
        self.mutators = Some(mutators);
        self
    }

    /// Attaches free-form arguments.
    #[inline]
    pub fn with_args(mut self, args: Vec<Arc<str>>) -> Self {
        self.args = Some(args);
        self
    }

    /// Attaches a measurement batch.
    #[inline]
    pub fn with_measurements(mut self, measurements: Vec<Measurement>) -> Self {
        self.measurements = Some(measurements);
        self
    }

    /// Attaches a single measurement.
    #[inline]
    pub fn with_measurement(mut self, measurement: Measurement) -> Self {
        self.measurement = Some(measurement);
        self
    }

    // ---- Kind-specific helpers ----

    /// A span begins: `context` is the new span's externally-visible
    /// identity. Chain [`with_parent`](Self::with_parent) for child spans.
    #[inline]
    pub fn start_span(name: impl Into<Arc<str>>, context: SpanContext) -> Self {
        RawEvent::new(EventKind::StartSpan)
            .with_scope(ScopeId::new(0, context))
            .with_text(name)
    }

    /// The span defined by `scope` ends.
    #[inline]
    pub fn finish_span(scope: ScopeId) -> Self {
        RawEvent::new(EventKind::FinishSpan).with_scope(scope)
    }

    /// Materializes a derived scope under `scope`.
    #[inline]
    pub fn new_scope(scope: ScopeId) -> Self {
        RawEvent::new(EventKind::NewScope).with_scope(scope)
    }

    /// Applies `mutators` to the scope referenced by `scope`.
    #[inline]
    pub fn modify_attr(scope: ScopeId, mutators: Vec<Mutator>) -> Self {
        RawEvent::new(EventKind::ModifyAttr)
            .with_scope(scope)
            .with_mutators(mutators)
    }

    /// A structured sub-event named `name` under `scope`.
    #[inline]
    pub fn add_event(scope: ScopeId, name: impl Into<Arc<str>>) -> Self {
        RawEvent::new(EventKind::AddEvent)
            .with_scope(scope)
            .with_text(name)
    }

    /// A free-form log record under `scope`.
    #[inline]
    pub fn log(scope: ScopeId, message: impl Into<Arc<str>>) -> Self {
        RawEvent::new(EventKind::Log)
            .with_scope(scope)
            .with_text(message)
    }

    /// Registers a measure named `name`.
    #[inline]
    pub fn new_measure(name: impl Into<Arc<str>>) -> Self {
        RawEvent::new(EventKind::NewMeasure).with_text(name)
    }

    /// Registers a metric named `name` over the measure defined by
    /// `measure`.
    #[inline]
    pub fn new_metric(name: impl Into<Arc<str>>, measure: EventId) -> Self {
        RawEvent::new(EventKind::NewMetric)
            .with_scope(ScopeId::from_event(measure))
            .with_text(name)
    }

    /// A measurement batch owned by `scope`.
    #[inline]
    pub fn record_stats(scope: ScopeId, measurements: Vec<Measurement>) -> Self {
        RawEvent::new(EventKind::RecordStats)
            .with_scope(scope)
            .with_measurements(measurements)
    }

    /// Sets the status of the span defined by `scope`.
    #[inline]
    pub fn set_status(scope: ScopeId, code: i32, message: impl Into<Arc<str>>) -> Self {
        RawEvent::new(EventKind::SetStatus)
            .with_scope(scope)
            .with_value(f64::from(code))
            .with_text(message)
    }
}
