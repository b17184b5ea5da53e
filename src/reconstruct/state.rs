//! # Reconstructed state: the table of scopes, spans, and metric metadata.
//!
//! Every table entry is keyed by the sequence number of the event that
//! defined it. Entries are reference-counted:
//! - inserting an entry gives it one reference (held by the owning span's
//!   lifetime, or forever for root-parented non-span scopes);
//! - deriving a child scope retains its parent;
//! - a span's finish releases each scope derived from it, then the span
//!   entry itself.
//!
//! An entry is physically removed only when its count reaches zero, and
//! removing it releases its parent in turn. A scope still referenced by
//! another live span survives the first span's cleanup.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

use crate::events::{AttrMap, EventId, SpanContext, Status};

/// An immutable attribute snapshot derived from a parent scope.
#[derive(Debug, Clone)]
pub(crate) struct ScopeState {
    /// Defining event of the parent scope; `0` = root.
    pub parent: EventId,
    /// Defining event of the span this scope roots at, if any.
    pub span: Option<EventId>,
    /// Resolved attribute map.
    pub attributes: AttrMap,
}

/// A named, timed unit of work; a scope specialization.
#[derive(Debug, Clone)]
pub(crate) struct SpanState {
    /// Span name.
    pub name: Arc<str>,
    /// Externally-visible identity.
    pub context: SpanContext,
    /// Defining event of the parent scope; `0` = root or remote parent.
    pub parent: EventId,
    /// Wall-clock start time.
    pub started_at: SystemTime,
    /// Attribute snapshot captured at start.
    pub start_tags: AttrMap,
    /// Root attribute map (inherited from the parent at start).
    pub attributes: AttrMap,
    /// Latest attribute-bearing scope derived via `ModifyAttr`; `0` = none.
    /// Accumulated attributes at finish are resolved here.
    pub tail: EventId,
    /// Scopes derived from this span, released when the span finishes.
    pub derived: Vec<EventId>,
    /// Status, set in place by `SetStatus`.
    pub status: Option<Status>,
}

/// Measure metadata registered by `NewMeasure`.
#[derive(Debug, Clone)]
pub(crate) struct MeasureState {
    pub name: Arc<str>,
}

/// Metric metadata registered by `NewMetric`.
#[derive(Debug, Clone)]
pub(crate) struct MetricState {
    #[allow(dead_code)]
    pub name: Arc<str>,
    /// Table entry of the measure this metric aggregates.
    #[allow(dead_code)]
    pub measure: EventId,
}

/// One reconstructed table entry.
#[derive(Debug)]
pub(crate) enum Entry {
    Scope(ScopeState),
    Span(SpanState),
    Measure(MeasureState),
    Metric(MetricState),
}

impl Entry {
    /// Defining event of the parent scope; `0` for entries without one.
    fn parent(&self) -> EventId {
        match self {
            Entry::Scope(s) => s.parent,
            Entry::Span(s) => s.parent,
            Entry::Measure(_) | Entry::Metric(_) => 0,
        }
    }
}

/// Reference-counted slot.
#[derive(Debug)]
struct Slot {
    refs: u32,
    entry: Entry,
}

/// The reconstruction state table, keyed by defining event.
#[derive(Debug, Default)]
pub(crate) struct Table {
    entries: HashMap<EventId, Slot>,
}

impl Table {
    /// Inserts a new entry with one reference.
    pub fn insert(&mut self, id: EventId, entry: Entry) {
        self.entries.insert(id, Slot { refs: 1, entry });
    }

    pub fn get(&self, id: EventId) -> Option<&Entry> {
        self.entries.get(&id).map(|s| &s.entry)
    }

    pub fn contains(&self, id: EventId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Adds a reference to `id` (a child scope now depends on it).
    pub fn retain(&mut self, id: EventId) {
        if let Some(slot) = self.entries.get_mut(&id) {
            slot.refs += 1;
        }
    }

    /// Drops one reference from `id`. When a count reaches zero the entry
    /// is removed and its parent released, cascading up the chain until a
    /// still-referenced entry or the root stops the walk.
    pub fn release(&mut self, id: EventId) {
        let mut cur = id;
        while cur != 0 {
            let Some(slot) = self.entries.get_mut(&cur) else {
                break;
            };
            slot.refs = slot.refs.saturating_sub(1);
            if slot.refs > 0 {
                break;
            }
            let parent = slot.entry.parent();
            self.entries.remove(&cur);
            cur = parent;
        }
    }

    /// Resolves the effective attribute map of the entry `id`.
    ///
    /// For a span this is the map at its tail scope (the accumulated
    /// attributes), for a plain scope its own snapshot. `None` for missing
    /// entries and for metric metadata, which carries no attributes.
    pub fn resolved(&self, id: EventId) -> Option<&AttrMap> {
        match self.get(id)? {
            Entry::Scope(scope) => Some(&scope.attributes),
            Entry::Span(span) => {
                if span.tail != 0 && span.tail != id {
                    match self.get(span.tail)? {
                        Entry::Scope(scope) => Some(&scope.attributes),
                        _ => None,
                    }
                } else {
                    Some(&span.attributes)
                }
            }
            Entry::Measure(_) | Entry::Metric(_) => None,
        }
    }

    /// Defining event of the span that `id`'s chain roots at, if any.
    pub fn span_of(&self, id: EventId) -> Option<EventId> {
        match self.get(id)? {
            Entry::Span(_) => Some(id),
            Entry::Scope(scope) => scope.span,
            Entry::Measure(_) | Entry::Metric(_) => None,
        }
    }

    pub fn span(&self, id: EventId) -> Option<&SpanState> {
        match self.get(id)? {
            Entry::Span(span) => Some(span),
            _ => None,
        }
    }

    pub fn span_mut(&mut self, id: EventId) -> Option<&mut SpanState> {
        match self.entries.get_mut(&id).map(|s| &mut s.entry)? {
            Entry::Span(span) => Some(span),
            _ => None,
        }
    }

    /// Name of the measure defined by `id`, if that entry is a measure.
    pub fn measure_name(&self, id: EventId) -> Option<Arc<str>> {
        match self.get(id)? {
            Entry::Measure(m) => Some(Arc::clone(&m.name)),
            _ => None,
        }
    }
}
