//! Telemetry event data model.
//!
//! This module groups the **wire-level input** ([`RawEvent`] and its
//! addressing types), the **attribute model** ([`AttrMap`], [`Mutator`]),
//! and the **resolved output** ([`ResolvedEvent`], [`SpanAggregate`])
//! produced by the reconstruction engine.
//!
//! ## Quick reference
//! - **Producers** build [`RawEvent`]s and submit them via
//!   [`Registry::record`](crate::Registry::record).
//! - **Consumers** implement [`Observe`](crate::Observe) (raw side) or
//!   [`Read`](crate::Read) / [`ReadSpan`](crate::ReadSpan) (resolved side).

mod attrs;
mod raw;
mod resolved;

pub use attrs::{Attr, AttrMap, AttrValue, Mutator};
pub use raw::{EventId, EventKind, Measurement, RawEvent, ScopeId, SpanContext};
pub use resolved::{ResolvedEvent, ResolvedMeasurement, SpanAggregate, Status};
