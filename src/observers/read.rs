//! # Resolved-event consumer traits.
//!
//! Two capabilities sit downstream of the reconstruction engine:
//! - [`Read`] accepts individual [`ResolvedEvent`]s — implemented by the
//!   [`Aggregator`](crate::Aggregator) and by per-event exporters.
//! - [`ReadSpan`] accepts sealed [`SpanAggregate`]s — implemented by
//!   terminal consumers that want one complete record per span.

use async_trait::async_trait;

use crate::events::{ResolvedEvent, SpanAggregate};

/// Consumer of individual resolved events.
#[async_trait]
pub trait Read: Send + Sync + 'static {
    /// Accepts one fully-resolved event.
    async fn read(&self, event: &ResolvedEvent);

    /// Returns the reader name used in diagnostics.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Consumer of sealed span records.
#[async_trait]
pub trait ReadSpan: Send + Sync + 'static {
    /// Accepts one complete span record, delivered when the span finishes.
    async fn read_span(&self, span: &SpanAggregate);

    /// Returns the sink name used in diagnostics.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
