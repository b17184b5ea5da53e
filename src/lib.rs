//! # spanloom
//!
//! **Spanloom** reconstructs hierarchical tracing state from a flat stream
//! of discrete telemetry events. Instrumented code emits span lifecycle
//! transitions, attribute mutations, and measurement records as independent
//! events; spanloom weaves them back into the context a backend actually
//! needs — which attributes apply to which span, which spans are children
//! of which, and which sub-events belong to which completed span.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  ┌────────────┐  ┌────────────┐  ┌────────────┐
//!  │ producer 1 │  │ producer 2 │  │ producer N │   (instrumentation API,
//!  └─────┬──────┘  └─────┬──────┘  └─────┬──────┘    out of scope)
//!        └───────────────┼───────────────┘
//!                        ▼ record(RawEvent) → EventId
//! ┌───────────────────────────────────────────────────────────┐
//! │  Registry (fan-out bus)                                   │
//! │  - assigns sequence number + timestamp when unset         │
//! │  - synchronous fan-out to the observer snapshot           │
//! └──────────────────────────┬────────────────────────────────┘
//!                            ▼ Observe::observe
//! ┌───────────────────────────────────────────────────────────┐
//! │  Buffer (bounded queue + single draining worker)          │
//! │  - non-blocking enqueue, drop + count on overflow         │
//! │  - FIFO within the instance, panic-isolated forwarding    │
//! └──────────────────────────┬────────────────────────────────┘
//!                            ▼ Observe::observe
//! ┌───────────────────────────────────────────────────────────┐
//! │  Reconstructor (state machine)                            │
//! │  - table: EventId → scope/span/measure/metric entries     │
//! │  - attribute inheritance, span parentage, refcounted      │
//! │    cleanup on span finish                                 │
//! └──────────────────────────┬────────────────────────────────┘
//!                            ▼ Read::read (ResolvedEvent)
//! ┌───────────────────────────────────────────────────────────┐
//! │  Aggregator (per-span grouping)                           │
//! │  - opens on StartSpan, appends matching events,           │
//! │    seals + delivers on FinishSpan                         │
//! └──────────────────────────┬────────────────────────────────┘
//!                            ▼ ReadSpan::read_span (SpanAggregate)
//!                   terminal consumers (formatters, exporters)
//! ```
//!
//! ## Guarantees and non-goals
//! - Sequence numbers from one [`Registry`] are unique and monotonic; the
//!   counter advances once per `record` call even when the event is later
//!   dropped.
//! - The [`Buffer`] orders events only relative to itself. Concurrent
//!   producers, or independent buffers, have **no** cross-stream causal
//!   ordering — callers needing strict order must impose it upstream.
//! - Nothing in the pipeline surfaces errors to the producer: protocol
//!   violations, overflow drops, and orphaned events are counted locally
//!   and the host application is never failed.
//! - No persistence, no sampling, no filtering.
//!
//! ## Features
//! | Area           | Description                                   | Key types                          |
//! |----------------|-----------------------------------------------|------------------------------------|
//! | **Fan-out**    | Register consumers, submit raw events.        | [`Registry`], [`Observe`]          |
//! | **Decoupling** | Bounded queue between producer and consumer.  | [`Buffer`]                         |
//! | **Resolution** | Scope/span reconstruction, inheritance.       | [`Reconstructor`], [`ResolvedEvent`] |
//! | **Grouping**   | One ordered record per completed span.        | [`Aggregator`], [`SpanAggregate`], [`ReadSpan`] |
//! | **Assembly**   | Pre-wired pipeline with sane defaults.        | [`Pipeline`], [`Config`]           |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogReader`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use spanloom::{
//!     Mutator, RawEvent, Read, ReadSpan, Reconstructor, Registry, ScopeId,
//!     SpanAggregate, SpanContext,
//! };
//!
//! struct Printer;
//!
//! #[async_trait]
//! impl ReadSpan for Printer {
//!     async fn read_span(&self, span: &SpanAggregate) {
//!         println!("span {:?} finished with {} events", span.name, span.len());
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     // Direct wiring without a buffer: fan-out is synchronous, so the
//!     // sealed record is delivered before `record` returns.
//!     let sink: Arc<dyn ReadSpan> = Arc::new(Printer);
//!     let aggregator = spanloom::Aggregator::new(vec![sink]);
//!     let reader: Arc<dyn Read> = aggregator.clone();
//!     let engine = Reconstructor::new(vec![reader]);
//!
//!     let registry = Registry::new();
//!     registry.register(engine.clone()).await;
//!
//!     let ctx = SpanContext::new(1, 1);
//!     let span = registry.record(RawEvent::start_span("demo", ctx)).await;
//!     registry
//!         .record(RawEvent::modify_attr(
//!             ScopeId::from_event(span),
//!             vec![Mutator::upsert("user", "alice")],
//!         ))
//!         .await;
//!     registry
//!         .record(RawEvent::finish_span(ScopeId::from_event(span)))
//!         .await;
//! }
//! ```
//!
//! Wrap the engine in a [`Buffer`] (or use [`Pipeline`]) when producers
//! must never stall on consumer latency.

mod aggregate;
mod buffer;
mod config;
mod error;
mod events;
mod observers;
mod pipeline;
mod reconstruct;
mod registry;

// ---- Public re-exports ----

pub use aggregate::Aggregator;
pub use buffer::Buffer;
pub use config::Config;
pub use error::ReconstructError;
pub use events::{
    Attr, AttrMap, AttrValue, EventId, EventKind, Measurement, Mutator, RawEvent, ResolvedEvent,
    ResolvedMeasurement, ScopeId, SpanAggregate, SpanContext, Status,
};
pub use observers::{Observe, Read, ReadSpan};
pub use pipeline::Pipeline;
pub use reconstruct::{ReconstructStats, Reconstructor};
pub use registry::Registry;

// Optional: expose a simple built-in logging reader (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use observers::LogReader;
