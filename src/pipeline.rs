//! # Pipeline: pre-wired registry → buffer → reconstructor → aggregator.
//!
//! [`Pipeline`] assembles the four components in their canonical order so
//! callers that don't need custom wiring get the whole reconstruction path
//! from one constructor. Producers submit through [`Pipeline::record`];
//! sealed span records arrive at the [`ReadSpan`] sinks passed at build
//! time.
//!
//! ## Wiring
//! ```text
//! record(event) ──► Registry ──► Buffer ──► Reconstructor ──► Aggregator ──► sinks
//! ```
//!
//! Each component stays individually accessible for taps and stats; extra
//! observers can still be registered on the registry.

use std::sync::Arc;

use crate::aggregate::Aggregator;
use crate::buffer::Buffer;
use crate::config::Config;
use crate::events::{EventId, RawEvent};
use crate::observers::{Observe, Read, ReadSpan};
use crate::reconstruct::Reconstructor;
use crate::registry::Registry;

/// The assembled reconstruction pipeline.
pub struct Pipeline {
    registry: Arc<Registry>,
    buffer: Arc<Buffer>,
    reconstructor: Arc<Reconstructor>,
    aggregator: Arc<Aggregator>,
}

impl Pipeline {
    /// Wires up a pipeline delivering sealed span records to `sinks`.
    pub async fn new(cfg: Config, sinks: Vec<Arc<dyn ReadSpan>>) -> Self {
        let aggregator = Aggregator::new(sinks);
        let reader: Arc<dyn Read> = aggregator.clone();
        let reconstructor = Reconstructor::new(vec![reader]);
        let observer: Arc<dyn Observe> = reconstructor.clone();
        let buffer = Buffer::new(cfg.buffer_capacity, vec![observer]);

        let registry = Arc::new(Registry::new());
        let buffered: Arc<dyn Observe> = buffer.clone();
        registry.register(buffered).await;

        Self {
            registry,
            buffer,
            reconstructor,
            aggregator,
        }
    }

    /// Submits one raw event. Delegates to [`Registry::record`].
    pub async fn record(&self, event: RawEvent) -> EventId {
        self.registry.record(event).await
    }

    /// Stops the buffer worker and waits for it to exit. Queued-but-
    /// undrained events are discarded; see [`Buffer::close`].
    pub async fn close(&self) {
        self.buffer.close().await;
    }

    /// The fan-out registry, for registering extra observers.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// The backpressure buffer, for drop/panic counters.
    pub fn buffer(&self) -> &Arc<Buffer> {
        &self.buffer
    }

    /// The reconstruction engine, for protocol-violation counters.
    pub fn reconstructor(&self) -> &Arc<Reconstructor> {
        &self.reconstructor
    }

    /// The span aggregator, for the orphan counter.
    pub fn aggregator(&self) -> &Arc<Aggregator> {
        &self.aggregator
    }
}
