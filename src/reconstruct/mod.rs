//! Scope/span state reconstruction.
//!
//! Internal modules:
//! - [`state`]: the reference-counted table of scopes, spans, and metric
//!   metadata;
//! - [`engine`]: the event dispatcher that maintains the table and emits
//!   resolved events.

mod engine;
mod state;

pub use engine::{Reconstructor, ReconstructStats};
