//! Error types used by the reconstruction engine.
//!
//! A telemetry pipeline embedded in a host application must never make the
//! application fail: every error here is handled locally — the offending
//! event is dropped and a counter incremented — and nothing propagates to
//! the producer.

use thiserror::Error;

use crate::events::EventId;

/// # Protocol violations detected during reconstruction.
///
/// Raised when an event references state the engine has no record of
/// (stale, never-existed, or already cleaned up) or state of the wrong
/// kind. The engine drops the event and counts the violation in
/// [`ReconstructStats`](crate::ReconstructStats).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ReconstructError {
    /// An event referenced a scope the table has no entry for.
    #[error("event {seq} references unknown scope {scope}")]
    UnknownScope {
        /// Sequence number of the offending event.
        seq: EventId,
        /// The missing scope reference.
        scope: EventId,
    },

    /// An event targeted a table entry that is not a span.
    #[error("event {seq} targets entry {scope}, which is not a span")]
    NotASpan {
        /// Sequence number of the offending event.
        seq: EventId,
        /// The non-span entry.
        scope: EventId,
    },

    /// A metric or measurement referenced a measure the table has no
    /// entry for.
    #[error("event {seq} references unknown measure {measure}")]
    UnknownMeasure {
        /// Sequence number of the offending event.
        seq: EventId,
        /// The missing measure reference.
        measure: EventId,
    },
}

impl ReconstructError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use spanloom::ReconstructError;
    ///
    /// let err = ReconstructError::UnknownScope { seq: 9, scope: 4 };
    /// assert_eq!(err.as_label(), "unknown_scope");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ReconstructError::UnknownScope { .. } => "unknown_scope",
            ReconstructError::NotASpan { .. } => "not_a_span",
            ReconstructError::UnknownMeasure { .. } => "unknown_measure",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ReconstructError::UnknownScope { seq, scope } => {
                format!("unknown scope: event={seq} scope={scope}")
            }
            ReconstructError::NotASpan { seq, scope } => {
                format!("not a span: event={seq} entry={scope}")
            }
            ReconstructError::UnknownMeasure { seq, measure } => {
                format!("unknown measure: event={seq} measure={measure}")
            }
        }
    }
}
