//! # Simple logging reader for debugging and demos.
//!
//! [`LogReader`] prints resolved events and sealed span records to stdout
//! in a human-readable format. Primarily useful for development and
//! examples.
//!
//! ## Output format
//! ```text
//! [start_span] span=7:1 name="fetch"
//! [modify_attr] span=7:1 attrs=1
//! [finish_span] span=7:1 duration=1.2ms
//! [span] 7:1 name="fetch" events=3
//! ```

use async_trait::async_trait;

use crate::events::{EventKind, ResolvedEvent, SpanAggregate, SpanContext};
use crate::observers::{Read, ReadSpan};

/// Stdout logging consumer.
///
/// Enabled via the `logging` feature. Not intended for production use —
/// implement custom [`Read`]/[`ReadSpan`] types for structured export.
pub struct LogReader;

fn ctx_label(context: Option<SpanContext>) -> String {
    match context {
        Some(c) => format!("{}:{}", c.trace_id, c.span_id),
        None => "-".to_string(),
    }
}

#[async_trait]
impl Read for LogReader {
    async fn read(&self, e: &ResolvedEvent) {
        match e.kind {
            EventKind::StartSpan => {
                println!(
                    "[start_span] span={} name={:?}",
                    ctx_label(e.context),
                    e.name.as_deref().unwrap_or("")
                );
            }
            EventKind::FinishSpan => {
                println!(
                    "[finish_span] span={} duration={:?}",
                    ctx_label(e.context),
                    e.duration.unwrap_or_default()
                );
            }
            EventKind::SetStatus => {
                println!(
                    "[set_status] span={} status={:?}",
                    ctx_label(e.context),
                    e.status
                );
            }
            EventKind::RecordStats => {
                println!(
                    "[record_stats] span={} measurements={}",
                    ctx_label(e.context),
                    e.measurements.as_ref().map_or(0, Vec::len)
                );
            }
            kind => {
                println!(
                    "[{}] span={} attrs={}",
                    kind.as_label(),
                    ctx_label(e.context),
                    e.attributes.len()
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

#[async_trait]
impl ReadSpan for LogReader {
    async fn read_span(&self, span: &SpanAggregate) {
        println!(
            "[span] {}:{} name={:?} events={}",
            span.context.trace_id,
            span.context.span_id,
            span.name,
            span.len()
        );
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
