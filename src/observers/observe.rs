//! # Raw-event consumer trait.
//!
//! [`Observe`] is the extension point on the **raw** side of the pipeline:
//! anything handed to [`Registry::register`](crate::Registry::register) —
//! a [`Buffer`](crate::Buffer), the
//! [`Reconstructor`](crate::Reconstructor), or a custom tap.
//!
//! ## Rules
//! - `observe` may be invoked concurrently from many producer tasks.
//! - The registry awaits each observer **in the producer's own task**: an
//!   observer that blocks stalls the producer. Wrap slow consumers in a
//!   [`Buffer`](crate::Buffer).
//! - There is no return value; an observer handles its own failures.

use async_trait::async_trait;

use crate::events::RawEvent;

/// Consumer of raw telemetry events.
#[async_trait]
pub trait Observe: Send + Sync + 'static {
    /// Accepts one raw event.
    ///
    /// Runs in the caller's task context. Keep this non-blocking on hot
    /// paths; a [`Buffer`](crate::Buffer) is the decoupling point for
    /// anything slower.
    async fn observe(&self, event: &RawEvent);

    /// Returns the observer name used in diagnostics.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose —
    /// override it when possible.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
