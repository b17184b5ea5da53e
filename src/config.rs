//! # Pipeline configuration.
//!
//! [`Config`] centralizes the tunables consumed by
//! [`Pipeline::new`](crate::Pipeline::new).
//!
//! # Example
//! ```
//! use spanloom::Config;
//!
//! let mut cfg = Config::default();
//! cfg.buffer_capacity = 4096;
//! assert_eq!(cfg.buffer_capacity, 4096);
//! ```

/// Configuration for pipeline assembly.
///
/// ## Sentinel values
/// - `buffer_capacity` is clamped to a minimum of 1 by the
///   [`Buffer`](crate::Buffer).
#[derive(Clone, Debug)]
pub struct Config {
    /// Capacity of the backpressure buffer between producers and the
    /// reconstruction engine.
    pub buffer_capacity: usize,
}

impl Default for Config {
    /// Provides a default configuration:
    /// - `buffer_capacity = 1024`
    fn default() -> Self {
        Self {
            buffer_capacity: 1024,
        }
    }
}
