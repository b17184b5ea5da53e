//! # Consumer capability traits.
//!
//! The pipeline has two consumer surfaces:
//! - [`Observe`] raw events flowing out of the [`Registry`](crate::Registry)
//! - [`Read`] / [`ReadSpan`] resolved events and sealed span records flowing
//!   out of the [`Reconstructor`](crate::Reconstructor) and
//!   [`Aggregator`](crate::Aggregator)
//!
//! The optional `logging` feature adds [`LogReader`], a stdout demo
//! consumer for development and examples.

mod observe;
mod read;

pub use observe::Observe;
pub use read::{Read, ReadSpan};

#[cfg(feature = "logging")]
mod log;
#[cfg(feature = "logging")]
pub use log::LogReader;
