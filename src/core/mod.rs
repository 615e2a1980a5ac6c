//! Core pipeline data structures.
//!
//! - [`types`]: `Point` and `RangeReport`, the values passed between stages
//! - [`queue`]: bounded drop-oldest ingest queue
//! - [`stats`]: shared counters

pub mod queue;
pub mod stats;
pub mod types;
