//! Drishti IO - LD06 lidar ingest and zone telemetry
//!
//! Decodes the LD06 serial frame stream, routes points into four angular
//! zones over a configured sweep, reduces each zone to its nearest reliable
//! return on a fixed tick and streams `POINT::` / `RANGE_<n>::` lines to a
//! local consumer.
//!
//! ## Features
//!
//! - `mock`: Enable the simulated LD06 for hardware-free runs

pub mod config;
pub mod core;
pub mod devices;
pub mod error;
pub mod pipeline;
pub mod streaming;
pub mod transport;
pub mod zones;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use pipeline::{Pipeline, PipelineContext};
