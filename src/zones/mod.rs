//! Angular zones over the configured sweep.
//!
//! Points are routed into one of four zone windows; the aggregator reduces
//! each window to a single range on a fixed tick.

pub mod aggregator;
pub mod router;
pub mod window;

pub use aggregator::ZoneAggregator;
pub use router::{Zone, ZoneRouter};
pub use window::ZoneWindows;
