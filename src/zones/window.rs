//! Per-zone point windows.
//!
//! Each zone has its own lock; the router appends and the aggregator prunes
//! and reads, never holding more than one window at a time.

use crate::core::types::{Point, ZONE_COUNT};
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Arrival-ordered points of one zone
pub type ZoneWindow = VecDeque<Point>;

/// The four zone windows
pub struct ZoneWindows {
    windows: [Mutex<ZoneWindow>; ZONE_COUNT],
}

impl Default for ZoneWindows {
    fn default() -> Self {
        Self::new()
    }
}

impl ZoneWindows {
    pub fn new() -> Self {
        Self {
            windows: std::array::from_fn(|_| Mutex::new(VecDeque::new())),
        }
    }

    /// Append a point to zone `index` (0-based); out-of-range indices are ignored
    pub fn append(&self, index: usize, point: Point) {
        if let Some(window) = self.windows.get(index) {
            window.lock().push_back(point);
        }
    }

    /// Run `f` with exclusive access to zone `index`
    pub fn with_window<R>(&self, index: usize, f: impl FnOnce(&mut ZoneWindow) -> R) -> Option<R> {
        self.windows.get(index).map(|window| f(&mut window.lock()))
    }

    pub fn len(&self, index: usize) -> usize {
        self.with_window(index, |window| window.len()).unwrap_or(0)
    }

    /// Drop every buffered point
    pub fn clear(&self) {
        for window in &self.windows {
            window.lock().clear();
        }
    }
}
