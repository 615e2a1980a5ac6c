//! Sliding-window zone aggregation.
//!
//! Each tick, every non-empty window is pruned relative to its most recently
//! appended point and reduced to the minimum distance among points above the
//! confidence threshold. A zone whose filtered set is empty keeps the value
//! it reported last.

use super::window::{ZoneWindow, ZoneWindows};
use crate::core::types::{Point, RangeReport, ZONE_COUNT};
use crate::devices::ld06::constants::TIMESTAMP_WRAP_MS;

/// Milliseconds from `timestamp` to `latest`, accounting for the sensor
/// timestamp recounting from 0
///
/// A timestamp after `latest` yields a large age and is pruned.
#[inline]
pub fn point_age(latest: u16, timestamp: u16) -> u32 {
    let age = i32::from(latest) - i32::from(timestamp);
    if age < 0 {
        (age + i32::from(TIMESTAMP_WRAP_MS)).max(0) as u32
    } else {
        age as u32
    }
}

/// Retain points with age in `[0, keeping_length)` relative to the newest point
///
/// Returns the newest timestamp, or `None` for an empty window.
pub fn prune(window: &mut ZoneWindow, keeping_length: u16) -> Option<u16> {
    let latest = window.back()?.timestamp;
    window.retain(|p| point_age(latest, p.timestamp) < u32::from(keeping_length));
    Some(latest)
}

/// Minimum distance among points with confidence strictly above `min_confidence`
pub fn min_distance<'a, I>(points: I, min_confidence: u8) -> Option<u16>
where
    I: IntoIterator<Item = &'a Point>,
{
    points
        .into_iter()
        .filter(|p| p.confidence > min_confidence)
        .map(|p| p.distance)
        .min()
}

/// Reduces zone windows to one range per zone
#[derive(Debug, Clone)]
pub struct ZoneAggregator {
    keeping_length: u16,
    min_confidence: u8,
    last: [Option<u16>; ZONE_COUNT],
}

impl ZoneAggregator {
    pub fn new(keeping_length: u16, min_confidence: u8) -> Self {
        Self {
            keeping_length,
            min_confidence,
            last: [None; ZONE_COUNT],
        }
    }

    /// Prune and aggregate one window, updating the held value of zone `index`
    pub fn aggregate_window(&mut self, index: usize, window: &mut ZoneWindow) -> Option<u16> {
        if prune(window, self.keeping_length).is_some() {
            if let Some(distance) = min_distance(window.iter(), self.min_confidence) {
                self.last[index] = Some(distance);
            }
        }
        self.last[index]
    }

    /// One aggregation pass over all four windows
    pub fn tick(&mut self, windows: &ZoneWindows) -> RangeReport {
        for index in 0..ZONE_COUNT {
            windows.with_window(index, |window| self.aggregate_window(index, window));
        }
        log::trace!("Zone ranges: {:?}", self.last);
        RangeReport { ranges: self.last }
    }

    /// Value each zone reported on the last tick
    pub fn last(&self) -> RangeReport {
        RangeReport { ranges: self.last }
    }
}
