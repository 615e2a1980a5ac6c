//! Sweep subdivision and point routing.

use crate::core::types::{Point, ZONE_COUNT, wrap_degrees};

/// Half-open angular range `[start, end)` in degrees
///
/// A zone with `start > end` wraps through 0°.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Zone {
    /// 1-based zone number, as used in `RANGE_<n>` lines
    pub id: u8,
    pub start: f64,
    pub end: f64,
}

impl Zone {
    /// Wrap-aware containment for a bearing in `[0, 360)`
    #[inline]
    pub fn contains(&self, bearing: f64) -> bool {
        contains(self.start, self.end, bearing)
    }

    pub fn width(&self) -> f64 {
        wrapped_length(self.start, self.end)
    }
}

#[inline]
fn contains(start: f64, end: f64, bearing: f64) -> bool {
    if start > end {
        bearing >= start || bearing < end
    } else if start < end {
        bearing >= start && bearing < end
    } else {
        // Degenerate range covers the full circle
        true
    }
}

/// Clockwise length from `start` to `end`; equal angles mean a full circle
fn wrapped_length(start: f64, end: f64) -> f64 {
    let length = (end - start).rem_euclid(360.0);
    if length == 0.0 { 360.0 } else { length }
}

/// Splits the sweep into [`ZONE_COUNT`] equal zones and routes points to them
#[derive(Debug, Clone)]
pub struct ZoneRouter {
    sweep_start: f64,
    sweep_end: f64,
    zones: [Zone; ZONE_COUNT],
}

impl ZoneRouter {
    /// Build the zones for `[sweep_start, sweep_end)` in degrees
    ///
    /// Zone boundaries are `wrap(sweep_start + k * width)` for k in 0..=4, so
    /// each zone's end is bit-identical to the next zone's start.
    pub fn new(sweep_start: f64, sweep_end: f64) -> Self {
        let sweep_start = wrap_degrees(sweep_start);
        let sweep_end = wrap_degrees(sweep_end);
        let width = wrapped_length(sweep_start, sweep_end) / ZONE_COUNT as f64;

        let boundary = |k: usize| {
            if k == ZONE_COUNT {
                sweep_end
            } else {
                wrap_degrees(sweep_start + k as f64 * width)
            }
        };
        let zones = std::array::from_fn(|k| Zone {
            id: k as u8 + 1,
            start: boundary(k),
            end: boundary(k + 1),
        });

        log::debug!(
            "Zones for sweep [{:.2}, {:.2}): {:?}",
            sweep_start,
            sweep_end,
            zones
        );

        Self {
            sweep_start,
            sweep_end,
            zones,
        }
    }

    pub fn zones(&self) -> &[Zone; ZONE_COUNT] {
        &self.zones
    }

    /// Whether a point lies inside the configured sweep
    pub fn in_sweep(&self, point: &Point) -> bool {
        contains(self.sweep_start, self.sweep_end, point.bearing())
    }

    /// Index (0-based) of the zone containing `point`, if any
    pub fn route(&self, point: &Point) -> Option<usize> {
        let bearing = point.bearing();
        self.zones.iter().position(|zone| zone.contains(bearing))
    }
}
