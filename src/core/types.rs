//! Values passed between pipeline stages.

use serde::Serialize;

/// Number of angular zones the sweep is divided into
pub const ZONE_COUNT: usize = 4;

/// One LD06 measurement
///
/// Derived from a CRC-valid packet and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    /// Interpolated angle in degrees, monotonic within its frame (may exceed
    /// 360 when the frame crosses 0°)
    pub angle: f64,
    /// Distance in millimetres
    pub distance: u16,
    /// Measurement confidence (0-255)
    pub confidence: u8,
    /// Sensor timestamp of the parent frame in milliseconds
    pub timestamp: u16,
}

impl Point {
    /// Angle normalised to `[0, 360)`
    #[inline]
    pub fn bearing(&self) -> f64 {
        wrap_degrees(self.angle)
    }
}

/// Normalise an angle in degrees to `[0, 360)`
#[inline]
pub fn wrap_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Zone statistics produced by one aggregation tick
///
/// `ranges[k]` is the minimum distance (mm) of zone `k + 1`, or `None` while
/// that zone has never produced a value.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RangeReport {
    pub ranges: [Option<u16>; ZONE_COUNT],
}

impl RangeReport {
    /// Iterate `(zone_id, distance)` for zones that have a value
    pub fn iter(&self) -> impl Iterator<Item = (u8, u16)> + '_ {
        self.ranges
            .iter()
            .enumerate()
            .filter_map(|(index, range)| range.map(|distance| (index as u8 + 1, distance)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_wrap_degrees() {
        assert_relative_eq!(wrap_degrees(0.0), 0.0);
        assert_relative_eq!(wrap_degrees(359.5), 359.5);
        assert_relative_eq!(wrap_degrees(360.0), 0.0);
        assert_relative_eq!(wrap_degrees(365.25), 5.25);
        assert_relative_eq!(wrap_degrees(-10.0), 350.0);
        assert!(wrap_degrees(-1e-15) < 360.0);
    }

    #[test]
    fn test_bearing_of_wrapped_point() {
        let point = Point {
            angle: 361.5,
            distance: 1000,
            confidence: 220,
            timestamp: 0,
        };
        assert_relative_eq!(point.bearing(), 1.5, epsilon = 1e-9);
    }

    #[test]
    fn test_range_report_iter_skips_empty_zones() {
        let report = RangeReport {
            ranges: [Some(500), None, Some(1200), None],
        };
        let values: Vec<_> = report.iter().collect();
        assert_eq!(values, vec![(1, 500), (3, 1200)]);
    }
}
