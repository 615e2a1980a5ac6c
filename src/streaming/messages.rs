//! Telemetry line formats.
//!
//! Every message is one CRLF-terminated text line:
//!
//! ```text
//! POINT::{"angle":312.45,"distance":1534,"confidence":228}
//! RANGE_2::1534.00
//! ```

use crate::core::types::{Point, wrap_degrees};
use crate::error::Result;
use serde::Serialize;

/// Line terminator expected by consumers
pub const LINE_END: &str = "\r\n";

/// Outbound telemetry message
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TelemetryMessage {
    /// A single in-sweep measurement
    Point(Point),
    /// Aggregated minimum distance of one zone
    Range {
        /// 1-based zone number
        zone: u8,
        /// Distance in millimetres
        distance: u16,
    },
}

/// JSON body of a `POINT::` line
#[derive(Serialize)]
struct PointPayload {
    angle: f64,
    distance: u16,
    confidence: u8,
}

impl From<&Point> for PointPayload {
    fn from(point: &Point) -> Self {
        Self {
            // Rounding can carry 359.996 up to 360.0
            angle: wrap_degrees((point.bearing() * 100.0).round() / 100.0),
            distance: point.distance,
            confidence: point.confidence,
        }
    }
}

impl TelemetryMessage {
    /// Append the line (including terminator) to `out`
    pub fn write_line(&self, out: &mut String) -> Result<()> {
        match self {
            TelemetryMessage::Point(point) => {
                out.push_str("POINT::");
                out.push_str(&serde_json::to_string(&PointPayload::from(point))?);
            }
            TelemetryMessage::Range { zone, distance } => {
                out.push_str(&format!("RANGE_{}::{:.2}", zone, f64::from(*distance)));
            }
        }
        out.push_str(LINE_END);
        Ok(())
    }

    pub fn to_line(&self) -> Result<String> {
        let mut line = String::with_capacity(64);
        self.write_line(&mut line)?;
        Ok(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_line() {
        let message = TelemetryMessage::Point(Point {
            angle: 312.4467,
            distance: 1534,
            confidence: 228,
            timestamp: 100,
        });
        assert_eq!(
            message.to_line().unwrap(),
            "POINT::{\"angle\":312.45,\"distance\":1534,\"confidence\":228}\r\n"
        );
    }

    #[test]
    fn test_point_line_uses_bearing() {
        let message = TelemetryMessage::Point(Point {
            angle: 365.5,
            distance: 10,
            confidence: 255,
            timestamp: 0,
        });
        let line = message.to_line().unwrap();
        assert!(line.starts_with("POINT::{\"angle\":5.5,"));
    }

    #[test]
    fn test_point_angle_rounding_stays_below_full_turn() {
        let message = TelemetryMessage::Point(Point {
            angle: 359.996,
            distance: 10,
            confidence: 255,
            timestamp: 0,
        });
        let line = message.to_line().unwrap();
        assert!(line.starts_with("POINT::{\"angle\":0.0,"), "{line}");
    }

    #[test]
    fn test_range_line() {
        let message = TelemetryMessage::Range {
            zone: 3,
            distance: 870,
        };
        assert_eq!(message.to_line().unwrap(), "RANGE_3::870.00\r\n");
    }

    #[test]
    fn test_write_line_appends() {
        let mut out = String::new();
        TelemetryMessage::Range { zone: 1, distance: 5 }
            .write_line(&mut out)
            .unwrap();
        TelemetryMessage::Range { zone: 2, distance: 6 }
            .write_line(&mut out)
            .unwrap();
        assert_eq!(out, "RANGE_1::5.00\r\nRANGE_2::6.00\r\n");
    }
}
