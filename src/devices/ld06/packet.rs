//! LD06 packet and point derivation
//!
//! A packet covers `data_length` measurements spread evenly between its start
//! and end angle. Angles are interpolated linearly, with the span corrected
//! by a full turn when the frame crosses 0°.

use super::constants::{MAX_MEASUREMENTS, MEASUREMENT_SIZE, OFFSET_MEASUREMENTS};
use crate::core::types::Point;

/// Reasons a frame is dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// Trailing CRC byte does not match the frame contents
    #[error("Checksum error: expected {expected:#04x}, got {actual:#04x}")]
    Checksum {
        /// CRC computed over the received bytes
        expected: u8,
        /// CRC byte carried by the frame
        actual: u8,
    },

    /// Length byte announced zero measurements
    #[error("Frame carries no measurements")]
    EmptyFrame,

    /// Length byte announced more measurements than the sensor ever sends
    #[error("Implausible measurement count: {0}")]
    TooManyMeasurements(u8),

    /// Measurement bytes do not match the announced count
    #[error("Measurement payload is {actual} bytes, expected {expected}")]
    PayloadLength {
        /// `3 × data_length`
        expected: usize,
        /// Bytes actually present
        actual: usize,
    },
}

/// One raw measurement triple
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measurement {
    pub distance: u16,
    pub confidence: u8,
}

/// A complete, CRC-checked LD06 frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Number of measurement triples
    pub data_length: u8,
    /// Rotation speed in degrees per second (informational)
    pub radar_speed: u16,
    /// Angle of the first measurement, hundredths of a degree
    pub start_angle: u16,
    /// Angle of the last measurement, hundredths of a degree
    pub end_angle: u16,
    /// Sensor timestamp in milliseconds, wraps at 30000
    pub timestamp: u16,
    /// Trailing CRC byte
    pub crc: u8,
    /// Every byte of the frame, sentinel through CRC
    pub raw: Vec<u8>,
}

impl Packet {
    /// Raw frame length for a given measurement count
    #[inline]
    pub const fn frame_len(data_length: u8) -> usize {
        super::constants::FRAME_OVERHEAD + MEASUREMENT_SIZE * data_length as usize
    }

    /// Raw measurement bytes (`3 × data_length`)
    pub fn measurement_bytes(&self) -> &[u8] {
        let start = OFFSET_MEASUREMENTS.min(self.raw.len());
        let end = (OFFSET_MEASUREMENTS + MEASUREMENT_SIZE * usize::from(self.data_length))
            .min(self.raw.len());
        &self.raw[start..end]
    }

    /// Decode the measurement triples (distance little-endian)
    pub fn measurements(&self) -> impl Iterator<Item = Measurement> + '_ {
        self.measurement_bytes()
            .chunks_exact(MEASUREMENT_SIZE)
            .map(|triple| Measurement {
                distance: u16::from_le_bytes([triple[0], triple[1]]),
                confidence: triple[2],
            })
    }

    /// Angular span covered by the frame in degrees, always non-negative
    pub fn span_degrees(&self) -> f64 {
        let mut span = i32::from(self.end_angle) - i32::from(self.start_angle);
        if span < 0 {
            span += 36_000;
        }
        f64::from(span) / 100.0
    }

    /// Degrees between consecutive measurements; 0 for single-measurement frames
    pub fn angle_step(&self) -> f64 {
        if self.data_length <= 1 {
            0.0
        } else {
            self.span_degrees() / f64::from(self.data_length - 1)
        }
    }

    /// Check the announced geometry before deriving points
    pub fn check_geometry(&self) -> Result<(), FrameError> {
        if self.data_length == 0 {
            return Err(FrameError::EmptyFrame);
        }
        if self.data_length > MAX_MEASUREMENTS {
            return Err(FrameError::TooManyMeasurements(self.data_length));
        }
        let expected = MEASUREMENT_SIZE * usize::from(self.data_length);
        let actual = self.measurement_bytes().len();
        if actual != expected {
            return Err(FrameError::PayloadLength { expected, actual });
        }
        Ok(())
    }

    /// Expand the packet into its points, in measurement order
    pub fn points(&self) -> Result<Vec<Point>, FrameError> {
        let mut points = Vec::with_capacity(usize::from(self.data_length));
        self.points_into(&mut points)?;
        Ok(points)
    }

    /// Append the packet's points to `out`
    pub fn points_into(&self, out: &mut Vec<Point>) -> Result<(), FrameError> {
        self.check_geometry()?;

        let start = f64::from(self.start_angle) / 100.0;
        let step = self.angle_step();
        out.extend(self.measurements().enumerate().map(|(i, m)| Point {
            angle: start + step * i as f64,
            distance: m.distance,
            confidence: m.confidence,
            timestamp: self.timestamp,
        }));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::ld06::frame::FrameBuilder;
    use approx::assert_relative_eq;

    fn packet_from(builder: &FrameBuilder) -> Packet {
        builder.packet()
    }

    #[test]
    fn test_twelve_points_little_endian() {
        let builder = FrameBuilder::new()
            .angles(10_000, 11_100)
            .timestamp(1234)
            .measurements((0..12).map(|i| (0x0100 + i as u16 * 0x0101, 200 + i as u8)));
        let points = packet_from(&builder).points().unwrap();

        assert_eq!(points.len(), 12);
        for (i, point) in points.iter().enumerate() {
            assert_eq!(point.distance, 0x0100 + i as u16 * 0x0101);
            assert_eq!(point.confidence, 200 + i as u8);
            assert_eq!(point.timestamp, 1234);
            assert_relative_eq!(point.angle, 100.0 + i as f64 * 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_angles_monotonic_across_zero() {
        // 355.00° → 5.50°: span is 10.5°, not -349.5°
        let builder = FrameBuilder::new()
            .angles(35_500, 550)
            .measurements((0..12).map(|_| (1000, 220)));
        let packet = packet_from(&builder);
        assert_relative_eq!(packet.span_degrees(), 10.5, epsilon = 1e-9);

        let points = packet.points().unwrap();
        assert!(points.windows(2).all(|w| w[1].angle > w[0].angle));
        assert_relative_eq!(points[0].angle, 355.0, epsilon = 1e-9);
        assert_relative_eq!(points[11].angle, 365.5, epsilon = 1e-9);
        assert_relative_eq!(points[11].bearing(), 5.5, epsilon = 1e-9);
    }

    #[test]
    fn test_single_measurement_has_zero_step() {
        let builder = FrameBuilder::new()
            .angles(9_000, 9_100)
            .measurement(750, 250);
        let packet = packet_from(&builder);
        assert_eq!(packet.angle_step(), 0.0);

        let points = packet.points().unwrap();
        assert_eq!(points.len(), 1);
        assert_relative_eq!(points[0].angle, 90.0);
    }

    #[test]
    fn test_empty_frame_rejected() {
        let packet = packet_from(&FrameBuilder::new().angles(0, 100));
        assert_eq!(packet.points(), Err(FrameError::EmptyFrame));
    }

    #[test]
    fn test_too_many_measurements_rejected() {
        let builder = FrameBuilder::new().measurements((0..15).map(|_| (100, 100)));
        let packet = packet_from(&builder);
        assert_eq!(packet.points(), Err(FrameError::TooManyMeasurements(15)));
    }

    #[test]
    fn test_truncated_payload_rejected() {
        let mut packet = packet_from(&FrameBuilder::new().measurements((0..4).map(|_| (1, 1))));
        packet.raw.truncate(10);
        assert!(matches!(
            packet.points(),
            Err(FrameError::PayloadLength { expected: 12, .. })
        ));
    }

    #[test]
    fn test_frame_len_invariant() {
        for n in 0..=12u8 {
            let builder = FrameBuilder::new().measurements((0..n).map(|_| (0, 0)));
            assert_eq!(builder.build().len(), Packet::frame_len(n));
        }
        assert_eq!(Packet::frame_len(12), 47);
    }
}
