//! LD06 frame encoder
//!
//! Produces wire bytes with a valid trailing CRC. Used by the simulated
//! sensor and by tests that need exact frames.

use super::constants::{FRAME_OVERHEAD, LENGTH_FLAGS, LENGTH_MASK, MEASUREMENT_SIZE, SENTINEL};
use super::crc::checksum;
use super::packet::Packet;

/// Fluent builder for a single frame
#[derive(Debug, Clone, Default)]
pub struct FrameBuilder {
    radar_speed: u16,
    start_angle: u16,
    end_angle: u16,
    timestamp: u16,
    /// Upper bits of the length byte (reserved by the sensor, 0x20 on the wire)
    length_flags: u8,
    measurements: Vec<(u16, u8)>,
}

impl FrameBuilder {
    pub fn new() -> Self {
        Self {
            radar_speed: 3600,
            length_flags: LENGTH_FLAGS,
            ..Default::default()
        }
    }

    pub fn speed(mut self, deg_per_sec: u16) -> Self {
        self.radar_speed = deg_per_sec;
        self
    }

    /// Start and end angle in hundredths of a degree
    pub fn angles(mut self, start: u16, end: u16) -> Self {
        self.start_angle = start;
        self.end_angle = end;
        self
    }

    pub fn timestamp(mut self, ms: u16) -> Self {
        self.timestamp = ms;
        self
    }

    /// Append one `(distance_mm, confidence)` measurement
    pub fn measurement(mut self, distance: u16, confidence: u8) -> Self {
        self.measurements.push((distance, confidence));
        self
    }

    pub fn measurements<I: IntoIterator<Item = (u16, u8)>>(mut self, items: I) -> Self {
        self.measurements.extend(items);
        self
    }

    /// Encode to wire bytes; the count is truncated to the 4-bit length field
    pub fn build(&self) -> Vec<u8> {
        let count = self.measurements.len().min(usize::from(LENGTH_MASK));
        let mut frame = Vec::with_capacity(Packet::frame_len(count as u8));

        frame.push(SENTINEL);
        frame.push(self.length_flags & !LENGTH_MASK | count as u8);
        frame.extend_from_slice(&self.radar_speed.to_le_bytes());
        frame.extend_from_slice(&self.start_angle.to_le_bytes());
        for &(distance, confidence) in &self.measurements[..count] {
            frame.extend_from_slice(&distance.to_le_bytes());
            frame.push(confidence);
        }
        frame.extend_from_slice(&self.end_angle.to_le_bytes());
        frame.extend_from_slice(&self.timestamp.to_le_bytes());
        frame.push(checksum(&frame));

        debug_assert_eq!(frame.len(), FRAME_OVERHEAD + MEASUREMENT_SIZE * count);
        frame
    }

    /// The packet a decoder would produce from [`FrameBuilder::build`]
    pub fn packet(&self) -> Packet {
        let raw = self.build();
        Packet {
            data_length: raw[1] & LENGTH_MASK,
            radar_speed: self.radar_speed,
            start_angle: self.start_angle,
            end_angle: self.end_angle,
            timestamp: self.timestamp,
            crc: raw[raw.len() - 1],
            raw,
        }
    }
}
