//! LD06 frame decoder
//!
//! Byte-at-a-time state machine. Field order on the wire:
//!
//! ```text
//! ┌──────┬─────┬─────────┬─────────┬──────────────┬─────────┬─────────┬─────┐
//! │ 0x54 │ LEN │ SPEED   │ START   │ N × (D, D, C)│ END     │ TS      │ CRC │
//! │ 1    │ 1   │ 2 (LE)  │ 2 (LE)  │ 3N           │ 2 (LE)  │ 2 (LE)  │ 1   │
//! └──────┴─────┴─────────┴─────────┴──────────────┴─────────┴─────────┴─────┘
//! ```
//!
//! The sentinel only starts a frame while idle; inside a frame it is ordinary
//! payload. When a frame fails its CRC and resync is enabled, the bytes after
//! its sentinel are fed through the machine again, so a real frame that began
//! inside the rejected one is still recovered. A sentinel found in replayed
//! bytes only starts a candidate frame if the next byte is a genuine length
//! byte, and a candidate that fails its CRC is discarded silently: it is not
//! reported and not counted.

use super::constants::{
    LENGTH_FLAGS, LENGTH_MASK, MAX_FRAME_SIZE, MAX_MEASUREMENTS, MEASUREMENT_SIZE, SENTINEL,
};
use super::crc::checksum;
use super::packet::{FrameError, Packet};
use std::collections::VecDeque;

/// Decoder position within a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    AwaitSentinel,
    Length,
    SpeedLow,
    SpeedHigh,
    StartAngleLow,
    StartAngleHigh,
    Measurements,
    EndAngleLow,
    EndAngleHigh,
    TimestampLow,
    TimestampHigh,
    Crc,
}

/// Streaming LD06 frame decoder
pub struct FrameDecoder {
    state: DecoderState,
    resync_on_crc_error: bool,
    /// Bytes of the frame in progress, sentinel first
    raw: Vec<u8>,
    data_length: u8,
    radar_speed: u16,
    start_angle: u16,
    end_angle: u16,
    timestamp: u16,
    /// Measurement bytes still expected
    remaining: usize,
    /// Bytes waiting to be re-scanned after a CRC failure
    replay: VecDeque<u8>,
    /// Frame in progress started from a replayed sentinel
    candidate: bool,
    frames_decoded: u64,
    crc_errors: u64,
}

impl FrameDecoder {
    /// Decoder that re-scans rejected frames for an embedded sentinel
    pub fn new() -> Self {
        Self::with_resync(true)
    }

    /// Decoder with explicit resync behaviour
    ///
    /// With `resync_on_crc_error == false` a rejected frame's bytes are
    /// discarded and scanning resumes with the next unread byte.
    pub fn with_resync(resync_on_crc_error: bool) -> Self {
        Self {
            state: DecoderState::AwaitSentinel,
            resync_on_crc_error,
            raw: Vec::with_capacity(MAX_FRAME_SIZE),
            data_length: 0,
            radar_speed: 0,
            start_angle: 0,
            end_angle: 0,
            timestamp: 0,
            remaining: 0,
            replay: VecDeque::with_capacity(MAX_FRAME_SIZE),
            candidate: false,
            frames_decoded: 0,
            crc_errors: 0,
        }
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Frames that passed the CRC check
    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }

    /// Frames rejected by the CRC check
    pub fn crc_errors(&self) -> u64 {
        self.crc_errors
    }

    /// Drop any partial frame and return to idle
    pub fn reset(&mut self) {
        self.state = DecoderState::AwaitSentinel;
        self.raw.clear();
        self.replay.clear();
        self.candidate = false;
    }

    /// Feed a chunk of bytes, reporting every completed or rejected frame
    pub fn feed<F>(&mut self, bytes: &[u8], mut on_frame: F)
    where
        F: FnMut(Result<Packet, FrameError>),
    {
        for &byte in bytes {
            if let Some(result) = self.advance(byte, false) {
                on_frame(result);
            }
            while let Some(replayed) = self.replay.pop_front() {
                if let Some(result) = self.advance(replayed, true) {
                    on_frame(result);
                }
            }
        }
    }

    /// Feed a chunk and collect the results
    pub fn decode(&mut self, bytes: &[u8]) -> Vec<Result<Packet, FrameError>> {
        let mut results = Vec::new();
        self.feed(bytes, |result| results.push(result));
        results
    }

    /// Advance the state machine by one byte
    ///
    /// Bytes queued for replay by a CRC failure are not consumed here; use
    /// [`FrameDecoder::feed`] to have them processed.
    pub fn step(&mut self, byte: u8) -> Option<Result<Packet, FrameError>> {
        self.advance(byte, false)
    }

    fn advance(&mut self, byte: u8, replayed: bool) -> Option<Result<Packet, FrameError>> {
        use DecoderState::*;

        if self.state != AwaitSentinel {
            self.raw.push(byte);
        }

        self.state = match self.state {
            AwaitSentinel => {
                if byte == SENTINEL {
                    self.begin_frame(replayed);
                    Length
                } else {
                    AwaitSentinel
                }
            }
            Length if self.candidate && !is_plausible_length(byte) => {
                // Not a frame start; the byte itself may be a sentinel
                self.raw.clear();
                self.candidate = false;
                self.replay.push_front(byte);
                AwaitSentinel
            }
            Length => {
                self.data_length = byte & LENGTH_MASK;
                self.remaining = MEASUREMENT_SIZE * usize::from(self.data_length);
                SpeedLow
            }
            SpeedLow => {
                self.radar_speed = u16::from(byte);
                SpeedHigh
            }
            SpeedHigh => {
                self.radar_speed |= u16::from(byte) << 8;
                StartAngleLow
            }
            StartAngleLow => {
                self.start_angle = u16::from(byte);
                StartAngleHigh
            }
            StartAngleHigh => {
                self.start_angle |= u16::from(byte) << 8;
                if self.remaining == 0 {
                    EndAngleLow
                } else {
                    Measurements
                }
            }
            Measurements => {
                self.remaining -= 1;
                if self.remaining == 0 {
                    EndAngleLow
                } else {
                    Measurements
                }
            }
            EndAngleLow => {
                self.end_angle = u16::from(byte);
                EndAngleHigh
            }
            EndAngleHigh => {
                self.end_angle |= u16::from(byte) << 8;
                TimestampLow
            }
            TimestampLow => {
                self.timestamp = u16::from(byte);
                TimestampHigh
            }
            TimestampHigh => {
                self.timestamp |= u16::from(byte) << 8;
                Crc
            }
            Crc => {
                self.state = AwaitSentinel;
                return self.finish_frame(byte);
            }
        };

        None
    }

    fn begin_frame(&mut self, candidate: bool) {
        self.candidate = candidate;
        self.raw.clear();
        self.raw.push(SENTINEL);
        self.data_length = 0;
        self.radar_speed = 0;
        self.start_angle = 0;
        self.end_angle = 0;
        self.timestamp = 0;
        self.remaining = 0;
    }

    fn finish_frame(&mut self, crc: u8) -> Option<Result<Packet, FrameError>> {
        let raw = std::mem::replace(&mut self.raw, Vec::with_capacity(MAX_FRAME_SIZE));
        let expected = checksum(&raw[..raw.len() - 1]);
        let candidate = std::mem::take(&mut self.candidate);

        if expected != crc {
            if self.resync_on_crc_error {
                // Re-scan everything after the sentinel, ahead of any bytes
                // already waiting from an outer rejected frame
                for &byte in raw[1..].iter().rev() {
                    self.replay.push_front(byte);
                }
            }
            if candidate {
                return None;
            }
            self.crc_errors += 1;
            return Some(Err(FrameError::Checksum {
                expected,
                actual: crc,
            }));
        }

        self.frames_decoded += 1;
        Some(Ok(Packet {
            data_length: self.data_length,
            radar_speed: self.radar_speed,
            start_angle: self.start_angle,
            end_angle: self.end_angle,
            timestamp: self.timestamp,
            crc,
            raw,
        }))
    }
}

/// Length byte as the sensor sends it: fixed high bits and 1..=12 measurements
#[inline]
fn is_plausible_length(byte: u8) -> bool {
    (byte & !LENGTH_MASK) == LENGTH_FLAGS
        && (1..=MAX_MEASUREMENTS).contains(&(byte & LENGTH_MASK))
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::ld06::frame::FrameBuilder;
    use approx::assert_relative_eq;

    /// Example frame from the LD06 development manual
    const DATASHEET_FRAME: [u8; 47] = [
        0x54, 0x2C, 0x68, 0x08, 0xAB, 0x7E, 0xE0, 0x00, 0xE4, 0xDC, 0x00, 0xE2, 0xD9, 0x00, 0xE5,
        0xD5, 0x00, 0xE3, 0xD3, 0x00, 0xE4, 0xD0, 0x00, 0xE9, 0xCD, 0x00, 0xE4, 0xCA, 0x00, 0xE2,
        0xC7, 0x00, 0xE9, 0xC5, 0x00, 0xE5, 0xC2, 0x00, 0xE5, 0xC0, 0x00, 0xE5, 0xBE, 0x82, 0x3A,
        0x1A, 0x50,
    ];

    fn frames(results: Vec<Result<Packet, FrameError>>) -> Vec<Packet> {
        results.into_iter().filter_map(Result::ok).collect()
    }

    #[test]
    fn test_state_sequence() {
        use DecoderState::*;
        let frame = FrameBuilder::new().measurement(500, 200).build();
        let mut decoder = FrameDecoder::new();
        let mut states = Vec::new();

        for &byte in &frame[..frame.len() - 1] {
            assert!(decoder.step(byte).is_none());
            states.push(decoder.state());
        }
        assert_eq!(
            states,
            vec![
                Length,
                SpeedLow,
                SpeedHigh,
                StartAngleLow,
                StartAngleHigh,
                Measurements,
                Measurements,
                Measurements,
                EndAngleLow,
                EndAngleHigh,
                TimestampLow,
                TimestampHigh,
                Crc,
            ]
        );

        let result = decoder.step(frame[frame.len() - 1]);
        assert!(matches!(result, Some(Ok(_))));
        assert_eq!(decoder.state(), AwaitSentinel);
    }

    #[test]
    fn test_datasheet_frame_fields() {
        let mut decoder = FrameDecoder::new();
        let packets = frames(decoder.decode(&DATASHEET_FRAME));
        assert_eq!(packets.len(), 1);

        let packet = &packets[0];
        assert_eq!(packet.data_length, 12);
        assert_eq!(packet.radar_speed, 2152);
        assert_eq!(packet.start_angle, 32427);
        assert_eq!(packet.end_angle, 33470);
        assert_eq!(packet.timestamp, 6714);
        assert_eq!(packet.crc, 0x50);
        assert_eq!(packet.raw, DATASHEET_FRAME.to_vec());

        let points = packet.points().unwrap();
        assert_eq!(points.len(), 12);
        assert_eq!((points[0].distance, points[0].confidence), (224, 228));
        assert_eq!((points[11].distance, points[11].confidence), (192, 229));

        let step = (334.70 - 324.27) / 11.0;
        for (i, point) in points.iter().enumerate() {
            assert_relative_eq!(point.angle, 324.27 + step * i as f64, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_leading_garbage_skipped() {
        let mut stream = vec![0x00, 0xFF, 0x12, 0x33];
        stream.extend_from_slice(&DATASHEET_FRAME);

        let mut decoder = FrameDecoder::new();
        assert_eq!(frames(decoder.decode(&stream)).len(), 1);
        assert_eq!(decoder.crc_errors(), 0);
    }

    #[test]
    fn test_split_across_reads() {
        let mut decoder = FrameDecoder::new();
        let (head, tail) = DATASHEET_FRAME.split_at(20);
        assert!(decoder.decode(head).is_empty());
        assert_eq!(decoder.state(), DecoderState::Measurements);
        assert_eq!(frames(decoder.decode(tail)).len(), 1);
    }

    #[test]
    fn test_corrupted_crc_then_resync() {
        let mut corrupted = DATASHEET_FRAME;
        corrupted[46] ^= 0xFF;
        let mut stream = corrupted.to_vec();
        stream.extend_from_slice(&DATASHEET_FRAME);

        let mut decoder = FrameDecoder::new();
        let results = decoder.decode(&stream);

        assert_eq!(results.len(), 2);
        assert!(matches!(
            results[0],
            Err(FrameError::Checksum {
                expected: 0x50,
                actual: 0xAF
            })
        ));
        assert!(results[1].is_ok());
        assert_eq!(decoder.crc_errors(), 1);
        assert_eq!(decoder.frames_decoded(), 1);
    }

    #[test]
    fn test_sentinel_in_payload_is_data() {
        // A measurement whose bytes equal the sentinel must not restart the frame
        let frame = FrameBuilder::new()
            .angles(1000, 2100)
            .measurements([(0x5454, 0x54), (0x0054, 200)])
            .build();

        for resync in [false, true] {
            let mut decoder = FrameDecoder::with_resync(resync);
            let packets = frames(decoder.decode(&frame));
            assert_eq!(packets.len(), 1);
            let points = packets[0].points().unwrap();
            assert_eq!(points[0].distance, 0x5454);
            assert_eq!(points[0].confidence, 0x54);
            assert_eq!(points[1].distance, 0x0054);
        }
    }

    /// A truncated frame (sensor glitch) directly followed by a good one
    fn truncated_then_valid() -> Vec<u8> {
        let mut stream = vec![SENTINEL, 0x2C, 0x00, 0x00, 0x00, 0x00, 0x00];
        stream.extend_from_slice(&DATASHEET_FRAME);
        stream
    }

    #[test]
    fn test_idle_only_sentinel_loses_embedded_frame() {
        let mut decoder = FrameDecoder::with_resync(false);
        let results = decoder.decode(&truncated_then_valid());

        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(FrameError::Checksum { .. })));
        assert_eq!(decoder.frames_decoded(), 0);
        assert_eq!(decoder.state(), DecoderState::AwaitSentinel);
    }

    #[test]
    fn test_resync_recovers_embedded_frame() {
        let mut decoder = FrameDecoder::with_resync(true);
        let results = decoder.decode(&truncated_then_valid());

        assert_eq!(results.len(), 2);
        assert!(matches!(results[0], Err(FrameError::Checksum { .. })));
        let packet = results[1].as_ref().unwrap();
        assert_eq!(packet.raw, DATASHEET_FRAME.to_vec());
        assert_eq!(decoder.crc_errors(), 1);
        assert_eq!(decoder.frames_decoded(), 1);
    }

    #[test]
    fn test_replayed_sentinel_needs_length_byte() {
        // Every confidence byte equals the sentinel; none is followed by a length byte
        let mut stream = FrameBuilder::new()
            .angles(10_000, 11_100)
            .timestamp(100)
            .measurements((0..12).map(|i| (1000 + i, SENTINEL)))
            .build();
        let last = stream.len() - 1;
        stream[last] ^= 0xFF;
        stream.extend(
            FrameBuilder::new()
                .angles(11_200, 12_300)
                .timestamp(110)
                .measurements((0..12).map(|i| (2000 + i, 220)))
                .build(),
        );

        let mut decoder = FrameDecoder::new();
        let results = decoder.decode(&stream);

        assert_eq!(results.len(), 2);
        assert!(matches!(results[0], Err(FrameError::Checksum { .. })));
        let packet = results[1].as_ref().unwrap();
        assert_eq!(packet.timestamp, 110);
        assert_eq!(decoder.crc_errors(), 1);
        assert_eq!(decoder.frames_decoded(), 1);
    }

    #[test]
    fn test_failed_candidate_is_not_counted() {
        // First distance encodes as 0x54 0x2C: a plausible frame start inside the payload
        let mut stream = FrameBuilder::new()
            .angles(10_000, 11_100)
            .timestamp(100)
            .measurement(0x2C54, 200)
            .measurements((1..12).map(|i| (1000 + i, 200)))
            .build();
        let last = stream.len() - 1;
        stream[last] ^= 0xFF;
        let valid = FrameBuilder::new()
            .angles(11_200, 12_300)
            .timestamp(110)
            .measurements((0..12).map(|i| (2000 + i, 220)))
            .build();
        stream.extend_from_slice(&valid);

        let mut decoder = FrameDecoder::new();
        let results = decoder.decode(&stream);

        assert_eq!(results.len(), 2);
        assert!(results[0].is_err());
        assert_eq!(results[1].as_ref().unwrap().raw, valid);
        assert_eq!(decoder.crc_errors(), 1);
        assert_eq!(decoder.frames_decoded(), 1);
    }

    #[test]
    fn test_zero_length_frame_skips_measurements() {
        let frame = FrameBuilder::new().angles(100, 200).timestamp(7).build();
        assert_eq!(frame.len(), 11);

        let mut decoder = FrameDecoder::new();
        let packets = frames(decoder.decode(&frame));
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].data_length, 0);
        assert_eq!(packets[0].timestamp, 7);
        assert_eq!(packets[0].points(), Err(FrameError::EmptyFrame));
    }

    #[test]
    fn test_many_frames_in_one_chunk() {
        let mut stream = Vec::new();
        for ts in 0..10u16 {
            stream.extend(
                FrameBuilder::new()
                    .timestamp(ts * 10)
                    .measurements((0..12).map(|i| (1000 + i, 210)))
                    .build(),
            );
        }

        let mut decoder = FrameDecoder::new();
        let packets = frames(decoder.decode(&stream));
        let timestamps: Vec<_> = packets.iter().map(|p| p.timestamp).collect();
        assert_eq!(timestamps, (0..10u16).map(|ts| ts * 10).collect::<Vec<_>>());
    }

    #[test]
    fn test_reset_discards_partial_frame() {
        let mut decoder = FrameDecoder::new();
        decoder.decode(&DATASHEET_FRAME[..10]);
        decoder.reset();
        assert_eq!(decoder.state(), DecoderState::AwaitSentinel);
        assert_eq!(frames(decoder.decode(&DATASHEET_FRAME)).len(), 1);
    }
}
