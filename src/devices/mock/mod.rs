//! Simulated LD06 for hardware-free runs
//!
//! Enable the `mock` feature and set `lidar.port = "mock"`:
//!
//! ```bash
//! cargo run --features mock -- drishti.toml
//! ```
//!
//! The simulator places the sensor in the middle of a rectangular room and
//! emits frames at the real sensor cadence (10 Hz rotation, 4500 samples/s)
//! with distance noise and an occasional corrupted frame.

use crate::devices::ld06::FrameBuilder;
use crate::devices::ld06::constants::{MAX_MEASUREMENTS, TIMESTAMP_WRAP_MS};
use crate::error::Result;
use crate::transport::Transport;
use rand::prelude::*;
use rand::rngs::SmallRng;
use rand_distr::StandardNormal;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Rotation speed in degrees per second
const ROTATION_DEG_PER_SEC: f64 = 3600.0;
/// Samples per second
const SAMPLE_RATE: f64 = 4500.0;
/// Angular spacing of consecutive samples
const SAMPLE_STEP_DEG: f64 = ROTATION_DEG_PER_SEC / SAMPLE_RATE;
/// Chance a frame is emitted with a broken CRC
const CORRUPTION_RATE: f64 = 0.005;
/// Range noise standard deviation (mm)
const RANGE_NOISE_STDDEV: f64 = 10.0;

/// Room geometry
#[derive(Debug, Clone, Copy)]
pub struct Room {
    /// Half the room width along the 0°/180° axis (mm)
    pub half_width: f64,
    /// Half the room depth along the 90°/270° axis (mm)
    pub half_depth: f64,
}

impl Default for Room {
    fn default() -> Self {
        Self {
            half_width: 2000.0,
            half_depth: 1500.0,
        }
    }
}

impl Room {
    /// Distance from the centre to the wall along `angle_deg`
    pub fn range_at(&self, angle_deg: f64) -> f64 {
        let (sin, cos) = angle_deg.to_radians().sin_cos();
        let to_x = if cos.abs() > 1e-9 {
            self.half_width / cos.abs()
        } else {
            f64::INFINITY
        };
        let to_y = if sin.abs() > 1e-9 {
            self.half_depth / sin.abs()
        } else {
            f64::INFINITY
        };
        to_x.min(to_y)
    }
}

/// Byte source producing simulated LD06 frames in real time
pub struct SimulatedLd06 {
    room: Room,
    rng: SmallRng,
    started: Instant,
    /// Angle of the next sample in degrees
    next_angle: f64,
    /// Samples emitted so far, drives the frame schedule
    samples_emitted: u64,
    pending: VecDeque<u8>,
    read_timeout: Duration,
}

impl SimulatedLd06 {
    /// A `seed` of 0 draws from entropy; any other value is reproducible
    pub fn new(room: Room, seed: u64, read_timeout: Duration) -> Self {
        let rng = if seed == 0 {
            SmallRng::from_entropy()
        } else {
            SmallRng::seed_from_u64(seed)
        };
        log::info!(
            "Simulated LD06: room {:.0}x{:.0} mm",
            room.half_width * 2.0,
            room.half_depth * 2.0
        );
        Self {
            room,
            rng,
            started: Instant::now(),
            next_angle: 0.0,
            samples_emitted: 0,
            pending: VecDeque::new(),
            read_timeout,
        }
    }

    /// Generate the next frame's wire bytes
    pub fn next_frame(&mut self) -> Vec<u8> {
        let count = MAX_MEASUREMENTS;
        let start = self.next_angle;
        let end = start + SAMPLE_STEP_DEG * f64::from(count - 1);

        let mut builder = FrameBuilder::new()
            .speed(ROTATION_DEG_PER_SEC as u16)
            .angles(hundredths(start), hundredths(end))
            .timestamp(self.sensor_timestamp());
        for i in 0..count {
            let angle = start + SAMPLE_STEP_DEG * f64::from(i);
            let noise: f64 = self.rng.sample::<f64, _>(StandardNormal) * RANGE_NOISE_STDDEV;
            let distance = (self.room.range_at(angle) + noise).clamp(0.0, f64::from(u16::MAX));
            let confidence = self.rng.gen_range(180..=255);
            builder = builder.measurement(distance as u16, confidence);
        }

        self.next_angle = (end + SAMPLE_STEP_DEG) % 360.0;
        self.samples_emitted += u64::from(count);

        let mut frame = builder.build();
        if self.rng.gen_bool(CORRUPTION_RATE) {
            let last = frame.len() - 1;
            frame[last] ^= 0xFF;
        }
        frame
    }

    fn sensor_timestamp(&self) -> u16 {
        (self.started.elapsed().as_millis() % u128::from(TIMESTAMP_WRAP_MS)) as u16
    }

    /// Samples the real sensor would have produced by now
    fn samples_due(&self) -> u64 {
        (self.started.elapsed().as_secs_f64() * SAMPLE_RATE) as u64
    }
}

fn hundredths(angle_deg: f64) -> u16 {
    ((angle_deg % 360.0) * 100.0).round() as u16 % 36_000
}

impl Transport for SimulatedLd06 {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        if self.pending.is_empty() {
            let frame_samples = u64::from(MAX_MEASUREMENTS);
            let due = self.samples_due();
            if due < self.samples_emitted + frame_samples {
                let wait = (self.samples_emitted + frame_samples - due) as f64 / SAMPLE_RATE;
                std::thread::sleep(Duration::from_secs_f64(wait).min(self.read_timeout));
            }
            while self.samples_due() >= self.samples_emitted + frame_samples {
                let frame = self.next_frame();
                self.pending.extend(frame);
            }
        }

        let n = self.pending.len().min(buffer.len());
        for (slot, byte) in buffer.iter_mut().zip(self.pending.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn available(&mut self) -> Result<usize> {
        Ok(self.pending.len())
    }
}
