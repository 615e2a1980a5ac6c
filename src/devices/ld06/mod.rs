//! LDROBOT LD06 lidar reader
//!
//! The LD06 streams ~4500 measurements per second at 230400 baud, twelve
//! per frame. [`Ld06Reader`] owns the transport and the decoder and pushes
//! every derived point into the ingest queue; nothing else touches the
//! serial link.

pub mod constants;
pub mod crc;
pub mod decoder;
pub mod frame;
pub mod packet;

pub use decoder::{DecoderState, FrameDecoder};
pub use frame::FrameBuilder;
pub use packet::{FrameError, Packet};

use crate::core::queue::IngestQueue;
use crate::core::stats::PipelineStats;
use crate::core::types::Point;
use crate::transport::Transport;
use constants::READ_CHUNK_SIZE;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// Frames between periodic statistics log lines
const STATS_LOG_INTERVAL: u64 = 1000;

/// Sensor reader: transport bytes → frames → points → ingest queue
pub struct Ld06Reader<T: Transport> {
    transport: T,
    decoder: FrameDecoder,
    ingest: Arc<IngestQueue<Point>>,
    stats: Arc<PipelineStats>,
    shutdown: Arc<AtomicBool>,
    /// Reused across frames
    points: Vec<Point>,
}

impl<T: Transport> Ld06Reader<T> {
    pub fn new(
        transport: T,
        resync_on_crc_error: bool,
        ingest: Arc<IngestQueue<Point>>,
        stats: Arc<PipelineStats>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            transport,
            decoder: FrameDecoder::with_resync(resync_on_crc_error),
            ingest,
            stats,
            shutdown,
            points: Vec::with_capacity(usize::from(constants::MAX_MEASUREMENTS)),
        }
    }

    /// Reader loop - runs until the shutdown flag is set
    ///
    /// Each read blocks for at most the transport timeout, so the flag is
    /// observed at least that often. Read errors are logged and retried.
    pub fn run(&mut self) {
        log::info!("LD06 reader started");
        let mut buf = [0u8; READ_CHUNK_SIZE];

        while !self.shutdown.load(Ordering::Relaxed) {
            match self.transport.read(&mut buf) {
                Ok(0) => {}
                Ok(n) => self.process_bytes(&buf[..n]),
                Err(e) => {
                    log::error!("Lidar read error: {}", e);
                    thread::sleep(Duration::from_millis(10));
                }
            }
        }

        let snapshot = self.stats.snapshot();
        log::info!(
            "LD06 reader thread exiting ({} frames, {} CRC errors, {} malformed)",
            snapshot.frames_decoded,
            snapshot.crc_errors,
            snapshot.malformed_frames
        );
    }

    /// Decode a chunk of raw bytes and enqueue the resulting points
    pub fn process_bytes(&mut self, bytes: &[u8]) {
        let Self {
            decoder,
            ingest,
            stats,
            points,
            ..
        } = self;

        decoder.feed(bytes, |result| match result {
            Ok(packet) => {
                points.clear();
                match packet.points_into(points) {
                    Ok(()) => {
                        let frames = PipelineStats::add(&stats.frames_decoded, 1);
                        PipelineStats::add(&stats.points_ingested, points.len() as u64);
                        let evicted = ingest.push_all(points.drain(..));
                        if evicted > 0 {
                            let total = PipelineStats::add(&stats.ingest_overflows, evicted as u64);
                            if total == evicted as u64 || total % 1000 < evicted as u64 {
                                log::warn!("Ingest queue overflow ({} points dropped so far)", total);
                            }
                        }
                        if frames % STATS_LOG_INTERVAL == 0 {
                            let snapshot = stats.snapshot();
                            log::debug!(
                                "Lidar stats: {} frames, {:.2}% CRC error rate, {} queued",
                                snapshot.frames_decoded,
                                snapshot.crc_error_rate(),
                                ingest.len()
                            );
                        }
                    }
                    Err(e) => {
                        PipelineStats::add(&stats.malformed_frames, 1);
                        log::debug!("Dropping malformed frame: {}", e);
                    }
                }
            }
            Err(e) => {
                PipelineStats::add(&stats.crc_errors, 1);
                log::warn!("Lidar frame rejected: {}", e);
            }
        });
    }

    pub fn decoder(&self) -> &FrameDecoder {
        &self.decoder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(capacity: usize) -> Ld06Reader<crate::transport::MockTransport> {
        Ld06Reader::new(
            crate::transport::MockTransport::new(),
            true,
            Arc::new(IngestQueue::new(capacity)),
            Arc::new(PipelineStats::new()),
            Arc::new(AtomicBool::new(false)),
        )
    }

    fn frame(ts: u16) -> Vec<u8> {
        FrameBuilder::new()
            .angles(10_000, 11_100)
            .timestamp(ts)
            .measurements((0..12).map(|i| (500 + i, 230)))
            .build()
    }

    #[test]
    fn test_points_reach_queue_in_order() {
        let mut reader = reader(100);
        reader.process_bytes(&frame(40));

        let mut points = Vec::new();
        reader.ingest.drain_into(&mut points, 100);
        assert_eq!(points.len(), 12);
        assert!(points.iter().all(|p| p.timestamp == 40));
        let distances: Vec<_> = points.iter().map(|p| p.distance).collect();
        assert_eq!(distances, (500..512).collect::<Vec<u16>>());
    }

    #[test]
    fn test_crc_error_counted_and_no_points() {
        let mut reader = reader(100);
        let mut bad = frame(40);
        let last = bad.len() - 1;
        bad[last] ^= 0x5A;
        reader.process_bytes(&bad);

        assert!(reader.ingest.is_empty());
        let stats = reader.stats.snapshot();
        assert_eq!(stats.crc_errors, 1);
        assert_eq!(stats.frames_decoded, 0);
    }

    #[test]
    fn test_empty_frame_counted_as_malformed() {
        let mut reader = reader(100);
        reader.process_bytes(&FrameBuilder::new().build());

        assert!(reader.ingest.is_empty());
        assert_eq!(reader.stats.snapshot().malformed_frames, 1);
    }

    #[test]
    fn test_overflow_counted() {
        let mut reader = reader(20);
        reader.process_bytes(&frame(1));
        reader.process_bytes(&frame(2));

        assert_eq!(reader.ingest.len(), 20);
        assert_eq!(reader.stats.snapshot().ingest_overflows, 4);
    }

    #[test]
    fn test_run_exits_on_shutdown() {
        let transport = crate::transport::MockTransport::new();
        let feeder = transport.clone();
        let shutdown = Arc::new(AtomicBool::new(false));
        let ingest = Arc::new(IngestQueue::new(100));
        let mut reader = Ld06Reader::new(
            transport,
            true,
            Arc::clone(&ingest),
            Arc::new(PipelineStats::new()),
            Arc::clone(&shutdown),
        );

        let handle = thread::spawn(move || reader.run());
        feeder.inject_read(&frame(9));

        let mut waited = 0;
        while ingest.len() < 12 && waited < 200 {
            thread::sleep(Duration::from_millis(5));
            waited += 1;
        }
        shutdown.store(true, Ordering::Relaxed);
        handle.join().unwrap();
        assert_eq!(ingest.len(), 12);
    }
}
