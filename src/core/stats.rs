//! Pipeline counters shared between worker threads.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counters, updated with relaxed atomics
#[derive(Debug, Default)]
pub struct PipelineStats {
    pub frames_decoded: AtomicU64,
    pub crc_errors: AtomicU64,
    pub malformed_frames: AtomicU64,
    pub points_ingested: AtomicU64,
    pub ingest_overflows: AtomicU64,
    pub points_routed: AtomicU64,
    pub points_unrouted: AtomicU64,
    pub outbound_overflows: AtomicU64,
    pub reports_dropped: AtomicU64,
    pub lines_sent: AtomicU64,
    pub send_failures: AtomicU64,
    pub lines_discarded: AtomicU64,
}

/// Point-in-time copy of [`PipelineStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub frames_decoded: u64,
    pub crc_errors: u64,
    pub malformed_frames: u64,
    pub points_ingested: u64,
    pub ingest_overflows: u64,
    pub points_routed: u64,
    pub points_unrouted: u64,
    pub outbound_overflows: u64,
    pub reports_dropped: u64,
    pub lines_sent: u64,
    pub send_failures: u64,
    pub lines_discarded: u64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn add(counter: &AtomicU64, n: u64) -> u64 {
        counter.fetch_add(n, Ordering::Relaxed) + n
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        StatsSnapshot {
            frames_decoded: load(&self.frames_decoded),
            crc_errors: load(&self.crc_errors),
            malformed_frames: load(&self.malformed_frames),
            points_ingested: load(&self.points_ingested),
            ingest_overflows: load(&self.ingest_overflows),
            points_routed: load(&self.points_routed),
            points_unrouted: load(&self.points_unrouted),
            outbound_overflows: load(&self.outbound_overflows),
            reports_dropped: load(&self.reports_dropped),
            lines_sent: load(&self.lines_sent),
            send_failures: load(&self.send_failures),
            lines_discarded: load(&self.lines_discarded),
        }
    }
}

impl StatsSnapshot {
    /// CRC errors as a percentage of all complete frames seen
    pub fn crc_error_rate(&self) -> f64 {
        let total = self.frames_decoded + self.crc_errors;
        if total == 0 {
            0.0
        } else {
            (self.crc_errors as f64 / total as f64) * 100.0
        }
    }
}
