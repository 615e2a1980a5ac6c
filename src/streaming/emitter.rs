//! Telemetry emitter thread
//!
//! Wakes on a fixed interval, drains the outbound point queue and the latest
//! zone report, and writes one line per message to the sink. Lines produced
//! while the sink is down are discarded; the emitter retries the connection
//! once per tick and never blocks the rest of the pipeline.

use super::messages::TelemetryMessage;
use super::sink::TelemetrySink;
use crate::core::stats::PipelineStats;
use crate::core::types::{Point, RangeReport};
use crossbeam_channel::Receiver;
use crossbeam_queue::ArrayQueue;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// Connection failures between repeated "still unavailable" log lines
const RECONNECT_LOG_INTERVAL: u64 = 100;

pub struct TelemetryEmitter<S: TelemetrySink> {
    sink: S,
    points: Arc<ArrayQueue<Point>>,
    reports: Receiver<RangeReport>,
    stats: Arc<PipelineStats>,
    shutdown: Arc<AtomicBool>,
    interval: Duration,
    /// Reused line buffer
    line: String,
    connect_failures: u64,
}

impl<S: TelemetrySink> TelemetryEmitter<S> {
    pub fn new(
        sink: S,
        points: Arc<ArrayQueue<Point>>,
        reports: Receiver<RangeReport>,
        stats: Arc<PipelineStats>,
        shutdown: Arc<AtomicBool>,
        interval: Duration,
    ) -> Self {
        Self {
            sink,
            points,
            reports,
            stats,
            shutdown,
            interval,
            line: String::with_capacity(128),
            connect_failures: 0,
        }
    }

    /// Emitter loop - runs until the shutdown flag is set
    pub fn run(&mut self) {
        log::info!("Telemetry emitter started ({})", self.sink.describe());

        while !self.shutdown.load(Ordering::Relaxed) {
            self.tick();
            thread::sleep(self.interval);
        }

        self.sink.disconnect();
        let snapshot = self.stats.snapshot();
        log::info!(
            "Telemetry emitter exiting ({} lines sent, {} send failures, {} discarded)",
            snapshot.lines_sent,
            snapshot.send_failures,
            snapshot.lines_discarded
        );
    }

    /// One emission pass
    pub fn tick(&mut self) {
        self.ensure_connected();

        // Bounded so a producer refilling the queue cannot starve the reports
        for _ in 0..self.points.capacity() {
            let Some(point) = self.points.pop() else {
                break;
            };
            self.emit(TelemetryMessage::Point(point));
        }

        // Older reports are superseded by the newest one
        if let Some(report) = self.reports.try_iter().last() {
            for (zone, distance) in report.iter() {
                self.emit(TelemetryMessage::Range { zone, distance });
            }
        }
    }

    fn ensure_connected(&mut self) {
        if self.sink.is_connected() {
            return;
        }
        match self.sink.connect() {
            Ok(()) => {
                log::info!("Telemetry channel connected: {}", self.sink.describe());
                self.connect_failures = 0;
            }
            Err(e) => {
                self.connect_failures += 1;
                if self.connect_failures == 1 {
                    log::warn!(
                        "Telemetry channel {} unavailable: {}",
                        self.sink.describe(),
                        e
                    );
                } else if self.connect_failures % RECONNECT_LOG_INTERVAL == 0 {
                    log::debug!(
                        "Telemetry channel {} still unavailable after {} attempts",
                        self.sink.describe(),
                        self.connect_failures
                    );
                }
            }
        }
    }

    fn emit(&mut self, message: TelemetryMessage) {
        if !self.sink.is_connected() {
            PipelineStats::add(&self.stats.lines_discarded, 1);
            return;
        }

        self.line.clear();
        if let Err(e) = message.write_line(&mut self.line) {
            log::debug!("Failed to format {:?}: {}", message, e);
            return;
        }

        match self.sink.send_line(&self.line) {
            Ok(()) => {
                PipelineStats::add(&self.stats.lines_sent, 1);
            }
            Err(e) => {
                PipelineStats::add(&self.stats.send_failures, 1);
                log::warn!(
                    "Telemetry send to {} failed, marking disconnected: {}",
                    self.sink.describe(),
                    e
                );
                self.sink.disconnect();
            }
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}
