//! Pipeline orchestration.
//!
//! [`PipelineContext`] holds every piece of cross-thread state behind its own
//! handle; [`Pipeline`] spawns the four workers over one context:
//!
//! ```text
//! ld06-reader ──IngestQueue──▶ zone-router ──ZoneWindows──▶ zone-aggregator
//!                                   │                              │
//!                              ArrayQueue<Point>          channel<RangeReport>
//!                                   └────────▶ telemetry-emitter ◀─┘
//! ```
//!
//! Shutdown is cooperative: the shared flag is checked by every loop and the
//! ingest queue is closed to wake the router.

use crate::config::Config;
use crate::core::queue::IngestQueue;
use crate::core::stats::{PipelineStats, StatsSnapshot};
use crate::core::types::{Point, RangeReport};
use crate::devices::ld06::Ld06Reader;
use crate::error::{Error, Result};
use crate::streaming::{TelemetryEmitter, TelemetrySink};
use crate::transport::Transport;
use crate::zones::{ZoneAggregator, ZoneRouter, ZoneWindows};
use crossbeam_channel::{Sender, TrySendError, bounded};
use crossbeam_queue::ArrayQueue;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Longest the router waits on an empty ingest queue before rechecking shutdown
const ROUTER_POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// Pending zone reports between aggregator and emitter
const REPORT_CHANNEL_CAPACITY: usize = 16;

/// Shared handles passed to each worker
#[derive(Clone)]
pub struct PipelineContext {
    pub ingest: Arc<IngestQueue<Point>>,
    pub windows: Arc<ZoneWindows>,
    pub outbound: Arc<ArrayQueue<Point>>,
    pub router: Arc<ZoneRouter>,
    pub stats: Arc<PipelineStats>,
    pub shutdown: Arc<AtomicBool>,
}

impl PipelineContext {
    pub fn new(config: &Config) -> Self {
        Self {
            ingest: Arc::new(IngestQueue::new(config.pipeline.ingest_capacity)),
            windows: Arc::new(ZoneWindows::new()),
            outbound: Arc::new(ArrayQueue::new(config.pipeline.outbound_capacity.max(1))),
            router: Arc::new(ZoneRouter::new(
                config.zones.sweep_start_deg,
                config.zones.sweep_end_deg,
            )),
            stats: Arc::new(PipelineStats::new()),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Route one point into its zone window and, if requested, the outbound queue
    ///
    /// Outbound points are limited to the sweep; a full outbound queue drops
    /// its oldest point.
    pub fn route_point(&self, point: Point, emit_points: bool) {
        // Queued for telemetry before it can influence a zone range
        if emit_points
            && self.router.in_sweep(&point)
            && self.outbound.force_push(point).is_some()
        {
            PipelineStats::add(&self.stats.outbound_overflows, 1);
        }

        match self.router.route(&point) {
            Some(index) => {
                self.windows.append(index, point);
                PipelineStats::add(&self.stats.points_routed, 1);
            }
            None => {
                PipelineStats::add(&self.stats.points_unrouted, 1);
            }
        }
    }
}

/// Router loop: ingest queue → zone windows (+ outbound queue)
fn run_router(ctx: PipelineContext, emit_points: bool) {
    log::info!("Zone router started");

    while !ctx.is_shutdown() {
        match ctx.ingest.pop_timeout(ROUTER_POLL_TIMEOUT) {
            Some(point) => ctx.route_point(point, emit_points),
            None if ctx.ingest.is_closed() => break,
            None => {}
        }
    }

    log::info!("Zone router exiting");
}

/// Aggregator loop: fixed tick over the zone windows
fn run_aggregator(
    ctx: PipelineContext,
    mut aggregator: ZoneAggregator,
    interval: Duration,
    reports: Sender<RangeReport>,
) {
    log::info!("Zone aggregator started (tick {:?})", interval);

    while !ctx.is_shutdown() {
        let report = aggregator.tick(&ctx.windows);
        match reports.try_send(report) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                PipelineStats::add(&ctx.stats.reports_dropped, 1);
            }
            Err(TrySendError::Disconnected(_)) => {
                log::warn!("Report channel closed, aggregator stopping");
                break;
            }
        }
        thread::sleep(interval);
    }

    log::info!("Zone aggregator exiting");
}

fn spawn<F>(name: &'static str, f: F) -> Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(f)
        .map_err(|e| Error::ThreadSpawn(format!("{}: {}", name, e)))
}

/// Running pipeline; dropping it stops and joins every worker
pub struct Pipeline {
    context: PipelineContext,
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl Pipeline {
    /// Spawn the reader, router, aggregator and emitter threads
    ///
    /// If any thread fails to spawn, the ones already running are stopped
    /// before the error is returned.
    pub fn start<T, S>(config: &Config, transport: T, sink: S) -> Result<Self>
    where
        T: Transport + 'static,
        S: TelemetrySink + 'static,
    {
        let context = PipelineContext::new(config);
        let (report_tx, report_rx) = bounded(REPORT_CHANNEL_CAPACITY);
        let mut pipeline = Pipeline {
            context: context.clone(),
            handles: Vec::with_capacity(4),
        };

        let mut reader = Ld06Reader::new(
            transport,
            config.lidar.resync_on_crc_error,
            Arc::clone(&context.ingest),
            Arc::clone(&context.stats),
            Arc::clone(&context.shutdown),
        );
        pipeline.push("ld06-reader", move || reader.run())?;

        let router_ctx = context.clone();
        let emit_points = config.telemetry.emit_points;
        pipeline.push("zone-router", move || run_router(router_ctx, emit_points))?;

        let aggregator_ctx = context.clone();
        let aggregator =
            ZoneAggregator::new(config.zones.keeping_length_ms, config.zones.min_confidence);
        let interval = config.zones.aggregation_interval();
        pipeline.push("zone-aggregator", move || {
            run_aggregator(aggregator_ctx, aggregator, interval, report_tx)
        })?;

        let mut emitter = TelemetryEmitter::new(
            sink,
            Arc::clone(&context.outbound),
            report_rx,
            Arc::clone(&context.stats),
            Arc::clone(&context.shutdown),
            config.telemetry.emit_interval(),
        );
        pipeline.push("telemetry-emitter", move || emitter.run())?;

        log::info!(
            "Pipeline started: sweep [{:.1}, {:.1}), keep {} ms, min confidence {}",
            config.zones.sweep_start_deg,
            config.zones.sweep_end_deg,
            config.zones.keeping_length_ms,
            config.zones.min_confidence
        );
        Ok(pipeline)
    }

    fn push<F>(&mut self, name: &'static str, f: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = spawn(name, f)?;
        self.handles.push((name, handle));
        Ok(())
    }

    pub fn context(&self) -> &PipelineContext {
        &self.context
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.context.stats.snapshot()
    }

    /// True while every worker is alive and shutdown has not been requested
    pub fn is_running(&self) -> bool {
        !self.handles.is_empty()
            && !self.context.is_shutdown()
            && self.stopped_worker().is_none()
    }

    /// Name of the first worker thread that has already exited
    pub fn stopped_worker(&self) -> Option<&'static str> {
        self.handles
            .iter()
            .find(|(_, handle)| handle.is_finished())
            .map(|(name, _)| *name)
    }

    /// Signal every worker to stop and wait for them
    ///
    /// Returns the name of the first worker that panicked, if any. Calling
    /// this more than once is harmless.
    pub fn shutdown(&mut self) -> Result<()> {
        self.context.shutdown.store(true, Ordering::Relaxed);
        self.context.ingest.close();

        let mut panicked = None;
        for (name, handle) in self.handles.drain(..) {
            if handle.join().is_err() {
                log::error!("{} thread panicked", name);
                panicked.get_or_insert(name);
            }
        }

        match panicked {
            Some(name) => Err(Error::ThreadPanic(name)),
            None => Ok(()),
        }
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            log::error!("Error during pipeline shutdown: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(angle: f64) -> Point {
        Point {
            angle,
            distance: 800,
            confidence: 250,
            timestamp: 0,
        }
    }

    fn context() -> PipelineContext {
        PipelineContext::new(&Config::with_sweep("mock", 290.0, 70.0))
    }

    #[test]
    fn test_route_point_in_sweep() {
        let ctx = context();
        ctx.route_point(point(300.0), true);

        assert_eq!(ctx.windows.len(0), 1);
        assert_eq!(ctx.outbound.len(), 1);
        assert_eq!(ctx.stats.snapshot().points_routed, 1);
    }

    #[test]
    fn test_route_point_outside_sweep() {
        let ctx = context();
        ctx.route_point(point(180.0), true);

        assert!((0..4).all(|i| ctx.windows.len(i) == 0));
        assert!(ctx.outbound.is_empty());
        assert_eq!(ctx.stats.snapshot().points_unrouted, 1);
    }

    #[test]
    fn test_route_point_without_point_telemetry() {
        let ctx = context();
        ctx.route_point(point(10.0), false);

        assert_eq!(ctx.windows.len(2), 1);
        assert!(ctx.outbound.is_empty());
    }

    #[test]
    fn test_outbound_drops_oldest() {
        let mut config = Config::with_sweep("mock", 290.0, 70.0);
        config.pipeline.outbound_capacity = 2;
        let ctx = PipelineContext::new(&config);

        for angle in [300.0, 310.0, 320.0] {
            ctx.route_point(point(angle), true);
        }
        assert_eq!(ctx.outbound.pop().map(|p| p.angle), Some(310.0));
        assert_eq!(ctx.outbound.pop().map(|p| p.angle), Some(320.0));
        assert_eq!(ctx.stats.snapshot().outbound_overflows, 1);
    }

    #[test]
    fn test_router_exits_when_queue_closed() {
        let ctx = context();
        ctx.ingest.push(point(0.0));
        let worker_ctx = ctx.clone();
        let handle = thread::spawn(move || run_router(worker_ctx, true));

        ctx.ingest.close();
        handle.join().unwrap();
        assert!(ctx.ingest.is_empty());
        assert_eq!(ctx.stats.snapshot().points_routed, 1);
    }
}
