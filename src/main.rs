//! Drishti IO - LD06 lidar ingest daemon
//!
//! Reads the sensor, maintains four-zone minimum ranges over the configured
//! sweep and streams them as text lines to the telemetry endpoint.

use drishti_io::Config;
use drishti_io::devices::open_transport;
use drishti_io::error::{Error, Result};
use drishti_io::pipeline::Pipeline;
use drishti_io::streaming::create_sink;
use std::env;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// Parse config path from command line arguments.
///
/// Supports:
/// - `drishti-io <path>` (positional)
/// - `drishti-io --config <path>` (flag-based)
/// - `drishti-io -c <path>` (short flag)
///
/// Defaults to `/etc/drishti.toml` if not specified.
fn parse_config_path() -> String {
    let args: Vec<String> = env::args().collect();

    if let Some(i) = args
        .iter()
        .position(|arg| arg == "--config" || arg == "-c")
        && let Some(path) = args.get(i + 1)
    {
        return path.clone();
    }

    if let Some(path) = args.get(1)
        && !path.starts_with('-')
    {
        return path.clone();
    }

    "/etc/drishti.toml".to_string()
}

fn main() -> Result<()> {
    let config_path = parse_config_path();
    let config = Config::from_file(&config_path)?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    log::info!("Drishti IO v{} starting...", env!("CARGO_PKG_VERSION"));
    log::info!("Using config: {}", config_path);

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    let transport = open_transport(&config.lidar)?;
    let sink = create_sink(&config.telemetry)?;
    let mut pipeline = Pipeline::start(&config, transport, sink)?;

    log::info!("Drishti IO running. Press Ctrl-C to stop.");

    while running.load(Ordering::Relaxed) && pipeline.is_running() {
        thread::sleep(Duration::from_millis(100));
    }

    if let Some(name) = pipeline.stopped_worker() {
        log::error!("{} thread stopped unexpectedly", name);
    }
    log::info!("Shutting down...");
    pipeline.shutdown()?;

    let stats = pipeline.stats();
    log::info!(
        "Frames={} CRC errors={} ({:.2}%) malformed={} points={} overflows={} lines sent={} discarded={}",
        stats.frames_decoded,
        stats.crc_errors,
        stats.crc_error_rate(),
        stats.malformed_frames,
        stats.points_ingested,
        stats.ingest_overflows,
        stats.lines_sent,
        stats.lines_discarded
    );
    log::info!("Drishti IO stopped");
    Ok(())
}
