//! Configuration for drishti-io
//!
//! Loaded once from a TOML file at startup and never mutated afterwards.
//! Only the lidar port and the sweep angles are mandatory; every other key
//! falls back to the sensor's usual operating values.

use crate::devices::ld06::constants::TIMESTAMP_WRAP_MS;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Longest sliding window whose point ages stay unambiguous across the
/// sensor timestamp wrap
pub const MAX_KEEPING_LENGTH_MS: u16 = TIMESTAMP_WRAP_MS / 2;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub lidar: LidarConfig,
    pub zones: ZoneConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// LD06 serial link
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LidarConfig {
    /// Serial port path, or `"mock"` for the simulated sensor
    pub port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Upper bound on a single blocking read
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// Replay the bytes of a frame that failed its CRC, looking for a sentinel
    /// that arrived mid-frame
    #[serde(default = "default_true")]
    pub resync_on_crc_error: bool,
}

/// Sweep geometry and aggregation policy
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ZoneConfig {
    /// Sweep start in degrees (inclusive)
    pub sweep_start_deg: f64,
    /// Sweep end in degrees (exclusive); may be below the start to wrap through 0°
    pub sweep_end_deg: f64,
    /// Sliding window length in sensor milliseconds
    #[serde(default = "default_keeping_length_ms")]
    pub keeping_length_ms: u16,
    /// Points must be strictly above this confidence to count
    #[serde(default = "default_min_confidence")]
    pub min_confidence: u8,
    #[serde(default = "default_aggregation_interval_ms")]
    pub aggregation_interval_ms: u64,
}

/// Queue sizing
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Decoder → router queue capacity (drop-oldest)
    #[serde(default = "default_ingest_capacity")]
    pub ingest_capacity: usize,
    /// Router → emitter point queue capacity (drop-oldest)
    #[serde(default = "default_outbound_capacity")]
    pub outbound_capacity: usize,
}

/// Outbound line stream
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    /// `unix:<path>` or `tcp:<host>:<port>`
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
    #[serde(default = "default_emit_interval_ms")]
    pub emit_interval_ms: u64,
    /// Stream individual in-sweep points as well as zone ranges
    #[serde(default = "default_true")]
    pub emit_points: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Parsed `telemetry.endpoint`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Unix(PathBuf),
    Tcp(String),
}

fn default_baud_rate() -> u32 {
    230_400
}

fn default_read_timeout_ms() -> u64 {
    500
}

fn default_true() -> bool {
    true
}

fn default_keeping_length_ms() -> u16 {
    250
}

fn default_min_confidence() -> u8 {
    200
}

fn default_aggregation_interval_ms() -> u64 {
    100
}

fn default_ingest_capacity() -> usize {
    10_000
}

fn default_outbound_capacity() -> usize {
    5_000
}

fn default_endpoint() -> String {
    "unix:/tmp/drishti.sock".to_string()
}

fn default_send_timeout_ms() -> u64 {
    500
}

fn default_emit_interval_ms() -> u64 {
    50
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ingest_capacity: default_ingest_capacity(),
            outbound_capacity: default_outbound_capacity(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            send_timeout_ms: default_send_timeout_ms(),
            emit_interval_ms: default_emit_interval_ms(),
            emit_points: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LidarConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl ZoneConfig {
    pub fn aggregation_interval(&self) -> Duration {
        Duration::from_millis(self.aggregation_interval_ms)
    }
}

impl TelemetryConfig {
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    pub fn emit_interval(&self) -> Duration {
        Duration::from_millis(self.emit_interval_ms)
    }

    /// Parse the endpoint URI
    pub fn parse_endpoint(&self) -> Result<Endpoint> {
        if let Some(path) = self.endpoint.strip_prefix("unix:") {
            if path.is_empty() {
                return Err(Error::Config("telemetry.endpoint: empty socket path".into()));
            }
            Ok(Endpoint::Unix(PathBuf::from(path)))
        } else if let Some(addr) = self.endpoint.strip_prefix("tcp:") {
            if !addr.contains(':') {
                return Err(Error::Config(format!(
                    "telemetry.endpoint: expected tcp:<host>:<port>, got {}",
                    self.endpoint
                )));
            }
            Ok(Endpoint::Tcp(addr.to_string()))
        } else {
            Err(Error::Config(format!(
                "telemetry.endpoint: unknown scheme in {}",
                self.endpoint
            )))
        }
    }
}

impl Config {
    /// Load and validate configuration from a TOML file
    ///
    /// # Example
    /// ```no_run
    /// use drishti_io::config::Config;
    ///
    /// let config = Config::from_file("drishti.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Configuration for a given port and sweep with every other value defaulted
    pub fn with_sweep(port: &str, sweep_start_deg: f64, sweep_end_deg: f64) -> Self {
        Self {
            lidar: LidarConfig {
                port: port.to_string(),
                baud_rate: default_baud_rate(),
                read_timeout_ms: default_read_timeout_ms(),
                resync_on_crc_error: true,
            },
            zones: ZoneConfig {
                sweep_start_deg,
                sweep_end_deg,
                keeping_length_ms: default_keeping_length_ms(),
                min_confidence: default_min_confidence(),
                aggregation_interval_ms: default_aggregation_interval_ms(),
            },
            pipeline: PipelineConfig::default(),
            telemetry: TelemetryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Reject values no pipeline stage can run with
    pub fn validate(&self) -> Result<()> {
        if self.lidar.port.trim().is_empty() {
            return Err(Error::Config("lidar.port must not be empty".into()));
        }
        if self.lidar.baud_rate == 0 {
            return Err(Error::Config("lidar.baud_rate must be positive".into()));
        }
        if self.lidar.read_timeout_ms == 0 {
            return Err(Error::Config("lidar.read_timeout_ms must be positive".into()));
        }
        for (key, value) in [
            ("zones.sweep_start_deg", self.zones.sweep_start_deg),
            ("zones.sweep_end_deg", self.zones.sweep_end_deg),
        ] {
            if !value.is_finite() || !(0.0..=360.0).contains(&value) {
                return Err(Error::Config(format!(
                    "{key} must be within [0, 360], got {value}"
                )));
            }
        }
        if self.zones.keeping_length_ms == 0
            || self.zones.keeping_length_ms > MAX_KEEPING_LENGTH_MS
        {
            return Err(Error::Config(format!(
                "zones.keeping_length_ms must be within [1, {}], got {}",
                MAX_KEEPING_LENGTH_MS, self.zones.keeping_length_ms
            )));
        }
        if self.zones.aggregation_interval_ms == 0 {
            return Err(Error::Config(
                "zones.aggregation_interval_ms must be positive".into(),
            ));
        }
        if self.pipeline.ingest_capacity == 0 || self.pipeline.outbound_capacity == 0 {
            return Err(Error::Config("pipeline capacities must be positive".into()));
        }
        if self.telemetry.emit_interval_ms == 0 {
            return Err(Error::Config("telemetry.emit_interval_ms must be positive".into()));
        }
        if self.telemetry.send_timeout_ms == 0 {
            return Err(Error::Config("telemetry.send_timeout_ms must be positive".into()));
        }
        self.telemetry.parse_endpoint()?;
        Ok(())
    }
}
