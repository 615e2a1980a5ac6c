//! Error types for drishti-io

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// drishti-io error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Serial port error
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration is missing or out of range
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file could not be parsed
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Telemetry payload serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Telemetry channel is not connected
    #[error("Telemetry channel unavailable: {0}")]
    ChannelUnavailable(String),

    /// A worker thread could not be spawned
    #[error("Failed to spawn thread: {0}")]
    ThreadSpawn(String),

    /// A worker thread panicked
    #[error("Thread panicked: {0}")]
    ThreadPanic(&'static str),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}
