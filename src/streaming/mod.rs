//! Line-oriented telemetry output

pub mod emitter;
pub mod messages;
pub mod sink;

pub use emitter::TelemetryEmitter;
pub use messages::TelemetryMessage;
pub use sink::{MemorySink, TcpSink, TelemetrySink, create_sink};

#[cfg(unix)]
pub use sink::UnixSocketSink;
