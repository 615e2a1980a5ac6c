//! Telemetry output channels.
//!
//! A sink carries complete lines to one consumer. The emitter owns the sink,
//! so implementations need no internal locking. Writes block for at most the
//! configured send timeout; any failure leaves the sink disconnected until
//! the next successful [`TelemetrySink::connect`].

use crate::config::{Endpoint, TelemetryConfig};
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::io::Write;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

#[cfg(unix)]
use std::os::unix::net::UnixStream;
#[cfg(unix)]
use std::path::PathBuf;

/// Destination for telemetry lines
pub trait TelemetrySink: Send {
    /// Establish the connection; a no-op when already connected
    fn connect(&mut self) -> Result<()>;

    fn is_connected(&self) -> bool;

    /// Write one complete line (terminator included)
    fn send_line(&mut self, line: &str) -> Result<()>;

    /// Drop the connection
    fn disconnect(&mut self);

    /// Human-readable destination for log messages
    fn describe(&self) -> String;
}

impl<S: TelemetrySink + ?Sized> TelemetrySink for Box<S> {
    fn connect(&mut self) -> Result<()> {
        (**self).connect()
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn send_line(&mut self, line: &str) -> Result<()> {
        (**self).send_line(line)
    }

    fn disconnect(&mut self) {
        (**self).disconnect()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

fn write_line<W: Write>(stream: &mut Option<W>, line: &str, name: &str) -> Result<()> {
    let Some(writer) = stream.as_mut() else {
        return Err(Error::ChannelUnavailable(format!("{} not connected", name)));
    };
    if let Err(e) = writer.write_all(line.as_bytes()) {
        *stream = None;
        return Err(e.into());
    }
    Ok(())
}

/// Unix domain socket stream (e.g. a local display or logger process)
#[cfg(unix)]
pub struct UnixSocketSink {
    path: PathBuf,
    send_timeout: Duration,
    stream: Option<UnixStream>,
}

#[cfg(unix)]
impl UnixSocketSink {
    pub fn new(path: impl Into<PathBuf>, send_timeout: Duration) -> Self {
        Self {
            path: path.into(),
            send_timeout,
            stream: None,
        }
    }
}

#[cfg(unix)]
impl TelemetrySink for UnixSocketSink {
    fn connect(&mut self) -> Result<()> {
        if self.stream.is_none() {
            let stream = UnixStream::connect(&self.path)?;
            stream.set_write_timeout(Some(self.send_timeout))?;
            self.stream = Some(stream);
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn send_line(&mut self, line: &str) -> Result<()> {
        write_line(&mut self.stream, line, "unix socket")
    }

    fn disconnect(&mut self) {
        self.stream = None;
    }

    fn describe(&self) -> String {
        format!("unix:{}", self.path.display())
    }
}

/// TCP client stream
pub struct TcpSink {
    address: String,
    send_timeout: Duration,
    stream: Option<TcpStream>,
}

impl TcpSink {
    pub fn new(address: impl Into<String>, send_timeout: Duration) -> Self {
        Self {
            address: address.into(),
            send_timeout,
            stream: None,
        }
    }
}

impl TelemetrySink for TcpSink {
    fn connect(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }
        let addr = self.address.to_socket_addrs()?.next().ok_or_else(|| {
            Error::ChannelUnavailable(format!("{} did not resolve", self.address))
        })?;
        let stream = TcpStream::connect_timeout(&addr, self.send_timeout)?;
        stream.set_write_timeout(Some(self.send_timeout))?;
        stream.set_nodelay(true)?;
        self.stream = Some(stream);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn send_line(&mut self, line: &str) -> Result<()> {
        write_line(&mut self.stream, line, "tcp stream")
    }

    fn disconnect(&mut self) {
        self.stream = None;
    }

    fn describe(&self) -> String {
        format!("tcp:{}", self.address)
    }
}

/// In-memory sink for tests and dry runs
///
/// Clones share the recorded lines and the availability switch, so a test
/// can keep one handle while the emitter owns another.
#[derive(Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
    unavailable: Arc<AtomicBool>,
    connected: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the consumer going away (`false`) or coming back (`true`)
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::Relaxed);
    }

    /// Every line received so far
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Remove and return every line received so far
    pub fn take_lines(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.lock())
    }

    fn available(&self) -> bool {
        !self.unavailable.load(Ordering::Relaxed)
    }
}

impl TelemetrySink for MemorySink {
    fn connect(&mut self) -> Result<()> {
        if !self.available() {
            return Err(Error::ChannelUnavailable("memory sink offline".into()));
        }
        self.connected = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn send_line(&mut self, line: &str) -> Result<()> {
        if !self.connected {
            return Err(Error::ChannelUnavailable("memory sink not connected".into()));
        }
        if !self.available() {
            self.connected = false;
            return Err(Error::ChannelUnavailable("memory sink offline".into()));
        }
        self.lines.lock().push(line.to_string());
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Build the sink selected by `telemetry.endpoint`
///
/// The sink starts disconnected; the emitter connects it on its first tick.
pub fn create_sink(config: &TelemetryConfig) -> Result<Box<dyn TelemetrySink>> {
    match config.parse_endpoint()? {
        #[cfg(unix)]
        Endpoint::Unix(path) => Ok(Box::new(UnixSocketSink::new(path, config.send_timeout()))),
        #[cfg(not(unix))]
        Endpoint::Unix(path) => Err(Error::Config(format!(
            "unix socket endpoint {} is not supported on this platform",
            path.display()
        ))),
        Endpoint::Tcp(address) => Ok(Box::new(TcpSink::new(address, config.send_timeout()))),
    }
}
