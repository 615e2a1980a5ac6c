//! Mock transport for testing

use super::Transport;
use crate::error::Result;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// In-memory byte source
///
/// Clones share the same buffer, so a test keeps one handle to inject bytes
/// while the reader thread owns the other. Reads on an empty buffer wait up
/// to the configured timeout, like a serial port would.
#[derive(Clone)]
pub struct MockTransport {
    inner: Arc<MockTransportInner>,
    read_timeout: Duration,
}

struct MockTransportInner {
    read_buffer: Mutex<VecDeque<u8>>,
    data_ready: Condvar,
}

impl MockTransport {
    /// Create a new mock transport
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_millis(5))
    }

    /// Create a mock transport whose empty reads wait `read_timeout`
    pub fn with_timeout(read_timeout: Duration) -> Self {
        MockTransport {
            inner: Arc::new(MockTransportInner {
                read_buffer: Mutex::new(VecDeque::new()),
                data_ready: Condvar::new(),
            }),
            read_timeout,
        }
    }

    /// Inject data to be read
    pub fn inject_read(&self, data: &[u8]) {
        self.inner.read_buffer.lock().extend(data);
        self.inner.data_ready.notify_all();
    }

    /// Bytes not yet consumed by a reader
    pub fn pending(&self) -> usize {
        self.inner.read_buffer.lock().len()
    }

    /// Clear read buffer
    pub fn clear_read(&self) {
        self.inner.read_buffer.lock().clear();
    }
}

impl Transport for MockTransport {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let mut read_buffer = self.inner.read_buffer.lock();
        if read_buffer.is_empty() {
            self.inner
                .data_ready
                .wait_for(&mut read_buffer, self.read_timeout);
        }

        let available = read_buffer.len().min(buffer.len());
        for (slot, byte) in buffer.iter_mut().zip(read_buffer.drain(..available)) {
            *slot = byte;
        }

        Ok(available)
    }

    fn available(&mut self) -> Result<usize> {
        Ok(self.inner.read_buffer.lock().len())
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}
