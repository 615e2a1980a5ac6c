//! Transport layer for I/O abstraction

use crate::error::Result;

pub mod mock;
mod serial;

pub use mock::MockTransport;
pub use serial::SerialTransport;

/// Byte source feeding the frame decoder
///
/// `read` blocks for at most the transport's read timeout. A timeout is not
/// an error: it returns `Ok(0)` and the caller simply tries again.
pub trait Transport: Send {
    /// Read data into buffer, returns number of bytes read (0 on timeout)
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize>;

    /// Check if data is available to read
    fn available(&mut self) -> Result<usize> {
        Ok(0)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        (**self).read(buffer)
    }

    fn available(&mut self) -> Result<usize> {
        (**self).available()
    }
}
