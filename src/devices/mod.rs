//! Device implementations

pub mod ld06;

#[cfg(feature = "mock")]
pub mod mock;

use crate::config::LidarConfig;
use crate::error::Result;
use crate::transport::{SerialTransport, Transport};

/// Port name selecting the simulated sensor
pub const MOCK_PORT: &str = "mock";

/// Open the byte source named by `lidar.port`
pub fn open_transport(config: &LidarConfig) -> Result<Box<dyn Transport>> {
    if config.port == MOCK_PORT {
        return open_mock(config);
    }
    let transport = SerialTransport::open(&config.port, config.baud_rate, config.read_timeout())?;
    Ok(Box::new(transport))
}

#[cfg(feature = "mock")]
fn open_mock(config: &LidarConfig) -> Result<Box<dyn Transport>> {
    Ok(Box::new(mock::SimulatedLd06::new(
        mock::Room::default(),
        0,
        config.read_timeout(),
    )))
}

#[cfg(not(feature = "mock"))]
fn open_mock(_config: &LidarConfig) -> Result<Box<dyn Transport>> {
    Err(crate::error::Error::Config(
        "lidar.port = \"mock\" requires the `mock` feature".to_string(),
    ))
}
