//! Constants for the LDROBOT LD06 lidar protocol

// Frame layout
pub const SENTINEL: u8 = 0x54; // First byte of every frame
pub const LENGTH_MASK: u8 = 0x0F; // Low bits of the length byte = measurement count
pub const LENGTH_FLAGS: u8 = 0x20; // High bits of the length byte, fixed by the firmware
pub const MEASUREMENT_SIZE: usize = 3; // distance LSB, distance MSB, confidence
pub const MAX_MEASUREMENTS: u8 = 12; // Fixed by the sensor firmware
pub const FRAME_OVERHEAD: usize = 11; // SENTINEL(1) + LEN(1) + SPEED(2) + START(2) + END(2) + TS(2) + CRC(1)
pub const MAX_FRAME_SIZE: usize = FRAME_OVERHEAD + MEASUREMENT_SIZE * LENGTH_MASK as usize;

// Offsets into a raw frame
pub const OFFSET_MEASUREMENTS: usize = 6;

// Timing
pub const TIMESTAMP_WRAP_MS: u16 = 30_000; // Sensor timestamp recounts from 0 at this value

// Serial link
pub const LD06_BAUD_RATE: u32 = 230_400;
pub const READ_CHUNK_SIZE: usize = 512;
