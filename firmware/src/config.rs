// Centralize all configuration constants
pub const SENSOR_SPI_HZ: u32 = 25_000_000;
pub const SENSOR_CLKIN_HZ: u32 = 32_000;
pub const STATUS_INTERVAL_MS: u64 = 500;
pub const STOP_POLL_INTERVAL_MS: u64 = 10;

// Channel sizes
pub const SAMPLE_QUEUE_SIZE: usize = 128;
pub const FRAME_CHANNEL_SIZE: usize = 8;

// USB identity (Raspberry Pi VID + CDC PID)
pub const USB_VID: u16 = 0x2E8A;
pub const USB_PID: u16 = 0x000A;

pub const FIRMWARE_VERSION: &str = "1.0.1";
