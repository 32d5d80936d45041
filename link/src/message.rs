//! Host-facing message set.
//!
//! These are the structured payloads carried inside packets, one struct
//! per packet type. Byte layout is owned by postcard; the packet layer
//! only ever sees the serialized form.

use heapless::String;
use serde::{Deserialize, Serialize};

/// Capacity of the firmware version field in [`DeviceInfo`].
pub const FIRMWARE_VERSION_MAX: usize = 16;

/// Streamed sample, one per data-ready event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ImuSample {
    pub count: u64,
    pub acc_x: f32,
    pub acc_y: f32,
    pub acc_z: f32,
    pub gyro_x: f32,
    pub gyro_y: f32,
    pub gyro_z: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum DeviceState {
    Idle = 0,
    Sampling = 1,
    Error = 2,
}

impl DeviceState {
    pub const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Sampling,
            2 => Self::Error,
            _ => Self::Idle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ErrorCode {
    None = 0,
    SensorComms = 1,
}

impl ErrorCode {
    pub const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::SensorComms,
            _ => Self::None,
        }
    }
}

/// Periodic health snapshot, sent regardless of sampling activity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusReport {
    pub temperature: f32,
    pub state: DeviceState,
    pub error_code: ErrorCode,
    pub missed_samples: u32,
}

/// Handshake reply identifying this probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceInfo {
    pub unique_id: [u8; 8],
    pub firmware: String<FIRMWARE_VERSION_MAX>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum CommandAction {
    Handshake = 0,
    StartSampling = 1,
    StopSampling = 2,
}

/// Host control message. The index fields select into the settings tables;
/// every index is validated (and clamped) by the dispatcher before it
/// reaches hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Command {
    pub action: CommandAction,
    pub filter_idx: u8,
    pub rate_idx: u8,
    pub accel_idx: u8,
    pub gyro_idx: u8,
    /// Number of samples to acquire; 0 means continuous.
    pub num_samples: u64,
}

/// Serialize `msg` into `buf`, returning the number of bytes written.
pub fn encode<T: Serialize>(msg: &T, buf: &mut [u8]) -> Result<usize, postcard::Error> {
    postcard::to_slice(msg, buf).map(|used| used.len())
}

/// Deserialize a message from an unstuffed payload.
pub fn decode<'a, T: Deserialize<'a>>(buf: &'a [u8]) -> Result<T, postcard::Error> {
    postcard::from_bytes(buf)
}
