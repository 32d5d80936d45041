#![cfg_attr(not(test), no_std)]

pub mod acquisition;
pub mod cobs;
pub mod message;
pub mod packet;
pub mod settings;

pub use acquisition::{Controller, InertialSensor, Reading, SampleRecord, Session, Shared};
pub use message::{Command, CommandAction, DeviceInfo, DeviceState, ErrorCode, ImuSample, StatusReport};
pub use packet::{Deframer, InboundFrame, PacketType};
pub use settings::SamplingRequest;
