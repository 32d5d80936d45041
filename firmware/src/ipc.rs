use embassy_sync::{
    blocking_mutex::raw::CriticalSectionRawMutex as RawMutex, channel::Channel, signal::Signal,
};
use heapless::Vec;

use microquake_link::acquisition::{Session, Shared};
use microquake_link::packet::MAX_PACKET;

use crate::config::*;
use crate::drivers::icm42688p::Icm42688p;

/// Cross-context acquisition state: device state, error code, overflow
/// counter, deferred-stop flag, last-measured temperature.
pub static ACQ_SHARED: Shared = Shared::new();

/// One encoded wire packet queued for the USB sender.
pub type WireFrame = Vec<u8, MAX_PACKET>;

pub type OneShotSender<T> = embassy_sync::channel::Sender<'static, RawMutex, T, 1>;

/// Everything the sampler needs for one run. The sensor travels with the
/// session so no lock ever guards the bus: whoever holds the struct owns
/// the hardware.
pub struct SamplerRun {
    pub sensor: Icm42688p,
    pub session: Session,
}

/* sampler hand-off */
pub static SAMPLER_START: Channel<RawMutex, SamplerRun, 1> = Channel::new();
pub static SAMPLER_STOP: Signal<RawMutex, ()> = Signal::new();
pub static SAMPLER_RETURN: Channel<RawMutex, Icm42688p, 1> = Channel::new();

/// Wakes the drain task after each data-ready serviced.
pub static SAMPLES_READY: Signal<RawMutex, ()> = Signal::new();

/* outbound frames: samples, status, device info */
pub static FRAME_CH: Channel<RawMutex, WireFrame, FRAME_CHANNEL_SIZE> = Channel::new();

/* on-demand temperature read while idle (status reporter -> control task) */
pub static TEMP_QUERY: Channel<RawMutex, OneShotSender<f32>, 1> = Channel::new();
pub static TEMP_REPLY: Channel<RawMutex, f32, 1> = Channel::new();
