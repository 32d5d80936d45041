//! Periodic health telemetry, independent of sampling activity.

use defmt::*;
use embassy_executor::task;
use embassy_time::{Duration, Ticker};

use microquake_link::message::{DeviceState, StatusReport};
use microquake_link::packet::PacketType;

use crate::config::STATUS_INTERVAL_MS;
use crate::ipc::{ACQ_SHARED, FRAME_CH, TEMP_QUERY, TEMP_REPLY};

/// Emits one status packet per tick whatever the device is doing. While
/// sampling the temperature piggybacks on the last sample read; while
/// idle the control task takes a fresh reading on request; in the error
/// state the bus is never touched again.
#[task]
pub async fn status_task() {
    let mut ticker = Ticker::every(Duration::from_millis(STATUS_INTERVAL_MS));
    loop {
        ticker.next().await;

        let state = ACQ_SHARED.state();
        let temperature = match state {
            DeviceState::Idle => {
                TEMP_QUERY.send(TEMP_REPLY.sender()).await;
                TEMP_REPLY.receive().await
            }
            _ => ACQ_SHARED.last_temperature(),
        };

        let report = StatusReport {
            temperature,
            state,
            error_code: ACQ_SHARED.error_code(),
            missed_samples: ACQ_SHARED.overflow_count(),
        };
        debug!("status: {}", report);
        if let Some(frame) = super::link::encode_frame(PacketType::Status, &report) {
            FRAME_CH.send(frame).await;
        }
    }
}
