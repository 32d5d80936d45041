//! USB link plumbing: outbound frame serialization, inbound byte-stream
//! parsing and command dispatch.

use defmt::*;
use embassy_executor::task;
use embassy_futures::select::{select3, Either3};
use embassy_rp::gpio::Output;
use embassy_rp::peripherals::USB;
use embassy_rp::usb::Driver;
use embassy_time::{Duration, Ticker};
use embassy_usb::class::cdc_acm::{Receiver, Sender};
use embassy_usb::driver::EndpointError;
use embassy_usb::UsbDevice;
use heapless::spsc::Consumer;
use heapless::String;

use microquake_link::acquisition::{Controller, SampleRecord};
use microquake_link::message::{self, Command, CommandAction, DeviceInfo, DeviceState, ImuSample};
use microquake_link::packet::{encode_packet, Deframer, InboundFrame, PacketType, MAX_PAYLOAD};
use microquake_link::settings::SamplingRequest;

use crate::config::{FIRMWARE_VERSION, SAMPLE_QUEUE_SIZE, STOP_POLL_INTERVAL_MS};
use crate::drivers::icm42688p::Icm42688p;
use crate::ipc::{
    SamplerRun, WireFrame, ACQ_SHARED, FRAME_CH, SAMPLER_RETURN, SAMPLER_START, SAMPLER_STOP,
    SAMPLES_READY, TEMP_QUERY,
};

#[task]
pub async fn usb_task(mut usb: UsbDevice<'static, Driver<'static, USB>>) {
    usb.run().await;
}

/// Serialize a message straight into a ready-to-send wire frame.
pub(crate) fn encode_frame<T: serde::Serialize>(
    packet_type: PacketType,
    msg: &T,
) -> Option<WireFrame> {
    let mut payload = [0u8; MAX_PAYLOAD];
    let len = match message::encode(msg, &mut payload) {
        Ok(len) => len,
        Err(_) => {
            warn!("message does not fit a packet payload, dropping");
            return None;
        }
    };
    let mut wire = WireFrame::new();
    wire.resize_default(wire.capacity()).ok()?;
    let n = encode_packet(packet_type, &payload[..len], &mut wire).ok()?;
    wire.truncate(n);
    Some(wire)
}

/// Pushes every outbound frame onto the CDC endpoint. Frames are dropped
/// whole while the host is away so the rest of the pipeline never backs
/// up on a dead link.
#[task]
pub async fn tx_task(mut tx: Sender<'static, Driver<'static, USB>>) {
    loop {
        let frame = FRAME_CH.receive().await;
        // host away: the frame is dropped whole rather than stalling here
        let _ = write_frame(&mut tx, &frame).await;
    }
}

async fn write_frame(
    tx: &mut Sender<'static, Driver<'static, USB>>,
    frame: &[u8],
) -> Result<(), EndpointError> {
    let max = tx.max_packet_size() as usize;
    for chunk in frame.chunks(max) {
        tx.write_packet(chunk).await?;
    }
    if frame.len() % max == 0 {
        // close out a full-sized final chunk so the host never waits
        tx.write_packet(&[]).await?;
    }
    Ok(())
}

/// Moves queued samples into wire frames, one packet per sample.
#[task]
pub async fn drain_task(mut queue: Consumer<'static, SampleRecord, SAMPLE_QUEUE_SIZE>) {
    loop {
        SAMPLES_READY.wait().await;
        while let Some(record) = queue.dequeue() {
            if let Some(frame) = encode_frame(PacketType::ImuSample, &ImuSample::from(record)) {
                FRAME_CH.send(frame).await;
            }
        }
    }
}

/// Owns the receive half of the link, the acquisition state machine, the
/// idle sensor and the LED. Also polls the deferred-stop flag the sampler
/// raises when a sample limit is reached.
#[task]
pub async fn control_task(
    mut rx: Receiver<'static, Driver<'static, USB>>,
    sensor: Icm42688p,
    mut usr_led: Output<'static>,
    unique_id: [u8; 8],
) {
    let mut controller = Controller::new(&ACQ_SHARED);
    let mut idle_sensor = Some(sensor);
    let mut deframer = Deframer::new();
    let mut stop_poll = Ticker::every(Duration::from_millis(STOP_POLL_INTERVAL_MS));
    let mut buf = [0u8; 64];

    loop {
        match select3(
            read_chunk(&mut rx, &mut buf),
            stop_poll.next(),
            TEMP_QUERY.receive(),
        )
        .await
        {
            Either3::First(n) => {
                for &byte in &buf[..n] {
                    if let Some(frame) = deframer.push(byte) {
                        handle_frame(
                            frame,
                            &mut controller,
                            &mut idle_sensor,
                            &mut usr_led,
                            &unique_id,
                        )
                        .await;
                    }
                }
            }
            Either3::Second(()) => {
                if ACQ_SHARED.stop_requested() {
                    stop_acquisition(&mut controller, &mut idle_sensor, &mut usr_led).await;
                }
            }
            Either3::Third(reply) => {
                // status reporter wants a fresh reading; only touch the
                // bus if the sensor is actually parked here
                let temp = match idle_sensor.as_mut() {
                    Some(sensor) if ACQ_SHARED.state() == DeviceState::Idle => sensor
                        .read_all()
                        .map(|r| r.temp_c)
                        .unwrap_or_else(|_| ACQ_SHARED.last_temperature()),
                    _ => ACQ_SHARED.last_temperature(),
                };
                reply.send(temp).await;
            }
        }
    }
}

/// One CDC chunk, waiting out any disconnect in between.
async fn read_chunk(rx: &mut Receiver<'static, Driver<'static, USB>>, buf: &mut [u8]) -> usize {
    loop {
        rx.wait_connection().await;
        match rx.read_packet(buf).await {
            Ok(n) => return n,
            Err(EndpointError::Disabled) => continue,
            Err(EndpointError::BufferOverflow) => {
                warn!("oversized CDC packet from host, dropping");
                continue;
            }
        }
    }
}

async fn handle_frame(
    frame: InboundFrame,
    controller: &mut Controller<'_>,
    idle_sensor: &mut Option<Icm42688p>,
    usr_led: &mut Output<'static>,
    unique_id: &[u8; 8],
) {
    if ACQ_SHARED.state() == DeviceState::Error {
        // terminal state: status keeps broadcasting the fault, commands
        // are not processed
        return;
    }
    match PacketType::from_wire(frame.packet_type) {
        Some(PacketType::Command) => {}
        _ => {
            warn!("dropping packet with type {:02X}", frame.packet_type);
            return;
        }
    }
    let cmd: Command = match message::decode(&frame.payload) {
        Ok(cmd) => cmd,
        Err(_) => {
            warn!("dropping undecodable command payload");
            return;
        }
    };

    match cmd.action {
        CommandAction::Handshake => {
            info!("handshake");
            let info = DeviceInfo {
                unique_id: *unique_id,
                firmware: String::try_from(FIRMWARE_VERSION).unwrap(),
            };
            if let Some(frame) = encode_frame(PacketType::DeviceInfo, &info) {
                FRAME_CH.send(frame).await;
            }
        }
        CommandAction::StartSampling => {
            let request = SamplingRequest::from_command(&cmd);
            start_acquisition(controller, idle_sensor, usr_led, &request).await;
        }
        CommandAction::StopSampling => {
            stop_acquisition(controller, idle_sensor, usr_led).await;
        }
    }
}

async fn start_acquisition(
    controller: &mut Controller<'_>,
    idle_sensor: &mut Option<Icm42688p>,
    usr_led: &mut Output<'static>,
    request: &SamplingRequest,
) {
    if ACQ_SHARED.state() == DeviceState::Sampling {
        // never reconfigure with the interrupt source live
        stop_acquisition(controller, idle_sensor, usr_led).await;
    }
    let Some(mut sensor) = idle_sensor.take() else {
        return;
    };
    match controller.start(&mut sensor, request) {
        Ok(session) => {
            info!(
                "sampling: {} aaf {} Hz limit {}",
                request.rate, request.filter.bandwidth_hz, request.limit
            );
            SAMPLER_START.send(SamplerRun { sensor, session }).await;
            usr_led.set_high();
        }
        Err(e) => {
            warn!("failed to apply sampling config: {}", e);
            *idle_sensor = Some(sensor);
        }
    }
}

async fn stop_acquisition(
    controller: &mut Controller<'_>,
    idle_sensor: &mut Option<Icm42688p>,
    usr_led: &mut Output<'static>,
) {
    match ACQ_SHARED.state() {
        DeviceState::Sampling => {
            SAMPLER_STOP.signal(());
            let mut sensor = SAMPLER_RETURN.receive().await;
            if let Err(e) = controller.stop(&mut sensor) {
                warn!("sensor power-down failed: {}", e);
            }
            *idle_sensor = Some(sensor);
            usr_led.set_low();
            info!("sampling stopped, {} missed", ACQ_SHARED.overflow_count());
        }
        DeviceState::Idle => {
            // redundant stop: power down again, harmless and idempotent
            if let Some(sensor) = idle_sensor.as_mut() {
                if let Err(e) = controller.stop(sensor) {
                    warn!("sensor power-down failed: {}", e);
                }
            }
            usr_led.set_low();
        }
        DeviceState::Error => {}
    }
}
