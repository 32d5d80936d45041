//! Full-pipeline scenario: a framed host command in, framed sample and
//! status packets out, with the state machine in between driven the way
//! the firmware tasks drive it.

use core::convert::Infallible;

use heapless::spsc::Queue;
use microquake_link::{
    acquisition::{Controller, InertialSensor, Reading, SampleRecord, Session, Shared},
    message::{self, Command, CommandAction, DeviceState, ErrorCode, ImuSample, StatusReport},
    packet::{encode_packet, Deframer, InboundFrame, PacketType, MAX_PACKET, MAX_PAYLOAD},
    settings::{AccelRange, GyroRange, OutputDataRate, SamplingRequest},
};

struct ScriptedSensor {
    reads: u32,
}

impl InertialSensor for ScriptedSensor {
    type Error = Infallible;

    fn begin(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn configure(
        &mut self,
        _rate: OutputDataRate,
        _accel: AccelRange,
        _gyro: GyroRange,
        _filter: &microquake_link::settings::FilterConfig,
    ) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_accel_power(&mut self, _on: bool) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_gyro_power(&mut self, _on: bool) -> Result<(), Self::Error> {
        Ok(())
    }

    fn read_all(&mut self) -> Result<Reading, Self::Error> {
        let n = self.reads as f32;
        self.reads += 1;
        Ok(Reading {
            accel_x: n,
            accel_y: -n,
            accel_z: 1.0,
            gyro_x: 0.1 * n,
            gyro_y: 0.0,
            gyro_z: 0.0,
            temp_c: 24.0,
        })
    }
}

fn frame_command(cmd: &Command) -> Vec<u8> {
    let mut payload = [0u8; MAX_PAYLOAD];
    let n = message::encode(cmd, &mut payload).unwrap();
    let mut wire = [0u8; MAX_PACKET];
    let len = encode_packet(PacketType::Command, &payload[..n], &mut wire).unwrap();
    wire[..len].to_vec()
}

fn deframe_all(bytes: &[u8]) -> Vec<InboundFrame> {
    let mut deframer = Deframer::new();
    bytes.iter().filter_map(|&b| deframer.push(b)).collect()
}

#[test]
fn limited_acquisition_end_to_end() {
    let shared = Shared::new();
    let mut controller = Controller::new(&shared);
    let mut sensor = ScriptedSensor { reads: 0 };
    let mut queue: Queue<SampleRecord, 128> = Queue::new();
    let (mut producer, mut consumer) = queue.split();

    // host side: start sampling at 1 kHz, +-16 g, +-15.625 dps, 126 Hz
    // anti-alias, 5 samples
    let wire = frame_command(&Command {
        action: CommandAction::StartSampling,
        filter_idx: 2,
        rate_idx: 6,
        accel_idx: 3,
        gyro_idx: 0,
        num_samples: 5,
    });

    // device side: deframe, decode, dispatch
    let frames = deframe_all(&wire);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].packet_type, PacketType::Command as u8);
    let cmd: Command = message::decode(&frames[0].payload).unwrap();
    assert_eq!(cmd.action, CommandAction::StartSampling);

    let request = SamplingRequest::from_command(&cmd);
    assert_eq!(request.rate, OutputDataRate::Hz1k);
    assert_eq!(request.accel_range, AccelRange::G16);
    assert_eq!(request.gyro_range, GyroRange::Dps15_625);
    assert_eq!(request.filter.bandwidth_hz, 126);

    let mut session: Session = controller.start(&mut sensor, &request).unwrap();
    assert_eq!(shared.state(), DeviceState::Sampling);

    // data-ready edges keep firing until the deferred stop is honored,
    // exactly as the sampler task experiences it
    let mut edges = 0;
    while !shared.stop_requested() {
        session.on_data_ready(&mut sensor, &mut producer, &shared);
        edges += 1;
        assert!(edges < 100, "deferred stop never requested");
    }
    controller.stop(&mut sensor).unwrap();

    // drain task: every queued record becomes one framed sample packet
    let mut stream = Vec::new();
    while let Some(record) = consumer.dequeue() {
        let sample = ImuSample::from(record);
        let mut payload = [0u8; MAX_PAYLOAD];
        let n = message::encode(&sample, &mut payload).unwrap();
        let mut wire = [0u8; MAX_PACKET];
        let len = encode_packet(PacketType::ImuSample, &payload[..n], &mut wire).unwrap();
        stream.extend_from_slice(&wire[..len]);
    }

    // host side again: exactly five samples, sequences 0..4, nothing more
    let frames = deframe_all(&stream);
    assert_eq!(frames.len(), 5);
    for (i, frame) in frames.iter().enumerate() {
        assert_eq!(frame.packet_type, PacketType::ImuSample as u8);
        let sample: ImuSample = message::decode(&frame.payload).unwrap();
        assert_eq!(sample.count, i as u64);
        assert_eq!(sample.acc_x, i as f32);
    }

    // the next status tick reports the completed transition
    let status = StatusReport {
        temperature: shared.last_temperature(),
        state: shared.state(),
        error_code: shared.error_code(),
        missed_samples: shared.overflow_count(),
    };
    assert_eq!(status.state, DeviceState::Idle);
    assert_eq!(status.error_code, ErrorCode::None);
    assert_eq!(status.missed_samples, 0);
    assert_eq!(status.temperature, 24.0);
}

#[test]
fn out_of_range_accel_index_clamps_to_widest() {
    let wire = frame_command(&Command {
        action: CommandAction::StartSampling,
        filter_idx: 0,
        rate_idx: 0,
        accel_idx: 99,
        gyro_idx: 0,
        num_samples: 1,
    });
    let frames = deframe_all(&wire);
    let cmd: Command = message::decode(&frames[0].payload).unwrap();
    let request = SamplingRequest::from_command(&cmd);
    assert_eq!(request.accel_range, AccelRange::G16);
}

#[test]
fn stop_command_roundtrips_too() {
    let wire = frame_command(&Command {
        action: CommandAction::StopSampling,
        filter_idx: 0,
        rate_idx: 0,
        accel_idx: 0,
        gyro_idx: 0,
        num_samples: 0,
    });
    let frames = deframe_all(&wire);
    let cmd: Command = message::decode(&frames[0].payload).unwrap();
    assert_eq!(cmd.action, CommandAction::StopSampling);
}
