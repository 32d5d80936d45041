//! Acquisition state machine and the interrupt-context sampling core.
//!
//! The interrupt side of the pipeline is deliberately tiny: per data-ready
//! edge it runs one bounded register burst, one lock-free enqueue attempt
//! and a couple of atomic stores. Everything slower, in particular the
//! multi-transaction stop sequence, happens in task context; the interrupt
//! side only ever raises a flag to ask for it.

use heapless::spsc::Producer;
use portable_atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use crate::message::{DeviceState, ErrorCode, ImuSample};
use crate::settings::{AccelRange, FilterConfig, GyroRange, OutputDataRate, SamplingRequest};

/// One physical-unit reading of all six axes plus the die temperature.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Reading {
    pub accel_x: f32,
    pub accel_y: f32,
    pub accel_z: f32,
    pub gyro_x: f32,
    pub gyro_y: f32,
    pub gyro_z: f32,
    pub temp_c: f32,
}

/// Capability interface to the motion sensor.
///
/// The firmware provides the ICM-42688-P implementation; tests provide
/// fakes. The data-ready interrupt source belongs to the same capability
/// but is armed and disarmed by the caller around sessions, so it does
/// not appear here.
pub trait InertialSensor {
    type Error;

    /// One-time bring-up; a failure here is a fatal communication error.
    fn begin(&mut self) -> Result<(), Self::Error>;

    /// Apply rate, ranges and anti-alias filter from a clean baseline.
    fn configure(
        &mut self,
        rate: OutputDataRate,
        accel_range: AccelRange,
        gyro_range: GyroRange,
        filter: &FilterConfig,
    ) -> Result<(), Self::Error>;

    fn set_accel_power(&mut self, on: bool) -> Result<(), Self::Error>;
    fn set_gyro_power(&mut self, on: bool) -> Result<(), Self::Error>;

    /// Burst-read every axis and the temperature.
    fn read_all(&mut self) -> Result<Reading, Self::Error>;
}

/// Raw sample as queued from the interrupt context to the drain task.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SampleRecord {
    pub sequence: u64,
    pub accel_x: f32,
    pub accel_y: f32,
    pub accel_z: f32,
    pub gyro_x: f32,
    pub gyro_y: f32,
    pub gyro_z: f32,
}

impl From<SampleRecord> for ImuSample {
    fn from(r: SampleRecord) -> Self {
        Self {
            count: r.sequence,
            acc_x: r.accel_x,
            acc_y: r.accel_y,
            acc_z: r.accel_z,
            gyro_x: r.gyro_x,
            gyro_y: r.gyro_y,
            gyro_z: r.gyro_z,
        }
    }
}

/// State shared across the interrupt/task boundary.
///
/// Every field is a single-writer atomic read with plain loads on the
/// other side; no locks anywhere. The deferred-stop flag is set only from
/// interrupt context and cleared only by the task that performs the stop.
pub struct Shared {
    state: AtomicU8,
    error: AtomicU8,
    overflow: AtomicU32,
    deferred_stop: AtomicBool,
    last_temp_bits: AtomicU32,
}

impl Shared {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(DeviceState::Idle as u8),
            error: AtomicU8::new(ErrorCode::None as u8),
            overflow: AtomicU32::new(0),
            deferred_stop: AtomicBool::new(false),
            last_temp_bits: AtomicU32::new(0),
        }
    }

    pub fn state(&self) -> DeviceState {
        DeviceState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: DeviceState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub fn error_code(&self) -> ErrorCode {
        ErrorCode::from_u8(self.error.load(Ordering::Relaxed))
    }

    pub fn overflow_count(&self) -> u32 {
        self.overflow.load(Ordering::Relaxed)
    }

    fn count_overflow(&self) {
        self.overflow.fetch_add(1, Ordering::Relaxed);
    }

    pub fn last_temperature(&self) -> f32 {
        f32::from_bits(self.last_temp_bits.load(Ordering::Relaxed))
    }

    pub fn record_temperature(&self, temp_c: f32) {
        self.last_temp_bits.store(temp_c.to_bits(), Ordering::Relaxed);
    }

    pub fn stop_requested(&self) -> bool {
        self.deferred_stop.load(Ordering::Acquire)
    }

    fn request_stop(&self) {
        self.deferred_stop.store(true, Ordering::Release);
    }

    fn clear_stop_request(&self) {
        self.deferred_stop.store(false, Ordering::Release);
    }
}

impl Default for Shared {
    fn default() -> Self {
        Self::new()
    }
}

/// One live sampling run, owned by the interrupt context for its whole
/// lifetime.
pub struct Session {
    sequence: u64,
    limit: u64,
}

impl Session {
    /// Data-ready handler. Bounded, non-blocking, no locks.
    pub fn on_data_ready<S, const N: usize>(
        &mut self,
        sensor: &mut S,
        queue: &mut Producer<'_, SampleRecord, N>,
        shared: &Shared,
    ) where
        S: InertialSensor,
    {
        if self.limit != 0 && self.sequence >= self.limit {
            // the stop sequence is several bus transactions, far too slow
            // for this context; flag it and let a task do it
            shared.request_stop();
            return;
        }
        let Ok(reading) = sensor.read_all() else {
            // mid-session bus glitch: nothing to report it through, drop
            return;
        };
        shared.record_temperature(reading.temp_c);
        let record = SampleRecord {
            sequence: self.sequence,
            accel_x: reading.accel_x,
            accel_y: reading.accel_y,
            accel_z: reading.accel_z,
            gyro_x: reading.gyro_x,
            gyro_y: reading.gyro_y,
            gyro_z: reading.gyro_z,
        };
        if queue.enqueue(record).is_err() {
            // never evict queued samples to make room; count and move on,
            // the sequence gap tells the host what was lost
            shared.count_overflow();
        }
        self.sequence += 1;
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

/// The Idle/Sampling/Error lifecycle.
///
/// Start and stop run in task context on the same core that services the
/// data-ready interrupt; the [`Session`] a start returns is what crosses
/// over to the interrupt side.
pub struct Controller<'a> {
    shared: &'a Shared,
}

impl<'a> Controller<'a> {
    pub const fn new(shared: &'a Shared) -> Self {
        Self { shared }
    }

    /// Sensor bring-up. A communication failure here latches the terminal
    /// Error state; only an external reset recovers from it.
    pub fn begin<S: InertialSensor>(&mut self, sensor: &mut S) -> Result<(), S::Error> {
        sensor.begin().map_err(|e| {
            self.shared.error.store(ErrorCode::SensorComms as u8, Ordering::Relaxed);
            self.shared.set_state(DeviceState::Error);
            e
        })
    }

    /// Idle to Sampling: apply the whole request, reset the session
    /// counters, clear any stale stop request. The caller arms the
    /// data-ready interrupt with the returned session.
    pub fn start<S: InertialSensor>(
        &mut self,
        sensor: &mut S,
        request: &SamplingRequest,
    ) -> Result<Session, S::Error> {
        sensor.configure(
            request.rate,
            request.accel_range,
            request.gyro_range,
            request.filter,
        )?;
        sensor.set_accel_power(true)?;
        sensor.set_gyro_power(true)?;
        self.shared.overflow.store(0, Ordering::Relaxed);
        self.shared.clear_stop_request();
        self.shared.set_state(DeviceState::Sampling);
        Ok(Session {
            sequence: 0,
            limit: request.limit,
        })
    }

    /// Sampling to Idle: power the channels down and clear the stop
    /// request. The caller has already disarmed the interrupt and taken
    /// the session back.
    pub fn stop<S: InertialSensor>(&mut self, sensor: &mut S) -> Result<(), S::Error> {
        sensor.set_accel_power(false)?;
        sensor.set_gyro_power(false)?;
        self.shared.clear_stop_request();
        self.shared.set_state(DeviceState::Idle);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapless::spsc::Queue;

    #[derive(Default)]
    struct FakeSensor {
        fail_begin: bool,
        began: bool,
        configured: Option<(OutputDataRate, AccelRange, GyroRange, u16)>,
        accel_on: bool,
        gyro_on: bool,
        reads: u32,
    }

    impl InertialSensor for FakeSensor {
        type Error = ();

        fn begin(&mut self) -> Result<(), ()> {
            if self.fail_begin {
                return Err(());
            }
            self.began = true;
            Ok(())
        }

        fn configure(
            &mut self,
            rate: OutputDataRate,
            accel_range: AccelRange,
            gyro_range: GyroRange,
            filter: &FilterConfig,
        ) -> Result<(), ()> {
            self.configured = Some((rate, accel_range, gyro_range, filter.bandwidth_hz));
            Ok(())
        }

        fn set_accel_power(&mut self, on: bool) -> Result<(), ()> {
            self.accel_on = on;
            Ok(())
        }

        fn set_gyro_power(&mut self, on: bool) -> Result<(), ()> {
            self.gyro_on = on;
            Ok(())
        }

        fn read_all(&mut self) -> Result<Reading, ()> {
            self.reads += 1;
            Ok(Reading {
                accel_x: 0.0,
                accel_y: 0.0,
                accel_z: 1.0,
                gyro_x: 0.0,
                gyro_y: 0.0,
                gyro_z: 0.0,
                temp_c: 25.5,
            })
        }
    }

    fn request(limit: u64) -> SamplingRequest {
        SamplingRequest {
            rate: OutputDataRate::Hz1k,
            accel_range: AccelRange::G16,
            gyro_range: GyroRange::Dps2000,
            filter: &crate::settings::FILTER_CONFIGS[0],
            limit,
        }
    }

    #[test]
    fn begin_failure_latches_error_state() {
        let shared = Shared::new();
        let mut controller = Controller::new(&shared);
        let mut sensor = FakeSensor {
            fail_begin: true,
            ..Default::default()
        };
        assert!(controller.begin(&mut sensor).is_err());
        assert_eq!(shared.state(), DeviceState::Error);
        assert_eq!(shared.error_code(), ErrorCode::SensorComms);
    }

    #[test]
    fn start_applies_config_and_resets_counters() {
        let shared = Shared::new();
        let mut controller = Controller::new(&shared);
        let mut sensor = FakeSensor::default();

        // leftovers from a previous run must not leak into the next one
        shared.count_overflow();
        shared.count_overflow();
        shared.request_stop();

        let session = controller.start(&mut sensor, &request(0)).unwrap();
        assert_eq!(session.sequence(), 0);
        assert_eq!(shared.overflow_count(), 0);
        assert!(!shared.stop_requested());
        assert_eq!(shared.state(), DeviceState::Sampling);
        assert!(sensor.accel_on && sensor.gyro_on);
        assert_eq!(
            sensor.configured,
            Some((OutputDataRate::Hz1k, AccelRange::G16, GyroRange::Dps2000, 42))
        );
    }

    #[test]
    fn stop_powers_down_and_returns_to_idle() {
        let shared = Shared::new();
        let mut controller = Controller::new(&shared);
        let mut sensor = FakeSensor::default();
        let _ = controller.start(&mut sensor, &request(0)).unwrap();
        controller.stop(&mut sensor).unwrap();
        assert_eq!(shared.state(), DeviceState::Idle);
        assert!(!sensor.accel_on && !sensor.gyro_on);
    }

    #[test]
    fn full_queue_counts_overflow_without_blocking() {
        let shared = Shared::new();
        let mut controller = Controller::new(&shared);
        let mut sensor = FakeSensor::default();
        let mut session = controller.start(&mut sensor, &request(0)).unwrap();

        // a Queue<_, 5> holds 4 elements
        let mut queue: Queue<SampleRecord, 5> = Queue::new();
        let (mut producer, mut consumer) = queue.split();
        for _ in 0..7 {
            session.on_data_ready(&mut sensor, &mut producer, &shared);
        }
        assert_eq!(shared.overflow_count(), 3);
        assert_eq!(session.sequence(), 7);

        // sequence numbers reveal exactly which samples were kept
        let kept: std::vec::Vec<u64> =
            core::iter::from_fn(|| consumer.dequeue()).map(|r| r.sequence).collect();
        assert_eq!(kept, vec![0, 1, 2, 3]);
    }

    #[test]
    fn temperature_is_recorded_per_sample() {
        let shared = Shared::new();
        let mut controller = Controller::new(&shared);
        let mut sensor = FakeSensor::default();
        let mut session = controller.start(&mut sensor, &request(0)).unwrap();
        let mut queue: Queue<SampleRecord, 5> = Queue::new();
        let (mut producer, _consumer) = queue.split();
        session.on_data_ready(&mut sensor, &mut producer, &shared);
        assert_eq!(shared.last_temperature(), 25.5);
    }

    #[test]
    fn sample_limit_raises_deferred_stop_exactly_at_n() {
        let shared = Shared::new();
        let mut controller = Controller::new(&shared);
        let mut sensor = FakeSensor::default();
        let mut session = controller.start(&mut sensor, &request(3)).unwrap();
        let mut queue: Queue<SampleRecord, 8> = Queue::new();
        let (mut producer, mut consumer) = queue.split();

        for _ in 0..3 {
            session.on_data_ready(&mut sensor, &mut producer, &shared);
            assert!(!shared.stop_requested());
        }
        // limit reached: no more reads, no more records, only the flag
        for _ in 0..4 {
            session.on_data_ready(&mut sensor, &mut producer, &shared);
        }
        assert!(shared.stop_requested());
        assert_eq!(sensor.reads, 3);

        let sequences: std::vec::Vec<u64> =
            core::iter::from_fn(|| consumer.dequeue()).map(|r| r.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2]);

        // the task side completes the deferred transition
        controller.stop(&mut sensor).unwrap();
        assert!(!shared.stop_requested());
        assert_eq!(shared.state(), DeviceState::Idle);
    }

    #[test]
    fn restart_resets_sequence_and_overflow() {
        let shared = Shared::new();
        let mut controller = Controller::new(&shared);
        let mut sensor = FakeSensor::default();
        let mut queue: Queue<SampleRecord, 3> = Queue::new();
        let (mut producer, mut consumer) = queue.split();

        let mut session = controller.start(&mut sensor, &request(0)).unwrap();
        for _ in 0..5 {
            session.on_data_ready(&mut sensor, &mut producer, &shared);
        }
        assert!(shared.overflow_count() > 0);
        controller.stop(&mut sensor).unwrap();
        while consumer.dequeue().is_some() {}

        let mut session = controller.start(&mut sensor, &request(0)).unwrap();
        assert_eq!(shared.overflow_count(), 0);
        session.on_data_ready(&mut sensor, &mut producer, &shared);
        assert_eq!(consumer.dequeue().unwrap().sequence, 0);
        assert_eq!(session.sequence(), 1);
    }
}
