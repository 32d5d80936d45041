//! Interrupt-context half of the pipeline.
//!
//! Runs on the interrupt executor, preempting all cooperative work. The
//! per-edge path is the bounded hot path: one sensor burst read, one
//! lock-free enqueue, a couple of atomic stores. Session start and stop
//! stay in task context; the sensor itself arrives and leaves through
//! the hand-off channels so nothing here ever waits on a lock.

use defmt::*;
use embassy_executor::task;
use embassy_futures::select::{select, Either};
use embassy_rp::gpio::Input;
use heapless::spsc::Producer;

use microquake_link::acquisition::SampleRecord;

use crate::config::SAMPLE_QUEUE_SIZE;
use crate::ipc::{
    SamplerRun, ACQ_SHARED, SAMPLER_RETURN, SAMPLER_START, SAMPLER_STOP, SAMPLES_READY,
};

#[task]
pub async fn sampler_task(
    mut data_ready: Input<'static>,
    mut queue: Producer<'static, SampleRecord, SAMPLE_QUEUE_SIZE>,
) {
    loop {
        let SamplerRun {
            mut sensor,
            mut session,
        } = SAMPLER_START.receive().await;
        SAMPLER_STOP.reset();
        debug!("sampler armed");

        loop {
            match select(data_ready.wait_for_rising_edge(), SAMPLER_STOP.wait()).await {
                Either::First(()) => {
                    session.on_data_ready(&mut sensor, &mut queue, &ACQ_SHARED);
                    SAMPLES_READY.signal(());
                }
                Either::Second(()) => break,
            }
        }

        debug!("sampler disarmed at sequence {}", session.sequence());
        SAMPLER_RETURN.send(sensor).await;
    }
}
