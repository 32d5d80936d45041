#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::{InterruptExecutor, Spawner};
use embassy_rp::interrupt;
use embassy_rp::interrupt::{InterruptExt, Priority};
use embassy_time::Timer;
use embassy_usb::class::cdc_acm::{CdcAcmClass, State};
use embassy_usb::{Builder, Config as UsbConfig};
use heapless::spsc::Queue;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use microquake_firmware::{
    config::{FIRMWARE_VERSION, SAMPLE_QUEUE_SIZE, USB_PID, USB_VID},
    ipc::ACQ_SHARED,
    tasks::{control_task, drain_task, sampler_task, status_task, tx_task, usb_task},
    Board, Icm42688p,
};
use microquake_link::acquisition::{Controller, SampleRecord};

// The sampler preempts the cooperative executor from SWI_IRQ_1 so the
// per-sample path keeps its deadline at high output data rates.
static EXECUTOR_HIGH: InterruptExecutor = InterruptExecutor::new();

#[interrupt]
unsafe fn SWI_IRQ_1() {
    EXECUTOR_HIGH.on_interrupt()
}

static SAMPLE_QUEUE: StaticCell<Queue<SampleRecord, SAMPLE_QUEUE_SIZE>> = StaticCell::new();
static USB_STATE: StaticCell<State> = StaticCell::new();
static CONFIG_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static BOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static CONTROL_BUF: StaticCell<[u8; 64]> = StaticCell::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("MicroQuake boot, firmware {}", FIRMWARE_VERSION);
    let board = Board::init();

    let mut usb_config = UsbConfig::new(USB_VID, USB_PID);
    usb_config.manufacturer = Some("MicroQuake");
    usb_config.product = Some("MicroQuake IMU probe");
    usb_config.max_power = 100;

    let mut builder = Builder::new(
        board.usb,
        usb_config,
        CONFIG_DESC.init([0; 256]),
        BOS_DESC.init([0; 256]),
        &mut [], // no msos descriptors
        CONTROL_BUF.init([0; 64]),
    );
    let class = CdcAcmClass::new(&mut builder, USB_STATE.init(State::new()), 64);
    let (tx, rx) = class.split();
    let usb = builder.build();

    spawner.spawn(usb_task(usb)).unwrap();
    spawner.spawn(tx_task(tx)).unwrap();
    spawner.spawn(status_task()).unwrap();

    let mut sensor = Icm42688p::new(board.sensor_spi, board.sensor_cs);
    let mut controller = Controller::new(&ACQ_SHARED);
    let mut usr_led = board.usr_led;

    if let Err(e) = controller.begin(&mut sensor) {
        error!("sensor bring-up failed: {}", e);
        // terminal: the status task broadcasts the fault forever, nothing
        // else runs, and only a power cycle recovers
        loop {
            usr_led.toggle();
            Timer::after_millis(250).await;
        }
    }
    info!("ICM-42688-P ready");

    let (producer, consumer) = SAMPLE_QUEUE.init(Queue::new()).split();

    interrupt::SWI_IRQ_1.set_priority(Priority::P1);
    let high = EXECUTOR_HIGH.start(interrupt::SWI_IRQ_1);
    high.spawn(sampler_task(board.data_ready, producer)).unwrap();

    spawner.spawn(drain_task(consumer)).unwrap();
    spawner
        .spawn(control_task(rx, sensor, usr_led, board.unique_id))
        .unwrap();

    core::future::pending::<()>().await;
}
