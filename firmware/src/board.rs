use embassy_rp::bind_interrupts;
use embassy_rp::flash::Flash;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::peripherals::{SPI0, USB};
use embassy_rp::pwm::{self, Pwm};
use embassy_rp::spi::{self, Blocking, Spi};
use embassy_rp::usb::{Driver, InterruptHandler};

use crate::config::{SENSOR_CLKIN_HZ, SENSOR_SPI_HZ};

// ── IRQ table ─────────────────────────────────────────────
bind_interrupts!(pub struct Irqs {
    USBCTRL_IRQ => InterruptHandler<USB>;
});

const FLASH_SIZE: usize = 2 * 1024 * 1024;

// ── Board struct ──────────────────────────────────────────
pub struct Board {
    pub sensor_spi: Spi<'static, SPI0, Blocking>,
    pub sensor_cs: Output<'static>,
    pub data_ready: Input<'static>,
    pub usr_led: Output<'static>,
    pub usb: Driver<'static, USB>,
    pub unique_id: [u8; 8],
    // 32 kHz square wave into the sensor CLKIN pin; held here so the
    // slice keeps running for the lifetime of the board
    _sensor_clk: Pwm<'static>,
}

impl Board {
    pub fn init() -> Self {
        let p = embassy_rp::init(Default::default());

        // SPI0 to the ICM-42688-P, mode 0, manual chip select
        let mut spi_cfg = spi::Config::default();
        spi_cfg.frequency = SENSOR_SPI_HZ;
        let sensor_spi = Spi::new_blocking(p.SPI0, p.PIN_18, p.PIN_19, p.PIN_16, spi_cfg);
        let sensor_cs = Output::new(p.PIN_17, Level::High);

        // data-ready pulses from sensor INT1
        let data_ready = Input::new(p.PIN_28, Pull::Down);

        // 32 kHz reference clock out to sensor pin 9 (CLKIN); the probe
        // runs the sensor from this rather than its internal RC so the
        // output data rate is crystal-accurate
        let mut clk_cfg = pwm::Config::default();
        let top = (embassy_rp::clocks::clk_sys_freq() / SENSOR_CLKIN_HZ - 1) as u16;
        clk_cfg.top = top;
        clk_cfg.compare_b = top / 2;
        let sensor_clk = Pwm::new_output_b(p.PWM_SLICE5, p.PIN_27, clk_cfg);

        let usr_led = Output::new(p.PIN_4, Level::Low);

        let usb = Driver::new(p.USB, Irqs);

        let mut unique_id = [0u8; 8];
        let mut flash = Flash::<_, _, FLASH_SIZE>::new_blocking(p.FLASH);
        flash.blocking_unique_id(&mut unique_id).unwrap();
        drop(flash);

        Self {
            sensor_spi,
            sensor_cs,
            data_ready,
            usr_led,
            usb,
            unique_id,
            _sensor_clk: sensor_clk,
        }
    }
}
