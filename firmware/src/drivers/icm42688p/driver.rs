//! ICM-42688-P 6-axis IMU driver (SPI, blocking).
//!
//! Bus transactions are short blocking transfers at 25 MHz; a full
//! axis+temperature burst is 15 bytes on the wire, quick enough for the
//! interrupt-context read path.

use embassy_rp::gpio::Output;
use embassy_rp::peripherals::SPI0;
use embassy_rp::spi::{self, Blocking, Spi};
use embassy_time::{block_for, Duration};

use microquake_link::acquisition::{InertialSensor, Reading};
use microquake_link::settings::{AccelRange, FilterConfig, GyroRange, OutputDataRate};

use super::registers as reg;

/// Sensitivity scale of the temperature registers, datasheet 14.6.
const TEMP_LSB_PER_C: f32 = 132.48;
const TEMP_OFFSET_C: f32 = 25.0;

#[derive(Debug, defmt::Format)]
pub enum SensorError {
    /// WHO_AM_I readback mismatch; nothing (or the wrong part) on the bus.
    BadIdentity(u8),
    Spi(spi::Error),
}

impl From<spi::Error> for SensorError {
    fn from(e: spi::Error) -> Self {
        Self::Spi(e)
    }
}

pub struct Icm42688p {
    spi: Spi<'static, SPI0, Blocking>,
    cs: Output<'static>,
    bank: u8,
    accel_lsb_per_g: f32,
    gyro_lsb_per_dps: f32,
}

impl Icm42688p {
    pub fn new(spi: Spi<'static, SPI0, Blocking>, cs: Output<'static>) -> Self {
        Self {
            spi,
            cs,
            bank: 0,
            // power-on defaults: +-16 g, +-2000 dps
            accel_lsb_per_g: AccelRange::G16.lsb_per_g(),
            gyro_lsb_per_dps: GyroRange::Dps2000.lsb_per_dps(),
        }
    }

    /* ================= low-level register access ====================== */

    fn read_register(&mut self, register: u8) -> Result<u8, SensorError> {
        let mut buf = [register | reg::SPI_READ, 0xFF];
        self.cs.set_low();
        let res = self.spi.blocking_transfer_in_place(&mut buf);
        self.cs.set_high();
        res?;
        Ok(buf[1])
    }

    fn read_multi<const N: usize>(&mut self, first: u8) -> Result<[u8; N], SensorError> {
        let mut buf = [0u8; N];
        self.cs.set_low();
        let res = self
            .spi
            .blocking_write(&[first | reg::SPI_READ])
            .and_then(|()| self.spi.blocking_read(&mut buf));
        self.cs.set_high();
        res?;
        Ok(buf)
    }

    fn write_register(&mut self, register: u8, value: u8) -> Result<(), SensorError> {
        self.cs.set_low();
        let res = self.spi.blocking_write(&[register, value]);
        self.cs.set_high();
        res?;
        Ok(())
    }

    fn update_register(
        &mut self,
        register: u8,
        mask: u8,
        value: u8,
    ) -> Result<(), SensorError> {
        let current = self.read_register(register)?;
        self.write_register(register, (current & !mask) | (value & mask))
    }

    fn select_bank(&mut self, bank: u8) -> Result<(), SensorError> {
        if self.bank != bank {
            self.write_register(reg::REG_BANK_SEL, bank)?;
            self.bank = bank;
        }
        Ok(())
    }

    /* ================= setup helpers ================================== */

    fn soft_reset(&mut self) -> Result<(), SensorError> {
        self.select_bank(0)?;
        self.write_register(reg::DEVICE_CONFIG, reg::SOFT_RESET)?;
        self.bank = 0;
        block_for(Duration::from_millis(2));
        Ok(())
    }

    /// Clock, SPI drive and INT1 routing; applied at bring-up and again
    /// after every soft reset.
    fn apply_baseline(&mut self) -> Result<(), SensorError> {
        self.select_bank(0)?;
        self.write_register(reg::DRIVE_CONFIG, reg::SPI_SLEW_6_18NS)?;

        // run from the 32 kHz the board feeds into pin 9
        self.select_bank(1)?;
        self.write_register(reg::INTF_CONFIG5, reg::PIN9_FUNCTION_CLKIN)?;
        self.select_bank(0)?;
        self.update_register(reg::INTF_CONFIG1, reg::RTC_MODE, reg::RTC_MODE)?;

        // INT1: short push-pull active-high pulses, data-ready routed out
        self.write_register(reg::INT_CONFIG, reg::INT1_PUSH_PULL_ACTIVE_HIGH_PULSED)?;
        self.write_register(reg::INT_CONFIG1, reg::INT_TPULSE_SHORT)?;
        self.write_register(reg::INT_SOURCE0, reg::UI_DRDY_INT1_EN)?;
        Ok(())
    }
}

impl InertialSensor for Icm42688p {
    type Error = SensorError;

    fn begin(&mut self) -> Result<(), SensorError> {
        self.select_bank(0)?;
        let id = self.read_register(reg::WHO_AM_I)?;
        if id != reg::WHOAMI_VALUE {
            return Err(SensorError::BadIdentity(id));
        }
        self.apply_baseline()
    }

    /// Rates do not hot-change reliably, so every configure starts from a
    /// soft reset and reapplies the baseline before the new settings.
    fn configure(
        &mut self,
        rate: OutputDataRate,
        accel_range: AccelRange,
        gyro_range: GyroRange,
        filter: &FilterConfig,
    ) -> Result<(), SensorError> {
        self.soft_reset()?;
        self.apply_baseline()?;

        self.write_register(
            reg::GYRO_CONFIG0,
            (gyro_range.register_bits() << 5) | rate.register_bits(),
        )?;
        self.write_register(
            reg::ACCEL_CONFIG0,
            (accel_range.register_bits() << 5) | rate.register_bits(),
        )?;

        // accel anti-alias coefficients live in bank 2
        self.select_bank(2)?;
        self.write_register(reg::ACCEL_CONFIG_STATIC2, filter.aaf_delt << 1)?;
        self.write_register(reg::ACCEL_CONFIG_STATIC3, filter.aaf_deltsqr as u8)?;
        self.write_register(
            reg::ACCEL_CONFIG_STATIC4,
            (filter.aaf_bitshift << 4) | (filter.aaf_deltsqr >> 8) as u8,
        )?;
        self.select_bank(0)?;

        self.accel_lsb_per_g = accel_range.lsb_per_g();
        self.gyro_lsb_per_dps = gyro_range.lsb_per_dps();
        Ok(())
    }

    fn set_accel_power(&mut self, on: bool) -> Result<(), SensorError> {
        self.select_bank(0)?;
        let mode = if on { reg::ACCEL_MODE_LN } else { 0 };
        self.update_register(reg::PWR_MGMT0, reg::ACCEL_MODE_MASK, mode)?;
        if on {
            // no register writes allowed for a short window after power-up
            block_for(Duration::from_millis(10));
        }
        Ok(())
    }

    fn set_gyro_power(&mut self, on: bool) -> Result<(), SensorError> {
        self.select_bank(0)?;
        let mode = if on { reg::GYRO_MODE_LN } else { 0 };
        self.update_register(reg::PWR_MGMT0, reg::GYRO_MODE_MASK, mode)?;
        if on {
            block_for(Duration::from_millis(10));
        }
        Ok(())
    }

    fn read_all(&mut self) -> Result<Reading, SensorError> {
        // TEMP_DATA1 through GYRO_DATA_Z0 are contiguous: 2 temperature
        // bytes, then 6 accel, then 6 gyro, all big-endian
        let raw: [u8; 14] = self.read_multi(reg::TEMP_DATA1)?;
        let word = |i: usize| i16::from_be_bytes([raw[i], raw[i + 1]]) as f32;
        Ok(Reading {
            accel_x: word(2) / self.accel_lsb_per_g,
            accel_y: word(4) / self.accel_lsb_per_g,
            accel_z: word(6) / self.accel_lsb_per_g,
            gyro_x: word(8) / self.gyro_lsb_per_dps,
            gyro_y: word(10) / self.gyro_lsb_per_dps,
            gyro_z: word(12) / self.gyro_lsb_per_dps,
            temp_c: word(0) / TEMP_LSB_PER_C + TEMP_OFFSET_C,
        })
    }
}
