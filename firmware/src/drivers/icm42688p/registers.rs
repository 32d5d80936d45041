// ICM-42688-P register map + field values (datasheet DS-000347).

#![allow(dead_code)]

/* ───── User bank 0 ─────────────────────────────────────── */
pub const DEVICE_CONFIG: u8 = 0x11;
pub const DRIVE_CONFIG: u8 = 0x13;
pub const INT_CONFIG: u8 = 0x14;
pub const TEMP_DATA1: u8 = 0x1D;
pub const ACCEL_DATA_X1: u8 = 0x1F;
pub const GYRO_DATA_X1: u8 = 0x25;
pub const INT_STATUS: u8 = 0x2D;
pub const INTF_CONFIG0: u8 = 0x4C;
pub const INTF_CONFIG1: u8 = 0x4D;
pub const PWR_MGMT0: u8 = 0x4E;
pub const GYRO_CONFIG0: u8 = 0x4F;
pub const ACCEL_CONFIG0: u8 = 0x50;
pub const GYRO_ACCEL_CONFIG0: u8 = 0x52;
pub const INT_CONFIG0: u8 = 0x63;
pub const INT_CONFIG1: u8 = 0x64;
pub const INT_SOURCE0: u8 = 0x65;
pub const WHO_AM_I: u8 = 0x75;
pub const REG_BANK_SEL: u8 = 0x76;

/* ───── User bank 1 ─────────────────────────────────────── */
pub const GYRO_CONFIG_STATIC3: u8 = 0x0C;
pub const GYRO_CONFIG_STATIC4: u8 = 0x0D;
pub const GYRO_CONFIG_STATIC5: u8 = 0x0E;
pub const INTF_CONFIG5: u8 = 0x7B;

/* ───── User bank 2 ─────────────────────────────────────── */
pub const ACCEL_CONFIG_STATIC2: u8 = 0x03;
pub const ACCEL_CONFIG_STATIC3: u8 = 0x04;
pub const ACCEL_CONFIG_STATIC4: u8 = 0x05;

/* ───── Field values ────────────────────────────────────── */
pub const WHOAMI_VALUE: u8 = 0x47;
pub const SPI_READ: u8 = 0x80;

/// DEVICE_CONFIG: SOFT_RESET_CONFIG
pub const SOFT_RESET: u8 = 0x01;

/// DRIVE_CONFIG: SPI slew 6-18 ns, tames MISO overshoot at 25 MHz
pub const SPI_SLEW_6_18NS: u8 = 0b100;

/// INT_CONFIG: INT1 pulsed, push-pull, active high
pub const INT1_PUSH_PULL_ACTIVE_HIGH_PULSED: u8 = 0b011;

/// INT_CONFIG1: 8 us pulses, de-assert duration disabled, async reset
/// cleared (required for ODR >= 4 kHz)
pub const INT_TPULSE_SHORT: u8 = 0b0110_0000;

/// INT_SOURCE0: route UI data-ready to INT1
pub const UI_DRDY_INT1_EN: u8 = 1 << 3;

/// INTF_CONFIG1: RTC_MODE, sensor expects an external 32 kHz clock
pub const RTC_MODE: u8 = 1 << 2;

/// INTF_CONFIG5 (bank 1): PIN9_FUNCTION = CLKIN
pub const PIN9_FUNCTION_CLKIN: u8 = 0b10 << 1;

/// PWR_MGMT0 mode fields
pub const ACCEL_MODE_MASK: u8 = 0b0000_0011;
pub const ACCEL_MODE_LN: u8 = 0b0000_0011;
pub const GYRO_MODE_MASK: u8 = 0b0000_1100;
pub const GYRO_MODE_LN: u8 = 0b0000_1100;
