//! Host-selectable hardware settings and their lookup tables.
//!
//! The host addresses everything by small indices; each table maps an
//! index to concrete ICM-42688-P register values. Every lookup is bounds
//! checked with a documented fallback, so a hostile or buggy host can
//! select a wrong setting but never an out-of-table one.

use crate::message::Command;

/// Output data rates supported in low-noise mode, assuming the nominal
/// 32 kHz external sensor clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputDataRate {
    Hz12_5,
    Hz25,
    Hz50,
    Hz100,
    Hz200,
    Hz500,
    Hz1k,
    Hz2k,
    Hz4k,
    Hz8k,
    Hz16k,
    Hz32k,
}

impl OutputDataRate {
    /// Out-of-range indices fall back to the lowest supported rate.
    pub const fn from_index(idx: u8) -> Self {
        match idx {
            0 => Self::Hz12_5,
            1 => Self::Hz25,
            2 => Self::Hz50,
            3 => Self::Hz100,
            4 => Self::Hz200,
            5 => Self::Hz500,
            6 => Self::Hz1k,
            7 => Self::Hz2k,
            8 => Self::Hz4k,
            9 => Self::Hz8k,
            10 => Self::Hz16k,
            11 => Self::Hz32k,
            _ => Self::Hz12_5,
        }
    }

    /// ODR field of GYRO_CONFIG0 / ACCEL_CONFIG0 (low nibble).
    pub const fn register_bits(self) -> u8 {
        match self {
            Self::Hz32k => 0b0001,
            Self::Hz16k => 0b0010,
            Self::Hz8k => 0b0011,
            Self::Hz4k => 0b0100,
            Self::Hz2k => 0b0101,
            Self::Hz1k => 0b0110,
            Self::Hz500 => 0b1111,
            Self::Hz200 => 0b0111,
            Self::Hz100 => 0b1000,
            Self::Hz50 => 0b1001,
            Self::Hz25 => 0b1010,
            Self::Hz12_5 => 0b1011,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AccelRange {
    G2,
    G4,
    G8,
    G16,
}

impl AccelRange {
    /// Out-of-range indices fall back to the widest range.
    pub const fn from_index(idx: u8) -> Self {
        match idx {
            0 => Self::G2,
            1 => Self::G4,
            2 => Self::G8,
            3 => Self::G16,
            _ => Self::G16,
        }
    }

    /// ACCEL_FS_SEL field of ACCEL_CONFIG0 (bits 7:5).
    pub const fn register_bits(self) -> u8 {
        match self {
            Self::G2 => 0b011,
            Self::G4 => 0b010,
            Self::G8 => 0b001,
            Self::G16 => 0b000,
        }
    }

    pub const fn lsb_per_g(self) -> f32 {
        match self {
            Self::G2 => 16384.0,
            Self::G4 => 8192.0,
            Self::G8 => 4096.0,
            Self::G16 => 2048.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GyroRange {
    Dps15_625,
    Dps31_25,
    Dps62_5,
    Dps125,
    Dps250,
    Dps500,
    Dps1000,
    Dps2000,
}

impl GyroRange {
    /// Out-of-range indices fall back to the widest range.
    pub const fn from_index(idx: u8) -> Self {
        match idx {
            0 => Self::Dps15_625,
            1 => Self::Dps31_25,
            2 => Self::Dps62_5,
            3 => Self::Dps125,
            4 => Self::Dps250,
            5 => Self::Dps500,
            6 => Self::Dps1000,
            7 => Self::Dps2000,
            _ => Self::Dps2000,
        }
    }

    /// GYRO_FS_SEL field of GYRO_CONFIG0 (bits 7:5).
    pub const fn register_bits(self) -> u8 {
        match self {
            Self::Dps15_625 => 0b111,
            Self::Dps31_25 => 0b110,
            Self::Dps62_5 => 0b101,
            Self::Dps125 => 0b100,
            Self::Dps250 => 0b011,
            Self::Dps500 => 0b010,
            Self::Dps1000 => 0b001,
            Self::Dps2000 => 0b000,
        }
    }

    pub const fn full_scale_dps(self) -> f32 {
        match self {
            Self::Dps15_625 => 15.625,
            Self::Dps31_25 => 31.25,
            Self::Dps62_5 => 62.5,
            Self::Dps125 => 125.0,
            Self::Dps250 => 250.0,
            Self::Dps500 => 500.0,
            Self::Dps1000 => 1000.0,
            Self::Dps2000 => 2000.0,
        }
    }

    pub const fn lsb_per_dps(self) -> f32 {
        32768.0 / self.full_scale_dps()
    }
}

/// One anti-alias filter preset: the second-order low-pass coefficients
/// for ACCEL_CONFIG_STATIC2..4 / GYRO_CONFIG_STATIC3..5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FilterConfig {
    pub bandwidth_hz: u16,
    pub aaf_delt: u8,
    pub aaf_deltsqr: u16,
    pub aaf_bitshift: u8,
}

const fn aaf(bandwidth_hz: u16, aaf_delt: u8, aaf_deltsqr: u16, aaf_bitshift: u8) -> FilterConfig {
    FilterConfig {
        bandwidth_hz,
        aaf_delt,
        aaf_deltsqr,
        aaf_bitshift,
    }
}

/// Anti-alias bandwidth presets, datasheet section 5.3.
pub static FILTER_CONFIGS: [FilterConfig; 63] = [
    aaf(42, 1, 1, 15),
    aaf(84, 2, 4, 13),
    aaf(126, 3, 9, 12),
    aaf(170, 4, 16, 11),
    aaf(213, 5, 25, 10),
    aaf(258, 6, 36, 10),
    aaf(303, 7, 49, 9),
    aaf(348, 8, 64, 9),
    aaf(394, 9, 81, 9),
    aaf(441, 10, 100, 8),
    aaf(488, 11, 122, 8),
    aaf(536, 12, 144, 8),
    aaf(585, 13, 170, 8),
    aaf(634, 14, 196, 7),
    aaf(684, 15, 224, 7),
    aaf(734, 16, 256, 7),
    aaf(785, 17, 288, 7),
    aaf(837, 18, 324, 7),
    aaf(890, 19, 360, 6),
    aaf(943, 20, 400, 6),
    aaf(997, 21, 440, 6),
    aaf(1051, 22, 488, 6),
    aaf(1107, 23, 528, 6),
    aaf(1163, 24, 576, 6),
    aaf(1220, 25, 624, 6),
    aaf(1277, 26, 680, 6),
    aaf(1336, 27, 736, 5),
    aaf(1395, 28, 784, 5),
    aaf(1454, 29, 848, 5),
    aaf(1515, 30, 896, 5),
    aaf(1577, 31, 960, 5),
    aaf(1639, 32, 1024, 5),
    aaf(1702, 33, 1088, 5),
    aaf(1766, 34, 1152, 5),
    aaf(1830, 35, 1232, 5),
    aaf(1896, 36, 1296, 5),
    aaf(1962, 37, 1376, 4),
    aaf(2029, 38, 1440, 4),
    aaf(2097, 39, 1536, 4),
    aaf(2166, 40, 1600, 4),
    aaf(2235, 41, 1696, 4),
    aaf(2306, 42, 1760, 4),
    aaf(2377, 43, 1856, 4),
    aaf(2449, 44, 1952, 4),
    aaf(2522, 45, 2016, 4),
    aaf(2596, 46, 2112, 4),
    aaf(2671, 47, 2208, 4),
    aaf(2746, 48, 2304, 4),
    aaf(2823, 49, 2400, 4),
    aaf(2900, 50, 2496, 4),
    aaf(2978, 51, 2592, 4),
    aaf(3057, 52, 2720, 4),
    aaf(3137, 53, 2816, 3),
    aaf(3217, 54, 2944, 3),
    aaf(3299, 55, 3008, 3),
    aaf(3381, 56, 3136, 3),
    aaf(3464, 57, 3264, 3),
    aaf(3548, 58, 3392, 3),
    aaf(3633, 59, 3456, 3),
    aaf(3718, 60, 3584, 3),
    aaf(3805, 61, 3712, 3),
    aaf(3892, 62, 3840, 3),
    aaf(3979, 63, 3968, 3),
];

/// Bounds-checked filter lookup; out-of-range indices fall back to the
/// 42 Hz preset.
pub fn filter_config(idx: u8) -> &'static FilterConfig {
    FILTER_CONFIGS.get(idx as usize).unwrap_or(&FILTER_CONFIGS[0])
}

/// Fully validated sampling configuration, applied atomically on the
/// Idle to Sampling transition.
#[derive(Debug, Clone, Copy)]
pub struct SamplingRequest {
    pub rate: OutputDataRate,
    pub accel_range: AccelRange,
    pub gyro_range: GyroRange,
    pub filter: &'static FilterConfig,
    /// Number of samples to acquire; 0 means continuous.
    pub limit: u64,
}

impl SamplingRequest {
    /// Map raw host indices onto hardware settings. Every out-of-range
    /// index substitutes its documented default rather than faulting;
    /// the protocol has no NACK path to report it.
    pub fn from_command(cmd: &Command) -> Self {
        Self {
            rate: OutputDataRate::from_index(cmd.rate_idx),
            accel_range: AccelRange::from_index(cmd.accel_idx),
            gyro_range: GyroRange::from_index(cmd.gyro_idx),
            filter: filter_config(cmd.filter_idx),
            limit: cmd.num_samples,
        }
    }
}
