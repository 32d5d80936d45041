pub mod icm42688p;

pub use icm42688p::{Icm42688p, SensorError};
