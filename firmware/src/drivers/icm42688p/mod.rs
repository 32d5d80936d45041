pub mod driver;
pub mod registers;

pub use driver::{Icm42688p, SensorError};
