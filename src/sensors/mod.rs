//! Single-source sensor backends
//!
//! - `file`: scalar pseudo-files (cpufreq, thermal zones, fan PWM)
//! - `iio`: offset/scale/raw ADC channels
//! - `ina231`: ioctl-driven INA231 kernel module devices
//!
//! The hwmon cluster backends live in [`crate::hwmon`] and the USB meter in
//! [`crate::smartpower`].

pub mod file;
pub mod iio;
pub mod ina231;

pub use file::{FileSensor, ProbeCount};
pub use iio::ScaledChannel;
pub use ina231::Ina231Sensor;
