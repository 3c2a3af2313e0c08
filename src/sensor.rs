//! The uniform sensor contract
//!
//! Every backend (pseudo-files, hwmon clusters, IIO channels, INA231 ioctl
//! devices, the SmartPower HID meter) exposes itself as a [`Sensor`]. The
//! sampling loop only ever talks to this trait.

use crate::error::Result;
use std::io::{self, Write};

/// Longest name a sensor handle may carry
pub const MAX_NAME_LEN: usize = 31;

/// A probed, open sensor
pub trait Sensor {
    /// Name used as the key of the printed lines
    fn name(&self) -> &str;

    /// Preferred sampling period in microseconds; `<= 0` means no preference
    fn period_us(&self) -> i64 {
        0
    }

    /// Take a new sample into the last-sample cache.
    ///
    /// On failure the previous cache is left untouched and will be printed
    /// again.
    fn read(&mut self) -> Result<()>;

    /// Write the cached sample as one or more `name value` lines.
    ///
    /// Only errors of `out` itself are returned.
    fn print_last(&self, out: &mut dyn Write) -> io::Result<()>;

    /// Release OS resources held by the sensor
    fn close(&mut self) {}
}

/// Clamp a sensor name to [`MAX_NAME_LEN`] bytes on a char boundary
pub fn clamp_name(name: &str) -> String {
    if name.len() <= MAX_NAME_LEN {
        return name.to_string();
    }
    let mut end = MAX_NAME_LEN;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    name[..end].to_string()
}
