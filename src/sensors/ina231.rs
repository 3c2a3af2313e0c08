//! INA231 power monitors behind the ODROID-XU3 kernel module
//!
//! The vendor driver exposes each monitored rail (A15 cluster, memory, A7
//! cluster, GPU) as a character device driven with ioctls, and publishes the
//! sensor's conversion period in a sysfs attribute such as `"263808 usec"`.
//! Readings come back already in micro-units.

use crate::config::Ina231Device;
use crate::error::{Result, SamplerError};
use crate::sensor::{clamp_name, Sensor};
use crate::sysfs::read_file_string;
use log::debug;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::io::AsRawFd;
use std::path::Path;

/// Register record exchanged with the driver
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ina231Record {
    pub name: [u8; 20],
    pub enable: libc::c_uint,
    pub cur_uv: libc::c_uint,
    pub cur_ua: libc::c_uint,
    pub cur_uw: libc::c_uint,
}

impl Ina231Record {
    /// Driver-assigned name, up to the first NUL
    pub fn name(&self) -> String {
        let end = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.name.len());
        String::from_utf8_lossy(&self.name[..end]).into_owned()
    }
}

const SENSOR_DISABLED: libc::c_uint = 0;
const SENSOR_ENABLED: libc::c_uint = 1;

mod ioctl {
    use super::Ina231Record;

    const MAGIC: u8 = b'i';
    // The driver encodes the size of a pointer, not of the record.
    const ARG_SIZE: usize = std::mem::size_of::<*mut Ina231Record>();

    nix::ioctl_read_bad!(
        get_reg,
        nix::request_code_read!(MAGIC, 1, ARG_SIZE),
        Ina231Record
    );
    nix::ioctl_write_ptr_bad!(
        set_status,
        nix::request_code_write!(MAGIC, 2, ARG_SIZE),
        Ina231Record
    );
    nix::ioctl_read_bad!(
        get_status,
        nix::request_code_read!(MAGIC, 3, ARG_SIZE),
        Ina231Record
    );
}

/// Parse an `update_period` attribute; only microseconds are understood
pub fn parse_update_period(text: &str) -> Result<i64> {
    let mut fields = text.split_whitespace();
    let (Some(number), Some(unit)) = (fields.next(), fields.next()) else {
        return Err(SamplerError::Parse(format!(
            "expected '<number> <unit>', got '{}'",
            text.trim()
        )));
    };

    let period: i64 = number
        .parse()
        .map_err(|e| SamplerError::Parse(format!("update period '{}': {}", number, e)))?;

    match unit {
        "usec" => Ok(period),
        other => Err(SamplerError::Parse(format!(
            "unsupported update period unit '{}'",
            other
        ))),
    }
}

/// Read the update period of one device from its sysfs attribute
pub fn read_update_period(path: &Path) -> Result<i64> {
    parse_update_period(&read_file_string(path)?)
}

/// One INA231 rail
#[derive(Debug)]
pub struct Ina231Sensor {
    name: String,
    file: Option<File>,
    record: Ina231Record,
    period_us: i64,
}

impl Ina231Sensor {
    /// Open the control device, enable the sensor if needed, learn its update
    /// period and take a first sample
    pub fn open(device: &Ina231Device) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&device.device)?;

        let mut sensor = Self {
            name: String::new(),
            file: Some(file),
            record: Ina231Record::default(),
            period_us: -1,
        };

        sensor.read_status()?;
        if sensor.record.enable == SENSOR_DISABLED {
            sensor.set_enabled(true)?;
        }

        sensor.period_us = read_update_period(&device.update_period)?;
        sensor.read()?;

        let name = sensor.record.name();
        sensor.name = if name.is_empty() {
            // unnamed driver instance: fall back to the node name
            device
                .device
                .file_name()
                .map(|n| clamp_name(&n.to_string_lossy()))
                .unwrap_or_default()
        } else {
            clamp_name(&name)
        };
        Ok(sensor)
    }

    fn fd(&self) -> Result<libc::c_int> {
        self.file
            .as_ref()
            .map(|f| f.as_raw_fd())
            .ok_or_else(|| SamplerError::DeviceNotFound(format!("{} is closed", self.name)))
    }

    fn read_status(&mut self) -> Result<()> {
        let fd = self.fd()?;
        // SAFETY: record is a live, correctly laid out repr(C) value
        unsafe { ioctl::get_status(fd, &mut self.record) }?;
        Ok(())
    }

    fn set_enabled(&mut self, enable: bool) -> Result<()> {
        let fd = self.fd()?;
        self.record.enable = if enable {
            SENSOR_ENABLED
        } else {
            SENSOR_DISABLED
        };
        // SAFETY: the driver only reads from the record
        unsafe { ioctl::set_status(fd, &self.record) }?;
        Ok(())
    }

    pub fn record(&self) -> &Ina231Record {
        &self.record
    }
}

impl Sensor for Ina231Sensor {
    fn name(&self) -> &str {
        &self.name
    }

    fn period_us(&self) -> i64 {
        self.period_us
    }

    fn read(&mut self) -> Result<()> {
        let fd = self.fd()?;
        let mut record = self.record;
        // SAFETY: record is a live, correctly laid out repr(C) value
        unsafe { ioctl::get_reg(fd, &mut record) }?;
        self.record = record;
        Ok(())
    }

    fn print_last(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "{}_uA {}", self.name, self.record.cur_ua)?;
        writeln!(out, "{}_uV {}", self.name, self.record.cur_uv)?;
        writeln!(out, "{}_uW {}", self.name, self.record.cur_uw)
    }

    fn close(&mut self) {
        // dropping the file closes the descriptor
        self.file.take();
    }
}

/// One sensor per control device that opens and reports a usable period
pub fn probe(devices: &[Ina231Device]) -> Vec<Box<dyn Sensor>> {
    let mut sensors: Vec<Box<dyn Sensor>> = Vec::new();
    for device in devices {
        match Ina231Sensor::open(device) {
            Ok(sensor) => {
                debug!(
                    "{}: {} every {} us",
                    device.device.display(),
                    sensor.name,
                    sensor.period_us
                );
                sensors.push(Box::new(sensor));
            }
            Err(e) => debug!("{}: skipped: {}", device.device.display(), e),
        }
    }
    sensors
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_parse_update_period() {
        assert_eq!(parse_update_period("200 usec").unwrap(), 200);
        assert_eq!(parse_update_period("263808 usec\n").unwrap(), 263_808);
    }

    #[test]
    fn test_parse_update_period_rejects_other_units() {
        assert!(parse_update_period("200 msec").is_err());
        assert!(parse_update_period("200").is_err());
        assert!(parse_update_period("").is_err());
        assert!(parse_update_period("fast usec").is_err());
    }

    #[test]
    fn test_record_name() {
        let mut record = Ina231Record::default();
        record.name[..10].copy_from_slice(b"sensor_arm");
        assert_eq!(record.name(), "sensor_arm");

        record.name = [b'x'; 20];
        assert_eq!(record.name().len(), 20);
    }

    #[test]
    fn test_record_layout_matches_driver() {
        assert_eq!(std::mem::size_of::<Ina231Record>(), 36);
    }

    #[test]
    fn test_absent_devices_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let devices = vec![Ina231Device {
            device: dir.path().join("sensor_arm"),
            update_period: PathBuf::from("/nonexistent/update_period"),
        }];
        assert!(probe(&devices).is_empty());
    }

    #[test]
    fn test_non_ioctl_device_fails_probe() {
        // a regular file opens fine but rejects the status ioctl
        let dir = tempfile::tempdir().unwrap();
        let node = dir.path().join("sensor_kfc");
        std::fs::write(&node, b"").unwrap();
        let period = dir.path().join("update_period");
        std::fs::write(&period, "200 usec\n").unwrap();

        let device = Ina231Device {
            device: node,
            update_period: period,
        };
        assert!(Ina231Sensor::open(&device).is_err());
    }
}
