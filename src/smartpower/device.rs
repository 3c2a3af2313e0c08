//! SmartPower communication via USB HID.

use super::locale::LocaleGuard;
use super::protocol::Frame;
use super::{FrameTransport, SmartPowerSensor, SENSOR_NAME};
use crate::config::SmartPowerConfig;
use crate::error::Result;
use crate::sensor::Sensor;
use hidapi::{HidApi, HidDevice};
use log::{debug, info};

/// hidapi-backed frame transport
pub struct HidTransport {
    device: HidDevice,
    _api: HidApi,
    read_timeout_ms: i32,
}

impl HidTransport {
    /// Opens the meter by VID:PID.
    ///
    /// hidapi switches the process locale during initialisation; the guard
    /// puts the previous locale back before this returns.
    pub fn open(config: &SmartPowerConfig) -> Result<Self> {
        let (api, device) = {
            let _locale = LocaleGuard::capture();
            let api = HidApi::new()?;
            let device = api.open(config.vendor_id, config.product_id)?;
            (api, device)
        };

        info!(
            "{} opened (VID:{:04X} PID:{:04X})",
            SENSOR_NAME, config.vendor_id, config.product_id
        );

        Ok(Self {
            device,
            _api: api,
            read_timeout_ms: config.read_timeout_ms,
        })
    }
}

impl FrameTransport for HidTransport {
    fn send(&mut self, frame: &Frame) -> Result<()> {
        self.device.write(frame)?;
        Ok(())
    }

    fn receive(&mut self, frame: &mut Frame) -> Result<usize> {
        Ok(self.device.read_timeout(frame, self.read_timeout_ms)?)
    }
}

/// Open and query the meter; absent or unresponsive meters yield `None`
pub fn probe(config: &SmartPowerConfig) -> Option<Box<dyn Sensor>> {
    let transport = match HidTransport::open(config) {
        Ok(transport) => transport,
        Err(e) => {
            debug!("{}: not available: {}", SENSOR_NAME, e);
            return None;
        }
    };

    match SmartPowerSensor::connect(transport) {
        Ok(sensor) => Some(Box::new(sensor)),
        Err(e) => {
            debug!("{}: status query failed: {}", SENSOR_NAME, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Hardware tests are skipped by default
    #[test]
    #[ignore]
    fn test_device_open() {
        let transport = HidTransport::open(&SmartPowerConfig::default());
        assert!(transport.is_ok());
    }
}
