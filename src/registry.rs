//! Ordered ownership of every probed sensor

use crate::sensor::Sensor;
use log::debug;
use std::io::{self, Write};

/// Owns every probed sensor; insertion order is print order
#[derive(Default)]
pub struct SensorRegistry {
    sensors: Vec<Box<dyn Sensor>>,
}

impl SensorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            sensors: Vec::new(),
        }
    }

    /// Append one sensor
    pub fn register(&mut self, sensor: Box<dyn Sensor>) {
        self.sensors.push(sensor);
    }

    /// Append the output of a probe, preserving its order
    pub fn extend<I>(&mut self, sensors: I)
    where
        I: IntoIterator<Item = Box<dyn Sensor>>,
    {
        self.sensors.extend(sensors);
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    /// Iterate over the registered sensors in print order
    pub fn iter(&self) -> std::slice::Iter<'_, Box<dyn Sensor>> {
        self.sensors.iter()
    }

    /// Preferred periods of every sensor, in registry order
    pub fn periods_us(&self) -> Vec<i64> {
        self.sensors.iter().map(|s| s.period_us()).collect()
    }

    /// Read every sensor once; returns how many reads failed
    pub fn read_all(&mut self) -> usize {
        let mut failures = 0;
        for sensor in self.sensors.iter_mut() {
            if let Err(e) = sensor.read() {
                debug!("{}: read failed, keeping last sample: {}", sensor.name(), e);
                failures += 1;
            }
        }
        failures
    }

    /// Print the cached sample of every sensor
    pub fn print_all(&self, out: &mut dyn Write) -> io::Result<()> {
        for sensor in &self.sensors {
            sensor.print_last(out)?;
        }
        Ok(())
    }

    /// Close every sensor exactly once, consuming the registry
    pub fn close_all(self) {
        for mut sensor in self.sensors {
            debug!("closing {}", sensor.name());
            sensor.close();
        }
    }
}
