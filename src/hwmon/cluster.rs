//! Generic hwmon measurement clusters

use super::{scan_entries, HwmonEntry, MeasurePair};
use crate::error::Result;
use crate::sensor::{clamp_name, Sensor};
use std::io::{self, Write};
use std::path::Path;

// Channel 1 is the input side, channel 2 the output side
const CURR_IN: &str = "curr1_input";
const CURR_OUT: &str = "curr2_input";
const VOLT_IN: &str = "in1_input";
const VOLT_OUT: &str = "in2_input";
const POWER_IN: &str = "power1_input";
const POWER_OUT: &str = "power2_input";
const TEMP_IN: &str = "temp1_input";
const TEMP_OUT: &str = "temp2_input";

/// One hwmon entry with its four measurement pairs
#[derive(Debug)]
pub struct HwmonSensor {
    name: String,
    label: String,
    pub current: MeasurePair,
    pub voltage: MeasurePair,
    pub power: MeasurePair,
    pub temp: MeasurePair,
}

impl HwmonSensor {
    /// Build the sensor if the entry has at least one measurement file
    pub fn from_entry(entry: &HwmonEntry) -> Option<Self> {
        let dir = entry.dir.as_path();
        let sensor = Self {
            name: clamp_name(&format!("hwmon_{}", entry.label)),
            label: entry.label.clone(),
            current: MeasurePair::probe(dir, CURR_IN, CURR_OUT),
            voltage: MeasurePair::probe(dir, VOLT_IN, VOLT_OUT),
            power: MeasurePair::probe(dir, POWER_IN, POWER_OUT),
            temp: MeasurePair::probe(dir, TEMP_IN, TEMP_OUT),
        };

        let any = [&sensor.current, &sensor.voltage, &sensor.power, &sensor.temp]
            .iter()
            .any(|pair| pair.exists());
        any.then_some(sensor)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Current in µA (hwmon reports mA)
    pub fn current_ua(&self) -> i64 {
        self.current.diff_value * 1000
    }

    /// Voltage in µV (hwmon reports mV)
    pub fn voltage_uv(&self) -> i64 {
        self.voltage.diff_value * 1000
    }

    /// Power in µW
    pub fn power_uw(&self) -> i64 {
        self.power.diff_value
    }

    /// Temperature in m°C
    pub fn temp_mc(&self) -> i64 {
        self.temp.diff_value
    }
}

impl Sensor for HwmonSensor {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&mut self) -> Result<()> {
        self.current.update();
        self.voltage.update();
        self.power.update();
        self.temp.update();
        Ok(())
    }

    fn print_last(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "{}_uA {}", self.name, self.current_ua())?;
        writeln!(out, "{}_uV {}", self.name, self.voltage_uv())?;
        writeln!(out, "{}_uW {}", self.name, self.power_uw())?;
        writeln!(out, "{}_mC {}", self.name, self.temp_mc())
    }
}

/// One sensor per hwmon entry exposing any measurement file
pub fn probe(hwmon_dir: &Path) -> Vec<Box<dyn Sensor>> {
    scan_entries(hwmon_dir)
        .iter()
        .filter_map(HwmonSensor::from_entry)
        .map(|s| Box::new(s) as Box<dyn Sensor>)
        .collect()
}
