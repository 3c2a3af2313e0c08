//! IIO ADC channels (Zynq PS SYSMON temperature)

use crate::config::PathsConfig;
use crate::error::Result;
use crate::sensor::{clamp_name, Sensor};
use crate::sysfs::{path_exists, read_file_f64};
use log::debug;
use std::io::{self, Write};
use std::path::PathBuf;

/// A raw ADC channel with its calibration offset and scale
#[derive(Debug)]
pub struct ScaledChannel {
    name: String,
    offset_path: PathBuf,
    scale_path: PathBuf,
    raw_path: PathBuf,
    offset: f64,
    scale: f64,
    raw: f64,
    value: f64,
}

impl ScaledChannel {
    /// Open the channel if all three attribute files exist
    pub fn open(
        name: &str,
        offset_path: impl Into<PathBuf>,
        scale_path: impl Into<PathBuf>,
        raw_path: impl Into<PathBuf>,
    ) -> Option<Self> {
        let channel = Self {
            name: clamp_name(name),
            offset_path: offset_path.into(),
            scale_path: scale_path.into(),
            raw_path: raw_path.into(),
            offset: 0.0,
            scale: 0.0,
            raw: 0.0,
            value: 0.0,
        };

        let missing = [&channel.raw_path, &channel.scale_path, &channel.offset_path]
            .into_iter()
            .find(|p| !path_exists(p));
        if let Some(path) = missing {
            debug!("{}: {} not found", name, path.display());
            return None;
        }
        Some(channel)
    }

    /// Physical value: `scale * (raw + offset) / 1000`
    pub fn value(&self) -> f64 {
        self.value
    }
}

impl Sensor for ScaledChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&mut self) -> Result<()> {
        let offset = read_file_f64(&self.offset_path)?;
        let scale = read_file_f64(&self.scale_path)?;
        let raw = read_file_f64(&self.raw_path)?;

        self.offset = offset;
        self.scale = scale;
        self.raw = raw;
        self.value = scale * (raw + offset) / 1000.0;
        Ok(())
    }

    fn print_last(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "{} {:.6}", self.name, self.value)
    }
}

pub fn probe(paths: &PathsConfig) -> Option<Box<dyn Sensor>> {
    ScaledChannel::open(
        "cpu_iio_temp",
        &paths.iio_offset,
        &paths.iio_scale,
        &paths.iio_raw,
    )
    .map(|s| Box::new(s) as Box<dyn Sensor>)
}
