//! Single pseudo-file sensors
//!
//! The sample is the file content verbatim (minus the trailing newline); no
//! numeric interpretation happens here.

use crate::config::PathsConfig;
use crate::error::Result;
use crate::sensor::{clamp_name, Sensor};
use crate::sysfs::read_line;
use log::debug;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// How many numbered paths a probe tries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeCount {
    /// Try exactly this many indices, skipping absent ones
    Exactly(usize),
    /// Try indices until the first absent one
    UntilAbsent,
}

/// One scalar pseudo-file
#[derive(Debug)]
pub struct FileSensor {
    name: String,
    path: PathBuf,
    data: String,
}

impl FileSensor {
    /// Open the file sensor if its path can be read
    pub fn open(name: &str, path: impl Into<PathBuf>) -> Option<Self> {
        let mut sensor = Self {
            name: clamp_name(name),
            path: path.into(),
            data: String::new(),
        };
        match sensor.read() {
            Ok(()) => Some(sensor),
            Err(e) => {
                debug!("{}: {} not available: {}", name, sensor.path.display(), e);
                None
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn last(&self) -> &str {
        &self.data
    }
}

impl Sensor for FileSensor {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&mut self) -> Result<()> {
        self.data = read_line(&self.path)?;
        Ok(())
    }

    fn print_last(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "{} {}", self.name, self.data)
    }
}

/// Probe `<path_prefix><i><path_suffix>` for a run of indices, naming each
/// hit `<name_prefix><i>`
pub fn probe_numbered(
    name_prefix: &str,
    path_prefix: &str,
    path_suffix: &str,
    count: ProbeCount,
) -> Vec<FileSensor> {
    let limit = match count {
        ProbeCount::Exactly(n) => n,
        ProbeCount::UntilAbsent => usize::MAX,
    };

    let mut sensors = Vec::new();
    for i in 0..limit {
        let name = format!("{}{}", name_prefix, i);
        let path = format!("{}{}{}", path_prefix, i, path_suffix);
        match FileSensor::open(&name, path) {
            Some(sensor) => sensors.push(sensor),
            None if count == ProbeCount::UntilAbsent => break,
            None => {}
        }
    }
    sensors
}

/// Number of configured processors
pub fn configured_cpus() -> usize {
    // SAFETY: sysconf has no memory-safety preconditions
    let n = unsafe { libc::sysconf(libc::_SC_NPROCESSORS_CONF) };
    usize::try_from(n).unwrap_or(1).max(1)
}

/// CPU frequencies, thermal zones and the CPU fan, in that order
pub fn probe(paths: &PathsConfig) -> Vec<Box<dyn Sensor>> {
    let cpus = match paths.cpu_count {
        0 => configured_cpus(),
        n => n,
    };

    let mut sensors: Vec<Box<dyn Sensor>> = Vec::new();
    let cpufreq = probe_numbered(
        "cpu_freq",
        &paths.cpufreq_prefix,
        &paths.cpufreq_suffix,
        ProbeCount::Exactly(cpus),
    );
    let thermal = probe_numbered(
        "thermal_zone_temp",
        &paths.thermal_prefix,
        &paths.thermal_suffix,
        ProbeCount::UntilAbsent,
    );
    sensors.extend(
        cpufreq
            .into_iter()
            .chain(thermal)
            .map(|s| Box::new(s) as Box<dyn Sensor>),
    );

    if let Some(fan) = FileSensor::open("cpu_fan", &paths.cpu_fan) {
        sensors.push(Box::new(fan));
    }
    sensors
}
