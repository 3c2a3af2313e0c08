//! Configuration management for Board Sampler
//!
//! Every device path the backends touch is configurable so the sampler can be
//! pointed at a different board layout (or at a fake sysfs tree in tests).
//! Missing sections and keys fall back to the defaults of the reference
//! boards (ODROID-XU3 for INA231/SmartPower, ZCU102 for INA226).

use crate::error::{Result, SamplerError};
use crate::hwmon::rails::RailGroup;
use crate::periodic::DEFAULT_PERIOD_US;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Board Sampler configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Sampling cadence options
    #[serde(default)]
    pub sampling: SamplingConfig,
    /// Which backends are probed
    #[serde(default)]
    pub sources: SourcesConfig,
    /// Device paths
    #[serde(default)]
    pub paths: PathsConfig,
    /// USB HID meter options
    #[serde(default)]
    pub smartpower: SmartPowerConfig,
}

/// Sampling cadence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Period used when no sensor declares one, in microseconds
    #[serde(default = "default_period_us")]
    pub default_period_us: i64,
    /// SCHED_FIFO priority; 0 keeps the default scheduler
    #[serde(default)]
    pub realtime_priority: i32,
}

/// Backend selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "default_true")]
    pub file: bool,
    #[serde(default = "default_true")]
    pub hwmon: bool,
    #[serde(default = "default_true")]
    pub iio: bool,
    #[serde(default = "default_true")]
    pub ina226: bool,
    /// INA226 rail groups, each aggregated into its own sensor
    #[serde(default = "default_ina226_groups")]
    pub ina226_groups: Vec<RailGroup>,
    #[serde(default = "default_true")]
    pub ina231: bool,
    #[serde(default = "default_true")]
    pub smartpower: bool,
}

/// One INA231 control device and its update-period attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ina231Device {
    pub device: PathBuf,
    pub update_period: PathBuf,
}

/// Device paths
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_cpufreq_prefix")]
    pub cpufreq_prefix: String,
    #[serde(default = "default_cpufreq_suffix")]
    pub cpufreq_suffix: String,
    /// Number of cpufreq files to try; 0 asks the OS for configured CPUs
    #[serde(default)]
    pub cpu_count: usize,
    #[serde(default = "default_thermal_prefix")]
    pub thermal_prefix: String,
    #[serde(default = "default_thermal_suffix")]
    pub thermal_suffix: String,
    #[serde(default = "default_cpu_fan")]
    pub cpu_fan: PathBuf,
    #[serde(default = "default_hwmon_dir")]
    pub hwmon_dir: PathBuf,
    #[serde(default = "default_iio_offset")]
    pub iio_offset: PathBuf,
    #[serde(default = "default_iio_scale")]
    pub iio_scale: PathBuf,
    #[serde(default = "default_iio_raw")]
    pub iio_raw: PathBuf,
    #[serde(default = "default_ina231_devices")]
    pub ina231: Vec<Ina231Device>,
}

/// USB HID meter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmartPowerConfig {
    #[serde(default = "default_vendor_id")]
    pub vendor_id: u16,
    #[serde(default = "default_product_id")]
    pub product_id: u16,
    /// How long to wait for a response frame
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: i32,
}

// Default value functions
fn default_period_us() -> i64 {
    DEFAULT_PERIOD_US
}

fn default_true() -> bool {
    true
}

fn default_ina226_groups() -> Vec<RailGroup> {
    vec![RailGroup::Ps]
}

fn default_cpufreq_prefix() -> String {
    "/sys/devices/system/cpu/cpu".to_string()
}

fn default_cpufreq_suffix() -> String {
    "/cpufreq/scaling_cur_freq".to_string()
}

fn default_thermal_prefix() -> String {
    "/sys/devices/virtual/thermal/thermal_zone".to_string()
}

fn default_thermal_suffix() -> String {
    "/temp".to_string()
}

fn default_cpu_fan() -> PathBuf {
    PathBuf::from("/sys/devices/platform/pwm-fan/hwmon/hwmon0/pwm1")
}

fn default_hwmon_dir() -> PathBuf {
    PathBuf::from("/sys/class/hwmon")
}

const IIO_DEVICE: &str = "/sys/bus/iio/devices/iio:device0";

fn default_iio_offset() -> PathBuf {
    Path::new(IIO_DEVICE).join("in_temp0_ps_temp_offset")
}

fn default_iio_scale() -> PathBuf {
    Path::new(IIO_DEVICE).join("in_temp0_ps_temp_scale")
}

fn default_iio_raw() -> PathBuf {
    Path::new(IIO_DEVICE).join("in_temp0_ps_temp_raw")
}

// Kernel 4.9+ bus numbering ("3-00xx" on 3.x kernels)
const INA231_DRIVER_DIR: &str = "/sys/bus/i2c/drivers/INA231";

fn default_ina231_devices() -> Vec<Ina231Device> {
    [
        ("arm", "0-0040"),
        ("mem", "0-0041"),
        ("kfc", "0-0045"),
        ("g3d", "0-0044"),
    ]
    .iter()
    .map(|(rail, addr)| Ina231Device {
        device: PathBuf::from(format!("/dev/sensor_{}", rail)),
        update_period: Path::new(INA231_DRIVER_DIR)
            .join(addr)
            .join("update_period"),
    })
    .collect()
}

fn default_vendor_id() -> u16 {
    0x04d8
}

fn default_product_id() -> u16 {
    0x003f
}

fn default_read_timeout_ms() -> i32 {
    1000
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            default_period_us: default_period_us(),
            realtime_priority: 0,
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            file: true,
            hwmon: true,
            iio: true,
            ina226: true,
            ina226_groups: default_ina226_groups(),
            ina231: true,
            smartpower: true,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            cpufreq_prefix: default_cpufreq_prefix(),
            cpufreq_suffix: default_cpufreq_suffix(),
            cpu_count: 0,
            thermal_prefix: default_thermal_prefix(),
            thermal_suffix: default_thermal_suffix(),
            cpu_fan: default_cpu_fan(),
            hwmon_dir: default_hwmon_dir(),
            iio_offset: default_iio_offset(),
            iio_scale: default_iio_scale(),
            iio_raw: default_iio_raw(),
            ina231: default_ina231_devices(),
        }
    }
}

impl Default for SmartPowerConfig {
    fn default() -> Self {
        Self {
            vendor_id: default_vendor_id(),
            product_id: default_product_id(),
            read_timeout_ms: default_read_timeout_ms(),
        }
    }
}

impl Config {
    /// Get the default configuration directory
    ///
    /// Returns `~/.config/board-sampler` on Unix-like systems.
    pub fn default_path() -> PathBuf {
        std::env::var("HOME")
            .map(|home| PathBuf::from(home).join(".config"))
            .unwrap_or_else(|_| PathBuf::from(".config"))
            .join("board-sampler")
    }

    /// Load configuration from the default path, or defaults if absent
    pub fn load() -> Result<Self> {
        let config_file = Self::default_path().join("config.toml");

        if !config_file.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&config_file)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| SamplerError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the sampler cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.sampling.default_period_us <= 0 {
            return Err(SamplerError::Config(format!(
                "default_period_us must be positive, got {}",
                self.sampling.default_period_us
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.sampling.default_period_us, 50_000);
        assert_eq!(config.sampling.realtime_priority, 0);
        assert!(config.sources.smartpower);
        assert_eq!(config.sources.ina226_groups, vec![RailGroup::Ps]);
        assert_eq!(config.paths.ina231.len(), 4);
        assert_eq!(
            config.paths.ina231[2].update_period,
            PathBuf::from("/sys/bus/i2c/drivers/INA231/0-0045/update_period")
        );
        assert_eq!(config.smartpower.vendor_id, 0x04d8);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [sampling]
            default_period_us = 10000

            [sources]
            smartpower = false
            ina226_groups = ["ps", "pl"]

            [paths]
            hwmon_dir = "/tmp/hwmon"
            "#,
        )
        .unwrap();

        assert_eq!(config.sampling.default_period_us, 10_000);
        assert!(!config.sources.smartpower);
        assert!(config.sources.hwmon);
        assert_eq!(
            config.sources.ina226_groups,
            vec![RailGroup::Ps, RailGroup::Pl]
        );
        assert_eq!(config.paths.hwmon_dir, PathBuf::from("/tmp/hwmon"));
        assert_eq!(config.paths.thermal_suffix, "/temp");
    }

    #[test]
    fn test_load_rejects_bad_period() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[sampling]\ndefault_period_us = 0\n").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(SamplerError::Config(_))
        ));
    }
}
