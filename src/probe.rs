//! One-shot sensor discovery
//!
//! Every enabled backend is probed once, in a fixed order that is also the
//! print order: file, hwmon clusters, iio, INA226 rails, INA231, SmartPower.
//! A backend finding nothing is not an error.

use crate::config::Config;
use crate::registry::SensorRegistry;
use crate::sensor::Sensor;
use crate::{hwmon, sensors, smartpower};
use log::info;

fn merge(registry: &mut SensorRegistry, backend: &str, found: Vec<Box<dyn Sensor>>) {
    info!("{}: {} sensor(s)", backend, found.len());
    registry.extend(found);
}

/// Probe all enabled backends into a new registry
pub fn probe_all(config: &Config) -> SensorRegistry {
    let sources = &config.sources;
    let paths = &config.paths;
    let mut registry = SensorRegistry::new();

    if sources.file {
        merge(&mut registry, "file", sensors::file::probe(paths));
    }
    if sources.hwmon {
        merge(&mut registry, "hwmon", hwmon::cluster::probe(&paths.hwmon_dir));
    }
    if sources.iio {
        merge(
            &mut registry,
            "iio",
            sensors::iio::probe(paths).into_iter().collect(),
        );
    }
    if sources.ina226 {
        merge(
            &mut registry,
            "ina226",
            hwmon::rails::probe(&paths.hwmon_dir, &sources.ina226_groups),
        );
    }
    if sources.ina231 {
        merge(&mut registry, "ina231", sensors::ina231::probe(&paths.ina231));
    }
    if sources.smartpower {
        merge(
            &mut registry,
            "smartpower",
            smartpower::probe(&config.smartpower).into_iter().collect(),
        );
    }

    info!("{} sensor(s) discovered", registry.len());
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Ina231Device;
    use crate::hwmon::tests::fake_entry;
    use std::fs;
    use std::path::Path;

    /// Config with every path under `root` and no USB meter
    fn fake_config(root: &Path) -> Config {
        let mut config = Config::default();
        let sys = root.to_string_lossy();
        config.paths.cpufreq_prefix = format!("{}/cpu", sys);
        config.paths.cpufreq_suffix = "/scaling_cur_freq".to_string();
        config.paths.cpu_count = 2;
        config.paths.thermal_prefix = format!("{}/thermal_zone", sys);
        config.paths.thermal_suffix = "/temp".to_string();
        config.paths.cpu_fan = root.join("pwm1");
        config.paths.hwmon_dir = root.join("hwmon");
        config.paths.iio_offset = root.join("in_temp0_offset");
        config.paths.iio_scale = root.join("in_temp0_scale");
        config.paths.iio_raw = root.join("in_temp0_raw");
        config.paths.ina231 = vec![Ina231Device {
            device: root.join("sensor_arm"),
            update_period: root.join("update_period"),
        }];
        config.sources.smartpower = false;
        config
    }

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn names(registry: &SensorRegistry) -> Vec<String> {
        registry.iter().map(|s| s.name().to_string()).collect()
    }

    #[test]
    fn test_nothing_present() {
        let root = tempfile::tempdir().unwrap();
        let registry = probe_all(&fake_config(root.path()));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_discovery_order() {
        let root = tempfile::tempdir().unwrap();
        let r = root.path();
        // cpu0 is offline; cpu1 still has to be found
        write(&r.join("cpu1/scaling_cur_freq"), "1400000\n");
        write(&r.join("thermal_zone0/temp"), "45000\n");
        write(&r.join("pwm1"), "120\n");
        fake_entry(
            &r.join("hwmon"),
            "hwmon0",
            "ina226_u76",
            &[("curr1_input", 2), ("in1_input", 850), ("power1_input", 1700)],
        );
        write(&r.join("in_temp0_offset"), "-36058\n");
        write(&r.join("in_temp0_scale"), "7.5\n");
        write(&r.join("in_temp0_raw"), "43058\n");

        let registry = probe_all(&fake_config(r));
        assert_eq!(
            names(&registry),
            [
                "cpu_freq1",
                "thermal_zone_temp0",
                "cpu_fan",
                "hwmon_ina226_u76",
                "cpu_iio_temp",
                "sensor_ina226",
            ]
        );
        registry.close_all();
    }

    #[test]
    fn test_disabled_sources_are_skipped() {
        let root = tempfile::tempdir().unwrap();
        let r = root.path();
        write(&r.join("pwm1"), "120\n");
        fake_entry(&r.join("hwmon"), "hwmon0", "ina226_u76", &[("power1_input", 10)]);

        let mut config = fake_config(r);
        config.sources.hwmon = false;
        config.sources.file = false;
        assert_eq!(names(&probe_all(&config)), ["sensor_ina226"]);

        config.sources.ina226 = false;
        assert!(probe_all(&config).is_empty());
    }
}
