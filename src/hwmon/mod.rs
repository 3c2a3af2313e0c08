//! Hardware monitoring clusters under /sys/class/hwmon
//!
//! Each hwmon entry exposes a `name` file plus numbered measurement files.
//! Boards in the field wire the INA2xx shunt monitors so that channel 1 is the
//! input side and channel 2 the output side of the measured element; the
//! sampler reports the absolute difference between the two.
//!
//! Two backends share the directory scan:
//! - `cluster`: every entry that has at least one measurement file
//! - `rails`: only entries whose label matches a known INA226 rail

pub mod cluster;
pub mod rails;

use crate::sysfs::{path_exists, read_file_i64, read_line};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

pub use cluster::HwmonSensor;
pub use rails::{RailGroup, RailSensor};

const NAME_FILE: &str = "name";

/// Input/output file pair of one measurement category
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeasurePair {
    pub in_path: Option<PathBuf>,
    pub out_path: Option<PathBuf>,
    pub in_value: i64,
    pub out_value: i64,
    pub diff_value: i64,
}

impl MeasurePair {
    /// Build the pair, keeping only the paths that exist right now
    pub fn probe(dir: &Path, in_file: &str, out_file: &str) -> Self {
        Self {
            in_path: existing(dir.join(in_file)),
            out_path: existing(dir.join(out_file)),
            in_value: 0,
            out_value: 0,
            diff_value: 0,
        }
    }

    /// Whether either side was found
    pub fn exists(&self) -> bool {
        self.in_path.is_some() || self.out_path.is_some()
    }

    /// Re-read both sides and recompute the difference
    pub fn update(&mut self) {
        self.in_value = read_or_zero(self.in_path.as_deref());
        self.out_value = read_or_zero(self.out_path.as_deref());
        self.diff_value = (self.in_value - self.out_value).abs();
    }
}

fn existing(path: PathBuf) -> Option<PathBuf> {
    path_exists(&path).then_some(path)
}

// An absent side reads as 0, and so does a present side that fails to read.
fn read_or_zero(path: Option<&Path>) -> i64 {
    let Some(path) = path else {
        return 0;
    };
    read_file_i64(path).unwrap_or_else(|e| {
        debug!("{}: {}, using 0", path.display(), e);
        0
    })
}

/// One labeled entry of the hwmon directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HwmonEntry {
    pub dir: PathBuf,
    pub label: String,
}

/// List hwmon entries with a readable, non-empty `name` file, sorted by
/// directory name
pub fn scan_entries(hwmon_dir: &Path) -> Vec<HwmonEntry> {
    let entries = match fs::read_dir(hwmon_dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("{}: {}", hwmon_dir.display(), e);
            return Vec::new();
        }
    };

    let mut dirs: Vec<PathBuf> = entries.filter_map(|e| e.ok()).map(|e| e.path()).collect();
    dirs.sort();

    dirs.into_iter()
        .filter_map(|dir| match read_line(dir.join(NAME_FILE)) {
            Ok(label) if !label.is_empty() => Some(HwmonEntry { dir, label }),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Create `<root>/<entry>` with a name file and the given measurement files
    pub(crate) fn fake_entry(root: &Path, entry: &str, label: &str, files: &[(&str, i64)]) {
        let dir = root.join(entry);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("name"), format!("{}\n", label)).unwrap();
        for (file, value) in files {
            fs::write(dir.join(file), format!("{}\n", value)).unwrap();
        }
    }

    #[test]
    fn test_absent_input_reads_as_zero() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("curr2_input"), "7\n").unwrap();

        let mut pair = MeasurePair::probe(dir.path(), "curr1_input", "curr2_input");
        assert!(pair.in_path.is_none());
        assert!(pair.exists());

        pair.update();
        assert_eq!(pair.in_value, 0);
        assert_eq!(pair.out_value, 7);
        assert_eq!(pair.diff_value, 7);
    }

    #[test]
    fn test_difference_is_absolute() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("in1_input"), "3300").unwrap();
        fs::write(dir.path().join("in2_input"), "5000").unwrap();

        let mut pair = MeasurePair::probe(dir.path(), "in1_input", "in2_input");
        pair.update();
        assert_eq!(pair.diff_value, 1700);

        fs::write(dir.path().join("in2_input"), "1000").unwrap();
        pair.update();
        assert_eq!(pair.diff_value, 2300);
    }

    #[test]
    fn test_vanished_file_reads_as_zero() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("power1_input"), "900").unwrap();

        let mut pair = MeasurePair::probe(dir.path(), "power1_input", "power2_input");
        fs::remove_file(dir.path().join("power1_input")).unwrap();
        pair.update();
        assert_eq!(pair.diff_value, 0);
    }

    #[test]
    fn test_scan_skips_unlabeled_entries() {
        let root = tempfile::tempdir().unwrap();
        fake_entry(root.path(), "hwmon1", "ina226_u76", &[]);
        fake_entry(root.path(), "hwmon0", "pwmfan", &[]);
        fs::create_dir(root.path().join("hwmon2")).unwrap();
        fake_entry(root.path(), "hwmon3", "", &[]);

        let labels: Vec<_> = scan_entries(root.path())
            .into_iter()
            .map(|e| e.label)
            .collect();
        assert_eq!(labels, ["pwmfan", "ina226_u76"]);
    }

    #[test]
    fn test_scan_missing_directory() {
        let root = tempfile::tempdir().unwrap();
        assert!(scan_entries(&root.path().join("hwmon")).is_empty());
    }
}
