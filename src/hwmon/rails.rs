//! INA226 rail monitors (Zynq UltraScale+ ZCU102)
//!
//! The ZCU102 carries one INA226 per power rail, each registered as its own
//! hwmon entry named after the part's board designator (`ina226_u76`, ...).
//! The rail table maps rails to those names; matched entries of one rail
//! group are aggregated into a single sensor that prints the summed power and
//! a summed current × voltage cross-check.
//!
//! Rail assignment follows Xilinx's "Accurate Design Power Measurement" note.
//! Other boards only need a different table.

use super::{scan_entries, MeasurePair};
use crate::error::Result;
use crate::sensor::{clamp_name, Sensor};
use log::debug;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::path::Path;

/// Processing-system or programmable-logic side of the SoC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RailGroup {
    Ps,
    Pl,
}

impl RailGroup {
    /// Name of the aggregate sensor for this group
    pub fn sensor_name(self) -> &'static str {
        match self {
            RailGroup::Ps => "sensor_ina226",
            RailGroup::Pl => "sensor_ina226_pl",
        }
    }
}

/// One row of the rail table
#[derive(Debug, PartialEq, Eq)]
pub struct Rail {
    pub id: &'static str,
    pub line: &'static str,
    pub group: RailGroup,
    /// Feeds the ARM debug subsystem; never sampled
    pub debug: bool,
}

const fn rail(id: &'static str, line: &'static str, group: RailGroup) -> Rail {
    Rail {
        id,
        line,
        group,
        debug: false,
    }
}

pub static RAIL_TABLE: [Rail; 18] = [
    // PS
    rail("VCCPSINTFP", "ina226_u76", RailGroup::Ps),
    rail("VCCINTLP", "ina226_u77", RailGroup::Ps),
    rail("VCCPSAUX", "ina226_u78", RailGroup::Ps),
    rail("VCCPSPLL", "ina226_u87", RailGroup::Ps),
    rail("MGTRAVCC", "ina226_u85", RailGroup::Ps),
    rail("MGTRAVTT", "ina226_u86", RailGroup::Ps),
    rail("VCCPSDDR", "ina226_u93", RailGroup::Ps),
    Rail {
        id: "VCCOPS",
        line: "ina226_u88",
        group: RailGroup::Ps,
        debug: true,
    },
    Rail {
        id: "VCCOPS3",
        line: "ina226_u15",
        group: RailGroup::Ps,
        debug: true,
    },
    rail("VCCPSDDRPLL", "ina226_u92", RailGroup::Ps),
    // PL
    rail("VCCINT", "ina226_u79", RailGroup::Pl),
    rail("VCCBRAM", "ina226_u81", RailGroup::Pl),
    rail("VCCAUX", "ina226_u80", RailGroup::Pl),
    rail("VCC1V2", "ina226_u84", RailGroup::Pl),
    rail("VCC3V3", "ina226_u16", RailGroup::Pl),
    rail("VADJ_FMC", "ina226_u65", RailGroup::Pl),
    rail("MGTAVCC", "ina226_u74", RailGroup::Pl),
    rail("MGTAVTT", "ina226_u75", RailGroup::Pl),
];

/// Sampled rail of `group` whose hwmon line name is exactly `label`
pub fn lookup(label: &str, group: RailGroup) -> Option<&'static Rail> {
    RAIL_TABLE
        .iter()
        .filter(|r| r.group == group && !r.debug)
        .find(|r| r.line == label)
}

/// Measurement pairs of one matched rail
#[derive(Debug)]
pub struct RailEntry {
    pub rail: &'static Rail,
    pub current: MeasurePair,
    pub voltage: MeasurePair,
    pub power: MeasurePair,
}

impl RailEntry {
    fn update(&mut self) {
        self.current.update();
        self.voltage.update();
        self.power.update();
    }
}

/// Aggregated readings of a rail group, both in µW
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RailTotals {
    pub power_uw: i64,
    /// Σ current (mA) × voltage (mV)
    pub calc_uw: i64,
}

/// All matched rails of one group
#[derive(Debug)]
pub struct RailSensor {
    name: String,
    group: RailGroup,
    entries: Vec<RailEntry>,
}

impl RailSensor {
    /// Scan `hwmon_dir` for the rails of `group`; `None` if none matched
    pub fn probe(hwmon_dir: &Path, group: RailGroup) -> Option<Self> {
        let entries: Vec<RailEntry> = scan_entries(hwmon_dir)
            .into_iter()
            .filter_map(|entry| {
                let rail = lookup(&entry.label, group)?;
                debug!("{} on {}", rail.id, entry.dir.display());
                let dir = entry.dir.as_path();
                Some(RailEntry {
                    rail,
                    current: MeasurePair::probe(dir, "curr1_input", "curr2_input"),
                    voltage: MeasurePair::probe(dir, "in1_input", "in2_input"),
                    power: MeasurePair::probe(dir, "power1_input", "power2_input"),
                })
            })
            .collect();

        if entries.is_empty() {
            return None;
        }
        Some(Self::with_entries(group, entries))
    }

    fn with_entries(group: RailGroup, entries: Vec<RailEntry>) -> Self {
        Self {
            name: clamp_name(group.sensor_name()),
            group,
            entries,
        }
    }

    pub fn group(&self) -> RailGroup {
        self.group
    }

    pub fn entries(&self) -> &[RailEntry] {
        &self.entries
    }

    pub fn totals(&self) -> RailTotals {
        self.entries
            .iter()
            .fold(RailTotals::default(), |acc, e| RailTotals {
                power_uw: acc.power_uw + e.power.diff_value,
                calc_uw: acc.calc_uw + e.current.diff_value * e.voltage.diff_value,
            })
    }
}

impl Sensor for RailSensor {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&mut self) -> Result<()> {
        self.entries.iter_mut().for_each(RailEntry::update);
        Ok(())
    }

    fn print_last(&self, out: &mut dyn Write) -> io::Result<()> {
        let totals = self.totals();
        writeln!(out, "{}_uW {}", self.name, totals.power_uw)?;
        writeln!(out, "{}_CALC_uW {}", self.name, totals.calc_uw)
    }
}

/// One aggregate sensor per group that matched at least one rail
pub fn probe(hwmon_dir: &Path, groups: &[RailGroup]) -> Vec<Box<dyn Sensor>> {
    groups
        .iter()
        .filter_map(|&group| RailSensor::probe(hwmon_dir, group))
        .map(|s| Box::new(s) as Box<dyn Sensor>)
        .collect()
}
