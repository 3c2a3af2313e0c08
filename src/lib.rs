//! # Board Sampler
//!
//! Fixed-cadence power, thermal and frequency telemetry for embedded Linux
//! boards. Every sensor the board exposes is discovered once at startup and
//! then read at a shared period, one `name value` line per reading.
//!
//! ## Sources
//!
//! - **File**: cpufreq, thermal zones and fan PWM pseudo-files
//! - **hwmon clusters**: paired input/output current, voltage, power, temperature
//! - **IIO**: offset/scale/raw ADC channels (Zynq UltraScale+ die temperature)
//! - **INA226 rails**: hwmon entries aggregated per ZCU102 rail group
//! - **INA231**: ODROID-XU3 ioctl control devices
//! - **SmartPower**: ODROID USB HID power meter (`smartpower` feature)
//!
//! ## Quick Start
//!
//! ```no_run
//! use board_sampler::{probe_all, Config, Sampler, SignalHandlers};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load()?;
//! let handlers = SignalHandlers::install()?;
//!
//! let sampler = Sampler::new(probe_all(&config), config.sampling.default_period_us);
//! sampler.run(std::io::stdout().lock(), handlers.state())?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` - `sample-sensors` command-line tool (default)
//! - `smartpower` - USB HID meter support via hidapi (Linux only)
//! - `full` - All features enabled

pub mod config; // Configuration management with TOML persistence
pub mod error;
pub mod hwmon; // hwmon clusters and INA226 rail aggregation
pub mod periodic; // Drift-free absolute-time scheduling
pub mod probe;
pub mod registry;
pub mod sampler;
pub mod sensor;
pub mod sensors; // File, IIO and INA231 backends
pub mod smartpower; // ODROID SmartPower USB meter
pub mod sysfs;
pub mod termination; // Signal-driven stop/mark requests

// Re-export main types
pub use config::Config;
pub use error::{Result, SamplerError};
pub use probe::probe_all;
pub use registry::SensorRegistry;
pub use sampler::Sampler;
pub use sensor::Sensor;
pub use termination::{SignalHandlers, TerminationState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
