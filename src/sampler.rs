//! The sampling loop
//!
//! Output format:
//!
//! ```text
//! UPDATE_PERIOD_us <period>
//!
//! [MARK <n>]
//! <name> <value>
//! ...
//!
//! ```
//!
//! The header is flushed before the first tick. During the run output goes
//! through a block buffer that is flushed once per tick.

use crate::error::Result;
use crate::periodic::{effective_period_us, PeriodicTimer};
use crate::registry::SensorRegistry;
use crate::termination::TerminationState;
use log::{debug, info};
use std::io::{BufWriter, Write};

const OUTPUT_BUFFER_SIZE: usize = 64 * 1024;

/// Owns the discovered sensors and drives them at a fixed period
pub struct Sampler {
    registry: SensorRegistry,
    period_us: i64,
}

impl Sampler {
    /// Use the smallest period any sensor asks for, else `default_period_us`
    pub fn new(registry: SensorRegistry, default_period_us: i64) -> Self {
        let period_us = effective_period_us(registry.periods_us(), default_period_us);
        Self {
            registry,
            period_us,
        }
    }

    pub fn period_us(&self) -> i64 {
        self.period_us
    }

    pub fn registry(&self) -> &SensorRegistry {
        &self.registry
    }

    /// Close every sensor without sampling
    pub fn close(self) {
        self.registry.close_all();
    }

    /// Sample until `state` requests a stop; returns the number of ticks.
    ///
    /// Every sensor is closed exactly once on return, including when writing
    /// to `out` fails.
    pub fn run<W: Write>(self, out: W, state: &TerminationState) -> Result<u64> {
        let Self {
            mut registry,
            period_us,
        } = self;

        let result = sample_loop(&mut registry, period_us, out, state);
        match &result {
            Ok(ticks) => info!("stopped after {} tick(s)", ticks),
            Err(e) => info!("sampling aborted: {}", e),
        }
        registry.close_all();
        result
    }
}

fn sample_loop<W: Write>(
    registry: &mut SensorRegistry,
    period_us: i64,
    mut out: W,
    state: &TerminationState,
) -> Result<u64> {
    writeln!(out, "UPDATE_PERIOD_us {}", period_us)?;
    writeln!(out)?;
    out.flush()?;

    let mut out = BufWriter::with_capacity(OUTPUT_BUFFER_SIZE, out);
    let mut timer = PeriodicTimer::start(period_us)?;
    let mut marks: u64 = 0;
    let mut ticks: u64 = 0;

    while !state.stop_requested() {
        if state.take_mark() {
            marks += 1;
            writeln!(out, "MARK {}", marks)?;
        }

        let failed = registry.read_all();
        if failed > 0 {
            debug!("tick {}: {} read(s) failed", ticks, failed);
        }
        registry.print_all(&mut out)?;
        writeln!(out)?;
        out.flush()?;
        ticks += 1;

        timer.wait_next()?;
    }

    out.flush()?;
    Ok(ticks)
}
