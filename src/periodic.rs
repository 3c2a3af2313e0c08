//! Drift-free periodic activation
//!
//! The timer keeps an absolute `CLOCK_MONOTONIC` deadline and advances it by
//! exactly one period per tick, so the time spent reading and printing does
//! not accumulate into the cadence. If a tick overruns its period the next
//! wait returns immediately; there is no catch-up or skip policy.

use crate::error::{Result, SamplerError};
use log::debug;
use nix::errno::Errno;
use nix::sys::time::{TimeSpec, TimeValLike};
use nix::time::{clock_gettime, clock_nanosleep, ClockId, ClockNanosleepFlags};

/// Period used when no sensor declares a preference (20 Hz)
pub const DEFAULT_PERIOD_US: i64 = 50_000;

/// Smallest strictly positive period, or `default_us` if there is none
pub fn effective_period_us<I>(periods: I, default_us: i64) -> i64
where
    I: IntoIterator<Item = i64>,
{
    periods
        .into_iter()
        .filter(|&p| p > 0)
        .min()
        .unwrap_or(default_us)
}

/// Absolute-time periodic timer
#[derive(Debug, Clone)]
pub struct PeriodicTimer {
    next_wake: TimeSpec,
    period: TimeSpec,
}

impl PeriodicTimer {
    /// Seed the first deadline from the monotonic clock
    pub fn start(period_us: i64) -> Result<Self> {
        if period_us <= 0 {
            return Err(SamplerError::Config(format!(
                "sampling period must be positive, got {} us",
                period_us
            )));
        }
        let now = clock_gettime(ClockId::CLOCK_MONOTONIC)?;
        Ok(Self::starting_at(now, period_us))
    }

    fn starting_at(origin: TimeSpec, period_us: i64) -> Self {
        Self {
            next_wake: origin,
            period: TimeSpec::microseconds(period_us),
        }
    }

    /// Absolute instant the last `wait_next` slept until (the origin before
    /// the first wait)
    pub fn next_wake(&self) -> TimeSpec {
        self.next_wake
    }

    pub fn period_us(&self) -> i64 {
        self.period.num_microseconds()
    }

    fn advance(&mut self) {
        self.next_wake = self.next_wake + self.period;
    }

    /// Advance the deadline by one period and sleep until it
    pub fn wait_next(&mut self) -> Result<()> {
        self.advance();
        loop {
            match clock_nanosleep(
                ClockId::CLOCK_MONOTONIC,
                ClockNanosleepFlags::TIMER_ABSTIME,
                &self.next_wake,
            ) {
                Ok(_) => return Ok(()),
                // signals only set flags; keep sleeping to the same deadline
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Switch the process to `SCHED_FIFO` at `priority`, clamped to the range
/// the policy allows
pub fn set_realtime_priority(priority: i32) -> Result<()> {
    let policy = libc::SCHED_FIFO;
    // SAFETY: plain syscalls without pointer arguments
    let (min, max) = unsafe {
        (
            libc::sched_get_priority_min(policy),
            libc::sched_get_priority_max(policy),
        )
    };
    if min < 0 || max < 0 {
        return Err(Errno::last().into());
    }
    let param = libc::sched_param {
        sched_priority: priority.clamp(min, max),
    };
    // SAFETY: param is a valid sched_param living across the call
    let res = unsafe { libc::sched_setscheduler(0, policy, &param) };
    if res != 0 {
        return Err(Errno::last().into());
    }
    debug!("SCHED_FIFO priority {}", param.sched_priority);
    Ok(())
}
