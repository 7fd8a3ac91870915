use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub};

/// Microseconds since the start of a simulation run.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SimulationTime(u64);

impl SimulationTime {
    pub const ZERO: SimulationTime = SimulationTime(0);

    pub const fn from_micros(us: u64) -> Self {
        Self(us)
    }

    pub const fn from_millis(ms: u64) -> Self {
        Self(ms * 1_000)
    }

    /// Negative and non-finite inputs map to zero.
    pub fn from_secs_f64(seconds: f64) -> Self {
        if seconds.is_finite() && seconds > 0.0 {
            Self((seconds * 1_000_000.0) as u64)
        } else {
            Self::ZERO
        }
    }

    pub const fn as_micros(&self) -> u64 {
        self.0
    }

    pub fn as_millis_f64(&self) -> f64 {
        self.0 as f64 / 1_000.0
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / 1_000_000.0
    }

    /// Elapsed microseconds since `earlier`, zero if `earlier` is later.
    pub fn saturating_elapsed_since(&self, earlier: SimulationTime) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl Add for SimulationTime {
    type Output = SimulationTime;

    fn add(self, rhs: SimulationTime) -> SimulationTime {
        SimulationTime(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for SimulationTime {
    fn add_assign(&mut self, rhs: SimulationTime) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

/// Never negative: subtracting a later time yields zero.
impl Sub for SimulationTime {
    type Output = SimulationTime;

    fn sub(self, rhs: SimulationTime) -> SimulationTime {
        SimulationTime(self.0.saturating_sub(rhs.0))
    }
}

impl fmt::Display for SimulationTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}s", self.as_secs_f64())
    }
}

/// Monotonic simulation clock. Only ever moves forward by whole steps.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulationClock {
    now: SimulationTime,
}

impl SimulationClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> SimulationTime {
        self.now
    }

    pub fn advance(&mut self, step: SimulationTime) -> SimulationTime {
        self.now += step;
        self.now
    }

    /// True when one more `step` does not pass `target_seconds`.
    pub fn fits_before(&self, step: SimulationTime, target_seconds: f64) -> bool {
        (self.now + step).as_secs_f64() <= target_seconds
    }
}
