//! Simulation timestep shared by every neuron in a step.

use crate::error::ConfigError;
use crate::fixed::Fixed;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimestepContext {
    micros: u32,
}

impl TimestepContext {
    pub fn from_micros(micros: u32) -> Result<Self, ConfigError> {
        if micros == 0 {
            return Err(ConfigError::InvalidTimestep(0.0));
        }
        Ok(Self { micros })
    }

    /// Rounds to the nearest microsecond.
    pub fn from_millis(ms: f64) -> Result<Self, ConfigError> {
        let micros = (ms * 1000.0).round();
        if !micros.is_finite() || micros < 1.0 || micros > u32::MAX as f64 {
            return Err(ConfigError::InvalidTimestep(ms * 1000.0));
        }
        Ok(Self {
            micros: micros as u32,
        })
    }

    pub fn micros(&self) -> u32 {
        self.micros
    }

    pub fn dt_ms(&self) -> f64 {
        self.micros as f64 / 1000.0
    }

    pub fn dt_s(&self) -> f64 {
        self.micros as f64 / 1_000_000.0
    }

    /// Integration step in milliseconds, as fixed point.
    pub fn h(&self) -> Fixed {
        Fixed::from_f64(self.dt_ms())
    }

    /// Number of whole timesteps needed to cover `seconds`, rounded up.
    ///
    /// Computed in integer nanoseconds so a period that is an exact multiple of
    /// the timestep never picks up an extra tick from float noise.
    pub fn ticks_covering(&self, seconds: f64) -> u32 {
        if !(seconds > 0.0) {
            return 0;
        }
        let ns = (seconds * 1.0e9).round();
        if ns >= u64::MAX as f64 {
            return u32::MAX;
        }
        let step_ns = self.micros as u64 * 1000;
        // a positive period below the nanosecond grid still costs one tick
        let ticks = (ns as u64).div_ceil(step_ns).max(1);
        ticks.min(u32::MAX as u64) as u32
    }
}

impl Default for TimestepContext {
    fn default() -> Self {
        Self { micros: 1000 }
    }
}
