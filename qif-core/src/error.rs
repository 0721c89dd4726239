//! Error types
//!
//! Configuration problems surface when a population is built and never during
//! stepping. Capacity problems surface per timestep. Arithmetic saturation is
//! not an error at all (see [`crate::population::Population::saturation_events`]).

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("population '{population}': '{parameter}' has no default and was never assigned")]
    MissingInitialValue {
        population: String,
        parameter: &'static str,
    },

    #[error("population '{population}': '{parameter}' has {actual} values for {expected} neurons")]
    ShapeMismatch {
        population: String,
        parameter: String,
        expected: usize,
        actual: usize,
    },

    #[error("population '{population}': model {model} has no parameter '{parameter}'")]
    UnknownParameter {
        population: String,
        model: &'static str,
        parameter: String,
    },

    #[error("population '{population}': invalid '{parameter}': {reason}")]
    InvalidParameter {
        population: String,
        parameter: String,
        reason: String,
    },

    #[error("population '{population}': size must be at least 1")]
    EmptyPopulation { population: String },

    #[error("timestep must be a positive whole number of microseconds, got {0} us")]
    InvalidTimestep(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CapacityError {
    #[error("spike buffer full at timestep {timestep}: {attempted} spikes for capacity {capacity}")]
    SpikeBuffer {
        timestep: u64,
        capacity: usize,
        attempted: usize,
    },

    #[error("recording buffer full at timestep {timestep}: capacity {capacity} samples")]
    RecordingBuffer { timestep: u64, capacity: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("{model} record needs {expected} words, got {actual}")]
    WordCount {
        model: &'static str,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum QifError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Capacity(#[from] CapacityError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

pub type QifResult<T, E = QifError> = core::result::Result<T, E>;
