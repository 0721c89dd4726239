//! qif-core-plus: Extended runtime atop qif-core (keeps qif-core unchanged)
//!
//! Additions:
//! - Time wheel for delayed synaptic input
//! - Partitioned parallel update on rayon, bit-identical to the serial pass
//! - Per-step limits and a cooperative stop handle
//!
//! This crate composes qif-core's population and reuses its timestep semantics.

pub mod input_wheel;
pub mod parallel;
pub mod runtime_plus;

// Re-exports
pub use input_wheel::{InputWheel, SynapticEvent};
pub use parallel::update_partitioned;
pub use runtime_plus::{QifRuntimePlus, RunSummary, StepLimits, StopHandle};
