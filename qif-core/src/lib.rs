//! qif-core: fixed-point quadratic integrate-and-fire neuron kernel
//!
//! A [`Population`] holds neurons of one [`ModelDescriptor`], advances them in
//! lock-step one timestep at a time and emits the spikes of each step. All
//! state is S16.15 fixed point ([`Fixed`]); every operation saturates.

pub mod emitter;
pub mod error;
pub mod fixed;
pub mod kernel;
pub mod layout;
pub mod model;
pub mod neuron;
pub mod param;
pub mod population;
pub mod recording;
pub mod synapse;
pub mod timestep;

// Re-exports
pub use emitter::{SpikeEmitter, SpikeEvent, SpikeSink};
pub use error::{CapacityError, ConfigError, LayoutError, QifError, QifResult};
pub use fixed::{Decay, Fixed};
pub use kernel::{Kernel, StaticThreshold};
pub use model::{find_model, Dynamics, ModelDescriptor, SynapseShape, MODELS};
pub use neuron::{Neuron, NeuronParameters, NeuronState};
pub use param::{ParamValue, RandomDistribution};
pub use population::{update_neurons, Population, PopulationBuilder, StepOutput};
pub use recording::{Recordable, Recorder, RecordingSink, Sample, Selection};
pub use synapse::{Receptor, SynapticCurrent, SynapticInputAccumulator};
pub use timestep::TimestepContext;
