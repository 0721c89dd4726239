// Backend abstraction for the TUI so different stepping engines can drive it.

use anyhow::{anyhow, Result};
use qif_core::{find_model, CapacityError, Fixed, PopulationBuilder, SpikeEvent, TimestepContext};
use qif_core_plus::{QifRuntimePlus, StepLimits};
use tracing::info;

use crate::config::{SimConfig, StimulusConfig};

/// Common interface for any backend that can drive the TUI.
pub trait QifBackend {
    /// Advance the simulation by one tick and return all spikes emitted during that tick.
    fn step(&mut self) -> Result<Vec<SpikeEvent>, CapacityError>;
    /// Number of neurons in the model (rows in the raster).
    fn neurons(&self) -> usize;
    /// Tick the next step will process.
    fn tick(&self) -> u64;
    /// Membrane potential of the traced neuron (mV).
    fn trace(&self) -> Option<f64>;

    fn saturation_events(&self) -> u64 {
        0
    }
}

/// Implementation backed by qif-core-plus, with configured stimuli.
pub struct PopulationBackend {
    runtime: QifRuntimePlus,
    stimuli: Vec<StimulusConfig>,
    trace_neuron: u32,
}

impl PopulationBackend {
    pub fn from_config(config: &SimConfig) -> Result<Self> {
        let pc = &config.population;
        let model = find_model(&pc.model).ok_or_else(|| anyhow!("unknown neuron model '{}'", pc.model))?;
        let ts = TimestepContext::from_micros(config.timestep_us)?;

        let mut builder = PopulationBuilder::new(pc.label.clone(), pc.size, model).seed(pc.seed);
        for (name, value) in &pc.params {
            builder = builder.set(name.clone(), value.clone());
        }
        if let Some(capacity) = pc.spike_capacity {
            builder = builder.spike_capacity(capacity);
        }
        let population = builder.build(ts)?;

        let mut runtime = QifRuntimePlus::new(population, config.wheel_size);
        runtime.set_limits(StepLimits {
            max_spikes_per_step: None,
            partition_size: config.partition_size,
        });
        info!(
            population = %pc.label,
            model = model.name,
            size = pc.size,
            timestep_us = config.timestep_us,
            stimuli = config.stimuli.len(),
            "backend ready"
        );

        Ok(Self {
            runtime,
            stimuli: config.stimuli.clone(),
            trace_neuron: pc.trace_neuron,
        })
    }

    pub fn runtime(&self) -> &QifRuntimePlus {
        &self.runtime
    }

    fn apply_stimuli(&mut self) {
        let tick = self.runtime.population().current_time();
        for stimulus in self.stimuli.iter().filter(|s| s.fires_at(tick)) {
            let weight = Fixed::from_f64(stimulus.weight);
            for &target in &stimulus.targets {
                self.runtime.schedule(target, stimulus.receptor, weight, 0);
            }
        }
    }
}

impl QifBackend for PopulationBackend {
    fn step(&mut self) -> Result<Vec<SpikeEvent>, CapacityError> {
        self.apply_stimuli();
        self.runtime.step_once()
    }

    fn neurons(&self) -> usize {
        self.runtime.population().len()
    }

    fn tick(&self) -> u64 {
        self.runtime.population().current_time()
    }

    fn trace(&self) -> Option<f64> {
        self.runtime
            .population()
            .neuron(self.trace_neuron as usize)
            .map(|n| n.state.v.to_f64())
    }

    fn saturation_events(&self) -> u64 {
        self.runtime.population().saturation_events()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StimulusConfig;
    use qif_core::Receptor;

    #[test]
    fn stimuli_drive_the_population() {
        let mut config = SimConfig::default();
        config.population.size = 2;
        config.stimuli.push(StimulusConfig {
            targets: vec![1],
            receptor: Receptor::Excitatory,
            weight: 400.0,
            start: 0,
            period: 0,
            stop: None,
        });
        let mut backend = PopulationBackend::from_config(&config).unwrap();
        let spikes = backend.step().unwrap();
        assert_eq!(spikes.len(), 1);
        assert_eq!(spikes[0].neuron_id, 1);
        assert_eq!(backend.tick(), 1);
        assert_eq!(backend.trace(), Some(backend.runtime().population().neuron(0).unwrap().state.v.to_f64()));
    }

    #[test]
    fn partition_size_comes_from_config() {
        let mut config = SimConfig::default();
        config.partition_size = Some(8);
        let backend = PopulationBackend::from_config(&config).unwrap();
        assert_eq!(
            backend.runtime().limits(),
            StepLimits {
                max_spikes_per_step: None,
                partition_size: Some(8),
            }
        );
    }
}
