//! Population: a homogeneous group of neurons advanced in lock-step.
//!
//! Semantics:
//! - `step()` integrates every neuron for the current timestep and returns the
//!   spikes emitted during it; the population clock then advances by 1.
//! - Input delivered with `deliver()` takes effect on the next `step()`.
//! - A capacity error is fatal for the step that raised it, but neuron state
//!   has already been advanced and the clock still moves on.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace, warn};

use crate::emitter::{SpikeEmitter, SpikeEvent, SpikeSink};
use crate::error::{CapacityError, ConfigError, LayoutError};
use crate::fixed::Fixed;
use crate::kernel::{Kernel, StaticThreshold};
use crate::layout::{decode_neuron, encode_globals, encode_neuron, neuron_layout};
use crate::model::{ModelDescriptor, SynapseShape};
use crate::neuron::{Neuron, NeuronParameters, NeuronState};
use crate::param::{ParamValue, ResolveError};
use crate::recording::{Recordable, Recorder, Selection};
use crate::synapse::{Receptor, ReceptorState, SynapseState, SynapticInputAccumulator};
use crate::timestep::TimestepContext;

/// Collects declared values for a population and resolves them once.
pub struct PopulationBuilder {
    label: String,
    size: usize,
    model: &'static ModelDescriptor,
    values: Vec<(String, ParamValue)>,
    seed: u64,
    spike_capacity: Option<usize>,
    recording_capacity: Option<usize>,
}

impl PopulationBuilder {
    pub fn new(label: impl Into<String>, size: usize, model: &'static ModelDescriptor) -> Self {
        Self {
            label: label.into(),
            size,
            model,
            values: Vec::new(),
            seed: 0,
            spike_capacity: None,
            recording_capacity: None,
        }
    }

    /// Declare a value for a named field; a later call for the same name wins.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        let name = name.into();
        self.values.retain(|(n, _)| *n != name);
        self.values.push((name, value.into()));
        self
    }

    /// Seed for values drawn from a distribution.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Spikes buffered per timestep; defaults to the population size.
    pub fn spike_capacity(mut self, capacity: usize) -> Self {
        self.spike_capacity = Some(capacity);
        self
    }

    pub fn recording_capacity(mut self, capacity: usize) -> Self {
        self.recording_capacity = Some(capacity);
        self
    }

    pub fn build(self, ts: TimestepContext) -> Result<Population, ConfigError> {
        let PopulationBuilder {
            label,
            size,
            model,
            values,
            seed,
            spike_capacity,
            recording_capacity,
        } = self;

        if size == 0 {
            return Err(ConfigError::EmptyPopulation { population: label });
        }
        if size > u32::MAX as usize {
            return Err(ConfigError::InvalidParameter {
                population: label,
                parameter: "size".into(),
                reason: format!("{size} neurons do not fit a 32-bit index"),
            });
        }
        if let Some((name, _)) = values.iter().find(|(n, _)| !model.has_variable(n)) {
            return Err(ConfigError::UnknownParameter {
                population: label.clone(),
                model: model.name,
                parameter: name.clone(),
            });
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut columns: Vec<(&'static str, Vec<f64>)> = Vec::with_capacity(model.fields.len());
        for field in model.fields {
            let declared = values.iter().find(|(n, _)| n == field.name).map(|(_, v)| v);
            let resolved = match (declared, field.default) {
                (Some(value), _) => value.resolve(size, &mut rng),
                (None, Some(default)) => Ok(vec![default; size]),
                (None, None) => {
                    return Err(ConfigError::MissingInitialValue {
                        population: label,
                        parameter: field.name,
                    })
                }
            };
            let resolved = resolved.map_err(|e| match e {
                ResolveError::Shape { expected, actual } => ConfigError::ShapeMismatch {
                    population: label.clone(),
                    parameter: field.name.into(),
                    expected,
                    actual,
                },
                ResolveError::Invalid(reason) => ConfigError::InvalidParameter {
                    population: label.clone(),
                    parameter: field.name.into(),
                    reason,
                },
            })?;
            columns.push((field.name, resolved));
        }

        let invalid = |parameter: &str, reason: &str| ConfigError::InvalidParameter {
            population: label.clone(),
            parameter: parameter.into(),
            reason: reason.into(),
        };
        if model.refractory && column(&columns, "tau_refrac").iter().any(|t| *t < 0.0) {
            return Err(invalid("tau_refrac", "refractory period must be >= 0"));
        }
        if model.synapse == SynapseShape::Alpha {
            for name in ["tau_syn_E", "tau_syn_I"] {
                if column(&columns, name).iter().any(|t| *t <= 0.0) {
                    return Err(invalid(name, "synaptic time constant must be > 0"));
                }
            }
        }

        let neurons = (0..size)
            .map(|i| {
                let at = |name: &str| column(&columns, name).get(i).copied().unwrap_or(0.0);
                let fx = |name: &str| Fixed::from_f64(at(name));
                let params = NeuronParameters {
                    c: fx("c"),
                    i_offset: fx("i_offset"),
                    a: fx("a"),
                    b: fx("b"),
                    d: fx("d"),
                    k: fx("k"),
                    v_rest: fx("v_rest"),
                    v_crit: fx("v_crit"),
                    tau_refrac: at("tau_refrac"),
                    tau_syn_e: at("tau_syn_E"),
                    tau_syn_i: at("tau_syn_I"),
                };
                let synapse = match model.synapse {
                    SynapseShape::Delta => SynapseState {
                        exc: ReceptorState {
                            response: fx("isyn_exc"),
                            exp_response: Fixed::ZERO,
                        },
                        inh: ReceptorState {
                            response: fx("isyn_inh"),
                            exp_response: Fixed::ZERO,
                        },
                    },
                    SynapseShape::Alpha => SynapseState {
                        exc: ReceptorState {
                            response: fx("exc_response"),
                            exp_response: fx("exc_exp_response"),
                        },
                        inh: ReceptorState {
                            response: fx("inh_response"),
                            exp_response: fx("inh_exp_response"),
                        },
                    },
                };
                let mut neuron = Neuron::new(
                    i as u32,
                    NeuronState::new(fx("v"), fx("u")),
                    params,
                    SynapticInputAccumulator::new(model.synapse, synapse),
                );
                neuron.bind(ts, model.refractory);
                neuron
            })
            .collect();

        debug!(
            population = %label,
            model = model.name,
            size,
            seed,
            timestep_us = ts.micros(),
            "built population"
        );

        let recorder = match recording_capacity {
            Some(cap) => Recorder::with_capacity(cap),
            None => Recorder::new(),
        };

        Ok(Population {
            label,
            model,
            timestep: ts,
            kernel: Kernel::new(model, ts),
            threshold: StaticThreshold::new(Fixed::from_f64(model.threshold)),
            neurons,
            emitter: SpikeEmitter::with_capacity(spike_capacity.unwrap_or(size)),
            recorder,
            current_time: 0,
            saturation_events: 0,
        })
    }
}

fn column<'a>(columns: &'a [(&'static str, Vec<f64>)], name: &str) -> &'a [f64] {
    columns
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, v)| v.as_slice())
        .unwrap_or(&[])
}

/// What one update pass over a slice of neurons produced.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StepOutput {
    /// Ids of neurons that fired, ascending.
    pub fired: Vec<u32>,
    /// Neurons whose potential ended the step on a saturation rail.
    pub saturated: u64,
}

impl StepOutput {
    /// Append a later partition's output, keeping id order.
    pub fn append(&mut self, mut other: StepOutput) {
        self.fired.append(&mut other.fired);
        self.saturated += other.saturated;
    }
}

/// Serial update of a contiguous slice of neurons.
pub fn update_neurons(neurons: &mut [Neuron], kernel: &Kernel, threshold: StaticThreshold) -> StepOutput {
    let mut out = StepOutput::default();
    for neuron in neurons {
        if neuron.step(kernel, threshold) {
            out.fired.push(neuron.id);
        }
        if neuron.state.v.is_saturated() {
            out.saturated += 1;
        }
    }
    out
}

#[derive(Debug)]
pub struct Population {
    label: String,
    model: &'static ModelDescriptor,
    timestep: TimestepContext,
    kernel: Kernel,
    threshold: StaticThreshold,
    neurons: Vec<Neuron>,
    emitter: SpikeEmitter,
    recorder: Recorder,
    current_time: u64,
    saturation_events: u64,
}

impl Population {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn model(&self) -> &'static ModelDescriptor {
        self.model
    }

    pub fn len(&self) -> usize {
        self.neurons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neurons.is_empty()
    }

    pub fn timestep(&self) -> TimestepContext {
        self.timestep
    }

    /// Timestep the next `step()` will process.
    pub fn current_time(&self) -> u64 {
        self.current_time
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    pub fn threshold(&self) -> StaticThreshold {
        self.threshold
    }

    pub fn neurons(&self) -> &[Neuron] {
        &self.neurons
    }

    pub fn neuron(&self, index: usize) -> Option<&Neuron> {
        self.neurons.get(index)
    }

    /// Neuron-steps that ended with the potential pinned on a saturation rail.
    pub fn saturation_events(&self) -> u64 {
        self.saturation_events
    }

    /// Spikes of the most recent step.
    pub fn spikes(&self) -> &[SpikeEvent] {
        self.emitter.events()
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    pub fn recorder_mut(&mut self) -> &mut Recorder {
        &mut self.recorder
    }

    pub fn spike_capacity(&self) -> usize {
        self.emitter.capacity()
    }

    pub fn set_spike_capacity(&mut self, capacity: usize) {
        self.emitter.set_capacity(capacity);
    }

    /// Rebind to a new timestep, recomputing every derived constant.
    pub fn set_timestep(&mut self, ts: TimestepContext) {
        self.timestep = ts;
        self.kernel.bind(ts);
        for neuron in &mut self.neurons {
            neuron.bind(ts, self.model.refractory);
        }
        debug!(population = %self.label, timestep_us = ts.micros(), "rebound timestep");
    }

    /// Track `variable` for the selected neurons.
    pub fn record(&mut self, variable: Recordable, selection: Selection) -> Result<(), ConfigError> {
        if let Selection::Indices(ids) = &selection {
            if let Some(bad) = ids.iter().find(|id| **id as usize >= self.neurons.len()) {
                return Err(ConfigError::InvalidParameter {
                    population: self.label.clone(),
                    parameter: format!("record {}", variable.name()),
                    reason: format!("neuron {bad} out of range for {} neurons", self.neurons.len()),
                });
            }
        }
        self.recorder.track(variable, selection);
        Ok(())
    }

    /// Add routed weight to one neuron; returns false for an unknown index.
    pub fn deliver(&mut self, neuron: u32, receptor: Receptor, weight: Fixed) -> bool {
        match self.neurons.get_mut(neuron as usize) {
            Some(n) => {
                n.input.deliver(receptor, weight);
                true
            }
            None => false,
        }
    }

    pub fn step(&mut self) -> Result<&[SpikeEvent], CapacityError> {
        self.step_with(update_neurons)
    }

    /// Step using a caller-supplied update pass over the neuron slice.
    ///
    /// `update` must return fired ids in ascending order; the serial pass
    /// [`update_neurons`] is the reference behaviour.
    pub fn step_with<U>(&mut self, update: U) -> Result<&[SpikeEvent], CapacityError>
    where
        U: FnOnce(&mut [Neuron], &Kernel, StaticThreshold) -> StepOutput,
    {
        let t = self.current_time;
        let out = update(&mut self.neurons, &self.kernel, self.threshold);

        if out.saturated > 0 {
            self.saturation_events += out.saturated;
            trace!(population = %self.label, timestep = t, neurons = out.saturated, "membrane potential saturated");
        }

        self.emitter.begin(t);
        for &id in &out.fired {
            // overflow is tallied inside the emitter and reported by finish()
            let _ = self.emitter.emit(id);
        }
        let recorded = self.recorder.sample(t, &self.neurons, &out.fired);
        self.current_time += 1;

        if let Err(e) = self.emitter.finish().and(recorded) {
            warn!(population = %self.label, timestep = t, error = %e, "capacity exceeded");
            return Err(e);
        }
        Ok(self.emitter.events())
    }

    /// Run `ticks` steps and return every spike emitted.
    pub fn run_ticks(&mut self, ticks: u64) -> Result<Vec<SpikeEvent>, CapacityError> {
        let mut all = Vec::new();
        for _ in 0..ticks {
            all.extend_from_slice(self.step()?);
        }
        Ok(all)
    }

    /// Hand the last step's spikes to `sink`.
    pub fn flush_spikes<S: SpikeSink + ?Sized>(&mut self, sink: &mut S) {
        self.emitter.flush(sink);
    }

    /// Globals block followed by every neuron record.
    pub fn encode(&self) -> Vec<u32> {
        let mut words = encode_globals(self.timestep).to_vec();
        for neuron in &self.neurons {
            words.extend(encode_neuron(self.model, &self.kernel, neuron));
        }
        words
    }

    /// Copy state back from an image produced by [`encode`](Self::encode).
    pub fn decode(&mut self, words: &[u32]) -> Result<(), LayoutError> {
        let per_neuron = neuron_layout(self.model).len();
        let globals = encode_globals(self.timestep).len();
        let expected = globals + per_neuron * self.neurons.len();
        if words.len() != expected {
            return Err(LayoutError::WordCount {
                model: self.model.name,
                expected,
                actual: words.len(),
            });
        }
        for (neuron, record) in self.neurons.iter_mut().zip(words[globals..].chunks_exact(per_neuron)) {
            decode_neuron(self.model, &self.kernel, record, &mut neuron.state, neuron.input.state_mut())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{QIF, QIF_CURR_DELTA, QIF_SD};
    use crate::param::RandomDistribution;

    fn ms() -> TimestepContext {
        TimestepContext::default()
    }

    fn fx(x: f64) -> Fixed {
        Fixed::from_f64(x)
    }

    #[test]
    fn missing_value_names_population_and_field() {
        let err = PopulationBuilder::new("exc", 4, &QIF)
            .set("c", -65.0)
            .set("i_offset", 0.0)
            .build(ms())
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingInitialValue {
                population: "exc".into(),
                parameter: "v"
            }
        );
    }

    #[test]
    fn shape_mismatch_is_reported() {
        let err = PopulationBuilder::new("exc", 3, &QIF_CURR_DELTA)
            .set("c", vec![-100.0, -90.0])
            .build(ms())
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::ShapeMismatch { ref parameter, expected: 3, actual: 2, .. } if parameter == "c"
        ));
    }

    #[test]
    fn unknown_and_invalid_fields_rejected() {
        let err = PopulationBuilder::new("p", 1, &QIF_CURR_DELTA)
            .set("tau_m", 10.0)
            .build(ms())
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownParameter { .. }));

        let err = PopulationBuilder::new("p", 1, &QIF_SD)
            .set("tau_syn_E", 0.0)
            .build(ms())
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidParameter { ref parameter, .. } if parameter == "tau_syn_E"));

        let err = PopulationBuilder::new("p", 1, &QIF_CURR_DELTA)
            .set("tau_refrac", -1.0)
            .build(ms())
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidParameter { .. }));

        assert!(matches!(
            PopulationBuilder::new("p", 0, &QIF_CURR_DELTA).build(ms()),
            Err(ConfigError::EmptyPopulation { .. })
        ));
    }

    #[test]
    fn declared_values_resolve_per_neuron() {
        let pop = PopulationBuilder::new("p", 3, &QIF_CURR_DELTA)
            .set("i_offset", vec![0.0, 1.0, 2.0])
            .set("v", -70.0)
            .build(ms())
            .unwrap();
        assert_eq!(pop.neuron(2).unwrap().params.i_offset, fx(2.0));
        assert!(pop.neurons().iter().all(|n| n.state.v == fx(-70.0)));
        assert!(pop.neurons().iter().all(|n| n.params.c == fx(-100.0)));
        assert_eq!(pop.neuron(0).unwrap().refractory_ticks(), 2);
    }

    #[test]
    fn seeded_distributions_are_reproducible() {
        let build = |seed| {
            PopulationBuilder::new("p", 16, &QIF_CURR_DELTA)
                .set("v", RandomDistribution::Uniform { low: -80.0, high: -60.0 })
                .seed(seed)
                .build(ms())
                .unwrap()
        };
        let a: Vec<Fixed> = build(1).neurons().iter().map(|n| n.state.v).collect();
        let b: Vec<Fixed> = build(1).neurons().iter().map(|n| n.state.v).collect();
        let c: Vec<Fixed> = build(2).neurons().iter().map(|n| n.state.v).collect();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn spike_resets_to_c_and_arms_counter() {
        let mut pop = PopulationBuilder::new("p", 1, &QIF_CURR_DELTA)
            .set("v", 99.0)
            .build(ms())
            .unwrap();
        let spikes = pop.step().unwrap().to_vec();
        assert_eq!(spikes, vec![SpikeEvent { neuron_id: 0, time: 0 }]);
        let n = pop.neuron(0).unwrap();
        assert_eq!(n.state.v, fx(-100.0));
        assert_eq!(n.state.refractory, 2);
        assert_eq!(pop.current_time(), 1);
    }

    #[test]
    fn delivered_input_reaches_next_step() {
        let mut pop = PopulationBuilder::new("p", 2, &QIF_CURR_DELTA)
            .set("v", -60.0)
            .build(ms())
            .unwrap();
        assert!(pop.deliver(1, Receptor::Excitatory, fx(10.0)));
        assert!(!pop.deliver(7, Receptor::Excitatory, fx(10.0)));
        pop.step().unwrap();
        assert_eq!(pop.neuron(0).unwrap().state.v, fx(-60.0));
        assert!(pop.neuron(1).unwrap().state.v > fx(-55.0));
    }

    #[test]
    fn rebinding_timestep_recomputes_constants() {
        let mut pop = PopulationBuilder::new("p", 1, &QIF_CURR_DELTA).build(ms()).unwrap();
        assert_eq!(pop.neuron(0).unwrap().refractory_ticks(), 2);
        pop.set_timestep(TimestepContext::from_micros(100).unwrap());
        assert_eq!(pop.neuron(0).unwrap().refractory_ticks(), 20);
        assert_eq!(pop.kernel().h(), fx(0.1));

        let mut sd = PopulationBuilder::new("sd", 1, &QIF_SD).build(ms()).unwrap();
        let before = sd.neuron(0).unwrap().input.constants(Receptor::Excitatory);
        sd.set_timestep(TimestepContext::from_micros(100).unwrap());
        let after = sd.neuron(0).unwrap().input.constants(Receptor::Excitatory);
        assert_ne!(before, after);
    }

    #[test]
    fn spike_capacity_overflow_is_fatal_for_the_step() {
        let mut pop = PopulationBuilder::new("p", 3, &QIF_CURR_DELTA)
            .set("v", 99.0)
            .spike_capacity(2)
            .build(ms())
            .unwrap();
        let err = pop.step().unwrap_err();
        assert_eq!(
            err,
            CapacityError::SpikeBuffer {
                timestep: 0,
                capacity: 2,
                attempted: 3
            }
        );
        assert_eq!(pop.spikes().len(), 2);
        assert_eq!(pop.current_time(), 1);
        assert!(pop.neurons().iter().all(|n| n.state.v == fx(-100.0)));
    }

    #[test]
    fn recording_follows_steps() {
        let mut pop = PopulationBuilder::new("p", 2, &QIF_CURR_DELTA).build(ms()).unwrap();
        pop.record(Recordable::V, Selection::Indices(vec![1])).unwrap();
        assert!(pop.record(Recordable::V, Selection::Indices(vec![5])).is_err());
        pop.run_ticks(3).unwrap();
        let v = pop.recorder_mut().take(Recordable::V);
        let times: Vec<u64> = v.iter().map(|s| s.timestep).collect();
        assert_eq!(times, vec![0, 1, 2]);
        assert!(v.iter().all(|s| s.neuron == 1));
    }

    #[test]
    fn saturation_is_counted_not_fatal() {
        // negative curvature drives v onto the lower rail and keeps it there
        let mut pop = PopulationBuilder::new("p", 1, &QIF_CURR_DELTA)
            .set("v", -65_000.0)
            .set("k", -1.0)
            .build(ms())
            .unwrap();
        assert!(pop.run_ticks(3).unwrap().is_empty());
        assert_eq!(pop.saturation_events(), 3);
        assert_eq!(pop.neuron(0).unwrap().state.v, Fixed::MIN);
    }

    #[test]
    fn state_image_round_trips() {
        let mut pop = PopulationBuilder::new("p", 4, &QIF_CURR_DELTA)
            .set("i_offset", vec![0.0, 5.0, 20.0, 40.0])
            .build(ms())
            .unwrap();
        pop.run_ticks(12).unwrap();
        let image = pop.encode();
        let saved: Vec<NeuronState> = pop.neurons().iter().map(|n| n.state).collect();

        pop.run_ticks(5).unwrap();
        pop.decode(&image).unwrap();
        let restored: Vec<NeuronState> = pop.neurons().iter().map(|n| n.state).collect();
        assert_eq!(saved, restored);

        assert!(pop.decode(&image[1..]).is_err());
    }

    #[test]
    fn state_image_restores_synaptic_responses() {
        let mut pop = PopulationBuilder::new("sd", 2, &QIF_SD)
            .build(TimestepContext::from_micros(100).unwrap())
            .unwrap();
        pop.deliver(1, Receptor::Inhibitory, fx(2.0));
        pop.run_ticks(4).unwrap();
        let image = pop.encode();
        let saved: Vec<_> = pop.neurons().iter().map(|n| *n.input.state()).collect();

        pop.deliver(0, Receptor::Excitatory, fx(50.0));
        pop.run_ticks(3).unwrap();
        assert_ne!(*pop.neuron(0).unwrap().input.state(), saved[0]);

        pop.decode(&image).unwrap();
        let restored: Vec<_> = pop.neurons().iter().map(|n| *n.input.state()).collect();
        assert_eq!(saved, restored);
        assert_ne!(restored[1].inh.response, Fixed::ZERO);
    }

    #[test]
    fn pending_delta_input_is_part_of_the_image() {
        let mut pop = PopulationBuilder::new("p", 1, &QIF_CURR_DELTA)
            .set("isyn_exc", 3.0)
            .build(ms())
            .unwrap();
        let image = pop.encode();
        pop.step().unwrap();
        assert_eq!(pop.neuron(0).unwrap().input.state().exc.response, Fixed::ZERO);
        pop.decode(&image).unwrap();
        assert_eq!(pop.neuron(0).unwrap().input.state().exc.response, fx(3.0));
    }

    #[test]
    fn wide_uniform_range_is_a_config_error() {
        let err = PopulationBuilder::new("p", 4, &QIF_CURR_DELTA)
            .set("v", RandomDistribution::Uniform { low: -1e308, high: 1e308 })
            .build(ms())
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidParameter { ref parameter, .. } if parameter == "v"));

        let err = PopulationBuilder::new("p", 4, &QIF_CURR_DELTA)
            .set("i_offset", RandomDistribution::Normal { mean: 0.0, std: -1.0 })
            .build(ms())
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidParameter { ref parameter, .. } if parameter == "i_offset"));
        assert!(format!("{err:?}").contains("i_offset"));
    }

    #[test]
    fn recording_overflow_drops_the_whole_step() {
        let mut pop = PopulationBuilder::new("p", 3, &QIF_CURR_DELTA)
            .recording_capacity(7)
            .build(ms())
            .unwrap();
        pop.record(Recordable::V, Selection::All).unwrap();
        pop.run_ticks(2).unwrap();

        let err = pop.step().unwrap_err();
        assert_eq!(err, CapacityError::RecordingBuffer { timestep: 2, capacity: 7 });
        assert_eq!(pop.current_time(), 3);
        assert_eq!(pop.recorder().len(), 6);

        let v = pop.recorder_mut().take(Recordable::V);
        assert!(v.iter().all(|s| s.timestep < 2));
        pop.step().unwrap();
        assert_eq!(pop.recorder().len(), 3);
    }
}
