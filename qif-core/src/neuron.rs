//! Per-neuron state, parameters and the slot that bundles them.

use crate::fixed::Fixed;
use crate::kernel::{Kernel, StaticThreshold};
use crate::synapse::{SynapticCurrent, SynapticInputAccumulator};
use crate::timestep::TimestepContext;

/// Mutable state advanced by the kernel every timestep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NeuronState {
    /// Membrane potential (mV).
    pub v: Fixed,
    /// Recovery variable; stays zero for QIF dynamics.
    pub u: Fixed,
    /// Remaining refractory timesteps.
    pub refractory: u32,
    /// Next integrating step uses the stretched step size.
    pub correction_pending: bool,
}

impl NeuronState {
    pub fn new(v: Fixed, u: Fixed) -> Self {
        Self {
            v,
            u,
            refractory: 0,
            correction_pending: false,
        }
    }

    pub fn is_refractory(&self) -> bool {
        self.refractory > 0
    }
}

/// Per-neuron constants. Fields a model does not use stay zero.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NeuronParameters {
    /// Reset potential (mV).
    pub c: Fixed,
    /// Offset current (nA).
    pub i_offset: Fixed,
    pub a: Fixed,
    pub b: Fixed,
    pub d: Fixed,
    pub k: Fixed,
    pub v_rest: Fixed,
    pub v_crit: Fixed,
    /// Refractory period (s).
    pub tau_refrac: f64,
    /// Synaptic time constants (ms).
    pub tau_syn_e: f64,
    pub tau_syn_i: f64,
}

#[derive(Clone, Debug)]
pub struct Neuron {
    pub id: u32,
    pub state: NeuronState,
    pub params: NeuronParameters,
    pub input: SynapticInputAccumulator,
    refractory_ticks: u32,
}

impl Neuron {
    pub fn new(
        id: u32,
        state: NeuronState,
        params: NeuronParameters,
        input: SynapticInputAccumulator,
    ) -> Self {
        Self {
            id,
            state,
            params,
            input,
            refractory_ticks: 0,
        }
    }

    /// Recompute everything that depends on the timestep.
    pub fn bind(&mut self, ts: TimestepContext, refractory: bool) {
        self.refractory_ticks = if refractory {
            ts.ticks_covering(self.params.tau_refrac)
        } else {
            0
        };
        self.input.bind(self.params.tau_syn_e, self.params.tau_syn_i, ts);
    }

    /// Timesteps of lockout applied after each spike.
    pub fn refractory_ticks(&self) -> u32 {
        self.refractory_ticks
    }

    pub fn last_current(&self) -> SynapticCurrent {
        self.input.last_current()
    }

    /// Advance one timestep. Returns true when the neuron fired.
    #[inline]
    pub fn step(&mut self, kernel: &Kernel, threshold: StaticThreshold) -> bool {
        let current = self.input.advance();
        kernel.update(
            &mut self.state,
            &self.params,
            self.refractory_ticks,
            current,
            threshold,
        )
    }
}
