//! Synaptic input shaping: turns delivered weight into per-step current.
//!
//! Each neuron owns one accumulator with an excitatory and an inhibitory
//! receptor. Arrivals are added between timesteps; [`SynapticInputAccumulator::advance`]
//! produces the current for the step and then decays the stored response.

use crate::fixed::{Decay, Fixed};
use crate::model::SynapseShape;
use crate::timestep::TimestepContext;

/// Euler's number in S16.15, the peak normalisation of the alpha kernel.
const E: Fixed = Fixed::from_bits(89_074);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Receptor {
    Excitatory,
    Inhibitory,
}

/// Stored response of one receptor. Delta synapses only use `response`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReceptorState {
    pub response: Fixed,
    pub exp_response: Fixed,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SynapseState {
    pub exc: ReceptorState,
    pub inh: ReceptorState,
}

/// Timestep-dependent constants of one receptor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReceptorConstants {
    pub decay: Decay,
    pub dt_over_tau: Fixed,
}

impl ReceptorConstants {
    pub fn derive(shape: SynapseShape, tau_ms: f64, ts: TimestepContext) -> Self {
        match shape {
            SynapseShape::Delta => Self::default(),
            SynapseShape::Alpha => Self {
                decay: Decay::exponential(ts.dt_ms(), tau_ms),
                dt_over_tau: Fixed::from_f64(ts.dt_ms() / tau_ms),
            },
        }
    }
}

/// Current contributed to the neuron in one step, both as positive magnitudes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SynapticCurrent {
    pub exc: Fixed,
    pub inh: Fixed,
}

impl SynapticCurrent {
    pub fn net(&self) -> Fixed {
        self.exc - self.inh
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SynapticInputAccumulator {
    shape: SynapseShape,
    state: SynapseState,
    exc_constants: ReceptorConstants,
    inh_constants: ReceptorConstants,
    arrivals: SynapticCurrent,
    last: SynapticCurrent,
}

impl SynapticInputAccumulator {
    pub fn new(shape: SynapseShape, initial: SynapseState) -> Self {
        Self {
            shape,
            state: initial,
            exc_constants: ReceptorConstants::default(),
            inh_constants: ReceptorConstants::default(),
            arrivals: SynapticCurrent::default(),
            last: SynapticCurrent::default(),
        }
    }

    /// Recompute decay constants for a (possibly new) timestep.
    pub fn bind(&mut self, tau_syn_e: f64, tau_syn_i: f64, ts: TimestepContext) {
        self.exc_constants = ReceptorConstants::derive(self.shape, tau_syn_e, ts);
        self.inh_constants = ReceptorConstants::derive(self.shape, tau_syn_i, ts);
    }

    pub fn shape(&self) -> SynapseShape {
        self.shape
    }

    pub fn state(&self) -> &SynapseState {
        &self.state
    }

    /// Stored responses, for restoring a saved image. Pending arrivals are untouched.
    pub fn state_mut(&mut self) -> &mut SynapseState {
        &mut self.state
    }

    pub fn constants(&self, receptor: Receptor) -> ReceptorConstants {
        match receptor {
            Receptor::Excitatory => self.exc_constants,
            Receptor::Inhibitory => self.inh_constants,
        }
    }

    /// Current produced by the most recent [`advance`](Self::advance).
    pub fn last_current(&self) -> SynapticCurrent {
        self.last
    }

    /// Add already-routed weight; it takes effect on the next step.
    #[inline]
    pub fn deliver(&mut self, receptor: Receptor, weight: Fixed) {
        match receptor {
            Receptor::Excitatory => self.arrivals.exc += weight,
            Receptor::Inhibitory => self.arrivals.inh += weight,
        }
    }

    /// Fold in pending arrivals, return this step's current, then decay.
    #[inline]
    pub fn advance(&mut self) -> SynapticCurrent {
        let arrivals = core::mem::take(&mut self.arrivals);
        let current = match self.shape {
            SynapseShape::Delta => SynapticCurrent {
                exc: delta_step(&mut self.state.exc, arrivals.exc),
                inh: delta_step(&mut self.state.inh, arrivals.inh),
            },
            SynapseShape::Alpha => SynapticCurrent {
                exc: alpha_step(&mut self.state.exc, arrivals.exc, self.exc_constants),
                inh: alpha_step(&mut self.state.inh, arrivals.inh, self.inh_constants),
            },
        };
        self.last = current;
        current
    }
}

#[inline]
fn delta_step(s: &mut ReceptorState, arrived: Fixed) -> Fixed {
    let current = s.response + arrived;
    s.response = Fixed::ZERO;
    current
}

/// Exact discretisation of `x' = -x/tau`, `y' = (x - y)/tau` with current `e * y`.
#[inline]
fn alpha_step(s: &mut ReceptorState, arrived: Fixed, k: ReceptorConstants) -> Fixed {
    s.exp_response += arrived;
    let current = E * s.response;
    s.response = k.decay.apply(s.response + s.exp_response * k.dt_over_tau);
    s.exp_response = k.decay.apply(s.exp_response);
    current
}
