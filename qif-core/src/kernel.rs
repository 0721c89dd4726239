//! Neuron update kernel.
//!
//! ```text
//! Active:
//!     I = i_offset + I_exc - I_inh
//!     integrate one step (explicit midpoint, h in ms)
//!     if v >= threshold:
//!         v = c            (Izhikevich: u = u + d)
//!         refractory = ceil(tau_refrac / dt)
//!         next integrating step uses h * 1.85
//!         -> spike
//! Refractory (counter > 0):
//!     counter -= 1, v and u untouched
//! ```

use crate::fixed::Fixed;
use crate::model::{Dynamics, ModelDescriptor};
use crate::neuron::{NeuronParameters, NeuronState};
use crate::synapse::SynapticCurrent;
use crate::timestep::TimestepContext;

/// Step stretch applied once after a spike. Plain midpoint timing would want
/// 1.5; 1.85 matches observed spike times better across real membrane traces.
const THRESHOLD_CORRECTION: f64 = 1.85;

const IZH_QUAD: Fixed = Fixed::from_bits(1311); // 0.04
const IZH_LIN: Fixed = Fixed::from_int(5);
const IZH_CONST: Fixed = Fixed::from_int(140);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StaticThreshold(Fixed);

impl StaticThreshold {
    pub fn new(value: Fixed) -> Self {
        Self(value)
    }

    pub fn value(&self) -> Fixed {
        self.0
    }

    #[inline]
    pub fn is_crossed(&self, v: Fixed) -> bool {
        v >= self.0
    }
}

/// Integration constants shared by every neuron of a population.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Kernel {
    dynamics: Dynamics,
    threshold_correction: bool,
    h: Fixed,
    h_corrected: Fixed,
}

impl Kernel {
    pub fn new(model: &ModelDescriptor, ts: TimestepContext) -> Self {
        let mut kernel = Self {
            dynamics: model.dynamics,
            threshold_correction: model.threshold_correction,
            h: Fixed::ZERO,
            h_corrected: Fixed::ZERO,
        };
        kernel.bind(ts);
        kernel
    }

    /// Recompute the step sizes for a (possibly new) timestep.
    pub fn bind(&mut self, ts: TimestepContext) {
        self.h = ts.h();
        self.h_corrected = Fixed::from_f64(ts.dt_ms() * THRESHOLD_CORRECTION);
    }

    pub fn dynamics(&self) -> Dynamics {
        self.dynamics
    }

    pub fn h(&self) -> Fixed {
        self.h
    }

    pub fn h_corrected(&self) -> Fixed {
        self.h_corrected
    }

    /// Step size the next integration of `state` will use.
    pub fn step_size(&self, state: &NeuronState) -> Fixed {
        if state.correction_pending {
            self.h_corrected
        } else {
            self.h
        }
    }

    /// Advance one neuron by one timestep. Returns true when it fired.
    #[inline]
    pub fn update(
        &self,
        state: &mut NeuronState,
        params: &NeuronParameters,
        refractory_ticks: u32,
        current: SynapticCurrent,
        threshold: StaticThreshold,
    ) -> bool {
        if state.refractory > 0 {
            state.refractory -= 1;
            return false;
        }

        let input = params.i_offset + current.net();
        let h = self.step_size(state);
        state.correction_pending = false;

        match self.dynamics {
            Dynamics::Qif => state.v = qif_midpoint(state.v, h, input, params),
            Dynamics::Izhikevich => {
                let (v, u) = izhikevich_midpoint(state.v, state.u, h, input, params);
                state.v = v;
                state.u = u;
            }
        }

        if !threshold.is_crossed(state.v) {
            return false;
        }

        state.v = params.c;
        if self.dynamics == Dynamics::Izhikevich {
            state.u += params.d;
        }
        state.refractory = refractory_ticks;
        state.correction_pending = self.threshold_correction;
        true
    }
}

#[inline]
fn qif_rate(v: Fixed, input: Fixed, p: &NeuronParameters) -> Fixed {
    p.k * (v - p.v_rest) * (v - p.v_crit) + input
}

#[inline]
pub fn qif_midpoint(v: Fixed, h: Fixed, input: Fixed, p: &NeuronParameters) -> Fixed {
    let alpha = qif_rate(v, input, p);
    let eta = v + (h * alpha).half();
    v + h * qif_rate(eta, input, p)
}

#[inline]
pub fn izhikevich_midpoint(
    v: Fixed,
    u: Fixed,
    h: Fixed,
    input: Fixed,
    p: &NeuronParameters,
) -> (Fixed, Fixed) {
    let pre_alpha = IZH_CONST + input - u;
    let alpha = pre_alpha + (IZH_LIN + IZH_QUAD * v) * v;
    let eta = v + (h * alpha).half();
    let beta = (h * (p.b * v - u) * p.a).half();
    let v_next = v + h * (pre_alpha - beta + (IZH_LIN + IZH_QUAD * eta) * eta);
    let u_next = u + p.a * h * (p.b * eta - u - beta);
    (v_next, u_next)
}
