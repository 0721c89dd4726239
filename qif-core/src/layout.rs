//! Word-level data layout of neuron records.
//!
//! Each model packs a neuron as an ordered list of 32-bit words, either
//! `S1615` fixed point or `INT32`. Encoding writes parameters and state;
//! decoding reads back only the state variables (membrane, recovery,
//! refractory counter and the synapse responses), the way execution results
//! are copied back after a run.

use crate::error::LayoutError;
use crate::fixed::Fixed;
use crate::kernel::Kernel;
use crate::model::{Dynamics, ModelDescriptor};
use crate::neuron::{Neuron, NeuronState};
use crate::synapse::SynapseState;
use crate::timestep::TimestepContext;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataType {
    S1615,
    Int32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    A,
    B,
    C,
    D,
    V,
    U,
    IOffset,
    K,
    VRest,
    VCrit,
    CountRefrac,
    RefracTicks,
    /// Step size the next integration will use (ms).
    ThisH,
    /// Pending delta input per receptor.
    IsynExc,
    IsynInh,
    TauSynE,
    TauSynI,
    ExcResponse,
    ExcExpResponse,
    InhResponse,
    InhExpResponse,
}

impl Slot {
    pub fn data_type(&self) -> DataType {
        match self {
            Slot::CountRefrac | Slot::RefracTicks => DataType::Int32,
            _ => DataType::S1615,
        }
    }

    /// Whether decoding copies this slot back into the neuron.
    pub fn is_state(&self) -> bool {
        !matches!(
            self,
            Slot::A
                | Slot::B
                | Slot::C
                | Slot::D
                | Slot::IOffset
                | Slot::K
                | Slot::VRest
                | Slot::VCrit
                | Slot::RefracTicks
                | Slot::TauSynE
                | Slot::TauSynI
        )
    }
}

const QIF_SLOTS: &[Slot] = &[
    Slot::C,
    Slot::V,
    Slot::IOffset,
    Slot::K,
    Slot::VRest,
    Slot::VCrit,
    Slot::ThisH,
    Slot::IsynExc,
    Slot::IsynInh,
];

const QIF_REFRACTORY_SLOTS: &[Slot] = &[
    Slot::C,
    Slot::V,
    Slot::IOffset,
    Slot::CountRefrac,
    Slot::RefracTicks,
    Slot::K,
    Slot::VRest,
    Slot::VCrit,
    Slot::ThisH,
    Slot::IsynExc,
    Slot::IsynInh,
];

const IZHIKEVICH_SLOTS: &[Slot] = &[
    Slot::A,
    Slot::B,
    Slot::C,
    Slot::D,
    Slot::V,
    Slot::U,
    Slot::IOffset,
    Slot::ThisH,
    Slot::TauSynE,
    Slot::TauSynI,
    Slot::ExcResponse,
    Slot::ExcExpResponse,
    Slot::InhResponse,
    Slot::InhExpResponse,
];

pub fn neuron_layout(model: &ModelDescriptor) -> &'static [Slot] {
    match (model.dynamics, model.refractory) {
        (Dynamics::Qif, false) => QIF_SLOTS,
        (Dynamics::Qif, true) => QIF_REFRACTORY_SLOTS,
        (Dynamics::Izhikevich, _) => IZHIKEVICH_SLOTS,
    }
}

/// Population-wide block: `[machine_timestep_ms]`.
pub fn encode_globals(ts: TimestepContext) -> [u32; 1] {
    [ts.h().to_bits() as u32]
}

pub fn encode_neuron(model: &ModelDescriptor, kernel: &Kernel, neuron: &Neuron) -> Vec<u32> {
    let p = &neuron.params;
    let s = &neuron.state;
    let syn = neuron.input.state();
    neuron_layout(model)
        .iter()
        .map(|slot| {
            let fixed = |x: Fixed| x.to_bits() as u32;
            match slot {
                Slot::A => fixed(p.a),
                Slot::B => fixed(p.b),
                Slot::C => fixed(p.c),
                Slot::D => fixed(p.d),
                Slot::V => fixed(s.v),
                Slot::U => fixed(s.u),
                Slot::IOffset => fixed(p.i_offset),
                Slot::K => fixed(p.k),
                Slot::VRest => fixed(p.v_rest),
                Slot::VCrit => fixed(p.v_crit),
                Slot::CountRefrac => s.refractory,
                Slot::RefracTicks => neuron.refractory_ticks(),
                Slot::ThisH => fixed(kernel.step_size(s)),
                Slot::IsynExc | Slot::ExcResponse => fixed(syn.exc.response),
                Slot::IsynInh | Slot::InhResponse => fixed(syn.inh.response),
                Slot::ExcExpResponse => fixed(syn.exc.exp_response),
                Slot::InhExpResponse => fixed(syn.inh.exp_response),
                Slot::TauSynE => fixed(Fixed::from_f64(p.tau_syn_e)),
                Slot::TauSynI => fixed(Fixed::from_f64(p.tau_syn_i)),
            }
        })
        .collect()
}

/// Copy the state slots of one encoded record back into `state` and `synapse`.
pub fn decode_neuron(
    model: &ModelDescriptor,
    kernel: &Kernel,
    words: &[u32],
    state: &mut NeuronState,
    synapse: &mut SynapseState,
) -> Result<(), LayoutError> {
    let layout = neuron_layout(model);
    if words.len() != layout.len() {
        return Err(LayoutError::WordCount {
            model: model.name,
            expected: layout.len(),
            actual: words.len(),
        });
    }
    for (slot, &word) in layout.iter().zip(words) {
        let fixed = Fixed::from_bits(word as i32);
        match slot {
            Slot::V => state.v = fixed,
            Slot::U => state.u = fixed,
            Slot::CountRefrac => state.refractory = word,
            Slot::ThisH => state.correction_pending = fixed != kernel.h(),
            Slot::IsynExc | Slot::ExcResponse => synapse.exc.response = fixed,
            Slot::IsynInh | Slot::InhResponse => synapse.inh.response = fixed,
            Slot::ExcExpResponse => synapse.exc.exp_response = fixed,
            Slot::InhExpResponse => synapse.inh.exp_response = fixed,
            _ => {}
        }
    }
    Ok(())
}

/// Little-endian byte image of a word stream.
pub fn to_le_bytes(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

/// Inverse of [`to_le_bytes`]; trailing bytes that do not fill a word are ignored.
pub fn from_le_bytes(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}
