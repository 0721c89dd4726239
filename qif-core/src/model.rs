//! Model descriptors: which dynamics, which synapse shape, which named fields.
//!
//! A descriptor is static data. The builder reads its field list to decide
//! which values a population needs and which of them fall back to a default.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dynamics {
    /// `dv/dt = k (v - v_rest)(v - v_crit) + I`
    Qif,
    /// `dv/dt = 0.04 v^2 + 5 v + 140 - u + I`, `du/dt = a (b v - u)`
    Izhikevich,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SynapseShape {
    Delta,
    Alpha,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldRole {
    /// Constant after the population is built.
    Parameter,
    /// Initial value of something the kernel mutates.
    StateVariable,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub role: FieldRole,
    pub unit: &'static str,
    pub default: Option<f64>,
}

const fn param(name: &'static str, unit: &'static str, default: Option<f64>) -> FieldSpec {
    FieldSpec {
        name,
        role: FieldRole::Parameter,
        unit,
        default,
    }
}

const fn state(name: &'static str, unit: &'static str, default: Option<f64>) -> FieldSpec {
    FieldSpec {
        name,
        role: FieldRole::StateVariable,
        unit,
        default,
    }
}

#[derive(Debug, PartialEq)]
pub struct ModelDescriptor {
    pub name: &'static str,
    pub dynamics: Dynamics,
    pub synapse: SynapseShape,
    /// Static firing threshold in mV.
    pub threshold: f64,
    /// Whether the model counts down a refractory period after a spike.
    pub refractory: bool,
    /// Whether the first integrating step after a spike uses the stretched step.
    pub threshold_correction: bool,
    pub fields: &'static [FieldSpec],
    pub cpu_cycles_per_neuron: u32,
}

impl ModelDescriptor {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn units(&self, name: &str) -> Option<&'static str> {
        self.field(name).map(|f| f.unit)
    }

    /// Rough per-timestep cost of a population of `n_neurons`.
    pub fn n_cpu_cycles(&self, n_neurons: usize) -> u64 {
        self.cpu_cycles_per_neuron as u64 * n_neurons as u64
    }
}

const IZK_THRESHOLD: f64 = 100.0;

const QIF_CURVATURE: [FieldSpec; 3] = [
    param("k", "1/(mV ms)", Some(0.001)),
    param("v_rest", "mV", Some(-60.0)),
    param("v_crit", "mV", Some(-40.0)),
];

/// Plain QIF with current-delta input and no refractory period.
pub static QIF: ModelDescriptor = ModelDescriptor {
    name: "Qif",
    dynamics: Dynamics::Qif,
    synapse: SynapseShape::Delta,
    threshold: IZK_THRESHOLD,
    refractory: false,
    threshold_correction: true,
    fields: &[
        param("c", "mV", None),
        state("v", "mV", None),
        param("i_offset", "nA", None),
        QIF_CURVATURE[0],
        QIF_CURVATURE[1],
        QIF_CURVATURE[2],
        state("isyn_exc", "nA", Some(0.0)),
        state("isyn_inh", "nA", Some(0.0)),
    ],
    cpu_cycles_per_neuron: 150,
};

/// QIF with a refractory counter; every neuron field must be assigned.
pub static QIF_REFRACTORY: ModelDescriptor = ModelDescriptor {
    name: "QifRefractory",
    dynamics: Dynamics::Qif,
    synapse: SynapseShape::Delta,
    threshold: IZK_THRESHOLD,
    refractory: true,
    threshold_correction: true,
    fields: &[
        param("c", "mV", None),
        state("v", "mV", None),
        param("i_offset", "nA", None),
        param("tau_refrac", "s", None),
        QIF_CURVATURE[0],
        QIF_CURVATURE[1],
        QIF_CURVATURE[2],
        state("isyn_exc", "nA", Some(0.0)),
        state("isyn_inh", "nA", Some(0.0)),
    ],
    cpu_cycles_per_neuron: 200,
};

/// QIF, current-delta synapses, static threshold, 2 ms refractory by default.
pub static QIF_CURR_DELTA: ModelDescriptor = ModelDescriptor {
    name: "QIFCurrDelta",
    dynamics: Dynamics::Qif,
    synapse: SynapseShape::Delta,
    threshold: IZK_THRESHOLD,
    refractory: true,
    threshold_correction: true,
    fields: &[
        param("c", "mV", Some(-100.0)),
        state("v", "mV", Some(-100.0)),
        param("i_offset", "nA", Some(0.0)),
        param("tau_refrac", "s", Some(0.002)),
        QIF_CURVATURE[0],
        QIF_CURVATURE[1],
        QIF_CURVATURE[2],
        state("isyn_exc", "nA", Some(0.0)),
        state("isyn_inh", "nA", Some(0.0)),
    ],
    cpu_cycles_per_neuron: 200,
};

/// Izhikevich dynamics with alpha-shaped current synapses.
pub static QIF_SD: ModelDescriptor = ModelDescriptor {
    name: "QifSd",
    dynamics: Dynamics::Izhikevich,
    synapse: SynapseShape::Alpha,
    threshold: IZK_THRESHOLD,
    refractory: false,
    threshold_correction: true,
    fields: &[
        param("a", "ms^-1", Some(0.02)),
        param("b", "ms^-1", Some(0.2)),
        param("c", "mV", Some(-100.0)),
        param("d", "mV/ms", Some(2.0)),
        param("i_offset", "nA", Some(0.0)),
        state("u", "mV/ms", Some(0.0)),
        state("v", "mV", Some(-100.0)),
        param("tau_syn_E", "ms", Some(0.5)),
        param("tau_syn_I", "ms", Some(0.5)),
        state("exc_response", "nA", Some(0.0)),
        state("exc_exp_response", "nA", Some(0.0)),
        state("inh_response", "nA", Some(0.0)),
        state("inh_exp_response", "nA", Some(0.0)),
    ],
    cpu_cycles_per_neuron: 150,
};

/// Every shipped descriptor, for lookup by name.
pub static MODELS: [&ModelDescriptor; 4] = [&QIF, &QIF_REFRACTORY, &QIF_CURR_DELTA, &QIF_SD];

/// Case-insensitive lookup; underscores are ignored so `qif_curr_delta` finds `QIFCurrDelta`.
pub fn find_model(name: &str) -> Option<&'static ModelDescriptor> {
    let wanted: String = name.chars().filter(|c| *c != '_').collect();
    MODELS
        .iter()
        .copied()
        .find(|m| m.name.eq_ignore_ascii_case(&wanted))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn units_and_variables() {
        assert_eq!(QIF_CURR_DELTA.units("tau_refrac"), Some("s"));
        assert_eq!(QIF_CURR_DELTA.units("v"), Some("mV"));
        assert!(QIF_SD.has_variable("exc_exp_response"));
        assert!(!QIF.has_variable("tau_refrac"));
        assert_eq!(QIF_SD.units("nope"), None);
    }

    #[test]
    fn bare_models_have_no_neuron_defaults() {
        for name in ["c", "v", "i_offset"] {
            assert_eq!(QIF.field(name).and_then(|f| f.default), None);
        }
        assert_eq!(QIF_REFRACTORY.field("tau_refrac").and_then(|f| f.default), None);
        assert_eq!(QIF_CURR_DELTA.field("tau_refrac").and_then(|f| f.default), Some(0.002));
    }

    #[test]
    fn cpu_estimate_scales_with_size() {
        assert_eq!(QIF_CURR_DELTA.n_cpu_cycles(10), 2000);
        assert_eq!(QIF.n_cpu_cycles(10), 1500);
    }

    #[test]
    fn lookup_by_name() {
        assert_eq!(find_model("qif_curr_delta").map(|m| m.name), Some("QIFCurrDelta"));
        assert_eq!(find_model("QifSd").map(|m| m.name), Some("QifSd"));
        assert_eq!(find_model("qif_sd").map(|m| m.name), Some("QifSd"));
        assert!(find_model("lif").is_none());
    }
}
