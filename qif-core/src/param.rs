//! Parameter declarations and their one-time resolution to per-neuron values.

use rand::Rng;
use rand_distr::{Distribution, Exp, Normal, Uniform};

/// A value declared for a named field: one for everyone, one per neuron, or drawn at build time.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum ParamValue {
    Scalar(f64),
    PerNeuron(Vec<f64>),
    Random(RandomDistribution),
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "distribution", rename_all = "snake_case"))]
pub enum RandomDistribution {
    Uniform { low: f64, high: f64 },
    Normal { mean: f64, std: f64 },
    /// Normal, resampled until the draw falls inside `[low, high]`.
    NormalClipped { mean: f64, std: f64, low: f64, high: f64 },
    /// Exponential with mean `beta`.
    Exponential { beta: f64 },
}

impl From<f64> for ParamValue {
    fn from(x: f64) -> Self {
        ParamValue::Scalar(x)
    }
}

impl From<Vec<f64>> for ParamValue {
    fn from(v: Vec<f64>) -> Self {
        ParamValue::PerNeuron(v)
    }
}

impl From<&[f64]> for ParamValue {
    fn from(v: &[f64]) -> Self {
        ParamValue::PerNeuron(v.to_vec())
    }
}

impl From<RandomDistribution> for ParamValue {
    fn from(d: RandomDistribution) -> Self {
        ParamValue::Random(d)
    }
}

const CLIP_ATTEMPTS: usize = 10_000;

/// Why a declared value could not be resolved. The builder attaches names.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum ResolveError {
    Shape { expected: usize, actual: usize },
    Invalid(String),
}

impl ParamValue {
    /// Resolve to exactly `n` finite values.
    pub(crate) fn resolve<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Result<Vec<f64>, ResolveError> {
        let values = match self {
            ParamValue::Scalar(x) => vec![*x; n],
            ParamValue::PerNeuron(v) => {
                if v.len() != n {
                    return Err(ResolveError::Shape {
                        expected: n,
                        actual: v.len(),
                    });
                }
                v.clone()
            }
            ParamValue::Random(dist) => dist.sample_n(n, rng)?,
        };
        if let Some(bad) = values.iter().find(|x| !x.is_finite()) {
            return Err(ResolveError::Invalid(format!("non-finite value {bad}")));
        }
        Ok(values)
    }
}

fn check_std(std: f64) -> Result<(), ResolveError> {
    if !(std >= 0.0) {
        return Err(ResolveError::Invalid(format!("normal needs std >= 0, got {std}")));
    }
    Ok(())
}

impl RandomDistribution {
    fn sample_n<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Result<Vec<f64>, ResolveError> {
        match *self {
            RandomDistribution::Uniform { low, high } => {
                if !(low < high) {
                    return Err(ResolveError::Invalid(format!("uniform needs low < high, got [{low}, {high})")));
                }
                if !(high - low).is_finite() {
                    return Err(ResolveError::Invalid(format!("uniform range [{low}, {high}) is too wide")));
                }
                let d = Uniform::new(low, high);
                Ok((0..n).map(|_| d.sample(rng)).collect())
            }
            RandomDistribution::Normal { mean, std } => {
                check_std(std)?;
                let d = Normal::new(mean, std).map_err(|e| ResolveError::Invalid(e.to_string()))?;
                Ok((0..n).map(|_| d.sample(rng)).collect())
            }
            RandomDistribution::NormalClipped { mean, std, low, high } => {
                if !(low <= high) {
                    return Err(ResolveError::Invalid(format!("clip range [{low}, {high}] is empty")));
                }
                check_std(std)?;
                let d = Normal::new(mean, std).map_err(|e| ResolveError::Invalid(e.to_string()))?;
                let mut out = Vec::with_capacity(n);
                for _ in 0..n {
                    let x = (0..CLIP_ATTEMPTS)
                        .map(|_| d.sample(rng))
                        .find(|x| (low..=high).contains(x))
                        .ok_or_else(|| {
                            ResolveError::Invalid(format!(
                                "no draw landed in [{low}, {high}] after {CLIP_ATTEMPTS} attempts"
                            ))
                        })?;
                    out.push(x);
                }
                Ok(out)
            }
            RandomDistribution::Exponential { beta } => {
                if !(beta > 0.0) {
                    return Err(ResolveError::Invalid(format!("exponential needs beta > 0, got {beta}")));
                }
                let d = Exp::new(1.0 / beta).map_err(|e| ResolveError::Invalid(e.to_string()))?;
                Ok((0..n).map(|_| d.sample(rng)).collect())
            }
        }
    }
}
