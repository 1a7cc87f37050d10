use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Sentinel used by energy tables and reports for a minimum-energy pick.
pub const MINIMUM_SENTINEL: f64 = 0.0;
/// Sentinel used by energy tables and reports for an unweighted mean.
pub const MEAN_SENTINEL: f64 = -1.0;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ParamsError {
    #[error("'{0}' is neither 'min', 'mean' nor a number")]
    NotANumber(String),
    #[error("Boltzmann temperature must be finite and positive, got {0}")]
    InvalidTemperature(f64),
}

/// How the microstates of one macrostate are collapsed into a single energy
/// per residue.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "RawBoltzmannMode")]
pub enum BoltzmannMode {
    /// Lowest energy across the ensemble.
    Minimum,
    /// Unweighted arithmetic mean across the ensemble.
    Mean,
    /// Boltzmann-weighted average at the given temperature.
    Temperature(f64),
}

impl BoltzmannMode {
    /// Decodes the numeric convention of the energy tables: `0.0` is the
    /// minimum pick, `-1.0` the mean, anything else a literal temperature.
    pub fn from_sentinel(value: f64) -> Result<Self, ParamsError> {
        if value == MINIMUM_SENTINEL {
            Ok(Self::Minimum)
        } else if value == MEAN_SENTINEL {
            Ok(Self::Mean)
        } else if value.is_finite() && value > 0.0 {
            Ok(Self::Temperature(value))
        } else {
            Err(ParamsError::InvalidTemperature(value))
        }
    }

    pub fn to_sentinel(self) -> f64 {
        match self {
            Self::Minimum => MINIMUM_SENTINEL,
            Self::Mean => MEAN_SENTINEL,
            Self::Temperature(t) => t,
        }
    }
}

impl FromStr for BoltzmannMode {
    type Err = ParamsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "min" => Ok(Self::Minimum),
            "mean" => Ok(Self::Mean),
            other => {
                let value: f64 = other
                    .parse()
                    .map_err(|_| ParamsError::NotANumber(s.to_string()))?;
                Self::from_sentinel(value)
            }
        }
    }
}

impl fmt::Display for BoltzmannMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Minimum => write!(f, "min"),
            Self::Mean => write!(f, "mean"),
            Self::Temperature(t) => write!(f, "{}", canonical_float(*t)),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawBoltzmannMode {
    Text(String),
    Value(f64),
}

impl TryFrom<RawBoltzmannMode> for BoltzmannMode {
    type Error = ParamsError;

    fn try_from(raw: RawBoltzmannMode) -> Result<Self, Self::Error> {
        match raw {
            RawBoltzmannMode::Text(text) => text.parse(),
            RawBoltzmannMode::Value(value) => Self::from_sentinel(value),
        }
    }
}

/// The hyperparameters fixed at simulation time, which together select one
/// cached model. Microstate models leave `ensemble_size` and `boltzmann` unset
/// because both are applied when the model is read, not when it is loaded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HyperParams {
    pub backrub_temp: f64,
    pub ensemble_size: Option<u32>,
    pub boltzmann: Option<BoltzmannMode>,
}

impl HyperParams {
    pub fn new(backrub_temp: f64, ensemble_size: Option<u32>, boltzmann: Option<BoltzmannMode>) -> Self {
        Self {
            backrub_temp,
            ensemble_size,
            boltzmann,
        }
    }

    pub fn macrostate(backrub_temp: f64, ensemble_size: u32, boltzmann: BoltzmannMode) -> Self {
        Self::new(backrub_temp, Some(ensemble_size), Some(boltzmann))
    }

    pub fn microstate(backrub_temp: f64) -> Self {
        Self::new(backrub_temp, None, None)
    }

    pub fn id(&self) -> ParamsId {
        ParamsId::from_params(self)
    }
}

/// Deterministic cache key for a [`HyperParams`] tuple.
///
/// Floats are rendered with their shortest round-trip representation, so two
/// tuples compare equal exactly when their keys do, regardless of how the
/// numbers were spelled in the input (`0.90` and `0.9` share a key).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamsId(String);

impl ParamsId {
    fn from_params(params: &HyperParams) -> Self {
        let ensemble = params
            .ensemble_size
            .map_or_else(|| "*".to_string(), |n| n.to_string());
        let boltzmann = match params.boltzmann {
            None => "*".to_string(),
            Some(BoltzmannMode::Temperature(t)) => format!("T{}", canonical_float(t)),
            Some(mode) => mode.to_string(),
        };
        Self(format!(
            "backrub={} ensemble={} boltzmann={}",
            canonical_float(params.backrub_temp),
            ensemble,
            boltzmann
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParamsId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn canonical_float(value: f64) -> String {
    // -0.0 and 0.0 are the same parameter.
    let value = if value == 0.0 { 0.0 } else { value };
    format!("{}", value)
}

/// A full point in the search space: the model-selecting hyperparameters plus
/// the per-macrostate weights and the steepness applied at read time.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub params: HyperParams,
    pub steepness: f64,
    pub weights: Vec<f64>,
}

impl Candidate {
    pub fn new(params: HyperParams, steepness: f64, weights: Vec<f64>) -> Self {
        Self {
            params,
            steepness,
            weights,
        }
    }
}

/// The winning candidate of a search together with its similarity score.
#[derive(Debug, Clone, PartialEq)]
pub struct BestParameters {
    pub candidate: Candidate,
    pub match_score: f64,
}

impl BestParameters {
    pub fn ensemble_size(&self) -> Option<u32> {
        self.candidate.params.ensemble_size
    }

    pub fn backrub_temp(&self) -> f64 {
        self.candidate.params.backrub_temp
    }

    pub fn boltzmann(&self) -> Option<BoltzmannMode> {
        self.candidate.params.boltzmann
    }

    pub fn steepness(&self) -> f64 {
        self.candidate.steepness
    }

    pub fn weights(&self) -> &[f64] {
        &self.candidate.weights
    }
}
