use crate::core::io::fasta::MAX_PRECISION;
use crate::core::params::BoltzmannMode;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

#[derive(Debug, Error)]
pub enum GridConfigError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Invalid search grid in '{path}': {source}")]
    Invalid { path: String, source: ConfigError },
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnergySource {
    Macrostate { path: PathBuf },
    Microstate { path: PathBuf, min_position: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SimilarityKind {
    #[default]
    Cosine,
    JensenShannon,
}

impl FromStr for SimilarityKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cosine" => Ok(Self::Cosine),
            "jensen-shannon" | "js" => Ok(Self::JensenShannon),
            other => Err(ConfigError::InvalidValue {
                field: "similarity",
                reason: format!("unknown measure '{}'", other),
            }),
        }
    }
}

impl fmt::Display for SimilarityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cosine => write!(f, "cosine"),
            Self::JensenShannon => write!(f, "jensen-shannon"),
        }
    }
}

/// The values an exhaustive search tries for each free hyperparameter.
///
/// `backrub-temps` restricts which cached models are searched (empty means
/// all of them). `ensemble-sizes` and `boltzmann-modes` only apply to
/// microstate data; an empty list means every microstate, and the mean,
/// respectively. `weights` lists the values tried for each macrostate weight.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct GridConfig {
    #[serde(default)]
    pub backrub_temps: Vec<f64>,
    #[serde(default)]
    pub ensemble_sizes: Vec<u32>,
    #[serde(default)]
    pub boltzmann_modes: Vec<BoltzmannMode>,
    pub steepness: Vec<f64>,
    pub weights: Vec<f64>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            backrub_temps: Vec::new(),
            ensemble_sizes: Vec::new(),
            boltzmann_modes: Vec::new(),
            steepness: vec![1.0],
            weights: vec![1.0],
        }
    }
}

impl GridConfig {
    pub fn load(path: &Path) -> Result<Self, GridConfigError> {
        let path_str = path.to_string_lossy().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| GridConfigError::Io {
            path: path_str.clone(),
            source: e,
        })?;
        let grid: Self = toml::from_str(&content).map_err(|e| GridConfigError::Toml {
            path: path_str.clone(),
            source: e,
        })?;
        grid.validate().map_err(|e| GridConfigError::Invalid {
            path: path_str,
            source: e,
        })?;
        Ok(grid)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_values("steepness", &self.steepness)?;
        check_values("weights", &self.weights)?;
        if self.backrub_temps.iter().any(|t| !t.is_finite()) {
            return Err(ConfigError::InvalidValue {
                field: "backrub-temps",
                reason: "values must be finite".to_string(),
            });
        }
        if self.ensemble_sizes.contains(&0) {
            return Err(ConfigError::InvalidValue {
                field: "ensemble-sizes",
                reason: "ensemble sizes must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

fn check_values(field: &'static str, values: &[f64]) -> Result<(), ConfigError> {
    if values.is_empty() {
        return Err(ConfigError::InvalidValue {
            field,
            reason: "at least one value is required".to_string(),
        });
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(ConfigError::InvalidValue {
            field,
            reason: "values must be finite".to_string(),
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputConfig {
    pub report_path: Option<PathBuf>,
    pub frequencies_path: Option<PathBuf>,
    pub precision: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            report_path: None,
            frequencies_path: None,
            precision: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationConfig {
    pub alignment_path: PathBuf,
    pub reindex_path: Option<PathBuf>,
    pub energy_source: EnergySource,
    pub macrostates: Vec<String>,
    pub contiguous: bool,
    pub grid: GridConfig,
    pub similarity: SimilarityKind,
    pub output: OutputConfig,
}

#[derive(Default)]
pub struct OptimizationConfigBuilder {
    alignment_path: Option<PathBuf>,
    reindex_path: Option<PathBuf>,
    energy_source: Option<EnergySource>,
    macrostates: Option<Vec<String>>,
    contiguous: Option<bool>,
    grid: Option<GridConfig>,
    similarity: Option<SimilarityKind>,
    output: Option<OutputConfig>,
}

impl OptimizationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alignment_path(mut self, path: PathBuf) -> Self {
        self.alignment_path = Some(path);
        self
    }
    pub fn reindex_path(mut self, path: Option<PathBuf>) -> Self {
        self.reindex_path = path;
        self
    }
    pub fn energy_source(mut self, source: EnergySource) -> Self {
        self.energy_source = Some(source);
        self
    }
    pub fn macrostates(mut self, names: Vec<String>) -> Self {
        self.macrostates = Some(names);
        self
    }
    pub fn contiguous(mut self, contiguous: bool) -> Self {
        self.contiguous = Some(contiguous);
        self
    }
    pub fn grid(mut self, grid: GridConfig) -> Self {
        self.grid = Some(grid);
        self
    }
    pub fn similarity(mut self, kind: SimilarityKind) -> Self {
        self.similarity = Some(kind);
        self
    }
    pub fn output(mut self, output: OutputConfig) -> Self {
        self.output = Some(output);
        self
    }

    pub fn build(self) -> Result<OptimizationConfig, ConfigError> {
        let macrostates = self
            .macrostates
            .ok_or(ConfigError::MissingParameter("macrostates"))?;
        if macrostates.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "macrostates",
                reason: "at least one macrostate is required".to_string(),
            });
        }
        let grid = self.grid.unwrap_or_default();
        grid.validate()?;
        let output = self.output.unwrap_or_default();
        if output.precision > MAX_PRECISION {
            return Err(ConfigError::InvalidValue {
                field: "precision",
                reason: format!("at most {} decimal places are supported", MAX_PRECISION),
            });
        }

        Ok(OptimizationConfig {
            alignment_path: self
                .alignment_path
                .ok_or(ConfigError::MissingParameter("alignment_path"))?,
            reindex_path: self.reindex_path,
            energy_source: self
                .energy_source
                .ok_or(ConfigError::MissingParameter("energy_source"))?,
            macrostates,
            contiguous: self.contiguous.unwrap_or(true),
            grid,
            similarity: self.similarity.unwrap_or_default(),
            output,
        })
    }
}
