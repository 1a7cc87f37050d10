use crate::cli::OptimizeArgs;
use crate::error::{CliError, Result};
use msdopt::engine::config::{
    self as core_config, EnergySource, GridConfig, OutputConfig, SimilarityKind,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialTargetConfig {
    alignment: Option<PathBuf>,
    reindex: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialEnergyConfig {
    macrostate_table: Option<PathBuf>,
    microstate_table: Option<PathBuf>,
    min_position: Option<i64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialSearchConfig {
    similarity: Option<SimilarityKind>,
    grid: Option<GridConfig>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialOutputConfig {
    report: Option<PathBuf>,
    frequencies: Option<PathBuf>,
    precision: Option<u32>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PartialOptimizationConfig {
    macrostates: Option<Vec<String>>,
    contiguous: Option<bool>,
    target: Option<PartialTargetConfig>,
    energies: Option<PartialEnergyConfig>,
    search: Option<PartialSearchConfig>,
    output: Option<PartialOutputConfig>,
}

impl PartialOptimizationConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// CLI flags win over `--set` values, which win over the file.
    pub fn merge_with_cli(mut self, args: &OptimizeArgs) -> Result<core_config::OptimizationConfig> {
        self.apply_set_values(&args.set_values)?;

        let target = self.target.take().unwrap_or_default();
        let energies = self.energies.take().unwrap_or_default();
        let search = self.search.take().unwrap_or_default();
        let output = self.output.take().unwrap_or_default();

        let alignment_path = args.alignment.clone().or(target.alignment).ok_or_else(|| {
            CliError::Config(
                "A target alignment is required either as `target.alignment` in the config file or via --alignment.".to_string(),
            )
        })?;
        let reindex_path = args.reindex.clone().or(target.reindex);

        let energy_source = Self::merge_energy_source(args, energies)?;

        let macrostates = if args.macrostates.is_empty() {
            self.macrostates.take().ok_or_else(|| {
                CliError::Config(
                    "`macrostates` is required either in the config file or via --macrostates."
                        .to_string(),
                )
            })?
        } else {
            args.macrostates.clone()
        };
        let contiguous = !args.noncontiguous && self.contiguous.unwrap_or(true);

        let grid = match &args.grid {
            Some(path) => GridConfig::load(path).map_err(|e| CliError::FileParsing {
                path: path.clone(),
                source: e.into(),
            })?,
            None => search.grid.unwrap_or_default(),
        };
        let similarity = args.similarity.or(search.similarity).unwrap_or_default();

        let output = OutputConfig {
            report_path: args.report.clone().or(output.report),
            frequencies_path: args.frequencies.clone().or(output.frequencies),
            precision: args
                .precision
                .or(output.precision)
                .unwrap_or(OutputConfig::default().precision),
        };

        core_config::OptimizationConfigBuilder::new()
            .alignment_path(alignment_path)
            .reindex_path(reindex_path)
            .energy_source(energy_source)
            .macrostates(macrostates)
            .contiguous(contiguous)
            .grid(grid)
            .similarity(similarity)
            .output(output)
            .build()
            .map_err(|e| CliError::Config(e.to_string()))
    }

    fn merge_energy_source(args: &OptimizeArgs, file: PartialEnergyConfig) -> Result<EnergySource> {
        // A table named on the command line replaces whichever table the file names.
        let (macro_table, micro_table) =
            if args.macrostate_table.is_some() || args.microstate_table.is_some() {
                (args.macrostate_table.clone(), args.microstate_table.clone())
            } else {
                (file.macrostate_table, file.microstate_table)
            };
        let min_position = args.min_position.or(file.min_position);

        match (macro_table, micro_table) {
            (Some(_), Some(_)) => Err(CliError::Config(
                "Specify either a macrostate table or a microstate table, not both.".to_string(),
            )),
            (Some(path), None) => Ok(EnergySource::Macrostate { path }),
            (None, Some(path)) => {
                let min_position = min_position.ok_or_else(|| {
                    CliError::Config(
                        "`energies.min-position` is required with a microstate table.".to_string(),
                    )
                })?;
                Ok(EnergySource::Microstate { path, min_position })
            }
            (None, None) => Err(CliError::Config(
                "An energy table is required: set `energies.macrostate-table` or `energies.microstate-table`.".to_string(),
            )),
        }
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let Some((key, value_str)) = kv_pair.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            };

            match key {
                "macrostates" => {
                    self.macrostates = Some(
                        value_str
                            .split(',')
                            .map(|s| s.trim().to_string())
                            .filter(|s| !s.is_empty())
                            .collect(),
                    );
                }
                "contiguous" => {
                    self.contiguous = Some(parse_value(key, value_str, "boolean")?);
                }
                "target.alignment" => {
                    self.target.get_or_insert_with(Default::default).alignment =
                        Some(PathBuf::from(value_str));
                }
                "target.reindex" => {
                    self.target.get_or_insert_with(Default::default).reindex =
                        Some(PathBuf::from(value_str));
                }
                "energies.macrostate-table" => {
                    self.energies
                        .get_or_insert_with(Default::default)
                        .macrostate_table = Some(PathBuf::from(value_str));
                }
                "energies.microstate-table" => {
                    self.energies
                        .get_or_insert_with(Default::default)
                        .microstate_table = Some(PathBuf::from(value_str));
                }
                "energies.min-position" => {
                    self.energies.get_or_insert_with(Default::default).min_position =
                        Some(parse_value(key, value_str, "integer")?);
                }
                "search.similarity" => {
                    self.search.get_or_insert_with(Default::default).similarity = Some(
                        SimilarityKind::from_str(value_str)
                            .map_err(|e| CliError::Config(e.to_string()))?,
                    );
                }
                "output.report" => {
                    self.output.get_or_insert_with(Default::default).report =
                        Some(PathBuf::from(value_str));
                }
                "output.frequencies" => {
                    self.output.get_or_insert_with(Default::default).frequencies =
                        Some(PathBuf::from(value_str));
                }
                "output.precision" => {
                    self.output.get_or_insert_with(Default::default).precision =
                        Some(parse_value(key, value_str, "integer")?);
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str, kind: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value))
    })
}
