use crate::core::macrostates::MacrostateSet;
use crate::core::params::BestParameters;
use crate::core::profile::FrequencyMatrix;
use crate::engine::config::{EnergySource, OptimizationConfig};
use crate::engine::error::OptimizerError;
use crate::engine::optimizer::Optimizer;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::strategies::grid::GridSearch;
use crate::strategies::similarity::measure_for;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, instrument};

#[derive(Debug, Clone)]
pub struct OptimizationResult {
    pub best: BestParameters,
    pub best_frequencies: FrequencyMatrix,
    pub target_frequencies: FrequencyMatrix,
    pub models_searched: usize,
    pub elapsed: Duration,
    pub report_path: Option<PathBuf>,
    pub frequencies_path: Option<PathBuf>,
}

#[instrument(skip_all, name = "optimization_workflow")]
pub fn run(
    config: &OptimizationConfig,
    reporter: &ProgressReporter,
) -> Result<OptimizationResult, OptimizerError> {
    let macrostates = MacrostateSet::new(config.macrostates.iter().cloned())?;
    let mut optimizer = Optimizer::new(macrostates, config.contiguous);

    // === Phase 1: Target profile ===
    reporter.report(Progress::PhaseStart {
        name: "Reading Target",
    });
    optimizer.read_target_frequencies(&config.alignment_path, config.reindex_path.as_deref())?;
    reporter.report(Progress::PhaseFinish);

    // === Phase 2: Energy ingestion ===
    reporter.report(Progress::PhaseStart {
        name: "Loading Energies",
    });
    match &config.energy_source {
        EnergySource::Macrostate { path } => optimizer.read_data(path)?,
        EnergySource::Microstate { path, min_position } => {
            optimizer.read_microstate_data(path, *min_position)?
        }
    }
    reporter.report(Progress::ModelsLoaded {
        count: optimizer.model_count(),
    });
    reporter.report(Progress::PhaseFinish);

    // === Phase 3: Search ===
    reporter.report(Progress::PhaseStart { name: "Searching" });
    optimizer.use_algorithm(Box::new(GridSearch::new(
        config.grid.clone(),
        measure_for(config.similarity),
    )));
    optimizer.optimize(reporter)?;
    reporter.report(Progress::PhaseFinish);

    // === Phase 4: Outputs ===
    let result = collect_results(&optimizer, config)?;
    info!(
        score = result.best.match_score,
        params = %result.best.candidate.params.id(),
        "Optimization workflow complete."
    );
    Ok(result)
}

fn collect_results(
    optimizer: &Optimizer,
    config: &OptimizationConfig,
) -> Result<OptimizationResult, OptimizerError> {
    let (Some(best), Some(best_frequencies), Some(target), Some(strategy)) = (
        optimizer.best_parameters(),
        optimizer.best_frequencies(),
        optimizer.target_frequencies(),
        optimizer.strategy(),
    ) else {
        return Err(OptimizerError::Search {
            strategy: "grid search".to_string(),
            reason: "no candidate produced a finite score".to_string(),
        });
    };

    let report_path = config
        .output
        .report_path
        .as_deref()
        .map(|path| optimizer.write_best_params_report(path))
        .transpose()?;
    let frequencies_path = config
        .output
        .frequencies_path
        .as_deref()
        .map(|path| optimizer.write_best_frequencies(path, config.output.precision))
        .transpose()?;

    Ok(OptimizationResult {
        best: best.clone(),
        best_frequencies: best_frequencies.clone(),
        target_frequencies: target.clone(),
        models_searched: optimizer.model_count(),
        elapsed: strategy.elapsed(),
        report_path,
        frequencies_path,
    })
}
