use crate::cli::OptimizeArgs;
use crate::config::PartialOptimizationConfig;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use msdopt::core::params::BestParameters;
use msdopt::engine::progress::ProgressReporter;
use msdopt::workflows;
use tracing::info;

pub fn run(args: OptimizeArgs) -> Result<()> {
    let partial_config = match &args.config {
        Some(path) => PartialOptimizationConfig::from_file(path)?,
        None => PartialOptimizationConfig::default(),
    };
    info!("Merging configuration from file and CLI arguments...");
    let final_config = partial_config.merge_with_cli(&args)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Starting hyperparameter search over {} macrostate(s)...",
        final_config.macrostates.len()
    );
    info!("Invoking the core optimization workflow...");

    let result = workflows::optimize::run(&final_config, &reporter)?;

    info!(
        "Workflow finished after {:.2}s over {} model(s).",
        result.elapsed.as_secs_f64(),
        result.models_searched
    );

    println!("{}", summarize(&result.best));
    if let Some(path) = &result.report_path {
        println!("✓ Best parameters written to: {}", path.display());
    }
    if let Some(path) = &result.frequencies_path {
        println!("✓ Predicted frequencies written to: {}", path.display());
    }

    Ok(())
}

fn summarize(best: &BestParameters) -> String {
    let weights = best
        .weights()
        .iter()
        .map(|w| format!("{}", w))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "✓ Best match {:.4}: {} steepness={} weights=[{}]",
        best.match_score,
        best.candidate.params.id(),
        best.steepness(),
        weights
    )
}
