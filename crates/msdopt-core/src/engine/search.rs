use super::error::OptimizerError;
use super::optimizer::Optimizer;
use super::progress::ProgressReporter;
use crate::core::params::BestParameters;
use crate::core::profile::FrequencyMatrix;
use std::time::Duration;

/// Scores how closely a predicted profile matches the target.
///
/// Scores are bounded, and higher means more similar. Both matrices have one
/// row per position and one column per canonical residue.
pub trait SimilarityMeasure: Send + Sync {
    fn score(&self, predicted: &FrequencyMatrix, target: &FrequencyMatrix) -> f64;

    fn name(&self) -> &str;
}

/// Drives the search over hyperparameter candidates through the read-only
/// surface of an [`Optimizer`].
pub trait SearchStrategy: Send + Sync {
    /// Runs the search to completion, recording the best candidate found.
    fn iterate(
        &mut self,
        optimizer: &Optimizer,
        reporter: &ProgressReporter,
    ) -> Result<(), OptimizerError>;

    fn best_parameters(&self) -> Option<&BestParameters>;

    fn best_frequencies(&self) -> Option<&FrequencyMatrix>;

    fn name(&self) -> &str;

    /// Name of the similarity measure candidates are scored with.
    fn similarity_name(&self) -> &str;

    /// Wall time spent in the last call to `iterate`.
    fn elapsed(&self) -> Duration;
}
