use crate::core::params::{BestParameters, BoltzmannMode, Candidate, HyperParams};
use crate::core::profile::FrequencyMatrix;
use crate::engine::config::GridConfig;
use crate::engine::error::OptimizerError;
use crate::engine::model::DataKind;
use crate::engine::optimizer::Optimizer;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::search::{SearchStrategy, SimilarityMeasure};
use itertools::Itertools;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Exhaustive search over every combination in a [`GridConfig`].
///
/// Candidates are scored independently (in parallel with the `parallel`
/// feature). Ties keep the candidate that comes first in grid order, and
/// candidates scoring NaN are ignored.
pub struct GridSearch {
    grid: GridConfig,
    measure: Box<dyn SimilarityMeasure>,
    best: Option<BestParameters>,
    best_frequencies: Option<FrequencyMatrix>,
    evaluated: usize,
    elapsed: Duration,
}

impl GridSearch {
    pub fn new(grid: GridConfig, measure: Box<dyn SimilarityMeasure>) -> Self {
        Self {
            grid,
            measure,
            best: None,
            best_frequencies: None,
            evaluated: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Every candidate the grid produces for the models cached in `optimizer`,
    /// in evaluation order.
    pub fn candidates(&self, optimizer: &Optimizer) -> Vec<Candidate> {
        let weight_vectors: Vec<Vec<f64>> = (0..optimizer.macrostates().len())
            .map(|_| self.grid.weights.iter().copied())
            .multi_cartesian_product()
            .collect();

        let mut candidates = Vec::new();
        for params in self.model_params(optimizer) {
            for &steepness in &self.grid.steepness {
                for weights in &weight_vectors {
                    candidates.push(Candidate::new(params, steepness, weights.clone()));
                }
            }
        }
        candidates
    }

    fn model_params(&self, optimizer: &Optimizer) -> Vec<HyperParams> {
        let selected = optimizer.model_params().into_iter().filter(|p| {
            self.grid.backrub_temps.is_empty()
                || self
                    .grid
                    .backrub_temps
                    .iter()
                    .any(|t| (t - p.backrub_temp).abs() < 1e-9)
        });

        match optimizer.data_kind() {
            Some(DataKind::Microstate) => {
                let ensembles: Vec<Option<u32>> = if self.grid.ensemble_sizes.is_empty() {
                    vec![None]
                } else {
                    self.grid.ensemble_sizes.iter().copied().map(Some).collect()
                };
                let modes: Vec<BoltzmannMode> = if self.grid.boltzmann_modes.is_empty() {
                    vec![BoltzmannMode::Mean]
                } else {
                    self.grid.boltzmann_modes.clone()
                };
                selected
                    .flat_map(|p| {
                        ensembles
                            .iter()
                            .cartesian_product(modes.iter())
                            .map(move |(&e, &m)| HyperParams::new(p.backrub_temp, e, Some(m)))
                            .collect::<Vec<_>>()
                    })
                    .collect()
            }
            _ => selected.collect(),
        }
    }

    pub fn evaluated(&self) -> usize {
        self.evaluated
    }
}

impl SearchStrategy for GridSearch {
    #[instrument(skip_all, name = "grid_search")]
    fn iterate(
        &mut self,
        optimizer: &Optimizer,
        reporter: &ProgressReporter,
    ) -> Result<(), OptimizerError> {
        let start = Instant::now();
        self.best = None;
        self.best_frequencies = None;

        let candidates = self.candidates(optimizer);
        if candidates.is_empty() {
            return Err(OptimizerError::Search {
                strategy: self.name().to_string(),
                reason: "the grid selects no cached model".to_string(),
            });
        }
        info!(candidates = candidates.len(), "Starting grid search");
        reporter.report(Progress::TaskStart {
            total_steps: candidates.len() as u64,
        });

        let measure = self.measure.as_ref();

        #[cfg(not(feature = "parallel"))]
        let iterator = candidates.iter();

        #[cfg(feature = "parallel")]
        let iterator = candidates.par_iter();

        let scores: Vec<Result<f64, OptimizerError>> = iterator
            .map(|candidate| {
                let score = optimizer.verify_found_params(candidate, measure);
                reporter.report(Progress::TaskIncrement);
                score
            })
            .collect();
        reporter.report(Progress::TaskFinish);

        let mut best: Option<(usize, f64)> = None;
        for (i, score) in scores.into_iter().enumerate() {
            let score = score?;
            if score.is_nan() {
                debug!(candidate = i, "Ignoring NaN score");
                continue;
            }
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((i, score));
            }
        }
        self.evaluated = candidates.len();

        if let Some((i, score)) = best {
            let candidate = candidates[i].clone();
            self.best_frequencies = Some(optimizer.get_frequencies_by_params(&candidate)?);
            self.best = Some(BestParameters {
                candidate,
                match_score: score,
            });
            reporter.report(Progress::NewBest { score });
            info!(
                score,
                params = %candidates[i].params.id(),
                "Grid search finished"
            );
        }
        self.elapsed = start.elapsed();
        Ok(())
    }

    fn best_parameters(&self) -> Option<&BestParameters> {
        self.best.as_ref()
    }

    fn best_frequencies(&self) -> Option<&FrequencyMatrix> {
        self.best_frequencies.as_ref()
    }

    fn name(&self) -> &str {
        "grid search"
    }

    fn similarity_name(&self) -> &str {
        self.measure.name()
    }

    fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::energy_table::{MacrostateRecord, MicrostateRecord};
    use crate::core::io::fasta::FastaRecord;
    use crate::core::macrostates::MacrostateSet;
    use crate::core::residues::RESIDUE_COUNT;
    use crate::strategies::similarity::CosineSimilarity;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn funnel(low: usize, depth: f64) -> [f64; RESIDUE_COUNT] {
        let mut energies = [depth; RESIDUE_COUNT];
        energies[low] = 0.0;
        energies
    }

    fn target(optimizer: &mut Optimizer) {
        let records = vec![
            FastaRecord {
                header: "a".into(),
                sequence: "AD".into(),
            },
            FastaRecord {
                header: "b".into(),
                sequence: "AD".into(),
            },
        ];
        optimizer.set_target(&records, None).unwrap();
    }

    /// `apo` favours the target, `holo` favours tryptophan everywhere.
    fn macro_optimizer() -> Optimizer {
        let mut optimizer = Optimizer::new(MacrostateSet::new(["apo", "holo"]).unwrap(), true);
        target(&mut optimizer);
        let mut rows = Vec::new();
        for backrub in [0.3, 0.9] {
            let params = HyperParams::macrostate(backrub, 20, BoltzmannMode::Mean);
            for (position, low) in [(1, 0), (2, 2)] {
                rows.push(MacrostateRecord {
                    line: 0,
                    macrostate: 0,
                    params,
                    position,
                    energies: funnel(low, 3.0),
                });
                rows.push(MacrostateRecord {
                    line: 0,
                    macrostate: 1,
                    params,
                    position,
                    energies: funnel(18, 3.0),
                });
            }
        }
        optimizer.load_macrostate_records(&rows).unwrap();
        optimizer
    }

    fn grid() -> GridConfig {
        GridConfig {
            steepness: vec![0.1, 1.0, 3.0],
            weights: vec![0.0, 1.0],
            ..GridConfig::default()
        }
    }

    #[test]
    fn candidates_cover_the_whole_grid() {
        let optimizer = macro_optimizer();
        let search = GridSearch::new(grid(), Box::new(CosineSimilarity));
        let candidates = search.candidates(&optimizer);
        // 2 models x 3 steepness x 2^2 weight vectors
        assert_eq!(candidates.len(), 24);
        assert_eq!(candidates[0].weights, vec![0.0, 0.0]);
        assert_eq!(candidates[3].weights, vec![1.0, 1.0]);
    }

    #[test]
    fn backrub_filter_restricts_models() {
        let optimizer = macro_optimizer();
        let grid = GridConfig {
            backrub_temps: vec![0.9],
            ..grid()
        };
        let search = GridSearch::new(grid, Box::new(CosineSimilarity));
        let candidates = search.candidates(&optimizer);
        assert_eq!(candidates.len(), 12);
        assert!(candidates.iter().all(|c| c.params.backrub_temp == 0.9));
    }

    #[test]
    fn finds_the_weights_that_silence_the_decoy_macrostate() {
        let mut optimizer = macro_optimizer();
        optimizer.use_algorithm(Box::new(GridSearch::new(grid(), Box::new(CosineSimilarity))));

        let steps = AtomicU64::new(0);
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if let Progress::TaskIncrement = event {
                steps.fetch_add(1, Ordering::Relaxed);
            }
        }));
        optimizer.optimize(&reporter).unwrap();
        drop(reporter);
        assert_eq!(steps.load(Ordering::Relaxed), 24);

        let best = optimizer.best_parameters().unwrap();
        assert_eq!(best.weights(), &[1.0, 0.0]);
        assert_eq!(best.steepness(), 3.0);
        // Both models hold identical energies, so the first in id order wins.
        assert_eq!(best.backrub_temp(), 0.3);
        assert!(best.match_score > 0.9);

        let freqs = optimizer.best_frequencies().unwrap();
        assert!(freqs[(0, 0)] > 0.5);
        assert!(freqs[(1, 2)] > 0.5);

        let strategy = optimizer.strategy().unwrap();
        assert_eq!(strategy.name(), "grid search");
        assert_eq!(strategy.similarity_name(), "cosine");
    }

    #[test]
    fn microstate_grid_expands_ensembles_and_modes() {
        let mut optimizer = Optimizer::new(MacrostateSet::new(["apo"]).unwrap(), true);
        target(&mut optimizer);
        let rows: Vec<MicrostateRecord> = [(1, 0, 9.0), (1, 5, 0.5), (2, 2, 9.0)]
            .into_iter()
            .map(|(position, low, depth)| MicrostateRecord {
                line: 0,
                macrostate: 0,
                backrub_temp: 0.3,
                position,
                backbone: "sub".into(),
                energies: funnel(low, depth),
            })
            .collect();
        optimizer.load_microstate_records(&rows, 1).unwrap();

        let grid = GridConfig {
            ensemble_sizes: vec![1, 2],
            boltzmann_modes: vec![BoltzmannMode::Minimum, BoltzmannMode::Mean],
            steepness: vec![2.0],
            weights: vec![1.0],
            ..GridConfig::default()
        };
        let mut search = GridSearch::new(grid, Box::new(CosineSimilarity));
        assert_eq!(search.candidates(&optimizer).len(), 4);

        search.iterate(&optimizer, &ProgressReporter::new()).unwrap();
        let best = search.best_parameters().unwrap();
        assert_eq!(best.ensemble_size(), Some(1));
        assert_eq!(search.evaluated(), 4);
    }

    #[test]
    fn empty_selection_is_a_search_error() {
        let optimizer = macro_optimizer();
        let grid = GridConfig {
            backrub_temps: vec![5.0],
            ..grid()
        };
        let mut search = GridSearch::new(grid, Box::new(CosineSimilarity));
        assert!(matches!(
            search.iterate(&optimizer, &ProgressReporter::new()),
            Err(OptimizerError::Search { .. })
        ));
    }
}
