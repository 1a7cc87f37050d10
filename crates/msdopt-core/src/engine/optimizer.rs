use super::cache::ModelCache;
use super::error::OptimizerError;
use super::model::{DataKind, Model, PositionWindow};
use super::progress::ProgressReporter;
use super::search::{SearchStrategy, SimilarityMeasure};
use crate::core::io::energy_table::{
    MacrostateRecord, MicrostateRecord, load_macrostate_table, load_microstate_table,
};
use crate::core::io::fasta::{FastaRecord, read_records_from_path, write_frequencies_to_path};
use crate::core::io::report::{ReportContext, write_best_params_to_path};
use crate::core::macrostates::MacrostateSet;
use crate::core::params::{BestParameters, Candidate, HyperParams, ParamsId};
use crate::core::positions::{PositionFilter, PositionIndex};
use crate::core::profile::{FrequencyMatrix, TargetProfile};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Owns the target profile and one cached [`Model`] per hyperparameter tuple,
/// and exposes the read-only surface a [`SearchStrategy`] drives.
///
/// Load the target first: it fixes the number of positions and, with a
/// position filter, the sparse position numbering every model is built on.
pub struct Optimizer {
    macrostates: MacrostateSet,
    contiguous: bool,
    target: Option<TargetProfile>,
    position_index: Option<Arc<PositionIndex>>,
    min_position: Option<i64>,
    n_positions: usize,
    data_kind: Option<DataKind>,
    models: ModelCache,
    strategy: Option<Box<dyn SearchStrategy>>,
}

impl Optimizer {
    pub fn new(macrostates: MacrostateSet, contiguous: bool) -> Self {
        Self {
            macrostates,
            contiguous,
            target: None,
            position_index: None,
            min_position: None,
            n_positions: 0,
            data_kind: None,
            models: ModelCache::new(),
            strategy: None,
        }
    }

    /// Copies the loaded state into an independent optimizer. Cached models
    /// share their energy storage with this one; no strategy is attached.
    pub fn fork(&self) -> Self {
        Self {
            macrostates: self.macrostates.clone(),
            contiguous: self.contiguous,
            target: self.target.clone(),
            position_index: self.position_index.clone(),
            min_position: self.min_position,
            n_positions: self.n_positions,
            data_kind: self.data_kind,
            models: self.models.clone(),
            strategy: None,
        }
    }

    /// Reads the target profile from a FASTA alignment, optionally narrowed
    /// to the columns listed in a reindex file.
    pub fn read_target_frequencies(
        &mut self,
        alignment: &Path,
        reindex: Option<&Path>,
    ) -> Result<&FrequencyMatrix, OptimizerError> {
        info!(path = %alignment.display(), "Reading target alignment");
        let records = read_records_from_path(alignment)?;
        let filter = reindex.map(PositionFilter::load).transpose()?;
        self.set_target(&records, filter.as_ref())
    }

    /// Builds the target profile from alignment records.
    ///
    /// A filter switches the optimizer to sparse positions: its sequence
    /// positions become the position index every later load is keyed on.
    pub fn set_target(
        &mut self,
        records: &[FastaRecord],
        filter: Option<&PositionFilter>,
    ) -> Result<&FrequencyMatrix, OptimizerError> {
        let profile = TargetProfile::from_records(records, filter)?;

        let position_index = match filter {
            Some(filter) => {
                let mut index = PositionIndex::new();
                index.build(filter.sequence_positions())?;
                if index.len() != filter.len() {
                    return Err(OptimizerError::Configuration(
                        "position filter maps two columns to the same sequence position"
                            .to_string(),
                    ));
                }
                Some(Arc::new(index))
            }
            None if !self.contiguous => {
                return Err(OptimizerError::Configuration(
                    "non-contiguous positions require a position filter".to_string(),
                ));
            }
            None => None,
        };

        if position_index.is_some() && self.contiguous {
            debug!("Position filter given; switching to indexed positions");
            self.contiguous = false;
        }
        self.position_index = position_index;

        if !self.models.is_empty() {
            warn!(
                models = self.models.len(),
                "Target replaced after energies were loaded; discarding cached models"
            );
            self.models.clear();
            self.data_kind = None;
        }

        self.n_positions = profile.n_positions();
        info!(
            sequences = records.len(),
            positions = self.n_positions,
            "Target frequency profile built"
        );
        Ok(self.target.insert(profile).frequencies())
    }

    /// Replaces the cache with models built from a macrostate table on disk.
    pub fn read_data(&mut self, path: &Path) -> Result<(), OptimizerError> {
        info!(path = %path.display(), "Reading macrostate energy table");
        let records = load_macrostate_table(path, &self.macrostates)?;
        self.load_macrostate_records(&records)
    }

    /// Replaces the cache with models built from parsed macrostate rows.
    ///
    /// The target profile must already be read; it fixes the window size.
    /// Without a position filter, the first row's position is taken as the
    /// lowest position, so rows must be sorted by position; rows outside the
    /// resulting window are skipped.
    pub fn load_macrostate_records(
        &mut self,
        records: &[MacrostateRecord],
    ) -> Result<(), OptimizerError> {
        let n_positions = self.target_positions()?;
        let indexed = self.indexed_window()?;
        self.models.clear();
        self.data_kind = Some(DataKind::Macrostate);

        let Some(first) = records.first() else {
            warn!("Macrostate table contains no rows");
            return Ok(());
        };

        let window = match indexed {
            Some(window) => window,
            None => PositionWindow::Contiguous {
                min_position: first.position,
                n_positions,
            },
        };
        self.min_position = window.min_position();
        self.n_positions = window.len();

        let n_macrostates = self.macrostates.len();
        let mut skipped = 0_usize;
        for record in records {
            let (model, created) = self.models.get_or_create(&record.params, || {
                Model::new(record.params, n_macrostates, window.clone(), DataKind::Macrostate)
            });
            if created {
                debug!(params = %record.params.id(), "Created model");
            }
            if !model.add_macrostate_data(record.macrostate, record.position, &record.energies)? {
                trace!(line = record.line, position = record.position, "Position outside window");
                skipped += 1;
            }
        }

        info!(
            rows = records.len(),
            skipped,
            models = self.models.len(),
            "Macrostate energies loaded"
        );
        Ok(())
    }

    /// Replaces the cache with models built from a microstate table on disk.
    pub fn read_microstate_data(
        &mut self,
        path: &Path,
        min_position: i64,
    ) -> Result<(), OptimizerError> {
        info!(path = %path.display(), "Reading microstate energy table");
        let records = load_microstate_table(path, &self.macrostates)?;
        self.load_microstate_records(&records, min_position)
    }

    /// Replaces the cache with one model per backrub temperature, keeping
    /// every microstate so the ensemble size and Boltzmann mode can be chosen
    /// when frequencies are read.
    pub fn load_microstate_records(
        &mut self,
        records: &[MicrostateRecord],
        min_position: i64,
    ) -> Result<(), OptimizerError> {
        let n_positions = self.target_positions()?;
        let indexed = self.indexed_window()?;
        self.models.clear();
        self.data_kind = Some(DataKind::Microstate);

        let window = match indexed {
            Some(window) => window,
            None => PositionWindow::Contiguous {
                min_position,
                n_positions,
            },
        };

        let n_macrostates = self.macrostates.len();
        let mut max_position: Option<i64> = None;
        for record in records {
            let params = HyperParams::microstate(record.backrub_temp);
            let (model, created) = self.models.get_or_create(&params, || {
                Model::new(params, n_macrostates, window.clone(), DataKind::Microstate)
            });
            if created {
                debug!(params = %params.id(), "Created model");
            }
            if model.add_microstate_data(record.macrostate, record.position, &record.energies)? {
                max_position = max_position.max(Some(record.position));
            } else {
                warn!(
                    line = record.line,
                    position = record.position,
                    "Skipping microstate row outside the position window"
                );
            }
        }

        self.min_position = window.min_position();
        self.n_positions = match (&window, max_position) {
            (PositionWindow::Contiguous { .. }, Some(max)) => {
                let n = usize::try_from(max - min_position + 1).unwrap_or(0);
                if n != window.len() {
                    warn!(
                        observed = n,
                        expected = window.len(),
                        "Highest microstate position does not cover the target profile"
                    );
                }
                n
            }
            _ => window.len(),
        };

        info!(
            rows = records.len(),
            models = self.models.len(),
            positions = self.n_positions,
            "Microstate energies loaded"
        );
        Ok(())
    }

    /// Position count fixed by the target profile; every model window is
    /// sized from it.
    fn target_positions(&self) -> Result<usize, OptimizerError> {
        self.target
            .as_ref()
            .map(TargetProfile::n_positions)
            .ok_or_else(|| {
                OptimizerError::Configuration(
                    "the target profile must be read before energies are loaded".to_string(),
                )
            })
    }

    fn indexed_window(&self) -> Result<Option<PositionWindow>, OptimizerError> {
        if self.contiguous {
            return Ok(None);
        }
        self.position_index
            .as_ref()
            .map(|index| Some(PositionWindow::Indexed(Arc::clone(index))))
            .ok_or_else(|| {
                OptimizerError::Configuration(
                    "the target profile must be read before energies when positions are not contiguous"
                        .to_string(),
                )
            })
    }

    /// The cached model for exactly this tuple. Never creates one.
    pub fn get_model_by_params(&self, params: &HyperParams) -> Result<&Model, OptimizerError> {
        self.models
            .get(params)
            .ok_or_else(|| OptimizerError::Lookup(format!("no model for '{}'", params.id())))
    }

    /// The stored model a candidate reads from. Microstate models are keyed
    /// by backrub temperature alone.
    pub fn template_for(&self, candidate: &Candidate) -> Result<&Model, OptimizerError> {
        match self.data_kind {
            Some(DataKind::Microstate) => {
                self.get_model_by_params(&HyperParams::microstate(candidate.params.backrub_temp))
            }
            _ => self.get_model_by_params(&candidate.params),
        }
    }

    pub fn derive_model(&self, candidate: &Candidate) -> Result<Model, OptimizerError> {
        Model::construct_from_existing(
            self.template_for(candidate)?,
            candidate.params,
            &candidate.weights,
            candidate.steepness,
        )
    }

    pub fn get_frequencies_by_params(
        &self,
        candidate: &Candidate,
    ) -> Result<FrequencyMatrix, OptimizerError> {
        Ok(self.derive_model(candidate)?.get_frequencies())
    }

    /// Scores a candidate against the target profile.
    pub fn verify_found_params(
        &self,
        candidate: &Candidate,
        measure: &dyn SimilarityMeasure,
    ) -> Result<f64, OptimizerError> {
        let target = self.target.as_ref().ok_or_else(|| {
            OptimizerError::Configuration("no target profile has been read".to_string())
        })?;
        let predicted = self.get_frequencies_by_params(candidate)?;
        let expected = target.frequencies();
        if predicted.shape() != expected.shape() {
            return Err(OptimizerError::Configuration(format!(
                "predicted profile has {} positions but the target has {}",
                predicted.nrows(),
                expected.nrows()
            )));
        }
        Ok(measure.score(&predicted, expected))
    }

    pub fn use_algorithm(&mut self, strategy: Box<dyn SearchStrategy>) {
        debug!(strategy = strategy.name(), "Search strategy attached");
        self.strategy = Some(strategy);
    }

    /// Runs the attached search strategy to completion.
    pub fn optimize(&mut self, reporter: &ProgressReporter) -> Result<(), OptimizerError> {
        if self.target.is_none() {
            return Err(OptimizerError::Configuration(
                "no target profile has been read".to_string(),
            ));
        }
        if self.models.is_empty() {
            return Err(OptimizerError::Configuration(
                "no energy data has been loaded".to_string(),
            ));
        }
        let mut strategy = self.strategy.take().ok_or_else(|| {
            OptimizerError::Configuration("no search strategy attached".to_string())
        })?;
        let result = strategy.iterate(self, reporter);
        self.strategy = Some(strategy);
        result
    }

    pub fn strategy(&self) -> Option<&dyn SearchStrategy> {
        self.strategy.as_deref()
    }

    pub fn best_parameters(&self) -> Option<&BestParameters> {
        self.strategy.as_ref()?.best_parameters()
    }

    pub fn best_frequencies(&self) -> Option<&FrequencyMatrix> {
        self.strategy.as_ref()?.best_frequencies()
    }

    /// Writes the best parameters found by the last search as a text report.
    pub fn write_best_params_report(&self, path: &Path) -> Result<PathBuf, OptimizerError> {
        let (strategy, best) = self.finished_search()?;
        let context = ReportContext {
            algorithm: strategy.name().to_string(),
            similarity_measure: strategy.similarity_name().to_string(),
            elapsed: strategy.elapsed(),
        };
        let written = write_best_params_to_path(best, &context, path)?;
        info!(path = %written.display(), "Best parameters written");
        Ok(written)
    }

    /// Exports the best predicted profile as a pseudo-alignment.
    pub fn write_best_frequencies(
        &self,
        path: &Path,
        precision: u32,
    ) -> Result<PathBuf, OptimizerError> {
        let (strategy, _) = self.finished_search()?;
        let frequencies = strategy.best_frequencies().ok_or_else(|| {
            OptimizerError::Configuration("search recorded no best frequencies".to_string())
        })?;
        let written = write_frequencies_to_path(frequencies, precision, path)?;
        info!(path = %written.display(), "Best frequencies written");
        Ok(written)
    }

    fn finished_search(&self) -> Result<(&dyn SearchStrategy, &BestParameters), OptimizerError> {
        let strategy = self.strategy.as_deref().ok_or_else(|| {
            OptimizerError::Configuration("no search strategy attached".to_string())
        })?;
        let best = strategy.best_parameters().ok_or_else(|| {
            OptimizerError::Configuration("the search has not produced a result yet".to_string())
        })?;
        Ok((strategy, best))
    }

    pub fn macrostates(&self) -> &MacrostateSet {
        &self.macrostates
    }

    pub fn is_contiguous(&self) -> bool {
        self.contiguous
    }

    pub fn target(&self) -> Option<&TargetProfile> {
        self.target.as_ref()
    }

    pub fn target_frequencies(&self) -> Option<&FrequencyMatrix> {
        self.target.as_ref().map(TargetProfile::frequencies)
    }

    pub fn position_index(&self) -> Option<&PositionIndex> {
        self.position_index.as_deref()
    }

    pub fn n_positions(&self) -> usize {
        self.n_positions
    }

    pub fn min_position(&self) -> Option<i64> {
        self.min_position
    }

    pub fn data_kind(&self) -> Option<DataKind> {
        self.data_kind
    }

    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    pub fn params_ids(&self) -> Vec<ParamsId> {
        self.models.sorted().into_iter().map(|(id, _)| id.clone()).collect()
    }

    /// Parameters of every cached model, ordered by parameter id.
    pub fn model_params(&self) -> Vec<HyperParams> {
        self.models
            .sorted()
            .into_iter()
            .map(|(_, model)| *model.params())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::params::BoltzmannMode;
    use crate::core::positions::ReindexEntry;
    use crate::core::residues::RESIDUE_COUNT;
    use std::time::Duration;
    use tempfile::tempdir;

    fn macrostates() -> MacrostateSet {
        MacrostateSet::new(["apo", "holo"]).unwrap()
    }

    fn records(sequences: &[&str]) -> Vec<FastaRecord> {
        sequences
            .iter()
            .map(|s| FastaRecord {
                header: "Null".to_string(),
                sequence: s.to_string(),
            })
            .collect()
    }

    fn funnel(low_residue: usize) -> [f64; RESIDUE_COUNT] {
        let mut energies = [4.0; RESIDUE_COUNT];
        energies[low_residue] = 0.0;
        energies
    }

    fn macro_row(macrostate: usize, params: HyperParams, position: i64, low: usize) -> MacrostateRecord {
        MacrostateRecord {
            line: 0,
            macrostate,
            params,
            position,
            energies: funnel(low),
        }
    }

    fn micro_row(macrostate: usize, backrub_temp: f64, position: i64, low: usize) -> MicrostateRecord {
        MicrostateRecord {
            line: 0,
            macrostate,
            backrub_temp,
            position,
            backbone: "sub1_us1".to_string(),
            energies: funnel(low),
        }
    }

    fn params() -> HyperParams {
        HyperParams::macrostate(0.9, 20, BoltzmannMode::Mean)
    }

    /// Target `AC`: position 1 is all alanine, position 2 all cysteine.
    fn loaded() -> Optimizer {
        let mut optimizer = Optimizer::new(macrostates(), true);
        optimizer.set_target(&records(&["AC", "AC"]), None).unwrap();
        optimizer
            .load_macrostate_records(&[
                macro_row(0, params(), 1, 0),
                macro_row(1, params(), 1, 0),
                macro_row(0, params(), 2, 1),
                macro_row(1, params(), 2, 1),
                macro_row(0, params(), 3, 5),
            ])
            .unwrap();
        optimizer
    }

    struct DotProduct;

    impl SimilarityMeasure for DotProduct {
        fn score(&self, predicted: &FrequencyMatrix, target: &FrequencyMatrix) -> f64 {
            predicted.dot(target) / predicted.nrows() as f64
        }

        fn name(&self) -> &str {
            "dot product"
        }
    }

    struct FixedCandidate {
        candidate: Candidate,
        best: Option<BestParameters>,
        frequencies: Option<FrequencyMatrix>,
    }

    impl SearchStrategy for FixedCandidate {
        fn iterate(
            &mut self,
            optimizer: &Optimizer,
            _reporter: &ProgressReporter,
        ) -> Result<(), OptimizerError> {
            let score = optimizer.verify_found_params(&self.candidate, &DotProduct)?;
            self.frequencies = Some(optimizer.get_frequencies_by_params(&self.candidate)?);
            self.best = Some(BestParameters {
                candidate: self.candidate.clone(),
                match_score: score,
            });
            Ok(())
        }

        fn best_parameters(&self) -> Option<&BestParameters> {
            self.best.as_ref()
        }

        fn best_frequencies(&self) -> Option<&FrequencyMatrix> {
            self.frequencies.as_ref()
        }

        fn name(&self) -> &str {
            "fixed"
        }

        fn similarity_name(&self) -> &str {
            "dot product"
        }

        fn elapsed(&self) -> Duration {
            Duration::from_secs(1)
        }
    }

    #[test]
    fn first_row_sets_window_and_out_of_window_rows_are_dropped() {
        let optimizer = loaded();
        assert_eq!(optimizer.min_position(), Some(1));
        assert_eq!(optimizer.n_positions(), 2);
        assert_eq!(optimizer.model_count(), 1);
        assert_eq!(optimizer.data_kind(), Some(DataKind::Macrostate));
        assert_eq!(
            optimizer.get_model_by_params(&params()).unwrap().n_positions(),
            2
        );
    }

    #[test]
    fn unknown_params_are_a_lookup_error() {
        let optimizer = loaded();
        let other = HyperParams::macrostate(0.9, 20, BoltzmannMode::Minimum);
        assert!(matches!(
            optimizer.get_model_by_params(&other),
            Err(OptimizerError::Lookup(_))
        ));
        assert_eq!(optimizer.model_count(), 1);
    }

    #[test]
    fn frequencies_follow_the_lowest_energies() {
        let optimizer = loaded();
        let candidate = Candidate::new(params(), 5.0, vec![0.5, 0.5]);
        let freqs = optimizer.get_frequencies_by_params(&candidate).unwrap();
        assert_eq!(freqs.nrows(), 2);
        assert!(freqs[(0, 0)] > 0.9);
        assert!(freqs[(1, 1)] > 0.9);

        let score = optimizer.verify_found_params(&candidate, &DotProduct).unwrap();
        assert!(score > 0.9);
    }

    #[test]
    fn wrong_weight_count_is_a_configuration_error() {
        let optimizer = loaded();
        let candidate = Candidate::new(params(), 1.0, vec![1.0]);
        assert!(matches!(
            optimizer.get_frequencies_by_params(&candidate),
            Err(OptimizerError::Configuration(_))
        ));
    }

    #[test]
    fn reloading_replaces_the_cache() {
        let mut optimizer = loaded();
        let other = HyperParams::macrostate(0.3, 5, BoltzmannMode::Minimum);
        optimizer
            .load_macrostate_records(&[macro_row(0, other, 1, 2)])
            .unwrap();
        assert_eq!(optimizer.model_count(), 1);
        assert!(optimizer.get_model_by_params(&params()).is_err());
        assert!(optimizer.get_model_by_params(&other).is_ok());
    }

    #[test]
    fn energies_before_target_are_a_configuration_error() {
        let mut optimizer = Optimizer::new(macrostates(), true);
        assert!(matches!(
            optimizer.load_macrostate_records(&[
                macro_row(0, params(), 1, 0),
                macro_row(0, params(), 2_000_000_000, 0),
            ]),
            Err(OptimizerError::Configuration(_))
        ));
        assert!(matches!(
            optimizer.load_microstate_records(
                &[micro_row(0, 0.3, 1, 0), micro_row(0, 0.3, 2_000_000_000, 0)],
                1
            ),
            Err(OptimizerError::Configuration(_))
        ));
        assert_eq!(optimizer.model_count(), 0);
        assert_eq!(optimizer.data_kind(), None);
    }

    #[test]
    fn far_out_positions_do_not_grow_the_window() {
        let mut optimizer = Optimizer::new(macrostates(), true);
        optimizer.set_target(&records(&["AC", "AC"]), None).unwrap();
        optimizer
            .load_macrostate_records(&[
                macro_row(0, params(), 1, 0),
                macro_row(0, params(), 2_000_000_000, 0),
            ])
            .unwrap();
        assert_eq!(optimizer.n_positions(), 2);
        let model = optimizer.get_model_by_params(&params()).unwrap();
        assert_eq!(model.n_positions(), 2);
    }

    #[test]
    fn filtered_target_keys_models_on_sparse_positions() {
        let filter = PositionFilter::new(vec![
            ReindexEntry {
                alignment_column: 0,
                sequence_position: 30,
            },
            ReindexEntry {
                alignment_column: 2,
                sequence_position: 12,
            },
        ]);
        let mut optimizer = Optimizer::new(macrostates(), true);
        let target = optimizer
            .set_target(&records(&["A-D", "A-D"]), Some(&filter))
            .unwrap();
        assert_eq!(target.nrows(), 2);
        assert!(!optimizer.is_contiguous());

        optimizer
            .load_macrostate_records(&[
                macro_row(0, params(), 12, 2),
                macro_row(0, params(), 30, 0),
                macro_row(0, params(), 31, 7),
            ])
            .unwrap();
        assert_eq!(optimizer.n_positions(), 2);
        assert_eq!(optimizer.min_position(), Some(12));

        let candidate = Candidate::new(params(), 5.0, vec![1.0, 0.0]);
        let freqs = optimizer.get_frequencies_by_params(&candidate).unwrap();
        assert!(freqs[(0, 0)] > 0.9);
        assert!(freqs[(1, 2)] > 0.9);
    }

    #[test]
    fn sparse_ingestion_before_target_is_a_configuration_error() {
        let mut optimizer = Optimizer::new(macrostates(), false);
        assert!(matches!(
            optimizer.load_macrostate_records(&[macro_row(0, params(), 1, 0)]),
            Err(OptimizerError::Configuration(_))
        ));
        assert!(matches!(
            optimizer.load_microstate_records(&[micro_row(0, 0.3, 1, 0)], 1),
            Err(OptimizerError::Configuration(_))
        ));
        assert!(matches!(
            optimizer.set_target(&records(&["AC"]), None),
            Err(OptimizerError::Configuration(_))
        ));
    }

    #[test]
    fn rejected_filter_leaves_the_optimizer_unchanged() {
        let duplicate = PositionFilter::new(vec![
            ReindexEntry {
                alignment_column: 0,
                sequence_position: 5,
            },
            ReindexEntry {
                alignment_column: 1,
                sequence_position: 5,
            },
        ]);
        let mut optimizer = Optimizer::new(macrostates(), true);
        assert!(matches!(
            optimizer.set_target(&records(&["AC", "AC"]), Some(&duplicate)),
            Err(OptimizerError::Configuration(_))
        ));
        assert!(optimizer.is_contiguous());
        assert!(optimizer.position_index().is_none());
        assert!(optimizer.target().is_none());

        optimizer.set_target(&records(&["AC", "AC"]), None).unwrap();
        assert_eq!(optimizer.n_positions(), 2);
    }

    #[test]
    fn all_gap_target_column_is_a_data_error() {
        let mut optimizer = Optimizer::new(macrostates(), true);
        assert!(matches!(
            optimizer.set_target(&records(&["A-", "C-"]), None),
            Err(OptimizerError::Data { .. })
        ));
    }

    #[test]
    fn microstate_models_are_keyed_by_backrub_temperature() {
        let mut optimizer = Optimizer::new(macrostates(), true);
        optimizer.set_target(&records(&["ACD"]), None).unwrap();
        optimizer
            .load_microstate_records(
                &[
                    micro_row(0, 0.3, 5, 0),
                    micro_row(0, 0.3, 5, 3),
                    micro_row(1, 0.3, 6, 1),
                    micro_row(0, 0.6, 5, 0),
                    micro_row(0, 0.6, 9, 0),
                    micro_row(0, 0.6, 4, 0),
                ],
                5,
            )
            .unwrap();
        assert_eq!(optimizer.model_count(), 2);
        assert_eq!(optimizer.data_kind(), Some(DataKind::Microstate));
        assert_eq!(optimizer.min_position(), Some(5));
        assert_eq!(optimizer.n_positions(), 2);

        let candidate = Candidate::new(
            HyperParams::new(0.3, Some(1), Some(BoltzmannMode::Minimum)),
            5.0,
            vec![1.0, 1.0],
        );
        let freqs = optimizer.get_frequencies_by_params(&candidate).unwrap();
        assert_eq!(freqs.nrows(), 3);
        assert!(freqs[(0, 0)] > 0.9);

        let missing = Candidate::new(HyperParams::new(0.9, None, None), 1.0, vec![1.0, 1.0]);
        assert!(matches!(
            optimizer.get_frequencies_by_params(&missing),
            Err(OptimizerError::Lookup(_))
        ));
    }

    #[test]
    fn optimize_requires_a_strategy_and_records_its_result() {
        let mut optimizer = loaded();
        assert!(matches!(
            optimizer.optimize(&ProgressReporter::new()),
            Err(OptimizerError::Configuration(_))
        ));

        optimizer.use_algorithm(Box::new(FixedCandidate {
            candidate: Candidate::new(params(), 2.0, vec![1.0, 1.0]),
            best: None,
            frequencies: None,
        }));
        optimizer.optimize(&ProgressReporter::new()).unwrap();

        let best = optimizer.best_parameters().unwrap();
        assert_eq!(best.steepness(), 2.0);
        assert!(best.match_score > 0.5);
        assert_eq!(optimizer.best_frequencies().unwrap().nrows(), 2);

        let dir = tempdir().unwrap();
        let report = optimizer
            .write_best_params_report(&dir.path().join("best"))
            .unwrap();
        let text = std::fs::read_to_string(report).unwrap();
        assert!(text.contains("Algorithm: fixed\n"));
        assert!(text.contains("Boltzmann averaging temperature: mean\n"));

        let fasta = optimizer
            .write_best_frequencies(&dir.path().join("best"), 1)
            .unwrap();
        assert!(fasta.ends_with("best.fasta"));
    }

    #[test]
    fn optimize_without_data_is_a_configuration_error() {
        let mut optimizer = Optimizer::new(macrostates(), true);
        optimizer.set_target(&records(&["AC"]), None).unwrap();
        assert!(matches!(
            optimizer.optimize(&ProgressReporter::new()),
            Err(OptimizerError::Configuration(_))
        ));
    }

    #[test]
    fn fork_shares_models_without_the_strategy() {
        let mut optimizer = loaded();
        optimizer.use_algorithm(Box::new(FixedCandidate {
            candidate: Candidate::new(params(), 1.0, vec![1.0, 1.0]),
            best: None,
            frequencies: None,
        }));
        let fork = optimizer.fork();
        assert!(fork.strategy().is_none());
        assert_eq!(fork.model_count(), 1);
        assert_eq!(fork.target_frequencies(), optimizer.target_frequencies());
        assert!(
            fork.get_model_by_params(&params())
                .unwrap()
                .shares_data_with(optimizer.get_model_by_params(&params()).unwrap())
        );
    }

    #[test]
    fn read_target_frequencies_with_reindex_file() {
        let dir = tempdir().unwrap();
        let alignment = dir.path().join("target.fasta");
        std::fs::write(&alignment, ">NULL\nAC-D\n>NULL\nAC-E\n>NULL\nA-ED\n").unwrap();
        let reindex = dir.path().join("positions.txt");
        std::fs::write(&reindex, "1 x 101\n3 x 103\n").unwrap();

        let mut optimizer = Optimizer::new(macrostates(), true);
        let freqs = optimizer
            .read_target_frequencies(&alignment, Some(&reindex))
            .unwrap()
            .clone();
        assert_eq!(freqs.nrows(), 2);
        assert_eq!(freqs[(0, 1)], 1.0);
        assert!((freqs[(1, 2)] - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(optimizer.position_index().unwrap().positions(), &[101, 103]);
    }
}
