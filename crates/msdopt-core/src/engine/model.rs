use super::error::OptimizerError;
use crate::core::params::{BoltzmannMode, HyperParams};
use crate::core::positions::PositionIndex;
use crate::core::profile::FrequencyMatrix;
use crate::core::residues::RESIDUE_COUNT;
use std::sync::Arc;

/// Residue energies of one macrostate at one position, in canonical order.
pub type EnergyVector = [f64; RESIDUE_COUNT];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    /// Energies already collapsed over an ensemble when the table was written.
    Macrostate,
    /// One energy vector per sampled backbone, collapsed when frequencies are read.
    Microstate,
}

/// The positions a model stores, and how a sequence position maps to a slot.
#[derive(Debug, Clone, PartialEq)]
pub enum PositionWindow {
    /// Positions `min_position .. min_position + n_positions`.
    Contiguous { min_position: i64, n_positions: usize },
    /// Exactly the positions registered in the index, in index order.
    Indexed(Arc<PositionIndex>),
}

impl PositionWindow {
    pub fn len(&self) -> usize {
        match self {
            Self::Contiguous { n_positions, .. } => *n_positions,
            Self::Indexed(index) => index.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Slot of a sequence position, or `None` when it lies outside the window.
    pub fn slot_of(&self, position: i64) -> Option<usize> {
        match self {
            Self::Contiguous {
                min_position,
                n_positions,
            } => {
                let offset = position.checked_sub(*min_position)?;
                usize::try_from(offset).ok().filter(|&o| o < *n_positions)
            }
            Self::Indexed(index) => index.compact_index_of(position).ok(),
        }
    }

    pub fn min_position(&self) -> Option<i64> {
        match self {
            Self::Contiguous { min_position, .. } => Some(*min_position),
            Self::Indexed(index) => index.positions().iter().min().copied(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum EnergyData {
    /// Flattened `[macrostate][residue][slot]`.
    Macrostate(Vec<f64>),
    /// Microstate vectors in arrival order, per `macrostate * n_slots + slot`.
    Microstate(Vec<Vec<EnergyVector>>),
}

/// The energies behind one hyperparameter tuple, plus the weights and
/// steepness that turn them into predicted frequencies.
///
/// Energy storage is shared between a template and every model derived from
/// it with [`Model::construct_from_existing`]; writes after the split copy the
/// storage first, so a template is never changed through a derived model.
#[derive(Debug, Clone)]
pub struct Model {
    params: HyperParams,
    n_macrostates: usize,
    window: PositionWindow,
    data: Arc<EnergyData>,
    has_data: bool,
    weights: Vec<f64>,
    steepness: f64,
}

impl Model {
    /// Creates an empty model. Until derived, it carries unit weights and unit
    /// steepness.
    pub fn new(
        params: HyperParams,
        n_macrostates: usize,
        window: PositionWindow,
        kind: DataKind,
    ) -> Self {
        let n_slots = window.len();
        let data = match kind {
            DataKind::Macrostate => {
                EnergyData::Macrostate(vec![0.0; n_macrostates * RESIDUE_COUNT * n_slots])
            }
            DataKind::Microstate => EnergyData::Microstate(vec![Vec::new(); n_macrostates * n_slots]),
        };
        Self {
            params,
            n_macrostates,
            window,
            data: Arc::new(data),
            has_data: false,
            weights: vec![1.0; n_macrostates],
            steepness: 1.0,
        }
    }

    /// Stores ensemble-averaged energies, replacing any earlier values for the
    /// same macrostate and position. Returns `Ok(false)` when the position is
    /// outside the window and nothing was stored.
    pub fn add_macrostate_data(
        &mut self,
        macrostate: usize,
        position: i64,
        energies: &EnergyVector,
    ) -> Result<bool, OptimizerError> {
        self.check_macrostate(macrostate)?;
        let Some(slot) = self.window.slot_of(position) else {
            return Ok(false);
        };
        let n_slots = self.window.len();
        match Arc::make_mut(&mut self.data) {
            EnergyData::Macrostate(values) => {
                for (residue, &energy) in energies.iter().enumerate() {
                    values[(macrostate * RESIDUE_COUNT + residue) * n_slots + slot] = energy;
                }
            }
            EnergyData::Microstate(_) => {
                return Err(OptimizerError::Configuration(
                    "cannot add macrostate energies to a microstate model".to_string(),
                ));
            }
        }
        self.has_data = true;
        Ok(true)
    }

    /// Appends one microstate's energies. Returns `Ok(false)` when the position
    /// is outside the window and nothing was stored.
    pub fn add_microstate_data(
        &mut self,
        macrostate: usize,
        position: i64,
        energies: &EnergyVector,
    ) -> Result<bool, OptimizerError> {
        self.check_macrostate(macrostate)?;
        let Some(slot) = self.window.slot_of(position) else {
            return Ok(false);
        };
        let n_slots = self.window.len();
        match Arc::make_mut(&mut self.data) {
            EnergyData::Microstate(lists) => lists[macrostate * n_slots + slot].push(*energies),
            EnergyData::Macrostate(_) => {
                return Err(OptimizerError::Configuration(
                    "cannot add microstate energies to a macrostate model".to_string(),
                ));
            }
        }
        self.has_data = true;
        Ok(true)
    }

    /// Derives a model that shares `template`'s energies but reads them with
    /// its own hyperparameters, weights and steepness.
    ///
    /// For microstate data the ensemble size and Boltzmann mode of `params`
    /// decide how microstates are collapsed; an unset mode means the mean.
    pub fn construct_from_existing(
        template: &Model,
        params: HyperParams,
        weights: &[f64],
        steepness: f64,
    ) -> Result<Model, OptimizerError> {
        if !template.has_data {
            return Err(OptimizerError::Configuration(format!(
                "template model '{}' holds no energy data",
                template.params.id()
            )));
        }
        if weights.len() != template.n_macrostates {
            return Err(OptimizerError::Configuration(format!(
                "expected {} macrostate weights, got {}",
                template.n_macrostates,
                weights.len()
            )));
        }
        if let Some(w) = weights.iter().find(|w| !w.is_finite()) {
            return Err(OptimizerError::Configuration(format!(
                "macrostate weight must be finite, got {}",
                w
            )));
        }
        if !steepness.is_finite() {
            return Err(OptimizerError::Configuration(format!(
                "steepness must be finite, got {}",
                steepness
            )));
        }
        if params.ensemble_size == Some(0) && template.kind() == DataKind::Microstate {
            return Err(OptimizerError::Configuration(
                "ensemble size must be at least 1".to_string(),
            ));
        }

        Ok(Model {
            params,
            n_macrostates: template.n_macrostates,
            window: template.window.clone(),
            data: Arc::clone(&template.data),
            has_data: true,
            weights: weights.to_vec(),
            steepness,
        })
    }

    /// Predicted residue frequencies, one row per position slot.
    ///
    /// Each row is a softmin over the weighted macrostate energies:
    /// `f[p][r] ∝ exp(-steepness * Σ_m w_m E_m[r][p])`. The row maximum of the
    /// exponent is subtracted before exponentiation, so rows always sum to 1.
    pub fn get_frequencies(&self) -> FrequencyMatrix {
        let n_slots = self.window.len();
        let mut frequencies = FrequencyMatrix::zeros(n_slots, RESIDUE_COUNT);
        let reduced = self.reduced_energies();

        for slot in 0..n_slots {
            let mut scaled = [0.0; RESIDUE_COUNT];
            for (residue, value) in scaled.iter_mut().enumerate() {
                let combined: f64 = (0..self.n_macrostates)
                    .map(|m| self.weights[m] * reduced[(m * RESIDUE_COUNT + residue) * n_slots + slot])
                    .sum();
                *value = -self.steepness * combined;
            }
            let max = scaled.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let mut total = 0.0;
            for value in scaled.iter_mut() {
                *value = (*value - max).exp();
                total += *value;
            }
            for (residue, value) in scaled.iter().enumerate() {
                frequencies[(slot, residue)] = value / total;
            }
        }
        frequencies
    }

    /// Per-macrostate energies as used for frequencies, flattened
    /// `[macrostate][residue][slot]`. Microstate data is collapsed here.
    pub fn reduced_energies(&self) -> Vec<f64> {
        match self.data.as_ref() {
            EnergyData::Macrostate(values) => values.clone(),
            EnergyData::Microstate(lists) => {
                let n_slots = self.window.len();
                let mode = self.params.boltzmann.unwrap_or(BoltzmannMode::Mean);
                let take = self.params.ensemble_size.map_or(usize::MAX, |n| n as usize);
                let mut values = vec![0.0; self.n_macrostates * RESIDUE_COUNT * n_slots];
                for m in 0..self.n_macrostates {
                    for slot in 0..n_slots {
                        let ensemble = &lists[m * n_slots + slot];
                        let ensemble = &ensemble[..ensemble.len().min(take)];
                        for residue in 0..RESIDUE_COUNT {
                            values[(m * RESIDUE_COUNT + residue) * n_slots + slot] =
                                collapse(ensemble.iter().map(|e| e[residue]), mode);
                        }
                    }
                }
                values
            }
        }
    }

    fn check_macrostate(&self, macrostate: usize) -> Result<(), OptimizerError> {
        if macrostate < self.n_macrostates {
            Ok(())
        } else {
            Err(OptimizerError::Configuration(format!(
                "macrostate index {} out of range for {} macrostates",
                macrostate, self.n_macrostates
            )))
        }
    }

    pub fn params(&self) -> &HyperParams {
        &self.params
    }

    pub fn kind(&self) -> DataKind {
        match self.data.as_ref() {
            EnergyData::Macrostate(_) => DataKind::Macrostate,
            EnergyData::Microstate(_) => DataKind::Microstate,
        }
    }

    pub fn window(&self) -> &PositionWindow {
        &self.window
    }

    pub fn n_positions(&self) -> usize {
        self.window.len()
    }

    pub fn n_macrostates(&self) -> usize {
        self.n_macrostates
    }

    pub fn has_data(&self) -> bool {
        self.has_data
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn steepness(&self) -> f64 {
        self.steepness
    }

    /// Whether two models read the same stored energies.
    pub fn shares_data_with(&self, other: &Model) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

/// Collapses one residue's energies across an ensemble. An empty ensemble
/// contributes zero energy.
fn collapse(energies: impl Iterator<Item = f64> + Clone, mode: BoltzmannMode) -> f64 {
    let min = energies.clone().fold(f64::INFINITY, f64::min);
    if !min.is_finite() {
        return 0.0;
    }
    match mode {
        BoltzmannMode::Minimum => min,
        BoltzmannMode::Mean => {
            let (sum, count) = energies.fold((0.0, 0_usize), |(s, c), e| (s + e, c + 1));
            sum / count as f64
        }
        BoltzmannMode::Temperature(t) => {
            let (weighted, norm) = energies.fold((0.0, 0.0), |(we, n), e| {
                let w = (-(e - min) / t).exp();
                (we + w * e, n + w)
            });
            weighted / norm
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(n: usize) -> PositionWindow {
        PositionWindow::Contiguous {
            min_position: 10,
            n_positions: n,
        }
    }

    fn macro_params() -> HyperParams {
        HyperParams::macrostate(0.9, 20, BoltzmannMode::Mean)
    }

    fn uniform(value: f64) -> EnergyVector {
        [value; RESIDUE_COUNT]
    }

    fn funnel(low_residue: usize) -> EnergyVector {
        let mut energies = uniform(5.0);
        energies[low_residue] = 0.0;
        energies
    }

    #[test]
    fn frequency_rows_sum_to_one() {
        let mut model = Model::new(macro_params(), 2, window(3), DataKind::Macrostate);
        let mut energies = uniform(0.0);
        for (i, e) in energies.iter_mut().enumerate() {
            *e = i as f64 * 0.3 - 2.0;
        }
        model.add_macrostate_data(0, 10, &energies).unwrap();
        model.add_macrostate_data(1, 12, &funnel(4)).unwrap();

        let derived =
            Model::construct_from_existing(&model, macro_params(), &[0.7, 1.3], 2.5).unwrap();
        for row in derived.get_frequencies().row_iter() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn large_steepness_concentrates_on_the_lowest_energy() {
        let mut model = Model::new(macro_params(), 1, window(1), DataKind::Macrostate);
        model.add_macrostate_data(0, 10, &funnel(6)).unwrap();

        let mut previous = 0.0;
        for steepness in [0.1, 1.0, 10.0] {
            let derived =
                Model::construct_from_existing(&model, macro_params(), &[1.0], steepness).unwrap();
            let p = derived.get_frequencies()[(0, 6)];
            assert!(p > previous);
            previous = p;
        }
        assert!(previous > 0.999);
    }

    #[test]
    fn extreme_energies_do_not_overflow() {
        let mut model = Model::new(macro_params(), 1, window(1), DataKind::Macrostate);
        let mut energies = uniform(1.0e6);
        energies[0] = -1.0e6;
        model.add_macrostate_data(0, 10, &energies).unwrap();
        let freqs = model.get_frequencies();
        assert!(freqs.iter().all(|f| f.is_finite()));
        assert!((freqs[(0, 0)] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn reingesting_a_record_keeps_only_the_latest_values() {
        let mut model = Model::new(macro_params(), 1, window(1), DataKind::Macrostate);
        model.add_macrostate_data(0, 10, &funnel(0)).unwrap();
        model.add_macrostate_data(0, 10, &funnel(1)).unwrap();
        let freqs = model.get_frequencies();
        assert!(freqs[(0, 1)] > freqs[(0, 0)]);
        assert_eq!(model.reduced_energies()[0], 5.0);
    }

    #[test]
    fn out_of_window_positions_are_skipped() {
        let mut model = Model::new(macro_params(), 1, window(2), DataKind::Macrostate);
        assert!(model.add_macrostate_data(0, 9, &uniform(1.0)).is_ok_and(|stored| !stored));
        assert!(!model.has_data());
        assert!(model.add_macrostate_data(0, 12, &uniform(1.0)).is_ok_and(|stored| !stored));
        assert!(model.add_macrostate_data(0, 11, &uniform(1.0)).is_ok_and(|stored| stored));
        assert!(model.has_data());
    }

    #[test]
    fn unknown_macrostate_index_is_rejected() {
        let mut model = Model::new(macro_params(), 2, window(1), DataKind::Macrostate);
        assert!(matches!(
            model.add_macrostate_data(2, 10, &uniform(0.0)),
            Err(OptimizerError::Configuration(_))
        ));
    }

    #[test]
    fn derived_models_never_touch_the_template() {
        let mut template = Model::new(macro_params(), 1, window(1), DataKind::Macrostate);
        template.add_macrostate_data(0, 10, &funnel(2)).unwrap();
        let before = template.get_frequencies();

        let mut derived =
            Model::construct_from_existing(&template, macro_params(), &[2.0], 3.0).unwrap();
        assert!(derived.shares_data_with(&template));
        derived.add_macrostate_data(0, 10, &funnel(7)).unwrap();

        assert!(!derived.shares_data_with(&template));
        assert_eq!(template.get_frequencies(), before);
        assert_eq!(template.weights(), &[1.0]);
        assert_eq!(template.steepness(), 1.0);
    }

    #[test]
    fn empty_template_cannot_be_derived() {
        let template = Model::new(macro_params(), 1, window(1), DataKind::Macrostate);
        assert!(matches!(
            Model::construct_from_existing(&template, macro_params(), &[1.0], 1.0),
            Err(OptimizerError::Configuration(_))
        ));
    }

    #[test]
    fn weight_count_must_match_macrostates() {
        let mut template = Model::new(macro_params(), 2, window(1), DataKind::Macrostate);
        template.add_macrostate_data(0, 10, &uniform(0.0)).unwrap();
        assert!(matches!(
            Model::construct_from_existing(&template, macro_params(), &[1.0], 1.0),
            Err(OptimizerError::Configuration(_))
        ));
        assert!(matches!(
            Model::construct_from_existing(&template, macro_params(), &[1.0, 1.0], f64::NAN),
            Err(OptimizerError::Configuration(_))
        ));
    }

    fn microstate_template() -> Model {
        let mut model = Model::new(
            HyperParams::microstate(0.3),
            1,
            window(1),
            DataKind::Microstate,
        );
        for value in [1.0, 3.0, 8.0] {
            model.add_microstate_data(0, 10, &uniform(value)).unwrap();
        }
        model
    }

    fn reduced_with(ensemble: Option<u32>, mode: Option<BoltzmannMode>) -> f64 {
        let template = microstate_template();
        let params = HyperParams::new(0.3, ensemble, mode);
        Model::construct_from_existing(&template, params, &[1.0], 1.0)
            .unwrap()
            .reduced_energies()[0]
    }

    #[test]
    fn microstates_collapse_by_boltzmann_mode() {
        assert_eq!(reduced_with(None, Some(BoltzmannMode::Minimum)), 1.0);
        assert_eq!(reduced_with(None, Some(BoltzmannMode::Mean)), 4.0);
        assert_eq!(reduced_with(None, None), 4.0);

        let t = 2.0;
        let weights: Vec<f64> = [1.0_f64, 3.0, 8.0]
            .iter()
            .map(|e| (-(e - 1.0) / t).exp())
            .collect();
        let expected = (weights[0] * 1.0 + weights[1] * 3.0 + weights[2] * 8.0)
            / weights.iter().sum::<f64>();
        let got = reduced_with(None, Some(BoltzmannMode::Temperature(t)));
        assert!((got - expected).abs() < 1e-12);
        assert!(got > 1.0 && got < 4.0);
    }

    #[test]
    fn ensemble_size_limits_the_microstates_used() {
        assert_eq!(reduced_with(Some(2), Some(BoltzmannMode::Mean)), 2.0);
        assert_eq!(reduced_with(Some(50), Some(BoltzmannMode::Mean)), 4.0);
        assert!(matches!(
            Model::construct_from_existing(
                &microstate_template(),
                HyperParams::new(0.3, Some(0), None),
                &[1.0],
                1.0
            ),
            Err(OptimizerError::Configuration(_))
        ));
    }

    #[test]
    fn empty_microstate_slots_contribute_zero() {
        let mut model = Model::new(
            HyperParams::microstate(0.3),
            2,
            window(1),
            DataKind::Microstate,
        );
        model.add_microstate_data(0, 10, &funnel(3)).unwrap();
        let reduced = model.reduced_energies();
        assert_eq!(reduced[RESIDUE_COUNT], 0.0);
        assert!(matches!(
            model.add_macrostate_data(0, 10, &uniform(0.0)),
            Err(OptimizerError::Configuration(_))
        ));
    }

    #[test]
    fn indexed_window_maps_sparse_positions() {
        let index = Arc::new(PositionIndex::from_positions([40, 7, 19]));
        let window = PositionWindow::Indexed(index);
        assert_eq!(window.len(), 3);
        assert_eq!(window.slot_of(7), Some(1));
        assert_eq!(window.slot_of(8), None);
        assert_eq!(window.min_position(), Some(7));

        let mut model = Model::new(macro_params(), 1, window, DataKind::Macrostate);
        model.add_macrostate_data(0, 19, &funnel(9)).unwrap();
        assert!(model.get_frequencies()[(2, 9)] > 0.5);
    }
}
