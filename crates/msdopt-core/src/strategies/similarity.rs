use crate::core::profile::FrequencyMatrix;
use crate::engine::config::SimilarityKind;
use crate::engine::search::SimilarityMeasure;

/// Mean cosine similarity of corresponding rows. A row that is all zero in
/// either profile scores 0.
#[derive(Debug, Default, Clone, Copy)]
pub struct CosineSimilarity;

impl SimilarityMeasure for CosineSimilarity {
    fn score(&self, predicted: &FrequencyMatrix, target: &FrequencyMatrix) -> f64 {
        mean_over_rows(predicted, target, |p, t| {
            let dot: f64 = p.iter().zip(t).map(|(a, b)| a * b).sum();
            let norm = l2_norm(p) * l2_norm(t);
            if norm > 0.0 { dot / norm } else { 0.0 }
        })
    }

    fn name(&self) -> &str {
        "cosine"
    }
}

/// One minus the mean base-2 Jensen-Shannon divergence of corresponding rows.
#[derive(Debug, Default, Clone, Copy)]
pub struct JensenShannonSimilarity;

impl SimilarityMeasure for JensenShannonSimilarity {
    fn score(&self, predicted: &FrequencyMatrix, target: &FrequencyMatrix) -> f64 {
        mean_over_rows(predicted, target, |p, t| {
            let divergence: f64 = p
                .iter()
                .zip(t.iter())
                .map(|(&a, &b)| {
                    let m = 0.5 * (a + b);
                    0.5 * (kl_term(a, m) + kl_term(b, m))
                })
                .sum();
            1.0 - divergence.clamp(0.0, 1.0)
        })
    }

    fn name(&self) -> &str {
        "jensen-shannon"
    }
}

fn kl_term(p: f64, m: f64) -> f64 {
    if p > 0.0 && m > 0.0 {
        p * (p / m).log2()
    } else {
        0.0
    }
}

fn l2_norm(values: &[f64]) -> f64 {
    values.iter().map(|v| v * v).sum::<f64>().sqrt()
}

fn mean_over_rows<F>(predicted: &FrequencyMatrix, target: &FrequencyMatrix, row_score: F) -> f64
where
    F: Fn(&[f64], &[f64]) -> f64,
{
    let n_rows = predicted.nrows().min(target.nrows());
    if n_rows == 0 {
        return 0.0;
    }
    let total: f64 = (0..n_rows)
        .map(|i| {
            let p: Vec<f64> = predicted.row(i).iter().copied().collect();
            let t: Vec<f64> = target.row(i).iter().copied().collect();
            row_score(&p, &t)
        })
        .sum();
    total / n_rows as f64
}

pub fn measure_for(kind: SimilarityKind) -> Box<dyn SimilarityMeasure> {
    match kind {
        SimilarityKind::Cosine => Box::new(CosineSimilarity),
        SimilarityKind::JensenShannon => Box::new(JensenShannonSimilarity),
    }
}
