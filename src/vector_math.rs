use ndarray::ArrayView1;

use crate::index::{IndexError, Metric};

/// Similarity of `candidate` to `query` under `metric`; higher is more similar.
///
/// Euclidean distance is folded into `1 / (1 + d)` so every metric ranks
/// descending.
pub fn similarity(metric: Metric, query: &[f32], candidate: &[f32]) -> Result<f32, IndexError> {
    check_lengths(query, candidate)?;

    let q = ArrayView1::from(query);
    let c = ArrayView1::from(candidate);

    let score = match metric {
        Metric::DotProduct => q.dot(&c),
        Metric::Cosine => {
            let denom = q.dot(&q).sqrt() * c.dot(&c).sqrt();
            if denom <= f32::EPSILON {
                0.0
            } else {
                q.dot(&c) / denom
            }
        }
        Metric::Euclidean => {
            let diff = &q - &c;
            1.0 / (1.0 + diff.dot(&diff).sqrt())
        }
    };

    Ok(score)
}

fn check_lengths(query: &[f32], candidate: &[f32]) -> Result<(), IndexError> {
    if query.len() != candidate.len() {
        return Err(IndexError::DimensionMismatch {
            expected: candidate.len(),
            actual: query.len(),
        });
    }
    Ok(())
}
