//! Representative-embedding aggregation.
//!
//! An identity is compared against new faces through a single representative
//! embedding: the element-wise mean of its full sample history. The mean is
//! recomputed from scratch on every call rather than kept as a running
//! average; per-namespace identity counts are small (tens per event), and a
//! persisted incremental mean would accumulate floating-point drift.

use crate::types::Embedding;

/// Compute an identity's representative embedding from its sample history.
///
/// A single sample is returned unchanged; several samples yield their
/// element-wise arithmetic mean. Returns `None` for an empty history.
pub fn representative(samples: &[Embedding]) -> Option<Embedding> {
    match samples {
        [] => None,
        [only] => Some(only.clone()),
        many => {
            let dim = many[0].values.len();
            let mut sum = vec![0.0f64; dim];
            for sample in many {
                for (acc, v) in sum.iter_mut().zip(sample.values.iter()) {
                    *acc += f64::from(*v);
                }
            }
            let count = many.len() as f64;
            Some(Embedding::new(
                sum.into_iter().map(|v| (v / count) as f32).collect(),
            ))
        }
    }
}
