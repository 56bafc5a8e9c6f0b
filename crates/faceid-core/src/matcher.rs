//! Identity matching with sample-count-adaptive thresholds.
//!
//! A probe embedding is compared against the representative embedding of
//! every identity in its namespace by Euclidean distance. The acceptance
//! threshold widens as the best candidate accumulates samples: a
//! single-sighting identity must be re-confirmed by a close match, while an
//! identity with a well-established representative embedding can absorb
//! more lighting and pose variation without over-merging distinct people.

use crate::aggregate;
use crate::types::{Embedding, Identity};
use thiserror::Error;

// Acceptance thresholds by best-candidate sample count.
const THRESHOLD_SINGLE_SAMPLE: f32 = 0.45;
const THRESHOLD_FEW_SAMPLES: f32 = 0.50;
const THRESHOLD_MANY_SAMPLES: f32 = 0.55;
const FEW_SAMPLES_MAX: usize = 3;

#[derive(Error, Debug)]
pub enum MatchError {
    #[error("embedding has {got} values, expected {expected}")]
    WrongDimension { got: usize, expected: usize },
    #[error("embedding contains non-finite values")]
    NonFinite,
}

/// Acceptance thresholds, keyed by how many samples the best-matching
/// identity has accumulated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Best candidate has exactly one sample.
    pub single_sample: f32,
    /// Best candidate has two or three samples.
    pub few_samples: f32,
    /// Best candidate has four or more samples.
    pub many_samples: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            single_sample: THRESHOLD_SINGLE_SAMPLE,
            few_samples: THRESHOLD_FEW_SAMPLES,
            many_samples: THRESHOLD_MANY_SAMPLES,
        }
    }
}

impl Thresholds {
    pub fn for_sample_count(&self, samples: usize) -> f32 {
        if samples <= 1 {
            self.single_sample
        } else if samples <= FEW_SAMPLES_MAX {
            self.few_samples
        } else {
            self.many_samples
        }
    }
}

/// The nearest identity to a probe embedding.
#[derive(Debug, Clone)]
pub struct BestMatch {
    pub identity_id: String,
    /// Euclidean distance to the identity's representative embedding.
    pub distance: f32,
    /// Number of samples the identity held when matched.
    pub sample_count: usize,
}

/// Compares probe embeddings against a namespace's identities.
pub struct IdentityMatcher {
    thresholds: Thresholds,
}

impl IdentityMatcher {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn with_defaults() -> Self {
        Self::new(Thresholds::default())
    }

    /// Find the identity the probe belongs to, if any.
    ///
    /// Returns `Ok(None)` when the identity set is empty or the nearest
    /// identity is farther than its adaptive threshold — either way the
    /// caller should allocate a new identity. A malformed probe (wrong
    /// length, non-finite values) is an error; the caller routes it to the
    /// fallback identity path.
    pub fn best_match(
        &self,
        probe: &Embedding,
        identities: &[Identity],
    ) -> Result<Option<BestMatch>, MatchError> {
        // Empty set short-circuits before any validation or distance work,
        // matching the first-face-in-namespace path.
        if identities.is_empty() {
            return Ok(None);
        }
        if probe.values.iter().any(|v| !v.is_finite()) {
            return Err(MatchError::NonFinite);
        }

        let mut best: Option<BestMatch> = None;
        for identity in identities {
            // Store rows always carry at least one sample; skip anything odd.
            let Some(rep) = aggregate::representative(&identity.samples) else {
                tracing::debug!(identity = %identity.identity_id, "identity has no samples, skipping");
                continue;
            };
            if rep.values.len() != probe.values.len() {
                return Err(MatchError::WrongDimension {
                    got: probe.values.len(),
                    expected: rep.values.len(),
                });
            }

            let distance = probe.euclidean_distance(&rep);
            let closer = best.as_ref().map_or(true, |b| distance < b.distance);
            if closer {
                best = Some(BestMatch {
                    identity_id: identity.identity_id.clone(),
                    distance,
                    sample_count: identity.samples.len(),
                });
            }
        }

        let Some(best) = best else {
            return Ok(None);
        };

        let threshold = self.thresholds.for_sample_count(best.sample_count);
        if best.distance < threshold {
            tracing::trace!(
                identity = %best.identity_id,
                distance = best.distance,
                threshold,
                samples = best.sample_count,
                "probe matched"
            );
            Ok(Some(best))
        } else {
            tracing::trace!(
                nearest = %best.identity_id,
                distance = best.distance,
                threshold,
                "nearest identity beyond threshold"
            );
            Ok(None)
        }
    }
}
