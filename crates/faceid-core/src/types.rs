use serde::{Deserialize, Serialize};

/// Embedding length produced by the face embedder.
pub const EMBEDDING_DIM: usize = 128;

/// Sentinel identity a photo is tagged with when no face was detected.
/// Never written to the identity store.
pub const UNKNOWN_IDENTITY: &str = "unknown";

/// Bounding box for a detected face, in source-image pixel coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
}

impl BoundingBox {
    /// Pixel area, used to rank faces by prominence.
    pub fn area(&self) -> f32 {
        self.width * self.height
    }
}

/// Face embedding vector (128-dimensional); immutable once extracted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// Compute Euclidean distance between two embeddings.
    pub fn euclidean_distance(&self, other: &Embedding) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }

    /// An embedding is well-formed when it has the canonical length and
    /// every value is finite. Anything else is routed to the fallback
    /// identity path instead of the matcher.
    pub fn is_well_formed(&self) -> bool {
        self.values.len() == EMBEDDING_DIM && self.values.iter().all(|v| v.is_finite())
    }
}

/// An identity cluster as read from the identity store.
///
/// `samples` is append-only; insertion order is chronological. The engine
/// only reads identities and appends samples — deletion and merging are
/// owned elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub identity_id: String,
    pub samples: Vec<Embedding>,
    pub thumbnail_ref: Option<String>,
}

/// Outcome of matching one probe embedding within a namespace.
///
/// Ephemeral: only its effect (an appended sample, possibly a freshly
/// allocated identity) is persisted.
#[derive(Debug, Clone)]
pub struct MatchDecision {
    pub identity_id: String,
    /// Distance to the matched identity's representative embedding.
    /// `None` for new identities and fallback decisions.
    pub distance: Option<f32>,
    pub is_new: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedding(head: &[f32]) -> Embedding {
        let mut values = vec![0.0; EMBEDDING_DIM];
        values[..head.len()].copy_from_slice(head);
        Embedding::new(values)
    }

    #[test]
    fn test_euclidean_distance_identical() {
        let a = embedding(&[1.0, 2.0, 3.0]);
        assert!(a.euclidean_distance(&a).abs() < 1e-6);
    }

    #[test]
    fn test_euclidean_distance_known() {
        // 3-4-5 triangle
        let a = embedding(&[0.0, 0.0]);
        let b = embedding(&[3.0, 4.0]);
        assert!((a.euclidean_distance(&b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_well_formed() {
        assert!(embedding(&[1.0]).is_well_formed());
        assert!(!Embedding::new(vec![1.0, 2.0]).is_well_formed());
        assert!(!embedding(&[f32::NAN]).is_well_formed());
        assert!(!embedding(&[f32::INFINITY]).is_well_formed());
    }

    #[test]
    fn test_bounding_box_area() {
        let b = BoundingBox {
            x: 10.0,
            y: 20.0,
            width: 25.0,
            height: 16.0,
            confidence: 0.9,
        };
        assert!((b.area() - 400.0).abs() < 1e-6);
    }
}
