//! faceid-core — face-identity clustering primitives.
//!
//! Pure decision logic for turning a photo's face embeddings into named
//! identities: Euclidean matching with sample-count-adaptive thresholds,
//! representative-embedding aggregation, and human-readable id allocation.
//! All I/O (identity store, detectors, thumbnails) lives in the sibling
//! crates.

pub mod aggregate;
pub mod allocator;
pub mod matcher;
pub mod types;

pub use matcher::{BestMatch, IdentityMatcher, MatchError, Thresholds};
pub use types::{
    BoundingBox, Embedding, Identity, MatchDecision, EMBEDDING_DIM, UNKNOWN_IDENTITY,
};
