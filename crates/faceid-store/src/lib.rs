//! faceid-store — persistence seams for the face-identity engine.
//!
//! The engine talks to storage only through the [`IdentityStore`] and
//! [`ArtifactStore`] traits; every call is an async suspension point the
//! sequential commit loop awaits before moving to the next face. The
//! default backends are SQLite ([`sqlite::SqliteIdentityStore`]) and a
//! uuid-named blob directory ([`artifacts::FsArtifactStore`]).

pub mod artifacts;
pub mod sqlite;

use async_trait::async_trait;
use faceid_core::{BoundingBox, Embedding, Identity};
use thiserror::Error;

pub use artifacts::FsArtifactStore;
pub use sqlite::SqliteIdentityStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("identity not found: {0}")]
    IdentityNotFound(String),
    #[error("sqlite: {0}")]
    Sqlite(#[from] tokio_rusqlite::Error),
    #[error("encode: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("artifact io: {0}")]
    Io(#[from] std::io::Error),
}

/// Keyed datastore holding every identity in a namespace.
///
/// Identities are append-only from the engine's point of view: it lists
/// them, creates new ones, and appends samples. Writes must not be silently
/// dropped — a failed write is an error the commit loop handles per face.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// All identities currently stored in `namespace`, each with its full
    /// sample history in chronological order.
    async fn list_identities(&self, namespace: Option<&str>) -> Result<Vec<Identity>, StoreError>;

    /// Create a new identity seeded with its first sample.
    async fn create_identity(
        &self,
        identity_id: &str,
        embedding: &Embedding,
        bounding_box: &BoundingBox,
        namespace: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Append a sample to an existing identity. Fails with
    /// [`StoreError::IdentityNotFound`] rather than upserting — an append
    /// against a missing identity means the caller acted on a stale read.
    async fn append_sample(
        &self,
        identity_id: &str,
        embedding: &Embedding,
        bounding_box: &BoundingBox,
        namespace: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Record the thumbnail artifact reference for an identity.
    async fn set_thumbnail_ref(
        &self,
        identity_id: &str,
        namespace: Option<&str>,
        artifact_ref: &str,
    ) -> Result<(), StoreError>;
}

/// Blob sink for encoded thumbnail images. Returns a reference usable for
/// later retrieval.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn put(&self, bytes: Vec<u8>, extension: &str) -> Result<String, StoreError>;
}
