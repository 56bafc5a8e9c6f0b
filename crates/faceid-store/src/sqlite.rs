//! SQLite-backed identity store.
//!
//! Two tables: `identities` (one row per identity, keyed by id + namespace)
//! and `identity_samples` (append-only sample history, chronological by
//! rowid). Embeddings and bounding boxes are stored as JSON columns; the
//! unscoped namespace is stored as the empty string.

use async_trait::async_trait;
use chrono::Utc;
use faceid_core::{BoundingBox, Embedding, Identity};
use rusqlite::params;
use std::path::Path;

use crate::{IdentityStore, StoreError};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS identities (
    identity_id   TEXT NOT NULL,
    namespace     TEXT NOT NULL DEFAULT '',
    thumbnail_ref TEXT,
    created_at    TEXT NOT NULL,
    PRIMARY KEY (identity_id, namespace)
);
CREATE TABLE IF NOT EXISTS identity_samples (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    identity_id  TEXT NOT NULL,
    namespace    TEXT NOT NULL DEFAULT '',
    embedding    TEXT NOT NULL,
    bounding_box TEXT NOT NULL,
    created_at   TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_samples_identity
    ON identity_samples (identity_id, namespace);
";

#[derive(Clone)]
pub struct SqliteIdentityStore {
    conn: tokio_rusqlite::Connection,
}

impl SqliteIdentityStore {
    /// Open (or create) the database at `path` and run the schema
    /// migration.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let conn = tokio_rusqlite::Connection::open(path.clone()).await?;
        let store = Self { conn };
        store.migrate().await?;
        tracing::info!(path = %path.display(), "identity store opened");
        Ok(store)
    }

    /// In-memory database, used by tests and throwaway runs.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let conn = tokio_rusqlite::Connection::open_in_memory().await?;
        let store = Self { conn };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        self.conn
            .call(|conn| -> tokio_rusqlite::Result<()> {
                conn.execute_batch(SCHEMA)?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}

/// Namespace column value: the unscoped namespace is the empty string.
fn ns_key(namespace: Option<&str>) -> String {
    namespace.unwrap_or("").to_string()
}

#[async_trait]
impl IdentityStore for SqliteIdentityStore {
    async fn list_identities(&self, namespace: Option<&str>) -> Result<Vec<Identity>, StoreError> {
        let ns = ns_key(namespace);
        type Row = (String, Option<String>, Vec<String>);
        let rows = self
            .conn
            .call(move |conn| -> tokio_rusqlite::Result<Vec<Row>> {
                let idents = {
                    let mut stmt = conn.prepare(
                        "SELECT identity_id, thumbnail_ref FROM identities
                         WHERE namespace = ?1 ORDER BY created_at, identity_id",
                    )?;
                    let idents = stmt
                        .query_map([&ns], |row| {
                            Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
                        })?
                        .collect::<Result<Vec<_>, _>>()?;
                    idents
                };

                let mut stmt = conn.prepare(
                    "SELECT embedding FROM identity_samples
                     WHERE identity_id = ?1 AND namespace = ?2 ORDER BY id",
                )?;
                let mut out = Vec::with_capacity(idents.len());
                for (identity_id, thumbnail_ref) in idents {
                    let samples = stmt
                        .query_map(params![identity_id, ns], |row| row.get::<_, String>(0))?
                        .collect::<Result<Vec<_>, _>>()?;
                    out.push((identity_id, thumbnail_ref, samples));
                }
                Ok(out)
            })
            .await?;

        let mut identities = Vec::with_capacity(rows.len());
        for (identity_id, thumbnail_ref, samples) in rows {
            let samples = samples
                .iter()
                .map(|json| serde_json::from_str::<Vec<f32>>(json).map(Embedding::new))
                .collect::<Result<Vec<_>, _>>()?;
            identities.push(Identity {
                identity_id,
                samples,
                thumbnail_ref,
            });
        }
        Ok(identities)
    }

    async fn create_identity(
        &self,
        identity_id: &str,
        embedding: &Embedding,
        bounding_box: &BoundingBox,
        namespace: Option<&str>,
    ) -> Result<(), StoreError> {
        let ns = ns_key(namespace);
        let id = identity_id.to_string();
        let embedding_json = serde_json::to_string(&embedding.values)?;
        let box_json = serde_json::to_string(bounding_box)?;
        let created_at = Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> tokio_rusqlite::Result<()> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT INTO identities (identity_id, namespace, thumbnail_ref, created_at)
                     VALUES (?1, ?2, NULL, ?3)",
                    params![id, ns, created_at],
                )?;
                tx.execute(
                    "INSERT INTO identity_samples
                         (identity_id, namespace, embedding, bounding_box, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![id, ns, embedding_json, box_json, created_at],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await?;

        tracing::debug!(identity = identity_id, namespace = %ns_key(namespace), "identity created");
        Ok(())
    }

    async fn append_sample(
        &self,
        identity_id: &str,
        embedding: &Embedding,
        bounding_box: &BoundingBox,
        namespace: Option<&str>,
    ) -> Result<(), StoreError> {
        let ns = ns_key(namespace);
        let id = identity_id.to_string();
        let embedding_json = serde_json::to_string(&embedding.values)?;
        let box_json = serde_json::to_string(bounding_box)?;
        let created_at = Utc::now().to_rfc3339();

        let appended = self
            .conn
            .call(move |conn| -> tokio_rusqlite::Result<bool> {
                let known: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM identities WHERE identity_id = ?1 AND namespace = ?2",
                    params![id, ns],
                    |row| row.get(0),
                )?;
                if known == 0 {
                    return Ok(false);
                }
                conn.execute(
                    "INSERT INTO identity_samples
                         (identity_id, namespace, embedding, bounding_box, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![id, ns, embedding_json, box_json, created_at],
                )?;
                Ok(true)
            })
            .await?;

        if !appended {
            return Err(StoreError::IdentityNotFound(identity_id.to_string()));
        }
        tracing::debug!(identity = identity_id, namespace = %ns_key(namespace), "sample appended");
        Ok(())
    }

    async fn set_thumbnail_ref(
        &self,
        identity_id: &str,
        namespace: Option<&str>,
        artifact_ref: &str,
    ) -> Result<(), StoreError> {
        let ns = ns_key(namespace);
        let id = identity_id.to_string();
        let artifact = artifact_ref.to_string();

        let changed = self
            .conn
            .call(move |conn| -> tokio_rusqlite::Result<usize> {
                Ok(conn.execute(
                    "UPDATE identities SET thumbnail_ref = ?1
                     WHERE identity_id = ?2 AND namespace = ?3",
                    params![artifact, id, ns],
                )?)
            })
            .await?;

        if changed == 0 {
            return Err(StoreError::IdentityNotFound(identity_id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faceid_core::EMBEDDING_DIM;

    fn embedding(seed: f32) -> Embedding {
        Embedding::new((0..EMBEDDING_DIM).map(|i| seed + i as f32 * 0.01).collect())
    }

    fn bbox() -> BoundingBox {
        BoundingBox {
            x: 10.0,
            y: 20.0,
            width: 64.0,
            height: 80.0,
            confidence: 0.93,
        }
    }

    #[tokio::test]
    async fn test_create_and_list_roundtrip() {
        let store = SqliteIdentityStore::open_in_memory().await.unwrap();
        let e = embedding(0.5);
        store
            .create_identity("person_1", &e, &bbox(), None)
            .await
            .unwrap();

        let identities = store.list_identities(None).await.unwrap();
        assert_eq!(identities.len(), 1);
        assert_eq!(identities[0].identity_id, "person_1");
        assert_eq!(identities[0].samples, vec![e]);
        assert!(identities[0].thumbnail_ref.is_none());
    }

    #[tokio::test]
    async fn test_append_preserves_order() {
        let store = SqliteIdentityStore::open_in_memory().await.unwrap();
        let (e1, e2, e3) = (embedding(0.1), embedding(0.2), embedding(0.3));
        store
            .create_identity("person_1", &e1, &bbox(), None)
            .await
            .unwrap();
        store
            .append_sample("person_1", &e2, &bbox(), None)
            .await
            .unwrap();
        store
            .append_sample("person_1", &e3, &bbox(), None)
            .await
            .unwrap();

        let identities = store.list_identities(None).await.unwrap();
        assert_eq!(identities[0].samples, vec![e1, e2, e3]);
    }

    #[tokio::test]
    async fn test_append_to_missing_identity_fails() {
        let store = SqliteIdentityStore::open_in_memory().await.unwrap();
        let err = store
            .append_sample("person_9", &embedding(0.1), &bbox(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::IdentityNotFound(id) if id == "person_9"));
    }

    #[tokio::test]
    async fn test_namespace_isolation() {
        let store = SqliteIdentityStore::open_in_memory().await.unwrap();
        let e = embedding(0.5);
        store
            .create_identity("a_person_1", &e, &bbox(), Some("a"))
            .await
            .unwrap();
        store
            .create_identity("b_person_1", &e, &bbox(), Some("b"))
            .await
            .unwrap();

        let in_a = store.list_identities(Some("a")).await.unwrap();
        assert_eq!(in_a.len(), 1);
        assert_eq!(in_a[0].identity_id, "a_person_1");

        let unscoped = store.list_identities(None).await.unwrap();
        assert!(unscoped.is_empty());
    }

    #[tokio::test]
    async fn test_same_id_in_two_namespaces() {
        let store = SqliteIdentityStore::open_in_memory().await.unwrap();
        let e = embedding(0.5);
        store
            .create_identity("person_1", &e, &bbox(), Some("a"))
            .await
            .unwrap();
        // Same identifier is legal in a different namespace.
        store
            .create_identity("person_1", &e, &bbox(), Some("b"))
            .await
            .unwrap();
        assert_eq!(store.list_identities(Some("a")).await.unwrap().len(), 1);
        assert_eq!(store.list_identities(Some("b")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_thumbnail_ref() {
        let store = SqliteIdentityStore::open_in_memory().await.unwrap();
        store
            .create_identity("person_1", &embedding(0.5), &bbox(), None)
            .await
            .unwrap();
        store
            .set_thumbnail_ref("person_1", None, "thumb.jpg")
            .await
            .unwrap();

        let identities = store.list_identities(None).await.unwrap();
        assert_eq!(identities[0].thumbnail_ref.as_deref(), Some("thumb.jpg"));

        let err = store
            .set_thumbnail_ref("person_9", None, "thumb.jpg")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::IdentityNotFound(_)));
    }
}
