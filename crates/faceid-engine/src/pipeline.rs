//! The per-photo face pipeline: sequential commit loop, fallback identity
//! handling, and the thumbnail pass.
//!
//! Faces are processed strictly one at a time. Each face's full cycle —
//! re-read the namespace, decide, write the decision back — completes
//! before the next face begins, so every comparison sees every earlier
//! decision from the same photo. Two new faces in one photo can therefore
//! never both be allocated against the same stale snapshot of the store.
//! This is a correctness requirement, not a performance choice; the cost
//! is one store round trip per face.

use faceid_core::{allocator, BoundingBox, IdentityMatcher, MatchDecision, UNKNOWN_IDENTITY};
use faceid_store::{ArtifactStore, IdentityStore, StoreError};
use image::DynamicImage;
use serde::Serialize;
use thiserror::Error;

use crate::config::EngineConfig;
use crate::orchestrator::{DetectError, Detection, DetectionOrchestrator};
use crate::thumbnail::{self, ThumbnailError};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("detection: {0}")]
    Detect(#[from] DetectError),
    #[error("store: {0}")]
    Store(#[from] StoreError),
    #[error("thumbnail: {0}")]
    Thumbnail(#[from] ThumbnailError),
}

/// Per-photo result for the caller to persist against the photo record.
///
/// `face_ids` holds one entry per committed face, largest face first;
/// `main_face_id` is the identity of the largest-area face, or the
/// `"unknown"` sentinel when the photo has no detectable faces.
#[derive(Debug, Clone, Serialize)]
pub struct PhotoFaces {
    pub face_ids: Vec<String>,
    pub main_face_id: String,
    pub boxes: Vec<BoundingBox>,
}

/// Face-identity engine for one identity store + artifact store pair.
pub struct FacePipeline<S, A> {
    orchestrator: DetectionOrchestrator,
    store: S,
    artifacts: A,
    matcher: IdentityMatcher,
    thumbnail_padding: f32,
    thumbnail_jpeg_quality: u8,
}

impl<S: IdentityStore, A: ArtifactStore> FacePipeline<S, A> {
    pub fn new(
        orchestrator: DetectionOrchestrator,
        store: S,
        artifacts: A,
        config: &EngineConfig,
    ) -> Self {
        Self {
            orchestrator,
            store,
            artifacts,
            matcher: IdentityMatcher::new(config.thresholds),
            thumbnail_padding: config.thumbnail_padding,
            thumbnail_jpeg_quality: config.thumbnail_jpeg_quality,
        }
    }

    /// One-time detector preparation; delegate of
    /// [`DetectionOrchestrator::initialize`].
    pub async fn initialize(&self) -> Result<(), PipelineError> {
        self.orchestrator.initialize().await?;
        Ok(())
    }

    /// Process every face in a photo and report the resulting identities.
    ///
    /// A store failure while committing one face skips that face and
    /// continues with its siblings — the photo stays recoverable by a later
    /// reprocessing pass. Only a detection-layer failure (both tiers
    /// erroring, or an uninitialized orchestrator) fails the photo.
    pub async fn process_photo(
        &self,
        image: &DynamicImage,
        namespace: Option<&str>,
    ) -> Result<PhotoFaces, PipelineError> {
        let detections = self.orchestrator.detect_faces(image).await?;

        if detections.is_empty() {
            tracing::info!(
                namespace = namespace.unwrap_or(""),
                "no faces detected, marking photo unknown"
            );
            return Ok(PhotoFaces {
                face_ids: Vec::new(),
                main_face_id: UNKNOWN_IDENTITY.to_string(),
                boxes: Vec::new(),
            });
        }

        let mut committed: Vec<(MatchDecision, BoundingBox)> = Vec::with_capacity(detections.len());
        for (index, detection) in detections.iter().enumerate() {
            match self.commit_face(detection, namespace).await {
                Ok(decision) => {
                    tracing::debug!(
                        face = index,
                        identity = %decision.identity_id,
                        distance = decision.distance,
                        new = decision.is_new,
                        "face committed"
                    );
                    committed.push((decision, detection.bounding_box.clone()));
                }
                Err(err) => {
                    // Faces are independent once committed; this one is lost
                    // until the photo is reprocessed.
                    tracing::warn!(face = index, error = %err, "face skipped, store unavailable");
                }
            }
        }

        self.thumbnail_pass(image, &committed, namespace).await;

        let main_face_id = committed
            .iter()
            .max_by(|(_, a), (_, b)| {
                a.area()
                    .partial_cmp(&b.area())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(decision, _)| decision.identity_id.clone())
            .unwrap_or_else(|| UNKNOWN_IDENTITY.to_string());

        let (face_ids, boxes) = committed
            .into_iter()
            .map(|(decision, bbox)| (decision.identity_id, bbox))
            .unzip();

        Ok(PhotoFaces {
            face_ids,
            main_face_id,
            boxes,
        })
    }

    /// Decide one face and persist the decision before returning.
    ///
    /// The namespace is re-read from the store on every call so this face
    /// sees every identity committed by its predecessors in the same photo.
    async fn commit_face(
        &self,
        detection: &Detection,
        namespace: Option<&str>,
    ) -> Result<MatchDecision, StoreError> {
        let identities = self.store.list_identities(namespace).await?;

        let decision = match self.matcher.best_match(&detection.embedding, &identities) {
            Ok(Some(best)) => MatchDecision {
                identity_id: best.identity_id,
                distance: Some(best.distance),
                is_new: false,
            },
            Ok(None) => MatchDecision {
                identity_id: allocator::next_identity_id(
                    identities.iter().map(|i| i.identity_id.as_str()),
                    namespace,
                ),
                distance: None,
                is_new: true,
            },
            Err(err) => {
                // Observed legacy behavior, kept as-is: a probe the matcher
                // cannot process is filed under a hash-derived
                // pseudo-identity. Unrelated faces can alias onto the same
                // identifier.
                let identity_id =
                    allocator::fallback_identity_id(&detection.embedding.values, namespace);
                tracing::warn!(
                    error = %err,
                    identity = %identity_id,
                    "matching failed, filing face under hash-derived identity"
                );
                let is_new = !identities.iter().any(|i| i.identity_id == identity_id);
                MatchDecision {
                    identity_id,
                    distance: None,
                    is_new,
                }
            }
        };

        if decision.is_new {
            self.store
                .create_identity(
                    &decision.identity_id,
                    &detection.embedding,
                    &detection.bounding_box,
                    namespace,
                )
                .await?;
        } else {
            self.store
                .append_sample(
                    &decision.identity_id,
                    &detection.embedding,
                    &detection.bounding_box,
                    namespace,
                )
                .await?;
        }

        Ok(decision)
    }

    /// Extract thumbnails for this photo's identities that have none yet.
    ///
    /// Works from a fresh read of the store so only identities still
    /// missing a `thumbnail_ref` are rendered — re-matched identities are
    /// never re-thumbnailed. Thumbnail trouble is logged and never fails
    /// the photo.
    async fn thumbnail_pass(
        &self,
        image: &DynamicImage,
        committed: &[(MatchDecision, BoundingBox)],
        namespace: Option<&str>,
    ) {
        if committed.is_empty() {
            return;
        }

        let identities = match self.store.list_identities(namespace).await {
            Ok(identities) => identities,
            Err(err) => {
                tracing::warn!(error = %err, "thumbnail pass skipped, store unavailable");
                return;
            }
        };

        let mut seen = std::collections::HashSet::new();
        for (decision, bbox) in committed {
            // First occurrence wins: faces arrive largest-first, so the
            // thumbnail comes from the most prominent sighting.
            if !seen.insert(decision.identity_id.as_str()) {
                continue;
            }
            let needs_thumbnail = identities
                .iter()
                .find(|i| i.identity_id == decision.identity_id)
                .map_or(false, |i| i.thumbnail_ref.is_none());
            if !needs_thumbnail {
                continue;
            }

            if let Err(err) = self
                .attach_thumbnail(image, bbox, &decision.identity_id, namespace)
                .await
            {
                tracing::warn!(
                    identity = %decision.identity_id,
                    error = %err,
                    "thumbnail extraction failed"
                );
            }
        }
    }

    async fn attach_thumbnail(
        &self,
        image: &DynamicImage,
        bbox: &BoundingBox,
        identity_id: &str,
        namespace: Option<&str>,
    ) -> Result<(), PipelineError> {
        let bytes = thumbnail::render_face_thumbnail(
            image,
            bbox,
            self.thumbnail_padding,
            self.thumbnail_jpeg_quality,
        )?;
        let artifact_ref = self.artifacts.put(bytes, "jpg").await?;
        self.store
            .set_thumbnail_ref(identity_id, namespace, &artifact_ref)
            .await?;
        tracing::debug!(identity = identity_id, artifact = %artifact_ref, "thumbnail attached");
        Ok(())
    }
}
