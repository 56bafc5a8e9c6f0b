//! Detection orchestration: two-tier detector fallback and prominence
//! ranking.
//!
//! The detectors themselves are external capabilities behind the
//! [`FaceDetector`] trait; the orchestrator owns which one runs, in what
//! order, with what confidence floor. Model loading is explicit lifecycle
//! state: [`DetectionOrchestrator::initialize`] runs each detector's
//! one-time preparation, [`DetectionOrchestrator::is_ready`] queries it,
//! and detection on an uninitialized orchestrator is an error.

use async_trait::async_trait;
use faceid_core::{BoundingBox, Embedding};
use image::DynamicImage;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

use crate::config::EngineConfig;

#[derive(Error, Debug)]
pub enum DetectError {
    #[error("detector not initialized — call initialize() first")]
    NotInitialized,
    #[error("model load failed: {0}")]
    ModelLoad(String),
    #[error("inference failed: {0}")]
    Inference(String),
}

/// One detected face: its embedding and where it sits in the source image.
#[derive(Debug, Clone)]
pub struct Detection {
    pub embedding: Embedding,
    pub bounding_box: BoundingBox,
}

/// A face detection + embedding backend.
#[async_trait]
pub trait FaceDetector: Send + Sync {
    /// One-time model initialization. The orchestrator calls this exactly
    /// once, before any detection.
    async fn prepare(&self) -> Result<(), DetectError>;

    /// Detect faces and extract their embeddings.
    async fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>, DetectError>;
}

/// Two-tier detection strategy: a fast, lower-recall primary detector,
/// retried with a slower, higher-recall fallback when it finds nothing.
pub struct DetectionOrchestrator {
    primary: Box<dyn FaceDetector>,
    fallback: Box<dyn FaceDetector>,
    primary_confidence: f32,
    fallback_confidence: f32,
    ready: AtomicBool,
}

impl DetectionOrchestrator {
    pub fn new(
        primary: Box<dyn FaceDetector>,
        fallback: Box<dyn FaceDetector>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            primary,
            fallback,
            primary_confidence: config.primary_confidence,
            fallback_confidence: config.fallback_confidence,
            ready: AtomicBool::new(false),
        }
    }

    /// Run each detector's one-time preparation. Idempotent: later calls
    /// return immediately once the orchestrator is ready.
    pub async fn initialize(&self) -> Result<(), DetectError> {
        if self.is_ready() {
            return Ok(());
        }
        self.primary.prepare().await?;
        self.fallback.prepare().await?;
        self.ready.store(true, Ordering::Release);
        tracing::info!("detection orchestrator ready");
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Detect faces in a photo, largest bounding box first.
    ///
    /// An empty result is not an error — the caller marks the photo with
    /// the sentinel identity. A primary-tier *error* falls through to the
    /// fallback tier, since the fallback exists to recover recall; only
    /// both tiers failing surfaces an error.
    pub async fn detect_faces(&self, image: &DynamicImage) -> Result<Vec<Detection>, DetectError> {
        if !self.is_ready() {
            return Err(DetectError::NotInitialized);
        }

        let mut faces = match self.primary.detect(image).await {
            Ok(detections) => confident(detections, self.primary_confidence),
            Err(err) => {
                tracing::warn!(error = %err, "primary detector failed, trying fallback");
                Vec::new()
            }
        };

        if faces.is_empty() {
            tracing::debug!("primary detector found no faces, retrying with high-recall fallback");
            faces = confident(self.fallback.detect(image).await?, self.fallback_confidence);
        }

        faces.sort_by(|a, b| {
            b.bounding_box
                .area()
                .partial_cmp(&a.bounding_box.area())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        tracing::debug!(count = faces.len(), "faces detected");
        Ok(faces)
    }
}

fn confident(detections: Vec<Detection>, floor: f32) -> Vec<Detection> {
    detections
        .into_iter()
        .filter(|d| d.bounding_box.confidence >= floor)
        .collect()
}
