//! faceid-engine — face-identity clustering engine for photo uploads.
//!
//! Given a photo, the engine detects faces (two-tier detector fallback),
//! matches each embedding against the namespace's known identities, commits
//! every decision to the identity store one face at a time, and extracts a
//! thumbnail for each newly introduced identity. The per-photo result is a
//! [`pipeline::PhotoFaces`] report for the caller to persist against the
//! photo record.

pub mod config;
pub mod orchestrator;
pub mod pipeline;
pub mod thumbnail;

pub use config::EngineConfig;
pub use orchestrator::{DetectError, Detection, DetectionOrchestrator, FaceDetector};
pub use pipeline::{FacePipeline, PhotoFaces, PipelineError};
