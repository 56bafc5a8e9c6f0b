use faceid_core::Thresholds;
use std::path::PathBuf;

/// Engine configuration, loaded from environment variables.
pub struct EngineConfig {
    /// Path to the SQLite identity database.
    pub db_path: PathBuf,
    /// Directory thumbnail artifacts are written to.
    pub artifact_dir: PathBuf,
    /// Adaptive matching thresholds (distance, by best-candidate sample count).
    pub thresholds: Thresholds,
    /// Minimum detection confidence accepted from the fast primary detector.
    pub primary_confidence: f32,
    /// Minimum detection confidence accepted from the high-recall fallback detector.
    pub fallback_confidence: f32,
    /// Thumbnail padding as a fraction of max(box width, box height).
    pub thumbnail_padding: f32,
    /// JPEG quality for thumbnail artifacts (1-100).
    pub thumbnail_jpeg_quality: u8,
}

impl EngineConfig {
    /// Load configuration from `FACEID_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("faceid");

        let db_path = std::env::var("FACEID_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("identities.db"));

        let artifact_dir = std::env::var("FACEID_ARTIFACT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("thumbnails"));

        let defaults = Thresholds::default();
        Self {
            db_path,
            artifact_dir,
            thresholds: Thresholds {
                single_sample: env_f32("FACEID_THRESHOLD_SINGLE_SAMPLE", defaults.single_sample),
                few_samples: env_f32("FACEID_THRESHOLD_FEW_SAMPLES", defaults.few_samples),
                many_samples: env_f32("FACEID_THRESHOLD_MANY_SAMPLES", defaults.many_samples),
            },
            primary_confidence: env_f32("FACEID_PRIMARY_CONFIDENCE", 0.5),
            fallback_confidence: env_f32("FACEID_FALLBACK_CONFIDENCE", 0.3),
            thumbnail_padding: env_f32("FACEID_THUMBNAIL_PADDING", 0.2),
            thumbnail_jpeg_quality: env_u8("FACEID_THUMBNAIL_JPEG_QUALITY", 85),
        }
    }
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u8(key: &str, default: u8) -> u8 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
