//! Tracking-reliability gate.
//!
//! Judges whether a landmark sequence is trustworthy enough to score. The
//! verdict is informational: evaluation still runs on a failing sequence,
//! the gate only annotates trust and records anonymized warnings.

use chrono::{DateTime, Local};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::context::{seeded_rng, ScoringContext};
use crate::error::{Error, Result};
use crate::pose::Sequence;

/// A frame is low-visibility above this share of low-visibility landmarks
pub const LOW_VISIBILITY_LANDMARK_RATIO: f64 = 0.3;
/// Sequences fail at or above this share of low-visibility frames
pub const LOW_VISIBILITY_FRAME_RATIO: f64 = 0.2;

const UNKNOWN_SOURCE: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WarningLevel {
    Warning,
    Error,
}

/// Warning log entry. `details` never carries paths beyond a basename.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    pub timestamp: DateTime<Local>,
    pub level: WarningLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LowVisibilityLandmark {
    pub frame: usize,
    pub landmark_idx: usize,
    pub visibility: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    pub total_frames: usize,
    pub detected_frames: usize,
    /// detected / total, 0.0 for an empty sequence
    pub detection_rate: f64,
    pub low_visibility_frames: usize,
    /// low-visibility frames / total, 0.0 for an empty sequence
    pub low_visibility_ratio: f64,
    pub low_visibility_landmarks_count: usize,
    pub low_visibility_landmarks: Vec<LowVisibilityLandmark>,
    pub is_quality_ok: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WarningsSummary {
    pub total: usize,
    #[serde(rename = "ERROR")]
    pub error: usize,
    #[serde(rename = "WARNING")]
    pub warning: usize,
}

/// Data quality gate
///
/// Owns an append-only warning log scoped to this instance. Share one gate
/// across concurrent work only behind external synchronization.
pub struct QualityGate {
    config: Config,
    context: ScoringContext,
    rng: StdRng,
    warnings: Vec<Warning>,
}

impl QualityGate {
    /// Seeds the gate's generator once from `data_integrity.random_seed`.
    pub fn new(config: &Config) -> Self {
        let context = ScoringContext::from_config(config);
        Self {
            config: config.clone(),
            rng: seeded_rng(context.seed),
            context,
            warnings: Vec::new(),
        }
    }

    pub fn context(&self) -> &ScoringContext {
        &self.context
    }

    /// Generator seeded at construction, for reproducible sampling
    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn check_quality(
        &mut self,
        sequence: &Sequence,
        source: Option<&str>,
    ) -> (bool, QualityReport) {
        let confidence_min = self.context.confidence_min;
        let total_frames = sequence.len();
        let mut detected_frames = 0;
        let mut low_visibility_frames = 0;
        let mut low_visibility_landmarks = Vec::new();

        for frame in sequence.iter().filter(|f| f.is_detected()) {
            detected_frames += 1;

            let before = low_visibility_landmarks.len();
            low_visibility_landmarks.extend(
                frame
                    .landmarks
                    .iter()
                    .enumerate()
                    .filter(|(_, lm)| !lm.is_visible(confidence_min))
                    .map(|(idx, lm)| LowVisibilityLandmark {
                        frame: frame.frame,
                        landmark_idx: idx,
                        visibility: lm.visibility,
                    }),
            );
            let low = low_visibility_landmarks.len() - before;

            if low as f64 / frame.landmarks.len() as f64 > LOW_VISIBILITY_LANDMARK_RATIO {
                low_visibility_frames += 1;
            }
        }

        let (detection_rate, low_visibility_ratio) = if total_frames > 0 {
            (
                detected_frames as f64 / total_frames as f64,
                low_visibility_frames as f64 / total_frames as f64,
            )
        } else {
            (0.0, 0.0)
        };

        // counts, not `1 - rate <= tolerance / total`: the float form rejects exactly-at-tolerance runs (3 of 10)
        let skipped = total_frames - detected_frames;
        let is_quality_ok = total_frames > 0
            && skipped <= self.context.frame_skip_tolerance as usize
            && low_visibility_ratio < LOW_VISIBILITY_FRAME_RATIO;

        let report = QualityReport {
            total_frames,
            detected_frames,
            detection_rate,
            low_visibility_frames,
            low_visibility_ratio,
            low_visibility_landmarks_count: low_visibility_landmarks.len(),
            low_visibility_landmarks,
            is_quality_ok,
        };

        if is_quality_ok {
            info!(total_frames, detected_frames, low_visibility_frames, "landmark quality ok");
        } else {
            let video = anonymize_source(source);
            warn!(
                video = %video,
                detection_rate,
                low_visibility_ratio,
                "low quality landmark data"
            );
            self.add_warning(
                WarningLevel::Warning,
                "low quality landmark data",
                Some(json!({
                    "video": video,
                    "detection_rate": detection_rate,
                    "low_visibility_frames_ratio": low_visibility_ratio,
                })),
            );
        }

        (is_quality_ok, report)
    }

    /// Non-fatal range check of the active configuration.
    ///
    /// Errors are returned and also recorded as one ERROR warning.
    pub fn validate_config(&mut self) -> (bool, Vec<String>) {
        let errors = self.config.validate();
        if !errors.is_empty() {
            error!(errors = ?errors, "config validation failed");
            self.add_warning(
                WarningLevel::Error,
                "config validation failed",
                Some(json!({ "errors": &errors })),
            );
        }
        (errors.is_empty(), errors)
    }

    pub fn warnings_report(&self) -> serde_json::Value {
        json!({
            "generated_at": Local::now().to_rfc3339(),
            "total_warnings": self.warnings.len(),
            "warnings": self.warnings,
            "config_summary": {
                "confidence_min": self.context.confidence_min,
                "frame_skip_tolerance": self.context.frame_skip_tolerance,
                "random_seed": self.context.seed,
            },
        })
    }

    pub fn save_warnings<P: AsRef<Path>>(&self, path: P) -> Result<PathBuf> {
        let path = path.as_ref();
        let content =
            serde_json::to_string_pretty(&self.warnings_report()).map_err(Error::Serialize)?;
        fs::write(path, content).map_err(|e| Error::WriteOutput(e, path.to_path_buf()))?;
        info!(warnings = self.warnings.len(), "warnings saved");
        Ok(path.to_path_buf())
    }

    pub fn warnings_summary(&self) -> WarningsSummary {
        let count = |level| self.warnings.iter().filter(|w| w.level == level).count();
        WarningsSummary {
            total: self.warnings.len(),
            error: count(WarningLevel::Error),
            warning: count(WarningLevel::Warning),
        }
    }

    fn add_warning(
        &mut self,
        level: WarningLevel,
        message: &str,
        details: Option<serde_json::Value>,
    ) {
        self.warnings.push(Warning {
            timestamp: Local::now(),
            level,
            message: message.to_string(),
            details,
        });
    }
}

/// Keeps the file name only, never the directory
pub fn anonymize_source(source: Option<&str>) -> String {
    source
        .and_then(|s| Path::new(s).file_name())
        .and_then(|name| name.to_str())
        .unwrap_or(UNKNOWN_SOURCE)
        .to_string()
}
