use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::evaluator::{Evaluator, Exercise, ExerciseScore};
use crate::pose::Sequence;
use crate::quality::{anonymize_source, QualityGate, QualityReport};

pub const WARNINGS_FILE: &str = "warnings.json";

/// One processed attempt: quality verdict plus evaluation
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingResult {
    /// Basename of the input, never a full path
    pub source: String,
    pub exercise: Exercise,
    pub score: u8,
    pub evaluation: ExerciseScore,
    pub quality: QualityReport,
    pub detected_frames: usize,
    pub processed_at: DateTime<Local>,
}

/// quality check → evaluate, with one gate for the whole run
pub struct Pipeline {
    gate: QualityGate,
    evaluators: HashMap<Exercise, Evaluator>,
}

impl Pipeline {
    /// Builds an evaluator for every exercise whose thresholds are configured.
    pub fn new(config: &Config) -> Self {
        let mut gate = QualityGate::new(config);
        gate.validate_config();

        let mut evaluators = HashMap::new();
        for exercise in Exercise::ALL {
            match Evaluator::from_config(exercise, config) {
                Ok(evaluator) => {
                    evaluators.insert(exercise, evaluator);
                }
                Err(e) => debug!(exercise = %exercise, error = %e, "exercise not configured"),
            }
        }

        Self { gate, evaluators }
    }

    pub fn gate(&self) -> &QualityGate {
        &self.gate
    }

    pub fn gate_mut(&mut self) -> &mut QualityGate {
        &mut self.gate
    }

    pub fn supports(&self, exercise: Exercise) -> bool {
        self.evaluators.contains_key(&exercise)
    }

    pub fn process(
        &mut self,
        sequence: &Sequence,
        exercise: Exercise,
        source: Option<&str>,
    ) -> Result<ProcessingResult> {
        let evaluator = self
            .evaluators
            .get(&exercise)
            .ok_or(Error::MissingThresholds(exercise.as_str()))?;

        let (_, quality) = self.gate.check_quality(sequence, source);
        let evaluation = evaluator.evaluate(sequence);

        info!(
            exercise = %exercise,
            score = evaluation.score,
            quality_ok = quality.is_quality_ok,
            "sequence processed"
        );

        Ok(ProcessingResult {
            source: anonymize_source(source),
            exercise,
            score: evaluation.score,
            detected_frames: quality.detected_frames,
            evaluation,
            quality,
            processed_at: Local::now(),
        })
    }

    /// Writes `<exercise>_<YYYYmmdd_HHMMSS>.json` and the gate's warning log
    /// into `dir`, creating it if needed. Returns the result file path.
    pub fn save_result<P: AsRef<Path>>(&self, result: &ProcessingResult, dir: P) -> Result<PathBuf> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| Error::WriteOutput(e, dir.to_path_buf()))?;

        let path = dir.join(result_file_name(result));
        let content = serde_json::to_string_pretty(result).map_err(Error::Serialize)?;
        fs::write(&path, content).map_err(|e| Error::WriteOutput(e, path.clone()))?;
        info!(path = %path.display(), "result saved");

        self.gate.save_warnings(dir.join(WARNINGS_FILE))?;
        Ok(path)
    }
}

pub fn result_file_name(result: &ProcessingResult) -> String {
    format!(
        "{}_{}.json",
        result.exercise,
        result.processed_at.format("%Y%m%d_%H%M%S")
    )
}

/// Console summary block
pub fn summary(result: &ProcessingResult) -> String {
    let rule = "=".repeat(60);
    let quality = if result.quality.is_quality_ok {
        "OK"
    } else {
        "low quality"
    };
    format!(
        "{rule}\nEvaluation summary\n{rule}\nExercise: {}\nScore: {}/3\n\nQuality check:\n  Detection rate: {:.1}%\n  Quality: {}\n\n{}\n{rule}\n",
        result.exercise,
        result.score,
        result.quality.detection_rate * 100.0,
        quality,
        result.evaluation.details,
    )
}
