//! Exercise evaluation.
//!
//! Every exercise is a list of [`MetricSpec`]s run by one engine. The
//! exercise score is the minimum of its metric scores: a single failing
//! criterion caps the whole exercise.

pub mod exercise;
pub mod metric;

pub use exercise::Exercise;
pub use metric::{
    Aggregate, Combine, Direction, Ladder, MetricResult, MetricSpec, Probe, Sampler, Unit,
};

use serde::Serialize;
use tracing::info;

use crate::config::{Config, Thresholds};
use crate::error::Result;
use crate::normalizer::{normalize_sequence, ReferenceValues};
use crate::pose::Sequence;

pub const NO_POSE_DETECTED: &str = "no pose detected";

/// Evaluation result for one exercise
#[derive(Debug, Clone, Serialize)]
pub struct ExerciseScore {
    pub exercise: Exercise,
    /// 0-3, min of `metrics[*].score`
    pub score: u8,
    pub metrics: Vec<MetricResult>,
    /// Sequence-level reference values the ratio metrics were divided by
    pub references: ReferenceValues,
    pub details: String,
}

impl ExerciseScore {
    pub fn metric(&self, key: &str) -> Option<&MetricResult> {
        self.metrics.iter().find(|m| m.key == key)
    }
}

/// Qualitative label for an exercise score
pub fn level_label(score: u8) -> &'static str {
    match score {
        3 => "excellent",
        2 => "good",
        1 => "needs improvement",
        _ => "needs training",
    }
}

/// Scores one exercise. Holds an immutable threshold snapshot.
#[derive(Debug, Clone)]
pub struct Evaluator {
    exercise: Exercise,
    specs: Vec<MetricSpec>,
}

impl Evaluator {
    pub fn new(exercise: Exercise, thresholds: &Thresholds) -> Result<Self> {
        Ok(Self {
            exercise,
            specs: exercise.metric_specs(thresholds)?,
        })
    }

    pub fn from_config(exercise: Exercise, config: &Config) -> Result<Self> {
        Self::new(exercise, &config.thresholds)
    }

    pub fn exercise(&self) -> Exercise {
        self.exercise
    }

    pub fn specs(&self) -> &[MetricSpec] {
        &self.specs
    }

    pub fn evaluate(&self, sequence: &Sequence) -> ExerciseScore {
        let (references, _) = normalize_sequence(sequence);

        if sequence.is_empty() {
            return ExerciseScore {
                exercise: self.exercise,
                score: 0,
                metrics: self.specs.iter().map(|s| MetricResult::empty(s.key)).collect(),
                references,
                details: NO_POSE_DETECTED.to_string(),
            };
        }

        let metrics: Vec<MetricResult> = self
            .specs
            .iter()
            .map(|spec| spec.evaluate(sequence, &references))
            .collect();
        let score = metrics.iter().map(|m| m.score).min().unwrap_or(0);
        let details = self.details(score, &metrics);

        info!(
            exercise = %self.exercise,
            score,
            frames = sequence.len(),
            "exercise evaluated"
        );

        ExerciseScore {
            exercise: self.exercise,
            score,
            metrics,
            references,
            details,
        }
    }

    fn details(&self, score: u8, metrics: &[MetricResult]) -> String {
        let mut lines = vec![format!("Overall: {}", level_label(score))];
        lines.extend(
            self.specs
                .iter()
                .zip(metrics)
                .map(|(spec, result)| spec.describe(result)),
        );
        lines.join("\n")
    }
}
