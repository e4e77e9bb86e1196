//! Declarative metric specifications and the scoring engine that runs them.
//!
//! A metric samples one value per eligible frame, reduces the samples to a
//! representative statistic, optionally divides it by a body reference and
//! places the result on a four-tier ladder.

use serde::Serialize;
use tracing::debug;

use crate::normalizer::{ratio, Reference, ReferenceValues};
use crate::pose::{joint_angle, Frame, Landmark, LandmarkIndex, Sequence};

/// Per-frame measurement primitive
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sampler {
    /// `|a.y - b.y|`
    VerticalGap(LandmarkIndex, LandmarkIndex),
    /// `|a.x - b.x|`
    HorizontalGap(LandmarkIndex, LandmarkIndex),
    /// `(a.y + b.y) / 2`
    MidpointY(LandmarkIndex, LandmarkIndex),
    /// Angle at the middle landmark, degrees
    JointAngle(LandmarkIndex, LandmarkIndex, LandmarkIndex),
}

impl Sampler {
    fn max_index(&self) -> usize {
        match *self {
            Sampler::VerticalGap(a, b) | Sampler::HorizontalGap(a, b) | Sampler::MidpointY(a, b) => {
                a.index().max(b.index())
            }
            Sampler::JointAngle(a, b, c) => a.index().max(b.index()).max(c.index()),
        }
    }

    pub fn sample(&self, frame: &Frame) -> Option<f64> {
        let value = match *self {
            Sampler::VerticalGap(a, b) => {
                let (a, b) = pair(frame, a, b)?;
                (a.y - b.y).abs()
            }
            Sampler::HorizontalGap(a, b) => {
                let (a, b) = pair(frame, a, b)?;
                (a.x - b.x).abs()
            }
            Sampler::MidpointY(a, b) => {
                let (a, b) = pair(frame, a, b)?;
                (a.y + b.y) / 2.0
            }
            Sampler::JointAngle(a, b, c) => {
                joint_angle(frame.get(a)?, frame.get(b)?, frame.get(c)?)?
            }
        };
        if value.is_nan() {
            None
        } else {
            Some(value)
        }
    }
}

fn pair(frame: &Frame, a: LandmarkIndex, b: LandmarkIndex) -> Option<(&Landmark, &Landmark)> {
    Some((frame.get(a)?, frame.get(b)?))
}

/// How a bilateral probe merges its left and right samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combine {
    Min,
    Max,
    Mean,
    AbsDifference,
}

impl Combine {
    fn apply(self, left: f64, right: f64) -> f64 {
        match self {
            Combine::Min => left.min(right),
            Combine::Max => left.max(right),
            Combine::Mean => (left + right) / 2.0,
            Combine::AbsDifference => (left - right).abs(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Probe {
    Single(Sampler),
    /// Both sides must be measurable for the frame to contribute.
    Bilateral {
        left: Sampler,
        right: Sampler,
        combine: Combine,
    },
}

impl Probe {
    pub fn bilateral(left: Sampler, right: Sampler, combine: Combine) -> Self {
        Probe::Bilateral {
            left,
            right,
            combine,
        }
    }

    fn max_index(&self) -> usize {
        match self {
            Probe::Single(s) => s.max_index(),
            Probe::Bilateral { left, right, .. } => left.max_index().max(right.max_index()),
        }
    }

    pub fn sample(&self, frame: &Frame) -> Option<f64> {
        match self {
            Probe::Single(s) => s.sample(frame),
            Probe::Bilateral {
                left,
                right,
                combine,
            } => Some(combine.apply(left.sample(frame)?, right.sample(frame)?)),
        }
    }
}

/// Reduction of the per-frame samples to one representative value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregate {
    Min,
    Max,
    Mean,
    /// max - min
    Range,
}

impl Aggregate {
    fn select(self, stats: &Stats) -> f64 {
        match self {
            Aggregate::Min => stats.min,
            Aggregate::Max => stats.max,
            Aggregate::Mean => stats.mean,
            Aggregate::Range => stats.max - stats.min,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Aggregate::Min => "min",
            Aggregate::Max => "max",
            Aggregate::Mean => "mean",
            Aggregate::Range => "range",
        }
    }
}

struct Stats {
    mean: f64,
    min: f64,
    max: f64,
    std_dev: f64,
}

impl Stats {
    fn of(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let variance = samples.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Some(Self {
            mean,
            min,
            max,
            std_dev: variance.sqrt(),
        })
    }
}

/// Comparison applied at every ladder tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// value >= tier
    AtLeast,
    /// value > tier
    Above,
    /// value <= tier
    AtMost,
    /// value < tier
    Below,
}

impl Direction {
    fn passes(self, value: f64, tier: f64) -> bool {
        match self {
            Direction::AtLeast => value >= tier,
            Direction::Above => value > tier,
            Direction::AtMost => value <= tier,
            Direction::Below => value < tier,
        }
    }
}

/// Four-tier score ladder (3/2/1/0)
///
/// `tiers[0]` is the cut-off for 3 points, `tiers[1]` for 2, `tiers[2]` for 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ladder {
    pub direction: Direction,
    pub tiers: [f64; 3],
}

impl Ladder {
    pub fn explicit(direction: Direction, tiers: [f64; 3]) -> Self {
        Self { direction, tiers }
    }

    /// Tiers at `target`, `target * f1`, `target * f2`
    pub fn scaled(direction: Direction, target: f64, factors: (f64, f64)) -> Self {
        Self::explicit(direction, [target, target * factors.0, target * factors.1])
    }

    /// Tiers at `target`, `target + d1`, `target + d2`
    pub fn offset(direction: Direction, target: f64, deltas: (f64, f64)) -> Self {
        Self::explicit(direction, [target, target + deltas.0, target + deltas.1])
    }

    /// NaN never passes a tier and scores 0.
    pub fn score(&self, value: f64) -> u8 {
        if value.is_nan() {
            return 0;
        }
        self.tiers
            .iter()
            .position(|&tier| self.direction.passes(value, tier))
            .map_or(0, |tier| 3 - tier as u8)
    }
}

/// Display unit of a metric's measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Degrees,
    /// Normalized image coordinates
    Image,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub probe: Probe,
    pub aggregate: Aggregate,
    pub reference: Option<Reference>,
    pub ladder: Ladder,
    pub unit: Unit,
    /// Highest landmark a frame must contain to be analyzed.
    /// Defaults to the highest landmark the probe reads.
    pub requires: Option<LandmarkIndex>,
}

impl MetricSpec {
    pub fn new(
        key: &'static str,
        label: &'static str,
        probe: Probe,
        aggregate: Aggregate,
        ladder: Ladder,
        unit: Unit,
    ) -> Self {
        Self {
            key,
            label,
            probe,
            aggregate,
            reference: None,
            ladder,
            unit,
            requires: None,
        }
    }

    /// Score the aggregated value as a ratio of `reference`
    pub fn normalized_by(mut self, reference: Reference) -> Self {
        self.reference = Some(reference);
        self
    }

    pub fn requires(mut self, index: LandmarkIndex) -> Self {
        self.requires = Some(index);
        self
    }

    fn is_eligible(&self, frame: &Frame) -> bool {
        let highest = self.requires.map_or(self.probe.max_index(), |i| i.index());
        frame.landmarks.len() > highest
    }

    pub fn evaluate(&self, sequence: &Sequence, references: &ReferenceValues) -> MetricResult {
        let samples: Vec<f64> = sequence
            .iter()
            .filter(|frame| self.is_eligible(frame))
            .filter_map(|frame| self.probe.sample(frame))
            .collect();

        let Some(stats) = Stats::of(&samples) else {
            debug!(metric = self.key, "no analyzable frames");
            return MetricResult::empty(self.key);
        };
        let raw = self.aggregate.select(&stats);

        let measurement = match self.reference {
            Some(reference) => ratio(Some(raw), references.get(reference)),
            None => Some(raw),
        };
        // a missing reference forces 0
        let score = measurement.map_or(0, |m| self.ladder.score(m));

        debug!(
            metric = self.key,
            score,
            raw,
            measurement = ?measurement,
            frames = samples.len(),
            "metric evaluated"
        );

        MetricResult {
            key: self.key,
            score,
            measurement,
            raw: Some(raw),
            mean: Some(stats.mean),
            min: Some(stats.min),
            max: Some(stats.max),
            std_dev: Some(stats.std_dev),
            frames_analyzed: samples.len(),
        }
    }

    /// `"<label> score: s/3 (<measurement>)"`, or `(no data)` when null
    pub fn describe(&self, result: &MetricResult) -> String {
        let measurement = match (result.measurement, self.reference) {
            (Some(value), Some(reference)) => format!("{} ratio: {:.2}", reference.label(), value),
            (Some(value), None) => match self.unit {
                Unit::Degrees => format!("{}: {:.1}°", self.aggregate.as_str(), value),
                Unit::Image => format!("{}: {:.3}", self.aggregate.as_str(), value),
            },
            (None, _) => "no data".to_string(),
        };
        format!("{} score: {}/3 ({})", self.label, result.score, measurement)
    }
}

/// Outcome of one metric. Null fields mean "could not be determined".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricResult {
    pub key: &'static str,
    pub score: u8,
    /// The value placed on the ladder: the ratio for normalized metrics,
    /// otherwise the raw representative value
    pub measurement: Option<f64>,
    /// Representative value before normalization
    pub raw: Option<f64>,
    pub mean: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub std_dev: Option<f64>,
    pub frames_analyzed: usize,
}

impl MetricResult {
    pub fn empty(key: &'static str) -> Self {
        Self {
            key,
            score: 0,
            measurement: None,
            raw: None,
            mean: None,
            min: None,
            max: None,
            std_dev: None,
            frames_analyzed: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::normalize_sequence;
    use assert_approx_eq::assert_approx_eq;
    use LandmarkIndex::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn frame_with(points: &[(LandmarkIndex, (f64, f64))]) -> Frame {
        let mut landmarks = vec![Landmark::new(0.5, 0.5, 0.0, 1.0); LandmarkIndex::COUNT];
        for &(idx, (x, y)) in points {
            landmarks[idx.index()] = Landmark::new(x, y, 0.0, 1.0);
        }
        Frame::new(0, 0.0, landmarks)
    }

    fn tilt_spec() -> MetricSpec {
        MetricSpec::new(
            "pelvic_tilt",
            "Pelvic tilt",
            Probe::Single(Sampler::VerticalGap(LeftHip, RightHip)),
            Aggregate::Mean,
            Ladder::explicit(Direction::Below, [0.02, 0.05, 0.10]),
            Unit::Image,
        )
    }

    #[test]
    fn test_ladder_at_least_scaled() {
        let ladder = Ladder::scaled(Direction::AtLeast, 1.0, (0.8, 0.6));
        assert_eq!(ladder.score(1.0), 3);
        assert_eq!(ladder.score(0.85), 2);
        assert_eq!(ladder.score(0.8), 2);
        assert_eq!(ladder.score(0.7), 1);
        assert_eq!(ladder.score(0.59), 0);
    }

    #[test]
    fn test_ladder_at_most_offset() {
        let ladder = Ladder::offset(Direction::AtMost, 90.0, (10.0, 20.0));
        assert_eq!(ladder.score(85.0), 3);
        assert_eq!(ladder.score(90.0), 3);
        assert_eq!(ladder.score(100.0), 2);
        assert_eq!(ladder.score(105.0), 1);
        assert_eq!(ladder.score(111.0), 0);
    }

    #[test]
    fn test_ladder_strict_directions() {
        let above = Ladder::scaled(Direction::Above, 20.0, (0.75, 0.5));
        assert_eq!(above.score(20.0), 2);
        assert_eq!(above.score(20.5), 3);
        assert_eq!(above.score(10.0), 0);

        let below = Ladder::explicit(Direction::Below, [0.02, 0.05, 0.10]);
        assert_eq!(below.score(0.02), 2);
        assert_eq!(below.score(0.001), 3);
        assert_eq!(below.score(0.10), 0);
    }

    #[test]
    fn test_ladder_nan_scores_zero() {
        let ladder = Ladder::offset(Direction::AtMost, 90.0, (10.0, 20.0));
        assert_eq!(ladder.score(f64::NAN), 0);
    }

    #[test]
    fn test_aggregate() {
        let stats = Stats::of(&[3.0, 1.0, 2.0]).unwrap();
        assert_eq!(Aggregate::Min.select(&stats), 1.0);
        assert_eq!(Aggregate::Max.select(&stats), 3.0);
        assert_eq!(Aggregate::Mean.select(&stats), 2.0);
        assert_eq!(Aggregate::Range.select(&stats), 2.0);
        assert!(Stats::of(&[]).is_none());
    }

    #[test]
    fn test_raw_matches_reported_stats() {
        let spec = |aggregate| {
            MetricSpec::new(
                "hip_travel",
                "Hip travel",
                Probe::Single(Sampler::MidpointY(LeftHip, RightHip)),
                aggregate,
                Ladder::scaled(Direction::AtLeast, 0.1, (0.75, 0.5)),
                Unit::Image,
            )
        };
        let sequence = Sequence::new(
            [0.5, 0.35, 0.45]
                .iter()
                .map(|&y| frame_with(&[(LeftHip, (0.45, y)), (RightHip, (0.55, y))]))
                .collect(),
        );
        let (refs, _) = normalize_sequence(&sequence);

        let range = spec(Aggregate::Range).evaluate(&sequence, &refs);
        assert_approx_eq!(range.raw.unwrap(), range.max.unwrap() - range.min.unwrap());
        assert_approx_eq!(range.raw.unwrap(), 0.15);
        assert_eq!(range.score, 3);

        let mean = spec(Aggregate::Mean).evaluate(&sequence, &refs);
        assert_eq!(mean.raw, mean.mean);
        assert_eq!(mean.min, range.min);
        assert_eq!(mean.max, range.max);
        assert_eq!(mean.std_dev, range.std_dev);
    }

    #[test]
    fn test_bilateral_requires_both_sides() {
        let probe = Probe::bilateral(
            Sampler::JointAngle(LeftHip, LeftKnee, LeftAnkle),
            Sampler::JointAngle(RightHip, RightKnee, RightAnkle),
            Combine::Min,
        );
        let mut frame = frame_with(&[
            (LeftHip, (0.4, 0.3)),
            (LeftKnee, (0.4, 0.5)),
            (LeftAnkle, (0.6, 0.5)),
            (RightHip, (0.6, 0.3)),
            (RightKnee, (0.6, 0.5)),
            (RightAnkle, (0.6, 0.7)),
        ]);
        assert!(approx_eq(probe.sample(&frame).unwrap(), 90.0));

        frame.landmarks[RightKnee.index()].x = f64::NAN;
        assert_eq!(probe.sample(&frame), None);
    }

    #[test]
    fn test_sampler_nan_coordinate_is_skipped() {
        let frame = frame_with(&[(LeftHip, (0.4, f64::NAN))]);
        assert_eq!(Sampler::VerticalGap(LeftHip, RightHip).sample(&frame), None);
        assert_eq!(Sampler::MidpointY(LeftHip, RightHip).sample(&frame), None);
        let gap = Sampler::HorizontalGap(LeftHip, RightHip).sample(&frame).unwrap();
        assert!(approx_eq(gap, 0.1));
    }

    #[test]
    fn test_pelvic_tilt_scenario() {
        let frames: Vec<Frame> = (0..10)
            .map(|_| frame_with(&[(LeftHip, (0.45, 0.5)), (RightHip, (0.55, 0.501))]))
            .collect();
        let sequence = Sequence::new(frames);
        let (refs, _) = normalize_sequence(&sequence);
        let result = tilt_spec().evaluate(&sequence, &refs);
        assert_eq!(result.score, 3);
        assert_eq!(result.frames_analyzed, 10);
        assert_approx_eq!(result.measurement.unwrap(), 0.001);
        assert_approx_eq!(result.std_dev.unwrap(), 0.0);
    }

    #[test]
    fn test_short_frames_not_eligible() {
        let short = Frame::new(0, 0.0, vec![Landmark::new(0.5, 0.5, 0.0, 1.0); 24]);
        let sequence = Sequence::new(vec![short]);
        let (refs, _) = normalize_sequence(&sequence);
        assert_eq!(tilt_spec().evaluate(&sequence, &refs), MetricResult::empty("pelvic_tilt"));

        let requires_ankles = tilt_spec().requires(RightAnkle);
        let hips_only = Frame::new(0, 0.0, vec![Landmark::new(0.5, 0.5, 0.0, 1.0); 25]);
        let sequence = Sequence::new(vec![hips_only]);
        assert_eq!(requires_ankles.evaluate(&sequence, &refs).frames_analyzed, 0);
        assert_eq!(tilt_spec().evaluate(&sequence, &refs).frames_analyzed, 1);
    }

    #[test]
    fn test_missing_reference_forces_zero() {
        let spec = MetricSpec::new(
            "step_width",
            "Step width",
            Probe::Single(Sampler::HorizontalGap(LeftAnkle, RightAnkle)),
            Aggregate::Max,
            Ladder::scaled(Direction::AtLeast, 0.1, (0.8, 0.6)),
            Unit::Image,
        )
        .normalized_by(Reference::BaseWidth);

        // shoulders and hips collapse onto one point: zero-width references
        let frame = frame_with(&[(LeftAnkle, (0.3, 0.9)), (RightAnkle, (0.7, 0.9))]);
        let sequence = Sequence::new(vec![frame]);
        let (refs, _) = normalize_sequence(&sequence);
        let result = spec.evaluate(&sequence, &refs);
        assert_eq!(result.score, 0);
        assert_eq!(result.measurement, None);
        assert_approx_eq!(result.raw.unwrap(), 0.4);
        assert!(spec.describe(&result).ends_with("(no data)"));
    }

    #[test]
    fn test_ratio_metric() {
        let spec = MetricSpec::new(
            "step_width",
            "Step width",
            Probe::Single(Sampler::HorizontalGap(LeftAnkle, RightAnkle)),
            Aggregate::Max,
            Ladder::scaled(Direction::AtLeast, 1.2, (0.8, 0.6)),
            Unit::Image,
        )
        .normalized_by(Reference::BaseWidth);

        let stance = |ankle_gap: f64| {
            frame_with(&[
                (LeftShoulder, (0.4, 0.3)),
                (RightShoulder, (0.6, 0.3)),
                (LeftAnkle, (0.5 - ankle_gap / 2.0, 0.9)),
                (RightAnkle, (0.5 + ankle_gap / 2.0, 0.9)),
            ])
        };
        let sequence = Sequence::new(vec![stance(0.1), stance(0.2), stance(0.15)]);
        let (refs, _) = normalize_sequence(&sequence);
        let result = spec.evaluate(&sequence, &refs);
        // 0.2 / 0.2 = 1.0, between 1.2 * 0.8 and 1.2
        assert_approx_eq!(result.measurement.unwrap(), 1.0);
        assert_eq!(result.score, 2);
        assert_eq!(spec.describe(&result), "Step width score: 2/3 (base width ratio: 1.00)");
    }

    #[test]
    fn test_describe_angle() {
        let spec = MetricSpec::new(
            "knee_flexion",
            "Knee flexion",
            Probe::Single(Sampler::JointAngle(LeftHip, LeftKnee, LeftAnkle)),
            Aggregate::Min,
            Ladder::offset(Direction::AtMost, 90.0, (10.0, 20.0)),
            Unit::Degrees,
        );
        let result = MetricResult {
            score: 3,
            measurement: Some(85.24),
            ..MetricResult::empty("knee_flexion")
        };
        assert_eq!(spec.describe(&result), "Knee flexion score: 3/3 (min: 85.2°)");
    }
}
