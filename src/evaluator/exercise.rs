use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::metric::{Aggregate, Combine, Direction, Ladder, MetricSpec, Probe, Sampler, Unit};
use crate::config::{PelvicStabilityThresholds, Thresholds};
use crate::error::{Error, Result};
use crate::normalizer::Reference;
use crate::pose::LandmarkIndex::*;

/// Scored exercise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Exercise {
    PelvicStability,
    SingleLegSquat,
    CrossStep,
    JumpLanding,
    PushPull,
    StrideMimic,
    UpperBodySwing,
}

impl Exercise {
    pub const ALL: [Exercise; 7] = [
        Exercise::PelvicStability,
        Exercise::SingleLegSquat,
        Exercise::CrossStep,
        Exercise::JumpLanding,
        Exercise::PushPull,
        Exercise::StrideMimic,
        Exercise::UpperBodySwing,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Exercise::PelvicStability => "pelvic_stability",
            Exercise::SingleLegSquat => "single_leg_squat",
            Exercise::CrossStep => "cross_step",
            Exercise::JumpLanding => "jump_landing",
            Exercise::PushPull => "push_pull",
            Exercise::StrideMimic => "stride_mimic",
            Exercise::UpperBodySwing => "upper_body_swing",
        }
    }

    /// Metric set for this exercise, built from the configured thresholds.
    ///
    /// Fails when a threshold section the exercise reads is absent.
    pub fn metric_specs(self, thresholds: &Thresholds) -> Result<Vec<MetricSpec>> {
        let specs = match self {
            Exercise::PelvicStability => vec![pelvic_tilt(pelvic(thresholds)?)],
            Exercise::SingleLegSquat => {
                let t = required(&thresholds.single_leg_squat, "single_leg_squat")?;
                vec![
                    pelvic_tilt(pelvic(thresholds)?),
                    // axis/swing differential: a clearly bent axis leg with a raised swing leg
                    MetricSpec::new(
                        "knee_angle_diff",
                        "Knee angle differential",
                        knee_angles(Combine::AbsDifference),
                        Aggregate::Mean,
                        Ladder::scaled(Direction::Above, t.knee_angle_diff_min, (0.75, 0.5)),
                        Unit::Degrees,
                    ),
                    knee_flexion(knee_angles(Combine::Min), Aggregate::Min, t.knee_flexion_min),
                ]
            }
            Exercise::CrossStep => {
                let t = required(&thresholds.cross_step, "cross_step")?;
                vec![
                    MetricSpec::new(
                        "step_width",
                        "Step width",
                        Probe::Single(Sampler::HorizontalGap(LeftAnkle, RightAnkle)),
                        Aggregate::Max,
                        Ladder::scaled(Direction::AtLeast, t.step_width_ratio_min, (0.8, 0.6)),
                        Unit::Image,
                    )
                    .normalized_by(Reference::BaseWidth),
                    knee_flexion(knee_angles(Combine::Min), Aggregate::Min, t.knee_flexion_min),
                ]
            }
            Exercise::JumpLanding => {
                let t = required(&thresholds.jump_landing, "jump_landing")?;
                vec![
                    // y grows downward, so the hip travel is the range of the midpoint
                    MetricSpec::new(
                        "jump_height",
                        "Jump height",
                        Probe::Single(Sampler::MidpointY(LeftHip, RightHip)),
                        Aggregate::Range,
                        Ladder::scaled(Direction::AtLeast, t.jump_height_ratio_min, (0.75, 0.5)),
                        Unit::Image,
                    )
                    .normalized_by(Reference::LegLength),
                    MetricSpec::new(
                        "landing_flexion",
                        "Landing knee flexion",
                        knee_angles(Combine::Mean),
                        Aggregate::Min,
                        Ladder::offset(Direction::AtMost, t.knee_flexion_max, (10.0, 20.0)),
                        Unit::Degrees,
                    ),
                ]
            }
            Exercise::PushPull => {
                let t = required(&thresholds.push_pull, "push_pull")?;
                vec![
                    MetricSpec::new(
                        "pull_distance",
                        "Pull distance",
                        Probe::bilateral(
                            Sampler::HorizontalGap(LeftWrist, LeftShoulder),
                            Sampler::HorizontalGap(RightWrist, RightShoulder),
                            Combine::Max,
                        ),
                        Aggregate::Max,
                        Ladder::scaled(Direction::AtLeast, t.pull_distance_ratio_min, (0.8, 0.6)),
                        Unit::Image,
                    )
                    .normalized_by(Reference::ShoulderWidth),
                    MetricSpec::new(
                        "push_extension",
                        "Push elbow extension",
                        Probe::bilateral(
                            Sampler::JointAngle(LeftShoulder, LeftElbow, LeftWrist),
                            Sampler::JointAngle(RightShoulder, RightElbow, RightWrist),
                            Combine::Max,
                        ),
                        Aggregate::Max,
                        Ladder::offset(Direction::AtLeast, t.push_angle_min, (-8.0, -15.0)),
                        Unit::Degrees,
                    ),
                ]
            }
            Exercise::StrideMimic => {
                let t = required(&thresholds.stride_mimic, "stride_mimic")?;
                vec![
                    MetricSpec::new(
                        "hip_extension",
                        "Hip extension",
                        Probe::bilateral(
                            Sampler::JointAngle(LeftShoulder, LeftHip, LeftKnee),
                            Sampler::JointAngle(RightShoulder, RightHip, RightKnee),
                            Combine::Max,
                        ),
                        Aggregate::Max,
                        Ladder::offset(Direction::AtLeast, t.hip_extension_min, (-8.0, -15.0)),
                        Unit::Degrees,
                    )
                    .requires(RightAnkle),
                    MetricSpec::new(
                        "foot_clearance",
                        "Foot clearance",
                        Probe::Single(Sampler::VerticalGap(LeftAnkle, RightAnkle)),
                        Aggregate::Max,
                        Ladder::scaled(
                            Direction::AtLeast,
                            t.foot_clearance_ratio_min,
                            (0.75, 0.5),
                        ),
                        Unit::Image,
                    )
                    .normalized_by(Reference::LegLength),
                ]
            }
            Exercise::UpperBodySwing => {
                let t = required(&thresholds.upper_body_swing, "upper_body_swing")?;
                vec![
                    MetricSpec::new(
                        "arm_amplitude",
                        "Arm swing amplitude",
                        arm_swing(Combine::Max),
                        Aggregate::Mean,
                        Ladder::scaled(
                            Direction::AtLeast,
                            t.arm_amplitude_ratio_min,
                            (0.75, 0.5),
                        ),
                        Unit::Image,
                    )
                    .normalized_by(Reference::ShoulderWidth),
                    MetricSpec::new(
                        "symmetry",
                        "Left/right symmetry",
                        arm_swing(Combine::AbsDifference),
                        Aggregate::Mean,
                        Ladder::explicit(
                            Direction::Below,
                            [t.symmetry_excellent, t.symmetry_good, t.symmetry_improvement],
                        ),
                        Unit::Image,
                    ),
                ]
            }
        };
        Ok(specs)
    }
}

impl fmt::Display for Exercise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Exercise {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Exercise::ALL
            .into_iter()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| Error::UnknownExercise(s.to_string()))
    }
}

fn required<'a, T>(section: &'a Option<T>, name: &'static str) -> Result<&'a T> {
    section.as_ref().ok_or(Error::MissingThresholds(name))
}

fn pelvic(thresholds: &Thresholds) -> Result<&PelvicStabilityThresholds> {
    required(&thresholds.pelvic_stability, "pelvic_stability")
}

/// Pelvic tilt: mean left/right hip height difference
fn pelvic_tilt(t: &PelvicStabilityThresholds) -> MetricSpec {
    MetricSpec::new(
        "pelvic_tilt",
        "Pelvic tilt",
        Probe::Single(Sampler::VerticalGap(LeftHip, RightHip)),
        Aggregate::Mean,
        Ladder::explicit(
            Direction::Below,
            [t.tilt_excellent, t.tilt_good, t.tilt_improvement],
        ),
        Unit::Image,
    )
}

fn knee_angles(combine: Combine) -> Probe {
    Probe::bilateral(
        Sampler::JointAngle(LeftHip, LeftKnee, LeftAnkle),
        Sampler::JointAngle(RightHip, RightKnee, RightAnkle),
        combine,
    )
}

/// Smaller angle = deeper bend, scored at or below `target`
fn knee_flexion(probe: Probe, aggregate: Aggregate, target: f64) -> MetricSpec {
    MetricSpec::new(
        "knee_flexion",
        "Knee flexion",
        probe,
        aggregate,
        Ladder::offset(Direction::AtMost, target, (10.0, 20.0)),
        Unit::Degrees,
    )
}

fn arm_swing(combine: Combine) -> Probe {
    Probe::bilateral(
        Sampler::VerticalGap(LeftWrist, LeftShoulder),
        Sampler::VerticalGap(RightWrist, RightShoulder),
        combine,
    )
}
