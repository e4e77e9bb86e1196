use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Scoring configuration (`config.toml`).
///
/// Thresholds have no safe defaults: a missing required key fails the load,
/// and a missing per-exercise section fails construction of that exercise's
/// evaluator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub thresholds: Thresholds,
    pub data_integrity: DataIntegrity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thresholds {
    /// Minimum landmark visibility (0.0 to 1.0)
    pub confidence_min: f64,
    /// Undetected frames tolerated per sequence
    pub frame_skip_tolerance: u32,
    pub pelvic_stability: Option<PelvicStabilityThresholds>,
    pub single_leg_squat: Option<SingleLegSquatThresholds>,
    pub cross_step: Option<CrossStepThresholds>,
    pub jump_landing: Option<JumpLandingThresholds>,
    pub push_pull: Option<PushPullThresholds>,
    pub stride_mimic: Option<StrideMimicThresholds>,
    pub upper_body_swing: Option<UpperBodySwingThresholds>,
}

/// Left/right hip height difference cut-offs (normalized image units)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PelvicStabilityThresholds {
    pub tilt_excellent: f64,
    pub tilt_good: f64,
    pub tilt_improvement: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SingleLegSquatThresholds {
    /// Axis-leg knee angle in degrees: at or below scores 3
    pub knee_flexion_min: f64,
    /// Axis/swing knee angle differential (degrees) that scores 3
    #[serde(default = "default_knee_angle_diff_min")]
    pub knee_angle_diff_min: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossStepThresholds {
    pub step_width_ratio_min: f64,
    pub knee_flexion_min: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JumpLandingThresholds {
    pub jump_height_ratio_min: f64,
    pub knee_flexion_max: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushPullThresholds {
    pub pull_distance_ratio_min: f64,
    pub push_angle_min: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrideMimicThresholds {
    pub hip_extension_min: f64,
    pub foot_clearance_ratio_min: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpperBodySwingThresholds {
    pub arm_amplitude_ratio_min: f64,
    /// Mean left/right amplitude difference cut-offs
    #[serde(default = "default_symmetry_excellent")]
    pub symmetry_excellent: f64,
    #[serde(default = "default_symmetry_good")]
    pub symmetry_good: f64,
    #[serde(default = "default_symmetry_improvement")]
    pub symmetry_improvement: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataIntegrity {
    pub random_seed: u64,
    pub nan_handling: NanHandling,
}

/// How undeterminable values are carried through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NanHandling {
    /// Keep every key, represent missing values as null
    Preserve,
}

fn default_knee_angle_diff_min() -> f64 { 20.0 }
fn default_symmetry_excellent() -> f64 { 0.05 }
fn default_symmetry_good() -> f64 { 0.10 }
fn default_symmetry_improvement() -> f64 { 0.15 }

impl Default for Config {
    fn default() -> Self {
        Self {
            thresholds: Thresholds {
                confidence_min: 0.7,
                frame_skip_tolerance: 3,
                pelvic_stability: Some(PelvicStabilityThresholds {
                    tilt_excellent: 0.02,
                    tilt_good: 0.05,
                    tilt_improvement: 0.10,
                }),
                single_leg_squat: Some(SingleLegSquatThresholds {
                    knee_flexion_min: 87.0,
                    knee_angle_diff_min: default_knee_angle_diff_min(),
                }),
                cross_step: Some(CrossStepThresholds {
                    step_width_ratio_min: 1.2,
                    knee_flexion_min: 120.0,
                }),
                jump_landing: Some(JumpLandingThresholds {
                    jump_height_ratio_min: 0.25,
                    knee_flexion_max: 100.0,
                }),
                push_pull: Some(PushPullThresholds {
                    pull_distance_ratio_min: 1.5,
                    push_angle_min: 160.0,
                }),
                stride_mimic: Some(StrideMimicThresholds {
                    hip_extension_min: 170.0,
                    foot_clearance_ratio_min: 0.25,
                }),
                upper_body_swing: Some(UpperBodySwingThresholds {
                    arm_amplitude_ratio_min: 1.0,
                    symmetry_excellent: default_symmetry_excellent(),
                    symmetry_good: default_symmetry_good(),
                    symmetry_improvement: default_symmetry_improvement(),
                }),
            },
            data_integrity: DataIntegrity {
                random_seed: 42,
                nan_handling: NanHandling::Preserve,
            },
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).map_err(|e| Error::ReadConfig(e, path.to_path_buf()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(Error::ParseConfig)
    }

    /// Range checks on an already-parsed config. Empty means valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let t = &self.thresholds;

        if !(0.0..=1.0).contains(&t.confidence_min) {
            errors.push(format!(
                "invalid confidence_min: {} (must be 0.0-1.0)",
                t.confidence_min
            ));
        }

        if let Some(p) = &t.pelvic_stability {
            check_positive(&mut errors, "pelvic_stability.tilt_excellent", p.tilt_excellent);
            check_positive(&mut errors, "pelvic_stability.tilt_good", p.tilt_good);
            check_positive(&mut errors, "pelvic_stability.tilt_improvement", p.tilt_improvement);
            if !(p.tilt_excellent <= p.tilt_good && p.tilt_good <= p.tilt_improvement) {
                errors.push(
                    "pelvic_stability tilt thresholds must be ordered excellent <= good <= improvement"
                        .to_string(),
                );
            }
        }
        if let Some(s) = &t.single_leg_squat {
            check_angle(&mut errors, "single_leg_squat.knee_flexion_min", s.knee_flexion_min);
            check_angle(&mut errors, "single_leg_squat.knee_angle_diff_min", s.knee_angle_diff_min);
        }
        if let Some(c) = &t.cross_step {
            check_positive(&mut errors, "cross_step.step_width_ratio_min", c.step_width_ratio_min);
            check_angle(&mut errors, "cross_step.knee_flexion_min", c.knee_flexion_min);
        }
        if let Some(j) = &t.jump_landing {
            check_positive(&mut errors, "jump_landing.jump_height_ratio_min", j.jump_height_ratio_min);
            check_angle(&mut errors, "jump_landing.knee_flexion_max", j.knee_flexion_max);
        }
        if let Some(p) = &t.push_pull {
            check_positive(&mut errors, "push_pull.pull_distance_ratio_min", p.pull_distance_ratio_min);
            check_angle(&mut errors, "push_pull.push_angle_min", p.push_angle_min);
        }
        if let Some(s) = &t.stride_mimic {
            check_angle(&mut errors, "stride_mimic.hip_extension_min", s.hip_extension_min);
            check_positive(
                &mut errors,
                "stride_mimic.foot_clearance_ratio_min",
                s.foot_clearance_ratio_min,
            );
        }
        if let Some(u) = &t.upper_body_swing {
            check_positive(
                &mut errors,
                "upper_body_swing.arm_amplitude_ratio_min",
                u.arm_amplitude_ratio_min,
            );
            check_positive(&mut errors, "upper_body_swing.symmetry_excellent", u.symmetry_excellent);
            check_positive(&mut errors, "upper_body_swing.symmetry_good", u.symmetry_good);
            check_positive(
                &mut errors,
                "upper_body_swing.symmetry_improvement",
                u.symmetry_improvement,
            );
        }

        errors
    }
}

fn check_positive(errors: &mut Vec<String>, key: &str, value: f64) {
    if !(value.is_finite() && value > 0.0) {
        errors.push(format!("invalid {}: {} (must be a positive number)", key, value));
    }
}

fn check_angle(errors: &mut Vec<String>, key: &str, value: f64) {
    if !(value > 0.0 && value <= 180.0) {
        errors.push(format!("invalid {}: {} (must be in (0, 180] degrees)", key, value));
    }
}

const REQUIRED_KEYS: [(&str, &str); 4] = [
    ("thresholds", "confidence_min"),
    ("thresholds", "frame_skip_tolerance"),
    ("data_integrity", "random_seed"),
    ("data_integrity", "nan_handling"),
];

/// Non-fatal pre-flight check of raw config text.
///
/// Reports missing required keys, an out-of-range `confidence_min` and a
/// non-integer seed without failing, so callers can validate before
/// constructing anything that depends on the config.
pub fn preflight(content: &str) -> (bool, Vec<String>) {
    let table: toml::Table = match toml::from_str(content) {
        Ok(table) => table,
        Err(e) => return (false, vec![format!("failed to parse config: {}", e.message())]),
    };
    let mut errors = Vec::new();

    let lookup = |section: &str, key: &str| -> Option<toml::Value> {
        table.get(section)?.as_table()?.get(key).cloned()
    };

    for (section, key) in REQUIRED_KEYS {
        if lookup(section, key).is_none() {
            errors.push(format!("missing required config key: {}.{}", section, key));
        }
    }

    if let Some(value) = lookup("thresholds", "confidence_min") {
        let number = match &value {
            toml::Value::Float(f) => Some(*f),
            toml::Value::Integer(i) => Some(*i as f64),
            _ => None,
        };
        match number {
            Some(c) if (0.0..=1.0).contains(&c) => {}
            Some(c) => errors.push(format!("invalid confidence_min: {} (must be 0.0-1.0)", c)),
            None => errors.push(format!(
                "invalid confidence_min type: {} (must be a number)",
                value.type_str()
            )),
        }
    }

    if let Some(value) = lookup("data_integrity", "random_seed") {
        match value {
            toml::Value::Integer(seed) if seed >= 0 => {}
            toml::Value::Integer(seed) => {
                errors.push(format!("invalid random_seed: {} (must be non-negative)", seed))
            }
            other => errors.push(format!(
                "invalid random_seed type: {} (must be integer)",
                other.type_str()
            )),
        }
    }

    (errors.is_empty(), errors)
}
