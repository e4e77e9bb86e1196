//! Body-scale normalization.
//!
//! Raw landmark distances depend on the subject's size and on how far they
//! stand from the camera. The reference distances computed here (shoulder
//! width, pelvis width, leg length, base width) are used as ratio
//! denominators so that evaluator metrics compare like with like.

use serde::{Deserialize, Serialize};

use crate::pose::{distance, Landmark, LandmarkIndex, Sequence};

/// Which body measurement a ratio metric is divided by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reference {
    ShoulderWidth,
    PelvisWidth,
    LegLength,
    BaseWidth,
}

impl Reference {
    pub const ALL: [Reference; 4] = [
        Reference::ShoulderWidth,
        Reference::PelvisWidth,
        Reference::LegLength,
        Reference::BaseWidth,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Reference::ShoulderWidth => "shoulder_width",
            Reference::PelvisWidth => "pelvis_width",
            Reference::LegLength => "leg_length",
            Reference::BaseWidth => "base_width",
        }
    }

    /// Human-readable name used in detail strings
    pub fn label(self) -> &'static str {
        match self {
            Reference::ShoulderWidth => "shoulder width",
            Reference::PelvisWidth => "pelvis width",
            Reference::LegLength => "leg length",
            Reference::BaseWidth => "base width",
        }
    }
}

/// Reference distances for one frame. `None` = not computable in this frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct FrameReferences {
    pub shoulder_width: Option<f64>,
    pub pelvis_width: Option<f64>,
    pub leg_length: Option<f64>,
    pub base_width: Option<f64>,
}

impl FrameReferences {
    pub fn get(&self, reference: Reference) -> Option<f64> {
        match reference {
            Reference::ShoulderWidth => self.shoulder_width,
            Reference::PelvisWidth => self.pelvis_width,
            Reference::LegLength => self.leg_length,
            Reference::BaseWidth => self.base_width,
        }
    }
}

/// Sequence-level representative reference distances.
///
/// Each value is the median of the non-null per-frame values, or NaN when no
/// frame produced one. NaN serializes as `null`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ReferenceValues {
    pub shoulder_width: f64,
    pub pelvis_width: f64,
    pub leg_length: f64,
    pub base_width: f64,
}

impl ReferenceValues {
    /// Raw representative value, NaN sentinel included
    pub fn raw(&self, reference: Reference) -> f64 {
        match reference {
            Reference::ShoulderWidth => self.shoulder_width,
            Reference::PelvisWidth => self.pelvis_width,
            Reference::LegLength => self.leg_length,
            Reference::BaseWidth => self.base_width,
        }
    }

    /// Representative value, `None` when it could not be computed
    pub fn get(&self, reference: Reference) -> Option<f64> {
        let value = self.raw(reference);
        if value.is_nan() {
            None
        } else {
            Some(value)
        }
    }
}

fn pair_distance(landmarks: &[Landmark], a: LandmarkIndex, b: LandmarkIndex) -> Option<f64> {
    if landmarks.len() <= a.index().max(b.index()) {
        return None;
    }
    distance(&landmarks[a.index()], &landmarks[b.index()])
}

/// Shoulder width (distance between landmarks 11 and 12)
pub fn shoulder_width(landmarks: &[Landmark]) -> Option<f64> {
    pair_distance(landmarks, LandmarkIndex::LeftShoulder, LandmarkIndex::RightShoulder)
}

/// Pelvis width (distance between landmarks 23 and 24)
pub fn pelvis_width(landmarks: &[Landmark]) -> Option<f64> {
    pair_distance(landmarks, LandmarkIndex::LeftHip, LandmarkIndex::RightHip)
}

/// Leg length: hip→ankle, averaged over both legs.
///
/// Falls back to the single computable side.
pub fn leg_length(landmarks: &[Landmark]) -> Option<f64> {
    if landmarks.len() <= LandmarkIndex::LeftAnkle.index().max(LandmarkIndex::RightAnkle.index()) {
        return None;
    }
    let left = pair_distance(landmarks, LandmarkIndex::LeftHip, LandmarkIndex::LeftAnkle);
    let right = pair_distance(landmarks, LandmarkIndex::RightHip, LandmarkIndex::RightAnkle);

    match (left, right) {
        (Some(l), Some(r)) => Some((l + r) / 2.0),
        (Some(l), None) => Some(l),
        (None, Some(r)) => Some(r),
        (None, None) => None,
    }
}

/// Base width = max(shoulder width, pelvis width), or whichever one is available
pub fn base_width(landmarks: &[Landmark]) -> Option<f64> {
    match (shoulder_width(landmarks), pelvis_width(landmarks)) {
        (Some(s), Some(p)) => Some(s.max(p)),
        (Some(s), None) => Some(s),
        (None, Some(p)) => Some(p),
        (None, None) => None,
    }
}

pub fn normalize_frame(landmarks: &[Landmark]) -> FrameReferences {
    FrameReferences {
        shoulder_width: shoulder_width(landmarks),
        pelvis_width: pelvis_width(landmarks),
        leg_length: leg_length(landmarks),
        base_width: base_width(landmarks),
    }
}

/// Per-frame references for every frame plus the median representative.
pub fn normalize_sequence(sequence: &Sequence) -> (ReferenceValues, Vec<FrameReferences>) {
    let per_frame: Vec<FrameReferences> = sequence
        .iter()
        .map(|frame| normalize_frame(&frame.landmarks))
        .collect();

    let representative = |reference: Reference| {
        let mut values: Vec<f64> = per_frame.iter().filter_map(|f| f.get(reference)).collect();
        median(&mut values).unwrap_or(f64::NAN)
    };

    let values = ReferenceValues {
        shoulder_width: representative(Reference::ShoulderWidth),
        pelvis_width: representative(Reference::PelvisWidth),
        leg_length: representative(Reference::LegLength),
        base_width: representative(Reference::BaseWidth),
    };

    (values, per_frame)
}

/// Median, averaging the two middle values for an even count
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

/// `value / reference`; `None` for a null, NaN or zero reference and for a
/// null or NaN value.
pub fn ratio(value: Option<f64>, reference: Option<f64>) -> Option<f64> {
    let reference = reference.filter(|r| !r.is_nan() && *r != 0.0)?;
    let value = value.filter(|v| !v.is_nan())?;
    Some(value / reference)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::Frame;
    use assert_approx_eq::assert_approx_eq;

    fn make_landmarks(points: &[(LandmarkIndex, (f64, f64, f64))]) -> Vec<Landmark> {
        let mut landmarks = vec![Landmark::new(0.5, 0.5, 0.0, 1.0); LandmarkIndex::COUNT];
        for &(idx, (x, y, z)) in points {
            landmarks[idx as usize] = Landmark::new(x, y, z, 1.0);
        }
        landmarks
    }

    fn standing() -> Vec<Landmark> {
        use LandmarkIndex::*;
        make_landmarks(&[
            (LeftShoulder, (0.4, 0.3, 0.0)),
            (RightShoulder, (0.6, 0.3, 0.0)),
            (LeftHip, (0.45, 0.6, 0.0)),
            (RightHip, (0.55, 0.6, 0.0)),
            (LeftAnkle, (0.45, 0.9, 0.0)),
            (RightAnkle, (0.55, 0.9, 0.0)),
        ])
    }

    #[test]
    fn test_shoulder_and_pelvis_width() {
        let landmarks = standing();
        assert_approx_eq!(shoulder_width(&landmarks).unwrap(), 0.2);
        assert_approx_eq!(pelvis_width(&landmarks).unwrap(), 0.1);
    }

    #[test]
    fn test_width_short_landmark_list() {
        let landmarks = vec![Landmark::default(); 12];
        assert_eq!(shoulder_width(&landmarks), None);
        assert_eq!(pelvis_width(&landmarks), None);
        assert_eq!(base_width(&landmarks), None);
    }

    #[test]
    fn test_leg_length_average() {
        use LandmarkIndex::*;
        let mut landmarks = standing();
        landmarks[RightAnkle as usize] = Landmark::new(0.55, 1.0, 0.0, 1.0);
        assert_approx_eq!(leg_length(&landmarks).unwrap(), 0.35);
    }

    #[test]
    fn test_leg_length_single_side_fallback() {
        use LandmarkIndex::*;
        let mut landmarks = standing();
        landmarks[LeftAnkle as usize].x = f64::NAN;
        assert_approx_eq!(leg_length(&landmarks).unwrap(), 0.3);

        landmarks[RightHip as usize].y = f64::NAN;
        assert_eq!(leg_length(&landmarks), None);
    }

    #[test]
    fn test_leg_length_requires_ankles() {
        let landmarks = vec![Landmark::default(); 28];
        assert_eq!(leg_length(&landmarks), None);
    }

    #[test]
    fn test_base_width_is_max() {
        let landmarks = standing();
        assert_approx_eq!(base_width(&landmarks).unwrap(), 0.2);
    }

    #[test]
    fn test_base_width_falls_back_to_available() {
        use LandmarkIndex::*;
        let mut landmarks = standing();
        landmarks[LeftShoulder as usize].z = f64::NAN;
        assert_approx_eq!(base_width(&landmarks).unwrap(), 0.1);

        // list too short to reach the hips
        let mut short = standing();
        short.truncate(20);
        assert_approx_eq!(base_width(&short).unwrap(), 0.2);
    }

    #[test]
    fn test_normalize_frame_keeps_all_keys() {
        let refs = normalize_frame(&[]);
        assert_eq!(refs, FrameReferences::default());
        let json = serde_json::to_value(refs).unwrap();
        for reference in Reference::ALL {
            assert!(json.get(reference.as_str()).unwrap().is_null());
        }
    }

    #[test]
    fn test_normalize_sequence_median() {
        use LandmarkIndex::*;
        let frames = [0.2, 0.22, 0.5]
            .iter()
            .enumerate()
            .map(|(i, &width)| {
                let landmarks = make_landmarks(&[
                    (LeftShoulder, (0.5 - width / 2.0, 0.3, 0.0)),
                    (RightShoulder, (0.5 + width / 2.0, 0.3, 0.0)),
                ]);
                Frame::new(i, i as f64 * 0.033, landmarks)
            })
            .collect::<Vec<_>>();
        let (rep, per_frame) = normalize_sequence(&Sequence::new(frames));
        assert_eq!(per_frame.len(), 3);
        assert_approx_eq!(rep.shoulder_width, 0.22);
    }

    #[test]
    fn test_normalize_sequence_even_count_median() {
        let mut values = vec![4.0, 1.0, 3.0, 2.0];
        assert_eq!(median(&mut values), Some(2.5));
        assert_eq!(median(&mut []), None);
    }

    #[test]
    fn test_normalize_sequence_all_null_is_nan() {
        let frames = vec![Frame::new(0, 0.0, vec![]), Frame::new(1, 0.033, vec![])];
        let (rep, per_frame) = normalize_sequence(&Sequence::new(frames));
        assert_eq!(per_frame.len(), 2);
        for reference in Reference::ALL {
            assert!(rep.raw(reference).is_nan());
            assert_eq!(rep.get(reference), None);
        }
    }

    #[test]
    fn test_normalize_sequence_skips_null_frames() {
        let frames = vec![
            Frame::new(0, 0.0, vec![]),
            Frame::new(1, 0.033, standing()),
        ];
        let (rep, _) = normalize_sequence(&Sequence::new(frames));
        assert_approx_eq!(rep.pelvis_width, 0.1);
        assert_approx_eq!(rep.get(Reference::LegLength).unwrap(), 0.3);
    }

    #[test]
    fn test_ratio() {
        assert_eq!(ratio(Some(1.5), Some(1.0)), Some(1.5));
        assert_eq!(ratio(Some(1.5), Some(0.0)), None);
        assert_eq!(ratio(Some(1.5), None), None);
        assert_eq!(ratio(Some(1.5), Some(f64::NAN)), None);
        assert_eq!(ratio(None, Some(1.0)), None);
        assert_eq!(ratio(Some(f64::NAN), Some(1.0)), None);
        assert_approx_eq!(ratio(Some(0.3), Some(0.6)).unwrap(), 0.5);
    }
}
