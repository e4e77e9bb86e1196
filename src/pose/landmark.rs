use serde::{Deserialize, Deserializer, Serialize};

/// The 33 MediaPipe Pose landmark indices
///
/// The numbering is shared by every evaluator and the normalizer and must
/// match the extraction model's output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum LandmarkIndex {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl LandmarkIndex {
    pub const COUNT: usize = 33;

    const ALL: [LandmarkIndex; Self::COUNT] = {
        use LandmarkIndex::*;
        [
            Nose, LeftEyeInner, LeftEye, LeftEyeOuter, RightEyeInner, RightEye, RightEyeOuter,
            LeftEar, RightEar, MouthLeft, MouthRight, LeftShoulder, RightShoulder, LeftElbow,
            RightElbow, LeftWrist, RightWrist, LeftPinky, RightPinky, LeftIndex, RightIndex,
            LeftThumb, RightThumb, LeftHip, RightHip, LeftKnee, RightKnee, LeftAnkle, RightAnkle,
            LeftHeel, RightHeel, LeftFootIndex, RightFootIndex,
        ]
    };

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

fn missing_coordinate() -> f64 {
    f64::NAN
}

// null and absent coordinates both become NaN so geometry can reject them
fn coordinate<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

/// Single landmark
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    /// Normalized x (0.0 to 1.0)
    #[serde(default = "missing_coordinate", deserialize_with = "coordinate")]
    pub x: f64,
    /// Normalized y (0.0 to 1.0, down is positive)
    #[serde(default = "missing_coordinate", deserialize_with = "coordinate")]
    pub y: f64,
    /// Depth relative to the hip midpoint, same scale as x
    #[serde(default = "missing_coordinate", deserialize_with = "coordinate")]
    pub z: f64,
    /// Confidence score (0.0 to 1.0)
    #[serde(default)]
    pub visibility: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64, z: f64, visibility: f64) -> Self {
        Self { x, y, z, visibility }
    }

    /// Visibility at or above the threshold
    pub fn is_visible(&self, threshold: f64) -> bool {
        self.visibility >= threshold
    }

    /// All three coordinates are present
    pub fn has_coordinates(&self) -> bool {
        !(self.x.is_nan() || self.y.is_nan() || self.z.is_nan())
    }
}

impl Default for Landmark {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            visibility: 0.0,
        }
    }
}

/// One sampled instant. An empty landmark list means detection failed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Frame {
    #[serde(default)]
    pub frame: usize,
    #[serde(default)]
    pub timestamp: f64,
    #[serde(default)]
    pub landmarks: Vec<Landmark>,
}

impl Frame {
    pub fn new(frame: usize, timestamp: f64, landmarks: Vec<Landmark>) -> Self {
        Self {
            frame,
            timestamp,
            landmarks,
        }
    }

    pub fn is_detected(&self) -> bool {
        !self.landmarks.is_empty()
    }

    /// Whether the landmark list is long enough to hold `index`
    pub fn covers(&self, index: LandmarkIndex) -> bool {
        self.landmarks.len() > index.index()
    }

    pub fn get(&self, index: LandmarkIndex) -> Option<&Landmark> {
        self.landmarks.get(index.index())
    }
}
