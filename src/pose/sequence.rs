use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::landmark::Frame;
use crate::error::{Error, Result};

/// Chronologically ordered frames for one recorded attempt.
///
/// Skipped frames are simply absent; frames whose detection failed are
/// present with an empty landmark list.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sequence {
    frames: Vec<Frame>,
}

// Accepts either a bare frame array or an extraction record.
#[derive(Deserialize)]
#[serde(untagged)]
enum SequenceFile {
    Frames(Vec<Frame>),
    Record { landmarks: Vec<Frame> },
}

impl Sequence {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self { frames }
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Frame> {
        self.frames.iter()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Number of frames with at least one landmark
    pub fn detected_frames(&self) -> usize {
        self.frames.iter().filter(|f| f.is_detected()).count()
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let file: SequenceFile = serde_json::from_str(content).map_err(Error::ParseSequence)?;
        let frames = match file {
            SequenceFile::Frames(frames) => frames,
            SequenceFile::Record { landmarks } => landmarks,
        };
        Ok(Self::new(frames))
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).map_err(|e| Error::ReadSequence(e, path.to_path_buf()))?;
        Self::from_json_str(&content)
    }
}

impl From<Vec<Frame>> for Sequence {
    fn from(frames: Vec<Frame>) -> Self {
        Self::new(frames)
    }
}

impl<'a> IntoIterator for &'a Sequence {
    type Item = &'a Frame;
    type IntoIter = std::slice::Iter<'a, Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::Landmark;

    #[test]
    fn test_parse_bare_frame_array() {
        let json = r#"[
            {"frame": 0, "timestamp": 0.0, "landmarks": [{"x": 0.1, "y": 0.2, "z": 0.0, "visibility": 0.9}]},
            {"frame": 1, "timestamp": 0.033, "landmarks": []}
        ]"#;
        let seq = Sequence::from_json_str(json).unwrap();
        assert_eq!(seq.len(), 2);
        assert_eq!(seq.detected_frames(), 1);
        assert_eq!(seq.frames()[0].landmarks[0], Landmark::new(0.1, 0.2, 0.0, 0.9));
    }

    #[test]
    fn test_parse_extraction_record() {
        let json = r#"{"fps": 30.0, "landmarks": [{"frame": 4, "landmarks": []}]}"#;
        let seq = Sequence::from_json_str(json).unwrap();
        assert_eq!(seq.len(), 1);
        assert_eq!(seq.frames()[0].frame, 4);
        assert_eq!(seq.detected_frames(), 0);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            Sequence::from_json_str("{\"frames\": 3}"),
            Err(Error::ParseSequence(_))
        ));
    }

    #[test]
    fn test_load_json_missing_file() {
        let err = Sequence::load_json("/nonexistent/landmarks.json").unwrap_err();
        assert!(matches!(err, Error::ReadSequence(_, _)));
    }
}
