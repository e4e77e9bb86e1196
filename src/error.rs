use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read config file: {1:?}")]
    ReadConfig(#[source] std::io::Error, PathBuf),

    #[error("failed to parse config")]
    ParseConfig(#[source] toml::de::Error),

    #[error("invalid config: {}", .0.join("; "))]
    InvalidConfig(Vec<String>),

    #[error("no thresholds configured for exercise: {0}")]
    MissingThresholds(&'static str),

    #[error("unknown exercise: {0}")]
    UnknownExercise(String),

    #[error("failed to read landmark sequence: {1:?}")]
    ReadSequence(#[source] std::io::Error, PathBuf),

    #[error("failed to parse landmark sequence")]
    ParseSequence(#[source] serde_json::Error),

    #[error("failed to serialize report")]
    Serialize(#[source] serde_json::Error),

    #[error("failed to write output file: {1:?}")]
    WriteOutput(#[source] std::io::Error, PathBuf),
}

pub type Result<T> = std::result::Result<T, Error>;
