pub mod config;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod normalizer;
pub mod pipeline;
pub mod pose;
pub mod quality;
