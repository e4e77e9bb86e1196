use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::{Config, NanHandling};

/// Run-scoped scoring context.
///
/// Carries the reproducibility seed and the shared data-integrity settings
/// explicitly instead of seeding any process-wide generator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringContext {
    pub seed: u64,
    pub confidence_min: f64,
    pub frame_skip_tolerance: u32,
    pub nan_handling: NanHandling,
}

impl ScoringContext {
    pub fn from_config(config: &Config) -> Self {
        Self {
            seed: config.data_integrity.random_seed,
            confidence_min: config.thresholds.confidence_min,
            frame_skip_tolerance: config.thresholds.frame_skip_tolerance,
            nan_handling: config.data_integrity.nan_handling,
        }
    }

    /// Fresh generator seeded from this context
    pub fn rng(&self) -> StdRng {
        seeded_rng(self.seed)
    }
}

impl Default for ScoringContext {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Seeded generator for reproducible runs
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}
