//! Per-construction hints passed to the explainer.
//!
//! Hints override individual settings for one explainer without touching the
//! shared [`ExplainerSettings`]: an explicit algorithm, a seed, or a top-k
//! restriction of the output space.

use crate::config::core::ExplainerSettings;
use crate::core::error::{Result, ShapError};
use crate::core::types::Algorithm;

/// Optional overrides consulted by the dispatch resolver.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExplainerHints {
    /// Explicit algorithm; `None` defers to the settings
    pub algorithm: Option<Algorithm>,
    /// Random seed; `None` defers to the settings
    pub seed: Option<u64>,
    /// Number of top tokens kept for top-k language models
    pub top_k: Option<usize>,
    /// Base settings; `None` uses the defaults
    pub settings: Option<ExplainerSettings>,
}

impl ExplainerHints {
    /// Empty hints
    pub fn new() -> Self {
        Self::default()
    }

    /// Request an algorithm
    pub fn algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = Some(algorithm);
        self
    }

    /// Request an algorithm by name; unknown or unsupported names fail.
    pub fn algorithm_name(mut self, name: &str) -> Result<Self> {
        self.algorithm = Some(name.parse()?);
        Ok(self)
    }

    /// Fix the random seed
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Restrict the output space to the top `k` tokens
    pub fn top_k(mut self, k: usize) -> Self {
        self.top_k = Some(k);
        self
    }

    /// Use these settings as the base
    pub fn settings(mut self, settings: ExplainerSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Merge hints over the base settings and validate the result.
    pub fn resolve_settings(&self) -> Result<ExplainerSettings> {
        let mut settings = self.settings.clone().unwrap_or_default();
        if let Some(algorithm) = self.algorithm {
            settings.algorithm = algorithm;
        }
        if let Some(seed) = self.seed {
            settings.seed = seed;
        }
        if let Some(0) = self.top_k {
            return Err(ShapError::invalid_parameter(
                "top_k",
                "0",
                "must be positive",
            ));
        }
        settings.validate()?;
        Ok(settings)
    }
}
