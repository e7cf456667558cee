//! Core settings structure and builder for Pure Rust SHAP.
//!
//! [`ExplainerSettings`] holds the tunables of attribution: sampling budget,
//! convergence tolerance, seed, worker count and batching. Settings can be
//! built in code, loaded from TOML/JSON files, or overridden from
//! `SHAP_RUST_*` environment variables.

use crate::core::constants::*;
use crate::core::error::{Result, ShapError};
use crate::core::types::Algorithm;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Tunable settings for explainer construction and attribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplainerSettings {
    /// Requested attribution algorithm
    pub algorithm: Algorithm,
    /// Model evaluation budget per explained instance
    pub max_evals: usize,
    /// Standard error at which sampling stops early (0 disables early exit)
    pub convergence_tolerance: f64,
    /// Antithetic rounds to run before checking convergence
    pub min_rounds: usize,
    /// Base random seed
    pub seed: u64,
    /// Parallel permutation workers (0 = all available cores)
    pub num_workers: usize,
    /// Maximum masked instances per model call
    pub batch_size: usize,
    /// Feature count at or below which `Auto` selects the exact algorithm
    pub exact_max_features: usize,
    /// Background rows kept by auto-built tabular maskers
    pub max_background_samples: usize,
    /// Relative tolerance for the efficiency check logged after each explanation
    pub efficiency_tolerance: f64,
}

impl Default for ExplainerSettings {
    fn default() -> Self {
        ExplainerSettings {
            algorithm: Algorithm::Auto,
            max_evals: DEFAULT_MAX_EVALS,
            convergence_tolerance: DEFAULT_CONVERGENCE_TOLERANCE,
            min_rounds: DEFAULT_MIN_ROUNDS,
            seed: DEFAULT_RANDOM_SEED,
            num_workers: DEFAULT_NUM_WORKERS,
            batch_size: DEFAULT_BATCH_SIZE,
            exact_max_features: DEFAULT_EXACT_MAX_FEATURES,
            max_background_samples: DEFAULT_MAX_BACKGROUND_SAMPLES,
            efficiency_tolerance: DEFAULT_EFFICIENCY_TOLERANCE,
        }
    }
}

impl ExplainerSettings {
    /// Create new settings with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        if self.max_evals == 0 {
            return Err(ShapError::invalid_parameter(
                "max_evals",
                "0",
                "must be positive",
            ));
        }

        if !self.convergence_tolerance.is_finite() || self.convergence_tolerance < 0.0 {
            return Err(ShapError::invalid_parameter(
                "convergence_tolerance",
                self.convergence_tolerance.to_string(),
                "must be finite and non-negative",
            ));
        }

        if self.min_rounds < 1 {
            return Err(ShapError::invalid_parameter(
                "min_rounds",
                self.min_rounds.to_string(),
                "must be at least 1",
            ));
        }

        if self.batch_size == 0 {
            return Err(ShapError::invalid_parameter(
                "batch_size",
                "0",
                "must be positive",
            ));
        }

        if self.exact_max_features > MAX_EXACT_FEATURES {
            return Err(ShapError::invalid_parameter(
                "exact_max_features",
                self.exact_max_features.to_string(),
                format!("must be at most {}", MAX_EXACT_FEATURES),
            ));
        }

        if self.max_background_samples == 0 {
            return Err(ShapError::invalid_parameter(
                "max_background_samples",
                "0",
                "must be positive",
            ));
        }

        if !(self.efficiency_tolerance > 0.0) {
            return Err(ShapError::invalid_parameter(
                "efficiency_tolerance",
                self.efficiency_tolerance.to_string(),
                "must be positive",
            ));
        }

        if self.num_workers > num_cpus::get() * 4 {
            log::warn!(
                "num_workers ({}) is much larger than available cores ({})",
                self.num_workers,
                num_cpus::get()
            );
        }

        Ok(())
    }

    /// Load settings from a `.toml` or `.json` file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ShapError::config(format!("Failed to read settings file: {}", e)))?;

        let settings: ExplainerSettings = match path.extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| ShapError::config(format!("Failed to parse JSON settings: {}", e)))?,
            Some("toml") => toml::from_str(&content)
                .map_err(|e| ShapError::config(format!("Failed to parse TOML settings: {}", e)))?,
            _ => {
                return Err(ShapError::config(
                    "Unsupported settings file format. Use .json or .toml",
                ))
            }
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to a `.toml` or `.json` file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = match path.extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)
                .map_err(|e| ShapError::config(format!("Failed to serialize to JSON: {}", e)))?,
            Some("toml") => toml::to_string_pretty(self)
                .map_err(|e| ShapError::config(format!("Failed to serialize to TOML: {}", e)))?,
            _ => {
                return Err(ShapError::config(
                    "Unsupported settings file format. Use .json or .toml",
                ))
            }
        };

        std::fs::write(path, content)
            .map_err(|e| ShapError::config(format!("Failed to write settings file: {}", e)))?;

        Ok(())
    }

    /// Load settings from environment variables on top of the defaults
    pub fn load_from_environment() -> Result<Self> {
        let mut settings = ExplainerSettings::default();
        settings.apply_environment_overrides()?;
        Ok(settings)
    }

    /// Apply `SHAP_RUST_*` environment variables to these settings
    pub fn apply_environment_overrides(&mut self) -> Result<()> {
        if let Some(val) = env_var("MAX_EVALS") {
            self.max_evals = parse_env("MAX_EVALS", &val)?;
        }
        if let Some(val) = env_var("SEED") {
            self.seed = parse_env("SEED", &val)?;
        }
        if let Some(val) = env_var("NUM_WORKERS") {
            self.num_workers = parse_env("NUM_WORKERS", &val)?;
        }
        if let Some(val) = env_var("TOLERANCE") {
            self.convergence_tolerance = parse_env("TOLERANCE", &val)?;
        }
        if let Some(val) = env_var("BATCH_SIZE") {
            self.batch_size = parse_env("BATCH_SIZE", &val)?;
        }
        if let Some(val) = env_var("ALGORITHM") {
            self.algorithm = val.parse()?;
        }

        self.validate()
    }

    /// Get the effective number of workers (0 means use all available cores)
    pub fn effective_num_workers(&self) -> usize {
        if self.num_workers == 0 {
            num_cpus::get()
        } else {
            self.num_workers
        }
    }

    /// Whether sampling may stop before the budget is spent
    pub fn is_early_exit_enabled(&self) -> bool {
        self.convergence_tolerance > 0.0
    }

    /// Get settings as a parameter map (for debugging/serialization)
    pub fn as_parameter_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("algorithm".to_string(), self.algorithm.to_string());
        map.insert("max_evals".to_string(), self.max_evals.to_string());
        map.insert(
            "convergence_tolerance".to_string(),
            self.convergence_tolerance.to_string(),
        );
        map.insert("min_rounds".to_string(), self.min_rounds.to_string());
        map.insert("seed".to_string(), self.seed.to_string());
        map.insert("num_workers".to_string(), self.num_workers.to_string());
        map.insert("batch_size".to_string(), self.batch_size.to_string());
        map.insert(
            "exact_max_features".to_string(),
            self.exact_max_features.to_string(),
        );
        map.insert(
            "max_background_samples".to_string(),
            self.max_background_samples.to_string(),
        );
        map
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(format!("{}{}", ENV_PREFIX, name)).ok()
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ShapError::config(format!("Invalid {}{}: '{}'", ENV_PREFIX, name, value)))
}

/// Builder pattern for settings construction
#[derive(Debug)]
pub struct SettingsBuilder {
    settings: ExplainerSettings,
    validation_errors: Vec<String>,
}

impl SettingsBuilder {
    /// Create a new settings builder
    pub fn new() -> Self {
        SettingsBuilder {
            settings: ExplainerSettings::default(),
            validation_errors: Vec::new(),
        }
    }

    /// Set the attribution algorithm
    pub fn algorithm(mut self, algorithm: Algorithm) -> Self {
        self.settings.algorithm = algorithm;
        self
    }

    /// Set the model evaluation budget
    pub fn max_evals(mut self, max_evals: usize) -> Self {
        if max_evals == 0 {
            self.validation_errors
                .push("max_evals must be positive".to_string());
        }
        self.settings.max_evals = max_evals;
        self
    }

    /// Set the convergence tolerance
    pub fn convergence_tolerance(mut self, tolerance: f64) -> Self {
        if !tolerance.is_finite() || tolerance < 0.0 {
            self.validation_errors
                .push("convergence_tolerance must be finite and non-negative".to_string());
        }
        self.settings.convergence_tolerance = tolerance;
        self
    }

    /// Set the minimum number of rounds
    pub fn min_rounds(mut self, rounds: usize) -> Self {
        if rounds < 1 {
            self.validation_errors
                .push("min_rounds must be at least 1".to_string());
        }
        self.settings.min_rounds = rounds;
        self
    }

    /// Set the random seed
    pub fn seed(mut self, seed: u64) -> Self {
        self.settings.seed = seed;
        self
    }

    /// Set the number of workers
    pub fn num_workers(mut self, workers: usize) -> Self {
        self.settings.num_workers = workers;
        self
    }

    /// Set the batch size
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        if batch_size == 0 {
            self.validation_errors
                .push("batch_size must be positive".to_string());
        }
        self.settings.batch_size = batch_size;
        self
    }

    /// Set the automatic exact-algorithm threshold
    pub fn exact_max_features(mut self, features: usize) -> Self {
        if features > MAX_EXACT_FEATURES {
            self.validation_errors.push(format!(
                "exact_max_features must be at most {}",
                MAX_EXACT_FEATURES
            ));
        }
        self.settings.exact_max_features = features;
        self
    }

    /// Set the number of background rows kept
    pub fn max_background_samples(mut self, samples: usize) -> Self {
        if samples == 0 {
            self.validation_errors
                .push("max_background_samples must be positive".to_string());
        }
        self.settings.max_background_samples = samples;
        self
    }

    /// Build the settings
    pub fn build(self) -> Result<ExplainerSettings> {
        if !self.validation_errors.is_empty() {
            return Err(ShapError::config(format!(
                "Settings validation failed: {}",
                self.validation_errors.join(", ")
            )));
        }

        self.settings.validate()?;
        Ok(self.settings)
    }
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = ExplainerSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.algorithm, Algorithm::Auto);
        assert!(!settings.is_early_exit_enabled());
    }

    #[test]
    fn test_builder() {
        let settings = SettingsBuilder::new()
            .max_evals(1000)
            .seed(7)
            .num_workers(2)
            .convergence_tolerance(1e-4)
            .build()
            .unwrap();

        assert_eq!(settings.max_evals, 1000);
        assert_eq!(settings.seed, 7);
        assert_eq!(settings.effective_num_workers(), 2);
        assert!(settings.is_early_exit_enabled());
    }

    #[test]
    fn test_builder_collects_errors() {
        let err = SettingsBuilder::new()
            .max_evals(0)
            .batch_size(0)
            .build()
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("max_evals"));
        assert!(message.contains("batch_size"));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut settings = ExplainerSettings::default();
        settings.convergence_tolerance = f64::NAN;
        assert!(settings.validate().is_err());

        let mut settings = ExplainerSettings::default();
        settings.exact_max_features = MAX_EXACT_FEATURES + 1;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_effective_workers_zero_means_all_cores() {
        let mut settings = ExplainerSettings::default();
        settings.num_workers = 0;
        assert_eq!(settings.effective_num_workers(), num_cpus::get());
    }

    #[test]
    fn test_toml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");

        let settings = SettingsBuilder::new()
            .algorithm(Algorithm::Permutation)
            .max_evals(250)
            .seed(99)
            .build()
            .unwrap();
        settings.save_to_file(&path).unwrap();

        let loaded = ExplainerSettings::load_from_file(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_json_round_trip_and_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "max_evals": 42 }"#).unwrap();

        let loaded = ExplainerSettings::load_from_file(&path).unwrap();
        assert_eq!(loaded.max_evals, 42);
        assert_eq!(loaded.seed, DEFAULT_RANDOM_SEED);
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        std::fs::write(&path, "max_evals: 3").unwrap();
        assert!(ExplainerSettings::load_from_file(&path).is_err());
    }

    #[test]
    fn test_parameter_map() {
        let map = ExplainerSettings::default().as_parameter_map();
        assert_eq!(map.get("algorithm").map(String::as_str), Some("auto"));
        assert!(map.contains_key("max_evals"));
    }
}
