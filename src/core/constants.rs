//! System constants and default configuration values for Pure Rust SHAP.
//!
//! Defaults for sampling budget and convergence are tuning choices, not
//! guarantees; every one of them can be overridden through
//! [`crate::config::ExplainerSettings`].

/// Default budget of model evaluations per explained instance.
pub const DEFAULT_MAX_EVALS: usize = 500;

/// Default standard error tolerance for early exit.
/// Zero disables the early exit so sampling runs to the budget.
pub const DEFAULT_CONVERGENCE_TOLERANCE: f64 = 0.0;

/// Minimum number of antithetic rounds before convergence is checked.
/// A standard error needs at least two samples to be defined.
pub const DEFAULT_MIN_ROUNDS: usize = 2;

/// Default random seed.
pub const DEFAULT_RANDOM_SEED: u64 = 0;

/// Default number of parallel workers (1 = single-threaded).
pub const DEFAULT_NUM_WORKERS: usize = 1;

/// Default maximum number of masked instances per model call.
pub const DEFAULT_BATCH_SIZE: usize = 512;

/// Default number of background rows a tabular masker keeps.
pub const DEFAULT_MAX_BACKGROUND_SAMPLES: usize = 100;

/// Default feature count at or below which `Algorithm::Auto` picks the exact
/// explainer. Zero keeps the permutation explainer as the only automatic choice.
pub const DEFAULT_EXACT_MAX_FEATURES: usize = 0;

/// Hard ceiling for exhaustive enumeration (2^16 coalitions).
pub const MAX_EXACT_FEATURES: usize = 16;

/// Default number of next tokens kept by a top-k language model adapter.
pub const DEFAULT_TOP_K: usize = 10;

/// Default patch edge length, in pixels, for the image masker.
pub const DEFAULT_IMAGE_PATCH_SIZE: usize = 8;

/// Mask token text used by the text masker when none is configured.
pub const DEFAULT_MASK_TOKEN: &str = "...";

/// Relative tolerance used when checking the efficiency property.
pub const DEFAULT_EFFICIENCY_TOLERANCE: f64 = 1e-3;

/// Probability clamp used when converting probabilities to log-odds.
pub const PROBABILITY_CLAMP: f64 = 1e-12;

/// Prefix of environment variables read by the settings loader.
pub const ENV_PREFIX: &str = "SHAP_RUST_";

/// Version information.
pub const SHAP_RUST_VERSION: &str = env!("CARGO_PKG_VERSION");


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        assert!(DEFAULT_CONVERGENCE_TOLERANCE >= 0.0);
        assert!(DEFAULT_EFFICIENCY_TOLERANCE > 0.0);
        assert!(PROBABILITY_CLAMP > 0.0 && PROBABILITY_CLAMP < 0.5);
        assert!(DEFAULT_IMAGE_PATCH_SIZE > 0);
        assert!(!DEFAULT_MASK_TOKEN.is_empty());
    }

    #[test]
    fn test_version_constants() {
        assert!(!SHAP_RUST_VERSION.is_empty());
        assert!(ENV_PREFIX.ends_with('_'));
    }
}
