//! # Pure Rust SHAP
//!
//! Shapley-value explanations of black-box models: attribute a model's output
//! for one instance to the instance's features by hiding features and
//! observing how the output moves.
//!
//! ## Features
//!
//! - **Explainer dispatch**: [`Explainer::new`] inspects the model, the masker
//!   (or raw background data) and optional hints, wraps the masker when the
//!   model needs it, and selects the attribution algorithm.
//! - **Permutation attribution**: antithetic permutation sampling with running
//!   standard errors, early exit on a tolerance, a hard evaluation budget and
//!   seeded, reproducible parallel workers.
//! - **Exact attribution**: exhaustive enumeration for small feature counts.
//! - **Maskers**: tabular background replacement, text token masking, image
//!   patch filling, and composites that fix the output columns or pair masked
//!   inputs with a reference output sequence.
//!
//! ## Quick Start
//!
//! ```rust
//! use shap_rust::{Explainer, ExplainerHints, FnModel, Instance};
//! use ndarray::array;
//!
//! # fn main() -> shap_rust::Result<()> {
//! // f(x) = 2 x0 - x1
//! let model = FnModel::tabular(1, |x| vec![2.0 * x[0] - x[1]]);
//! let background = array![[0.0, 0.0], [1.0, 1.0]];
//!
//! let explainer = Explainer::new(model, background, ExplainerHints::new().seed(42))?;
//! let explanation = explainer.explain(&Instance::tabular(&[3.0, 1.0]))?;
//!
//! // base value + sum of attributions == model output
//! assert!(explanation.satisfies_efficiency(1e-9));
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`core`]: types, constants, error handling and the collaborator traits
//! - [`config`]: explainer settings and per-construction hints
//! - [`maskers`]: masking strategies
//! - [`models`]: closure-backed model adapters
//! - [`explainers`]: dispatch, attribution engines and explanation results

#![doc(html_root_url = "https://docs.rs/shap-rust/")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(
    missing_debug_implementations,
    rust_2018_idioms,
    non_snake_case,
    non_upper_case_globals
)]

// Core infrastructure module - always available
pub mod core;

// Configuration management module
pub mod config;

// Masking strategies
pub mod maskers;

// Model adapters
pub mod models;

// Dispatch, attribution engines and results
pub mod explainers;

// Re-export core functionality for convenience
pub use self::core::{
    constants::*,
    error::{ConvergenceWarning, Result, ShapError},
    traits::*,
    types::*,
};

// Re-export configuration functionality
pub use config::{ExplainerHints, ExplainerSettings, SettingsBuilder};

// Re-export maskers
pub use maskers::{
    FeatureMask, FeaturePartition, FixedComposite, ImageFill, ImageMasker, MaskToken, Masker,
    OutputComposite, TabularMasker, TextMasker,
};

// Re-export model adapters
pub use models::{FnModel, TeacherForcing, TopKLm};

// Re-export explainers
pub use explainers::{
    BatchExplanation, CancellationToken, Explainer, ExplainerBuilder, ExplainerConfig,
    Explanation, MaskerInput, WrapRule,
};

// Version information
pub use self::core::constants::SHAP_RUST_VERSION as VERSION;

/// Initialize the library: logging and capability detection.
///
/// Optional; explainers work without it, but log output only appears once a
/// logger is installed.
///
/// # Examples
///
/// ```rust
/// fn main() -> shap_rust::Result<()> {
///     shap_rust::init()?;
///     Ok(())
/// }
/// ```
pub fn init() -> Result<()> {
    self::core::initialize_core()
}

/// Check if the library has been initialized.
pub fn is_initialized() -> bool {
    self::core::is_core_initialized()
}

/// Get library capabilities and feature information.
///
/// # Examples
///
/// ```rust
/// let caps = shap_rust::capabilities();
/// println!("{}", caps.summary());
/// ```
pub fn capabilities() -> self::core::CoreCapabilities {
    self::core::core_capabilities()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_initialization() {
        assert!(init().is_ok());
        assert!(is_initialized());
        assert!(init().is_ok());
    }

    #[test]
    fn test_capabilities() {
        let caps = capabilities();
        assert!(caps.parallel_workers);
        assert!(caps.serialization);
        assert_eq!(caps.csv_loading, cfg!(feature = "csv"));
    }

    #[test]
    fn test_version_info() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_error_integration() {
        let err = ShapError::config("test error");
        assert_eq!(err.category(), "configuration");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_send_sync() {
        static_assertions::assert_impl_all!(Explainer: Send, Sync);
        static_assertions::assert_impl_all!(Masker: Send, Sync);
        static_assertions::assert_impl_all!(CancellationToken: Send, Sync);
    }
}
