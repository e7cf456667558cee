//! Configuration management for Pure Rust SHAP.
//!
//! [`ExplainerSettings`] carries the tunables shared by every explainer
//! (budget, tolerance, seed, workers); [`ExplainerHints`] carries the
//! per-construction overrides the dispatch resolver consults.

pub mod core;
pub mod hints;

// Re-export commonly used configuration types
pub use self::core::{ExplainerSettings, SettingsBuilder};
pub use self::hints::ExplainerHints;
