//! Core infrastructure module for Pure Rust SHAP.
//!
//! This module provides the foundational components shared by maskers, model
//! adapters and explainers.
//!
//! # Organization
//!
//! - [`types`]: Instances and the model / masker / algorithm classifications
//! - [`constants`]: Configuration defaults
//! - [`error`]: Error taxonomy
//! - [`traits`]: Model and tokenizer collaborator traits
//! - [`utils`]: Seeded random streams and running statistics
//!
//! # Usage
//!
//! ```rust
//! use shap_rust::core::{
//!     types::{Instance, ModelKind},
//!     constants::DEFAULT_MAX_EVALS,
//!     error::{Result, ShapError},
//! };
//!
//! let instance = Instance::tabular(&[1.0, 2.0, 3.0]);
//! assert_eq!(instance.variant_name(), "tabular");
//! assert!(DEFAULT_MAX_EVALS > 0);
//! ```

// Public module declarations
pub mod constants;
pub mod error;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used items for convenience
pub use constants::*;
pub use error::{ConvergenceWarning, Result, ShapError};
pub use traits::*;
pub use types::*;

use std::sync::OnceLock;

/// Version information for the core module
pub const CORE_MODULE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core module features and capabilities
#[derive(Debug, Clone)]
pub struct CoreCapabilities {
    /// Rayon-backed parallel permutation workers
    pub parallel_workers: bool,
    /// Background loading from CSV files
    pub csv_loading: bool,
    /// Explanation persistence (bincode / JSON)
    pub serialization: bool,
    /// Number of logical CPUs visible to the worker pool
    pub available_cpus: usize,
}

impl Default for CoreCapabilities {
    fn default() -> Self {
        CoreCapabilities {
            parallel_workers: true,
            csv_loading: cfg!(feature = "csv"),
            serialization: true,
            available_cpus: num_cpus::get(),
        }
    }
}

impl CoreCapabilities {
    /// Get current core capabilities
    pub fn current() -> Self {
        Self::default()
    }

    /// Get a summary of available capabilities
    pub fn summary(&self) -> String {
        let mut features = Vec::new();

        if self.parallel_workers {
            features.push(format!("Parallel Workers ({} cpus)", self.available_cpus));
        }
        if self.csv_loading {
            features.push("CSV Background".to_string());
        }
        if self.serialization {
            features.push("Serialization".to_string());
        }

        format!("Core capabilities: {}", features.join(", "))
    }
}

static CORE_CAPABILITIES: OnceLock<CoreCapabilities> = OnceLock::new();

/// Initialize the global core module: logging and capability detection.
/// Calling it more than once is harmless.
pub fn initialize_core() -> Result<()> {
    let mut first = false;
    let caps = CORE_CAPABILITIES.get_or_init(|| {
        first = true;
        initialize_logging();
        CoreCapabilities::current()
    });
    if first {
        log::info!("Core module initialized successfully");
        log::debug!("{}", caps.summary());
    }
    Ok(())
}

/// Initialize logging subsystem
fn initialize_logging() {
    // Default to info when the caller has not configured RUST_LOG
    let env = env_logger::Env::default().default_filter_or("info");
    // Another logger may already be installed by the host application
    let _ = env_logger::Builder::from_env(env).try_init();
}

/// Check if the core module is initialized
pub fn is_core_initialized() -> bool {
    CORE_CAPABILITIES.get().is_some()
}

/// Get current core capabilities
pub fn core_capabilities() -> CoreCapabilities {
    CORE_CAPABILITIES.get().cloned().unwrap_or_default()
}
