//! Error handling and error types for Pure Rust SHAP.
//!
//! This module provides the error taxonomy used across explainer
//! construction, masking and attribution. Configuration and shape errors are
//! fatal at the boundary where they are raised; model invocation errors abort
//! only the explanation of the instance that triggered them.

use std::fmt;
use std::io;
use thiserror::Error;

/// Main error type for the SHAP library.
#[derive(Error, Debug)]
pub enum ShapError {
    /// Invalid or missing construction inputs
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Mask or feature count mismatches
    #[error("Shape error: {message}")]
    Shape { message: String },

    /// The wrapped prediction function failed or returned malformed output
    #[error("Model invocation error on instance {instance}: {message}")]
    ModelInvocation { instance: usize, message: String },

    /// Numerical computation errors (overflow, NaN)
    #[error("Numerical error: {message}")]
    Numerical { message: String },

    /// Explanation serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {source}")]
    IO {
        #[from]
        source: io::Error,
    },

    /// CSV parsing errors
    #[cfg(feature = "csv")]
    #[error("CSV parsing error: {source}")]
    Csv {
        #[from]
        source: csv::Error,
    },

    /// JSON serialization errors
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    /// Bincode serialization errors
    #[error("Bincode error: {source}")]
    Bincode {
        #[from]
        source: bincode::Error,
    },

    /// Invalid input parameters
    #[error("Invalid parameter: {parameter} = {value}, {reason}")]
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },

    /// Out of bounds access
    #[error("Index out of bounds: index {index}, length {length}")]
    IndexOutOfBounds { index: usize, length: usize },

    /// Internal library errors (should not occur in normal usage)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Type alias for Results using ShapError
pub type Result<T> = std::result::Result<T, ShapError>;

impl ShapError {
    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        ShapError::Configuration {
            message: message.into(),
        }
    }

    /// Create a shape error
    pub fn shape<S: Into<String>>(message: S) -> Self {
        ShapError::Shape {
            message: message.into(),
        }
    }

    /// Create a model invocation error for the instance at `instance`
    pub fn model_invocation<S: Into<String>>(instance: usize, message: S) -> Self {
        ShapError::ModelInvocation {
            instance,
            message: message.into(),
        }
    }

    /// Create a numerical error
    pub fn numerical<S: Into<String>>(message: S) -> Self {
        ShapError::Numerical {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization<S: Into<String>>(message: S) -> Self {
        ShapError::Serialization {
            message: message.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter<P, V, R>(parameter: P, value: V, reason: R) -> Self
    where
        P: Into<String>,
        V: Into<String>,
        R: Into<String>,
    {
        ShapError::InvalidParameter {
            parameter: parameter.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create an index out of bounds error
    pub fn index_out_of_bounds(index: usize, length: usize) -> Self {
        ShapError::IndexOutOfBounds { index, length }
    }

    /// Create an internal error (should be used sparingly)
    pub fn internal<S: Into<String>>(message: S) -> Self {
        ShapError::Internal {
            message: message.into(),
        }
    }

    /// Re-target a model invocation error at a different instance index.
    ///
    /// The engine raises invocation errors relative to a single explanation;
    /// batch drivers use this to report the position inside the caller's batch.
    pub fn at_instance(self, index: usize) -> Self {
        match self {
            ShapError::ModelInvocation { message, .. } => ShapError::ModelInvocation {
                instance: index,
                message,
            },
            other => other,
        }
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            ShapError::Configuration { .. } => false,
            ShapError::Shape { .. } => false,
            ShapError::ModelInvocation { .. } => true,
            ShapError::Numerical { .. } => true,
            ShapError::Serialization { .. } => false,
            ShapError::IO { .. } => false,
            #[cfg(feature = "csv")]
            ShapError::Csv { .. } => false,
            ShapError::Json { .. } => false,
            ShapError::Bincode { .. } => false,
            ShapError::InvalidParameter { .. } => false,
            ShapError::IndexOutOfBounds { .. } => false,
            ShapError::Internal { .. } => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            ShapError::Configuration { .. } => "configuration",
            ShapError::Shape { .. } => "shape",
            ShapError::ModelInvocation { .. } => "model_invocation",
            ShapError::Numerical { .. } => "numerical",
            ShapError::Serialization { .. } => "serialization",
            ShapError::IO { .. } => "io",
            #[cfg(feature = "csv")]
            ShapError::Csv { .. } => "csv",
            ShapError::Json { .. } => "json",
            ShapError::Bincode { .. } => "bincode",
            ShapError::InvalidParameter { .. } => "invalid_parameter",
            ShapError::IndexOutOfBounds { .. } => "index_out_of_bounds",
            ShapError::Internal { .. } => "internal",
        }
    }
}

/// Non-fatal notice that the sampling budget ran out before the standard
/// error tolerance was met. The explanation is still returned, flagged as
/// approximate.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ConvergenceWarning {
    /// Largest per-feature standard error when sampling stopped
    pub max_standard_error: f64,
    /// Tolerance that was requested
    pub tolerance: f64,
    /// Model evaluations spent
    pub evaluations: usize,
}

impl fmt::Display for ConvergenceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sampling budget exhausted after {} evaluations: max standard error {:.3e} > tolerance {:.3e}",
            self.evaluations, self.max_standard_error, self.tolerance
        )
    }
}

/// Convenience macros for error creation
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::core::error::ShapError::config($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::core::error::ShapError::config(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! shape_error {
    ($msg:expr) => {
        $crate::core::error::ShapError::shape($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::core::error::ShapError::shape(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !($cond) {
            return Err($err.into());
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = ShapError::config("masker cannot be None");
        assert_eq!(err.category(), "configuration");
        assert!(!err.is_recoverable());

        let err = ShapError::model_invocation(3, "boom");
        assert_eq!(err.category(), "model_invocation");
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_error_macros() {
        let err = config_error!("test error");
        assert!(matches!(err, ShapError::Configuration { .. }));

        let err = shape_error!("mask length {} != {}", 3, 4);
        assert!(matches!(err, ShapError::Shape { .. }));
        assert!(err.to_string().contains("mask length 3 != 4"));
    }

    #[test]
    fn test_at_instance_retargets_only_model_errors() {
        let err = ShapError::model_invocation(0, "nan output").at_instance(7);
        match err {
            ShapError::ModelInvocation { instance, .. } => assert_eq!(instance, 7),
            other => panic!("unexpected error: {other:?}"),
        }

        let err = ShapError::shape("bad").at_instance(7);
        assert!(matches!(err, ShapError::Shape { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = ShapError::config("masker cannot be None");
        let error_string = format!("{}", err);
        assert!(error_string.contains("Configuration error"));
        assert!(error_string.contains("masker cannot be None"));
    }

    #[test]
    fn test_convergence_warning_display() {
        let warning = ConvergenceWarning {
            max_standard_error: 0.5,
            tolerance: 0.01,
            evaluations: 500,
        };
        assert!(warning.to_string().contains("500 evaluations"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let shap_err: ShapError = io_err.into();
        assert!(matches!(shap_err, ShapError::IO { .. }));
        assert_eq!(shap_err.category(), "io");
    }
}
