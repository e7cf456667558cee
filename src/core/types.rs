//! Core data types for the Pure Rust SHAP implementation.
//!
//! This module defines the instance representation handed to maskers and
//! models, and the small closed enumerations the dispatch resolver uses to
//! classify models, maskers and attribution algorithms.

use ndarray::{Array1, Array3};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Token identifier produced by a tokenizer.
pub type TokenId = u32;

/// A single input to explain or to feed to a model.
///
/// Instances are immutable once handed to the engine; maskers always build
/// new instances rather than editing the one they were given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instance {
    /// Numeric feature vector
    Tabular(Array1<f64>),
    /// Raw text, tokenized by a text masker
    Text(String),
    /// Token id sequence
    Tokens(Vec<TokenId>),
    /// Image as (height, width, channels)
    Image(Array3<f64>),
    /// Masked input paired with a fixed reference output sequence
    Paired {
        /// Model input
        input: Box<Instance>,
        /// Reference output the model scores against
        target: Box<Instance>,
    },
}

impl Instance {
    /// Build a tabular instance from a slice of values.
    pub fn tabular(values: &[f64]) -> Self {
        Instance::Tabular(Array1::from_vec(values.to_vec()))
    }

    /// Build a text instance.
    pub fn text<S: Into<String>>(text: S) -> Self {
        Instance::Text(text.into())
    }

    /// Short name of the variant, used in error messages.
    pub fn variant_name(&self) -> &'static str {
        match self {
            Instance::Tabular(_) => "tabular",
            Instance::Text(_) => "text",
            Instance::Tokens(_) => "tokens",
            Instance::Image(_) => "image",
            Instance::Paired { .. } => "paired",
        }
    }

    /// Numeric view of a tabular instance.
    pub fn as_tabular(&self) -> Option<&Array1<f64>> {
        match self {
            Instance::Tabular(values) => Some(values),
            _ => None,
        }
    }

    /// Token view of a token instance.
    pub fn as_tokens(&self) -> Option<&[TokenId]> {
        match self {
            Instance::Tokens(tokens) => Some(tokens),
            _ => None,
        }
    }

    /// Split a paired instance into (input, target).
    pub fn as_paired(&self) -> Option<(&Instance, &Instance)> {
        match self {
            Instance::Paired { input, target } => Some((input, target)),
            _ => None,
        }
    }
}

impl From<Array1<f64>> for Instance {
    fn from(values: Array1<f64>) -> Self {
        Instance::Tabular(values)
    }
}

impl From<Vec<f64>> for Instance {
    fn from(values: Vec<f64>) -> Self {
        Instance::Tabular(Array1::from_vec(values))
    }
}

impl From<&str> for Instance {
    fn from(text: &str) -> Self {
        Instance::Text(text.to_string())
    }
}

/// Declared modality of a model adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    /// Numeric feature vectors in, scores out
    Tabular,
    /// Teacher-forced sequence-to-sequence scorer
    SequenceToSequence,
    /// Causal language model emitting next-token scores
    CausalLm,
    /// Language model restricted to its top-k next tokens
    TopKLm {
        /// Number of tokens kept
        k: usize,
    },
    /// Anything else
    Generic,
}

impl Default for ModelKind {
    fn default() -> Self {
        ModelKind::Generic
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Tabular => write!(f, "tabular"),
            ModelKind::SequenceToSequence => write!(f, "seq2seq"),
            ModelKind::CausalLm => write!(f, "causal_lm"),
            ModelKind::TopKLm { k } => write!(f, "topk_lm(k={})", k),
            ModelKind::Generic => write!(f, "generic"),
        }
    }
}

/// Closed set of masker variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaskerKind {
    /// Background-value replacement for numeric features
    Tabular,
    /// Token replacement or removal
    Text,
    /// Image patch fill
    Image,
    /// Wrapper fixing the output dimensions to the unmasked top-k
    FixedComposite,
    /// Wrapper pairing masked inputs with a reference output sequence
    OutputComposite,
}

impl MaskerKind {
    /// Whether this kind wraps another masker.
    pub fn is_composite(&self) -> bool {
        matches!(self, MaskerKind::FixedComposite | MaskerKind::OutputComposite)
    }
}

impl fmt::Display for MaskerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaskerKind::Tabular => write!(f, "tabular"),
            MaskerKind::Text => write!(f, "text"),
            MaskerKind::Image => write!(f, "image"),
            MaskerKind::FixedComposite => write!(f, "fixed_composite"),
            MaskerKind::OutputComposite => write!(f, "output_composite"),
        }
    }
}

/// Attribution algorithm identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    /// Let the resolver decide
    Auto,
    /// Antithetic permutation sampling
    Permutation,
    /// Exhaustive enumeration of all coalitions
    Exact,
}

impl Default for Algorithm {
    fn default() -> Self {
        Algorithm::Auto
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::Auto => write!(f, "auto"),
            Algorithm::Permutation => write!(f, "permutation"),
            Algorithm::Exact => write!(f, "exact"),
        }
    }
}

impl FromStr for Algorithm {
    type Err = crate::core::error::ShapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Algorithm::Auto),
            "permutation" => Ok(Algorithm::Permutation),
            "exact" => Ok(Algorithm::Exact),
            "tree" | "kernel" | "linear" | "partition" | "deep" | "gradient" | "additive" => {
                Err(crate::core::error::ShapError::config(format!(
                    "algorithm '{}' is not supported by this explainer; use 'auto', 'permutation' or 'exact'",
                    s
                )))
            }
            _ => Err(crate::core::error::ShapError::config(format!(
                "unknown algorithm '{}'",
                s
            ))),
        }
    }
}
