//! Core trait definitions for Pure Rust SHAP.
//!
//! This module defines the collaborator seams of the explainer: the model
//! adapter every explanation evaluates, the tokenizer the text masker relies
//! on, and persistence for result objects.

use crate::core::error::{Result, ShapError};
use crate::core::types::*;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use std::fmt::Debug;
use std::sync::Arc;

/// Uniform prediction interface over an arbitrary black-box function.
///
/// `predict` maps a batch of instances to one output row per instance. The
/// engine assumes the same instance always produces the same row.
pub trait Model: Send + Sync + Debug {
    /// Evaluate the model on a batch of instances.
    fn predict(&self, batch: &[Instance]) -> Result<Array2<f64>>;

    /// Declared modality, consulted by the dispatch resolver.
    fn kind(&self) -> ModelKind {
        ModelKind::Generic
    }

    /// Whether `predict` may be called from several threads at once.
    /// When false, calls on one explainer are serialized.
    fn supports_concurrency(&self) -> bool {
        false
    }

    /// Vocabulary size the model expects token ids to index into.
    fn vocab_size(&self) -> Option<usize> {
        None
    }

    /// Reference output sequence for `instance`, for models that score
    /// masked inputs against a fixed target.
    fn reference_output(&self, _instance: &Instance) -> Result<Option<Instance>> {
        Ok(None)
    }

    /// Names of the output columns, when known.
    fn output_names(&self) -> Option<Vec<String>> {
        None
    }
}

impl<M: Model + ?Sized> Model for Arc<M> {
    fn predict(&self, batch: &[Instance]) -> Result<Array2<f64>> {
        (**self).predict(batch)
    }

    fn kind(&self) -> ModelKind {
        (**self).kind()
    }

    fn supports_concurrency(&self) -> bool {
        (**self).supports_concurrency()
    }

    fn vocab_size(&self) -> Option<usize> {
        (**self).vocab_size()
    }

    fn reference_output(&self, instance: &Instance) -> Result<Option<Instance>> {
        (**self).reference_output(instance)
    }

    fn output_names(&self) -> Option<Vec<String>> {
        (**self).output_names()
    }
}

/// Tokenizer collaborator used by the text masker.
pub trait Tokenizer: Send + Sync + Debug {
    /// Encode text, including any boundary tokens the tokenizer adds.
    fn encode(&self, text: &str) -> Result<Vec<TokenId>>;

    /// Decode token ids back to text.
    fn decode(&self, tokens: &[TokenId]) -> Result<String>;

    /// Size of the vocabulary.
    fn vocab_size(&self) -> usize;

    /// Dedicated mask token, if the tokenizer has one.
    fn mask_token_id(&self) -> Option<TokenId> {
        None
    }

    /// Special tokens are never masked and never counted as features.
    fn is_special(&self, _token: TokenId) -> bool {
        false
    }

    /// True for sub-word pieces that continue the previous token's word.
    fn is_continuation(&self, _token: TokenId) -> bool {
        false
    }
}

/// Trait for serializable result objects.
pub trait Persistable: Serialize + for<'de> Deserialize<'de> {
    /// Save to a file with bincode.
    fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path)?;
        bincode::serialize_into(file, self)
            .map_err(|e| ShapError::serialization(format!("Failed to serialize: {}", e)))
    }

    /// Load from a file written by [`Persistable::save_to_file`].
    fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self>
    where
        Self: Sized,
    {
        let file = std::fs::File::open(path)?;
        bincode::deserialize_from(file)
            .map_err(|e| ShapError::serialization(format!("Failed to deserialize: {}", e)))
    }
}
