//! Next-token language model explained on its top-k tokens.
//!
//! The wrapped closure returns next-token logits over the whole vocabulary.
//! Outputs are reported as log-odds, `log(p / (1 - p))` of the softmax
//! probabilities, one column per vocabulary entry; the fixed composite
//! masker narrows them to the k most likely tokens of the unmasked text.

use crate::core::constants::{DEFAULT_TOP_K, PROBABILITY_CLAMP};
use crate::core::error::{Result, ShapError};
use crate::core::traits::Model;
use crate::core::types::{Instance, ModelKind, TokenId};

use ndarray::Array2;
use std::fmt;
use std::sync::Arc;

type LogitsFn = dyn Fn(&[TokenId]) -> Result<Vec<f64>> + Send + Sync;

/// Causal LM adapter restricted to its top-k next tokens.
#[derive(Clone)]
pub struct TopKLm {
    logits: Arc<LogitsFn>,
    vocab_size: usize,
    k: usize,
}

impl TopKLm {
    pub fn new<F>(vocab_size: usize, logits: F) -> Self
    where
        F: Fn(&[TokenId]) -> Result<Vec<f64>> + Send + Sync + 'static,
    {
        TopKLm {
            logits: Arc::new(logits),
            vocab_size,
            k: DEFAULT_TOP_K.min(vocab_size.max(1)),
        }
    }

    /// Number of next tokens explained. Fails for `k == 0`.
    pub fn with_k(mut self, k: usize) -> Result<Self> {
        if k == 0 {
            return Err(ShapError::invalid_parameter("k", "0", "must be positive"));
        }
        self.k = k;
        Ok(self)
    }

    pub fn k(&self) -> usize {
        self.k
    }
}

impl fmt::Debug for TopKLm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TopKLm")
            .field("vocab_size", &self.vocab_size)
            .field("k", &self.k)
            .finish()
    }
}

/// Log-odds of the softmax of `logits`.
fn log_odds(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|&l| (l - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.iter()
        .map(|&e| {
            let p = (e / total).clamp(PROBABILITY_CLAMP, 1.0 - PROBABILITY_CLAMP);
            (p / (1.0 - p)).ln()
        })
        .collect()
}

impl Model for TopKLm {
    fn predict(&self, batch: &[Instance]) -> Result<Array2<f64>> {
        let mut outputs = Array2::zeros((batch.len(), self.vocab_size));
        for (i, instance) in batch.iter().enumerate() {
            let tokens = instance.as_tokens().ok_or_else(|| {
                ShapError::model_invocation(
                    i,
                    format!("language model expects tokens, got {}", instance.variant_name()),
                )
            })?;
            let logits = (self.logits)(tokens).map_err(|e| e.at_instance(i))?;
            if let Some(bad) = logits.iter().find(|l| !l.is_finite()) {
                return Err(ShapError::numerical(format!(
                    "non-finite logit {} for instance {}",
                    bad, i
                )));
            }
            if logits.len() != self.vocab_size {
                return Err(ShapError::model_invocation(
                    i,
                    format!(
                        "expected {} logits, got {}",
                        self.vocab_size,
                        logits.len()
                    ),
                ));
            }
            for (slot, value) in outputs.row_mut(i).iter_mut().zip(log_odds(&logits)) {
                *slot = value;
            }
        }
        Ok(outputs)
    }

    fn kind(&self) -> ModelKind {
        ModelKind::TopKLm { k: self.k }
    }

    fn vocab_size(&self) -> Option<usize> {
        Some(self.vocab_size)
    }
}
