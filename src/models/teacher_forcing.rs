//! Teacher-forced sequence scorer.
//!
//! Scores a fixed target sequence under a (masked) source sequence: one
//! output column per target token, each the score of that token given the
//! source and the preceding target tokens. The reference target is produced
//! once from the unmasked input by a generator.

use crate::core::error::{Result, ShapError};
use crate::core::traits::Model;
use crate::core::types::{Instance, ModelKind, TokenId};

use ndarray::{Array1, Array2};
use std::fmt;
use std::sync::Arc;

type ScoreFn = dyn Fn(&[TokenId], &[TokenId]) -> Result<Vec<f64>> + Send + Sync;
type GenerateFn = dyn Fn(&Instance) -> Result<Vec<TokenId>> + Send + Sync;

/// Sequence-to-sequence model scored against a reference output.
#[derive(Clone)]
pub struct TeacherForcing {
    score: Arc<ScoreFn>,
    generate: Arc<GenerateFn>,
    vocab_size: Option<usize>,
}

impl TeacherForcing {
    /// `score(source, target)` returns one value per target token;
    /// `generate(instance)` produces the reference target for an unmasked input.
    pub fn new<S, G>(score: S, generate: G) -> Self
    where
        S: Fn(&[TokenId], &[TokenId]) -> Result<Vec<f64>> + Send + Sync + 'static,
        G: Fn(&Instance) -> Result<Vec<TokenId>> + Send + Sync + 'static,
    {
        TeacherForcing {
            score: Arc::new(score),
            generate: Arc::new(generate),
            vocab_size: None,
        }
    }

    pub fn with_vocab_size(mut self, vocab_size: usize) -> Self {
        self.vocab_size = Some(vocab_size);
        self
    }
}

impl fmt::Debug for TeacherForcing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TeacherForcing")
            .field("vocab_size", &self.vocab_size)
            .finish()
    }
}

fn tokens<'a>(instance: &'a Instance, position: usize, role: &str) -> Result<&'a [TokenId]> {
    instance.as_tokens().ok_or_else(|| {
        ShapError::model_invocation(
            position,
            format!(
                "teacher forcing expects a token {}, got {}",
                role,
                instance.variant_name()
            ),
        )
    })
}

impl Model for TeacherForcing {
    fn predict(&self, batch: &[Instance]) -> Result<Array2<f64>> {
        let mut rows: Vec<Vec<f64>> = Vec::with_capacity(batch.len());
        for (i, instance) in batch.iter().enumerate() {
            let (input, target) = instance.as_paired().ok_or_else(|| {
                ShapError::model_invocation(
                    i,
                    format!(
                        "teacher forcing expects paired inputs, got {}",
                        instance.variant_name()
                    ),
                )
            })?;
            let source = tokens(input, i, "source")?;
            let target = tokens(target, i, "target")?;
            let scores = (self.score)(source, target).map_err(|e| e.at_instance(i))?;
            if scores.len() != target.len() {
                return Err(ShapError::model_invocation(
                    i,
                    format!(
                        "scorer returned {} values for {} target tokens",
                        scores.len(),
                        target.len()
                    ),
                ));
            }
            rows.push(scores);
        }

        let width = rows.first().map_or(0, Vec::len);
        if let Some(i) = rows.iter().position(|r| r.len() != width) {
            return Err(ShapError::model_invocation(
                i,
                "target length differs within one batch",
            ));
        }
        let mut outputs = Array2::zeros((rows.len(), width));
        for (i, row) in rows.into_iter().enumerate() {
            outputs.row_mut(i).assign(&Array1::from_vec(row));
        }
        Ok(outputs)
    }

    fn kind(&self) -> ModelKind {
        ModelKind::SequenceToSequence
    }

    fn vocab_size(&self) -> Option<usize> {
        self.vocab_size
    }

    fn reference_output(&self, instance: &Instance) -> Result<Option<Instance>> {
        Ok(Some(Instance::Tokens((self.generate)(instance)?)))
    }
}
