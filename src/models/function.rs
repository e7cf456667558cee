//! Closure-backed model adapter.

use crate::core::error::{Result, ShapError};
use crate::core::traits::Model;
use crate::core::types::{Instance, ModelKind};

use ndarray::{Array1, Array2};
use std::fmt;
use std::sync::Arc;

type BatchFn = dyn Fn(&[Instance]) -> Result<Array2<f64>> + Send + Sync;

/// Model backed by a batch scoring closure.
#[derive(Clone)]
pub struct FnModel {
    func: Arc<BatchFn>,
    kind: ModelKind,
    concurrent: bool,
    vocab_size: Option<usize>,
    output_names: Option<Vec<String>>,
}

impl FnModel {
    /// Wrap a closure mapping a batch to one output row per instance.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&[Instance]) -> Result<Array2<f64>> + Send + Sync + 'static,
    {
        FnModel {
            func: Arc::new(func),
            kind: ModelKind::Generic,
            concurrent: false,
            vocab_size: None,
            output_names: None,
        }
    }

    /// Wrap a per-row scoring closure over tabular instances producing
    /// `num_outputs` values.
    pub fn tabular<F>(num_outputs: usize, func: F) -> Self
    where
        F: Fn(&Array1<f64>) -> Vec<f64> + Send + Sync + 'static,
    {
        let batch_fn = move |batch: &[Instance]| -> Result<Array2<f64>> {
            let mut outputs = Array2::zeros((batch.len(), num_outputs));
            for (i, instance) in batch.iter().enumerate() {
                let values = instance.as_tabular().ok_or_else(|| {
                    ShapError::model_invocation(
                        i,
                        format!("tabular model received a {} instance", instance.variant_name()),
                    )
                })?;
                let row = func(values);
                if row.len() != num_outputs {
                    return Err(ShapError::model_invocation(
                        i,
                        format!("expected {} outputs, got {}", num_outputs, row.len()),
                    ));
                }
                outputs.row_mut(i).assign(&Array1::from_vec(row));
            }
            Ok(outputs)
        };
        FnModel::new(batch_fn).with_kind(ModelKind::Tabular)
    }

    pub fn with_kind(mut self, kind: ModelKind) -> Self {
        self.kind = kind;
        self
    }

    /// Allow concurrent `predict` calls.
    pub fn concurrent(mut self, concurrent: bool) -> Self {
        self.concurrent = concurrent;
        self
    }

    pub fn with_vocab_size(mut self, vocab_size: usize) -> Self {
        self.vocab_size = Some(vocab_size);
        self
    }

    pub fn with_output_names(mut self, names: Vec<String>) -> Self {
        self.output_names = Some(names);
        self
    }
}

impl fmt::Debug for FnModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnModel")
            .field("kind", &self.kind)
            .field("concurrent", &self.concurrent)
            .field("vocab_size", &self.vocab_size)
            .finish()
    }
}

impl Model for FnModel {
    fn predict(&self, batch: &[Instance]) -> Result<Array2<f64>> {
        (self.func)(batch)
    }

    fn kind(&self) -> ModelKind {
        self.kind
    }

    fn supports_concurrency(&self) -> bool {
        self.concurrent
    }

    fn vocab_size(&self) -> Option<usize> {
        self.vocab_size
    }

    fn output_names(&self) -> Option<Vec<String>> {
        self.output_names.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_tabular_model() {
        let model = FnModel::tabular(2, |x| vec![x.sum(), x[0] * 2.0]);
        assert_eq!(model.kind(), ModelKind::Tabular);
        let outputs = model
            .predict(&[Instance::tabular(&[1.0, 2.0]), Instance::tabular(&[3.0, 0.0])])
            .unwrap();
        assert_eq!(outputs, array![[3.0, 2.0], [3.0, 6.0]]);
    }

    #[test]
    fn test_tabular_model_rejects_other_instances() {
        let model = FnModel::tabular(1, |x| vec![x.sum()]);
        let err = model
            .predict(&[Instance::tabular(&[1.0]), Instance::text("x")])
            .unwrap_err();
        match err {
            ShapError::ModelInvocation { instance, .. } => assert_eq!(instance, 1),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_builder_flags() {
        let model = FnModel::new(|batch| Ok(Array2::zeros((batch.len(), 1))))
            .concurrent(true)
            .with_vocab_size(10)
            .with_output_names(vec!["score".into()]);
        assert!(model.supports_concurrency());
        assert_eq!(model.vocab_size(), Some(10));
        assert_eq!(model.output_names(), Some(vec!["score".to_string()]));
        assert_eq!(model.kind(), ModelKind::Generic);
    }
}
