//! Composite maskers wrapping another masker.
//!
//! [`FixedComposite`] fixes the model's output columns to the top-k columns
//! of the unmasked instance, so every masked variant is scored on the same
//! outputs. [`OutputComposite`] pairs every masked input with the reference
//! output sequence of the unmasked instance, for teacher-forced scoring.

use crate::core::error::{Result, ShapError};
use crate::core::types::Instance;
use crate::maskers::partition::FeatureMask;
use crate::maskers::{Masker, MaskingContext};
use crate::models::ModelGate;

use ndarray::{Array2, Axis};

/// Output-column restriction to the top-k unmasked outputs.
#[derive(Debug, Clone)]
pub struct FixedComposite {
    inner: Box<Masker>,
    k: usize,
}

impl FixedComposite {
    pub fn new(inner: Masker, k: usize) -> Result<Self> {
        if k == 0 {
            return Err(ShapError::invalid_parameter("k", "0", "must be positive"));
        }
        Ok(FixedComposite {
            inner: Box::new(inner),
            k,
        })
    }

    pub fn inner(&self) -> &Masker {
        &self.inner
    }

    /// Number of output columns kept.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Scores the unmasked instance once and fixes the top-k output columns,
    /// highest first. The scoring counts as one mask evaluation.
    pub(crate) fn prepare(&self, model: &ModelGate<'_>, instance: &Instance) -> Result<MaskingContext> {
        let inner_ctx = self.inner.prepare(model, instance)?;
        let num_groups = self.inner.num_groups_with(instance, &inner_ctx)?;
        let variants = self
            .inner
            .mask(instance, &FeatureMask::all_kept(num_groups), &inner_ctx)?;
        let outputs = model.predict(&variants)?;
        model.charge(1);
        let outputs = self.inner.transform_output(outputs, &inner_ctx)?;
        let unmasked = outputs
            .mean_axis(Axis(0))
            .ok_or_else(|| ShapError::internal("unmasked instance produced no output rows"))?;

        if self.k > unmasked.len() {
            log::warn!(
                "Top-{} requested but the model has {} outputs; keeping all",
                self.k,
                unmasked.len()
            );
        }
        let mut columns: Vec<usize> = (0..unmasked.len()).collect();
        columns.sort_by(|&a, &b| unmasked[b].total_cmp(&unmasked[a]).then(a.cmp(&b)));
        columns.truncate(self.k);
        log::debug!("Fixed output columns: {:?}", columns);

        Ok(MaskingContext {
            output_columns: Some(columns),
            inner: Some(Box::new(inner_ctx)),
            ..MaskingContext::default()
        })
    }

    pub(crate) fn mask(
        &self,
        instance: &Instance,
        mask: &FeatureMask,
        ctx: &MaskingContext,
    ) -> Result<Vec<Instance>> {
        self.inner.mask(instance, mask, &ctx.inner_or_default())
    }

    pub(crate) fn transform_output(&self, outputs: Array2<f64>, ctx: &MaskingContext) -> Result<Array2<f64>> {
        let outputs = self.inner.transform_output(outputs, &ctx.inner_or_default())?;
        match &ctx.output_columns {
            Some(columns) => {
                if let Some(&bad) = columns.iter().find(|&&c| c >= outputs.ncols()) {
                    return Err(ShapError::shape(format!(
                        "fixed output column {} is outside the model's {} outputs",
                        bad,
                        outputs.ncols()
                    )));
                }
                Ok(outputs.select(Axis(1), columns))
            }
            None => Ok(outputs),
        }
    }
}

/// Pairs masked inputs with the reference output of the unmasked instance.
#[derive(Debug, Clone)]
pub struct OutputComposite {
    inner: Box<Masker>,
}

impl OutputComposite {
    pub fn new(inner: Masker) -> Self {
        OutputComposite {
            inner: Box::new(inner),
        }
    }

    pub fn inner(&self) -> &Masker {
        &self.inner
    }

    pub(crate) fn prepare(&self, model: &ModelGate<'_>, instance: &Instance) -> Result<MaskingContext> {
        let inner_ctx = self.inner.prepare(model, instance)?;
        let reference = model.reference_output(instance)?.ok_or_else(|| {
            ShapError::config("model provides no reference output for an output composite masker")
        })?;
        Ok(MaskingContext {
            reference: Some(reference),
            inner: Some(Box::new(inner_ctx)),
            ..MaskingContext::default()
        })
    }

    pub(crate) fn mask(
        &self,
        instance: &Instance,
        mask: &FeatureMask,
        ctx: &MaskingContext,
    ) -> Result<Vec<Instance>> {
        let reference = ctx.reference.as_ref().ok_or_else(|| {
            ShapError::internal("output composite masker used before prepare")
        })?;
        Ok(self
            .inner
            .mask(instance, mask, &ctx.inner_or_default())?
            .into_iter()
            .map(|input| Instance::Paired {
                input: Box::new(input),
                target: Box::new(reference.clone()),
            })
            .collect())
    }

    pub(crate) fn transform_output(&self, outputs: Array2<f64>, ctx: &MaskingContext) -> Result<Array2<f64>> {
        self.inner.transform_output(outputs, &ctx.inner_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maskers::TabularMasker;
    use crate::models::FnModel;
    use ndarray::array;
    use std::sync::Mutex;

    fn tabular() -> Masker {
        TabularMasker::new(array![[0.0, 0.0]]).unwrap().into()
    }

    /// Outputs [x0, x1, x0 + x1].
    fn model() -> FnModel {
        FnModel::tabular(3, |row| vec![row[0], row[1], row[0] + row[1]])
    }

    #[test]
    fn test_fixed_composite_selects_top_k() {
        let composite = FixedComposite::new(tabular(), 2).unwrap();
        let instance = Instance::tabular(&[1.0, 5.0]);
        let model = model();
        let lock = Mutex::new(());
        let gate = ModelGate::new(&model, &lock);
        let ctx = composite.prepare(&gate, &instance).unwrap();
        assert_eq!(ctx.output_columns, Some(vec![2, 1]));
        assert_eq!(gate.spent(), 1);

        let outputs = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let fixed = composite.transform_output(outputs, &ctx).unwrap();
        assert_eq!(fixed, array![[3.0, 2.0], [6.0, 5.0]]);
    }

    #[test]
    fn test_fixed_composite_rejects_zero_k() {
        assert!(FixedComposite::new(tabular(), 0).is_err());
    }

    #[test]
    fn test_output_composite_requires_reference() {
        let composite = OutputComposite::new(tabular());
        let model = model();
        let lock = Mutex::new(());
        let gate = ModelGate::new(&model, &lock);
        let err = composite
            .prepare(&gate, &Instance::tabular(&[1.0, 2.0]))
            .unwrap_err();
        assert_eq!(err.category(), "configuration");
        assert_eq!(gate.spent(), 0);
    }

    #[test]
    fn test_output_composite_pairs_variants() {
        let composite = OutputComposite::new(tabular());
        let ctx = MaskingContext {
            reference: Some(Instance::Tokens(vec![7, 8])),
            ..MaskingContext::default()
        };
        let instance = Instance::tabular(&[1.0, 2.0]);
        let mask = FeatureMask::from_kept(2, &[0]).unwrap();
        let variants = composite.mask(&instance, &mask, &ctx).unwrap();
        assert_eq!(
            variants,
            vec![Instance::Paired {
                input: Box::new(Instance::tabular(&[1.0, 0.0])),
                target: Box::new(Instance::Tokens(vec![7, 8])),
            }]
        );
    }
}
