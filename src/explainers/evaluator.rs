//! Batched evaluation of feature masks.
//!
//! Every mask expands into one or more masked variants. Variants of all masks
//! in a call are scored together in chunks of `batch_size`, passed through
//! the masker's output transform, and averaged back to one row per mask.

use crate::core::error::{Result, ShapError};
use crate::core::types::Instance;
use crate::maskers::{FeatureMask, Masker, MaskingContext};
use crate::models::ModelGate;

use ndarray::{concatenate, s, Array2, Axis};
use std::ops::Range;

/// Model plus masker bound to one prepared instance.
pub(crate) struct MaskEvaluator<'a> {
    gate: &'a ModelGate<'a>,
    masker: &'a Masker,
    instance: &'a Instance,
    ctx: &'a MaskingContext,
    batch_size: usize,
}

impl<'a> MaskEvaluator<'a> {
    pub(crate) fn new(
        gate: &'a ModelGate<'a>,
        masker: &'a Masker,
        instance: &'a Instance,
        ctx: &'a MaskingContext,
        batch_size: usize,
    ) -> Self {
        MaskEvaluator {
            gate,
            masker,
            instance,
            ctx,
            batch_size: batch_size.max(1),
        }
    }

    /// Averaged, transformed model output for each mask; one row per mask.
    pub(crate) fn evaluate(&self, masks: &[FeatureMask]) -> Result<Array2<f64>> {
        if masks.is_empty() {
            return Err(ShapError::internal("no masks to evaluate"));
        }
        let mut variants = Vec::new();
        let mut spans: Vec<Range<usize>> = Vec::with_capacity(masks.len());
        for mask in masks {
            let start = variants.len();
            variants.extend(self.masker.mask(self.instance, mask, self.ctx)?);
            if variants.len() == start {
                return Err(ShapError::internal("masker produced no variants"));
            }
            spans.push(start..variants.len());
        }

        let mut chunks = Vec::with_capacity(variants.len() / self.batch_size + 1);
        for chunk in variants.chunks(self.batch_size) {
            chunks.push(self.gate.predict(chunk)?);
        }
        let views: Vec<_> = chunks.iter().map(Array2::view).collect();
        let raw = concatenate(Axis(0), &views).map_err(|e| {
            ShapError::model_invocation(0, format!("model output columns differ between calls: {}", e))
        })?;
        let outputs = self.masker.transform_output(raw, self.ctx)?;
        if outputs.nrows() != variants.len() {
            return Err(ShapError::shape(format!(
                "output transform returned {} rows for {} variants",
                outputs.nrows(),
                variants.len()
            )));
        }

        let mut averaged = Array2::zeros((masks.len(), outputs.ncols()));
        for (mut row, span) in averaged.outer_iter_mut().zip(spans) {
            if let Some(mean) = outputs.slice(s![span, ..]).mean_axis(Axis(0)) {
                row.assign(&mean);
            }
        }
        Ok(averaged)
    }

    /// Masks already charged to this explanation before attribution started.
    pub(crate) fn spent(&self) -> usize {
        self.gate.spent()
    }
}
