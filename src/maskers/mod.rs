//! Masking strategies.
//!
//! A masker turns an instance and a [`FeatureMask`] over its feature groups
//! into one or more masked instances the model can evaluate. The set of
//! strategies is closed: [`Masker`] is an enum over the tabular, text and
//! image leaves and the two composite wrappers, and every operation the
//! attribution engines need (group count, masking, output transformation) is
//! answered at any level of a composite chain by delegation.
//!
//! Masks use the convention `true` = keep the original value,
//! `false` = hide it.

pub mod composite;
pub mod image;
pub mod partition;
pub mod tabular;
pub mod text;

pub use composite::{FixedComposite, OutputComposite};
pub use image::{ImageFill, ImageMasker};
pub use partition::{FeatureMask, FeaturePartition};
pub use tabular::TabularMasker;
pub use text::{MaskToken, TextMasker};

use crate::core::error::Result;
use crate::core::types::{Instance, MaskerKind, TokenId};
use crate::models::ModelGate;
use ndarray::Array2;

/// Per-instance state computed once before masking starts.
///
/// Leaves cache their tokenization here; composites store the reference
/// output or fixed output columns. Nested composites nest their contexts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaskingContext {
    /// Token ids of the instance, cached by the text masker
    pub tokens: Option<Vec<TokenId>>,
    /// Reference output sequence paired with every masked input
    pub reference: Option<Instance>,
    /// Output columns kept by a fixed composite
    pub output_columns: Option<Vec<usize>>,
    /// Context of the wrapped masker
    pub inner: Option<Box<MaskingContext>>,
}

impl MaskingContext {
    /// Context of the wrapped masker, or an empty one.
    pub fn inner_or_default(&self) -> MaskingContext {
        self.inner.as_deref().cloned().unwrap_or_default()
    }
}

/// A masking strategy.
#[derive(Debug, Clone)]
pub enum Masker {
    /// Background-value replacement for numeric features
    Tabular(TabularMasker),
    /// Token replacement or removal
    Text(TextMasker),
    /// Image patch fill
    Image(ImageMasker),
    /// Output columns fixed to the unmasked top-k
    FixedComposite(FixedComposite),
    /// Masked inputs paired with a reference output sequence
    OutputComposite(OutputComposite),
}

impl Masker {
    /// Variant tag of this masker.
    pub fn kind(&self) -> MaskerKind {
        match self {
            Masker::Tabular(_) => MaskerKind::Tabular,
            Masker::Text(_) => MaskerKind::Text,
            Masker::Image(_) => MaskerKind::Image,
            Masker::FixedComposite(_) => MaskerKind::FixedComposite,
            Masker::OutputComposite(_) => MaskerKind::OutputComposite,
        }
    }

    /// The wrapped masker, for composites.
    pub fn inner(&self) -> Option<&Masker> {
        match self {
            Masker::FixedComposite(c) => Some(c.inner()),
            Masker::OutputComposite(c) => Some(c.inner()),
            _ => None,
        }
    }

    /// Kinds from the outermost wrapper down to the leaf.
    pub fn chain(&self) -> Vec<MaskerKind> {
        let mut kinds = vec![self.kind()];
        let mut current = self;
        while let Some(inner) = current.inner() {
            kinds.push(inner.kind());
            current = inner;
        }
        kinds
    }

    /// The leaf masker at the bottom of a composite chain.
    pub fn leaf(&self) -> &Masker {
        let mut current = self;
        while let Some(inner) = current.inner() {
            current = inner;
        }
        current
    }

    /// Whether this masker wraps another one.
    pub fn is_composite(&self) -> bool {
        self.kind().is_composite()
    }

    /// Feature group count when it does not depend on the instance.
    pub fn static_num_groups(&self) -> Option<usize> {
        match self {
            Masker::Tabular(m) => Some(m.num_groups()),
            _ => self.inner().and_then(Masker::static_num_groups),
        }
    }

    /// Number of maskable feature groups of `instance`.
    pub fn num_groups(&self, instance: &Instance) -> Result<usize> {
        self.num_groups_with(instance, &MaskingContext::default())
    }

    /// Group count using a prepared context.
    pub fn num_groups_with(&self, instance: &Instance, ctx: &MaskingContext) -> Result<usize> {
        match self {
            Masker::Tabular(m) => m.num_groups_for(instance),
            Masker::Text(m) => m.num_groups_for(instance, ctx),
            Masker::Image(m) => m.num_groups_for(instance),
            Masker::FixedComposite(c) => c.inner().num_groups_with(instance, &ctx.inner_or_default()),
            Masker::OutputComposite(c) => c.inner().num_groups_with(instance, &ctx.inner_or_default()),
        }
    }

    /// Display names of the feature groups of `instance`.
    pub fn group_names(&self, instance: &Instance, ctx: &MaskingContext) -> Result<Vec<String>> {
        match self {
            Masker::Tabular(m) => m.group_names(),
            Masker::Text(m) => m.group_names(instance, ctx),
            Masker::Image(m) => m.group_names(instance),
            Masker::FixedComposite(c) => c.inner().group_names(instance, &ctx.inner_or_default()),
            Masker::OutputComposite(c) => c.inner().group_names(instance, &ctx.inner_or_default()),
        }
    }

    /// Compute per-instance state. Composites may call the model here, through
    /// the explanation's gate.
    pub(crate) fn prepare(&self, model: &ModelGate<'_>, instance: &Instance) -> Result<MaskingContext> {
        match self {
            Masker::Tabular(_) | Masker::Image(_) => Ok(MaskingContext::default()),
            Masker::Text(m) => m.prepare(instance),
            Masker::FixedComposite(c) => c.prepare(model, instance),
            Masker::OutputComposite(c) => c.prepare(model, instance),
        }
    }

    /// Produce the masked variants of `instance` for `mask`.
    ///
    /// Fails with a shape error when the mask length differs from the group
    /// count of the instance.
    pub fn mask(
        &self,
        instance: &Instance,
        mask: &FeatureMask,
        ctx: &MaskingContext,
    ) -> Result<Vec<Instance>> {
        match self {
            Masker::Tabular(m) => m.mask(instance, mask),
            Masker::Text(m) => m.mask(instance, mask, ctx),
            Masker::Image(m) => m.mask(instance, mask),
            Masker::FixedComposite(c) => c.mask(instance, mask, ctx),
            Masker::OutputComposite(c) => c.mask(instance, mask, ctx),
        }
    }

    /// Transform the model's output rows for masked variants.
    pub fn transform_output(&self, outputs: Array2<f64>, ctx: &MaskingContext) -> Result<Array2<f64>> {
        match self {
            Masker::Tabular(_) | Masker::Text(_) | Masker::Image(_) => Ok(outputs),
            Masker::FixedComposite(c) => c.transform_output(outputs, ctx),
            Masker::OutputComposite(c) => c.transform_output(outputs, ctx),
        }
    }
}

impl From<TabularMasker> for Masker {
    fn from(masker: TabularMasker) -> Self {
        Masker::Tabular(masker)
    }
}

impl From<TextMasker> for Masker {
    fn from(masker: TextMasker) -> Self {
        Masker::Text(masker)
    }
}

impl From<ImageMasker> for Masker {
    fn from(masker: ImageMasker) -> Self {
        Masker::Image(masker)
    }
}

impl From<FixedComposite> for Masker {
    fn from(masker: FixedComposite) -> Self {
        Masker::FixedComposite(masker)
    }
}

impl From<OutputComposite> for Masker {
    fn from(masker: OutputComposite) -> Self {
        Masker::OutputComposite(masker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn tabular() -> Masker {
        TabularMasker::new(array![[0.0, 0.0, 0.0]]).unwrap().into()
    }

    #[test]
    fn test_leaf_introspection() {
        let masker = tabular();
        assert_eq!(masker.kind(), MaskerKind::Tabular);
        assert!(!masker.is_composite());
        assert!(masker.inner().is_none());
        assert_eq!(masker.chain(), vec![MaskerKind::Tabular]);
        assert_eq!(masker.static_num_groups(), Some(3));
    }

    #[test]
    fn test_composite_chain_delegates() {
        let masker: Masker = FixedComposite::new(tabular(), 2).unwrap().into();
        assert_eq!(masker.kind(), MaskerKind::FixedComposite);
        assert_eq!(masker.chain(), vec![MaskerKind::FixedComposite, MaskerKind::Tabular]);
        assert_eq!(masker.leaf().kind(), MaskerKind::Tabular);
        assert_eq!(masker.static_num_groups(), Some(3));

        let instance = Instance::tabular(&[1.0, 2.0, 3.0]);
        assert_eq!(masker.num_groups(&instance).unwrap(), 3);

        let mask = FeatureMask::from_kept(3, &[1]).unwrap();
        let variants = masker.mask(&instance, &mask, &MaskingContext::default()).unwrap();
        assert_eq!(variants, vec![Instance::tabular(&[0.0, 2.0, 0.0])]);
    }

    #[test]
    fn test_mask_length_mismatch_is_shape_error() {
        let masker = tabular();
        let instance = Instance::tabular(&[1.0, 2.0, 3.0]);
        let err = masker
            .mask(&instance, &FeatureMask::all_kept(2), &MaskingContext::default())
            .unwrap_err();
        assert_eq!(err.category(), "shape");
    }
}
