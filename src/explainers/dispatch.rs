//! Explainer dispatch: pick an algorithm and a compatible masker.
//!
//! Resolution never calls the model. It looks only at the model's declared
//! kind and vocabulary, the masker (or raw background data) and the hints,
//! and consults a fixed rule table keyed by (model kind, masker kind).

use crate::config::{ExplainerHints, ExplainerSettings};
use crate::core::error::{Result, ShapError};
use crate::core::traits::Model;
use crate::core::types::{Algorithm, MaskerKind, ModelKind};
use crate::maskers::{
    FixedComposite, ImageMasker, Masker, OutputComposite, TabularMasker, TextMasker,
};

use ndarray::Array2;

/// What the caller supplied in the masker position.
#[derive(Debug, Clone)]
pub enum MaskerInput {
    /// Nothing; always rejected
    None,
    /// A ready masker
    Masker(Masker),
    /// Raw tabular background data, wrapped in a [`TabularMasker`]
    Data(Array2<f64>),
}

impl From<Masker> for MaskerInput {
    fn from(masker: Masker) -> Self {
        MaskerInput::Masker(masker)
    }
}

impl From<Option<Masker>> for MaskerInput {
    fn from(masker: Option<Masker>) -> Self {
        masker.map_or(MaskerInput::None, MaskerInput::Masker)
    }
}

impl From<Array2<f64>> for MaskerInput {
    fn from(data: Array2<f64>) -> Self {
        MaskerInput::Data(data)
    }
}

impl From<TabularMasker> for MaskerInput {
    fn from(masker: TabularMasker) -> Self {
        MaskerInput::Masker(masker.into())
    }
}

impl From<TextMasker> for MaskerInput {
    fn from(masker: TextMasker) -> Self {
        MaskerInput::Masker(masker.into())
    }
}

impl From<ImageMasker> for MaskerInput {
    fn from(masker: ImageMasker) -> Self {
        MaskerInput::Masker(masker.into())
    }
}

impl From<FixedComposite> for MaskerInput {
    fn from(masker: FixedComposite) -> Self {
        MaskerInput::Masker(masker.into())
    }
}

impl From<OutputComposite> for MaskerInput {
    fn from(masker: OutputComposite) -> Self {
        MaskerInput::Masker(masker.into())
    }
}

/// How the resolver adapts a masker to a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapRule {
    /// Use the masker as given
    Keep,
    /// Pair masked inputs with the model's reference output
    OutputComposite,
    /// Fix the output columns to the top `k` of the unmasked instance
    FixedComposite { k: usize },
    /// Incompatible pairing
    Reject(&'static str),
}

/// The dispatch rule for a (model kind, masker kind) pair.
pub fn wrap_rule(model: ModelKind, masker: MaskerKind) -> WrapRule {
    use MaskerKind as K;
    use ModelKind as M;

    match (model, masker) {
        // Already composed by the caller
        (_, K::FixedComposite) | (_, K::OutputComposite) => WrapRule::Keep,

        (M::SequenceToSequence, K::Text) => WrapRule::OutputComposite,
        (M::TopKLm { k }, K::Text) => WrapRule::FixedComposite { k },
        (M::CausalLm, K::Text) => WrapRule::Keep,
        (M::SequenceToSequence | M::CausalLm | M::TopKLm { .. }, K::Tabular) => {
            WrapRule::Reject("a tabular masker cannot drive a text model")
        }
        (M::SequenceToSequence | M::CausalLm | M::TopKLm { .. }, K::Image) => {
            WrapRule::Reject("an image masker cannot drive a text model")
        }

        (M::Tabular, K::Tabular) => WrapRule::Keep,
        (M::Tabular, K::Text) => WrapRule::Reject("a text masker cannot drive a tabular model"),
        (M::Tabular, K::Image) => WrapRule::Reject("an image masker cannot drive a tabular model"),

        (M::Generic, _) => WrapRule::Keep,
    }
}

/// Resolved, immutable explainer configuration.
#[derive(Debug, Clone)]
pub struct ExplainerConfig {
    algorithm: Algorithm,
    masker: Masker,
    model_kind: ModelKind,
    rule: WrapRule,
    settings: ExplainerSettings,
}

impl ExplainerConfig {
    /// Concrete algorithm; never [`Algorithm::Auto`].
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Masker after automatic wrapping.
    pub fn masker(&self) -> &Masker {
        &self.masker
    }

    pub fn model_kind(&self) -> ModelKind {
        self.model_kind
    }

    /// Rule that produced the masker.
    pub fn rule(&self) -> WrapRule {
        self.rule
    }

    pub fn settings(&self) -> &ExplainerSettings {
        &self.settings
    }

    pub fn seed(&self) -> u64 {
        self.settings.seed
    }

    pub fn max_evals(&self) -> usize {
        self.settings.max_evals
    }
}

/// Resolve the explainer configuration for `model` and `input`.
pub fn resolve(model: &dyn Model, input: MaskerInput, hints: &ExplainerHints) -> Result<ExplainerConfig> {
    let settings = hints.resolve_settings()?;

    let masker = match input {
        MaskerInput::None => return Err(ShapError::config("masker cannot be None")),
        MaskerInput::Data(data) => {
            TabularMasker::with_max_samples(data, settings.max_background_samples, settings.seed)?
                .into()
        }
        MaskerInput::Masker(masker) => masker,
    };

    check_vocabulary(model, &masker)?;

    let model_kind = match (model.kind(), hints.top_k) {
        (ModelKind::TopKLm { .. }, Some(k)) => ModelKind::TopKLm { k },
        (kind, _) => kind,
    };
    let rule = wrap_rule(model_kind, masker.kind());
    let masker = match rule {
        WrapRule::Keep => masker,
        WrapRule::OutputComposite => OutputComposite::new(masker).into(),
        WrapRule::FixedComposite { k } => FixedComposite::new(masker, k)?.into(),
        WrapRule::Reject(reason) => {
            return Err(ShapError::config(format!(
                "{} masker is incompatible with a {} model: {}",
                masker.kind(),
                model_kind,
                reason
            )))
        }
    };

    let algorithm = select_algorithm(&settings, &masker);
    log::info!(
        "Resolved {} explainer for {} model with masker chain {:?}",
        algorithm,
        model_kind,
        masker.chain()
    );

    Ok(ExplainerConfig {
        algorithm,
        masker,
        model_kind,
        rule,
        settings,
    })
}

fn check_vocabulary(model: &dyn Model, masker: &Masker) -> Result<()> {
    if let (Masker::Text(text), Some(model_vocab)) = (masker.leaf(), model.vocab_size()) {
        if text.vocab_size() != model_vocab {
            return Err(crate::config_error!(
                "tokenizer vocabulary of {} does not match the model vocabulary of {}",
                text.vocab_size(),
                model_vocab
            ));
        }
    }
    Ok(())
}

fn select_algorithm(settings: &ExplainerSettings, masker: &Masker) -> Algorithm {
    match settings.algorithm {
        Algorithm::Auto => match masker.static_num_groups() {
            Some(groups) if settings.exact_max_features > 0 && groups <= settings.exact_max_features => {
                Algorithm::Exact
            }
            _ => Algorithm::Permutation,
        },
        explicit => explicit,
    }
}
