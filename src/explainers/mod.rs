//! Explainers: dispatch, attribution engines and results.
//!
//! [`Explainer::new`] resolves the algorithm and masker once; every call to
//! [`Explainer::explain`] then prepares the masker for the instance, runs the
//! selected engine and labels the result.

pub mod cancel;
pub mod dispatch;
pub mod exact;
pub(crate) mod evaluator;
pub mod permutation;
pub mod result;

pub use cancel::CancellationToken;
pub use dispatch::{resolve, wrap_rule, ExplainerConfig, MaskerInput, WrapRule};
pub use result::{BatchExplanation, Explanation};

use crate::config::{ExplainerHints, SettingsBuilder};
use crate::core::error::Result;
use crate::core::traits::Model;
use crate::core::types::{Algorithm, Instance, MaskerKind};
use crate::maskers::Masker;
use crate::models::ModelGate;

use evaluator::MaskEvaluator;
use std::sync::{Arc, Mutex};

/// A model bound to a resolved algorithm and masker.
#[derive(Debug)]
pub struct Explainer {
    model: Arc<dyn Model>,
    config: ExplainerConfig,
    // Serializes model calls when the model does not support concurrency
    model_lock: Mutex<()>,
}

impl Explainer {
    /// Resolve an explainer for `model`.
    ///
    /// Fails with a configuration error when no masker is given, when the
    /// masker cannot drive the model, or when the hints are invalid.
    pub fn new<M, I>(model: M, masker: I, hints: ExplainerHints) -> Result<Self>
    where
        M: Model + 'static,
        I: Into<MaskerInput>,
    {
        let model: Arc<dyn Model> = Arc::new(model);
        let config = resolve(model.as_ref(), masker.into(), &hints)?;
        Ok(Explainer {
            model,
            config,
            model_lock: Mutex::new(()),
        })
    }

    pub fn builder() -> ExplainerBuilder {
        ExplainerBuilder::new()
    }

    /// Masker in use, after automatic wrapping.
    pub fn masker(&self) -> &Masker {
        self.config.masker()
    }

    pub fn masker_kind(&self) -> MaskerKind {
        self.config.masker().kind()
    }

    pub fn algorithm(&self) -> Algorithm {
        self.config.algorithm()
    }

    pub fn config(&self) -> &ExplainerConfig {
        &self.config
    }

    pub fn model(&self) -> &Arc<dyn Model> {
        &self.model
    }

    /// Explain one instance.
    pub fn explain(&self, instance: &Instance) -> Result<Explanation> {
        self.explain_with_cancel(instance, &CancellationToken::new())
    }

    /// Explain one instance, stopping early with the best estimate so far
    /// when `cancel` fires.
    ///
    /// Model invocation errors name instance 0, the only instance explained.
    pub fn explain_with_cancel(
        &self,
        instance: &Instance,
        cancel: &CancellationToken,
    ) -> Result<Explanation> {
        self.explain_one(instance, cancel)
            .map_err(|e| e.at_instance(0))
    }

    fn explain_one(&self, instance: &Instance, cancel: &CancellationToken) -> Result<Explanation> {
        let settings = self.config.settings();
        let masker = self.config.masker();
        let model = self.model.as_ref();
        let gate = ModelGate::new(model, &self.model_lock);

        let ctx = masker.prepare(&gate, instance)?;
        let num_groups = masker.num_groups_with(instance, &ctx)?;
        let feature_names = masker.group_names(instance, &ctx)?;
        let evaluator = MaskEvaluator::new(&gate, masker, instance, &ctx, settings.batch_size);

        let algorithm = self.config.algorithm();
        let attribution = match algorithm {
            Algorithm::Exact => exact::exact_attribution(&evaluator, num_groups)?,
            Algorithm::Permutation | Algorithm::Auto => {
                permutation::permutation_attribution(&evaluator, num_groups, settings, cancel)?
            }
        };

        let output_names = model.output_names().map(|names| match &ctx.output_columns {
            Some(columns) => columns
                .iter()
                .filter_map(|&c| names.get(c).cloned())
                .collect(),
            None => names,
        });

        let explanation = Explanation::new(
            attribution,
            instance.clone(),
            feature_names,
            output_names,
            algorithm,
            masker.kind(),
            settings.seed,
        )?;

        if !explanation.satisfies_efficiency(settings.efficiency_tolerance) {
            log::warn!(
                "Efficiency residual {:?} exceeds tolerance {}",
                explanation.sum_check().to_vec(),
                settings.efficiency_tolerance
            );
        }
        log::debug!(
            "Explained {} groups with {} evaluations ({} rounds)",
            num_groups,
            explanation.evaluations(),
            explanation.rounds()
        );
        Ok(explanation)
    }

    /// Explain several instances. A failure aborts only its own instance;
    /// model invocation errors carry the instance's index in `instances`.
    pub fn explain_batch(&self, instances: &[Instance]) -> BatchExplanation {
        let results: Vec<Result<Explanation>> = instances
            .iter()
            .enumerate()
            .map(|(i, instance)| {
                self.explain_one(instance, &CancellationToken::new())
                    .map_err(|e| e.at_instance(i))
            })
            .collect();
        let batch = BatchExplanation::new(results);
        if batch.num_failures() > 0 {
            log::warn!(
                "{} of {} instances failed to explain",
                batch.num_failures(),
                batch.len()
            );
        }
        batch
    }
}

/// Builder for [`Explainer`].
#[derive(Debug, Default)]
pub struct ExplainerBuilder {
    settings: SettingsBuilder,
    hints: ExplainerHints,
    algorithm_name: Option<String>,
}

impl ExplainerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn algorithm(mut self, algorithm: Algorithm) -> Self {
        self.hints = self.hints.algorithm(algorithm);
        self
    }

    /// Algorithm by name; unknown names fail on [`ExplainerBuilder::build`].
    pub fn algorithm_name(mut self, name: &str) -> Self {
        self.algorithm_name = Some(name.to_string());
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.hints = self.hints.seed(seed);
        self
    }

    pub fn top_k(mut self, k: usize) -> Self {
        self.hints = self.hints.top_k(k);
        self
    }

    pub fn max_evals(mut self, max_evals: usize) -> Self {
        self.settings = self.settings.max_evals(max_evals);
        self
    }

    pub fn convergence_tolerance(mut self, tolerance: f64) -> Self {
        self.settings = self.settings.convergence_tolerance(tolerance);
        self
    }

    pub fn min_rounds(mut self, rounds: usize) -> Self {
        self.settings = self.settings.min_rounds(rounds);
        self
    }

    pub fn num_workers(mut self, workers: usize) -> Self {
        self.settings = self.settings.num_workers(workers);
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.settings = self.settings.batch_size(batch_size);
        self
    }

    pub fn exact_max_features(mut self, features: usize) -> Self {
        self.settings = self.settings.exact_max_features(features);
        self
    }

    pub fn max_background_samples(mut self, samples: usize) -> Self {
        self.settings = self.settings.max_background_samples(samples);
        self
    }

    pub fn build<M, I>(self, model: M, masker: I) -> Result<Explainer>
    where
        M: Model + 'static,
        I: Into<MaskerInput>,
    {
        let mut hints = self.hints;
        if let Some(name) = &self.algorithm_name {
            hints = hints.algorithm_name(name)?;
        }
        let settings = self.settings.build()?;
        Explainer::new(model, masker, hints.settings(settings))
    }
}
