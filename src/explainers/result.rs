//! Explanation containers.

use crate::core::error::{ConvergenceWarning, Result, ShapError};
use crate::core::traits::Persistable;
use crate::core::types::{Algorithm, Instance, MaskerKind};

use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Raw output of an attribution engine before it is labelled.
#[derive(Debug, Clone)]
pub(crate) struct Attribution {
    pub values: Array2<f64>,
    pub standard_errors: Array2<f64>,
    pub base_values: Array1<f64>,
    pub full_output: Array1<f64>,
    pub evaluations: usize,
    pub rounds: usize,
    pub converged: bool,
    pub cancelled: bool,
    pub warning: Option<ConvergenceWarning>,
}

/// Attribution of one instance's model output to its feature groups.
///
/// `values` has one row per feature group and one column per model output.
/// For every output, `base_values + sum(values) == full_output` up to
/// floating point error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    values: Array2<f64>,
    standard_errors: Array2<f64>,
    base_values: Array1<f64>,
    full_output: Array1<f64>,
    feature_names: Vec<String>,
    output_names: Option<Vec<String>>,
    data: Instance,
    algorithm: Algorithm,
    masker_kind: MaskerKind,
    seed: u64,
    evaluations: usize,
    rounds: usize,
    converged: bool,
    cancelled: bool,
    warning: Option<ConvergenceWarning>,
    created_at: DateTime<Utc>,
}

impl Explanation {
    pub(crate) fn new(
        attribution: Attribution,
        data: Instance,
        feature_names: Vec<String>,
        output_names: Option<Vec<String>>,
        algorithm: Algorithm,
        masker_kind: MaskerKind,
        seed: u64,
    ) -> Result<Self> {
        let (groups, outputs) = attribution.values.dim();
        if feature_names.len() != groups {
            return Err(ShapError::shape(format!(
                "{} feature names for {} attributed groups",
                feature_names.len(),
                groups
            )));
        }
        // Output names that do not match the explained outputs (e.g. after a
        // top-k restriction) are dropped
        let output_names = output_names.filter(|names| names.len() == outputs);
        Ok(Explanation {
            values: attribution.values,
            standard_errors: attribution.standard_errors,
            base_values: attribution.base_values,
            full_output: attribution.full_output,
            feature_names,
            output_names,
            data,
            algorithm,
            masker_kind,
            seed,
            evaluations: attribution.evaluations,
            rounds: attribution.rounds,
            converged: attribution.converged,
            cancelled: attribution.cancelled,
            warning: attribution.warning,
            created_at: Utc::now(),
        })
    }

    /// Attribution values, (groups x outputs).
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Standard errors of the values; zero for exact attributions.
    pub fn standard_errors(&self) -> &Array2<f64> {
        &self.standard_errors
    }

    /// Model output with every group hidden.
    pub fn base_values(&self) -> &Array1<f64> {
        &self.base_values
    }

    /// Model output with every group kept.
    pub fn full_output(&self) -> &Array1<f64> {
        &self.full_output
    }

    pub fn num_groups(&self) -> usize {
        self.values.nrows()
    }

    pub fn num_outputs(&self) -> usize {
        self.values.ncols()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn output_names(&self) -> Option<&[String]> {
        self.output_names.as_deref()
    }

    /// The explained instance.
    pub fn data(&self) -> &Instance {
        &self.data
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn masker_kind(&self) -> MaskerKind {
        self.masker_kind
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Masks evaluated, endpoints included.
    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    /// Antithetic rounds completed; zero for exact attributions.
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Whether every standard error reached the tolerance before the budget
    /// ran out. Exact attributions are always converged.
    pub fn converged(&self) -> bool {
        self.converged
    }

    pub fn cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn convergence_warning(&self) -> Option<&ConvergenceWarning> {
        self.warning.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Efficiency residual per output: `base + sum(values) - full`.
    pub fn sum_check(&self) -> Array1<f64> {
        &self.base_values + &self.values.sum_axis(Axis(0)) - &self.full_output
    }

    /// Whether every residual is within `tolerance`, relative to the spread
    /// between full and base output (absolute below a spread of 1).
    pub fn satisfies_efficiency(&self, tolerance: f64) -> bool {
        self.sum_check()
            .iter()
            .zip(self.full_output.iter().zip(self.base_values.iter()))
            .all(|(residual, (full, base))| {
                residual.abs() <= tolerance * (full - base).abs().max(1.0)
            })
    }

    /// Feature names with their values for `output`, by decreasing
    /// magnitude.
    pub fn ranked_features(&self, output: usize) -> Result<Vec<(String, f64)>> {
        if output >= self.num_outputs() {
            return Err(ShapError::index_out_of_bounds(output, self.num_outputs()));
        }
        let mut ranked: Vec<(String, f64)> = self
            .feature_names
            .iter()
            .cloned()
            .zip(self.values.column(output).iter().copied())
            .collect();
        ranked.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
        Ok(ranked)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Persistable for Explanation {}

/// Results of explaining several instances. A failure affects only its own
/// instance.
#[derive(Debug)]
pub struct BatchExplanation {
    results: Vec<Result<Explanation>>,
}

impl BatchExplanation {
    pub(crate) fn new(results: Vec<Result<Explanation>>) -> Self {
        BatchExplanation { results }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Result for the instance at `index`.
    pub fn get(&self, index: usize) -> Option<&Result<Explanation>> {
        self.results.get(index)
    }

    pub fn results(&self) -> &[Result<Explanation>] {
        &self.results
    }

    /// Successful explanations with their instance index.
    pub fn successes(&self) -> impl Iterator<Item = (usize, &Explanation)> {
        self.results
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.as_ref().ok().map(|e| (i, e)))
    }

    /// Failures with their instance index.
    pub fn failures(&self) -> impl Iterator<Item = (usize, &ShapError)> {
        self.results
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.as_ref().err().map(|e| (i, e)))
    }

    pub fn num_failures(&self) -> usize {
        self.failures().count()
    }

    pub fn into_results(self) -> Vec<Result<Explanation>> {
        self.results
    }
}
