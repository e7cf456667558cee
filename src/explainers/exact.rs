//! Exhaustive Shapley values over all coalitions.
//!
//! Evaluates every one of the `2^m` masks and weights each marginal
//! contribution by `|S|! (m - |S| - 1)! / m!`. Only practical for small group
//! counts; the ceiling is [`MAX_EXACT_FEATURES`].

use crate::core::constants::MAX_EXACT_FEATURES;
use crate::core::error::{Result, ShapError};
use crate::explainers::evaluator::MaskEvaluator;
use crate::explainers::result::Attribution;
use crate::maskers::FeatureMask;

use ndarray::Array2;

/// Shapley weight of a coalition of `size` groups out of `m`, for one group
/// outside the coalition.
fn coalition_weights(m: usize) -> Vec<f64> {
    let factorial = |n: usize| (1..=n).fold(1.0_f64, |acc, k| acc * k as f64);
    let total = factorial(m);
    (0..m)
        .map(|size| factorial(size) * factorial(m - size - 1) / total)
        .collect()
}

fn mask_of(coalition: usize, m: usize) -> FeatureMask {
    FeatureMask::from_bools((0..m).map(|g| coalition & (1 << g) != 0).collect())
}

pub(crate) fn exact_attribution(evaluator: &MaskEvaluator<'_>, num_groups: usize) -> Result<Attribution> {
    let m = num_groups;
    if m > MAX_EXACT_FEATURES {
        return Err(ShapError::config(format!(
            "exact explanation of {} feature groups exceeds the limit of {}; use the permutation algorithm",
            m, MAX_EXACT_FEATURES
        )));
    }

    let coalitions = 1_usize << m;
    let masks: Vec<FeatureMask> = (0..coalitions).map(|c| mask_of(c, m)).collect();
    let outputs = evaluator.evaluate(&masks)?;
    log::debug!("Exact explanation evaluated {} coalitions", coalitions);

    let weights = coalition_weights(m);
    let mut values = Array2::zeros((m, outputs.ncols()));
    for coalition in 0..coalitions {
        let size = coalition.count_ones() as usize;
        for group in (0..m).filter(|&g| coalition & (1 << g) == 0) {
            let delta = &outputs.row(coalition | (1 << group)) - &outputs.row(coalition);
            values.row_mut(group).scaled_add(weights[size], &delta);
        }
    }

    Ok(Attribution {
        standard_errors: Array2::zeros(values.dim()),
        values,
        base_values: outputs.row(0).to_owned(),
        full_output: outputs.row(coalitions - 1).to_owned(),
        evaluations: evaluator.spent() + coalitions,
        rounds: 0,
        converged: true,
        cancelled: false,
        warning: None,
    })
}
