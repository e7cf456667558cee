//! Antithetic permutation sampling of Shapley values.
//!
//! Each round draws a random ordering of the feature groups. The forward
//! pass starts from the all-hidden mask and reveals groups in that order; the
//! reverse pass starts from the all-kept mask and hides them in the same
//! order. The marginal contribution of every group is the average of its
//! forward and reverse deltas, so each round's contributions sum exactly to
//! `full - base`. The two endpoint outputs are computed once per instance,
//! so a round costs `2 * (m - 1)` mask evaluations. Masks the masker scored
//! while preparing the instance come out of the same `max_evals` budget.
//!
//! Rounds are split across workers, each with its own seeded stream
//! (`seed + worker_index`). Worker statistics are merged in worker order, so
//! the result depends only on the seed and the worker count.

use crate::config::ExplainerSettings;
use crate::core::error::{ConvergenceWarning, Result, ShapError};
use crate::core::utils::random::Random;
use crate::core::utils::stats::RunningStats;
use crate::explainers::cancel::CancellationToken;
use crate::explainers::evaluator::MaskEvaluator;
use crate::explainers::result::Attribution;
use crate::maskers::FeatureMask;

use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;

/// Masks evaluated by one antithetic round over `num_groups` groups.
pub fn round_cost(num_groups: usize) -> usize {
    2 * num_groups.saturating_sub(1)
}

/// Smallest budget that fits the endpoints plus one round.
pub fn minimum_budget(num_groups: usize) -> usize {
    2 + round_cost(num_groups)
}

struct WorkerOutcome {
    stats: RunningStats,
    rounds: usize,
    cancelled: bool,
}

struct Endpoints {
    base: Array1<f64>,
    full: Array1<f64>,
}

pub(crate) fn permutation_attribution(
    evaluator: &MaskEvaluator<'_>,
    num_groups: usize,
    settings: &ExplainerSettings,
    cancel: &CancellationToken,
) -> Result<Attribution> {
    let m = num_groups;
    let spent = evaluator.spent();
    let endpoint_outputs =
        evaluator.evaluate(&[FeatureMask::all_hidden(m), FeatureMask::all_kept(m)])?;
    let endpoints = Endpoints {
        base: endpoint_outputs.row(0).to_owned(),
        full: endpoint_outputs.row(1).to_owned(),
    };
    let outputs = endpoints.base.len();

    // With at most one group the attribution is exact from the endpoints
    if m <= 1 {
        let values = if m == 1 {
            (&endpoints.full - &endpoints.base).insert_axis(Axis(0))
        } else {
            Array2::zeros((0, outputs))
        };
        return Ok(Attribution {
            standard_errors: Array2::zeros(values.dim()),
            values,
            base_values: endpoints.base,
            full_output: endpoints.full,
            evaluations: spent + 2,
            rounds: 0,
            converged: true,
            cancelled: false,
            warning: None,
        });
    }

    let per_round = round_cost(m);
    let available = settings.max_evals.saturating_sub(spent);
    if available < minimum_budget(m) {
        return Err(ShapError::config(format!(
            "max_evals = {} is too low for one permutation round over {} feature groups; \
             at least {} evaluations are needed",
            settings.max_evals,
            m,
            spent + minimum_budget(m)
        )));
    }
    let total_rounds = (available - 2) / per_round;
    let workers = settings.effective_num_workers().clamp(1, total_rounds);
    let quotas: Vec<usize> = (0..workers)
        .map(|i| total_rounds / workers + usize::from(i < total_rounds % workers))
        .collect();
    // Each worker holds 1/workers of the samples; merged errors shrink by sqrt(workers)
    let local_tolerance = settings.convergence_tolerance * (workers as f64).sqrt();

    log::debug!(
        "Permutation sampling: {} groups, {} rounds across {} workers",
        m,
        total_rounds,
        workers
    );

    let run = |(index, &rounds): (usize, &usize)| {
        run_worker(
            evaluator,
            &endpoints,
            m,
            rounds,
            Random::for_worker(settings.seed, index),
            settings,
            local_tolerance,
            cancel,
        )
    };
    let outcomes: Vec<WorkerOutcome> = if workers == 1 {
        quotas.iter().enumerate().map(run).collect::<Result<Vec<_>>>()?
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| ShapError::internal(format!("Failed to create worker pool: {}", e)))?;
        pool.install(|| quotas.par_iter().enumerate().map(run).collect::<Result<Vec<_>>>())?
    };

    let mut merged = RunningStats::new(m, outputs);
    let mut rounds = 0;
    let mut cancelled = false;
    for outcome in &outcomes {
        merged.merge(&outcome.stats);
        rounds += outcome.rounds;
        cancelled |= outcome.cancelled;
    }

    let evaluations = spent + 2 + rounds * per_round;
    let tolerance = settings.convergence_tolerance;
    let max_standard_error = merged.max_standard_error();
    let converged = tolerance > 0.0 && max_standard_error <= tolerance;
    let warning = if tolerance > 0.0 && !converged && !cancelled {
        let warning = ConvergenceWarning {
            max_standard_error,
            tolerance,
            evaluations,
        };
        log::warn!("{}", warning);
        Some(warning)
    } else {
        None
    };

    Ok(Attribution {
        values: merged.mean().clone(),
        standard_errors: merged.standard_error(),
        base_values: endpoints.base,
        full_output: endpoints.full,
        evaluations,
        rounds,
        converged,
        cancelled,
        warning,
    })
}

#[allow(clippy::too_many_arguments)]
fn run_worker(
    evaluator: &MaskEvaluator<'_>,
    endpoints: &Endpoints,
    m: usize,
    rounds: usize,
    mut rng: Random,
    settings: &ExplainerSettings,
    local_tolerance: f64,
    cancel: &CancellationToken,
) -> Result<WorkerOutcome> {
    let outputs = endpoints.base.len();
    let mut stats = RunningStats::new(m, outputs);
    let mut done = 0;
    let mut cancelled = false;

    while done < rounds {
        let order = rng.permutation(m);
        let masks = round_masks(&order)?;
        let evaluated = evaluator.evaluate(&masks)?;
        stats.push(&antithetic_contributions(&order, &evaluated, endpoints));
        done += 1;

        if cancel.is_cancelled() {
            log::warn!(
                "Explanation cancelled after {} rounds (worker seed {})",
                done,
                rng.seed()
            );
            cancelled = true;
            break;
        }
        if local_tolerance > 0.0
            && stats.count() >= settings.min_rounds
            && stats.max_standard_error() <= local_tolerance
        {
            log::debug!("Worker converged after {} rounds", done);
            break;
        }
    }

    Ok(WorkerOutcome {
        stats,
        rounds: done,
        cancelled,
    })
}

/// Forward masks (revealing `order[..m-1]` one at a time from all hidden)
/// followed by reverse masks (hiding them one at a time from all kept).
fn round_masks(order: &[usize]) -> Result<Vec<FeatureMask>> {
    let m = order.len();
    let mut masks = Vec::with_capacity(round_cost(m));
    let mut forward = FeatureMask::all_hidden(m);
    for &group in &order[..m - 1] {
        forward.set(group, true)?;
        masks.push(forward.clone());
    }
    let mut reverse = FeatureMask::all_kept(m);
    for &group in &order[..m - 1] {
        reverse.set(group, false)?;
        masks.push(reverse.clone());
    }
    Ok(masks)
}

/// Average of forward and reverse marginal contributions, (groups x outputs).
fn antithetic_contributions(
    order: &[usize],
    evaluated: &Array2<f64>,
    endpoints: &Endpoints,
) -> Array2<f64> {
    let m = order.len();
    let mut sample = Array2::zeros((m, endpoints.base.len()));

    let mut previous = endpoints.base.clone();
    for (step, &group) in order.iter().enumerate() {
        let current = if step + 1 < m {
            evaluated.row(step).to_owned()
        } else {
            endpoints.full.clone()
        };
        sample.row_mut(group).scaled_add(0.5, &(&current - &previous));
        previous = current;
    }

    let mut previous = endpoints.full.clone();
    for (step, &group) in order.iter().enumerate() {
        let current = if step + 1 < m {
            evaluated.row(m - 1 + step).to_owned()
        } else {
            endpoints.base.clone()
        };
        sample.row_mut(group).scaled_add(0.5, &(&previous - &current));
        previous = current;
    }
    sample
}
