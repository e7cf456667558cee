//! Integration tests for permutation attribution: accuracy, reproducibility,
//! budget handling, cancellation and per-instance failures.

mod common;

use approx::assert_abs_diff_eq;
use common::*;
use ndarray::{Array2, Axis};
use proptest::prelude::*;
use shap_rust::explainers::permutation;
use shap_rust::*;

#[test]
fn test_linear_model_matches_closed_form() {
    let weights = vec![1.5, -2.0, 0.5, 3.0];
    let bg = background(30, 4, 11);
    let x = [1.0, 0.5, -1.0, 2.0];

    let explainer =
        Explainer::new(linear_model(weights.clone(), 0.7), bg.clone(), ExplainerHints::new().seed(5))
            .unwrap();
    let explanation = explainer.explain(&Instance::tabular(&x)).unwrap();

    let expected = linear_shap(&weights, &x, &bg);
    for (j, value) in expected.iter().enumerate() {
        assert_abs_diff_eq!(explanation.values()[[j, 0]], *value, epsilon = 1e-9);
    }
    assert!(explanation.satisfies_efficiency(1e-9));
    assert_abs_diff_eq!(
        explanation.base_values()[0],
        0.7 + bg.mean_axis(Axis(0)).unwrap().dot(&ndarray::arr1(&weights)),
        epsilon = 1e-9
    );
    assert_eq!(explanation.feature_names(), &["Feature 0", "Feature 1", "Feature 2", "Feature 3"]);
}

#[test]
fn test_same_seed_same_result() {
    let bg = background(20, 4, 2);
    let x = Instance::tabular(&[1.0, -1.0, 0.5, 2.0]);
    let build = |seed| {
        Explainer::builder()
            .seed(seed)
            .num_workers(4)
            .max_evals(2 + 40 * permutation::round_cost(4))
            .build(interaction_model(), bg.clone())
            .unwrap()
    };

    let a = build(7).explain(&x).unwrap();
    let b = build(7).explain(&x).unwrap();
    assert_eq!(a.values(), b.values());
    assert_eq!(a.standard_errors(), b.standard_errors());
    assert_eq!(a.rounds(), 40);

    let c = build(8).explain(&x).unwrap();
    assert_ne!(a.values(), c.values());
}

#[test]
fn test_parallel_workers_preserve_efficiency() {
    let explainer = Explainer::builder()
        .seed(1)
        .num_workers(3)
        .build(interaction_model(), background(25, 4, 9))
        .unwrap();
    let explanation = explainer
        .explain(&Instance::tabular(&[0.3, 1.2, -0.7, 0.9]))
        .unwrap();
    assert_eq!(explanation.num_outputs(), 2);
    assert!(explanation.satisfies_efficiency(1e-9));
    assert!(explanation.evaluations() <= 500);
}

#[test]
fn test_budget_below_one_round_fails() {
    let explainer = Explainer::builder()
        .max_evals(permutation::minimum_budget(5) - 1)
        .build(linear_model(vec![1.0; 5], 0.0), background(5, 5, 0))
        .unwrap();
    let err = explainer
        .explain(&Instance::tabular(&[1.0; 5]))
        .unwrap_err();
    assert_eq!(err.category(), "configuration");
    assert!(err.to_string().contains("max_evals"));
}

#[test]
fn test_tolerance_exits_early() {
    // Additive model: every round gives the same contributions, so the
    // standard error is zero from the second round.
    let explainer = Explainer::builder()
        .convergence_tolerance(1e-6)
        .min_rounds(3)
        .max_evals(10_000)
        .build(linear_model(vec![1.0, 2.0, 3.0], 0.0), background(10, 3, 6))
        .unwrap();
    let explanation = explainer.explain(&Instance::tabular(&[1.0, 1.0, 1.0])).unwrap();
    assert!(explanation.converged());
    assert_eq!(explanation.rounds(), 3);
    assert!(explanation.convergence_warning().is_none());
    assert_eq!(
        explanation.evaluations(),
        2 + 3 * permutation::round_cost(3)
    );
}

#[test]
fn test_unconverged_run_carries_warning() {
    let explainer = Explainer::builder()
        .convergence_tolerance(1e-9)
        .max_evals(2 + 5 * permutation::round_cost(4))
        .build(
            FnModel::tabular(1, |x| vec![x[0] * x[1] * x[2] * x[3]]),
            background(15, 4, 8),
        )
        .unwrap();
    let explanation = explainer
        .explain(&Instance::tabular(&[2.0, -1.5, 1.0, 3.0]))
        .unwrap();
    assert!(!explanation.converged());
    let warning = explanation.convergence_warning().unwrap();
    assert_eq!(warning.evaluations, explanation.evaluations());
    assert!(explanation.satisfies_efficiency(1e-9));
}

#[test]
fn test_cancelled_before_start_returns_partial_estimate() {
    let explainer = Explainer::builder()
        .max_evals(10_000)
        .build(interaction_model(), background(10, 4, 3))
        .unwrap();
    let token = CancellationToken::new();
    token.cancel();

    let explanation = explainer
        .explain_with_cancel(&Instance::tabular(&[1.0, 2.0, 3.0, 4.0]), &token)
        .unwrap();
    assert!(explanation.cancelled());
    assert_eq!(explanation.rounds(), 1);
    assert!(explanation.convergence_warning().is_none());
    assert!(explanation.satisfies_efficiency(1e-9));
}

/// Sums its input; rejects rows whose first value exceeds 50.
fn range_checked_model() -> FnModel {
    FnModel::new(|batch| {
        let mut out = Array2::zeros((batch.len(), 1));
        for (i, instance) in batch.iter().enumerate() {
            let x = instance
                .as_tabular()
                .ok_or_else(|| ShapError::model_invocation(i, "not tabular"))?;
            if x[0] > 50.0 {
                return Err(ShapError::model_invocation(i, "input out of range"));
            }
            out[[i, 0]] = x.sum();
        }
        Ok(out)
    })
}

#[test]
fn test_single_explain_failure_names_instance_zero() {
    // The failing row sits deep inside the masked batch
    let explainer = Explainer::new(
        range_checked_model(),
        background(10, 3, 0),
        ExplainerHints::new(),
    )
    .unwrap();
    let err = explainer
        .explain(&Instance::tabular(&[99.0, 0.0, 0.0]))
        .unwrap_err();
    match err {
        ShapError::ModelInvocation { instance, message } => {
            assert_eq!(instance, 0);
            assert!(message.contains("out of range"));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_batch_failure_is_isolated() {
    let explainer =
        Explainer::new(range_checked_model(), background(10, 3, 0), ExplainerHints::new()).unwrap();

    let instances = vec![
        Instance::tabular(&[1.0, 2.0, 3.0]),
        Instance::tabular(&[99.0, 0.0, 0.0]),
        Instance::tabular(&[0.5, 0.5, 0.5]),
    ];
    let batch = explainer.explain_batch(&instances);
    assert_eq!(batch.len(), 3);
    assert_eq!(batch.num_failures(), 1);

    let (index, err) = batch.failures().next().unwrap();
    assert_eq!(index, 1);
    match err {
        ShapError::ModelInvocation { instance, .. } => assert_eq!(*instance, 1),
        other => panic!("unexpected error: {}", other),
    }
    let ok: Vec<usize> = batch.successes().map(|(i, _)| i).collect();
    assert_eq!(ok, vec![0, 2]);
}

#[test]
fn test_feature_mask_rejects_out_of_range_index() {
    let err = FeatureMask::from_kept(3, &[0, 5]).unwrap_err();
    assert_eq!(err.category(), "shape");
}

#[test]
fn test_exact_and_permutation_agree_on_additive_model() {
    let weights = vec![0.5, -1.0, 2.0, 1.0, -0.25];
    let bg = background(12, 5, 21);
    let x = Instance::tabular(&[1.0, 2.0, -1.0, 0.0, 4.0]);

    let exact = Explainer::builder()
        .algorithm(Algorithm::Exact)
        .build(linear_model(weights.clone(), 0.0), bg.clone())
        .unwrap()
        .explain(&x)
        .unwrap();
    let sampled = Explainer::builder()
        .algorithm(Algorithm::Permutation)
        .build(linear_model(weights, 0.0), bg)
        .unwrap()
        .explain(&x)
        .unwrap();

    assert_eq!(exact.evaluations(), 32);
    for (a, b) in exact.values().iter().zip(sampled.values().iter()) {
        assert_abs_diff_eq!(a, b, epsilon = 1e-9);
    }
}

#[test]
fn test_grouped_features_share_one_attribution() {
    let partition = FeaturePartition::new(4, vec![vec![0, 1], vec![2], vec![3]])
        .unwrap()
        .with_names(vec!["pair".into(), "third".into(), "fourth".into()])
        .unwrap();
    let bg = background(10, 4, 5);
    let masker = TabularMasker::new(bg.clone())
        .unwrap()
        .with_partition(partition)
        .unwrap();
    let weights = vec![1.0, 2.0, 3.0, 4.0];
    let x = [1.0, 1.0, 1.0, 1.0];

    let explanation = Explainer::new(linear_model(weights.clone(), 0.0), masker, ExplainerHints::new())
        .unwrap()
        .explain(&Instance::tabular(&x))
        .unwrap();
    assert_eq!(explanation.num_groups(), 3);
    assert_eq!(explanation.feature_names(), &["pair", "third", "fourth"]);

    let per_feature = linear_shap(&weights, &x, &bg);
    assert_abs_diff_eq!(
        explanation.values()[[0, 0]],
        per_feature[0] + per_feature[1],
        epsilon = 1e-9
    );
}

#[test]
fn test_explanation_survives_json_round_trip() {
    let explanation = Explainer::new(
        linear_model(vec![1.0, -1.0], 0.0),
        background(5, 2, 1),
        ExplainerHints::new(),
    )
    .unwrap()
    .explain(&Instance::tabular(&[2.0, 3.0]))
    .unwrap();
    let restored = Explanation::from_json(&explanation.to_json().unwrap()).unwrap();
    assert_eq!(restored, explanation);

    let ranked = restored.ranked_features(0).unwrap();
    assert_eq!(ranked.len(), 2);
    assert!(ranked[0].1.abs() >= ranked[1].1.abs());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_attributions_sum_to_output_difference(
        x in prop::collection::vec(-3.0..3.0f64, 4),
        seed in 0u64..1000,
        workers in 1usize..4,
    ) {
        let explainer = Explainer::builder()
            .seed(seed)
            .num_workers(workers)
            .max_evals(2 + 8 * permutation::round_cost(4))
            .build(interaction_model(), background(8, 4, seed))
            .unwrap();
        let explanation = explainer.explain(&Instance::tabular(&x)).unwrap();
        prop_assert!(explanation.satisfies_efficiency(1e-9));
        prop_assert_eq!(explanation.values().dim(), (4, 2));
    }
}
