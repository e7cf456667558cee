//! Common test utilities for Pure Rust SHAP integration tests.

#![allow(dead_code)]

use ndarray::{Array1, Array2};
use rand::prelude::*;
use shap_rust::*;
use std::collections::HashMap;
use std::sync::Arc;

/// Linear model `f(x) = bias + sum_j weights[j] * x[j]`.
pub fn linear_model(weights: Vec<f64>, bias: f64) -> FnModel {
    FnModel::tabular(1, move |x| {
        vec![bias + x.iter().zip(&weights).map(|(v, w)| v * w).sum::<f64>()]
    })
}

/// Two-output model with interactions, for tests where sampling matters.
pub fn interaction_model() -> FnModel {
    FnModel::tabular(2, |x| {
        vec![
            x[0] * x[1] + x[2] - 0.5 * x[3],
            (x[0] - x[2]).tanh() + x[1] * x[3],
        ]
    })
}

/// Deterministic background data in [-2, 2).
pub fn background(num_samples: usize, num_features: usize, seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::from_shape_fn((num_samples, num_features), |_| rng.gen_range(-2.0..2.0))
}

/// Exact Shapley values of a linear model under a background:
/// `w_j * (x_j - mean_j)`.
pub fn linear_shap(weights: &[f64], instance: &[f64], background: &Array2<f64>) -> Array1<f64> {
    let means = background
        .mean_axis(ndarray::Axis(0))
        .expect("non-empty background");
    Array1::from_iter(
        weights
            .iter()
            .zip(instance)
            .zip(means.iter())
            .map(|((w, x), m)| w * (x - m)),
    )
}

/// Whitespace tokenizer over a fixed vocabulary.
///
/// Ids: 0 = `<s>`, 1 = `</s>`, 2 = `<mask>`, then the given words in order.
/// Words starting with `##` are continuation pieces.
#[derive(Debug)]
pub struct WhitespaceTokenizer {
    ids: HashMap<String, TokenId>,
    words: Vec<String>,
}

impl WhitespaceTokenizer {
    pub fn new(words: &[&str]) -> Self {
        let mut all = vec!["<s>".to_string(), "</s>".to_string(), "<mask>".to_string()];
        all.extend(words.iter().map(|w| w.to_string()));
        let ids = all
            .iter()
            .enumerate()
            .map(|(i, w)| (w.clone(), i as TokenId))
            .collect();
        WhitespaceTokenizer { ids, words: all }
    }

    pub fn shared(words: &[&str]) -> Arc<dyn Tokenizer> {
        Arc::new(Self::new(words))
    }
}

impl Tokenizer for WhitespaceTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<TokenId>> {
        let mut tokens = vec![0];
        for word in text.split_whitespace() {
            let id = self
                .ids
                .get(word)
                .copied()
                .ok_or_else(|| ShapError::config(format!("word '{}' not in vocabulary", word)))?;
            tokens.push(id);
        }
        tokens.push(1);
        Ok(tokens)
    }

    fn decode(&self, tokens: &[TokenId]) -> Result<String> {
        tokens
            .iter()
            .map(|&t| {
                self.words
                    .get(t as usize)
                    .cloned()
                    .ok_or_else(|| ShapError::index_out_of_bounds(t as usize, self.words.len()))
            })
            .collect::<Result<Vec<_>>>()
            .map(|words| words.join(" "))
    }

    fn vocab_size(&self) -> usize {
        self.words.len()
    }

    fn mask_token_id(&self) -> Option<TokenId> {
        Some(2)
    }

    fn is_special(&self, token: TokenId) -> bool {
        token <= 2
    }

    fn is_continuation(&self, token: TokenId) -> bool {
        self.words
            .get(token as usize)
            .map_or(false, |w| w.starts_with("##"))
    }
}

/// Vocabulary shared by the text tests.
pub const WORDS: [&str; 6] = ["the", "movie", "was", "great", "awful", "fun"];

/// Bag-of-words sentiment score: +1 per "great"/"fun", -1 per "awful".
pub fn sentiment_of(tokens: &[TokenId]) -> f64 {
    tokens
        .iter()
        .map(|&t| match t {
            6 | 8 => 1.0,
            7 => -1.0,
            _ => 0.0,
        })
        .sum()
}
