//! Running mean and variance accumulators.
//!
//! Marginal contributions arrive one round at a time; [`RunningStats`] keeps a
//! Welford accumulator per (feature group, output) cell so the engine can
//! report a standard error without storing every sample. Accumulators from
//! parallel workers are combined with the pairwise merge of Chan et al.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Welford accumulator over a (groups x outputs) matrix of samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunningStats {
    count: usize,
    mean: Array2<f64>,
    m2: Array2<f64>,
}

impl RunningStats {
    /// Empty accumulator for `groups` feature groups and `outputs` columns.
    pub fn new(groups: usize, outputs: usize) -> Self {
        RunningStats {
            count: 0,
            mean: Array2::zeros((groups, outputs)),
            m2: Array2::zeros((groups, outputs)),
        }
    }

    /// Number of samples pushed so far.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Add one sample matrix.
    pub fn push(&mut self, sample: &Array2<f64>) {
        debug_assert_eq!(sample.dim(), self.mean.dim());
        self.count += 1;
        let n = self.count as f64;
        ndarray::Zip::from(&mut self.mean)
            .and(&mut self.m2)
            .and(sample)
            .for_each(|mean, m2, &x| {
                let delta = x - *mean;
                *mean += delta / n;
                *m2 += delta * (x - *mean);
            });
    }

    /// Fold another accumulator into this one.
    pub fn merge(&mut self, other: &RunningStats) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = other.clone();
            return;
        }
        let n_a = self.count as f64;
        let n_b = other.count as f64;
        let n = n_a + n_b;
        ndarray::Zip::from(&mut self.mean)
            .and(&mut self.m2)
            .and(&other.mean)
            .and(&other.m2)
            .for_each(|mean, m2, &mean_b, &m2_b| {
                let delta = mean_b - *mean;
                *mean += delta * n_b / n;
                *m2 += m2_b + delta * delta * n_a * n_b / n;
            });
        self.count += other.count;
    }

    /// Current mean of the samples.
    pub fn mean(&self) -> &Array2<f64> {
        &self.mean
    }

    /// Standard error of the mean; zero with fewer than two samples.
    pub fn standard_error(&self) -> Array2<f64> {
        if self.count < 2 {
            return Array2::zeros(self.mean.dim());
        }
        let n = self.count as f64;
        self.m2.mapv(|m2| (m2 / (n - 1.0)).max(0.0).sqrt() / n.sqrt())
    }

    /// Largest standard error across all cells.
    pub fn max_standard_error(&self) -> f64 {
        self.standard_error()
            .iter()
            .copied()
            .fold(0.0_f64, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_mean_and_standard_error() {
        let mut stats = RunningStats::new(1, 1);
        for x in [1.0, 2.0, 3.0, 4.0] {
            stats.push(&array![[x]]);
        }
        assert_eq!(stats.count(), 4);
        assert_abs_diff_eq!(stats.mean()[[0, 0]], 2.5, epsilon = 1e-12);
        // sample variance 5/3, se = sqrt(5/3)/2
        let expected = (5.0_f64 / 3.0).sqrt() / 2.0;
        assert_abs_diff_eq!(stats.standard_error()[[0, 0]], expected, epsilon = 1e-12);
    }

    #[test]
    fn test_single_sample_has_zero_error() {
        let mut stats = RunningStats::new(2, 1);
        stats.push(&array![[1.0], [5.0]]);
        assert_eq!(stats.max_standard_error(), 0.0);
    }

    #[test]
    fn test_merge_matches_sequential() {
        let samples = [0.5, -1.0, 2.0, 3.5, 0.0, 1.25];
        let mut all = RunningStats::new(1, 1);
        let mut left = RunningStats::new(1, 1);
        let mut right = RunningStats::new(1, 1);
        for (i, &x) in samples.iter().enumerate() {
            all.push(&array![[x]]);
            if i < 2 {
                left.push(&array![[x]]);
            } else {
                right.push(&array![[x]]);
            }
        }
        left.merge(&right);
        assert_eq!(left.count(), all.count());
        assert_abs_diff_eq!(left.mean()[[0, 0]], all.mean()[[0, 0]], epsilon = 1e-12);
        assert_abs_diff_eq!(
            left.standard_error()[[0, 0]],
            all.standard_error()[[0, 0]],
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_merge_into_empty() {
        let mut empty = RunningStats::new(1, 2);
        let mut other = RunningStats::new(1, 2);
        other.push(&array![[1.0, 2.0]]);
        empty.merge(&other);
        assert_eq!(empty, other);
    }
}
