//! Tabular masker: hidden features take values from a background dataset.
//!
//! Each background row yields one masked variant, so the model output for a
//! mask is an expectation over the background distribution. Large background
//! sets are subsampled with an explicit seed.

use crate::core::error::{Result, ShapError};
use crate::core::types::Instance;
use crate::core::utils::random::Random;
use crate::maskers::partition::{FeatureMask, FeaturePartition};

use ndarray::{Array1, Array2, Axis};
use std::sync::Arc;

/// Background-value replacement masker for numeric feature vectors.
#[derive(Debug, Clone)]
pub struct TabularMasker {
    background: Arc<Array2<f64>>,
    partition: Option<FeaturePartition>,
    feature_names: Option<Vec<String>>,
}

impl TabularMasker {
    /// Masker using every row of `background`.
    pub fn new(background: Array2<f64>) -> Result<Self> {
        if background.nrows() == 0 || background.ncols() == 0 {
            return Err(ShapError::config(format!(
                "background data must have at least one row and one column, got {:?}",
                background.dim()
            )));
        }
        if background.iter().any(|v| !v.is_finite()) {
            return Err(ShapError::config(
                "background data contains non-finite values",
            ));
        }
        Ok(TabularMasker {
            background: Arc::new(background),
            partition: None,
            feature_names: None,
        })
    }

    /// Masker keeping at most `max_samples` background rows, drawn with `seed`.
    pub fn with_max_samples(background: Array2<f64>, max_samples: usize, seed: u64) -> Result<Self> {
        if max_samples == 0 {
            return Err(ShapError::invalid_parameter(
                "max_samples",
                "0",
                "must be positive",
            ));
        }
        if background.nrows() > max_samples {
            let rows = Random::with_seed(seed).sample(background.nrows(), max_samples);
            log::debug!(
                "Subsampling background from {} to {} rows",
                background.nrows(),
                rows.len()
            );
            let sampled = background.select(Axis(0), &rows);
            return Self::new(sampled);
        }
        Self::new(background)
    }

    /// Masker replacing hidden features with the column means of `background`.
    pub fn mean(background: &Array2<f64>) -> Result<Self> {
        let means = background.mean_axis(Axis(0)).ok_or_else(|| {
            ShapError::config("background data must have at least one row")
        })?;
        Self::new(means.insert_axis(Axis(0)))
    }

    /// Load a numeric background from a CSV file with a header row.
    /// Header names become feature names.
    #[cfg(feature = "csv")]
    pub fn from_csv<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let names: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut values = Vec::new();
        let mut rows = 0;
        for record in reader.records() {
            let record = record?;
            if record.len() != names.len() {
                return Err(ShapError::shape(format!(
                    "CSV row {} has {} fields, header has {}",
                    rows + 1,
                    record.len(),
                    names.len()
                )));
            }
            for field in record.iter() {
                let value: f64 = field.trim().parse().map_err(|_| {
                    ShapError::config(format!("non-numeric background value '{}'", field))
                })?;
                values.push(value);
            }
            rows += 1;
        }
        let background = Array2::from_shape_vec((rows, names.len()), values)
            .map_err(|e| ShapError::shape(e.to_string()))?;
        Self::new(background)?.with_feature_names(names)
    }

    /// Mask features in atomic groups.
    pub fn with_partition(mut self, partition: FeaturePartition) -> Result<Self> {
        if partition.num_features() != self.background.ncols() {
            return Err(ShapError::shape(format!(
                "partition covers {} features but the background has {} columns",
                partition.num_features(),
                self.background.ncols()
            )));
        }
        self.partition = Some(partition);
        Ok(self)
    }

    /// Attach one name per feature column.
    pub fn with_feature_names(mut self, names: Vec<String>) -> Result<Self> {
        if names.len() != self.background.ncols() {
            return Err(ShapError::shape(format!(
                "{} feature names given for {} columns",
                names.len(),
                self.background.ncols()
            )));
        }
        self.feature_names = Some(names);
        Ok(self)
    }

    /// Background rows in use.
    pub fn background(&self) -> &Array2<f64> {
        &self.background
    }

    /// Number of raw feature columns.
    pub fn num_features(&self) -> usize {
        self.background.ncols()
    }

    /// Number of maskable groups.
    pub fn num_groups(&self) -> usize {
        self.partition
            .as_ref()
            .map_or(self.background.ncols(), FeaturePartition::num_groups)
    }

    pub(crate) fn num_groups_for(&self, instance: &Instance) -> Result<usize> {
        self.values_of(instance)?;
        Ok(self.num_groups())
    }

    pub(crate) fn group_names(&self) -> Result<Vec<String>> {
        if let Some(partition) = &self.partition {
            if let Some(names) = partition.names() {
                return Ok(names.to_vec());
            }
            return Ok((0..partition.num_groups())
                .map(|g| match (&self.feature_names, partition.group(g)) {
                    (Some(names), Some(group)) => group
                        .iter()
                        .map(|&f| names[f].as_str())
                        .collect::<Vec<_>>()
                        .join("+"),
                    _ => format!("Group {}", g),
                })
                .collect());
        }
        Ok(match &self.feature_names {
            Some(names) => names.clone(),
            None => (0..self.num_features())
                .map(|f| format!("Feature {}", f))
                .collect(),
        })
    }

    fn values_of<'a>(&self, instance: &'a Instance) -> Result<&'a Array1<f64>> {
        let values = instance.as_tabular().ok_or_else(|| {
            ShapError::shape(format!(
                "tabular masker cannot mask a {} instance",
                instance.variant_name()
            ))
        })?;
        if values.len() != self.num_features() {
            return Err(ShapError::shape(format!(
                "instance has {} features but the background has {} columns",
                values.len(),
                self.num_features()
            )));
        }
        Ok(values)
    }

    /// One masked variant per background row.
    pub(crate) fn mask(&self, instance: &Instance, mask: &FeatureMask) -> Result<Vec<Instance>> {
        let values = self.values_of(instance)?;
        let keep = match &self.partition {
            Some(partition) => partition.expand(mask)?,
            None => {
                mask.check_len(self.num_features())?;
                mask.as_slice().to_vec()
            }
        };

        // Nothing hidden: every background row gives the same instance
        if keep.iter().all(|&k| k) {
            return Ok(vec![instance.clone()]);
        }

        Ok(self
            .background
            .outer_iter()
            .map(|row| {
                let masked: Array1<f64> = values
                    .iter()
                    .zip(row.iter())
                    .zip(keep.iter())
                    .map(|((&own, &bg), &k)| if k { own } else { bg })
                    .collect();
                Instance::Tabular(masked)
            })
            .collect())
    }
}
