//! Feature masks and feature partitions.

use crate::core::error::{Result, ShapError};
use serde::{Deserialize, Serialize};

/// Boolean selection over feature groups: `true` keeps a group, `false` hides it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureMask {
    keep: Vec<bool>,
}

impl FeatureMask {
    /// Mask over `num_groups` groups with every group kept.
    pub fn all_kept(num_groups: usize) -> Self {
        FeatureMask {
            keep: vec![true; num_groups],
        }
    }

    /// Mask over `num_groups` groups with every group hidden.
    pub fn all_hidden(num_groups: usize) -> Self {
        FeatureMask {
            keep: vec![false; num_groups],
        }
    }

    /// Mask keeping only the listed groups.
    ///
    /// Fails with a shape error for an index at or beyond `num_groups`.
    pub fn from_kept(num_groups: usize, kept: &[usize]) -> Result<Self> {
        let mut mask = Self::all_hidden(num_groups);
        for &index in kept {
            mask.set(index, true)?;
        }
        Ok(mask)
    }

    /// Mask from raw booleans.
    pub fn from_bools(keep: Vec<bool>) -> Self {
        FeatureMask { keep }
    }

    /// Number of groups covered.
    pub fn len(&self) -> usize {
        self.keep.len()
    }

    /// True when the mask covers no groups.
    pub fn is_empty(&self) -> bool {
        self.keep.is_empty()
    }

    /// Whether group `index` keeps its original value.
    pub fn is_kept(&self, index: usize) -> bool {
        self.keep.get(index).copied().unwrap_or(false)
    }

    /// Keep or hide group `index`.
    pub fn set(&mut self, index: usize, keep: bool) -> Result<()> {
        let len = self.keep.len();
        match self.keep.get_mut(index) {
            Some(slot) => {
                *slot = keep;
                Ok(())
            }
            None => Err(ShapError::shape(format!(
                "feature index {} is outside the masker's {} feature groups",
                index, len
            ))),
        }
    }

    /// Number of kept groups.
    pub fn num_kept(&self) -> usize {
        self.keep.iter().filter(|&&k| k).count()
    }

    /// Raw booleans.
    pub fn as_slice(&self) -> &[bool] {
        &self.keep
    }

    /// Fail with a shape error unless the mask covers exactly `num_groups` groups.
    pub fn check_len(&self, num_groups: usize) -> Result<()> {
        crate::ensure!(
            self.keep.len() == num_groups,
            crate::shape_error!(
                "mask covers {} feature groups but the masker declares {}",
                self.keep.len(),
                num_groups
            )
        );
        Ok(())
    }
}

/// Assignment of raw feature positions to groups that are masked atomically,
/// e.g. the columns of one one-hot encoded variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeaturePartition {
    num_features: usize,
    groups: Vec<Vec<usize>>,
    names: Option<Vec<String>>,
}

impl FeaturePartition {
    /// Partition from explicit groups. Every position in `0..num_features`
    /// must appear in exactly one non-empty group.
    pub fn new(num_features: usize, groups: Vec<Vec<usize>>) -> Result<Self> {
        let mut seen = vec![false; num_features];
        for (g, group) in groups.iter().enumerate() {
            if group.is_empty() {
                return Err(ShapError::shape(format!("feature group {} is empty", g)));
            }
            for &feature in group {
                match seen.get_mut(feature) {
                    Some(flag) if *flag => {
                        return Err(ShapError::shape(format!(
                            "feature {} is assigned to more than one group",
                            feature
                        )))
                    }
                    Some(flag) => *flag = true,
                    None => {
                        return Err(ShapError::shape(format!(
                            "feature {} is outside the {} features of the partition",
                            feature, num_features
                        )))
                    }
                }
            }
        }
        if let Some(missing) = seen.iter().position(|&s| !s) {
            return Err(ShapError::shape(format!(
                "feature {} is not assigned to any group",
                missing
            )));
        }
        Ok(FeaturePartition {
            num_features,
            groups,
            names: None,
        })
    }

    /// One group per feature.
    pub fn singletons(num_features: usize) -> Self {
        FeaturePartition {
            num_features,
            groups: (0..num_features).map(|f| vec![f]).collect(),
            names: None,
        }
    }

    /// Attach group names; their count must match the group count.
    pub fn with_names(mut self, names: Vec<String>) -> Result<Self> {
        if names.len() != self.groups.len() {
            return Err(ShapError::shape(format!(
                "{} group names given for {} groups",
                names.len(),
                self.groups.len()
            )));
        }
        self.names = Some(names);
        Ok(self)
    }

    /// Number of raw feature positions.
    pub fn num_features(&self) -> usize {
        self.num_features
    }

    /// Number of groups.
    pub fn num_groups(&self) -> usize {
        self.groups.len()
    }

    /// Positions of group `index`.
    pub fn group(&self, index: usize) -> Option<&[usize]> {
        self.groups.get(index).map(Vec::as_slice)
    }

    /// Group names, if attached.
    pub fn names(&self) -> Option<&[String]> {
        self.names.as_deref()
    }

    /// Expand a group mask to one boolean per raw feature position.
    pub fn expand(&self, mask: &FeatureMask) -> Result<Vec<bool>> {
        mask.check_len(self.groups.len())?;
        let mut keep = vec![false; self.num_features];
        for (g, group) in self.groups.iter().enumerate() {
            if mask.is_kept(g) {
                for &feature in group {
                    keep[feature] = true;
                }
            }
        }
        Ok(keep)
    }
}
