//! Image masker: hidden square patches are filled with a constant or the
//! image mean.

use crate::core::constants::DEFAULT_IMAGE_PATCH_SIZE;
use crate::core::error::{Result, ShapError};
use crate::core::types::Instance;
use crate::maskers::partition::FeatureMask;

use ndarray::{s, Array3};
use serde::{Deserialize, Serialize};

/// Fill applied to hidden patches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ImageFill {
    /// Fixed value for every pixel and channel
    Constant(f64),
    /// Per-channel mean of the unmasked image
    Mean,
}

impl Default for ImageFill {
    fn default() -> Self {
        ImageFill::Constant(0.0)
    }
}

/// Patch-based image masker. Groups are the `ceil(h/p) * ceil(w/p)`
/// patches in row-major order; edge patches may be smaller.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageMasker {
    patch_size: usize,
    fill: ImageFill,
}

impl Default for ImageMasker {
    fn default() -> Self {
        ImageMasker {
            patch_size: DEFAULT_IMAGE_PATCH_SIZE,
            fill: ImageFill::default(),
        }
    }
}

impl ImageMasker {
    pub fn new(patch_size: usize) -> Result<Self> {
        if patch_size == 0 {
            return Err(ShapError::invalid_parameter(
                "patch_size",
                "0",
                "must be positive",
            ));
        }
        Ok(ImageMasker {
            patch_size,
            fill: ImageFill::default(),
        })
    }

    pub fn with_fill(mut self, fill: ImageFill) -> Self {
        self.fill = fill;
        self
    }

    pub fn patch_size(&self) -> usize {
        self.patch_size
    }

    pub fn fill(&self) -> ImageFill {
        self.fill
    }

    fn pixels_of<'a>(&self, instance: &'a Instance) -> Result<&'a Array3<f64>> {
        match instance {
            Instance::Image(pixels) => Ok(pixels),
            other => Err(ShapError::shape(format!(
                "image masker cannot mask a {} instance",
                other.variant_name()
            ))),
        }
    }

    /// Patch grid dimensions (rows, columns).
    fn grid(&self, pixels: &Array3<f64>) -> (usize, usize) {
        let (height, width, _) = pixels.dim();
        (
            (height + self.patch_size - 1) / self.patch_size,
            (width + self.patch_size - 1) / self.patch_size,
        )
    }

    pub(crate) fn num_groups_for(&self, instance: &Instance) -> Result<usize> {
        let (rows, cols) = self.grid(self.pixels_of(instance)?);
        Ok(rows * cols)
    }

    pub(crate) fn group_names(&self, instance: &Instance) -> Result<Vec<String>> {
        let (rows, cols) = self.grid(self.pixels_of(instance)?);
        Ok((0..rows)
            .flat_map(|r| (0..cols).map(move |c| format!("Patch ({}, {})", r, c)))
            .collect())
    }

    pub(crate) fn mask(&self, instance: &Instance, mask: &FeatureMask) -> Result<Vec<Instance>> {
        let pixels = self.pixels_of(instance)?;
        let (rows, cols) = self.grid(pixels);
        mask.check_len(rows * cols)?;

        let (height, width, channels) = pixels.dim();
        let fill: Vec<f64> = match self.fill {
            ImageFill::Constant(value) => vec![value; channels],
            ImageFill::Mean => (0..channels)
                .map(|c| pixels.slice(s![.., .., c]).mean().unwrap_or(0.0))
                .collect(),
        };

        let mut masked = pixels.clone();
        let p = self.patch_size;
        for g in (0..rows * cols).filter(|&g| !mask.is_kept(g)) {
            let (r, c) = (g / cols, g % cols);
            let y_end = ((r + 1) * p).min(height);
            let x_end = ((c + 1) * p).min(width);
            for (ch, &value) in fill.iter().enumerate() {
                masked
                    .slice_mut(s![r * p..y_end, c * p..x_end, ch])
                    .fill(value);
            }
        }
        Ok(vec![Instance::Image(masked)])
    }
}
