//! Gridded coverages: discrete pixel extents, the "grid to CRS" transforms
//! tying pixel indices to real-world coordinates, and nearest-neighbour
//! resampling between grids.

use std::sync::Arc;

use smallvec::smallvec;

use crate::ShortVec;
use crate::error::{FactoryError, TransformError};
use crate::transform::MathTransform;

mod raster;
pub use raster::{Raster, ReshapedImage, SampleSource};
#[cfg(feature = "image")]
mod raster_image;
#[cfg(feature = "image")]
pub use raster_image::ImageSource;
#[cfg(feature = "ndarray")]
mod raster_ndarray;
#[cfg(feature = "ndarray")]
pub use raster_ndarray::{ArraySource, ArrayViewSource};
mod resample;
pub use resample::{pixel_to_pixel, resample};

/// The discrete bounds of a grid, as inclusive low and high pixel indices
/// per axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridExtent {
    low: ShortVec<i64>,
    high: ShortVec<i64>,
}

impl GridExtent {
    pub fn try_new(low: &[i64], high: &[i64]) -> Result<Self, FactoryError> {
        if low.len() != high.len() || low.is_empty() {
            return Err(FactoryError::Data(format!(
                "a grid extent needs matching low and high corners, got {} and {} axes",
                low.len(),
                high.len()
            )));
        }
        for (axis, (lo, hi)) in low.iter().zip(high.iter()).enumerate() {
            if lo > hi {
                return Err(FactoryError::Data(format!(
                    "grid extent axis {axis} is empty: low {lo} > high {hi}"
                )));
            }
        }
        Ok(Self {
            low: low.iter().copied().collect(),
            high: high.iter().copied().collect(),
        })
    }

    /// An extent starting at pixel 0 on every axis.
    pub fn of_size(size: &[usize]) -> Result<Self, FactoryError> {
        let low: ShortVec<i64> = smallvec![0; size.len()];
        let high: ShortVec<i64> = size.iter().map(|s| *s as i64 - 1).collect();
        Self::try_new(&low, &high)
    }

    pub fn dimension(&self) -> usize {
        self.low.len()
    }

    pub fn low(&self, axis: usize) -> i64 {
        self.low[axis]
    }

    pub fn high(&self, axis: usize) -> i64 {
        self.high[axis]
    }

    /// Number of pixels along one axis, `high - low + 1`.
    pub fn size(&self, axis: usize) -> usize {
        (self.high[axis] - self.low[axis] + 1) as usize
    }

    pub fn num_pixels(&self) -> usize {
        (0..self.dimension()).map(|axis| self.size(axis)).product()
    }
}

/// A grid extent together with the transform mapping pixel indices (cell
/// centres) to CRS coordinates.
#[derive(Debug, Clone)]
pub struct GridGeometry {
    extent: GridExtent,
    grid_to_crs: Arc<dyn MathTransform>,
}

impl GridGeometry {
    pub fn try_new(
        extent: GridExtent,
        grid_to_crs: Arc<dyn MathTransform>,
    ) -> Result<Self, FactoryError> {
        if grid_to_crs.source_dimensions() != extent.dimension() {
            return Err(FactoryError::Data(format!(
                "grid extent has {} axes; the grid to CRS transform expects {}",
                extent.dimension(),
                grid_to_crs.source_dimensions()
            )));
        }
        Ok(Self {
            extent,
            grid_to_crs,
        })
    }

    pub fn extent(&self) -> &GridExtent {
        &self.extent
    }

    pub fn grid_to_crs(&self) -> &Arc<dyn MathTransform> {
        &self.grid_to_crs
    }

    pub fn dimension(&self) -> usize {
        self.extent.dimension()
    }

    /// CRS-space bounds of the grid, as (low, high) corners.
    ///
    /// The outer cell edges (half a pixel beyond the extent) are mapped
    /// through the grid to CRS transform and the envelope is the min/max
    /// over every corner, so it is exact for affine transforms.
    pub fn envelope(&self) -> Result<(ShortVec<f64>, ShortVec<f64>), TransformError> {
        let n = self.dimension();
        let target = self.grid_to_crs.target_dimensions();
        let mut low: ShortVec<f64> = smallvec![f64::INFINITY; target];
        let mut high: ShortVec<f64> = smallvec![f64::NEG_INFINITY; target];
        let mut corner: ShortVec<f64> = smallvec![f64::NAN; n];
        for mask in 0..1usize << n {
            for (axis, c) in corner.iter_mut().enumerate() {
                *c = if mask & (1 << axis) == 0 {
                    self.extent.low(axis) as f64 - 0.5
                } else {
                    self.extent.high(axis) as f64 + 0.5
                };
            }
            let mapped = self.grid_to_crs.transform(&corner)?;
            for ((out, lo), hi) in mapped.iter().zip(low.iter_mut()).zip(high.iter_mut()) {
                if !out.is_finite() {
                    return Err(TransformError::OutsideDomain(
                        "a grid corner maps to a non-finite coordinate".into(),
                    ));
                }
                *lo = lo.min(*out);
                *hi = hi.max(*out);
            }
        }
        Ok((low, high))
    }
}
