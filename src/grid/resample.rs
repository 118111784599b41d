use std::sync::Arc;

use crate::error::{FactoryError, ResampleError};
use crate::transform::{MathTransform, concatenate_all};
use crate::{as_muts, as_refs, vec_of_vec};

use super::{GridExtent, GridGeometry, Raster, SampleSource};

/// The pixel-to-pixel transform between two grids: target grid to CRS, an
/// optional CRS change, then the inverse of the source grid to CRS.
///
/// Affine grids fold to a single linear step, so per-pixel evaluation does
/// not walk a chain.
pub fn pixel_to_pixel(
    source: &GridGeometry,
    target: &GridGeometry,
    crs_change: Option<Arc<dyn MathTransform>>,
) -> Result<Arc<dyn MathTransform>, FactoryError> {
    let mut steps: Vec<Arc<dyn MathTransform>> = Vec::with_capacity(3);
    steps.push(target.grid_to_crs().clone());
    if let Some(change) = crs_change {
        steps.push(change);
    }
    steps.push(source.grid_to_crs().inverse()?);
    concatenate_all(steps)
}

/// Resample `source` onto the target grid, nearest-neighbour.
///
/// Every target pixel centre is mapped through the target grid to CRS
/// transform, the optional CRS change and the inverse source grid to CRS
/// transform, then the nearest source pixel is read. Source grid coordinates
/// index `source` directly; pixels landing outside it get `fill`. The output
/// raster's origin is the target extent's low corner.
pub fn resample<S: SampleSource>(
    source: &S,
    source_geometry: &GridGeometry,
    target_geometry: &GridGeometry,
    crs_change: Option<Arc<dyn MathTransform>>,
    fill: f64,
) -> Result<Raster, ResampleError> {
    if source_geometry.dimension() != 2 || target_geometry.dimension() != 2 {
        return Err(FactoryError::Data(format!(
            "raster resampling is two-dimensional, got {} and {} axes",
            source_geometry.dimension(),
            target_geometry.dimension()
        ))
        .into());
    }
    let transform = pixel_to_pixel(source_geometry, target_geometry, crs_change)?;
    log::debug!(
        "resampling {} pixels through {transform:?}",
        target_geometry.extent().num_pixels()
    );

    let extent = target_geometry.extent();
    let centres = pixel_centres(extent);
    let mut mapped = vec_of_vec(centres.len(), 2, f64::NAN);
    transform.bulk_transform_into(&as_refs(&centres), &mut as_muts(&mut mapped))?;

    let bands = source.bands();
    let mut samples = Vec::with_capacity(centres.len() * bands);
    for point in &mapped {
        let x = point[0].round_ties_even();
        let y = point[1].round_ties_even();
        if x.is_finite() && y.is_finite() {
            for band in 0..bands {
                samples.push(source.sample(x as i64, y as i64, band).unwrap_or(fill));
            }
        } else {
            for _ in 0..bands {
                samples.push(fill);
            }
        }
    }
    Ok(Raster::try_new(
        extent.low(0),
        extent.low(1),
        extent.size(0),
        extent.size(1),
        bands,
        samples,
    )?)
}

/// Target pixel centres in row-major order, `[x, y]` per pixel.
fn pixel_centres(extent: &GridExtent) -> Vec<[f64; 2]> {
    let mut centres = Vec::with_capacity(extent.num_pixels());
    for y in extent.low(1)..=extent.high(1) {
        for x in extent.low(0)..=extent.high(0) {
            centres.push([x as f64, y as f64]);
        }
    }
    centres
}
