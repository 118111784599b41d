use smallvec::SmallVec;


mod crs;
pub use crs::{Axis, CrsDescriptor, CsKind, Unit, UnitKind};
mod dd;
pub use dd::DoubleDouble;
mod error;
pub use error::{FactoryError, NoninvertibleError, ResampleError, TransformError};
mod matrix;
pub use matrix::{GeneralMatrix, MatrixBuilder, MatrixElement};
mod transform;
pub use transform::projection::Sinusoidal;
pub use transform::{
    CentricToEllipsoid, ConcatenatedTransform, Ellipsoid, EllipsoidToCentric, LinearTransform,
    MathTransform, MovingFeature, PassThroughTransform, TrajectoryTranslation, concatenate,
    concatenate_all, truncated_julian_day,
};
mod operation;
pub use operation::{
    Context, DatumShiftDomain, DatumShiftKind, DatumShiftMethod, GeocentricToGeographic,
    GeographicRedimension, GeographicToGeocentric, MovingFrameMethod, OperationMethod,
    OperationRegistry, ParameterDescriptor, ParameterDescriptorGroup, ParameterKind,
    ParameterValue, ParameterValueGroup, SinusoidalMethod, geographic_2d_to_3d,
    geographic_3d_to_2d,
};
mod route;
pub use route::{FrameGraph, Hop};
mod grid;
#[cfg(feature = "ndarray")]
pub use grid::{ArraySource, ArrayViewSource};
pub use grid::{
    GridExtent, GridGeometry, Raster, ReshapedImage, SampleSource, pixel_to_pixel, resample,
};
#[cfg(feature = "image")]
pub use grid::ImageSource;

pub const COORD_SIZE: usize = 6;

/// A short vector type alias for coordinate tuples, inlining up to
/// [COORD_SIZE] values.
type ShortVec<T> = SmallVec<[T; COORD_SIZE]>;

/// Convenience function for turning a slice of sliceables into a vec of slices.
/// Allocates a new vec.
pub(crate) fn as_refs<T, Inner: AsRef<[T]>>(input: &[Inner]) -> Vec<&[T]> {
    input.iter().map(|v| v.as_ref()).collect()
}

/// Convenience function for turning a mut slice of sliceables into a vec of mut slices.
/// Allocates a new vec.
pub(crate) fn as_muts<T, Inner: AsMut<[T]>>(input: &mut [Inner]) -> Vec<&mut [T]> {
    input.iter_mut().map(|v| v.as_mut()).collect()
}

pub(crate) fn vec_of_vec<T: Copy>(outer_len: usize, inner_len: usize, val: T) -> Vec<Vec<T>> {
    vec![vec![val; inner_len]; outer_len]
}
