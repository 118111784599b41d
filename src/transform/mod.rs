use std::sync::Arc;

use crate::ShortVec;
use crate::error::{NoninvertibleError, TransformError};
use crate::matrix::GeneralMatrix;
use smallvec::smallvec;

mod concatenated;
mod ellipsoid;
mod linear;
mod passthrough;
pub mod projection;
mod trajectory;

pub use concatenated::{ConcatenatedTransform, concatenate, concatenate_all};
pub use ellipsoid::{CentricToEllipsoid, Ellipsoid, EllipsoidToCentric};
pub use linear::LinearTransform;
pub use passthrough::PassThroughTransform;
pub use trajectory::{MovingFeature, TrajectoryTranslation, truncated_julian_day};

/// Core coordinate transform interface.
///
/// Implementations are immutable and pure: evaluation never mutates the
/// transform, so a shared `Arc<dyn MathTransform>` is safe for unrestricted
/// concurrent use. Source and target dimension counts are fixed for the
/// lifetime of the object.
///
/// Implementations may not perform any bounds checks on the input, as these
/// transforms generally run in performance-critical hot loops. They may
/// panic if coordinates or output buffers of incorrect length are given.
/// Domain errors (out-of-range time, non-convergence) are reported through
/// [TransformError] and abort the whole call without partial writes being
/// meaningful.
pub trait MathTransform: std::fmt::Debug + Send + Sync {
    fn source_dimensions(&self) -> usize;

    fn target_dimensions(&self) -> usize;

    /// Transform a single coordinate tuple from the source space to the
    /// target space, writing to a pre-allocated output buffer.
    fn transform_into(&self, pt: &[f64], buf: &mut [f64]) -> Result<(), TransformError>;

    /// Allocating convenience around [MathTransform::transform_into].
    fn transform(&self, pt: &[f64]) -> Result<ShortVec<f64>, TransformError> {
        let mut buf = smallvec![f64::NAN; self.target_dimensions()];
        self.transform_into(pt, &mut buf)?;
        Ok(buf)
    }

    /// The Jacobian at the given source point: a
    /// `target_dimensions x source_dimensions` matrix of partial derivatives.
    fn derivative(&self, pt: &[f64]) -> Result<GeneralMatrix, TransformError>;

    /// Transform a point and, if `derivate` is set, also return the Jacobian
    /// at that point.
    ///
    /// The trait default calls [MathTransform::transform_into] and
    /// [MathTransform::derivative] separately; transforms which share work
    /// between the two may override it.
    fn transform_with_derivative(
        &self,
        pt: &[f64],
        buf: &mut [f64],
        derivate: bool,
    ) -> Result<Option<GeneralMatrix>, TransformError> {
        let matrix = if derivate {
            Some(self.derivative(pt)?)
        } else {
            None
        };
        self.transform_into(pt, buf)?;
        Ok(matrix)
    }

    /// Transform multiple points, writing to pre-allocated output buffers.
    ///
    /// The trait default simply calls [MathTransform::transform_into] in
    /// turn; specific transforms may override it.
    fn bulk_transform_into(
        &self,
        pts: &[&[f64]],
        bufs: &mut [&mut [f64]],
    ) -> Result<(), TransformError> {
        for (pt, buf) in pts.iter().zip(bufs.iter_mut()) {
            self.transform_into(pt, buf)?;
        }
        Ok(())
    }

    /// Transform multiple points given in columnar format.
    ///
    /// The trait default is inefficient, staging each point through scratch
    /// buffers; transforms with a columnar fast path should override it.
    fn column_transform_into(
        &self,
        columns: &[&[f64]],
        bufs: &mut [&mut [f64]],
    ) -> Result<(), TransformError> {
        let mut in_pt: ShortVec<f64> = smallvec![f64::NAN; self.source_dimensions()];
        let mut out_pt: ShortVec<f64> = smallvec![f64::NAN; self.target_dimensions()];
        for pt_idx in 0..columns[0].len() {
            for (val, col) in in_pt.iter_mut().zip(columns.iter()) {
                *val = col[pt_idx];
            }
            self.transform_into(&in_pt, &mut out_pt)?;
            for (out_col, p) in bufs.iter_mut().zip(out_pt.iter()) {
                out_col[pt_idx] = *p;
            }
        }
        Ok(())
    }

    /// Return the inverse transform, or fail when no analytic or approximate
    /// inverse exists for this configuration.
    fn inverse(&self) -> Result<Arc<dyn MathTransform>, NoninvertibleError>;

    /// Whether this transform definitely is the identity.
    ///
    /// `false` is not definitive for transforms where the check would be
    /// expensive.
    fn is_identity(&self) -> bool;

    /// The homogeneous matrix, for linear transforms only. The concatenation
    /// optimizer merges adjacent steps advertising one.
    fn linear_matrix(&self) -> Option<&GeneralMatrix> {
        None
    }

    /// Identity of the forward/inverse pair this transform belongs to, if it
    /// advertises one: a shared payload address plus whether this is the
    /// inverse member. The optimizer folds a forward step directly followed
    /// by its own inverse into an identity.
    fn inversion_pair(&self) -> Option<(usize, bool)> {
        None
    }

    /// The step list, for concatenated transforms only. Lets the optimizer
    /// splice nested chains flat instead of stacking them.
    fn concatenated_steps(&self) -> Option<&[Arc<dyn MathTransform>]> {
        None
    }

    /// The parameter values this transform was built from, where the
    /// operation method contract defines them.
    fn parameter_values(&self) -> Option<crate::operation::ParameterValueGroup> {
        None
    }
}
