use std::sync::Arc;

use crate::error::{FactoryError, NoninvertibleError, TransformError};
use crate::matrix::GeneralMatrix;
use crate::transform::{Ellipsoid, MathTransform};

use super::{MeridianArc, create_projected};

/// Shared state of a sinusoidal projection pair.
#[derive(Debug)]
struct SinusoidalKernel {
    eccentricity_squared: f64,
    arc: MeridianArc,
}

impl SinusoidalKernel {
    /// Radius of the parallel circle at `phi`, over the semi-major axis.
    fn parallel_radius(&self, sin_phi: f64, cos_phi: f64) -> f64 {
        cos_phi / (1.0 - self.eccentricity_squared * sin_phi * sin_phi).sqrt()
    }

    /// Jacobian of the forward map at (λ, φ).
    fn jacobian(&self, lam: f64, phi: f64) -> GeneralMatrix {
        let e2 = self.eccentricity_squared;
        let (sin_phi, cos_phi) = phi.sin_cos();
        let w2 = 1.0 - e2 * sin_phi * sin_phi;
        let mut m = GeneralMatrix::zero(2, 2);
        m.set_element(0, 0, cos_phi / w2.sqrt());
        m.set_element(0, 1, lam * sin_phi * (e2 - 1.0) / (w2 * w2.sqrt()));
        m.set_element(1, 1, self.arc.length_derivative(phi));
        m
    }

    fn pair_address(self: &Arc<Self>) -> usize {
        Arc::as_ptr(self) as usize
    }
}

/// Sinusoidal (Sanson-Flamsteed) projection kernel: equal-area and
/// pseudocylindrical, with the easting following the shrinking parallels.
///
/// Works in normalized units; the complete projection built by
/// [Sinusoidal::create] sandwiches this kernel between the linear steps
/// doing the (de)normalization.
#[derive(Debug)]
pub struct Sinusoidal {
    kernel: Arc<SinusoidalKernel>,
}

impl Sinusoidal {
    pub fn new(ellipsoid: &Ellipsoid) -> Self {
        let e2 = ellipsoid.eccentricity_squared();
        Self {
            kernel: Arc::new(SinusoidalKernel {
                eccentricity_squared: e2,
                arc: MeridianArc::new(e2),
            }),
        }
    }

    /// The complete projection from geographic degrees to projected metres.
    pub fn create(
        ellipsoid: &Ellipsoid,
        central_meridian: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> Result<Arc<dyn MathTransform>, FactoryError> {
        create_projected(
            Arc::new(Self::new(ellipsoid)),
            central_meridian,
            ellipsoid.semi_major(),
            false_easting,
            false_northing,
        )
    }
}

impl MathTransform for Sinusoidal {
    fn source_dimensions(&self) -> usize {
        2
    }

    fn target_dimensions(&self) -> usize {
        2
    }

    fn transform_into(&self, pt: &[f64], buf: &mut [f64]) -> Result<(), TransformError> {
        let k = &self.kernel;
        let (sin_phi, cos_phi) = pt[1].sin_cos();
        buf[0] = pt[0] * k.parallel_radius(sin_phi, cos_phi);
        buf[1] = k.arc.length(pt[1]);
        Ok(())
    }

    fn derivative(&self, pt: &[f64]) -> Result<GeneralMatrix, TransformError> {
        Ok(self.kernel.jacobian(pt[0], pt[1]))
    }

    fn inverse(&self) -> Result<Arc<dyn MathTransform>, NoninvertibleError> {
        Ok(Arc::new(SinusoidalInverse {
            kernel: self.kernel.clone(),
        }))
    }

    fn is_identity(&self) -> bool {
        false
    }

    fn inversion_pair(&self) -> Option<(usize, bool)> {
        Some((self.kernel.pair_address(), false))
    }
}

/// Inverse kernel, recovering the latitude through the rectifying
/// latitude series.
#[derive(Debug)]
struct SinusoidalInverse {
    kernel: Arc<SinusoidalKernel>,
}

impl MathTransform for SinusoidalInverse {
    fn source_dimensions(&self) -> usize {
        2
    }

    fn target_dimensions(&self) -> usize {
        2
    }

    fn transform_into(&self, pt: &[f64], buf: &mut [f64]) -> Result<(), TransformError> {
        let k = &self.kernel;
        let phi = k.arc.latitude(pt[1]);
        let (sin_phi, cos_phi) = phi.sin_cos();
        buf[0] = pt[0] / k.parallel_radius(sin_phi, cos_phi);
        buf[1] = phi;
        Ok(())
    }

    fn derivative(&self, pt: &[f64]) -> Result<GeneralMatrix, TransformError> {
        let k = &self.kernel;
        let phi = k.arc.latitude(pt[1]);
        let (sin_phi, cos_phi) = phi.sin_cos();
        let lam = pt[0] / k.parallel_radius(sin_phi, cos_phi);
        Ok(k.jacobian(lam, phi).inverse()?)
    }

    fn inverse(&self) -> Result<Arc<dyn MathTransform>, NoninvertibleError> {
        Ok(Arc::new(Sinusoidal {
            kernel: self.kernel.clone(),
        }))
    }

    fn is_identity(&self) -> bool {
        false
    }

    fn inversion_pair(&self) -> Option<(usize, bool)> {
        Some((self.kernel.pair_address(), true))
    }
}

#[cfg(test)]
mod tests {
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    use super::*;
    use crate::tests::{check_transform_bulk, check_transform_col};
    use crate::transform::concatenate;

    fn make_transform() -> Sinusoidal {
        Sinusoidal::new(&Ellipsoid::wgs84())
    }

    #[test]
    fn test_bulk() {
        check_transform_bulk(make_transform());
    }

    #[test]
    fn test_columns() {
        check_transform_col(make_transform());
    }

    #[test]
    fn test_known_point() {
        let proj = Sinusoidal::create(&Ellipsoid::wgs84(), 0.0, 0.0, 0.0).unwrap();
        let out = proj.transform(&[12.0, 50.0]).unwrap();
        assert_relative_eq!(out[0], 860349.0433920361, max_relative = 1e-12);
        assert_relative_eq!(out[1], 5540847.042090932, max_relative = 1e-12);
    }

    #[test]
    fn test_quarter_meridian() {
        let proj = Sinusoidal::create(&Ellipsoid::wgs84(), 0.0, 0.0, 0.0).unwrap();
        let out = proj.transform(&[0.0, 90.0]).unwrap();
        assert_eq!(out[0], 0.0);
        assert_relative_eq!(out[1], 10001965.729528552, max_relative = 1e-12);
    }

    #[test]
    fn test_false_origin_applies_at_central_meridian() {
        let proj = Sinusoidal::create(&Ellipsoid::wgs84(), 12.0, 500_000.0, 10_000.0).unwrap();
        let out = proj.transform(&[12.0, 50.0]).unwrap();
        // on the central meridian the easting is the false easting, exactly
        assert_eq!(out[0], 500_000.0);
        assert_relative_eq!(out[1], 5_550_847.042090932, max_relative = 1e-12);
    }

    #[test]
    fn test_equator_is_linear() {
        let proj = Sinusoidal::create(&Ellipsoid::wgs84(), 0.0, 0.0, 0.0).unwrap();
        let out = proj.transform(&[30.0, 0.0]).unwrap();
        assert_eq!(out[0], 6378137.0 * (30.0 * (std::f64::consts::PI / 180.0)));
        assert_eq!(out[1], 0.0);
    }

    #[test]
    fn test_round_trip() {
        let proj = Sinusoidal::create(&Ellipsoid::wgs84(), 12.0, 500_000.0, 10_000.0).unwrap();
        let back = proj.inverse().unwrap();
        for lon in [-179.0, -30.0, 0.0, 12.0, 179.0] {
            for lat in [-89.0, -45.5, 0.0, 33.25, 89.0] {
                let projected = proj.transform(&[lon, lat]).unwrap();
                let geo = back.transform(&projected).unwrap();
                // longitude degrades near the poles where the parallel shrinks
                assert_abs_diff_eq!(geo[0], lon, epsilon = 1e-6);
                assert_abs_diff_eq!(geo[1], lat, epsilon = 1e-8);
            }
        }
    }

    #[test]
    fn test_projection_collapses_with_its_inverse() {
        let proj = Sinusoidal::create(&Ellipsoid::wgs84(), 0.0, 0.0, 0.0).unwrap();
        let chained = concatenate(proj.clone(), proj.inverse().unwrap()).unwrap();
        assert!(chained.is_identity());
    }

    #[test]
    fn test_derivative_matches_finite_differences() {
        let t = make_transform();
        let pt = [0.2, 0.9];
        let jac = t.derivative(&pt).unwrap();
        let delta = 1e-7;
        for col in 0..2 {
            let mut hi = pt;
            let mut lo = pt;
            hi[col] += delta;
            lo[col] -= delta;
            let out_hi = t.transform(&hi).unwrap();
            let out_lo = t.transform(&lo).unwrap();
            for row in 0..2 {
                let numeric = (out_hi[row] - out_lo[row]) / (2.0 * delta);
                assert_relative_eq!(
                    jac.element(row, col),
                    numeric,
                    max_relative = 1e-5,
                    epsilon = 1e-8
                );
            }
        }
    }

    #[test]
    fn test_inverse_derivative_is_jacobian_inverse() {
        let fwd = make_transform();
        let pt = [0.3, 0.7];
        let plane = fwd.transform(&pt).unwrap();
        let inv = fwd.inverse().unwrap();
        let product = fwd
            .derivative(&pt)
            .unwrap()
            .multiply(&inv.derivative(&plane).unwrap())
            .unwrap();
        for r in 0..2 {
            for c in 0..2 {
                let expected = if r == c { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(product.element(r, c), expected, epsilon = 1e-9);
            }
        }
    }
}
