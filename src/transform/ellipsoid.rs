use std::sync::Arc;

use crate::dd::DoubleDouble;
use crate::error::{FactoryError, NoninvertibleError, TransformError};
use crate::matrix::GeneralMatrix;
use crate::transform::{LinearTransform, MathTransform, concatenate_all};

/// An oblate reference ellipsoid, described by its two semi-axis lengths in
/// metres.
#[derive(Debug, Clone, PartialEq)]
pub struct Ellipsoid {
    name: &'static str,
    semi_major: f64,
    semi_minor: f64,
    eccentricity_squared: f64,
}

impl Ellipsoid {
    pub fn try_new(
        name: &'static str,
        semi_major: f64,
        semi_minor: f64,
    ) -> Result<Self, FactoryError> {
        if !(semi_major.is_finite() && semi_minor.is_finite())
            || semi_minor <= 0.0
            || semi_minor > semi_major
        {
            return Err(FactoryError::InvalidParameter {
                name: "semi_minor",
                reason: format!("axes {semi_major} >= {semi_minor} > 0 required"),
            });
        }
        let eccentricity_squared =
            (semi_major * semi_major - semi_minor * semi_minor) / (semi_major * semi_major);
        Ok(Self {
            name,
            semi_major,
            semi_minor,
            eccentricity_squared,
        })
    }

    pub fn from_inverse_flattening(
        name: &'static str,
        semi_major: f64,
        inverse_flattening: f64,
    ) -> Result<Self, FactoryError> {
        if !inverse_flattening.is_finite() || inverse_flattening <= 1.0 {
            return Err(FactoryError::InvalidParameter {
                name: "inverse_flattening",
                reason: format!("{inverse_flattening} is not > 1"),
            });
        }
        Self::try_new(name, semi_major, semi_major * (1.0 - 1.0 / inverse_flattening))
    }

    pub fn wgs84() -> Self {
        let semi_major = 6378137.0;
        let semi_minor = semi_major * (1.0 - 1.0 / 298.257223563);
        Self {
            name: "WGS 84",
            semi_major,
            semi_minor,
            eccentricity_squared: (semi_major * semi_major - semi_minor * semi_minor)
                / (semi_major * semi_major),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Equatorial radius in metres.
    pub fn semi_major(&self) -> f64 {
        self.semi_major
    }

    /// Polar radius in metres.
    pub fn semi_minor(&self) -> f64 {
        self.semi_minor
    }

    pub fn eccentricity_squared(&self) -> f64 {
        self.eccentricity_squared
    }

    pub fn is_sphere(&self) -> bool {
        self.semi_major == self.semi_minor
    }
}

/// Shared state of a geodetic/geocentric conversion pair.
///
/// Works in normalized units: angles in radians, lengths as fractions of the
/// semi-major axis. The complete conversions built by
/// [EllipsoidToCentric::create] and [CentricToEllipsoid::create] sandwich
/// this kernel between the linear steps doing the (de)normalization.
#[derive(Debug)]
struct GeodeticKernel {
    eccentricity_squared: f64,
    /// `semi_minor / semi_major`.
    axis_ratio: f64,
    /// When unset the geodetic side is two-dimensional and ellipsoidal
    /// height is taken as zero.
    with_height: bool,
}

impl GeodeticKernel {
    const MAX_ITERATIONS: usize = 20;
    /// Convergence threshold on the latitude update, in radians.
    const ITERATION_TOLERANCE: f64 = 1e-15;
    /// Below this |cos φ| the height is computed from the polar axis.
    const POLAR_LIMIT: f64 = 1e-8;

    fn new(ellipsoid: &Ellipsoid, with_height: bool) -> Self {
        Self {
            eccentricity_squared: ellipsoid.eccentricity_squared(),
            axis_ratio: ellipsoid.semi_minor() / ellipsoid.semi_major(),
            with_height,
        }
    }

    fn geodetic_dimensions(&self) -> usize {
        if self.with_height { 3 } else { 2 }
    }

    /// Prime vertical radius of curvature over the semi-major axis.
    fn prime_vertical(&self, sin_phi: f64) -> f64 {
        1.0 / (1.0 - self.eccentricity_squared * sin_phi * sin_phi).sqrt()
    }

    fn height(&self, p: f64, z: f64, sin_phi: f64, cos_phi: f64, nu: f64) -> f64 {
        if cos_phi.abs() > Self::POLAR_LIMIT {
            p / cos_phi - nu
        } else {
            z / sin_phi - nu * (1.0 - self.eccentricity_squared)
        }
    }

    /// Geocentric (x, y, z) back to (λ, φ, h), all normalized.
    ///
    /// Longitude is direct; latitude comes from a fixed-point iteration which
    /// settles within a handful of rounds anywhere off the geocenter.
    fn geodetic(&self, pt: &[f64]) -> Result<(f64, f64, f64), TransformError> {
        let e2 = self.eccentricity_squared;
        let (x, y, z) = (pt[0], pt[1], pt[2]);
        let lam = y.atan2(x);
        let p = x.hypot(y);
        let mut phi = z.atan2(p * (1.0 - e2));
        for _ in 0..Self::MAX_ITERATIONS {
            let (sin_phi, cos_phi) = phi.sin_cos();
            let nu = self.prime_vertical(sin_phi);
            let h = self.height(p, z, sin_phi, cos_phi, nu);
            let next = z.atan2(p * (1.0 - e2 * nu / (nu + h)));
            let delta = (next - phi).abs();
            phi = next;
            if delta <= Self::ITERATION_TOLERANCE {
                let (sin_phi, cos_phi) = phi.sin_cos();
                let nu = self.prime_vertical(sin_phi);
                let h = self.height(p, z, sin_phi, cos_phi, nu);
                return Ok((lam, phi, h));
            }
        }
        Err(TransformError::NoConvergence(Self::MAX_ITERATIONS))
    }

    /// Jacobian of the forward (geodetic to geocentric) map, always with the
    /// height column.
    fn forward_jacobian(&self, lam: f64, phi: f64, h: f64) -> GeneralMatrix {
        let e2 = self.eccentricity_squared;
        let (sin_lam, cos_lam) = lam.sin_cos();
        let (sin_phi, cos_phi) = phi.sin_cos();
        let nu = self.prime_vertical(sin_phi);
        let dnu = nu * nu * nu * e2 * sin_phi * cos_phi;
        let radial = dnu * cos_phi - (nu + h) * sin_phi;

        let mut m = GeneralMatrix::zero(3, 3);
        m.set_element(0, 0, -(nu + h) * cos_phi * sin_lam);
        m.set_element(0, 1, radial * cos_lam);
        m.set_element(0, 2, cos_phi * cos_lam);
        m.set_element(1, 0, (nu + h) * cos_phi * cos_lam);
        m.set_element(1, 1, radial * sin_lam);
        m.set_element(1, 2, cos_phi * sin_lam);
        m.set_element(
            2,
            1,
            dnu * (1.0 - e2) * sin_phi + (nu * (1.0 - e2) + h) * cos_phi,
        );
        m.set_element(2, 2, sin_phi);
        m
    }

    fn pair_address(self: &Arc<Self>) -> usize {
        Arc::as_ptr(self) as usize
    }
}

/// Geodetic (λ, φ[, h]) to geocentric (x, y, z) conversion kernel, in
/// normalized units.
#[derive(Debug)]
pub struct EllipsoidToCentric {
    kernel: Arc<GeodeticKernel>,
}

impl EllipsoidToCentric {
    pub fn new(ellipsoid: &Ellipsoid, with_height: bool) -> Self {
        Self {
            kernel: Arc::new(GeodeticKernel::new(ellipsoid, with_height)),
        }
    }

    /// The complete conversion from geographic degrees (and metres of
    /// ellipsoidal height) to geocentric metres.
    pub fn create(
        ellipsoid: &Ellipsoid,
        with_height: bool,
    ) -> Result<Arc<dyn MathTransform>, FactoryError> {
        let a = ellipsoid.semi_major();
        let deg = DoubleDouble::PI.div(DoubleDouble::from(180.0));
        let normalize = if with_height {
            LinearTransform::scale_and_translate_extended(
                &[deg, deg, DoubleDouble::ONE.div(DoubleDouble::from(a))],
                &[DoubleDouble::ZERO; 3],
            )?
        } else {
            LinearTransform::scale_and_translate_extended(&[deg, deg], &[DoubleDouble::ZERO; 2])?
        };
        let denormalize = LinearTransform::scale(&[a, a, a]);
        concatenate_all(vec![
            Arc::new(normalize),
            Arc::new(Self::new(ellipsoid, with_height)),
            Arc::new(denormalize),
        ])
    }
}

impl MathTransform for EllipsoidToCentric {
    fn source_dimensions(&self) -> usize {
        self.kernel.geodetic_dimensions()
    }

    fn target_dimensions(&self) -> usize {
        3
    }

    fn transform_into(&self, pt: &[f64], buf: &mut [f64]) -> Result<(), TransformError> {
        let k = &self.kernel;
        let h = if k.with_height { pt[2] } else { 0.0 };
        let (sin_lam, cos_lam) = pt[0].sin_cos();
        let (sin_phi, cos_phi) = pt[1].sin_cos();
        let nu = k.prime_vertical(sin_phi);
        buf[0] = (nu + h) * cos_phi * cos_lam;
        buf[1] = (nu + h) * cos_phi * sin_lam;
        buf[2] = (nu * (1.0 - k.eccentricity_squared) + h) * sin_phi;
        Ok(())
    }

    fn derivative(&self, pt: &[f64]) -> Result<GeneralMatrix, TransformError> {
        let h = if self.kernel.with_height { pt[2] } else { 0.0 };
        let full = self.kernel.forward_jacobian(pt[0], pt[1], h);
        if self.kernel.with_height {
            Ok(full)
        } else {
            Ok(full.block(0..3, 0..2))
        }
    }

    fn inverse(&self) -> Result<Arc<dyn MathTransform>, NoninvertibleError> {
        Ok(Arc::new(CentricToEllipsoid {
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

/// Geocentric (x, y, z) to geodetic (λ, φ[, h]) conversion kernel, in
/// normalized units.
#[derive(Debug)]
pub struct CentricToEllipsoid {
    kernel: Arc<GeodeticKernel>,
}

impl CentricToEllipsoid {
    pub fn new(ellipsoid: &Ellipsoid, with_height: bool) -> Self {
        Self {
            kernel: Arc::new(GeodeticKernel::new(ellipsoid, with_height)),
        }
    }

    /// The complete conversion from geocentric metres to geographic degrees
    /// (and metres of ellipsoidal height).
    pub fn create(
        ellipsoid: &Ellipsoid,
        with_height: bool,
    ) -> Result<Arc<dyn MathTransform>, FactoryError> {
        let a = ellipsoid.semi_major();
        let inv_a = DoubleDouble::ONE.div(DoubleDouble::from(a));
        let normalize =
            LinearTransform::scale_and_translate_extended(&[inv_a; 3], &[DoubleDouble::ZERO; 3])?;
        let rad = DoubleDouble::from(180.0).div(DoubleDouble::PI);
        let denormalize = if with_height {
            LinearTransform::scale_and_translate_extended(
                &[rad, rad, DoubleDouble::from(a)],
                &[DoubleDouble::ZERO; 3],
            )?
        } else {
            LinearTransform::scale_and_translate_extended(&[rad, rad], &[DoubleDouble::ZERO; 2])?
        };
        concatenate_all(vec![
            Arc::new(normalize),
            Arc::new(Self::new(ellipsoid, with_height)),
            Arc::new(denormalize),
        ])
    }
}

impl MathTransform for CentricToEllipsoid {
    fn source_dimensions(&self) -> usize {
        3
    }

    fn target_dimensions(&self) -> usize {
        self.kernel.geodetic_dimensions()
    }

    fn transform_into(&self, pt: &[f64], buf: &mut [f64]) -> Result<(), TransformError> {
        let (lam, phi, h) = self.kernel.geodetic(pt)?;
        buf[0] = lam;
        buf[1] = phi;
        if self.kernel.with_height {
            buf[2] = h;
        }
        Ok(())
    }

    fn derivative(&self, pt: &[f64]) -> Result<GeneralMatrix, TransformError> {
        let (lam, phi, h) = self.kernel.geodetic(pt)?;
        let inv = self.kernel.forward_jacobian(lam, phi, h).inverse()?;
        if self.kernel.with_height {
            Ok(inv)
        } else {
            Ok(inv.block(0..2, 0..3))
        }
    }

    fn inverse(&self) -> Result<Arc<dyn MathTransform>, NoninvertibleError> {
        Ok(Arc::new(EllipsoidToCentric {
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
