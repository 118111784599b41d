//! Map projection kernels.
//!
//! Kernels work on a normalized plane: input longitude is relative to the
//! central meridian in radians, output easting/northing are fractions of the
//! semi-major axis. The `create` factory of each projection sandwiches its
//! kernel between the linear steps carrying the central meridian, the
//! semi-major scaling, and the false easting/northing.

use std::sync::Arc;

use crate::dd::DoubleDouble;
use crate::error::FactoryError;
use crate::transform::{LinearTransform, MathTransform, concatenate_all};

mod sinusoidal;

pub use sinusoidal::Sinusoidal;

/// Meridian arc length from the equator and its inverse, as truncated series
/// in the eccentricity.
#[derive(Debug)]
pub(crate) struct MeridianArc {
    c0: f64,
    c2: f64,
    c4: f64,
    c6: f64,
    /// Coefficients of the rectifying-latitude expansion.
    p2: f64,
    p4: f64,
    p6: f64,
    p8: f64,
}

impl MeridianArc {
    pub(crate) fn new(eccentricity_squared: f64) -> Self {
        let e2 = eccentricity_squared;
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        let se = (1.0 - e2).sqrt();
        let e1 = (1.0 - se) / (1.0 + se);
        let e1_2 = e1 * e1;
        let e1_3 = e1_2 * e1;
        let e1_4 = e1_2 * e1_2;
        Self {
            c0: 1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0,
            c2: 3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0,
            c4: 15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0,
            c6: 35.0 * e6 / 3072.0,
            p2: 3.0 * e1 / 2.0 - 27.0 * e1_3 / 32.0,
            p4: 21.0 * e1_2 / 16.0 - 55.0 * e1_4 / 32.0,
            p6: 151.0 * e1_3 / 96.0,
            p8: 1097.0 * e1_4 / 512.0,
        }
    }

    /// Arc length from the equator to `phi`, semi-major axis taken as 1.
    pub(crate) fn length(&self, phi: f64) -> f64 {
        self.c0 * phi - self.c2 * (2.0 * phi).sin() + self.c4 * (4.0 * phi).sin()
            - self.c6 * (6.0 * phi).sin()
    }

    /// d(length)/dφ, from the same series so that derivatives agree with
    /// [MeridianArc::length] rather than with the exact integrand.
    pub(crate) fn length_derivative(&self, phi: f64) -> f64 {
        self.c0 - 2.0 * self.c2 * (2.0 * phi).cos() + 4.0 * self.c4 * (4.0 * phi).cos()
            - 6.0 * self.c6 * (6.0 * phi).cos()
    }

    /// Latitude whose arc length from the equator is `m`.
    pub(crate) fn latitude(&self, m: f64) -> f64 {
        let mu = m / self.c0;
        mu + self.p2 * (2.0 * mu).sin()
            + self.p4 * (4.0 * mu).sin()
            + self.p6 * (6.0 * mu).sin()
            + self.p8 * (8.0 * mu).sin()
    }
}

/// Build the complete projected transform around a kernel: geographic
/// degrees in, projected metres out. The reverse direction falls out of
/// the concatenation's own `inverse`.
pub(crate) fn create_projected(
    kernel: Arc<dyn MathTransform>,
    central_meridian: f64,
    semi_major: f64,
    false_easting: f64,
    false_northing: f64,
) -> Result<Arc<dyn MathTransform>, FactoryError> {
    let deg = DoubleDouble::PI.div(DoubleDouble::from(180.0));
    // (λ - λ0, φ) in radians, then kernel, then metres + false offsets
    let normalize = LinearTransform::scale_and_translate_extended(
        &[deg, deg],
        &[
            deg.mul(DoubleDouble::from(-central_meridian)),
            DoubleDouble::ZERO,
        ],
    )?;
    let denormalize = LinearTransform::scale_and_translate(
        &[semi_major, semi_major],
        &[false_easting, false_northing],
    )?;
    concatenate_all(vec![Arc::new(normalize), kernel, Arc::new(denormalize)])
}
