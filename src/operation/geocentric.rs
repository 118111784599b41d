use std::sync::Arc;

use crate::crs::CsKind;
use crate::error::FactoryError;
use crate::transform::{CentricToEllipsoid, EllipsoidToCentric, MathTransform};

use super::parameter::ParameterDescriptorGroup;
use super::projection::{SEMI_MAJOR, SEMI_MINOR, ellipsoid_from};
use super::{Context, OperationMethod};

static TO_GEOCENTRIC: ParameterDescriptorGroup = ParameterDescriptorGroup::new(
    "Ellipsoid_To_Geocentric",
    Some("9602"),
    &["Geographic/geocentric conversions"],
    &[&SEMI_MAJOR, &SEMI_MINOR],
);

static TO_GEOGRAPHIC: ParameterDescriptorGroup = ParameterDescriptorGroup::new(
    "Geocentric_To_Ellipsoid",
    None,
    &[],
    &[&SEMI_MAJOR, &SEMI_MINOR],
);

/// Geographic degrees (optionally with ellipsoidal height) to geocentric
/// metres.
///
/// The EPSG name and code for this method cover both directions; when the
/// context makes clear the caller wants the geocentric to geographic
/// direction, lookup is redirected to [GeocentricToGeographic].
#[derive(Debug)]
pub struct GeographicToGeocentric;

impl OperationMethod for GeographicToGeocentric {
    fn parameters(&self) -> &'static ParameterDescriptorGroup {
        &TO_GEOCENTRIC
    }

    fn target_dimensions(&self) -> Option<usize> {
        Some(3)
    }

    fn resolve_ambiguity(&self, context: &Context) -> Option<&'static str> {
        match (context.source_cs(), context.target_cs()) {
            (Some(source), Some(target))
                if source.kind() == CsKind::Cartesian && target.kind() == CsKind::Ellipsoidal =>
            {
                Some("Geocentric_To_Ellipsoid")
            }
            _ => None,
        }
    }

    fn create_math_transform(
        &self,
        context: &Context,
    ) -> Result<Arc<dyn MathTransform>, FactoryError> {
        let ellipsoid = ellipsoid_from(context.parameters(), "semi_major", "semi_minor")?;
        let with_height = context.source_dimensions().unwrap_or(3) >= 3;
        EllipsoidToCentric::create(&ellipsoid, with_height)
    }
}

/// Geocentric metres to geographic degrees, dropping the height when the
/// target system is two-dimensional.
#[derive(Debug)]
pub struct GeocentricToGeographic;

impl OperationMethod for GeocentricToGeographic {
    fn parameters(&self) -> &'static ParameterDescriptorGroup {
        &TO_GEOGRAPHIC
    }

    fn source_dimensions(&self) -> Option<usize> {
        Some(3)
    }

    fn create_math_transform(
        &self,
        context: &Context,
    ) -> Result<Arc<dyn MathTransform>, FactoryError> {
        let ellipsoid = ellipsoid_from(context.parameters(), "semi_major", "semi_minor")?;
        let with_height = context.target_dimensions().unwrap_or(3) >= 3;
        CentricToEllipsoid::create(&ellipsoid, with_height)
    }
}
