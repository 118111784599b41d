use std::sync::Arc;

use crate::crs::Unit;
use crate::error::FactoryError;
use crate::transform::projection::Sinusoidal;
use crate::transform::{Ellipsoid, MathTransform};

use super::parameter::{ParameterDescriptor, ParameterDescriptorGroup, ParameterValueGroup};
use super::{Context, OperationMethod};

/// Equatorial radius of the ellipsoid. Every projection method and the
/// geographic/geocentric conversions share these two axis descriptors.
pub(crate) static SEMI_MAJOR: ParameterDescriptor =
    ParameterDescriptor::new("semi_major", Unit::METRE).with_aliases(&["Semi_Major"]);
pub(crate) static SEMI_MINOR: ParameterDescriptor =
    ParameterDescriptor::new("semi_minor", Unit::METRE).with_aliases(&["Semi_Minor"]);

static CENTRAL_MERIDIAN: ParameterDescriptor =
    ParameterDescriptor::new("central_meridian", Unit::DEGREE)
        .with_aliases(&["Central_Meridian", "Longitude of natural origin"])
        .with_default(0.0)
        .with_range(-180.0, 180.0);
static FALSE_EASTING: ParameterDescriptor = ParameterDescriptor::new("false_easting", Unit::METRE)
    .with_aliases(&["False_Easting"])
    .with_default(0.0);
static FALSE_NORTHING: ParameterDescriptor =
    ParameterDescriptor::new("false_northing", Unit::METRE)
        .with_aliases(&["False_Northing"])
        .with_default(0.0);

static SINUSOIDAL: ParameterDescriptorGroup = ParameterDescriptorGroup::new(
    "Sinusoidal",
    None,
    &["Sanson-Flamsteed", "CT_Sinusoidal", "sinu"],
    &[
        &SEMI_MAJOR,
        &SEMI_MINOR,
        &CENTRAL_MERIDIAN,
        &FALSE_EASTING,
        &FALSE_NORTHING,
    ],
);

/// Both axes in metres, the semi-minor coerced through the unit the
/// semi-major was given in.
pub(crate) fn ellipsoid_from(
    values: &ParameterValueGroup,
    semi_major: &str,
    semi_minor: &str,
) -> Result<Ellipsoid, FactoryError> {
    let unit = values.unit_of(semi_major)?;
    let a = values.value_in(semi_major, Unit::METRE)?;
    let b = unit.convert(values.value_in(semi_minor, unit)?, &Unit::METRE)?;
    Ellipsoid::try_new("ellipsoid", a, b)
}

/// The pseudocylindrical equal-area projection of Sanson and Flamsteed.
#[derive(Debug)]
pub struct SinusoidalMethod;

impl OperationMethod for SinusoidalMethod {
    fn parameters(&self) -> &'static ParameterDescriptorGroup {
        &SINUSOIDAL
    }

    fn source_dimensions(&self) -> Option<usize> {
        Some(2)
    }

    fn target_dimensions(&self) -> Option<usize> {
        Some(2)
    }

    fn create_math_transform(
        &self,
        context: &Context,
    ) -> Result<Arc<dyn MathTransform>, FactoryError> {
        let values = context.parameters();
        let ellipsoid = ellipsoid_from(values, "semi_major", "semi_minor")?;
        Sinusoidal::create(
            &ellipsoid,
            values.value("central_meridian")?,
            values.value("false_easting")?,
            values.value("false_northing")?,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::SMALL_NUMBER;

    fn wgs84_values() -> ParameterValueGroup {
        let mut values = ParameterValueGroup::new(&SINUSOIDAL);
        values.set("semi_major", 6_378_137.0).unwrap();
        values.set("semi_minor", 6_356_752.314245179).unwrap();
        values
    }

    #[test]
    fn test_defaults_match_the_plain_construction() {
        crate::tests::init_logger();
        let method = SinusoidalMethod;
        let built = method
            .create_math_transform(&Context::new(wgs84_values()))
            .unwrap();
        let direct = Sinusoidal::create(&Ellipsoid::wgs84(), 0.0, 0.0, 0.0).unwrap();
        let pt = [12.0, 50.0];
        assert_eq!(
            built.transform(&pt).unwrap().as_slice(),
            direct.transform(&pt).unwrap().as_slice()
        );
    }

    #[test]
    fn test_esri_aliases_and_degree_conversion() {
        crate::tests::init_logger();
        let mut values = wgs84_values();
        values.set("Central_Meridian", 12.0).unwrap();
        values.set("False_Easting", 500_000.0).unwrap();
        values.set("False_Northing", 10_000.0).unwrap();
        let built = SinusoidalMethod
            .create_math_transform(&Context::new(values))
            .unwrap();
        let out = built.transform(&[12.0, 50.0]).unwrap();
        assert_eq!(out[0], 500_000.0);
        approx::assert_relative_eq!(out[1], 5_550_847.042090932, max_relative = 1e-12);
    }

    #[test]
    fn test_axis_units_are_coerced_together() {
        crate::tests::init_logger();
        let mut km = ParameterValueGroup::new(&SINUSOIDAL);
        km.set_in("semi_major", 6_378.137, Unit::KILOMETRE).unwrap();
        km.set_in("semi_minor", 6_356.752314245179, Unit::KILOMETRE)
            .unwrap();
        let built = SinusoidalMethod
            .create_math_transform(&Context::new(km))
            .unwrap();
        let reference = SinusoidalMethod
            .create_math_transform(&Context::new(wgs84_values()))
            .unwrap();
        let pt = [12.0, 50.0];
        let out = built.transform(&pt).unwrap();
        let expected = reference.transform(&pt).unwrap();
        approx::assert_relative_eq!(out[0], expected[0], max_relative = SMALL_NUMBER);
        approx::assert_relative_eq!(out[1], expected[1], max_relative = SMALL_NUMBER);
    }

    #[test]
    fn test_central_meridian_range() {
        let mut values = wgs84_values();
        assert!(matches!(
            values.set("central_meridian", 200.0),
            Err(FactoryError::InvalidParameter {
                name: "central_meridian",
                ..
            })
        ));
    }

    #[test]
    fn test_axes_are_required() {
        let mut values = ParameterValueGroup::new(&SINUSOIDAL);
        values.set("semi_major", 6_378_137.0).unwrap();
        assert!(matches!(
            SinusoidalMethod.create_math_transform(&Context::new(values)),
            Err(FactoryError::MissingParameter("semi_minor"))
        ));
    }
}
