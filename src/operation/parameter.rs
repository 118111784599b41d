use std::sync::Arc;

use crate::crs::Unit;
use crate::error::FactoryError;
use crate::transform::MovingFeature;

/// What a parameter value is: a number with a unit, or a moving feature
/// consumed whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    Real,
    Feature,
}

/// Static description of one operation parameter: canonical name, aliases
/// from other naming authorities, unit, optional default and valid range.
///
/// Descriptors are defined once per operation method as `static` items and
/// shared by every value group built for that method.
#[derive(Debug)]
pub struct ParameterDescriptor {
    name: &'static str,
    aliases: &'static [&'static str],
    kind: ParameterKind,
    unit: Unit,
    default: Option<f64>,
    range: Option<(f64, f64)>,
}

impl ParameterDescriptor {
    pub const fn new(name: &'static str, unit: Unit) -> Self {
        Self {
            name,
            aliases: &[],
            kind: ParameterKind::Real,
            unit,
            default: None,
            range: None,
        }
    }

    /// A parameter holding a moving feature rather than a number.
    pub const fn feature(name: &'static str) -> Self {
        Self {
            name,
            aliases: &[],
            kind: ParameterKind::Feature,
            unit: Unit::UNITY,
            default: None,
            range: None,
        }
    }

    pub const fn with_aliases(mut self, aliases: &'static [&'static str]) -> Self {
        self.aliases = aliases;
        self
    }

    /// Default value, in the descriptor's unit. A parameter without a
    /// default is required.
    pub const fn with_default(mut self, default: f64) -> Self {
        self.default = Some(default);
        self
    }

    /// Inclusive valid range, in the descriptor's unit.
    pub const fn with_range(mut self, low: f64, high: f64) -> Self {
        self.range = Some((low, high));
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> ParameterKind {
        self.kind
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn default(&self) -> Option<f64> {
        self.default
    }

    fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }

    /// Range check on a value already converted to the descriptor's unit.
    fn validate(&self, value: f64) -> Result<(), FactoryError> {
        if let Some((low, high)) = self.range {
            if !(value >= low && value <= high) {
                return Err(FactoryError::InvalidParameter {
                    name: self.name,
                    reason: format!("{value} {} outside [{low}, {high}]", self.unit.symbol()),
                });
            }
        }
        Ok(())
    }
}

/// The named parameter set of one operation method, with its identifier and
/// aliases in other registries.
#[derive(Debug)]
pub struct ParameterDescriptorGroup {
    name: &'static str,
    identifier: Option<&'static str>,
    aliases: &'static [&'static str],
    parameters: &'static [&'static ParameterDescriptor],
}

impl ParameterDescriptorGroup {
    pub const fn new(
        name: &'static str,
        identifier: Option<&'static str>,
        aliases: &'static [&'static str],
        parameters: &'static [&'static ParameterDescriptor],
    ) -> Self {
        Self {
            name,
            identifier,
            aliases,
            parameters,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// EPSG (or other authority) code of the operation method.
    pub fn identifier(&self) -> Option<&'static str> {
        self.identifier
    }

    pub fn aliases(&self) -> &'static [&'static str] {
        self.aliases
    }

    pub fn parameters(&self) -> &'static [&'static ParameterDescriptor] {
        self.parameters
    }

    pub fn find(&self, name: &str) -> Option<&'static ParameterDescriptor> {
        self.parameters.iter().copied().find(|p| p.matches(name))
    }

    fn require(&self, name: &str) -> Result<&'static ParameterDescriptor, FactoryError> {
        self.find(name)
            .ok_or_else(|| FactoryError::UnknownParameter(name.to_owned()))
    }
}

/// One supplied parameter value, kept in the unit it was given in.
#[derive(Debug, Clone)]
pub enum ParameterValue {
    Real { value: f64, unit: Unit },
    Feature(Arc<dyn MovingFeature>),
}

/// Per-invocation parameter values for one operation method.
///
/// Built mutably on one thread, then handed read-only to
/// `create_math_transform`. Values are stored in the unit they were set in
/// and converted on read; unset parameters fall back to the descriptor
/// default.
#[derive(Debug, Clone)]
pub struct ParameterValueGroup {
    group: &'static ParameterDescriptorGroup,
    values: Vec<(&'static ParameterDescriptor, ParameterValue)>,
}

impl ParameterValueGroup {
    pub fn new(group: &'static ParameterDescriptorGroup) -> Self {
        Self {
            group,
            values: Vec::new(),
        }
    }

    pub fn descriptors(&self) -> &'static ParameterDescriptorGroup {
        self.group
    }

    fn stored(&self, descriptor: &'static ParameterDescriptor) -> Option<&ParameterValue> {
        self.values
            .iter()
            .find(|(d, _)| std::ptr::eq(*d, descriptor))
            .map(|(_, v)| v)
    }

    fn store(&mut self, descriptor: &'static ParameterDescriptor, value: ParameterValue) {
        match self
            .values
            .iter_mut()
            .find(|(d, _)| std::ptr::eq(*d, descriptor))
        {
            Some((_, slot)) => *slot = value,
            None => self.values.push((descriptor, value)),
        }
    }

    /// Set a value given in the descriptor's own unit.
    pub fn set(&mut self, name: &str, value: f64) -> Result<(), FactoryError> {
        let unit = self.group.require(name)?.unit();
        self.set_in(name, value, unit)
    }

    /// Set a value given in an explicit unit, which must be convertible to
    /// the descriptor's unit.
    pub fn set_in(&mut self, name: &str, value: f64, unit: Unit) -> Result<(), FactoryError> {
        let descriptor = self.group.require(name)?;
        if descriptor.kind() != ParameterKind::Real {
            return Err(FactoryError::InvalidParameter {
                name: descriptor.name(),
                reason: "expects a feature, not a number".into(),
            });
        }
        descriptor.validate(unit.convert(value, &descriptor.unit())?)?;
        self.store(descriptor, ParameterValue::Real { value, unit });
        Ok(())
    }

    pub fn set_feature(
        &mut self,
        name: &str,
        feature: Arc<dyn MovingFeature>,
    ) -> Result<(), FactoryError> {
        let descriptor = self.group.require(name)?;
        if descriptor.kind() != ParameterKind::Feature {
            return Err(FactoryError::InvalidParameter {
                name: descriptor.name(),
                reason: "expects a number, not a feature".into(),
            });
        }
        self.store(descriptor, ParameterValue::Feature(feature));
        Ok(())
    }

    /// The value in the descriptor's own unit, the default if unset.
    pub fn value(&self, name: &str) -> Result<f64, FactoryError> {
        let descriptor = self.group.require(name)?;
        self.value_in(name, descriptor.unit())
    }

    /// The value converted to the given unit, the default if unset.
    pub fn value_in(&self, name: &str, unit: Unit) -> Result<f64, FactoryError> {
        let descriptor = self.group.require(name)?;
        match self.stored(descriptor) {
            Some(ParameterValue::Real { value, unit: from }) => from.convert(*value, &unit),
            Some(ParameterValue::Feature(_)) => Err(FactoryError::InvalidParameter {
                name: descriptor.name(),
                reason: "holds a feature, not a number".into(),
            }),
            None => {
                let default = descriptor
                    .default()
                    .ok_or(FactoryError::MissingParameter(descriptor.name()))?;
                descriptor.unit().convert(default, &unit)
            }
        }
    }

    /// The unit the value was supplied in, the descriptor's unit if unset.
    ///
    /// Providers use this to coerce related parameters to a common unit, e.g.
    /// the semi-minor axis to the unit of the semi-major axis.
    pub fn unit_of(&self, name: &str) -> Result<Unit, FactoryError> {
        let descriptor = self.group.require(name)?;
        Ok(match self.stored(descriptor) {
            Some(ParameterValue::Real { unit, .. }) => *unit,
            _ => descriptor.unit(),
        })
    }

    pub fn feature(&self, name: &str) -> Result<Arc<dyn MovingFeature>, FactoryError> {
        let descriptor = self.group.require(name)?;
        match self.stored(descriptor) {
            Some(ParameterValue::Feature(feature)) => Ok(feature.clone()),
            Some(ParameterValue::Real { .. }) => Err(FactoryError::InvalidParameter {
                name: descriptor.name(),
                reason: "holds a number, not a feature".into(),
            }),
            None => Err(FactoryError::MissingParameter(descriptor.name())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static FLATTENING: ParameterDescriptor =
        ParameterDescriptor::new("flattening", Unit::UNITY).with_default(0.0);
    static RADIUS: ParameterDescriptor = ParameterDescriptor::new("radius", Unit::METRE)
        .with_aliases(&["Radius_Of_Sphere"])
        .with_range(0.0, 1e8);
    static GROUP: ParameterDescriptorGroup = ParameterDescriptorGroup::new(
        "Test sphere",
        Some("0000"),
        &["Sphere"],
        &[&RADIUS, &FLATTENING],
    );

    #[test]
    fn test_defaults_and_missing() {
        let values = ParameterValueGroup::new(&GROUP);
        assert_eq!(values.value("flattening").unwrap(), 0.0);
        assert!(matches!(
            values.value("radius"),
            Err(FactoryError::MissingParameter("radius"))
        ));
        assert!(matches!(
            values.value("no_such_thing"),
            Err(FactoryError::UnknownParameter(_))
        ));
    }

    #[test]
    fn test_alias_and_unit_conversion() {
        let mut values = ParameterValueGroup::new(&GROUP);
        values
            .set_in("Radius_Of_Sphere", 6378.137, Unit::KILOMETRE)
            .unwrap();
        assert_eq!(values.value("radius").unwrap(), 6378137.0);
        assert_eq!(values.unit_of("radius").unwrap(), Unit::KILOMETRE);
        assert_eq!(
            values.value_in("radius", Unit::KILOMETRE).unwrap(),
            6378.137
        );
    }

    #[test]
    fn test_range_is_checked_in_descriptor_unit() {
        let mut values = ParameterValueGroup::new(&GROUP);
        // 2e5 km converts to 2e8 m, beyond the 1e8 m bound
        let err = values.set_in("radius", 2e5, Unit::KILOMETRE).unwrap_err();
        assert!(matches!(
            err,
            FactoryError::InvalidParameter { name: "radius", .. }
        ));
        values.set_in("radius", 2e4, Unit::KILOMETRE).unwrap();
    }

    #[test]
    fn test_incompatible_unit_rejected() {
        let mut values = ParameterValueGroup::new(&GROUP);
        assert!(matches!(
            values.set_in("radius", 1.0, Unit::DEGREE),
            Err(FactoryError::IncompatibleUnits { .. })
        ));
    }

    #[test]
    fn test_overwrite_keeps_one_entry() {
        let mut values = ParameterValueGroup::new(&GROUP);
        values.set("radius", 1.0).unwrap();
        values.set("radius", 2.0).unwrap();
        assert_eq!(values.value("radius").unwrap(), 2.0);
        assert_eq!(values.values.len(), 1);
    }

    #[derive(Debug)]
    struct StillFeature;

    impl MovingFeature for StillFeature {
        fn trajectory_dimension(&self) -> usize {
            1
        }
        fn positions(&self) -> &[f64] {
            &[0.0, 0.0]
        }
        fn datetimes(&self) -> &[chrono::DateTime<chrono::Utc>] {
            &[]
        }
    }

    static TRACK: ParameterDescriptor = ParameterDescriptor::feature("track");
    static FEATURE_GROUP: ParameterDescriptorGroup =
        ParameterDescriptorGroup::new("Test track", None, &[], &[&TRACK]);

    #[test]
    fn test_feature_round_trip() {
        let mut values = ParameterValueGroup::new(&FEATURE_GROUP);
        assert!(matches!(
            values.feature("track"),
            Err(FactoryError::MissingParameter("track"))
        ));
        values.set_feature("track", Arc::new(StillFeature)).unwrap();
        assert_eq!(values.feature("track").unwrap().trajectory_dimension(), 1);
        assert!(matches!(
            values.set("track", 1.0),
            Err(FactoryError::InvalidParameter { name: "track", .. })
        ));
    }

    #[test]
    fn test_feature_slot_is_typed() {
        let mut values = ParameterValueGroup::new(&GROUP);
        values.set("radius", 1.0).unwrap();
        assert!(matches!(
            values.feature("radius"),
            Err(FactoryError::InvalidParameter { .. })
        ));
        assert!(matches!(
            values.set_feature("radius", Arc::new(StillFeature)),
            Err(FactoryError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_nan_fails_the_range_check() {
        let mut values = ParameterValueGroup::new(&GROUP);
        assert!(matches!(
            values.set("radius", f64::NAN),
            Err(FactoryError::InvalidParameter { name: "radius", .. })
        ));
    }
}
