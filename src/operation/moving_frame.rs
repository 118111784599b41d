use std::sync::Arc;

use crate::error::FactoryError;
use crate::transform::{MathTransform, TrajectoryTranslation};

use super::parameter::{ParameterDescriptor, ParameterDescriptorGroup};
use super::{Context, OperationMethod};

static TRAJECTORY: ParameterDescriptor =
    ParameterDescriptor::feature("trajectory").with_aliases(&["Trajectory file"]);

static TRANSLATION_BY_TRAJECTORY: ParameterDescriptorGroup =
    ParameterDescriptorGroup::new("Translation by trajectory", Some("200"), &[], &[&TRAJECTORY]);

/// Time-dependent translation following the sampled track of a moving
/// feature. The source coordinate system tells the method its axis units,
/// so it is required context.
#[derive(Debug)]
pub struct MovingFrameMethod;

impl OperationMethod for MovingFrameMethod {
    fn parameters(&self) -> &'static ParameterDescriptorGroup {
        &TRANSLATION_BY_TRAJECTORY
    }

    fn create_math_transform(
        &self,
        context: &Context,
    ) -> Result<Arc<dyn MathTransform>, FactoryError> {
        let feature = context.parameters().feature("trajectory")?;
        let crs = context.source_cs().ok_or_else(|| {
            FactoryError::Data("a trajectory translation needs the source system".into())
        })?;
        TrajectoryTranslation::create(feature.as_ref(), crs)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::crs::{Axis, CrsDescriptor, CsKind, Unit};
    use crate::operation::{OperationRegistry, ParameterValueGroup};
    use crate::tests::SyntheticTrack;
    use crate::transform::MovingFeature;

    fn track() -> Arc<SyntheticTrack> {
        Arc::new(SyntheticTrack::new(
            2,
            vec![100.0, -50.0, 100.0, -50.0],
            vec![
                Utc.with_ymd_and_hms(2014, 1, 1, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2015, 1, 1, 0, 0, 0).unwrap(),
            ],
        ))
    }

    fn track_crs() -> CrsDescriptor {
        CrsDescriptor::new(
            CsKind::Cartesian,
            [
                Axis::new("X", Unit::METRE),
                Axis::new("Y", Unit::METRE),
                Axis::new("t", Unit::DAY),
            ],
        )
    }

    #[test]
    fn test_creates_the_translation() {
        crate::tests::init_logger();
        let mut values = ParameterValueGroup::new(&TRANSLATION_BY_TRAJECTORY);
        values.set_feature("trajectory", track()).unwrap();
        let context = Context::new(values).with_source_cs(track_crs());
        let transform = MovingFrameMethod.create_math_transform(&context).unwrap();
        assert_eq!(transform.source_dimensions(), 3);
        // constant track, so any in-range instant subtracts the same shift
        let out = transform.transform(&[150.0, 0.0, 16_708.5]).unwrap();
        assert_eq!(out.as_slice(), &[50.0, 50.0, 16_708.5]);
    }

    #[test]
    fn test_requires_the_source_system() {
        let mut values = ParameterValueGroup::new(&TRANSLATION_BY_TRAJECTORY);
        values.set_feature("trajectory", track()).unwrap();
        assert!(matches!(
            MovingFrameMethod.create_math_transform(&Context::new(values)),
            Err(FactoryError::Data(_))
        ));
    }

    #[test]
    fn test_registry_create_by_identifier() {
        crate::tests::init_logger();
        let registry = OperationRegistry::new();
        let mut values = ParameterValueGroup::new(&TRANSLATION_BY_TRAJECTORY);
        values.set_feature("trajectory", track()).unwrap();
        let context = Context::new(values).with_source_cs(track_crs());
        let transform = registry.create("200", &context).unwrap();
        let reported = transform.parameter_values().unwrap();
        assert_eq!(
            reported.feature("Trajectory file").unwrap().positions(),
            track().positions()
        );
    }
}
