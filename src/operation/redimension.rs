use std::sync::{Arc, LazyLock, OnceLock};

use crate::crs::Unit;
use crate::error::FactoryError;
use crate::matrix::GeneralMatrix;
use crate::transform::{LinearTransform, MathTransform};

use super::parameter::{ParameterDescriptor, ParameterDescriptorGroup};
use super::{Context, OperationMethod};

static HEIGHT: ParameterDescriptor =
    ParameterDescriptor::new("height", Unit::METRE).with_default(0.0);

static THREE_TO_TWO_GROUP: ParameterDescriptorGroup =
    ParameterDescriptorGroup::new("Geographic3D to 2D conversion", Some("9659"), &[], &[]);
static TWO_TO_THREE_GROUP: ParameterDescriptorGroup =
    ParameterDescriptorGroup::new("Geographic2D to 3D conversion", None, &[], &[&HEIGHT]);
static TWO_IDENTITY_GROUP: ParameterDescriptorGroup =
    ParameterDescriptorGroup::new("Geographic2D identity", None, &[], &[]);
static THREE_IDENTITY_GROUP: ParameterDescriptorGroup =
    ParameterDescriptorGroup::new("Geographic3D identity", None, &[], &[]);

static THREE_TO_TWO: LazyLock<Arc<dyn OperationMethod>> =
    LazyLock::new(|| Arc::new(GeographicRedimension::new(&THREE_TO_TWO_GROUP, 3, 2)));
static TWO_TO_THREE: LazyLock<Arc<dyn OperationMethod>> =
    LazyLock::new(|| Arc::new(GeographicRedimension::new(&TWO_TO_THREE_GROUP, 2, 3)));
static TWO_IDENTITY: LazyLock<Arc<dyn OperationMethod>> =
    LazyLock::new(|| Arc::new(GeographicRedimension::new(&TWO_IDENTITY_GROUP, 2, 2)));
static THREE_IDENTITY: LazyLock<Arc<dyn OperationMethod>> =
    LazyLock::new(|| Arc::new(GeographicRedimension::new(&THREE_IDENTITY_GROUP, 3, 3)));

/// The shared method dropping the ellipsoidal height from a 3D geographic
/// system.
pub fn geographic_3d_to_2d() -> Arc<dyn OperationMethod> {
    THREE_TO_TWO.clone()
}

/// The shared method adding a constant ellipsoidal height to a 2D
/// geographic system.
pub fn geographic_2d_to_3d() -> Arc<dyn OperationMethod> {
    TWO_TO_THREE.clone()
}

fn shared(source: usize, target: usize) -> Option<Arc<dyn OperationMethod>> {
    match (source, target) {
        (3, 2) => Some(THREE_TO_TWO.clone()),
        (2, 3) => Some(TWO_TO_THREE.clone()),
        (2, 2) => Some(TWO_IDENTITY.clone()),
        (3, 3) => Some(THREE_IDENTITY.clone()),
        _ => None,
    }
}

/// Homogeneous matrix inserting a constant-height axis after longitude and
/// latitude. Its inverse drops the axis again whatever the constant was.
fn expansion(height: f64) -> Result<LinearTransform, FactoryError> {
    let mut matrix = GeneralMatrix::zero(4, 3);
    matrix.set_element(0, 0, 1.0);
    matrix.set_element(1, 1, 1.0);
    matrix.set_element(2, 2, height);
    matrix.set_element(3, 2, 1.0);
    LinearTransform::try_new(matrix)
}

/// Homogeneous matrix dropping the height axis.
fn reduction() -> Result<LinearTransform, FactoryError> {
    LinearTransform::dimension_filter(3, &[0, 1])
}

/// Axis-count change between the 2D and 3D variants of a geographic system.
///
/// All four source/target combinations are process-wide shared instances;
/// [OperationMethod::redimension] moves between them, and the parameter-free
/// variants hand out one cached transform.
#[derive(Debug)]
pub struct GeographicRedimension {
    group: &'static ParameterDescriptorGroup,
    source: usize,
    target: usize,
    cached: OnceLock<Arc<dyn MathTransform>>,
}

impl GeographicRedimension {
    const fn new(group: &'static ParameterDescriptorGroup, source: usize, target: usize) -> Self {
        Self {
            group,
            source,
            target,
            cached: OnceLock::new(),
        }
    }
}

impl OperationMethod for GeographicRedimension {
    fn parameters(&self) -> &'static ParameterDescriptorGroup {
        self.group
    }

    fn source_dimensions(&self) -> Option<usize> {
        Some(self.source)
    }

    fn target_dimensions(&self) -> Option<usize> {
        Some(self.target)
    }

    fn redimension(
        &self,
        source: usize,
        target: usize,
    ) -> Result<Arc<dyn OperationMethod>, FactoryError> {
        shared(source, target).ok_or(FactoryError::Redimension {
            method: self.name(),
            from: source,
            target,
        })
    }

    fn create_math_transform(
        &self,
        context: &Context,
    ) -> Result<Arc<dyn MathTransform>, FactoryError> {
        if self.source == 2 && self.target == 3 {
            // the value group may come from a sibling method without the
            // height parameter, in which case the default applies
            let height = match context.parameters().descriptors().find("height") {
                Some(_) => context.parameters().value("height")?,
                None => 0.0,
            };
            if height != 0.0 {
                return Ok(Arc::new(expansion(height)?));
            }
        }
        if let Some(transform) = self.cached.get() {
            return Ok(transform.clone());
        }
        let transform: Arc<dyn MathTransform> = match (self.source, self.target) {
            (3, 2) => Arc::new(reduction()?),
            (2, 3) => Arc::new(expansion(0.0)?),
            (dim, _) => Arc::new(LinearTransform::identity(dim)),
        };
        Ok(self.cached.get_or_init(|| transform).clone())
    }
}
