//! Operation methods: named, parameterised recipes for building transforms.
//!
//! A method describes an operation from a registry of named definitions
//! (EPSG codes, authority aliases) and knows how to instantiate a
//! [MathTransform] from a [ParameterValueGroup] plus optional context about
//! the coordinate systems in play.

use std::collections::HashMap;
use std::sync::Arc;

use crate::crs::CrsDescriptor;
use crate::error::{FactoryError, NoninvertibleError, TransformError};
use crate::matrix::GeneralMatrix;
use crate::transform::MathTransform;

mod datum_shift;
mod geocentric;
mod moving_frame;
mod parameter;
mod projection;
mod redimension;

pub use datum_shift::{DatumShiftDomain, DatumShiftKind, DatumShiftMethod};
pub use geocentric::{GeocentricToGeographic, GeographicToGeocentric};
pub use moving_frame::MovingFrameMethod;
pub use parameter::{
    ParameterDescriptor, ParameterDescriptorGroup, ParameterKind, ParameterValue,
    ParameterValueGroup,
};
pub use projection::SinusoidalMethod;
pub use redimension::{GeographicRedimension, geographic_2d_to_3d, geographic_3d_to_2d};

/// Everything a method may consult when instantiating a transform: the
/// parameter values, plus the source and target coordinate systems when the
/// caller knows them.
#[derive(Debug, Clone)]
pub struct Context {
    parameters: ParameterValueGroup,
    source_cs: Option<CrsDescriptor>,
    target_cs: Option<CrsDescriptor>,
}

impl Context {
    pub fn new(parameters: ParameterValueGroup) -> Self {
        Self {
            parameters,
            source_cs: None,
            target_cs: None,
        }
    }

    pub fn with_source_cs(mut self, cs: CrsDescriptor) -> Self {
        self.source_cs = Some(cs);
        self
    }

    pub fn with_target_cs(mut self, cs: CrsDescriptor) -> Self {
        self.target_cs = Some(cs);
        self
    }

    pub fn parameters(&self) -> &ParameterValueGroup {
        &self.parameters
    }

    pub fn source_cs(&self) -> Option<&CrsDescriptor> {
        self.source_cs.as_ref()
    }

    pub fn target_cs(&self) -> Option<&CrsDescriptor> {
        self.target_cs.as_ref()
    }

    pub fn source_dimensions(&self) -> Option<usize> {
        self.source_cs.as_ref().map(|cs| cs.dimension())
    }

    pub fn target_dimensions(&self) -> Option<usize> {
        self.target_cs.as_ref().map(|cs| cs.dimension())
    }
}

/// A named recipe for building a [MathTransform] from parameter values.
pub trait OperationMethod: std::fmt::Debug + Send + Sync {
    /// The descriptor group naming this method, its identifier and its
    /// parameters.
    fn parameters(&self) -> &'static ParameterDescriptorGroup;

    fn name(&self) -> &'static str {
        self.parameters().name()
    }

    /// Number of source axes this method is defined for, or `None` when any
    /// count is acceptable.
    fn source_dimensions(&self) -> Option<usize> {
        None
    }

    fn target_dimensions(&self) -> Option<usize> {
        None
    }

    /// The name of another method to use instead for this context, when the
    /// requested name is a directionless legacy alias.
    fn resolve_ambiguity(&self, _context: &Context) -> Option<&'static str> {
        None
    }

    /// The sibling method operating between the given axis counts.
    fn redimension(
        &self,
        source: usize,
        target: usize,
    ) -> Result<Arc<dyn OperationMethod>, FactoryError> {
        Err(FactoryError::Redimension {
            method: self.name(),
            from: source,
            target,
        })
    }

    fn create_math_transform(
        &self,
        context: &Context,
    ) -> Result<Arc<dyn MathTransform>, FactoryError>;
}

/// Lookup table of [OperationMethod]s keyed by name, alias and identifier,
/// compared case-insensitively.
#[derive(Debug)]
pub struct OperationRegistry {
    methods: Vec<Arc<dyn OperationMethod>>,
    by_key: HashMap<String, usize>,
}

impl Default for OperationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl OperationRegistry {
    /// A registry holding every built-in operation method.
    pub fn new() -> Self {
        let mut registry = Self {
            methods: Vec::new(),
            by_key: HashMap::new(),
        };
        registry.register(Arc::new(GeographicToGeocentric));
        registry.register(Arc::new(GeocentricToGeographic));
        for kind in [
            DatumShiftKind::Translation,
            DatumShiftKind::PositionVector,
            DatumShiftKind::FrameRotation,
        ] {
            for domain in [
                DatumShiftDomain::Geocentric,
                DatumShiftDomain::Geographic2D,
                DatumShiftDomain::Geographic3D,
            ] {
                registry.register(DatumShiftMethod::provider(kind, domain));
            }
        }
        registry.register(geographic_3d_to_2d());
        registry.register(geographic_2d_to_3d());
        registry.register(Arc::new(SinusoidalMethod));
        registry.register(Arc::new(MovingFrameMethod));
        registry
    }

    /// Register a method under its name, aliases and identifier. Later
    /// registrations win on key collisions.
    pub fn register(&mut self, method: Arc<dyn OperationMethod>) {
        let idx = self.methods.len();
        let group = method.parameters();
        for key in std::iter::once(group.name())
            .chain(group.aliases().iter().copied())
            .chain(group.identifier())
        {
            self.by_key.insert(normalize(key), idx);
        }
        self.methods.push(method);
    }

    pub fn find(&self, name: &str) -> Option<&Arc<dyn OperationMethod>> {
        self.by_key
            .get(&normalize(name))
            .map(|idx| &self.methods[*idx])
    }

    pub fn methods(&self) -> &[Arc<dyn OperationMethod>] {
        &self.methods
    }

    /// Instantiate the named method against the given context. The returned
    /// transform reports the parameters it was built from through
    /// [MathTransform::parameter_values].
    pub fn create(
        &self,
        name: &str,
        context: &Context,
    ) -> Result<Arc<dyn MathTransform>, FactoryError> {
        let mut method = self
            .find(name)
            .ok_or_else(|| FactoryError::UnknownMethod(name.to_owned()))?
            .clone();
        if let Some(replacement) = method.resolve_ambiguity(context) {
            log::debug!(
                "resolving {:?} to {:?} for this context",
                method.name(),
                replacement
            );
            method = self
                .find(replacement)
                .ok_or_else(|| FactoryError::UnknownMethod(replacement.to_owned()))?
                .clone();
        }
        if let (Some(source), Some(target)) =
            (context.source_dimensions(), context.target_dimensions())
        {
            let mismatched = method.source_dimensions().is_some_and(|d| d != source)
                || method.target_dimensions().is_some_and(|d| d != target);
            if mismatched {
                log::debug!(
                    "redimensioning {:?} to {} -> {} axes",
                    method.name(),
                    source,
                    target
                );
                method = method.redimension(source, target)?;
            }
        }
        let inner = method.create_math_transform(context)?;
        Ok(Arc::new(Parameterized {
            inner,
            parameters: context.parameters.clone(),
        }))
    }
}

fn normalize(key: &str) -> String {
    key.trim().to_ascii_lowercase()
}

/// Decorates a method-built transform with the parameter values it was
/// instantiated from. Every evaluation and optimizer hook is forwarded to
/// the wrapped transform, so decoration never blocks concatenation folding.
#[derive(Debug)]
struct Parameterized {
    inner: Arc<dyn MathTransform>,
    parameters: ParameterValueGroup,
}

impl MathTransform for Parameterized {
    fn source_dimensions(&self) -> usize {
        self.inner.source_dimensions()
    }

    fn target_dimensions(&self) -> usize {
        self.inner.target_dimensions()
    }

    fn transform_into(&self, pt: &[f64], buf: &mut [f64]) -> Result<(), TransformError> {
        self.inner.transform_into(pt, buf)
    }

    fn derivative(&self, pt: &[f64]) -> Result<GeneralMatrix, TransformError> {
        self.inner.derivative(pt)
    }

    fn transform_with_derivative(
        &self,
        pt: &[f64],
        buf: &mut [f64],
        derivate: bool,
    ) -> Result<Option<GeneralMatrix>, TransformError> {
        self.inner.transform_with_derivative(pt, buf, derivate)
    }

    fn bulk_transform_into(
        &self,
        pts: &[&[f64]],
        bufs: &mut [&mut [f64]],
    ) -> Result<(), TransformError> {
        self.inner.bulk_transform_into(pts, bufs)
    }

    fn column_transform_into(
        &self,
        columns: &[&[f64]],
        bufs: &mut [&mut [f64]],
    ) -> Result<(), TransformError> {
        self.inner.column_transform_into(columns, bufs)
    }

    fn inverse(&self) -> Result<Arc<dyn MathTransform>, NoninvertibleError> {
        self.inner.inverse()
    }

    fn is_identity(&self) -> bool {
        self.inner.is_identity()
    }

    fn linear_matrix(&self) -> Option<&GeneralMatrix> {
        self.inner.linear_matrix()
    }

    fn inversion_pair(&self) -> Option<(usize, bool)> {
        self.inner.inversion_pair()
    }

    fn concatenated_steps(&self) -> Option<&[Arc<dyn MathTransform>]> {
        self.inner.concatenated_steps()
    }

    fn parameter_values(&self) -> Option<ParameterValueGroup> {
        Some(self.parameters.clone())
    }
}
