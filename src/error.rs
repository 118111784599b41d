use thiserror::Error;

/// A transform whose inverse cannot be computed.
///
/// Convertible into both [FactoryError] and [TransformError], as inversion
/// failures surface either at construction time (building the inverse leg of
/// a chain) or at evaluation time (callers requesting `inverse()` lazily).
#[derive(Debug, Clone, PartialEq, Error)]
#[error("transform is not invertible: {0}")]
pub struct NoninvertibleError(pub String);

/// Failure to construct a transform from an operation method and parameters.
#[derive(Debug, Error)]
pub enum FactoryError {
    #[error("no operation method registered for {0:?}")]
    UnknownMethod(String),

    #[error("no parameter {0:?} in the operation's descriptor group")]
    UnknownParameter(String),

    #[error("no value and no default for parameter {0:?}")]
    MissingParameter(&'static str),

    #[error("parameter {name:?}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("cannot convert {from} to {to}")]
    IncompatibleUnits { from: &'static str, to: &'static str },

    #[error("{method:?} cannot be redimensioned to {from} -> {target}")]
    Redimension {
        method: &'static str,
        from: usize,
        target: usize,
    },

    #[error("cannot concatenate: output is {output}D but next input is {input}D")]
    MismatchedDimensions { output: usize, input: usize },

    #[error("malformed matrix: {0}")]
    Matrix(String),

    /// Construction failed because the supplied data source
    /// (e.g. a moving feature's trajectory) is unusable.
    #[error("unusable source data: {0}")]
    Data(String),

    #[error(transparent)]
    Noninvertible(#[from] NoninvertibleError),
}

/// Failure while evaluating a transform at a coordinate tuple.
///
/// Evaluation errors abort the whole call but leave the transform's immutable
/// state untouched, so retrying with corrected input is safe.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("time {value} out of range [{first}, {last}]")]
    TimeOutOfRange { value: f64, first: f64, last: f64 },

    #[error("coordinate outside the transform domain: {0}")]
    OutsideDomain(String),

    #[error("iteration did not converge after {0} steps")]
    NoConvergence(usize),

    #[error(transparent)]
    Noninvertible(#[from] NoninvertibleError),
}

/// Failure while resampling one grid onto another.
///
/// Resampling is the one call spanning both failure domains: it builds the
/// pixel-to-pixel chain (construction) and then evaluates it over every
/// target pixel centre.
#[derive(Debug, Error)]
pub enum ResampleError {
    #[error(transparent)]
    Factory(#[from] FactoryError),

    #[error(transparent)]
    Transform(#[from] TransformError),
}
