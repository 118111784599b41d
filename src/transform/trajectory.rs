use std::sync::Arc;

use chrono::{DateTime, Utc};
use smallvec::smallvec;

use crate::crs::CrsDescriptor;
use crate::dd::DoubleDouble;
use crate::error::{FactoryError, NoninvertibleError, TransformError};
use crate::matrix::GeneralMatrix;
use crate::ShortVec;
use crate::transform::{LinearTransform, MathTransform, concatenate_all};

/// Unix-time milliseconds of the Truncated Julian epoch, 1968-05-24T00:00Z.
const TRUNCATED_JULIAN_EPOCH_MS: i64 = -50_716_800_000;

/// Fractional days since the Truncated Julian epoch, the scale of every time
/// coordinate handled by trajectory transforms.
pub fn truncated_julian_day(instant: &DateTime<Utc>) -> f64 {
    (instant.timestamp_millis() - TRUNCATED_JULIAN_EPOCH_MS) as f64 / 86_400_000.0
}

/// A feature moving along a sampled trajectory: an ordered coordinate
/// sequence with one instant per position.
///
/// Consumed once when a [TrajectoryTranslation] is built; the transform owns
/// a converted copy and never reads the feature again.
pub trait MovingFeature: std::fmt::Debug + Send + Sync {
    /// Dimensionality of each stored position.
    fn trajectory_dimension(&self) -> usize;

    /// Row-major positions, `trajectory_dimension` values per instant.
    fn positions(&self) -> &[f64];

    /// Instants parallel to [MovingFeature::positions], strictly ascending.
    fn datetimes(&self) -> &[DateTime<Utc>];
}

#[derive(Debug)]
struct TrajectoryData {
    dimension: usize,
    /// Truncated Julian days, strictly ascending.
    start_times: Vec<f64>,
    /// Row-major, `dimension` values per entry of `start_times`.
    positions: Vec<f64>,
}

impl TrajectoryData {
    fn first(&self) -> f64 {
        self.start_times[0]
    }

    fn last(&self) -> f64 {
        self.start_times[self.start_times.len() - 1]
    }

    fn position(&self, idx: usize) -> &[f64] {
        &self.positions[idx * self.dimension..(idx + 1) * self.dimension]
    }

    /// Index of the sample interval containing `t`, after range checking.
    ///
    /// `t` equal to the final instant maps onto the last interval so that
    /// the inclusive upper boundary stays valid.
    fn interval(&self, t: f64) -> Result<usize, TransformError> {
        if !(t >= self.first() && t <= self.last()) {
            return Err(TransformError::TimeOutOfRange {
                value: t,
                first: self.first(),
                last: self.last(),
            });
        }
        // in-range t makes the first predicate true, so upper >= 1
        let upper = self.start_times.partition_point(|&s| s <= t);
        Ok((upper - 1).min(self.start_times.len() - 2))
    }

    /// Translation vector at `t`, linearly interpolated between the
    /// bracketing samples. A `t` exactly on a sample returns the stored
    /// vector with no interpolation error.
    fn interpolate(&self, t: f64, out: &mut [f64]) -> Result<(), TransformError> {
        let lo = self.interval(t)?;
        let t0 = self.start_times[lo];
        let t1 = self.start_times[lo + 1];
        if t == t1 {
            out.copy_from_slice(self.position(lo + 1));
            return Ok(());
        }
        let fraction = (t - t0) / (t1 - t0);
        for ((o, &p0), &p1) in out
            .iter_mut()
            .zip(self.position(lo).iter())
            .zip(self.position(lo + 1).iter())
        {
            *o = p0 + fraction * (p1 - p0);
        }
        Ok(())
    }

    /// Per-day velocity over the sample interval containing `t`.
    fn slope(&self, t: f64, out: &mut [f64]) -> Result<(), TransformError> {
        let lo = self.interval(t)?;
        let span = self.start_times[lo + 1] - self.start_times[lo];
        for ((o, &p0), &p1) in out
            .iter_mut()
            .zip(self.position(lo).iter())
            .zip(self.position(lo + 1).iter())
        {
            *o = (p1 - p0) / span;
        }
        Ok(())
    }
}

/// Subtracts a time-dependent translation from the spatial part of a
/// coordinate, passing the trailing time coordinate through unchanged.
///
/// Source and target are `dimension + 1`: the spatial axes of the trajectory
/// followed by time in Truncated Julian days.
#[derive(Debug, Clone)]
pub struct TrajectoryTranslation {
    data: Arc<TrajectoryData>,
}

impl TrajectoryTranslation {
    /// Parse the feature's trajectory once, validating it.
    pub fn try_new(feature: &dyn MovingFeature) -> Result<Self, FactoryError> {
        let dimension = feature.trajectory_dimension();
        if dimension == 0 {
            return Err(FactoryError::Data(
                "trajectory positions need at least one dimension".into(),
            ));
        }
        let datetimes = feature.datetimes();
        if datetimes.len() < 2 {
            return Err(FactoryError::Data(format!(
                "trajectory needs >= 2 samples, got {}",
                datetimes.len()
            )));
        }
        let positions = feature.positions();
        if positions.len() != datetimes.len() * dimension {
            return Err(FactoryError::Data(format!(
                "{} positions for {} instants of dimension {dimension}",
                positions.len(),
                datetimes.len()
            )));
        }
        let start_times: Vec<f64> = datetimes.iter().map(truncated_julian_day).collect();
        if start_times.windows(2).any(|w| w[0] >= w[1]) {
            return Err(FactoryError::Data(
                "trajectory instants must be strictly ascending".into(),
            ));
        }
        Ok(Self {
            data: Arc::new(TrajectoryData {
                dimension,
                start_times,
                positions: positions.to_vec(),
            }),
        })
    }

    /// The complete transform: the translation core sandwiched between the
    /// axis-unit conversions of the coordinate system it operates in.
    pub fn create(
        feature: &dyn MovingFeature,
        crs: &CrsDescriptor,
    ) -> Result<Arc<dyn MathTransform>, FactoryError> {
        let core = Self::try_new(feature)?;
        let dim = core.data.dimension + 1;
        if crs.dimension() != dim {
            return Err(FactoryError::MismatchedDimensions {
                output: crs.dimension(),
                input: dim,
            });
        }
        let factors = crs.axis_factors();
        let zeros = vec![DoubleDouble::ZERO; dim];
        let to_base: Vec<DoubleDouble> = factors.iter().map(|&f| DoubleDouble::from(f)).collect();
        let from_base: Vec<DoubleDouble> = factors
            .iter()
            .map(|&f| DoubleDouble::ONE.div(DoubleDouble::from(f)))
            .collect();
        concatenate_all(vec![
            Arc::new(LinearTransform::scale_and_translate_extended(
                &to_base, &zeros,
            )?),
            Arc::new(core),
            Arc::new(LinearTransform::scale_and_translate_extended(
                &from_base, &zeros,
            )?),
        ])
    }

    fn spatial_dimension(&self) -> usize {
        self.data.dimension
    }
}

impl MathTransform for TrajectoryTranslation {
    fn source_dimensions(&self) -> usize {
        self.data.dimension + 1
    }

    fn target_dimensions(&self) -> usize {
        self.data.dimension + 1
    }

    fn transform_into(&self, pt: &[f64], buf: &mut [f64]) -> Result<(), TransformError> {
        let dim = self.spatial_dimension();
        let t = pt[dim];
        let mut shift: ShortVec<f64> = smallvec![0.0; dim];
        self.data.interpolate(t, &mut shift)?;
        for ((b, &p), &s) in buf.iter_mut().zip(pt.iter()).zip(shift.iter()) {
            *b = p - s;
        }
        buf[dim] = t;
        Ok(())
    }

    fn derivative(&self, pt: &[f64]) -> Result<GeneralMatrix, TransformError> {
        let dim = self.spatial_dimension();
        let mut slope: ShortVec<f64> = smallvec![0.0; dim];
        self.data.slope(pt[dim], &mut slope)?;
        let mut m = GeneralMatrix::identity(dim + 1);
        for (r, &v) in slope.iter().enumerate() {
            m.set_element(r, dim, -v);
        }
        Ok(m)
    }

    /// The inverse adds the translation back: the same core between spatial
    /// negations.
    fn inverse(&self) -> Result<Arc<dyn MathTransform>, NoninvertibleError> {
        let dim = self.spatial_dimension();
        let mut factors = vec![-1.0; dim + 1];
        factors[dim] = 1.0;
        let negate = Arc::new(LinearTransform::scale(&factors));
        concatenate_all(vec![negate.clone(), Arc::new(self.clone()), negate])
            .map_err(|e| NoninvertibleError(e.to_string()))
    }

    fn is_identity(&self) -> bool {
        false
    }
}
