use crate::ShortVec;
use crate::error::FactoryError;
use smallvec::smallvec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    Linear,
    Angular,
    Temporal,
    Scale,
}

/// A measurement unit reduced to what the transform core needs: its kind and
/// the factor to the base unit of that kind (metre, radian, day, unity).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Unit {
    symbol: &'static str,
    kind: UnitKind,
    to_base: f64,
}

impl Unit {
    pub const METRE: Unit = Unit {
        symbol: "m",
        kind: UnitKind::Linear,
        to_base: 1.0,
    };
    pub const KILOMETRE: Unit = Unit {
        symbol: "km",
        kind: UnitKind::Linear,
        to_base: 1000.0,
    };
    pub const FOOT: Unit = Unit {
        symbol: "ft",
        kind: UnitKind::Linear,
        to_base: 0.3048,
    };
    pub const RADIAN: Unit = Unit {
        symbol: "rad",
        kind: UnitKind::Angular,
        to_base: 1.0,
    };
    pub const DEGREE: Unit = Unit {
        symbol: "deg",
        kind: UnitKind::Angular,
        to_base: std::f64::consts::PI / 180.0,
    };
    pub const ARC_SECOND: Unit = Unit {
        symbol: "arcsec",
        kind: UnitKind::Angular,
        to_base: std::f64::consts::PI / 648_000.0,
    };
    pub const DAY: Unit = Unit {
        symbol: "d",
        kind: UnitKind::Temporal,
        to_base: 1.0,
    };
    pub const SECOND: Unit = Unit {
        symbol: "s",
        kind: UnitKind::Temporal,
        to_base: 1.0 / 86_400.0,
    };
    pub const UNITY: Unit = Unit {
        symbol: "1",
        kind: UnitKind::Scale,
        to_base: 1.0,
    };
    pub const PPM: Unit = Unit {
        symbol: "ppm",
        kind: UnitKind::Scale,
        to_base: 1e-6,
    };

    pub fn symbol(&self) -> &'static str {
        self.symbol
    }

    pub fn kind(&self) -> UnitKind {
        self.kind
    }

    /// Factor to the base unit of this unit's kind.
    pub fn to_base(&self) -> f64 {
        self.to_base
    }

    /// Multiplication factor converting values in `self` to values in `target`.
    pub fn factor_to(&self, target: &Unit) -> Result<f64, FactoryError> {
        if self.kind != target.kind {
            return Err(FactoryError::IncompatibleUnits {
                from: self.symbol,
                to: target.symbol,
            });
        }
        Ok(self.to_base / target.to_base)
    }

    pub fn convert(&self, value: f64, target: &Unit) -> Result<f64, FactoryError> {
        Ok(value * self.factor_to(target)?)
    }
}

/// One coordinate-system axis; only the unit matters to the transform core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Axis {
    pub abbreviation: &'static str,
    pub unit: Unit,
}

impl Axis {
    pub fn new(abbreviation: &'static str, unit: Unit) -> Self {
        Self { abbreviation, unit }
    }
}

/// Coordinate-system kind, the discriminator for forward/inverse ambiguity
/// resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsKind {
    /// Longitude/latitude (and optionally ellipsoidal height).
    Ellipsoidal,
    /// Rectilinear axes, e.g. geocentric X/Y/Z or projected easting/northing.
    Cartesian,
    /// Radius/angle axes around the geocentre.
    Spherical,
    Temporal,
}

/// Opaque-ish CRS description consumed from the referencing layer:
/// coordinate-system kind plus axis units. Supplies dimension counts and
/// unit conversion factors, nothing more.
#[derive(Debug, Clone, PartialEq)]
pub struct CrsDescriptor {
    kind: CsKind,
    axes: ShortVec<Axis>,
}

impl CrsDescriptor {
    pub fn new(kind: CsKind, axes: impl IntoIterator<Item = Axis>) -> Self {
        Self {
            kind,
            axes: axes.into_iter().collect(),
        }
    }

    /// Longitude/latitude in degrees.
    pub fn geographic_2d() -> Self {
        Self {
            kind: CsKind::Ellipsoidal,
            axes: smallvec![
                Axis::new("lon", Unit::DEGREE),
                Axis::new("lat", Unit::DEGREE),
            ],
        }
    }

    /// Longitude/latitude in degrees plus ellipsoidal height in metres.
    pub fn geographic_3d() -> Self {
        Self {
            kind: CsKind::Ellipsoidal,
            axes: smallvec![
                Axis::new("lon", Unit::DEGREE),
                Axis::new("lat", Unit::DEGREE),
                Axis::new("h", Unit::METRE),
            ],
        }
    }

    /// Earth-centred X/Y/Z in metres.
    pub fn geocentric() -> Self {
        Self {
            kind: CsKind::Cartesian,
            axes: smallvec![
                Axis::new("X", Unit::METRE),
                Axis::new("Y", Unit::METRE),
                Axis::new("Z", Unit::METRE),
            ],
        }
    }

    /// Projected easting/northing in metres.
    pub fn projected() -> Self {
        Self {
            kind: CsKind::Cartesian,
            axes: smallvec![
                Axis::new("E", Unit::METRE),
                Axis::new("N", Unit::METRE),
            ],
        }
    }

    pub fn kind(&self) -> CsKind {
        self.kind
    }

    pub fn dimension(&self) -> usize {
        self.axes.len()
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    /// Per-axis factors converting coordinates to base units (metres,
    /// radians, days).
    pub fn axis_factors(&self) -> ShortVec<f64> {
        self.axes.iter().map(|a| a.unit.to_base()).collect()
    }
}
