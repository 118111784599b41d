use std::sync::{Arc, LazyLock};

use crate::crs::Unit;
use crate::dd::DoubleDouble;
use crate::error::FactoryError;
use crate::matrix::GeneralMatrix;
use crate::transform::{
    CentricToEllipsoid, EllipsoidToCentric, LinearTransform, MathTransform, concatenate_all,
};

use super::parameter::{ParameterDescriptor, ParameterDescriptorGroup, ParameterValueGroup};
use super::projection::ellipsoid_from;
use super::{Context, OperationMethod};

static TX: ParameterDescriptor = ParameterDescriptor::new("X-axis translation", Unit::METRE)
    .with_aliases(&["dx"])
    .with_default(0.0);
static TY: ParameterDescriptor = ParameterDescriptor::new("Y-axis translation", Unit::METRE)
    .with_aliases(&["dy"])
    .with_default(0.0);
static TZ: ParameterDescriptor = ParameterDescriptor::new("Z-axis translation", Unit::METRE)
    .with_aliases(&["dz"])
    .with_default(0.0);
static RX: ParameterDescriptor = ParameterDescriptor::new("X-axis rotation", Unit::ARC_SECOND)
    .with_aliases(&["ex"])
    .with_default(0.0);
static RY: ParameterDescriptor = ParameterDescriptor::new("Y-axis rotation", Unit::ARC_SECOND)
    .with_aliases(&["ey"])
    .with_default(0.0);
static RZ: ParameterDescriptor = ParameterDescriptor::new("Z-axis rotation", Unit::ARC_SECOND)
    .with_aliases(&["ez"])
    .with_default(0.0);
static DS: ParameterDescriptor = ParameterDescriptor::new("Scale difference", Unit::PPM)
    .with_aliases(&["ppm"])
    .with_default(0.0);
static SRC_SEMI_MAJOR: ParameterDescriptor =
    ParameterDescriptor::new("src_semi_major", Unit::METRE);
static SRC_SEMI_MINOR: ParameterDescriptor =
    ParameterDescriptor::new("src_semi_minor", Unit::METRE);
static TGT_SEMI_MAJOR: ParameterDescriptor =
    ParameterDescriptor::new("tgt_semi_major", Unit::METRE);
static TGT_SEMI_MINOR: ParameterDescriptor =
    ParameterDescriptor::new("tgt_semi_minor", Unit::METRE);

static TRANSLATION_GEOCENTRIC: ParameterDescriptorGroup = ParameterDescriptorGroup::new(
    "Geocentric translations (geocentric domain)",
    Some("1031"),
    &[],
    &[&TX, &TY, &TZ],
);
static TRANSLATION_GEOG2D: ParameterDescriptorGroup = ParameterDescriptorGroup::new(
    "Geocentric translations (geog2D domain)",
    Some("9603"),
    &["Geocentric_Translation"],
    &[
        &TX,
        &TY,
        &TZ,
        &SRC_SEMI_MAJOR,
        &SRC_SEMI_MINOR,
        &TGT_SEMI_MAJOR,
        &TGT_SEMI_MINOR,
    ],
);
static TRANSLATION_GEOG3D: ParameterDescriptorGroup = ParameterDescriptorGroup::new(
    "Geocentric translations (geog3D domain)",
    Some("1035"),
    &[],
    &[
        &TX,
        &TY,
        &TZ,
        &SRC_SEMI_MAJOR,
        &SRC_SEMI_MINOR,
        &TGT_SEMI_MAJOR,
        &TGT_SEMI_MINOR,
    ],
);
static POSITION_VECTOR_GEOCENTRIC: ParameterDescriptorGroup = ParameterDescriptorGroup::new(
    "Position Vector transformation (geocentric domain)",
    Some("1033"),
    &[],
    &[&TX, &TY, &TZ, &RX, &RY, &RZ, &DS],
);
static POSITION_VECTOR_GEOG2D: ParameterDescriptorGroup = ParameterDescriptorGroup::new(
    "Position Vector transformation (geog2D domain)",
    Some("9606"),
    &["Position_Vector"],
    &[
        &TX,
        &TY,
        &TZ,
        &RX,
        &RY,
        &RZ,
        &DS,
        &SRC_SEMI_MAJOR,
        &SRC_SEMI_MINOR,
        &TGT_SEMI_MAJOR,
        &TGT_SEMI_MINOR,
    ],
);
static POSITION_VECTOR_GEOG3D: ParameterDescriptorGroup = ParameterDescriptorGroup::new(
    "Position Vector transformation (geog3D domain)",
    Some("1037"),
    &[],
    &[
        &TX,
        &TY,
        &TZ,
        &RX,
        &RY,
        &RZ,
        &DS,
        &SRC_SEMI_MAJOR,
        &SRC_SEMI_MINOR,
        &TGT_SEMI_MAJOR,
        &TGT_SEMI_MINOR,
    ],
);
static FRAME_ROTATION_GEOCENTRIC: ParameterDescriptorGroup = ParameterDescriptorGroup::new(
    "Coordinate Frame rotation (geocentric domain)",
    Some("1032"),
    &[],
    &[&TX, &TY, &TZ, &RX, &RY, &RZ, &DS],
);
static FRAME_ROTATION_GEOG2D: ParameterDescriptorGroup = ParameterDescriptorGroup::new(
    "Coordinate Frame Rotation (geog2D domain)",
    Some("9607"),
    &["Coordinate_Frame"],
    &[
        &TX,
        &TY,
        &TZ,
        &RX,
        &RY,
        &RZ,
        &DS,
        &SRC_SEMI_MAJOR,
        &SRC_SEMI_MINOR,
        &TGT_SEMI_MAJOR,
        &TGT_SEMI_MINOR,
    ],
);
static FRAME_ROTATION_GEOG3D: ParameterDescriptorGroup = ParameterDescriptorGroup::new(
    "Coordinate Frame rotation (geog3D domain)",
    Some("1038"),
    &[],
    &[
        &TX,
        &TY,
        &TZ,
        &RX,
        &RY,
        &RZ,
        &DS,
        &SRC_SEMI_MAJOR,
        &SRC_SEMI_MINOR,
        &TGT_SEMI_MAJOR,
        &TGT_SEMI_MINOR,
    ],
);

static PROVIDERS: LazyLock<[[Arc<dyn OperationMethod>; 3]; 3]> = LazyLock::new(|| {
    [
        DatumShiftKind::Translation,
        DatumShiftKind::PositionVector,
        DatumShiftKind::FrameRotation,
    ]
    .map(|kind| {
        [
            DatumShiftDomain::Geocentric,
            DatumShiftDomain::Geographic2D,
            DatumShiftDomain::Geographic3D,
        ]
        .map(|domain| Arc::new(DatumShiftMethod { kind, domain }) as Arc<dyn OperationMethod>)
    })
});

/// The rotation convention of a Helmert-style shift, or no rotation at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatumShiftKind {
    /// Translations only.
    Translation,
    /// Rotations describe the position vector, the IERS convention.
    PositionVector,
    /// Rotations describe the coordinate frame, the opposite sign.
    FrameRotation,
}

/// Which coordinate space the shift is applied in. The geographic domains
/// wrap the geocentric affine step between conversions from and to the
/// ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatumShiftDomain {
    Geocentric,
    Geographic2D,
    Geographic3D,
}

/// One of the nine datum-shift methods: a rotation convention applied in a
/// coordinate domain.
#[derive(Debug)]
pub struct DatumShiftMethod {
    kind: DatumShiftKind,
    domain: DatumShiftDomain,
}

impl DatumShiftMethod {
    /// The process-wide shared provider for the given convention and domain.
    pub fn provider(kind: DatumShiftKind, domain: DatumShiftDomain) -> Arc<dyn OperationMethod> {
        PROVIDERS[kind as usize][domain as usize].clone()
    }

    /// The homogeneous shift matrix, built in extended precision so that
    /// sub-arcsecond rotations survive the later matrix folding.
    fn shift_matrix(&self, values: &ParameterValueGroup) -> Result<GeneralMatrix, FactoryError> {
        let tx = DoubleDouble::from(values.value("X-axis translation")?);
        let ty = DoubleDouble::from(values.value("Y-axis translation")?);
        let tz = DoubleDouble::from(values.value("Z-axis translation")?);
        let (rx, ry, rz, diag) = if self.kind == DatumShiftKind::Translation {
            (
                DoubleDouble::ZERO,
                DoubleDouble::ZERO,
                DoubleDouble::ZERO,
                DoubleDouble::ONE,
            )
        } else {
            let sign = if self.kind == DatumShiftKind::FrameRotation {
                -1.0
            } else {
                1.0
            };
            let sec = DoubleDouble::PI.div(DoubleDouble::from(648_000.0));
            let rx = sec.mul(DoubleDouble::from(sign * values.value("X-axis rotation")?));
            let ry = sec.mul(DoubleDouble::from(sign * values.value("Y-axis rotation")?));
            let rz = sec.mul(DoubleDouble::from(sign * values.value("Z-axis rotation")?));
            let ds = DoubleDouble::from(values.value("Scale difference")?)
                .mul(DoubleDouble::from(1e-6));
            (rx, ry, rz, DoubleDouble::ONE.add(ds))
        };
        let mut builder = GeneralMatrix::builder();
        builder.add_row_extended(&[diag, -rz, ry, tx])?;
        builder.add_row_extended(&[rz, diag, -rx, ty])?;
        builder.add_row_extended(&[-ry, rx, diag, tz])?;
        builder.add_row(&[0.0, 0.0, 0.0, 1.0])?;
        Ok(builder.build())
    }
}

impl OperationMethod for DatumShiftMethod {
    fn parameters(&self) -> &'static ParameterDescriptorGroup {
        match (self.kind, self.domain) {
            (DatumShiftKind::Translation, DatumShiftDomain::Geocentric) => &TRANSLATION_GEOCENTRIC,
            (DatumShiftKind::Translation, DatumShiftDomain::Geographic2D) => &TRANSLATION_GEOG2D,
            (DatumShiftKind::Translation, DatumShiftDomain::Geographic3D) => &TRANSLATION_GEOG3D,
            (DatumShiftKind::PositionVector, DatumShiftDomain::Geocentric) => {
                &POSITION_VECTOR_GEOCENTRIC
            }
            (DatumShiftKind::PositionVector, DatumShiftDomain::Geographic2D) => {
                &POSITION_VECTOR_GEOG2D
            }
            (DatumShiftKind::PositionVector, DatumShiftDomain::Geographic3D) => {
                &POSITION_VECTOR_GEOG3D
            }
            (DatumShiftKind::FrameRotation, DatumShiftDomain::Geocentric) => {
                &FRAME_ROTATION_GEOCENTRIC
            }
            (DatumShiftKind::FrameRotation, DatumShiftDomain::Geographic2D) => {
                &FRAME_ROTATION_GEOG2D
            }
            (DatumShiftKind::FrameRotation, DatumShiftDomain::Geographic3D) => {
                &FRAME_ROTATION_GEOG3D
            }
        }
    }

    fn source_dimensions(&self) -> Option<usize> {
        match self.domain {
            DatumShiftDomain::Geographic2D => Some(2),
            _ => Some(3),
        }
    }

    fn target_dimensions(&self) -> Option<usize> {
        self.source_dimensions()
    }

    fn redimension(
        &self,
        source: usize,
        target: usize,
    ) -> Result<Arc<dyn OperationMethod>, FactoryError> {
        let rejected = FactoryError::Redimension {
            method: self.name(),
            from: source,
            target,
        };
        if source != target {
            return Err(rejected);
        }
        let domain = match (self.domain, source) {
            (DatumShiftDomain::Geocentric, 3) => DatumShiftDomain::Geocentric,
            (DatumShiftDomain::Geocentric, _) => return Err(rejected),
            (_, 2) => DatumShiftDomain::Geographic2D,
            (_, 3) => DatumShiftDomain::Geographic3D,
            _ => return Err(rejected),
        };
        Ok(Self::provider(self.kind, domain))
    }

    fn create_math_transform(
        &self,
        context: &Context,
    ) -> Result<Arc<dyn MathTransform>, FactoryError> {
        let values = context.parameters();
        let affine: Arc<dyn MathTransform> =
            Arc::new(LinearTransform::try_new(self.shift_matrix(values)?)?);
        match self.domain {
            DatumShiftDomain::Geocentric => Ok(affine),
            DatumShiftDomain::Geographic2D | DatumShiftDomain::Geographic3D => {
                let source = ellipsoid_from(values, "src_semi_major", "src_semi_minor")?;
                let target = ellipsoid_from(values, "tgt_semi_major", "tgt_semi_minor")?;
                let with_height = self.domain == DatumShiftDomain::Geographic3D;
                concatenate_all(vec![
                    EllipsoidToCentric::create(&source, with_height)?,
                    affine,
                    CentricToEllipsoid::create(&target, with_height)?,
                ])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::SMALL_NUMBER;

    fn values_for(
        kind: DatumShiftKind,
        domain: DatumShiftDomain,
        settings: &[(&str, f64)],
    ) -> ParameterValueGroup {
        let method = DatumShiftMethod::provider(kind, domain);
        let mut values = ParameterValueGroup::new(method.parameters());
        for (name, value) in settings {
            values.set(name, *value).unwrap();
        }
        values
    }

    fn create(
        kind: DatumShiftKind,
        domain: DatumShiftDomain,
        settings: &[(&str, f64)],
    ) -> Arc<dyn MathTransform> {
        crate::tests::init_logger();
        DatumShiftMethod::provider(kind, domain)
            .create_math_transform(&Context::new(values_for(kind, domain, settings)))
            .unwrap()
    }

    // EPSG's WGS 72 to WGS 84 example for the position vector convention
    const WGS72_SETTINGS: &[(&str, f64)] = &[
        ("Z-axis translation", 4.5),
        ("Z-axis rotation", 0.554),
        ("Scale difference", 0.219),
    ];

    #[test]
    fn test_position_vector_sample() {
        let transform = create(
            DatumShiftKind::PositionVector,
            DatumShiftDomain::Geocentric,
            WGS72_SETTINGS,
        );
        let out = transform
            .transform(&[3_657_660.66, 255_768.55, 5_201_382.11])
            .unwrap();
        approx::assert_abs_diff_eq!(out[0], 3_657_660.774, epsilon = 1e-3);
        approx::assert_abs_diff_eq!(out[1], 255_778.430, epsilon = 1e-3);
        approx::assert_abs_diff_eq!(out[2], 5_201_387.749, epsilon = 1e-3);
    }

    #[test]
    fn test_frame_rotation_is_the_opposite_sign() {
        let position_vector = create(
            DatumShiftKind::PositionVector,
            DatumShiftDomain::Geocentric,
            WGS72_SETTINGS,
        );
        let frame_rotation = create(
            DatumShiftKind::FrameRotation,
            DatumShiftDomain::Geocentric,
            &[
                ("Z-axis translation", 4.5),
                ("Z-axis rotation", -0.554),
                ("Scale difference", 0.219),
            ],
        );
        let pt = [3_657_660.66, 255_768.55, 5_201_382.11];
        assert_eq!(
            position_vector.transform(&pt).unwrap().as_slice(),
            frame_rotation.transform(&pt).unwrap().as_slice()
        );
    }

    #[test]
    fn test_translation_only() {
        let transform = create(
            DatumShiftKind::Translation,
            DatumShiftDomain::Geocentric,
            &[
                ("X-axis translation", 8.0),
                ("Y-axis translation", -5.0),
                ("Z-axis translation", 2.0),
            ],
        );
        let out = transform.transform(&[100.0, 200.0, 300.0]).unwrap();
        assert_eq!(out.as_slice(), &[108.0, 195.0, 302.0]);
    }

    #[test]
    fn test_defaults_are_the_identity() {
        let transform = create(
            DatumShiftKind::Translation,
            DatumShiftDomain::Geocentric,
            &[],
        );
        assert!(transform.is_identity());
    }

    #[test]
    fn test_geographic_domain_round_trips() {
        let wgs84 = &[
            ("src_semi_major", 6_378_137.0),
            ("src_semi_minor", 6_356_752.314245179),
            ("tgt_semi_major", 6_378_137.0),
            ("tgt_semi_minor", 6_356_752.314245179),
        ];
        let transform = create(
            DatumShiftKind::Translation,
            DatumShiftDomain::Geographic2D,
            wgs84,
        );
        assert_eq!(transform.source_dimensions(), 2);
        let out = transform.transform(&[12.0, 50.0]).unwrap();
        approx::assert_abs_diff_eq!(out[0], 12.0, epsilon = SMALL_NUMBER);
        approx::assert_abs_diff_eq!(out[1], 50.0, epsilon = SMALL_NUMBER);
    }

    #[test]
    fn test_geographic_domains_agree_at_zero_height() {
        let settings = [
            ("Z-axis translation", 4.5),
            ("Z-axis rotation", 0.554),
            ("Scale difference", 0.219),
            ("src_semi_major", 6_378_135.0),
            ("src_semi_minor", 6_356_750.52),
            ("tgt_semi_major", 6_378_137.0),
            ("tgt_semi_minor", 6_356_752.314245179),
        ];
        let two = create(
            DatumShiftKind::PositionVector,
            DatumShiftDomain::Geographic2D,
            &settings,
        );
        let three = create(
            DatumShiftKind::PositionVector,
            DatumShiftDomain::Geographic3D,
            &settings,
        );
        let flat = two.transform(&[12.0, 50.0]).unwrap();
        let tall = three.transform(&[12.0, 50.0, 0.0]).unwrap();
        assert_eq!(flat.as_slice(), &tall.as_slice()[..2]);
        // the shift moves the point by metres, so degrees move too
        assert!((flat[0] - 12.0).abs() > 1e-7);
    }

    #[test]
    fn test_redimension_moves_between_geographic_domains() {
        let two = DatumShiftMethod::provider(
            DatumShiftKind::PositionVector,
            DatumShiftDomain::Geographic2D,
        );
        let three = two.redimension(3, 3).unwrap();
        assert!(Arc::ptr_eq(
            &three,
            &DatumShiftMethod::provider(
                DatumShiftKind::PositionVector,
                DatumShiftDomain::Geographic3D,
            ),
        ));
        assert!(Arc::ptr_eq(&three.redimension(2, 2).unwrap(), &two));
        let geocentric = DatumShiftMethod::provider(
            DatumShiftKind::PositionVector,
            DatumShiftDomain::Geocentric,
        );
        assert!(matches!(
            geocentric.redimension(2, 2),
            Err(FactoryError::Redimension { .. })
        ));
        assert!(matches!(
            two.redimension(2, 3),
            Err(FactoryError::Redimension { .. })
        ));
    }
}
