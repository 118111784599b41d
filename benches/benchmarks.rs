use chrono::{DateTime, TimeZone, Utc};
use criterion::{Criterion, criterion_group, criterion_main};
use faer::rand::{Rng, SeedableRng, rngs::SmallRng};
use geodetic_transformations::{
    Ellipsoid, EllipsoidToCentric, GeneralMatrix, LinearTransform, MathTransform, MovingFeature,
    NoninvertibleError, Sinusoidal, TrajectoryTranslation, TransformError,
};
use std::{hint::black_box, sync::Arc};

/// An identity transform leaning on the trait default implementations for as
/// many methods as possible, to measure the overhead of those defaults.
#[derive(Debug, Copy, Clone)]
struct DefaultIdentity(usize);

impl MathTransform for DefaultIdentity {
    fn source_dimensions(&self) -> usize {
        self.0
    }

    fn target_dimensions(&self) -> usize {
        self.0
    }

    fn transform_into(&self, pt: &[f64], buf: &mut [f64]) -> Result<(), TransformError> {
        buf.copy_from_slice(pt);
        Ok(())
    }

    fn derivative(&self, _pt: &[f64]) -> Result<GeneralMatrix, TransformError> {
        Ok(GeneralMatrix::identity(self.0))
    }

    fn inverse(&self) -> Result<Arc<dyn MathTransform>, NoninvertibleError> {
        Ok(Arc::new(*self))
    }

    fn is_identity(&self) -> bool {
        true
    }
}

#[derive(Debug)]
struct BenchTrack {
    positions: Vec<f64>,
    datetimes: Vec<DateTime<Utc>>,
}

/// A two-sample track wide enough that any time coordinate in [0, 100)
/// truncated Julian days is in range.
fn bench_track() -> BenchTrack {
    BenchTrack {
        positions: vec![3.0, -7.0, 123.0, 456.0],
        datetimes: vec![
            Utc.with_ymd_and_hms(1960, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap(),
        ],
    }
}

impl MovingFeature for BenchTrack {
    fn trajectory_dimension(&self) -> usize {
        2
    }

    fn positions(&self) -> &[f64] {
        &self.positions
    }

    fn datetimes(&self) -> &[DateTime<Utc>] {
        &self.datetimes
    }
}

fn coords(n_rows: usize, n_cols: usize) -> Vec<Vec<f64>> {
    let mut rng = SmallRng::seed_from_u64(1991);
    let mut pts = Vec::with_capacity(n_rows);
    for _ in 0..n_rows {
        let mut pt = Vec::with_capacity(n_cols);
        for _ in 0..n_cols {
            pt.push(rng.random::<f64>() * 100.0);
        }
        pts.push(pt);
    }
    pts
}

fn transpose(coords: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let mut out = vec![Vec::with_capacity(coords.len()); coords[0].len()];
    for coord in coords.iter() {
        for (&val, tgt) in coord.iter().zip(out.iter_mut()) {
            tgt.push(val);
        }
    }
    out
}

struct Bencher<'c> {
    name: String,
    criterion: &'c mut Criterion,
}

impl<'c> Bencher<'c> {
    fn new<S: Into<String>>(name: S, criterion: &'c mut Criterion) -> Self {
        Self {
            name: name.into(),
            criterion,
        }
    }

    fn coords(&mut self, t: &dyn MathTransform) {
        let coords = coords(1000, t.source_dimensions());
        let mut out = vec![f64::NAN; t.target_dimensions()];
        self.criterion
            .bench_function(&format!("{}[coord]", self.name), |b| {
                b.iter(|| {
                    for pt in coords.iter() {
                        black_box(t.transform_into(pt, &mut out)).unwrap();
                    }
                })
            });

        let mut bulk = vec![vec![f64::NAN; t.target_dimensions()]; coords.len()];
        let coord_refs: Vec<&[_]> = coords.iter().map(|c| c.as_ref()).collect();
        let mut bulk_refs: Vec<&mut [_]> = bulk.iter_mut().map(|c| c.as_mut()).collect();
        self.criterion
            .bench_function(&format!("{}[bulk]", self.name), |b| {
                b.iter(|| {
                    black_box(t.bulk_transform_into(&coord_refs, &mut bulk_refs)).unwrap();
                })
            });

        let n_coords = coords.len();
        let cols = transpose(&coords);
        let col_refs: Vec<&[_]> = cols.iter().map(|c| c.as_ref()).collect();
        let mut out = vec![vec![f64::NAN; n_coords]; t.target_dimensions()];
        let mut out_refs: Vec<&mut [_]> = out.iter_mut().map(|v| v.as_mut()).collect();
        self.criterion
            .bench_function(&format!("{}[column]", self.name), |b| {
                b.iter(|| {
                    black_box(t.column_transform_into(&col_refs, &mut out_refs)).unwrap();
                })
            });
    }
}

fn default_identity(c: &mut Criterion) {
    let mut bencher = Bencher::new(stringify!(DefaultIdentity), c);
    let t = DefaultIdentity(3);
    bencher.coords(&t);
}

fn identity(c: &mut Criterion) {
    let mut bencher = Bencher::new("Identity", c);
    let t = LinearTransform::identity(3);
    bencher.coords(&t);
}

fn scale(c: &mut Criterion) {
    let mut bencher = Bencher::new("Scale", c);
    let t = LinearTransform::scale(&[2.0, 3.0, 4.0]);
    bencher.coords(&t);
}

fn translate(c: &mut Criterion) {
    let mut bencher = Bencher::new("Translate", c);
    let t = LinearTransform::translation(&[2.0, 3.0, 4.0]);
    bencher.coords(&t);
}

fn axis_reorder(c: &mut Criterion) {
    let mut bencher = Bencher::new("AxisReorder", c);
    let t = LinearTransform::axis_reorder(&[2, 1, 0]).unwrap();
    bencher.coords(&t);
}

fn geodetic_kernel(c: &mut Criterion) {
    let mut bencher = Bencher::new("GeodeticKernel", c);
    let t = EllipsoidToCentric::new(&Ellipsoid::wgs84(), true);
    bencher.coords(&t);
}

fn geodetic_chain(c: &mut Criterion) {
    let mut bencher = Bencher::new("GeodeticChain", c);
    let t = EllipsoidToCentric::create(&Ellipsoid::wgs84(), true).unwrap();
    bencher.coords(t.as_ref());
}

fn sinusoidal(c: &mut Criterion) {
    let mut bencher = Bencher::new(stringify!(Sinusoidal), c);
    let t = Sinusoidal::create(&Ellipsoid::wgs84(), 9.0, 500_000.0, 0.0).unwrap();
    bencher.coords(t.as_ref());
}

fn trajectory(c: &mut Criterion) {
    let mut bencher = Bencher::new("Trajectory", c);
    let t = TrajectoryTranslation::try_new(&bench_track()).unwrap();
    bencher.coords(&t);
}

criterion_group!(
    atoms,
    default_identity,
    identity,
    scale,
    translate,
    axis_reorder,
    geodetic_kernel
);
criterion_group!(chains, geodetic_chain, sinusoidal, trajectory);
criterion_main!(atoms, chains);
