use std::sync::Arc;

use crate::dd::DoubleDouble;
use crate::error::{FactoryError, NoninvertibleError, TransformError};
use crate::matrix::GeneralMatrix;
use crate::transform::MathTransform;

/// An affine transform backed by a homogeneous matrix.
///
/// For a transform from N to M dimensions the matrix has M+1 rows and N+1
/// columns, the last column holding the translation and the last row being
/// `[0, ..., 0, 1]`. The matrix keeps its extended-precision cells for
/// algebra (concatenation, inversion); evaluation runs over a flattened f64
/// copy.
#[derive(Debug, Clone)]
pub struct LinearTransform {
    matrix: GeneralMatrix,
    /// Row-major f64 collapse of `matrix`, for the evaluation hot loop.
    flat: Vec<f64>,
}

impl LinearTransform {
    pub fn try_new(matrix: GeneralMatrix) -> Result<Self, FactoryError> {
        if matrix.nrows() < 1 || matrix.ncols() < 1 {
            return Err(FactoryError::Matrix("empty transform matrix".into()));
        }
        if !matrix.is_affine() {
            return Err(FactoryError::Matrix(
                "last row of a transform matrix must be [0, ..., 0, 1]".into(),
            ));
        }
        Ok(Self::from_matrix_unchecked(matrix))
    }

    /// Matrix known to be affine by construction.
    fn from_matrix_unchecked(matrix: GeneralMatrix) -> Self {
        let flat = matrix.to_f64_vec();
        Self { matrix, flat }
    }

    pub fn identity(dim: usize) -> Self {
        Self::from_matrix_unchecked(GeneralMatrix::identity(dim + 1))
    }

    fn diagonal(scales: &[f64], offsets: &[f64]) -> Self {
        let dim = scales.len();
        let mut m = GeneralMatrix::zero(dim + 1, dim + 1);
        for (i, (&s, &t)) in scales.iter().zip(offsets.iter()).enumerate() {
            m.set_element(i, i, s);
            m.set_element(i, dim, t);
        }
        m.set_element(dim, dim, 1.0);
        Self::from_matrix_unchecked(m)
    }

    /// Diagonal scale plus translation, the general building block for unit
    /// conversions and normalization steps.
    pub fn scale_and_translate(
        scales: &[f64],
        offsets: &[f64],
    ) -> Result<Self, FactoryError> {
        if scales.len() != offsets.len() {
            return Err(FactoryError::Matrix(format!(
                "{} scales but {} offsets",
                scales.len(),
                offsets.len()
            )));
        }
        Ok(Self::diagonal(scales, offsets))
    }

    /// As [LinearTransform::scale_and_translate], keeping double-double
    /// precision in the matrix cells.
    pub fn scale_and_translate_extended(
        scales: &[DoubleDouble],
        offsets: &[DoubleDouble],
    ) -> Result<Self, FactoryError> {
        if scales.len() != offsets.len() {
            return Err(FactoryError::Matrix(format!(
                "{} scales but {} offsets",
                scales.len(),
                offsets.len()
            )));
        }
        let dim = scales.len();
        let mut m = GeneralMatrix::zero(dim + 1, dim + 1);
        for (i, (&s, &t)) in scales.iter().zip(offsets.iter()).enumerate() {
            m.set_element_extended(i, i, s);
            m.set_element_extended(i, dim, t);
        }
        m.set_element(dim, dim, 1.0);
        Ok(Self::from_matrix_unchecked(m))
    }

    pub fn scale(factors: &[f64]) -> Self {
        Self::diagonal(factors, &vec![0.0; factors.len()])
    }

    pub fn translation(offsets: &[f64]) -> Self {
        Self::diagonal(&vec![1.0; offsets.len()], offsets)
    }

    /// Axis permutation: target axis `i` takes its value from source axis
    /// `order[i]`.
    pub fn axis_reorder(order: &[usize]) -> Result<Self, FactoryError> {
        let dim = order.len();
        let mut seen = vec![false; dim];
        for &o in order {
            if o >= dim || seen[o] {
                return Err(FactoryError::Matrix(format!(
                    "{order:?} is not a permutation of 0..{dim}"
                )));
            }
            seen[o] = true;
        }
        let mut m = GeneralMatrix::zero(dim + 1, dim + 1);
        for (i, &o) in order.iter().enumerate() {
            m.set_element(i, o, 1.0);
        }
        m.set_element(dim, dim, 1.0);
        Ok(Self::from_matrix_unchecked(m))
    }

    /// Keep only the given source dimensions, in the given order.
    pub fn dimension_filter(source_dim: usize, keep: &[usize]) -> Result<Self, FactoryError> {
        let mut m = GeneralMatrix::zero(keep.len() + 1, source_dim + 1);
        for (i, &k) in keep.iter().enumerate() {
            if k >= source_dim {
                return Err(FactoryError::Matrix(format!(
                    "dimension {k} out of range for a {source_dim}D source"
                )));
            }
            m.set_element(i, k, 1.0);
        }
        m.set_element(keep.len(), source_dim, 1.0);
        Ok(Self::from_matrix_unchecked(m))
    }

    pub fn matrix(&self) -> &GeneralMatrix {
        &self.matrix
    }

    /// Concatenation by matrix product: the transform applying `self` first,
    /// then `next`.
    pub fn then(&self, next: &LinearTransform) -> Result<LinearTransform, FactoryError> {
        if next.source_dimensions() != self.target_dimensions() {
            return Err(FactoryError::MismatchedDimensions {
                output: self.target_dimensions(),
                input: next.source_dimensions(),
            });
        }
        Ok(Self::from_matrix_unchecked(
            next.matrix.multiply(&self.matrix)?,
        ))
    }

    fn ncols(&self) -> usize {
        self.matrix.ncols()
    }
}

impl MathTransform for LinearTransform {
    fn source_dimensions(&self) -> usize {
        self.matrix.ncols() - 1
    }

    fn target_dimensions(&self) -> usize {
        self.matrix.nrows() - 1
    }

    fn transform_into(&self, pt: &[f64], buf: &mut [f64]) -> Result<(), TransformError> {
        let w = self.ncols();
        for (r, out) in buf.iter_mut().enumerate() {
            let row = &self.flat[r * w..(r + 1) * w];
            let mut acc = row[w - 1];
            for (m, p) in row[..w - 1].iter().zip(pt.iter()) {
                acc += m * p;
            }
            *out = acc;
        }
        Ok(())
    }

    fn column_transform_into(
        &self,
        columns: &[&[f64]],
        bufs: &mut [&mut [f64]],
    ) -> Result<(), TransformError> {
        let w = self.ncols();
        for (r, buf_col) in bufs.iter_mut().enumerate() {
            let row = &self.flat[r * w..(r + 1) * w];
            buf_col.fill(row[w - 1]);
            for (mat_val, coord_col) in row[..w - 1].iter().zip(columns.iter()) {
                if *mat_val == 0.0 {
                    continue;
                }
                // hottest loop: long arrays in lock step
                for (c, b) in coord_col.iter().zip(buf_col.iter_mut()) {
                    *b += c * mat_val;
                }
            }
        }
        Ok(())
    }

    fn derivative(&self, _pt: &[f64]) -> Result<GeneralMatrix, TransformError> {
        Ok(self
            .matrix
            .block(0..self.target_dimensions(), 0..self.source_dimensions()))
    }

    fn inverse(&self) -> Result<Arc<dyn MathTransform>, NoninvertibleError> {
        let inv = self.matrix.inverse()?;
        Ok(Arc::new(Self::from_matrix_unchecked(inv)))
    }

    fn is_identity(&self) -> bool {
        // checked on the f64 collapse the hot loop runs over, so extended
        // cells whose residual is below f64 resolution still count
        if self.matrix.nrows() != self.matrix.ncols() {
            return false;
        }
        let w = self.ncols();
        self.flat
            .iter()
            .enumerate()
            .all(|(i, &v)| v == if i / w == i % w { 1.0 } else { 0.0 })
    }

    fn linear_matrix(&self) -> Option<&GeneralMatrix> {
        Some(&self.matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{
        check_inverse_transform_bulk, check_inverse_transform_col, check_inverse_transform_coord,
        check_transform_bulk, check_transform_col,
    };

    fn make_transform() -> LinearTransform {
        LinearTransform::scale_and_translate(&[1.0, 0.5, 2.0], &[20.0, -3.0, 2.5]).unwrap()
    }

    #[test]
    fn test_bulk() {
        check_transform_bulk(make_transform());
    }

    #[test]
    fn test_columns() {
        check_transform_col(make_transform());
    }

    #[test]
    fn test_inverse() {
        check_inverse_transform_coord(make_transform());
    }

    #[test]
    fn test_inverse_bulk() {
        check_inverse_transform_bulk(make_transform());
    }

    #[test]
    fn test_inverse_columns() {
        check_inverse_transform_col(make_transform());
    }

    #[test]
    fn test_identity() {
        let t = LinearTransform::identity(3);
        assert!(t.is_identity());
        let out = t.transform(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(out.as_slice(), &[1.0, 2.0, 3.0]);
        assert!(!make_transform().is_identity());
    }

    #[test]
    fn test_axis_reorder() {
        let t = LinearTransform::axis_reorder(&[1, 0, 2]).unwrap();
        let out = t.transform(&[10.0, 20.0, 30.0]).unwrap();
        assert_eq!(out.as_slice(), &[20.0, 10.0, 30.0]);
        assert!(LinearTransform::axis_reorder(&[0, 0, 1]).is_err());
    }

    #[test]
    fn test_dimension_filter() {
        let t = LinearTransform::dimension_filter(3, &[0, 1]).unwrap();
        assert_eq!(t.source_dimensions(), 3);
        assert_eq!(t.target_dimensions(), 2);
        let out = t.transform(&[10.0, 20.0, 30.0]).unwrap();
        assert_eq!(out.as_slice(), &[10.0, 20.0]);

        // the lost dimension comes back as zero
        let inv = t.inverse().unwrap();
        let back = inv.transform(&out).unwrap();
        assert_eq!(back.as_slice(), &[10.0, 20.0, 0.0]);
    }

    #[test]
    fn test_derivative_is_unaugmented_block() {
        let t = make_transform();
        let d = t.derivative(&[1.0, 1.0, 1.0]).unwrap();
        assert_eq!((d.nrows(), d.ncols()), (3, 3));
        assert_eq!(d.element(1, 1), 0.5);
        assert_eq!(d.element(0, 1), 0.0);
        // translation is not part of the Jacobian
        assert_eq!(d.element(0, 0), 1.0);
    }

    #[test]
    fn test_then_multiplies_matrices() {
        let a = LinearTransform::scale(&[2.0, 2.0]);
        let b = LinearTransform::translation(&[1.0, -1.0]);
        let ab = a.then(&b).unwrap();
        let out = ab.transform(&[3.0, 4.0]).unwrap();
        assert_eq!(out.as_slice(), &[7.0, 7.0]);
        assert_eq!(ab.matrix().element(0, 2), 1.0);
        assert_eq!(ab.matrix().element(0, 0), 2.0);
    }

    #[test]
    fn test_rejects_non_affine() {
        let m = GeneralMatrix::try_new(vec![1.0, 0.0, 0.5, 1.0], 2).unwrap();
        assert!(LinearTransform::try_new(m).is_err());
    }
}
