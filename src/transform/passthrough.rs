use std::sync::Arc;

use crate::error::{NoninvertibleError, TransformError};
use crate::matrix::GeneralMatrix;
use crate::transform::MathTransform;

/// Applies a sub-transform to a contiguous range of dimensions, copying the
/// leading and trailing dimensions unchanged.
#[derive(Debug, Clone)]
pub struct PassThroughTransform {
    first_affected: usize,
    sub: Arc<dyn MathTransform>,
    trailing: usize,
}

impl PassThroughTransform {
    /// Wrap `sub`, skipping the degenerate wrapper when there is nothing to
    /// pass through.
    pub fn create(
        first_affected: usize,
        sub: Arc<dyn MathTransform>,
        trailing: usize,
    ) -> Arc<dyn MathTransform> {
        if first_affected == 0 && trailing == 0 {
            return sub;
        }
        Arc::new(Self {
            first_affected,
            sub,
            trailing,
        })
    }

    pub fn sub_transform(&self) -> &Arc<dyn MathTransform> {
        &self.sub
    }

    pub fn first_affected(&self) -> usize {
        self.first_affected
    }
}

impl MathTransform for PassThroughTransform {
    fn source_dimensions(&self) -> usize {
        self.first_affected + self.sub.source_dimensions() + self.trailing
    }

    fn target_dimensions(&self) -> usize {
        self.first_affected + self.sub.target_dimensions() + self.trailing
    }

    fn transform_into(&self, pt: &[f64], buf: &mut [f64]) -> Result<(), TransformError> {
        let f = self.first_affected;
        let sub_src = self.sub.source_dimensions();
        let sub_tgt = self.sub.target_dimensions();
        buf[..f].copy_from_slice(&pt[..f]);
        self.sub
            .transform_into(&pt[f..f + sub_src], &mut buf[f..f + sub_tgt])?;
        buf[f + sub_tgt..].copy_from_slice(&pt[f + sub_src..]);
        Ok(())
    }

    fn column_transform_into(
        &self,
        columns: &[&[f64]],
        bufs: &mut [&mut [f64]],
    ) -> Result<(), TransformError> {
        let f = self.first_affected;
        let sub_src = self.sub.source_dimensions();
        let sub_tgt = self.sub.target_dimensions();
        for (col, buf) in columns[..f].iter().zip(bufs[..f].iter_mut()) {
            buf.copy_from_slice(col);
        }
        self.sub
            .column_transform_into(&columns[f..f + sub_src], &mut bufs[f..f + sub_tgt])?;
        for (col, buf) in columns[f + sub_src..]
            .iter()
            .zip(bufs[f + sub_tgt..].iter_mut())
        {
            buf.copy_from_slice(col);
        }
        Ok(())
    }

    fn derivative(&self, pt: &[f64]) -> Result<GeneralMatrix, TransformError> {
        let f = self.first_affected;
        let sub_src = self.sub.source_dimensions();
        let sub_jac = self.sub.derivative(&pt[f..f + sub_src])?;
        let mut m = GeneralMatrix::zero(self.target_dimensions(), self.source_dimensions());
        for i in 0..f {
            m.set_element(i, i, 1.0);
        }
        for r in 0..sub_jac.nrows() {
            for c in 0..sub_jac.ncols() {
                m.set_element(f + r, f + c, sub_jac.element(r, c));
            }
        }
        for i in 0..self.trailing {
            m.set_element(f + sub_jac.nrows() + i, f + sub_jac.ncols() + i, 1.0);
        }
        Ok(m)
    }

    fn inverse(&self) -> Result<Arc<dyn MathTransform>, NoninvertibleError> {
        Ok(Arc::new(Self {
            first_affected: self.first_affected,
            sub: self.sub.inverse()?,
            trailing: self.trailing,
        }))
    }

    fn is_identity(&self) -> bool {
        self.sub.is_identity()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::PassThroughTransform;
    use crate::tests::{
        check_inverse_transform_bulk, check_inverse_transform_col, check_inverse_transform_coord,
        check_transform_bulk, check_transform_col,
    };
    use crate::transform::{LinearTransform, MathTransform};

    fn make_transform() -> PassThroughTransform {
        PassThroughTransform {
            first_affected: 1,
            sub: Arc::new(LinearTransform::scale_and_translate(&[2.0], &[-5.0]).unwrap()),
            trailing: 1,
        }
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
    fn test_untouched_dimensions() {
        let t = make_transform();
        let out = t.transform(&[7.0, 3.0, 9.0]).unwrap();
        assert_eq!(out.as_slice(), &[7.0, 1.0, 9.0]);
    }

    #[test]
    fn test_derivative_block() {
        let t = make_transform();
        let d = t.derivative(&[7.0, 3.0, 9.0]).unwrap();
        assert_eq!((d.nrows(), d.ncols()), (3, 3));
        assert_eq!(d.element(0, 0), 1.0);
        assert_eq!(d.element(1, 1), 2.0);
        assert_eq!(d.element(2, 2), 1.0);
        assert_eq!(d.element(1, 0), 0.0);
    }

    #[test]
    fn test_degenerate_create_returns_sub() {
        let sub: Arc<dyn MathTransform> = Arc::new(LinearTransform::scale(&[2.0, 3.0]));
        let wrapped = PassThroughTransform::create(0, sub.clone(), 0);
        assert!(Arc::ptr_eq(&wrapped, &sub));

        let wrapped = PassThroughTransform::create(1, sub, 0);
        assert_eq!(wrapped.source_dimensions(), 3);
    }
}
