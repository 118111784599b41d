use std::sync::Arc;

use crate::error::{FactoryError, NoninvertibleError, TransformError};
use crate::matrix::GeneralMatrix;
use crate::transform::{LinearTransform, MathTransform};
use crate::{ShortVec, as_muts, as_refs, vec_of_vec};
use smallvec::smallvec;

/// Applies a chain of transforms in order.
///
/// Built through [concatenate] or [concatenate_all], which simplify the
/// chain before constructing it; a `ConcatenatedTransform` therefore never
/// holds identity steps, adjacent linear steps, or a forward step followed
/// by its own inverse.
#[derive(Debug)]
pub struct ConcatenatedTransform {
    steps: Vec<Arc<dyn MathTransform>>,
    source_dim: usize,
    target_dim: usize,
    max_inner_dim: usize,
}

/// Chain two transforms, applying `first` then `second`.
pub fn concatenate(
    first: Arc<dyn MathTransform>,
    second: Arc<dyn MathTransform>,
) -> Result<Arc<dyn MathTransform>, FactoryError> {
    concatenate_all(vec![first, second])
}

/// Chain any number of transforms, applying them in order.
///
/// The chain is simplified before construction: nested chains are spliced
/// flat, identity steps dropped, adjacent linear steps merged into one
/// matrix, and a forward step directly followed by its own inverse is
/// cancelled. A chain that simplifies to a single step returns that step; a
/// chain that simplifies to nothing returns an identity.
pub fn concatenate_all(
    steps: Vec<Arc<dyn MathTransform>>,
) -> Result<Arc<dyn MathTransform>, FactoryError> {
    let mut flat: Vec<Arc<dyn MathTransform>> = Vec::with_capacity(steps.len());
    for step in steps {
        match step.concatenated_steps() {
            Some(inner) => flat.extend(inner.iter().cloned()),
            None => flat.push(step),
        }
    }
    let source_dim = match flat.first() {
        Some(t) => t.source_dimensions(),
        None => return Err(FactoryError::Data("cannot concatenate an empty chain".into())),
    };
    for pair in flat.windows(2) {
        if pair[0].target_dimensions() != pair[1].source_dimensions() {
            return Err(FactoryError::MismatchedDimensions {
                output: pair[0].target_dimensions(),
                input: pair[1].source_dimensions(),
            });
        }
    }

    let mut flat = simplify(flat)?;
    if flat.len() == 1 {
        return Ok(flat.remove(0));
    }
    if flat.is_empty() {
        return Ok(Arc::new(LinearTransform::identity(source_dim)));
    }
    Ok(Arc::new(ConcatenatedTransform::try_new(flat)?))
}

/// Run the chain rewrites to a fixed point.
fn simplify(
    mut steps: Vec<Arc<dyn MathTransform>>,
) -> Result<Vec<Arc<dyn MathTransform>>, FactoryError> {
    loop {
        let mut changed = false;

        let before = steps.len();
        steps.retain(|t| !t.is_identity());
        changed |= steps.len() != before;

        // forward directly followed by its own inverse cancels out; the
        // opposite order does not, as the forward member may not span its
        // source space (a 2D geodetic kernel never reproduces height)
        let mut idx = 0;
        while idx + 1 < steps.len() {
            let cancels = match (steps[idx].inversion_pair(), steps[idx + 1].inversion_pair()) {
                (Some((fwd, false)), Some((inv, true))) => fwd == inv,
                _ => false,
            };
            if cancels {
                steps.drain(idx..idx + 2);
                changed = true;
            } else {
                idx += 1;
            }
        }

        let mut idx = 0;
        while idx + 1 < steps.len() {
            let product = match (steps[idx].linear_matrix(), steps[idx + 1].linear_matrix()) {
                (Some(first), Some(second)) => Some(second.multiply(first)?),
                _ => None,
            };
            if let Some(product) = product {
                steps[idx] = Arc::new(LinearTransform::try_new(product)?);
                steps.remove(idx + 1);
                changed = true;
            } else {
                idx += 1;
            }
        }

        if !changed {
            return Ok(steps);
        }
    }
}

impl ConcatenatedTransform {
    fn try_new(steps: Vec<Arc<dyn MathTransform>>) -> Result<Self, FactoryError> {
        if steps.len() < 2 {
            return Err(FactoryError::Data(
                "a transform chain must have >= 2 steps".into(),
            ));
        }
        for pair in steps.windows(2) {
            if pair[0].target_dimensions() != pair[1].source_dimensions() {
                return Err(FactoryError::MismatchedDimensions {
                    output: pair[0].target_dimensions(),
                    input: pair[1].source_dimensions(),
                });
            }
        }
        let source_dim = steps[0].source_dimensions();
        let target_dim = steps[steps.len() - 1].target_dimensions();
        let max_inner_dim = steps
            .iter()
            .skip(1)
            .map(|t| t.source_dimensions())
            .max()
            .unwrap_or(0);
        Ok(Self {
            steps,
            source_dim,
            target_dim,
            max_inner_dim,
        })
    }

    pub fn steps(&self) -> &[Arc<dyn MathTransform>] {
        &self.steps
    }

    fn transform_into_inner(
        &self,
        pt: &[f64],
        out_buf: &mut [f64],
        mut buf0: ShortVec<f64>,
        mut buf1: ShortVec<f64>,
    ) -> Result<(ShortVec<f64>, ShortVec<f64>), TransformError> {
        for (idx, t) in self.steps.iter().enumerate() {
            let source_dim = t.source_dimensions();
            let target_dim = t.target_dimensions();

            if idx == 0 {
                t.transform_into(pt, &mut buf1[..target_dim])?;
            } else if idx == self.steps.len() - 1 {
                t.transform_into(&buf0[..source_dim], out_buf)?;
            } else {
                t.transform_into(&buf0[..source_dim], &mut buf1[..target_dim])?;
            }
            (buf0, buf1) = (buf1, buf0);
        }
        Ok((buf0, buf1))
    }
}

impl MathTransform for ConcatenatedTransform {
    fn source_dimensions(&self) -> usize {
        self.source_dim
    }

    fn target_dimensions(&self) -> usize {
        self.target_dim
    }

    fn transform_into(&self, pt: &[f64], buf: &mut [f64]) -> Result<(), TransformError> {
        self.transform_into_inner(
            pt,
            buf,
            smallvec![f64::NAN; self.max_inner_dim],
            smallvec![f64::NAN; self.max_inner_dim],
        )?;
        Ok(())
    }

    fn bulk_transform_into(
        &self,
        pts: &[&[f64]],
        bufs: &mut [&mut [f64]],
    ) -> Result<(), TransformError> {
        let mut buf0: ShortVec<f64> = smallvec![f64::NAN; self.max_inner_dim];
        let mut buf1: ShortVec<f64> = smallvec![f64::NAN; self.max_inner_dim];

        for (pt, buf) in pts.iter().zip(bufs.iter_mut()) {
            (buf0, buf1) = self.transform_into_inner(pt, buf, buf0, buf1)?;
        }
        Ok(())
    }

    fn column_transform_into(
        &self,
        columns: &[&[f64]],
        bufs: &mut [&mut [f64]],
    ) -> Result<(), TransformError> {
        let n_pts = columns[0].len();
        let mut buf0_vec = vec_of_vec(self.max_inner_dim, n_pts, f64::NAN);
        let mut buf1_vec = vec_of_vec(self.max_inner_dim, n_pts, f64::NAN);

        let mut buf0_input = true;
        let last_idx = self.steps.len() - 1;

        for (idx, t) in self.steps.iter().enumerate() {
            let in_dim = t.source_dimensions();
            let out_dim = t.target_dimensions();

            // guaranteed to have length >= 2
            if idx == 0 {
                t.column_transform_into(columns, &mut as_muts(&mut buf1_vec[..out_dim]))?;
            } else if idx == last_idx {
                if buf0_input {
                    t.column_transform_into(&as_refs(&buf0_vec[..in_dim]), bufs)?;
                } else {
                    t.column_transform_into(&as_refs(&buf1_vec[..in_dim]), bufs)?;
                }
            } else if buf0_input {
                t.column_transform_into(
                    &as_refs(&buf0_vec[..in_dim]),
                    &mut as_muts(&mut buf1_vec[..out_dim]),
                )?;
            } else {
                t.column_transform_into(
                    &as_refs(&buf1_vec[..in_dim]),
                    &mut as_muts(&mut buf0_vec[..out_dim]),
                )?;
            }
            buf0_input = !buf0_input;
        }
        Ok(())
    }

    fn derivative(&self, pt: &[f64]) -> Result<GeneralMatrix, TransformError> {
        let mut current = ShortVec::from_slice(pt);
        let mut jac = GeneralMatrix::identity(self.source_dim);
        for (idx, t) in self.steps.iter().enumerate() {
            jac = t
                .derivative(&current)?
                .multiply(&jac)
                .map_err(|e| TransformError::OutsideDomain(e.to_string()))?;
            if idx + 1 < self.steps.len() {
                current = t.transform(&current)?;
            }
        }
        Ok(jac)
    }

    fn inverse(&self) -> Result<Arc<dyn MathTransform>, NoninvertibleError> {
        let mut inv_steps = Vec::with_capacity(self.steps.len());
        for t in self.steps.iter().rev() {
            inv_steps.push(t.inverse()?);
        }
        concatenate_all(inv_steps).map_err(|e| NoninvertibleError(e.to_string()))
    }

    fn is_identity(&self) -> bool {
        self.steps.iter().all(|t| t.is_identity())
    }

    fn concatenated_steps(&self) -> Option<&[Arc<dyn MathTransform>]> {
        Some(&self.steps)
    }
}
