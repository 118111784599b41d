use crate::dd::DoubleDouble;
use crate::error::{FactoryError, NoninvertibleError};

/// A non-zero matrix cell, carrying either plain or extended precision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatrixElement {
    Single(f64),
    Extended(DoubleDouble),
}

impl MatrixElement {
    pub fn to_f64(self) -> f64 {
        match self {
            Self::Single(v) => v,
            Self::Extended(dd) => dd.to_f64(),
        }
    }

    pub fn to_dd(self) -> DoubleDouble {
        match self {
            Self::Single(v) => v.into(),
            Self::Extended(dd) => dd,
        }
    }

    /// Normalize a double-double into a cell: exact zero becomes an absent
    /// cell, a zero error term degrades to plain precision.
    fn from_dd(dd: DoubleDouble) -> Option<Self> {
        if dd.is_zero() {
            None
        } else if dd.error() == 0.0 {
            Some(Self::Single(dd.value()))
        } else {
            Some(Self::Extended(dd))
        }
    }

    fn from_f64(value: f64) -> Option<Self> {
        if value == 0.0 {
            None
        } else {
            Some(Self::Single(value))
        }
    }
}

/// Row-major matrix whose cells are nullable numbers.
///
/// An absent cell is an exact (structural) zero. This lets plain f64
/// coefficients coexist with double-double ones without collapsing the
/// latter, and lets products and inversions skip work on zeros.
/// Dimensions are fixed at construction; [GeneralMatrix::set_element] is the
/// only mutation path.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneralMatrix {
    cells: Vec<Option<MatrixElement>>,
    nrows: usize,
    ncols: usize,
}

impl GeneralMatrix {
    pub fn builder() -> MatrixBuilder {
        MatrixBuilder::default()
    }

    pub fn zero(nrows: usize, ncols: usize) -> Self {
        Self {
            cells: vec![None; nrows * ncols],
            nrows,
            ncols,
        }
    }

    pub fn identity(size: usize) -> Self {
        let mut m = Self::zero(size, size);
        for i in 0..size {
            m.cells[i * size + i] = Some(MatrixElement::Single(1.0));
        }
        m
    }

    /// Row-major / C order data.
    pub fn try_new(data: Vec<f64>, ncols: usize) -> Result<Self, FactoryError> {
        if ncols == 0 || data.len() % ncols != 0 {
            return Err(FactoryError::Matrix(format!(
                "data length {} is not divisible by ncols {}",
                data.len(),
                ncols
            )));
        }
        let nrows = data.len() / ncols;
        Ok(Self {
            cells: data.into_iter().map(MatrixElement::from_f64).collect(),
            nrows,
            ncols,
        })
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    fn idx(&self, row: usize, col: usize) -> usize {
        assert!(row < self.nrows && col < self.ncols, "cell out of bounds");
        row * self.ncols + col
    }

    /// The stored cell, or `None` for an exact zero.
    pub fn element_or_null(&self, row: usize, col: usize) -> Option<MatrixElement> {
        self.cells[self.idx(row, col)]
    }

    /// The cell degraded to plain f64, zero for absent cells.
    pub fn element(&self, row: usize, col: usize) -> f64 {
        self.element_or_null(row, col).map_or(0.0, |e| e.to_f64())
    }

    fn element_dd(&self, row: usize, col: usize) -> DoubleDouble {
        self.element_or_null(row, col)
            .map_or(DoubleDouble::ZERO, |e| e.to_dd())
    }

    /// Store a plain value; an exact zero clears the cell.
    pub fn set_element(&mut self, row: usize, col: usize, value: f64) {
        let idx = self.idx(row, col);
        self.cells[idx] = MatrixElement::from_f64(value);
    }

    /// Store an extended-precision value; an exact zero clears the cell.
    pub fn set_element_extended(&mut self, row: usize, col: usize, value: DoubleDouble) {
        let idx = self.idx(row, col);
        self.cells[idx] = MatrixElement::from_dd(value);
    }

    /// Borrow the row-major cell array, read-only.
    pub fn numbers(&self) -> &[Option<MatrixElement>] {
        &self.cells
    }

    /// Materialize a row-major cell array owned by the caller, safe to mutate.
    pub fn to_numbers(&self) -> Vec<Option<MatrixElement>> {
        self.cells.clone()
    }

    /// Collapse every cell to f64, row-major.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        self.cells
            .iter()
            .map(|c| c.map_or(0.0, |e| e.to_f64()))
            .collect()
    }

    /// Whether this is exactly the identity.
    pub fn is_identity(&self) -> bool {
        if self.nrows != self.ncols {
            return false;
        }
        for r in 0..self.nrows {
            for c in 0..self.ncols {
                let cell = self.cells[r * self.ncols + c];
                if r == c {
                    match cell {
                        Some(e) if e.to_dd() == DoubleDouble::ONE => {}
                        _ => return false,
                    }
                } else if cell.is_some() {
                    return false;
                }
            }
        }
        true
    }

    /// Whether the last row is `[0, ..., 0, 1]`, i.e. the matrix maps the
    /// homogeneous coordinate straight through.
    pub fn is_affine(&self) -> bool {
        let last = self.nrows - 1;
        for c in 0..self.ncols {
            let expected = if c == self.ncols - 1 { 1.0 } else { 0.0 };
            if self.element(last, c) != expected {
                return false;
            }
        }
        true
    }

    pub fn transpose(&self) -> GeneralMatrix {
        let mut out = Self::zero(self.ncols, self.nrows);
        for r in 0..self.nrows {
            for c in 0..self.ncols {
                out.cells[c * self.nrows + r] = self.cells[r * self.ncols + c];
            }
        }
        out
    }

    /// Copy of the given half-open row/column ranges.
    pub fn block(
        &self,
        rows: std::ops::Range<usize>,
        cols: std::ops::Range<usize>,
    ) -> GeneralMatrix {
        let mut out = Self::zero(rows.len(), cols.len());
        for (ro, r) in rows.clone().enumerate() {
            for (co, c) in cols.clone().enumerate() {
                out.cells[ro * out.ncols + co] = self.cells[self.idx(r, c)];
            }
        }
        out
    }

    /// Matrix product `self * other`, accumulated in double-double precision.
    ///
    /// Absent (zero) cells are skipped, so structural zeros cost nothing and
    /// never pollute extended cells with rounding noise.
    pub fn multiply(&self, other: &GeneralMatrix) -> Result<GeneralMatrix, FactoryError> {
        if self.ncols != other.nrows {
            return Err(FactoryError::Matrix(format!(
                "cannot multiply {}x{} by {}x{}",
                self.nrows, self.ncols, other.nrows, other.ncols
            )));
        }
        let mut out = Self::zero(self.nrows, other.ncols);
        for r in 0..self.nrows {
            for c in 0..other.ncols {
                let mut acc = DoubleDouble::ZERO;
                for k in 0..self.ncols {
                    let (Some(a), Some(b)) = (
                        self.cells[r * self.ncols + k],
                        other.cells[k * other.ncols + c],
                    ) else {
                        continue;
                    };
                    acc = acc.mul_add_product(a.to_dd(), b.to_dd());
                }
                out.cells[r * out.ncols + c] = MatrixElement::from_dd(acc);
            }
        }
        Ok(out)
    }

    /// Invert the matrix, in double-double precision.
    ///
    /// Square matrices go through Gauss-Jordan elimination with partial
    /// pivoting. Non-square matrices are supported only for the
    /// dimension-change shapes produced by affine transforms: a column of
    /// zeros (an unused source dimension) becomes a row of zeros in the
    /// inverse, and a row whose only non-zero coefficient is the translation
    /// term (a constant target dimension) is dropped. Anything else fails.
    pub fn inverse(&self) -> Result<GeneralMatrix, NoninvertibleError> {
        if self.nrows == self.ncols {
            return self.inverse_square();
        }
        if self.nrows < self.ncols {
            // more source than target dimensions: drop unused source columns
            let drop: Vec<usize> = (0..self.ncols - 1)
                .filter(|&c| (0..self.nrows).all(|r| self.cells[r * self.ncols + c].is_none()))
                .collect();
            if self.ncols - drop.len() != self.nrows {
                return Err(NoninvertibleError(format!(
                    "nonsquare {}x{} matrix",
                    self.nrows, self.ncols
                )));
            }
            let keep: Vec<usize> = (0..self.ncols).filter(|c| !drop.contains(c)).collect();
            let mut squared = Self::zero(self.nrows, keep.len());
            for r in 0..self.nrows {
                for (co, &c) in keep.iter().enumerate() {
                    squared.cells[r * squared.ncols + co] = self.cells[r * self.ncols + c];
                }
            }
            let inv = squared.inverse_square()?;
            // re-insert the dropped dimensions as zero rows
            let mut out = Self::zero(self.ncols, self.nrows);
            for (ro, &r) in keep.iter().enumerate() {
                for c in 0..self.nrows {
                    out.cells[r * out.ncols + c] = inv.cells[ro * inv.ncols + c];
                }
            }
            Ok(out)
        } else {
            // more target than source dimensions: drop constant target rows
            let drop: Vec<usize> = (0..self.nrows - 1)
                .filter(|&r| {
                    (0..self.ncols - 1).all(|c| self.cells[r * self.ncols + c].is_none())
                })
                .collect();
            if self.nrows - drop.len() != self.ncols {
                return Err(NoninvertibleError(format!(
                    "nonsquare {}x{} matrix",
                    self.nrows, self.ncols
                )));
            }
            let keep: Vec<usize> = (0..self.nrows).filter(|r| !drop.contains(r)).collect();
            let mut squared = Self::zero(keep.len(), self.ncols);
            for (ro, &r) in keep.iter().enumerate() {
                for c in 0..self.ncols {
                    squared.cells[ro * squared.ncols + c] = self.cells[r * self.ncols + c];
                }
            }
            let inv = squared.inverse_square()?;
            // re-insert the dropped dimensions as zero columns
            let mut out = Self::zero(self.ncols, self.nrows);
            for r in 0..self.ncols {
                for (co, &c) in keep.iter().enumerate() {
                    out.cells[r * out.ncols + c] = inv.cells[r * inv.ncols + co];
                }
            }
            Ok(out)
        }
    }

    fn inverse_square(&self) -> Result<GeneralMatrix, NoninvertibleError> {
        let n = self.nrows;
        // augmented [self | I] in double-double
        let mut work: Vec<DoubleDouble> = Vec::with_capacity(n * 2 * n);
        for r in 0..n {
            for c in 0..n {
                work.push(self.element_dd(r, c));
            }
            for c in 0..n {
                work.push(if r == c {
                    DoubleDouble::ONE
                } else {
                    DoubleDouble::ZERO
                });
            }
        }
        let w = 2 * n;
        for col in 0..n {
            let pivot_row = (col..n)
                .max_by(|&a, &b| {
                    work[a * w + col]
                        .value()
                        .abs()
                        .total_cmp(&work[b * w + col].value().abs())
                })
                .ok_or_else(|| NoninvertibleError("empty matrix".into()))?;
            if work[pivot_row * w + col].value().abs() == 0.0 {
                return Err(NoninvertibleError(format!("singular at column {col}")));
            }
            if pivot_row != col {
                for c in 0..w {
                    work.swap(pivot_row * w + c, col * w + c);
                }
            }
            let pivot = work[col * w + col];
            for c in 0..w {
                work[col * w + c] = work[col * w + c].div(pivot);
            }
            for r in 0..n {
                if r == col {
                    continue;
                }
                let factor = work[r * w + col];
                if factor.is_zero() {
                    continue;
                }
                for c in 0..w {
                    let sub = factor.mul(work[col * w + c]);
                    work[r * w + c] = work[r * w + c].sub(sub);
                }
            }
        }
        let mut out = Self::zero(n, n);
        for r in 0..n {
            for c in 0..n {
                out.cells[r * n + c] = MatrixElement::from_dd(work[r * w + n + c]);
            }
        }
        Ok(out)
    }
}

/// Builds a matrix row by row.
#[derive(Debug, Default)]
pub struct MatrixBuilder {
    ncols: Option<usize>,
    cells: Vec<Option<MatrixElement>>,
}

impl MatrixBuilder {
    pub fn add_row(&mut self, row: &[f64]) -> Result<&mut Self, FactoryError> {
        if let Some(ncols) = self.ncols {
            if ncols != row.len() {
                return Err(FactoryError::Matrix(format!(
                    "inconsistent row length {}, expected {ncols}",
                    row.len()
                )));
            }
        } else {
            self.ncols = Some(row.len());
        }
        self.cells
            .extend(row.iter().map(|&v| MatrixElement::from_f64(v)));
        Ok(self)
    }

    pub fn add_row_extended(&mut self, row: &[DoubleDouble]) -> Result<&mut Self, FactoryError> {
        if let Some(ncols) = self.ncols {
            if ncols != row.len() {
                return Err(FactoryError::Matrix(format!(
                    "inconsistent row length {}, expected {ncols}",
                    row.len()
                )));
            }
        } else {
            self.ncols = Some(row.len());
        }
        self.cells
            .extend(row.iter().map(|&v| MatrixElement::from_dd(v)));
        Ok(self)
    }

    pub fn build(self) -> GeneralMatrix {
        let ncols = self.ncols.unwrap_or(0);
        let nrows = if ncols == 0 { 0 } else { self.cells.len() / ncols };
        GeneralMatrix {
            cells: self.cells,
            nrows,
            ncols,
        }
    }
}
