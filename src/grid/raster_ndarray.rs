use ndarray::{ArrayD, ArrayViewD};

use super::SampleSource;
use crate::error::FactoryError;

fn extents(shape: &[usize]) -> Result<(usize, usize, usize), FactoryError> {
    match *shape {
        [height, width] => Ok((1, height, width)),
        [bands, height, width] => Ok((bands, height, width)),
        _ => Err(FactoryError::Data(format!(
            "samples need a (row, column) or (band, row, column) array, got {} axes",
            shape.len()
        ))),
    }
}

/// An owned array exposed as samples: `(row, column)` for a single band, or
/// `(band, row, column)`.
pub struct ArraySource<T: Copy> {
    array: ArrayD<T>,
    bands: usize,
    height: usize,
    width: usize,
}

impl<T: Copy> ArraySource<T> {
    pub fn try_new(array: ArrayD<T>) -> Result<Self, FactoryError> {
        let (bands, height, width) = extents(array.shape())?;
        Ok(Self {
            array,
            bands,
            height,
            width,
        })
    }
}

impl<T: Copy + Into<f64>> SampleSource for ArraySource<T> {
    fn min_x(&self) -> i64 {
        0
    }

    fn min_y(&self) -> i64 {
        0
    }

    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn bands(&self) -> usize {
        self.bands
    }

    fn sample(&self, x: i64, y: i64, band: usize) -> Option<f64> {
        if x < 0 || y < 0 || band >= self.bands {
            return None;
        }
        let (x, y) = (x as usize, y as usize);
        let value = if self.array.ndim() == 2 {
            self.array.get([y, x].as_slice())
        } else {
            self.array.get([band, y, x].as_slice())
        };
        value.map(|v| (*v).into())
    }
}

/// As [ArraySource], borrowing the array.
pub struct ArrayViewSource<'a, T: Copy> {
    view: ArrayViewD<'a, T>,
    bands: usize,
    height: usize,
    width: usize,
}

impl<'a, T: Copy> ArrayViewSource<'a, T> {
    pub fn try_new(view: ArrayViewD<'a, T>) -> Result<Self, FactoryError> {
        let (bands, height, width) = extents(view.shape())?;
        Ok(Self {
            view,
            bands,
            height,
            width,
        })
    }
}

impl<'a, T: Copy + Into<f64>> SampleSource for ArrayViewSource<'a, T> {
    fn min_x(&self) -> i64 {
        0
    }

    fn min_y(&self) -> i64 {
        0
    }

    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn bands(&self) -> usize {
        self.bands
    }

    fn sample(&self, x: i64, y: i64, band: usize) -> Option<f64> {
        if x < 0 || y < 0 || band >= self.bands {
            return None;
        }
        let (x, y) = (x as usize, y as usize);
        let value = if self.view.ndim() == 2 {
            self.view.get([y, x].as_slice())
        } else {
            self.view.get([band, y, x].as_slice())
        };
        value.map(|v| (*v).into())
    }
}
