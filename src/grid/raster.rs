use crate::error::FactoryError;

/// Read access to a two-dimensional, possibly multi-band block of samples.
///
/// Coordinates are absolute: the data occupies `min_x()..min_x() + width()`
/// by `min_y()..min_y() + height()`, and [SampleSource::sample] answers
/// `None` outside that rectangle.
pub trait SampleSource {
    fn min_x(&self) -> i64;
    fn min_y(&self) -> i64;
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn bands(&self) -> usize;
    fn sample(&self, x: i64, y: i64, band: usize) -> Option<f64>;
}

/// An owned block of samples, row-major with interleaved bands.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    min_x: i64,
    min_y: i64,
    width: usize,
    height: usize,
    bands: usize,
    samples: Vec<f64>,
}

impl Raster {
    pub fn try_new(
        min_x: i64,
        min_y: i64,
        width: usize,
        height: usize,
        bands: usize,
        samples: Vec<f64>,
    ) -> Result<Self, FactoryError> {
        if width == 0 || height == 0 || bands == 0 {
            return Err(FactoryError::Data(format!(
                "a raster needs at least one pixel and one band, got {width}x{height}x{bands}"
            )));
        }
        let expected = width * height * bands;
        if samples.len() != expected {
            return Err(FactoryError::Data(format!(
                "a {width}x{height} raster with {bands} bands needs {expected} samples, got {}",
                samples.len()
            )));
        }
        Ok(Self {
            min_x,
            min_y,
            width,
            height,
            bands,
            samples,
        })
    }

    pub fn filled(
        min_x: i64,
        min_y: i64,
        width: usize,
        height: usize,
        bands: usize,
        value: f64,
    ) -> Result<Self, FactoryError> {
        Self::try_new(
            min_x,
            min_y,
            width,
            height,
            bands,
            vec![value; width * height * bands],
        )
    }

    /// The flat sample buffer: `samples[((y * width) + x) * bands + band]`,
    /// with `x` and `y` relative to the raster origin.
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    fn index_of(&self, x: i64, y: i64, band: usize) -> Option<usize> {
        let col = x.checked_sub(self.min_x)?;
        let row = y.checked_sub(self.min_y)?;
        if col < 0 || col >= self.width as i64 || row < 0 || row >= self.height as i64 {
            return None;
        }
        if band >= self.bands {
            return None;
        }
        Some((row as usize * self.width + col as usize) * self.bands + band)
    }
}

impl SampleSource for Raster {
    fn min_x(&self) -> i64 {
        self.min_x
    }

    fn min_y(&self) -> i64 {
        self.min_y
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
        self.index_of(x, y, band).map(|idx| self.samples[idx])
    }
}

/// A repositioned view of another source: the point `(origin_x, origin_y)`
/// of the wrapped source becomes pixel (0, 0) of the view, and the view is
/// clipped to the requested window.
///
/// The view only repositions. It never invents samples: reads outside the
/// wrapped data answer `None` even inside the requested window.
#[derive(Debug, Clone)]
pub struct ReshapedImage<S> {
    source: S,
    origin_x: i64,
    origin_y: i64,
    min_x: i64,
    min_y: i64,
    width: usize,
    height: usize,
}

impl<S: SampleSource> ReshapedImage<S> {
    pub fn new(source: S, origin_x: i64, origin_y: i64, width: usize, height: usize) -> Self {
        let data_min_x = source.min_x() - origin_x;
        let data_min_y = source.min_y() - origin_y;
        let min_x = data_min_x.max(0);
        let min_y = data_min_y.max(0);
        let max_x = (data_min_x + source.width() as i64).min(width as i64);
        let max_y = (data_min_y + source.height() as i64).min(height as i64);
        Self {
            source,
            origin_x,
            origin_y,
            min_x,
            min_y,
            width: (max_x - min_x).max(0) as usize,
            height: (max_y - min_y).max(0) as usize,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

impl<S: SampleSource> SampleSource for ReshapedImage<S> {
    fn min_x(&self) -> i64 {
        self.min_x
    }

    fn min_y(&self) -> i64 {
        self.min_y
    }

    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn bands(&self) -> usize {
        self.source.bands()
    }

    fn sample(&self, x: i64, y: i64, band: usize) -> Option<f64> {
        if x < self.min_x
            || y < self.min_y
            || x >= self.min_x + self.width as i64
            || y >= self.min_y + self.height as i64
        {
            return None;
        }
        self.source.sample(x + self.origin_x, y + self.origin_y, band)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::init_logger;

    fn two_by_two() -> Raster {
        Raster::try_new(0, 0, 2, 2, 1, vec![1.0, 2.0, 3.0, 4.0]).unwrap()
    }

    #[test]
    fn test_raster_indexes_band_interleaved() {
        init_logger();
        let raster = Raster::try_new(
            10,
            20,
            2,
            2,
            2,
            vec![1.0, -1.0, 2.0, -2.0, 3.0, -3.0, 4.0, -4.0],
        )
        .unwrap();
        assert_eq!(raster.sample(10, 20, 0), Some(1.0));
        assert_eq!(raster.sample(10, 20, 1), Some(-1.0));
        assert_eq!(raster.sample(11, 21, 0), Some(4.0));
        assert_eq!(raster.sample(11, 21, 1), Some(-4.0));
        assert_eq!(raster.sample(9, 20, 0), None);
        assert_eq!(raster.sample(10, 22, 0), None);
        assert_eq!(raster.sample(10, 20, 2), None);
    }

    #[test]
    fn test_raster_rejects_short_buffer() {
        init_logger();
        assert!(Raster::try_new(0, 0, 2, 2, 1, vec![1.0, 2.0, 3.0]).is_err());
        assert!(Raster::try_new(0, 0, 0, 2, 1, vec![]).is_err());
    }

    #[test]
    fn test_request_before_data_translates_bounds() {
        init_logger();
        let view = ReshapedImage::new(two_by_two(), -1, -2, 4, 4);
        assert_eq!(view.min_x(), 1);
        assert_eq!(view.min_y(), 2);
        assert_eq!(view.width(), 2);
        assert_eq!(view.height(), 2);
        assert_eq!(view.sample(1, 2, 0), Some(1.0));
        assert_eq!(view.sample(2, 2, 0), Some(2.0));
        assert_eq!(view.sample(1, 3, 0), Some(3.0));
        assert_eq!(view.sample(2, 3, 0), Some(4.0));
        assert_eq!(view.sample(0, 0, 0), None);
        assert_eq!(view.sample(3, 2, 0), None);
    }

    #[test]
    fn test_request_clips_to_window() {
        init_logger();
        let view = ReshapedImage::new(two_by_two(), 0, 0, 1, 1);
        assert_eq!(view.min_x(), 0);
        assert_eq!(view.min_y(), 0);
        assert_eq!(view.width(), 1);
        assert_eq!(view.height(), 1);
        assert_eq!(view.sample(0, 0, 0), Some(1.0));
        assert_eq!(view.sample(1, 0, 0), None);
    }

    #[test]
    fn test_request_past_data_is_empty() {
        init_logger();
        let view = ReshapedImage::new(two_by_two(), 5, 5, 4, 4);
        assert_eq!(view.width(), 0);
        assert_eq!(view.height(), 0);
        assert_eq!(view.sample(0, 0, 0), None);
    }

    #[test]
    fn test_reshape_keeps_offset_source() {
        init_logger();
        let raster = Raster::try_new(3, 4, 2, 1, 1, vec![7.0, 8.0]).unwrap();
        let view = ReshapedImage::new(raster, 3, 4, 2, 1);
        assert_eq!(view.min_x(), 0);
        assert_eq!(view.min_y(), 0);
        assert_eq!(view.sample(0, 0, 0), Some(7.0));
        assert_eq!(view.sample(1, 0, 0), Some(8.0));
    }
}
