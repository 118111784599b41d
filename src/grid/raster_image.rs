use image::{GenericImageView, Pixel};

use super::SampleSource;

/// An image exposed as samples, one band per channel.
pub struct ImageSource<Im> {
    image: Im,
    width: usize,
    height: usize,
    bands: usize,
}

impl<T, Px, Im> ImageSource<Im>
where
    T: Copy + Into<f64>,
    Px: Pixel<Subpixel = T>,
    Im: GenericImageView<Pixel = Px>,
{
    pub fn new(image: Im) -> Self {
        let (width, height) = image.dimensions();
        Self {
            image,
            width: width as usize,
            height: height as usize,
            bands: Px::CHANNEL_COUNT as usize,
        }
    }
}

impl<T, Px, Im> SampleSource for ImageSource<Im>
where
    T: Copy + Into<f64>,
    Px: Pixel<Subpixel = T>,
    Im: GenericImageView<Pixel = Px>,
{
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
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 || band >= self.bands
        {
            return None;
        }
        let px = self.image.get_pixel(x as u32, y as u32);
        Some(px.channels()[band].into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::init_logger;

    #[test]
    fn test_grayscale_is_one_band() {
        init_logger();
        let mut img = image::GrayImage::new(2, 2);
        img.put_pixel(0, 0, image::Luma([1]));
        img.put_pixel(1, 0, image::Luma([2]));
        img.put_pixel(0, 1, image::Luma([3]));
        img.put_pixel(1, 1, image::Luma([4]));
        let source = ImageSource::new(img);
        assert_eq!(source.bands(), 1);
        assert_eq!(source.sample(1, 1, 0), Some(4.0));
        assert_eq!(source.sample(2, 0, 0), None);
        assert_eq!(source.sample(0, 0, 1), None);
    }

    #[test]
    fn test_channels_become_bands() {
        init_logger();
        let mut img = image::RgbImage::new(1, 1);
        img.put_pixel(0, 0, image::Rgb([10, 20, 30]));
        let source = ImageSource::new(img);
        assert_eq!(source.bands(), 3);
        assert_eq!(source.sample(0, 0, 1), Some(20.0));
        assert_eq!(source.sample(0, 0, 2), Some(30.0));
    }
}
