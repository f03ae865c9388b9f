use crate::common::*;

const LUMA_WEIGHTS: [f64; 3] = [0.2125, 0.7154, 0.0721];

/// Read an image file as 8-bit RGB.
///
/// Images with an alpha channel are composited onto a white background.
pub fn load_rgb_image(path: impl AsRef<Path>) -> Result<RgbImage> {
    let path = path.as_ref();
    let image = image::open(path)
        .with_context(|| format!("failed to load image file '{}'", path.display()))?;
    Ok(to_rgb(image))
}

/// Read an image file as a grayscale array with values in `[0, 1]`.
pub fn load_gray_image(path: impl AsRef<Path>) -> Result<Array2<f64>> {
    let image = load_rgb_image(path)?;
    Ok(rgb_to_gray(&image))
}

pub fn to_rgb(image: DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.into_rgb8();
    }

    let rgba = image.into_rgba8();
    let (width, height) = rgba.dimensions();
    RgbImage::from_fn(width, height, |x, y| {
        let Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
        let alpha = a as f64 / 255.0;
        let blend = |value: u8| (value as f64 * alpha + 255.0 * (1.0 - alpha)).round() as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

/// Convert to luminance in `[0, 1]`, indexed by `[row, col]`.
pub fn rgb_to_gray(image: &RgbImage) -> Array2<f64> {
    let (width, height) = image.dimensions();
    let [wr, wg, wb] = LUMA_WEIGHTS;
    Array2::from_shape_fn((height as usize, width as usize), |(row, col)| {
        let Rgb([r, g, b]) = *image.get_pixel(col as u32, row as u32);
        (wr * r as f64 + wg * g as f64 + wb * b as f64) / 255.0
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn gray_of_white_is_one() {
        let image = RgbImage::from_pixel(3, 2, Rgb([255, 255, 255]));
        let gray = rgb_to_gray(&image);
        assert_eq!(gray.dim(), (2, 3));
        gray.iter()
            .for_each(|&value| assert_abs_diff_eq!(value, 1.0, epsilon = 1e-9));
    }

    #[test]
    fn gray_is_indexed_by_row() {
        let mut image = RgbImage::new(4, 2);
        image.put_pixel(3, 0, Rgb([255, 0, 0]));
        let gray = rgb_to_gray(&image);
        assert_abs_diff_eq!(gray[[0, 3]], 0.2125, epsilon = 1e-9);
        assert_eq!(gray[[1, 3]], 0.0);
    }

    #[test]
    fn transparent_pixels_become_white() {
        let mut rgba = image::RgbaImage::new(2, 1);
        rgba.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        rgba.put_pixel(1, 0, Rgba([10, 20, 30, 255]));
        let rgb = to_rgb(DynamicImage::ImageRgba8(rgba));
        assert_eq!(*rgb.get_pixel(0, 0), Rgb([255, 255, 255]));
        assert_eq!(*rgb.get_pixel(1, 0), Rgb([10, 20, 30]));
    }
}
