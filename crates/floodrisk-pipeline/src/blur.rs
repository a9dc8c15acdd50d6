//! Smoothing filters: Gaussian blur and local box mean.
//!
//! Wraps [`imageproc::filter::gaussian_blur_f32`] and
//! [`imageproc::filter::box_filter`]. Both operate on a single 8-bit
//! channel and preserve dimensions.

use image::{GrayImage, Luma};
use imageproc::definitions::Image;

/// Apply Gaussian blur to a single-channel image.
///
/// Higher `sigma` values produce more smoothing. Non-positive sigma values
/// (zero or negative) return the image unchanged, since `imageproc`'s
/// underlying function panics on `sigma <= 0.0`.
#[must_use = "returns the blurred image"]
pub fn gaussian_blur(image: &GrayImage, sigma: f32) -> GrayImage {
    if sigma <= 0.0 || image.width() == 0 || image.height() == 0 {
        return image.clone();
    }

    imageproc::filter::gaussian_blur_f32(image, sigma)
}

/// Apply Gaussian blur to a floating-point field.
///
/// Same guards as [`gaussian_blur`]; values are not quantized.
#[must_use = "returns the blurred field"]
pub fn gaussian_blur_field(field: &Image<Luma<f32>>, sigma: f32) -> Image<Luma<f32>> {
    if sigma <= 0.0 || field.width() == 0 || field.height() == 0 {
        return field.clone();
    }

    imageproc::filter::gaussian_blur_f32(field, sigma)
}

/// Sigma implied by an odd Gaussian kernel size when none is given.
///
/// Uses the conventional `0.3 * ((ksize - 1) / 2 - 1) + 0.8` rule, so a
/// 9x9 kernel corresponds to sigma 1.7.
#[must_use]
pub fn sigma_for_kernel_size(ksize: u32) -> f32 {
    #[allow(clippy::cast_precision_loss)]
    let half = ksize.saturating_sub(1) as f32 * 0.5;
    0.3f32.mul_add(half - 1.0, 0.8)
}

/// Mean of each pixel's `(2 * radius + 1)` square neighborhood.
///
/// A radius of 7 is a 15x15 averaging window. Pixels outside the image
/// are clamped to the nearest edge.
#[must_use = "returns the locally averaged image"]
pub fn box_mean(image: &GrayImage, radius: u32) -> GrayImage {
    if radius == 0 || image.width() == 0 || image.height() == 0 {
        return image.clone();
    }

    imageproc::filter::box_filter(image, radius, radius)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Water mask whose left half is set.
    fn half_mask() -> GrayImage {
        GrayImage::from_fn(12, 8, |x, _| Luma([if x < 6 { 255 } else { 0 }]))
    }

    #[test]
    fn non_positive_sigma_is_identity() {
        let mask = half_mask();
        for sigma in [0.0, -3.5] {
            assert_eq!(gaussian_blur(&mask, sigma), mask);
        }
    }

    #[test]
    fn empty_image_is_returned_unchanged() {
        let img = GrayImage::new(0, 0);
        assert_eq!(gaussian_blur(&img, 5.0), img);
        assert_eq!(box_mean(&img, 7), img);
    }

    #[test]
    fn mask_boundary_becomes_a_ramp() {
        let soft = gaussian_blur(&half_mask(), 1.7);
        assert_eq!(soft.dimensions(), (12, 8));
        let row: Vec<u8> = (0..12).map(|x| soft.get_pixel(x, 4).0[0]).collect();
        assert!(row.windows(2).all(|w| w[0] >= w[1]), "{row:?}");
        assert!(row[5] < 255 && row[6] > 0, "{row:?}");
    }

    #[test]
    fn field_blur_spreads_mass_without_quantizing() {
        let mut field = Image::<Luma<f32>>::new(21, 21);
        field.put_pixel(10, 10, Luma([1.0]));
        let blurred = gaussian_blur_field(&field, 5.0);
        let centre = blurred.get_pixel(10, 10).0[0];
        let corner = blurred.get_pixel(0, 0).0[0];
        assert!(centre > 0.0 && centre < 1.0, "got {centre}");
        assert!(corner > 0.0 && corner < centre, "got {corner}");
    }

    #[test]
    fn kernel_size_nine_is_sigma_1_7() {
        assert!((sigma_for_kernel_size(9) - 1.7).abs() < 1e-6);
        assert!((sigma_for_kernel_size(3) - 0.8).abs() < 1e-6);
    }

    #[test]
    fn box_mean_of_uniform_image_is_uniform() {
        let img = GrayImage::from_pixel(20, 20, Luma([90]));
        let mean = box_mean(&img, 7);
        assert!(mean.pixels().all(|p| p.0[0] == 90));
    }

    #[test]
    fn box_mean_averages_neighborhood() {
        let mut img = GrayImage::new(3, 3);
        img.put_pixel(1, 1, Luma([90]));
        let mean = box_mean(&img, 1);
        // 90 spread across nine pixels.
        assert_eq!(mean.get_pixel(1, 1).0[0], 10);
    }
}
