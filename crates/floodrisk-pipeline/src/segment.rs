//! Water segmentation: four independent visual cues combined by OR.
//!
//! 1. **Standard color ranges** over HSV: blue, dark, brown/muddy, and
//!    gray-blue satellite-style water.
//! 2. **Vegetation-aware**: green-tinted reflections, shadowed water
//!    under canopy, and smooth regions of consistent moderate luminance.
//! 3. **Mixed water-vegetation**: algae- or debris-laden water seen in
//!    HSV and Lab, restricted to smooth regions at a coarser blur scale.
//!
//! Every detector output is cleaned with a small close-then-open before
//! the masks are combined. [`segment_water`] is total: a failure yields
//! an all-zero mask.

use image::{GrayImage, Luma};

use crate::blur;
use crate::color::{ChannelRange, ColorPlanes};
use crate::gradient::{self, Aperture};
use crate::morphology::{self, Element};
use crate::types::{Dimensions, Frame, MASK_ON, Mask, PipelineError, ensure_non_empty};

/// Inclusive HSV ranges of the standard detector.
pub const STANDARD_RANGES: [ChannelRange; 4] = [
    // Blue water.
    ChannelRange::new([80, 30, 30], [150, 255, 255]),
    // Dark water.
    ChannelRange::new([0, 0, 40], [35, 255, 130]),
    // Brown, muddy flood water.
    ChannelRange::new([5, 40, 40], [30, 220, 170]),
    // Low-saturation gray-blue water in satellite imagery.
    ChannelRange::new([90, 20, 50], [130, 100, 150]),
];

/// Green-tinted water reflecting vegetation (HSV).
pub const GREEN_WATER: ChannelRange = ChannelRange::new([40, 30, 30], [85, 200, 180]);

/// Very dark, low-saturation water under canopy (HSV).
pub const SHADOW_WATER: ChannelRange = ChannelRange::new([0, 0, 20], [180, 80, 80]);

/// Sobel (3x3) magnitude below which a surface counts as low-texture.
pub const LOW_TEXTURE_GRADIENT: f32 = 15.0;

/// Exclusive lightness band for luminance-consistent water.
pub const LUMINANCE_BAND: (u8, u8) = (30, 120);

/// Maximum distance of lightness from its 15x15 local mean.
pub const LUMINANCE_TOLERANCE: i16 = 20;

/// Radius of the local-mean window (15x15).
pub const LUMINANCE_MEAN_RADIUS: u32 = 7;

/// Algae/debris signature in HSV.
pub const MIXED_HSV: ChannelRange = ChannelRange::new([35, 30, 40], [95, 150, 180]);

/// Algae/debris signature in Lab.
pub const MIXED_LAB: ChannelRange = ChannelRange::new([40, 110, 110], [140, 135, 145]);

/// Kernel size of the pre-blur for the mixed detector's smoothness test.
pub const MIXED_BLUR_KERNEL: u32 = 9;

/// Sobel (5x5) magnitude below which the blurred surface counts as smooth.
pub const MIXED_SMOOTH_GRADIENT: f32 = 25.0;

/// Output of each detector, kept separately for diagnostics.
#[derive(Debug, Clone)]
pub struct DetectorMasks {
    /// Standard color-range detector.
    pub standard: Mask,
    /// Vegetation-aware detector.
    pub vegetation: Mask,
    /// Mixed water-vegetation detector.
    pub mixed: Mask,
}

impl DetectorMasks {
    /// Run every detector over precomputed color planes.
    #[must_use]
    pub fn detect(planes: &ColorPlanes) -> Self {
        Self {
            standard: standard_water_mask(planes),
            vegetation: vegetation_water_mask(planes),
            mixed: mixed_water_mask(planes),
        }
    }

    /// Logical OR of all detector masks.
    #[must_use]
    pub fn combined(&self) -> Mask {
        union(&union(&self.standard, &self.vegetation), &self.mixed)
    }
}

/// Segment probable water pixels in a frame.
///
/// Never fails: a zero-sized frame, or any other stage failure, produces
/// an all-zero mask of the frame's size.
#[must_use]
pub fn segment_water(frame: &Frame) -> Mask {
    match try_segment_water(frame) {
        Ok(mask) => mask,
        Err(e) => {
            tracing::warn!(error = %e, "segmentation failed, using empty mask");
            Mask::new(frame.width(), frame.height())
        }
    }
}

/// Segment probable water pixels, reporting failures.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyFrame`] if the frame has no pixels.
pub fn try_segment_water(frame: &Frame) -> Result<Mask, PipelineError> {
    ensure_non_empty(Dimensions::of(frame))?;
    let planes = ColorPlanes::from_frame(frame);
    Ok(DetectorMasks::detect(&planes).combined())
}

/// OR of the four standard HSV range tests, cleaned.
#[must_use]
pub fn standard_water_mask(planes: &ColorPlanes) -> Mask {
    let raw = threshold(&planes.hue, |x, y| {
        let hsv = planes.hsv_at(x, y);
        STANDARD_RANGES.iter().any(|range| range.contains(hsv))
    });
    morphology::close_open(&raw, Element::DISK_5)
}

/// Green reflections OR canopy shadow OR (low texture AND consistent
/// luminance), cleaned.
#[must_use]
pub fn vegetation_water_mask(planes: &ColorPlanes) -> Mask {
    let smooth = gradient::low_gradient_mask(&planes.gray, Aperture::Three, LOW_TEXTURE_GRADIENT);
    let local_mean = blur::box_mean(&planes.lightness, LUMINANCE_MEAN_RADIUS);
    let (lo, hi) = LUMINANCE_BAND;

    let raw = threshold(&planes.hue, |x, y| {
        let hsv = planes.hsv_at(x, y);
        if GREEN_WATER.contains(hsv) || SHADOW_WATER.contains(hsv) {
            return true;
        }
        let l = planes.lightness.get_pixel(x, y).0[0];
        let mean = local_mean.get_pixel(x, y).0[0];
        let consistent = l > lo
            && l < hi
            && (i16::from(l) - i16::from(mean)).abs() < LUMINANCE_TOLERANCE;
        consistent && smooth.get_pixel(x, y).0[0] > 0
    });
    morphology::close_open(&raw, Element::DISK_5)
}

/// (HSV signature OR Lab signature) AND smooth at the coarse scale,
/// cleaned.
#[must_use]
pub fn mixed_water_mask(planes: &ColorPlanes) -> Mask {
    let blurred = blur::gaussian_blur(
        &planes.gray,
        blur::sigma_for_kernel_size(MIXED_BLUR_KERNEL),
    );
    let smooth = gradient::low_gradient_mask(&blurred, Aperture::Five, MIXED_SMOOTH_GRADIENT);

    let raw = threshold(&planes.hue, |x, y| {
        let signature =
            MIXED_HSV.contains(planes.hsv_at(x, y)) || MIXED_LAB.contains(planes.lab_at(x, y));
        signature && smooth.get_pixel(x, y).0[0] > 0
    });
    morphology::close_open(&raw, Element::CROSS_3)
}

/// Pixel-wise OR of two equally sized masks.
#[must_use]
pub fn union(a: &Mask, b: &Mask) -> Mask {
    GrayImage::from_fn(a.width(), a.height(), |x, y| {
        Luma([a.get_pixel(x, y).0[0] | b.get_pixel(x, y).0[0]])
    })
}

/// Build a mask the size of `like` from a per-pixel predicate.
fn threshold(like: &GrayImage, predicate: impl Fn(u32, u32) -> bool) -> Mask {
    GrayImage::from_fn(like.width(), like.height(), |x, y| {
        if predicate(x, y) {
            Luma([MASK_ON])
        } else {
            Luma([0])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn coverage(mask: &Mask) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let on = mask.pixels().filter(|p| p.0[0] > 0).count() as f64;
        #[allow(clippy::cast_precision_loss)]
        let total = (mask.width() * mask.height()) as f64;
        on / total
    }

    #[test]
    fn black_frame_has_no_water() {
        let frame = Frame::from_pixel(32, 32, Rgb([0, 0, 0]));
        assert!(coverage(&segment_water(&frame)).abs() < f64::EPSILON);
    }

    #[test]
    fn blue_frame_is_all_water() {
        let frame = Frame::from_pixel(32, 32, Rgb([30, 80, 200]));
        assert!((coverage(&segment_water(&frame)) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn white_frame_has_no_water() {
        let frame = Frame::from_pixel(32, 32, Rgb([255, 255, 255]));
        assert!(coverage(&segment_water(&frame)).abs() < f64::EPSILON);
    }

    #[test]
    fn blue_square_on_white_is_detected() {
        let frame = Frame::from_fn(40, 40, |x, y| {
            if (10..30).contains(&x) && (10..30).contains(&y) {
                Rgb([30, 80, 200])
            } else {
                Rgb([255, 255, 255])
            }
        });
        let mask = segment_water(&frame);
        assert_eq!(mask.get_pixel(20, 20).0[0], MASK_ON);
        assert_eq!(mask.get_pixel(2, 2).0[0], 0);
    }

    #[test]
    fn standard_ranges_cover_muddy_water() {
        let frame = Frame::from_pixel(16, 16, Rgb([120, 90, 60]));
        let planes = ColorPlanes::from_frame(&frame);
        assert!((coverage(&standard_water_mask(&planes)) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn vegetation_detector_finds_green_reflections() {
        // Hue ~60 (green), moderate saturation and value.
        let frame = Frame::from_pixel(16, 16, Rgb([60, 120, 70]));
        let planes = ColorPlanes::from_frame(&frame);
        assert!((coverage(&vegetation_water_mask(&planes)) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_frame_falls_back_to_empty_mask() {
        let frame = Frame::new(0, 0);
        assert_eq!(try_segment_water(&frame), Err(PipelineError::EmptyFrame));
        assert_eq!(segment_water(&frame).dimensions(), (0, 0));
    }

    #[test]
    fn single_pixel_frame_does_not_panic() {
        let frame = Frame::from_pixel(1, 1, Rgb([30, 80, 200]));
        assert_eq!(segment_water(&frame).dimensions(), (1, 1));
    }

    #[test]
    fn union_is_pixelwise_or() {
        let mut a = Mask::new(2, 1);
        let mut b = Mask::new(2, 1);
        a.put_pixel(0, 0, Luma([MASK_ON]));
        b.put_pixel(1, 0, Luma([MASK_ON]));
        let u = union(&a, &b);
        assert_eq!(u.get_pixel(0, 0).0[0], MASK_ON);
        assert_eq!(u.get_pixel(1, 0).0[0], MASK_ON);
    }

    #[test]
    fn detector_outputs_are_binary() {
        let frame = Frame::from_fn(24, 24, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            let v = ((x * 11 + y * 7) % 256) as u8;
            Rgb([v, v / 2, 255 - v])
        });
        let planes = ColorPlanes::from_frame(&frame);
        let masks = DetectorMasks::detect(&planes);
        for mask in [&masks.standard, &masks.vegetation, &masks.mixed, &masks.combined()] {
            assert!(mask.pixels().all(|p| p.0[0] == 0 || p.0[0] == MASK_ON));
        }
    }
}
