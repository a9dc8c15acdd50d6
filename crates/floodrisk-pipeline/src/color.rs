//! Color-space planes for the water detectors.
//!
//! Every detector tests pixels against fixed ranges expressed in 8-bit
//! conventions:
//!
//! - HSV: hue in `0..180` (degrees halved), saturation and value in
//!   `0..=255`.
//! - CIE L*a*b* (D65): `L* * 255 / 100`, `a* + 128`, `b* + 128`, each
//!   clamped to `0..=255`.
//!
//! [`ColorPlanes::from_frame`] converts a frame once so the detectors can
//! share the planes.

use image::{GrayImage, Luma};
use palette::{FromColor, Hsv, Lab, Srgb};

use crate::types::Frame;

/// Per-pixel HSV, Lab, and luminance planes of one frame.
#[derive(Debug, Clone)]
pub struct ColorPlanes {
    /// Hue, `0..180`.
    pub hue: GrayImage,
    /// Saturation, `0..=255`.
    pub saturation: GrayImage,
    /// Value, `0..=255`.
    pub value: GrayImage,
    /// Lightness, `0..=255`.
    pub lightness: GrayImage,
    /// Green-red opponent axis, offset by 128.
    pub a: GrayImage,
    /// Blue-yellow opponent axis, offset by 128.
    pub b: GrayImage,
    /// Luminance (`0.299 R + 0.587 G + 0.114 B`).
    pub gray: GrayImage,
}

impl ColorPlanes {
    /// Convert a frame into its color planes.
    #[must_use]
    pub fn from_frame(frame: &Frame) -> Self {
        let (w, h) = frame.dimensions();
        let mut planes = Self {
            hue: GrayImage::new(w, h),
            saturation: GrayImage::new(w, h),
            value: GrayImage::new(w, h),
            lightness: GrayImage::new(w, h),
            a: GrayImage::new(w, h),
            b: GrayImage::new(w, h),
            gray: GrayImage::new(w, h),
        };

        for (x, y, pixel) in frame.enumerate_pixels() {
            let [r, g, b] = pixel.0;
            let [hue, sat, val] = hsv8(r, g, b);
            let [l, a, bb] = lab8(r, g, b);
            planes.hue.put_pixel(x, y, Luma([hue]));
            planes.saturation.put_pixel(x, y, Luma([sat]));
            planes.value.put_pixel(x, y, Luma([val]));
            planes.lightness.put_pixel(x, y, Luma([l]));
            planes.a.put_pixel(x, y, Luma([a]));
            planes.b.put_pixel(x, y, Luma([bb]));
            planes.gray.put_pixel(x, y, Luma([luma8(r, g, b)]));
        }

        planes
    }

    /// HSV triple at `(x, y)`.
    #[must_use]
    pub fn hsv_at(&self, x: u32, y: u32) -> [u8; 3] {
        [
            self.hue.get_pixel(x, y).0[0],
            self.saturation.get_pixel(x, y).0[0],
            self.value.get_pixel(x, y).0[0],
        ]
    }

    /// Lab triple at `(x, y)`.
    #[must_use]
    pub fn lab_at(&self, x: u32, y: u32) -> [u8; 3] {
        [
            self.lightness.get_pixel(x, y).0[0],
            self.a.get_pixel(x, y).0[0],
            self.b.get_pixel(x, y).0[0],
        ]
    }
}

/// Inclusive per-channel range over an 8-bit triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelRange {
    /// Lower bound per channel.
    pub lower: [u8; 3],
    /// Upper bound per channel.
    pub upper: [u8; 3],
}

impl ChannelRange {
    /// Create a range from lower and upper bounds.
    #[must_use]
    pub const fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self { lower, upper }
    }

    /// Whether every channel of `sample` lies inside the bounds.
    #[must_use]
    pub fn contains(&self, sample: [u8; 3]) -> bool {
        sample
            .iter()
            .zip(self.lower.iter().zip(self.upper.iter()))
            .all(|(&v, (&lo, &hi))| (lo..=hi).contains(&v))
    }
}

/// RGB to 8-bit HSV.
#[must_use]
pub fn hsv8(r: u8, g: u8, b: u8) -> [u8; 3] {
    let rgb: Srgb<f32> = Srgb::new(r, g, b).into_format();
    let hsv: Hsv = Hsv::from_color(rgb);
    let degrees = hsv.hue.into_positive_degrees();
    // 360 degrees wraps back to hue 0.
    let hue = (degrees / 2.0).round() % 180.0;
    [
        to_u8(hue),
        to_u8(hsv.saturation * 255.0),
        to_u8(hsv.value * 255.0),
    ]
}

/// RGB to 8-bit CIE L*a*b*.
#[must_use]
pub fn lab8(r: u8, g: u8, b: u8) -> [u8; 3] {
    let rgb: Srgb<f32> = Srgb::new(r, g, b).into_format();
    let lab: Lab = Lab::from_color(rgb);
    [
        to_u8(lab.l * 255.0 / 100.0),
        to_u8(lab.a + 128.0),
        to_u8(lab.b + 128.0),
    ]
}

/// RGB to 8-bit luminance with BT.601 weights.
#[must_use]
pub fn luma8(r: u8, g: u8, b: u8) -> u8 {
    to_u8(0.114f32.mul_add(
        f32::from(b),
        0.299f32.mul_add(f32::from(r), 0.587 * f32::from(g)),
    ))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pure_blue_hue_is_120() {
        assert_eq!(hsv8(0, 0, 255), [120, 255, 255]);
    }

    #[test]
    fn pure_red_hue_is_zero() {
        assert_eq!(hsv8(255, 0, 0), [0, 255, 255]);
    }

    #[test]
    fn gray_has_no_saturation() {
        let [_, s, v] = hsv8(128, 128, 128);
        assert_eq!(s, 0);
        assert_eq!(v, 128);
    }

    #[test]
    fn black_lab_is_neutral() {
        let [l, a, b] = lab8(0, 0, 0);
        assert_eq!(l, 0);
        assert!((i16::from(a) - 128).abs() <= 1);
        assert!((i16::from(b) - 128).abs() <= 1);
    }

    #[test]
    fn white_lab_is_full_lightness() {
        let [l, a, b] = lab8(255, 255, 255);
        assert!(l >= 254, "expected L near 255, got {l}");
        assert!((i16::from(a) - 128).abs() <= 1);
        assert!((i16::from(b) - 128).abs() <= 1);
    }

    #[test]
    #[allow(clippy::cast_possible_truncation)]
    fn planes_match_per_pixel_conversion() {
        let frame = Frame::from_fn(3, 2, |x, y| image::Rgb([(x * 80) as u8, (y * 100) as u8, 200]));
        let planes = ColorPlanes::from_frame(&frame);
        for (x, y, p) in frame.enumerate_pixels() {
            assert_eq!(planes.hsv_at(x, y), hsv8(p.0[0], p.0[1], p.0[2]));
            assert_eq!(planes.lab_at(x, y), lab8(p.0[0], p.0[1], p.0[2]));
        }
        assert_eq!(planes.gray.dimensions(), (3, 2));
        for (x, y, p) in frame.enumerate_pixels() {
            assert_eq!(planes.gray.get_pixel(x, y).0[0], luma8(p.0[0], p.0[1], p.0[2]));
        }
    }

    #[test]
    fn luminance_uses_bt601_weights() {
        assert_eq!(luma8(255, 0, 0), 76);
        assert_eq!(luma8(0, 255, 0), 150);
        assert_eq!(luma8(0, 0, 255), 29);
        assert_eq!(luma8(255, 255, 255), 255);
        assert_eq!(luma8(30, 80, 200), 79);
    }

    #[test]
    fn channel_range_is_inclusive() {
        let range = ChannelRange::new([80, 30, 30], [150, 255, 255]);
        assert!(range.contains([80, 30, 30]));
        assert!(range.contains([150, 255, 255]));
        assert!(!range.contains([79, 100, 100]));
        assert!(!range.contains([100, 29, 100]));
    }
}
