//! Multi-scale density fields and the zone color overlay.

use image::{Luma, Rgb};
use imageproc::definitions::Image;

use crate::blur;
use crate::types::{Frame, Mask, ZoneSet};

/// Per-pixel density in `[0, 1]`.
pub type DensityField = Image<Luma<f32>>;

/// `(sigma, weight)` pairs summed into a density field. Weights sum to 1
/// and favor the finest scale.
pub const SCALES: [(f32, f32); 4] = [(5.0, 0.4), (10.0, 0.3), (20.0, 0.2), (30.0, 0.1)];

/// Blur a mask at every scale, sum with weights, and normalize by the
/// maximum. An empty mask gives an all-zero field.
#[must_use]
pub fn density_field(mask: &Mask) -> DensityField {
    let (w, h) = mask.dimensions();
    let mut field = DensityField::new(w, h);
    if mask.pixels().all(|p| p.0[0] == 0) {
        return field;
    }

    let unit = DensityField::from_fn(w, h, |x, y| {
        Luma([if mask.get_pixel(x, y).0[0] > 0 { 1.0 } else { 0.0 }])
    });
    for (sigma, weight) in SCALES {
        let smoothed = blur::gaussian_blur_field(&unit, sigma);
        for (acc, s) in field.pixels_mut().zip(smoothed.pixels()) {
            acc.0[0] = s.0[0].mul_add(weight, acc.0[0]);
        }
    }

    let max = field.pixels().map(|p| p.0[0]).fold(0.0, f32::max);
    if max > 0.0 {
        for p in field.pixels_mut() {
            p.0[0] /= max;
        }
    }
    field
}

/// Color overlay of all three zones.
///
/// Core adds red, buffer adds orange (red plus some green), residual adds
/// cyan. Contributions saturate at 255 per channel.
#[must_use]
pub fn zone_overlay(zones: &ZoneSet) -> Frame {
    let core = density_field(&zones.core);
    let buffer = density_field(&zones.buffer);
    let residual = density_field(&zones.residual);

    Frame::from_fn(core.width(), core.height(), |x, y| {
        let a = core.get_pixel(x, y).0[0];
        let b = buffer.get_pixel(x, y).0[0];
        let c = residual.get_pixel(x, y).0[0];
        let r = scaled(a, 255.0).saturating_add(scaled(b, 255.0));
        let g = scaled(b, 200.0).saturating_add(scaled(c, 255.0));
        let bl = scaled(c, 255.0);
        Rgb([r, g, bl])
    })
}

/// `value * peak` truncated to a channel sample.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn scaled(value: f32, peak: f32) -> u8 {
    (value * peak) as u8
}
