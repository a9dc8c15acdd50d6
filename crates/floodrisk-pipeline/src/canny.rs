//! Canny edge detection over binary water masks.
//!
//! Follows `imageproc::edges::canny` (Sobel gradient, non-maximum
//! suppression, hysteresis) with three differences:
//!
//! 1. **No pre-blur.** The input is already a clean binary mask; blurring
//!    it would only widen the boundary.
//! 2. **L1 magnitude** `|gx| + |gy|`, so a straight 0/255 step scores
//!    `4 * 255` on either side of the boundary.
//! 3. **Border-safe hysteresis.** Neighbors are bounds-checked and all
//!    eight are visited, which avoids the `u32` underflow of
//!    <https://github.com/image-rs/imageproc/issues/705>.
//!
//! Every step handles images narrower or shorter than the 3x3 window.

use image::{GrayImage, Luma};
use imageproc::definitions::Image;
use imageproc::filter::filter_clamped;
use imageproc::kernel;

use crate::types::MASK_ON;

/// Run Canny edge detection and return a 0/255 edge map.
///
/// `low` and `high` are hysteresis thresholds on the L1 gradient
/// magnitude; they are swapped if given in the wrong order.
#[must_use]
pub fn canny(image: &GrayImage, low: f32, high: f32) -> GrayImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return GrayImage::new(width, height);
    }
    let (low, high) = if low <= high { (low, high) } else { (high, low) };

    let gx: Image<Luma<i16>> = filter_clamped(image, kernel::SOBEL_HORIZONTAL_3X3);
    let gy: Image<Luma<i16>> = filter_clamped(image, kernel::SOBEL_VERTICAL_3X3);
    let magnitude = Gradient::new(&gx, &gy);

    let thinned = non_maximum_suppression(&magnitude);
    hysteresis(&thinned, width, height, low, high)
}

/// L1 gradient magnitude plus the signed components, row-major.
struct Gradient {
    width: u32,
    height: u32,
    gx: Vec<f32>,
    gy: Vec<f32>,
    magnitude: Vec<f32>,
}

impl Gradient {
    fn new(gx: &Image<Luma<i16>>, gy: &Image<Luma<i16>>) -> Self {
        let gx_values: Vec<f32> = gx.pixels().map(|p| f32::from(p.0[0])).collect();
        let gy_values: Vec<f32> = gy.pixels().map(|p| f32::from(p.0[0])).collect();
        let magnitude = gx_values
            .iter()
            .zip(&gy_values)
            .map(|(h, v)| h.abs() + v.abs())
            .collect();
        Self {
            width: gx.width(),
            height: gx.height(),
            gx: gx_values,
            gy: gy_values,
            magnitude,
        }
    }

    const fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Magnitude at `(x + dx, y + dy)`, zero outside the image.
    fn at_offset(&self, x: u32, y: u32, dx: i32, dy: i32) -> f32 {
        let nx = x.checked_add_signed(dx).filter(|&v| v < self.width);
        let ny = y.checked_add_signed(dy).filter(|&v| v < self.height);
        match (nx, ny) {
            (Some(nx), Some(ny)) => self.magnitude[self.index(nx, ny)],
            _ => 0.0,
        }
    }
}

/// Keep only pixels that are local maxima across the gradient direction.
fn non_maximum_suppression(g: &Gradient) -> Vec<f32> {
    const RADIANS_TO_DEGREES: f32 = 180.0 / std::f32::consts::PI;
    let mut out = vec![0.0; g.magnitude.len()];

    for y in 0..g.height {
        for x in 0..g.width {
            let idx = g.index(x, y);
            let m = g.magnitude[idx];
            if m <= 0.0 {
                continue;
            }
            let mut angle = g.gy[idx].atan2(g.gx[idx]) * RADIANS_TO_DEGREES;
            if angle < 0.0 {
                angle += 180.0;
            }

            // Offsets of the two neighbors straddling the edge.
            let (dx, dy) = if (22.5..67.5).contains(&angle) {
                (1, 1)
            } else if (67.5..112.5).contains(&angle) {
                (0, 1)
            } else if (112.5..157.5).contains(&angle) {
                (-1, 1)
            } else {
                (1, 0)
            };
            let behind = g.at_offset(x, y, -dx, -dy);
            let ahead = g.at_offset(x, y, dx, dy);

            // Ties keep only the first pixel of a plateau.
            if m > behind && m >= ahead {
                out[idx] = m;
            }
        }
    }
    out
}

/// Trace edges from strong pixels through weak ones.
fn hysteresis(thinned: &[f32], width: u32, height: u32, low: f32, high: f32) -> GrayImage {
    let mut out = GrayImage::new(width, height);
    let mut stack = Vec::new();
    let index = |x: u32, y: u32| y as usize * width as usize + x as usize;

    for y in 0..height {
        for x in 0..width {
            if thinned[index(x, y)] < high || out.get_pixel(x, y).0[0] != 0 {
                continue;
            }
            out.put_pixel(x, y, Luma([MASK_ON]));
            stack.push((x, y));

            while let Some((cx, cy)) = stack.pop() {
                for (dx, dy) in NEIGHBORS {
                    let (Some(nx), Some(ny)) = (cx.checked_add_signed(dx), cy.checked_add_signed(dy))
                    else {
                        continue;
                    };
                    if nx >= width || ny >= height {
                        continue;
                    }
                    if thinned[index(nx, ny)] >= low && out.get_pixel(nx, ny).0[0] == 0 {
                        out.put_pixel(nx, ny, Luma([MASK_ON]));
                        stack.push((nx, ny));
                    }
                }
            }
        }
    }
    out
}

const NEIGHBORS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];
