//! Bitmap text for burned-in annotations.
//!
//! Glyphs come from `font8x8`: each character is an 8x8 cell, one byte
//! per row, least significant bit leftmost. Characters without a glyph
//! are drawn as `?`. Drawing is clipped to the image.

use font8x8::{BASIC_FONTS, UnicodeFonts};
use image::Rgb;

use crate::types::Frame;

/// Side of one glyph cell at scale 1.
pub const GLYPH_SIZE: u32 = 8;

/// Width in pixels of `text` at `scale`.
#[must_use]
pub fn text_width(text: &str, scale: u32) -> u32 {
    let chars = u32::try_from(text.chars().count()).unwrap_or(u32::MAX);
    chars.saturating_mul(GLYPH_SIZE * scale)
}

/// Height in pixels of one line at `scale`.
#[must_use]
pub const fn text_height(scale: u32) -> u32 {
    GLYPH_SIZE * scale
}

/// Draw `text` with its top-left corner at `(x, y)`.
pub fn draw_text_mut(image: &mut Frame, text: &str, x: i32, y: i32, scale: u32, color: Rgb<u8>) {
    let scale = scale.max(1);
    let cell = i64::from(GLYPH_SIZE * scale);
    let step = i64::from(scale);

    for (i, ch) in text.chars().enumerate() {
        let Some(glyph) = BASIC_FONTS.get(ch).or_else(|| BASIC_FONTS.get('?')) else {
            continue;
        };
        #[allow(clippy::cast_possible_wrap)]
        let origin_x = i64::from(x) + i as i64 * cell;
        for (row, bits) in (0i64..).zip(glyph) {
            for col in 0..8i64 {
                if (bits >> col) & 1 == 1 {
                    fill_block(
                        image,
                        origin_x + col * step,
                        i64::from(y) + row * step,
                        scale,
                        color,
                    );
                }
            }
        }
    }
}

/// Set a `size` x `size` block, skipping pixels outside the image.
fn fill_block(image: &mut Frame, x: i64, y: i64, size: u32, color: Rgb<u8>) {
    let (w, h) = (i64::from(image.width()), i64::from(image.height()));
    let size = i64::from(size);
    for py in y.max(0)..(y + size).min(h) {
        for px in x.max(0)..(x + size).min(w) {
            if let (Ok(px), Ok(py)) = (u32::try_from(px), u32::try_from(py)) {
                image.put_pixel(px, py, color);
            }
        }
    }
}
