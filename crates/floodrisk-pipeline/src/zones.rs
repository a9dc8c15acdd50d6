//! Zone classification: core, buffer, and residual water.

use image::{GrayImage, Luma};

use crate::morphology::{self, Element};
use crate::types::{Dimensions, Mask, PipelineError, ZoneSet, ensure_non_empty};

/// Partition a filtered mask into risk zones.
///
/// - **A (core)**: the mask closed then opened with a 15x15 disk, limited
///   to pixels of the mask itself.
/// - **B (buffer)**: A dilated with a 25x25 disk, minus A.
/// - **C (residual)**: the mask minus A.
///
/// Never fails: on any stage failure the mask itself becomes A and the
/// other zones are empty.
#[must_use]
pub fn classify_zones(mask: &Mask) -> ZoneSet {
    match try_classify_zones(mask) {
        Ok(zones) => zones,
        Err(e) => {
            tracing::warn!(error = %e, "zone classification failed, using mask as core");
            let dimensions = Dimensions::of(mask);
            ZoneSet {
                core: mask.clone(),
                ..ZoneSet::empty(dimensions)
            }
        }
    }
}

/// Partition a filtered mask into risk zones, reporting failures.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyFrame`] if the mask has no pixels.
pub fn try_classify_zones(mask: &Mask) -> Result<ZoneSet, PipelineError> {
    ensure_non_empty(Dimensions::of(mask))?;

    let consolidated = morphology::close_open(mask, Element::DISK_15);
    let core = intersect(&consolidated, mask);
    let buffer = subtract(&morphology::dilate(&core, Element::DISK_25), &core);
    let residual = subtract(mask, &core);

    Ok(ZoneSet {
        core,
        buffer,
        residual,
    })
}

/// Pixels set in `a` but not in `b`.
#[must_use]
pub fn subtract(a: &Mask, b: &Mask) -> Mask {
    GrayImage::from_fn(a.width(), a.height(), |x, y| {
        Luma([a.get_pixel(x, y).0[0].saturating_sub(b.get_pixel(x, y).0[0])])
    })
}

/// Pixels set in both `a` and `b`.
#[must_use]
pub fn intersect(a: &Mask, b: &Mask) -> Mask {
    GrayImage::from_fn(a.width(), a.height(), |x, y| {
        Luma([a.get_pixel(x, y).0[0] & b.get_pixel(x, y).0[0]])
    })
}
