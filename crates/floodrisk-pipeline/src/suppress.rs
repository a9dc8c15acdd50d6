//! Road false-positive suppression.
//!
//! Roads and paths often pass the color tests. They are recognized by
//! shape: thin, elongated, low fill ratio. The thresholds are lenient on
//! purpose and favor keeping water over removing roads.

use crate::contour::{self, Region};
use crate::morphology::{self, Element};
use crate::types::{Dimensions, Mask, PipelineError, ensure_non_empty};

/// Regions with a smaller enclosed area are noise.
pub const MIN_AREA: f64 = 30.0;

/// Regions whose bounding rectangle is more elongated than this are roads.
pub const MAX_ASPECT_RATIO: f64 = 12.0;

/// Regions with `area / perimeter^2` below this are roads.
pub const MIN_FILL_RATIO: f64 = 0.005;

/// What to do with one connected region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Plausible water.
    Keep,
    /// Too small to matter.
    Noise,
    /// Thin or elongated like a road.
    RoadLike,
}

impl Verdict {
    /// Classify a region by area and shape.
    ///
    /// A region whose bounding rectangle is degenerate skips the shape
    /// tests and is kept if it is large enough.
    #[must_use]
    pub fn of(region: &Region) -> Self {
        let area = region.area();
        if area < MIN_AREA {
            return Self::Noise;
        }
        let Some(aspect) = region.aspect_ratio() else {
            return Self::Keep;
        };
        let perimeter = region.perimeter();
        if perimeter <= 0.0 {
            return Self::Keep;
        }
        let fill = area / (perimeter * perimeter);
        if aspect > MAX_ASPECT_RATIO || fill < MIN_FILL_RATIO {
            Self::RoadLike
        } else {
            Self::Keep
        }
    }
}

/// Filtered mask plus per-verdict region counts.
#[derive(Debug, Clone)]
pub struct Suppression {
    /// Retained regions, filled.
    pub mask: Mask,
    /// Regions kept.
    pub kept: usize,
    /// Regions dropped as noise.
    pub noise: usize,
    /// Regions dropped as road-like.
    pub road_like: usize,
}

/// Remove road-like regions from a water mask.
///
/// Never fails: on any stage failure the input mask is returned as is.
#[must_use]
pub fn suppress_false_positives(mask: &Mask) -> Mask {
    match try_suppress_false_positives(mask) {
        Ok(s) => s.mask,
        Err(e) => {
            tracing::warn!(error = %e, "false-positive suppression failed, keeping input mask");
            mask.clone()
        }
    }
}

/// Remove road-like regions, reporting counts and failures.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyFrame`] if the mask has no pixels.
pub fn try_suppress_false_positives(mask: &Mask) -> Result<Suppression, PipelineError> {
    let dimensions = Dimensions::of(mask);
    ensure_non_empty(dimensions)?;

    let opened = morphology::open(mask, Element::CROSS_3);

    let mut kept = Vec::new();
    let (mut noise, mut road_like) = (0, 0);
    for region in contour::external_regions(&opened) {
        match Verdict::of(&region) {
            Verdict::Keep => kept.push(region),
            Verdict::Noise => noise += 1,
            Verdict::RoadLike => road_like += 1,
        }
    }

    tracing::debug!(kept = kept.len(), noise, road_like, "suppressed false positives");

    Ok(Suppression {
        mask: contour::fill_regions(dimensions, &kept),
        kept: kept.len(),
        noise,
        road_like,
    })
}
