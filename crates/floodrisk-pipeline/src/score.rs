//! Risk and metadata scoring.
//!
//! Turns zone masks into coverage ratios and a discrete [`RiskLevel`],
//! classifies the dominant water region by shape, and measures how much
//! of the mask lies on a detected boundary.

use crate::canny;
use crate::contour::{self, Region};
use crate::types::{
    Dimensions, Mask, PipelineError, RiskLevel, WaterBodyType, ZoneCoverage, ZoneSet,
    ensure_non_empty, ensure_same_size,
};

/// Core ratio above which risk is [`RiskLevel::Extreme`].
pub const EXTREME_CORE_RATIO: f64 = 0.15;
/// Core ratio above which risk is [`RiskLevel::Severe`].
pub const SEVERE_CORE_RATIO: f64 = 0.08;
/// Core plus buffer ratio above which risk is [`RiskLevel::Elevated`].
pub const ELEVATED_CORE_BUFFER_RATIO: f64 = 0.20;
/// Total ratio above which risk is [`RiskLevel::Guarded`].
pub const GUARDED_TOTAL_RATIO: f64 = 0.15;
/// Total ratio above which risk is [`RiskLevel::Low`].
pub const LOW_TOTAL_RATIO: f64 = 0.05;

/// Boundary points this close to the frame border touch the edge.
pub const EDGE_MARGIN: i32 = 5;

/// Canny hysteresis thresholds for edge confidence.
pub const CANNY_LOW: f32 = 50.0;
/// See [`CANNY_LOW`].
pub const CANNY_HIGH: f32 = 150.0;

/// Scalar outcome of the scoring stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    /// Per-zone coverage ratios.
    pub coverage: ZoneCoverage,
    /// Risk from the ordered threshold rules.
    pub risk_level: RiskLevel,
    /// Shape class of the largest region.
    pub water_body_type: WaterBodyType,
    /// Boundary pixels per mask pixel.
    pub edge_confidence: f64,
}

/// Score zones and the filtered mask they came from.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyFrame`] for zero-sized input and
/// [`PipelineError::DimensionMismatch`] if the zones and mask differ in
/// size.
pub fn score(zones: &ZoneSet, mask: &Mask) -> Result<Score, PipelineError> {
    let dimensions = Dimensions::of(mask);
    ensure_non_empty(dimensions)?;
    ensure_same_size(dimensions, zones.dimensions())?;

    let coverage = zone_coverage(zones);
    Ok(Score {
        coverage,
        risk_level: risk_level(&coverage),
        water_body_type: classify_water_body(mask),
        edge_confidence: edge_confidence(mask),
    })
}

/// Fraction of pixels in each zone, plus the fraction in any zone.
#[must_use]
pub fn zone_coverage(zones: &ZoneSet) -> ZoneCoverage {
    let total_pixels = zones.dimensions().pixel_count();
    if total_pixels == 0 {
        return ZoneCoverage::default();
    }

    let (mut core, mut buffer, mut residual, mut any) = (0u64, 0u64, 0u64, 0u64);
    for ((a, b), c) in zones
        .core
        .pixels()
        .zip(zones.buffer.pixels())
        .zip(zones.residual.pixels())
    {
        let (a, b, c) = (a.0[0] > 0, b.0[0] > 0, c.0[0] > 0);
        core += u64::from(a);
        buffer += u64::from(b);
        residual += u64::from(c);
        any += u64::from(a || b || c);
    }

    #[allow(clippy::cast_precision_loss)]
    let ratio = |count: u64| count as f64 / total_pixels as f64;
    ZoneCoverage {
        core: ratio(core),
        buffer: ratio(buffer),
        residual: ratio(residual),
        total: ratio(any),
    }
}

/// Ordered threshold rules; the first strict `>` match wins.
#[must_use]
pub fn risk_level(coverage: &ZoneCoverage) -> RiskLevel {
    if coverage.core > EXTREME_CORE_RATIO {
        RiskLevel::Extreme
    } else if coverage.core > SEVERE_CORE_RATIO {
        RiskLevel::Severe
    } else if coverage.core + coverage.buffer > ELEVATED_CORE_BUFFER_RATIO {
        RiskLevel::Elevated
    } else if coverage.total > GUARDED_TOTAL_RATIO {
        RiskLevel::Guarded
    } else if coverage.total > LOW_TOTAL_RATIO {
        RiskLevel::Low
    } else {
        RiskLevel::Minimal
    }
}

/// Classify the largest water region by shape.
///
/// Never fails: a mask with no usable region is
/// [`WaterBodyType::Unknown`].
#[must_use]
pub fn classify_water_body(mask: &Mask) -> WaterBodyType {
    match try_classify_water_body(mask) {
        Ok(kind) => kind,
        Err(e) => {
            tracing::debug!(error = %e, "water body left unclassified");
            WaterBodyType::Unknown
        }
    }
}

/// Classify the largest water region by shape, reporting why none was
/// found.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyFrame`] for a zero-sized mask and
/// [`PipelineError::DegenerateGeometry`] when there is no region or the
/// largest one has no perimeter.
pub fn try_classify_water_body(mask: &Mask) -> Result<WaterBodyType, PipelineError> {
    let dimensions = Dimensions::of(mask);
    ensure_non_empty(dimensions)?;

    let region = contour::largest_region(mask)
        .ok_or(PipelineError::DegenerateGeometry("no water regions"))?;
    classify_region(&region, dimensions)
}

fn classify_region(region: &Region, dimensions: Dimensions) -> Result<WaterBodyType, PipelineError> {
    let area = region.area();
    let circularity = region
        .circularity()
        .ok_or(PipelineError::DegenerateGeometry("region has no perimeter"))?;
    let edge_touch = region.compressed().edge_touch_ratio(dimensions, EDGE_MARGIN);
    let Some(aspect) = region.aspect_ratio() else {
        return Ok(WaterBodyType::River);
    };

    #[allow(clippy::cast_precision_loss)]
    let frame_area = dimensions.pixel_count() as f64;

    let kind = if area > frame_area * 0.4 && edge_touch > 0.1 {
        WaterBodyType::Ocean
    } else if aspect > 4.0 || edge_touch < 0.05 {
        if aspect > 8.0 {
            WaterBodyType::River
        } else if circularity > 0.5 {
            WaterBodyType::Lake
        } else {
            WaterBodyType::River
        }
    } else if circularity > 0.6 && area < frame_area * 0.2 {
        WaterBodyType::Lake
    } else {
        WaterBodyType::River
    };
    Ok(kind)
}

/// Canny edge pixels per mask pixel, clamped to at most 1.
#[must_use]
pub fn edge_confidence(mask: &Mask) -> f64 {
    let mask_pixels = count_set(mask);
    let edge_pixels = count_set(&canny::canny(mask, CANNY_LOW, CANNY_HIGH));
    #[allow(clippy::cast_precision_loss)]
    let ratio = edge_pixels as f64 / mask_pixels.max(1) as f64;
    ratio.min(1.0)
}

/// Number of non-zero pixels.
#[must_use]
pub fn count_set(mask: &Mask) -> u64 {
    mask.pixels().map(|p| u64::from(p.0[0] > 0)).sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::MASK_ON;
    use image::Luma;

    fn coverage(core: f64, buffer: f64, total: f64) -> ZoneCoverage {
        ZoneCoverage {
            core,
            buffer,
            residual: 0.0,
            total,
        }
    }

    fn mask_from(w: u32, h: u32, inside: impl Fn(u32, u32) -> bool) -> Mask {
        Mask::from_fn(w, h, |x, y| {
            if inside(x, y) {
                Luma([MASK_ON])
            } else {
                Luma([0])
            }
        })
    }

    #[test]
    fn risk_rules_in_order() {
        assert_eq!(risk_level(&coverage(0.16, 0.0, 0.16)), RiskLevel::Extreme);
        assert_eq!(risk_level(&coverage(0.09, 0.0, 0.09)), RiskLevel::Severe);
        assert_eq!(risk_level(&coverage(0.05, 0.16, 0.21)), RiskLevel::Elevated);
        assert_eq!(risk_level(&coverage(0.0, 0.1, 0.16)), RiskLevel::Guarded);
        assert_eq!(risk_level(&coverage(0.0, 0.0, 0.06)), RiskLevel::Low);
        assert_eq!(risk_level(&coverage(0.0, 0.0, 0.05)), RiskLevel::Minimal);
        assert_eq!(risk_level(&ZoneCoverage::default()), RiskLevel::Minimal);
    }

    #[test]
    fn risk_thresholds_are_strict() {
        assert_eq!(risk_level(&coverage(0.15, 0.0, 0.15)), RiskLevel::Severe);
        assert_eq!(risk_level(&coverage(0.08, 0.0, 0.08)), RiskLevel::Low);
    }

    #[test]
    fn coverage_counts_each_zone_and_union() {
        let dims = Dimensions {
            width: 10,
            height: 10,
        };
        let mut zones = ZoneSet::empty(dims);
        for x in 0..10 {
            zones.core.put_pixel(x, 0, Luma([MASK_ON]));
            zones.buffer.put_pixel(x, 1, Luma([MASK_ON]));
            zones.residual.put_pixel(x, 1, Luma([MASK_ON]));
            zones.residual.put_pixel(x, 2, Luma([MASK_ON]));
        }
        let c = zone_coverage(&zones);
        assert!((c.core - 0.1).abs() < 1e-12);
        assert!((c.buffer - 0.1).abs() < 1e-12);
        assert!((c.residual - 0.2).abs() < 1e-12);
        // Row 1 sits in both B and C and is counted once.
        assert!((c.total - 0.3).abs() < 1e-12);
    }

    #[test]
    fn empty_zones_have_zero_coverage() {
        let zones = ZoneSet::empty(Dimensions {
            width: 0,
            height: 0,
        });
        assert_eq!(zone_coverage(&zones), ZoneCoverage::default());
    }

    #[test]
    fn thin_elongated_blob_is_river() {
        let mask = mask_from(200, 200, |x, y| (40..160).contains(&x) && (95..105).contains(&y));
        assert_eq!(classify_water_body(&mask), WaterBodyType::River);
    }

    #[test]
    fn centered_disc_is_lake() {
        let mask = mask_from(200, 200, |x, y| {
            let dx = f64::from(x) - 100.0;
            let dy = f64::from(y) - 100.0;
            dx.hypot(dy) <= 30.0
        });
        assert_eq!(classify_water_body(&mask), WaterBodyType::Lake);
    }

    #[test]
    fn large_edge_touching_blob_is_ocean() {
        let mask = mask_from(200, 200, |_, y| y >= 80);
        assert_eq!(classify_water_body(&mask), WaterBodyType::Ocean);
    }

    #[test]
    fn empty_mask_is_unknown() {
        assert_eq!(classify_water_body(&Mask::new(50, 50)), WaterBodyType::Unknown);
        assert_eq!(classify_water_body(&Mask::new(0, 0)), WaterBodyType::Unknown);
        assert_eq!(
            try_classify_water_body(&Mask::new(50, 50)),
            Err(PipelineError::DegenerateGeometry("no water regions"))
        );
    }

    #[test]
    fn single_pixel_region_is_unknown() {
        let mut mask = Mask::new(20, 20);
        mask.put_pixel(10, 10, Luma([MASK_ON]));
        assert_eq!(classify_water_body(&mask), WaterBodyType::Unknown);
    }

    #[test]
    fn edge_confidence_is_bounded() {
        let empty = Mask::new(30, 30);
        assert!(edge_confidence(&empty).abs() < f64::EPSILON);

        let full = Mask::from_pixel(30, 30, Luma([MASK_ON]));
        assert!(edge_confidence(&full).abs() < f64::EPSILON);

        let square = mask_from(40, 40, |x, y| (10..30).contains(&x) && (10..30).contains(&y));
        let c = edge_confidence(&square);
        assert!(c > 0.0 && c <= 1.0, "got {c}");
    }

    #[test]
    fn score_rejects_mismatched_zones() {
        let mask = Mask::new(4, 4);
        let zones = ZoneSet::empty(Dimensions {
            width: 3,
            height: 4,
        });
        assert!(matches!(
            score(&zones, &mask),
            Err(PipelineError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn score_of_full_mask() {
        let mask = Mask::from_pixel(20, 20, Luma([MASK_ON]));
        let zones = ZoneSet {
            core: mask.clone(),
            ..ZoneSet::empty(Dimensions::of(&mask))
        };
        let s = score(&zones, &mask).unwrap();
        assert_eq!(s.risk_level, RiskLevel::Extreme);
        assert!((s.coverage.total - 1.0).abs() < f64::EPSILON);
    }
}
