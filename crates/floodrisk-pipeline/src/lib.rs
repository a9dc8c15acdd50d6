//! floodrisk-pipeline: Pure flood-risk image analysis (sans-IO).
//!
//! Turns an RGB frame into a flood-risk assessment through:
//! color planes -> water segmentation -> false-positive suppression ->
//! zone classification -> scoring, and renders the assessment back over
//! the frame as an annotated image.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! images and returns structured data. Decoding, encoding, and the
//! command line live in `floodrisk-bench`.
//!
//! Both entry points are total: [`analyze`] fails closed to
//! [`AnalysisResult::fallback`], and [`annotate`] falls back to an error
//! banner. Failures are reported through `tracing`.

pub mod annotate;
pub mod blur;
pub mod canny;
pub mod color;
pub mod contour;
pub mod diagnostics;
pub mod gradient;
pub mod heatmap;
pub mod morphology;
pub mod score;
pub mod segment;
pub mod suppress;
pub mod text;
pub mod types;
pub mod zones;

use chrono::{DateTime, Utc};

pub use annotate::AnnotateConfig;
pub use diagnostics::{AnalysisDiagnostics, Clock, analyze_with_diagnostics};
pub use types::{
    AnalysisResult, AnalysisSummary, Dimensions, Explainability, Frame, Mask, PipelineError,
    RiskLevel, WaterBodyType, ZoneCoverage, ZoneSet,
};

/// Assess flood risk for one frame.
///
/// # Pipeline steps
///
/// 1. Segment water with three detectors and take their union
/// 2. Remove road-like and noise regions
/// 3. Split the filtered mask into core, buffer, and residual zones
/// 4. Score coverage, risk level, water-body type, and edge confidence
///
/// Never fails: an empty frame, or a failure in any stage, yields
/// [`AnalysisResult::fallback`] or that stage's own fallback output.
#[must_use]
pub fn analyze(frame: &Frame) -> AnalysisResult {
    match try_analyze(frame) {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(error = %e, "analysis failed, returning fail-closed result");
            AnalysisResult::fallback(Dimensions::of(frame))
        }
    }
}

/// Assess flood risk for one frame, reporting failures.
///
/// Stages with their own fallbacks (segmentation, suppression, zones)
/// still degrade silently; only scoring failures surface here.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyFrame`] if the frame has no pixels.
pub fn try_analyze(frame: &Frame) -> Result<AnalysisResult, PipelineError> {
    types::ensure_non_empty(Dimensions::of(frame))?;

    let mask = segment::segment_water(frame);
    let filtered = suppress::suppress_false_positives(&mask);
    let zones = zones::classify_zones(&filtered);
    let scored = score::score(&zones, &filtered)?;

    let result = assemble(scored, zones, filtered);
    tracing::debug!(
        risk = %result.risk_level,
        water_body = %result.water_body_type,
        coverage = result.water_coverage_percent,
        "frame analyzed",
    );
    Ok(result)
}

/// Build the result from a score and the masks it was computed from.
pub(crate) fn assemble(scored: score::Score, zones: ZoneSet, filtered: Mask) -> AnalysisResult {
    AnalysisResult {
        risk_level: scored.risk_level,
        water_coverage_percent: types::round_to(scored.coverage.total * 100.0, 2),
        coverage: scored.coverage,
        water_body_type: scored.water_body_type,
        edge_confidence: scored.edge_confidence,
        zones,
        combined_mask: filtered,
    }
}

/// Render `result` over a copy of `frame`, stamped with the current time.
///
/// Never fails; see [`annotate::annotate_frame`].
#[must_use]
pub fn annotate(frame: &Frame, result: &AnalysisResult) -> Frame {
    annotate_at(frame, result, Utc::now())
}

/// Render `result` over a copy of `frame` with a fixed timestamp.
#[must_use]
pub fn annotate_at(frame: &Frame, result: &AnalysisResult, generated: DateTime<Utc>) -> Frame {
    annotate_with(frame, result, &AnnotateConfig::default(), generated)
}

/// Render `result` over a copy of `frame` with explicit settings.
#[must_use]
pub fn annotate_with(
    frame: &Frame,
    result: &AnalysisResult,
    config: &AnnotateConfig,
    generated: DateTime<Utc>,
) -> Frame {
    annotate::annotate_frame(frame, result, config, generated)
}

/// Analyze and annotate a sequence of frames.
///
/// Lazy: each frame is processed when the iterator is advanced, and
/// results come out in input order.
pub fn process_frames<I>(frames: I) -> impl Iterator<Item = (AnalysisResult, Frame)>
where
    I: IntoIterator<Item = Frame>,
{
    frames.into_iter().map(|frame| {
        let result = analyze(&frame);
        let annotated = annotate(&frame, &result);
        (result, annotated)
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::Rgb;

    const WATER: Rgb<u8> = Rgb([30, 80, 200]);

    #[test]
    fn black_frame_is_minimal() {
        let frame = Frame::new(40, 30);
        let result = analyze(&frame);
        assert_eq!(result.risk_level, RiskLevel::Minimal);
        assert!(result.water_coverage_percent.abs() < f64::EPSILON);
        assert_eq!(result.dimensions(), Dimensions::of(&frame));
    }

    #[test]
    fn all_water_frame_is_extreme() {
        let frame = Frame::from_pixel(60, 40, WATER);
        let result = analyze(&frame);
        assert_eq!(result.risk_level, RiskLevel::Extreme);
        assert!(result.water_coverage_percent > 99.0);
    }

    #[test]
    fn empty_frame_fails_closed() {
        let frame = Frame::new(0, 0);
        assert!(try_analyze(&frame).is_err());
        let result = analyze(&frame);
        assert_eq!(result.risk_level, RiskLevel::Unknown);
        assert_eq!(result.water_body_type, WaterBodyType::Unknown);
        assert_eq!(annotate(&frame, &result).dimensions(), (0, 0));
    }

    #[test]
    fn coverage_percent_is_rounded_total() {
        let frame = Frame::from_fn(50, 50, |x, _| if x < 20 { WATER } else { Rgb([0, 0, 0]) });
        let result = analyze(&frame);
        let expected = types::round_to(result.coverage.total * 100.0, 2);
        assert!((result.water_coverage_percent - expected).abs() < 1e-9);
    }

    #[test]
    fn annotate_keeps_frame_size() {
        let frame = Frame::from_pixel(120, 90, WATER);
        let result = analyze(&frame);
        let generated = DateTime::parse_from_rfc3339("2024-05-17T09:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let out = annotate_at(&frame, &result, generated);
        assert_eq!(out.dimensions(), frame.dimensions());
        assert_eq!(out, annotate_at(&frame, &result, generated));
    }

    #[test]
    fn process_frames_preserves_order() {
        let frames = vec![
            Frame::from_pixel(30, 30, WATER),
            Frame::new(20, 10),
            Frame::from_pixel(16, 16, WATER),
        ];
        let out: Vec<_> = process_frames(frames).collect();
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].0.risk_level, RiskLevel::Extreme);
        assert_eq!(out[1].0.risk_level, RiskLevel::Minimal);
        assert_eq!(out[1].1.dimensions(), (20, 10));
        assert_eq!(out[2].1.dimensions(), (16, 16));
    }
}
