//! Visualization: burn the analysis into a copy of the frame.
//!
//! Layers, bottom to top:
//!
//! 1. Zone heat overlay blended over the frame.
//! 2. Up to three risk labels anchored on the largest core regions.
//! 3. Header bar with risk level, water-body type and coverage.
//! 4. Legend box with the zone color key, and the generation timestamp.
//!
//! Rendering never fails outward: on error the caller gets the frame
//! with an "Analysis Error" banner.

use chrono::{DateTime, Utc};
use image::Rgb;
use imageproc::drawing::{draw_filled_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};

use crate::contour;
use crate::heatmap;
use crate::text::{self, draw_text_mut};
use crate::types::{
    AnalysisResult, Dimensions, Frame, PipelineError, RiskLevel, WaterBodyType, ensure_same_size,
};

const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const RED: Rgb<u8> = Rgb([255, 0, 0]);
const TIMESTAMP_GRAY: Rgb<u8> = Rgb([200, 200, 200]);

/// Height of the header bar.
pub const HEADER_HEIGHT: u32 = 50;

/// Minimum core-region area that earns a label.
pub const MIN_LABEL_AREA: f64 = 200.0;

/// Minimum number of (compressed) boundary points that earns a label.
pub const MIN_LABEL_POINTS: usize = 10;

/// Legend zone swatches.
pub const LEGEND_ITEMS: [(&str, Rgb<u8>); 3] = [
    ("Core Water", Rgb([200, 0, 0])),
    ("Risk Buffer", Rgb([255, 165, 0])),
    ("Low Risk", Rgb([0, 255, 255])),
];

const LEGEND_WIDTH: i32 = 200;
const LEGEND_HEIGHT: i32 = 120;
const LEGEND_MARGIN: i32 = 20;
/// Fraction of brightness kept under the legend box.
const LEGEND_SHADE: f32 = 0.7;

/// Rendering options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotateConfig {
    /// Weight of the zone overlay when blended over the frame, in `[0, 1]`.
    pub blend: f32,
    /// Maximum number of risk labels.
    pub max_labels: usize,
    /// Draw the legend box and timestamp.
    pub legend: bool,
}

impl AnnotateConfig {
    /// Default overlay weight.
    pub const DEFAULT_BLEND: f32 = 0.4;
    /// Default label limit.
    pub const DEFAULT_MAX_LABELS: usize = 3;
}

impl Default for AnnotateConfig {
    fn default() -> Self {
        Self {
            blend: Self::DEFAULT_BLEND,
            max_labels: Self::DEFAULT_MAX_LABELS,
            legend: true,
        }
    }
}

/// Render the analysis over a copy of `frame`.
///
/// Never fails: a result computed for a frame of a different size, or any
/// other rendering failure, yields [`error_overlay`].
#[must_use]
pub fn annotate_frame(
    frame: &Frame,
    result: &AnalysisResult,
    config: &AnnotateConfig,
    generated: DateTime<Utc>,
) -> Frame {
    match try_annotate_frame(frame, result, config, generated) {
        Ok(out) => out,
        Err(e) => {
            tracing::warn!(error = %e, "annotation failed, drawing error banner");
            error_overlay(frame)
        }
    }
}

/// Render the analysis over a copy of `frame`, reporting failures.
///
/// # Errors
///
/// Returns [`PipelineError::DimensionMismatch`] if `result` was computed
/// for a frame of a different size.
pub fn try_annotate_frame(
    frame: &Frame,
    result: &AnalysisResult,
    config: &AnnotateConfig,
    generated: DateTime<Utc>,
) -> Result<Frame, PipelineError> {
    let dimensions = Dimensions::of(frame);
    ensure_same_size(dimensions, result.dimensions())?;
    ensure_same_size(dimensions, result.zones.dimensions())?;
    if dimensions.is_empty() {
        return Ok(frame.clone());
    }

    let overlay = heatmap::zone_overlay(&result.zones);
    let mut out = blend(frame, &overlay, config.blend);
    draw_labels(&mut out, result, config.max_labels);
    draw_header(&mut out, result);
    if config.legend {
        draw_legend(&mut out, generated);
    }
    Ok(out)
}

/// The fallback rendering: the frame with a red error banner.
#[must_use]
pub fn error_overlay(frame: &Frame) -> Frame {
    let mut out = frame.clone();
    draw_text_mut(&mut out, "Analysis Error - See Logs", 20, 34, 2, RED);
    out
}

/// `frame * (1 - weight) + overlay * weight`, rounded per channel.
#[must_use]
pub fn blend(frame: &Frame, overlay: &Frame, weight: f32) -> Frame {
    let weight = weight.clamp(0.0, 1.0);
    let mut out = frame.clone();
    for (dst, src) in out.pixels_mut().zip(overlay.pixels()) {
        for (d, s) in dst.0.iter_mut().zip(src.0) {
            *d = to_channel(f32::from(*d).mul_add(1.0 - weight, f32::from(s) * weight));
        }
    }
    out
}

/// Label caption for a water body at a given risk.
#[must_use]
pub fn label_text(kind: WaterBodyType, risk: RiskLevel) -> String {
    let prefix = match kind {
        WaterBodyType::River => "River Flood Risk",
        WaterBodyType::Lake => "Lake Overflow",
        WaterBodyType::Ocean => "Storm Surge Risk",
        WaterBodyType::Unknown => "Flood Risk",
    };
    format!("{prefix}: {risk}")
}

/// Header caption, e.g. `FLOOD RISK: Severe | RIVER | Coverage: 12.5%`.
#[must_use]
pub fn header_text(result: &AnalysisResult) -> String {
    format!(
        "FLOOD RISK: {} | {} | Coverage: {:?}%",
        result.risk_level,
        result.water_body_type.as_str().to_uppercase(),
        result.water_coverage_percent,
    )
}

/// Caption under the legend.
#[must_use]
pub fn timestamp_text(generated: DateTime<Utc>) -> String {
    format!("Generated: {}", generated.format("%Y-%m-%d %H:%M UTC"))
}

fn draw_labels(out: &mut Frame, result: &AnalysisResult, max_labels: usize) {
    let caption = label_text(result.water_body_type, result.risk_level);
    let width = text::text_width(&caption, 1);
    let height = text::text_height(1);
    let text_h = to_i32(height);

    for region in contour::regions_by_area(&result.zones.core)
        .iter()
        .take(max_labels)
    {
        if region.area() < MIN_LABEL_AREA {
            continue;
        }
        let points = region.compressed();
        if points.len() < MIN_LABEL_POINTS {
            continue;
        }
        let anchor = points.points()[points.len() / 3];
        let (tx, ty) = (anchor.x + 30, anchor.y - 15);

        draw_filled_rect_mut(
            out,
            Rect::at(tx - 5, ty - text_h - 5).of_size(width + 10, height + 10),
            BLACK,
        );
        draw_text_mut(out, &caption, tx, ty - text_h, 1, WHITE);
        draw_line_segment_mut(
            out,
            (to_f32(anchor.x), to_f32(anchor.y)),
            (to_f32(tx), to_f32(ty)),
            WHITE,
        );
    }
}

fn draw_header(out: &mut Frame, result: &AnalysisResult) {
    draw_filled_rect_mut(
        out,
        Rect::at(0, 0).of_size(out.width(), HEADER_HEIGHT + 1),
        BLACK,
    );
    draw_text_mut(
        out,
        &header_text(result),
        20,
        14,
        2,
        result.risk_level.color(),
    );
}

fn draw_legend(out: &mut Frame, generated: DateTime<Utc>) {
    let (w, h) = (to_i32(out.width()), to_i32(out.height()));
    let left = w - LEGEND_WIDTH - LEGEND_MARGIN;
    let top = h - LEGEND_HEIGHT - LEGEND_MARGIN;

    shade(out, left, top, left + LEGEND_WIDTH, top + LEGEND_HEIGHT);

    draw_text_mut(out, "FLOOD ANALYSIS", left + 10, top + 12, 1, WHITE);
    for ((label, color), y_offset) in LEGEND_ITEMS.into_iter().zip((40..).step_by(20)) {
        draw_filled_rect_mut(
            out,
            Rect::at(left + 10, top + y_offset).of_size(16, 11),
            color,
        );
        draw_text_mut(out, label, left + 35, top + y_offset, 1, WHITE);
    }

    draw_text_mut(out, &timestamp_text(generated), 20, h - 18, 1, TIMESTAMP_GRAY);
}

/// Darken the inclusive box `[x0, x1] x [y0, y1]`, clipped to the image.
fn shade(out: &mut Frame, x0: i32, y0: i32, x1: i32, y1: i32) {
    let (w, h) = (to_i32(out.width()), to_i32(out.height()));
    for y in y0.max(0)..=y1.min(h - 1) {
        for x in x0.max(0)..=x1.min(w - 1) {
            if let (Ok(px), Ok(py)) = (u32::try_from(x), u32::try_from(y)) {
                let pixel = out.get_pixel_mut(px, py);
                for c in &mut pixel.0 {
                    *c = to_channel(f32::from(*c) * LEGEND_SHADE);
                }
            }
        }
    }
}

fn to_i32(v: u32) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

#[allow(clippy::cast_precision_loss)]
fn to_f32(v: i32) -> f32 {
    v as f32
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_channel(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}
