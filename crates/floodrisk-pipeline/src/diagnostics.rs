//! Analysis diagnostics: timing, pixel counts, and other metrics for each
//! stage.
//!
//! These diagnostics are permanent instrumentation intended for threshold
//! tuning. [`analyze_with_diagnostics`] runs the same stages as
//! [`analyze`](crate::analyze) and records what each one did, including
//! whether it fell back to its default output.
//!
//! Timing goes through the [`Clock`] trait so this crate stays free of
//! platform time sources; callers supply the clock.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::color::ColorPlanes;
use crate::score;
use crate::segment::DetectorMasks;
use crate::suppress;
use crate::types::{
    AnalysisResult, Dimensions, Frame, RiskLevel, WaterBodyType, ZoneSet, ensure_non_empty,
};
use crate::zones;

/// Source of monotonic timestamps.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisDiagnostics {
    /// Stage 0: HSV, Lab, and luminance planes.
    pub color_conversion: StageDiagnostics,
    /// Stage 1: the three water detectors and their union.
    pub segmentation: StageDiagnostics,
    /// Stage 2: road false-positive suppression.
    pub suppression: StageDiagnostics,
    /// Stage 3: zone classification.
    pub zones: StageDiagnostics,
    /// Stage 4: coverage, risk, water body, edge confidence.
    pub scoring: StageDiagnostics,
    /// Total wall-clock duration of the analysis (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Outcome of the analysis.
    pub summary: DiagnosticsSummary,
}

/// Diagnostics for a single stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// `true` if the stage failed and produced its fallback output.
    pub fell_back: bool,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Color conversion metrics.
    ColorConversion {
        /// Frame width in pixels.
        width: u32,
        /// Frame height in pixels.
        height: u32,
    },
    /// Segmentation metrics.
    Segmentation {
        /// Pixels flagged by the standard color ranges.
        standard_pixels: u64,
        /// Pixels flagged by the vegetation-aware detector.
        vegetation_pixels: u64,
        /// Pixels flagged by the mixed water-vegetation detector.
        mixed_pixels: u64,
        /// Pixels in the union.
        combined_pixels: u64,
    },
    /// False-positive suppression metrics.
    Suppression {
        /// Regions retained.
        kept_regions: usize,
        /// Regions dropped for being too small.
        noise_regions: usize,
        /// Regions dropped for being road-like.
        road_like_regions: usize,
        /// Mask pixels before suppression.
        pixels_before: u64,
        /// Mask pixels after suppression.
        pixels_after: u64,
    },
    /// Zone classification metrics.
    Zones {
        /// Zone A pixels.
        core_pixels: u64,
        /// Zone B pixels.
        buffer_pixels: u64,
        /// Zone C pixels.
        residual_pixels: u64,
    },
    /// Scoring metrics.
    Scoring {
        /// Zone A ratio.
        core_ratio: f64,
        /// Zone B ratio.
        buffer_ratio: f64,
        /// Zone C ratio.
        residual_ratio: f64,
        /// Union ratio.
        total_ratio: f64,
        /// Edge pixels per mask pixel.
        edge_confidence: f64,
    },
}

/// High-level outcome of the analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsSummary {
    /// Frame width in pixels.
    pub image_width: u32,
    /// Frame height in pixels.
    pub image_height: u32,
    /// Total pixel count.
    pub pixel_count: u64,
    /// Final risk level.
    pub risk_level: RiskLevel,
    /// Final water-body type.
    pub water_body_type: WaterBodyType,
    /// Total water coverage in percent.
    pub water_coverage_percent: f64,
}

impl AnalysisDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Analysis Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{} ({} pixels)",
            self.summary.image_width, self.summary.image_height, self.summary.pixel_count,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        for (name, diag) in self.stages() {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let mut details = format_metrics(&diag.metrics);
            if diag.fell_back {
                details.push_str(" [fallback]");
            }
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Risk: {}  |  Water body: {}  |  Coverage: {:.2}%",
            self.summary.risk_level,
            self.summary.water_body_type,
            self.summary.water_coverage_percent,
        ));

        lines.join("\n")
    }

    /// Stages in execution order, with display names.
    #[must_use]
    pub fn stages(&self) -> [(&'static str, &StageDiagnostics); 5] {
        [
            ("Color Conversion", &self.color_conversion),
            ("Segmentation", &self.segmentation),
            ("Suppression", &self.suppression),
            ("Zones", &self.zones),
            ("Scoring", &self.scoring),
        ]
    }
}

/// Run the analysis, timing and measuring every stage.
///
/// Returns exactly the result [`analyze`](crate::analyze) returns for the
/// same frame.
pub fn analyze_with_diagnostics<C: Clock>(
    frame: &Frame,
    clock: &C,
) -> (AnalysisResult, AnalysisDiagnostics) {
    let dimensions = Dimensions::of(frame);
    let empty = ensure_non_empty(dimensions).is_err();
    let total_start = clock.now();

    // 0. Color planes.
    let start = clock.now();
    let planes = (!empty).then(|| ColorPlanes::from_frame(frame));
    let color_conversion = StageDiagnostics {
        duration: clock.elapsed(&start),
        fell_back: empty,
        metrics: StageMetrics::ColorConversion {
            width: dimensions.width,
            height: dimensions.height,
        },
    };

    // 1. Segmentation.
    let start = clock.now();
    let (combined, segmentation_metrics) = planes.as_ref().map_or_else(
        || {
            tracing::warn!("segmentation skipped for empty frame");
            (
                crate::Mask::new(dimensions.width, dimensions.height),
                StageMetrics::Segmentation {
                    standard_pixels: 0,
                    vegetation_pixels: 0,
                    mixed_pixels: 0,
                    combined_pixels: 0,
                },
            )
        },
        |planes| {
            let detectors = DetectorMasks::detect(planes);
            let combined = detectors.combined();
            let metrics = StageMetrics::Segmentation {
                standard_pixels: score::count_set(&detectors.standard),
                vegetation_pixels: score::count_set(&detectors.vegetation),
                mixed_pixels: score::count_set(&detectors.mixed),
                combined_pixels: score::count_set(&combined),
            };
            (combined, metrics)
        },
    );
    let segmentation = StageDiagnostics {
        duration: clock.elapsed(&start),
        fell_back: empty,
        metrics: segmentation_metrics,
    };

    // 2. Suppression.
    let start = clock.now();
    let pixels_before = score::count_set(&combined);
    let (filtered, suppression_fell_back, kept, noise, road_like) =
        match suppress::try_suppress_false_positives(&combined) {
            Ok(s) => (s.mask, false, s.kept, s.noise, s.road_like),
            Err(e) => {
                tracing::warn!(error = %e, "false-positive suppression failed, keeping input mask");
                (combined.clone(), true, 0, 0, 0)
            }
        };
    let suppression = StageDiagnostics {
        duration: clock.elapsed(&start),
        fell_back: suppression_fell_back,
        metrics: StageMetrics::Suppression {
            kept_regions: kept,
            noise_regions: noise,
            road_like_regions: road_like,
            pixels_before,
            pixels_after: score::count_set(&filtered),
        },
    };

    // 3. Zones.
    let start = clock.now();
    let (zone_set, zones_fell_back) = match zones::try_classify_zones(&filtered) {
        Ok(z) => (z, false),
        Err(e) => {
            tracing::warn!(error = %e, "zone classification failed, using mask as core");
            (
                ZoneSet {
                    core: filtered.clone(),
                    ..ZoneSet::empty(dimensions)
                },
                true,
            )
        }
    };
    let zones_diag = StageDiagnostics {
        duration: clock.elapsed(&start),
        fell_back: zones_fell_back,
        metrics: StageMetrics::Zones {
            core_pixels: score::count_set(&zone_set.core),
            buffer_pixels: score::count_set(&zone_set.buffer),
            residual_pixels: score::count_set(&zone_set.residual),
        },
    };

    // 4. Scoring.
    let start = clock.now();
    let scored = score::score(&zone_set, &filtered);
    let scoring_duration = clock.elapsed(&start);
    let (result, scoring) = match scored {
        Ok(s) => {
            let metrics = StageMetrics::Scoring {
                core_ratio: s.coverage.core,
                buffer_ratio: s.coverage.buffer,
                residual_ratio: s.coverage.residual,
                total_ratio: s.coverage.total,
                edge_confidence: s.edge_confidence,
            };
            (
                crate::assemble(s, zone_set, filtered),
                StageDiagnostics {
                    duration: scoring_duration,
                    fell_back: false,
                    metrics,
                },
            )
        }
        Err(e) => {
            tracing::warn!(error = %e, "scoring failed, returning fail-closed result");
            (
                AnalysisResult::fallback(dimensions),
                StageDiagnostics {
                    duration: scoring_duration,
                    fell_back: true,
                    metrics: StageMetrics::Scoring {
                        core_ratio: 0.0,
                        buffer_ratio: 0.0,
                        residual_ratio: 0.0,
                        total_ratio: 0.0,
                        edge_confidence: 0.0,
                    },
                },
            )
        }
    };

    let diagnostics = AnalysisDiagnostics {
        color_conversion,
        segmentation,
        suppression,
        zones: zones_diag,
        scoring,
        total_duration: clock.elapsed(&total_start),
        summary: DiagnosticsSummary {
            image_width: dimensions.width,
            image_height: dimensions.height,
            pixel_count: dimensions.pixel_count(),
            risk_level: result.risk_level,
            water_body_type: result.water_body_type,
            water_coverage_percent: result.water_coverage_percent,
        },
    };
    (result, diagnostics)
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::ColorConversion { width, height } => format!("{width}x{height}"),
        StageMetrics::Segmentation {
            standard_pixels,
            vegetation_pixels,
            mixed_pixels,
            combined_pixels,
        } => format!(
            "standard={standard_pixels} vegetation={vegetation_pixels} mixed={mixed_pixels} -> {combined_pixels} px",
        ),
        StageMetrics::Suppression {
            kept_regions,
            noise_regions,
            road_like_regions,
            pixels_before,
            pixels_after,
        } => format!(
            "kept={kept_regions} noise={noise_regions} road={road_like_regions} {pixels_before}->{pixels_after} px",
        ),
        StageMetrics::Zones {
            core_pixels,
            buffer_pixels,
            residual_pixels,
        } => format!("A={core_pixels} B={buffer_pixels} C={residual_pixels} px"),
        StageMetrics::Scoring {
            core_ratio,
            buffer_ratio,
            residual_ratio,
            total_ratio,
            edge_confidence,
        } => format!(
            "A={:.2}% B={:.2}% C={:.2}% total={:.2}% edge={edge_confidence:.3}",
            core_ratio * 100.0,
            buffer_ratio * 100.0,
            residual_ratio * 100.0,
            total_ratio * 100.0,
        ),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::Rgb;
    use std::cell::Cell;

    /// Clock that advances one millisecond per reading.
    struct TickClock {
        ticks: Cell<u64>,
    }

    impl Clock for TickClock {
        type Instant = u64;

        fn now(&self) -> u64 {
            let t = self.ticks.get();
            self.ticks.set(t + 1);
            t
        }

        fn elapsed(&self, since: &u64) -> Duration {
            Duration::from_millis(self.now() - since)
        }
    }

    fn tick_clock() -> TickClock {
        TickClock { ticks: Cell::new(0) }
    }

    #[test]
    fn suppression_details_show_drop_counts() {
        let details = format_metrics(&StageMetrics::Suppression {
            kept_regions: 2,
            noise_regions: 5,
            road_like_regions: 1,
            pixels_before: 900,
            pixels_after: 640,
        });
        assert_eq!(details, "kept=2 noise=5 road=1 900->640 px");
    }

    #[test]
    fn matches_plain_analysis() {
        let frame = Frame::from_fn(64, 48, |x, _| {
            if x < 32 {
                Rgb([30, 80, 200])
            } else {
                Rgb([240, 240, 240])
            }
        });
        let (result, diagnostics) = analyze_with_diagnostics(&frame, &tick_clock());
        assert_eq!(result, crate::analyze(&frame));
        assert_eq!(diagnostics.summary.risk_level, result.risk_level);
        assert!(diagnostics.stages().iter().all(|(_, s)| !s.fell_back));
        assert!(diagnostics.total_duration >= diagnostics.scoring.duration);
    }

    #[test]
    fn empty_frame_records_fallbacks() {
        let frame = Frame::new(0, 0);
        let (result, diagnostics) = analyze_with_diagnostics(&frame, &tick_clock());
        assert_eq!(result.risk_level, RiskLevel::Unknown);
        assert!(diagnostics.color_conversion.fell_back);
        assert!(diagnostics.scoring.fell_back);
    }

    #[test]
    fn report_lists_every_stage() {
        let frame = Frame::from_pixel(32, 32, Rgb([30, 80, 200]));
        let (_, diagnostics) = analyze_with_diagnostics(&frame, &tick_clock());
        let report = diagnostics.report();
        assert!(report.contains("Analysis Diagnostics Report"));
        for (name, _) in diagnostics.stages() {
            assert!(report.contains(name), "missing {name}");
        }
        assert!(report.contains("Risk: Extreme"));
    }

    #[test]
    fn serializes_durations_as_seconds() {
        let frame = Frame::from_pixel(8, 8, Rgb([0, 0, 0]));
        let (_, diagnostics) = analyze_with_diagnostics(&frame, &tick_clock());
        let value = serde_json::to_value(&diagnostics).unwrap();
        assert!(value["total_duration"].as_f64().unwrap() > 0.0);
        assert_eq!(value["summary"]["risk_level"], "Minimal");

        let back: AnalysisDiagnostics = serde_json::from_value(value).unwrap();
        assert_eq!(back.total_duration, diagnostics.total_duration);
    }
}
