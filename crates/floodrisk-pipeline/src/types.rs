//! Shared types for the floodrisk analysis pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can reference masks
/// without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbImage` so downstream crates can build frames without
/// depending on `image` directly.
pub use image::RgbImage;

/// One decoded color image (or one video sample), channel order R, G, B.
pub type Frame = RgbImage;

/// Binary per-pixel indicator: every sample is either 0 or 255.
pub type Mask = GrayImage;

/// Value of a set pixel in a [`Mask`].
pub const MASK_ON: u8 = 255;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Dimensions of any `image` buffer.
    #[must_use]
    pub fn of<I: image::GenericImageView>(image: &I) -> Self {
        let (width, height) = image.dimensions();
        Self { width, height }
    }

    /// Total number of pixels (`width * height`).
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Returns `true` if either axis is zero.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// The three risk zones derived from one filtered water mask.
///
/// `core` is always a subset of the filtered mask. `buffer` and
/// `residual` are each computed by subtracting `core` from a different
/// source and may overlap one another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneSet {
    /// Zone A: morphologically consolidated water core.
    pub core: Mask,
    /// Zone B: dilation ring around the core, core removed.
    pub buffer: Mask,
    /// Zone C: filtered mask with the core removed.
    pub residual: Mask,
}

impl ZoneSet {
    /// Three all-zero zones of the given size.
    #[must_use]
    pub fn empty(dimensions: Dimensions) -> Self {
        Self {
            core: Mask::new(dimensions.width, dimensions.height),
            buffer: Mask::new(dimensions.width, dimensions.height),
            residual: Mask::new(dimensions.width, dimensions.height),
        }
    }

    /// Dimensions shared by all three zones.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::of(&self.core)
    }
}

/// Fraction of frame pixels covered by each zone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneCoverage {
    /// Zone A ratio in `[0, 1]`.
    pub core: f64,
    /// Zone B ratio in `[0, 1]`.
    pub buffer: f64,
    /// Zone C ratio in `[0, 1]`.
    pub residual: f64,
    /// Ratio of pixels belonging to any zone, in `[0, 1]`.
    pub total: f64,
}

/// Discrete flood risk level, ordered from least to most severe.
///
/// [`Unknown`](Self::Unknown) is reserved for the fail-closed result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Minimal,
    Low,
    Guarded,
    Elevated,
    Severe,
    Extreme,
    Unknown,
}

impl RiskLevel {
    /// Human-readable name, as serialized.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Minimal => "Minimal",
            Self::Low => "Low",
            Self::Guarded => "Guarded",
            Self::Elevated => "Elevated",
            Self::Severe => "Severe",
            Self::Extreme => "Extreme",
            Self::Unknown => "Unknown",
        }
    }

    /// Header text color for this level.
    #[must_use]
    pub const fn color(self) -> image::Rgb<u8> {
        let rgb = match self {
            Self::Minimal => [0, 255, 0],
            Self::Low => [100, 200, 0],
            Self::Guarded => [255, 255, 0],
            Self::Elevated => [255, 165, 0],
            Self::Severe => [255, 100, 0],
            Self::Extreme => [255, 0, 0],
            Self::Unknown => [255, 255, 255],
        };
        image::Rgb(rgb)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse shape classification of the dominant water region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaterBodyType {
    River,
    Lake,
    Ocean,
    Unknown,
}

impl WaterBodyType {
    /// Lowercase name, as serialized.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::River => "river",
            Self::Lake => "lake",
            Self::Ocean => "ocean",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for WaterBodyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full per-frame analysis record.
///
/// Created once by [`crate::analyze`] and immutable thereafter. The
/// masks are internal: only [`AnalysisResult::summary`] is meant to
/// leave the process.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    /// Discrete risk level.
    pub risk_level: RiskLevel,
    /// Total water coverage in percent, rounded to two decimals.
    pub water_coverage_percent: f64,
    /// Per-zone coverage ratios.
    pub coverage: ZoneCoverage,
    /// Shape class of the largest water region.
    pub water_body_type: WaterBodyType,
    /// Canny edge pixels per mask pixel, clamped to `[0, 1]`.
    pub edge_confidence: f64,
    /// Risk zones.
    pub zones: ZoneSet,
    /// Segmentation mask after false-positive suppression.
    pub combined_mask: Mask,
}

impl AnalysisResult {
    /// The fail-closed result: zero coverage, unknown risk, empty masks.
    #[must_use]
    pub fn fallback(dimensions: Dimensions) -> Self {
        Self {
            risk_level: RiskLevel::Unknown,
            water_coverage_percent: 0.0,
            coverage: ZoneCoverage::default(),
            water_body_type: WaterBodyType::Unknown,
            edge_confidence: 0.0,
            zones: ZoneSet::empty(dimensions),
            combined_mask: Mask::new(dimensions.width, dimensions.height),
        }
    }

    /// Dimensions of the frame this result was computed from.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::of(&self.combined_mask)
    }

    /// The outward-facing summary that the web layer serializes.
    #[must_use]
    pub fn summary(&self) -> AnalysisSummary {
        let details = if self.risk_level == RiskLevel::Unknown {
            Explainability::unknown()
        } else {
            Explainability::from_result(self)
        };
        AnalysisSummary {
            risk: self.risk_level,
            water_coverage: self.water_coverage_percent,
            details,
        }
    }
}

/// Stable summary contract: risk, coverage, and explainability labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    /// Risk level.
    pub risk: RiskLevel,
    /// Total water coverage in percent.
    pub water_coverage: f64,
    /// Human-readable explanation of how the level was reached.
    pub details: Explainability,
}

/// Human-readable explainability labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explainability {
    #[serde(rename = "Water presence")]
    pub water_presence: String,
    #[serde(rename = "Core water bodies")]
    pub core_water_bodies: String,
    #[serde(rename = "Buffer zones")]
    pub buffer_zones: String,
    #[serde(rename = "Moisture areas")]
    pub moisture_areas: String,
    #[serde(rename = "River/Ocean detected")]
    pub river_or_ocean_detected: bool,
    #[serde(rename = "Surface saturation")]
    pub surface_saturation: String,
    #[serde(rename = "Historical zone")]
    pub historical_zone: String,
    pub water_body_type: WaterBodyType,
    pub edge_confidence: f64,
    pub false_positive_suppressed: bool,
}

impl Explainability {
    fn from_result(result: &AnalysisResult) -> Self {
        let coverage = result.coverage;
        Self {
            water_presence: percent_label(coverage.total),
            core_water_bodies: percent_label(coverage.core),
            buffer_zones: percent_label(coverage.buffer),
            moisture_areas: percent_label(coverage.residual),
            river_or_ocean_detected: coverage.total > 0.15,
            surface_saturation: if coverage.total > 0.3 { "High" } else { "Moderate" }.to_owned(),
            historical_zone: if coverage.total > 0.2 { "Likely" } else { "Unlikely" }.to_owned(),
            water_body_type: result.water_body_type,
            edge_confidence: round_to(result.edge_confidence, 3),
            false_positive_suppressed: true,
        }
    }

    fn unknown() -> Self {
        Self {
            water_presence: "0%".to_owned(),
            core_water_bodies: "0%".to_owned(),
            buffer_zones: "0%".to_owned(),
            moisture_areas: "0%".to_owned(),
            river_or_ocean_detected: false,
            surface_saturation: "Unknown".to_owned(),
            historical_zone: "Unknown".to_owned(),
            water_body_type: WaterBodyType::Unknown,
            edge_confidence: 0.0,
            false_positive_suppressed: true,
        }
    }
}

/// Round `value` to `decimals` places.
#[must_use]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// Format a ratio as a percentage with at most two decimals, e.g. `12.5%`.
fn percent_label(ratio: f64) -> String {
    format!("{:?}%", round_to(ratio * 100.0, 2))
}

/// Failures inside a pipeline stage.
///
/// These never escape [`crate::analyze`] or [`crate::annotate`]: each
/// stage converts them into its documented fallback value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    /// The frame has zero width or height.
    #[error("frame has no pixels")]
    EmptyFrame,

    /// Two buffers that must share a size do not.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Size the stage required.
        expected: Dimensions,
        /// Size the stage received.
        actual: Dimensions,
    },

    /// A contour or region had no usable geometry.
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(&'static str),
}

/// Fail with [`PipelineError::EmptyFrame`] on zero-sized input.
pub(crate) const fn ensure_non_empty(dimensions: Dimensions) -> Result<(), PipelineError> {
    if dimensions.is_empty() {
        Err(PipelineError::EmptyFrame)
    } else {
        Ok(())
    }
}

/// Fail with [`PipelineError::DimensionMismatch`] unless sizes agree.
pub(crate) fn ensure_same_size(
    expected: Dimensions,
    actual: Dimensions,
) -> Result<(), PipelineError> {
    if expected == actual {
        Ok(())
    } else {
        Err(PipelineError::DimensionMismatch { expected, actual })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn dimensions_pixel_count() {
        let d = Dimensions {
            width: 640,
            height: 480,
        };
        assert_eq!(d.pixel_count(), 307_200);
        assert!(!d.is_empty());
        assert!(
            Dimensions {
                width: 0,
                height: 3
            }
            .is_empty()
        );
    }

    #[test]
    fn dimensions_display() {
        let d = Dimensions {
            width: 17,
            height: 31,
        };
        assert_eq!(d.to_string(), "17x31");
    }

    #[test]
    fn zone_set_empty_is_all_zero() {
        let zones = ZoneSet::empty(Dimensions {
            width: 4,
            height: 3,
        });
        assert_eq!(
            zones.dimensions(),
            Dimensions {
                width: 4,
                height: 3
            }
        );
        assert!(zones.core.pixels().all(|p| p.0[0] == 0));
        assert!(zones.buffer.pixels().all(|p| p.0[0] == 0));
        assert!(zones.residual.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn risk_level_serializes_capitalized() {
        let json = serde_json::to_string(&RiskLevel::Extreme).unwrap();
        assert_eq!(json, "\"Extreme\"");
        assert_eq!(RiskLevel::Guarded.to_string(), "Guarded");
    }

    #[test]
    fn risk_colors_escalate_toward_red() {
        assert_eq!(RiskLevel::Minimal.color(), image::Rgb([0, 255, 0]));
        assert_eq!(RiskLevel::Extreme.color(), image::Rgb([255, 0, 0]));
        assert_eq!(RiskLevel::Unknown.color(), image::Rgb([255, 255, 255]));
    }

    #[test]
    fn water_body_type_serializes_lowercase() {
        let json = serde_json::to_string(&WaterBodyType::Ocean).unwrap();
        assert_eq!(json, "\"ocean\"");
        assert_eq!(WaterBodyType::River.to_string(), "river");
    }

    #[test]
    fn percent_label_matches_two_decimals() {
        assert_eq!(percent_label(0.0), "0.0%");
        assert_eq!(percent_label(0.123_456), "12.35%");
        assert_eq!(percent_label(1.0), "100.0%");
    }

    #[test]
    fn fallback_summary_is_unknown() {
        let result = AnalysisResult::fallback(Dimensions {
            width: 2,
            height: 2,
        });
        let summary = result.summary();
        assert_eq!(summary.risk, RiskLevel::Unknown);
        assert!(summary.water_coverage.abs() < f64::EPSILON);
        assert_eq!(summary.details.water_presence, "0%");
        assert_eq!(summary.details.surface_saturation, "Unknown");
        assert_eq!(summary.details.water_body_type, WaterBodyType::Unknown);
    }

    #[test]
    fn summary_uses_web_field_names() {
        let mut result = AnalysisResult::fallback(Dimensions {
            width: 2,
            height: 2,
        });
        result.risk_level = RiskLevel::Guarded;
        result.coverage = ZoneCoverage {
            core: 0.05,
            buffer: 0.1,
            residual: 0.02,
            total: 0.17,
        };
        result.water_coverage_percent = 17.0;
        result.water_body_type = WaterBodyType::Lake;
        result.edge_confidence = 0.123_456;

        let value = serde_json::to_value(result.summary()).unwrap();
        assert_eq!(value["risk"], "Guarded");
        assert_eq!(value["water_coverage"], 17.0);
        assert_eq!(value["details"]["Water presence"], "17.0%");
        assert_eq!(value["details"]["Core water bodies"], "5.0%");
        assert_eq!(value["details"]["River/Ocean detected"], true);
        assert_eq!(value["details"]["Surface saturation"], "Moderate");
        assert_eq!(value["details"]["Historical zone"], "Unlikely");
        assert_eq!(value["details"]["water_body_type"], "lake");
        assert_eq!(value["details"]["edge_confidence"], 0.123);
        assert_eq!(value["details"]["false_positive_suppressed"], true);
    }

    #[test]
    fn error_display() {
        let err = PipelineError::DimensionMismatch {
            expected: Dimensions {
                width: 4,
                height: 4,
            },
            actual: Dimensions {
                width: 2,
                height: 4,
            },
        };
        assert_eq!(err.to_string(), "dimension mismatch: expected 4x4, got 2x4");
        assert_eq!(PipelineError::EmptyFrame.to_string(), "frame has no pixels");
    }

    #[test]
    fn ensure_helpers() {
        let a = Dimensions {
            width: 3,
            height: 3,
        };
        assert!(ensure_non_empty(a).is_ok());
        assert_eq!(
            ensure_non_empty(Dimensions {
                width: 0,
                height: 0
            }),
            Err(PipelineError::EmptyFrame)
        );
        assert!(ensure_same_size(a, a).is_ok());
        assert!(
            ensure_same_size(
                a,
                Dimensions {
                    width: 3,
                    height: 2
                }
            )
            .is_err()
        );
    }
}
