//! External contours of a water mask and their shape metrics.
//!
//! Contours come from Suzuki-Abe border following
//! ([`imageproc::contours::find_contours`]); only outermost borders are
//! kept, so each contour stands for one connected water region with its
//! holes ignored. Points are pixel centres in integer image coordinates.

use image::Luma;
use imageproc::contours::{BorderType, find_contours};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;

use crate::types::{Dimensions, MASK_ON, Mask};

/// The outer border of one connected region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    points: Vec<Point<i32>>,
}

impl Region {
    /// Create a region from its closed boundary.
    #[must_use]
    pub const fn new(points: Vec<Point<i32>>) -> Self {
        Self { points }
    }

    /// Boundary points in tracing order.
    #[must_use]
    pub fn points(&self) -> &[Point<i32>] {
        &self.points
    }

    /// Number of boundary points.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns `true` if the region has no boundary points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The boundary with the interior points of straight runs removed.
    ///
    /// Only points where the tracing direction changes are kept, so a
    /// rectangle compresses to its four corners.
    #[must_use]
    pub fn compressed(&self) -> Self {
        let n = self.points.len();
        if n < 3 {
            return self.clone();
        }
        let step = |a: Point<i32>, b: Point<i32>| ((b.x - a.x).signum(), (b.y - a.y).signum());
        let points: Vec<_> = (0..n)
            .filter(|&i| {
                let prev = self.points[(i + n - 1) % n];
                let next = self.points[(i + 1) % n];
                step(prev, self.points[i]) != step(self.points[i], next)
            })
            .map(|i| self.points[i])
            .collect();
        if points.is_empty() {
            self.clone()
        } else {
            Self::new(points)
        }
    }

    /// Enclosed area by the shoelace formula over the boundary polygon.
    #[must_use]
    pub fn area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let twice: i64 = (0..n)
            .map(|i| {
                let p = self.points[i];
                let q = self.points[(i + 1) % n];
                i64::from(p.x) * i64::from(q.y) - i64::from(q.x) * i64::from(p.y)
            })
            .sum();
        #[allow(clippy::cast_precision_loss)]
        let area = twice.unsigned_abs() as f64 / 2.0;
        area
    }

    /// Length of the closed boundary.
    #[must_use]
    pub fn perimeter(&self) -> f64 {
        let n = self.points.len();
        if n < 2 {
            return 0.0;
        }
        (0..n)
            .map(|i| {
                let p = self.points[i];
                let q = self.points[(i + 1) % n];
                f64::from(p.x - q.x).hypot(f64::from(p.y - q.y))
            })
            .sum()
    }

    /// Side lengths of the minimum-area bounding rectangle.
    ///
    /// Returns `None` when the rectangle is degenerate (either side is
    /// zero), as for a single point or a straight line of pixels.
    #[must_use]
    pub fn min_rect_sides(&self) -> Option<(f64, f64)> {
        if self.points.is_empty() {
            return None;
        }
        let corners = imageproc::geometry::min_area_rect(&self.points);
        let side = |a: Point<i32>, b: Point<i32>| f64::from(a.x - b.x).hypot(f64::from(a.y - b.y));
        let width = side(corners[0], corners[1]);
        let height = side(corners[1], corners[2]);
        (width > 0.0 && height > 0.0).then_some((width, height))
    }

    /// Long side over short side of the minimum-area rectangle.
    #[must_use]
    pub fn aspect_ratio(&self) -> Option<f64> {
        self.min_rect_sides()
            .map(|(w, h)| w.max(h) / w.min(h))
    }

    /// `4 * pi * area / perimeter^2`: 1 for a disc, near 0 for a thin
    /// line.
    #[must_use]
    pub fn circularity(&self) -> Option<f64> {
        let perimeter = self.perimeter();
        (perimeter > 0.0).then(|| 4.0 * std::f64::consts::PI * self.area() / (perimeter * perimeter))
    }

    /// Fraction of boundary points within `margin` pixels of the frame
    /// border.
    #[must_use]
    pub fn edge_touch_ratio(&self, dimensions: Dimensions, margin: i32) -> f64 {
        if self.points.is_empty() {
            return 0.0;
        }
        let w = i32::try_from(dimensions.width).unwrap_or(i32::MAX);
        let h = i32::try_from(dimensions.height).unwrap_or(i32::MAX);
        let touching = self
            .points
            .iter()
            .filter(|p| p.x <= margin || p.x >= w - margin || p.y <= margin || p.y >= h - margin)
            .count();
        #[allow(clippy::cast_precision_loss)]
        let ratio = touching as f64 / self.points.len() as f64;
        ratio
    }
}

/// Outermost borders of every connected foreground region.
#[must_use]
pub fn external_regions(mask: &Mask) -> Vec<Region> {
    if mask.width() == 0 || mask.height() == 0 {
        return Vec::new();
    }

    // Border following never starts on the outermost row or column, so
    // regions touching the frame edge are traced on a zero-padded copy.
    let mut padded = Mask::new(mask.width() + 2, mask.height() + 2);
    image::imageops::replace(&mut padded, mask, 1, 1);

    let max_x = i32::try_from(mask.width() - 1).unwrap_or(i32::MAX);
    let max_y = i32::try_from(mask.height() - 1).unwrap_or(i32::MAX);
    find_contours::<i32>(&padded)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| {
            let points = c
                .points
                .into_iter()
                .map(|p| Point::new((p.x - 1).clamp(0, max_x), (p.y - 1).clamp(0, max_y)))
                .collect();
            Region::new(points)
        })
        .collect()
}

/// External regions sorted by area, largest first.
#[must_use]
pub fn regions_by_area(mask: &Mask) -> Vec<Region> {
    let mut regions = external_regions(mask);
    regions.sort_by(|a, b| b.area().total_cmp(&a.area()));
    regions
}

/// The external region with the largest enclosed area.
#[must_use]
pub fn largest_region(mask: &Mask) -> Option<Region> {
    external_regions(mask)
        .into_iter()
        .max_by(|a, b| a.area().total_cmp(&b.area()))
}

/// Paint regions, interiors filled, into a fresh mask.
#[must_use]
pub fn fill_regions(dimensions: Dimensions, regions: &[Region]) -> Mask {
    let mut mask = Mask::new(dimensions.width, dimensions.height);
    for region in regions {
        let mut polygon = region.points.clone();
        // The polygon rasteriser rejects an explicitly closed ring.
        while polygon.len() > 1 && polygon.first() == polygon.last() {
            polygon.pop();
        }
        if polygon.len() >= 3 {
            draw_polygon_mut(&mut mask, &polygon, Luma([MASK_ON]));
        }
        // The boundary pixels themselves belong to the region.
        for p in &region.points {
            if let (Ok(x), Ok(y)) = (u32::try_from(p.x), u32::try_from(p.y))
                && x < dimensions.width
                && y < dimensions.height
            {
                mask.put_pixel(x, y, Luma([MASK_ON]));
            }
        }
    }
    mask
}
