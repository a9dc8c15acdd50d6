//! Binary morphology over water masks.
//!
//! Wraps [`imageproc::morphology`]. Structuring elements are balls of a
//! given radius under a distance norm: an L2 ball approximates an
//! elliptical kernel of side `2 * radius + 1`, and the L1 ball of radius 1
//! is the 3x3 cross.
//!
//! Non-zero pixels are foreground; outputs are strictly 0 or 255.

use image::GrayImage;
use imageproc::distance_transform::Norm;

/// A disk-shaped structuring element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Element {
    norm: Norm,
    radius: u8,
}

impl Element {
    /// 3x3 cross, the smallest element that still changes a mask.
    pub const CROSS_3: Self = Self {
        norm: Norm::L1,
        radius: 1,
    };

    /// 5x5 disk, used to clean detector output.
    pub const DISK_5: Self = Self {
        norm: Norm::L2,
        radius: 2,
    };

    /// 15x15 disk, used to consolidate the water core.
    pub const DISK_15: Self = Self {
        norm: Norm::L2,
        radius: 7,
    };

    /// 25x25 disk, used to grow the buffer ring.
    pub const DISK_25: Self = Self {
        norm: Norm::L2,
        radius: 12,
    };

    /// Side length of the square that bounds this element.
    #[must_use]
    pub const fn size(self) -> u32 {
        2 * self.radius as u32 + 1
    }
}

/// Dilation: every pixel within the element of a foreground pixel is set.
#[must_use = "returns the dilated mask"]
pub fn dilate(mask: &GrayImage, element: Element) -> GrayImage {
    if is_empty(mask) {
        return mask.clone();
    }
    imageproc::morphology::dilate(mask, element.norm, element.radius)
}

/// Opening (erode then dilate): removes foreground features smaller than
/// the element.
#[must_use = "returns the opened mask"]
pub fn open(mask: &GrayImage, element: Element) -> GrayImage {
    if is_empty(mask) {
        return mask.clone();
    }
    imageproc::morphology::open(mask, element.norm, element.radius)
}

/// Closing (dilate then erode): fills background gaps smaller than the
/// element.
#[must_use = "returns the closed mask"]
pub fn close(mask: &GrayImage, element: Element) -> GrayImage {
    if is_empty(mask) {
        return mask.clone();
    }
    imageproc::morphology::close(mask, element.norm, element.radius)
}

/// Close then open with the same element.
#[must_use = "returns the cleaned mask"]
pub fn close_open(mask: &GrayImage, element: Element) -> GrayImage {
    open(&close(mask, element), element)
}

fn is_empty(mask: &GrayImage) -> bool {
    mask.width() == 0 || mask.height() == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn count(mask: &GrayImage) -> usize {
        mask.pixels().filter(|p| p.0[0] > 0).count()
    }

    #[test]
    fn element_sizes() {
        assert_eq!(Element::CROSS_3.size(), 3);
        assert_eq!(Element::DISK_5.size(), 5);
        assert_eq!(Element::DISK_15.size(), 15);
        assert_eq!(Element::DISK_25.size(), 25);
    }

    #[test]
    fn open_removes_isolated_pixel() {
        let mut mask = GrayImage::new(11, 11);
        mask.put_pixel(5, 5, Luma([255]));
        assert_eq!(count(&open(&mask, Element::CROSS_3)), 0);
    }

    #[test]
    fn close_fills_pinhole() {
        let mut mask = GrayImage::from_pixel(11, 11, Luma([255]));
        mask.put_pixel(5, 5, Luma([0]));
        assert_eq!(count(&close(&mask, Element::DISK_5)), 121);
    }

    #[test]
    fn full_mask_survives_close_open() {
        let mask = GrayImage::from_pixel(20, 20, Luma([255]));
        assert_eq!(close_open(&mask, Element::DISK_15), mask);
    }

    #[test]
    fn dilate_grows_point_to_disk() {
        let mut mask = GrayImage::new(31, 31);
        mask.put_pixel(15, 15, Luma([255]));
        let grown = dilate(&mask, Element::DISK_5);
        assert_eq!(grown.get_pixel(15, 13).0[0], 255);
        assert_eq!(grown.get_pixel(17, 15).0[0], 255);
        assert_eq!(grown.get_pixel(15, 12).0[0], 0);
        // Corners of the bounding square lie outside the disk.
        assert_eq!(grown.get_pixel(17, 17).0[0], 0);
    }

    #[test]
    fn empty_mask_is_passed_through() {
        let mask = GrayImage::new(0, 0);
        assert_eq!(dilate(&mask, Element::DISK_25), mask);
        assert_eq!(close_open(&mask, Element::CROSS_3), mask);
    }
}
