//! Sizes and rectangles shared by the document model and the view
//!
//! Document units are whatever the document reports (points for PDF,
//! pixels for image files). Everything the view paints is in device
//! pixels of the scrollable content, with the origin at the top-left
//! corner of the first page's spacing band.

/// Fractional size, used for document units and unrounded pixel sizes
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SizeF {
    pub width: f64,
    pub height: f64,
}

impl SizeF {
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Multiply both dimensions by `factor`
    #[must_use]
    pub fn scaled(self, factor: f64) -> Self {
        Self::new(self.width * factor, self.height * factor)
    }

    /// Round to whole pixels. Negative and non-finite dimensions become 0.
    #[must_use]
    pub fn to_size(self) -> Size {
        Size::new(round_px(self.width), round_px(self.height))
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

fn round_px(v: f64) -> u32 {
    if v.is_finite() && v > 0.0 {
        v.round().min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

/// Integer pixel size
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Rectangle in content pixels. `bottom()` and `right()` are exclusive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    #[must_use]
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[must_use]
    pub fn from_origin(x: i32, y: i32, size: Size) -> Self {
        Self::new(x, y, size.width, size.height)
    }

    #[must_use]
    pub const fn left(&self) -> i32 {
        self.x
    }

    #[must_use]
    pub const fn top(&self) -> i32 {
        self.y
    }

    #[must_use]
    pub fn right(&self) -> i32 {
        self.x.saturating_add_unsigned(self.width)
    }

    #[must_use]
    pub fn bottom(&self) -> i32 {
        self.y.saturating_add_unsigned(self.height)
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Overlapping part of two rectangles, empty (at `self`'s origin) if disjoint
    #[must_use]
    pub fn intersection(&self, other: &PixelRect) -> PixelRect {
        let left = self.left().max(other.left());
        let top = self.top().max(other.top());
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= left || bottom <= top {
            return PixelRect::new(self.x, self.y, 0, 0);
        }
        PixelRect::new(left, top, (right - left) as u32, (bottom - top) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_size_rounds_and_clamps() {
        assert_eq!(SizeF::new(99.5, 150.4).to_size(), Size::new(100, 150));
        assert_eq!(SizeF::new(-3.0, f64::NAN).to_size(), Size::new(0, 0));
    }

    #[test]
    fn scaled_multiplies_both_dimensions() {
        let s = SizeF::new(612.0, 792.0).scaled(0.5);
        assert_eq!(s, SizeF::new(306.0, 396.0));
    }

    #[test]
    fn intersection_of_overlapping_rects() {
        let a = PixelRect::new(0, 0, 100, 100);
        let b = PixelRect::new(-20, 50, 60, 100);
        assert_eq!(a.intersection(&b), PixelRect::new(0, 50, 40, 50));
    }

    #[test]
    fn intersection_of_disjoint_rects_is_empty() {
        let a = PixelRect::new(0, 0, 10, 10);
        let b = PixelRect::new(10, 0, 10, 10);
        assert!(a.intersection(&b).is_empty());
    }

    #[test]
    fn edges_are_exclusive() {
        let r = PixelRect::new(-5, 3, 10, 7);
        assert_eq!(r.right(), 5);
        assert_eq!(r.bottom(), 10);
    }
}
