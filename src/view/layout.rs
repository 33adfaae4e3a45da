//! Vertical page layout for continuous scroll
//!
//! Pages are stacked top to bottom with a fixed gap before the first
//! page, between pages and after the last one:
//!
//! ```text
//! y = 0        ┄ spacing ┄
//! y_for_page(0) ┌──────┐
//!               │  0   │
//!               └──────┘
//!              ┄ spacing ┄
//! y_for_page(1) ┌──────┐ ...
//! ```

use crate::document::Document;
use crate::geometry::{Size, SizeF};

/// Default gap between pages in device pixels
pub const DEFAULT_PAGE_SPACING: u32 = 3;

/// Page sizes captured from the document plus the zoom they are shown at
#[derive(Clone, Debug)]
pub struct PageLayout {
    /// Document-unit sizes, index = page number
    base_sizes: Vec<SizeF>,
    screen_scale: f64,
    zoom: f64,
    spacing: u32,
    total: Size,
}

impl PageLayout {
    #[must_use]
    pub fn new(screen_scale: f64, spacing: u32) -> Self {
        Self {
            base_sizes: Vec::new(),
            screen_scale,
            zoom: 1.0,
            spacing,
            total: Size::default(),
        }
    }

    /// Drop all page sizes
    pub fn clear(&mut self) {
        self.base_sizes.clear();
    }

    /// Capture page sizes from a ready document, in page order.
    /// Pages without a size are recorded as empty.
    pub fn populate(&mut self, document: &dyn Document) {
        let count = document.page_count();
        self.base_sizes = (0..count)
            .map(|page| document.page_size(page).unwrap_or_default())
            .collect();
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom;
    }

    #[must_use]
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    #[must_use]
    pub fn screen_scale(&self) -> f64 {
        self.screen_scale
    }

    #[must_use]
    pub fn spacing(&self) -> u32 {
        self.spacing
    }

    /// Device pixels per document unit at the current zoom
    #[must_use]
    pub fn resolution(&self) -> f64 {
        self.screen_scale * self.zoom
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.base_sizes.len()
    }

    /// Size of `page` in device pixels at the current zoom
    #[must_use]
    pub fn page_size(&self, page: usize) -> Option<SizeF> {
        self.base_sizes
            .get(page)
            .map(|size| size.scaled(self.resolution()))
    }

    /// `page_size` rounded to whole pixels
    #[must_use]
    pub fn page_pixel_size(&self, page: usize) -> Option<Size> {
        self.page_size(page).map(SizeF::to_size)
    }

    fn page_height(&self, page: usize) -> u32 {
        self.page_pixel_size(page).map_or(0, |size| size.height)
    }

    /// Recompute the content size: widest page by the sum of all page
    /// heights, with one spacing band before each page and after the last.
    pub fn relayout(&mut self) -> Size {
        let mut total = Size::new(0, self.spacing);
        for page in 0..self.page_count() {
            let size = self.page_pixel_size(page).unwrap_or_default();
            total.height = total
                .height
                .saturating_add(size.height)
                .saturating_add(self.spacing);
            total.width = total.width.max(size.width);
        }
        self.total = total;
        total
    }

    /// Content size from the last `relayout`
    #[must_use]
    pub fn total_size(&self) -> Size {
        self.total
    }

    /// Top edge of `end_page`: one spacing band plus the height and
    /// spacing of every page before it. Past the end this is the bottom
    /// of the content.
    #[must_use]
    pub fn y_for_page(&self, end_page: usize) -> u32 {
        (0..end_page.min(self.page_count())).fold(self.spacing, |y, page| {
            y.saturating_add(self.page_height(page))
                .saturating_add(self.spacing)
        })
    }

    /// First page with a row at or below `top`, and the y coordinate it is
    /// drawn at. Returns `page_count()` when everything is above `top`.
    #[must_use]
    pub fn first_visible(&self, top: i32) -> (usize, i64) {
        let spacing = i64::from(self.spacing);
        let top = i64::from(top);
        let mut page = 0;
        let mut y: i64 = 0;
        while page < self.page_count() {
            let height = i64::from(self.page_height(page));
            // Page rows are [y + spacing, y + spacing + height)
            if y + spacing + height > top {
                break;
            }
            y += height + spacing;
            page += 1;
        }
        (page, y + spacing)
    }

    /// Page containing content row `y`, or the nearest page to it
    #[must_use]
    pub fn page_at(&self, y: u32) -> Option<usize> {
        if self.page_count() == 0 {
            return None;
        }
        let mut top = self.spacing;
        for page in 0..self.page_count() {
            let bottom = top
                .saturating_add(self.page_height(page))
                .saturating_add(self.spacing);
            if y < bottom {
                return Some(page);
            }
            top = bottom;
        }
        Some(self.page_count() - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MemoryDocument;

    fn layout(heights: &[f64], scale: f64, spacing: u32) -> PageLayout {
        let doc = MemoryDocument::with_pages(
            heights.iter().map(|&h| SizeF::new(80.0, h)).collect(),
        );
        let mut layout = PageLayout::new(scale, spacing);
        layout.populate(&doc);
        layout.relayout();
        layout
    }

    #[test]
    fn total_size_sums_heights_and_spacing() {
        let layout = layout(&[100.0, 150.0, 120.0], 1.0, 3);
        assert_eq!(layout.total_size(), Size::new(80, 382));
    }

    #[test]
    fn empty_layout_is_one_spacing_band() {
        let mut layout = PageLayout::new(1.0, 3);
        assert_eq!(layout.relayout(), Size::new(0, 3));
        assert_eq!(layout.y_for_page(0), 3);
        assert_eq!(layout.page_at(0), None);
    }

    #[test]
    fn y_for_page_accumulates() {
        let layout = layout(&[100.0, 150.0, 120.0], 1.0, 3);
        assert_eq!(layout.y_for_page(0), 3);
        assert_eq!(layout.y_for_page(1), 106);
        assert_eq!(layout.y_for_page(2), 259);
        for n in 1..=3 {
            assert_eq!(
                layout.y_for_page(n),
                layout.y_for_page(n - 1) + layout.page_pixel_size(n - 1).unwrap().height + 3
            );
        }
        // Clamped past the end: bottom of the content.
        assert_eq!(layout.y_for_page(10), layout.total_size().height);
    }

    #[test]
    fn page_size_applies_scale_and_zoom() {
        let mut layout = layout(&[100.0], 2.0, 3);
        layout.set_zoom(1.5);
        assert_eq!(layout.page_size(0), Some(SizeF::new(240.0, 300.0)));
        assert_eq!(layout.page_size(1), None);
        assert!((layout.resolution() - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn first_visible_finds_page_under_top_edge() {
        let layout = layout(&[100.0, 150.0, 120.0], 1.0, 3);
        assert_eq!(layout.first_visible(0), (0, 3));
        assert_eq!(layout.first_visible(100), (0, 3));
        // Last rows of page 0
        assert_eq!(layout.first_visible(101), (0, 3));
        assert_eq!(layout.first_visible(102), (0, 3));
        // Spacing band below page 0
        assert_eq!(layout.first_visible(103), (1, 106));
        assert_eq!(layout.first_visible(300), (2, 259));
        // Trailing spacing band and beyond
        assert_eq!(layout.first_visible(380), (3, 382));
        assert_eq!(layout.first_visible(10_000), (3, 382));
    }

    #[test]
    fn page_at_maps_rows_to_pages() {
        let layout = layout(&[100.0, 150.0, 120.0], 1.0, 3);
        assert_eq!(layout.page_at(0), Some(0));
        assert_eq!(layout.page_at(105), Some(0));
        assert_eq!(layout.page_at(106), Some(1));
        assert_eq!(layout.page_at(5_000), Some(2));
    }
}
