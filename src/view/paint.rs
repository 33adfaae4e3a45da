//! Painting surfaces for the paged view

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Color as CellColor;

use crate::geometry::PixelRect;
use crate::render::{Bitmap, Color};

/// Upper half block: foreground paints the top pixel, background the bottom
const HALF_BLOCK: &str = "▀";

/// Something the view can paint pages onto. Coordinates are content
/// pixels; implementations clip to whatever they can show.
pub trait Painter {
    fn fill_rect(&mut self, rect: PixelRect, color: Color);

    fn draw_bitmap(&mut self, x: i32, y: i32, bitmap: &Bitmap);
}

/// Paints content pixels into a ratatui buffer, two pixel rows per cell.
///
/// `origin` is the content pixel shown at the top-left corner of `area`,
/// i.e. the current horizontal and vertical scroll offsets.
pub struct BufferPainter<'a> {
    buf: &'a mut Buffer,
    area: Rect,
    origin: (i32, i32),
}

impl<'a> BufferPainter<'a> {
    pub fn new(buf: &'a mut Buffer, area: Rect, origin: (i32, i32)) -> Self {
        let area = area.intersection(buf.area);
        Self { buf, area, origin }
    }

    /// Content rectangle this painter can show
    #[must_use]
    pub fn visible_rect(&self) -> PixelRect {
        PixelRect::new(
            self.origin.0,
            self.origin.1,
            u32::from(self.area.width),
            u32::from(self.area.height) * 2,
        )
    }

    fn set_pixel(&mut self, x: i32, y: i32, color: Color) {
        let vx = x - self.origin.0;
        let vy = y - self.origin.1;
        if vx < 0 || vy < 0 {
            return;
        }
        let (vx, vy) = (vx as u32, vy as u32);
        if vx >= u32::from(self.area.width) || vy >= u32::from(self.area.height) * 2 {
            return;
        }

        let cell_x = self.area.x + vx as u16;
        let cell_y = self.area.y + (vy / 2) as u16;
        let [r, g, b] = color.0;
        let cell = &mut self.buf[(cell_x, cell_y)];
        cell.set_symbol(HALF_BLOCK);
        if vy % 2 == 0 {
            cell.set_fg(CellColor::Rgb(r, g, b));
        } else {
            cell.set_bg(CellColor::Rgb(r, g, b));
        }
    }
}

impl Painter for BufferPainter<'_> {
    fn fill_rect(&mut self, rect: PixelRect, color: Color) {
        let clipped = rect.intersection(&self.visible_rect());
        for y in clipped.top()..clipped.bottom() {
            for x in clipped.left()..clipped.right() {
                self.set_pixel(x, y, color);
            }
        }
    }

    fn draw_bitmap(&mut self, x: i32, y: i32, bitmap: &Bitmap) {
        let target = PixelRect::from_origin(x, y, bitmap.size());
        let clipped = target.intersection(&self.visible_rect());
        for py in clipped.top()..clipped.bottom() {
            for px in clipped.left()..clipped.right() {
                if let Some(color) = bitmap.pixel((px - x) as u32, (py - y) as u32) {
                    self.set_pixel(px, py, color);
                }
            }
        }
    }
}
