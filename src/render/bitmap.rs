//! Rendered page bitmaps

use std::sync::Arc;

use image::{Rgb, RgbImage};

use crate::geometry::Size;

/// Opaque RGB color used by painters and bitmaps
pub type Color = Rgb<u8>;

pub const WHITE: Color = Rgb([0xFF, 0xFF, 0xFF]);
pub const DARK_GRAY: Color = Rgb([0x80, 0x80, 0x80]);

/// Decoded page image, shared between the render workers, the cache and
/// the painter without copying pixel data.
#[derive(Clone)]
pub struct Bitmap {
    image: Arc<RgbImage>,
}

impl Bitmap {
    #[must_use]
    pub fn new(image: RgbImage) -> Self {
        Self {
            image: Arc::new(image),
        }
    }

    /// Bitmap filled with a single color
    #[must_use]
    pub fn solid(size: Size, color: Color) -> Self {
        Self::new(RgbImage::from_pixel(size.width, size.height, color))
    }

    /// Build from tightly packed RGB rows
    #[must_use]
    pub fn from_rgb(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        RgbImage::from_raw(width, height, pixels).map(Self::new)
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    #[must_use]
    pub fn size(&self) -> Size {
        Size::new(self.width(), self.height())
    }

    /// Pixel at `(x, y)`, `None` outside the bitmap
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        self.image.get_pixel_checked(x, y).copied()
    }

    #[must_use]
    pub fn image(&self) -> &RgbImage {
        &self.image
    }
}

impl std::fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bitmap")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish_non_exhaustive()
    }
}

/// Small "busy" glyph drawn in the middle of pages that are still rendering:
/// three dots on a transparent-looking light background.
#[must_use]
pub fn busy_icon() -> Bitmap {
    const SIDE: u32 = 15;
    const DOT: Color = Rgb([0x60, 0x60, 0x60]);
    const PAPER: Color = Rgb([0xF0, 0xF0, 0xF0]);

    let mut img = RgbImage::from_pixel(SIDE, SIDE, PAPER);
    for cx in [3u32, 7, 11] {
        for y in 6..9 {
            for x in cx - 1..=cx + 1 {
                img.put_pixel(x, y, DOT);
            }
        }
    }
    Bitmap::new(img)
}
