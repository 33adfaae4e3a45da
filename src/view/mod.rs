//! The paged document view and its building blocks

mod cache;
mod layout;
mod paged_view;
mod paint;

pub use cache::{DEFAULT_PAGE_CACHE_LIMIT, RenderedPageCache};
pub use layout::{DEFAULT_PAGE_SPACING, PageLayout};
pub use paged_view::{PageRange, PagedView, ViewEvent, ViewOptions};
pub use paint::{BufferPainter, Painter};
