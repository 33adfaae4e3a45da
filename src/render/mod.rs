//! Page rendering infrastructure
//!
//! The view asks a [`RenderDelegate`] for pages and later collects the
//! results. [`PageRenderer`] is the threaded delegate: a small worker
//! pool rasterizes pages off the UI thread and answers over a channel.

mod bitmap;
mod renderer;
mod request;
mod worker;

pub use bitmap::{Bitmap, Color, DARK_GRAY, WHITE, busy_icon};
pub use renderer::{PageRenderer, RenderDelegate};
pub use request::{Generation, PageCompletion, PageRequest, RenderFault, RenderRequest, RenderResponse, RequestId};

/// Default number of render worker threads
pub const DEFAULT_WORKERS: usize = 2;
