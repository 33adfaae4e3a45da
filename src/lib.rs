// Export modules for use in tests
pub mod app;
pub mod document;
pub mod event_source;
pub mod geometry;
pub mod panic_handler;
pub mod render;
pub mod settings;
pub mod view;
pub mod zoom;

pub mod test_utils;

pub use app::{App, AppAction, run_app};
pub use document::{Document, DocumentStatus, open_document};
pub use view::{PagedView, ViewEvent, ViewOptions};
