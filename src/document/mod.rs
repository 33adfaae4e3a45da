//! Document model consumed by the paged view
//!
//! A document is an ordered list of pages with intrinsic sizes, a load
//! status that changes over time, and a raster backend that turns a page
//! into a bitmap at a given resolution. The view never owns a document;
//! it holds a shared handle and listens for status changes.

mod image_dir;
mod memory;
#[cfg(feature = "pdf")]
mod pdf;

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use flume::{Receiver, Sender};

use crate::geometry::SizeF;
use crate::render::Bitmap;

pub use image_dir::ImageDocument;
pub use memory::MemoryDocument;
#[cfg(feature = "pdf")]
pub use pdf::PdfDocument;

/// Load status of a document
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DocumentStatus {
    /// Nothing loaded
    #[default]
    Null,
    Loading,
    /// Page count and page sizes are available
    Ready,
    Unloading,
    Error,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Null => "empty",
            DocumentStatus::Loading => "loading",
            DocumentStatus::Ready => "ready",
            DocumentStatus::Unloading => "unloading",
            DocumentStatus::Error => "error",
        }
    }
}

/// Errors raised by document backends
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("image decode: {0}")]
    Image(#[from] image::ImageError),

    #[cfg(feature = "pdf")]
    #[error("PDF engine: {0}")]
    Pdf(#[from] mupdf::error::Error),

    #[error("page {page} out of range (document has {count} pages)")]
    PageOutOfRange { page: usize, count: usize },

    #[error("document is not ready (status: {})", .0.as_str())]
    NotReady(DocumentStatus),

    #[error("{detail}")]
    Generic { detail: String },
}

impl DocumentError {
    pub fn generic(msg: impl Into<String>) -> Self {
        Self::Generic { detail: msg.into() }
    }
}

/// A paged document with an asynchronous load lifecycle.
///
/// `render_page` is called from render worker threads, everything else
/// from the thread that owns the view.
pub trait Document: Send + Sync {
    fn status(&self) -> DocumentStatus;

    /// Number of pages, 0 unless the document is ready
    fn page_count(&self) -> usize;

    /// Intrinsic size of `page` in document units, `None` out of range
    fn page_size(&self, page: usize) -> Option<SizeF>;

    /// Receive every status change from now on
    fn subscribe(&self) -> Receiver<DocumentStatus>;

    /// Rasterize `page` at `resolution` device pixels per document unit
    fn render_page(&self, page: usize, resolution: f64) -> Result<Bitmap, DocumentError>;
}

/// Fan-out of status changes to every live subscriber
#[derive(Default)]
pub struct StatusNotifier {
    subscribers: Mutex<Vec<Sender<DocumentStatus>>>,
}

impl StatusNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<DocumentStatus> {
        let (tx, rx) = flume::unbounded();
        self.subscribers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(tx);
        rx
    }

    /// Deliver `status` to all subscribers, dropping the ones that hung up
    pub fn notify(&self, status: DocumentStatus) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        subscribers.retain(|tx| tx.send(status).is_ok());
        log::trace!(
            "document status -> {} ({} subscribers)",
            status.as_str(),
            subscribers.len()
        );
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}

/// Open a document by path: PDF files through the PDF engine, anything
/// else (a directory of images or a single image) as an image document.
pub fn open_document(path: &Path) -> Result<std::sync::Arc<dyn Document>, DocumentError> {
    let is_pdf = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

    if is_pdf {
        #[cfg(feature = "pdf")]
        {
            return Ok(PdfDocument::load(path.to_path_buf()));
        }
        #[cfg(not(feature = "pdf"))]
        {
            return Err(DocumentError::generic(
                "PDF support was not compiled in (enable the `pdf` feature)",
            ));
        }
    }

    if !path.exists() {
        return Err(DocumentError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file or directory"),
        });
    }

    Ok(ImageDocument::load(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notifier_reaches_every_subscriber() {
        let notifier = StatusNotifier::new();
        let a = notifier.subscribe();
        let b = notifier.subscribe();

        notifier.notify(DocumentStatus::Ready);

        assert_eq!(a.try_recv().ok(), Some(DocumentStatus::Ready));
        assert_eq!(b.try_recv().ok(), Some(DocumentStatus::Ready));
    }

    #[test]
    fn notifier_prunes_dropped_subscribers() {
        let notifier = StatusNotifier::new();
        let kept = notifier.subscribe();
        drop(notifier.subscribe());

        notifier.notify(DocumentStatus::Loading);

        assert_eq!(notifier.subscriber_count(), 1);
        assert_eq!(kept.try_recv().ok(), Some(DocumentStatus::Loading));
    }

    #[test]
    fn open_missing_path_fails() {
        let result = open_document(Path::new("/definitely/not/here"));
        assert!(matches!(result, Err(DocumentError::Io { .. })));
    }
}
