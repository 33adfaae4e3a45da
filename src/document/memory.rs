//! In-memory document with synthetic pages

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use flume::Receiver;
use image::{Rgb, RgbImage};

use super::{Document, DocumentError, DocumentStatus, StatusNotifier};
use crate::geometry::SizeF;
use crate::render::{Bitmap, Color, WHITE};

const BORDER: Color = Rgb([0xC8, 0xC8, 0xC8]);

#[derive(Default)]
struct Inner {
    status: DocumentStatus,
    pages: Vec<SizeF>,
}

/// Document whose pages are plain sizes held in memory.
///
/// Status only changes when the owner says so, which makes it the
/// document of choice for driving the view deterministically.
pub struct MemoryDocument {
    inner: Mutex<Inner>,
    notifier: StatusNotifier,
    paper: Color,
    renders: AtomicUsize,
}

impl MemoryDocument {
    /// Empty document in `Null` status
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            notifier: StatusNotifier::new(),
            paper: WHITE,
            renders: AtomicUsize::new(0),
        }
    }

    /// Document that is already `Ready` with the given page sizes
    #[must_use]
    pub fn with_pages(pages: Vec<SizeF>) -> Self {
        let doc = Self::new();
        {
            let mut inner = doc.lock();
            inner.pages = pages;
            inner.status = DocumentStatus::Ready;
        }
        doc
    }

    /// Replace the pages and announce `Ready`
    pub fn load(&self, pages: Vec<SizeF>) {
        {
            let mut inner = self.lock();
            inner.pages = pages;
            inner.status = DocumentStatus::Ready;
        }
        self.notifier.notify(DocumentStatus::Ready);
    }

    /// Change the status and announce it. Leaving `Ready` drops the pages.
    pub fn set_status(&self, status: DocumentStatus) {
        {
            let mut inner = self.lock();
            inner.status = status;
            if status != DocumentStatus::Ready {
                inner.pages.clear();
            }
        }
        self.notifier.notify(status);
    }

    /// How many times `render_page` has been called
    #[must_use]
    pub fn render_count(&self) -> usize {
        self.renders.load(Ordering::Relaxed)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl Document for MemoryDocument {
    fn status(&self) -> DocumentStatus {
        self.lock().status
    }

    fn page_count(&self) -> usize {
        self.lock().pages.len()
    }

    fn page_size(&self, page: usize) -> Option<SizeF> {
        self.lock().pages.get(page).copied()
    }

    fn subscribe(&self) -> Receiver<DocumentStatus> {
        self.notifier.subscribe()
    }

    fn render_page(&self, page: usize, resolution: f64) -> Result<Bitmap, DocumentError> {
        let (status, size, count) = {
            let inner = self.lock();
            (inner.status, inner.pages.get(page).copied(), inner.pages.len())
        };
        if status != DocumentStatus::Ready {
            return Err(DocumentError::NotReady(status));
        }
        let size = size.ok_or(DocumentError::PageOutOfRange { page, count })?;
        self.renders.fetch_add(1, Ordering::Relaxed);

        let px = size.scaled(resolution).to_size();
        let mut img = RgbImage::from_pixel(px.width, px.height, self.paper);
        if px.is_empty() {
            return Ok(Bitmap::new(img));
        }
        let (w, h) = (px.width, px.height);
        for x in 0..w {
            img.put_pixel(x, 0, BORDER);
            img.put_pixel(x, h - 1, BORDER);
        }
        for y in 0..h {
            img.put_pixel(0, y, BORDER);
            img.put_pixel(w - 1, y, BORDER);
        }
        Ok(Bitmap::new(img))
    }
}
