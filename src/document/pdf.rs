//! PDF documents through MuPDF

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use flume::Receiver;
use mupdf::{Colorspace, Matrix, Pixmap};

use super::{Document, DocumentError, DocumentStatus, StatusNotifier};
use crate::geometry::SizeF;
use crate::render::Bitmap;

#[derive(Default)]
struct Inner {
    status: DocumentStatus,
    /// Page bounds in points
    pages: Vec<SizeF>,
}

/// A PDF file. Page sizes are read once on a loader thread.
///
/// MuPDF documents cannot cross threads, so each render opens its own
/// handle on the worker that performs it.
pub struct PdfDocument {
    path: PathBuf,
    inner: Mutex<Inner>,
    notifier: StatusNotifier,
}

impl PdfDocument {
    #[must_use]
    pub fn load(path: PathBuf) -> Arc<Self> {
        let doc = Arc::new(Self {
            path,
            inner: Mutex::new(Inner {
                status: DocumentStatus::Loading,
                pages: Vec::new(),
            }),
            notifier: StatusNotifier::new(),
        });

        let loader = Arc::clone(&doc);
        std::thread::spawn(move || {
            let (status, pages) = match read_page_sizes(&loader.path) {
                Ok(pages) => {
                    log::info!("Opened {:?}: {} pages", loader.path, pages.len());
                    (DocumentStatus::Ready, pages)
                }
                Err(e) => {
                    log::error!("Failed to open PDF {:?}: {e}", loader.path);
                    (DocumentStatus::Error, Vec::new())
                }
            };
            {
                let mut inner = loader.lock();
                inner.status = status;
                inner.pages = pages;
            }
            loader.notifier.notify(status);
        });
        doc
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

fn open(path: &Path) -> Result<mupdf::Document, DocumentError> {
    Ok(mupdf::Document::open(path.to_string_lossy().as_ref())?)
}

fn read_page_sizes(path: &Path) -> Result<Vec<SizeF>, DocumentError> {
    let doc = open(path)?;
    let count = doc.page_count()?.max(0);
    let mut pages = Vec::with_capacity(count as usize);
    for index in 0..count {
        let bounds = doc.load_page(index)?.bounds()?;
        pages.push(SizeF::new(
            f64::from(bounds.x1 - bounds.x0),
            f64::from(bounds.y1 - bounds.y0),
        ));
    }
    Ok(pages)
}

fn pixmap_to_bitmap(pixmap: &Pixmap) -> Result<Bitmap, DocumentError> {
    let n = pixmap.n() as usize;
    if n < 3 {
        return Err(DocumentError::generic(format!(
            "Unsupported pixmap format: {n} channels"
        )));
    }

    let width = pixmap.width() as usize;
    let height = pixmap.height() as usize;
    let stride = pixmap.stride() as usize;
    let samples = pixmap.samples();
    let row_bytes = width * n;
    if samples.len() < stride.saturating_mul(height) || row_bytes > stride {
        return Err(DocumentError::generic("Pixmap buffer size mismatch"));
    }

    let mut out = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        let row = &samples[y * stride..y * stride + row_bytes];
        if n == 3 {
            out.extend_from_slice(row);
        } else {
            for px in row.chunks_exact(n) {
                out.extend_from_slice(&px[..3]);
            }
        }
    }

    Bitmap::from_rgb(width as u32, height as u32, out)
        .ok_or_else(|| DocumentError::generic("Pixmap buffer size mismatch"))
}

impl Document for PdfDocument {
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
        {
            let inner = self.lock();
            if inner.status != DocumentStatus::Ready {
                return Err(DocumentError::NotReady(inner.status));
            }
            if page >= inner.pages.len() {
                return Err(DocumentError::PageOutOfRange {
                    page,
                    count: inner.pages.len(),
                });
            }
        }

        let doc = open(&self.path)?;
        let pdf_page = doc.load_page(page as i32)?;
        let scale = resolution as f32;
        let transform = Matrix::new_scale(scale, scale);
        let pixmap = pdf_page.to_pixmap(&transform, &Colorspace::device_rgb(), false, false)?;
        pixmap_to_bitmap(&pixmap)
    }
}
