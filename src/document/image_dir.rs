//! Documents made of image files, one file per page

use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use fast_image_resize as fir;
use flume::Receiver;
use image::RgbImage;

use super::{Document, DocumentError, DocumentStatus, StatusNotifier};
use crate::geometry::SizeF;
use crate::render::Bitmap;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp", "tif", "tiff"];

#[derive(Clone)]
struct PageFile {
    path: PathBuf,
    size: SizeF,
}

#[derive(Default)]
struct Inner {
    status: DocumentStatus,
    pages: Vec<PageFile>,
}

/// A directory of page images (sorted by file name), or a single image.
///
/// Page sizes are read from the image headers on a background thread;
/// the document announces `Loading`, then `Ready` or `Error`.
pub struct ImageDocument {
    source: PathBuf,
    inner: Mutex<Inner>,
    notifier: StatusNotifier,
}

impl ImageDocument {
    /// Start loading `source` in the background
    #[must_use]
    pub fn load(source: PathBuf) -> Arc<Self> {
        let doc = Arc::new(Self {
            source,
            inner: Mutex::new(Inner {
                status: DocumentStatus::Loading,
                pages: Vec::new(),
            }),
            notifier: StatusNotifier::new(),
        });

        let loader = Arc::clone(&doc);
        std::thread::spawn(move || loader.scan());
        doc
    }

    /// Load synchronously on the calling thread
    #[must_use]
    pub fn load_blocking(source: PathBuf) -> Arc<Self> {
        let doc = Arc::new(Self {
            source,
            inner: Mutex::new(Inner::default()),
            notifier: StatusNotifier::new(),
        });
        doc.scan();
        doc
    }

    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    fn scan(&self) {
        match collect_pages(&self.source) {
            Ok(pages) => {
                log::info!(
                    "Loaded {} page images from {:?}",
                    pages.len(),
                    self.source
                );
                self.finish(DocumentStatus::Ready, pages);
            }
            Err(e) => {
                log::error!("Failed to load image document {:?}: {e}", self.source);
                self.finish(DocumentStatus::Error, Vec::new());
            }
        }
    }

    fn finish(&self, status: DocumentStatus, pages: Vec<PageFile>) {
        {
            let mut inner = self.lock();
            inner.status = status;
            inner.pages = pages;
        }
        self.notifier.notify(status);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

fn collect_pages(source: &Path) -> Result<Vec<PageFile>, DocumentError> {
    let io_err = |source_err| DocumentError::Io {
        path: source.to_path_buf(),
        source: source_err,
    };

    let mut files = if source.is_dir() {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(source).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.is_file() && is_image_file(&path) {
                files.push(path);
            }
        }
        files
    } else {
        vec![source.to_path_buf()]
    };
    files.sort();

    let mut pages = Vec::with_capacity(files.len());
    for path in files {
        // Get image dimensions without loading the full image data
        match imagesize::size(&path) {
            Ok(dim) => pages.push(PageFile {
                size: SizeF::new(dim.width as f64, dim.height as f64),
                path,
            }),
            Err(e) => {
                log::warn!("Skipping unreadable page image {path:?}: {e}");
            }
        }
    }

    if pages.is_empty() {
        return Err(DocumentError::generic(format!(
            "no readable images in {source:?}"
        )));
    }
    Ok(pages)
}

/// Scale an RGB image with fast_image_resize
fn resize_rgb(src: RgbImage, width: u32, height: u32) -> Result<RgbImage, DocumentError> {
    let (src_width, src_height) = src.dimensions();
    if (src_width, src_height) == (width, height) {
        return Ok(src);
    }

    let resize_error = |detail: String| DocumentError::generic(detail);
    let src_nz_width =
        NonZeroU32::new(src_width).ok_or_else(|| resize_error("Invalid source width".into()))?;
    let src_nz_height =
        NonZeroU32::new(src_height).ok_or_else(|| resize_error("Invalid source height".into()))?;
    let dst_nz_width =
        NonZeroU32::new(width).ok_or_else(|| resize_error("Invalid target width".into()))?;
    let dst_nz_height =
        NonZeroU32::new(height).ok_or_else(|| resize_error("Invalid target height".into()))?;

    let src = fir::Image::from_vec_u8(
        src_nz_width,
        src_nz_height,
        src.into_raw(),
        fir::PixelType::U8x3,
    )
    .map_err(|e| resize_error(format!("Fast resize source error: {e}")))?;
    let mut dst = fir::Image::new(dst_nz_width, dst_nz_height, fir::PixelType::U8x3);
    let mut resizer = fir::Resizer::new(fir::ResizeAlg::Convolution(fir::FilterType::Bilinear));
    resizer
        .resize(&src.view(), &mut dst.view_mut())
        .map_err(|e| resize_error(format!("Fast resize error: {e}")))?;

    RgbImage::from_raw(width, height, dst.into_vec())
        .ok_or_else(|| resize_error("Resized buffer size mismatch".into()))
}

impl Document for ImageDocument {
    fn status(&self) -> DocumentStatus {
        self.lock().status
    }

    fn page_count(&self) -> usize {
        self.lock().pages.len()
    }

    fn page_size(&self, page: usize) -> Option<SizeF> {
        self.lock().pages.get(page).map(|p| p.size)
    }

    fn subscribe(&self) -> Receiver<DocumentStatus> {
        self.notifier.subscribe()
    }

    fn render_page(&self, page: usize, resolution: f64) -> Result<Bitmap, DocumentError> {
        let file = {
            let inner = self.lock();
            if inner.status != DocumentStatus::Ready {
                return Err(DocumentError::NotReady(inner.status));
            }
            inner
                .pages
                .get(page)
                .cloned()
                .ok_or(DocumentError::PageOutOfRange {
                    page,
                    count: inner.pages.len(),
                })?
        };

        let target = file.size.scaled(resolution).to_size();
        if target.is_empty() {
            return Err(DocumentError::generic(format!(
                "page {page} is empty at resolution {resolution}"
            )));
        }

        let decoded = image::open(&file.path)?.to_rgb8();
        let scaled = resize_rgb(decoded, target.width, target.height)?;
        Ok(Bitmap::new(scaled))
    }
}
