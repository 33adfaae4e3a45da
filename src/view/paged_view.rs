//! Continuous-scroll view over a paged document

use std::collections::HashSet;
use std::sync::Arc;

use flume::{Receiver, Sender};
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;

use super::cache::{DEFAULT_PAGE_CACHE_LIMIT, RenderedPageCache};
use super::layout::{DEFAULT_PAGE_SPACING, PageLayout};
use super::paint::{BufferPainter, Painter};
use crate::document::{Document, DocumentStatus};
use crate::geometry::{PixelRect, Size, SizeF};
use crate::render::{
    Bitmap, Color, DARK_GRAY, Generation, PageCompletion, PageRenderer, PageRequest,
    RenderDelegate, RenderFault, WHITE, busy_icon,
};

/// Notifications for whoever hosts the view
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ViewEvent {
    /// Zoom was set or pages were laid out again
    ZoomChanged(f64),
    /// Pages touched by the last paint, inclusive
    ShowingPageRange { top: usize, bottom: usize },
}

/// Inclusive range of pages drawn by a paint
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PageRange {
    pub top: usize,
    pub bottom: usize,
}

/// Construction-time options for [`PagedView`]
#[derive(Clone, Debug)]
pub struct ViewOptions {
    pub page_cache_limit: usize,
    pub page_spacing: u32,
    /// Device pixels per document unit at zoom 1.0
    pub screen_scale: f64,
    pub background: Color,
    pub placeholder_background: Color,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            page_cache_limit: DEFAULT_PAGE_CACHE_LIMIT,
            page_spacing: DEFAULT_PAGE_SPACING,
            screen_scale: 1.0,
            background: DARK_GRAY,
            placeholder_background: WHITE,
        }
    }
}

/// Stacks the pages of a document vertically, renders the visible ones
/// asynchronously and keeps the most recently rendered bitmaps.
///
/// All methods run on the thread that owns the view. Status changes and
/// render completions queue up until [`PagedView::process_pending`].
pub struct PagedView {
    document: Option<Arc<dyn Document>>,
    status_rx: Option<Receiver<DocumentStatus>>,
    renderer: Box<dyn RenderDelegate>,
    layout: PageLayout,
    cache: RenderedPageCache,
    generation: Generation,
    /// Pages with a request in flight for the current generation
    in_flight: HashSet<usize>,
    /// Pages whose render failed in the current generation
    failed: HashSet<usize>,
    background: Color,
    placeholder_background: Color,
    placeholder_icon: Bitmap,
    width: u32,
    top_page_showing: usize,
    bottom_page_showing: usize,
    listeners: Vec<Sender<ViewEvent>>,
    needs_repaint: bool,
}

impl PagedView {
    /// View with a threaded renderer
    #[must_use]
    pub fn new(options: ViewOptions, workers: usize) -> Self {
        Self::with_renderer(options, Box::new(PageRenderer::with_workers(workers)))
    }

    #[must_use]
    pub fn with_renderer(options: ViewOptions, renderer: Box<dyn RenderDelegate>) -> Self {
        Self {
            document: None,
            status_rx: None,
            renderer,
            layout: PageLayout::new(options.screen_scale, options.page_spacing),
            cache: RenderedPageCache::new(options.page_cache_limit),
            generation: Generation::default(),
            in_flight: HashSet::new(),
            failed: HashSet::new(),
            background: options.background,
            placeholder_background: options.placeholder_background,
            placeholder_icon: busy_icon(),
            width: 0,
            top_page_showing: 0,
            bottom_page_showing: 0,
            listeners: Vec::new(),
            needs_repaint: true,
        }
    }

    /// Register a listener for [`ViewEvent`]s
    pub fn subscribe(&mut self) -> Receiver<ViewEvent> {
        let (tx, rx) = flume::unbounded();
        self.listeners.push(tx);
        rx
    }

    fn emit(&mut self, event: ViewEvent) {
        self.listeners.retain(|tx| tx.send(event).is_ok());
    }

    /// Bind `document`, follow its status changes, and lay it out now
    pub fn set_document(&mut self, document: Arc<dyn Document>) {
        self.renderer.set_document(Some(Arc::clone(&document)));
        self.status_rx = Some(document.subscribe());
        self.document = Some(document);
        self.document_status_changed();
    }

    /// Unbind the current document; the view becomes empty
    pub fn clear_document(&mut self) {
        self.renderer.set_document(None);
        self.status_rx = None;
        self.document = None;
        self.document_status_changed();
    }

    #[must_use]
    pub fn document(&self) -> Option<&Arc<dyn Document>> {
        self.document.as_ref()
    }

    #[must_use]
    pub fn document_status(&self) -> DocumentStatus {
        self.document
            .as_ref()
            .map_or(DocumentStatus::Null, |doc| doc.status())
    }

    /// Set the zoom factor and lay everything out again.
    /// The factor is taken as is; keeping it positive is up to the caller.
    pub fn set_zoom(&mut self, factor: f64) {
        self.layout.set_zoom(factor);
        self.emit(ViewEvent::ZoomChanged(factor));
        self.invalidate();
    }

    #[must_use]
    pub fn zoom(&self) -> f64 {
        self.layout.zoom()
    }

    #[must_use]
    pub fn screen_scale(&self) -> f64 {
        self.layout.screen_scale()
    }

    #[must_use]
    pub fn page_spacing(&self) -> u32 {
        self.layout.spacing()
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.layout.page_count()
    }

    /// Size of `page` in device pixels at the current zoom
    #[must_use]
    pub fn page_size(&self, page: usize) -> Option<SizeF> {
        self.layout.page_size(page)
    }

    /// Minimum size a scroll container must give the view
    #[must_use]
    pub fn total_size(&self) -> Size {
        self.layout.total_size()
    }

    /// Width pages are centred in: the container width, or the widest
    /// page when that is wider.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width.max(self.layout.total_size().width)
    }

    pub fn resize(&mut self, width: u32) {
        if self.width != width {
            self.width = width;
            self.needs_repaint = true;
        }
    }

    #[must_use]
    pub fn y_for_page(&self, end_page: usize) -> u32 {
        self.layout.y_for_page(end_page)
    }

    /// Page under content row `y`
    #[must_use]
    pub fn page_at(&self, y: u32) -> Option<usize> {
        self.layout.page_at(y)
    }

    #[must_use]
    pub fn showing_range(&self) -> PageRange {
        PageRange {
            top: self.top_page_showing,
            bottom: self.bottom_page_showing,
        }
    }

    #[must_use]
    pub fn cache(&self) -> &RenderedPageCache {
        &self.cache
    }

    #[must_use]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    #[must_use]
    pub fn is_in_flight(&self, page: usize) -> bool {
        self.in_flight.contains(&page)
    }

    #[must_use]
    pub fn needs_repaint(&self) -> bool {
        self.needs_repaint
    }

    /// Lay the pages out again and drop every rendered bitmap
    pub fn invalidate(&mut self) {
        let total = self.layout.relayout();
        self.emit(ViewEvent::ZoomChanged(self.layout.zoom()));
        log::debug!(
            "total size {}x{} for {} pages at zoom {:.2}",
            total.width,
            total.height,
            self.layout.page_count(),
            self.layout.zoom()
        );
        self.cache.clear();
        self.generation = self.generation.next();
        self.in_flight.clear();
        self.failed.clear();
        self.needs_repaint = true;
    }

    fn document_status_changed(&mut self) {
        self.layout.clear();
        self.top_page_showing = 0;

        if let Some(document) = &self.document {
            let status = document.status();
            log::debug!("document status: {}", status.as_str());
            if status == DocumentStatus::Ready {
                self.layout.populate(document.as_ref());
            }
        }

        self.invalidate();
    }

    /// Handle queued status changes and render completions.
    /// Returns true when the view needs to be painted again.
    pub fn process_pending(&mut self) -> bool {
        let status_changed = self
            .status_rx
            .as_ref()
            .is_some_and(|rx| rx.try_iter().count() > 0);
        if status_changed {
            // Statuses are re-read from the document, so a burst of
            // changes collapses into one refresh.
            self.document_status_changed();
        }

        for completion in self.renderer.poll_completions() {
            self.page_loaded(completion);
        }

        self.needs_repaint
    }

    fn page_loaded(&mut self, completion: PageCompletion) {
        let PageCompletion {
            page,
            resolution,
            generation,
            outcome,
        } = completion;

        if generation != self.generation {
            log::trace!(
                "dropping page {page} rendered at {resolution:.3} for generation {} (now {})",
                generation.0,
                self.generation.0
            );
            return;
        }
        self.in_flight.remove(&page);

        match outcome {
            Ok(bitmap) => {
                if let Some(evicted) = self.cache.insert(page, bitmap) {
                    log::trace!("evicted page {evicted} from render cache");
                }
                self.needs_repaint = true;
            }
            Err(RenderFault::Cancelled) => {}
            Err(e) => {
                log::warn!("failed to render page {page}: {e}");
                self.failed.insert(page);
            }
        }
    }

    /// Paint the part of the content inside `visible` and request any
    /// page in it that is not rendered yet.
    ///
    /// Returns the pages touched, or `None` when there is nothing to show.
    pub fn paint(&mut self, painter: &mut dyn Painter, visible: PixelRect) -> Option<PageRange> {
        self.needs_repaint = false;
        painter.fill_rect(visible, self.background);

        let page_count = self.layout.page_count();
        if page_count == 0 {
            return None;
        }

        let (mut page, mut y) = self.layout.first_visible(visible.top());
        // Past the last page only the trailing spacing shows; report the last page.
        self.top_page_showing = page.min(page_count - 1);

        let width = i64::from(self.width());
        let resolution = self.layout.resolution();
        while y < i64::from(visible.bottom()) && page < page_count {
            let size = self.layout.page_pixel_size(page).unwrap_or_default();
            let top = saturating_i32(y);
            let page_x = saturating_i32((width - i64::from(size.width)) / 2);
            let page_rect = PixelRect::from_origin(page_x, top, size);

            if let Some(bitmap) = self.cache.get(page) {
                let bitmap_x = saturating_i32((width - i64::from(bitmap.width())) / 2);
                painter.fill_rect(page_rect, WHITE);
                painter.draw_bitmap(bitmap_x, top, bitmap);
            } else {
                painter.fill_rect(page_rect, self.placeholder_background);
                let icon = &self.placeholder_icon;
                if icon.width() <= size.width && icon.height() <= size.height {
                    let icon_x = saturating_i32(
                        i64::from(page_x) + (i64::from(size.width) - i64::from(icon.width())) / 2,
                    );
                    let icon_y = saturating_i32(
                        y + (i64::from(size.height) - i64::from(icon.height())) / 2,
                    );
                    painter.draw_bitmap(icon_x, icon_y, icon);
                }
                self.request_page(page, resolution);
            }

            y += i64::from(size.height) + i64::from(self.layout.spacing());
            page += 1;
        }

        self.bottom_page_showing = page.saturating_sub(1).max(self.top_page_showing);
        let range = self.showing_range();
        self.emit(ViewEvent::ShowingPageRange {
            top: range.top,
            bottom: range.bottom,
        });
        Some(range)
    }

    fn request_page(&mut self, page: usize, resolution: f64) {
        if self.failed.contains(&page) || !self.in_flight.insert(page) {
            return;
        }
        self.renderer.request_page(PageRequest {
            page,
            resolution,
            generation: self.generation,
        });
    }

    /// Paint into a ratatui buffer with the content scrolled to `scroll_y`
    pub fn render_viewport(&mut self, area: Rect, buf: &mut Buffer, scroll_y: u32) -> Option<PageRange> {
        let origin_y = i32::try_from(scroll_y).unwrap_or(i32::MAX);
        let mut painter = BufferPainter::new(buf, area, (0, origin_y));
        let visible = painter.visible_rect();
        self.paint(&mut painter, visible)
    }
}

fn saturating_i32(value: i64) -> i32 {
    i32::try_from(value).unwrap_or(if value < 0 { i32::MIN } else { i32::MAX })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MemoryDocument;
    use crate::test_utils::test_helpers::{ManualRenderer, RecordingPainter, three_page_document};

    fn view_with(doc: Arc<MemoryDocument>) -> (PagedView, ManualRenderer) {
        let renderer = ManualRenderer::new();
        let mut view =
            PagedView::with_renderer(ViewOptions::default(), Box::new(renderer.clone()));
        view.set_document(doc);
        (view, renderer)
    }

    fn paint(view: &mut PagedView, top: i32, height: u32) -> (RecordingPainter, Option<PageRange>) {
        let mut painter = RecordingPainter::new();
        let range = view.paint(&mut painter, PixelRect::new(0, top, 80, height));
        (painter, range)
    }

    #[test]
    fn set_document_lays_out_ready_document() {
        let (view, renderer) = view_with(three_page_document());

        assert!(renderer.has_document());
        assert_eq!(view.page_count(), 3);
        assert_eq!(view.total_size(), Size::new(80, 382));
        assert_eq!(view.y_for_page(2), 259);
    }

    #[test]
    fn set_zoom_scales_pages_and_clears_cache() {
        let (mut view, renderer) = view_with(three_page_document());
        paint(&mut view, 0, 50);
        renderer.complete_all();
        view.process_pending();
        assert_eq!(view.cache().len(), 1);

        view.set_zoom(2.0);

        assert_eq!(view.page_size(1), Some(SizeF::new(160.0, 300.0)));
        assert!(view.cache().is_empty());
        assert_eq!(view.total_size(), Size::new(160, 3 + 200 + 3 + 300 + 3 + 240 + 3));
    }

    #[test]
    fn set_zoom_notifies_listeners() {
        let (mut view, _renderer) = view_with(three_page_document());
        let events = view.subscribe();

        view.set_zoom(1.5);

        let received: Vec<_> = events.try_iter().collect();
        assert!(received.contains(&ViewEvent::ZoomChanged(1.5)));
    }

    #[test]
    fn relayout_is_idempotent() {
        let (mut view, _renderer) = view_with(three_page_document());
        view.invalidate();
        let first = view.total_size();
        view.invalidate();

        assert_eq!(view.total_size(), first);
        assert!(view.cache().is_empty());
    }

    #[test]
    fn paint_requests_missing_page_and_draws_placeholder() {
        let (mut view, renderer) = view_with(three_page_document());
        let events = view.subscribe();

        let (painter, range) = paint(&mut view, 0, 50);

        assert_eq!(range, Some(PageRange { top: 0, bottom: 0 }));
        let pending = renderer.pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].page, 0);
        assert!((pending[0].resolution - 1.0).abs() < f64::EPSILON);
        // Background, then the placeholder page rect at the top of page 0.
        let fills = painter.fills();
        assert_eq!(fills[0], (PixelRect::new(0, 0, 80, 50), DARK_GRAY));
        assert_eq!(fills[1], (PixelRect::new(0, 3, 80, 100), WHITE));
        // The busy icon is centred in the page.
        let icon = busy_icon();
        assert_eq!(
            painter.bitmaps(),
            vec![(
                (80 - icon.width() as i32) / 2,
                3 + (100 - icon.height() as i32) / 2,
                icon.size()
            )]
        );
        assert!(events
            .try_iter()
            .any(|e| e == ViewEvent::ShowingPageRange { top: 0, bottom: 0 }));
    }

    #[test]
    fn completed_page_is_drawn_and_not_requested_again() {
        let (mut view, renderer) = view_with(three_page_document());
        paint(&mut view, 0, 50);
        assert_eq!(renderer.complete_all(), 1);

        assert!(view.process_pending());
        assert!(view.cache().contains(0));

        let (painter, _) = paint(&mut view, 0, 50);
        assert_eq!(painter.bitmaps(), vec![(0, 3, Size::new(80, 100))]);
        assert!(renderer.pending().is_empty());
    }

    #[test]
    fn in_flight_page_is_not_requested_twice() {
        let (mut view, renderer) = view_with(three_page_document());
        paint(&mut view, 0, 50);
        paint(&mut view, 0, 50);

        assert_eq!(renderer.pending().len(), 1);
        assert!(view.is_in_flight(0));
    }

    #[test]
    fn paint_spanning_pages_reports_range() {
        let (mut view, renderer) = view_with(three_page_document());

        let (_, range) = paint(&mut view, 120, 200);

        assert_eq!(range, Some(PageRange { top: 1, bottom: 2 }));
        let pages: Vec<usize> = renderer.pending().iter().map(|r| r.page).collect();
        assert_eq!(pages, vec![1, 2]);
    }

    #[test]
    fn stale_completion_is_discarded() {
        let (mut view, renderer) = view_with(three_page_document());
        paint(&mut view, 0, 50);
        let stale = renderer.pending()[0];

        view.set_zoom(2.0);
        renderer.complete_with(stale, Bitmap::solid(Size::new(80, 100), WHITE));
        view.process_pending();

        assert!(view.cache().is_empty());
        assert!(stale.generation < view.generation());
    }

    #[test]
    fn failed_page_keeps_placeholder_until_relayout() {
        let (mut view, renderer) = view_with(three_page_document());
        paint(&mut view, 0, 50);
        let request = renderer.pending()[0];
        renderer.fail(request, RenderFault::generic("boom"));
        view.process_pending();

        paint(&mut view, 0, 50);
        assert!(renderer.pending().is_empty());

        view.invalidate();
        paint(&mut view, 0, 50);
        assert_eq!(renderer.pending().len(), 1);
    }

    #[test]
    fn cache_respects_limit_with_eviction_in_arrival_order() {
        let doc = Arc::new(MemoryDocument::with_pages(vec![SizeF::new(10.0, 10.0); 30]));
        let renderer = ManualRenderer::new();
        let options = ViewOptions {
            page_cache_limit: 4,
            ..ViewOptions::default()
        };
        let mut view = PagedView::with_renderer(options, Box::new(renderer.clone()));
        view.set_document(doc);

        let mut painter = RecordingPainter::new();
        view.paint(&mut painter, PixelRect::new(0, 0, 10, 10_000));
        assert_eq!(renderer.pending().len(), 30);
        for request in renderer.pending() {
            renderer.complete_with(request, Bitmap::solid(Size::new(10, 10), WHITE));
            view.process_pending();
            assert!(view.cache().len() <= 4);
        }
        assert_eq!(view.cache().insertion_order(), vec![26, 27, 28, 29]);
    }

    #[test]
    fn status_change_to_not_ready_empties_layout() {
        let doc = three_page_document();
        let (mut view, _renderer) = view_with(Arc::clone(&doc));

        doc.set_status(DocumentStatus::Unloading);
        assert!(view.process_pending());

        assert_eq!(view.page_count(), 0);
        assert_eq!(view.total_size(), Size::new(0, 3));
        let (painter, range) = paint(&mut view, 0, 50);
        assert_eq!(range, None);
        assert_eq!(painter.ops.len(), 1);
    }

    #[test]
    fn document_becoming_ready_populates_pages() {
        let doc = Arc::new(MemoryDocument::new());
        let (mut view, _renderer) = view_with(Arc::clone(&doc));
        assert_eq!(view.page_count(), 0);

        doc.load(vec![SizeF::new(50.0, 70.0)]);
        view.process_pending();

        assert_eq!(view.page_count(), 1);
        assert_eq!(view.total_size(), Size::new(50, 76));
    }

    #[test]
    fn trailing_spacing_reports_last_page() {
        let (mut view, renderer) = view_with(three_page_document());
        let events = view.subscribe();

        let (painter, range) = paint(&mut view, 380, 2);

        assert_eq!(range, Some(PageRange { top: 2, bottom: 2 }));
        assert_eq!(painter.ops.len(), 1);
        assert!(renderer.pending().is_empty());
        assert!(events
            .try_iter()
            .any(|e| e == ViewEvent::ShowingPageRange { top: 2, bottom: 2 }));
    }

    #[test]
    fn last_rows_of_a_page_are_painted() {
        let (mut view, renderer) = view_with(three_page_document());

        let (painter, range) = paint(&mut view, 101, 10);

        assert_eq!(range, Some(PageRange { top: 0, bottom: 1 }));
        let fills = painter.fills();
        assert_eq!(fills[1].0, PixelRect::new(0, 3, 80, 100));
        assert_eq!(fills[2].0, PixelRect::new(0, 106, 80, 150));
        let pages: Vec<usize> = renderer.pending().iter().map(|r| r.page).collect();
        assert_eq!(pages, vec![0, 1]);
    }

    #[test]
    fn pixel_coordinates_saturate() {
        assert_eq!(saturating_i32(259), 259);
        assert_eq!(saturating_i32(i64::from(i32::MAX) + 1), i32::MAX);
        assert_eq!(saturating_i32(i64::from(i32::MIN) - 1), i32::MIN);
    }

    #[test]
    fn out_of_range_page_size_is_none() {
        let (view, _renderer) = view_with(three_page_document());
        assert_eq!(view.page_size(3), None);
    }

    #[test]
    fn clear_document_unbinds() {
        let (mut view, renderer) = view_with(three_page_document());
        view.clear_document();

        assert!(!renderer.has_document());
        assert_eq!(view.page_count(), 0);
        assert_eq!(view.document_status(), DocumentStatus::Null);
    }

    #[test]
    fn pages_are_centred_in_wider_view() {
        let (mut view, _renderer) = view_with(three_page_document());
        view.resize(200);

        let (painter, _) = paint(&mut view, 0, 50);

        assert_eq!(painter.fills()[1].0, PixelRect::new(60, 3, 80, 100));
    }
}
