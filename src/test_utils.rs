pub mod test_helpers {
    use std::sync::{Arc, Mutex, MutexGuard};

    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    use crate::document::{Document, MemoryDocument};
    use crate::event_source::{Event, KeyCode, SimulatedEventSource};
    use crate::geometry::{PixelRect, Size, SizeF};
    use crate::render::{
        Bitmap, Color, PageCompletion, PageRequest, RenderDelegate, RenderFault,
    };
    use crate::view::Painter;

    /// Document with three 80-unit wide pages of heights 100, 150 and 120
    pub fn three_page_document() -> Arc<MemoryDocument> {
        Arc::new(MemoryDocument::with_pages(vec![
            SizeF::new(80.0, 100.0),
            SizeF::new(80.0, 150.0),
            SizeF::new(80.0, 120.0),
        ]))
    }

    #[derive(Default)]
    struct Shared {
        document: Option<Arc<dyn Document>>,
        requests: Vec<PageRequest>,
        ready: Vec<PageCompletion>,
    }

    /// Render delegate that does nothing until told to.
    ///
    /// Clones share state, so a test keeps one clone and hands the other
    /// to the view.
    #[derive(Clone, Default)]
    pub struct ManualRenderer {
        shared: Arc<Mutex<Shared>>,
    }

    impl ManualRenderer {
        pub fn new() -> Self {
            Self::default()
        }

        fn lock(&self) -> MutexGuard<'_, Shared> {
            self.shared
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
        }

        /// Requests received and not yet completed
        pub fn pending(&self) -> Vec<PageRequest> {
            self.lock().requests.clone()
        }

        pub fn has_document(&self) -> bool {
            self.lock().document.is_some()
        }

        /// Queue a completion carrying `bitmap` for `request`
        pub fn complete_with(&self, request: PageRequest, bitmap: Bitmap) {
            let mut shared = self.lock();
            shared.requests.retain(|r| *r != request);
            shared.ready.push(PageCompletion {
                page: request.page,
                resolution: request.resolution,
                generation: request.generation,
                outcome: Ok(bitmap),
            });
        }

        pub fn fail(&self, request: PageRequest, fault: RenderFault) {
            let mut shared = self.lock();
            shared.requests.retain(|r| *r != request);
            shared.ready.push(PageCompletion {
                page: request.page,
                resolution: request.resolution,
                generation: request.generation,
                outcome: Err(fault),
            });
        }

        /// Render every pending request with the bound document.
        /// Returns how many completions were queued.
        pub fn complete_all(&self) -> usize {
            let mut shared = self.lock();
            let requests = std::mem::take(&mut shared.requests);
            let document = shared.document.clone();
            for request in &requests {
                let outcome = match &document {
                    Some(doc) => doc
                        .render_page(request.page, request.resolution)
                        .map_err(RenderFault::from),
                    None => Err(RenderFault::NoDocument),
                };
                shared.ready.push(PageCompletion {
                    page: request.page,
                    resolution: request.resolution,
                    generation: request.generation,
                    outcome,
                });
            }
            requests.len()
        }
    }

    impl RenderDelegate for ManualRenderer {
        fn set_document(&mut self, document: Option<Arc<dyn Document>>) {
            self.lock().document = document;
        }

        fn request_page(&mut self, request: PageRequest) {
            self.lock().requests.push(request);
        }

        fn poll_completions(&mut self) -> Vec<PageCompletion> {
            std::mem::take(&mut self.lock().ready)
        }
    }

    /// One call made on a [`RecordingPainter`]
    #[derive(Clone, Debug, PartialEq)]
    pub enum PaintOp {
        Fill { rect: PixelRect, color: Color },
        Bitmap { x: i32, y: i32, size: Size },
    }

    /// Painter that remembers what it was asked to draw
    #[derive(Default)]
    pub struct RecordingPainter {
        pub ops: Vec<PaintOp>,
    }

    impl RecordingPainter {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn fills(&self) -> Vec<(PixelRect, Color)> {
            self.ops
                .iter()
                .filter_map(|op| match op {
                    PaintOp::Fill { rect, color } => Some((*rect, *color)),
                    PaintOp::Bitmap { .. } => None,
                })
                .collect()
        }

        pub fn bitmaps(&self) -> Vec<(i32, i32, Size)> {
            self.ops
                .iter()
                .filter_map(|op| match op {
                    PaintOp::Bitmap { x, y, size } => Some((*x, *y, *size)),
                    PaintOp::Fill { .. } => None,
                })
                .collect()
        }
    }

    impl Painter for RecordingPainter {
        fn fill_rect(&mut self, rect: PixelRect, color: Color) {
            self.ops.push(PaintOp::Fill { rect, color });
        }

        fn draw_bitmap(&mut self, x: i32, y: i32, bitmap: &Bitmap) {
            self.ops.push(PaintOp::Bitmap {
                x,
                y,
                size: bitmap.size(),
            });
        }
    }

    /// Builder for scripted key sequences
    #[derive(Default)]
    pub struct TestScenarioBuilder {
        events: Vec<Event>,
    }

    impl TestScenarioBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn press_char(mut self, c: char) -> Self {
            self.events.push(SimulatedEventSource::char_key(c));
            self
        }

        pub fn press(mut self, code: KeyCode) -> Self {
            self.events.push(SimulatedEventSource::key(code));
            self
        }

        /// Scroll down n lines (press 'j' n times)
        pub fn scroll_down(mut self, times: usize) -> Self {
            for _ in 0..times {
                self.events.push(SimulatedEventSource::char_key('j'));
            }
            self
        }

        pub fn next_page(self) -> Self {
            self.press_char('n')
        }

        pub fn zoom_in(self) -> Self {
            self.press_char('+')
        }

        pub fn quit(self) -> Self {
            self.press_char('q')
        }

        pub fn build(self) -> SimulatedEventSource {
            SimulatedEventSource::new(self.events)
        }
    }

    /// Create a test terminal for snapshot testing
    pub fn create_test_terminal(width: u16, height: u16) -> Terminal<TestBackend> {
        let backend = TestBackend::new(width, height);
        Terminal::new(backend).expect("test backend never fails")
    }

    /// The bottom row of the terminal, trimmed: the viewer's status line
    pub fn status_line(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let y = buffer.area.height.saturating_sub(1);
        (0..buffer.area.width)
            .map(|x| buffer[(x, y)].symbol().to_string())
            .collect::<String>()
            .trim_end()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::test_helpers::*;
    use crate::geometry::{PixelRect, Size};
    use crate::render::{Bitmap, Generation, PageRequest, RenderDelegate, WHITE};
    use crate::view::Painter;

    #[test]
    fn scenario_builder_collects_events() {
        let scenario = TestScenarioBuilder::new()
            .scroll_down(2)
            .next_page()
            .zoom_in()
            .quit()
            .build();

        assert_eq!(scenario.remaining(), 5);
    }

    #[test]
    fn manual_renderer_completes_on_demand() {
        let mut renderer = ManualRenderer::new();
        let handle = renderer.clone();
        let request = PageRequest {
            page: 1,
            resolution: 1.0,
            generation: Generation(1),
        };

        renderer.request_page(request);
        assert!(renderer.poll_completions().is_empty());
        assert_eq!(handle.pending(), vec![request]);

        handle.complete_with(request, Bitmap::solid(Size::new(2, 2), WHITE));
        let done = renderer.poll_completions();
        assert_eq!(done.len(), 1);
        assert!(handle.pending().is_empty());
    }

    #[test]
    fn recording_painter_keeps_order() {
        let mut painter = RecordingPainter::new();
        painter.fill_rect(PixelRect::new(0, 0, 1, 1), WHITE);
        painter.draw_bitmap(3, 4, &Bitmap::solid(Size::new(2, 2), WHITE));

        assert_eq!(painter.fills().len(), 1);
        assert_eq!(painter.bitmaps(), vec![(3, 4, Size::new(2, 2))]);
    }
}
