//! Terminal host for the paged view: scrolling, zoom keys, status line

use std::time::Duration;

use anyhow::Result;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind};
use flume::Receiver;
use log::debug;
use ratatui::{
    Frame, Terminal,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Span,
    widgets::Paragraph,
};

use crate::document::DocumentStatus;
use crate::event_source::EventSource;
use crate::view::{PageRange, PagedView, ViewEvent};
use crate::zoom::{ScrollDirection, Zoom};

/// Terminal rows scrolled by one `j`/`k`
const LINE_STEP_ROWS: u32 = 2;
/// Each terminal row shows two pixel rows
const PIXELS_PER_ROW: u32 = 2;
const FRAME_BUDGET: Duration = Duration::from_millis(16);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppAction {
    Quit,
}

pub struct App {
    view: PagedView,
    view_events: Receiver<ViewEvent>,
    zoom: Zoom,
    title: String,
    showing: Option<PageRange>,
    /// Content area from the last draw
    viewport: Rect,
    dirty: bool,
}

impl App {
    pub fn new(mut view: PagedView, title: impl Into<String>, zoom: f64) -> Self {
        let view_events = view.subscribe();
        let zoom = Zoom::with_factor(zoom);
        if (view.zoom() - zoom.factor()).abs() > f64::EPSILON {
            view.set_zoom(zoom.factor());
        }
        Self {
            view,
            view_events,
            zoom,
            title: title.into(),
            showing: None,
            viewport: Rect::default(),
            dirty: true,
        }
    }

    pub fn view(&self) -> &PagedView {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut PagedView {
        &mut self.view
    }

    pub fn scroll_offset(&self) -> u32 {
        self.zoom.scroll_offset
    }

    pub fn zoom_factor(&self) -> f64 {
        self.zoom.factor()
    }

    /// Pages shown by the last paint
    pub fn showing(&self) -> Option<PageRange> {
        self.showing
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn viewport_height_px(&self) -> u32 {
        u32::from(self.viewport.height) * PIXELS_PER_ROW
    }

    fn max_scroll(&self) -> u32 {
        self.view
            .total_size()
            .height
            .saturating_sub(self.viewport_height_px())
    }

    /// Page at the top edge of the viewport
    fn anchor_page(&self) -> usize {
        self.view
            .page_at(self.zoom.scroll_offset)
            .unwrap_or_default()
    }

    /// Pick up document changes, finished renders and view notifications
    pub fn tick(&mut self) {
        if self.view.process_pending() {
            self.dirty = true;
        }
        for event in self.view_events.try_iter() {
            match event {
                ViewEvent::ShowingPageRange { top, bottom } => {
                    self.showing = Some(PageRange { top, bottom });
                }
                ViewEvent::ZoomChanged(factor) => {
                    debug!("zoom changed to {:.0}%", factor * 100.0);
                    // The content height may have shrunk under the viewport.
                    let max = self.max_scroll();
                    self.zoom.scroll_to(self.zoom.scroll_offset, max);
                    self.dirty = true;
                }
            }
        }
    }

    pub fn handle_event(&mut self, event: Event) -> Option<AppAction> {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key),
            Event::Resize(..) => {
                self.dirty = true;
                None
            }
            _ => None,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<AppAction> {
        let line = LINE_STEP_ROWS * PIXELS_PER_ROW;
        let screen = self.viewport_height_px().saturating_sub(line).max(line);
        let max = self.max_scroll();

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Some(AppAction::Quit),
            KeyCode::Char('j') | KeyCode::Down => {
                self.zoom.scroll(ScrollDirection::Down, line, max);
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.zoom.scroll(ScrollDirection::Up, line, max);
            }
            KeyCode::PageDown | KeyCode::Char(' ') => {
                self.zoom.scroll(ScrollDirection::Down, screen, max);
            }
            KeyCode::PageUp => {
                self.zoom.scroll(ScrollDirection::Up, screen, max);
            }
            KeyCode::Char('g') | KeyCode::Home => self.zoom.scroll_to(0, max),
            KeyCode::Char('G') | KeyCode::End => self.zoom.scroll_to(max, max),
            KeyCode::Char('n') => self.go_to_page(self.anchor_page() + 1),
            KeyCode::Char('p') => {
                let page = self.anchor_page();
                let page_top = self.page_top(page);
                if self.zoom.scroll_offset > page_top {
                    self.go_to_page(page);
                } else {
                    self.go_to_page(page.saturating_sub(1));
                }
            }
            KeyCode::Char('+') | KeyCode::Char('=') => self.apply_zoom(Zoom::step_in),
            KeyCode::Char('-') => self.apply_zoom(Zoom::step_out),
            KeyCode::Char('0') => self.apply_zoom(Zoom::reset),
            _ => return None,
        }
        self.dirty = true;
        None
    }

    /// Scroll offset that puts the top edge of `page` at the top of the viewport
    fn page_top(&self, page: usize) -> u32 {
        self.view.y_for_page(page)
    }

    pub fn go_to_page(&mut self, page: usize) {
        let last = self.view.page_count().saturating_sub(1);
        let offset = self.page_top(page.min(last));
        let max = self.max_scroll();
        self.zoom.scroll_to(offset, max);
        self.dirty = true;
    }

    fn apply_zoom(&mut self, step: fn(&mut Zoom)) {
        let anchor = self.anchor_page();
        step(&mut self.zoom);
        self.view.set_zoom(self.zoom.factor());
        self.go_to_page(anchor);
    }

    pub fn draw(&mut self, frame: &mut Frame<'_>) {
        let [content, status] =
            Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(frame.area());
        self.viewport = content;
        self.view.resize(u32::from(content.width));
        let max = self.max_scroll();
        self.zoom.scroll_to(self.zoom.scroll_offset, max);

        let painted = self
            .view
            .render_viewport(content, frame.buffer_mut(), self.zoom.scroll_offset);
        if painted.is_none() {
            self.render_message(frame, content);
        }

        frame.render_widget(self.status_line(), status);
        self.dirty = false;
    }

    fn render_message(&self, frame: &mut Frame<'_>, area: Rect) {
        let message = match self.view.document_status() {
            DocumentStatus::Loading => "[ LOADING ]",
            DocumentStatus::Error => "[ FAILED TO LOAD ]",
            DocumentStatus::Ready => "[ EMPTY DOCUMENT ]",
            DocumentStatus::Null | DocumentStatus::Unloading => "[ NO DOCUMENT ]",
        };
        let [row] = Layout::vertical([Constraint::Length(1)])
            .flex(Flex::Center)
            .areas(area);
        let [cell] = Layout::horizontal([Constraint::Length(message.len() as u16)])
            .flex(Flex::Center)
            .areas(row);
        let span = Span::styled(
            message,
            Style::new()
                .fg(Color::White)
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        );
        frame.render_widget(span, cell);
    }

    fn status_line(&self) -> Paragraph<'static> {
        let count = self.view.page_count();
        let pages = match self.showing {
            Some(range) if count > 0 => {
                format!("pages {}-{} / {count}", range.top + 1, range.bottom + 1)
            }
            _ => format!("{count} pages"),
        };
        let text = format!(
            " {} │ {pages} │ {:.0}% │ {}",
            self.title,
            self.zoom.factor() * 100.0,
            self.view.document_status().as_str()
        );
        Paragraph::new(text).style(Style::new().fg(Color::Black).bg(Color::Gray))
    }
}

/// Drive the viewer until the user quits
pub fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    event_source: &mut dyn EventSource,
) -> Result<()>
where
    B::Error: Send + Sync + 'static,
{
    loop {
        app.tick();
        if app.is_dirty() {
            terminal.draw(|f| app.draw(f))?;
            // Painting may have requested pages; pick up what is already done.
            app.tick();
        }

        if event_source.poll(FRAME_BUDGET)? {
            let event = event_source.read()?;
            if app.handle_event(event) == Some(AppAction::Quit) {
                return Ok(());
            }
        }
    }
}
