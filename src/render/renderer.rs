//! Render delegate - owns the worker pool

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use flume::{Receiver, Sender};

use super::DEFAULT_WORKERS;
use super::request::{PageCompletion, PageRequest, RenderFault, RenderRequest, RenderResponse, RequestId};
use super::worker::render_worker;
use crate::document::Document;

/// Turns page requests into bitmaps, asynchronously.
///
/// Every accepted request yields exactly one [`PageCompletion`] from a
/// later `poll_completions` call, never from inside `request_page`.
pub trait RenderDelegate {
    fn set_document(&mut self, document: Option<Arc<dyn Document>>);

    /// Fire and forget
    fn request_page(&mut self, request: PageRequest);

    /// Drain the completions that have arrived so far
    fn poll_completions(&mut self) -> Vec<PageCompletion>;
}

/// Threaded render delegate backed by a pool of workers
pub struct PageRenderer {
    document: Option<Arc<dyn Document>>,
    request_tx: Sender<RenderRequest>,
    response_tx: Sender<RenderResponse>,
    response_rx: Receiver<RenderResponse>,
    latest_generation: Arc<AtomicU64>,
    next_request_id: u64,
    num_workers: usize,
}

impl PageRenderer {
    /// Create a renderer with the default number of workers
    #[must_use]
    pub fn new() -> Self {
        Self::with_workers(DEFAULT_WORKERS)
    }

    #[must_use]
    pub fn with_workers(num_workers: usize) -> Self {
        // Workers share one request queue (fan-out), which needs MPMC
        // channels: flume receivers can be cloned, std::sync::mpsc ones cannot.
        let (request_tx, request_rx) = flume::unbounded();
        let (response_tx, response_rx) = flume::unbounded();
        let latest_generation = Arc::new(AtomicU64::new(0));

        let num_workers = num_workers.max(1);
        for _ in 0..num_workers {
            let rx = request_rx.clone();
            let tx = response_tx.clone();
            let latest = Arc::clone(&latest_generation);

            std::thread::spawn(move || {
                render_worker(rx, tx, latest);
            });
        }
        log::debug!("PageRenderer: spawned {num_workers} render workers");

        Self {
            document: None,
            request_tx,
            response_tx,
            response_rx,
            latest_generation,
            next_request_id: 1,
            num_workers,
        }
    }

    /// Get the response receiver, e.g. to `select` on it in an event loop
    #[must_use]
    pub fn response_receiver(&self) -> &Receiver<RenderResponse> {
        &self.response_rx
    }

    /// Shutdown all workers
    pub fn shutdown(&self) {
        for _ in 0..self.num_workers {
            let _ = self.request_tx.send(RenderRequest::Shutdown);
        }
    }

    fn next_id(&mut self) -> RequestId {
        let id = RequestId::new(self.next_request_id);
        self.next_request_id += 1;
        id
    }
}

impl Default for PageRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderDelegate for PageRenderer {
    fn set_document(&mut self, document: Option<Arc<dyn Document>>) {
        self.document = document;
    }

    fn request_page(&mut self, request: PageRequest) {
        let id = self.next_id();
        self.latest_generation
            .fetch_max(request.generation.0, Ordering::AcqRel);

        let Some(document) = self.document.clone() else {
            // Still answered through the queue so the caller sees it later.
            let _ = self.response_tx.send(RenderResponse::Error {
                id,
                request,
                error: RenderFault::NoDocument,
            });
            return;
        };

        log::trace!(
            "PageRenderer: request {:?} page {} at {:.3}",
            id,
            request.page,
            request.resolution
        );
        let _ = self.request_tx.send(RenderRequest::Page {
            id,
            request,
            document,
        });
    }

    fn poll_completions(&mut self) -> Vec<PageCompletion> {
        self.response_rx
            .try_iter()
            .map(RenderResponse::into_completion)
            .collect()
    }
}

impl Drop for PageRenderer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
