//! Render worker - runs in separate thread(s)

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use flume::{Receiver, Sender};

use super::request::{PageRequest, RenderFault, RenderRequest, RenderResponse, RequestId};
use crate::document::Document;

/// Pull requests off the shared queue until `Shutdown` or hang-up.
///
/// `latest` holds the newest generation the renderer has handed out;
/// anything older is answered with `Cancelled` without touching the
/// document.
pub fn render_worker(
    requests: Receiver<RenderRequest>,
    responses: Sender<RenderResponse>,
    latest: Arc<AtomicU64>,
) {
    for request in requests {
        match request {
            RenderRequest::Page {
                id,
                request,
                document,
            } => {
                let response = if request.generation.0 < latest.load(Ordering::Acquire) {
                    log::trace!(
                        "worker: skipping stale page {} (generation {})",
                        request.page,
                        request.generation.0
                    );
                    RenderResponse::Cancelled { id, request }
                } else {
                    handle_page_request(document.as_ref(), id, request)
                };
                if responses.send(response).is_err() {
                    break;
                }
            }

            RenderRequest::Shutdown => break,
        }
    }
}

fn handle_page_request(document: &dyn Document, id: RequestId, request: PageRequest) -> RenderResponse {
    let started = std::time::Instant::now();
    match document.render_page(request.page, request.resolution) {
        Ok(bitmap) => {
            log::trace!(
                "worker: page {} at {:.3} -> {}x{} in {:?}",
                request.page,
                request.resolution,
                bitmap.width(),
                bitmap.height(),
                started.elapsed()
            );
            RenderResponse::Page {
                id,
                request,
                bitmap,
            }
        }
        Err(e) => RenderResponse::Error {
            id,
            request,
            error: RenderFault::from(e),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MemoryDocument;
    use crate::geometry::SizeF;
    use crate::render::Generation;

    fn spawn(latest: u64) -> (Sender<RenderRequest>, Receiver<RenderResponse>) {
        let (request_tx, request_rx) = flume::unbounded();
        let (response_tx, response_rx) = flume::unbounded();
        let latest = Arc::new(AtomicU64::new(latest));
        std::thread::spawn(move || render_worker(request_rx, response_tx, latest));
        (request_tx, response_rx)
    }

    fn page(page: usize, generation: u64) -> PageRequest {
        PageRequest {
            page,
            resolution: 1.0,
            generation: Generation(generation),
        }
    }

    #[test]
    fn renders_current_generation() {
        let doc: Arc<dyn Document> =
            Arc::new(MemoryDocument::with_pages(vec![SizeF::new(4.0, 6.0)]));
        let (tx, rx) = spawn(1);

        tx.send(RenderRequest::Page {
            id: RequestId::new(1),
            request: page(0, 1),
            document: doc,
        })
        .expect("send");

        match rx.recv().expect("response") {
            RenderResponse::Page { bitmap, .. } => {
                assert_eq!((bitmap.width(), bitmap.height()), (4, 6));
            }
            other => panic!("unexpected response: {other:?}"),
        }
        let _ = tx.send(RenderRequest::Shutdown);
    }

    #[test]
    fn skips_stale_generation() {
        let memory = Arc::new(MemoryDocument::with_pages(vec![SizeF::new(4.0, 6.0)]));
        let doc: Arc<dyn Document> = memory.clone();
        let (tx, rx) = spawn(3);

        tx.send(RenderRequest::Page {
            id: RequestId::new(7),
            request: page(0, 2),
            document: doc,
        })
        .expect("send");

        assert!(matches!(
            rx.recv().expect("response"),
            RenderResponse::Cancelled { id: RequestId(7), .. }
        ));
        assert_eq!(memory.render_count(), 0);
        let _ = tx.send(RenderRequest::Shutdown);
    }

    #[test]
    fn reports_document_errors() {
        let doc: Arc<dyn Document> = Arc::new(MemoryDocument::with_pages(vec![]));
        let (tx, rx) = spawn(0);

        tx.send(RenderRequest::Page {
            id: RequestId::new(2),
            request: page(5, 0),
            document: doc,
        })
        .expect("send");

        assert!(matches!(
            rx.recv().expect("response"),
            RenderResponse::Error {
                error: RenderFault::Document(_),
                ..
            }
        ));
        let _ = tx.send(RenderRequest::Shutdown);
    }
}
