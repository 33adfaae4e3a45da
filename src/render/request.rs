//! Render request and response types

use std::sync::Arc;

use super::Bitmap;
use crate::document::{Document, DocumentError};

/// Unique identifier for render requests
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

impl RequestId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Layout generation a request belongs to. Bumped on every re-layout so
/// results rendered for an old zoom or an old document can be told apart.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(pub u64);

impl Generation {
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// What the view asks its delegate for
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageRequest {
    pub page: usize,
    /// Device pixels per document unit
    pub resolution: f64,
    pub generation: Generation,
}

/// Result of one accepted [`PageRequest`]
#[derive(Debug)]
pub struct PageCompletion {
    pub page: usize,
    pub resolution: f64,
    pub generation: Generation,
    pub outcome: Result<Bitmap, RenderFault>,
}

/// Errors from render workers
#[derive(Debug, thiserror::Error)]
pub enum RenderFault {
    #[error("document: {0}")]
    Document(#[from] DocumentError),

    #[error("no document bound to the renderer")]
    NoDocument,

    #[error("request superseded by a newer layout")]
    Cancelled,

    #[error("{detail}")]
    Generic { detail: String },
}

impl RenderFault {
    pub fn generic(msg: impl Into<String>) -> Self {
        Self::Generic { detail: msg.into() }
    }
}

/// Request sent to render workers
pub enum RenderRequest {
    /// Rasterize a page of `document`
    Page {
        id: RequestId,
        request: PageRequest,
        document: Arc<dyn Document>,
    },

    /// Shutdown the worker
    Shutdown,
}

impl std::fmt::Debug for RenderRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderRequest::Page { id, request, .. } => f
                .debug_struct("Page")
                .field("id", id)
                .field("request", request)
                .finish_non_exhaustive(),
            RenderRequest::Shutdown => f.write_str("Shutdown"),
        }
    }
}

/// Response from render workers
#[derive(Debug)]
pub enum RenderResponse {
    /// Rendered page
    Page {
        id: RequestId,
        request: PageRequest,
        bitmap: Bitmap,
    },

    /// Skipped because a newer generation was requested meanwhile
    Cancelled { id: RequestId, request: PageRequest },

    /// Error during rendering
    Error {
        id: RequestId,
        request: PageRequest,
        error: RenderFault,
    },
}

impl RenderResponse {
    #[must_use]
    pub fn id(&self) -> RequestId {
        match self {
            RenderResponse::Page { id, .. }
            | RenderResponse::Cancelled { id, .. }
            | RenderResponse::Error { id, .. } => *id,
        }
    }

    /// Convert into what the view consumes
    #[must_use]
    pub fn into_completion(self) -> PageCompletion {
        let (request, outcome) = match self {
            RenderResponse::Page {
                request, bitmap, ..
            } => (request, Ok(bitmap)),
            RenderResponse::Cancelled { request, .. } => (request, Err(RenderFault::Cancelled)),
            RenderResponse::Error { request, error, .. } => (request, Err(error)),
        };
        PageCompletion {
            page: request.page,
            resolution: request.resolution,
            generation: request.generation,
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;
    use crate::render::WHITE;

    fn request(page: usize) -> PageRequest {
        PageRequest {
            page,
            resolution: 1.5,
            generation: Generation(4),
        }
    }

    #[test]
    fn page_response_becomes_successful_completion() {
        let response = RenderResponse::Page {
            id: RequestId::new(1),
            request: request(2),
            bitmap: Bitmap::solid(Size::new(3, 3), WHITE),
        };

        let completion = response.into_completion();

        assert_eq!(completion.page, 2);
        assert_eq!(completion.generation, Generation(4));
        assert!((completion.resolution - 1.5).abs() < f64::EPSILON);
        assert!(completion.outcome.is_ok());
    }

    #[test]
    fn cancelled_response_becomes_cancelled_fault() {
        let response = RenderResponse::Cancelled {
            id: RequestId::new(9),
            request: request(0),
        };
        assert_eq!(response.id(), RequestId::new(9));
        assert!(matches!(
            response.into_completion().outcome,
            Err(RenderFault::Cancelled)
        ));
    }

    #[test]
    fn generations_are_ordered() {
        assert!(Generation(1).next() > Generation(1));
        assert_eq!(Generation::default().next(), Generation(1));
    }
}
