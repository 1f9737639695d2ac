//! src/backend/traits.rs
//! ============================================================================
//! # Collaborator Contracts
//!
//! The core never talks to a server, a renderer or a media player directly.
//! Each capability is a trait object handed in at construction time, so the
//! same state machine runs against the HTTP backend, a local directory, or
//! the in-crate fakes used by the tests.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ViewerError;
use crate::model::read_state::ReadStatus;
use crate::model::tree_model::TreeDescription;

/// `GET /api/read-status`
#[async_trait]
pub trait ReadStatusSource: Send + Sync {
    async fn read_status(&self) -> Result<ReadStatus, ViewerError>;
}

/// `POST /api/mark-read/{path}`. The response body is never inspected.
#[async_trait]
pub trait ReadStatusSink: Send + Sync {
    async fn mark_read(&self, path: &str) -> Result<(), ViewerError>;
}

/// `GET /api/tree`
#[async_trait]
pub trait TreeSource: Send + Sync {
    async fn tree(&self) -> Result<TreeDescription, ViewerError>;
}

/// `GET /content/{path}`. Content type is implied by the extension only.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Address handed to the frame, player and page renderer.
    fn content_url(&self, path: &str) -> String;

    async fn fetch_text(&self, path: &str) -> Result<String, ViewerError>;
}

/// Shows a URL in a viewport outside the content panel.
pub trait FrameEmbedder: Send + Sync {
    fn embed(&self, url: &str) -> Result<(), ViewerError>;
}

/// Raw markdown to formatted lines.
pub trait MarkdownRenderer: Send + Sync {
    fn render(&self, text: &str) -> Result<Vec<String>, ViewerError>;
}

/// One rasterized page of a paginated document.
#[derive(Clone, PartialEq, Eq)]
pub struct PageSurface {
    /// 1-based page number.
    pub page: u32,
    pub width: u32,
    pub height: u32,
    /// Encoded image (PNG).
    pub image: Vec<u8>,
}

impl Debug for PageSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageSurface")
            .field("page", &self.page)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.image.len())
            .finish()
    }
}

/// Content URL to page surfaces, in page order.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render_pages(&self, url: &str) -> Result<Vec<PageSurface>, ViewerError>;
}

/// A started media element.
pub trait MediaHandle: Send + Debug {
    fn url(&self) -> &str;

    fn pause(&mut self);
}

/// Constructs media elements. `start` begins playback immediately.
pub trait MediaBackend: Send + Sync {
    fn start(&self, url: &str) -> Result<Box<dyn MediaHandle>, ViewerError>;
}

/// The four data endpoints, usually all served by one backend.
#[derive(Clone)]
pub struct Backend {
    pub read_status: Arc<dyn ReadStatusSource>,
    pub read_sink: Arc<dyn ReadStatusSink>,
    pub tree: Arc<dyn TreeSource>,
    pub content: Arc<dyn ContentSource>,
}

impl Backend {
    pub fn from_shared<T>(shared: Arc<T>) -> Self
    where
        T: ReadStatusSource + ReadStatusSink + TreeSource + ContentSource + 'static,
    {
        Self {
            read_status: shared.clone(),
            read_sink: shared.clone(),
            tree: shared.clone(),
            content: shared,
        }
    }
}

/// Renderer capabilities used by the content dispatcher.
#[derive(Clone)]
pub struct Renderers {
    pub frame: Arc<dyn FrameEmbedder>,
    pub markdown: Arc<dyn MarkdownRenderer>,
    pub pages: Arc<dyn PageRenderer>,
    pub media: Arc<dyn MediaBackend>,
}
