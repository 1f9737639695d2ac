//! In-memory collaborators for tests. Every call is recorded so tests can
//! assert ordering (pause before start, marks persisted, frames opened).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::backend::traits::{
    Backend, ContentSource, FrameEmbedder, MediaBackend, MediaHandle, PageRenderer, PageSurface,
    ReadStatusSink, ReadStatusSource, Renderers, TreeSource,
};
use crate::backend::markdown::CmarkRenderer;
use crate::error::ViewerError;
use crate::model::read_state::ReadStatus;
use crate::model::tree_model::TreeDescription;

#[derive(Default)]
pub struct FakeBackend {
    status: Option<ReadStatus>,
    tree: Option<TreeDescription>,
    files: HashMap<String, Result<String, u16>>,
    fail_marks: bool,
    marked: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn with_status(mut self, status: ReadStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_tree(mut self, tree: TreeDescription) -> Self {
        self.tree = Some(tree);
        self
    }

    pub fn with_file(mut self, path: &str, text: &str) -> Self {
        self.files.insert(path.to_owned(), Ok(text.to_owned()));
        self
    }

    pub fn with_status_code(mut self, path: &str, status: u16) -> Self {
        self.files.insert(path.to_owned(), Err(status));
        self
    }

    pub fn failing_marks(mut self) -> Self {
        self.fail_marks = true;
        self
    }

    pub fn marked(&self) -> Vec<String> {
        self.marked.lock().unwrap().clone()
    }

    pub fn into_backend(self) -> (Arc<Self>, Backend) {
        let shared = Arc::new(self);
        (shared.clone(), Backend::from_shared(shared))
    }
}

#[async_trait]
impl ReadStatusSource for FakeBackend {
    async fn read_status(&self) -> Result<ReadStatus, ViewerError> {
        self.status
            .clone()
            .ok_or_else(|| ViewerError::http(500, "/api/read-status"))
    }
}

#[async_trait]
impl ReadStatusSink for FakeBackend {
    async fn mark_read(&self, path: &str) -> Result<(), ViewerError> {
        self.marked.lock().unwrap().push(path.to_owned());
        if self.fail_marks {
            return Err(ViewerError::Network("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl TreeSource for FakeBackend {
    async fn tree(&self) -> Result<TreeDescription, ViewerError> {
        self.tree
            .clone()
            .ok_or_else(|| ViewerError::http(500, "/api/tree"))
    }
}

#[async_trait]
impl ContentSource for FakeBackend {
    fn content_url(&self, path: &str) -> String {
        format!("/content/{path}")
    }

    async fn fetch_text(&self, path: &str) -> Result<String, ViewerError> {
        match self.files.get(path) {
            Some(Ok(text)) => Ok(text.clone()),
            Some(Err(status)) => Err(ViewerError::http(*status, self.content_url(path))),
            None => Err(ViewerError::http(404, self.content_url(path))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaEvent {
    Started(String),
    Paused(String),
}

#[derive(Default, Clone)]
pub struct FakeMedia {
    pub events: Arc<Mutex<Vec<MediaEvent>>>,
}

impl FakeMedia {
    pub fn events(&self) -> Vec<MediaEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[derive(Debug)]
struct FakePlayback {
    url: String,
    events: Arc<Mutex<Vec<MediaEvent>>>,
}

impl MediaHandle for FakePlayback {
    fn url(&self) -> &str {
        &self.url
    }

    fn pause(&mut self) {
        self.events
            .lock()
            .unwrap()
            .push(MediaEvent::Paused(self.url.clone()));
    }
}

impl MediaBackend for FakeMedia {
    fn start(&self, url: &str) -> Result<Box<dyn MediaHandle>, ViewerError> {
        self.events
            .lock()
            .unwrap()
            .push(MediaEvent::Started(url.to_owned()));
        Ok(Box::new(FakePlayback {
            url: url.to_owned(),
            events: self.events.clone(),
        }))
    }
}

#[derive(Default, Clone)]
pub struct FakeFrame {
    pub opened: Arc<Mutex<Vec<String>>>,
}

impl FrameEmbedder for FakeFrame {
    fn embed(&self, url: &str) -> Result<(), ViewerError> {
        self.opened.lock().unwrap().push(url.to_owned());
        Ok(())
    }
}

/// Pretends every document has `pages` pages of 10x20 pixels.
pub struct FakePages {
    pub pages: u32,
}

#[async_trait]
impl PageRenderer for FakePages {
    async fn render_pages(&self, url: &str) -> Result<Vec<PageSurface>, ViewerError> {
        if url.contains("broken") {
            return Err(ViewerError::render("page renderer", "invalid PDF structure"));
        }
        Ok((1..=self.pages)
            .map(|page| PageSurface {
                page,
                width: 10,
                height: 20,
                image: Vec::new(),
            })
            .collect())
    }
}

/// Renderers wired to fakes, plus handles to inspect them.
pub fn fake_renderers() -> (Renderers, FakeMedia, FakeFrame) {
    let media = FakeMedia::default();
    let frame = FakeFrame::default();
    let renderers = Renderers {
        frame: Arc::new(frame.clone()),
        markdown: Arc::new(CmarkRenderer::new()),
        pages: Arc::new(FakePages { pages: 3 }),
        media: Arc::new(media.clone()),
    };
    (renderers, media, frame)
}
