//! src/controller/content_dispatcher.rs
//! ============================================================================
//! # ContentDispatcher: Extension-Keyed Content Loading
//!
//! Classifies a selected file by its extension and drives the matching
//! renderer capability. Loading is split in three so the slow half can run off
//! the UI loop:
//!
//! - [`ContentDispatcher::begin`] runs synchronously: clears the panel, writes
//!   the header and read control, handles the frame and video branches which
//!   need no fetch, and returns a [`LoadRequest`] for the rest.
//! - [`LoadRequest::run`] fetches and renders. It owns everything it touches
//!   and can be spawned.
//! - [`ContentDispatcher::complete`] writes the outcome into the panel.
//!
//! Late outcomes are written into whatever the panel shows at that moment.

use std::sync::Arc;

use tracing::{debug, error, info, instrument};

use crate::backend::traits::{ContentSource, MediaHandle, Renderers};
use crate::error::ViewerError;
use crate::model::read_state::ReadStateStore;
use crate::view::content_panel::{ContentBlock, ContentPanel, ReadControl};

/// Extension class of a content path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Html,
    Video,
    Pdf,
    Markdown,
    Text,
    /// Anything unrecognised; injected as-is.
    Raw,
}

const DISPATCH_TABLE: [(&str, ContentKind); 5] = [
    ("html", ContentKind::Html),
    ("mp4", ContentKind::Video),
    ("pdf", ContentKind::Pdf),
    ("md", ContentKind::Markdown),
    ("txt", ContentKind::Text),
];

impl ContentKind {
    /// Classify by the text after the last `.`, ignoring case. A path with no
    /// dot is classified by its whole text, which never matches.
    pub fn classify(path: &str) -> Self {
        let ext = path.rsplit('.').next().unwrap_or(path);
        DISPATCH_TABLE
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(ext))
            .map_or(ContentKind::Raw, |(_, kind)| *kind)
    }

    /// Whether a mark-as-read control accompanies this kind.
    pub fn has_read_control(self) -> bool {
        !matches!(self, ContentKind::Html | ContentKind::Video)
    }
}

/// The fetch-and-render half of a load.
pub struct LoadRequest {
    pub path: String,
    pub kind: ContentKind,
    content: Arc<dyn ContentSource>,
    renderers: Renderers,
}

impl std::fmt::Debug for LoadRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadRequest")
            .field("path", &self.path)
            .field("kind", &self.kind)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub path: String,
    pub kind: ContentKind,
    pub result: Result<Vec<ContentBlock>, ViewerError>,
}

impl LoadRequest {
    #[instrument(level = "debug", skip(self), fields(path = %self.path, kind = ?self.kind))]
    pub async fn run(self) -> LoadOutcome {
        let result = self.fetch_and_render().await;
        LoadOutcome {
            path: self.path,
            kind: self.kind,
            result,
        }
    }

    async fn fetch_and_render(&self) -> Result<Vec<ContentBlock>, ViewerError> {
        match self.kind {
            ContentKind::Pdf => {
                let url = self.content.content_url(&self.path);
                let pages = self.renderers.pages.render_pages(&url).await?;
                Ok(pages.into_iter().map(ContentBlock::Page).collect())
            }
            ContentKind::Markdown => {
                let text = self.content.fetch_text(&self.path).await?;
                let lines = self.renderers.markdown.render(&text)?;
                Ok(vec![ContentBlock::Markup(lines)])
            }
            ContentKind::Text => {
                let text = self.content.fetch_text(&self.path).await?;
                Ok(vec![ContentBlock::Preformatted(text)])
            }
            ContentKind::Raw => {
                let text = self.content.fetch_text(&self.path).await?;
                Ok(vec![ContentBlock::Raw(text)])
            }
            ContentKind::Html | ContentKind::Video => Ok(Vec::new()),
        }
    }
}

pub struct ContentDispatcher {
    content: Arc<dyn ContentSource>,
    renderers: Renderers,
    /// The one active media element, if any.
    player: Option<Box<dyn MediaHandle>>,
    panel: ContentPanel,
    current: Option<String>,
}

impl ContentDispatcher {
    pub fn new(content: Arc<dyn ContentSource>, renderers: Renderers) -> Self {
        Self {
            content,
            renderers,
            player: None,
            panel: ContentPanel::new(),
            current: None,
        }
    }

    pub fn panel(&self) -> &ContentPanel {
        &self.panel
    }

    /// Relative path of the most recently dispatched load.
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn active_player(&self) -> Option<&str> {
        self.player.as_ref().map(|p| p.url())
    }

    /// Pause and drop the active player. Always runs before a new one starts.
    pub fn stop_playback(&mut self) {
        if let Some(mut old) = self.player.take() {
            debug!(url = old.url(), "Pausing active media");
            old.pause();
        }
    }

    /// Synchronous half of a load. Returns the request still to be run, or
    /// `None` when the branch finished here.
    #[instrument(level = "debug", skip(self, store))]
    pub fn begin(&mut self, path: &str, store: &ReadStateStore) -> Option<LoadRequest> {
        let kind = ContentKind::classify(path);
        let url = self.content.content_url(path);
        self.current = Some(path.to_owned());
        info!(marker = "CONTENT_LOAD_START", path, ?kind, "Loading content");

        if kind == ContentKind::Html {
            match self.renderers.frame.embed(&url) {
                Ok(()) => self.panel.show_frame(url),
                Err(e) => self.fail(path, e),
            }
            return None;
        }

        // Clearing the panel removes any video it held.
        self.stop_playback();
        self.panel.reset_with_header(path);

        if kind == ContentKind::Video {
            match self.renderers.media.start(&url) {
                Ok(handle) => {
                    self.player = Some(handle);
                    self.panel.append([ContentBlock::Video { url }]);
                }
                Err(e) => self.fail(path, e),
            }
            return None;
        }

        self.panel
            .set_read_control(ReadControl::new(path, store.is_read(path)));
        self.panel.set_pending(true);

        Some(LoadRequest {
            path: path.to_owned(),
            kind,
            content: self.content.clone(),
            renderers: self.renderers.clone(),
        })
    }

    /// Write a finished load into the panel, whatever it currently shows.
    pub fn complete(&mut self, outcome: LoadOutcome) {
        // A late result from an earlier load leaves the current one pending.
        if self.current.as_deref() == Some(outcome.path.as_str()) {
            self.panel.set_pending(false);
        }
        match outcome.result {
            Ok(blocks) => {
                debug!(path = %outcome.path, blocks = blocks.len(), "Content rendered");
                self.panel.append(blocks);
            }
            Err(e) => self.fail(&outcome.path, e),
        }
    }

    /// Begin, run and complete in place.
    pub async fn load(&mut self, path: &str, store: &ReadStateStore) {
        if let Some(request) = self.begin(path, store) {
            let outcome = request.run().await;
            self.complete(outcome);
        }
    }

    /// Activate the read control of the shown document. Returns the path that
    /// was marked, or `None` when no control is shown.
    pub fn activate_read_control(&mut self, store: &mut ReadStateStore) -> Option<String> {
        let control = self.panel.read_control_mut()?;
        let path = control.path.clone();
        store.mark_read(&path);
        control.activate();
        Some(path)
    }

    fn fail(&mut self, path: &str, e: ViewerError) {
        error!(
            marker = "CONTENT_LOAD_FAILED",
            path,
            error = %e,
            "Error loading content"
        );
        self.panel.show_error(format!("Error loading content: {e}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fake::{FakeBackend, MediaEvent, fake_renderers};
    use crate::view::content_panel::{ALREADY_READ_LABEL, MARK_READ_LABEL, PanelState};

    fn dispatcher(backend: FakeBackend) -> (ContentDispatcher, crate::backend::fake::FakeMedia) {
        let (renderers, media, _) = fake_renderers();
        let (_, backend) = backend.into_backend();
        (ContentDispatcher::new(backend.content, renderers), media)
    }

    #[test]
    fn test_classify_is_case_insensitive() {
        assert_eq!(ContentKind::classify("a/B.MD"), ContentKind::Markdown);
        assert_eq!(ContentKind::classify("clip.Mp4"), ContentKind::Video);
        assert_eq!(ContentKind::classify("page.html"), ContentKind::Html);
        assert_eq!(ContentKind::classify("notes.txt"), ContentKind::Text);
        assert_eq!(ContentKind::classify("slides.pdf"), ContentKind::Pdf);
        assert_eq!(ContentKind::classify("data.csv"), ContentKind::Raw);
        assert_eq!(ContentKind::classify("Makefile"), ContentKind::Raw);
        assert_eq!(ContentKind::classify("v1.0/readme.md"), ContentKind::Markdown);
    }

    #[tokio::test]
    async fn test_markdown_load_renders_with_header_and_control() {
        let (mut d, _) = dispatcher(FakeBackend::default().with_file("a.md", "# Hi"));
        let store = ReadStateStore::default();
        d.load("a.md", &store).await;

        let doc = d.panel().document().expect("document shown");
        assert_eq!(doc.header, "a.md");
        assert_eq!(doc.read_control.as_ref().unwrap().label, MARK_READ_LABEL);
        assert_eq!(doc.blocks, vec![ContentBlock::Markup(vec!["# Hi".into()])]);
        assert!(!d.panel().is_pending());
    }

    #[tokio::test]
    async fn test_text_is_kept_verbatim() {
        let body = "  indented\n\ttabbed\n";
        let (mut d, _) = dispatcher(FakeBackend::default().with_file("n.txt", body));
        d.load("n.txt", &ReadStateStore::default()).await;
        let doc = d.panel().document().unwrap();
        assert_eq!(doc.blocks, vec![ContentBlock::Preformatted(body.into())]);
    }

    #[tokio::test]
    async fn test_other_extensions_inject_raw_text_with_control() {
        let body = "name,score\nada,10\n";
        let (mut d, _) = dispatcher(FakeBackend::default().with_file("data.csv", body));
        d.load("data.csv", &ReadStateStore::default()).await;

        let doc = d.panel().document().expect("document shown");
        assert_eq!(doc.header, "data.csv");
        assert_eq!(doc.blocks, vec![ContentBlock::Raw(body.into())]);
        let control = doc.read_control.as_ref().expect("read control");
        assert_eq!(control.label, MARK_READ_LABEL);
        assert_eq!(control.path, "data.csv");
    }

    #[tokio::test]
    async fn test_fetch_error_replaces_panel_with_status() {
        let (mut d, _) = dispatcher(FakeBackend::default().with_status_code("gone.md", 404));
        d.load("gone.md", &ReadStateStore::default()).await;
        match d.panel().state() {
            PanelState::Error(msg) => assert!(msg.contains("404"), "{msg}"),
            other => panic!("expected error panel, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_pdf_pages_in_order_and_render_error() {
        let (mut d, _) = dispatcher(FakeBackend::default());
        d.load("slides.pdf", &ReadStateStore::default()).await;
        let pages: Vec<u32> = d
            .panel()
            .document()
            .unwrap()
            .blocks
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Page(p) => Some(p.page),
                _ => None,
            })
            .collect();
        assert_eq!(pages, vec![1, 2, 3]);

        d.load("broken.pdf", &ReadStateStore::default()).await;
        assert!(matches!(d.panel().state(), PanelState::Error(_)));
    }

    #[test]
    fn test_html_goes_to_frame() {
        let (renderers, _, frame) = fake_renderers();
        let (_, backend) = FakeBackend::default().into_backend();
        let mut d = ContentDispatcher::new(backend.content, renderers);

        assert!(d.begin("page.html", &ReadStateStore::default()).is_none());
        assert!(d.panel().is_frame_active());
        assert_eq!(*frame.opened.lock().unwrap(), vec!["/content/page.html"]);
    }

    #[test]
    fn test_first_video_starts_without_pause() {
        let (mut d, media) = dispatcher(FakeBackend::default());
        assert!(d.begin("sub/b.mp4", &ReadStateStore::default()).is_none());
        assert_eq!(
            media.events(),
            vec![MediaEvent::Started("/content/sub/b.mp4".into())]
        );
        let doc = d.panel().document().unwrap();
        assert!(doc.read_control.is_none());
        assert_eq!(d.active_player(), Some("/content/sub/b.mp4"));
    }

    #[test]
    fn test_second_video_pauses_first_before_starting() {
        let (mut d, media) = dispatcher(FakeBackend::default());
        let store = ReadStateStore::default();
        d.begin("one.mp4", &store);
        d.begin("two.mp4", &store);

        assert_eq!(
            media.events(),
            vec![
                MediaEvent::Started("/content/one.mp4".into()),
                MediaEvent::Paused("/content/one.mp4".into()),
                MediaEvent::Started("/content/two.mp4".into()),
            ]
        );
        assert_eq!(d.active_player(), Some("/content/two.mp4"));
    }

    #[tokio::test]
    async fn test_read_control_marks_and_relabels() {
        let (mut d, _) = dispatcher(FakeBackend::default().with_file("a.md", "x"));
        let mut store = ReadStateStore::default();
        d.load("a.md", &store).await;

        assert_eq!(d.activate_read_control(&mut store), Some("a.md".into()));
        assert!(store.is_read("a.md"));
        assert!(store.is_last_read("a.md"));
        let label = d.panel().document().unwrap().read_control.as_ref().unwrap().label;
        assert_eq!(label, ALREADY_READ_LABEL);
    }

    #[tokio::test]
    async fn test_label_reflects_existing_read_status() {
        let (mut d, _) = dispatcher(FakeBackend::default().with_file("a.md", "x"));
        let mut store = ReadStateStore::default();
        store.mark_read("a.md");
        d.load("a.md", &store).await;
        let label = d.panel().document().unwrap().read_control.as_ref().unwrap().label;
        assert_eq!(label, ALREADY_READ_LABEL);
    }

    #[tokio::test]
    async fn test_late_outcome_writes_into_current_panel() {
        let (mut d, _) = dispatcher(
            FakeBackend::default()
                .with_file("slow.md", "slow")
                .with_file("fast.txt", "fast"),
        );
        let store = ReadStateStore::default();
        let slow = d.begin("slow.md", &store).unwrap();
        let fast = d.begin("fast.txt", &store).unwrap();

        let fast = fast.run().await;
        d.complete(fast);
        let slow = slow.run().await;
        d.complete(slow);

        let doc = d.panel().document().unwrap();
        assert_eq!(doc.header, "fast.txt");
        assert_eq!(doc.blocks.len(), 2);
    }

    #[tokio::test]
    async fn test_stale_outcome_keeps_current_load_pending() {
        let (mut d, _) = dispatcher(
            FakeBackend::default()
                .with_file("slow.md", "slow")
                .with_file("fast.txt", "fast"),
        );
        let store = ReadStateStore::default();
        let slow = d.begin("slow.md", &store).unwrap();
        let fast = d.begin("fast.txt", &store).unwrap();

        d.complete(slow.run().await);
        assert!(d.panel().is_pending());

        d.complete(fast.run().await);
        assert!(!d.panel().is_pending());
    }
}
