//! src/controller/state_coordinator.rs
//! ============================================================================
//! # StateCoordinator: The Viewer's Single Owner of State
//!
//! Owns the read store, the loaded tree, the rendered sidebar, the content
//! dispatcher and the terminal UI state, and applies [`Action`]s to them one
//! at a time. Everything slow (status, tree and content fetches) runs in a
//! spawned task that reports back through the action channel, so the UI loop
//! never waits on I/O.
//!
//! Startup is a strict chain, each step started by the previous one's
//! result: read-status → tree → render and overlay → last-read expansion and
//! content load. A failed step logs and ends the chain there.

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, trace, warn};

use crossterm::event::{MouseButton, MouseEvent, MouseEventKind};

use crate::backend::traits::{Backend, Renderers};
use crate::controller::actions::Action;
use crate::controller::content_dispatcher::{ContentDispatcher, LoadRequest};
use crate::error::ViewerError;
use crate::model::read_state::{ReadStateStore, ReadStatus};
use crate::model::tree_model::{TreeDescription, TreeModel};
use crate::model::ui_state::{NotificationLevel, RedrawFlag, StartupPhase, UIState};
use crate::view::tree_view::{TreeEvent, TreeView};

/// Rows moved by PageUp/PageDown in the content pane.
const PAGE_SCROLL: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchResult {
    Continue,
    NotHandled,
    Terminate,
}

pub struct StateCoordinator {
    backend: Backend,
    store: ReadStateStore,
    tree: Option<TreeModel>,
    view: TreeView,
    dispatcher: ContentDispatcher,
    pub ui: UIState,
    action_tx: UnboundedSender<Action>,
}

impl StateCoordinator {
    pub fn new(backend: Backend, renderers: Renderers, action_tx: UnboundedSender<Action>) -> Self {
        let store = ReadStateStore::new(backend.read_sink.clone());
        let dispatcher = ContentDispatcher::new(backend.content.clone(), renderers);
        Self {
            backend,
            store,
            tree: None,
            view: TreeView::new(),
            dispatcher,
            ui: UIState::default(),
            action_tx,
        }
    }

    pub fn store(&self) -> &ReadStateStore {
        &self.store
    }

    pub fn view(&self) -> &TreeView {
        &self.view
    }

    pub fn dispatcher(&self) -> &ContentDispatcher {
        &self.dispatcher
    }

    /// Split borrow for the sidebar painter, which records its area.
    pub fn view_and_ui(&mut self) -> (&TreeView, &mut UIState) {
        (&self.view, &mut self.ui)
    }

    /// Kick off the startup chain.
    pub fn start(&mut self) {
        info!(marker = "STARTUP_BEGIN", "Loading read status");
        self.ui.phase = StartupPhase::LoadingStatus;
        let source = self.backend.read_status.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let result = source.read_status().await;
            if tx.send(Action::ReadStatusLoaded(result)).is_err() {
                debug!("Action channel closed before read status arrived");
            }
        });
    }

    fn spawn_tree_load(&self) {
        let source = self.backend.tree.clone();
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let result = source.tree().await;
            if tx.send(Action::TreeLoaded(result)).is_err() {
                debug!("Action channel closed before tree arrived");
            }
        });
    }

    fn spawn_content_load(&self, request: LoadRequest) {
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let outcome = request.run().await;
            if tx.send(Action::ContentLoaded(outcome)).is_err() {
                debug!("Action channel closed before content arrived");
            }
        });
    }

    /// Apply one action.
    pub fn handle(&mut self, action: Action) -> DispatchResult {
        trace!(?action, "Handling action");
        match action {
            Action::ReadStatusLoaded(result) => self.on_read_status(result),
            Action::TreeLoaded(result) => self.on_tree(result),
            Action::ContentLoaded(outcome) => {
                self.dispatcher.complete(outcome);
                self.ui.request_redraw(RedrawFlag::Content);
                self.ui.request_redraw(RedrawFlag::StatusBar);
            }

            Action::MoveCursorUp => {
                let len = self.view.visible_rows().len();
                self.ui.move_cursor(-1, len);
            }
            Action::MoveCursorDown => {
                let len = self.view.visible_rows().len();
                self.ui.move_cursor(1, len);
            }
            Action::Activate => {
                let cursor = self.ui.cursor;
                self.click_row(cursor);
            }
            Action::ClickRow(row) => self.click_row(row),
            Action::MarkRead => self.mark_read(),

            Action::ScrollUp => self.ui.scroll_content(-1),
            Action::ScrollDown => self.ui.scroll_content(1),
            Action::PageUp => self.ui.scroll_content(-PAGE_SCROLL),
            Action::PageDown => self.ui.scroll_content(PAGE_SCROLL),

            Action::Mouse(event) => return self.on_mouse(event),
            Action::Resize(width, height) => {
                debug!(width, height, "Terminal resized");
                self.ui.request_redraw(RedrawFlag::All);
            }
            Action::Key(key) => {
                trace!(?key, "Unmapped key");
                return DispatchResult::NotHandled;
            }

            Action::Quit => {
                self.dispatcher.stop_playback();
                return DispatchResult::Terminate;
            }
            Action::NoOp => {}
        }
        DispatchResult::Continue
    }

    fn on_read_status(&mut self, result: Result<ReadStatus, ViewerError>) {
        match result {
            Ok(status) => {
                self.store.hydrate(status);
                self.ui.phase = StartupPhase::LoadingTree;
                self.spawn_tree_load();
            }
            Err(e) => self.abort_startup("read status", &e),
        }
        self.ui.request_redraw(RedrawFlag::StatusBar);
    }

    fn on_tree(&mut self, result: Result<TreeDescription, ViewerError>) {
        let description = match result {
            Ok(description) => description,
            Err(e) => {
                self.abort_startup("tree", &e);
                return;
            }
        };

        let model = TreeModel::build(&description);
        self.view.render(model.root());
        self.view.apply_read_overlay(&self.store);
        self.tree = Some(model);
        self.ui.phase = StartupPhase::Ready;
        self.ui.request_redraw(RedrawFlag::All);

        info!(
            marker = "STARTUP_TREE_RENDERED",
            nodes = self.view.len(),
            root = ?self.view.path_model().root(),
            "Tree rendered"
        );

        let Some(last) = self.store.last_read().map(str::to_owned) else {
            return;
        };
        let qualified = self.view.path_model().qualify(&last);
        let in_tree = self
            .tree
            .as_ref()
            .is_some_and(|tree| tree.find(&qualified).is_some());
        if in_tree {
            self.view.expand(&qualified);
            if let Some(id) = self.view.lookup(&qualified)
                && let Some(row) = self.view.visible_rows().iter().position(|r| *r == id)
            {
                self.ui.cursor = row;
            }
        } else {
            warn!(marker = "STARTUP_RESUME_MISSING", path = %last, "Last read file is not in the tree");
            self.ui.notify(
                NotificationLevel::Warning,
                format!("{last} is no longer in the course"),
            );
        }
        info!(marker = "STARTUP_RESUME", path = %last, "Resuming last read");
        self.load(&last);
    }

    fn abort_startup(&mut self, step: &str, e: &ViewerError) {
        error!(marker = "STARTUP_ABORTED", step, error = %e, "Startup chain aborted");
        self.ui.phase = StartupPhase::Aborted;
        self.ui
            .notify(NotificationLevel::Error, format!("Could not load {step}: {e}"));
        self.ui.request_redraw(RedrawFlag::All);
    }

    fn load(&mut self, path: &str) {
        self.ui.reset_scroll();
        if let Some(request) = self.dispatcher.begin(path, &self.store) {
            self.spawn_content_load(request);
        }
        self.ui.request_redraw(RedrawFlag::Content);
        self.ui.request_redraw(RedrawFlag::StatusBar);
    }

    fn click_row(&mut self, row: usize) {
        let Some(id) = self.view.visible_rows().get(row).copied() else {
            return;
        };
        self.ui.cursor = row;
        if let Some(event) = self.view.click(id) {
            self.on_tree_event(event);
        }
    }

    /// Click a rendered node by its qualified key, visible or not.
    pub fn click_key(&mut self, key: &str) {
        if let Some(event) = self.view.click_key(key) {
            self.on_tree_event(event);
        }
    }

    fn on_tree_event(&mut self, event: TreeEvent) {
        match event {
            TreeEvent::FolderToggled { key, expanded } => {
                debug!(%key, expanded, "Folder toggled");
                let len = self.view.visible_rows().len();
                self.ui.clamp_cursor(len);
            }
            TreeEvent::FileSelected { key, content_path } => {
                debug!(%key, %content_path, "File selected");
                self.load(&content_path);
            }
        }
        self.ui.request_redraw(RedrawFlag::Sidebar);
    }

    fn mark_read(&mut self) {
        match self.dispatcher.activate_read_control(&mut self.store) {
            Some(path) => {
                self.view.apply_read_overlay(&self.store);
                self.ui.notify(NotificationLevel::Info, format!("Marked {path} as read"));
                self.ui.request_redraw(RedrawFlag::All);
            }
            None => {
                warn!("No read control to activate");
                self.ui.notify(NotificationLevel::Warning, "Nothing to mark as read");
            }
        }
    }

    fn on_mouse(&mut self, event: MouseEvent) -> DispatchResult {
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                match self.ui.row_at(event.column, event.row) {
                    Some(row) => self.click_row(row),
                    None => return DispatchResult::NotHandled,
                }
            }
            MouseEventKind::ScrollUp => self.ui.scroll_content(-1),
            MouseEventKind::ScrollDown => self.ui.scroll_content(1),
            _ => return DispatchResult::NotHandled,
        }
        DispatchResult::Continue
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::sync::mpsc::{self, UnboundedReceiver};

    use super::*;
    use crate::backend::fake::{FakeBackend, FakeMedia, MediaEvent, fake_renderers};
    use crate::model::read_state::LastRead;
    use crate::view::content_panel::{ALREADY_READ_LABEL, ContentBlock, MARK_READ_LABEL, PanelState};
    use crate::view::tree_view::NodeClass;

    fn course() -> TreeDescription {
        TreeDescription::folder(
            "root",
            vec![
                TreeDescription::file("a.md", "a.md"),
                TreeDescription::folder(
                    "sub",
                    vec![
                        TreeDescription::file("b.mp4", "sub/b.mp4"),
                        TreeDescription::file("c.mp4", "sub/c.mp4"),
                        TreeDescription::file("gone.md", "sub/gone.md"),
                        TreeDescription::file("notes.txt", "sub/notes.txt"),
                    ],
                ),
            ],
        )
    }

    fn status_a() -> ReadStatus {
        ReadStatus {
            paths: vec!["a.md".into()],
            last_read: Some(LastRead {
                path: "a.md".into(),
                timestamp: None,
            }),
        }
    }

    struct Harness {
        coord: StateCoordinator,
        rx: UnboundedReceiver<Action>,
        media: FakeMedia,
        backend: Arc<FakeBackend>,
    }

    fn harness(fake: FakeBackend) -> Harness {
        let (renderers, media, _) = fake_renderers();
        let (shared, backend) = fake.into_backend();
        let (tx, rx) = mpsc::unbounded_channel();
        Harness {
            coord: StateCoordinator::new(backend, renderers, tx),
            rx,
            media,
            backend: shared,
        }
    }

    impl Harness {
        /// Feed queued actions back in until `done` holds.
        async fn pump_until(&mut self, done: impl Fn(&StateCoordinator) -> bool) {
            while !done(&self.coord) {
                let action = tokio::time::timeout(Duration::from_secs(2), self.rx.recv())
                    .await
                    .expect("timed out waiting for action")
                    .expect("channel closed");
                self.coord.handle(action);
            }
        }

        async fn settle(&mut self) {
            self.pump_until(|c| !c.dispatcher().panel().is_pending()).await;
        }

        async fn started(&mut self) {
            self.coord.start();
            self.pump_until(|c| {
                matches!(c.ui.phase, StartupPhase::Ready | StartupPhase::Aborted)
            })
            .await;
            self.settle().await;
        }
    }

    #[tokio::test]
    async fn test_startup_resumes_last_read() {
        let mut h = harness(
            FakeBackend::default()
                .with_status(status_a())
                .with_tree(course())
                .with_file("a.md", "# Welcome"),
        );
        h.started().await;

        let view = h.coord.view();
        let a = view.node(view.lookup("root/a.md").unwrap()).unwrap();
        assert!(a.has(NodeClass::Read));
        assert!(a.has(NodeClass::LastRead));
        assert!(!a.has(NodeClass::Selected));

        let root = view.node(view.lookup("root").unwrap()).unwrap();
        assert!(root.has(NodeClass::Expanded));
        let sub = view.node(view.lookup("root/sub").unwrap()).unwrap();
        assert!(!sub.has(NodeClass::Expanded));

        let doc = h.coord.dispatcher().panel().document().expect("document");
        assert_eq!(doc.header, "a.md");
        assert_eq!(doc.read_control.as_ref().unwrap().label, ALREADY_READ_LABEL);
        assert_eq!(doc.blocks, vec![ContentBlock::Markup(vec!["# Welcome".into()])]);

        // The cursor sits on the resumed file.
        let rows = view.visible_rows();
        assert_eq!(rows[h.coord.ui.cursor], view.lookup("root/a.md").unwrap());
    }

    #[tokio::test]
    async fn test_videos_pause_before_start() {
        let mut h = harness(FakeBackend::default().with_status(ReadStatus::default()).with_tree(course()));
        h.started().await;
        assert!(h.coord.dispatcher().panel().document().is_none());

        h.coord.click_key("root/sub/b.mp4");
        assert_eq!(
            h.media.events(),
            vec![MediaEvent::Started("/content/sub/b.mp4".into())]
        );

        h.coord.click_key("root/sub/c.mp4");
        assert_eq!(
            h.media.events(),
            vec![
                MediaEvent::Started("/content/sub/b.mp4".into()),
                MediaEvent::Paused("/content/sub/b.mp4".into()),
                MediaEvent::Started("/content/sub/c.mp4".into()),
            ]
        );
        assert_eq!(
            h.coord.view().selected().map(|n| n.key.as_str()),
            Some("root/sub/c.mp4")
        );
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_selection() {
        let mut h = harness(
            FakeBackend::default()
                .with_status(status_a())
                .with_tree(course())
                .with_file("a.md", "x")
                .with_status_code("sub/gone.md", 404),
        );
        h.started().await;

        h.coord.click_key("root/sub/gone.md");
        h.settle().await;

        match h.coord.dispatcher().panel().state() {
            PanelState::Error(msg) => assert!(msg.contains("404")),
            other => panic!("expected error, got {other:?}"),
        }
        assert_eq!(
            h.coord.view().selected().map(|n| n.key.as_str()),
            Some("root/sub/gone.md")
        );
    }

    #[tokio::test]
    async fn test_mark_read_moves_last_read_overlay() {
        let mut h = harness(
            FakeBackend::default()
                .with_status(status_a())
                .with_tree(course())
                .with_file("a.md", "x")
                .with_file("sub/notes.txt", "plain"),
        );
        h.started().await;

        h.coord.click_key("root/sub/notes.txt");
        h.settle().await;
        let label = h.coord.dispatcher().panel().document().unwrap().read_control.as_ref().unwrap().label;
        assert_eq!(label, MARK_READ_LABEL);

        assert_eq!(h.coord.handle(Action::MarkRead), DispatchResult::Continue);
        let view = h.coord.view();
        assert_eq!(view.keys_with(NodeClass::LastRead), vec!["root/sub/notes.txt"]);
        assert_eq!(
            view.keys_with(NodeClass::Read),
            vec!["root/a.md", "root/sub/notes.txt"]
        );
        assert!(h.coord.store().is_last_read("sub/notes.txt"));

        // Let the detached persist task run.
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        assert_eq!(h.backend.marked(), vec!["sub/notes.txt"]);
    }

    #[tokio::test]
    async fn test_status_failure_aborts_chain() {
        let mut h = harness(FakeBackend::default().with_tree(course()));
        h.started().await;
        assert_eq!(h.coord.ui.phase, StartupPhase::Aborted);
        assert!(h.coord.view().is_empty());
        assert!(h.coord.tree.is_none());
        let note = h.coord.ui.notification.as_ref().expect("notification");
        assert_eq!(note.level, NotificationLevel::Error);
        assert!(note.message.starts_with("Could not load read status"));
    }

    #[tokio::test]
    async fn test_missing_last_read_warns_and_expands_nothing() {
        let status = ReadStatus {
            paths: vec!["old/gone.md".into()],
            last_read: Some(LastRead {
                path: "old/gone.md".into(),
                timestamp: None,
            }),
        };
        let mut h = harness(FakeBackend::default().with_status(status).with_tree(course()));
        h.started().await;

        assert_eq!(h.coord.view().visible_rows().len(), 1);
        let note = h.coord.ui.notification.as_ref().expect("notification");
        assert_eq!(note.level, NotificationLevel::Warning);
        assert!(note.message.contains("old/gone.md"));
        assert!(matches!(h.coord.dispatcher().panel().state(), PanelState::Error(_)));
    }

    #[tokio::test]
    async fn test_mark_read_without_document_warns() {
        let mut h = harness(FakeBackend::default().with_status(ReadStatus::default()).with_tree(course()));
        h.started().await;

        assert_eq!(h.coord.handle(Action::MarkRead), DispatchResult::Continue);
        let note = h.coord.ui.notification.as_ref().expect("notification");
        assert_eq!(note.level, NotificationLevel::Warning);
        assert_eq!(h.coord.store().read_count(), 0);
    }

    #[tokio::test]
    async fn test_cursor_click_toggles_folder() {
        let mut h = harness(FakeBackend::default().with_status(ReadStatus::default()).with_tree(course()));
        h.started().await;
        assert_eq!(h.coord.view().visible_rows().len(), 1);

        h.coord.handle(Action::Activate);
        assert_eq!(h.coord.view().visible_rows().len(), 3);

        h.coord.handle(Action::MoveCursorDown);
        h.coord.handle(Action::MoveCursorDown);
        h.coord.handle(Action::Activate);
        assert_eq!(h.coord.view().visible_rows().len(), 7);
        assert_eq!(h.coord.handle(Action::Quit), DispatchResult::Terminate);
    }
}
