//! src/view/ui.rs
//! ============================================================
//! Frame renderer: sidebar on the left, content on the right, status bar
//! along the bottom. Skips the frame when nothing asked for a redraw.

use std::time::Instant;

use ratatui::prelude::*;
use tracing::{instrument, trace};

use crate::{
    controller::state_coordinator::StateCoordinator,
    view::components::{content_view::ContentView, sidebar::SidebarTable, status_bar::StatusBar},
};

const SIDEBAR_PERCENT: u16 = 32;

#[derive(Default)]
pub struct RenderStats {
    pub frames: u64,
    pub skips: u64,
    pub total: std::time::Duration,
}

pub struct UIRenderer {
    sidebar: SidebarTable,
    content: ContentView,
    status: StatusBar,
    stats: RenderStats,
}

impl UIRenderer {
    pub fn new() -> Self {
        Self {
            sidebar: SidebarTable::new(),
            content: ContentView::new(),
            status: StatusBar::new(),
            stats: RenderStats::default(),
        }
    }

    pub fn should_render(&mut self, coord: &StateCoordinator) -> bool {
        if coord.ui.needs_redraw() {
            true
        } else {
            self.stats.skips += 1;
            false
        }
    }

    #[instrument(level = "trace", skip_all)]
    pub fn render(&mut self, f: &mut Frame<'_>, coord: &mut StateCoordinator) {
        let start = Instant::now();

        let status_height = u16::from(coord.ui.show_status_bar);
        let [main, status] =
            Layout::vertical([Constraint::Fill(1), Constraint::Length(status_height)]).areas(f.area());
        let [left, right] = Layout::horizontal([
            Constraint::Percentage(SIDEBAR_PERCENT),
            Constraint::Fill(1),
        ])
        .areas(main);

        {
            let (view, ui) = coord.view_and_ui();
            self.sidebar.render(f, view, ui, left);
        }
        self.content
            .render(f, coord.dispatcher().panel(), &coord.ui, right);
        if status_height > 0 {
            self.status.render(f, coord, status);
        }

        coord.ui.clear_redraw();
        self.stats.frames += 1;
        self.stats.total += start.elapsed();
        trace!(frames = self.stats.frames, "Frame rendered");
    }

    pub fn stats(&self) -> &RenderStats {
        &self.stats
    }
}

impl Default for UIRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use ratatui::{Terminal, backend::TestBackend};
    use tokio::sync::mpsc;

    use super::*;
    use crate::backend::fake::{FakeBackend, fake_renderers};
    use crate::controller::actions::Action;
    use crate::model::tree_model::TreeDescription;

    #[test]
    fn test_frame_paints_tree_and_records_sidebar() {
        let (renderers, _, _) = fake_renderers();
        let (_, backend) = FakeBackend::default().into_backend();
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut coord = StateCoordinator::new(backend, renderers, tx);
        coord.handle(Action::TreeLoaded(Ok(TreeDescription::folder(
            "course",
            vec![TreeDescription::file("intro.md", "intro.md")],
        ))));

        let mut terminal = Terminal::new(TestBackend::new(60, 12)).unwrap();
        let mut renderer = UIRenderer::new();
        assert!(renderer.should_render(&coord));
        terminal.draw(|f| renderer.render(f, &mut coord)).unwrap();

        assert!(!coord.ui.needs_redraw());
        assert_eq!(coord.ui.sidebar_area.x, 0);
        assert!(coord.ui.sidebar_area.width > 0);

        let screen: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(screen.contains("course"));
        assert!(screen.contains("Select a file"));
    }
}
