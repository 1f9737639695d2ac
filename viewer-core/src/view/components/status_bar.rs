//! src/view/components/status_bar.rs
//!
//! One line: the path under the cursor, read progress, and either the
//! startup phase, a loading marker or the latest notification.

use ratatui::{
    prelude::*,
    widgets::Paragraph,
};

use crate::{
    controller::state_coordinator::StateCoordinator,
    model::ui_state::{NotificationLevel, StartupPhase},
    view::{theme, tree_view::NodeClass},
};

pub struct StatusBar;

impl StatusBar {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, frame: &mut Frame<'_>, coord: &StateCoordinator, area: Rect) {
        let view = coord.view();
        let focused = view
            .visible_rows()
            .get(coord.ui.cursor)
            .and_then(|id| view.node(*id))
            .map(|node| view.path_model().relativize(&node.key).to_owned())
            .unwrap_or_default();

        // Counted on the rendered tree; the read set may name removed files.
        let progress = format!(
            " {}/{} read ",
            view.count_with(NodeClass::Read),
            view.file_count()
        );

        let (right, right_style) = match (&coord.ui.notification, coord.ui.phase) {
            (_, StartupPhase::LoadingStatus) => ("Loading read status…".to_string(), theme::muted_style()),
            (_, StartupPhase::LoadingTree) => ("Loading course tree…".to_string(), theme::muted_style()),
            (_, StartupPhase::Aborted) => ("Startup failed, see log".to_string(), theme::error_style()),
            _ if coord.dispatcher().panel().is_pending() => ("Loading…".to_string(), theme::muted_style()),
            (Some(note), StartupPhase::Ready) => {
                let style = match note.level {
                    NotificationLevel::Info => theme::status_bar_style(),
                    NotificationLevel::Warning => Style::default().fg(theme::YELLOW),
                    NotificationLevel::Error => theme::error_style(),
                };
                (note.message.to_string(), style)
            }
            (None, StartupPhase::Ready) => ("q quit · m mark read".to_string(), theme::muted_style()),
        };

        let line = Line::from(vec![
            Span::styled(format!(" {focused} "), theme::status_bar_style().bold()),
            Span::styled(progress, Style::default().fg(theme::GREEN)),
            Span::raw(" "),
            Span::styled(right, right_style),
        ]);

        frame.render_widget(Paragraph::new(line).style(theme::status_bar_style()), area);
    }
}

impl Default for StatusBar {
    fn default() -> Self {
        Self::new()
    }
}
