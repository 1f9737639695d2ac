//! src/view/components/content_view.rs
//!
//! Paints the content panel. Page surfaces and videos cannot be drawn in a
//! terminal cell grid, so they show as one descriptive line each.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, Wrap},
};

use crate::{
    model::ui_state::UIState,
    view::{
        content_panel::{ContentBlock, ContentPanel, Document, PanelState},
        theme,
    },
};

pub struct ContentView;

impl ContentView {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, frame: &mut Frame<'_>, panel: &ContentPanel, ui: &UIState, area: Rect) {
        let title = match panel.state() {
            PanelState::Frame { .. } => " External viewer ",
            _ => " Content ",
        };
        let paragraph = Paragraph::new(panel_lines(panel))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(title)
                    .title_style(theme::header_style())
                    .border_style(theme::border_style(false))
                    .style(theme::base_style()),
            )
            .wrap(Wrap { trim: false })
            .scroll((ui.content_scroll, 0));

        frame.render_widget(paragraph, area);
    }
}

impl Default for ContentView {
    fn default() -> Self {
        Self::new()
    }
}

pub fn panel_lines(panel: &ContentPanel) -> Vec<Line<'static>> {
    match panel.state() {
        PanelState::Empty => vec![Line::styled(
            "Select a file in the sidebar",
            theme::muted_style(),
        )],
        PanelState::Frame { url } => vec![
            Line::styled("Opened in external viewer:", theme::muted_style()),
            Line::from(url.clone()),
        ],
        PanelState::Error(message) => vec![Line::styled(message.clone(), theme::error_style())],
        PanelState::Document(doc) => document_lines(doc, panel.is_pending()),
    }
}

fn document_lines(doc: &Document, pending: bool) -> Vec<Line<'static>> {
    let mut lines = vec![Line::styled(doc.header.clone(), theme::header_style()), Line::default()];

    if let Some(control) = &doc.read_control {
        let text = if control.is_marked() {
            format!("[ {} ]", control.label)
        } else {
            format!("[ {} ]  (m)", control.label)
        };
        lines.push(Line::styled(text, theme::read_control_style(control.is_marked())));
        lines.push(Line::default());
    }

    for block in &doc.blocks {
        match block {
            ContentBlock::Markup(markup) => lines.extend(
                markup
                    .iter()
                    .map(|l| Line::styled(l.clone(), theme::markdown_style(l))),
            ),
            ContentBlock::Preformatted(text) | ContentBlock::Raw(text) => {
                lines.extend(text.lines().map(|l| Line::from(l.to_owned())));
            }
            ContentBlock::Page(page) => lines.push(Line::styled(
                format!("── page {} ({}×{}) ──", page.page, page.width, page.height),
                theme::muted_style(),
            )),
            ContentBlock::Video { url } => {
                lines.push(Line::styled(format!("▶ Playing {url}"), theme::muted_style()));
            }
        }
    }

    if pending {
        lines.push(Line::styled("Loading…", theme::muted_style()));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::content_panel::ReadControl;

    fn text(lines: &[Line<'_>]) -> Vec<String> {
        lines.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn test_document_layout() {
        let mut panel = ContentPanel::new();
        panel.reset_with_header("notes.txt");
        panel.set_read_control(ReadControl::new("notes.txt", true));
        panel.append([ContentBlock::Preformatted("one\n  two".into())]);

        assert_eq!(
            text(&panel_lines(&panel)),
            vec!["notes.txt", "", "[ Already read ]", "", "one", "  two"]
        );
    }

    #[test]
    fn test_pending_and_error() {
        let mut panel = ContentPanel::new();
        panel.reset_with_header("a.md");
        panel.set_pending(true);
        assert_eq!(text(&panel_lines(&panel)).last().unwrap(), "Loading…");

        panel.show_error("Error loading content: boom");
        assert_eq!(text(&panel_lines(&panel)), vec!["Error loading content: boom"]);
    }
}
