//! src/view/components/sidebar.rs

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, HighlightSpacing, Row, Table, TableState},
};

use crate::{
    model::ui_state::UIState,
    view::{
        icons,
        theme,
        tree_view::{NodeClass, RenderedNode, TreeView},
    },
};

pub struct SidebarTable;

impl SidebarTable {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, frame: &mut Frame<'_>, view: &TreeView, ui: &mut UIState, area: Rect) {
        ui.sidebar_area = area;
        let height = usize::from(area.height.saturating_sub(2));

        let visible = view.visible_rows();
        ui.clamp_cursor(visible.len());
        ui.follow_cursor(height);

        let rows: Vec<Row> = visible
            .iter()
            .skip(ui.sidebar_offset)
            .take(height)
            .filter_map(|id| view.node(*id))
            .map(|node| Row::new(vec![Cell::from(row_label(node))]).style(theme::node_style(node)))
            .collect();

        let title = match view.path_model().root() {
            Some(root) => format!(" {root} "),
            None => " Course ".to_string(),
        };

        let selected = (!visible.is_empty()).then(|| ui.cursor.saturating_sub(ui.sidebar_offset));
        let mut state = TableState::default().with_selected(selected);

        let table = Table::new(rows, [Constraint::Fill(1)])
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(title)
                    .title_style(theme::header_style())
                    .border_style(theme::border_style(true))
                    .style(theme::base_style()),
            )
            .row_highlight_style(theme::cursor_style())
            .highlight_symbol("▶ ")
            .highlight_spacing(HighlightSpacing::Always);

        frame.render_stateful_widget(table, area, &mut state);
    }
}

impl Default for SidebarTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Indented icon and name, plus a check mark on read files.
pub fn row_label(node: &RenderedNode) -> String {
    let indent = "  ".repeat(node.depth);
    let icon = if node.is_folder() {
        icons::folder_icon(node.has(NodeClass::Expanded))
    } else {
        icons::file_icon(&node.name)
    };
    if node.has(NodeClass::Read) {
        format!("{indent}{icon} {} {}", node.name, icons::READ_MARK)
    } else {
        format!("{indent}{icon} {}", node.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tree_model::{TreeDescription, TreeModel};

    #[test]
    fn test_row_label_indents_and_marks() {
        let model = TreeModel::build(&TreeDescription::folder(
            "root",
            vec![TreeDescription::file("a.md", "a.md")],
        ));
        let mut view = TreeView::new();
        view.render(model.root());
        let mut store = crate::model::read_state::ReadStateStore::default();
        store.mark_read("a.md");
        view.apply_read_overlay(&store);

        let a = view.node(view.lookup("root/a.md").unwrap()).unwrap();
        let label = row_label(a);
        assert!(label.starts_with("  "));
        assert!(label.contains("a.md"));
        assert!(label.ends_with(icons::READ_MARK));
    }
}
