//! src/view/theme.rs
//! ============================================================================
//! # Catppuccin Mocha Theme Color Palette
//!
//! Color constants from the Catppuccin Mocha palette
//! (https://github.com/catppuccin/catppuccin) and the styles built on them.

use ratatui::style::{Color, Modifier, Style};

use crate::view::tree_view::{NodeClass, RenderedNode};

pub const BACKGROUND: Color = Color::Rgb(30, 30, 46); // Base
pub const CURRENT_LINE: Color = Color::Rgb(69, 71, 90); // Surface1
pub const FOREGROUND: Color = Color::Rgb(205, 214, 244); // Text
pub const COMMENT: Color = Color::Rgb(127, 132, 156); // Overlay1
pub const CYAN: Color = Color::Rgb(137, 220, 235); // Sky
pub const GREEN: Color = Color::Rgb(166, 227, 161); // Green
pub const ORANGE: Color = Color::Rgb(250, 179, 135); // Peach
pub const PURPLE: Color = Color::Rgb(203, 166, 247); // Mauve
pub const RED: Color = Color::Rgb(243, 139, 168); // Red
pub const YELLOW: Color = Color::Rgb(249, 226, 175); // Yellow

pub fn border_style(focused: bool) -> Style {
    Style::default().fg(if focused { PURPLE } else { COMMENT })
}

pub fn base_style() -> Style {
    Style::default().bg(BACKGROUND).fg(FOREGROUND)
}

/// Sidebar row style from the node's presentation classes. Last-read wins
/// over read; selection only changes the background.
pub fn node_style(node: &RenderedNode) -> Style {
    let mut style = if node.has(NodeClass::LastRead) {
        Style::default().fg(YELLOW).add_modifier(Modifier::BOLD)
    } else if node.has(NodeClass::Read) {
        Style::default().fg(GREEN)
    } else if node.is_folder() {
        Style::default().fg(CYAN)
    } else {
        Style::default().fg(FOREGROUND)
    };
    if node.has(NodeClass::Selected) {
        style = style.bg(CURRENT_LINE).add_modifier(Modifier::ITALIC);
    }
    style
}

pub fn cursor_style() -> Style {
    Style::default().add_modifier(Modifier::REVERSED)
}

pub fn header_style() -> Style {
    Style::default().fg(PURPLE).add_modifier(Modifier::BOLD)
}

pub fn read_control_style(marked: bool) -> Style {
    if marked {
        Style::default().fg(GREEN).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(BACKGROUND).bg(ORANGE).add_modifier(Modifier::BOLD)
    }
}

pub fn markdown_style(line: &str) -> Style {
    if line.starts_with('#') {
        Style::default().fg(PURPLE).add_modifier(Modifier::BOLD)
    } else if line.starts_with("    ") {
        Style::default().fg(ORANGE)
    } else if line.starts_with("> ") {
        Style::default().fg(COMMENT).add_modifier(Modifier::ITALIC)
    } else {
        Style::default().fg(FOREGROUND)
    }
}

pub fn muted_style() -> Style {
    Style::default().fg(COMMENT)
}

pub fn error_style() -> Style {
    Style::default().fg(RED).add_modifier(Modifier::BOLD)
}

pub fn status_bar_style() -> Style {
    Style::default().bg(CURRENT_LINE).fg(FOREGROUND)
}
