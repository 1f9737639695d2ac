//! src/view/icons.rs
//! ============================================================================
//! # Course Node Icons (Nerd Fonts)

use crate::controller::content_dispatcher::ContentKind;

pub const FOLDER_ICON: &str = "";
pub const FOLDER_OPEN_ICON: &str = "";
pub const FILE_ICON: &str = "";
pub const MARKDOWN_ICON: &str = "";
pub const VIDEO_ICON: &str = "";
pub const PDF_ICON: &str = "";
pub const HTML_ICON: &str = "";
pub const TEXT_ICON: &str = "";

pub const READ_MARK: &str = "✓";

pub fn file_icon(name: &str) -> &'static str {
    match ContentKind::classify(name) {
        ContentKind::Markdown => MARKDOWN_ICON,
        ContentKind::Video => VIDEO_ICON,
        ContentKind::Pdf => PDF_ICON,
        ContentKind::Html => HTML_ICON,
        ContentKind::Text => TEXT_ICON,
        ContentKind::Raw => FILE_ICON,
    }
}

pub fn folder_icon(expanded: bool) -> &'static str {
    if expanded { FOLDER_OPEN_ICON } else { FOLDER_ICON }
}
