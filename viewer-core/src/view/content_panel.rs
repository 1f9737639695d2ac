//! src/view/content_panel.rs
//! ============================================================================
//! # ContentPanel: What the Right-Hand Pane Shows
//!
//! Plain data written by the content dispatcher and painted by
//! `components::content_view`. Exactly one of: nothing, an external frame, a
//! document (header, optional read control, blocks), or an error message.

use crate::backend::traits::PageSurface;

pub const MARK_READ_LABEL: &str = "Mark as read";
pub const ALREADY_READ_LABEL: &str = "Already read";

/// One piece of rendered content, appended in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBlock {
    /// Output of the markdown renderer.
    Markup(Vec<String>),
    /// Plain text shown verbatim, whitespace preserved.
    Preformatted(String),
    /// Unknown type, injected as-is.
    Raw(String),
    Page(PageSurface),
    Video { url: String },
}

/// Mark-as-read button bound to one relative path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadControl {
    pub path: String,
    pub label: &'static str,
}

impl ReadControl {
    pub fn new(path: impl Into<String>, already_read: bool) -> Self {
        Self {
            path: path.into(),
            label: if already_read {
                ALREADY_READ_LABEL
            } else {
                MARK_READ_LABEL
            },
        }
    }

    /// Activation is one-way; the label never goes back.
    pub fn activate(&mut self) {
        self.label = ALREADY_READ_LABEL;
    }

    pub fn is_marked(&self) -> bool {
        self.label == ALREADY_READ_LABEL
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    /// Selected path, shown above everything else.
    pub header: String,
    pub read_control: Option<ReadControl>,
    pub blocks: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PanelState {
    #[default]
    Empty,
    /// Standard panel suppressed while an embedded frame shows `url`.
    Frame { url: String },
    Document(Document),
    Error(String),
}

#[derive(Debug, Default)]
pub struct ContentPanel {
    state: PanelState,
    /// A fetch for the current document is still outstanding.
    pending: bool,
}

impl ContentPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &PanelState {
        &self.state
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Clear the panel and start a document with a header.
    pub fn reset_with_header(&mut self, header: impl Into<String>) {
        self.state = PanelState::Document(Document {
            header: header.into(),
            ..Document::default()
        });
        self.pending = false;
    }

    pub fn show_frame(&mut self, url: impl Into<String>) {
        self.state = PanelState::Frame { url: url.into() };
        self.pending = false;
    }

    /// Replace everything with an error; earlier content is discarded.
    pub fn show_error(&mut self, message: impl Into<String>) {
        self.state = PanelState::Error(message.into());
        self.pending = false;
    }

    pub fn set_pending(&mut self, pending: bool) {
        self.pending = pending;
    }

    pub fn set_read_control(&mut self, control: ReadControl) {
        if let PanelState::Document(doc) = &mut self.state {
            doc.read_control = Some(control);
        }
    }

    /// Append to the current document. Ignored when no document is shown.
    pub fn append(&mut self, blocks: impl IntoIterator<Item = ContentBlock>) {
        if let PanelState::Document(doc) = &mut self.state {
            doc.blocks.extend(blocks);
        }
    }

    pub fn document(&self) -> Option<&Document> {
        match &self.state {
            PanelState::Document(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn read_control_mut(&mut self) -> Option<&mut ReadControl> {
        match &mut self.state {
            PanelState::Document(doc) => doc.read_control.as_mut(),
            _ => None,
        }
    }

    pub fn is_frame_active(&self) -> bool {
        matches!(self.state, PanelState::Frame { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_control_label_is_one_way() {
        let mut control = ReadControl::new("a.md", false);
        assert_eq!(control.label, MARK_READ_LABEL);
        control.activate();
        control.activate();
        assert_eq!(control.label, ALREADY_READ_LABEL);
        assert!(control.is_marked());
    }

    #[test]
    fn test_error_discards_document() {
        let mut panel = ContentPanel::new();
        panel.reset_with_header("a.md");
        panel.append([ContentBlock::Raw("x".into())]);
        panel.show_error("boom");
        assert_eq!(panel.state(), &PanelState::Error("boom".into()));
        assert!(panel.document().is_none());
    }

    #[test]
    fn test_append_without_document_is_ignored() {
        let mut panel = ContentPanel::new();
        panel.show_frame("/content/page.html");
        panel.append([ContentBlock::Raw("late".into())]);
        assert!(panel.is_frame_active());
    }
}
