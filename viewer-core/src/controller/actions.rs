//! src/controller/actions.rs
//! ============================================================================
//! # Actions: Everything the Viewer Responds To
//!
//! Terminal input is mapped to an `Action` by the event loop; background
//! tasks report back with one as well. The coordinator handles them one at a
//! time on the UI loop.

use crossterm::event::{KeyEvent, MouseEvent};

use crate::controller::content_dispatcher::LoadOutcome;
use crate::error::ViewerError;
use crate::model::read_state::ReadStatus;
use crate::model::tree_model::TreeDescription;

#[derive(Debug, Clone)]
pub enum Action {
    MoveCursorUp,
    MoveCursorDown,
    /// Click the sidebar row under the cursor.
    Activate,
    /// Click a sidebar row by index.
    ClickRow(usize),
    /// Activate the read control in the content panel.
    MarkRead,
    ScrollUp,
    ScrollDown,
    PageUp,
    PageDown,

    /// Unmapped key, passed through for logging.
    Key(KeyEvent),
    Mouse(MouseEvent),
    Resize(u16, u16),

    /// Startup: read-status fetch finished.
    ReadStatusLoaded(Result<ReadStatus, ViewerError>),
    /// Startup: tree fetch finished.
    TreeLoaded(Result<TreeDescription, ViewerError>),
    /// A content fetch and render finished.
    ContentLoaded(LoadOutcome),

    Quit,
    NoOp,
}
