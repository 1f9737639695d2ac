//! src/controller/event_loop.rs
//! ============================================================================
//! # EventLoop: Terminal Input and Task Results as One Stream
//!
//! Merges crossterm's `EventStream` with the action channel that background
//! tasks report on. Terminal events are mapped to actions here; nothing in
//! this module touches application state.

use crossterm::event::{Event as TermEvent, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::controller::actions::Action;

pub struct EventLoop {
    event_stream: EventStream,
    action_rx: mpsc::UnboundedReceiver<Action>,
}

impl EventLoop {
    pub fn new(action_rx: mpsc::UnboundedReceiver<Action>) -> Self {
        info!("Initializing event loop");
        Self {
            event_stream: EventStream::new(),
            action_rx,
        }
    }

    /// Next action from either source. `None` once both have ended.
    pub async fn next_action(&mut self) -> Option<Action> {
        tokio::select! {
            Some(event) = self.event_stream.next() => {
                match event {
                    Ok(event) => {
                        trace!(?event, "Terminal event received");
                        Some(map_terminal_event(event))
                    }
                    Err(e) => {
                        warn!(error = %e, "Terminal event error");
                        Some(Action::NoOp)
                    }
                }
            }

            Some(action) = self.action_rx.recv() => {
                debug!(?action, "Task action received");
                Some(action)
            }

            else => {
                info!("Event loop terminated - no more events");
                None
            }
        }
    }
}

/// Key and mouse bindings.
pub fn map_terminal_event(event: TermEvent) -> Action {
    match event {
        TermEvent::Key(key) if key.kind != KeyEventKind::Release => map_key(key),
        TermEvent::Key(_) => Action::NoOp,
        TermEvent::Mouse(mouse) => Action::Mouse(mouse),
        TermEvent::Resize(w, h) => Action::Resize(w, h),
        _ => Action::NoOp,
    }
}

fn map_key(key: KeyEvent) -> Action {
    match (key.code, key.modifiers) {
        (KeyCode::Char('c'), KeyModifiers::CONTROL) => Action::Quit,
        (KeyCode::Char('q'), _) => Action::Quit,
        (KeyCode::Up, _) | (KeyCode::Char('k'), KeyModifiers::NONE) => Action::MoveCursorUp,
        (KeyCode::Down, _) | (KeyCode::Char('j'), KeyModifiers::NONE) => Action::MoveCursorDown,
        (KeyCode::Enter, _) | (KeyCode::Char(' '), _) => Action::Activate,
        (KeyCode::Char('m'), _) => Action::MarkRead,
        (KeyCode::PageUp, _) => Action::PageUp,
        (KeyCode::PageDown, _) => Action::PageDown,
        (KeyCode::Char('K'), _) => Action::ScrollUp,
        (KeyCode::Char('J'), _) => Action::ScrollDown,
        _ => Action::Key(key),
    }
}
