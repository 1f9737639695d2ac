//! src/model/ui_state.rs
//! ============================================================================
//! # UIState: Cursor, Scroll and Redraw Bookkeeping
//!
//! Terminal-side state that the tree and content models know nothing about:
//! the sidebar cursor, how far the content pane is scrolled, where the
//! sidebar was last painted (for mouse hit-testing) and which regions need a
//! repaint.

use std::time::Instant;

use compact_str::CompactString;
use ratatui::layout::Rect;

/// Region flags, combined into a bitmask.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum RedrawFlag {
    Sidebar = 1,
    Content = 2,
    StatusBar = 4,
    All = 7,
}

impl RedrawFlag {
    #[inline]
    pub const fn bits(self) -> u8 {
        self as u8
    }
}

/// How far the startup chain got.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StartupPhase {
    #[default]
    LoadingStatus,
    LoadingTree,
    Ready,
    /// A step failed; the UI stays usable with whatever loaded.
    Aborted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub message: CompactString,
    pub level: NotificationLevel,
    pub timestamp: Instant,
}

#[derive(Debug)]
pub struct UIState {
    redraw_flags: u8,
    /// Index into the visible sidebar rows.
    pub cursor: usize,
    /// First visible row of the sidebar viewport.
    pub sidebar_offset: usize,
    /// Where the sidebar was last painted, borders included.
    pub sidebar_area: Rect,
    pub content_scroll: u16,
    pub phase: StartupPhase,
    pub notification: Option<Notification>,
    pub show_status_bar: bool,
}

impl Default for UIState {
    fn default() -> Self {
        Self {
            redraw_flags: RedrawFlag::All.bits(),
            cursor: 0,
            sidebar_offset: 0,
            sidebar_area: Rect::default(),
            content_scroll: 0,
            phase: StartupPhase::default(),
            notification: None,
            show_status_bar: true,
        }
    }
}

impl UIState {
    #[inline]
    pub fn request_redraw(&mut self, flag: RedrawFlag) {
        self.redraw_flags |= flag.bits();
    }

    #[inline]
    pub fn needs_redraw(&self) -> bool {
        self.redraw_flags != 0
    }

    #[inline]
    pub fn needs(&self, flag: RedrawFlag) -> bool {
        self.redraw_flags & flag.bits() != 0
    }

    #[inline]
    pub fn clear_redraw(&mut self) {
        self.redraw_flags = 0;
    }

    /// Move the cursor by `delta`, staying within `len` rows.
    pub fn move_cursor(&mut self, delta: isize, len: usize) {
        if len == 0 {
            self.cursor = 0;
            return;
        }
        let target = self.cursor.saturating_add_signed(delta);
        self.cursor = target.min(len - 1);
        self.request_redraw(RedrawFlag::Sidebar);
    }

    /// Pull the cursor back in after the row list shrank.
    pub fn clamp_cursor(&mut self, len: usize) {
        self.cursor = self.cursor.min(len.saturating_sub(1));
    }

    /// Keep the cursor inside a viewport of `height` rows.
    pub fn follow_cursor(&mut self, height: usize) {
        if height == 0 {
            return;
        }
        if self.cursor < self.sidebar_offset {
            self.sidebar_offset = self.cursor;
        } else if self.cursor >= self.sidebar_offset + height {
            self.sidebar_offset = self.cursor + 1 - height;
        }
    }

    pub fn scroll_content(&mut self, delta: i32) {
        self.content_scroll = (i32::from(self.content_scroll) + delta).clamp(0, i32::from(u16::MAX)) as u16;
        self.request_redraw(RedrawFlag::Content);
    }

    pub fn reset_scroll(&mut self) {
        self.content_scroll = 0;
    }

    /// Sidebar row under a terminal cell, if any. The painted block has a
    /// one-cell border on every side.
    pub fn row_at(&self, column: u16, row: u16) -> Option<usize> {
        let area = self.sidebar_area;
        let inside_x = column > area.x && column < area.right().saturating_sub(1);
        let inside_y = row > area.y && row < area.bottom().saturating_sub(1);
        if !(inside_x && inside_y) {
            return None;
        }
        Some(self.sidebar_offset + usize::from(row - area.y - 1))
    }

    pub fn notify(&mut self, level: NotificationLevel, message: impl Into<CompactString>) {
        self.notification = Some(Notification {
            message: message.into(),
            level,
            timestamp: Instant::now(),
        });
        self.request_redraw(RedrawFlag::StatusBar);
    }
}
