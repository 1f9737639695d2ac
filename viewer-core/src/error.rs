//! src/error.rs
//! ============================================================================
//! # `ViewerError`: Unified Error Type for the Course Viewer
//!
//! Every collaborator call (read-status, tree, content, renderers, external
//! commands) reports failures through this enum. Content loads surface the
//! `Display` text in the content panel, so each variant renders as a short,
//! user-readable reason.

use std::{io, path::PathBuf};
use thiserror::Error;

/// Unified error type for all viewer operations.
#[derive(Debug, Error)]
pub enum ViewerError {
    /// Standard IO error, auto-converted from `io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Non-success HTTP status from a backend endpoint.
    #[error("HTTP error! status: {status}")]
    Http { status: u16, url: String },

    /// Transport failure before any status was received.
    #[error("Network error: {0}")]
    Network(String),

    /// Serialization or deserialization error (e.g., JSON).
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// A renderer capability (markdown, pages, frame, media) failed.
    #[error("{component} failed: {message}")]
    Render { component: String, message: String },

    /// External process failure (pdftoppm, player, browser).
    #[error("External command failed: {cmd} (exit code: {code:?})\n{stderr}")]
    ExternalCmd {
        cmd: String,
        code: Option<i32>,
        stderr: String,
    },

    /// Requested file or directory does not exist.
    #[error("File or directory not found: {0:?}")]
    NotFound(PathBuf),

    /// A content path that cannot be served (absolute, escapes the root).
    #[error("Invalid content path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// Any other error, with description.
    #[error("Unexpected error: {0}")]
    Other(String),
}

impl ViewerError {
    /// Create an HTTP status error
    pub fn http<S: Into<String>>(status: u16, url: S) -> Self {
        Self::Http {
            status,
            url: url.into(),
        }
    }

    /// Create a renderer failure error
    pub fn render<S1: Into<String>, S2: Into<String>>(component: S1, message: S2) -> Self {
        Self::Render {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create an external command failure error
    pub fn external_cmd<S1: Into<String>, S2: Into<String>>(
        cmd: S1,
        code: Option<i32>,
        stderr: S2,
    ) -> Self {
        Self::ExternalCmd {
            cmd: cmd.into(),
            code,
            stderr: stderr.into(),
        }
    }

    /// Create an invalid path error
    pub fn invalid_path<S1: Into<String>, S2: Into<String>>(path: S1, reason: S2) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

// Manual Clone implementation to handle non-Clone fields
impl Clone for ViewerError {
    fn clone(&self) -> Self {
        match self {
            Self::Io(e) => Self::Io(io::Error::new(e.kind(), e.to_string())),
            Self::Http { status, url } => Self::Http {
                status: *status,
                url: url.clone(),
            },
            Self::Network(msg) => Self::Network(msg.clone()),
            Self::Serde(e) => Self::Other(format!("Serde error: {e}")),
            Self::Render { component, message } => Self::Render {
                component: component.clone(),
                message: message.clone(),
            },
            Self::ExternalCmd { cmd, code, stderr } => Self::ExternalCmd {
                cmd: cmd.clone(),
                code: *code,
                stderr: stderr.clone(),
            },
            Self::NotFound(path) => Self::NotFound(path.clone()),
            Self::InvalidPath { path, reason } => Self::InvalidPath {
                path: path.clone(),
                reason: reason.clone(),
            },
            Self::Other(msg) => Self::Other(msg.clone()),
        }
    }
}

impl From<reqwest::Error> for ViewerError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => Self::http(
                status.as_u16(),
                e.url().map(|u| u.to_string()).unwrap_or_default(),
            ),
            None => Self::Network(e.to_string()),
        }
    }
}

impl From<image::ImageError> for ViewerError {
    fn from(e: image::ImageError) -> Self {
        Self::render("page decoder", e.to_string())
    }
}
