//! src/backend/external.rs
//! ============================================================================
//! # External Programs: Browser Frame and Media Player
//!
//! Html pages open in the configured browser command. Videos play in the
//! configured player, one child process per started element. Pausing a
//! player ends its process.

use std::process::Stdio;

use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::backend::traits::{FrameEmbedder, MediaBackend, MediaHandle};
use crate::error::ViewerError;

/// Split a configured command line such as `mpv --fs` into program and args.
fn command_line(configured: &str) -> Result<(String, Vec<String>), ViewerError> {
    let mut parts = configured.split_whitespace().map(str::to_owned);
    let program = parts
        .next()
        .ok_or_else(|| ViewerError::external_cmd(configured, None, "empty command"))?;
    Ok((program, parts.collect()))
}

fn spawn_detached(configured: &str, url: &str, kill_on_drop: bool) -> Result<Child, ViewerError> {
    let (program, args) = command_line(configured)?;
    Command::new(&program)
        .args(&args)
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(kill_on_drop)
        .spawn()
        .map_err(|e| ViewerError::external_cmd(program, None, e.to_string()))
}

#[derive(Debug, Clone)]
pub struct CommandFrame {
    command: String,
}

impl CommandFrame {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl FrameEmbedder for CommandFrame {
    fn embed(&self, url: &str) -> Result<(), ViewerError> {
        // The browser outlives the viewer.
        spawn_detached(&self.command, url, false)?;
        info!(url, command = %self.command, "Opened in browser");
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CommandPlayer {
    command: String,
}

impl CommandPlayer {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

#[derive(Debug)]
struct PlayerProcess {
    url: String,
    child: Child,
}

impl MediaHandle for PlayerProcess {
    fn url(&self) -> &str {
        &self.url
    }

    fn pause(&mut self) {
        match self.child.start_kill() {
            Ok(()) => debug!(url = %self.url, "Player stopped"),
            Err(e) => warn!(url = %self.url, error = %e, "Failed to stop player"),
        }
    }
}

impl MediaBackend for CommandPlayer {
    fn start(&self, url: &str) -> Result<Box<dyn MediaHandle>, ViewerError> {
        let child = spawn_detached(&self.command, url, true)?;
        info!(url, pid = ?child.id(), "Player started");
        Ok(Box::new(PlayerProcess {
            url: url.to_owned(),
            child,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_splits_args() {
        let (program, args) = command_line("mpv --fs --quiet").unwrap();
        assert_eq!(program, "mpv");
        assert_eq!(args, vec!["--fs", "--quiet"]);
        assert!(command_line("   ").is_err());
    }

    #[tokio::test]
    async fn test_missing_player_reports_command() {
        let player = CommandPlayer::new("no-such-player-binary");
        match player.start("/tmp/clip.mp4") {
            Err(ViewerError::ExternalCmd { cmd, .. }) => assert_eq!(cmd, "no-such-player-binary"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_pause_ends_player_process() {
        let player = CommandPlayer::new("sleep");
        let mut handle = player.start("30").unwrap();
        assert_eq!(handle.url(), "30");
        handle.pause();
    }
}
