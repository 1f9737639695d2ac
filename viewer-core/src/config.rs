//! src/config.rs
//! ============================================================================
//! # Config: Viewer Configuration Loader and Saver
//!
//! User-editable settings stored as TOML under the platform config dir from
//! [`directories::ProjectDirs`] (`.../CourseViewer/config.toml`). A default
//! file is written on first run. Command-line flags are folded in afterwards
//! through [`Overrides`].
//!
//! ```toml
//! player_cmd = "mpv"
//!
//! [backend]
//! kind = "local"
//! root = "/home/me/courses/rust"
//! hidden_extensions = [".srt"]
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

const QUALIFIER: &str = "org";
const ORGANIZATION: &str = "courseviewer";
const APPLICATION: &str = "CourseViewer";

/// Where course data comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    /// A running course server.
    Http {
        base_url: String,
        #[serde(with = "humantime_serde", default = "default_timeout")]
        timeout: Duration,
    },
    /// A directory on disk, with read-status kept in `state_file`.
    Local {
        root: PathBuf,
        #[serde(default = "default_hidden")]
        hidden_extensions: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        state_file: Option<PathBuf>,
    },
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_hidden() -> Vec<String> {
    vec![".srt".to_string()]
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Http {
            base_url: "http://localhost:8080".to_string(),
            timeout: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    pub command: String,
    /// Page scale; 1.0 renders at 72 dpi.
    pub scale: f32,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            command: "pdftoppm".to_string(),
            scale: 1.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_dir: PathBuf,
    /// Default directive when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        let log_dir = ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
            .map(|dirs| dirs.data_local_dir().join("logs"))
            .unwrap_or_else(|| PathBuf::from("logs"));
        Self {
            log_dir,
            level: "info".to_string(),
        }
    }
}

/// Main configuration struct for the viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub player_cmd: String,
    pub browser_cmd: String,
    pub show_status_bar: bool,
    pub backend: BackendConfig,
    pub pdf: PdfConfig,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            player_cmd: "mpv".to_string(),
            browser_cmd: "xdg-open".to_string(),
            show_status_bar: true,
            backend: BackendConfig::default(),
            pdf: PdfConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Values given on the command line; each one wins over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub root: Option<PathBuf>,
    pub server: Option<String>,
    pub hide: Option<Vec<String>>,
}

impl Config {
    /// Load from `explicit` or the default location. A missing default file
    /// is created with defaults; a missing explicit file is an error.
    pub async fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        match tokio::fs::read_to_string(&path).await {
            Ok(text) => {
                let cfg: Config = toml::from_str(&text)
                    .with_context(|| format!("Invalid config file {}", path.display()))?;
                info!(path = %path.display(), "Config loaded");
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && explicit.is_none() => {
                let cfg = Config::default();
                if let Err(e) = cfg.save_to(&path).await {
                    warn!(path = %path.display(), error = %e, "Could not write default config");
                }
                Ok(cfg)
            }
            Err(e) => Err(e).with_context(|| format!("Cannot read config {}", path.display())),
        }
    }

    pub async fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let toml_str: String = toml::to_string_pretty(self)?;
        tokio::fs::write(path, toml_str).await?;
        info!(path = %path.display(), "Config saved");
        Ok(())
    }

    /// Fold command-line values in. `--root` selects a local backend and
    /// `--server` an HTTP one; `--hide` applies to a local backend only.
    pub fn apply(&mut self, overrides: Overrides) -> anyhow::Result<()> {
        match (overrides.root, overrides.server) {
            (Some(_), Some(_)) => return Err(anyhow!("--root and --server are exclusive")),
            (Some(root), None) => {
                let state_file = match &self.backend {
                    BackendConfig::Local { state_file, .. } => state_file.clone(),
                    BackendConfig::Http { .. } => Self::default_state_file(),
                };
                self.backend = BackendConfig::Local {
                    root,
                    hidden_extensions: default_hidden(),
                    state_file,
                };
            }
            (None, Some(base_url)) => {
                let timeout = match &self.backend {
                    BackendConfig::Http { timeout, .. } => *timeout,
                    BackendConfig::Local { .. } => default_timeout(),
                };
                self.backend = BackendConfig::Http { base_url, timeout };
            }
            (None, None) => {}
        }

        if let (Some(hide), BackendConfig::Local { hidden_extensions, .. }) =
            (overrides.hide, &mut self.backend)
        {
            *hidden_extensions = hide;
        }
        Ok(())
    }

    /// Returns the canonical config file path using `directories::ProjectDirs`.
    pub fn config_path() -> anyhow::Result<PathBuf> {
        let proj_dirs = ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
            .ok_or_else(|| anyhow!("Could not determine config directory."))?;
        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Read ledger location for local backends.
    pub fn default_state_file() -> Option<PathBuf> {
        ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
            .map(|dirs| dirs.data_dir().join("read-status.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_fills_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            player_cmd = "vlc"

            [backend]
            kind = "local"
            root = "/srv/course"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.player_cmd, "vlc");
        assert_eq!(cfg.browser_cmd, "xdg-open");
        assert_eq!(
            cfg.backend,
            BackendConfig::Local {
                root: PathBuf::from("/srv/course"),
                hidden_extensions: vec![".srt".into()],
                state_file: None,
            }
        );
    }

    #[test]
    fn test_http_timeout_is_humantime() {
        let cfg: Config = toml::from_str(
            r#"
            [backend]
            kind = "http"
            base_url = "http://course:9000"
            timeout = "2s 500ms"
            "#,
        )
        .unwrap();
        match cfg.backend {
            BackendConfig::Http { timeout, .. } => assert_eq!(timeout, Duration::from_millis(2500)),
            other => panic!("unexpected backend {other:?}"),
        }
    }

    #[test]
    fn test_overrides_switch_backend() {
        let mut cfg = Config::default();
        cfg.apply(Overrides {
            root: Some(PathBuf::from("/tmp/c")),
            hide: Some(vec!["vtt".into()]),
            ..Overrides::default()
        })
        .unwrap();
        match &cfg.backend {
            BackendConfig::Local { root, hidden_extensions, .. } => {
                assert_eq!(root, Path::new("/tmp/c"));
                assert_eq!(hidden_extensions, &vec!["vtt".to_string()]);
            }
            other => panic!("unexpected backend {other:?}"),
        }

        let err = cfg.apply(Overrides {
            root: Some(PathBuf::from("/a")),
            server: Some("http://b".into()),
            hide: None,
        });
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_save_then_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");
        let mut cfg = Config::default();
        cfg.show_status_bar = false;
        cfg.save_to(&path).await.unwrap();

        let loaded = Config::load(Some(&path)).await.unwrap();
        assert_eq!(loaded, cfg);
        assert!(Config::load(Some(&dir.path().join("missing.toml"))).await.is_err());
    }
}
