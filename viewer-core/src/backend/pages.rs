//! src/backend/pages.rs
//! ============================================================================
//! # PdftoppmRenderer: Paginated Documents as Page Images
//!
//! Rasterizes every page with `pdftoppm -png` into a scratch directory and
//! reads the images back in page order. Remote documents are downloaded into
//! the same scratch directory first.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use image::ImageReader;
use tokio::process::Command;
use tracing::{debug, info, instrument};

use crate::backend::traits::{PageRenderer, PageSurface};
use crate::error::ViewerError;

/// Resolution pdftoppm uses for a scale of 1.0.
const BASE_DPI: f32 = 72.0;
const PAGE_PREFIX: &str = "page";

#[derive(Debug, Clone)]
pub struct PdftoppmRenderer {
    command: String,
    scale: f32,
    client: reqwest::Client,
}

impl PdftoppmRenderer {
    pub fn new(command: impl Into<String>, scale: f32, timeout: Duration) -> Result<Self, ViewerError> {
        Ok(Self {
            command: command.into(),
            scale,
            client: reqwest::Client::builder().timeout(timeout).build()?,
        })
    }

    pub fn dpi(&self) -> u32 {
        (BASE_DPI * self.scale).round().max(1.0) as u32
    }

    async fn fetch_into(&self, url: &str, dir: &Path) -> Result<PathBuf, ViewerError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ViewerError::http(status.as_u16(), url));
        }
        let bytes = response.bytes().await?;
        let target = dir.join("document.pdf");
        tokio::fs::write(&target, &bytes).await?;
        debug!(url, bytes = bytes.len(), "Downloaded document");
        Ok(target)
    }

    async fn rasterize(&self, input: &Path, out_dir: &Path) -> Result<(), ViewerError> {
        let output = Command::new(&self.command)
            .arg("-png")
            .arg("-r")
            .arg(self.dpi().to_string())
            .arg(input)
            .arg(out_dir.join(PAGE_PREFIX))
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ViewerError::external_cmd(&self.command, None, e.to_string()))?;

        if !output.status.success() {
            return Err(ViewerError::external_cmd(
                &self.command,
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim(),
            ));
        }
        Ok(())
    }
}

/// Page number from a pdftoppm output name such as `page-07.png`.
pub fn page_number(file_name: &str) -> Option<u32> {
    file_name
        .strip_prefix(PAGE_PREFIX)?
        .strip_prefix('-')?
        .strip_suffix(".png")?
        .parse()
        .ok()
}

fn surface(page: u32, image: Vec<u8>) -> Result<PageSurface, ViewerError> {
    let (width, height) = ImageReader::new(Cursor::new(&image))
        .with_guessed_format()?
        .into_dimensions()?;
    Ok(PageSurface {
        page,
        width,
        height,
        image,
    })
}

#[async_trait]
impl PageRenderer for PdftoppmRenderer {
    #[instrument(level = "debug", skip(self))]
    async fn render_pages(&self, url: &str) -> Result<Vec<PageSurface>, ViewerError> {
        let scratch = tempfile::tempdir()?;
        let input = if url.starts_with("http://") || url.starts_with("https://") {
            self.fetch_into(url, scratch.path()).await?
        } else {
            PathBuf::from(url)
        };

        self.rasterize(&input, scratch.path()).await?;

        let mut pages: Vec<(u32, PathBuf)> = Vec::new();
        let mut entries = tokio::fs::read_dir(scratch.path()).await?;
        while let Some(entry) = entries.next_entry().await? {
            if let Some(n) = page_number(&entry.file_name().to_string_lossy()) {
                pages.push((n, entry.path()));
            }
        }
        pages.sort_unstable_by_key(|(n, _)| *n);

        let mut surfaces = Vec::with_capacity(pages.len());
        for (n, path) in pages {
            surfaces.push(surface(n, tokio::fs::read(&path).await?)?);
        }

        info!(url, pages = surfaces.len(), "Document rasterized");
        Ok(surfaces)
    }
}
