//! src/backend/http.rs
//! ============================================================================
//! # HttpBackend: The Course Server Routes
//!
//! `GET /api/read-status`, `POST /api/mark-read/{path}`, `GET /api/tree` and
//! `GET /content/{path}` over one shared `reqwest::Client`. Any non-success
//! status is an error carrying that status.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::backend::traits::{ContentSource, ReadStatusSink, ReadStatusSource, TreeSource};
use crate::error::ViewerError;
use crate::model::read_state::ReadStatus;
use crate::model::tree_model::TreeDescription;

#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: String,
    client: Client,
}

/// Encode each segment, keep the separators.
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ViewerError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, route: &str) -> String {
        format!("{}{}", self.base_url, route)
    }

    fn mark_read_url(&self, path: &str) -> String {
        self.endpoint(&format!("/api/mark-read/{}", urlencoding::encode(path)))
    }

    fn checked(response: Response) -> Result<Response, ViewerError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(ViewerError::http(status.as_u16(), response.url().as_str()))
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, route: &str) -> Result<T, ViewerError> {
        let url = self.endpoint(route);
        let response = Self::checked(self.client.get(&url).send().await?)?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl ReadStatusSource for HttpBackend {
    #[instrument(level = "debug", skip(self))]
    async fn read_status(&self) -> Result<ReadStatus, ViewerError> {
        self.get_json("/api/read-status").await
    }
}

#[async_trait]
impl ReadStatusSink for HttpBackend {
    async fn mark_read(&self, path: &str) -> Result<(), ViewerError> {
        let url = self.mark_read_url(path);
        debug!(%url, "POST mark-read");
        Self::checked(self.client.post(&url).send().await?)?;
        Ok(())
    }
}

#[async_trait]
impl TreeSource for HttpBackend {
    #[instrument(level = "debug", skip(self))]
    async fn tree(&self) -> Result<TreeDescription, ViewerError> {
        self.get_json("/api/tree").await
    }
}

#[async_trait]
impl ContentSource for HttpBackend {
    fn content_url(&self, path: &str) -> String {
        self.endpoint(&format!("/content/{}", encode_path(path)))
    }

    async fn fetch_text(&self, path: &str) -> Result<String, ViewerError> {
        let url = self.content_url(path);
        let response = Self::checked(self.client.get(&url).send().await?)?;
        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> HttpBackend {
        HttpBackend::new("http://localhost:8080/", Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn test_content_url_keeps_separators() {
        let b = backend();
        assert_eq!(b.base_url(), "http://localhost:8080");
        assert_eq!(
            b.content_url("week 1/intro notes.md"),
            "http://localhost:8080/content/week%201/intro%20notes.md"
        );
    }

    #[test]
    fn test_mark_read_encodes_whole_path() {
        assert_eq!(
            backend().mark_read_url("sub/b.mp4"),
            "http://localhost:8080/api/mark-read/sub%2Fb.mp4"
        );
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        let b = HttpBackend::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap();
        let err = b.fetch_text("a.md").await.unwrap_err();
        assert!(matches!(err, ViewerError::Network(_)), "{err:?}");
    }
}
