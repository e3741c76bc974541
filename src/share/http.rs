//! HTTP object store
//!
//! Uploads with `PUT <base>/<object path>` and reads back with `GET`. Works
//! against S3-compatible buckets (public-write or presigned base URLs) and
//! plain WebDAV-style servers.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;

use super::{SharedFile, SnapshotSource, Uploader};
use crate::error::UploadError;

#[derive(Debug, Clone)]
pub struct HttpStore {
    client: reqwest::Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl HttpStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bearer_token: None,
        }
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

fn storage_error(e: reqwest::Error) -> UploadError {
    UploadError::Storage(e.to_string())
}

#[async_trait]
impl Uploader for HttpStore {
    async fn upload(&self, file: SharedFile) -> Result<(), UploadError> {
        let url = self.url_for(&file.name);
        let response = self
            .authorize(self.client.put(&url))
            .header(CONTENT_TYPE, file.content_type)
            .body(file.content)
            .send()
            .await
            .map_err(storage_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::Storage(format!("PUT {} returned {}", url, status)));
        }
        tracing::debug!(%url, %status, "uploaded snapshot");
        Ok(())
    }
}

#[async_trait]
impl SnapshotSource for HttpStore {
    async fn download(&self, path: &str) -> Result<Vec<u8>, UploadError> {
        let url = self.url_for(path);
        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(storage_error)?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(UploadError::NotFound(path.to_string())),
            status if !status.is_success() => {
                Err(UploadError::Storage(format!("GET {} returned {}", url, status)))
            }
            _ => Ok(response.bytes().await.map_err(storage_error)?.to_vec()),
        }
    }
}
