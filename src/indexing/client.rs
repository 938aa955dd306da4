use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{IndexError, Result};
use crate::types::FileType;

pub const DEFAULT_BASE_URL: &str = "https://gmsnotebook.com";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileCheck {
    pub id: String,
    pub content_hash: String,
}

#[derive(Debug, Serialize)]
struct CheckRequest<'a> {
    files: &'a [FileCheck],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckResponse {
    changed_files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUpload {
    pub id: String,
    pub content_hash: String,
    pub file_type: FileType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// The remote indexing service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IndexingService: Send + Sync {
    /// Returns the identities the service considers new or modified.
    async fn check(&self, files: &[FileCheck]) -> Result<Vec<String>>;

    async fn index_file(&self, upload: &FileUpload) -> Result<()>;
}

/// Credentials sent with every request. Opaque to this crate.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub api_key: String,
    pub port: u16,
    pub provider_id: String,
}

pub struct HttpIndexingClient {
    client: Client,
    base_url: String,
    credentials: Credentials,
}

impl HttpIndexingClient {
    pub fn new(base_url: impl Into<String>, credentials: Credentials, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .header("x-api-key", &self.credentials.api_key)
            .header("x-port", self.credentials.port.to_string())
            .header("x-provider-id", &self.credentials.provider_id)
    }
}

#[async_trait]
impl IndexingService for HttpIndexingClient {
    async fn check(&self, files: &[FileCheck]) -> Result<Vec<String>> {
        debug!("Checking {} files against {}", files.len(), self.base_url);
        let response = self
            .post("/api/indexing/check")
            .json(&CheckRequest { files })
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(IndexError::RemoteStatus {
                operation: "check".to_string(),
                status: response.status().as_u16(),
            });
        }

        let body: CheckResponse = response.json().await?;
        Ok(body.changed_files)
    }

    async fn index_file(&self, upload: &FileUpload) -> Result<()> {
        let response = self.post("/api/indexing/file").json(upload).send().await?;

        if response.status() != StatusCode::NO_CONTENT {
            return Err(IndexError::RemoteStatus {
                operation: format!("indexing {}", upload.id),
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }
}
