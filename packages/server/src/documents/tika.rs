use async_trait::async_trait;
use axum::body::Bytes;
use reqwest::header::ACCEPT;

use super::{DocumentError, DocumentExtractor};

/// Client for an Apache Tika server.
pub struct TikaClient {
    http: reqwest::Client,
    base_url: String,
}

impl TikaClient {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn put(&self, path: &str, document: Bytes) -> Result<String, DocumentError> {
        let response = self
            .http
            .put(format!("{}{}", self.base_url, path))
            .header(ACCEPT, "text/plain")
            .body(document)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DocumentError::Status(status.as_u16()));
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl DocumentExtractor for TikaClient {
    async fn detect(&self, document: Bytes) -> Result<String, DocumentError> {
        self.put("/detect/stream", document).await
    }

    async fn parse(&self, document: Bytes) -> Result<String, DocumentError> {
        self.put("/tika", document).await
    }
}
