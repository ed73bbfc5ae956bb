//! Turning uploaded documents into plain text.

pub mod mime;
pub mod tika;

use async_trait::async_trait;
use axum::body::Bytes;
use thiserror::Error;
use tracing::debug;

pub use tika::TikaClient;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("unsupported file type: {0}")]
    Unsupported(String),
    #[error("the uploaded file is empty")]
    Empty,
    #[error("text files must be UTF-8 encoded")]
    NotUtf8,
    #[error("document service request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("document service returned status {0}")]
    Status(u16),
}

/// MIME detection and text extraction service.
#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    /// Detect the MIME type of a document.
    async fn detect(&self, document: Bytes) -> Result<String, DocumentError>;

    /// Extract the plain text of a document.
    async fn parse(&self, document: Bytes) -> Result<String, DocumentError>;
}

/// Detect the type of `document` and return its text.
///
/// Office documents go through the extractor, plain text is used as is when it
/// is valid UTF-8 and anything else is rejected without further calls. The
/// whole document is buffered, so detection and extraction each see it from
/// the start.
pub async fn ingest(
    extractor: &dyn DocumentExtractor,
    document: Bytes,
) -> Result<String, DocumentError> {
    let detected = extractor.detect(document.clone()).await?;
    let essence = mime::essence(&detected);
    debug!(mime = %essence, size = document.len(), "detected document type");

    let text = if mime::is_convertible(&essence) {
        extractor.parse(document).await?
    } else if essence == mime::TXT {
        String::from_utf8(document.to_vec()).map_err(|_| {
            debug!(detected = %detected, "rejected non UTF-8 text");
            DocumentError::NotUtf8
        })?
    } else {
        return Err(DocumentError::Unsupported(essence));
    };

    if text.trim().is_empty() {
        return Err(DocumentError::Empty);
    }
    Ok(text)
}
