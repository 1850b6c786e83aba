//! # contract: seams between the pipeline and the outside world
//!
//! The pipeline talks to two remote services: the Smartsheet API (rows and
//! their attachments) and an object store (where the combined CSV lands).
//! Both are expressed as async traits so the binary crate can plug in real
//! HTTP clients and tests can plug in `mockall` doubles.
//!
//! Errors crossing these traits are boxed; the pipeline maps them onto
//! [`crate::error::SyncError`] kinds.

use async_trait::async_trait;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

/// Error type returned by adapter implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A Smartsheet sheet, reduced to what the pipeline reads.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct Sheet {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    pub id: i64,
    #[serde(default)]
    pub row_number: Option<i64>,
}

/// A file attached to a row.
///
/// The list endpoint usually leaves `url` empty; a download URL is obtained
/// by fetching the attachment on its own.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// Read access to Smartsheet rows and attachments.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait SheetSource: Send + Sync {
    /// Fetch a sheet with its rows, in sheet order.
    async fn get_sheet(&self, sheet_id: i64) -> Result<Sheet, BoxError>;

    /// List the attachments of one row, in the order the API returns them.
    async fn list_row_attachments(
        &self,
        sheet_id: i64,
        row_id: i64,
    ) -> Result<Vec<Attachment>, BoxError>;

    /// Fetch a single attachment, including a short-lived download URL.
    async fn get_attachment(&self, sheet_id: i64, attachment_id: i64)
        -> Result<Attachment, BoxError>;

    /// Download the bytes behind an attachment URL.
    async fn download(&self, url: &str) -> Result<Vec<u8>, BoxError>;
}

/// A full-content write of one object.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBlob {
    pub container: String,
    pub name: String,
    pub content_type: String,
    pub content: String,
}

/// What the store reports back after a successful write.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedBlob {
    pub container: String,
    pub name: String,
    pub etag: Option<String>,
    pub size: usize,
}

/// Write access to object storage. Writes always overwrite.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload_blob(&self, req: NewBlob) -> Result<UploadedBlob, BoxError>;
}
