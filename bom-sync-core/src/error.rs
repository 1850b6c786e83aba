use thiserror::Error;

use crate::contract::BoxError;
use crate::xlsx::XlsxError;

/// Every way a run can fail. The request handler turns all of them into
/// the same 500 response; the kind is kept for logs and tests.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{0}")]
    Config(String),

    #[error("Smartsheet request failed: {0}")]
    Upstream(BoxError),

    #[error("Failed to read attachment '{name}': {source}")]
    Parse { name: String, source: XlsxError },

    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Blob upload failed: {0}")]
    Storage(BoxError),
}

impl SyncError {
    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::Config(_) => "config",
            SyncError::Upstream(_) => "upstream",
            SyncError::Parse { .. } => "parse",
            SyncError::Csv(_) => "csv",
            SyncError::Storage(_) => "storage",
        }
    }
}
