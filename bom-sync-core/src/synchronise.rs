//! High-level pipeline: enumerate → extract → transform → publish.
//!
//! One call to [`synchronise`] performs a complete run for one sheet:
//!   - lists the sheet's rows and, per row, its workbook attachments
//!   - downloads each workbook and keeps the tabs carrying BOM columns
//!   - unions the kept tabs and derives `Formatted PON`
//!   - overwrites `Latest_BOMS.csv` in the configured container
//!
//! The run is fail-fast: the first error from any stage is returned as a
//! [`SyncError`] and nothing after it runs. When no tab qualifies, nothing
//! is uploaded and the run still succeeds.
//!
//! Both remote services are injected ([`SheetSource`], [`Uploader`]), so the
//! whole pipeline runs against mocks in tests.

use tracing::{error, info};

use crate::contract::{SheetSource, UploadedBlob, Uploader};
use crate::enumerate::collect_spreadsheet_attachments;
use crate::error::SyncError;
use crate::extract::extract_tables;
use crate::publish::publish;
use crate::transform::{concat_tables, derive_formatted_pon};

/// Settings for one run, resolved from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SynchroniseConfig {
    pub sheet_id: i64,
    /// Only needed when there is something to upload.
    pub container: Option<String>,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct SynchroniseReport {
    pub rows_scanned: usize,
    pub attachments_matched: usize,
    pub tables_kept: usize,
    pub records_written: usize,
    /// `None` when nothing qualified and the upload was skipped.
    pub uploaded: Option<UploadedBlob>,
}

pub async fn synchronise<S, U>(
    config: &SynchroniseConfig,
    source: &S,
    uploader: &U,
) -> Result<SynchroniseReport, SyncError>
where
    S: SheetSource + ?Sized,
    U: Uploader + ?Sized,
{
    info!(sheet_id = config.sheet_id, "[SYNC] Starting synchronisation");

    let listing = collect_spreadsheet_attachments(source, config.sheet_id).await?;
    info!(
        rows = listing.rows_scanned,
        attachments = listing.attachments.len(),
        "[SYNC] Enumeration finished"
    );

    let tables = extract_tables(source, config.sheet_id, &listing.attachments).await?;
    let tables_kept = tables.len();

    if tables.is_empty() {
        info!("[SYNC] No data frames were created. Please check if there are any attachments to process.");
        return Ok(SynchroniseReport {
            rows_scanned: listing.rows_scanned,
            attachments_matched: listing.attachments.len(),
            tables_kept,
            records_written: 0,
            uploaded: None,
        });
    }

    let mut combined = concat_tables(tables);
    derive_formatted_pon(&mut combined);
    info!(
        records = combined.len(),
        columns = combined.columns.len(),
        "[SYNC] Combined table built"
    );

    let uploaded = publish(uploader, config.container.as_deref(), &combined)
        .await
        .inspect_err(|e| error!(kind = e.kind(), error = %e, "[SYNC][ERROR] Publish step failed"))?;
    info!("[SYNC] Data processed and uploaded to blob storage");

    Ok(SynchroniseReport {
        rows_scanned: listing.rows_scanned,
        attachments_matched: listing.attachments.len(),
        tables_kept,
        records_written: combined.len(),
        uploaded: Some(uploaded),
    })
}
