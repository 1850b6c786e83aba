//! Walks a sheet's rows and keeps the attachments that look like workbooks.

use tracing::{debug, error, info};

use crate::contract::{Attachment, SheetSource};
use crate::error::SyncError;

/// Filename suffixes that are treated as workbooks. Matched exactly and
/// case-sensitively.
pub const SPREADSHEET_SUFFIXES: [&str; 2] = [".xlsm", ".xlsx"];

/// Workbook attachments of one sheet plus the number of rows visited.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttachmentListing {
    pub rows_scanned: usize,
    pub attachments: Vec<RowAttachment>,
}

/// An attachment together with the row it hangs off.
#[derive(Debug, Clone, PartialEq)]
pub struct RowAttachment {
    pub row_id: i64,
    pub attachment: Attachment,
}

pub fn is_spreadsheet_name(name: &str) -> bool {
    SPREADSHEET_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

/// Lists every workbook attachment of the sheet, in row order and then in
/// each row's attachment order. One attachment request is made per row.
pub async fn collect_spreadsheet_attachments<S>(
    source: &S,
    sheet_id: i64,
) -> Result<AttachmentListing, SyncError>
where
    S: SheetSource + ?Sized,
{
    info!(sheet_id, "[ENUMERATE] Fetching sheet");
    let sheet = source.get_sheet(sheet_id).await.map_err(|e| {
        error!(sheet_id, error = %e, "[ENUMERATE][ERROR] Failed to fetch sheet");
        SyncError::Upstream(e)
    })?;
    info!(sheet_id, sheet_name = %sheet.name, rows = sheet.rows.len(), "[ENUMERATE] Sheet fetched");

    let mut matched = Vec::new();
    for row in &sheet.rows {
        let attachments = source
            .list_row_attachments(sheet_id, row.id)
            .await
            .map_err(|e| {
                error!(sheet_id, row_id = row.id, error = %e, "[ENUMERATE][ERROR] Failed to list row attachments");
                SyncError::Upstream(e)
            })?;
        for attachment in attachments {
            if is_spreadsheet_name(&attachment.name) {
                info!(row_id = row.id, attachment = %attachment.name, "[ENUMERATE] Spreadsheet attachment found");
                matched.push(RowAttachment {
                    row_id: row.id,
                    attachment,
                });
            } else {
                debug!(row_id = row.id, attachment = %attachment.name, "[ENUMERATE] Skipping non-spreadsheet attachment");
            }
        }
    }

    Ok(AttachmentListing {
        rows_scanned: sheet.rows.len(),
        attachments: matched,
    })
}
