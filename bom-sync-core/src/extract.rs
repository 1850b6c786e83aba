//! Downloads workbook attachments and keeps the tabs that carry BOM columns.

use tracing::{debug, error, info};

use crate::contract::SheetSource;
use crate::enumerate::RowAttachment;
use crate::error::SyncError;
use crate::table::Table;
use crate::xlsx;

/// Downloads and parses each attachment in turn. The first failure aborts.
///
/// Tabs without both `assembly` and `description` are dropped without
/// error. The result keeps attachment order, then workbook tab order.
pub async fn extract_tables<S>(
    source: &S,
    sheet_id: i64,
    attachments: &[RowAttachment],
) -> Result<Vec<Table>, SyncError>
where
    S: SheetSource + ?Sized,
{
    let mut tables = Vec::new();
    for RowAttachment { row_id, attachment } in attachments {
        let url = match &attachment.url {
            Some(url) => url.clone(),
            None => {
                debug!(attachment_id = attachment.id, "[EXTRACT] Resolving attachment download URL");
                let resolved = source
                    .get_attachment(sheet_id, attachment.id)
                    .await
                    .map_err(|e| {
                        error!(attachment = %attachment.name, error = %e, "[EXTRACT][ERROR] Failed to fetch attachment");
                        SyncError::Upstream(e)
                    })?;
                resolved.url.ok_or_else(|| {
                    SyncError::Upstream(
                        format!("attachment '{}' has no download URL", attachment.name).into(),
                    )
                })?
            }
        };

        info!(row_id, attachment = %attachment.name, "[EXTRACT] Downloading attachment");
        let bytes = source.download(&url).await.map_err(|e| {
            error!(attachment = %attachment.name, error = %e, "[EXTRACT][ERROR] Download failed");
            SyncError::Upstream(e)
        })?;

        let worksheets = xlsx::read_workbook(&bytes).map_err(|err| {
            error!(attachment = %attachment.name, error = %err, "[EXTRACT][ERROR] Attachment is not a readable workbook");
            SyncError::Parse {
                name: attachment.name.clone(),
                source: err,
            }
        })?;

        for worksheet in worksheets {
            if worksheet.table.has_bom_columns() {
                debug!(attachment = %attachment.name, tab = %worksheet.name, records = worksheet.table.len(), "[EXTRACT] Keeping tab");
                tables.push(worksheet.table);
            }
        }
    }
    info!(tables = tables.len(), "[EXTRACT] Extraction finished");
    Ok(tables)
}
