//! CSV serialization and the single overwrite of the destination blob.

use tracing::{error, info};

use crate::contract::{NewBlob, UploadedBlob, Uploader};
use crate::error::SyncError;
use crate::table::Table;

/// Fixed name of the object the combined table is written to.
pub const DESTINATION_BLOB_NAME: &str = "Latest_BOMS.csv";
pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

/// Header line, then one `\n`-terminated line per record. Missing values
/// are empty fields; fields are quoted only when they need to be.
pub fn to_csv(table: &Table) -> Result<String, SyncError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(&table.columns)?;
    for record in &table.records {
        writer.write_record(record.iter().map(|value| value.as_deref().unwrap_or("")))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| SyncError::Csv(e.into_error().into()))?;
    String::from_utf8(bytes)
        .map_err(|e| SyncError::Csv(std::io::Error::new(std::io::ErrorKind::InvalidData, e).into()))
}

/// Writes the table as CSV to `container/Latest_BOMS.csv`, replacing any
/// previous content.
pub async fn publish<U>(
    uploader: &U,
    container: Option<&str>,
    table: &Table,
) -> Result<UploadedBlob, SyncError>
where
    U: Uploader + ?Sized,
{
    let container = container
        .filter(|name| !name.is_empty())
        .ok_or_else(|| SyncError::Config("Environment variable BLOB_CONTAINER_NAME is not set".to_string()))?;

    let content = to_csv(table)?;
    info!(
        container,
        blob = DESTINATION_BLOB_NAME,
        bytes = content.len(),
        records = table.len(),
        "[PUBLISH] Uploading combined table"
    );

    let request = NewBlob {
        container: container.to_string(),
        name: DESTINATION_BLOB_NAME.to_string(),
        content_type: CSV_CONTENT_TYPE.to_string(),
        content,
    };
    match uploader.upload_blob(request).await {
        Ok(uploaded) => {
            info!(container, blob = %uploaded.name, etag = ?uploaded.etag, "[PUBLISH] Upload succeeded");
            Ok(uploaded)
        }
        Err(e) => {
            error!(container, blob = DESTINATION_BLOB_NAME, error = %e, "[PUBLISH][ERROR] Upload failed");
            Err(SyncError::Storage(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_has_header_and_no_index_column() {
        let mut table = Table::new(vec!["assembly".into(), "description".into(), "qty".into()]);
        table.push_record(vec![Some("A1".into()), Some("Widget".into()), Some("5".into())]);
        table.push_record(vec![Some("A2".into()), None, Some("3".into())]);

        assert_eq!(
            to_csv(&table).unwrap(),
            "assembly,description,qty\nA1,Widget,5\nA2,,3\n"
        );
    }

    #[test]
    fn fields_with_commas_and_quotes_are_quoted() {
        let mut table = Table::new(vec!["assembly".into(), "description".into()]);
        table.push_record(vec![Some("A1".into()), Some("Bolt, \"hex\"".into())]);

        assert_eq!(
            to_csv(&table).unwrap(),
            "assembly,description\nA1,\"Bolt, \"\"hex\"\"\"\n"
        );
    }
}
