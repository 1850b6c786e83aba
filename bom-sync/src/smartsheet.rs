//! Smartsheet API 2.0 client implementing [`SheetSource`].
//!
//! Only the read endpoints the pipeline needs are wrapped. Attachment
//! downloads go to pre-signed URLs and are fetched without credentials.

use async_trait::async_trait;
use bom_sync_core::contract::{Attachment, BoxError, SheetSource, Sheet};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use crate::load_config::FunctionConfig;

#[derive(Debug, Error)]
pub enum SmartsheetError {
    #[error("Environment variable SMARTSHEET_ACCESS_TOKEN is not set")]
    MissingToken,

    #[error("Smartsheet API returned {status} (errorCode {code}): {message}")]
    Api {
        status: u16,
        code: i64,
        message: String,
    },

    #[error("{0}")]
    Http(#[from] reqwest::Error),
}

/// Error body returned by the API on non-2xx responses.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiErrorBody {
    #[serde(default)]
    error_code: i64,
    #[serde(default)]
    message: String,
}

/// Paged list wrapper (`IndexResult` in the API docs).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexResult<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

pub struct SmartsheetClient {
    http: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
}

impl SmartsheetClient {
    pub fn new(base_url: impl Into<String>, access_token: Option<String>) -> Self {
        SmartsheetClient {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token,
        }
    }

    pub fn from_config(config: &FunctionConfig) -> Self {
        if config.smartsheet_access_token.is_none() {
            tracing::warn!("SMARTSHEET_ACCESS_TOKEN missing in environment; API calls will fail");
        }
        SmartsheetClient::new(
            config.smartsheet_api_base.clone(),
            config.smartsheet_access_token.clone(),
        )
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, SmartsheetError> {
        let token = self
            .access_token
            .as_deref()
            .ok_or(SmartsheetError::MissingToken)?;
        let url = self.endpoint(path);
        tracing::debug!(url = %url, "Smartsheet GET");

        let response = self.http.get(&url).bearer_auth(token).send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, url = %url, "Smartsheet API returned error. Response body: {text}");
            return Err(api_error(status.as_u16(), &text));
        }
        Ok(response.json::<T>().await?)
    }
}

fn api_error(status: u16, body: &str) -> SmartsheetError {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => SmartsheetError::Api {
            status,
            code: parsed.error_code,
            message: parsed.message,
        },
        Err(_) => SmartsheetError::Api {
            status,
            code: 0,
            message: body.trim().to_string(),
        },
    }
}

#[async_trait]
impl SheetSource for SmartsheetClient {
    async fn get_sheet(&self, sheet_id: i64) -> Result<Sheet, BoxError> {
        tracing::info!(sheet_id, "Fetching sheet with ID");
        Ok(self.get_json::<Sheet>(&format!("sheets/{sheet_id}")).await?)
    }

    async fn list_row_attachments(
        &self,
        sheet_id: i64,
        row_id: i64,
    ) -> Result<Vec<Attachment>, BoxError> {
        let page: IndexResult<Attachment> = self
            .get_json(&format!(
                "sheets/{sheet_id}/rows/{row_id}/attachments?includeAll=true"
            ))
            .await?;
        Ok(page.data)
    }

    async fn get_attachment(
        &self,
        sheet_id: i64,
        attachment_id: i64,
    ) -> Result<Attachment, BoxError> {
        Ok(self
            .get_json::<Attachment>(&format!("sheets/{sheet_id}/attachments/{attachment_id}"))
            .await?)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, BoxError> {
        let response = self.http.get(url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;
        tracing::debug!(bytes = bytes.len(), "Attachment downloaded");
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_without_double_slash() {
        let client = SmartsheetClient::new("https://api.smartsheet.com/2.0/", None);
        assert_eq!(
            client.endpoint("/sheets/1"),
            "https://api.smartsheet.com/2.0/sheets/1"
        );
    }

    #[test]
    fn sheet_and_attachment_payloads_deserialize() {
        let sheet: Sheet = serde_json::from_str(
            r#"{"id": 7, "name": "BOMs", "columns": [], "rows": [{"id": 11, "rowNumber": 1, "cells": []}, {"id": 12, "rowNumber": 2}]}"#,
        )
        .unwrap();
        assert_eq!(sheet.rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![11, 12]);

        let page: IndexResult<Attachment> = serde_json::from_str(
            r#"{"pageNumber": 1, "totalPages": 1, "data": [{"id": 5, "name": "bom.xlsx", "attachmentType": "FILE", "mimeType": "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"}]}"#,
        )
        .unwrap();
        assert_eq!(page.data[0].name, "bom.xlsx");
        assert_eq!(page.data[0].url, None);
    }

    #[test]
    fn api_error_body_is_parsed() {
        let err = api_error(404, r#"{"errorCode": 1006, "message": "Not Found", "refId": "abc"}"#);
        assert_eq!(
            err.to_string(),
            "Smartsheet API returned 404 (errorCode 1006): Not Found"
        );

        let err = api_error(502, "Bad gateway\n");
        assert_eq!(
            err.to_string(),
            "Smartsheet API returned 502 (errorCode 0): Bad gateway"
        );
    }

    #[tokio::test]
    async fn missing_token_fails_before_any_request() {
        let client = SmartsheetClient::new("http://127.0.0.1:9", None);
        let err = client.get_sheet(1).await.unwrap_err();
        assert!(err.to_string().contains("SMARTSHEET_ACCESS_TOKEN"));
    }
}
