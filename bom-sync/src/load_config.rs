//! `load_config` module: captures the function's environment settings and
//! resolves them into a per-run [`SynchroniseConfig`].
//!
//! The environment is read once at startup. Validation is deferred to
//! [`FunctionConfig::resolve`], which runs per request, so a missing
//! `SMARTSHEET_ID` fails the request with a 500 rather than the process.
//!
//! # Variables
//! - `SMARTSHEET_ACCESS_TOKEN`: bearer token for the Smartsheet API
//! - `SMARTSHEET_ID`: integer id of the sheet to read
//! - `AZURE_STORAGE_CONNECTION_STRING`: storage account connection string
//! - `BLOB_CONTAINER_NAME`: container receiving `Latest_BOMS.csv`
//! - `SMARTSHEET_API_BASE` (optional): API root, for testing against a stub
use bom_sync_core::synchronise::SynchroniseConfig;
use bom_sync_core::SyncError;
use std::env;
use std::fmt;
use tracing::{debug, error, info};

pub const SMARTSHEET_ACCESS_TOKEN: &str = "SMARTSHEET_ACCESS_TOKEN";
pub const SMARTSHEET_ID: &str = "SMARTSHEET_ID";
pub const SMARTSHEET_API_BASE: &str = "SMARTSHEET_API_BASE";
pub const AZURE_STORAGE_CONNECTION_STRING: &str = "AZURE_STORAGE_CONNECTION_STRING";
pub const BLOB_CONTAINER_NAME: &str = "BLOB_CONTAINER_NAME";

pub const DEFAULT_SMARTSHEET_API_BASE: &str = "https://api.smartsheet.com/2.0";

#[derive(Clone, Default)]
pub struct FunctionConfig {
    pub smartsheet_access_token: Option<String>,
    /// Raw value; parsed in [`FunctionConfig::resolve`].
    pub smartsheet_id: Option<String>,
    pub smartsheet_api_base: String,
    pub storage_connection_string: Option<String>,
    pub blob_container_name: Option<String>,
}

impl fmt::Debug for FunctionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionConfig")
            .field("smartsheet_access_token_set", &self.smartsheet_access_token.is_some())
            .field("smartsheet_id", &self.smartsheet_id)
            .field("smartsheet_api_base", &self.smartsheet_api_base)
            .field("storage_connection_string_set", &self.storage_connection_string.is_some())
            .field("blob_container_name", &self.blob_container_name)
            .finish()
    }
}

impl FunctionConfig {
    /// Reads the process environment. Never fails; see [`FunctionConfig::resolve`].
    pub fn from_env() -> Self {
        FunctionConfig {
            smartsheet_access_token: env::var(SMARTSHEET_ACCESS_TOKEN).ok(),
            smartsheet_id: env::var(SMARTSHEET_ID).ok(),
            smartsheet_api_base: env::var(SMARTSHEET_API_BASE)
                .unwrap_or_else(|_| DEFAULT_SMARTSHEET_API_BASE.to_string()),
            storage_connection_string: env::var(AZURE_STORAGE_CONNECTION_STRING).ok(),
            blob_container_name: env::var(BLOB_CONTAINER_NAME).ok(),
        }
    }

    pub fn trace_loaded(&self) {
        info!(
            smartsheet_id = self.smartsheet_id.as_deref().unwrap_or("<unset>"),
            access_token_set = self.smartsheet_access_token.is_some(),
            connection_string_set = self.storage_connection_string.is_some(),
            container = self.blob_container_name.as_deref().unwrap_or("<unset>"),
            "Loaded function configuration"
        );
        debug!(config = ?self, "Function configuration (full debug)");
    }

    /// Validates the settings a run needs up front.
    pub fn resolve(&self) -> Result<SynchroniseConfig, SyncError> {
        let raw = match self.smartsheet_id.as_deref() {
            Some(raw) => raw,
            None => {
                error!("SMARTSHEET_ID environment variable not set");
                return Err(SyncError::Config(format!(
                    "Environment variable {SMARTSHEET_ID} is not set"
                )));
            }
        };
        let sheet_id = raw.trim().parse::<i64>().map_err(|e| {
            error!(error = ?e, value = %raw, "SMARTSHEET_ID must be a valid integer");
            SyncError::Config(format!("{SMARTSHEET_ID} must be a valid integer: {e}"))
        })?;

        Ok(SynchroniseConfig {
            sheet_id,
            container: self.blob_container_name.clone(),
        })
    }
}

/// Loads `.env` if present, then captures the environment.
pub fn load_config() -> FunctionConfig {
    if let Ok(path) = dotenvy::dotenv() {
        info!(path = %path.display(), "Loaded .env file");
    }
    let config = FunctionConfig::from_env();
    config.trace_loaded();
    config
}
