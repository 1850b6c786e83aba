//! # Blob upload (CLI <-> Core)
//!
//! Implements [`bom_sync_core::contract::Uploader`] for Azure Blob Storage
//! on top of `object_store`. Every upload is a single put of a block blob,
//! which replaces any existing blob of the same name.
//!
//! The connection string is parsed when an upload happens, not at startup,
//! so a run that has nothing to publish never needs storage settings.
//!
//! Supported connection-string keys: `DefaultEndpointsProtocol`,
//! `AccountName`, `AccountKey`, `EndpointSuffix`, `BlobEndpoint`,
//! `SharedAccessSignature` and `UseDevelopmentStorage=true` (Azurite).

use async_trait::async_trait;
use bom_sync_core::contract::{BoxError, NewBlob, UploadedBlob, Uploader};
use object_store::azure::{AzureConfigKey, MicrosoftAzureBuilder};
use object_store::path::Path;
use object_store::{Attribute, Attributes, ObjectStore, PutOptions, PutPayload};
use reqwest::Url;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::load_config::FunctionConfig;

#[derive(Debug, Error)]
pub enum ConnectionStringError {
    #[error("Environment variable AZURE_STORAGE_CONNECTION_STRING is not set")]
    Missing,

    #[error("Malformed connection string segment '{0}'")]
    Malformed(String),

    #[error("Connection string is missing {0}")]
    MissingKey(&'static str),

    #[error("Invalid blob endpoint '{0}'")]
    InvalidEndpoint(String),
}

#[derive(Debug, Error)]
pub enum BlobError {
    #[error(transparent)]
    ConnectionString(#[from] ConnectionStringError),

    #[error(transparent)]
    Store(#[from] object_store::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Credential {
    /// Base64 account key, validated when the store is built.
    AccessKey(String),
    /// Query string without the leading `?`.
    Sas(String),
    /// Azurite's well-known account and key.
    Emulator,
}

/// Storage account settings parsed from a connection string.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageAccount {
    pub account_name: String,
    /// `None` targets the emulator endpoint.
    pub blob_endpoint: Option<Url>,
    pub credential: Credential,
}

impl StorageAccount {
    pub fn from_connection_string(raw: &str) -> Result<Self, ConnectionStringError> {
        let mut settings: HashMap<String, String> = HashMap::new();
        for segment in raw.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let (key, value) = segment
                .split_once('=')
                .ok_or_else(|| ConnectionStringError::Malformed(segment.to_string()))?;
            settings.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
        }

        if settings
            .get("usedevelopmentstorage")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
        {
            return Ok(StorageAccount {
                account_name: "devstoreaccount1".to_string(),
                blob_endpoint: None,
                credential: Credential::Emulator,
            });
        }

        let blob_endpoint = match settings.get("blobendpoint") {
            Some(endpoint) => parse_endpoint(endpoint)?,
            None => {
                let account = settings
                    .get("accountname")
                    .ok_or(ConnectionStringError::MissingKey("AccountName"))?;
                let protocol = settings
                    .get("defaultendpointsprotocol")
                    .map(String::as_str)
                    .unwrap_or("https");
                let suffix = settings
                    .get("endpointsuffix")
                    .map(String::as_str)
                    .unwrap_or("core.windows.net");
                parse_endpoint(&format!("{protocol}://{account}.blob.{suffix}"))?
            }
        };

        let credential = if let Some(key) = settings.get("accountkey") {
            Credential::AccessKey(key.clone())
        } else if let Some(sas) = settings.get("sharedaccesssignature") {
            Credential::Sas(sas.trim_start_matches('?').to_string())
        } else {
            return Err(ConnectionStringError::MissingKey(
                "AccountKey or SharedAccessSignature",
            ));
        };

        // A SAS with only a BlobEndpoint names the account in the host.
        let account_name = match settings.get("accountname") {
            Some(account) => account.clone(),
            None if matches!(credential, Credential::Sas(_)) => blob_endpoint
                .host_str()
                .and_then(|host| host.split('.').next())
                .filter(|label| !label.is_empty())
                .map(str::to_string)
                .ok_or(ConnectionStringError::MissingKey("AccountName"))?,
            None => return Err(ConnectionStringError::MissingKey("AccountName")),
        };

        Ok(StorageAccount {
            account_name,
            blob_endpoint: Some(blob_endpoint),
            credential,
        })
    }

    /// Builder for one container of this account.
    pub fn builder(&self, container: &str) -> MicrosoftAzureBuilder {
        let mut builder = MicrosoftAzureBuilder::new()
            .with_account(&self.account_name)
            .with_container_name(container);
        if let Some(endpoint) = &self.blob_endpoint {
            builder = builder
                .with_endpoint(endpoint.as_str().trim_end_matches('/').to_string())
                .with_allow_http(endpoint.scheme() == "http");
        }
        match &self.credential {
            Credential::AccessKey(key) => builder.with_access_key(key),
            Credential::Sas(sas) => builder.with_config(AzureConfigKey::SasKey, sas),
            Credential::Emulator => builder.with_use_emulator(true),
        }
    }
}

fn parse_endpoint(raw: &str) -> Result<Url, ConnectionStringError> {
    Url::parse(raw).map_err(|_| ConnectionStringError::InvalidEndpoint(raw.to_string()))
}

/// Writes `req` into `store` under `req.name`, replacing any existing object.
pub async fn put_blob(store: &dyn ObjectStore, req: &NewBlob) -> Result<UploadedBlob, BlobError> {
    let path = Path::from(req.name.as_str());
    let size = req.content.len();
    let mut attributes = Attributes::new();
    attributes.insert(Attribute::ContentType, req.content_type.clone().into());
    let options = PutOptions {
        attributes,
        ..Default::default()
    };

    tracing::debug!(container = %req.container, blob = %path, bytes = size, "Put Blob");
    let result = store
        .put_opts(&path, PutPayload::from(req.content.clone()), options)
        .await?;
    Ok(UploadedBlob {
        container: req.container.clone(),
        name: req.name.clone(),
        etag: result.e_tag,
        size,
    })
}

pub struct AzureBlobClient {
    connection_string: Option<String>,
}

impl AzureBlobClient {
    pub fn new(connection_string: Option<String>) -> Self {
        AzureBlobClient { connection_string }
    }

    pub fn from_config(config: &FunctionConfig) -> Self {
        AzureBlobClient::new(config.storage_connection_string.clone())
    }

    fn account(&self) -> Result<StorageAccount, ConnectionStringError> {
        let raw = self
            .connection_string
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConnectionStringError::Missing)?;
        StorageAccount::from_connection_string(raw)
    }

    /// Object store scoped to `container`.
    pub fn store(&self, container: &str) -> Result<Arc<dyn ObjectStore>, BlobError> {
        let store = self.account()?.builder(container).build()?;
        Ok(Arc::new(store))
    }
}

#[async_trait]
impl Uploader for AzureBlobClient {
    async fn upload_blob(&self, req: NewBlob) -> Result<UploadedBlob, BoxError> {
        tracing::info!(container = %req.container, blob = %req.name, "Uploading blob");
        let uploaded = async {
            let store = self.store(&req.container)?;
            put_blob(store.as_ref(), &req).await
        }
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Blob upload failed");
            e
        })?;
        tracing::info!(etag = ?uploaded.etag, size = uploaded.size, "Blob uploaded");
        Ok(uploaded)
    }
}
