use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, error};
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use url::Url;

use crate::app_config::StorageConfig;
use crate::errors::{SigningError, StorageError};
use crate::storage::sas::{SasSigner, SharedKeyCredential};
use crate::storage::{BlobStore, Permissions, SignedAccessGrant, SignedScope};

/// Lifetime of the grants used to authorize our own storage calls
const OPERATION_GRANT_EXPIRY: Duration = Duration::from_secs(15 * 60);

/// Azure Blob Storage client for a single container
///
/// Every request is authorized with its own short-lived SAS scoped to the one
/// object and the one permission it needs.
#[derive(Debug, Clone)]
pub struct AzureBlobStore {
    /// HTTP client for API requests
    client: Client,
    /// Signer bound to the configured container
    signer: SasSigner,
    /// Container URL requests are sent to
    base_url: String,
}

impl AzureBlobStore {
    /// Create a new store sending requests to the container's public URL
    pub fn new(client: Client, signer: SasSigner) -> Self {
        let base_url = signer.container_url();
        Self {
            client,
            signer,
            base_url,
        }
    }

    /// Create a store from configuration, validating the account key
    pub fn from_config(config: &StorageConfig, client: Client) -> Result<Self, SigningError> {
        let credential = SharedKeyCredential::new(&config.blob_account_name, &config.blob_account_key)?;
        let signer = SasSigner::new(credential, &config.blob_container_name, &config.blob_endpoint_suffix);
        Ok(Self::new(client, signer))
    }

    /// Send requests to another container URL (emulators, test servers)
    ///
    /// Signed URLs handed out by `sign` still point at the public HTTPS endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn operation_url(&self, name: &str, permissions: Permissions) -> Result<Url, StorageError> {
        let grant = self
            .signer
            .sign(SignedScope::Object(name.to_string()), permissions, OPERATION_GRANT_EXPIRY)?;

        let mut url = Url::parse(&self.base_url)
            .map_err(|e| StorageError::RequestFailed(format!("Invalid container URL '{}': {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| StorageError::RequestFailed(format!("Invalid container URL '{}'", self.base_url)))?
            .pop_if_empty()
            .push(name);
        url.set_query(Some(&grant.query));
        Ok(url)
    }

    async fn api_error(name: &str, response: Response) -> StorageError {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return StorageError::NotFound(name.to_string());
        }
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to get error response text".to_string());
        error!("Blob storage error ({}) for '{}': {}", status, name, message);
        StorageError::ApiError {
            status_code: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl BlobStore for AzureBlobStore {
    async fn put(&self, name: &str, data: Bytes) -> Result<(), StorageError> {
        let url = self.operation_url(name, Permissions::write_only())?;
        let size = data.len();

        let response = self
            .client
            .put(url)
            .header("x-ms-blob-type", "BlockBlob")
            .body(data)
            .send()
            .await
            .map_err(|e| StorageError::RequestFailed(format!("Failed to upload '{}': {}", name, e)))?;

        if !response.status().is_success() {
            return Err(Self::api_error(name, response).await);
        }

        debug!("Uploaded {} bytes to '{}'", size, name);
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Bytes, StorageError> {
        let url = self.operation_url(name, Permissions::read_only())?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| StorageError::RequestFailed(format!("Failed to download '{}': {}", name, e)))?;

        if !response.status().is_success() {
            return Err(Self::api_error(name, response).await);
        }

        response
            .bytes()
            .await
            .map_err(|e| StorageError::RequestFailed(format!("Failed to read '{}': {}", name, e)))
    }

    async fn delete(&self, name: &str) -> Result<(), StorageError> {
        let url = self.operation_url(name, Permissions::delete_only())?;

        let response = self
            .client
            .delete(url)
            .header("x-ms-delete-snapshots", "include")
            .send()
            .await
            .map_err(|e| StorageError::RequestFailed(format!("Failed to delete '{}': {}", name, e)))?;

        if !response.status().is_success() {
            return Err(Self::api_error(name, response).await);
        }

        Ok(())
    }

    fn sign(
        &self,
        scope: SignedScope,
        permissions: Permissions,
        expiry: Duration,
    ) -> Result<SignedAccessGrant, SigningError> {
        self.signer.sign(scope, permissions, expiry)
    }
}
