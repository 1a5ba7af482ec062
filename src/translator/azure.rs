use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;

use crate::app_config::TranslatorServiceConfig;
use crate::errors::SubmissionError;
use crate::translator::{BatchRequest, DocumentTranslator, SubmissionReceipt};

/// Azure Document Translation client
#[derive(Debug, Clone)]
pub struct AzureDocumentTranslator {
    /// HTTP client for API requests
    client: Client,
    /// Resource endpoint, without the API path
    endpoint: String,
    /// Subscription key
    api_key: String,
    /// Subscription region
    region: String,
    /// Batch API version
    api_version: String,
}

impl AzureDocumentTranslator {
    /// Create a new client
    pub fn new(
        client: Client,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        region: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            region: region.into(),
            api_version: api_version.into(),
        }
    }

    /// Create a client from configuration
    pub fn from_config(config: &TranslatorServiceConfig, client: Client) -> Self {
        Self::new(
            client,
            &config.translator_endpoint,
            &config.translator_key,
            &config.translator_region,
            &config.translator_api_version,
        )
    }

    /// URL batches are posted to
    pub fn batches_url(&self) -> String {
        format!(
            "{}/translator/document/batches?api-version={}",
            self.endpoint.trim_end_matches('/'),
            self.api_version
        )
    }
}

#[async_trait]
impl DocumentTranslator for AzureDocumentTranslator {
    async fn submit(&self, request: &BatchRequest) -> Result<SubmissionReceipt, SubmissionError> {
        let body = request.to_pretty_json()?;

        let response = self
            .client
            .post(self.batches_url())
            .header("Ocp-Apim-Subscription-Key", &self.api_key)
            .header("Content-Type", "application/json")
            .header("Ocp-Apim-Subscription-Region", &self.region)
            .body(body)
            .send()
            .await
            .map_err(|e| SubmissionError::Transport(format!("Failed to send request to translation service: {}", e)))?;

        let status = response.status();
        debug!("response status: {}", status);
        debug!("response headers: {:?}", response.headers());

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Translation service error ({}): {}", status, error_text);
            return Err(SubmissionError::Rejected {
                status_code: status.as_u16(),
                message: error_text,
            });
        }

        let operation_location = response
            .headers()
            .get("Operation-Location")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        Ok(SubmissionReceipt {
            status_code: status.as_u16(),
            operation_location,
        })
    }
}
