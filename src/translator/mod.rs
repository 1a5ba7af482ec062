/*!
 * Clients for the remote document translation service.
 *
 * - `azure`: Azure Document Translation batch API client
 * - `mock`: Scripted translator for tests
 * - `document`: Batch request payload
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::SubmissionError;

pub mod azure;
pub mod document;
pub mod mock;

pub use document::BatchRequest;

/// Acknowledgement of an accepted batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    /// HTTP status the service answered with (always 2xx)
    pub status_code: u16,
    /// Status URL of the queued batch, when the service returned one
    pub operation_location: Option<String>,
}

/// Common trait for translation services
///
/// An `Ok` receipt only means the batch was queued, not that it finished.
#[async_trait]
pub trait DocumentTranslator: Send + Sync + Debug {
    /// Submit a batch request
    async fn submit(&self, request: &BatchRequest) -> Result<SubmissionReceipt, SubmissionError>;
}

/// Build a one-document batch from signed URLs and submit it
pub async fn submit_job(
    translator: &dyn DocumentTranslator,
    source_url: &str,
    target_url: &str,
    source_language: Option<&str>,
    target_language: &str,
) -> Result<SubmissionReceipt, SubmissionError> {
    let request = BatchRequest::single(source_url, target_url, source_language, target_language);
    translator.submit(&request).await
}
