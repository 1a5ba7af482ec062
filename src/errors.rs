/*!
 * Error types for the docbridge application.
 *
 * This module contains custom error types for the storage, signing, submission
 * and workflow layers, using the thiserror crate for ergonomic error definitions.
 */

use std::fmt;
use thiserror::Error;

/// Errors that can occur when talking to object storage
#[derive(Error, Debug)]
pub enum StorageError {
    /// The requested object does not exist
    #[error("Object not found: {0}")]
    NotFound(String),

    /// The storage request could not be sent or completed
    #[error("Storage request failed: {0}")]
    RequestFailed(String),

    /// Error returned by the storage service itself
    #[error("Storage responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the service
        message: String,
    },

    /// The request could not be authorized
    #[error("Storage authorization failed: {0}")]
    Signing(#[from] SigningError),

    /// Local file error while reading or writing data
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Whether this error means the object is absent rather than unreachable
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Errors that can occur while issuing a signed access grant
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SigningError {
    /// The account key is empty or not valid base64
    #[error("Invalid storage credential: {0}")]
    InvalidCredential(String),

    /// The grant request itself is malformed
    #[error("Cannot sign request: {0}")]
    InvalidRequest(String),
}

/// Errors that can occur when submitting a batch to the translation service
#[derive(Error, Debug)]
pub enum SubmissionError {
    /// Network failure talking to the service (DNS, refused connection, timeout)
    #[error("Translation request failed: {0}")]
    Transport(String),

    /// The service answered with a non-2xx status
    #[error("Translation service rejected the batch: {status_code} - {message}")]
    Rejected {
        /// HTTP status code
        status_code: u16,
        /// Response body, if any
        message: String,
    },

    /// The request document could not be built
    #[error("Failed to build translation request: {0}")]
    InvalidDocument(String),
}

/// Failure of one or both staged-artifact deletions
#[derive(Debug)]
pub struct CleanupError {
    /// Failure deleting the staged source artifact
    pub source_failure: Option<(String, StorageError)>,
    /// Failure deleting the translated destination artifact
    pub destination_failure: Option<(String, StorageError)>,
}

impl CleanupError {
    /// Number of deletions that failed
    pub fn failure_count(&self) -> usize {
        usize::from(self.source_failure.is_some()) + usize::from(self.destination_failure.is_some())
    }
}

impl fmt::Display for CleanupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some((name, err)) = &self.source_failure {
            parts.push(format!("error deleting source document '{}': {}", name, err));
        }
        if let Some((name, err)) = &self.destination_failure {
            parts.push(format!("error deleting translated document '{}': {}", name, err));
        }
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for CleanupError {}

/// Terminal error of one translation workflow run
#[derive(Error, Debug)]
pub enum WorkflowError {
    /// Malformed storage credential; fatal, never retried
    #[error("{0}")]
    Credential(SigningError),

    /// Staging the source document failed; nothing was left in storage
    #[error("Error uploading file to blob storage: {0}")]
    Upload(#[source] StorageError),

    /// A signed access grant could not be issued
    #[error("Error generating container SAS token: {0}")]
    Signing(SigningError),

    /// The translation service could not be reached
    #[error("Error sending translation request: {0}")]
    SubmissionTransport(String),

    /// The batch request could not be built locally
    #[error("Error building translation request: {0}")]
    InvalidRequest(String),

    /// The translation service refused the batch
    #[error("Translation request rejected with status {status_code}: {message}")]
    SubmissionRejected {
        /// HTTP status code
        status_code: u16,
        /// Response body, if any
        message: String,
    },

    /// The translated document never appeared within the retry budget
    #[error("Translated document not ready after {attempts} attempt(s)")]
    PollingTimeout {
        /// Number of fetch attempts made
        attempts: u32,
    },

    /// Polling was cancelled by the caller
    #[error("Translation cancelled after {attempts} attempt(s)")]
    Cancelled {
        /// Number of fetch attempts made
        attempts: u32,
    },

    /// The translated document could not be written locally
    #[error("Error writing translated document: {0}")]
    Output(#[source] std::io::Error),

    /// Translation succeeded but staged artifacts could not be removed
    #[error("Cleanup failed: {0}")]
    Cleanup(#[source] CleanupError),

    /// A workflow error followed by a cleanup error; both are kept
    #[error("{primary}; additionally, cleanup failed: {cleanup}")]
    WithCleanupFailure {
        /// The error that ended the workflow
        #[source]
        primary: Box<WorkflowError>,
        /// The error raised while removing staged artifacts
        cleanup: CleanupError,
    },
}

impl WorkflowError {
    /// Whether the run ended because the retry budget ran out
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::PollingTimeout { .. } => true,
            Self::WithCleanupFailure { primary, .. } => primary.is_timeout(),
            _ => false,
        }
    }

    /// The cleanup failure carried by this error, if any
    pub fn cleanup_failure(&self) -> Option<&CleanupError> {
        match self {
            Self::Cleanup(cleanup) | Self::WithCleanupFailure { cleanup, .. } => Some(cleanup),
            _ => None,
        }
    }

    /// Attach the outcome of cleanup to this error, keeping both failures
    pub(crate) fn with_cleanup(self, cleanup: Result<(), CleanupError>) -> WorkflowError {
        match cleanup {
            Ok(()) => self,
            Err(cleanup) => Self::WithCleanupFailure {
                primary: Box::new(self),
                cleanup,
            },
        }
    }
}

impl From<SigningError> for WorkflowError {
    fn from(error: SigningError) -> Self {
        match error {
            SigningError::InvalidCredential(_) => Self::Credential(error),
            SigningError::InvalidRequest(_) => Self::Signing(error),
        }
    }
}

impl From<SubmissionError> for WorkflowError {
    fn from(error: SubmissionError) -> Self {
        match error {
            SubmissionError::Transport(message) => Self::SubmissionTransport(message),
            SubmissionError::InvalidDocument(message) => Self::InvalidRequest(message),
            SubmissionError::Rejected { status_code, message } => {
                Self::SubmissionRejected { status_code, message }
            }
        }
    }
}
