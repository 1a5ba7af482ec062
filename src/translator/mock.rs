/*!
 * Mock translator implementation for testing.
 *
 * This module provides a translator that simulates the remote service:
 * - `MockTranslator::completing()` - Accepts the batch and writes the result
 *   into the paired in-memory store after a number of reads
 * - `MockTranslator::accepting()` - Accepts the batch but never writes a result
 * - `MockTranslator::rejecting()` - Answers with a non-2xx status
 * - `MockTranslator::unreachable()` - Fails with a transport error
 */

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use percent_encoding::percent_decode_str;
use url::Url;

use crate::errors::SubmissionError;
use crate::storage::memory::InMemoryBlobStore;
use crate::translator::{BatchRequest, DocumentTranslator, SubmissionReceipt};

/// Behavior mode for the mock translator
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Accept, then make the result readable after `misses` failed reads
    Completes { misses: u32, content: Bytes },
    /// Accept and never produce a result
    NeverCompletes,
    /// Answer with the given status
    Rejects { status_code: u16 },
    /// Fail before any response
    Unreachable,
}

/// Mock translator recording the batches it receives
#[derive(Debug)]
pub struct MockTranslator {
    behavior: MockBehavior,
    store: Option<Arc<InMemoryBlobStore>>,
    request_count: AtomicUsize,
    requests: Mutex<Vec<BatchRequest>>,
}

impl MockTranslator {
    pub fn new(behavior: MockBehavior, store: Option<Arc<InMemoryBlobStore>>) -> Self {
        Self {
            behavior,
            store,
            request_count: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Translator that writes `content` after `misses` unsuccessful reads of the target
    pub fn completing(store: Arc<InMemoryBlobStore>, misses: u32, content: impl Into<Bytes>) -> Self {
        Self::new(
            MockBehavior::Completes {
                misses,
                content: content.into(),
            },
            Some(store),
        )
    }

    pub fn accepting() -> Self {
        Self::new(MockBehavior::NeverCompletes, None)
    }

    pub fn rejecting(status_code: u16) -> Self {
        Self::new(MockBehavior::Rejects { status_code }, None)
    }

    pub fn unreachable() -> Self {
        Self::new(MockBehavior::Unreachable, None)
    }

    /// Number of batches submitted
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Batches submitted so far
    pub fn requests(&self) -> Vec<BatchRequest> {
        self.requests.lock().clone()
    }

    /// Object name the batch asks the service to write to
    fn target_object(request: &BatchRequest) -> Option<String> {
        let url = Url::parse(request.first_target_url()?).ok()?;
        let segment = url.path_segments()?.last()?;
        percent_decode_str(segment).decode_utf8().ok().map(|name| name.into_owned())
    }
}

#[async_trait]
impl DocumentTranslator for MockTranslator {
    async fn submit(&self, request: &BatchRequest) -> Result<SubmissionReceipt, SubmissionError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        match &self.behavior {
            MockBehavior::Completes { misses, content } => {
                let target = Self::target_object(request)
                    .ok_or_else(|| SubmissionError::InvalidDocument("request has no target URL".to_string()))?;
                if let Some(store) = &self.store {
                    store.publish_after(target, content.clone(), *misses);
                }
                Ok(SubmissionReceipt {
                    status_code: 202,
                    operation_location: Some("https://mock.translator/batches/1".to_string()),
                })
            }
            MockBehavior::NeverCompletes => Ok(SubmissionReceipt {
                status_code: 202,
                operation_location: None,
            }),
            MockBehavior::Rejects { status_code } => Err(SubmissionError::Rejected {
                status_code: *status_code,
                message: "Mock rejection".to_string(),
            }),
            MockBehavior::Unreachable => Err(SubmissionError::Transport("Mock connection refused".to_string())),
        }
    }
}
