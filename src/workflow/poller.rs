/*!
 * Completion polling.
 *
 * The translation service writes its result into the destination object
 * asynchronously. The poller fetches that object until it exists or the
 * retry policy runs out. The first fetch always happens, so a policy with no
 * retries still performs exactly one attempt.
 */

use log::{debug, info, warn};
use std::fmt::Debug;
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::errors::WorkflowError;
use crate::file_utils::FileManager;
use crate::storage::BlobStore;

/// Decides whether and how long to wait before the next fetch
pub trait PollPolicy: Send + Sync + Debug {
    /// Delay before the next attempt, given how many attempts have failed so far
    ///
    /// `None` means the budget is spent.
    fn next_delay(&self, failed_attempts: u32) -> Option<Duration>;
}

/// Constant delay between attempts with a hard ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedInterval {
    max_retries: u32,
    interval: Duration,
}

impl FixedInterval {
    /// One initial attempt plus `retries` more, i.e. at most `retries` sleeps
    pub fn retries(retries: u32, interval: Duration) -> Self {
        Self {
            max_retries: retries,
            interval,
        }
    }

    /// `attempts` fetches in total; zero is treated as one
    pub fn attempts(attempts: u32, interval: Duration) -> Self {
        Self::retries(attempts.saturating_sub(1), interval)
    }

    /// Total number of fetches this policy allows
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl PollPolicy for FixedInterval {
    fn next_delay(&self, failed_attempts: u32) -> Option<Duration> {
        (failed_attempts <= self.max_retries).then_some(self.interval)
    }
}

/// Delay doubling after every failed attempt, capped at `max_delay`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl PollPolicy for ExponentialBackoff {
    fn next_delay(&self, failed_attempts: u32) -> Option<Duration> {
        if failed_attempts == 0 || failed_attempts > self.max_retries {
            return None;
        }
        let factor = 2u32.saturating_pow(failed_attempts - 1);
        Some(self.base_delay.saturating_mul(factor).min(self.max_delay))
    }
}

/// Result of a successful poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollReport {
    /// Fetches performed, including the successful one
    pub attempts: u32,
    /// Size of the document written to disk
    pub bytes_written: usize,
}

/// Fetch `destination` until it exists, then write it to `local_path`
///
/// Any fetch failure counts as "not ready yet". Failing to write the local
/// file is not retried.
pub async fn poll_until_ready(
    store: &dyn BlobStore,
    destination: &str,
    local_path: &Path,
    policy: &dyn PollPolicy,
    cancel: &CancellationToken,
) -> Result<PollReport, WorkflowError> {
    let mut attempts: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(WorkflowError::Cancelled { attempts });
        }

        attempts += 1;
        match store.get(destination).await {
            Ok(data) => {
                FileManager::write_atomically(local_path, &data).map_err(WorkflowError::Output)?;
                debug!("Wrote {} bytes to {:?} after {} attempt(s)", data.len(), local_path, attempts);
                return Ok(PollReport {
                    attempts,
                    bytes_written: data.len(),
                });
            }
            Err(e) if e.is_not_found() => {
                debug!("Attempt {}: '{}' does not exist yet", attempts, destination);
            }
            Err(e) => {
                warn!("Attempt {}: fetching '{}' failed: {}", attempts, destination, e);
            }
        }

        let Some(delay) = policy.next_delay(attempts) else {
            return Err(WorkflowError::PollingTimeout { attempts });
        };

        info!("File not yet ready, wait for {:?}…", delay);
        tokio::select! {
            _ = cancel.cancelled() => return Err(WorkflowError::Cancelled { attempts }),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
