/*!
 * Translation job workflow.
 *
 * One run stages the input document, grants the translation service access
 * to it, submits the batch, polls for the translated document and finally
 * removes both staged objects:
 *
 * `Created -> SourceUploaded -> GrantIssued -> Submitted -> Polling -> CleaningUp -> Done`
 *
 * A failed upload ends the run immediately since nothing was staged. Every
 * later failure still goes through cleanup, and a cleanup failure is reported
 * together with the error that preceded it.
 */

use bytes::Bytes;
use log::{debug, info};
use reqwest::Client;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::app_config::Config;
use crate::errors::{SigningError, StorageError, WorkflowError};
use crate::identity::{ArtifactNames, JobIdentity};
use crate::storage::azure::AzureBlobStore;
use crate::storage::sas::redact_signature;
use crate::storage::{BlobStore, Permissions, SignedScope};
use crate::translator::azure::AzureDocumentTranslator;
use crate::translator::{DocumentTranslator, submit_job};

pub mod cleanup;
pub mod poller;

pub use poller::{FixedInterval, PollPolicy, PollReport};

/// Stage of a workflow run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Created,
    SourceUploaded,
    GrantIssued,
    Submitted,
    Polling,
    CleaningUp,
    Done,
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::SourceUploaded => "source uploaded",
            Self::GrantIssued => "grant issued",
            Self::Submitted => "submitted",
            Self::Polling => "polling",
            Self::CleaningUp => "cleaning up",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// One document to translate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationJob {
    /// Local document to translate
    pub input: PathBuf,
    /// Where the translated document is written
    pub output: PathBuf,
    /// Source language; auto-detected when `None` or empty
    pub source_language: Option<String>,
    /// Target language code
    pub target_language: String,
}

impl TranslationJob {
    pub fn new(
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        source_language: Option<&str>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            source_language: source_language
                .filter(|lang| !lang.trim().is_empty())
                .map(str::to_string),
            target_language: target_language.into(),
        }
    }
}

/// Summary of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationOutcome {
    /// Identity minted for the run
    pub job: JobIdentity,
    /// Staged object names (already deleted)
    pub artifacts: ArtifactNames,
    /// Path the translated document was written to
    pub output: PathBuf,
    /// Fetches needed before the translation appeared
    pub attempts: u32,
    /// Size of the translated document
    pub bytes_written: usize,
    /// Status URL returned by the service, if any
    pub operation_location: Option<String>,
}

/// Translation workflow driver
///
/// Holds no per-run state; each call to `run` mints its own identity, so one
/// workflow can serve concurrent runs.
#[derive(Debug, Clone)]
pub struct Workflow {
    store: Arc<dyn BlobStore>,
    translator: Arc<dyn DocumentTranslator>,
    policy: Arc<dyn PollPolicy>,
    grant_expiry: Duration,
    verbose: bool,
}

impl Workflow {
    /// Create a workflow over the given collaborators
    ///
    /// The poll policy is taken from `config` (`Timeout` retries at `PollIntervalMs`).
    pub fn new(config: Config, store: Arc<dyn BlobStore>, translator: Arc<dyn DocumentTranslator>) -> Self {
        let policy = FixedInterval::retries(config.polling.timeout, config.polling.interval());
        Self {
            store,
            translator,
            policy: Arc::new(policy),
            grant_expiry: config.storage.sas_expiry(),
            verbose: config.verbose,
        }
    }

    /// Create a workflow talking to Azure Blob Storage and Azure Document Translation
    ///
    /// Fails with `WorkflowError::Credential` when the storage account key is malformed.
    pub fn from_config(config: Config) -> Result<Self, WorkflowError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.translator.request_timeout_secs))
            .build()
            .unwrap_or_default();

        let store = AzureBlobStore::from_config(&config.storage, client.clone())?;
        let translator = AzureDocumentTranslator::from_config(&config.translator, client);
        Ok(Self::new(config, Arc::new(store), Arc::new(translator)))
    }

    /// Replace the poll policy
    pub fn with_poll_policy(mut self, policy: Arc<dyn PollPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Run one translation job to completion
    pub async fn run(&self, job: &TranslationJob) -> Result<TranslationOutcome, WorkflowError> {
        self.run_with_cancellation(job, &CancellationToken::new()).await
    }

    /// Run one translation job, stopping the poll early when `cancel` fires
    ///
    /// Cancellation skips straight to cleanup; staged objects are still removed.
    pub async fn run_with_cancellation(
        &self,
        job: &TranslationJob,
        cancel: &CancellationToken,
    ) -> Result<TranslationOutcome, WorkflowError> {
        let identity = JobIdentity::new();
        let names = ArtifactNames::for_path(&identity, &job.input);
        let mut state = WorkflowState::Created;
        info!("Starting translation job {} for {:?}", identity, job.input);

        let data = tokio::fs::read(&job.input)
            .await
            .map_err(|e| WorkflowError::Upload(StorageError::Io(e)))?;
        self.store
            .put(&names.source, Bytes::from(data))
            .await
            .map_err(WorkflowError::Upload)?;
        advance(&mut state, WorkflowState::SourceUploaded, &identity);

        let staged = self.translate_staged(&identity, &names, job, cancel, &mut state).await;

        advance(&mut state, WorkflowState::CleaningUp, &identity);
        let cleanup = cleanup::cleanup(self.store.as_ref(), &names).await;
        advance(&mut state, WorkflowState::Done, &identity);

        match staged {
            Ok(outcome) => match cleanup {
                Ok(()) => {
                    info!("Translation job {} finished", identity);
                    Ok(outcome)
                }
                Err(e) => Err(WorkflowError::Cleanup(e)),
            },
            Err(e) => Err(e.with_cleanup(cleanup)),
        }
    }

    /// Everything between a successful upload and cleanup
    async fn translate_staged(
        &self,
        identity: &JobIdentity,
        names: &ArtifactNames,
        job: &TranslationJob,
        cancel: &CancellationToken,
        state: &mut WorkflowState,
    ) -> Result<TranslationOutcome, WorkflowError> {
        let grant = self
            .store
            .sign(SignedScope::Container, Permissions::container_default(), self.grant_expiry)?;
        advance(state, WorkflowState::GrantIssued, identity);

        let source_url = grant
            .object_url(&names.source)
            .ok_or_else(|| SigningError::InvalidRequest("grant does not cover the container".to_string()))?;
        let target_url = grant
            .object_url(&names.destination)
            .ok_or_else(|| SigningError::InvalidRequest("grant does not cover the container".to_string()))?;

        if self.verbose {
            debug!("containerSASurl: {}", redact_signature(&grant.url));
            debug!("sourceSASUrl: {}", redact_signature(&source_url));
            debug!("targetSASUrl: {}", redact_signature(&target_url));
        }

        let receipt = submit_job(
            self.translator.as_ref(),
            &source_url,
            &target_url,
            job.source_language.as_deref(),
            &job.target_language,
        )
        .await?;
        advance(state, WorkflowState::Submitted, identity);
        if let Some(location) = &receipt.operation_location {
            info!("Batch accepted ({}), status at {}", receipt.status_code, location);
        }

        advance(state, WorkflowState::Polling, identity);
        let report = poller::poll_until_ready(
            self.store.as_ref(),
            &names.destination,
            &job.output,
            self.policy.as_ref(),
            cancel,
        )
        .await?;

        Ok(TranslationOutcome {
            job: identity.clone(),
            artifacts: names.clone(),
            output: job.output.clone(),
            attempts: report.attempts,
            bytes_written: report.bytes_written,
            operation_location: receipt.operation_location,
        })
    }
}

fn advance(state: &mut WorkflowState, next: WorkflowState, identity: &JobIdentity) {
    debug!("Job {}: {} -> {}", identity, state, next);
    *state = next;
}

/// Translate one document with the Azure services described by `config`
///
/// An empty `source_language` lets the service detect the language.
pub async fn translate_document<P1: AsRef<Path>, P2: AsRef<Path>>(
    input: P1,
    output: P2,
    source_language: &str,
    target_language: &str,
    config: Config,
) -> Result<TranslationOutcome, WorkflowError> {
    let job = TranslationJob::new(
        input.as_ref(),
        output.as_ref(),
        Some(source_language),
        target_language,
    );
    Workflow::from_config(config)?.run(&job).await
}
