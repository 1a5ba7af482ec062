/*!
 * End-to-end workflow tests against the in-memory store and mock translator
 */

use anyhow::Result;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use docbridge::errors::{SigningError, WorkflowError};
use docbridge::storage::memory::{InMemoryBlobStore, StoreCall};
use docbridge::storage::SignedScope;
use docbridge::translator::mock::MockTranslator;
use docbridge::workflow::{TranslationJob, Workflow};
use crate::common::{self, TEST_POLL_INTERVAL};

fn put_names(store: &InMemoryBlobStore) -> Vec<String> {
    store
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            StoreCall::Put(name) => Some(name),
            _ => None,
        })
        .collect()
}

/// Test the full success path: upload, grant, submit, poll, write, clean up
#[tokio::test(start_paused = true)]
async fn test_run_withCompletingTranslator_shouldWriteOutputAndCleanUp() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let job = common::report_job(temp_dir.path())?;
    let store = Arc::new(InMemoryBlobStore::default());
    let translator = Arc::new(MockTranslator::completing(store.clone(), 2, "rapport trimestriel"));
    let workflow = common::memory_workflow(store.clone(), translator.clone(), 30);

    let start = Instant::now();
    let outcome = workflow.run(&job).await?;

    assert_eq!(fs::read_to_string(&job.output)?, "rapport trimestriel");
    assert_eq!(outcome.attempts, 3);
    assert_eq!(start.elapsed(), TEST_POLL_INTERVAL * 2);
    assert_eq!(outcome.artifacts.source, format!("{}-report.pdf", outcome.job));
    assert_eq!(outcome.artifacts.destination, format!("{}-translated-report.pdf", outcome.job));
    assert!(outcome.operation_location.is_some());

    // Both staged objects are gone
    assert!(store.object_names().is_empty());
    assert_eq!(
        store.deleted_names(),
        vec![outcome.artifacts.source.clone(), outcome.artifacts.destination.clone()]
    );

    // Calls happen in workflow order
    let calls = store.calls();
    assert_eq!(calls[0], StoreCall::Put(outcome.artifacts.source.clone()));
    assert_eq!(calls[1], StoreCall::Sign(SignedScope::Container));
    Ok(())
}

/// Test that a base name needing URL escaping is still found when polling
#[tokio::test(start_paused = true)]
async fn test_run_withSpaceInFileName_shouldFindTranslatedDocument() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "my report.pdf", "quarterly report")?;
    let job = TranslationJob::new(input, temp_dir.path().join("my report.fr.pdf"), Some("en"), "fr");
    let store = Arc::new(InMemoryBlobStore::default());
    let translator = Arc::new(MockTranslator::completing(store.clone(), 1, "rapport trimestriel"));
    let workflow = common::memory_workflow(store.clone(), translator.clone(), 3);

    let outcome = workflow.run(&job).await?;

    assert_eq!(outcome.attempts, 2);
    assert_eq!(outcome.artifacts.destination, format!("{}-translated-my report.pdf", outcome.job));
    assert!(translator.requests()[0].inputs[0].targets[0].target_url.contains("my%20report.pdf"));
    assert_eq!(fs::read_to_string(&job.output)?, "rapport trimestriel");
    assert!(store.object_names().is_empty());
    Ok(())
}

/// Test that the submitted batch references the staged objects through the container grant
#[tokio::test(start_paused = true)]
async fn test_run_shouldSubmitSignedUrlsForStagedObjects() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let job = common::report_job(temp_dir.path())?;
    let store = Arc::new(InMemoryBlobStore::default());
    let translator = Arc::new(MockTranslator::completing(store.clone(), 0, "ok"));
    let workflow = common::memory_workflow(store.clone(), translator.clone(), 0);

    let outcome = workflow.run(&job).await?;

    let requests = translator.requests();
    assert_eq!(requests.len(), 1);
    let input = &requests[0].inputs[0];
    assert_eq!(
        input.source.source_url,
        format!("https://memory.blob.local/documents/{}?sp=rw&sig=in-memory", outcome.artifacts.source)
    );
    assert_eq!(
        input.targets[0].target_url,
        format!("https://memory.blob.local/documents/{}?sp=rw&sig=in-memory", outcome.artifacts.destination)
    );
    assert_eq!(input.source.language.as_deref(), Some("en"));
    assert_eq!(input.targets[0].language, "fr");
    Ok(())
}

/// Test that every run mints a fresh identity
#[tokio::test(start_paused = true)]
async fn test_run_calledTwice_shouldUseDistinctIdentities() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let job = common::report_job(temp_dir.path())?;
    let store = Arc::new(InMemoryBlobStore::default());
    let translator = Arc::new(MockTranslator::completing(store.clone(), 0, "ok"));
    let workflow = common::memory_workflow(store.clone(), translator, 0);

    let first = workflow.run(&job).await?;
    let second = workflow.run(&job).await?;

    assert_ne!(first.job, second.job);
    assert_ne!(first.artifacts.source, second.artifacts.source);
    Ok(())
}

/// Test that a failed upload ends the run before anything else happens
#[tokio::test(start_paused = true)]
async fn test_run_withUploadFailure_shouldNotDeleteAnything() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let job = common::report_job(temp_dir.path())?;
    let store = Arc::new(InMemoryBlobStore::default());
    store.fail_puts();
    let translator = Arc::new(MockTranslator::completing(store.clone(), 0, "ok"));
    let workflow = common::memory_workflow(store.clone(), translator.clone(), 30);

    let err = workflow.run(&job).await.unwrap_err();

    assert!(matches!(err, WorkflowError::Upload(_)));
    assert!(store.deleted_names().is_empty());
    assert_eq!(store.calls().len(), 1);
    assert_eq!(translator.request_count(), 0);
    assert!(!job.output.exists());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_run_withMissingInput_shouldFailAsUploadWithoutStorageCalls() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let job = TranslationJob::new(temp_dir.path().join("missing.pdf"), temp_dir.path().join("out.pdf"), None, "fr");
    let store = Arc::new(InMemoryBlobStore::default());
    let workflow = common::memory_workflow(store.clone(), Arc::new(MockTranslator::accepting()), 30);

    let err = workflow.run(&job).await.unwrap_err();

    assert!(matches!(err, WorkflowError::Upload(_)));
    assert!(store.calls().is_empty());
    Ok(())
}

/// Test that a rejected batch skips polling but still removes both staged objects
#[tokio::test(start_paused = true)]
async fn test_run_withRejectedSubmission_shouldSkipPollingAndCleanUp() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let job = common::report_job(temp_dir.path())?;
    let store = Arc::new(InMemoryBlobStore::default());
    let workflow = common::memory_workflow(store.clone(), Arc::new(MockTranslator::rejecting(401)), 30);

    let err = workflow.run(&job).await.unwrap_err();

    assert!(matches!(err, WorkflowError::SubmissionRejected { status_code: 401, .. }));
    assert_eq!(store.get_count(), 0);
    assert_eq!(store.deleted_names().len(), 2);
    assert!(store.object_names().is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_run_withUnreachableTranslator_shouldReportTransportErrorAndCleanUp() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let job = common::report_job(temp_dir.path())?;
    let store = Arc::new(InMemoryBlobStore::default());
    let workflow = common::memory_workflow(store.clone(), Arc::new(MockTranslator::unreachable()), 30);

    let err = workflow.run(&job).await.unwrap_err();

    assert!(matches!(err, WorkflowError::SubmissionTransport(_)));
    assert_eq!(store.deleted_names().len(), 2);
    Ok(())
}

/// Test that a signing failure after upload still removes the staged source
#[tokio::test(start_paused = true)]
async fn test_run_withSigningFailure_shouldCleanUp() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let job = common::report_job(temp_dir.path())?;
    let store = Arc::new(InMemoryBlobStore::default());
    store.fail_signing(SigningError::InvalidRequest("clock skew".to_string()));
    let translator = Arc::new(MockTranslator::accepting());
    let workflow = common::memory_workflow(store.clone(), translator.clone(), 30);

    let err = workflow.run(&job).await.unwrap_err();

    assert!(matches!(err, WorkflowError::Signing(_)));
    assert_eq!(translator.request_count(), 0);
    assert_eq!(store.deleted_names().len(), 2);
    assert!(store.object_names().is_empty());
    Ok(())
}

/// Test that a timeout is reported after the budget and both objects are still deleted
#[tokio::test(start_paused = true)]
async fn test_run_withNeverCompletingTranslator_shouldTimeOutAndCleanUp() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let job = common::report_job(temp_dir.path())?;
    let store = Arc::new(InMemoryBlobStore::default());
    let workflow = common::memory_workflow(store.clone(), Arc::new(MockTranslator::accepting()), 3);

    let start = Instant::now();
    let err = workflow.run(&job).await.unwrap_err();

    assert!(err.is_timeout());
    assert!(matches!(err, WorkflowError::PollingTimeout { attempts: 4 }));
    assert_eq!(start.elapsed(), TEST_POLL_INTERVAL * 3);
    assert_eq!(store.deleted_names().len(), 2);
    assert!(!job.output.exists());
    Ok(())
}

/// Test that a source deletion failure is surfaced even though translation succeeded
#[tokio::test(start_paused = true)]
async fn test_run_withSourceDeleteFailure_shouldReportCleanupError() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let job = common::report_job(temp_dir.path())?;
    let store = Arc::new(InMemoryBlobStore::default());
    store.fail_deletes_when(|name| !name.contains("-translated-"));
    let translator = Arc::new(MockTranslator::completing(store.clone(), 0, "ok"));
    let workflow = common::memory_workflow(store.clone(), translator, 30);

    let err = workflow.run(&job).await.unwrap_err();

    let WorkflowError::Cleanup(cleanup) = &err else {
        panic!("expected a cleanup error, got {:?}", err);
    };
    assert!(cleanup.source_failure.is_some());
    assert!(cleanup.destination_failure.is_none());
    assert_eq!(store.deleted_names().len(), 2);
    // The translated document was still delivered
    assert_eq!(fs::read_to_string(&job.output)?, "ok");
    Ok(())
}

/// Test that a cleanup failure after a timeout keeps both errors
#[tokio::test(start_paused = true)]
async fn test_run_withTimeoutAndCleanupFailure_shouldSurfaceBoth() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let job = common::report_job(temp_dir.path())?;
    let store = Arc::new(InMemoryBlobStore::default());
    store.fail_deletes_when(|name| !name.contains("-translated-"));
    let workflow = common::memory_workflow(store.clone(), Arc::new(MockTranslator::accepting()), 1);

    let err = workflow.run(&job).await.unwrap_err();

    assert!(matches!(err, WorkflowError::WithCleanupFailure { .. }));
    assert!(err.is_timeout());
    assert_eq!(err.cleanup_failure().map(|c| c.failure_count()), Some(1));
    Ok(())
}

/// Test that cancelling while polling still cleans up
#[tokio::test(start_paused = true)]
async fn test_run_with_cancellation_whilePolling_shouldCleanUp() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let job = common::report_job(temp_dir.path())?;
    let store = Arc::new(InMemoryBlobStore::default());
    let workflow = common::memory_workflow(store.clone(), Arc::new(MockTranslator::accepting()), 30);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(2500)).await;
        trigger.cancel();
    });

    let err = workflow.run_with_cancellation(&job, &cancel).await.unwrap_err();

    assert!(matches!(err, WorkflowError::Cancelled { attempts: 3 }));
    assert_eq!(store.deleted_names().len(), 2);
    assert!(store.object_names().is_empty());
    Ok(())
}

/// Test that the configured retry budget drives the default poll policy
#[tokio::test(start_paused = true)]
async fn test_new_withConfiguredTimeout_shouldUseRetriesConvention() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let job = common::report_job(temp_dir.path())?;
    let store = Arc::new(InMemoryBlobStore::default());
    let mut config = common::test_config();
    config.polling.timeout = 2;
    config.polling.poll_interval_ms = 500;
    let workflow = Workflow::new(config, store.clone(), Arc::new(MockTranslator::accepting()));

    let start = Instant::now();
    let err = workflow.run(&job).await.unwrap_err();

    assert!(matches!(err, WorkflowError::PollingTimeout { attempts: 3 }));
    assert_eq!(start.elapsed(), Duration::from_millis(1000));
    Ok(())
}

/// Test that a malformed account key is rejected when the workflow is built
#[test]
fn test_from_config_withMalformedAccountKey_shouldFailAsCredentialError() {
    let mut config = common::test_config();
    config.storage.blob_account_key = "not base64!!".to_string();

    let err = Workflow::from_config(config).unwrap_err();

    assert!(matches!(err, WorkflowError::Credential(_)));
}

#[test]
fn test_from_config_withValidConfig_shouldBuild() {
    assert!(Workflow::from_config(common::test_config()).is_ok());
}
