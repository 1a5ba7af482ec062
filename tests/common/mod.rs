/*!
 * Common test utilities for the docbridge test suite
 */

use anyhow::Result;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use docbridge::app_config::Config;
use docbridge::storage::memory::InMemoryBlobStore;
use docbridge::translator::mock::MockTranslator;
use docbridge::workflow::{FixedInterval, TranslationJob, Workflow};

/// Interval used by test poll policies
pub const TEST_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Base64 account key accepted by the signer
pub fn test_account_key() -> String {
    STANDARD.encode(b"docbridge-test-account-key")
}

/// Complete configuration pointing at fake endpoints
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.translator.translator_endpoint = "https://example.cognitiveservices.azure.com".to_string();
    config.translator.translator_key = "test-subscription-key".to_string();
    config.translator.translator_region = "westeurope".to_string();
    config.storage.blob_account_name = "testaccount".to_string();
    config.storage.blob_account_key = test_account_key();
    config.storage.blob_container_name = "documents".to_string();
    config
}

/// Route library logs to the test output (`RUST_LOG=debug cargo test`)
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Workflow over an in-memory store, retrying `retries` times at one-second intervals
pub fn memory_workflow(store: Arc<InMemoryBlobStore>, translator: Arc<MockTranslator>, retries: u32) -> Workflow {
    init_test_logging();
    Workflow::new(test_config(), store, translator)
        .with_poll_policy(Arc::new(FixedInterval::retries(retries, TEST_POLL_INTERVAL)))
}

/// Job translating `report.pdf` in `dir` to French
pub fn report_job(dir: &Path) -> Result<TranslationJob> {
    let input = create_test_file(dir, "report.pdf", "quarterly report")?;
    Ok(TranslationJob::new(input, dir.join("report.fr.pdf"), Some("en"), "fr"))
}
