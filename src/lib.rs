/*!
 * # docbridge - Whole-document translation through cloud object storage
 *
 * A Rust library that translates a local document with Azure Document
 * Translation, staging the file in Azure Blob Storage.
 *
 * ## Features
 *
 * - Upload the source document under a collision-free name
 * - Shared Access Signatures scoped to the staging container
 * - Batch submission to the document translation service
 * - Polling for the translated document with a swappable policy
 * - Cleanup of both staged objects on every path after upload
 * - ISO 639-1 and ISO 639-2 language code support
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `identity`: Job identities and staged object names
 * - `storage`: Object storage abstraction:
 *   - `storage::sas`: Shared Access Signature signing
 *   - `storage::azure`: Azure Blob Storage REST client
 *   - `storage::memory`: In-memory store for tests
 * - `translator`: Translation service abstraction:
 *   - `translator::document`: Batch request payload
 *   - `translator::azure`: Azure Document Translation client
 *   - `translator::mock`: Scripted translator for tests
 * - `workflow`: Job driver, completion polling and cleanup
 * - `file_utils`: File system operations
 * - `app_controller`: Main application controller
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod file_utils;
pub mod identity;
pub mod language_utils;
pub mod storage;
pub mod translator;
pub mod workflow;

// Re-export main types for easier usage
pub use app_config::Config;
pub use errors::{CleanupError, SigningError, StorageError, SubmissionError, WorkflowError};
pub use identity::{ArtifactNames, JobIdentity};
pub use language_utils::{describe_language, get_language_name, language_codes_match, normalize_to_part2t};
pub use storage::BlobStore;
pub use translator::DocumentTranslator;
pub use workflow::{TranslationJob, TranslationOutcome, Workflow, translate_document};
