use anyhow::{Context, Result, anyhow};
use log::{info, warn};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::app_config::Config;
use crate::file_utils::FileManager;
use crate::language_utils;
use crate::workflow::{TranslationJob, TranslationOutcome, Workflow};

// @module: Application controller for document translation

/// Main application controller for document translation
pub struct Controller {
    // @field: App configuration
    config: Config,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Translate one document with the Azure services from the configuration
    ///
    /// Returns `None` when the output already exists and `force_overwrite` is off.
    pub async fn run(
        &self,
        job: TranslationJob,
        force_overwrite: bool,
        cancel: &CancellationToken,
    ) -> Result<Option<TranslationOutcome>> {
        let workflow = Workflow::from_config(self.config.clone())
            .context("Failed to set up the translation workflow")?;
        self.run_with_workflow(&workflow, job, force_overwrite, cancel).await
    }

    /// Translate one document through an already built workflow
    pub async fn run_with_workflow(
        &self,
        workflow: &Workflow,
        job: TranslationJob,
        force_overwrite: bool,
        cancel: &CancellationToken,
    ) -> Result<Option<TranslationOutcome>> {
        // Start timing the process
        let start_time = Instant::now();

        if !FileManager::file_exists(&job.input) {
            return Err(anyhow!("Input file does not exist: {:?}", job.input));
        }

        if job.output.exists() && !force_overwrite {
            warn!("Skipping file, translation already exists (use -f to force overwrite)");
            return Ok(None);
        }

        Self::check_languages(&job);

        let outcome = workflow
            .run_with_cancellation(&job, cancel)
            .await
            .with_context(|| format!("Failed to translate {:?}", job.input))?;

        info!(
            "Success: {} ({} bytes, {} attempt(s)) in {}.",
            outcome.output.display(),
            outcome.bytes_written,
            outcome.attempts,
            Self::format_duration(start_time.elapsed())
        );

        Ok(Some(outcome))
    }

    // Language codes are passed through untouched; unknown ones only warn
    fn check_languages(job: &TranslationJob) {
        let target = &job.target_language;
        if language_utils::validate_language_code(target).is_err() {
            warn!("Unrecognized target language code '{}', passing it through", target);
        }

        match job.source_language.as_deref() {
            Some(source) => {
                if language_utils::validate_language_code(source).is_err() {
                    warn!("Unrecognized source language code '{}', passing it through", source);
                }
                if language_utils::language_codes_match(source, target) {
                    warn!("Source and target language are both {}", language_utils::describe_language(target));
                }
                info!(
                    "Translating {:?} from {} to {}",
                    job.input,
                    language_utils::describe_language(source),
                    language_utils::describe_language(target)
                );
            }
            None => info!(
                "Translating {:?} to {} (source language auto-detected)",
                job.input,
                language_utils::describe_language(target)
            ),
        }
    }

    // Format duration in a human-readable format (HH:MM:SS)
    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
