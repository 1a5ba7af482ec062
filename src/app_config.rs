use anyhow::{Context, Result, anyhow};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

/// Application configuration module
/// This module handles loading and validating the workflow configuration.
/// On disk it is a flat JSON object with PascalCase keys
/// (`TranslatorEndpoint`, `BlobAccountName`, `Timeout`, ...).
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Config {
    /// Blob storage settings
    #[serde(flatten)]
    pub storage: StorageConfig,

    /// Translation service settings
    #[serde(flatten)]
    pub translator: TranslatorServiceConfig,

    /// Completion polling settings
    #[serde(flatten)]
    pub polling: PollingConfig,

    /// Log signed URLs and service responses
    #[serde(default)]
    pub verbose: bool,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Blob storage account used to stage documents
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct StorageConfig {
    #[serde(default)]
    pub blob_account_name: String,

    /// Base64 account key
    #[serde(default)]
    pub blob_account_key: String,

    #[serde(default)]
    pub blob_container_name: String,

    /// DNS suffix of the blob endpoint (`core.windows.net` for the public cloud)
    #[serde(default = "default_blob_endpoint_suffix")]
    pub blob_endpoint_suffix: String,

    /// Lifetime of the signed URLs handed to the translation service, in hours
    #[serde(default = "default_sas_expiry_hours")]
    pub sas_expiry_hours: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            blob_account_name: String::new(),
            blob_account_key: String::new(),
            blob_container_name: String::new(),
            blob_endpoint_suffix: default_blob_endpoint_suffix(),
            sas_expiry_hours: default_sas_expiry_hours(),
        }
    }
}

/// Longest lifetime accepted for signed URLs (one year)
pub const MAX_SAS_EXPIRY_HOURS: u64 = 365 * 24;

impl StorageConfig {
    pub fn sas_expiry(&self) -> Duration {
        Duration::from_secs(self.sas_expiry_hours.saturating_mul(60 * 60))
    }
}

/// Translation service endpoint and credentials
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct TranslatorServiceConfig {
    /// Resource endpoint, e.g. `https://<resource>.cognitiveservices.azure.com`
    #[serde(default)]
    pub translator_endpoint: String,

    /// Subscription key
    #[serde(default)]
    pub translator_key: String,

    /// Subscription region
    #[serde(default)]
    pub translator_region: String,

    /// Batch API version
    #[serde(default = "default_translator_api_version")]
    pub translator_api_version: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for TranslatorServiceConfig {
    fn default() -> Self {
        Self {
            translator_endpoint: String::new(),
            translator_key: String::new(),
            translator_region: String::new(),
            translator_api_version: default_translator_api_version(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Completion polling settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct PollingConfig {
    /// Number of retries after the first fetch of the translated document
    #[serde(default = "default_timeout")]
    pub timeout: u32,

    /// Delay between fetches in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn default_blob_endpoint_suffix() -> String {
    "core.windows.net".to_string()
}

fn default_sas_expiry_hours() -> u64 {
    48
}

fn default_translator_api_version() -> String {
    "2024-05-01".to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_timeout() -> u32 {
    30
}

fn default_poll_interval_ms() -> u64 {
    1000 // one fetch per second
}

impl Config {
    /// Load a configuration file; missing keys take their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).context(format!("Failed to open config file: {:?}", path))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).context(format!("Failed to parse config file: {:?}", path))
    }

    /// Names of the required settings that are empty
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let required = [
            ("endpoint", &self.translator.translator_endpoint),
            ("key", &self.translator.translator_key),
            ("region", &self.translator.translator_region),
            ("blobAccount", &self.storage.blob_account_name),
            ("blobAccountKey", &self.storage.blob_account_key),
            ("blobContainer", &self.storage.blob_container_name),
        ];
        required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect()
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(anyhow!("missing required arguments: {}", missing.join(", ")));
        }

        if !self.translator.translator_endpoint.starts_with("https://")
            && !self.translator.translator_endpoint.starts_with("http://")
        {
            return Err(anyhow!(
                "Translator endpoint must be an http(s) URL: {}",
                self.translator.translator_endpoint
            ));
        }

        if self.storage.sas_expiry_hours == 0 {
            return Err(anyhow!("SAS expiry must be at least one hour"));
        }

        if self.storage.sas_expiry_hours > MAX_SAS_EXPIRY_HOURS {
            return Err(anyhow!(
                "SAS expiry of {} hours exceeds the maximum of {} hours",
                self.storage.sas_expiry_hours,
                MAX_SAS_EXPIRY_HOURS
            ));
        }

        if self.translator.request_timeout_secs == 0 {
            return Err(anyhow!("Request timeout must be greater than zero"));
        }

        Ok(())
    }

    /// Level the logger should run at
    pub fn effective_log_level(&self) -> LevelFilter {
        let configured = LevelFilter::from(self.log_level);
        if self.verbose {
            configured.max(LevelFilter::Debug)
        } else {
            configured
        }
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            storage: StorageConfig::default(),
            translator: TranslatorServiceConfig::default(),
            polling: PollingConfig::default(),
            verbose: false,
            log_level: LogLevel::default(),
        }
    }
}
