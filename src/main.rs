// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Result, anyhow};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error, warn};
use std::io::Write;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use docbridge::app_config::{self, Config};
use docbridge::app_controller::Controller;
use docbridge::workflow::TranslationJob;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate a document (default command)
    Translate(TranslateArgs),

    /// Generate shell completions for docbridge
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug, Default)]
struct TranslateArgs {
    /// Document to translate
    #[arg(long = "in", value_name = "FILE")]
    input: Option<PathBuf>,

    /// Where to write the translated document
    #[arg(long = "out", value_name = "FILE")]
    output: Option<PathBuf>,

    /// Source language code (auto-detected when omitted)
    #[arg(long = "from", value_name = "LANG")]
    source_language: Option<String>,

    /// Target language code (e.g., 'fr', 'de', 'zh-Hans')
    #[arg(long = "to", value_name = "LANG")]
    target_language: Option<String>,

    /// Number of retries while waiting for the translated document
    #[arg(long)]
    timeout: Option<u32>,

    /// Translator resource endpoint
    #[arg(long, env = "TRANSLATOR_ENDPOINT")]
    endpoint: Option<String>,

    /// Translator subscription key
    #[arg(long, env = "TRANSLATOR_KEY", hide_env_values = true)]
    key: Option<String>,

    /// Translator subscription region
    #[arg(long, env = "TRANSLATOR_REGION")]
    region: Option<String>,

    /// Blob storage account name
    #[arg(long, alias = "blobAccount", env = "BLOB_STORAGE_ACCOUNT_NAME")]
    blob_account: Option<String>,

    /// Blob storage account key (base64)
    #[arg(
        long,
        alias = "blobAccountKey",
        env = "BLOB_STORAGE_ACCOUNT_KEY",
        hide_env_values = true
    )]
    blob_account_key: Option<String>,

    /// Blob container used to stage documents
    #[arg(long, alias = "blobContainer", env = "BLOB_STORAGE_CONTAINER_NAME")]
    blob_container: Option<String>,

    /// JSON configuration file
    #[arg(short, long = "config", value_name = "FILE")]
    config_path: Option<PathBuf>,

    /// Force overwrite of an existing output file
    #[arg(short, long)]
    force_overwrite: bool,

    /// Log signed URLs (redacted) and service responses
    #[arg(short, long)]
    verbose: bool,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// docbridge - Whole-document translation through cloud object storage
#[derive(Parser, Debug)]
#[command(name = "docbridge")]
#[command(version)]
#[command(about = "Translate documents with Azure Document Translation")]
#[command(args_conflicts_with_subcommands = true)]
#[command(long_about = "docbridge uploads a document to Azure Blob Storage, submits it to Azure Document \
Translation, downloads the translated document and removes both staged copies.

EXAMPLES:
    docbridge --in report.pdf --out report.fr.pdf --to fr
    docbridge --in report.docx --out report.de.docx --from en --to de --timeout 120
    docbridge -c docbridge.json -f --in notes.txt --out notes.es.txt --to es
    docbridge completions bash > docbridge.bash

CONFIGURATION:
    Settings come from, in increasing precedence: built-in defaults, the JSON
    file given with --config, environment variables, command-line flags.
    Required: endpoint, key, region, blob account, blob account key, blob container.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    translate: TranslateArgs,
}

// @struct: Custom logger implementation
struct CustomLogger;

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI colour for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let level = record.level();

            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {} {}\x1B[0m",
                Self::get_color_for_level(level),
                now,
                Self::get_emoji_for_level(level),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Start at info; the configured level is applied once the config is loaded
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    let result = match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "docbridge", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Translate(args)) => run_translate(args).await,
        None => run_translate(cli.translate).await,
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

async fn run_translate(options: TranslateArgs) -> Result<()> {
    let config = build_config(&options)?;
    log::set_max_level(config.effective_log_level());

    let mut missing: Vec<&str> = Vec::new();
    if options.input.is_none() {
        missing.push("in");
    }
    if options.output.is_none() {
        missing.push("out");
    }
    if options.target_language.as_deref().is_none_or(|lang| lang.trim().is_empty()) {
        missing.push("to");
    }
    missing.extend(config.missing_fields());

    let (Some(input), Some(output), Some(target_language), true) = (
        options.input,
        options.output,
        options.target_language,
        missing.is_empty(),
    ) else {
        return Err(anyhow!("missing required arguments: {}", missing.join(", ")));
    };

    let controller = Controller::with_config(config)?;
    let job = TranslationJob::new(input, output, options.source_language.as_deref(), target_language);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, removing staged documents before exiting");
            on_interrupt.cancel();
        }
    });

    controller.run(job, options.force_overwrite, &cancel).await?;
    Ok(())
}

// Layer the config file, then environment and command-line values, over the defaults
fn build_config(options: &TranslateArgs) -> Result<Config> {
    let mut config = match &options.config_path {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    if let Some(endpoint) = &options.endpoint {
        config.translator.translator_endpoint = endpoint.clone();
    }
    if let Some(key) = &options.key {
        config.translator.translator_key = key.clone();
    }
    if let Some(region) = &options.region {
        config.translator.translator_region = region.clone();
    }
    if let Some(account) = &options.blob_account {
        config.storage.blob_account_name = account.clone();
    }
    if let Some(account_key) = &options.blob_account_key {
        config.storage.blob_account_key = account_key.clone();
    }
    if let Some(container) = &options.blob_container {
        config.storage.blob_container_name = container.clone();
    }
    if let Some(timeout) = options.timeout {
        config.polling.timeout = timeout;
    }
    if options.verbose {
        config.verbose = true;
    }
    if let Some(log_level) = options.log_level {
        config.log_level = log_level.into();
    }

    Ok(config)
}
