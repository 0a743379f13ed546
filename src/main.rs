// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{debug, error, info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use slideshift::app_config::{self, Config, FailurePolicy, OutputNaming};
use slideshift::app_controller::{self, Controller};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
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

/// CLI Wrapper for OutputNaming to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliNaming {
    Unique,
    ContentHash,
}

impl From<CliNaming> for OutputNaming {
    fn from(cli_naming: CliNaming) -> Self {
        match cli_naming {
            CliNaming::Unique => OutputNaming::Unique,
            CliNaming::ContentHash => OutputNaming::ContentHash,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate PowerPoint decks (default command)
    Translate(TranslateArgs),

    /// Generate shell completions for slideshift
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// Input .pptx file or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    #[command(flatten)]
    options: TranslateOptions,
}

#[derive(Args, Debug, Clone)]
struct TranslateOptions {
    /// Directory for translated decks (defaults to the input's directory)
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Source language code (e.g., 'ja', 'en', 'zh-Hans')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code (e.g., 'en', 'fr', 'pt-PT')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Glossary file with one 'source,target' pair per line
    #[arg(short, long, value_name = "CSV")]
    glossary: Option<PathBuf>,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Keep the source text of elements that fail to translate instead of aborting
    #[arg(long)]
    keep_source_on_error: bool,

    /// Output file naming scheme
    #[arg(long, value_enum)]
    naming: Option<CliNaming>,

    /// Maximum translation requests in flight
    #[arg(long)]
    concurrency: Option<usize>,

    /// Print the extracted text elements as JSON without translating
    #[arg(short, long)]
    extract_only: bool,

    /// Azure Translator subscription key
    #[arg(long, env = "AZURE_TRANSLATOR_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Azure Translator resource region
    #[arg(long, env = "AZURE_TRANSLATOR_REGION")]
    region: Option<String>,

    /// Azure Translator endpoint
    #[arg(long, env = "AZURE_TRANSLATOR_ENDPOINT")]
    endpoint: Option<String>,
}

/// slideshift - PowerPoint deck translation
///
/// Translates the text of .pptx decks with Azure Translator while keeping
/// layout, formatting and images untouched.
#[derive(Parser, Debug)]
#[command(name = "slideshift")]
#[command(version)]
#[command(about = "Translate PowerPoint decks while preserving their layout")]
#[command(args_conflicts_with_subcommands = true)]
#[command(long_about = "slideshift extracts the text runs of a .pptx deck, translates them with Azure Translator and writes a new deck with identical layout.

EXAMPLES:
    slideshift deck.pptx                          # Translate using default config
    slideshift -s ja -t en deck.pptx              # Translate from Japanese to English
    slideshift -o out/ -g terms.csv decks/        # Translate a directory with a glossary
    slideshift --keep-source-on-error deck.pptx   # Keep source text for failed elements
    slideshift -e deck.pptx                       # Print the extracted text as JSON
    slideshift completions bash > slideshift.bash # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically. Credentials can also come from the
    AZURE_TRANSLATOR_KEY, AZURE_TRANSLATOR_REGION and AZURE_TRANSLATOR_ENDPOINT
    environment variables.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input .pptx file or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: Option<PathBuf>,

    #[command(flatten)]
    options: TranslateOptions,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Label and ANSI color for a level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("ERROR", "1;31"),
            Level::Warn => ("WARN ", "1;33"),
            Level::Info => ("INFO ", "1;32"),
            Level::Debug => ("DEBUG", "1;36"),
            Level::Trace => ("TRACE", "1;35"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (label, color) = Self::style_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "\x1B[{}m{} {} {}\x1B[0m", color, now, label, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // The logger accepts everything; the effective level is the global max level
    if let Err(e) = CustomLogger::init(LevelFilter::Trace) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            debug!("{:#}", e);
            error!("{}", app_controller::user_facing_message(&e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: CommandLineOptions) -> Result<()> {
    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "slideshift", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Translate(args)) => run_translate(args.input_path, args.options).await,
        None => {
            let input_path = cli
                .input_path
                .ok_or_else(|| anyhow!("INPUT_PATH is required when no subcommand is specified"))?;
            run_translate(input_path, cli.options).await
        }
    }
}

/// Load the configuration file, creating a default one when it is missing
fn load_or_create_config(config_path: &str) -> Result<Config> {
    if Path::new(config_path).exists() {
        return Config::from_file(config_path).with_context(|| format!("Failed to load config file: {}", config_path));
    }

    warn!("Config file not found at '{}', creating default config.", config_path);
    let config = Config::default();
    config
        .save(config_path)
        .with_context(|| format!("Failed to write default config to file: {}", config_path))?;
    Ok(config)
}

/// Apply command line overrides on top of the file configuration
fn apply_overrides(config: &mut Config, options: &TranslateOptions) {
    if let Some(source_lang) = &options.source_language {
        config.source_language = source_lang.clone();
    }
    if let Some(target_lang) = &options.target_language {
        config.target_language = target_lang.clone();
    }
    if let Some(glossary) = &options.glossary {
        config.translation.glossary_path = Some(glossary.to_string_lossy().to_string());
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }
    if options.keep_source_on_error {
        config.translation.failure_policy = FailurePolicy::KeepSource;
    }
    if let Some(naming) = &options.naming {
        config.output.naming = naming.clone().into();
    }
    if let Some(concurrency) = options.concurrency {
        config.translation.concurrent_requests = concurrency;
    }
    if let Some(api_key) = options.api_key.as_ref().filter(|k| !k.is_empty()) {
        config.translator.api_key = api_key.clone();
    }
    if let Some(region) = options.region.as_ref().filter(|r| !r.is_empty()) {
        config.translator.region = region.clone();
    }
    if let Some(endpoint) = options.endpoint.as_ref().filter(|e| !e.is_empty()) {
        config.translator.endpoint = endpoint.clone();
    }
}

async fn run_translate(input_path: PathBuf, options: TranslateOptions) -> Result<()> {
    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &options.log_level {
        let level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let mut config = load_or_create_config(&options.config_path)?;
    apply_overrides(&mut config, &options);
    log::set_max_level(config.log_level.to_level_filter());

    if options.extract_only {
        if !input_path.is_file() {
            return Err(anyhow!("Extraction needs a single .pptx file: {:?}", input_path));
        }
        let texts = app_controller::extract_texts(&input_path)?;
        let json = serde_json::to_string_pretty(&texts).context("Failed to serialize text elements")?;
        println!("{}", json);
        return Ok(());
    }

    let controller = Controller::with_config(config)?;

    if input_path.is_file() {
        controller.run(input_path, options.output_dir).await?;
    } else if input_path.is_dir() {
        let summary = controller.run_folder(input_path, options.output_dir).await?;
        if !summary.failures.is_empty() {
            return Err(anyhow!(
                "{} of {} deck(s) failed",
                summary.failures.len(),
                summary.failures.len() + summary.reports.len()
            ));
        }
        info!("All {} deck(s) translated", summary.reports.len());
    } else {
        return Err(anyhow!("Input path does not exist: {:?}", input_path));
    }

    Ok(())
}
