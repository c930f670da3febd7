//! Subtranslate - subtitle translation with a local LLM
//!
//! Command line entry point: loads configuration, sets up logging and runs a
//! single translation job with a console progress bar.

use anyhow::Result;
use clap::Parser;
use std::io::IsTerminal;
use std::process::ExitCode;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use subtranslate::cli::{Args, Commands};
use subtranslate::config::Config;
use subtranslate::error::SubtranslateError;
use subtranslate::paths::PathResolver;
use subtranslate::progress::{ProgressEvent, ProgressSink, TracingSink};
use subtranslate::translate::{OllamaClient, PromptBuilder, Sanitizer, StyleGuides};
use subtranslate::workflow::{TranslationJob, Workflow, WorkflowOptions};

const DEFAULT_CONFIG_FILE: &str = "subtranslate.toml";

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Load configuration
    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if std::path::Path::new(DEFAULT_CONFIG_FILE).exists() {
                Config::from_file(DEFAULT_CONFIG_FILE)?
            } else {
                Config::default()
            }
        }
    };
    config.logging.verbose |= args.verbose;

    // The guard flushes the file writer on drop
    let _guard = setup_logging(config.logging.verbose)?;

    let client = OllamaClient::new(
        config.endpoint.clone(),
        PromptBuilder::new(StyleGuides::from_config(&config.prompt)),
        Sanitizer::new(config.sanitizer.cjk_threshold),
    )?;

    match args.command {
        Commands::Translate { path, lang, model, context, test } => {
            let model = model.unwrap_or_else(|| config.endpoint.default_model.clone());
            let job = TranslationJob::new(path, lang, model)
                .with_context(context)
                .with_entry_limit(test);

            let resolver = PathResolver::new(&config.paths, std::env::current_dir()?);
            let workflow = Workflow::new(
                Box::new(client),
                resolver,
                WorkflowOptions { verbose: config.logging.verbose },
            );

            // No progress bar when stderr is redirected; events go to the log instead
            let sink: Box<dyn ProgressSink> = if std::io::stderr().is_terminal() {
                Box::new(ConsoleSink::new())
            } else {
                Box::new(TracingSink)
            };
            match workflow.run(&job, sink.as_ref()).await {
                Ok(report) => {
                    println!("Saved: {}", report.output_path.display());
                }
                Err(e) => {
                    eprintln!("ERROR: {}", e);
                    return Ok(ExitCode::from(e.exit_code()));
                }
            }
        }
        Commands::Models => {
            let models = client.list_models().await?;
            println!("\nModels at {}:", config.endpoint.url);
            println!("{}", "-".repeat(40));
            for model in models {
                let marker = if model == config.endpoint.default_model { " (default)" } else { "" };
                println!("{}{}", model, marker);
            }
        }
        Commands::InitConfig { output } => {
            if output.exists() {
                return Err(SubtranslateError::Config(format!(
                    "{} already exists",
                    output.display()
                ))
                .into());
            }
            Config::default().save_to_file(&output)?;
            println!("Wrote default configuration to {}", output.display());
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Renders progress events as a terminal progress bar
struct ConsoleSink {
    bar: ProgressBar,
}

impl ConsoleSink {
    fn new() -> Self {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Self { bar }
    }
}

impl ProgressSink for ConsoleSink {
    fn emit(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Log(message) => self.bar.set_message(message),
            ProgressEvent::Progress(percent) => self.bar.set_position(u64::from(percent)),
            ProgressEvent::Complete(_) => self.bar.finish_with_message("done"),
            ProgressEvent::Error(message) => self.bar.abandon_with_message(message),
        }
    }
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let log_dir = std::env::current_dir()?.join(".subtranslate").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "subtranslate.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - console: {}, file: {}",
          log_level, log_dir.join("subtranslate.log").display());

    Ok(guard)
}
