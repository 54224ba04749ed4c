//! MedBridge - Translation-Aware Medical Chat Gateway
//!
//! This is the main entry point for the MedBridge service, which fronts a
//! medical language model with automatic English normalization of user
//! input, streaming reply delivery, Vietnamese translation of finished
//! replies and durable transcript storage.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{Level, info};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use medbridge::chat::{DailyUsageTracker, JsonlTranscriptStore, OllamaChatModel, TurnPipeline};
use medbridge::cli::{Args, Commands};
use medbridge::config::Config;
use medbridge::translate::client::check_model_availability;
use medbridge::translate::{OllamaClient, TranslationService, Translator};
use medbridge::web::{self, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Setup logging to both console and file
    setup_logging(args.verbose)?;

    // Load configuration
    let config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            // Try to load config.toml from current directory first
            if std::path::Path::new("config.toml").exists() {
                info!("Found config.toml in current directory, loading...");
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };

    match args.command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);

            let translator: Arc<dyn TranslationService> =
                Arc::new(Translator::new(config.translate.clone())?);

            let pipeline = TurnPipeline::new(
                config.chat.clone(),
                Arc::new(DailyUsageTracker::new(config.usage.clone())),
                Arc::new(OllamaChatModel::new()?),
                Arc::new(JsonlTranscriptStore::new(
                    config.storage.transcript_dir.clone(),
                )),
                translator.clone(),
            );

            let state = AppState {
                pipeline: Arc::new(pipeline),
                translator,
            };

            web::serve(&host, port, state).await?;
        }
        Commands::Translate { text } => {
            let translator = Translator::new(config.translate.clone())?;
            let result = translator.to_vietnamese(&text).await;
            println!("{}", result.text);
            if !result.translated {
                eprintln!("(translation unavailable, original text returned)");
            }
        }
        Commands::Check => {
            info!("Checking configured model endpoints...");

            let translation_client = OllamaClient::new(config.translate.clone())?;
            match translation_client.check_availability().await {
                Ok(()) => println!(
                    "Translation model '{}' available at {}",
                    config.translate.model, config.translate.endpoint
                ),
                Err(e) => println!("Translation model check failed: {}", e),
            }

            let client = reqwest::Client::new();
            for model in &config.chat.models {
                match check_model_availability(&client, &model.endpoint, &model.model).await {
                    Ok(()) => println!(
                        "Chat model '{}' ({}) available at {}",
                        model.id, model.model, model.endpoint
                    ),
                    Err(e) => println!("Chat model '{}' check failed: {}", model.id, e),
                }
            }
        }
    }

    Ok(())
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let medbridge_dir = std::env::current_dir()?.join(".medbridge");
    let log_dir = medbridge_dir.join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "medbridge.log");
    let (non_blocking_file, _guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(_guard);

    // Determine log level
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Create console layer
    let console_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true);

    // Create file layer
    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false); // No ANSI colors in file

    // Setup layered subscriber
    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer);

    // Initialize the subscriber
    subscriber
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        log_dir.join("medbridge.log").display()
    );

    Ok(())
}
