//! CLI entry point for mlfl

mod chat;
mod commands;
mod export;
mod render;

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use mlfl_agent::{AskOutcome, Assistant};
use mlfl_core::config::{Config, ConfigLoader};
use mlfl_core::logging::init_logging;
use mlfl_core::TranscriptFormat;
use mlfl_providers::BackendClient;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::render::{RenderOptions, LOADING_TEXT};

#[derive(Parser)]
#[command(name = "mlfl")]
#[command(about = "Terminal client for the MLFL French legal assistant")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration directory
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive conversation
    Chat,
    /// Ask a single question
    Ask {
        /// Question to send
        #[arg(short, long)]
        message: String,
        /// Save the exchange to this file
        #[arg(short, long)]
        export: Option<PathBuf>,
        /// Transcript format (markdown, plain-text); defaults to the file extension
        #[arg(short, long)]
        format: Option<TranscriptFormat>,
    },
    /// Show configuration and backend status
    Status,
    /// Write the default configuration file
    Init {
        /// Overwrite an existing configuration without asking
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loader = match &cli.config_dir {
        Some(dir) => ConfigLoader::with_dir(dir),
        None => ConfigLoader::new(),
    };

    if let Commands::Init { force } = cli.command {
        return run_init(&loader, force);
    }

    let config = loader.load()?;
    let _log_guard = match init_logging(&config.logging) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("{} logging disabled: {}", style("warning:").yellow(), e);
            None
        }
    };

    match cli.command {
        Commands::Chat => {
            info!("Starting chat");
            chat::run_chat(&config).await?;
        }
        Commands::Ask {
            message,
            export,
            format,
        } => {
            info!("Running one-shot question");
            run_ask(&config, &message, export, format).await?;
        }
        Commands::Status => {
            info!("Showing status");
            run_status(&loader, &config).await?;
        }
        Commands::Init { .. } => {}
    }

    Ok(())
}

fn run_init(loader: &ConfigLoader, force: bool) -> Result<()> {
    let config_path = loader.config_path();
    if config_path.exists() && !force {
        let overwrite = Confirm::new()
            .with_prompt("Configuration already exists. Overwrite?")
            .default(false)
            .interact()?;
        if !overwrite {
            println!("Init cancelled.");
            return Ok(());
        }
    }

    let config = Config::default();
    loader.save(&config)?;

    println!(
        "{}",
        style("Configuration saved successfully!").green().bold()
    );
    println!("Config location: {}", config_path.display());
    println!("Backend: {}", config.backend.api_base);
    println!("\nYou can now run:");
    println!("  {} - Start a conversation", style("mlfl chat").cyan());
    println!(
        "  {} - Ask a single question",
        style("mlfl ask --message \"Expliquez l'article 1240\"").cyan()
    );
    Ok(())
}

async fn run_ask(
    config: &Config,
    message: &str,
    export: Option<PathBuf>,
    format: Option<TranscriptFormat>,
) -> Result<()> {
    let assistant = Assistant::from_config(config);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(LOADING_TEXT);
    spinner.enable_steady_tick(Duration::from_millis(100));
    let outcome = assistant.ask(message).await;
    spinner.finish_and_clear();

    match outcome {
        AskOutcome::Answered { index } => {
            let session = assistant.session();
            if let Some(answer) = session.messages().get(index) {
                let citations = session.citations(index);
                println!(
                    "{}",
                    render::message(
                        index,
                        answer,
                        citations.as_deref(),
                        RenderOptions::from(&config.session)
                    )
                );
            }
        }
        AskOutcome::Failed { reason } => {
            error!("Question failed: {}", reason);
            anyhow::bail!("Failed to get an answer: {}", reason);
        }
        AskOutcome::Rejected(rejected) => anyhow::bail!("Question not sent: {}", rejected),
        AskOutcome::Discarded => anyhow::bail!("Answer was discarded"),
    }

    if let Some(path) = export {
        let format = format.or_else(|| commands::format_from_path(&path));
        let written = export::write_transcript(
            assistant.session(),
            format,
            Some(&path),
            &config.export,
        )?;
        println!(
            "{} Transcript saved to {}",
            style("✓").green().bold(),
            written.display()
        );
    }
    Ok(())
}

async fn run_status(loader: &ConfigLoader, config: &Config) -> Result<()> {
    println!("{}", style("MLFL Status").bold().cyan());
    println!("Version: {}\n", env!("CARGO_PKG_VERSION"));

    println!("{}", style("Configuration:").bold());
    let config_path = loader.config_path();
    let location = if config_path.exists() {
        style(config_path.display().to_string()).green()
    } else {
        style(format!("{} (defaults)", config_path.display())).dim()
    };
    println!("  Config file: {}", location);
    println!("  History window: {}", config.session.history_window);
    println!("  Export: {} in {}", config.export.default_format, config.export.dir);
    println!("  Logs: {}", config.logging.dir);
    println!();

    println!("{}", style("Backend:").bold());
    println!("  URL: {}", config.backend.api_base);
    println!(
        "  API key: {}",
        if config.backend.api_key.is_some() {
            style("configured").green()
        } else {
            style("not set").dim()
        }
    );

    let client = BackendClient::from_config(&config.backend);
    let health = tokio::time::timeout(
        Duration::from_secs(config.backend.timeout_secs.min(10)),
        client.health(),
    )
    .await;
    let status = match health {
        Ok(Ok(())) => style("reachable".to_string()).green(),
        Ok(Err(e)) => {
            warn!("Backend health check failed: {}", e);
            style(format!("unreachable ({})", e)).red()
        }
        Err(_) => style("unreachable (timed out)".to_string()).red(),
    };
    println!("  Health: {}", status);

    Ok(())
}
