//! Interactive chat loop

use anyhow::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use mlfl_agent::{AskOutcome, Assistant};
use mlfl_core::config::Config;
use mlfl_core::session::SubmitRejected;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::commands::ChatCommand;
use crate::export::write_transcript;
use crate::render::{self, RenderOptions, LOADING_TEXT};

pub async fn run_chat(config: &Config) -> Result<()> {
    let assistant = Arc::new(Assistant::from_config(config));
    let options = RenderOptions::from(&config.session);
    info!("Chat started against {}", config.backend.api_base);

    println!("{}\n", render::welcome());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", style("›").cyan().bold());
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            println!();
            break;
        };

        match ChatCommand::parse(&line) {
            ChatCommand::Empty => {}
            ChatCommand::Quit => break,
            ChatCommand::Help => println!("{}", render::help()),
            ChatCommand::Clear => {
                assistant.session().clear();
                println!("{}\n", style("Nouvelle conversation.").dim());
                println!("{}\n", render::welcome());
            }
            ChatCommand::Export { format, path } => {
                match write_transcript(assistant.session(), format, path.as_deref(), &config.export)
                {
                    Ok(path) => println!(
                        "{} Transcript saved to {}",
                        style("✓").green().bold(),
                        path.display()
                    ),
                    Err(e) => println!("{} {}", style("✗").red(), e),
                }
            }
            ChatCommand::Sources(number) => {
                match assistant.session().citations(number - 1) {
                    Some(citations) if !citations.is_empty() => {
                        print!("{}", render::sources(&citations, options))
                    }
                    _ => println!("{} Message #{} has no sources", style("✗").red(), number),
                }
            }
            ChatCommand::Invalid(usage) => println!("{} {}", style("✗").red(), usage),
            ChatCommand::Ask(text) => ask(&assistant, text, options).await,
        }
    }

    info!("Chat ended");
    Ok(())
}

async fn ask(assistant: &Arc<Assistant>, text: String, options: RenderOptions) {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(LOADING_TEXT);
    spinner.enable_steady_tick(Duration::from_millis(100));

    // The request keeps running if abandoned; its late answer is discarded.
    let mut task = {
        let assistant = assistant.clone();
        tokio::spawn(async move { assistant.ask(&text).await })
    };

    let outcome = tokio::select! {
        joined = &mut task => joined,
        _ = tokio::signal::ctrl_c() => {
            spinner.finish_and_clear();
            assistant.session().clear();
            println!("{}\n", style("Question abandonnée, nouvelle conversation.").yellow());
            return;
        }
    };
    spinner.finish_and_clear();

    match outcome {
        Ok(AskOutcome::Answered { index }) => {
            let session = assistant.session();
            let messages = session.messages();
            if let Some(message) = messages.get(index) {
                let citations = session.citations(index);
                println!(
                    "{}",
                    render::message(index, message, citations.as_deref(), options)
                );
            }
        }
        Ok(AskOutcome::Failed { reason }) => {
            println!(
                "{} {}\n",
                style("Erreur:").red().bold(),
                reason
            );
        }
        Ok(AskOutcome::Rejected(SubmitRejected::RequestPending)) => {
            println!("{}", style("Une question est déjà en cours.").yellow());
        }
        Ok(AskOutcome::Rejected(SubmitRejected::EmptyText)) | Ok(AskOutcome::Discarded) => {}
        Err(e) => warn!("Ask task failed: {}", e),
    }
}
