//! Input parsing for the interactive chat

use mlfl_core::TranscriptFormat;
use std::path::PathBuf;

/// One line typed at the chat prompt
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Plain text: a question for the assistant
    Ask(String),
    Clear,
    Export {
        format: Option<TranscriptFormat>,
        path: Option<PathBuf>,
    },
    /// Full excerpts of the sources of message `n` (1-based)
    Sources(usize),
    Help,
    Quit,
    Empty,
    /// A command with bad arguments; the string is the usage hint
    Invalid(String),
}

impl ChatCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return ChatCommand::Empty;
        }
        let Some(command) = line.strip_prefix('/') else {
            return ChatCommand::Ask(line.to_string());
        };

        let mut parts = command.split_whitespace();
        let name = parts.next().unwrap_or_default().to_ascii_lowercase();
        let args: Vec<&str> = parts.collect();

        match name.as_str() {
            "clear" | "new" => ChatCommand::Clear,
            "help" | "?" => ChatCommand::Help,
            "quit" | "exit" | "q" => ChatCommand::Quit,
            "export" => parse_export(&args),
            "sources" => match args.as_slice() {
                [n] => match n.parse::<usize>() {
                    Ok(n) if n > 0 => ChatCommand::Sources(n),
                    _ => ChatCommand::Invalid("usage: /sources <message number>".to_string()),
                },
                _ => ChatCommand::Invalid("usage: /sources <message number>".to_string()),
            },
            other => ChatCommand::Invalid(format!("unknown command '/{}', try /help", other)),
        }
    }
}

fn parse_export(args: &[&str]) -> ChatCommand {
    const USAGE: &str = "usage: /export [md|txt] [path]";

    match args {
        [] => ChatCommand::Export {
            format: None,
            path: None,
        },
        [first] => match first.parse::<TranscriptFormat>() {
            Ok(format) => ChatCommand::Export {
                format: Some(format),
                path: None,
            },
            Err(_) => {
                let path = PathBuf::from(first);
                ChatCommand::Export {
                    format: format_from_path(&path),
                    path: Some(path),
                }
            }
        },
        [format, path] => match format.parse::<TranscriptFormat>() {
            Ok(format) => ChatCommand::Export {
                format: Some(format),
                path: Some(PathBuf::from(path)),
            },
            Err(_) => ChatCommand::Invalid(USAGE.to_string()),
        },
        _ => ChatCommand::Invalid(USAGE.to_string()),
    }
}

/// Infer the transcript format from a file extension
pub fn format_from_path(path: &std::path::Path) -> Option<TranscriptFormat> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(|ext| ext.parse().ok())
}
