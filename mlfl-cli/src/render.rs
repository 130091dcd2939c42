//! Terminal rendering of the conversation

use console::style;
use mlfl_core::config::SessionConfig;
use mlfl_core::session::{ChatMessage, Citation, Role};
use std::fmt::Write;

pub const LOADING_TEXT: &str = "Consultation en cours...";

pub const SUGGESTIONS: [&str; 3] = [
    "Qu'est-ce que le Code civil ?",
    "Expliquez l'article 1240",
    "Délai de prescription",
];

/// How much of each citation is shown
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub metadata_preview: usize,
    pub excerpt_chars: usize,
}

impl From<&SessionConfig> for RenderOptions {
    fn from(config: &SessionConfig) -> Self {
        Self {
            metadata_preview: config.metadata_preview,
            excerpt_chars: config.excerpt_chars,
        }
    }
}

/// Greeting shown while the conversation is empty
pub fn welcome() -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", style("Bienvenue").bold().cyan());
    let _ = writeln!(
        out,
        "Je suis votre assistant juridique spécialisé dans le droit français."
    );
    let _ = writeln!(
        out,
        "Posez-moi vos questions sur les textes de loi, les procédures, ou tout autre sujet juridique."
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", style("Suggestions:").dim());
    for suggestion in SUGGESTIONS {
        let _ = writeln!(out, "  {} {}", style("›").dim(), suggestion);
    }
    let _ = write!(out, "{}", style("Type /help for commands.").dim());
    out
}

pub fn help() -> String {
    let rows = [
        ("<question>", "ask the assistant"),
        ("/sources <n>", "show the full sources of message n"),
        ("/export [md|txt] [path]", "save the conversation"),
        ("/clear", "start a new conversation"),
        ("/help", "show this help"),
        ("/quit", "leave"),
    ];
    let mut out = String::new();
    for (command, description) in rows {
        let _ = writeln!(out, "  {:<26} {}", style(command).cyan(), description);
    }
    let _ = write!(
        out,
        "  {}",
        style("Ctrl+C while waiting abandons the question and clears the conversation").dim()
    );
    out
}

/// A message block: header, paragraphs and citation chips.
///
/// `index` is the log position; it is shown 1-based so `/sources` can refer
/// to it.
pub fn message(
    index: usize,
    message: &ChatMessage,
    citations: Option<&[Citation]>,
    options: RenderOptions,
) -> String {
    let mut out = String::new();
    let label = match message.role {
        Role::User => style(message.role.label()).bold().green(),
        Role::Assistant => style(message.role.label()).bold().cyan(),
    };
    let _ = writeln!(
        out,
        "{} {} {}",
        label,
        style(message.display_time()).dim(),
        style(format!("#{}", index + 1)).dim()
    );

    for paragraph in message.paragraphs() {
        let _ = writeln!(out, "  {}", paragraph);
    }

    if let Some(citations) = citations.filter(|c| !c.is_empty()) {
        let _ = writeln!(out, "  {}", style("Sources consultées").dim());
        for (i, citation) in citations.iter().enumerate() {
            let _ = writeln!(out, "    {}", chip(i + 1, citation, options.metadata_preview));
        }
    }
    out
}

/// `[1] Legifrance · article: 1240 · date: 2016`
pub fn chip(position: usize, citation: &Citation, metadata_preview: usize) -> String {
    let mut out = format!(
        "{} {}",
        style(format!("[{}]", position)).yellow(),
        citation.label(position)
    );
    for (key, value) in citation.metadata_preview(metadata_preview) {
        let _ = write!(out, " {} {}: {}", style("·").dim(), key, value);
    }
    out
}

/// Full listing for `/sources`
pub fn sources(citations: &[Citation], options: RenderOptions) -> String {
    let mut out = String::new();
    for (i, citation) in citations.iter().enumerate() {
        let position = i + 1;
        let _ = writeln!(
            out,
            "{} {}",
            style(format!("[{}]", position)).yellow(),
            style(citation.label(position)).bold()
        );
        for (key, value) in citation.metadata.iter() {
            let _ = writeln!(out, "    {}: {}", style(key).dim(), value);
        }
        for line in citation.excerpt(options.excerpt_chars).lines() {
            let _ = writeln!(out, "    {}", line);
        }
    }
    out
}
