//! Transcript export
//!
//! A conversation is exported as a single document, either Markdown or plain
//! text. Both formats carry the same information (message order, message
//! content line by line, and the numbered citations of each assistant
//! answer) and differ only in markup, so either can be parsed back with
//! [`parse`].

mod markdown;
mod plain;

use crate::session::{ChatMessage, Citation, CitationTable, Role};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

/// Output format of an exported transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TranscriptFormat {
    Markdown,
    PlainText,
}

impl TranscriptFormat {
    /// File extension without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            TranscriptFormat::Markdown => "md",
            TranscriptFormat::PlainText => "txt",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TranscriptFormat::Markdown => "markdown",
            TranscriptFormat::PlainText => "plain-text",
        }
    }
}

impl fmt::Display for TranscriptFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TranscriptFormat {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(TranscriptFormat::Markdown),
            "plain-text" | "plain" | "text" | "txt" => Ok(TranscriptFormat::PlainText),
            other => Err(crate::Error::Validation(format!(
                "unknown transcript format '{}' (expected markdown or plain-text)",
                other
            ))),
        }
    }
}

/// One message recovered from an exported transcript
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptEntry {
    pub role: Role,
    pub content: String,
    pub citations: Vec<Citation>,
}

/// Render `messages` and their citations in `format`.
///
/// Fails with [`crate::Error::EmptyTranscript`] when there is nothing to export.
pub fn export(
    messages: &[ChatMessage],
    citations: &CitationTable,
    format: TranscriptFormat,
) -> crate::Result<String> {
    if messages.is_empty() {
        return Err(crate::Error::EmptyTranscript);
    }

    let document = match format {
        TranscriptFormat::Markdown => markdown::render(messages, citations),
        TranscriptFormat::PlainText => plain::render(messages, citations),
    };
    Ok(document)
}

/// Parse a document produced by [`export`]
pub fn parse(document: &str, format: TranscriptFormat) -> crate::Result<Vec<TranscriptEntry>> {
    match format {
        TranscriptFormat::Markdown => markdown::parse(document),
        TranscriptFormat::PlainText => plain::parse(document),
    }
}

/// Suggested file name for a transcript exported at `now`
pub fn default_file_name(format: TranscriptFormat, now: DateTime<Utc>) -> String {
    format!(
        "conversation-{}.{}",
        now.format("%Y%m%d-%H%M%S"),
        format.extension()
    )
}

/// Citations attached to message `index`, empty for user messages
fn citations_for<'a>(
    message: &ChatMessage,
    index: usize,
    citations: &'a CitationTable,
) -> &'a [Citation] {
    match message.role {
        Role::Assistant => citations.get(index).unwrap_or(&[]),
        Role::User => &[],
    }
}

fn timestamp(message: &ChatMessage) -> String {
    message.timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// Collapse whitespace so an excerpt or metadata value fits on one line
fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse a `key: value` metadata line
fn parse_metadata_entry(citation: &mut Citation, line: &str) {
    match line.split_once(": ") {
        Some((key, value)) => citation.metadata.insert(key, value),
        None => citation.metadata.insert(line.trim_end_matches(':'), ""),
    }
}

/// Parse a role label heading such as `User (2026-10-16 09:30 UTC)`
fn parse_role(header: &str, line: usize) -> crate::Result<Role> {
    let label = header.split_once(" (").map_or(header, |(label, _)| label).trim();
    Role::from_label(label).ok_or_else(|| crate::Error::TranscriptParse {
        line,
        reason: format!("unknown role '{}'", label),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{GeneratedAnswer, SessionManager};

    fn sample_session() -> SessionManager {
        let manager = SessionManager::default();

        let ticket = manager.submit("Qu'est-ce que le Code civil ?").unwrap();
        manager.on_response(
            ticket.generation,
            Ok(GeneratedAnswer::new(
                "Le Code civil est le recueil des lois civiles.\n\nIl date de 1804.\n# pas un titre",
            )
            .with_citation(
                Citation::new("Art. 1\nLes lois sont executoires")
                    .with_metadata("source", "Legifrance")
                    .with_metadata("article", "1"),
            )
            .with_citation(Citation::new("Art. 2 (ancien)"))),
        );

        let ticket = manager.submit("## Assistant\nSources:\n    indentation").unwrap();
        manager.on_response(ticket.generation, Err("timeout".into()));

        let ticket = manager.submit("Et l'article 1240 ?").unwrap();
        manager.on_response(
            ticket.generation,
            Ok(GeneratedAnswer::new("Responsabilite delictuelle.\n")),
        );

        manager
    }

    fn assert_round_trip(format: TranscriptFormat) {
        let manager = sample_session();
        let snapshot = manager.snapshot();
        let document = manager.export_transcript(format).unwrap();

        let entries = parse(&document, format).unwrap();
        assert_eq!(entries.len(), snapshot.messages.len());
        for (index, (entry, message)) in entries.iter().zip(&snapshot.messages).enumerate() {
            assert_eq!(entry.role, message.role, "role of message {}", index);
            assert_eq!(entry.content, message.content, "content of message {}", index);
            let expected = snapshot.citations.get(index).map_or(0, <[Citation]>::len);
            assert_eq!(entry.citations.len(), expected, "citations of message {}", index);
        }

        let first_answer = &entries[1].citations;
        assert_eq!(first_answer[0].content, "Art. 1 Les lois sont executoires");
        assert_eq!(first_answer[0].metadata.get("source"), Some("Legifrance"));
        assert_eq!(first_answer[0].metadata.get("article"), Some("1"));
        assert_eq!(first_answer[1].content, "Art. 2 (ancien)");
    }

    #[test]
    fn test_markdown_round_trip() {
        assert_round_trip(TranscriptFormat::Markdown);
    }

    #[test]
    fn test_plain_text_round_trip() {
        assert_round_trip(TranscriptFormat::PlainText);
    }

    #[test]
    fn test_crlf_content_round_trips_in_both_formats() {
        let manager = SessionManager::default();
        let ticket = manager.submit("Premier\r\nSecond").unwrap();
        manager.on_response(
            ticket.generation,
            Ok(GeneratedAnswer::new("Ligne\r\nSuite")),
        );

        for format in [TranscriptFormat::Markdown, TranscriptFormat::PlainText] {
            let document = manager.export_transcript(format).unwrap();
            let entries = parse(&document, format).unwrap();
            assert_eq!(entries.len(), 2, "{}", format);
            assert_eq!(entries[0].content, "Premier\r\nSecond", "{}", format);
            assert_eq!(entries[1].content, "Ligne\r\nSuite", "{}", format);
        }
    }

    #[test]
    fn test_formats_agree_on_content() {
        let manager = sample_session();
        let md = manager.export_transcript(TranscriptFormat::Markdown).unwrap();
        let txt = manager.export_transcript(TranscriptFormat::PlainText).unwrap();
        assert_ne!(md, txt);

        let from_md = parse(&md, TranscriptFormat::Markdown).unwrap();
        let from_txt = parse(&txt, TranscriptFormat::PlainText).unwrap();
        assert_eq!(from_md, from_txt);
    }

    #[test]
    fn test_export_is_pure() {
        let manager = sample_session();
        let before = manager.snapshot();
        let first = manager.export_transcript(TranscriptFormat::Markdown).unwrap();
        let second = manager.export_transcript(TranscriptFormat::Markdown).unwrap();
        assert_eq!(first, second);
        assert_eq!(manager.snapshot(), before);
    }

    #[test]
    fn test_export_empty_is_rejected() {
        let err = export(&[], &CitationTable::new(), TranscriptFormat::PlainText).unwrap_err();
        assert!(matches!(err, crate::Error::EmptyTranscript));
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("md".parse::<TranscriptFormat>().unwrap(), TranscriptFormat::Markdown);
        assert_eq!(
            "Plain-Text".parse::<TranscriptFormat>().unwrap(),
            TranscriptFormat::PlainText
        );
        assert_eq!("txt".parse::<TranscriptFormat>().unwrap(), TranscriptFormat::PlainText);
        assert!("pdf".parse::<TranscriptFormat>().is_err());
    }

    #[test]
    fn test_default_file_name() {
        let now = DateTime::parse_from_rfc3339("2026-10-16T09:05:07Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(
            default_file_name(TranscriptFormat::PlainText, now),
            "conversation-20261016-090507.txt"
        );
    }

    #[test]
    fn test_parse_rejects_unknown_role() {
        let err = parse("# Conversation transcript\n\n## System (x)\n\nhi\n", TranscriptFormat::Markdown)
            .unwrap_err();
        assert!(err.to_string().contains("unknown role"));
    }
}
