//! Markdown transcript: one `##` section per message, citations as a
//! numbered list under a `### Sources` heading.

use super::{citations_for, one_line, parse_metadata_entry, parse_role, timestamp, TranscriptEntry};
use crate::session::{ChatMessage, Citation, CitationTable};
use std::fmt::Write;

const TITLE: &str = "# Conversation transcript";
const MESSAGE_PREFIX: &str = "## ";
const SOURCES_HEADING: &str = "### Sources";
const METADATA_PREFIX: &str = "   - ";

pub(super) fn render(messages: &[ChatMessage], citations: &CitationTable) -> String {
    let mut out = String::new();
    out.push_str(TITLE);
    out.push('\n');

    for (index, message) in messages.iter().enumerate() {
        // Writing to a String cannot fail.
        let _ = write!(
            out,
            "\n{}{} ({})\n\n",
            MESSAGE_PREFIX,
            message.role.label(),
            timestamp(message)
        );
        let body: Vec<String> = message.paragraphs().map(escape).collect();
        out.push_str(&body.join("\n\n"));
        out.push('\n');

        let sources = citations_for(message, index, citations);
        if sources.is_empty() {
            continue;
        }
        let _ = write!(out, "\n{}\n\n", SOURCES_HEADING);
        for (n, citation) in sources.iter().enumerate() {
            let _ = writeln!(out, "{}. {}", n + 1, one_line(&citation.content));
            for (key, value) in citation.metadata.iter() {
                let _ = writeln!(out, "{}{}: {}", METADATA_PREFIX, key, one_line(value));
            }
        }
    }

    out
}

pub(super) fn parse(document: &str) -> crate::Result<Vec<TranscriptEntry>> {
    let mut entries = Vec::new();
    let mut current: Option<PartialEntry> = None;

    for (i, line) in document.split('\n').enumerate() {
        let line_no = i + 1;

        if let Some(header) = line.strip_prefix(MESSAGE_PREFIX) {
            if let Some(done) = current.take() {
                entries.push(done.finish());
            }
            current = Some(PartialEntry::new(parse_role(header, line_no)?));
            continue;
        }

        let Some(entry) = current.as_mut() else {
            if line.is_empty() || line == TITLE {
                continue;
            }
            return Err(crate::Error::TranscriptParse {
                line: line_no,
                reason: "text before the first message".to_string(),
            });
        };

        if !entry.in_sources {
            if line == SOURCES_HEADING {
                entry.in_sources = true;
            } else {
                entry.body.push(line);
            }
            continue;
        }

        if line.is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix(METADATA_PREFIX) {
            match entry.citations.last_mut() {
                Some(citation) => parse_metadata_entry(citation, rest),
                None => {
                    return Err(crate::Error::TranscriptParse {
                        line: line_no,
                        reason: "metadata without a citation".to_string(),
                    })
                }
            }
            continue;
        }
        match parse_numbered(line) {
            Some(content) => entry.citations.push(Citation::new(content)),
            None => {
                return Err(crate::Error::TranscriptParse {
                    line: line_no,
                    reason: format!("unexpected line in sources: '{}'", line),
                })
            }
        }
    }

    if let Some(done) = current.take() {
        entries.push(done.finish());
    }
    Ok(entries)
}

struct PartialEntry<'a> {
    role: crate::session::Role,
    body: Vec<&'a str>,
    in_sources: bool,
    citations: Vec<Citation>,
}

impl<'a> PartialEntry<'a> {
    fn new(role: crate::session::Role) -> Self {
        Self {
            role,
            body: Vec::new(),
            in_sources: false,
            citations: Vec::new(),
        }
    }

    fn finish(self) -> TranscriptEntry {
        // The body is framed by one blank line on each side and paragraphs
        // are separated by one blank line.
        let joined = self.body.join("\n");
        let inner = joined.strip_prefix('\n').unwrap_or(&joined);
        let inner = inner.strip_suffix('\n').unwrap_or(inner);
        let content = inner
            .split("\n\n")
            .map(unescape)
            .collect::<Vec<_>>()
            .join("\n");

        TranscriptEntry {
            role: self.role,
            content,
            citations: self.citations,
        }
    }
}

/// `12. text` -> `text`
fn parse_numbered(line: &str) -> Option<&str> {
    let (number, rest) = line.split_once(". ")?;
    if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(rest)
}

/// Paragraphs starting with `#` would read as headings
fn escape(paragraph: &str) -> String {
    if paragraph.starts_with('#') || paragraph.starts_with('\\') {
        format!("\\{}", paragraph)
    } else {
        paragraph.to_string()
    }
}

fn unescape(paragraph: &str) -> &str {
    paragraph.strip_prefix('\\').unwrap_or(paragraph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{GeneratedAnswer, SessionManager};

    #[test]
    fn test_render_layout() {
        let manager = SessionManager::default();
        let ticket = manager.submit("Qu'est-ce que le Code civil ?").unwrap();
        manager.on_response(
            ticket.generation,
            Ok(GeneratedAnswer::new("Le Code civil est...\nSuite.").with_citation(
                Citation::new("Art. 1")
                    .with_metadata("source", "Legifrance")
                    .with_metadata("date", "1804"),
            )),
        );

        let snapshot = manager.snapshot();
        let document = render(&snapshot.messages, &snapshot.citations);
        let lines: Vec<&str> = document.lines().collect();

        assert_eq!(lines[0], "# Conversation transcript");
        assert!(lines[2].starts_with("## User ("));
        assert_eq!(lines[4], "Qu'est-ce que le Code civil ?");
        assert!(lines[6].starts_with("## Assistant ("));
        assert_eq!(lines[8], "Le Code civil est...");
        assert_eq!(lines[10], "Suite.");
        assert_eq!(lines[12], "### Sources");
        assert_eq!(lines[14], "1. Art. 1");
        assert_eq!(lines[15], "   - source: Legifrance");
        assert_eq!(lines[16], "   - date: 1804");
    }

    #[test]
    fn test_escape_round_trip() {
        for paragraph in ["# titre", "\\chemin", "texte"] {
            assert_eq!(unescape(&escape(paragraph)), paragraph);
        }
    }

    #[test]
    fn test_parse_numbered() {
        assert_eq!(parse_numbered("3. Art. 3"), Some("Art. 3"));
        assert_eq!(parse_numbered("Art. 3"), None);
        assert_eq!(parse_numbered(". x"), None);
    }
}
