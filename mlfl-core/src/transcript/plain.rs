//! Plain-text transcript: `[Role] time` headers, indented content lines and
//! `[n]` references under a `Sources:` line.

use super::{citations_for, one_line, parse_metadata_entry, parse_role, timestamp, TranscriptEntry};
use crate::session::{ChatMessage, Citation, CitationTable, Role};
use std::fmt::Write;

const TITLE: &str = "Conversation transcript";
const UNDERLINE: &str = "=======================";
const CONTENT_INDENT: &str = "    ";
const SOURCES_LINE: &str = "Sources:";
const REFERENCE_INDENT: &str = "  [";
const METADATA_INDENT: &str = "      ";

pub(super) fn render(messages: &[ChatMessage], citations: &CitationTable) -> String {
    let mut out = String::new();
    out.push_str(TITLE);
    out.push('\n');
    out.push_str(UNDERLINE);
    out.push('\n');

    for (index, message) in messages.iter().enumerate() {
        let _ = write!(out, "\n[{}] {}\n", message.role.label(), timestamp(message));
        for paragraph in message.paragraphs() {
            let _ = writeln!(out, "{}{}", CONTENT_INDENT, paragraph);
        }

        let sources = citations_for(message, index, citations);
        if sources.is_empty() {
            continue;
        }
        out.push_str(SOURCES_LINE);
        out.push('\n');
        for (n, citation) in sources.iter().enumerate() {
            let _ = writeln!(out, "  [{}] {}", n + 1, one_line(&citation.content));
            for (key, value) in citation.metadata.iter() {
                let _ = writeln!(out, "{}{}: {}", METADATA_INDENT, key, one_line(value));
            }
        }
    }

    out
}

pub(super) fn parse(document: &str) -> crate::Result<Vec<TranscriptEntry>> {
    let mut entries = Vec::new();
    let mut current: Option<(Role, Vec<&str>, Vec<Citation>)> = None;
    let mut in_sources = false;

    // Not `lines()`: a `\r` before the newline belongs to the content.
    for (i, line) in document.split('\n').enumerate() {
        let line_no = i + 1;

        if let Some(header) = parse_header(line) {
            if let Some((role, lines, citations)) = current.take() {
                entries.push(finish(role, lines, citations));
            }
            current = Some((parse_role(header, line_no)?, Vec::new(), Vec::new()));
            in_sources = false;
            continue;
        }

        let Some((_, lines, citations)) = current.as_mut() else {
            if line.is_empty() || line == TITLE || line == UNDERLINE {
                continue;
            }
            return Err(crate::Error::TranscriptParse {
                line: line_no,
                reason: "text before the first message".to_string(),
            });
        };

        if line.is_empty() {
            continue;
        }
        if !in_sources {
            if let Some(content) = line.strip_prefix(CONTENT_INDENT) {
                lines.push(content);
                continue;
            }
            if line == SOURCES_LINE {
                in_sources = true;
                continue;
            }
        } else if let Some(rest) = line.strip_prefix(METADATA_INDENT) {
            if let Some(citation) = citations.last_mut() {
                parse_metadata_entry(citation, rest);
                continue;
            }
        } else if let Some(rest) = line.strip_prefix(REFERENCE_INDENT) {
            if let Some((_, content)) = rest.split_once("] ") {
                citations.push(Citation::new(content));
                continue;
            }
        }

        return Err(crate::Error::TranscriptParse {
            line: line_no,
            reason: format!("unexpected line: '{}'", line),
        });
    }

    if let Some((role, lines, citations)) = current.take() {
        entries.push(finish(role, lines, citations));
    }
    Ok(entries)
}

/// `[User] 2026-10-16 09:30 UTC` -> `User`
fn parse_header(line: &str) -> Option<&str> {
    let rest = line.strip_prefix('[')?;
    let (label, _) = rest.split_once(']')?;
    Some(label)
}

fn finish(role: Role, lines: Vec<&str>, citations: Vec<Citation>) -> TranscriptEntry {
    TranscriptEntry {
        role,
        content: lines.join("\n"),
        citations,
    }
}
