//! Session data structures

use chrono::{DateTime, Local, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Wire name used by the generation backend
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Human-readable label used in transcripts
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }

    /// Inverse of [`Role::label`]
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "User" => Some(Role::User),
            "Assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A chat message. Immutable once appended to a session log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message role
    pub role: Role,
    /// Message content, paragraphs separated by `\n`
    pub content: String,
    /// Message timestamp
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// Create a new chat message stamped with the current time
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Content split into display paragraphs, one per line
    pub fn paragraphs(&self) -> std::str::Split<'_, char> {
        self.content.split('\n')
    }

    /// Local wall-clock time (`HH:MM`) for message bubbles
    pub fn display_time(&self) -> String {
        self.timestamp.with_timezone(&Local).format("%H:%M").to_string()
    }
}

/// Ordered string-to-string metadata attached to a citation.
///
/// Key order is display order, so this keeps entries in the order they were
/// inserted (or appeared in the backend payload) instead of sorting them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata(Vec<(String, String)>);

impl Metadata {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Insert an entry. An existing key keeps its position and gets the new value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut metadata = Metadata::new();
        for (key, value) in iter {
            metadata.insert(key, value);
        }
        metadata
    }
}

impl Serialize for Metadata {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Metadata {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct MetadataVisitor;

        impl<'de> Visitor<'de> for MetadataVisitor {
            type Value = Metadata;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of metadata entries")
            }

            fn visit_unit<E>(self) -> Result<Metadata, E> {
                Ok(Metadata::new())
            }

            fn visit_map<A>(self, mut access: A) -> Result<Metadata, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut metadata = Metadata::new();
                while let Some((key, value)) = access.next_entry::<String, serde_json::Value>()? {
                    // Backends send page numbers and dates as JSON scalars.
                    let value = match value {
                        serde_json::Value::String(s) => s,
                        serde_json::Value::Null => String::new(),
                        other => other.to_string(),
                    };
                    metadata.insert(key, value);
                }
                Ok(metadata)
            }
        }

        deserializer.deserialize_any(MetadataVisitor)
    }
}

/// A retrieved source excerpt attached to an assistant message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// Excerpt of the source document
    pub content: String,
    /// Source metadata (source name, article, date...)
    #[serde(default)]
    pub metadata: Metadata,
}

impl Citation {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: Metadata::new(),
        }
    }

    /// Add a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key, value);
        self
    }

    /// Short label for a citation chip; `index` is 1-based
    pub fn label(&self, index: usize) -> String {
        let non_blank = |s: &&str| !s.trim().is_empty();
        self.metadata
            .get("source")
            .filter(non_blank)
            .or_else(|| self.metadata.get("filename").filter(non_blank))
            .map(ToString::to_string)
            .unwrap_or_else(|| format!("Source {}", index))
    }

    /// The first `limit` metadata entries, in display order
    pub fn metadata_preview(&self, limit: usize) -> Vec<(&str, &str)> {
        self.metadata.iter().take(limit).collect()
    }

    /// Excerpt truncated to at most `max_chars` characters
    pub fn excerpt(&self, max_chars: usize) -> String {
        if self.content.chars().count() <= max_chars {
            return self.content.clone();
        }
        let kept: String = self
            .content
            .chars()
            .take(max_chars.saturating_sub(3))
            .collect();
        format!("{}...", kept)
    }
}

/// Citations keyed by the log index of the assistant message that used them.
///
/// Only the session manager writes to the table, and only in lockstep with
/// appending an assistant message.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CitationTable {
    entries: BTreeMap<usize, Vec<Citation>>,
}

impl CitationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, index: usize, citations: Vec<Citation>) {
        self.entries.insert(index, citations);
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    /// Citations for the message at `index`, if it is a completed assistant message
    pub fn get(&self, index: usize) -> Option<&[Citation]> {
        self.entries.get(&index).map(Vec::as_slice)
    }

    /// Number of indexed entries (including assistant messages with no citations)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &[Citation])> {
        self.entries.iter().map(|(i, c)| (*i, c.as_slice()))
    }
}
