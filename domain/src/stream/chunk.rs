//! Classification of provider stream lines.
//!
//! Each line has the shape `<participant><code>:<json>`, for example
//! `a0:"Hello"` (text of participant a) or `bd:{"finishReason":"stop"}`
//! (finish marker of participant b).

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One side of a multiplexed (pairwise) response stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Participant {
    A,
    B,
}

impl Participant {
    pub fn as_char(&self) -> char {
        match self {
            Participant::A => 'a',
            Participant::B => 'b',
        }
    }

    fn from_prefix(c: char) -> Option<Self> {
        match c {
            'a' => Some(Participant::A),
            'b' => Some(Participant::B),
            _ => None,
        }
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl FromStr for Participant {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a" => Ok(Participant::A),
            "b" => Ok(Participant::B),
            other => Err(DomainError::UnknownParticipant(other.to_string())),
        }
    }
}

/// Content classification of a stream line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    /// Textual answer content (`a0:` / `b0:`).
    Text,
    /// Side-channel reasoning (`ag:` / `bg:`).
    Reasoning,
    /// Structured attachment data such as images (`a2:` / `b2:`).
    Attachment,
    /// Terminal marker (`ad:`, `ae:` and their `b` twins).
    Finish,
    /// In-band provider error (`a3:` or a bare `{"error": ...}` object).
    Error,
    /// Anything else; forwarded but never treated as content.
    Other,
}

/// A single line of provider output with its classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamChunk {
    raw: String,
    kind: ChunkKind,
    participant: Option<Participant>,
    body_offset: usize,
}

impl StreamChunk {
    pub fn classify(line: impl Into<String>) -> Self {
        let raw = line.into();

        if let Some(idx) = raw.find(':') {
            let mut prefix = raw[..idx].chars();
            if let (Some(p), Some(code), None) = (prefix.next(), prefix.next(), prefix.next())
                && let Some(participant) = Participant::from_prefix(p)
            {
                let kind = match code {
                    '0' => ChunkKind::Text,
                    'g' => ChunkKind::Reasoning,
                    '2' => ChunkKind::Attachment,
                    'd' | 'e' => ChunkKind::Finish,
                    '3' => ChunkKind::Error,
                    _ => ChunkKind::Other,
                };
                return Self {
                    raw,
                    kind,
                    participant: Some(participant),
                    body_offset: idx + 1,
                };
            }
        }

        let kind = if is_error_object(&raw) {
            ChunkKind::Error
        } else {
            ChunkKind::Other
        };
        Self {
            raw,
            kind,
            participant: None,
            body_offset: 0,
        }
    }

    pub fn kind(&self) -> ChunkKind {
        self.kind
    }

    pub fn participant(&self) -> Option<Participant> {
        self.participant
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    fn body(&self) -> &str {
        &self.raw[self.body_offset..]
    }

    /// Decoded text for `Text` and `Reasoning` lines.
    pub fn text(&self) -> Option<String> {
        match self.kind {
            ChunkKind::Text | ChunkKind::Reasoning => {
                serde_json::from_str::<String>(self.body()).ok()
            }
            _ => None,
        }
    }

    /// Whether this line is genuine answer content.
    ///
    /// Attachments, reasoning and markers never count.
    pub fn carries_content(&self) -> bool {
        self.kind == ChunkKind::Text && self.text().is_some_and(|t| !t.is_empty())
    }

    /// Human-readable message of an `Error` line.
    pub fn error_message(&self) -> Option<String> {
        if self.kind != ChunkKind::Error {
            return None;
        }
        let body = self.body().trim();
        let message = match serde_json::from_str::<serde_json::Value>(body) {
            Ok(serde_json::Value::String(s)) => s,
            Ok(value) => match value.get("error") {
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => value.to_string(),
            },
            Err(_) => body.to_string(),
        };
        Some(message)
    }
}

fn is_error_object(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with('{')
        && serde_json::from_str::<serde_json::Value>(trimmed)
            .map(|v| v.get("error").is_some())
            .unwrap_or(false)
}
