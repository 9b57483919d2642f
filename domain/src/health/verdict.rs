//! Health evidence and verdicts.
//!
//! Providers sometimes answer with a well-formed but content-free stream.
//! [`HealthVerdict::assess`] combines one strong signal (no content at all)
//! with several weak ones to decide whether an attempt should be retried.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Thresholds used to flag an attempt as empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthThresholds {
    /// Total bytes below this floor is a weak signal.
    pub min_total_bytes: u64,
    /// Attempts finishing faster than this are suspicious.
    pub min_elapsed_ms: u64,
    /// Average line size below this is a weak signal.
    pub min_avg_chunk_bytes: u64,
    /// How many weak signals together flag an attempt as empty.
    pub weak_signals_required: usize,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            min_total_bytes: 32,
            min_elapsed_ms: 200,
            min_avg_chunk_bytes: 4,
            weak_signals_required: 2,
        }
    }
}

/// Evidence accumulated while an attempt streams.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HealthEvidence {
    pub chunk_count: u64,
    pub byte_count: u64,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
    pub content_observed: bool,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

impl HealthEvidence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one accepted line.
    pub fn record(&mut self, bytes: usize, is_content: bool) {
        self.chunk_count += 1;
        self.byte_count += bytes as u64;
        self.content_observed |= is_content;
    }

    pub fn finish(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }

    pub fn average_chunk_bytes(&self) -> u64 {
        self.byte_count.checked_div(self.chunk_count).unwrap_or(0)
    }
}

/// Reasons an attempt looks empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptySignal {
    /// No content line was ever observed. Strong on its own.
    NoContent,
    BelowByteFloor,
    TooFast,
    TinyChunks,
}

impl EmptySignal {
    pub fn is_strong(&self) -> bool {
        matches!(self, EmptySignal::NoContent)
    }
}

/// Outcome of assessing a finished attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthVerdict {
    pub is_empty: bool,
    pub signals: Vec<EmptySignal>,
    pub evidence: HealthEvidence,
}

impl HealthVerdict {
    pub fn assess(evidence: HealthEvidence, thresholds: &HealthThresholds) -> Self {
        let mut signals = Vec::new();

        if !evidence.content_observed {
            signals.push(EmptySignal::NoContent);
        }
        if evidence.byte_count < thresholds.min_total_bytes {
            signals.push(EmptySignal::BelowByteFloor);
        }
        if evidence.elapsed < Duration::from_millis(thresholds.min_elapsed_ms) {
            signals.push(EmptySignal::TooFast);
        }
        if evidence.average_chunk_bytes() < thresholds.min_avg_chunk_bytes {
            signals.push(EmptySignal::TinyChunks);
        }

        let strong = signals.iter().any(EmptySignal::is_strong);
        let weak = signals.iter().filter(|s| !s.is_strong()).count();
        let is_empty = strong || weak >= thresholds.weak_signals_required.max(1);

        Self {
            is_empty,
            signals,
            evidence,
        }
    }

    /// Whether a strong signal (rather than weak ones alone) made the
    /// attempt empty.
    pub fn has_strong_signal(&self) -> bool {
        self.signals.iter().any(EmptySignal::is_strong)
    }

    /// Short description used in retry notices and logs.
    pub fn reason(&self) -> String {
        if self.signals.is_empty() {
            return "healthy".to_string();
        }
        let names: Vec<&str> = self
            .signals
            .iter()
            .map(|s| match s {
                EmptySignal::NoContent => "no content",
                EmptySignal::BelowByteFloor => "too few bytes",
                EmptySignal::TooFast => "finished too fast",
                EmptySignal::TinyChunks => "tiny chunks",
            })
            .collect();
        format!("empty response ({})", names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evidence(chunks: u64, bytes: u64, ms: u64, content: bool) -> HealthEvidence {
        HealthEvidence {
            chunk_count: chunks,
            byte_count: bytes,
            elapsed: Duration::from_millis(ms),
            content_observed: content,
        }
    }

    #[test]
    fn no_content_is_empty_regardless_of_volume() {
        let verdict = HealthVerdict::assess(evidence(3, 10, 50, false), &HealthThresholds::default());
        assert!(verdict.is_empty);
        assert!(verdict.signals.contains(&EmptySignal::NoContent));

        let large = HealthVerdict::assess(evidence(40, 4000, 5000, false), &HealthThresholds::default());
        assert!(large.is_empty);
        assert_eq!(large.signals, vec![EmptySignal::NoContent]);
    }

    #[test]
    fn real_answer_is_healthy() {
        let verdict =
            HealthVerdict::assess(evidence(12, 480, 1500, true), &HealthThresholds::default());
        assert!(!verdict.is_empty);
        assert!(verdict.signals.is_empty());
        assert_eq!(verdict.reason(), "healthy");
    }

    #[test]
    fn single_weak_signal_is_tolerated() {
        // Short but fast answer: only TooFast fires
        let verdict = HealthVerdict::assess(evidence(2, 64, 20, true), &HealthThresholds::default());
        assert_eq!(verdict.signals, vec![EmptySignal::TooFast]);
        assert!(!verdict.is_empty);
    }

    #[test]
    fn conjunction_of_weak_signals_is_empty() {
        let verdict = HealthVerdict::assess(evidence(4, 8, 30, true), &HealthThresholds::default());
        assert!(verdict.is_empty);
        assert!(verdict.signals.contains(&EmptySignal::BelowByteFloor));
        assert!(verdict.signals.contains(&EmptySignal::TooFast));
        assert!(verdict.reason().starts_with("empty response"));
        assert!(!verdict.has_strong_signal());

        let silent = HealthVerdict::assess(evidence(1, 8, 30, false), &HealthThresholds::default());
        assert!(silent.has_strong_signal());
    }

    #[test]
    fn record_accumulates() {
        let mut e = HealthEvidence::new();
        e.record(10, false);
        e.record(6, true);
        e.record(2, false);
        assert_eq!(e.chunk_count, 3);
        assert_eq!(e.byte_count, 18);
        assert!(e.content_observed);
        assert_eq!(e.average_chunk_bytes(), 6);
        assert_eq!(HealthEvidence::new().average_chunk_bytes(), 0);
    }
}
