//! Regex-triggered risk alerts, deduplicated by message

use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::collections::HashSet;
use tracing::warn;

use crate::error::{ContentError, ContentResult};
use crate::session::TranscriptLine;

/// A fixed risk pattern and the alert it raises
#[derive(Debug, Clone)]
pub struct RedFlagRule {
    pattern: Regex,
    message: String,
}

impl RedFlagRule {
    /// Compile a case-insensitive rule
    pub fn new(pattern: &str, message: impl Into<String>) -> ContentResult<Self> {
        let compiled = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|source| ContentError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;

        Ok(Self {
            pattern: compiled,
            message: message.into(),
        })
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// An alert raised during a call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedFlagAlert {
    pub message: String,
    pub pattern: String,
    /// Index of the transcript line that first triggered it
    pub line_index: usize,
}

/// Accumulates alerts for one call. Alerts are never removed.
#[derive(Debug, Default)]
pub struct RedFlagDetector {
    alerts: Vec<RedFlagAlert>,
    seen: HashSet<String>,
}

impl RedFlagDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test a newly appended line against every rule.
    ///
    /// Returns only the alerts raised for the first time. Interim lines
    /// are ignored.
    pub fn scan(
        &mut self,
        rules: &[RedFlagRule],
        line: &TranscriptLine,
        line_index: usize,
    ) -> Vec<RedFlagAlert> {
        if !line.is_final {
            return Vec::new();
        }

        let mut raised = Vec::new();
        for rule in rules {
            if !rule.is_match(&line.text) || self.seen.contains(rule.message()) {
                continue;
            }

            warn!("Red flag raised: {}", rule.message());
            self.seen.insert(rule.message().to_string());

            let alert = RedFlagAlert {
                message: rule.message().to_string(),
                pattern: rule.pattern().to_string(),
                line_index,
            };
            self.alerts.push(alert.clone());
            raised.push(alert);
        }

        raised
    }

    pub fn alerts(&self) -> &[RedFlagAlert] {
        &self.alerts
    }
}
