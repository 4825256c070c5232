//! Rolling log of rule activations for debugging and state dumps

use crate::core::error::Result;
use serde::Serialize;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct Activation {
    pub at: Instant,
    pub group: String,
    pub rule: String,
    /// Rendered side effects that actually applied
    pub effects: Vec<String>,
}

/// Exported form of an [`Activation`]
#[derive(Debug, Clone, Serialize)]
pub struct ActivationRecord {
    pub seconds_ago: f64,
    pub group: String,
    pub rule: String,
    pub effects: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ActivationHistory {
    entries: VecDeque<Activation>,
    keep: Duration,
}

impl ActivationHistory {
    pub fn new(keep_seconds: u64) -> Self {
        Self {
            entries: VecDeque::new(),
            keep: Duration::from_secs(keep_seconds),
        }
    }

    pub fn record(&mut self, activation: Activation) {
        self.entries.push_back(activation);
    }

    /// Drop entries older than the retention window
    pub fn prune(&mut self, now: Instant) {
        while let Some(oldest) = self.entries.front() {
            if now.saturating_duration_since(oldest.at) <= self.keep {
                break;
            }
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Activation> {
        self.entries.iter()
    }

    /// Newest first
    pub fn records(&self, now: Instant) -> Vec<ActivationRecord> {
        self.entries
            .iter()
            .rev()
            .map(|a| ActivationRecord {
                seconds_ago: now.saturating_duration_since(a.at).as_secs_f64(),
                group: a.group.clone(),
                rule: a.rule.clone(),
                effects: a.effects.clone(),
            })
            .collect()
    }

    pub fn to_json(&self, now: Instant) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.records(now))?)
    }
}
