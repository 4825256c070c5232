//! Ephemeral per-group memory
//!
//! Rule conditions are stateless predicates. Each rule group gets a small
//! namespace of flags, timers, numbers and last-activation instants that
//! survives across ticks, which is enough to express cooldowns and hysteresis.
//! Unknown names always read as their default.

use crate::core::types::{GroupId, RuleId};
use ahash::AHashMap;
use serde::Serialize;
use std::time::{Duration, Instant};

/// Stopwatch with start/stop/reset semantics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timer {
    started_at: Option<Instant>,
    accumulated: Duration,
}

impl Timer {
    /// Start (or resume) the timer; no-op when already running
    pub fn start(&mut self, now: Instant) {
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
    }

    /// Pause, keeping the elapsed time
    pub fn stop(&mut self, now: Instant) {
        if let Some(started) = self.started_at.take() {
            self.accumulated += now.saturating_duration_since(started);
        }
    }

    /// Zero the elapsed time and stop
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        let running = self
            .started_at
            .map(|started| now.saturating_duration_since(started))
            .unwrap_or_default();
        self.accumulated + running
    }
}

/// Memory of one rule group
#[derive(Debug, Clone, Default)]
pub struct GroupMemory {
    flags: AHashMap<String, bool>,
    timers: AHashMap<String, Timer>,
    numbers: AHashMap<String, f32>,
    activations: AHashMap<RuleId, Instant>,
}

impl GroupMemory {
    pub fn flag(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }

    pub fn set_flag(&mut self, name: &str, value: bool) {
        self.flags.insert(name.to_string(), value);
    }

    pub fn number(&self, name: &str) -> f32 {
        self.numbers.get(name).copied().unwrap_or(0.0)
    }

    pub fn set_number(&mut self, name: &str, value: f32) {
        self.numbers.insert(name.to_string(), value);
    }

    /// Elapsed seconds, `None` for a timer that was never touched
    pub fn timer(&self, name: &str, now: Instant) -> Option<f32> {
        self.timers.get(name).map(|t| t.elapsed(now).as_secs_f32())
    }

    pub fn is_timer_running(&self, name: &str) -> bool {
        self.timers.get(name).map(Timer::is_running).unwrap_or(false)
    }

    pub fn start_timer(&mut self, name: &str, now: Instant) {
        self.timers.entry(name.to_string()).or_default().start(now);
    }

    pub fn stop_timer(&mut self, name: &str, now: Instant) {
        self.timers.entry(name.to_string()).or_default().stop(now);
    }

    pub fn reset_timer(&mut self, name: &str) {
        self.timers.entry(name.to_string()).or_default().reset();
    }

    pub fn record_activation(&mut self, rule: RuleId, now: Instant) {
        self.activations.insert(rule, now);
    }

    /// Seconds since `rule` last activated, infinity if it never did
    pub fn seconds_since_last_activation(&self, rule: RuleId, now: Instant) -> f64 {
        self.activations
            .get(&rule)
            .map(|at| now.saturating_duration_since(*at).as_secs_f64())
            .unwrap_or(f64::INFINITY)
    }

    pub fn summary(&self, now: Instant) -> GroupMemorySummary {
        let mut flags: Vec<(String, bool)> =
            self.flags.iter().map(|(k, v)| (k.clone(), *v)).collect();
        let mut numbers: Vec<(String, f32)> =
            self.numbers.iter().map(|(k, v)| (k.clone(), *v)).collect();
        let mut timers: Vec<(String, f32, bool)> = self
            .timers
            .iter()
            .map(|(k, t)| (k.clone(), t.elapsed(now).as_secs_f32(), t.is_running()))
            .collect();
        flags.sort_by(|a, b| a.0.cmp(&b.0));
        numbers.sort_by(|a, b| a.0.cmp(&b.0));
        timers.sort_by(|a, b| a.0.cmp(&b.0));
        GroupMemorySummary { flags, numbers, timers }
    }
}

/// Serializable view of a group's memory for state dumps
#[derive(Debug, Clone, Serialize)]
pub struct GroupMemorySummary {
    pub flags: Vec<(String, bool)>,
    pub numbers: Vec<(String, f32)>,
    /// (name, elapsed seconds, running)
    pub timers: Vec<(String, f32, bool)>,
}

/// Memory for every group, owned by the engine across ticks
#[derive(Debug, Clone)]
pub struct EphemeralMemory {
    groups: AHashMap<GroupId, GroupMemory>,
    current: GroupId,
    /// Returned for reads of groups that were never written
    empty: GroupMemory,
}

impl Default for EphemeralMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl EphemeralMemory {
    pub fn new() -> Self {
        Self {
            groups: AHashMap::new(),
            current: GroupId::ROOT,
            empty: GroupMemory::default(),
        }
    }

    pub fn current_group(&self) -> GroupId {
        self.current
    }

    /// Make `group` current and return the group it replaces
    pub(crate) fn swap_group(&mut self, group: GroupId) -> GroupId {
        std::mem::replace(&mut self.current, group)
    }

    /// Memory of `group` if it has ever been written
    pub fn group(&self, group: GroupId) -> Option<&GroupMemory> {
        self.groups.get(&group)
    }

    /// Memory of `group`, created on first access
    pub fn group_mut(&mut self, group: GroupId) -> &mut GroupMemory {
        self.groups.entry(group).or_default()
    }

    /// Read access to the current group; untouched groups read as empty
    pub fn current(&self) -> &GroupMemory {
        self.groups.get(&self.current).unwrap_or(&self.empty)
    }

    pub fn current_mut(&mut self) -> &mut GroupMemory {
        self.group_mut(self.current)
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Drop everything, e.g. when a profile is reloaded
    pub fn clear(&mut self) {
        self.groups.clear();
        self.current = GroupId::ROOT;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_for_unknown_names() {
        let memory = GroupMemory::default();
        let now = Instant::now();
        assert!(!memory.flag("x"));
        assert_eq!(memory.number("x"), 0.0);
        assert_eq!(memory.timer("x", now), None);
        assert!(!memory.is_timer_running("x"));
        assert!(memory
            .seconds_since_last_activation(RuleId::new(), now)
            .is_infinite());
    }

    #[test]
    fn test_activation_delta() {
        let mut memory = GroupMemory::default();
        let rule = RuleId::new();
        let t0 = Instant::now();
        memory.record_activation(rule, t0);

        let since = memory.seconds_since_last_activation(rule, t0 + Duration::from_millis(1500));
        assert!((since - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_timer_start_stop_reset() {
        let mut memory = GroupMemory::default();
        let t0 = Instant::now();

        memory.start_timer("buff", t0);
        assert!(memory.is_timer_running("buff"));
        assert_eq!(memory.timer("buff", t0 + Duration::from_secs(2)), Some(2.0));

        memory.stop_timer("buff", t0 + Duration::from_secs(3));
        assert!(!memory.is_timer_running("buff"));
        assert_eq!(memory.timer("buff", t0 + Duration::from_secs(10)), Some(3.0));

        // Resuming accumulates
        memory.start_timer("buff", t0 + Duration::from_secs(10));
        assert_eq!(memory.timer("buff", t0 + Duration::from_secs(11)), Some(4.0));

        memory.reset_timer("buff");
        assert_eq!(memory.timer("buff", t0 + Duration::from_secs(20)), Some(0.0));
        assert!(!memory.is_timer_running("buff"));
    }

    #[test]
    fn test_groups_isolated_and_created_lazily() {
        let mut memory = EphemeralMemory::new();
        let combat = GroupId::new();
        let loot = GroupId::new();
        assert_eq!(memory.group_count(), 0);

        memory.group_mut(combat).set_flag("x", true);
        assert_eq!(memory.group_count(), 1);
        assert!(memory.group(combat).unwrap().flag("x"));
        assert!(memory.group(loot).is_none());

        let previous = memory.swap_group(loot);
        assert_eq!(previous, GroupId::ROOT);
        assert!(!memory.current().flag("x"));
        memory.swap_group(combat);
        assert!(memory.current().flag("x"));
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut memory = EphemeralMemory::new();
        let group = GroupId::new();
        memory.swap_group(group);
        memory.current_mut().set_number("stacks", 3.0);

        memory.clear();
        assert_eq!(memory.group_count(), 0);
        assert_eq!(memory.current_group(), GroupId::ROOT);
    }

    #[test]
    fn test_summary_sorted() {
        let mut memory = GroupMemory::default();
        memory.set_flag("b", true);
        memory.set_flag("a", false);
        let summary = memory.summary(Instant::now());
        assert_eq!(summary.flags[0].0, "a");
        assert_eq!(summary.flags[1].0, "b");
    }
}
