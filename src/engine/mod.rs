//! Tick driver
//!
//! Each tick builds a fresh [`StateSnapshot`], walks the enabled groups in
//! order, applies the effects of every matching rule, then locks the
//! snapshot and hands the queued requests to the caller.

pub mod history;
pub mod rule;

use crate::core::config::AgentConfig;
use crate::core::error::Result;
use crate::state::memory::EphemeralMemory;
use crate::state::scratch::FrameRequests;
use crate::state::snapshot::StateSnapshot;
use crate::world::WorldReader;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::{Duration, Instant};

pub use history::{Activation, ActivationHistory, ActivationRecord};
pub use rule::{Action, Condition, Rule, RuleGroup};

pub struct RuleEngine {
    config: AgentConfig,
    memory: EphemeralMemory,
    groups: Vec<RuleGroup>,
    history: ActivationHistory,
    last_key_press: Option<Instant>,
    rng: ChaCha8Rng,
}

impl RuleEngine {
    pub fn new(config: AgentConfig) -> Self {
        Self::with_rng(config, ChaCha8Rng::from_entropy())
    }

    pub fn with_seed(config: AgentConfig, seed: u64) -> Self {
        Self::with_rng(config, ChaCha8Rng::seed_from_u64(seed))
    }

    fn with_rng(config: AgentConfig, rng: ChaCha8Rng) -> Self {
        let history = ActivationHistory::new(config.history_seconds_to_keep);
        Self {
            config,
            memory: EphemeralMemory::new(),
            groups: Vec::new(),
            history,
            last_key_press: None,
            rng,
        }
    }

    pub fn add_group(&mut self, group: RuleGroup) {
        tracing::info!(group = %group.name, rules = group.rules.len(), "Registered rule group");
        self.groups.push(group);
    }

    pub fn groups(&self) -> &[RuleGroup] {
        &self.groups
    }

    pub fn group_mut(&mut self, name: &str) -> Option<&mut RuleGroup> {
        self.groups.iter_mut().find(|g| g.name == name)
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn memory(&self) -> &EphemeralMemory {
        &self.memory
    }

    pub fn history(&self) -> &ActivationHistory {
        &self.history
    }

    /// Whether the global key press cooldown has elapsed at `now`
    pub fn can_press_key(&self, now: Instant) -> bool {
        let cooldown = Duration::from_millis(self.config.global_key_press_cooldown_ms);
        self.last_key_press
            .map(|at| now.saturating_duration_since(at) >= cooldown)
            .unwrap_or(true)
    }

    /// Evaluate every enabled rule against one snapshot of `world`
    pub fn tick(&mut self, world: &dyn WorldReader, now: Instant) -> Result<FrameRequests> {
        let can_press_key = self.can_press_key(now);
        let mut snapshot = StateSnapshot::new(world, &self.config, &mut self.memory, now);
        snapshot.scratch_mut()?.can_press_key = can_press_key;

        for group in self.groups.iter().filter(|g| g.enabled) {
            let mut scope = snapshot.enter_group(group.id);

            for rule in group.rules.iter().filter(|r| r.enabled) {
                scope.set_current_rule(Some(rule.id));
                if !rule.matches(&scope) {
                    continue;
                }

                let effects = rule.effects(&scope, &mut self.rng);
                let mut applied = Vec::with_capacity(effects.len());
                for effect in &effects {
                    if effect.apply(&mut scope)?.is_applied() {
                        applied.push(effect.to_string());
                    }
                }

                // A rule whose every effect was refused did not really fire
                if !effects.is_empty() && applied.is_empty() {
                    tracing::trace!(group = %group.name, rule = %rule.name, "Rule matched but nothing applied");
                    continue;
                }

                scope.record_activation(rule.id)?;
                tracing::debug!(group = %group.name, rule = %rule.name, effects = applied.len(), "Rule activated");
                self.history.record(Activation {
                    at: now,
                    group: group.name.clone(),
                    rule: rule.name.clone(),
                    effects: applied,
                });
            }
        }

        let requests = snapshot.lock()?;
        if requests.key_to_press.is_some() {
            self.last_key_press = Some(now);
        }
        self.history.prune(now);
        Ok(requests)
    }

    /// JSON dump of what a snapshot taken at `now` would see
    pub fn dump_state(&mut self, world: &dyn WorldReader, now: Instant) -> Result<String> {
        let snapshot = StateSnapshot::new(world, &self.config, &mut self.memory, now);
        snapshot.dump()
    }

    /// Forget all group memory and history, keeping the rules
    pub fn reset(&mut self) {
        self.memory.clear();
        self.history = ActivationHistory::new(self.config.history_seconds_to_keep);
        self.last_key_press = None;
    }
}
