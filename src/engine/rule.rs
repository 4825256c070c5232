//! Rules and rule groups

use crate::core::types::{GroupId, RuleId};
use crate::effects::SideEffect;
use crate::state::snapshot::StateSnapshot;
use rand::RngCore;

/// Stateless predicate over the current tick
pub type Condition = Box<dyn Fn(&StateSnapshot<'_>) -> bool + Send + Sync>;

/// Produces the effects a matching rule wants applied
pub type Action = Box<dyn Fn(&StateSnapshot<'_>, &mut dyn RngCore) -> Vec<SideEffect> + Send + Sync>;

pub struct Rule {
    pub id: RuleId,
    pub name: String,
    pub enabled: bool,
    pub(crate) condition: Condition,
    pub(crate) actions: Vec<Action>,
}

impl Rule {
    pub fn new(
        name: impl Into<String>,
        condition: impl Fn(&StateSnapshot<'_>) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: RuleId::new(),
            name: name.into(),
            enabled: true,
            condition: Box::new(condition),
            actions: Vec::new(),
        }
    }

    /// Attach an action computed from the snapshot
    pub fn with_action(
        mut self,
        action: impl Fn(&StateSnapshot<'_>, &mut dyn RngCore) -> Vec<SideEffect> + Send + Sync + 'static,
    ) -> Self {
        self.actions.push(Box::new(action));
        self
    }

    /// Attach a fixed effect applied every time the rule matches
    pub fn with_effect(self, effect: SideEffect) -> Self {
        self.with_action(move |_, _| vec![effect.clone()])
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn matches(&self, snapshot: &StateSnapshot<'_>) -> bool {
        self.enabled && (self.condition)(snapshot)
    }

    pub fn effects(&self, snapshot: &StateSnapshot<'_>, rng: &mut dyn RngCore) -> Vec<SideEffect> {
        self.actions.iter().flat_map(|action| action(snapshot, &mut *rng)).collect()
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("enabled", &self.enabled)
            .field("actions", &self.actions.len())
            .finish()
    }
}

/// Rules sharing one memory namespace, evaluated in insertion order
#[derive(Debug)]
pub struct RuleGroup {
    pub id: GroupId,
    pub name: String,
    pub enabled: bool,
    pub rules: Vec<Rule>,
}

impl RuleGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: GroupId::new(),
            name: name.into(),
            enabled: true,
            rules: Vec::new(),
        }
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rule_mut(&mut self, name: &str) -> Option<&mut Rule> {
        self.rules.iter_mut().find(|r| r.name == name)
    }
}
