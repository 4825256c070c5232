//! Tick-scoped state snapshot
//!
//! One `StateSnapshot` is built per tick. Player facts are read eagerly at
//! construction; entity collections are derived the first time a rule asks
//! for them and then frozen for the rest of the tick, so every rule in the
//! tick sees the same world even though the host keeps mutating it.
//!
//! Rule conditions get `&StateSnapshot`. Side effects get `&mut` and go
//! through [`StateSnapshot::scratch_mut`] / [`StateSnapshot::memory_mut`],
//! both of which fail once the snapshot is locked.

use crate::core::config::AgentConfig;
use crate::core::error::{AgentError, Result};
use crate::core::memo::Memo;
use crate::core::types::{EntityCategory, EntityId, GroupId, KeyCode, RuleId, ScreenRect, Vec3};
use crate::state::entity::{BuffSet, CreatureView, EntityView, Rarity, VitalsView};
use crate::state::memory::{EphemeralMemory, GroupMemory, GroupMemorySummary};
use crate::state::nearby::{is_valid_creature, SpatialMonsterIndex};
use crate::state::scratch::{FrameRequests, ScratchState};
use crate::state::skills::SkillSet;
use crate::world::{AreaInfo, Component, PanelVisibility, WorldReader};
use ordered_float::OrderedFloat;
use serde::Serialize;
use std::collections::BTreeSet;
use std::ops::{Deref, DerefMut};
use std::time::Instant;

pub struct StateSnapshot<'w> {
    world: &'w dyn WorldReader,
    config: &'w AgentConfig,
    memory: &'w mut EphemeralMemory,
    scratch: ScratchState,
    now: Instant,
    current_rule: Option<RuleId>,

    // Eager tick facts
    area: AreaInfo,
    panels: PanelVisibility,
    player: Option<CreatureView<'w>>,
    player_position: Option<Vec3>,
    /// Origin of the nearby index; `None` until the player is rendered
    nearby_origin: Option<Vec3>,
    vitals: VitalsView,
    buffs: BuffSet,
    ailments: BTreeSet<String>,
    skills: SkillSet<'w>,
    is_moving: bool,
    animation: i32,
    animation_id: i32,
    animation_stage: i32,

    // Lazy collections, frozen on first access
    nearby: Memo<SpatialMonsterIndex<'w>>,
    all_monsters: Memo<Vec<CreatureView<'w>>>,
    corpses: Memo<Vec<CreatureView<'w>>>,
    all_players: Memo<Vec<CreatureView<'w>>>,
    miscellaneous: Memo<Vec<EntityView<'w>>>,
    ingame_icons: Memo<Vec<EntityView<'w>>>,
    effects: Memo<Vec<EntityView<'w>>>,
}

impl<'w> StateSnapshot<'w> {
    pub fn new(
        world: &'w dyn WorldReader,
        config: &'w AgentConfig,
        memory: &'w mut EphemeralMemory,
        now: Instant,
    ) -> Self {
        let area = world.area();
        let panels = world.panels();
        let player_id = world.player();
        let player_position = player_id.and_then(|id| world.position(id));

        let player_buffs = player_id.and_then(|id| world.buffs(id));
        let ailments: BTreeSet<String> = match &player_buffs {
            Some(buffs) => config
                .ailments
                .iter()
                .filter(|(_, names)| names.iter().any(|n| buffs.iter().any(|b| &b.name == n)))
                .map(|(ailment, _)| ailment.clone())
                .collect(),
            None => BTreeSet::new(),
        };

        let actor = player_id.and_then(|id| world.actor(id));
        let skills = match (player_id, &actor) {
            (Some(id), Some(_)) => SkillSet::new(world, id, player_position),
            _ => SkillSet::empty(),
        };

        Self {
            world,
            config,
            memory,
            scratch: ScratchState::new(true),
            now,
            current_rule: None,
            area,
            panels,
            player: player_id.map(|id| CreatureView::new(world, id, player_position)),
            player_position,
            nearby_origin: player_id
                .filter(|id| world.has_component(*id, Component::Render))
                .and(player_position),
            vitals: VitalsView::from_life(player_id.and_then(|id| world.life(id))),
            buffs: BuffSet::new(player_buffs.unwrap_or_default()),
            ailments,
            skills,
            is_moving: actor.as_ref().map(|a| a.is_moving).unwrap_or(false),
            animation: actor.as_ref().map(|a| a.animation).unwrap_or(0),
            animation_id: actor.as_ref().map(|a| a.animation_id).unwrap_or(0),
            animation_stage: actor.as_ref().map(|a| a.animation_stage).unwrap_or(0),
            nearby: Memo::new(),
            all_monsters: Memo::new(),
            corpses: Memo::new(),
            all_players: Memo::new(),
            miscellaneous: Memo::new(),
            ingame_icons: Memo::new(),
            effects: Memo::new(),
        }
    }

    pub fn now(&self) -> Instant {
        self.now
    }

    pub fn config(&self) -> &AgentConfig {
        self.config
    }

    pub fn window_rect(&self) -> ScreenRect {
        self.world.window_rect()
    }

    // === PLAYER AND AREA ===

    pub fn player(&self) -> Option<&CreatureView<'w>> {
        self.player.as_ref()
    }

    pub fn vitals(&self) -> &VitalsView {
        &self.vitals
    }

    pub fn buffs(&self) -> &BuffSet {
        &self.buffs
    }

    pub fn ailments(&self) -> &BTreeSet<String> {
        &self.ailments
    }

    pub fn has_ailment(&self, name: &str) -> bool {
        self.ailments.contains(name)
    }

    pub fn skills(&self) -> &SkillSet<'w> {
        &self.skills
    }

    pub fn is_moving(&self) -> bool {
        self.is_moving
    }

    pub fn animation(&self) -> i32 {
        self.animation
    }

    pub fn animation_id(&self) -> i32 {
        self.animation_id
    }

    pub fn animation_stage(&self) -> i32 {
        self.animation_stage
    }

    pub fn area_name(&self) -> &str {
        &self.area.name
    }

    pub fn is_in_hideout(&self) -> bool {
        self.area.is_hideout
    }

    pub fn is_in_town(&self) -> bool {
        self.area.is_town
    }

    pub fn is_in_peaceful_area(&self) -> bool {
        self.area.is_peaceful
    }

    pub fn is_chat_open(&self) -> bool {
        self.panels.chat
    }

    pub fn is_left_panel_open(&self) -> bool {
        self.panels.left
    }

    pub fn is_right_panel_open(&self) -> bool {
        self.panels.right
    }

    pub fn is_any_fullscreen_panel_open(&self) -> bool {
        self.panels.fullscreen
    }

    pub fn is_any_large_panel_open(&self) -> bool {
        self.panels.large
    }

    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.world.is_key_down(key)
    }

    // === MONSTERS ===

    pub fn nearby(&self) -> &SpatialMonsterIndex<'w> {
        self.nearby.get_or_compute(|| {
            SpatialMonsterIndex::build(self.world, self.nearby_origin, self.config.maximum_monster_range)
        })
    }

    pub fn monster_count(&self, range: u32, rarity: Rarity) -> usize {
        self.nearby().count(range, rarity)
    }

    pub fn monster_count_in_range(&self, range: u32) -> usize {
        self.monster_count(range, Rarity::ANY)
    }

    pub fn total_monster_count(&self) -> usize {
        self.monster_count(u32::MAX, Rarity::ANY)
    }

    /// Hostile monsters within `range`, nearest first
    pub fn monsters(
        &self,
        range: u32,
        rarity: Rarity,
    ) -> impl Iterator<Item = &CreatureView<'w>> + '_ {
        self.nearby().list(range, rarity)
    }

    pub fn closest_monster(&self, range: u32, rarity: Rarity) -> Option<&CreatureView<'w>> {
        self.monsters(range, rarity)
            .min_by_key(|m| OrderedFloat(m.distance()))
    }

    pub fn friendly_monsters(&self) -> &[CreatureView<'w>] {
        self.nearby().friendly()
    }

    fn creatures(
        &self,
        category: EntityCategory,
        keep: impl Fn(&dyn WorldReader, EntityId) -> bool,
    ) -> Vec<CreatureView<'w>> {
        let Some(origin) = self.player_position else {
            return Vec::new();
        };
        let world = self.world;
        let range = self.config.maximum_monster_range;
        world
            .entities(category)
            .into_iter()
            .filter(|id| is_valid_creature(world, *id, origin, range, false))
            .filter(|id| keep(world, *id))
            .map(|id| CreatureView::new(world, id, Some(origin)))
            .collect()
    }

    /// Every valid monster in range, dead or alive, hostile or not
    pub fn all_monsters(&self) -> &[CreatureView<'w>] {
        self.all_monsters
            .get_or_compute(|| self.creatures(EntityCategory::Monster, |_, _| true))
    }

    pub fn corpses(&self) -> &[CreatureView<'w>] {
        self.corpses.get_or_compute(|| {
            self.creatures(EntityCategory::Monster, |w, id| !w.is_alive(id))
        })
    }

    pub fn all_players(&self) -> &[CreatureView<'w>] {
        self.all_players
            .get_or_compute(|| self.creatures(EntityCategory::Player, |_, _| true))
    }

    pub fn player_by_name(&self, name: &str) -> Option<&CreatureView<'w>> {
        self.all_players()
            .iter()
            .find(|p| p.entity().player_name() == name)
    }

    fn entity_views(&self, category: EntityCategory) -> Vec<EntityView<'w>> {
        self.world
            .entities(category)
            .into_iter()
            .map(|id| EntityView::new(self.world, id, self.player_position))
            .collect()
    }

    pub fn miscellaneous_objects(&self) -> &[EntityView<'w>] {
        self.miscellaneous
            .get_or_compute(|| self.entity_views(EntityCategory::MiscellaneousObject))
    }

    pub fn ingame_icons(&self) -> &[EntityView<'w>] {
        self.ingame_icons
            .get_or_compute(|| self.entity_views(EntityCategory::IngameIcon))
    }

    pub fn effects(&self) -> &[EntityView<'w>] {
        self.effects
            .get_or_compute(|| self.entity_views(EntityCategory::Effect))
    }

    pub fn distance_between(&self, a: &CreatureView<'_>, b: &CreatureView<'_>) -> f32 {
        a.distance_to(b)
    }

    // === GROUP MEMORY ===

    pub fn current_group(&self) -> GroupId {
        self.memory.current_group()
    }

    pub fn current_rule(&self) -> Option<RuleId> {
        self.current_rule
    }

    pub fn set_current_rule(&mut self, rule: Option<RuleId>) {
        self.current_rule = rule;
    }

    /// Read access to the current group's memory
    pub fn memory(&self) -> &GroupMemory {
        self.memory.current()
    }

    /// Write access to the current group's memory; denied after lock
    pub fn memory_mut(&mut self) -> Result<&mut GroupMemory> {
        if self.scratch.is_locked() {
            return Err(AgentError::AccessDenied);
        }
        Ok(self.memory.current_mut())
    }

    pub fn flag(&self, name: &str) -> bool {
        self.memory().flag(name)
    }

    pub fn number(&self, name: &str) -> f32 {
        self.memory().number(name)
    }

    /// Elapsed seconds, `None` when the timer was never started
    pub fn timer(&self, name: &str) -> Option<f32> {
        self.memory().timer(name, self.now)
    }

    /// Elapsed seconds, 0 when the timer was never started
    pub fn timer_value(&self, name: &str) -> f32 {
        self.timer(name).unwrap_or(0.0)
    }

    pub fn is_timer_running(&self, name: &str) -> bool {
        self.memory().is_timer_running(name)
    }

    pub fn seconds_since_last_activation(&self, rule: RuleId) -> f64 {
        self.memory().seconds_since_last_activation(rule, self.now)
    }

    /// True when the rule being evaluated has not fired for `min_seconds`
    pub fn since_last_activation(&self, min_seconds: f64) -> bool {
        let since = match self.current_rule {
            Some(rule) => self.seconds_since_last_activation(rule),
            None => f64::INFINITY,
        };
        since > min_seconds
    }

    pub fn record_activation(&mut self, rule: RuleId) -> Result<()> {
        let now = self.now;
        self.memory_mut()?.record_activation(rule, now);
        Ok(())
    }

    /// Switch the current group until the returned guard is dropped
    ///
    /// The previous group and rule are restored on every exit path,
    /// including early returns and unwinding.
    pub fn enter_group(&mut self, group: GroupId) -> GroupScope<'_, 'w> {
        let previous_group = self.memory.swap_group(group);
        let previous_rule = self.current_rule.take();
        GroupScope {
            snapshot: self,
            previous_group,
            previous_rule,
        }
    }

    // === SCRATCH LIFECYCLE ===

    pub fn is_locked(&self) -> bool {
        self.scratch.is_locked()
    }

    pub fn scratch(&self) -> Result<&ScratchState> {
        if self.scratch.is_locked() {
            return Err(AgentError::AccessDenied);
        }
        Ok(&self.scratch)
    }

    pub fn scratch_mut(&mut self) -> Result<&mut ScratchState> {
        if self.scratch.is_locked() {
            return Err(AgentError::AccessDenied);
        }
        Ok(&mut self.scratch)
    }

    /// End the open phase and hand the queued requests to the drainer
    pub fn lock(&mut self) -> Result<FrameRequests> {
        if self.scratch.is_locked() {
            return Err(AgentError::AccessDenied);
        }
        let requests = self.scratch.lock();
        tracing::debug!(
            displays = requests.display_count(),
            key = ?requests.key_to_press,
            cursor_tasks = requests.cursor_tasks.len(),
            "Snapshot locked"
        );
        Ok(requests)
    }

    // === DUMP ===

    pub fn summary(&self) -> SnapshotSummary {
        SnapshotSummary {
            area_name: self.area.name.clone(),
            is_in_town: self.area.is_town,
            is_in_hideout: self.area.is_hideout,
            vitals: self.vitals,
            ailments: self.ailments.iter().cloned().collect(),
            buffs: self.buffs.iter().map(|b| b.name.clone()).collect(),
            skills: {
                let mut names: Vec<String> = self.skills.iter().map(|s| s.name.clone()).collect();
                names.sort();
                names
            },
            nearby_monsters: self.total_monster_count(),
            memory: self.memory().summary(self.now),
        }
    }

    /// Pretty JSON of [`Self::summary`], for the debug dump
    pub fn dump(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.summary())?)
    }
}

/// Serializable digest of a snapshot
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotSummary {
    pub area_name: String,
    pub is_in_town: bool,
    pub is_in_hideout: bool,
    pub vitals: VitalsView,
    pub ailments: Vec<String>,
    pub buffs: Vec<String>,
    pub skills: Vec<String>,
    pub nearby_monsters: usize,
    pub memory: GroupMemorySummary,
}

/// Guard returned by [`StateSnapshot::enter_group`]
pub struct GroupScope<'s, 'w> {
    snapshot: &'s mut StateSnapshot<'w>,
    previous_group: GroupId,
    previous_rule: Option<RuleId>,
}

impl<'w> Deref for GroupScope<'_, 'w> {
    type Target = StateSnapshot<'w>;

    fn deref(&self) -> &Self::Target {
        self.snapshot
    }
}

impl<'w> DerefMut for GroupScope<'_, 'w> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.snapshot
    }
}

impl Drop for GroupScope<'_, '_> {
    fn drop(&mut self) {
        self.snapshot.memory.swap_group(self.previous_group);
        self.snapshot.current_rule = self.previous_rule;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{Buff, MemoryWorld, RawEntity, RawRarity};
    use std::time::Duration;

    fn world() -> MemoryWorld {
        let world = MemoryWorld::new(ScreenRect::new(0.0, 0.0, 800.0, 600.0));
        world.spawn_player(RawEntity::player("Hero", Vec3::ZERO));
        world
    }

    #[test]
    fn test_lazy_collections_are_frozen() {
        let world = world();
        world.insert(RawEntity::monster(Vec3::new(5.0, 0.0, 0.0), RawRarity::White));
        let config = AgentConfig::default();
        let mut memory = EphemeralMemory::new();
        let snapshot = StateSnapshot::new(&world, &config, &mut memory, Instant::now());

        let first = snapshot.all_monsters();
        world.insert(RawEntity::monster(Vec3::new(6.0, 0.0, 0.0), RawRarity::White));
        let second = snapshot.all_monsters();

        assert!(std::ptr::eq(first, second));
        assert_eq!(second.len(), 1);
        assert!(std::ptr::eq(snapshot.nearby(), snapshot.nearby()));
    }

    #[test]
    fn test_nearby_uses_origin_captured_at_construction() {
        let world = world();
        world.insert(RawEntity::monster(Vec3::new(10.0, 0.0, 0.0), RawRarity::White));
        let config = AgentConfig::default();
        let mut memory = EphemeralMemory::new();
        let snapshot = StateSnapshot::new(&world, &config, &mut memory, Instant::now());
        assert_eq!(snapshot.all_monsters()[0].distance(), 10.0);

        let player = world.player().unwrap();
        world.update(player, |p| p.position = Some(Vec3::new(100.0, 0.0, 0.0)));

        let distances: Vec<f32> = snapshot.monsters(u32::MAX, Rarity::ANY).map(|c| c.distance()).collect();
        assert_eq!(distances, vec![10.0]);
        assert_eq!(snapshot.closest_monster(20, Rarity::ANY).map(|c| c.distance()), Some(10.0));
    }

    #[test]
    fn test_corpses_and_all_monsters() {
        let world = world();
        world.insert(RawEntity::monster(Vec3::new(5.0, 0.0, 0.0), RawRarity::White));
        world.insert(RawEntity::monster(Vec3::new(7.0, 0.0, 0.0), RawRarity::White).dead());
        let config = AgentConfig::default();
        let mut memory = EphemeralMemory::new();
        let snapshot = StateSnapshot::new(&world, &config, &mut memory, Instant::now());

        assert_eq!(snapshot.all_monsters().len(), 2);
        assert_eq!(snapshot.corpses().len(), 1);
        assert_eq!(snapshot.total_monster_count(), 1);
    }

    #[test]
    fn test_ailments_from_config() {
        let world = MemoryWorld::new(ScreenRect::default());
        world.spawn_player(
            RawEntity::player("Hero", Vec3::ZERO).with_buff(Buff::new("corrupted_blood")),
        );
        let mut config = AgentConfig::default();
        config.ailments.insert(
            "bleeding".to_string(),
            vec!["bleeding".to_string(), "corrupted_blood".to_string()],
        );
        config.ailments.insert("frozen".to_string(), vec!["frozen".to_string()]);
        let mut memory = EphemeralMemory::new();
        let snapshot = StateSnapshot::new(&world, &config, &mut memory, Instant::now());

        assert!(snapshot.has_ailment("bleeding"));
        assert!(!snapshot.has_ailment("frozen"));
        assert!(snapshot.buffs().has("corrupted_blood"));
    }

    #[test]
    fn test_no_player_gives_safe_defaults() {
        let world = MemoryWorld::new(ScreenRect::default());
        world.insert(RawEntity::monster(Vec3::ZERO, RawRarity::White));
        let config = AgentConfig::default();
        let mut memory = EphemeralMemory::new();
        let snapshot = StateSnapshot::new(&world, &config, &mut memory, Instant::now());

        assert!(snapshot.player().is_none());
        assert!(snapshot.skills().is_empty());
        assert_eq!(snapshot.total_monster_count(), 0);
        assert!(snapshot.all_monsters().is_empty());
        assert_eq!(snapshot.vitals().hp.current, 0);
    }

    #[test]
    fn test_group_scope_restores_on_drop() {
        let world = world();
        let config = AgentConfig::default();
        let mut memory = EphemeralMemory::new();
        let mut snapshot = StateSnapshot::new(&world, &config, &mut memory, Instant::now());
        let outer = GroupId::new();
        let inner = GroupId::new();

        {
            let mut scope = snapshot.enter_group(outer);
            scope.memory_mut().unwrap().set_flag("x", true);
            {
                let mut nested = scope.enter_group(inner);
                assert_eq!(nested.current_group(), inner);
                assert!(!nested.flag("x"));
                nested.memory_mut().unwrap().set_number("n", 2.0);
            }
            assert_eq!(scope.current_group(), outer);
            assert!(scope.flag("x"));
            assert_eq!(scope.number("n"), 0.0);
        }
        assert_eq!(snapshot.current_group(), GroupId::ROOT);
    }

    #[test]
    fn test_group_scope_restores_on_error_path() {
        fn failing(snapshot: &mut StateSnapshot<'_>, group: GroupId) -> Result<()> {
            let mut scope = snapshot.enter_group(group);
            scope.lock()?;
            scope.memory_mut()?.set_flag("never", true);
            Ok(())
        }

        let world = world();
        let config = AgentConfig::default();
        let mut memory = EphemeralMemory::new();
        let mut snapshot = StateSnapshot::new(&world, &config, &mut memory, Instant::now());

        assert!(matches!(failing(&mut snapshot, GroupId::new()), Err(AgentError::AccessDenied)));
        assert_eq!(snapshot.current_group(), GroupId::ROOT);
    }

    #[test]
    fn test_access_denied_after_lock() {
        let world = world();
        let config = AgentConfig::default();
        let mut memory = EphemeralMemory::new();
        let mut snapshot = StateSnapshot::new(&world, &config, &mut memory, Instant::now());

        assert!(snapshot.scratch_mut().is_ok());
        snapshot.lock().unwrap();

        assert!(matches!(snapshot.scratch(), Err(AgentError::AccessDenied)));
        assert!(matches!(snapshot.scratch_mut(), Err(AgentError::AccessDenied)));
        assert!(matches!(snapshot.memory_mut(), Err(AgentError::AccessDenied)));
        assert!(matches!(snapshot.lock(), Err(AgentError::AccessDenied)));
        // Reads stay available to late conditions
        assert!(!snapshot.flag("x"));
    }

    #[test]
    fn test_since_last_activation_uses_current_rule() {
        let world = world();
        let config = AgentConfig::default();
        let mut memory = EphemeralMemory::new();
        let t0 = Instant::now();
        let rule = RuleId::new();
        let group = GroupId::new();

        {
            let mut snapshot = StateSnapshot::new(&world, &config, &mut memory, t0);
            let mut scope = snapshot.enter_group(group);
            scope.set_current_rule(Some(rule));
            assert!(scope.since_last_activation(1000.0));
            scope.record_activation(rule).unwrap();
        }

        let mut snapshot =
            StateSnapshot::new(&world, &config, &mut memory, t0 + Duration::from_secs(2));
        let mut scope = snapshot.enter_group(group);
        scope.set_current_rule(Some(rule));
        assert!(scope.since_last_activation(1.5));
        assert!(!scope.since_last_activation(2.5));
    }

    #[test]
    fn test_dump_is_json() {
        let world = world();
        let config = AgentConfig::default();
        let mut memory = EphemeralMemory::new();
        let snapshot = StateSnapshot::new(&world, &config, &mut memory, Instant::now());

        let dump = snapshot.dump().unwrap();
        let value: serde_json::Value = serde_json::from_str(&dump).unwrap();
        assert_eq!(value["nearby_monsters"], 0);
    }
}
