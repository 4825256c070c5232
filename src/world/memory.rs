//! In-memory world for the demo driver and tests
//!
//! Entities live behind a `RefCell` so the world can change while a snapshot
//! built over it is still alive, the same way the live game does.

use super::{
    Actor, AreaInfo, Buff, Component, Life, PanelVisibility, RawRarity, Targetable, WorldReader,
};
use crate::core::types::{EntityCategory, EntityId, KeyCode, ScreenRect, Vec2, Vec3};
use ahash::{AHashMap, AHashSet};
use std::cell::{Cell, RefCell};

/// Plain component bag for one entity
#[derive(Debug, Clone)]
pub struct RawEntity {
    pub category: EntityCategory,
    pub path: String,
    pub metadata: String,
    pub base_entity_path: Option<String>,
    pub position: Option<Vec3>,
    pub scale: f32,
    pub renderable: bool,
    pub is_monster: bool,
    pub alive: bool,
    pub hostile: bool,
    pub life: Option<Life>,
    pub buffs: Option<Vec<Buff>>,
    pub actor: Option<Actor>,
    pub rarity: Option<RawRarity>,
    pub stats: Option<AHashMap<String, i32>>,
    pub targetable: Option<Targetable>,
    pub player_name: Option<String>,
}

impl RawEntity {
    pub fn new(category: EntityCategory) -> Self {
        Self {
            category,
            path: String::new(),
            metadata: String::new(),
            base_entity_path: None,
            position: None,
            scale: 1.0,
            renderable: false,
            is_monster: false,
            alive: true,
            hostile: false,
            life: None,
            buffs: None,
            actor: None,
            rarity: None,
            stats: None,
            targetable: None,
            player_name: None,
        }
    }

    /// Fully formed monster that passes every validity check
    pub fn monster(position: Vec3, rarity: RawRarity) -> Self {
        Self {
            path: "Metadata/Monsters/Generic".to_string(),
            position: Some(position),
            renderable: true,
            is_monster: true,
            hostile: true,
            life: Some(Life::default()),
            buffs: Some(Vec::new()),
            rarity: Some(rarity),
            ..Self::new(EntityCategory::Monster)
        }
    }

    /// Player character with render, life and actor components
    pub fn player(name: &str, position: Vec3) -> Self {
        Self {
            path: "Metadata/Characters/Player".to_string(),
            position: Some(position),
            renderable: true,
            is_monster: true,
            life: Some(Life::default()),
            buffs: Some(Vec::new()),
            actor: Some(Actor::default()),
            rarity: Some(RawRarity::White),
            player_name: Some(name.to_string()),
            ..Self::new(EntityCategory::Player)
        }
    }

    pub fn with_life(mut self, life: Life) -> Self {
        self.life = Some(life);
        self
    }

    pub fn with_buff(mut self, buff: Buff) -> Self {
        self.buffs.get_or_insert_with(Vec::new).push(buff);
        self
    }

    pub fn with_actor(mut self, actor: Actor) -> Self {
        self.actor = Some(actor);
        self
    }

    pub fn with_stat(mut self, name: &str, value: i32) -> Self {
        self.stats
            .get_or_insert_with(AHashMap::new)
            .insert(name.to_string(), value);
        self
    }

    pub fn friendly(mut self) -> Self {
        self.hostile = false;
        self
    }

    pub fn dead(mut self) -> Self {
        self.alive = false;
        self
    }
}

/// Host world held entirely in memory
#[derive(Debug)]
pub struct MemoryWorld {
    entities: RefCell<AHashMap<EntityId, RawEntity>>,
    next_id: Cell<u64>,
    player: Cell<Option<EntityId>>,
    area: RefCell<AreaInfo>,
    panels: Cell<PanelVisibility>,
    keys_down: RefCell<AHashSet<KeyCode>>,
    window: Cell<ScreenRect>,
    /// Screen pixels per grid unit
    camera_scale: Cell<f32>,
    cursor_world: Cell<Option<Vec3>>,
}

impl MemoryWorld {
    pub fn new(window: ScreenRect) -> Self {
        Self {
            entities: RefCell::new(AHashMap::new()),
            next_id: Cell::new(1),
            player: Cell::new(None),
            area: RefCell::new(AreaInfo::default()),
            panels: Cell::new(PanelVisibility::default()),
            keys_down: RefCell::new(AHashSet::new()),
            window: Cell::new(window),
            camera_scale: Cell::new(1.0),
            cursor_world: Cell::new(None),
        }
    }

    pub fn insert(&self, entity: RawEntity) -> EntityId {
        let id = EntityId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.entities.borrow_mut().insert(id, entity);
        id
    }

    pub fn spawn_player(&self, entity: RawEntity) -> EntityId {
        let id = self.insert(entity);
        self.player.set(Some(id));
        id
    }

    pub fn remove(&self, id: EntityId) -> Option<RawEntity> {
        self.entities.borrow_mut().remove(&id)
    }

    /// Mutate an entity in place; returns false when it does not exist
    pub fn update(&self, id: EntityId, f: impl FnOnce(&mut RawEntity)) -> bool {
        match self.entities.borrow_mut().get_mut(&id) {
            Some(entity) => {
                f(entity);
                true
            }
            None => false,
        }
    }

    pub fn set_area(&self, area: AreaInfo) {
        *self.area.borrow_mut() = area;
    }

    pub fn set_panels(&self, panels: PanelVisibility) {
        self.panels.set(panels);
    }

    pub fn set_key_down(&self, key: KeyCode, down: bool) {
        let mut keys = self.keys_down.borrow_mut();
        if down {
            keys.insert(key);
        } else {
            keys.remove(&key);
        }
    }

    pub fn set_camera_scale(&self, scale: f32) {
        self.camera_scale.set(scale);
    }

    /// Ground point the host reports under the cursor
    pub fn set_cursor_world_position(&self, position: Option<Vec3>) {
        self.cursor_world.set(position);
    }

    fn with_entity<T>(&self, id: EntityId, f: impl FnOnce(&RawEntity) -> T) -> Option<T> {
        self.entities.borrow().get(&id).map(f)
    }
}

impl WorldReader for MemoryWorld {
    fn player(&self) -> Option<EntityId> {
        self.player.get()
    }

    fn area(&self) -> AreaInfo {
        self.area.borrow().clone()
    }

    fn panels(&self) -> PanelVisibility {
        self.panels.get()
    }

    fn entities(&self, category: EntityCategory) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self
            .entities
            .borrow()
            .iter()
            .filter(|(_, e)| e.category == category)
            .map(|(id, _)| *id)
            .collect();
        // Host lists are stable between ticks
        ids.sort();
        ids
    }

    fn has_component(&self, id: EntityId, component: Component) -> bool {
        self.with_entity(id, |e| match component {
            Component::Monster => e.is_monster,
            Component::Player => e.player_name.is_some(),
            Component::Positioned => e.position.is_some(),
            Component::Render => e.renderable,
            Component::Life => e.life.is_some(),
            Component::Buffs => e.buffs.is_some(),
            Component::Actor => e.actor.is_some(),
            Component::ObjectMagicProperties => e.rarity.is_some(),
            Component::Targetable => e.targetable.is_some(),
            Component::Animated => e.base_entity_path.is_some(),
        })
        .unwrap_or(false)
    }

    fn path(&self, id: EntityId) -> String {
        self.with_entity(id, |e| e.path.clone()).unwrap_or_default()
    }

    fn metadata(&self, id: EntityId) -> String {
        self.with_entity(id, |e| e.metadata.clone()).unwrap_or_default()
    }

    fn base_entity_path(&self, id: EntityId) -> Option<String> {
        self.with_entity(id, |e| e.base_entity_path.clone()).flatten()
    }

    fn position(&self, id: EntityId) -> Option<Vec3> {
        self.with_entity(id, |e| e.position).flatten()
    }

    fn scale(&self, id: EntityId) -> Option<f32> {
        self.with_entity(id, |e| e.position.map(|_| e.scale)).flatten()
    }

    fn life(&self, id: EntityId) -> Option<Life> {
        self.with_entity(id, |e| e.life).flatten()
    }

    fn buffs(&self, id: EntityId) -> Option<Vec<Buff>> {
        self.with_entity(id, |e| e.buffs.clone()).flatten()
    }

    fn actor(&self, id: EntityId) -> Option<Actor> {
        self.with_entity(id, |e| e.actor.clone()).flatten()
    }

    fn rarity(&self, id: EntityId) -> Option<RawRarity> {
        self.with_entity(id, |e| e.rarity).flatten()
    }

    fn stats(&self, id: EntityId) -> Option<AHashMap<String, i32>> {
        self.with_entity(id, |e| e.stats.clone()).flatten()
    }

    fn targetable(&self, id: EntityId) -> Option<Targetable> {
        self.with_entity(id, |e| e.targetable).flatten()
    }

    fn player_name(&self, id: EntityId) -> Option<String> {
        self.with_entity(id, |e| e.player_name.clone()).flatten()
    }

    fn is_alive(&self, id: EntityId) -> bool {
        self.with_entity(id, |e| e.alive).unwrap_or(false)
    }

    fn is_hostile(&self, id: EntityId) -> bool {
        self.with_entity(id, |e| e.hostile).unwrap_or(false)
    }

    /// Top-down camera centred on the player
    fn world_to_screen(&self, position: Vec3) -> Vec2 {
        let origin = self
            .player
            .get()
            .and_then(|id| self.position(id))
            .unwrap_or(Vec3::ZERO);
        let offset = (position - origin).truncate() * self.camera_scale.get();
        self.window.get().center() + offset
    }

    fn cursor_world_position(&self) -> Option<Vec3> {
        self.cursor_world.get()
    }

    fn window_rect(&self) -> ScreenRect {
        self.window.get()
    }

    fn is_key_down(&self, key: KeyCode) -> bool {
        self.keys_down.borrow().contains(&key)
    }
}
