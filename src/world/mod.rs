//! Host world access
//!
//! The host process owns the live game memory. The rule engine only sees it
//! through [`WorldReader`], queried while a snapshot is being built and while
//! its lazy views are first touched. A missing component is never an error:
//! it means the feature is not present on that object.

pub mod memory;

use crate::core::types::{EntityCategory, EntityId, KeyCode, ScreenRect, Vec2, Vec3};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

pub use memory::{MemoryWorld, RawEntity};

/// Stat key for the "cannot be damaged" flag used by invincibility checks
pub const STAT_CANNOT_BE_DAMAGED: &str = "cannot_be_damaged";

/// Buff name the host attaches to monsters that are not yet revealed
pub const HIDDEN_MONSTER_BUFF: &str = "hidden_monster";

/// Capability tags an entity may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Component {
    Monster,
    Player,
    Positioned,
    Render,
    Life,
    Buffs,
    Actor,
    ObjectMagicProperties,
    Targetable,
    Animated,
}

impl Component {
    pub const ALL: [Component; 10] = [
        Component::Monster,
        Component::Player,
        Component::Positioned,
        Component::Render,
        Component::Life,
        Component::Buffs,
        Component::Actor,
        Component::ObjectMagicProperties,
        Component::Targetable,
        Component::Animated,
    ];
}

/// Raw rarity as reported by the object's magic properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RawRarity {
    White,
    Magic,
    Rare,
    Unique,
}

/// One resource pool (life, mana or energy shield)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pool {
    pub current: i32,
    pub maximum: i32,
    pub reserved: i32,
}

impl Pool {
    pub fn new(current: i32, maximum: i32) -> Self {
        Self { current, maximum, reserved: 0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Life {
    pub hp: Pool,
    pub mana: Pool,
    pub energy_shield: Pool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Buff {
    pub name: String,
    /// Seconds left, `f32::INFINITY` for permanent buffs
    pub time_left: f32,
    pub charges: i32,
}

impl Buff {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            time_left: f32::INFINITY,
            charges: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ActorSkill {
    pub id: u16,
    pub id2: u16,
    pub name: String,
    pub can_be_used: bool,
    pub can_be_used_with_weapon: bool,
    pub mana_cost: i32,
    pub life_cost: i32,
    pub es_cost: i32,
    pub is_using: bool,
    pub use_stage: i32,
    pub max_uses: Option<i32>,
    pub cooldown: f32,
    pub remaining_uses: i32,
    pub cooldowns_remaining: Vec<f32>,
    pub deployed_objects: Vec<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Actor {
    pub is_moving: bool,
    pub is_using_ability: bool,
    pub animation: i32,
    pub animation_id: i32,
    pub animation_stage: i32,
    pub skills: Vec<ActorSkill>,
    pub current_action: Option<ActorSkill>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Targetable {
    pub is_targetable: bool,
    pub is_targeted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AreaInfo {
    pub name: String,
    pub is_hideout: bool,
    pub is_town: bool,
    pub is_peaceful: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PanelVisibility {
    pub chat: bool,
    pub left: bool,
    pub right: bool,
    pub fullscreen: bool,
    pub large: bool,
}

/// Read access to the host's live world
pub trait WorldReader {
    fn player(&self) -> Option<EntityId>;
    fn area(&self) -> AreaInfo;
    fn panels(&self) -> PanelVisibility;

    /// Valid entity ids in one coarse category
    fn entities(&self, category: EntityCategory) -> Vec<EntityId>;

    fn has_component(&self, id: EntityId, component: Component) -> bool;

    fn path(&self, id: EntityId) -> String;
    fn metadata(&self, id: EntityId) -> String;
    /// Path of the animated base object, if the entity is animated
    fn base_entity_path(&self, id: EntityId) -> Option<String>;

    fn position(&self, id: EntityId) -> Option<Vec3>;
    fn scale(&self, id: EntityId) -> Option<f32>;
    fn life(&self, id: EntityId) -> Option<Life>;
    fn buffs(&self, id: EntityId) -> Option<Vec<Buff>>;
    fn actor(&self, id: EntityId) -> Option<Actor>;
    fn rarity(&self, id: EntityId) -> Option<RawRarity>;
    fn stats(&self, id: EntityId) -> Option<AHashMap<String, i32>>;
    fn targetable(&self, id: EntityId) -> Option<Targetable>;
    fn player_name(&self, id: EntityId) -> Option<String>;
    fn is_alive(&self, id: EntityId) -> bool;
    fn is_hostile(&self, id: EntityId) -> bool;

    fn world_to_screen(&self, position: Vec3) -> Vec2;
    /// Ground point under the cursor, if the host can project it
    fn cursor_world_position(&self) -> Option<Vec3>;
    fn window_rect(&self) -> ScreenRect;
    fn is_key_down(&self, key: KeyCode) -> bool;
}

/// Distance on the ground plane, the measure every range query uses
pub fn grid_distance(a: Vec3, b: Vec3) -> f32 {
    a.truncate().distance(b.truncate())
}
