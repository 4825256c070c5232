//! Read-only projections over raw world objects
//!
//! Views own no world data. They hold the entity id plus a reference to the
//! world reader and derive facts on demand, caching each derived value so a
//! view answers the same way for its whole lifetime.

use crate::core::memo::Memo;
use crate::core::types::{EntityId, Vec2, Vec3};
use crate::state::skills::SkillSet;
use crate::world::{
    grid_distance, Actor, Buff, Component, Life, Pool, RawRarity, Targetable, WorldReader,
    STAT_CANNOT_BE_DAMAGED,
};
use ahash::AHashMap;
use derive_more::{BitAnd, BitOr};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Rarity bitmask so queries can ask for any subset of rarities
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, BitAnd, BitOr, Serialize, Deserialize,
)]
pub struct Rarity(u8);

impl Rarity {
    pub const NONE: Self = Self(0);
    pub const NORMAL: Self = Self(1);
    pub const MAGIC: Self = Self(1 << 1);
    pub const RARE: Self = Self(1 << 2);
    pub const UNIQUE: Self = Self(1 << 3);
    pub const ANY: Self = Self(0b1111);

    pub fn bits(self) -> u8 {
        self.0
    }

    /// Build a mask from raw bits, dropping bits outside `ANY`
    pub fn from_bits_truncate(bits: u8) -> Self {
        Self(bits & Self::ANY.0)
    }

    pub fn intersects(self, other: Self) -> bool {
        (self & other).0 != 0
    }
}

impl From<RawRarity> for Rarity {
    fn from(raw: RawRarity) -> Self {
        match raw {
            RawRarity::White => Self::NORMAL,
            RawRarity::Magic => Self::MAGIC,
            RawRarity::Rare => Self::RARE,
            RawRarity::Unique => Self::UNIQUE,
        }
    }
}

/// Current/max view of one pool
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PoolView {
    pub current: i32,
    pub max: i32,
    pub reserved: i32,
}

impl PoolView {
    /// Current as a percentage of unreserved maximum, 0 for empty pools
    pub fn percent(&self) -> f32 {
        let available = self.max - self.reserved;
        if available <= 0 {
            return 0.0;
        }
        self.current as f32 * 100.0 / available as f32
    }
}

impl From<Pool> for PoolView {
    fn from(pool: Pool) -> Self {
        Self {
            current: pool.current,
            max: pool.maximum,
            reserved: pool.reserved,
        }
    }
}

/// Life, mana and energy shield, captured when the view is created
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct VitalsView {
    pub hp: PoolView,
    pub mana: PoolView,
    pub es: PoolView,
}

impl VitalsView {
    pub fn from_life(life: Option<Life>) -> Self {
        match life {
            Some(life) => Self {
                hp: life.hp.into(),
                mana: life.mana.into(),
                es: life.energy_shield.into(),
            },
            None => Self::default(),
        }
    }
}

/// Buffs present on an entity
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuffSet {
    buffs: Vec<Buff>,
}

impl BuffSet {
    pub fn new(buffs: Vec<Buff>) -> Self {
        Self { buffs }
    }

    pub fn has(&self, name: &str) -> bool {
        self.buffs.iter().any(|b| b.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&Buff> {
        self.buffs.iter().find(|b| b.name == name)
    }

    /// Seconds left on a buff, 0 when absent
    pub fn time_left(&self, name: &str) -> f32 {
        self.get(name).map(|b| b.time_left).unwrap_or(0.0)
    }

    pub fn charges(&self, name: &str) -> i32 {
        self.get(name).map(|b| b.charges).unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Buff> {
        self.buffs.iter()
    }

    pub fn len(&self) -> usize {
        self.buffs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffs.is_empty()
    }
}

/// Projection of any world object
pub struct EntityView<'w> {
    world: &'w dyn WorldReader,
    id: EntityId,
    /// Player position at snapshot time; distances are measured from here
    origin: Option<Vec3>,
    path: Memo<String>,
    metadata: Memo<String>,
    base_entity_path: Memo<Option<String>>,
    /// `None` for entities without a position component
    placement: Memo<Option<Vec3>>,
    distance: Memo<f32>,
    distance_to_cursor: Memo<f32>,
    scale: Memo<f32>,
    stats: Memo<AHashMap<String, i32>>,
    is_alive: Memo<bool>,
    targetable: Memo<Targetable>,
    is_using_ability: Memo<bool>,
    player_name: Memo<String>,
    screen_pos: Memo<Vec2>,
}

impl<'w> EntityView<'w> {
    pub fn new(world: &'w dyn WorldReader, id: EntityId, origin: Option<Vec3>) -> Self {
        Self {
            world,
            id,
            origin,
            path: Memo::new(),
            metadata: Memo::new(),
            base_entity_path: Memo::new(),
            placement: Memo::new(),
            distance: Memo::new(),
            distance_to_cursor: Memo::new(),
            scale: Memo::new(),
            stats: Memo::new(),
            is_alive: Memo::new(),
            targetable: Memo::new(),
            is_using_ability: Memo::new(),
            player_name: Memo::new(),
            screen_pos: Memo::new(),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn path(&self) -> &str {
        self.path.get_or_compute(|| self.world.path(self.id))
    }

    pub fn metadata(&self) -> &str {
        self.metadata.get_or_compute(|| self.world.metadata(self.id))
    }

    pub fn base_entity_path(&self) -> Option<&str> {
        self.base_entity_path
            .get_or_compute(|| self.world.base_entity_path(self.id))
            .as_deref()
    }

    fn placement(&self) -> Option<Vec3> {
        *self.placement.get_or_compute(|| self.world.position(self.id))
    }

    /// World position, origin when the entity is not positioned
    pub fn position(&self) -> Vec3 {
        self.placement().unwrap_or(Vec3::ZERO)
    }

    pub fn position_2d(&self) -> Vec2 {
        self.position().truncate()
    }

    /// Ground-plane distance to the player, infinite if either is unplaced
    pub fn distance(&self) -> f32 {
        *self.distance.get_or_compute(|| match (self.origin, self.placement()) {
            (Some(origin), Some(pos)) => grid_distance(origin, pos),
            _ => f32::INFINITY,
        })
    }

    /// Ground-plane distance to the point under the cursor
    pub fn distance_to_cursor(&self) -> f32 {
        *self.distance_to_cursor.get_or_compute(|| {
            match (self.world.cursor_world_position(), self.placement()) {
                (Some(cursor), Some(pos)) => grid_distance(cursor, pos),
                _ => f32::INFINITY,
            }
        })
    }

    pub fn scale(&self) -> f32 {
        *self
            .scale
            .get_or_compute(|| self.world.scale(self.id).unwrap_or(0.0))
    }

    pub fn stats(&self) -> &AHashMap<String, i32> {
        self.stats
            .get_or_compute(|| self.world.stats(self.id).unwrap_or_default())
    }

    pub fn stat(&self, name: &str) -> i32 {
        self.stats().get(name).copied().unwrap_or(0)
    }

    pub fn is_alive(&self) -> bool {
        *self.is_alive.get_or_compute(|| self.world.is_alive(self.id))
    }

    fn targetable(&self) -> Targetable {
        *self
            .targetable
            .get_or_compute(|| self.world.targetable(self.id).unwrap_or_default())
    }

    pub fn is_targeted(&self) -> bool {
        self.targetable().is_targeted
    }

    pub fn is_targetable(&self) -> bool {
        self.targetable().is_targetable
    }

    pub fn is_using_ability(&self) -> bool {
        *self.is_using_ability.get_or_compute(|| {
            self.world
                .actor(self.id)
                .map(|a| a.is_using_ability)
                .unwrap_or(false)
        })
    }

    pub fn player_name(&self) -> &str {
        self.player_name
            .get_or_compute(|| self.world.player_name(self.id).unwrap_or_default())
    }

    pub fn screen_pos(&self) -> Vec2 {
        *self
            .screen_pos
            .get_or_compute(|| self.world.world_to_screen(self.position()))
    }

    /// Screen position nudged by a random offset in `[min_offset, max_offset)`
    pub fn randomized_screen_pos<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        min_offset: i32,
        max_offset: i32,
    ) -> Vec2 {
        let (dx, dy) = if min_offset < max_offset {
            (
                rng.gen_range(min_offset..max_offset),
                rng.gen_range(min_offset..max_offset),
            )
        } else {
            (0, 0)
        };
        self.screen_pos() + Vec2::new(dx as f32, dy as f32)
    }
}

impl std::fmt::Debug for EntityView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityView")
            .field("id", &self.id)
            .field("position", &self.placement.get())
            .finish()
    }
}

/// Projection of a monster or player
pub struct CreatureView<'w> {
    entity: EntityView<'w>,
    vitals: VitalsView,
    skills: SkillSet<'w>,
    actor: Memo<Option<Actor>>,
    rarity: Memo<Rarity>,
    invincible: Memo<bool>,
    buffs: Memo<BuffSet>,
    components: Memo<Vec<Component>>,
}

impl<'w> CreatureView<'w> {
    pub fn new(world: &'w dyn WorldReader, id: EntityId, origin: Option<Vec3>) -> Self {
        Self {
            entity: EntityView::new(world, id, origin),
            vitals: VitalsView::from_life(world.life(id)),
            skills: SkillSet::new(world, id, origin),
            actor: Memo::new(),
            rarity: Memo::new(),
            invincible: Memo::new(),
            buffs: Memo::new(),
            components: Memo::new(),
        }
    }

    pub fn entity(&self) -> &EntityView<'w> {
        &self.entity
    }

    pub fn id(&self) -> EntityId {
        self.entity.id()
    }

    pub fn position(&self) -> Vec3 {
        self.entity.position()
    }

    pub fn distance(&self) -> f32 {
        self.entity.distance()
    }

    pub fn is_alive(&self) -> bool {
        self.entity.is_alive()
    }

    pub fn vitals(&self) -> &VitalsView {
        &self.vitals
    }

    pub fn skills(&self) -> &SkillSet<'w> {
        &self.skills
    }

    fn actor(&self) -> Option<&Actor> {
        self.actor
            .get_or_compute(|| self.entity.world.actor(self.entity.id))
            .as_ref()
    }

    pub fn is_moving(&self) -> bool {
        self.actor().map(|a| a.is_moving).unwrap_or(false)
    }

    pub fn animation_id(&self) -> i32 {
        self.actor().map(|a| a.animation_id).unwrap_or(0)
    }

    /// Rarity bit; objects without magic properties count as normal
    pub fn rarity(&self) -> Rarity {
        *self.rarity.get_or_compute(|| {
            self.entity
                .world
                .rarity(self.entity.id)
                .map(Rarity::from)
                .unwrap_or(Rarity::NORMAL)
        })
    }

    pub fn is_invincible(&self) -> bool {
        *self
            .invincible
            .get_or_compute(|| self.entity.stat(STAT_CANNOT_BE_DAMAGED) != 0)
    }

    pub fn buffs(&self) -> &BuffSet {
        self.buffs.get_or_compute(|| {
            BuffSet::new(self.entity.world.buffs(self.entity.id).unwrap_or_default())
        })
    }

    /// Capability check against the component set read on first use
    pub fn has_component(&self, component: Component) -> bool {
        self.components
            .get_or_compute(|| {
                Component::ALL
                    .into_iter()
                    .filter(|c| self.entity.world.has_component(self.entity.id, *c))
                    .collect()
            })
            .contains(&component)
    }

    /// Straight-line 3-D distance between two creatures
    pub fn distance_to(&self, other: &CreatureView<'_>) -> f32 {
        self.position().distance(other.position())
    }
}

impl std::fmt::Debug for CreatureView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreatureView")
            .field("id", &self.id())
            .field("rarity", &self.rarity.get())
            .field("vitals", &self.vitals)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ScreenRect;
    use crate::world::{MemoryWorld, RawEntity};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn world() -> MemoryWorld {
        let world = MemoryWorld::new(ScreenRect::new(0.0, 0.0, 800.0, 600.0));
        world.spawn_player(RawEntity::player("Hero", Vec3::ZERO));
        world
    }

    #[test]
    fn test_rarity_mask_ops() {
        let mask = Rarity::RARE | Rarity::UNIQUE;
        assert!(mask.intersects(Rarity::RARE));
        assert!(!mask.intersects(Rarity::NORMAL));
        assert_eq!(mask & Rarity::UNIQUE, Rarity::UNIQUE);
        assert_eq!(Rarity::from_bits_truncate(0xff), Rarity::ANY);
    }

    #[test]
    fn test_distance_cached_after_first_read() {
        let world = world();
        let id = world.insert(RawEntity::monster(Vec3::new(3.0, 4.0, 9.0), RawRarity::White));
        let view = EntityView::new(&world, id, Some(Vec3::ZERO));

        assert_eq!(view.distance(), 5.0);
        world.update(id, |e| e.position = Some(Vec3::new(30.0, 40.0, 0.0)));
        assert_eq!(view.distance(), 5.0);

        let fresh = EntityView::new(&world, id, Some(Vec3::ZERO));
        assert_eq!(fresh.distance(), 50.0);
    }

    #[test]
    fn test_distance_agrees_with_position() {
        let world = world();
        let id = world.insert(RawEntity::monster(Vec3::new(3.0, 4.0, 0.0), RawRarity::White));
        let view = EntityView::new(&world, id, Some(Vec3::ZERO));

        assert_eq!(view.position(), Vec3::new(3.0, 4.0, 0.0));
        world.update(id, |e| e.position = Some(Vec3::new(30.0, 40.0, 0.0)));
        assert_eq!(view.distance(), 5.0);
        assert_eq!(view.screen_pos(), Vec2::new(403.0, 304.0));
    }

    #[test]
    fn test_derived_flags_read_once() {
        let world = world();
        let id = world.insert(RawEntity {
            metadata: "Metadata/Monsters/Zombie".to_string(),
            targetable: Some(Targetable { is_targetable: true, is_targeted: false }),
            ..RawEntity::monster(Vec3::new(1.0, 0.0, 0.0), RawRarity::White)
                .with_actor(Actor { is_using_ability: false, ..Actor::default() })
        });
        let creature = CreatureView::new(&world, id, Some(Vec3::ZERO));

        assert!(creature.entity().is_targetable());
        assert!(!creature.entity().is_targeted());
        assert!(!creature.entity().is_using_ability());
        assert_eq!(creature.entity().metadata(), "Metadata/Monsters/Zombie");
        assert!(creature.has_component(Component::Targetable));

        world.update(id, |e| {
            e.metadata = "changed".to_string();
            e.targetable = None;
            e.actor = Some(Actor { is_using_ability: true, ..Actor::default() });
        });

        assert!(creature.entity().is_targetable());
        assert!(!creature.entity().is_using_ability());
        assert_eq!(creature.entity().metadata(), "Metadata/Monsters/Zombie");
        assert!(creature.has_component(Component::Targetable));
    }

    #[test]
    fn test_distance_to_cursor() {
        let world = world();
        let id = world.insert(RawEntity::monster(Vec3::new(6.0, 8.0, 0.0), RawRarity::White));
        let view = EntityView::new(&world, id, Some(Vec3::ZERO));
        assert_eq!(view.distance_to_cursor(), f32::INFINITY);

        world.set_cursor_world_position(Some(Vec3::ZERO));
        let view = EntityView::new(&world, id, Some(Vec3::ZERO));
        assert_eq!(view.distance_to_cursor(), 10.0);

        world.set_cursor_world_position(Some(Vec3::new(6.0, 0.0, 0.0)));
        assert_eq!(view.distance_to_cursor(), 10.0);
    }

    #[test]
    fn test_missing_components_yield_defaults() {
        let world = world();
        let id = world.insert(RawEntity::new(crate::core::types::EntityCategory::Effect));
        let creature = CreatureView::new(&world, id, Some(Vec3::ZERO));

        assert_eq!(creature.entity().scale(), 0.0);
        assert_eq!(creature.entity().player_name(), "");
        assert!(creature.skills().is_empty());
        assert!(creature.buffs().is_empty());
        assert_eq!(creature.rarity(), Rarity::NORMAL);
        assert_eq!(creature.distance(), f32::INFINITY);
        assert!(!creature.is_invincible());
    }

    #[test]
    fn test_invincible_from_stat() {
        let world = world();
        let id = world.insert(
            RawEntity::monster(Vec3::ZERO, RawRarity::Unique).with_stat(STAT_CANNOT_BE_DAMAGED, 1),
        );
        let creature = CreatureView::new(&world, id, Some(Vec3::ZERO));
        assert!(creature.is_invincible());
        assert_eq!(creature.rarity(), Rarity::UNIQUE);
    }

    #[test]
    fn test_vitals_percent() {
        let life = Life {
            hp: Pool { current: 50, maximum: 200, reserved: 100 },
            ..Life::default()
        };
        let vitals = VitalsView::from_life(Some(life));
        assert_eq!(vitals.hp.percent(), 50.0);
        assert_eq!(vitals.mana.percent(), 0.0);
    }

    #[test]
    fn test_randomized_screen_pos_within_offsets() {
        let world = world();
        let id = world.insert(RawEntity::monster(Vec3::new(10.0, 0.0, 0.0), RawRarity::White));
        let view = EntityView::new(&world, id, Some(Vec3::ZERO));
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let base = view.screen_pos();
        for _ in 0..50 {
            let p = view.randomized_screen_pos(&mut rng, -5, 5);
            assert!((p.x - base.x) >= -5.0 && (p.x - base.x) < 5.0);
            assert!((p.y - base.y) >= -5.0 && (p.y - base.y) < 5.0);
        }
    }
}
