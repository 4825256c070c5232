//! Distance-bucketed index over creatures near the player
//!
//! Hostile creatures are bucketed by the ceiling of their distance so a range
//! query walks buckets in ascending order and stops at the first key past the
//! range. Friendly creatures are kept in a flat list.

use crate::core::types::{EntityCategory, EntityId, Vec3};
use crate::state::entity::{CreatureView, Rarity};
use crate::world::{grid_distance, Component, WorldReader, HIDDEN_MONSTER_BUFF};
use std::collections::BTreeMap;

/// Whether a creature takes part in monster queries at all
///
/// Requires the creature, position, render, life and magic-properties
/// components plus a buff list without the hidden marker. `check_alive`
/// additionally rejects dead creatures.
pub fn is_valid_creature(
    world: &dyn WorldReader,
    id: EntityId,
    origin: Vec3,
    max_range: u32,
    check_alive: bool,
) -> bool {
    let Some(position) = world.position(id) else {
        return false;
    };
    if grid_distance(origin, position) > max_range as f32 {
        return false;
    }
    let has_components = [
        Component::Monster,
        Component::Positioned,
        Component::Render,
        Component::Life,
        Component::ObjectMagicProperties,
    ]
    .into_iter()
    .all(|c| world.has_component(id, c));
    if !has_components {
        return false;
    }
    let Some(buffs) = world.buffs(id) else {
        return false;
    };
    if buffs.iter().any(|b| b.name == HIDDEN_MONSTER_BUFF) {
        return false;
    }
    !check_alive || world.is_alive(id)
}

/// Position the index measures from: the player's, if it is rendered
///
/// A player without a render component has not spawned yet.
pub fn player_origin(world: &dyn WorldReader) -> Option<Vec3> {
    let player = world.player()?;
    if !world.has_component(player, Component::Render) {
        return None;
    }
    world.position(player)
}

/// Bucket key for a distance
#[inline]
pub fn distance_bucket(distance: f32) -> u32 {
    distance.ceil().max(0.0) as u32
}

#[derive(Debug, Default)]
pub struct SpatialMonsterIndex<'w> {
    hostile: BTreeMap<u32, Vec<CreatureView<'w>>>,
    friendly: Vec<CreatureView<'w>>,
}

impl<'w> SpatialMonsterIndex<'w> {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Classify every valid, living monster around `origin`
    ///
    /// `origin` is the player position captured with the snapshot, `None`
    /// when the player has not spawned yet; the index is empty in that case.
    /// The player is never re-read here so the index agrees with every other
    /// collection of the same snapshot.
    pub fn build(world: &'w dyn WorldReader, origin: Option<Vec3>, max_range: u32) -> Self {
        let mut index = Self::empty();
        let Some(origin) = origin else {
            return index;
        };

        for id in world.entities(EntityCategory::Monster) {
            if !is_valid_creature(world, id, origin, max_range, true) {
                continue;
            }
            let creature = CreatureView::new(world, id, Some(origin));
            if world.is_hostile(id) {
                let bucket = distance_bucket(creature.distance());
                index.hostile.entry(bucket).or_default().push(creature);
            } else {
                index.friendly.push(creature);
            }
        }

        tracing::debug!(
            hostile = index.hostile.values().map(Vec::len).sum::<usize>(),
            friendly = index.friendly.len(),
            "Built nearby monster index"
        );
        index
    }

    /// Hostile creatures within `range` whose rarity intersects `mask`,
    /// nearest buckets first
    pub fn list(&self, range: u32, mask: Rarity) -> impl Iterator<Item = &CreatureView<'w>> + '_ {
        self.hostile
            .range(..=range)
            .flat_map(|(_, bucket)| bucket.iter())
            .filter(move |c| c.rarity().intersects(mask))
    }

    pub fn count(&self, range: u32, mask: Rarity) -> usize {
        self.list(range, mask).count()
    }

    pub fn friendly(&self) -> &[CreatureView<'w>] {
        &self.friendly
    }

    pub fn is_empty(&self) -> bool {
        self.hostile.is_empty() && self.friendly.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ScreenRect;
    use crate::world::{Buff, MemoryWorld, RawEntity, RawRarity};

    fn world_with_player() -> MemoryWorld {
        let world = MemoryWorld::new(ScreenRect::new(0.0, 0.0, 800.0, 600.0));
        world.spawn_player(RawEntity::player("Hero", Vec3::ZERO));
        world
    }

    fn at(x: f32) -> Vec3 {
        Vec3::new(x, 0.0, 0.0)
    }

    #[test]
    fn test_bucket_is_distance_ceiling() {
        assert_eq!(distance_bucket(0.0), 0);
        assert_eq!(distance_bucket(4.01), 5);
        assert_eq!(distance_bucket(5.0), 5);
    }

    #[test]
    fn test_range_and_rarity_filtering() {
        let world = world_with_player();
        world.insert(RawEntity::monster(at(5.0), RawRarity::White));
        world.insert(RawEntity::monster(at(9.5), RawRarity::Rare));
        world.insert(RawEntity::monster(at(30.0), RawRarity::Unique));

        let index = SpatialMonsterIndex::build(&world, player_origin(&world), 200);
        assert_eq!(index.count(10, Rarity::ANY), 2);
        assert_eq!(index.count(9, Rarity::ANY), 1);
        assert_eq!(index.count(100, Rarity::RARE | Rarity::UNIQUE), 2);
        assert_eq!(index.count(100, Rarity::MAGIC), 0);
    }

    #[test]
    fn test_list_is_nearest_first() {
        let world = world_with_player();
        world.insert(RawEntity::monster(at(40.0), RawRarity::White));
        world.insert(RawEntity::monster(at(2.0), RawRarity::White));
        world.insert(RawEntity::monster(at(17.0), RawRarity::White));

        let index = SpatialMonsterIndex::build(&world, player_origin(&world), 200);
        let distances: Vec<f32> = index.list(u32::MAX, Rarity::ANY).map(|c| c.distance()).collect();
        assert_eq!(distances, vec![2.0, 17.0, 40.0]);
    }

    #[test]
    fn test_invalid_creatures_excluded() {
        let world = world_with_player();
        world.insert(RawEntity::monster(at(3.0), RawRarity::White).dead());
        world.insert(RawEntity::monster(at(3.0), RawRarity::White).with_buff(Buff::new(HIDDEN_MONSTER_BUFF)));
        world.insert(RawEntity::monster(at(300.0), RawRarity::White));
        let mut no_render = RawEntity::monster(at(3.0), RawRarity::White);
        no_render.renderable = false;
        world.insert(no_render);
        let mut no_buffs = RawEntity::monster(at(3.0), RawRarity::White);
        no_buffs.buffs = None;
        world.insert(no_buffs);

        let index = SpatialMonsterIndex::build(&world, player_origin(&world), 200);
        assert!(index.is_empty());
    }

    #[test]
    fn test_friendly_kept_separately() {
        let world = world_with_player();
        world.insert(RawEntity::monster(at(3.0), RawRarity::White).friendly());
        world.insert(RawEntity::monster(at(4.0), RawRarity::Magic));

        let index = SpatialMonsterIndex::build(&world, player_origin(&world), 200);
        assert_eq!(index.friendly().len(), 1);
        assert_eq!(index.count(u32::MAX, Rarity::ANY), 1);
    }

    #[test]
    fn test_unrendered_player_gives_empty_index() {
        let world = MemoryWorld::new(ScreenRect::default());
        let mut player = RawEntity::player("Hero", Vec3::ZERO);
        player.renderable = false;
        world.spawn_player(player);
        world.insert(RawEntity::monster(at(3.0), RawRarity::White));

        assert!(SpatialMonsterIndex::build(&world, player_origin(&world), 200).is_empty());
    }

    #[test]
    fn test_origin_is_taken_as_given() {
        let world = world_with_player();
        world.insert(RawEntity::monster(at(10.0), RawRarity::White));
        let origin = player_origin(&world);

        // Player walks away after the origin was captured
        world.update(world.player().unwrap(), |p| p.position = Some(at(100.0)));

        let index = SpatialMonsterIndex::build(&world, origin, 200);
        let distances: Vec<f32> = index.list(u32::MAX, Rarity::ANY).map(|c| c.distance()).collect();
        assert_eq!(distances, vec![10.0]);
        assert!(SpatialMonsterIndex::build(&world, None, 200).is_empty());
    }

    #[test]
    fn test_no_creatures_is_empty_not_error() {
        let world = world_with_player();
        let index = SpatialMonsterIndex::build(&world, player_origin(&world), 200);
        assert_eq!(index.count(50, Rarity::ANY), 0);
        assert_eq!(index.list(50, Rarity::ANY).count(), 0);
    }
}
