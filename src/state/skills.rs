//! Skill projections
//!
//! Affordability is decided against the resource pools captured when the set
//! is created. Later pool changes in the same tick never flip an answer that
//! was already derived.

use crate::core::memo::Memo;
use crate::core::types::{EntityId, Vec3};
use crate::state::entity::CreatureView;
use crate::world::{Actor, ActorSkill, WorldReader};
use ahash::AHashMap;

/// Pool size assumed for entities without a life component
const UNLIMITED_POOL: i32 = 10_000;

/// Resource pools as they were when the skill set was built
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSnapshot {
    pub mana: i32,
    pub hp: i32,
    pub es: i32,
}

impl PoolSnapshot {
    pub const UNLIMITED: Self = Self {
        mana: UNLIMITED_POOL,
        hp: UNLIMITED_POOL,
        es: UNLIMITED_POOL,
    };

    fn capture(world: &dyn WorldReader, id: EntityId) -> Self {
        match world.life(id) {
            Some(life) => Self {
                mana: life.mana.current,
                hp: life.hp.current,
                es: life.energy_shield.current,
            },
            None => Self::UNLIMITED,
        }
    }

    fn affords(&self, skill: &ActorSkill) -> bool {
        skill.mana_cost <= self.mana && skill.life_cost <= self.hp && skill.es_cost <= self.es
    }
}

pub struct SkillView<'w> {
    world: Option<&'w dyn WorldReader>,
    origin: Option<Vec3>,
    pub id: u16,
    pub id2: u16,
    /// False for placeholder skills returned on lookup misses
    pub exists: bool,
    pub name: String,
    pub can_be_used: bool,
    pub is_using: bool,
    pub use_stage: i32,
    pub mana_cost: i32,
    pub life_cost: i32,
    pub es_cost: i32,
    pub max_uses: i32,
    pub cooldown: f32,
    pub remaining_uses: i32,
    pub cooldowns: Vec<f32>,
    deployed_ids: Vec<EntityId>,
    deployed: Memo<Vec<CreatureView<'w>>>,
}

impl<'w> SkillView<'w> {
    fn from_actor_skill(
        world: &'w dyn WorldReader,
        origin: Option<Vec3>,
        skill: &ActorSkill,
        pools: PoolSnapshot,
    ) -> Self {
        Self {
            world: Some(world),
            origin,
            id: skill.id,
            id2: skill.id2,
            exists: true,
            name: skill.name.clone(),
            can_be_used: skill.can_be_used && skill.can_be_used_with_weapon && pools.affords(skill),
            is_using: skill.is_using,
            use_stage: skill.use_stage,
            mana_cost: skill.mana_cost,
            life_cost: skill.life_cost,
            es_cost: skill.es_cost,
            max_uses: skill.max_uses.unwrap_or(1),
            cooldown: skill.cooldown,
            remaining_uses: skill.remaining_uses,
            cooldowns: skill.cooldowns_remaining.clone(),
            deployed_ids: skill.deployed_objects.clone(),
            deployed: Memo::new(),
        }
    }

    /// Placeholder for a skill the creature does not have
    pub fn empty(name: &str) -> Self {
        Self {
            world: None,
            origin: None,
            id: 0,
            id2: 0,
            exists: false,
            name: name.to_string(),
            can_be_used: false,
            is_using: false,
            use_stage: 0,
            mana_cost: 0,
            life_cost: 0,
            es_cost: 0,
            max_uses: 0,
            cooldown: 0.0,
            remaining_uses: 0,
            cooldowns: Vec::new(),
            deployed_ids: Vec::new(),
            deployed: Memo::new(),
        }
    }

    /// Objects this skill has placed in the world (totems, minions, mines)
    pub fn deployed_objects(&self) -> &[CreatureView<'w>] {
        self.deployed.get_or_compute(|| match self.world {
            Some(world) => self
                .deployed_ids
                .iter()
                .map(|id| CreatureView::new(world, *id, self.origin))
                .collect(),
            None => Vec::new(),
        })
    }
}

impl std::fmt::Debug for SkillView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkillView")
            .field("name", &self.name)
            .field("exists", &self.exists)
            .field("can_be_used", &self.can_be_used)
            .finish()
    }
}

/// Skills of one creature, looked up by case-insensitive name
pub struct SkillSet<'w> {
    world: Option<&'w dyn WorldReader>,
    id: EntityId,
    origin: Option<Vec3>,
    pools: PoolSnapshot,
    actor: Memo<Option<Actor>>,
    skills: Memo<AHashMap<String, SkillView<'w>>>,
}

impl<'w> SkillSet<'w> {
    /// Capture the creature's pools now; skills are derived on first lookup
    pub fn new(world: &'w dyn WorldReader, id: EntityId, origin: Option<Vec3>) -> Self {
        Self {
            world: Some(world),
            id,
            origin,
            pools: PoolSnapshot::capture(world, id),
            actor: Memo::new(),
            skills: Memo::new(),
        }
    }

    pub fn empty() -> Self {
        Self {
            world: None,
            id: EntityId(0),
            origin: None,
            pools: PoolSnapshot::UNLIMITED,
            actor: Memo::new(),
            skills: Memo::new(),
        }
    }

    pub fn pools(&self) -> PoolSnapshot {
        self.pools
    }

    fn actor(&self) -> Option<&Actor> {
        self.actor
            .get_or_compute(|| self.world.and_then(|w| w.actor(self.id)))
            .as_ref()
    }

    fn source(&self) -> &AHashMap<String, SkillView<'w>> {
        self.skills.get_or_compute(|| {
            let (Some(world), Some(actor)) = (self.world, self.actor()) else {
                return AHashMap::new();
            };
            let mut skills = AHashMap::new();
            for skill in actor.skills.iter().filter(|s| !s.name.trim().is_empty()) {
                // First skill wins on case-insensitive name clashes
                skills
                    .entry(skill.name.to_lowercase())
                    .or_insert_with(|| {
                        SkillView::from_actor_skill(world, self.origin, skill, self.pools)
                    });
            }
            skills
        })
    }

    pub fn get(&self, name: &str) -> Option<&SkillView<'w>> {
        self.source().get(&name.to_lowercase())
    }

    /// Skill by name, or a non-existent placeholder
    pub fn get_or_empty(&self, name: &str) -> SkillViewRef<'_, 'w> {
        match self.get(name) {
            Some(skill) => SkillViewRef::Borrowed(skill),
            None => SkillViewRef::Owned(SkillView::empty(name)),
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn by_numeric_id(&self, id: u16, id2: u16) -> Option<&SkillView<'w>> {
        self.source().values().find(|s| s.id == id && s.id2 == id2)
    }

    /// Skill driving the creature's current action, evaluated against the
    /// captured pools
    pub fn current(&self) -> SkillView<'w> {
        match (self.world, self.actor().and_then(|a| a.current_action.as_ref())) {
            (Some(world), Some(skill)) => {
                SkillView::from_actor_skill(world, self.origin, skill, self.pools)
            }
            _ => SkillView::empty(""),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &SkillView<'w>> {
        self.source().values()
    }

    pub fn len(&self) -> usize {
        self.source().len()
    }

    pub fn is_empty(&self) -> bool {
        self.source().is_empty()
    }
}

/// Either a skill from the set or a placeholder built for a miss
pub enum SkillViewRef<'a, 'w> {
    Borrowed(&'a SkillView<'w>),
    Owned(SkillView<'w>),
}

impl<'w> std::ops::Deref for SkillViewRef<'_, 'w> {
    type Target = SkillView<'w>;

    fn deref(&self) -> &Self::Target {
        match self {
            Self::Borrowed(skill) => skill,
            Self::Owned(skill) => skill,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ScreenRect;
    use crate::world::{Life, MemoryWorld, Pool, RawEntity, RawRarity};

    fn skill(name: &str, mana_cost: i32) -> ActorSkill {
        ActorSkill {
            name: name.to_string(),
            can_be_used: true,
            can_be_used_with_weapon: true,
            mana_cost,
            ..ActorSkill::default()
        }
    }

    fn caster(world: &MemoryWorld, mana: i32, skills: Vec<ActorSkill>) -> EntityId {
        world.insert(
            RawEntity::monster(Vec3::ZERO, RawRarity::Magic)
                .with_life(Life { mana: Pool::new(mana, 100), ..Life::default() })
                .with_actor(Actor { skills, ..Actor::default() }),
        )
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let world = MemoryWorld::new(ScreenRect::default());
        let id = caster(&world, 50, vec![skill("Fireball", 5)]);
        let skills = SkillSet::new(&world, id, None);

        assert!(skills.has("fireball"));
        assert!(skills.has("FIREBALL"));
        assert!(skills.get("fireball").unwrap().can_be_used);
    }

    #[test]
    fn test_duplicate_and_blank_names_dropped() {
        let world = MemoryWorld::new(ScreenRect::default());
        let id = caster(
            &world,
            50,
            vec![skill("Dash", 1), skill("dash", 99), skill("  ", 0)],
        );
        let skills = SkillSet::new(&world, id, None);

        assert_eq!(skills.len(), 1);
        assert_eq!(skills.get("DASH").unwrap().mana_cost, 1);
    }

    #[test]
    fn test_pools_captured_at_construction() {
        let world = MemoryWorld::new(ScreenRect::default());
        let id = caster(&world, 10, vec![skill("Nova", 15)]);
        let skills = SkillSet::new(&world, id, None);

        world.update(id, |e| {
            if let Some(life) = e.life.as_mut() {
                life.mana.current = 100;
            }
        });

        assert!(!skills.get("nova").unwrap().can_be_used);
        assert_eq!(skills.pools().mana, 10);
    }

    #[test]
    fn test_missing_skill_placeholder() {
        let world = MemoryWorld::new(ScreenRect::default());
        let id = caster(&world, 10, vec![]);
        let skills = SkillSet::new(&world, id, None);

        let missing = skills.get_or_empty("Leap");
        assert!(!missing.exists);
        assert!(!missing.can_be_used);
        assert_eq!(missing.name, "Leap");
    }

    #[test]
    fn test_no_life_means_unlimited_pools() {
        let world = MemoryWorld::new(ScreenRect::default());
        let mut entity = RawEntity::monster(Vec3::ZERO, RawRarity::White)
            .with_actor(Actor { skills: vec![skill("Slam", 500)], ..Actor::default() });
        entity.life = None;
        let id = world.insert(entity);

        let skills = SkillSet::new(&world, id, None);
        assert_eq!(skills.pools(), PoolSnapshot::UNLIMITED);
        assert!(skills.get("slam").unwrap().can_be_used);
    }

    #[test]
    fn test_current_action_and_numeric_lookup() {
        let world = MemoryWorld::new(ScreenRect::default());
        let mut cleave = skill("Cleave", 0);
        cleave.id = 4;
        cleave.id2 = 2;
        let id = world.insert(RawEntity::monster(Vec3::ZERO, RawRarity::White).with_actor(Actor {
            skills: vec![cleave.clone()],
            current_action: Some(cleave),
            ..Actor::default()
        }));

        let skills = SkillSet::new(&world, id, None);
        assert_eq!(skills.current().name, "Cleave");
        assert!(skills.by_numeric_id(4, 2).is_some());
        assert!(skills.by_numeric_id(4, 3).is_none());
        assert!(!SkillSet::empty().current().exists);
    }

    #[test]
    fn test_deployed_objects_resolved_lazily() {
        let world = MemoryWorld::new(ScreenRect::default());
        let totem = world.insert(RawEntity::monster(Vec3::new(1.0, 0.0, 0.0), RawRarity::White));
        let mut summon = skill("Totem", 0);
        summon.deployed_objects = vec![totem];
        let id = caster(&world, 10, vec![summon]);

        let skills = SkillSet::new(&world, id, Some(Vec3::ZERO));
        let deployed = skills.get("totem").unwrap().deployed_objects();
        assert_eq!(deployed.len(), 1);
        assert_eq!(deployed[0].id(), totem);
    }
}
