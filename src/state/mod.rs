//! Per-tick world state as seen by rules

pub mod entity;
pub mod memory;
pub mod nearby;
pub mod scratch;
pub mod skills;
pub mod snapshot;

pub use entity::{BuffSet, CreatureView, EntityView, PoolView, Rarity, VitalsView};
pub use memory::{EphemeralMemory, GroupMemory, Timer};
pub use nearby::SpatialMonsterIndex;
pub use scratch::{
    AdvancedTextRequest, CursorReturn, CursorTask, FrameRequests, GraphicRequest,
    ProgressBarRequest, ScratchState, TextRequest,
};
pub use skills::{PoolSnapshot, SkillSet, SkillView};
pub use snapshot::{GroupScope, SnapshotSummary, StateSnapshot};
