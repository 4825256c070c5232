//! Memory side effects: write flags, numbers and timers of the current group

use super::{ApplicationResult, SideEffect};
use crate::core::error::Result;
use crate::state::snapshot::StateSnapshot;

pub(super) fn apply(effect: &SideEffect, snapshot: &mut StateSnapshot<'_>) -> Result<ApplicationResult> {
    let now = snapshot.now();
    let memory = snapshot.memory_mut()?;
    match effect {
        SideEffect::SetFlag { name, value } => memory.set_flag(name, *value),
        SideEffect::SetNumber { name, value } => memory.set_number(name, *value),
        SideEffect::StartTimer { name } => memory.start_timer(name, now),
        SideEffect::StopTimer { name } => memory.stop_timer(name, now),
        SideEffect::ResetTimer { name } => memory.reset_timer(name),
        _ => return Ok(ApplicationResult::UnableToApply),
    }
    Ok(ApplicationResult::AppliedUnique)
}
