//! Input side effects: key presses, holds, releases and cursor moves

use super::ApplicationResult;
use crate::core::types::{KeyCode, Vec2};
use crate::state::scratch::{push_unique, CursorReturn, CursorTask, ScratchState};

fn unique_or_duplicate(appended: bool) -> ApplicationResult {
    if appended {
        ApplicationResult::AppliedUnique
    } else {
        ApplicationResult::AppliedDuplicate
    }
}

/// At most one key press per tick, and only once the global cooldown allows
pub(super) fn press_key(key: KeyCode, scratch: &mut ScratchState) -> ApplicationResult {
    if !scratch.can_press_key {
        return ApplicationResult::UnableToApply;
    }
    match scratch.requests.key_to_press {
        Some(queued) if queued == key => ApplicationResult::AppliedDuplicate,
        Some(_) => ApplicationResult::UnableToApply,
        None => {
            scratch.requests.key_to_press = Some(key);
            ApplicationResult::AppliedUnique
        }
    }
}

pub(super) fn hold_key(key: KeyCode, scratch: &mut ScratchState) -> ApplicationResult {
    unique_or_duplicate(push_unique(&mut scratch.requests.keys_to_hold, key))
}

pub(super) fn release_key(key: KeyCode, scratch: &mut ScratchState) -> ApplicationResult {
    unique_or_duplicate(push_unique(&mut scratch.requests.keys_to_release, key))
}

pub(super) fn move_cursor(
    target: Vec2,
    return_to: CursorReturn,
    delay_ms: u64,
    return_delay_ms: u64,
    scratch: &mut ScratchState,
) -> ApplicationResult {
    let task = CursorTask { target, return_to, delay_ms, return_delay_ms };
    unique_or_duplicate(push_unique(&mut scratch.requests.cursor_tasks, task))
}
