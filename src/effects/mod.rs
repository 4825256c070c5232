//! Side effects requested by matching rules
//!
//! The set is closed: one variant per effect kind, dispatched through
//! [`SideEffect::apply`]. Effects are plain values; they carry the literal
//! parameters needed to act and own no snapshot state.
//!
//! Equivalent effects applied twice in one tick are queued once. The second
//! application reports [`ApplicationResult::AppliedDuplicate`].

mod display;
mod input;
mod memory;

use crate::core::error::Result;
use crate::core::types::{KeyCode, Vec2};
use crate::state::entity::CreatureView;
use crate::state::scratch::CursorReturn;
use crate::state::snapshot::StateSnapshot;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Dwell time at the target before a return leg starts
pub const DEFAULT_RETURN_DELAY_MS: u64 = 1000;

/// Outcome of applying one side effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApplicationResult {
    /// First application of this exact effect in the current tick
    AppliedUnique,
    /// An equal effect was already queued this tick; nothing was added
    AppliedDuplicate,
    /// The effect does not apply right now (e.g. key press on cooldown)
    UnableToApply,
}

impl ApplicationResult {
    pub fn is_applied(self) -> bool {
        !matches!(self, Self::UnableToApply)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SideEffect {
    DisplayText {
        text: String,
        position: Vec2,
        color: String,
    },
    DisplayTextAdvanced {
        text: String,
        position: Vec2,
        text_color: String,
        background_color: String,
        font_size: f32,
    },
    DisplayGraphic {
        path: String,
        position: Vec2,
        size: Vec2,
        tint_color: String,
        text: Option<String>,
        text_color: Option<String>,
        font_size: Option<f32>,
        background_color: Option<String>,
    },
    ProgressBar {
        text: Option<String>,
        position: Vec2,
        size: Vec2,
        fraction: f32,
        color: String,
        background_color: String,
        text_color: String,
    },
    PressKey {
        key: KeyCode,
    },
    StartKeyHold {
        key: KeyCode,
    },
    ReleaseKey {
        key: KeyCode,
    },
    MoveCursor {
        target: Vec2,
        return_to: CursorReturn,
        #[serde(default)]
        delay_ms: u64,
        return_delay_ms: u64,
    },
    SetFlag {
        name: String,
        value: bool,
    },
    SetNumber {
        name: String,
        value: f32,
    },
    StartTimer {
        name: String,
    },
    StopTimer {
        name: String,
    },
    ResetTimer {
        name: String,
    },
}

impl SideEffect {
    pub fn display_text(text: impl Into<String>, x: f32, y: f32, color: impl Into<String>) -> Self {
        Self::DisplayText {
            text: text.into(),
            position: Vec2::new(x, y),
            color: color.into(),
        }
    }

    pub fn display_text_advanced(
        text: impl Into<String>,
        x: f32,
        y: f32,
        text_color: impl Into<String>,
        background_color: impl Into<String>,
        font_size: f32,
    ) -> Self {
        Self::DisplayTextAdvanced {
            text: text.into(),
            position: Vec2::new(x, y),
            text_color: text_color.into(),
            background_color: background_color.into(),
            font_size,
        }
    }

    pub fn display_graphic(
        path: impl Into<String>,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        tint_color: impl Into<String>,
    ) -> Self {
        Self::DisplayGraphic {
            path: path.into(),
            position: Vec2::new(x, y),
            size: Vec2::new(width, height),
            tint_color: tint_color.into(),
            text: None,
            text_color: None,
            font_size: None,
            background_color: None,
        }
    }

    pub fn progress_bar(
        text: Option<String>,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        fraction: f32,
        color: impl Into<String>,
        background_color: impl Into<String>,
        text_color: impl Into<String>,
    ) -> Self {
        Self::ProgressBar {
            text,
            position: Vec2::new(x, y),
            size: Vec2::new(width, height),
            fraction,
            color: color.into(),
            background_color: background_color.into(),
            text_color: text_color.into(),
        }
    }

    pub fn set_flag(name: impl Into<String>, value: bool) -> Self {
        Self::SetFlag { name: name.into(), value }
    }

    pub fn set_number(name: impl Into<String>, value: f32) -> Self {
        Self::SetNumber { name: name.into(), value }
    }

    /// Move the cursor onto a monster, aiming a few pixels off its centre
    pub fn move_cursor_to_monster<R: Rng + ?Sized>(
        monster: &CreatureView<'_>,
        return_to: CursorReturn,
        rng: &mut R,
    ) -> Self {
        Self::MoveCursor {
            target: monster.entity().randomized_screen_pos(rng, -5, 5),
            return_to,
            delay_ms: 0,
            return_delay_ms: DEFAULT_RETURN_DELAY_MS,
        }
    }

    /// Hold a cursor move back by `ms` before it starts; other effects are unchanged
    pub fn delayed(mut self, ms: u64) -> Self {
        if let Self::MoveCursor { delay_ms, .. } = &mut self {
            *delay_ms = ms;
        }
        self
    }

    /// Apply the effect to an open snapshot
    ///
    /// Fails with `AccessDenied` once the snapshot has been locked.
    pub fn apply(&self, snapshot: &mut StateSnapshot<'_>) -> Result<ApplicationResult> {
        let result = match self {
            Self::DisplayText { .. }
            | Self::DisplayTextAdvanced { .. }
            | Self::DisplayGraphic { .. }
            | Self::ProgressBar { .. } => display::apply(self, snapshot.scratch_mut()?),
            Self::PressKey { key } => input::press_key(*key, snapshot.scratch_mut()?),
            Self::StartKeyHold { key } => input::hold_key(*key, snapshot.scratch_mut()?),
            Self::ReleaseKey { key } => input::release_key(*key, snapshot.scratch_mut()?),
            Self::MoveCursor { target, return_to, delay_ms, return_delay_ms } => input::move_cursor(
                *target,
                *return_to,
                *delay_ms,
                *return_delay_ms,
                snapshot.scratch_mut()?,
            ),
            Self::SetFlag { .. }
            | Self::SetNumber { .. }
            | Self::StartTimer { .. }
            | Self::StopTimer { .. }
            | Self::ResetTimer { .. } => memory::apply(self, snapshot)?,
        };

        if result == ApplicationResult::AppliedDuplicate {
            tracing::trace!(effect = %self, "Equivalent effect already queued");
        }
        Ok(result)
    }
}

impl fmt::Display for SideEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DisplayText { text, position, color } => {
                write!(f, "Display \"{}\" at {} with color {}", text, position, color)
            }
            Self::DisplayTextAdvanced { text, position, text_color, background_color, font_size } => {
                write!(
                    f,
                    "Display \"{}\" at {} with color {}, background {}, size {}",
                    text, position, text_color, background_color, font_size
                )
            }
            Self::DisplayGraphic { path, position, size, tint_color, .. } => {
                write!(f, "Display \"{}\" at {} with {} and tint {}", path, position, size, tint_color)
            }
            Self::ProgressBar { text, position, fraction, .. } => write!(
                f,
                "Progress bar \"{}\" at {} filled {:.0}%",
                text.as_deref().unwrap_or(""),
                position,
                fraction * 100.0
            ),
            Self::PressKey { key } => write!(f, "Press key {}", key.0),
            Self::StartKeyHold { key } => write!(f, "Hold key {}", key.0),
            Self::ReleaseKey { key } => write!(f, "Release key {}", key.0),
            Self::MoveCursor { target, return_to, delay_ms: 0, .. } => {
                write!(f, "Move cursor to {} then {:?}", target, return_to)
            }
            Self::MoveCursor { target, return_to, delay_ms, .. } => {
                write!(f, "Move cursor to {} after {} ms then {:?}", target, delay_ms, return_to)
            }
            Self::SetFlag { name, value } => write!(f, "Set flag {} to {}", name, value),
            Self::SetNumber { name, value } => write!(f, "Set number {} to {}", name, value),
            Self::StartTimer { name } => write!(f, "Start timer {}", name),
            Self::StopTimer { name } => write!(f, "Stop timer {}", name),
            Self::ResetTimer { name } => write!(f, "Reset timer {}", name),
        }
    }
}
