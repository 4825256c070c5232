//! Humanized cursor movement
//!
//! Moves the pointer along a curved, noisy, time-paced path instead of a
//! straight constant-speed line. The pointer itself is reached through a
//! [`CursorDriver`] so the same code drives the real OS cursor or a
//! virtual one.

pub mod humanizer;
pub mod path;

use crate::core::error::Result;
use crate::core::types::{ScreenRect, Vec2};

pub use humanizer::{HumanizedCursor, MoveReport};
pub use path::{plan_movement, MovementPlan, PlannedStep};

/// Access to a pointer and the window it lives in
pub trait CursorDriver {
    fn position(&self) -> Result<Vec2>;
    fn set_position(&mut self, position: Vec2) -> Result<()>;
    /// Client rectangle of the game window in screen coordinates
    fn client_rect(&self) -> ScreenRect;
}

/// In-process cursor that records every position it was moved to
#[derive(Debug, Clone)]
pub struct VirtualCursor {
    position: Vec2,
    rect: ScreenRect,
    trail: Vec<Vec2>,
}

impl VirtualCursor {
    pub fn new(position: Vec2, rect: ScreenRect) -> Self {
        Self {
            position,
            rect,
            trail: Vec::new(),
        }
    }

    /// Every applied position, oldest first
    pub fn trail(&self) -> &[Vec2] {
        &self.trail
    }

    pub fn clear_trail(&mut self) {
        self.trail.clear();
    }
}

impl CursorDriver for VirtualCursor {
    fn position(&self) -> Result<Vec2> {
        Ok(self.position)
    }

    fn set_position(&mut self, position: Vec2) -> Result<()> {
        self.position = position;
        self.trail.push(position);
        Ok(())
    }

    fn client_rect(&self) -> ScreenRect {
        self.rect
    }
}
