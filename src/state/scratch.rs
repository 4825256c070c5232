//! Per-tick scratch area: queued render and input requests
//!
//! Side effects append here while the snapshot is open. Locking hands the
//! queues to the renderer/input drainer; after that the scratch state refuses
//! all access.

use crate::core::types::{KeyCode, Vec2};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRequest {
    pub text: String,
    pub position: Vec2,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvancedTextRequest {
    pub text: String,
    pub position: Vec2,
    pub text_color: String,
    pub background_color: String,
    pub font_size: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphicRequest {
    pub path: String,
    pub position: Vec2,
    pub size: Vec2,
    pub tint_color: String,
    /// Optional caption drawn over the graphic
    pub text: Option<String>,
    pub text_color: Option<String>,
    pub font_size: Option<f32>,
    pub background_color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressBarRequest {
    pub text: Option<String>,
    pub position: Vec2,
    pub size: Vec2,
    /// Filled share in `[0, 1]`
    pub fraction: f32,
    pub color: String,
    pub background_color: String,
    pub text_color: String,
}

/// Where the cursor goes once it reached its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CursorReturn {
    Stay,
    ScreenCenter,
    Previous,
}

/// Humanized cursor movement waiting to be executed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CursorTask {
    pub target: Vec2,
    pub return_to: CursorReturn,
    /// Wait before the first leg starts
    #[serde(default)]
    pub delay_ms: u64,
    /// Dwell time at the target before the return leg
    pub return_delay_ms: u64,
}

/// Everything queued during one tick, in enqueue order per collection
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrameRequests {
    pub texts: Vec<TextRequest>,
    pub advanced_texts: Vec<AdvancedTextRequest>,
    pub graphics: Vec<GraphicRequest>,
    pub progress_bars: Vec<ProgressBarRequest>,
    pub key_to_press: Option<KeyCode>,
    pub keys_to_hold: Vec<KeyCode>,
    pub keys_to_release: Vec<KeyCode>,
    pub cursor_tasks: Vec<CursorTask>,
}

impl FrameRequests {
    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
            && self.advanced_texts.is_empty()
            && self.graphics.is_empty()
            && self.progress_bars.is_empty()
            && self.key_to_press.is_none()
            && self.keys_to_hold.is_empty()
            && self.keys_to_release.is_empty()
            && self.cursor_tasks.is_empty()
    }

    /// Number of queued display requests of all kinds
    pub fn display_count(&self) -> usize {
        self.texts.len() + self.advanced_texts.len() + self.graphics.len() + self.progress_bars.len()
    }
}

/// Mutable per-tick area owned by the snapshot
#[derive(Debug, Default)]
pub struct ScratchState {
    pub requests: FrameRequests,
    /// Granted by the engine when the global key press cooldown has elapsed
    pub can_press_key: bool,
    locked: bool,
}

impl ScratchState {
    pub fn new(can_press_key: bool) -> Self {
        Self {
            requests: FrameRequests::default(),
            can_press_key,
            locked: false,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Close the scratch state and hand over its queues
    pub(crate) fn lock(&mut self) -> FrameRequests {
        self.locked = true;
        std::mem::take(&mut self.requests)
    }
}

/// Append `item` unless an equal one is already queued; true when appended
pub(crate) fn push_unique<T: PartialEq>(queue: &mut Vec<T>, item: T) -> bool {
    if queue.contains(&item) {
        return false;
    }
    queue.push(item);
    true
}
