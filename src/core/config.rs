//! Agent configuration with documented constants
//!
//! Ranges checked by `validate` are the ones the settings UI exposes as
//! sliders.

use crate::core::error::{AgentError, Result};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration read by the snapshot, the engine and the cursor humanizer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    // === SNAPSHOT ===
    /// Creatures further than this from the player are ignored (grid units)
    ///
    /// Bounds the nearby-monster index and every monster collection.
    pub maximum_monster_range: u32,

    /// Custom ailments: ailment name -> buff names that signal it
    ///
    /// The player is considered afflicted when any listed buff is present.
    pub ailments: AHashMap<String, Vec<String>>,

    // === ENGINE ===
    /// Minimum time between two queued key presses (milliseconds)
    pub global_key_press_cooldown_ms: u64,

    /// How long rule activation history is retained (seconds)
    pub history_seconds_to_keep: u64,

    // === INPUT ===
    pub mouse_movement: MouseMovementConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            maximum_monster_range: 200,
            ailments: AHashMap::new(),
            global_key_press_cooldown_ms: 200,
            history_seconds_to_keep: 60,
            mouse_movement: MouseMovementConfig::default(),
        }
    }
}

/// Tunables for humanized cursor movement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MouseMovementConfig {
    /// Pixels covered per step before jitter
    ///
    /// Higher = fewer steps, faster and more direct movement.
    pub base_speed: u32,

    /// Lower bound on step count regardless of distance
    ///
    /// More steps = smoother but slower traversal.
    pub min_steps: u32,

    /// Pause between steps (milliseconds), before Gaussian jitter
    pub base_delay_ms: u32,

    /// Relative jitter applied to the step count
    ///
    /// 0.12-0.18 looks natural; below 0.1 reads mechanical, above 0.2 erratic.
    pub randomization_factor: f32,

    /// Scale of per-step Gaussian micro-adjustments
    pub noise_scale: f32,
}

impl Default for MouseMovementConfig {
    fn default() -> Self {
        Self {
            base_speed: 25,
            min_steps: 8,
            base_delay_ms: 22,
            randomization_factor: 0.15,
            noise_scale: 2.0,
        }
    }
}

impl MouseMovementConfig {
    pub fn validate(&self) -> Result<()> {
        check_range("base_speed", self.base_speed as f32, 15.0, 100.0)?;
        check_range("min_steps", self.min_steps as f32, 4.0, 15.0)?;
        check_range("base_delay_ms", self.base_delay_ms as f32, 15.0, 50.0)?;
        check_range("randomization_factor", self.randomization_factor, 0.08, 0.4)?;
        check_range("noise_scale", self.noise_scale, 0.5, 5.0)?;
        Ok(())
    }
}

impl AgentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration against the settings UI ranges
    pub fn validate(&self) -> Result<()> {
        check_range("maximum_monster_range", self.maximum_monster_range as f32, 0.0, 500.0)?;
        check_range(
            "global_key_press_cooldown_ms",
            self.global_key_press_cooldown_ms as f32,
            0.0,
            1000.0,
        )?;
        check_range("history_seconds_to_keep", self.history_seconds_to_keep as f32, 0.0, 600.0)?;
        self.mouse_movement.validate()
    }
}

fn check_range(name: &str, value: f32, min: f32, max: f32) -> Result<()> {
    if value < min || value > max {
        return Err(AgentError::InvalidConfig(format!(
            "{} ({}) must be within [{}, {}]",
            name, value, min, max
        )));
    }
    Ok(())
}
