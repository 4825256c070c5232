//! Executes movement plans in real time
//!
//! Each step suspends on the tokio timer, so a move spans many ticks without
//! blocking the tick thread. There is no cancellation: a started move runs to
//! completion or is dropped with the runtime.

use super::path::plan_movement;
use super::CursorDriver;
use crate::core::config::MouseMovementConfig;
use crate::core::error::Result;
use crate::core::types::Vec2;
use crate::state::scratch::{CursorReturn, CursorTask};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::time::Duration;

/// Moves closer than this snap straight to the target
const MIN_MOVE_DISTANCE: f32 = 1.0;

/// Half-width of the random offset applied to return targets (pixels)
const RETURN_JITTER: i32 = 5;

/// What happened during one or more movement legs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MoveReport {
    pub steps_planned: usize,
    pub steps_applied: usize,
    pub steps_skipped: usize,
    /// False when the final target was outside the window
    pub reached_target: bool,
}

impl MoveReport {
    fn merge(self, next: MoveReport) -> MoveReport {
        MoveReport {
            steps_planned: self.steps_planned + next.steps_planned,
            steps_applied: self.steps_applied + next.steps_applied,
            steps_skipped: self.steps_skipped + next.steps_skipped,
            reached_target: next.reached_target,
        }
    }
}

pub struct HumanizedCursor<D, R = ChaCha8Rng> {
    driver: D,
    config: MouseMovementConfig,
    rng: R,
}

impl<D: CursorDriver> HumanizedCursor<D, ChaCha8Rng> {
    pub fn new(driver: D, config: MouseMovementConfig) -> Self {
        Self::with_rng(driver, config, ChaCha8Rng::from_entropy())
    }

    /// Deterministic paths for replays and tests
    pub fn with_seed(driver: D, config: MouseMovementConfig, seed: u64) -> Self {
        Self::with_rng(driver, config, ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<D: CursorDriver, R: Rng> HumanizedCursor<D, R> {
    pub fn with_rng(driver: D, config: MouseMovementConfig, rng: R) -> Self {
        Self { driver, config, rng }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn into_driver(self) -> D {
        self.driver
    }

    /// Move from the current position to `target`, then pause for `settle`
    ///
    /// Steps that fall outside the client rect are skipped but still paced.
    /// The final snap onto `target` only happens when the target lies inside
    /// the window; otherwise a warning is logged, the cursor stays on the last
    /// in-window step and the report has `reached_target` set to false.
    pub async fn move_to(&mut self, target: Vec2, settle: Option<Duration>) -> Result<MoveReport> {
        let start = self.driver.position()?;
        let rect = self.driver.client_rect();
        let mut report = MoveReport::default();

        if start.distance(target) >= MIN_MOVE_DISTANCE {
            let plan = plan_movement(start, target, &self.config, &mut self.rng);
            report.steps_planned = plan.steps.len();

            for step in &plan.steps {
                if rect.contains(step.position) {
                    self.driver.set_position(step.position)?;
                    report.steps_applied += 1;
                } else {
                    tracing::debug!(
                        x = step.position.x,
                        y = step.position.y,
                        "Skipping cursor step outside window"
                    );
                    report.steps_skipped += 1;
                }
                tokio::time::sleep(step.delay).await;
            }
        }

        // Snap exactly onto the target to drop residual noise
        if rect.contains(target) {
            self.driver.set_position(target)?;
            report.reached_target = true;
        } else {
            tracing::warn!(x = target.x, y = target.y, "Cursor target outside window");
        }

        if let Some(pause) = settle {
            tokio::time::sleep(pause).await;
        }
        Ok(report)
    }

    fn return_jitter(&mut self) -> Vec2 {
        Vec2::new(
            self.rng.gen_range(-RETURN_JITTER..RETURN_JITTER) as f32,
            self.rng.gen_range(-RETURN_JITTER..RETURN_JITTER) as f32,
        )
    }

    /// Move to `target`, dwell, then head back to the window centre
    pub async fn move_and_return_to_center(
        &mut self,
        target: Vec2,
        dwell: Duration,
    ) -> Result<MoveReport> {
        let first = self.move_to(target, Some(dwell)).await?;
        let center = self.driver.client_rect().center() + self.return_jitter();
        let second = self.move_to(center, None).await?;
        Ok(first.merge(second))
    }

    /// Move to `target`, dwell, then head back to where the cursor started
    pub async fn move_and_return_to_previous(
        &mut self,
        target: Vec2,
        dwell: Duration,
    ) -> Result<MoveReport> {
        let original = self.driver.position()?;
        let first = self.move_to(target, Some(dwell)).await?;
        let back = original + self.return_jitter();
        let second = self.move_to(back, None).await?;
        Ok(first.merge(second))
    }

    /// Execute a queued cursor task
    pub async fn run(&mut self, task: &CursorTask) -> Result<MoveReport> {
        if task.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(task.delay_ms)).await;
        }
        let dwell = Duration::from_millis(task.return_delay_ms);
        match task.return_to {
            CursorReturn::Stay => self.move_to(task.target, None).await,
            CursorReturn::ScreenCenter => self.move_and_return_to_center(task.target, dwell).await,
            CursorReturn::Previous => self.move_and_return_to_previous(task.target, dwell).await,
        }
    }
}
