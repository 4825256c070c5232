//! Trajectory planning for humanized cursor movement
//!
//! A plan is a cubic Bezier from start to target, bent along the
//! perpendicular of the straight line, sampled in a jittered number of steps
//! with Gaussian noise on every sample and a jittered pause after each one.

use crate::core::config::MouseMovementConfig;
use crate::core::types::Vec2;
use rand::Rng;
use std::time::Duration;

/// Noise multiplier cap so very long moves do not get shakier without bound
const MAX_NOISE_DISTANCE_FACTOR: f32 = 2.0;

/// Shortest pause between two steps
pub const MIN_STEP_DELAY: Duration = Duration::from_millis(5);

/// Standard deviation of the step delay, as a share of the base delay
const DELAY_JITTER_SHARE: f32 = 0.25;

/// One sample along the planned path
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannedStep {
    pub position: Vec2,
    /// Pause after moving to `position`
    pub delay: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MovementPlan {
    pub start: Vec2,
    pub target: Vec2,
    pub control_points: [Vec2; 2],
    pub steps: Vec<PlannedStep>,
}

/// Pair of independent standard normal samples (Box-Muller transform)
pub fn gaussian_pair<R: Rng + ?Sized>(rng: &mut R) -> (f32, f32) {
    // Keep u1 away from 0 so ln stays finite
    let u1: f32 = rng.gen_range(f32::EPSILON..1.0);
    let u2: f32 = rng.gen();
    let radius = (-2.0 * u1.ln()).sqrt();
    let theta = std::f32::consts::TAU * u2;
    (radius * theta.cos(), radius * theta.sin())
}

pub fn cubic_bezier(p0: Vec2, p1: Vec2, p2: Vec2, p3: Vec2, t: f32) -> Vec2 {
    let u = 1.0 - t;
    p0 * (u * u * u) + p1 * (3.0 * u * u * t) + p2 * (3.0 * u * t * t) + p3 * (t * t * t)
}

/// Control points off the midpoint, each bent to a random side by
/// 20-100% of a quarter of the distance
pub fn control_points<R: Rng + ?Sized>(start: Vec2, target: Vec2, rng: &mut R) -> [Vec2; 2] {
    let delta = target - start;
    let distance = delta.length();
    let midpoint = start + delta * 0.5;
    let perpendicular = Vec2::new(-delta.y, delta.x).normalize_or_zero();
    let max_offset = distance / 4.0;

    let mut bend = || {
        let side: f32 = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        let fraction: f32 = rng.gen_range(0.2..=1.0);
        midpoint + perpendicular * (side * fraction * max_offset)
    };
    [bend(), bend()]
}

/// `max(min_steps, distance / base_speed)`, jittered by
/// `+/- steps * randomization_factor`, never below `min_steps`
pub fn step_count<R: Rng + ?Sized>(distance: f32, config: &MouseMovementConfig, rng: &mut R) -> u32 {
    let min_steps = config.min_steps.max(1);
    let by_speed = (distance / config.base_speed.max(1) as f32).round() as u32;
    let steps = min_steps.max(by_speed);

    let jitter = (steps as f32 * config.randomization_factor).round() as i64;
    let jittered = if jitter > 0 {
        steps as i64 + rng.gen_range(-jitter..=jitter)
    } else {
        steps as i64
    };
    jittered.max(min_steps as i64) as u32
}

/// Base delay plus Gaussian jitter, floored at [`MIN_STEP_DELAY`]
pub fn step_delay<R: Rng + ?Sized>(config: &MouseMovementConfig, rng: &mut R) -> Duration {
    let base = config.base_delay_ms as f32;
    let (z, _) = gaussian_pair(rng);
    let millis = base + z * base * DELAY_JITTER_SHARE;
    Duration::from_secs_f32(millis.max(0.0) / 1000.0).max(MIN_STEP_DELAY)
}

pub fn plan_movement<R: Rng + ?Sized>(
    start: Vec2,
    target: Vec2,
    config: &MouseMovementConfig,
    rng: &mut R,
) -> MovementPlan {
    let distance = start.distance(target);
    let [c1, c2] = control_points(start, target, rng);
    let steps = step_count(distance, config, rng);
    let noise = config.noise_scale * (distance * 0.01).min(MAX_NOISE_DISTANCE_FACTOR);

    let planned = (1..=steps)
        .map(|i| {
            let t = i as f32 / steps as f32;
            let (nx, ny) = gaussian_pair(rng);
            PlannedStep {
                position: cubic_bezier(start, c1, c2, target, t) + Vec2::new(nx, ny) * noise,
                delay: step_delay(config, rng),
            }
        })
        .collect();

    MovementPlan {
        start,
        target,
        control_points: [c1, c2],
        steps: planned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    #[test]
    fn test_bezier_endpoints() {
        let p0 = Vec2::new(0.0, 0.0);
        let p3 = Vec2::new(100.0, 50.0);
        let c = Vec2::new(30.0, 90.0);
        assert_eq!(cubic_bezier(p0, c, c, p3, 0.0), p0);
        assert_eq!(cubic_bezier(p0, c, c, p3, 1.0), p3);
    }

    #[test]
    fn test_gaussian_moments() {
        let mut rng = rng();
        let samples: Vec<f32> = (0..20_000)
            .flat_map(|_| {
                let (a, b) = gaussian_pair(&mut rng);
                [a, b]
            })
            .collect();
        let mean = samples.iter().sum::<f32>() / samples.len() as f32;
        let var = samples.iter().map(|s| (s - mean).powi(2)).sum::<f32>() / samples.len() as f32;
        assert!(mean.abs() < 0.05, "mean {}", mean);
        assert!((var - 1.0).abs() < 0.05, "variance {}", var);
    }

    #[test]
    fn test_control_points_on_perpendicular() {
        let mut rng = rng();
        let start = Vec2::new(0.0, 0.0);
        let target = Vec2::new(200.0, 0.0);
        for _ in 0..100 {
            for cp in control_points(start, target, &mut rng) {
                assert_eq!(cp.x, 100.0);
                // 20-100% of 200 / 4
                assert!(cp.y.abs() >= 10.0 - 1e-3 && cp.y.abs() <= 50.0 + 1e-3, "{}", cp.y);
            }
        }
    }

    #[test]
    fn test_step_count_respects_minimum() {
        let config = MouseMovementConfig::default();
        let mut rng = rng();
        for _ in 0..200 {
            assert!(step_count(100.0, &config, &mut rng) >= config.min_steps);
            assert!(step_count(0.0, &config, &mut rng) >= config.min_steps);
        }
    }

    #[test]
    fn test_step_count_grows_with_distance() {
        let config = MouseMovementConfig::default();
        let mut rng = rng();
        // 2000 px / 25 = 80 steps, +/- 12
        let steps = step_count(2000.0, &config, &mut rng);
        assert!((68..=92).contains(&steps), "{}", steps);
    }

    #[test]
    fn test_step_delay_floor() {
        let config = MouseMovementConfig { base_delay_ms: 0, ..MouseMovementConfig::default() };
        let mut rng = rng();
        for _ in 0..100 {
            assert!(step_delay(&config, &mut rng) >= MIN_STEP_DELAY);
        }
    }

    #[test]
    fn test_plan_ends_near_target() {
        let config = MouseMovementConfig::default();
        let mut rng = rng();
        let plan = plan_movement(Vec2::ZERO, Vec2::new(300.0, 200.0), &config, &mut rng);

        let last = plan.steps.last().unwrap().position;
        // Noise sigma = 2.0 * 2.0 here; allow a wide margin
        assert!(last.distance(plan.target) < 30.0, "{:?}", last);
        assert!(plan.steps.len() as u32 >= config.min_steps);
    }

    #[test]
    fn test_same_seed_same_plan() {
        let config = MouseMovementConfig::default();
        let a = plan_movement(Vec2::ZERO, Vec2::new(50.0, 80.0), &config, &mut rng());
        let b = plan_movement(Vec2::ZERO, Vec2::new(50.0, 80.0), &config, &mut rng());
        assert_eq!(a, b);
    }
}
