//! Scene state: phase, power-up and combo timers, difficulty and run stats
//!
//! Only [`super::GameScene`] mutates these; the HUD reads them.

use crate::tuning::{DifficultyTuning, PowerUpTuning};

/// Scene lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScenePhase {
    #[default]
    Inactive,
    Running,
    Paused,
    Ended,
}

/// A power-up with a countdown
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedPowerUp {
    pub active: bool,
    pub time_left_ms: f32,
    pub duration_ms: f32,
}

impl TimedPowerUp {
    pub fn new(duration_ms: f32) -> Self {
        Self {
            active: false,
            time_left_ms: 0.0,
            duration_ms,
        }
    }

    /// Activate, or restart the countdown if already active
    pub fn activate(&mut self) {
        self.active = true;
        self.time_left_ms = self.duration_ms;
    }

    /// Count down. Returns true on the tick it expires.
    pub fn tick(&mut self, dt_ms: f32) -> bool {
        if !self.active {
            return false;
        }
        self.time_left_ms -= dt_ms;
        if self.time_left_ms <= 0.0 {
            self.active = false;
            self.time_left_ms = 0.0;
            return true;
        }
        false
    }

    /// Remaining share of the window, for HUD bars
    pub fn fraction_left(&self) -> f32 {
        if !self.active || self.duration_ms <= 0.0 {
            return 0.0;
        }
        (self.time_left_ms / self.duration_ms).clamp(0.0, 1.0)
    }
}

/// Coin streak within a rolling window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Combo {
    pub count: u32,
    pub time_left_ms: f32,
    pub window_ms: f32,
}

impl Combo {
    pub fn new(window_ms: f32) -> Self {
        Self {
            count: 0,
            time_left_ms: 0.0,
            window_ms,
        }
    }

    /// Count a pickup and refill the window. Returns the bonus it earned.
    pub fn register(&mut self) -> u32 {
        self.count += 1;
        self.time_left_ms = self.window_ms;
        self.bonus()
    }

    /// No bonus for the first coin of a streak
    pub fn bonus(&self) -> u32 {
        self.count.saturating_sub(1)
    }

    /// Count down while a streak is live. Returns true on the tick it breaks.
    pub fn tick(&mut self, dt_ms: f32) -> bool {
        if self.count == 0 {
            return false;
        }
        self.time_left_ms -= dt_ms;
        if self.time_left_ms <= 0.0 {
            self.reset();
            return true;
        }
        false
    }

    pub fn reset(&mut self) {
        self.count = 0;
        self.time_left_ms = 0.0;
    }

    pub fn fraction_left(&self) -> f32 {
        if self.count == 0 || self.window_ms <= 0.0 {
            return 0.0;
        }
        (self.time_left_ms / self.window_ms).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerUps {
    pub shield: TimedPowerUp,
    pub double_points: TimedPowerUp,
    pub combo: Combo,
}

impl PowerUps {
    pub fn new(tuning: &PowerUpTuning) -> Self {
        Self {
            shield: TimedPowerUp::new(tuning.shield_ms),
            double_points: TimedPowerUp::new(tuning.double_points_ms),
            combo: Combo::new(tuning.combo_window_ms),
        }
    }

    /// Score multiplier from double points
    pub fn multiplier(&self) -> u64 {
        if self.double_points.active { 2 } else { 1 }
    }
}

/// Time-based difficulty ramp
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Difficulty {
    pub current: f32,
    pub increase_per_minute: f32,
    pub max: f32,
}

impl Difficulty {
    pub fn new(tuning: &DifficultyTuning) -> Self {
        Self {
            current: 1.0,
            increase_per_minute: tuning.increase_per_minute,
            max: tuning.max,
        }
    }

    pub fn recompute(&mut self, game_time_ms: f64) {
        let minutes = (game_time_ms / 60_000.0) as f32;
        self.current = (1.0 + minutes * self.increase_per_minute).min(self.max);
    }

    /// Steps between spawns at the current difficulty
    pub fn spawn_interval(&self, base: u32, floor: u32) -> u32 {
        let scaled = (base as f32 / self.current.max(f32::EPSILON)).round() as u32;
        scaled.max(floor)
    }
}

/// Counters for one run
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GameStats {
    pub score: u64,
    pub eth_collected: u32,
    pub distance: f32,
    /// Simulated milliseconds since the run started
    pub game_time_ms: f64,
    pub frame_count: u64,
    pub frames_since_spawn: u32,
}

/// Everything the scene tracks besides entities
#[derive(Debug, Clone, PartialEq)]
pub struct SceneState {
    pub phase: ScenePhase,
    pub stats: GameStats,
    pub power_ups: PowerUps,
    pub difficulty: Difficulty,
}

impl SceneState {
    pub fn new(power_ups: &PowerUpTuning, difficulty: &DifficultyTuning) -> Self {
        Self {
            phase: ScenePhase::Inactive,
            stats: GameStats::default(),
            power_ups: PowerUps::new(power_ups),
            difficulty: Difficulty::new(difficulty),
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase == ScenePhase::Running
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::FIXED_STEP_MS;

    #[test]
    fn test_power_up_expires_exactly_once() {
        let mut shield = TimedPowerUp::new(40.0);
        assert!(!shield.tick(10.0));
        shield.activate();
        assert!(!shield.tick(FIXED_STEP_MS));
        assert!(!shield.tick(FIXED_STEP_MS));
        assert!(shield.tick(FIXED_STEP_MS));
        assert!(!shield.active);
        assert!(!shield.tick(FIXED_STEP_MS));
    }

    #[test]
    fn test_reactivation_resets_timer() {
        let mut double = TimedPowerUp::new(10_000.0);
        double.activate();
        double.tick(4000.0);
        assert_eq!(double.time_left_ms, 6000.0);
        double.activate();
        assert_eq!(double.time_left_ms, 10_000.0);
        assert_eq!(double.fraction_left(), 1.0);
    }

    #[test]
    fn test_combo_bonuses() {
        let mut combo = Combo::new(3000.0);
        assert_eq!(combo.register(), 0);
        combo.tick(1000.0);
        assert_eq!(combo.register(), 1);
        combo.tick(2500.0);
        assert_eq!(combo.register(), 2);
        assert_eq!(combo.time_left_ms, 3000.0);
    }

    #[test]
    fn test_combo_timer_decreases_then_resets() {
        let mut combo = Combo::new(3000.0);
        combo.register();
        let mut last = combo.time_left_ms;
        let mut broke = false;
        for _ in 0..200 {
            if combo.tick(FIXED_STEP_MS) {
                broke = true;
                break;
            }
            assert!(combo.time_left_ms < last);
            last = combo.time_left_ms;
        }
        assert!(broke);
        assert_eq!(combo.count, 0);
        assert_eq!(combo.bonus(), 0);
    }

    #[test]
    fn test_difficulty_ramp_and_cap() {
        let mut difficulty = Difficulty::new(&DifficultyTuning::default());
        difficulty.recompute(60_000.0);
        assert!((difficulty.current - 1.001).abs() < 1e-6);

        let mut steep = Difficulty::new(&DifficultyTuning {
            increase_per_minute: 1.0,
            max: 2.0,
        });
        steep.recompute(10.0 * 60_000.0);
        assert_eq!(steep.current, 2.0);
        assert_eq!(steep.spawn_interval(180, 120), 120);
    }

    #[test]
    fn test_spawn_interval_rounds() {
        let mut difficulty = Difficulty::new(&DifficultyTuning::default());
        difficulty.recompute(3000.0);
        assert_eq!(difficulty.spawn_interval(180, 120), 180);
    }
}
