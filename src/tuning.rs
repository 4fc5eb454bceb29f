//! Data-driven game balance
//!
//! Every physics constant is expressed per fixed step (60 Hz). Timers are in
//! milliseconds of simulated time. Missing JSON fields fall back to defaults.

use serde::{Deserialize, Serialize};

use crate::consts::HEIGHT;
use crate::error::EngineError;
use crate::settings::DifficultyPreference;

/// Bird physics, per fixed step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Physics {
    /// Added to vertical velocity every non-flap step
    pub gravity: f32,
    /// Vertical velocity set by a flap (negative is up)
    pub flap_power: f32,
    /// Downward velocity cap
    pub terminal_velocity: f32,
    /// Fraction of velocity lost to drag every step
    pub air_resistance: f32,
    /// Random horizontal drift strength
    pub wind_strength: f32,
    pub flap_cooldown_ms: f32,
    /// Hitbox forgiveness, subtracted from each half extent
    pub hitbox_shrink: f32,
    /// Horizontal play margin the bird bounces off
    pub side_margin: f32,
}

impl Default for Physics {
    fn default() -> Self {
        Self {
            gravity: 0.25,
            flap_power: -6.0,
            terminal_velocity: 12.0,
            air_resistance: 0.02,
            wind_strength: 0.1,
            flap_cooldown_ms: 100.0,
            hitbox_shrink: 3.0,
            side_margin: 20.0,
        }
    }
}

/// Pipe and collectible spawning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Spawning {
    /// Horizontal scroll speed (px per step)
    pub pipe_speed: f32,
    /// Steps between spawns at difficulty 1.0
    pub pipe_spawn_interval: u32,
    /// Spawn interval floor
    pub min_spawn_interval: u32,
    pub pipe_gap: f32,
    pub pipe_width: f32,
    /// Minimum pipe length above and below the gap
    pub pipe_margin: f32,
    pub coin_chance: f32,
    /// Scaled by current difficulty
    pub power_up_chance: f32,
    /// Share of power-ups that are shields (the rest are double points)
    pub shield_share: f32,
    /// Scaled by current difficulty
    pub obstacle_chance: f32,
    pub obstacle_speed_factor: f32,
    /// Obstacle spin is uniform in `[-max, max)` rad per step
    pub obstacle_max_spin: f32,
}

impl Default for Spawning {
    fn default() -> Self {
        Self {
            pipe_speed: 1.5,
            pipe_spawn_interval: 180,
            min_spawn_interval: 120,
            pipe_gap: 200.0,
            pipe_width: 60.0,
            pipe_margin: 50.0,
            coin_chance: 0.5,
            power_up_chance: 0.1,
            shield_share: 0.7,
            obstacle_chance: 0.2,
            obstacle_speed_factor: 1.1,
            obstacle_max_spin: 0.005,
        }
    }
}

impl Spawning {
    /// Range `topHeight` is sampled from; keeps the whole gap on screen
    pub fn top_height_range(&self) -> (f32, f32) {
        let min_top = self.pipe_margin;
        let max_top = HEIGHT - self.pipe_gap - self.pipe_margin;
        (min_top, max_top)
    }
}

/// Timed power-up windows (ms)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerUpTuning {
    pub shield_ms: f32,
    pub double_points_ms: f32,
    pub combo_window_ms: f32,
}

impl Default for PowerUpTuning {
    fn default() -> Self {
        Self {
            shield_ms: 5000.0,
            double_points_ms: 10000.0,
            combo_window_ms: 3000.0,
        }
    }
}

/// Difficulty ramp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyTuning {
    /// Added to the multiplier per minute of game time
    pub increase_per_minute: f32,
    pub max: f32,
}

impl Default for DifficultyTuning {
    fn default() -> Self {
        Self {
            increase_per_minute: 0.001,
            max: 2.0,
        }
    }
}

/// All balance knobs
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub physics: Physics,
    pub spawning: Spawning,
    pub power_ups: PowerUpTuning,
    pub difficulty: DifficultyTuning,
}

impl Tuning {
    /// Parse a (possibly partial) JSON balance file
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let tuning: Tuning = serde_json::from_str(json)
            .map_err(|e| EngineError::InvalidConfig(format!("tuning: {}", e)))?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Apply the player's difficulty preference to the ramp
    pub fn with_preference(mut self, preference: DifficultyPreference) -> Self {
        self.difficulty.increase_per_minute *= preference.ramp_scale();
        self
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let s = &self.spawning;
        if s.pipe_spawn_interval == 0 || s.min_spawn_interval == 0 {
            return Err(EngineError::InvalidConfig(
                "spawn intervals must be positive".into(),
            ));
        }
        let (min_top, max_top) = s.top_height_range();
        if min_top < 0.0 || max_top < min_top {
            return Err(EngineError::InvalidConfig(format!(
                "pipe gap {} with margin {} does not fit the play field",
                s.pipe_gap, s.pipe_margin
            )));
        }
        if self.difficulty.max < 1.0 {
            return Err(EngineError::InvalidConfig(
                "max difficulty must be at least 1.0".into(),
            ));
        }
        if self.physics.hitbox_shrink < 0.0 {
            return Err(EngineError::InvalidConfig(
                "hitbox shrink cannot be negative".into(),
            ));
        }
        Ok(())
    }
}
