//! FlappyCrypto - an ETH-collecting flappy arcade game
//!
//! Core modules:
//! - `sim`: Deterministic building blocks (pools, spatial grid, tweens, particles)
//! - `game`: The game scene, bird and pooled entities
//! - `engine`: Fixed-timestep loop, scene switching, input and system registry
//! - `renderer`: 2D drawing surface contract (Canvas 2D on the web)
//! - `platform`: Browser/native platform abstraction (key/value storage)
//! - `tuning`: Data-driven game balance

pub mod audio;
pub mod engine;
pub mod error;
pub mod game;
pub mod ledger;
pub mod platform;
pub mod renderer;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use error::{EngineError, StorageError};
pub use ledger::{GameReport, ScoreLedger, SessionLedger};
pub use settings::{DifficultyPreference, QualityPreset, Settings};
pub use tuning::Tuning;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Logical play field size. Physics constants are tuned against it.
    pub const WIDTH: f32 = 400.0;
    pub const HEIGHT: f32 = 600.0;

    /// Fixed simulation timestep (60 Hz)
    pub const FIXED_STEP_MS: f32 = 1000.0 / 60.0;
    /// Largest frame delta fed into the accumulator (spiral-of-death guard)
    pub const MAX_DELTA_MS: f32 = 50.0;

    /// Spatial grid cell size
    pub const GRID_CELL: f32 = 64.0;

    /// Bird defaults
    pub const BIRD_WIDTH: f32 = 40.0;
    pub const BIRD_HEIGHT: f32 = 30.0;
    pub const BIRD_TRAIL_LENGTH: usize = 8;
    pub const BIRD_TRAIL_WINDOW_MS: f64 = 500.0;

    /// Collectible and obstacle sizes
    pub const COLLECTIBLE_SIZE: f32 = 30.0;
    pub const OBSTACLE_SIZE: f32 = 40.0;

    /// Storage keys
    pub const SETTINGS_KEY: &str = "flappyCrypto_settings";
    pub const GAME_STATE_KEY: &str = "flappyCrypto_gameState";
}

/// Uniform sample in `[range[0], range[1])`, tolerant of empty or inverted ranges
#[inline]
pub fn sample_range(rng: &mut impl rand::Rng, range: [f32; 2]) -> f32 {
    range[0] + rng.random::<f32>() * (range[1] - range[0])
}

/// Linear interpolation between two points
#[inline]
pub fn lerp_vec(a: Vec2, b: Vec2, t: f32) -> Vec2 {
    a + (b - a) * t
}
