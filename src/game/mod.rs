//! FlappyCrypto gameplay: the bird, pooled entities and the game scene

mod bird;
mod entity;
mod scene;
mod state;

pub use bird::{Bird, BirdStats, TrailPoint};
pub use entity::{Entity, EntityKind, ObstacleLook, PipeGap};
pub use scene::{GAME_SCENE, GameScene, GridKey};
pub use state::{Combo, Difficulty, GameStats, PowerUps, ScenePhase, SceneState, TimedPowerUp};
