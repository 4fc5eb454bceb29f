//! Side effects queued by scenes during a fixed step
//!
//! The engine drains the queue after every update, so scenes never touch
//! the sound sink, the ledger or the entity list directly.

use glam::Vec2;

use crate::audio::{Sfx, SfxOptions};
use crate::ledger::GameReport;
use crate::renderer::Color;

#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// Fire-and-forget sound trigger
    Sound(Sfx, SfxOptions),
    /// Run ended; handed to the score ledger once
    GameOver(GameReport),
    /// Short-lived rising label
    FloatingText { text: String, pos: Vec2, color: Color },
    ToggleDebug,
    /// Re-enter the current scene
    Restart,
}
