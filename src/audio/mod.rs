//! Sound triggers
//!
//! The game core only names sounds; synthesis lives behind [`SoundSink`].
//! On the web the sink is a procedural Web Audio manager.

#[cfg(target_arch = "wasm32")]
mod web;

#[cfg(target_arch = "wasm32")]
pub use web::AudioManager;

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sfx {
    /// Bird flap
    Flap,
    /// Coin picked up
    Collect,
    /// Power-up picked up / game start cue
    PowerUp,
    /// Hazard hit or floor breach
    Collision,
    /// Shield activated
    Shield,
}

impl Sfx {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sfx::Flap => "flap",
            Sfx::Collect => "collect",
            Sfx::PowerUp => "powerup",
            Sfx::Collision => "collision",
            Sfx::Shield => "shield",
        }
    }
}

/// Per-trigger playback options
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SfxOptions {
    /// Frequency multiplier
    pub pitch: f32,
    /// Gain multiplier (0.0 - 1.0)
    pub volume: f32,
}

impl Default for SfxOptions {
    fn default() -> Self {
        Self {
            pitch: 1.0,
            volume: 1.0,
        }
    }
}

impl SfxOptions {
    pub fn pitch(pitch: f32) -> Self {
        Self {
            pitch,
            ..Default::default()
        }
    }

    pub fn volume(volume: f32) -> Self {
        Self {
            volume,
            ..Default::default()
        }
    }
}

/// Fire-and-forget sound trigger
pub trait SoundSink {
    fn play_sfx(&mut self, sfx: Sfx, options: SfxOptions);
}

/// Silent sink (native builds, tests)
#[derive(Debug, Default)]
pub struct NullSound;

impl SoundSink for NullSound {
    fn play_sfx(&mut self, sfx: Sfx, options: SfxOptions) {
        log::trace!("sfx {} (pitch {:.2}, volume {:.2})", sfx.as_str(), options.pitch, options.volume);
    }
}
