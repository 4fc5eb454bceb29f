//! Game settings and preferences
//!
//! Persisted separately from the state store through [`Storage`].

use serde::{Deserialize, Serialize};

use crate::consts::SETTINGS_KEY;
use crate::error::StorageError;
use crate::platform::Storage;

/// Quality preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityPreset::Low => "Low",
            QualityPreset::Medium => "Medium",
            QualityPreset::High => "High",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(QualityPreset::Low),
            "medium" | "med" => Some(QualityPreset::Medium),
            "high" => Some(QualityPreset::High),
            _ => None,
        }
    }

    /// Maximum live particles for this preset
    pub fn max_particles(&self) -> usize {
        match self {
            QualityPreset::Low => 100,
            QualityPreset::Medium => 500,
            QualityPreset::High => 2000,
        }
    }

    /// Whether ambient background sparkles spawn
    pub fn ambient_sparkles(&self) -> bool {
        !matches!(self, QualityPreset::Low)
    }
}

/// How fast the difficulty ramps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DifficultyPreference {
    Relaxed,
    #[default]
    Normal,
    Hard,
}

impl DifficultyPreference {
    /// Multiplier on the per-minute difficulty increase
    pub fn ramp_scale(&self) -> f32 {
        match self {
            DifficultyPreference::Relaxed => 0.5,
            DifficultyPreference::Normal => 1.0,
            DifficultyPreference::Hard => 2.0,
        }
    }
}

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Graphics quality preset
    pub quality: QualityPreset,

    // === Visual Effects ===
    /// Particle effects (bursts, trails, sparkles)
    pub particles: bool,
    /// Bird trail ribbon
    pub trails: bool,

    // === HUD ===
    /// Show engine debug overlay (FPS, pools)
    pub show_debug: bool,

    // === Audio ===
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
    /// Sound effects volume (0.0 - 1.0)
    pub sfx_volume: f32,
    pub muted: bool,

    // === Gameplay ===
    pub difficulty: DifficultyPreference,

    // === Accessibility ===
    /// Reduced motion (no ambient sparkles, fewer particles)
    pub reduced_motion: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quality: QualityPreset::Medium,

            particles: true,
            trails: true,

            show_debug: false,

            master_volume: 0.8,
            sfx_volume: 1.0,
            muted: false,

            difficulty: DifficultyPreference::Normal,

            reduced_motion: false,
        }
    }
}

impl Settings {
    /// Create settings from a quality preset (applies preset defaults)
    pub fn from_preset(preset: QualityPreset) -> Self {
        let mut settings = Self::default();
        settings.apply_preset(preset);
        settings
    }

    /// Apply a quality preset (updates quality-dependent settings)
    pub fn apply_preset(&mut self, preset: QualityPreset) {
        self.quality = preset;

        // Low preset drops the cosmetic trail
        if preset == QualityPreset::Low {
            self.trails = false;
        }
    }

    /// Effective particle count cap
    pub fn max_particles(&self) -> usize {
        if !self.particles {
            0
        } else if self.reduced_motion {
            self.quality.max_particles() / 4
        } else {
            self.quality.max_particles()
        }
    }

    /// Effective ambient sparkles (respects reduced_motion)
    pub fn ambient_sparkles(&self) -> bool {
        self.particles && self.quality.ambient_sparkles() && !self.reduced_motion
    }

    /// Load settings, falling back to defaults on any problem
    pub fn load(storage: &dyn Storage) -> Self {
        match storage.get_item(SETTINGS_KEY) {
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings from storage");
                    return settings;
                }
                Err(e) => log::warn!("Ignoring corrupt settings: {}", e),
            },
            Ok(None) => {}
            Err(e) => log::warn!("Could not read settings: {}", e),
        }

        log::info!("Using default settings");
        Self::default()
    }

    pub fn save(&self, storage: &mut dyn Storage) -> Result<(), StorageError> {
        let json = serde_json::to_string(self)?;
        storage.set_item(SETTINGS_KEY, &json)?;
        log::info!("Settings saved");
        Ok(())
    }
}
