//! Engine-level free entities
//!
//! Short-lived objects owned by the engine rather than a scene, such as the
//! floating combo labels.

use glam::Vec2;

use crate::renderer::{Canvas, Color, TextAlign};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

pub trait EngineEntity {
    fn update(&mut self, dt_ms: f32);
    fn render(&self, canvas: &mut dyn Canvas);
    /// Inactive entities are dropped after the update pass
    fn is_active(&self) -> bool;
    fn tag(&self) -> &str {
        "entity"
    }
}

const FLOAT_LIFE_MS: f32 = 1000.0;
/// Rise speed, px per ms
const FLOAT_RISE: f32 = 0.05;

/// Label that rises and fades out over one second
#[derive(Debug, Clone, PartialEq)]
pub struct FloatingText {
    pub text: String,
    pub pos: Vec2,
    pub color: Color,
    life_ms: f32,
}

impl FloatingText {
    pub fn new(text: impl Into<String>, pos: Vec2, color: Color) -> Self {
        Self {
            text: text.into(),
            pos,
            color,
            life_ms: FLOAT_LIFE_MS,
        }
    }

    pub fn alpha(&self) -> f32 {
        (self.life_ms / FLOAT_LIFE_MS).clamp(0.0, 1.0)
    }
}

impl EngineEntity for FloatingText {
    fn update(&mut self, dt_ms: f32) {
        self.life_ms -= dt_ms;
        self.pos.y -= FLOAT_RISE * dt_ms;
    }

    fn render(&self, canvas: &mut dyn Canvas) {
        let alpha = self.alpha();
        canvas.save();
        canvas.set_shadow(self.color.with_alpha(alpha), 8.0);
        canvas.text(
            &self.text,
            self.pos,
            20.0,
            self.color.with_alpha(alpha),
            TextAlign::Center,
        );
        canvas.restore();
    }

    fn is_active(&self) -> bool {
        self.life_ms > 0.0
    }

    fn tag(&self) -> &str {
        "floating_text"
    }
}
