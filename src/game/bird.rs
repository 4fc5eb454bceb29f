//! The player's ETH bird
//!
//! Alive-idle / alive-cooldown / dead. All physics constants are per fixed
//! step; only timers (cooldown, trail window, air time) use milliseconds.

use std::collections::VecDeque;
use std::f32::consts::FRAC_PI_4;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::lerp_vec;
use crate::renderer::{Canvas, Color, CompositeMode, shapes};
use crate::sim::{Aabb, OrientedBox};
use crate::tuning::Physics;

const BODY_COLOR: Color = Color::hex(0x62c9ff);
const FACET_COLOR: Color = Color::hex(0x3ab0ff);
const BASE_GLOW: f32 = 0.4;
/// Cooldown remainders below this count as expired (f32 step rounding)
const COOLDOWN_EPSILON_MS: f32 = 1e-3;

/// Flight statistics reported at game over
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BirdStats {
    pub total_flaps: u32,
    pub air_time_ms: f64,
    /// Highest point reached, measured up from the floor
    pub best_altitude: f32,
    pub current_altitude: f32,
}

impl BirdStats {
    /// Average air time per flap
    pub fn ms_per_flap(&self) -> Option<f64> {
        (self.total_flaps > 0).then(|| self.air_time_ms / self.total_flaps as f64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailPoint {
    pub pos: Vec2,
    pub time_ms: f64,
}

#[derive(Debug, Clone)]
pub struct Bird {
    /// Top-left corner
    pub pos: Vec2,
    prev_pos: Vec2,
    pub size: Vec2,
    /// Vertical velocity, px per step (positive is down)
    pub velocity: f32,
    /// Horizontal wind drift, px per step
    pub drift: f32,
    pub rotation: f32,
    alive: bool,
    flapped_this_step: bool,
    cooldown_ms: f32,
    hitbox_shrink: f32,

    // Visual state
    scale: f32,
    target_scale: f32,
    glow: f32,
    glow_boost: f32,
    pulse_phase: f32,
    wing_phase: f32,
    trail: VecDeque<TrailPoint>,

    total_flaps: u32,
    air_time_ms: f64,
    min_y: f32,
}

impl Bird {
    pub fn new(physics: &Physics) -> Self {
        let pos = Vec2::new(WIDTH / 4.0, HEIGHT / 2.0);
        Self {
            pos,
            prev_pos: pos,
            size: Vec2::new(BIRD_WIDTH, BIRD_HEIGHT),
            velocity: 0.0,
            drift: 0.0,
            rotation: 0.0,
            alive: true,
            flapped_this_step: false,
            cooldown_ms: 0.0,
            hitbox_shrink: physics.hitbox_shrink,
            scale: 1.0,
            target_scale: 1.0,
            glow: BASE_GLOW,
            glow_boost: 0.0,
            pulse_phase: 0.0,
            wing_phase: 0.0,
            trail: VecDeque::with_capacity(BIRD_TRAIL_LENGTH + 1),
            total_flaps: 0,
            air_time_ms: 0.0,
            min_y: pos.y,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Kill the bird (hazard hit). Idempotent.
    pub fn kill(&mut self) {
        self.alive = false;
    }

    pub fn center(&self) -> Vec2 {
        self.pos + self.size * 0.5
    }

    pub fn glow(&self) -> f32 {
        self.glow
    }

    pub fn trail(&self) -> impl Iterator<Item = &TrailPoint> {
        self.trail.iter()
    }

    /// Upward impulse. No-op while dead or cooling down.
    pub fn flap(&mut self, physics: &Physics) -> bool {
        if !self.alive || self.cooldown_ms > 0.0 {
            return false;
        }
        self.velocity = physics.flap_power;
        self.flapped_this_step = true;
        self.cooldown_ms = physics.flap_cooldown_ms;
        self.target_scale = 1.2;
        self.boost_glow();
        self.total_flaps += 1;
        true
    }

    /// Brighten the glow; decays back to the idle pulse
    pub fn boost_glow(&mut self) {
        self.glow_boost = 1.0 - BASE_GLOW;
    }

    pub fn update(&mut self, physics: &Physics, dt_ms: f32, now_ms: f64, rng: &mut impl Rng) {
        if !self.alive {
            return;
        }
        self.prev_pos = self.pos;
        self.cooldown_ms -= dt_ms;
        if self.cooldown_ms <= COOLDOWN_EPSILON_MS {
            self.cooldown_ms = 0.0;
        }

        // Vertical: drag, then gravity (skipped on the flap step), then cap
        self.velocity *= 1.0 - physics.air_resistance;
        if !self.flapped_this_step {
            self.velocity += physics.gravity;
        }
        self.velocity = self.velocity.min(physics.terminal_velocity);
        self.pos.y += self.velocity;

        // Horizontal wind drift with soft wall bounce
        self.drift += (rng.random::<f32>() - 0.5) * physics.wind_strength;
        self.drift *= 0.95;
        self.pos.x += self.drift;
        let min_x = physics.side_margin;
        let max_x = WIDTH - self.size.x - physics.side_margin;
        if self.pos.x < min_x {
            self.pos.x = min_x;
            self.drift = self.drift.abs() * 0.5;
        }
        if self.pos.x > max_x {
            self.pos.x = max_x;
            self.drift = -self.drift.abs() * 0.5;
        }

        if self.pos.y <= 0.0 {
            self.pos.y = 0.0;
            self.velocity = self.velocity.max(0.0);
        }
        if self.pos.y + self.size.y > HEIGHT {
            self.pos.y = HEIGHT - self.size.y;
            self.alive = false;
            log::debug!("Bird hit the floor");
        }

        let target_rotation =
            (self.velocity * 0.06 + self.drift * 0.1).clamp(-FRAC_PI_4, FRAC_PI_4);
        self.rotation += (target_rotation - self.rotation) * 0.1;

        self.update_visuals();
        self.update_trail(now_ms);

        self.air_time_ms += dt_ms as f64;
        self.min_y = self.min_y.min(self.pos.y);
        self.flapped_this_step = false;
    }

    fn update_visuals(&mut self) {
        self.pulse_phase += 0.08;
        let target_glow = BASE_GLOW + 0.15 * self.pulse_phase.sin() + self.glow_boost;
        self.glow += (target_glow - self.glow) * 0.15;
        self.glow_boost *= 0.92;

        self.scale += (self.target_scale - self.scale) * 0.2;
        self.target_scale += (1.0 - self.target_scale) * 0.1;
        self.wing_phase += 0.3;
    }

    fn update_trail(&mut self, now_ms: f64) {
        self.trail.push_back(TrailPoint {
            pos: self.center(),
            time_ms: now_ms,
        });
        while self.trail.len() > BIRD_TRAIL_LENGTH {
            self.trail.pop_front();
        }
        while self
            .trail
            .front()
            .is_some_and(|p| now_ms - p.time_ms >= BIRD_TRAIL_WINDOW_MS)
        {
            self.trail.pop_front();
        }
    }

    /// Shrunk, rotated hitbox
    pub fn hitbox(&self) -> OrientedBox {
        OrientedBox {
            center: self.center(),
            half: (self.size * 0.5 - Vec2::splat(self.hitbox_shrink)).max(Vec2::ZERO),
            rotation: self.rotation,
        }
    }

    /// AABB of the rotated hitbox, for grid queries
    pub fn broad_phase_bounds(&self) -> Aabb {
        self.hitbox().bounds()
    }

    /// Rotation-aware test against another box
    pub fn check_collision(&self, other: &Aabb) -> bool {
        self.hitbox().hits(other)
    }

    pub fn stats(&self) -> BirdStats {
        BirdStats {
            total_flaps: self.total_flaps,
            air_time_ms: self.air_time_ms,
            best_altitude: HEIGHT - self.min_y,
            current_altitude: HEIGHT - self.pos.y,
        }
    }

    pub fn render(&self, canvas: &mut dyn Canvas, interpolation: f32, draw_trail: bool) {
        if draw_trail {
            self.render_trail(canvas);
        }

        let pos = lerp_vec(self.prev_pos, self.pos, interpolation.clamp(0.0, 1.0));
        let half = self.size * 0.5;
        let wing = self.wing_phase.sin() * 3.0;

        canvas.save();
        canvas.translate(pos + half);
        canvas.scale(self.scale);
        canvas.rotate(self.rotation);

        let glow = self.glow.clamp(0.0, 1.0);
        canvas.set_shadow(BODY_COLOR.with_alpha(glow), 20.0 + 20.0 * glow);

        let body = shapes::eth_diamond(half, wing);
        canvas.fill_polygon(&body, BODY_COLOR);
        canvas.fill_polygon(&shapes::eth_facet(half, wing), FACET_COLOR);
        canvas.stroke_polygon(&body, Color::WHITE.with_alpha(0.7 + 0.3 * glow), 2.0);

        if self.velocity.abs() > 5.0 {
            let streak = Color::WHITE.with_alpha(self.velocity.abs() / 15.0);
            for i in 0..3 {
                let offset = (i + 1) as f32 * 8.0;
                let y = -2.0 + i as f32 * 2.0;
                canvas.line(
                    Vec2::new(-half.x - offset, y),
                    Vec2::new(-half.x - offset - 10.0, y),
                    streak,
                    1.0,
                );
            }
        }
        canvas.restore();
    }

    fn render_trail(&self, canvas: &mut dyn Canvas) {
        let Some(newest) = self.trail.back() else {
            return;
        };
        canvas.save();
        canvas.set_composite(CompositeMode::Screen);
        for (prev, point) in self.trail.iter().zip(self.trail.iter().skip(1)) {
            let fade = shapes::trail_fade(newest.time_ms - point.time_ms, BIRD_TRAIL_WINDOW_MS);
            if fade <= 0.0 {
                continue;
            }
            canvas.line(prev.pos, point.pos, BODY_COLOR.with_alpha(fade * 0.3), fade * 3.0);
        }
        canvas.restore();
    }
}
