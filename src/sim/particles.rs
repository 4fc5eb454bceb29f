//! Particle system
//!
//! Visual only. Owns its own RNG so spawning effects never perturbs the
//! gameplay random stream. Particles live in one pool per kind.

use std::f32::consts::{PI, TAU};

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::pool::{Pool, PoolHandle, PoolStats, Poolable};
use crate::renderer::shapes;
use crate::renderer::{Canvas, Color, CompositeMode};
use crate::sample_range;

/// Particles further than this outside the field are culled
const CULL_MARGIN: f32 = 50.0;
/// Velocity kept per step
const AIR_RESISTANCE: f32 = 0.99;
const AMBIENT_SPARKLE_CHANCE: f32 = 0.02;
const TWINKLE_RATE: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParticleKind {
    #[default]
    Explosion,
    Trail,
    Sparkle,
    Collect,
    PowerUp,
}

impl ParticleKind {
    /// Render order
    pub const ALL: [ParticleKind; 5] = [
        ParticleKind::Explosion,
        ParticleKind::Trail,
        ParticleKind::Sparkle,
        ParticleKind::Collect,
        ParticleKind::PowerUp,
    ];

    fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ParticleKind::Explosion => "explosion",
            ParticleKind::Trail => "trail",
            ParticleKind::Sparkle => "sparkle",
            ParticleKind::Collect => "collect",
            ParticleKind::PowerUp => "powerup",
        }
    }

    fn initial_pool_size(self) -> usize {
        match self {
            ParticleKind::Explosion => 30,
            ParticleKind::Trail => 50,
            ParticleKind::Sparkle => 40,
            ParticleKind::Collect => 20,
            ParticleKind::PowerUp => 25,
        }
    }

    /// Preset used when the caller does not supply one
    pub fn default_preset(self) -> &'static EffectPreset {
        match self {
            ParticleKind::Explosion => &EffectPreset::EXPLOSION,
            ParticleKind::Trail => &EffectPreset::TRAIL,
            ParticleKind::Sparkle => &EffectPreset::SPARKLE,
            ParticleKind::Collect => &EffectPreset::COIN_COLLECT,
            ParticleKind::PowerUp => &EffectPreset::SHIELD_ACTIVATE,
        }
    }

    fn composite(self) -> CompositeMode {
        match self {
            ParticleKind::Sparkle | ParticleKind::Trail => CompositeMode::Lighter,
            _ => CompositeMode::SourceOver,
        }
    }

    fn glows(self) -> bool {
        matches!(self, ParticleKind::Collect | ParticleKind::PowerUp)
    }
}

/// Effect recipe. Ranges are `[min, max]`, angles in radians, life in ms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectPreset {
    pub count: u32,
    pub speed: [f32; 2],
    pub size: [f32; 2],
    pub life_ms: [f32; 2],
    pub colors: &'static [Color],
    pub gravity: f32,
    /// Emission cone centered on +x
    pub spread: f32,
}

impl EffectPreset {
    pub const COIN_COLLECT: EffectPreset = EffectPreset {
        count: 8,
        speed: [1.0, 3.0],
        size: [2.0, 6.0],
        life_ms: [500.0, 1000.0],
        colors: &[Color::hex(0x62ffbd), Color::hex(0x4ad8a0), Color::WHITE],
        gravity: -0.05,
        spread: PI,
    };

    pub const SHIELD_ACTIVATE: EffectPreset = EffectPreset {
        count: 12,
        speed: [2.0, 5.0],
        size: [3.0, 8.0],
        life_ms: [800.0, 1500.0],
        colors: &[Color::hex(0x4d79ff), Color::hex(0x62c9ff), Color::WHITE],
        gravity: 0.0,
        spread: TAU,
    };

    pub const EXPLOSION: EffectPreset = EffectPreset {
        count: 15,
        speed: [3.0, 8.0],
        size: [2.0, 10.0],
        life_ms: [600.0, 1200.0],
        colors: &[Color::hex(0xff6b6b), Color::hex(0xff9f43), Color::WHITE],
        gravity: 0.05,
        spread: TAU,
    };

    pub const TRAIL: EffectPreset = EffectPreset {
        count: 1,
        speed: [0.0, 0.0],
        size: [1.0, 3.0],
        life_ms: [300.0, 600.0],
        colors: &[Color::hex(0x62c9ff)],
        gravity: 0.0,
        spread: 0.0,
    };

    pub const SPARKLE: EffectPreset = EffectPreset {
        count: 6,
        speed: [0.5, 2.0],
        size: [1.0, 3.0],
        life_ms: [800.0, 1600.0],
        colors: &[Color::WHITE, Color::hex(0xffaa00)],
        gravity: 0.0,
        spread: TAU,
    };
}

#[derive(Debug, Clone, Default)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub size: f32,
    pub life: f32,
    pub max_life: f32,
    pub color: Color,
    pub alpha: f32,
    pub gravity: f32,
    pub kind: ParticleKind,
    pub twinkle: f32,
    /// Spawn sequence number, used to find the oldest particles
    born: u64,
}

impl Poolable for Particle {
    fn reset(&mut self) {
        *self = Particle::default();
    }
}

impl Particle {
    /// Advance one step. Returns false once the particle should be recycled.
    fn step(&mut self, dt_ms: f32, field: Vec2) -> bool {
        self.vel.y += self.gravity;
        self.vel *= AIR_RESISTANCE;
        self.pos += self.vel;

        self.life -= dt_ms;
        self.alpha = if self.max_life > 0.0 {
            (self.life / self.max_life).max(0.0)
        } else {
            0.0
        };
        if self.kind == ParticleKind::Sparkle {
            self.twinkle += TWINKLE_RATE;
            self.alpha *= 0.5 + 0.5 * self.twinkle.sin();
        }

        let out_of_bounds = self.pos.x < -CULL_MARGIN
            || self.pos.x > field.x + CULL_MARGIN
            || self.pos.y < -CULL_MARGIN
            || self.pos.y > field.y + CULL_MARGIN;

        self.life > 0.0 && self.alpha > 0.0 && !out_of_bounds
    }
}

/// Per-kind pool statistics plus the live total
#[derive(Debug, Clone)]
pub struct ParticleStats {
    pub active: usize,
    pub pools: Vec<(ParticleKind, PoolStats)>,
}

pub struct ParticleSystem {
    field: Vec2,
    pools: [Pool<Particle>; 5],
    rng: Pcg32,
    max_particles: usize,
    ambient_sparkles: bool,
    spawned: u64,
}

impl ParticleSystem {
    pub fn new(field: Vec2, seed: u64) -> Self {
        Self {
            field,
            pools: ParticleKind::ALL.map(|kind| Pool::new(kind.initial_pool_size())),
            rng: Pcg32::seed_from_u64(seed),
            max_particles: usize::MAX,
            ambient_sparkles: true,
            spawned: 0,
        }
    }

    /// Cap on live particles; spawns beyond it are dropped
    pub fn set_max_particles(&mut self, max: usize) {
        self.max_particles = max;
    }

    pub fn set_ambient_sparkles(&mut self, enabled: bool) {
        self.ambient_sparkles = enabled;
    }

    pub fn active_count(&self) -> usize {
        self.pools.iter().map(Pool::active_len).sum()
    }

    fn spawn(&mut self, particle: Particle) -> bool {
        if self.active_count() >= self.max_particles {
            return false;
        }
        let pool = &mut self.pools[particle.kind.index()];
        let handle = pool.acquire();
        if let Some(slot) = pool.get_mut(handle) {
            *slot = Particle {
                born: self.spawned,
                alpha: 1.0,
                ..particle
            };
        }
        self.spawned += 1;
        true
    }

    /// Burst of `count` particles from `preset` (or the kind's default).
    /// Returns how many were spawned.
    pub fn create_effect(&mut self, kind: ParticleKind, pos: Vec2, preset: Option<&EffectPreset>) -> usize {
        let preset = *preset.unwrap_or_else(|| kind.default_preset());
        let mut spawned = 0;
        for _ in 0..preset.count {
            let angle = self.rng.random::<f32>() * preset.spread - preset.spread / 2.0;
            let speed = sample_range(&mut self.rng, preset.speed);
            let size = sample_range(&mut self.rng, preset.size);
            let life = sample_range(&mut self.rng, preset.life_ms);
            let color = if preset.colors.is_empty() {
                Color::WHITE
            } else {
                preset.colors[self.rng.random_range(0..preset.colors.len())]
            };
            let twinkle = if kind == ParticleKind::Sparkle {
                self.rng.random::<f32>() * TAU
            } else {
                0.0
            };

            let particle = Particle {
                pos,
                vel: Vec2::from_angle(angle) * speed,
                size,
                life,
                max_life: life,
                color,
                gravity: preset.gravity,
                kind,
                twinkle,
                ..Default::default()
            };
            if self.spawn(particle) {
                spawned += 1;
            }
        }
        spawned
    }

    /// Probabilistic single trail particle (30% x intensity per call)
    pub fn create_trail(&mut self, pos: Vec2, vel: Vec2, color: Color, intensity: f32) -> bool {
        if self.rng.random::<f32>() >= 0.3 * intensity {
            return false;
        }
        let jitter = Vec2::new(
            (self.rng.random::<f32>() - 0.5) * 10.0,
            (self.rng.random::<f32>() - 0.5) * 10.0,
        );
        let drift = Vec2::new(
            (self.rng.random::<f32>() - 0.5) * 2.0,
            (self.rng.random::<f32>() - 0.5) * 2.0,
        );
        let size = 1.0 + self.rng.random::<f32>() * 2.0;
        let life = 300.0 + self.rng.random::<f32>() * 300.0;
        self.spawn(Particle {
            pos: pos + jitter,
            vel: vel * 0.1 + drift,
            size,
            life,
            max_life: life,
            color,
            kind: ParticleKind::Trail,
            ..Default::default()
        })
    }

    fn maybe_spawn_ambient_sparkle(&mut self) {
        if !self.ambient_sparkles || self.rng.random::<f32>() >= AMBIENT_SPARKLE_CHANCE {
            return;
        }
        let pos = Vec2::new(
            self.rng.random::<f32>() * self.field.x,
            self.rng.random::<f32>() * self.field.y,
        );
        let size = 0.5 + self.rng.random::<f32>() * 1.5;
        let life = 1000.0 + self.rng.random::<f32>() * 2000.0;
        let twinkle = self.rng.random::<f32>() * TAU;
        self.spawn(Particle {
            pos,
            size,
            life,
            max_life: life,
            color: Color::WHITE,
            kind: ParticleKind::Sparkle,
            twinkle,
            ..Default::default()
        });
    }

    pub fn update(&mut self, dt_ms: f32) {
        let field = self.field;
        for pool in &mut self.pools {
            pool.retain_active(|p| p.step(dt_ms, field));
        }
        self.maybe_spawn_ambient_sparkle();
    }

    /// Kill the oldest `fraction` of live particles. Returns how many.
    pub fn reduce(&mut self, fraction: f32) -> usize {
        let mut live: Vec<(u64, usize, PoolHandle)> = self
            .pools
            .iter()
            .enumerate()
            .flat_map(|(kind, pool)| pool.iter().map(move |(h, p)| (p.born, kind, h)))
            .collect();
        let count = (live.len() as f32 * fraction.clamp(0.0, 1.0)).floor() as usize;
        live.sort_unstable_by_key(|(born, _, _)| *born);
        for &(_, kind, handle) in live.iter().take(count) {
            self.pools[kind].release(handle);
        }
        count
    }

    pub fn render(&self, canvas: &mut dyn Canvas) {
        for kind in ParticleKind::ALL {
            let pool = &self.pools[kind.index()];
            if pool.active_len() == 0 {
                continue;
            }
            canvas.save();
            canvas.set_composite(kind.composite());
            for (_, p) in pool.iter() {
                canvas.save();
                canvas.set_alpha(p.alpha);
                if kind.glows() {
                    canvas.set_shadow(p.color, p.size * 2.0);
                }
                if kind == ParticleKind::Sparkle {
                    shapes::cross(canvas, p.pos, p.size, p.color);
                } else {
                    canvas.fill_circle(p.pos, p.size, p.color);
                }
                canvas.restore();
            }
            canvas.restore();
        }
    }

    pub fn clear(&mut self) {
        for pool in &mut self.pools {
            let handles: Vec<PoolHandle> = pool.handles().to_vec();
            pool.release_all(handles);
        }
    }

    pub fn optimize(&mut self) {
        for pool in &mut self.pools {
            pool.optimize();
        }
    }

    pub fn stats(&self) -> ParticleStats {
        ParticleStats {
            active: self.active_count(),
            pools: ParticleKind::ALL
                .iter()
                .map(|&kind| (kind, self.pools[kind.index()].stats()))
                .collect(),
        }
    }

    /// Live particles of one kind
    pub fn iter_kind(&self, kind: ParticleKind) -> impl Iterator<Item = &Particle> {
        self.pools[kind.index()].iter().map(|(_, p)| p)
    }
}

impl crate::engine::System for ParticleSystem {
    fn update(&mut self, dt_ms: f32) {
        ParticleSystem::update(self, dt_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{FIXED_STEP_MS, HEIGHT, WIDTH};
    use crate::renderer::{DrawCommand, DrawList};

    fn system() -> ParticleSystem {
        let mut ps = ParticleSystem::new(Vec2::new(WIDTH, HEIGHT), 7);
        ps.set_ambient_sparkles(false);
        ps
    }

    #[test]
    fn test_create_effect_uses_default_preset() {
        let mut ps = system();
        let n = ps.create_effect(ParticleKind::Collect, Vec2::new(200.0, 300.0), None);
        assert_eq!(n, 8);
        assert_eq!(ps.active_count(), 8);
        for p in ps.iter_kind(ParticleKind::Collect) {
            assert_eq!(p.gravity, -0.05);
            assert!(p.life >= 500.0 && p.life <= 1000.0);
            assert!(p.size >= 2.0 && p.size <= 6.0);
        }
    }

    #[test]
    fn test_custom_preset_override() {
        let mut ps = system();
        let burst = EffectPreset {
            count: 25,
            speed: [3.0, 10.0],
            ..EffectPreset::EXPLOSION
        };
        assert_eq!(ps.create_effect(ParticleKind::Explosion, Vec2::ZERO, Some(&burst)), 25);
    }

    #[test]
    fn test_particles_expire_and_return_to_pool() {
        let mut ps = system();
        ps.create_effect(ParticleKind::Explosion, Vec2::new(200.0, 300.0), None);
        let free_before = ps.stats().pools[0].1.free;
        // Longest life is 1200 ms
        for _ in 0..80 {
            ps.update(FIXED_STEP_MS);
        }
        assert_eq!(ps.active_count(), 0);
        assert_eq!(ps.stats().pools[0].1.free, free_before + 15);
    }

    #[test]
    fn test_alpha_tracks_life() {
        let mut ps = system();
        let preset = EffectPreset {
            count: 1,
            life_ms: [1000.0, 1000.0],
            speed: [0.0, 0.0],
            ..EffectPreset::EXPLOSION
        };
        ps.create_effect(ParticleKind::Explosion, Vec2::new(100.0, 100.0), Some(&preset));
        ps.update(250.0);
        let p = ps.iter_kind(ParticleKind::Explosion).next().unwrap();
        assert!((p.alpha - 0.75).abs() < 1e-5);
    }

    #[test]
    fn test_out_of_bounds_culled() {
        let mut ps = system();
        ps.create_effect(ParticleKind::Collect, Vec2::new(-60.0, 300.0), None);
        ps.update(FIXED_STEP_MS);
        // Speeds are at most 3 px/step, none can get back inside the margin
        assert_eq!(ps.active_count(), 0);
    }

    #[test]
    fn test_trail_probability_zero_intensity() {
        let mut ps = system();
        for _ in 0..100 {
            assert!(!ps.create_trail(Vec2::ZERO, Vec2::ZERO, Color::WHITE, 0.0));
        }
    }

    #[test]
    fn test_budget_caps_spawns() {
        let mut ps = system();
        ps.set_max_particles(10);
        ps.create_effect(ParticleKind::Explosion, Vec2::new(100.0, 100.0), None);
        assert_eq!(ps.active_count(), 10);
    }

    #[test]
    fn test_reduce_kills_oldest() {
        let mut ps = system();
        ps.create_effect(ParticleKind::Collect, Vec2::new(100.0, 100.0), None);
        ps.create_effect(ParticleKind::Explosion, Vec2::new(100.0, 100.0), None);
        let killed = ps.reduce(0.25);
        assert_eq!(killed, 5);
        // The 8 collect particles were spawned first
        assert_eq!(ps.iter_kind(ParticleKind::Collect).count(), 3);
        assert_eq!(ps.iter_kind(ParticleKind::Explosion).count(), 15);
    }

    #[test]
    fn test_render_groups_and_blends() {
        let mut ps = system();
        ps.create_effect(ParticleKind::Sparkle, Vec2::new(100.0, 100.0), None);
        ps.create_effect(ParticleKind::Collect, Vec2::new(100.0, 100.0), None);
        let mut list = DrawList::new(WIDTH, HEIGHT);
        ps.render(&mut list);

        assert_eq!(
            list.count(|c| matches!(c, DrawCommand::Composite(CompositeMode::Lighter))),
            1
        );
        // Sparkles are crosses (2 rects each), collects are glowing circles
        assert_eq!(list.count(|c| matches!(c, DrawCommand::Rect { .. })), 12);
        assert_eq!(list.count(|c| matches!(c, DrawCommand::Circle { .. })), 8);
        assert_eq!(list.count(|c| matches!(c, DrawCommand::Shadow { .. })), 8);
    }

    #[test]
    fn test_same_seed_same_particles() {
        let mut a = system();
        let mut b = system();
        a.create_effect(ParticleKind::Explosion, Vec2::ZERO, None);
        b.create_effect(ParticleKind::Explosion, Vec2::ZERO, None);
        let va: Vec<Vec2> = a.iter_kind(ParticleKind::Explosion).map(|p| p.vel).collect();
        let vb: Vec<Vec2> = b.iter_kind(ParticleKind::Explosion).map(|p| p.vel).collect();
        assert_eq!(va, vb);
    }
}
