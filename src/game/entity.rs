//! Pooled scrolling entities: pipes, coins, obstacles and power-ups
//!
//! One homogeneous [`Entity`] struct lives in each scene pool; behavior
//! dispatches on [`EntityKind`].

use glam::Vec2;
use rand::Rng;

use crate::consts::*;
use crate::lerp_vec;
use crate::renderer::{Canvas, Color, TextAlign, shapes};
use crate::sim::{Aabb, Poolable};
use crate::tuning::Spawning;

use super::Bird;

const PIPE_COLOR: Color = Color::hex(0xff4d4d);
const PIPE_SHADE: Color = Color::hex(0xcc0000);
const PIPE_CAP: Color = Color::hex(0xff6666);
const PIPE_STRIPE: Color = Color::hex(0x990000);
const COIN_COLOR: Color = Color::hex(0x62ffbd);
const SHIELD_COLOR: Color = Color::hex(0x4d79ff);
const DOUBLE_COLOR: Color = Color::hex(0xff3366);
const BEAR_COLOR: Color = Color::hex(0xff6b6b);

/// Vertical layout of a pipe pair
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PipeGap {
    pub top_height: f32,
    pub bottom_y: f32,
    pub bottom_height: f32,
    /// Bird has flown past it
    pub passed: bool,
}

impl PipeGap {
    pub fn new(top_height: f32, gap: f32) -> Self {
        let bottom_y = top_height + gap;
        Self {
            top_height,
            bottom_y,
            bottom_height: HEIGHT - bottom_y,
            passed: false,
        }
    }
}

/// Cosmetic obstacle variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObstacleLook {
    #[default]
    Bear,
    Bug,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum EntityKind {
    Pipe(PipeGap),
    #[default]
    Coin,
    Obstacle(ObstacleLook),
    Shield,
    DoublePoints,
}

impl EntityKind {
    /// Contact ends the game unless shielded
    pub fn is_hazard(&self) -> bool {
        matches!(self, EntityKind::Pipe(_) | EntityKind::Obstacle(_))
    }

    /// Cosmetic spin per step for collectibles
    fn spin(&self) -> f32 {
        match self {
            EntityKind::Coin => 0.03,
            EntityKind::Shield => 0.02,
            EntityKind::DoublePoints => 0.04,
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Entity {
    pub kind: EntityKind,
    /// Top-left corner
    pub pos: Vec2,
    prev_pos: Vec2,
    pub size: Vec2,
    /// Scroll speed, px per step
    pub speed: f32,
    pub rotation: f32,
    /// Rotation per step
    pub spin: f32,
    oscillation: f32,
    /// One-way pickup flag
    pub collected: bool,
}

impl Poolable for Entity {
    fn reset(&mut self) {
        *self = Self::default();
    }
}

impl Entity {
    fn place(&mut self, kind: EntityKind, pos: Vec2, size: Vec2, speed: f32) {
        *self = Self {
            kind,
            pos,
            prev_pos: pos,
            size,
            speed,
            spin: kind.spin(),
            ..Default::default()
        };
    }

    /// New pipe pair at the right edge with a uniformly sampled gap
    pub fn init_pipe(&mut self, spawning: &Spawning, rng: &mut impl Rng) {
        let (min_top, max_top) = spawning.top_height_range();
        let top = min_top + rng.random::<f32>() * (max_top - min_top);
        self.init_pipe_at(spawning, top);
    }

    pub fn init_pipe_at(&mut self, spawning: &Spawning, top_height: f32) {
        self.place(
            EntityKind::Pipe(PipeGap::new(top_height, spawning.pipe_gap)),
            Vec2::new(WIDTH, 0.0),
            Vec2::new(spawning.pipe_width, HEIGHT),
            spawning.pipe_speed,
        );
    }

    /// Coin or power-up at a random height on the right edge
    pub fn init_collectible(&mut self, kind: EntityKind, spawning: &Spawning, rng: &mut impl Rng) {
        let y = rng.random::<f32>() * (HEIGHT - 100.0) + 50.0;
        self.place(
            kind,
            Vec2::new(WIDTH, y),
            Vec2::splat(COLLECTIBLE_SIZE),
            spawning.pipe_speed,
        );
    }

    pub fn init_obstacle(&mut self, spawning: &Spawning, rng: &mut impl Rng) {
        let y = rng.random::<f32>() * (HEIGHT - 100.0) + 50.0;
        let look = if rng.random::<f32>() < 0.5 {
            ObstacleLook::Bear
        } else {
            ObstacleLook::Bug
        };
        let spin = (rng.random::<f32>() - 0.5) * 2.0 * spawning.obstacle_max_spin;
        self.place(
            EntityKind::Obstacle(look),
            Vec2::new(WIDTH, y),
            Vec2::splat(OBSTACLE_SIZE),
            spawning.pipe_speed * spawning.obstacle_speed_factor,
        );
        self.spin = spin;
    }

    pub fn update(&mut self) {
        self.prev_pos = self.pos;
        self.pos.x -= self.speed;
        self.rotation += self.spin;
        if matches!(
            self.kind,
            EntityKind::Coin | EntityKind::Shield | EntityKind::DoublePoints
        ) {
            self.oscillation += 0.03;
            self.pos.y += self.oscillation.sin() * 0.5;
        }
    }

    pub fn is_off_screen(&self) -> bool {
        self.pos.x + self.size.x < 0.0
    }

    pub fn bounds(&self) -> Aabb {
        Aabb {
            pos: self.pos,
            size: self.size,
        }
    }

    /// Collision boxes: top and bottom for pipes, the entity box otherwise
    pub fn hit_boxes(&self) -> impl Iterator<Item = Aabb> {
        let (first, second) = match self.kind {
            EntityKind::Pipe(gap) => (
                Aabb::new(self.pos.x, 0.0, self.size.x, gap.top_height),
                Some(Aabb::new(
                    self.pos.x,
                    gap.bottom_y,
                    self.size.x,
                    gap.bottom_height,
                )),
            ),
            _ => (self.bounds(), None),
        };
        std::iter::once(first).chain(second)
    }

    pub fn check_collision(&self, bird: &Bird) -> bool {
        !self.collected && self.hit_boxes().any(|b| bird.check_collision(&b))
    }

    pub fn render(&self, canvas: &mut dyn Canvas, interpolation: f32) {
        if self.collected {
            return;
        }
        let pos = lerp_vec(self.prev_pos, self.pos, interpolation.clamp(0.0, 1.0));
        match self.kind {
            EntityKind::Pipe(gap) => {
                draw_pipe(canvas, Vec2::new(pos.x, 0.0), Vec2::new(self.size.x, gap.top_height), true);
                draw_pipe(
                    canvas,
                    Vec2::new(pos.x, gap.bottom_y),
                    Vec2::new(self.size.x, gap.bottom_height),
                    false,
                );
            }
            _ => {
                canvas.save();
                canvas.translate(pos + self.size * 0.5);
                canvas.rotate(self.rotation);
                self.render_centered(canvas);
                canvas.restore();
            }
        }
    }

    fn render_centered(&self, canvas: &mut dyn Canvas) {
        let half = self.size * 0.5;
        match self.kind {
            EntityKind::Coin => {
                let diamond = shapes::eth_diamond(half, 0.0);
                canvas.fill_polygon(&diamond, COIN_COLOR);
                canvas.set_shadow(COIN_COLOR, 10.0);
                canvas.stroke_polygon(&diamond, Color::WHITE, 2.0);
            }
            EntityKind::Shield => {
                canvas.fill_circle(Vec2::ZERO, half.x, SHIELD_COLOR);
                canvas.fill_polygon(&shapes::eth_diamond(half * 0.5, 0.0), Color::WHITE);
                canvas.set_shadow(SHIELD_COLOR, 15.0);
                canvas.stroke_circle(Vec2::ZERO, half.x, Color::WHITE, 2.0);
            }
            EntityKind::DoublePoints => {
                canvas.fill_circle(Vec2::ZERO, half.x, DOUBLE_COLOR);
                canvas.text("x2", Vec2::ZERO, 16.0, Color::WHITE, TextAlign::Center);
                canvas.set_shadow(DOUBLE_COLOR, 15.0);
                canvas.stroke_circle(Vec2::ZERO, half.x, Color::WHITE, 2.0);
            }
            EntityKind::Obstacle(ObstacleLook::Bear) => {
                let ear = Vec2::new(half.x / 2.0, -half.y / 2.0);
                canvas.set_shadow(BEAR_COLOR, 10.0);
                canvas.fill_circle(Vec2::new(-ear.x, ear.y), half.x / 2.0, BEAR_COLOR);
                canvas.fill_circle(ear, half.x / 2.0, BEAR_COLOR);
                canvas.fill_circle(Vec2::new(0.0, self.size.y / 5.0), self.size.x / 3.0, BEAR_COLOR);
                canvas.set_shadow(BEAR_COLOR, 0.0);
                canvas.fill_circle(Vec2::new(-ear.x, ear.y), half.x / 4.0, Color::BLACK);
                canvas.fill_circle(ear, half.x / 4.0, Color::BLACK);
            }
            EntityKind::Obstacle(ObstacleLook::Bug) => {
                canvas.set_shadow(SHIELD_COLOR, 10.0);
                canvas.fill_rect(-half, self.size, SHIELD_COLOR);
                canvas.set_shadow(SHIELD_COLOR, 0.0);
                canvas.text("!", Vec2::ZERO, 20.0, Color::WHITE, TextAlign::Center);
            }
            EntityKind::Pipe(_) => {}
        }
    }
}

fn draw_pipe(canvas: &mut dyn Canvas, pos: Vec2, size: Vec2, is_top: bool) {
    if size.y <= 0.0 {
        return;
    }
    canvas.fill_rect(pos, size, PIPE_COLOR);
    canvas.fill_rect(
        Vec2::new(pos.x + size.x * 0.5, pos.y),
        Vec2::new(size.x * 0.5, size.y),
        PIPE_SHADE,
    );

    let cap_y = if is_top { pos.y + size.y - 20.0 } else { pos.y };
    canvas.fill_rect(
        Vec2::new(pos.x - 5.0, cap_y),
        Vec2::new(size.x + 10.0, 20.0),
        PIPE_CAP,
    );

    let mut offset = 0.0;
    while offset < size.y {
        let y = pos.y + offset;
        let clear_of_cap = if is_top {
            y + 30.0 <= pos.y + size.y - 20.0
        } else {
            y >= pos.y + 20.0
        };
        if clear_of_cap {
            canvas.fill_rect(
                Vec2::new(pos.x + 10.0, y),
                Vec2::new(size.x - 20.0, 15.0),
                PIPE_STRIPE,
            );
        }
        offset += 40.0;
    }
}
