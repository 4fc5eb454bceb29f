//! The game scene
//!
//! One fixed step runs, in order: clock and difficulty, periodic spawning,
//! power-up timers, entity physics and culling, collisions, then the store
//! bindings. A hazard hit or a floor breach ends the run exactly once.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::bird::Bird;
use super::entity::{Entity, EntityKind};
use super::state::{ScenePhase, SceneState};
use crate::audio::{Sfx, SfxOptions};
use crate::consts::*;
use crate::engine::{GameEvent, InputEvent, Scene, SceneContext, Systems};
use crate::ledger::GameReport;
use crate::renderer::{Canvas, Color, TextAlign, shapes};
use crate::sim::{
    EffectPreset, Easing, ParticleKind, Pool, PoolHandle, PoolStats, SpatialGrid, StateStore,
    TweenSystem,
};
use crate::tuning::Tuning;

pub const GAME_SCENE: &str = "game";

const PIPE_POOL: usize = 10;
const COIN_POOL: usize = 20;
const OBSTACLE_POOL: usize = 10;
const POWER_UP_POOL: usize = 10;

// Tween channels read by the HUD
const COMBO_SCALE: &str = "hud.combo_scale";
const POWER_SCALE: &str = "hud.power_scale";
const BANNER_ALPHA: &str = "hud.banner_alpha";

const BACKGROUND: Color = Color::hex(0x0f0c29);
const BIRD_BLUE: Color = Color::hex(0x62c9ff);
const COIN_GREEN: Color = Color::hex(0x62ffbd);
const COMBO_GOLD: Color = Color::hex(0xffaa00);
const SHIELD_BLUE: Color = Color::hex(0x4d79ff);
const DOUBLE_PINK: Color = Color::hex(0xff3366);

const FLAP_BURST: EffectPreset = EffectPreset {
    count: 3,
    speed: [-2.0, 0.0],
    life_ms: [200.0, 400.0],
    colors: &[BIRD_BLUE, Color::WHITE],
    spread: std::f32::consts::FRAC_PI_2,
    ..EffectPreset::TRAIL
};

const START_BURST: EffectPreset = EffectPreset {
    count: 20,
    speed: [2.0, 6.0],
    size: [2.0, 8.0],
    ..EffectPreset::SPARKLE
};

const CRASH_BURST: EffectPreset = EffectPreset {
    count: 25,
    speed: [3.0, 10.0],
    ..EffectPreset::EXPLOSION
};

/// Visual time factor eased toward while a hazard is just ahead
const SLOW_MOTION_FACTOR: f32 = 0.5;
const SLOW_MOTION_DISTANCE: f32 = 100.0;
const SLOW_MOTION_EASE: f32 = 0.05;
/// Bird edge this close to a gap edge counts as a near miss
const GAP_EDGE_MARGIN: f32 = 30.0;
const SLOW_MOTION_TINT: Color = Color::hex(0x1a0933);

const DOUBLE_POINTS_ACTIVATE: EffectPreset = EffectPreset {
    colors: &[DOUBLE_PINK, COMBO_GOLD, Color::WHITE],
    ..EffectPreset::SHIELD_ACTIVATE
};

/// Broad-phase key: the bird or a pooled entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridKey {
    Bird,
    Pipe(PoolHandle),
    Coin(PoolHandle),
    Obstacle(PoolHandle),
    PowerUp(PoolHandle),
}

pub struct GameScene {
    tuning: Tuning,
    seed: u64,
    runs: u64,
    /// Gameplay randomness: spawns and wind
    rng: Pcg32,
    /// Cosmetic randomness (sound pitch)
    fx_rng: Pcg32,
    bird: Option<Bird>,
    pipes: Pool<Entity>,
    coins: Pool<Entity>,
    obstacles: Pool<Entity>,
    power_ups: Pool<Entity>,
    grid: SpatialGrid<GridKey>,
    state: SceneState,
    draw_trails: bool,
    /// Near-miss time factor, 1.0 at rest. Drives the tint overlay only.
    slow_motion: f32,
    /// Last (score, eth, distance) written to the store
    published: Option<(u64, u32, u32)>,
}

impl GameScene {
    pub fn new(tuning: Tuning, seed: u64) -> Self {
        let state = SceneState::new(&tuning.power_ups, &tuning.difficulty);
        Self {
            seed,
            runs: 0,
            rng: Pcg32::seed_from_u64(seed),
            fx_rng: Pcg32::seed_from_u64(seed ^ 0xf1a9),
            bird: None,
            pipes: Pool::new(PIPE_POOL),
            coins: Pool::new(COIN_POOL),
            obstacles: Pool::new(OBSTACLE_POOL),
            power_ups: Pool::new(POWER_UP_POOL),
            grid: SpatialGrid::new(WIDTH, HEIGHT, GRID_CELL),
            state,
            draw_trails: true,
            slow_motion: 1.0,
            published: None,
            tuning,
        }
    }

    pub fn with_trails(mut self, enabled: bool) -> Self {
        self.draw_trails = enabled;
        self
    }

    pub fn state(&self) -> &SceneState {
        &self.state
    }

    pub fn bird(&self) -> Option<&Bird> {
        self.bird.as_ref()
    }

    pub fn slow_motion(&self) -> f32 {
        self.slow_motion
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    /// Live entities: pipes, coins, power-ups, then obstacles
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.pipes
            .iter()
            .chain(self.coins.iter())
            .chain(self.power_ups.iter())
            .chain(self.obstacles.iter())
            .map(|(_, e)| e)
    }

    /// Final numbers of the current run
    pub fn report(&self) -> GameReport {
        let stats = &self.state.stats;
        GameReport {
            score: stats.score,
            eth_collected: stats.eth_collected,
            distance: stats.distance.floor() as u32,
            game_time_ms: stats.game_time_ms,
            difficulty: self.state.difficulty.current,
            bird_stats: self.bird.as_ref().map(Bird::stats).unwrap_or_default(),
        }
    }

    fn release_entities(&mut self) {
        for pool in [
            &mut self.pipes,
            &mut self.coins,
            &mut self.obstacles,
            &mut self.power_ups,
        ] {
            let handles = pool.handles().to_vec();
            pool.release_all(handles);
        }
        self.grid.clear();
    }

    fn flap(&mut self, ctx: &mut SceneContext) {
        let Some(bird) = self.bird.as_mut() else {
            return;
        };
        if !bird.flap(&self.tuning.physics) {
            return;
        }
        let tail = bird.center() - Vec2::new(bird.size.x * 0.5, 0.0);
        ctx.systems
            .particles
            .create_effect(ParticleKind::Trail, tail, Some(&FLAP_BURST));
        ctx.play(
            Sfx::Flap,
            SfxOptions {
                pitch: 0.8 + self.fx_rng.random::<f32>() * 0.4,
                volume: 0.7,
            },
        );
    }

    /// Pipe, collectible rolls and the per-spawn score
    fn spawn(&mut self, ctx: &mut SceneContext) {
        let spawning = &self.tuning.spawning;
        let difficulty = self.state.difficulty.current;

        let handle = self.pipes.acquire();
        if let Some(pipe) = self.pipes.get_mut(handle) {
            pipe.init_pipe(spawning, &mut self.rng);
        }

        if self.rng.random::<f32>() < spawning.coin_chance {
            let handle = self.coins.acquire();
            if let Some(coin) = self.coins.get_mut(handle) {
                coin.init_collectible(EntityKind::Coin, spawning, &mut self.rng);
            }
        }

        if self.rng.random::<f32>() < spawning.power_up_chance * difficulty {
            let kind = if self.rng.random::<f32>() < spawning.shield_share {
                EntityKind::Shield
            } else {
                EntityKind::DoublePoints
            };
            let handle = self.power_ups.acquire();
            if let Some(power_up) = self.power_ups.get_mut(handle) {
                power_up.init_collectible(kind, spawning, &mut self.rng);
            }
            log::debug!("Spawned {:?}", kind);
        }

        if self.rng.random::<f32>() < spawning.obstacle_chance * difficulty {
            let handle = self.obstacles.acquire();
            if let Some(obstacle) = self.obstacles.get_mut(handle) {
                obstacle.init_obstacle(spawning, &mut self.rng);
            }
        }

        let power_ups = &self.state.power_ups;
        let points = (1 + power_ups.combo.bonus() as u64) * power_ups.multiplier();
        let stats = &mut self.state.stats;
        stats.score += points;
        stats.distance += spawning.pipe_speed * spawning.pipe_spawn_interval as f32;

        if points > 1
            && let Some(bird) = self.bird.as_ref()
        {
            let bonus = EffectPreset {
                count: (points - 1) as u32,
                speed: [0.5, 2.0],
                colors: &[COMBO_GOLD],
                ..EffectPreset::SPARKLE
            };
            ctx.systems.particles.create_effect(
                ParticleKind::Sparkle,
                Vec2::new(bird.center().x, bird.pos.y - 30.0),
                Some(&bonus),
            );
        }
    }

    fn near_hazard(&self) -> bool {
        let Some(bird) = self.bird.as_ref() else {
            return false;
        };
        let ahead = |x: f32| {
            let dx = x - bird.pos.x;
            dx > 0.0 && dx < SLOW_MOTION_DISTANCE
        };
        let obstacle_ahead = self.obstacles.iter().any(|(_, o)| ahead(o.pos.x));
        obstacle_ahead
            || self.pipes.iter().any(|(_, pipe)| match &pipe.kind {
                EntityKind::Pipe(gap) => {
                    ahead(pipe.pos.x)
                        && ((bird.pos.y - gap.top_height).abs() < GAP_EDGE_MARGIN
                            || (bird.pos.y + bird.size.y - gap.bottom_y).abs() < GAP_EDGE_MARGIN)
                }
                _ => false,
            })
    }

    fn update_slow_motion(&mut self) {
        let target = if self.near_hazard() {
            SLOW_MOTION_FACTOR
        } else {
            1.0
        };
        self.slow_motion += (target - self.slow_motion) * SLOW_MOTION_EASE;
    }

    fn tick_power_ups(&mut self, dt_ms: f32) {
        let power_ups = &mut self.state.power_ups;
        if power_ups.shield.tick(dt_ms) {
            log::debug!("Shield expired");
        }
        if power_ups.double_points.tick(dt_ms) {
            log::debug!("Double points expired");
        }
        if power_ups.combo.tick(dt_ms) {
            log::debug!("Combo broken");
        }
    }

    fn update_entities(&mut self, dt_ms: f32, ctx: &mut SceneContext) {
        let physics = &self.tuning.physics;
        let game_time = self.state.stats.game_time_ms;
        let Some(bird) = self.bird.as_mut() else {
            return;
        };
        bird.update(physics, dt_ms, game_time, &mut self.rng);

        let bird_x = bird.pos.x;
        self.pipes.retain_active(|pipe| {
            pipe.update();
            if let EntityKind::Pipe(gap) = &mut pipe.kind
                && !gap.passed
                && pipe.pos.x + pipe.size.x < bird_x
            {
                gap.passed = true;
            }
            !pipe.is_off_screen()
        });
        for pool in [&mut self.coins, &mut self.obstacles, &mut self.power_ups] {
            pool.retain_active(|entity| {
                entity.update();
                !entity.is_off_screen() && !entity.collected
            });
        }

        if self.draw_trails && bird.is_alive() {
            let tail = bird.center() - Vec2::new(bird.size.x * 0.5, 0.0);
            let intensity = (bird.velocity.abs() / physics.terminal_velocity).clamp(0.2, 1.0);
            ctx.systems.particles.create_trail(
                tail,
                Vec2::new(-self.tuning.spawning.pipe_speed, bird.velocity),
                BIRD_BLUE,
                intensity,
            );
        }
    }

    /// Boundary first, then hazards (unless shielded), then pickups
    fn resolve_collisions(&mut self, ctx: &mut SceneContext) {
        let Some(bird) = self.bird.as_ref() else {
            return;
        };
        if !bird.is_alive() {
            self.game_over("floor", ctx);
            return;
        }

        let bird_bounds = bird.broad_phase_bounds();
        self.grid.clear();
        self.grid.insert(GridKey::Bird, &bird_bounds);
        for (handle, pipe) in self.pipes.iter() {
            for bounds in pipe.hit_boxes() {
                self.grid.insert(GridKey::Pipe(handle), &bounds);
            }
        }
        for (handle, entity) in self.coins.iter() {
            self.grid.insert(GridKey::Coin(handle), &entity.bounds());
        }
        for (handle, entity) in self.obstacles.iter() {
            self.grid.insert(GridKey::Obstacle(handle), &entity.bounds());
        }
        for (handle, entity) in self.power_ups.iter() {
            self.grid.insert(GridKey::PowerUp(handle), &entity.bounds());
        }
        let nearby = self.grid.nearby(GridKey::Bird, &bird_bounds);

        if !self.state.power_ups.shield.active {
            let pipe_hit = self
                .pipes
                .iter()
                .any(|(h, e)| nearby.contains(&GridKey::Pipe(h)) && e.check_collision(bird));
            let obstacle_hit = !pipe_hit
                && self
                    .obstacles
                    .iter()
                    .any(|(h, e)| nearby.contains(&GridKey::Obstacle(h)) && e.check_collision(bird));
            if pipe_hit || obstacle_hit {
                self.game_over(if pipe_hit { "pipe" } else { "obstacle" }, ctx);
                return;
            }
        }

        let coins: Vec<PoolHandle> = self
            .coins
            .iter()
            .filter(|(h, e)| nearby.contains(&GridKey::Coin(*h)) && e.check_collision(bird))
            .map(|(h, _)| h)
            .collect();
        let power_ups: Vec<(PoolHandle, EntityKind)> = self
            .power_ups
            .iter()
            .filter(|(h, e)| nearby.contains(&GridKey::PowerUp(*h)) && e.check_collision(bird))
            .map(|(h, e)| (h, e.kind))
            .collect();

        for handle in coins {
            self.collect_coin(handle, ctx);
        }
        for (handle, kind) in power_ups {
            self.collect_power_up(handle, kind, ctx);
        }
        self.coins.retain_active(|c| !c.collected);
        self.power_ups.retain_active(|p| !p.collected);
    }

    fn collect_coin(&mut self, handle: PoolHandle, ctx: &mut SceneContext) {
        let Some(coin) = self.coins.get_mut(handle).filter(|c| !c.collected) else {
            return;
        };
        coin.collected = true;
        let center = coin.bounds().center();

        self.state.stats.eth_collected += 1;
        let bonus = self.state.power_ups.combo.register();
        self.state.stats.score += bonus as u64;
        let count = self.state.power_ups.combo.count;

        ctx.systems.particles.create_effect(
            ParticleKind::Collect,
            center,
            Some(&EffectPreset::COIN_COLLECT),
        );
        ctx.play(Sfx::Collect, SfxOptions::pitch(1.0 + 0.1 * count as f32));
        pulse(&mut ctx.systems.tweens, COMBO_SCALE);

        if let Some(bird) = self.bird.as_mut() {
            bird.boost_glow();
            if bonus > 0 {
                ctx.emit(GameEvent::FloatingText {
                    text: format!("+{} COMBO!", bonus),
                    pos: Vec2::new(bird.center().x, bird.pos.y - 30.0),
                    color: COMBO_GOLD,
                });
            }
        }
        log::debug!("Coin collected, combo x{}", count);
    }

    fn collect_power_up(&mut self, handle: PoolHandle, kind: EntityKind, ctx: &mut SceneContext) {
        let Some(power_up) = self.power_ups.get_mut(handle).filter(|p| !p.collected) else {
            return;
        };
        power_up.collected = true;
        let center = power_up.bounds().center();

        let power_ups = &mut self.state.power_ups;
        match kind {
            EntityKind::Shield => {
                power_ups.shield.activate();
                ctx.systems.particles.create_effect(
                    ParticleKind::PowerUp,
                    center,
                    Some(&EffectPreset::SHIELD_ACTIVATE),
                );
                ctx.play(Sfx::Shield, SfxOptions::default());
            }
            EntityKind::DoublePoints => {
                power_ups.double_points.activate();
                ctx.systems.particles.create_effect(
                    ParticleKind::PowerUp,
                    center,
                    Some(&DOUBLE_POINTS_ACTIVATE),
                );
                ctx.play(Sfx::PowerUp, SfxOptions::default());
            }
            _ => return,
        }
        pulse(&mut ctx.systems.tweens, POWER_SCALE);
        log::debug!("Power-up activated: {:?}", kind);
    }

    fn game_over(&mut self, cause: &str, ctx: &mut SceneContext) {
        if self.state.phase == ScenePhase::Ended {
            return;
        }
        self.state.phase = ScenePhase::Ended;

        let center = match self.bird.as_mut() {
            Some(bird) => {
                bird.kill();
                bird.center()
            }
            None => Vec2::new(WIDTH / 2.0, HEIGHT / 2.0),
        };
        ctx.systems
            .particles
            .create_effect(ParticleKind::Explosion, center, Some(&CRASH_BURST));
        ctx.play(Sfx::Collision, SfxOptions::volume(0.8));
        ctx.systems
            .tweens
            .to(&[(BANNER_ALPHA, 1.0)], 500.0, Easing::EaseOutQuad);

        let report = self.report();
        log::info!(
            "Run ended by {} after {:.1}s: score {}",
            cause,
            report.game_time_ms / 1000.0,
            report.score
        );
        ctx.emit(GameEvent::GameOver(report));
    }

    /// Write score/eth/distance bindings that changed
    fn publish(&mut self, store: &mut StateStore) {
        let stats = &self.state.stats;
        let current = (
            stats.score,
            stats.eth_collected,
            stats.distance.floor() as u32,
        );
        let previous = self.published;
        if previous == Some(current) {
            return;
        }
        self.published = Some(current);

        if previous.map(|p| p.0) != Some(current.0) {
            store.set("score", current.0);
        }
        if previous.map(|p| p.1) != Some(current.1) {
            store.set("eth", current.1);
        }
        if previous.map(|p| p.2) != Some(current.2) {
            store.set("distance", current.2);
        }
    }

    fn render_shield(&self, canvas: &mut dyn Canvas, bird: &Bird) {
        let shield = &self.state.power_ups.shield;
        if !shield.active {
            return;
        }
        // Blink during the last second
        if shield.time_left_ms < 1000.0 && (shield.time_left_ms / 100.0) as i32 % 2 == 0 {
            return;
        }
        canvas.save();
        canvas.set_shadow(SHIELD_BLUE, 15.0);
        canvas.fill_circle(bird.center(), 35.0, SHIELD_BLUE.with_alpha(0.15));
        canvas.stroke_circle(bird.center(), 35.0, SHIELD_BLUE.with_alpha(0.6), 3.0);
        canvas.restore();
    }

    fn render_hud(&self, canvas: &mut dyn Canvas, tweens: &TweenSystem) {
        let stats = &self.state.stats;
        let power_ups = &self.state.power_ups;
        let center_x = WIDTH / 2.0;

        canvas.text(
            &stats.score.to_string(),
            Vec2::new(center_x, 50.0),
            36.0,
            Color::WHITE,
            TextAlign::Center,
        );
        canvas.text(
            &format!("{} ETH", stats.eth_collected),
            Vec2::new(center_x, 78.0),
            16.0,
            COIN_GREEN,
            TextAlign::Center,
        );

        let track = Color::WHITE.with_alpha(0.2);
        let mut y = 110.0;
        if power_ups.combo.count > 0 {
            let scale = tweens.value_or(COMBO_SCALE, 1.0);
            canvas.text(
                &format!("{}x COMBO", power_ups.combo.count),
                Vec2::new(center_x, y),
                18.0 * scale,
                COMBO_GOLD,
                TextAlign::Center,
            );
            shapes::progress_bar(
                canvas,
                Vec2::new(center_x - 50.0, y + 8.0),
                Vec2::new(100.0, 4.0),
                power_ups.combo.fraction_left(),
                COMBO_GOLD,
                track,
            );
            y += 30.0;
        }

        let power_scale = tweens.value_or(POWER_SCALE, 1.0);
        for (label, timer, color) in [
            ("x2 POINTS", &power_ups.double_points, DOUBLE_PINK),
            ("SHIELD", &power_ups.shield, SHIELD_BLUE),
        ] {
            if !timer.active {
                continue;
            }
            canvas.text(label, Vec2::new(center_x, y), 14.0 * power_scale, color, TextAlign::Center);
            shapes::progress_bar(
                canvas,
                Vec2::new(center_x - 50.0, y + 8.0),
                Vec2::new(100.0, 4.0),
                timer.fraction_left(),
                color,
                track,
            );
            y += 30.0;
        }

        match self.state.phase {
            ScenePhase::Paused => {
                canvas.fill_rect(Vec2::ZERO, Vec2::new(WIDTH, HEIGHT), Color::BLACK.with_alpha(0.4));
                canvas.text(
                    "PAUSED",
                    Vec2::new(center_x, HEIGHT / 2.0),
                    36.0,
                    Color::WHITE,
                    TextAlign::Center,
                );
            }
            ScenePhase::Ended => {
                let alpha = tweens.value_or(BANNER_ALPHA, 1.0);
                canvas.fill_rect(
                    Vec2::ZERO,
                    Vec2::new(WIDTH, HEIGHT),
                    Color::BLACK.with_alpha(0.5 * alpha),
                );
                let lines = [
                    ("GAME OVER".to_string(), 40.0, Color::hex(0xff6b6b)),
                    (format!("Score: {}", stats.score), 22.0, Color::WHITE),
                    (format!("ETH: {}", stats.eth_collected), 18.0, COIN_GREEN),
                    ("Tap or press Space to restart".to_string(), 14.0, Color::WHITE),
                ];
                for (i, (text, px, color)) in lines.iter().enumerate() {
                    canvas.text(
                        text,
                        Vec2::new(center_x, HEIGHT / 2.0 - 40.0 + i as f32 * 36.0),
                        *px,
                        color.with_alpha(alpha),
                        TextAlign::Center,
                    );
                }
            }
            ScenePhase::Running | ScenePhase::Inactive => {}
        }
    }
}

/// Pop a HUD scale channel and ease it back to 1
fn pulse(tweens: &mut TweenSystem, channel: &str) {
    tweens.set(channel, 1.3);
    tweens.to(&[(channel, 1.0)], 300.0, Easing::EaseOutQuad);
}

impl Scene for GameScene {
    fn on_enter(&mut self, ctx: &mut SceneContext) {
        self.release_entities();
        self.rng = Pcg32::seed_from_u64(self.seed.wrapping_add(self.runs));
        self.runs += 1;

        self.state = SceneState::new(&self.tuning.power_ups, &self.tuning.difficulty);
        self.state.phase = ScenePhase::Running;
        self.slow_motion = 1.0;
        let bird = Bird::new(&self.tuning.physics);
        let start = bird.center();
        self.bird = Some(bird);

        let tweens = &mut ctx.systems.tweens;
        tweens.set(COMBO_SCALE, 1.0);
        tweens.set(POWER_SCALE, 1.0);
        tweens.set(BANNER_ALPHA, 0.0);

        ctx.play(
            Sfx::PowerUp,
            SfxOptions {
                pitch: 1.2,
                volume: 0.5,
            },
        );
        ctx.systems
            .particles
            .create_effect(ParticleKind::Sparkle, start, Some(&START_BURST));

        self.published = None;
        self.publish(&mut ctx.systems.store);
        log::info!("Run {} started", self.runs);
    }

    fn on_exit(&mut self, _ctx: &mut SceneContext) {
        self.release_entities();
        self.bird = None;
        self.state.phase = ScenePhase::Inactive;
    }

    fn on_input(&mut self, event: &InputEvent, ctx: &mut SceneContext) {
        if event.is_key("KeyD") {
            ctx.emit(GameEvent::ToggleDebug);
            return;
        }
        match self.state.phase {
            ScenePhase::Running => {
                if event.is_primary_action() {
                    self.flap(ctx);
                } else if event.is_key("KeyP") {
                    self.state.phase = ScenePhase::Paused;
                    log::info!("Paused");
                }
            }
            ScenePhase::Paused => {
                if event.is_key("KeyP") {
                    self.state.phase = ScenePhase::Running;
                    log::info!("Resumed");
                }
            }
            ScenePhase::Ended => {
                if event.is_primary_action() || event.is_key("KeyR") {
                    ctx.emit(GameEvent::Restart);
                }
            }
            ScenePhase::Inactive => {}
        }
    }

    fn update(&mut self, dt_ms: f32, ctx: &mut SceneContext) {
        if !self.state.is_running() {
            return;
        }

        let stats = &mut self.state.stats;
        stats.game_time_ms += dt_ms as f64;
        stats.frame_count += 1;
        self.state.difficulty.recompute(stats.game_time_ms);

        stats.frames_since_spawn += 1;
        let spawning = &self.tuning.spawning;
        let interval = self
            .state
            .difficulty
            .spawn_interval(spawning.pipe_spawn_interval, spawning.min_spawn_interval);
        if self.state.stats.frames_since_spawn >= interval {
            self.state.stats.frames_since_spawn = 0;
            self.spawn(ctx);
        }

        self.tick_power_ups(dt_ms);
        self.update_entities(dt_ms, ctx);
        self.update_slow_motion();
        self.resolve_collisions(ctx);
        self.publish(&mut ctx.systems.store);
    }

    fn render(&self, canvas: &mut dyn Canvas, interpolation: f32, systems: &Systems) {
        canvas.fill_rect(Vec2::ZERO, Vec2::new(WIDTH, HEIGHT), BACKGROUND);

        for entity in self.entities() {
            entity.render(canvas, interpolation);
        }
        systems.particles.render(canvas);

        if let Some(bird) = &self.bird {
            bird.render(canvas, interpolation, self.draw_trails);
            self.render_shield(canvas, bird);
        }
        if self.slow_motion < 0.9 {
            let tint = SLOW_MOTION_TINT.with_alpha(1.0 - self.slow_motion);
            canvas.fill_rect(Vec2::ZERO, Vec2::new(WIDTH, HEIGHT), tint);
        }
        self.render_hud(canvas, &systems.tweens);
    }

    fn optimize(&mut self) {
        for pool in [
            &mut self.pipes,
            &mut self.coins,
            &mut self.obstacles,
            &mut self.power_ups,
        ] {
            pool.optimize();
        }
        log::debug!("Scene pools optimized");
    }

    fn pool_stats(&self) -> Vec<(&'static str, PoolStats)> {
        vec![
            ("pipes", self.pipes.stats()),
            ("coins", self.coins.stats()),
            ("obstacles", self.obstacles.stats()),
            ("power-ups", self.power_ups.stats()),
        ]
    }

    fn entity_count(&self) -> usize {
        self.entities().count() + usize::from(self.bird.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::{DrawCommand, DrawList};

    /// No gravity, no wind, no random spawns
    fn calm_tuning() -> Tuning {
        let mut tuning = Tuning::default();
        tuning.physics.gravity = 0.0;
        tuning.physics.wind_strength = 0.0;
        tuning.spawning.coin_chance = 0.0;
        tuning.spawning.power_up_chance = 0.0;
        tuning.spawning.obstacle_chance = 0.0;
        tuning
    }

    struct Harness {
        scene: GameScene,
        systems: Systems,
        events: Vec<GameEvent>,
    }

    impl Harness {
        fn new(tuning: Tuning) -> Self {
            let mut harness = Self {
                scene: GameScene::new(tuning, 42),
                systems: Systems::new(Vec2::new(WIDTH, HEIGHT), 7),
                events: Vec::new(),
            };
            let mut ctx = SceneContext::new(&mut harness.systems, &mut harness.events);
            harness.scene.on_enter(&mut ctx);
            harness
        }

        fn step(&mut self) {
            let mut ctx = SceneContext::new(&mut self.systems, &mut self.events);
            self.scene.update(FIXED_STEP_MS, &mut ctx);
            self.systems.update(FIXED_STEP_MS);
        }

        fn input(&mut self, event: InputEvent) {
            let mut ctx = SceneContext::new(&mut self.systems, &mut self.events);
            self.scene.on_input(&event, &mut ctx);
        }

        /// Put an entity of `kind` right on top of the bird
        fn place_on_bird(&mut self, kind: EntityKind) -> PoolHandle {
            let bird_pos = self.scene.bird().unwrap().pos;
            let spawning = self.scene.tuning.spawning.clone();
            let mut rng = Pcg32::seed_from_u64(0);
            let pool = match kind {
                EntityKind::Coin => &mut self.scene.coins,
                EntityKind::Obstacle(_) => &mut self.scene.obstacles,
                EntityKind::Pipe(_) => &mut self.scene.pipes,
                EntityKind::Shield | EntityKind::DoublePoints => &mut self.scene.power_ups,
            };
            let handle = pool.acquire();
            let entity = pool.get_mut(handle).unwrap();
            match kind {
                EntityKind::Obstacle(_) => entity.init_obstacle(&spawning, &mut rng),
                _ => entity.init_collectible(kind, &spawning, &mut rng),
            }
            entity.pos = bird_pos;
            handle
        }

        fn sparkles(&self) -> usize {
            self.systems.particles.iter_kind(ParticleKind::Sparkle).count()
        }

        fn game_overs(&self) -> usize {
            self.events
                .iter()
                .filter(|e| matches!(e, GameEvent::GameOver(_)))
                .count()
        }

        fn sounds(&self, sfx: Sfx) -> Vec<SfxOptions> {
            self.events
                .iter()
                .filter_map(|e| match e {
                    GameEvent::Sound(s, options) if *s == sfx => Some(*options),
                    _ => None,
                })
                .collect()
        }
    }

    #[test]
    fn test_enter_resets_and_cues() {
        let harness = Harness::new(Tuning::default());
        let bird = harness.scene.bird().unwrap();
        assert_eq!(bird.pos, Vec2::new(WIDTH / 4.0, HEIGHT / 2.0));
        assert_eq!(harness.scene.state().phase, ScenePhase::Running);
        assert_eq!(
            harness.sounds(Sfx::PowerUp),
            vec![SfxOptions {
                pitch: 1.2,
                volume: 0.5
            }]
        );
        assert_eq!(
            harness.systems.particles.iter_kind(ParticleKind::Sparkle).count(),
            20
        );
        assert_eq!(harness.systems.store.get::<u64>("score"), Some(0));
    }

    #[test]
    fn test_first_spawn_after_180_ticks() {
        let mut harness = Harness::new(calm_tuning());
        for _ in 0..179 {
            harness.step();
        }
        assert_eq!(harness.scene.state().stats.score, 0);
        assert_eq!(harness.scene.pipes.active_len(), 0);

        harness.step();
        let stats = harness.scene.state().stats;
        assert_eq!(stats.score, 1);
        assert_eq!(stats.distance, 270.0);
        assert_eq!(harness.scene.pipes.active_len(), 1);
        assert_eq!(harness.systems.store.get::<u64>("score"), Some(1));
        assert_eq!(harness.systems.store.get::<u32>("distance"), Some(270));
    }

    #[test]
    fn test_combo_bonuses_accumulate() {
        let mut harness = Harness::new(calm_tuning());
        for _ in 0..3 {
            harness.place_on_bird(EntityKind::Coin);
            harness.step();
        }
        let stats = harness.scene.state().stats;
        assert_eq!(stats.eth_collected, 3);
        assert_eq!(stats.score, 1 + 2);
        assert_eq!(harness.scene.state().power_ups.combo.count, 3);
        assert_eq!(harness.scene.coins.active_len(), 0);

        let pitches: Vec<f32> = harness.sounds(Sfx::Collect).iter().map(|o| o.pitch).collect();
        assert_eq!(pitches.len(), 3);
        assert!((pitches[2] - 1.3).abs() < 1e-6);

        let labels: Vec<&str> = harness
            .events
            .iter()
            .filter_map(|e| match e {
                GameEvent::FloatingText { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(labels, vec!["+1 COMBO!", "+2 COMBO!"]);
    }

    #[test]
    fn test_shield_blocks_hazards() {
        let mut harness = Harness::new(calm_tuning());
        harness.scene.state.power_ups.shield.activate();
        harness.place_on_bird(EntityKind::Obstacle(Default::default()));
        for _ in 0..10 {
            harness.step();
        }
        assert_eq!(harness.scene.state().phase, ScenePhase::Running);
        assert_eq!(harness.game_overs(), 0);
    }

    #[test]
    fn test_hazard_ends_run_once() {
        let mut harness = Harness::new(calm_tuning());
        harness.place_on_bird(EntityKind::Obstacle(Default::default()));
        harness.step();
        assert_eq!(harness.scene.state().phase, ScenePhase::Ended);
        assert!(!harness.scene.bird().unwrap().is_alive());
        assert_eq!(harness.game_overs(), 1);
        assert_eq!(harness.sounds(Sfx::Collision), vec![SfxOptions::volume(0.8)]);

        let frozen = harness.scene.state().stats;
        harness.place_on_bird(EntityKind::Obstacle(Default::default()));
        for _ in 0..300 {
            harness.step();
        }
        assert_eq!(harness.game_overs(), 1);
        assert_eq!(harness.scene.state().stats, frozen);
    }

    #[test]
    fn test_floor_death_reports_run() {
        let mut harness = Harness::new(Tuning::default());
        let mut steps = 0;
        while harness.scene.state().phase == ScenePhase::Running {
            harness.step();
            steps += 1;
            assert!(steps < 1000, "bird never reached the floor");
        }
        let reports: Vec<&GameReport> = harness
            .events
            .iter()
            .filter_map(|e| match e {
                GameEvent::GameOver(report) => Some(report),
                _ => None,
            })
            .collect();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].score, harness.scene.state().stats.score);
        assert!(reports[0].game_time_ms > 0.0);
        assert!(
            harness
                .systems
                .particles
                .iter_kind(ParticleKind::Explosion)
                .count()
                > 0
        );
    }

    #[test]
    fn test_double_points_multiplier() {
        let mut harness = Harness::new(calm_tuning());
        harness.place_on_bird(EntityKind::DoublePoints);
        harness.step();
        assert!(harness.scene.state().power_ups.double_points.active);
        assert_eq!(harness.sounds(Sfx::PowerUp).len(), 2);

        for _ in 1..180 {
            harness.step();
        }
        assert_eq!(harness.scene.state().stats.score, 2);
    }

    #[test]
    fn test_flap_burst_and_sound() {
        let mut harness = Harness::new(calm_tuning());
        harness.input(InputEvent::key_down("Space"));
        let flaps = harness.sounds(Sfx::Flap);
        assert_eq!(flaps.len(), 1);
        assert_eq!(flaps[0].volume, 0.7);
        assert!((0.8..1.2).contains(&flaps[0].pitch));
        assert_eq!(harness.systems.particles.iter_kind(ParticleKind::Trail).count(), 3);
        assert_eq!(harness.scene.bird().unwrap().velocity, -6.0);
    }

    #[test]
    fn test_pause_and_restart_inputs() {
        let mut harness = Harness::new(Tuning::default());
        harness.input(InputEvent::key_down("KeyP"));
        assert_eq!(harness.scene.state().phase, ScenePhase::Paused);
        harness.step();
        assert_eq!(harness.scene.state().stats.game_time_ms, 0.0);
        harness.input(InputEvent::key_down("KeyP"));
        assert_eq!(harness.scene.state().phase, ScenePhase::Running);

        harness.input(InputEvent::key_down("KeyD"));
        assert!(harness.events.contains(&GameEvent::ToggleDebug));

        while harness.scene.state().phase == ScenePhase::Running {
            harness.step();
        }
        harness.input(InputEvent::key_down("KeyR"));
        assert!(harness.events.contains(&GameEvent::Restart));
    }

    #[test]
    fn test_same_seed_same_run() {
        let run = || {
            let mut harness = Harness::new(Tuning::default());
            for i in 0..1200 {
                if i % 18 == 0 {
                    harness.input(InputEvent::key_down("Space"));
                }
                harness.step();
            }
            (harness.scene.state().stats, harness.scene.report())
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_exit_releases_entities() {
        let mut harness = Harness::new(calm_tuning());
        harness.place_on_bird(EntityKind::Coin);
        harness.place_on_bird(EntityKind::Shield);
        assert_eq!(harness.scene.entity_count(), 3);

        let mut ctx = SceneContext::new(&mut harness.systems, &mut harness.events);
        harness.scene.on_exit(&mut ctx);
        assert_eq!(harness.scene.entity_count(), 0);
        assert_eq!(harness.scene.state().phase, ScenePhase::Inactive);
        assert_eq!(harness.scene.pool_stats().len(), 4);
    }

    #[test]
    fn test_render_hud_and_banner() {
        let mut harness = Harness::new(calm_tuning());
        let mut canvas = DrawList::new(WIDTH, HEIGHT);
        harness.scene.render(&mut canvas, 0.5, &harness.systems);
        assert!(canvas.texts().any(|t| t == "0"));
        assert!(canvas.texts().any(|t| t == "0 ETH"));

        harness.place_on_bird(EntityKind::Obstacle(Default::default()));
        harness.step();
        canvas.clear();
        harness.scene.render(&mut canvas, 0.5, &harness.systems);
        assert!(canvas.texts().any(|t| t == "GAME OVER"));
    }

    #[test]
    fn test_collected_coin_counts_once() {
        let mut harness = Harness::new(calm_tuning());
        let handle = harness.place_on_bird(EntityKind::Coin);

        let mut ctx = SceneContext::new(&mut harness.systems, &mut harness.events);
        harness.scene.collect_coin(handle, &mut ctx);
        harness.scene.collect_coin(handle, &mut ctx);
        assert_eq!(harness.scene.state().stats.eth_collected, 1);
        assert!(harness.scene.coins.get(handle).unwrap().collected);

        // Still overlapping the bird, but swept instead of collected again
        harness.step();
        assert_eq!(harness.scene.state().stats.eth_collected, 1);
        assert_eq!(harness.scene.coins.active_len(), 0);
        assert_eq!(harness.sounds(Sfx::Collect).len(), 1);
    }

    #[test]
    fn test_bonus_points_sparkle_at_bird() {
        let mut harness = Harness::new(calm_tuning());
        let before = harness.sparkles();
        let mut ctx = SceneContext::new(&mut harness.systems, &mut harness.events);
        harness.scene.spawn(&mut ctx);
        assert_eq!(harness.scene.state().stats.score, 1);
        assert_eq!(harness.sparkles(), before);

        harness.scene.state.power_ups.double_points.activate();
        let mut ctx = SceneContext::new(&mut harness.systems, &mut harness.events);
        harness.scene.spawn(&mut ctx);
        assert_eq!(harness.scene.state().stats.score, 3);
        assert_eq!(harness.sparkles(), before + 1);

        let bird = harness.scene.bird().unwrap();
        let above = Vec2::new(bird.center().x, bird.pos.y - 30.0);
        assert!(
            harness
                .systems
                .particles
                .iter_kind(ParticleKind::Sparkle)
                .any(|p| p.pos == above && p.color == COMBO_GOLD)
        );
    }

    #[test]
    fn test_slow_motion_near_hazard() {
        let mut harness = Harness::new(calm_tuning());
        for _ in 0..10 {
            harness.step();
        }
        assert_eq!(harness.scene.slow_motion(), 1.0);

        // Ahead of the bird but well below its flight line
        let handle = harness.place_on_bird(EntityKind::Obstacle(Default::default()));
        let obstacle = harness.scene.obstacles.get_mut(handle).unwrap();
        obstacle.pos += Vec2::new(80.0, 200.0);
        for _ in 0..10 {
            harness.step();
        }
        let factor = harness.scene.slow_motion();
        assert!(factor < 0.9 && factor > SLOW_MOTION_FACTOR, "factor {}", factor);
        assert_eq!(harness.scene.state().phase, ScenePhase::Running);

        let mut canvas = DrawList::new(WIDTH, HEIGHT);
        harness.scene.render(&mut canvas, 0.5, &harness.systems);
        let tint = SLOW_MOTION_TINT.with_alpha(1.0 - factor);
        assert!(canvas.commands.iter().any(|c| matches!(
            c,
            DrawCommand::Rect { color, .. } if *color == tint
        )));

        // Eases back once the hazard is cleared
        harness.scene.obstacles.clear();
        for _ in 0..120 {
            harness.step();
        }
        assert!(harness.scene.slow_motion() > 0.99);
    }
}
