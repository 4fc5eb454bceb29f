//! Game engine
//!
//! Owns the canvas, the scene table and the shared systems, and runs the
//! fixed-timestep loop:
//! - `frame(now)` clamps the wall-clock delta and feeds an accumulator
//! - every whole `fixed_step_ms` runs one `update` (input, scene, systems,
//!   free entities, then queued events)
//! - the leftover fraction becomes the render interpolation factor

mod entities;
mod events;
mod input;
mod perf;
mod systems;

pub use entities::{EngineEntity, EntityId, FloatingText};
pub use events::GameEvent;
pub use input::{InputEvent, InputState};
pub use perf::{PerfStatus, PerformanceMonitor};
pub use systems::{SystemRegistry, Systems};

use std::collections::HashMap;

use glam::Vec2;

use crate::audio::{NullSound, Sfx, SfxOptions, SoundSink};
use crate::consts::*;
use crate::error::EngineError;
use crate::ledger::{ScoreLedger, SessionLedger};
use crate::renderer::{Canvas, Color, TextAlign};
use crate::settings::Settings;
use crate::sim::PoolStats;

/// Anything updated once per fixed step
pub trait System {
    fn update(&mut self, dt_ms: f32);
}

/// Mutable view a scene gets during enter/exit/input/update
pub struct SceneContext<'a> {
    pub systems: &'a mut Systems,
    pub events: &'a mut Vec<GameEvent>,
}

impl<'a> SceneContext<'a> {
    pub fn new(systems: &'a mut Systems, events: &'a mut Vec<GameEvent>) -> Self {
        Self { systems, events }
    }

    pub fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    pub fn play(&mut self, sfx: Sfx, options: SfxOptions) {
        self.events.push(GameEvent::Sound(sfx, options));
    }
}

pub trait Scene {
    fn on_enter(&mut self, ctx: &mut SceneContext);
    fn on_exit(&mut self, ctx: &mut SceneContext);
    fn on_input(&mut self, event: &InputEvent, ctx: &mut SceneContext);
    fn update(&mut self, dt_ms: f32, ctx: &mut SceneContext);
    fn render(&self, canvas: &mut dyn Canvas, interpolation: f32, systems: &Systems);

    /// Trim or pre-warm pools
    fn optimize(&mut self) {}

    /// Drop engine free entities when this scene is entered
    fn clear_entities_on_enter(&self) -> bool {
        true
    }

    /// Named pool statistics for the debug overlay
    fn pool_stats(&self) -> Vec<(&'static str, PoolStats)> {
        Vec::new()
    }

    fn entity_count(&self) -> usize {
        0
    }
}

/// Loop timing and budgets
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub width: f32,
    pub height: f32,
    pub fixed_step_ms: f64,
    pub max_delta_ms: f64,
    /// Host time between routine pool optimizations
    pub optimize_interval_ms: f64,
    /// Minimum host time between performance throttles
    pub throttle_cooldown_ms: f64,
    /// Share of live particles killed by a throttle
    pub throttle_fraction: f32,
    pub max_particles: usize,
    pub ambient_sparkles: bool,
    pub show_debug: bool,
    pub particle_seed: u64,
    /// Scene entered by a primary action while stopped
    pub start_scene: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            width: WIDTH,
            height: HEIGHT,
            fixed_step_ms: FIXED_STEP_MS as f64,
            max_delta_ms: MAX_DELTA_MS as f64,
            optimize_interval_ms: 5000.0,
            throttle_cooldown_ms: 5000.0,
            throttle_fraction: 0.25,
            max_particles: 500,
            ambient_sparkles: true,
            show_debug: false,
            particle_seed: 0x5eed,
            start_scene: crate::game::GAME_SCENE.to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            max_particles: settings.max_particles(),
            ambient_sparkles: settings.ambient_sparkles(),
            show_debug: settings.show_debug,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.width > 0.0 && self.height > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "play field must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if !(self.fixed_step_ms > 0.0) {
            return Err(EngineError::InvalidConfig(
                "fixed_step_ms must be positive".into(),
            ));
        }
        if self.max_delta_ms < self.fixed_step_ms {
            return Err(EngineError::InvalidConfig(format!(
                "max_delta_ms ({}) is below fixed_step_ms ({})",
                self.max_delta_ms, self.fixed_step_ms
            )));
        }
        if !(0.0..=1.0).contains(&self.throttle_fraction) {
            return Err(EngineError::InvalidConfig(
                "throttle_fraction must be within [0, 1]".into(),
            ));
        }
        Ok(())
    }
}

pub struct EngineBuilder<C: Canvas> {
    config: EngineConfig,
    canvas: Option<C>,
    sound: Box<dyn SoundSink>,
    ledger: Box<dyn ScoreLedger>,
    scenes: Vec<(String, Box<dyn Scene>)>,
}

impl<C: Canvas> EngineBuilder<C> {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            canvas: None,
            sound: Box::new(NullSound),
            ledger: Box::new(SessionLedger::new()),
            scenes: Vec::new(),
        }
    }

    pub fn surface(mut self, canvas: C) -> Self {
        self.canvas = Some(canvas);
        self
    }

    pub fn sound(mut self, sound: Box<dyn SoundSink>) -> Self {
        self.sound = sound;
        self
    }

    pub fn ledger(mut self, ledger: Box<dyn ScoreLedger>) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn scene(mut self, name: &str, scene: Box<dyn Scene>) -> Self {
        self.scenes.push((name.to_string(), scene));
        self
    }

    pub fn build(self) -> Result<Engine<C>, EngineError> {
        self.config.validate()?;
        let canvas = self
            .canvas
            .ok_or_else(|| EngineError::MissingSurface("no canvas supplied".into()))?;
        let size = canvas.size();
        if size.x <= 0.0 || size.y <= 0.0 {
            return Err(EngineError::MissingSurface(format!(
                "canvas has no area ({}x{})",
                size.x, size.y
            )));
        }

        let mut systems = Systems::new(
            Vec2::new(self.config.width, self.config.height),
            self.config.particle_seed,
        );
        systems.particles.set_max_particles(self.config.max_particles);
        systems
            .particles
            .set_ambient_sparkles(self.config.ambient_sparkles);

        log::info!(
            "Engine ready: {}x{} field, {:.2} ms step, {} scene(s)",
            self.config.width,
            self.config.height,
            self.config.fixed_step_ms,
            self.scenes.len()
        );

        Ok(Engine {
            show_debug: self.config.show_debug,
            config: self.config,
            canvas,
            scenes: self.scenes.into_iter().collect(),
            current: None,
            systems,
            entities: Vec::new(),
            next_entity: 0,
            input: InputState::default(),
            pending_input: Vec::new(),
            events: Vec::new(),
            sound: self.sound,
            ledger: self.ledger,
            running: false,
            last_time: None,
            accumulator: 0.0,
            perf: PerformanceMonitor::new(),
            last_optimize_ms: 0.0,
            last_throttle_ms: f64::NEG_INFINITY,
            steps: 0,
        })
    }
}

pub struct Engine<C: Canvas> {
    config: EngineConfig,
    canvas: C,
    scenes: HashMap<String, Box<dyn Scene>>,
    current: Option<String>,
    systems: Systems,
    entities: Vec<(EntityId, Box<dyn EngineEntity>)>,
    next_entity: u64,
    input: InputState,
    pending_input: Vec<InputEvent>,
    events: Vec<GameEvent>,
    sound: Box<dyn SoundSink>,
    ledger: Box<dyn ScoreLedger>,
    running: bool,
    last_time: Option<f64>,
    accumulator: f64,
    perf: PerformanceMonitor,
    last_optimize_ms: f64,
    last_throttle_ms: f64,
    show_debug: bool,
    steps: u64,
}

impl<C: Canvas> Engine<C> {
    pub fn builder(config: EngineConfig) -> EngineBuilder<C> {
        EngineBuilder::new(config)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn current_scene(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn canvas(&self) -> &C {
        &self.canvas
    }

    pub fn systems(&self) -> &Systems {
        &self.systems
    }

    pub fn systems_mut(&mut self) -> &mut Systems {
        &mut self.systems
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    pub fn performance(&self) -> &PerformanceMonitor {
        &self.perf
    }

    /// Fixed steps run since construction
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn set_show_debug(&mut self, show: bool) {
        self.show_debug = show;
    }

    pub fn show_debug(&self) -> bool {
        self.show_debug
    }

    pub fn set_sound(&mut self, sound: Box<dyn SoundSink>) {
        self.sound = sound;
    }

    pub fn add_scene(&mut self, name: &str, scene: Box<dyn Scene>) {
        if self.scenes.insert(name.to_string(), scene).is_some() {
            log::warn!("Replaced scene '{}'", name);
        }
    }

    pub fn start(&mut self) {
        if self.running {
            return;
        }
        self.running = true;
        self.last_time = None;
        self.accumulator = 0.0;
        log::info!("Engine started");
    }

    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        log::info!("Engine stopped");
    }

    pub fn pause(&mut self) {
        self.stop();
    }

    pub fn resume(&mut self) {
        self.start();
    }

    /// Switch scenes: outgoing `on_exit`, optional entity clear, incoming
    /// `on_enter`. Switching to the current scene restarts it.
    pub fn set_scene(&mut self, name: &str) -> Result<(), EngineError> {
        if !self.scenes.contains_key(name) {
            log::warn!("Unknown scene '{}'", name);
            return Err(EngineError::UnknownScene(name.to_string()));
        }

        if let Some(previous) = self.current.take()
            && let Some(scene) = self.scenes.get_mut(&previous)
        {
            let mut ctx = SceneContext::new(&mut self.systems, &mut self.events);
            scene.on_exit(&mut ctx);
        }

        if let Some(scene) = self.scenes.get_mut(name) {
            if scene.clear_entities_on_enter() {
                self.entities.clear();
            }
            let mut ctx = SceneContext::new(&mut self.systems, &mut self.events);
            scene.on_enter(&mut ctx);
        }
        self.current = Some(name.to_string());
        log::info!("Entered scene '{}'", name);

        self.dispatch_events();
        Ok(())
    }

    /// Queue an input event for the next fixed step. A primary action while
    /// stopped starts the engine and enters the start scene instead.
    pub fn push_input(&mut self, event: InputEvent) {
        if !self.running {
            self.input.apply(&event);
            if event.is_primary_action() {
                self.start();
                let start_scene = self.config.start_scene.clone();
                if let Err(e) = self.set_scene(&start_scene) {
                    log::warn!("Could not enter start scene: {}", e);
                }
            }
            return;
        }
        self.pending_input.push(event);
    }

    pub fn add_entity(&mut self, entity: Box<dyn EngineEntity>) -> EntityId {
        let id = EntityId(self.next_entity);
        self.next_entity += 1;
        self.entities.push((id, entity));
        id
    }

    pub fn remove_entity(&mut self, id: EntityId) -> bool {
        let before = self.entities.len();
        self.entities.retain(|(eid, _)| *eid != id);
        self.entities.len() != before
    }

    pub fn find_entities(&self, tag: &str) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter(|(_, e)| e.tag() == tag)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn register_system(&mut self, name: &str, system: Box<dyn System>) {
        self.systems.custom.register(name, system);
    }

    pub fn system(&self, name: &str) -> Option<&dyn System> {
        self.systems.custom.get(name)
    }

    pub fn system_mut(&mut self, name: &str) -> Option<&mut (dyn System + 'static)> {
        self.systems.custom.get_mut(name)
    }

    /// One animation frame. Returns whether the host should schedule another.
    pub fn frame(&mut self, now_ms: f64) -> bool {
        if !self.running {
            return false;
        }

        let first_frame = self.last_time.is_none();
        let last = self.last_time.replace(now_ms).unwrap_or(now_ms);
        if first_frame {
            self.last_optimize_ms = now_ms;
        }
        let frame_ms = (now_ms - last).max(0.0);
        if !first_frame {
            self.perf.record(frame_ms);
        }

        self.accumulator += frame_ms.min(self.config.max_delta_ms);
        let step = self.config.fixed_step_ms;
        while self.accumulator >= step && self.running {
            self.update(step as f32);
            self.accumulator -= step;
        }

        self.maintain(now_ms);
        self.render((self.accumulator / step) as f32);
        self.running
    }

    /// One fixed step
    pub fn update(&mut self, dt_ms: f32) {
        self.steps += 1;

        let pending = std::mem::take(&mut self.pending_input);
        if let Some(scene) = self.current.as_ref().and_then(|n| self.scenes.get_mut(n)) {
            let mut ctx = SceneContext::new(&mut self.systems, &mut self.events);
            for event in &pending {
                self.input.apply(event);
                scene.on_input(event, &mut ctx);
            }
            scene.update(dt_ms, &mut ctx);
        } else {
            for event in &pending {
                self.input.apply(event);
            }
        }

        self.systems.update(dt_ms);

        for (_, entity) in &mut self.entities {
            entity.update(dt_ms);
        }
        self.entities.retain(|(_, e)| e.is_active());

        self.dispatch_events();
    }

    fn dispatch_events(&mut self) {
        let mut restart = false;
        for event in std::mem::take(&mut self.events) {
            match event {
                GameEvent::Sound(sfx, options) => self.sound.play_sfx(sfx, options),
                GameEvent::GameOver(report) => {
                    log::info!(
                        "Game over: score {}, {} ETH, distance {}",
                        report.score,
                        report.eth_collected,
                        report.distance
                    );
                    self.ledger.submit(&report);
                }
                GameEvent::FloatingText { text, pos, color } => {
                    self.add_entity(Box::new(FloatingText::new(text, pos, color)));
                }
                GameEvent::ToggleDebug => {
                    self.show_debug = !self.show_debug;
                    log::debug!("Debug overlay: {}", self.show_debug);
                }
                GameEvent::Restart => restart = true,
            }
        }

        if restart
            && let Some(name) = self.current.clone()
            && let Err(e) = self.set_scene(&name)
        {
            log::warn!("Restart failed: {}", e);
        }
    }

    /// Periodic pool optimization and performance self-throttling
    fn maintain(&mut self, now_ms: f64) {
        if now_ms - self.last_optimize_ms >= self.config.optimize_interval_ms {
            self.optimize_pools();
            self.last_optimize_ms = now_ms;
        }

        if self.perf.status() == Some(PerfStatus::Poor)
            && now_ms - self.last_throttle_ms >= self.config.throttle_cooldown_ms
        {
            let removed = self.systems.particles.reduce(self.config.throttle_fraction);
            self.optimize_pools();
            self.last_throttle_ms = now_ms;
            log::warn!(
                "Frame time {:.1} ms, dropped {} particles",
                self.perf.average_ms(),
                removed
            );
        }
    }

    pub fn optimize_pools(&mut self) {
        if let Some(scene) = self.current.as_ref().and_then(|n| self.scenes.get_mut(n)) {
            scene.optimize();
        }
        self.systems.particles.optimize();
    }

    fn render(&mut self, interpolation: f32) {
        self.canvas.clear();
        if let Some(scene) = self.current.as_ref().and_then(|n| self.scenes.get(n)) {
            scene.render(&mut self.canvas, interpolation, &self.systems);
        }
        for (_, entity) in &self.entities {
            entity.render(&mut self.canvas);
        }
        if self.show_debug {
            self.render_debug();
        }
    }

    fn render_debug(&mut self) {
        let mut lines = vec![
            format!("FPS: {}", self.perf.fps()),
            format!("Entities: {}", self.debug_entity_count()),
            format!("Particles: {}", self.systems.particles.active_count()),
        ];
        if let Some(scene) = self.current.as_ref().and_then(|n| self.scenes.get(n)) {
            for (name, stats) in scene.pool_stats() {
                lines.push(format!(
                    "{}: {}/{} ({:.0}% reuse)",
                    name,
                    stats.active,
                    stats.pool_size(),
                    stats.efficiency()
                ));
            }
        }

        let canvas = &mut self.canvas;
        canvas.save();
        canvas.fill_rect(
            Vec2::new(4.0, 4.0),
            Vec2::new(170.0, 8.0 + lines.len() as f32 * 14.0),
            Color::BLACK.with_alpha(0.6),
        );
        for (i, line) in lines.iter().enumerate() {
            canvas.text(
                line,
                Vec2::new(10.0, 16.0 + i as f32 * 14.0),
                12.0,
                Color::hex(0x62ffbd),
                TextAlign::Left,
            );
        }
        canvas.restore();
    }

    fn debug_entity_count(&self) -> usize {
        let scene = self
            .current
            .as_ref()
            .and_then(|n| self.scenes.get(n))
            .map_or(0, |s| s.entity_count());
        scene + self.entities.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::Sfx;
    use crate::ledger::GameReport;
    use crate::renderer::DrawList;
    use crate::sim::{EffectPreset, ParticleKind};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Log {
        entered: u32,
        exited: u32,
        inputs: Vec<InputEvent>,
        updates: u32,
    }

    struct ProbeScene(Rc<RefCell<Log>>);

    impl Scene for ProbeScene {
        fn on_enter(&mut self, ctx: &mut SceneContext) {
            self.0.borrow_mut().entered += 1;
            ctx.play(Sfx::PowerUp, SfxOptions::default());
        }

        fn on_exit(&mut self, _ctx: &mut SceneContext) {
            self.0.borrow_mut().exited += 1;
        }

        fn on_input(&mut self, event: &InputEvent, ctx: &mut SceneContext) {
            self.0.borrow_mut().inputs.push(event.clone());
            if event.is_key("KeyD") {
                ctx.emit(GameEvent::ToggleDebug);
            }
            if event.is_key("KeyG") {
                ctx.emit(GameEvent::GameOver(GameReport::default()));
            }
        }

        fn update(&mut self, _dt_ms: f32, _ctx: &mut SceneContext) {
            self.0.borrow_mut().updates += 1;
        }

        fn render(&self, canvas: &mut dyn Canvas, _interpolation: f32, _systems: &Systems) {
            canvas.text("probe", Vec2::ZERO, 10.0, Color::WHITE, TextAlign::Left);
        }
    }

    #[derive(Clone, Default)]
    struct Recorder(Rc<RefCell<Vec<Sfx>>>);

    impl SoundSink for Recorder {
        fn play_sfx(&mut self, sfx: Sfx, _options: SfxOptions) {
            self.0.borrow_mut().push(sfx);
        }
    }

    #[derive(Clone, Default)]
    struct Reports(Rc<RefCell<Vec<GameReport>>>);

    impl ScoreLedger for Reports {
        fn submit(&mut self, report: &GameReport) {
            self.0.borrow_mut().push(report.clone());
        }
    }

    fn engine(log: Rc<RefCell<Log>>) -> Engine<DrawList> {
        Engine::builder(EngineConfig {
            start_scene: "probe".into(),
            ..Default::default()
        })
        .surface(DrawList::new(WIDTH, HEIGHT))
        .scene("probe", Box::new(ProbeScene(log)))
        .build()
        .unwrap()
    }

    #[test]
    fn test_missing_surface_is_fatal() {
        let result = EngineBuilder::<DrawList>::new(EngineConfig::default()).build();
        assert!(matches!(result, Err(EngineError::MissingSurface(_))));

        let result = Engine::builder(EngineConfig::default())
            .surface(DrawList::new(0.0, 0.0))
            .build();
        assert!(matches!(result, Err(EngineError::MissingSurface(_))));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = Engine::builder(EngineConfig {
            max_delta_ms: 1.0,
            ..Default::default()
        })
        .surface(DrawList::new(WIDTH, HEIGHT))
        .build();
        assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn test_stopped_engine_requests_no_frames() {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut engine = engine(log.clone());
        assert!(!engine.frame(0.0));
        assert_eq!(log.borrow().updates, 0);
    }

    #[test]
    fn test_accumulator_clamps_long_frames() {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut engine = engine(log.clone());
        engine.start();
        engine.set_scene("probe").unwrap();

        assert!(engine.frame(1000.0));
        assert_eq!(engine.steps(), 0);

        // A 1 s stall only feeds 50 ms: three 16.67 ms steps
        assert!(engine.frame(2000.0));
        assert_eq!(engine.steps(), 3);
        assert_eq!(log.borrow().updates, 3);

        // Two more frames at 10 ms carry the remainder
        engine.frame(2010.0);
        engine.frame(2020.0);
        assert_eq!(engine.steps(), 4);
        assert_eq!(engine.canvas().texts().next(), Some("probe"));
    }

    #[test]
    fn test_primary_action_starts_game() {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut engine = engine(log.clone());
        engine.push_input(InputEvent::key_down("KeyX"));
        assert!(!engine.is_running());

        engine.push_input(InputEvent::key_down("Space"));
        assert!(engine.is_running());
        assert_eq!(engine.current_scene(), Some("probe"));
        assert_eq!(log.borrow().entered, 1);
        // Starting input is not replayed into the scene
        assert!(log.borrow().inputs.is_empty());
    }

    #[test]
    fn test_input_buffered_until_next_step() {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut engine = engine(log.clone());
        engine.start();
        engine.set_scene("probe").unwrap();

        engine.push_input(InputEvent::key_down("Space"));
        assert!(log.borrow().inputs.is_empty());
        engine.update(FIXED_STEP_MS);
        assert_eq!(log.borrow().inputs.len(), 1);
        assert!(engine.input().is_key_down("Space"));
    }

    #[test]
    fn test_scene_switching() {
        let first = Rc::new(RefCell::new(Log::default()));
        let second = Rc::new(RefCell::new(Log::default()));
        let mut engine = engine(first.clone());
        engine.add_scene("other", Box::new(ProbeScene(second.clone())));

        engine.set_scene("probe").unwrap();
        engine.add_entity(Box::new(FloatingText::new("x", Vec2::ZERO, Color::WHITE)));
        engine.set_scene("other").unwrap();
        assert_eq!(first.borrow().exited, 1);
        assert_eq!(second.borrow().entered, 1);
        assert_eq!(engine.entity_count(), 0);

        assert!(matches!(
            engine.set_scene("missing"),
            Err(EngineError::UnknownScene(_))
        ));
        assert_eq!(engine.current_scene(), Some("other"));
    }

    #[test]
    fn test_events_reach_sink_and_ledger() {
        let log = Rc::new(RefCell::new(Log::default()));
        let sounds = Recorder::default();
        let reports = Reports::default();
        let mut engine = Engine::builder(EngineConfig::default())
            .surface(DrawList::new(WIDTH, HEIGHT))
            .sound(Box::new(sounds.clone()))
            .ledger(Box::new(reports.clone()))
            .scene("probe", Box::new(ProbeScene(log)))
            .build()
            .unwrap();

        engine.start();
        engine.set_scene("probe").unwrap();
        assert_eq!(*sounds.0.borrow(), vec![Sfx::PowerUp]);

        engine.push_input(InputEvent::key_down("KeyG"));
        engine.push_input(InputEvent::key_down("KeyD"));
        engine.update(FIXED_STEP_MS);
        assert_eq!(reports.0.borrow().len(), 1);
        assert!(engine.show_debug());
    }

    #[test]
    fn test_entity_registry() {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut engine = engine(log);
        let id = engine.add_entity(Box::new(FloatingText::new("+1", Vec2::ZERO, Color::WHITE)));
        assert_eq!(engine.find_entities("floating_text"), vec![id]);
        assert!(engine.remove_entity(id));
        assert!(!engine.remove_entity(id));
        assert!(engine.find_entities("floating_text").is_empty());
    }

    #[test]
    fn test_debug_overlay() {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut engine = engine(log);
        engine.start();
        engine.set_scene("probe").unwrap();
        engine.set_show_debug(true);
        engine.frame(0.0);
        let texts: Vec<&str> = engine.canvas().texts().collect();
        assert!(texts.iter().any(|t| t.starts_with("FPS")));
        assert!(texts.iter().any(|t| t.starts_with("Particles")));
    }

    #[test]
    fn test_custom_system_runs_per_step() {
        struct Ticks(Rc<RefCell<u32>>);
        impl System for Ticks {
            fn update(&mut self, _dt_ms: f32) {
                *self.0.borrow_mut() += 1;
            }
        }

        let log = Rc::new(RefCell::new(Log::default()));
        let ticks = Rc::new(RefCell::new(0));
        let mut engine = engine(log);
        engine.register_system("ticks", Box::new(Ticks(ticks.clone())));
        assert!(engine.system("ticks").is_some());
        engine.update(FIXED_STEP_MS);
        engine.update(FIXED_STEP_MS);
        assert_eq!(*ticks.borrow(), 2);
    }

    #[test]
    fn test_game_scene_run_reports_once_and_restarts() {
        use crate::game::{GAME_SCENE, GameScene};
        use crate::tuning::Tuning;

        let reports = Reports::default();
        let mut engine = Engine::builder(EngineConfig::default())
            .surface(DrawList::new(WIDTH, HEIGHT))
            .ledger(Box::new(reports.clone()))
            .scene(GAME_SCENE, Box::new(GameScene::new(Tuning::default(), 3)))
            .build()
            .unwrap();

        engine.push_input(InputEvent::key_down("Space"));
        assert!(engine.is_running());
        assert_eq!(engine.current_scene(), Some(GAME_SCENE));

        // No flaps: the bird falls to the floor
        for _ in 0..600 {
            engine.update(FIXED_STEP_MS);
        }
        assert_eq!(reports.0.borrow().len(), 1);
        assert_eq!(engine.systems().store.get::<u64>("score"), Some(0));

        engine.push_input(InputEvent::key_down("KeyR"));
        engine.update(FIXED_STEP_MS);
        for _ in 0..600 {
            engine.update(FIXED_STEP_MS);
        }
        assert_eq!(reports.0.borrow().len(), 2);
    }

    /// Long-lived, motionless particles so only maintenance removes them
    const HOLD: EffectPreset = EffectPreset {
        count: 20,
        speed: [0.0, 0.0],
        life_ms: [60_000.0, 60_000.0],
        gravity: 0.0,
        ..EffectPreset::TRAIL
    };

    fn quiet_engine(log: Rc<RefCell<Log>>) -> Engine<DrawList> {
        let mut engine = Engine::builder(EngineConfig {
            start_scene: "probe".into(),
            ambient_sparkles: false,
            ..Default::default()
        })
        .surface(DrawList::new(WIDTH, HEIGHT))
        .scene("probe", Box::new(ProbeScene(log)))
        .build()
        .unwrap();
        engine.start();
        engine.set_scene("probe").unwrap();
        engine
    }

    #[test]
    fn test_slow_frames_throttle_particles() {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut engine = quiet_engine(log);
        let spawned = engine.systems_mut().particles.create_effect(
            ParticleKind::Trail,
            Vec2::new(200.0, 300.0),
            Some(&HOLD),
        );
        assert_eq!(spawned, 20);

        // 10 fps: the sample window fills on the 60th slow frame
        engine.frame(0.0);
        for i in 1..60 {
            engine.frame(i as f64 * 100.0);
            assert_eq!(engine.systems().particles.active_count(), 20);
        }
        engine.frame(6000.0);
        assert_eq!(engine.performance().status(), Some(PerfStatus::Poor));
        assert_eq!(engine.systems().particles.active_count(), 15);

        // Cooldown holds off a second throttle
        engine.frame(6100.0);
        assert_eq!(engine.systems().particles.active_count(), 15);
    }

    #[test]
    fn test_periodic_optimize_trims_pools() {
        let log = Rc::new(RefCell::new(Log::default()));
        let mut engine = quiet_engine(log);
        let preset = EffectPreset { count: 10, ..HOLD };
        engine.systems_mut().particles.create_effect(
            ParticleKind::Trail,
            Vec2::new(200.0, 300.0),
            Some(&preset),
        );

        let trail_pool_size = |engine: &Engine<DrawList>| {
            engine
                .systems()
                .particles
                .stats()
                .pools
                .iter()
                .find(|(kind, _)| *kind == ParticleKind::Trail)
                .map(|(_, stats)| stats.pool_size())
        };

        engine.frame(0.0);
        engine.frame(4999.0);
        assert_eq!(trail_pool_size(&engine), Some(50));

        // max_active 10 -> target ceil(10 * 1.2) = 12
        engine.frame(5000.0);
        assert_eq!(trail_pool_size(&engine), Some(12));
        assert_eq!(engine.systems().particles.active_count(), 10);
    }
}
