//! FlappyCrypto entry point
//!
//! Handles platform-specific initialization and runs the game loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;

    use glam::Vec2;
    use wasm_bindgen::prelude::*;
    use web_sys::{HtmlCanvasElement, KeyboardEvent, MouseEvent, TouchEvent};

    use flappy_crypto::audio::AudioManager;
    use flappy_crypto::consts::*;
    use flappy_crypto::engine::{Engine, EngineConfig, InputEvent};
    use flappy_crypto::game::{GAME_SCENE, GameScene};
    use flappy_crypto::platform::LocalStorage;
    use flappy_crypto::renderer::Canvas2d;
    use flappy_crypto::{GameReport, ScoreLedger, SessionLedger, Settings, Tuning};

    /// Session leaderboard that also announces each run to the page
    struct DomLedger {
        session: SessionLedger,
    }

    impl ScoreLedger for DomLedger {
        fn submit(&mut self, report: &GameReport) {
            self.session.submit(report);

            let Ok(json) = serde_json::to_string(report) else {
                return;
            };
            let Some(window) = web_sys::window() else {
                return;
            };
            let init = web_sys::CustomEventInit::new();
            if let Ok(detail) = js_sys::JSON::parse(&json) {
                init.set_detail(&detail);
            }
            match web_sys::CustomEvent::new_with_event_init_dict("gameOver", &init) {
                Ok(event) => {
                    let _ = window.dispatch_event(&event);
                }
                Err(e) => log::warn!("Could not dispatch gameOver: {:?}", e),
            }
        }
    }

    /// Engine plus the animation loop flag
    struct Game {
        engine: Engine<Canvas2d>,
        /// An animation frame is scheduled
        looping: bool,
    }

    type Shared = Rc<RefCell<Game>>;

    impl Game {
        /// Forward input, then kick the loop if that started the engine
        fn input(game: &Shared, event: InputEvent) {
            let should_loop = {
                let mut g = game.borrow_mut();
                g.engine.push_input(event);
                g.engine.is_running() && !g.looping
            };
            if should_loop {
                request_animation_frame(game.clone());
            }
        }
    }

    pub fn run() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::warn_1(&format!("Logger already set: {}", e).into());
        }

        log::info!("FlappyCrypto starting...");

        let window = web_sys::window().ok_or("no window")?;
        let document = window.document().ok_or("no document")?;

        if let Some(loading) = document.get_element_by_id("loading") {
            let _ = loading.set_attribute("class", "hidden");
        }

        let canvas: HtmlCanvasElement = document
            .get_element_by_id("canvas")
            .ok_or("no canvas")?
            .dyn_into()?;

        let settings = match LocalStorage::open() {
            Ok(storage) => Settings::load(&storage),
            Err(e) => {
                log::warn!("LocalStorage unavailable: {}", e);
                Settings::default()
            }
        };

        let mut audio = AudioManager::new();
        audio.apply_settings(&settings);

        let seed = js_sys::Date::now() as u64;
        let tuning = Tuning::default().with_preference(settings.difficulty);
        let scene = GameScene::new(tuning, seed).with_trails(settings.trails);

        let surface = Canvas2d::new(&canvas, WIDTH, HEIGHT)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        let engine = Engine::builder(EngineConfig::from_settings(&settings))
            .surface(surface)
            .sound(Box::new(audio))
            .ledger(Box::new(DomLedger {
                session: SessionLedger::new(),
            }))
            .scene(GAME_SCENE, Box::new(scene))
            .build()
            .map_err(|e| JsValue::from_str(&e.to_string()))?;

        log::info!("Game initialized with seed: {}", seed);

        let game = Rc::new(RefCell::new(Game {
            engine,
            looping: false,
        }));

        setup_input_handlers(&canvas, game.clone());
        setup_auto_pause(game.clone());

        log::info!("FlappyCrypto ready - tap or press Space");
        Ok(())
    }

    fn request_animation_frame(game: Shared) {
        game.borrow_mut().looping = true;
        let closure = Closure::once(move |time: f64| {
            let keep_going = game.borrow_mut().engine.frame(time);
            if keep_going {
                request_animation_frame(game);
            } else {
                game.borrow_mut().looping = false;
                log::debug!("Animation loop parked");
            }
        });
        if let Some(window) = web_sys::window() {
            let _ = window.request_animation_frame(closure.into_js_value().unchecked_ref());
        }
    }

    /// Pointer position in logical play-field coordinates
    fn field_pos(canvas: &HtmlCanvasElement, client_x: f64, client_y: f64) -> Vec2 {
        let rect = canvas.get_bounding_client_rect();
        let scale_x = WIDTH as f64 / rect.width().max(1.0);
        let scale_y = HEIGHT as f64 / rect.height().max(1.0);
        Vec2::new(
            ((client_x - rect.left()) * scale_x) as f32,
            ((client_y - rect.top()) * scale_y) as f32,
        )
    }

    fn setup_input_handlers(canvas: &HtmlCanvasElement, game: Shared) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };

        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                if event.code() == "Space" {
                    event.prevent_default();
                }
                if event.repeat() {
                    return;
                }
                Game::input(&game, InputEvent::KeyDown(event.code()));
            });
            let _ = document
                .add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                Game::input(&game, InputEvent::KeyUp(event.code()));
            });
            let _ = document
                .add_event_listener_with_callback("keyup", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        {
            let game = game.clone();
            let canvas_clone = canvas.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                let pos = field_pos(&canvas_clone, event.client_x() as f64, event.client_y() as f64);
                Game::input(
                    &game,
                    InputEvent::MouseDown {
                        pos,
                        button: event.button(),
                    },
                );
            });
            let _ = canvas
                .add_event_listener_with_callback("mousedown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        {
            let game = game.clone();
            let canvas_clone = canvas.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                let pos = field_pos(&canvas_clone, event.client_x() as f64, event.client_y() as f64);
                Game::input(&game, InputEvent::MouseMove { pos });
            });
            let _ = canvas
                .add_event_listener_with_callback("mousemove", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        {
            let game = game.clone();
            let canvas_clone = canvas.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: TouchEvent| {
                event.prevent_default();
                if let Some(touch) = event.touches().get(0) {
                    let pos =
                        field_pos(&canvas_clone, touch.client_x() as f64, touch.client_y() as f64);
                    Game::input(&game, InputEvent::TouchStart { pos });
                }
            });
            let _ = canvas
                .add_event_listener_with_callback("touchstart", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        {
            let closure = Closure::<dyn FnMut(_)>::new(move |event: TouchEvent| {
                event.prevent_default();
                Game::input(&game, InputEvent::TouchEnd);
            });
            let _ = canvas
                .add_event_listener_with_callback("touchend", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    /// Stop the engine when the tab is hidden or the window loses focus.
    /// The next primary action starts a fresh run.
    fn setup_auto_pause(game: Shared) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let Some(document) = window.document() else {
            return;
        };

        {
            let game = game.clone();
            let document_clone = document.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                if document_clone.visibility_state() == web_sys::VisibilityState::Hidden {
                    let mut g = game.borrow_mut();
                    if g.engine.is_running() {
                        g.engine.pause();
                        log::info!("Auto-paused (tab hidden)");
                    }
                    if let Ok(mut storage) = LocalStorage::open()
                        && let Err(e) = g.engine.systems().store.save(&mut storage)
                    {
                        log::warn!("Could not save game state: {}", e);
                    }
                }
            });
            let _ = document.add_event_listener_with_callback(
                "visibilitychange",
                closure.as_ref().unchecked_ref(),
            );
            closure.forget();
        }

        {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::FocusEvent| {
                let mut g = game.borrow_mut();
                if g.engine.is_running() {
                    g.engine.pause();
                    log::info!("Auto-paused (window blur)");
                }
            });
            let _ = window.add_event_listener_with_callback("blur", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() -> Result<(), JsValue> {
    wasm_game::run()
}

#[cfg(target_arch = "wasm32")]
fn main() {}

/// Headless run: scripted flaps against a recorded draw list
#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use flappy_crypto::consts::*;
    use flappy_crypto::engine::{Engine, EngineConfig, InputEvent};
    use flappy_crypto::game::{GAME_SCENE, GameScene};
    use flappy_crypto::renderer::DrawList;
    use flappy_crypto::{Settings, Tuning};

    env_logger::init();
    log::info!("FlappyCrypto (native) starting...");
    log::info!("Native mode runs headless - build for wasm32 to play in a browser");

    let frames: u32 = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(1800);
    let seed = 0x00f1_a9c0;

    let settings = Settings::default();
    let tuning = Tuning::default().with_preference(settings.difficulty);
    let scene = GameScene::new(tuning, seed).with_trails(settings.trails);
    let engine = Engine::builder(EngineConfig::from_settings(&settings))
        .surface(DrawList::new(WIDTH, HEIGHT))
        .scene(GAME_SCENE, Box::new(scene))
        .build();
    let mut engine = match engine {
        Ok(engine) => engine,
        Err(e) => {
            log::error!("Engine setup failed: {}", e);
            std::process::exit(1);
        }
    };

    let frame_ms = 1000.0 / 60.0;
    let mut now = 0.0;
    engine.push_input(InputEvent::key_down("Space"));
    for frame in 0..frames {
        // Hover around mid-screen
        if frame % 24 == 0 {
            engine.push_input(InputEvent::key_down("Space"));
        }
        now += frame_ms;
        if !engine.frame(now) {
            break;
        }
    }

    let store = &engine.systems().store;
    println!(
        "score {} | eth {} | distance {} | steps {} | draw commands {}",
        store.get_or::<u64>("score", 0),
        store.get_or::<u32>("eth", 0),
        store.get_or::<u32>("distance", 0),
        engine.steps(),
        engine.canvas().commands.len(),
    );
}
