//! Tilt Drive entry point
//!
//! Handles platform-specific initialization and runs the game loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;

    use glam::Vec3;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen_futures::JsFuture;
    use web_sys::{DeviceOrientationEvent, KeyboardEvent, MouseEvent};

    use tilt_drive::audio::AudioManager;
    use tilt_drive::consts::MAX_FRAME_DT;
    use tilt_drive::platform::{
        InputCache, Primitive, SceneHandle, SceneService, SceneSync, SoundDirector, Transform,
    };
    use tilt_drive::sim::{self, DriveState, GamePhase};
    use tilt_drive::ui::Hud;
    use tilt_drive::{DriveConfig, Settings};

    // Host bridge: orientation permission, scene host, optional config
    #[wasm_bindgen(inline_js = "
        export function request_orientation_permission() {
            if (typeof DeviceOrientationEvent !== 'undefined' &&
                typeof DeviceOrientationEvent.requestPermission === 'function') {
                return DeviceOrientationEvent.requestPermission();
            }
            return Promise.resolve('not-required');
        }

        export function scene_place(key, kind, x, y, z, yaw, roll, scale, a, b) {
            const s = window.driveScene;
            if (s && s.place) s.place(key, kind, x, y, z, yaw, roll, scale, a, b);
        }

        export function scene_remove(key) {
            const s = window.driveScene;
            if (s && s.remove) s.remove(key);
        }

        export function scene_camera(px, py, pz, lx, ly, lz) {
            const s = window.driveScene;
            if (s && s.camera) s.camera(px, py, pz, lx, ly, lz);
        }

        export function drive_config_json() {
            return window.driveConfig ? JSON.stringify(window.driveConfig) : undefined;
        }
    ")]
    extern "C" {
        fn request_orientation_permission() -> js_sys::Promise;
        #[allow(clippy::too_many_arguments)]
        fn scene_place(
            key: &str,
            kind: &str,
            x: f32,
            y: f32,
            z: f32,
            yaw: f32,
            roll: f32,
            scale: f32,
            a: f32,
            b: f32,
        );
        fn scene_remove(key: &str);
        fn scene_camera(px: f32, py: f32, pz: f32, lx: f32, ly: f32, lz: f32);
        fn drive_config_json() -> Option<String>;
    }

    /// Scene service backed by the page's `window.driveScene` object
    struct JsScene;

    impl SceneService for JsScene {
        fn place(&mut self, handle: SceneHandle, primitive: &Primitive, t: &Transform) {
            let (a, b) = match *primitive {
                Primitive::Car { damaged, flame } => (if damaged { 1.0 } else { 0.0 }, flame),
                Primitive::RoadSegment { width, length } => (width, length),
                Primitive::Obstacle { radius, .. } => (radius, 0.0),
                Primitive::Particle { opacity, .. } => (opacity, 0.0),
            };
            let p = t.position;
            scene_place(
                &handle.to_string(),
                primitive.as_str(),
                p.x,
                p.y,
                p.z,
                t.yaw,
                t.roll,
                t.scale,
                a,
                b,
            );
        }

        fn remove(&mut self, handle: SceneHandle) {
            scene_remove(&handle.to_string());
        }

        fn camera(&mut self, position: Vec3, look_at: Vec3) {
            scene_camera(
                position.x, position.y, position.z, look_at.x, look_at.y, look_at.z,
            );
        }
    }

    /// Game instance holding all state
    struct Game {
        state: DriveState,
        settings: Settings,
        input: InputCache,
        scene: SceneSync,
        js_scene: JsScene,
        sound: SoundDirector,
        audio: AudioManager,
        /// Last HUD written to the DOM
        hud: Option<Hud>,
        last_time: f64,
        /// Demo driver instead of player input
        autopilot: bool,
    }

    impl Game {
        fn new(config: DriveConfig, settings: Settings, seed: u64) -> Self {
            let mut audio = AudioManager::new();
            audio.set_master_volume(settings.effective_volume());
            Self {
                state: DriveState::new(config, seed),
                settings,
                input: InputCache::new(),
                scene: SceneSync::default(),
                js_scene: JsScene,
                sound: SoundDirector::new(),
                audio,
                hud: None,
                last_time: 0.0,
                autopilot: false,
            }
        }

        /// One animation frame
        fn frame(&mut self, dt: f32) {
            self.poll_gamepad();
            let input = if self.autopilot {
                sim::autopilot(&self.state)
            } else {
                self.input.sample(self.settings.controls)
            };
            sim::tick(&mut self.state, &input, dt);
            self.present();
        }

        /// Push state out to audio, scene and HUD
        fn present(&mut self) {
            let events = self.state.drain_events();
            for event in &events {
                log::debug!("{:?}", event);
            }
            self.sound.update(
                &self.state,
                &events,
                self.settings.sound_enabled,
                &mut self.audio,
            );
            self.scene.sync(&self.state, &mut self.js_scene);
            self.update_hud();
        }

        /// Latest analog axis from the first connected controller
        fn poll_gamepad(&mut self) {
            let Some(window) = web_sys::window() else { return };
            let Ok(pads) = window.navigator().get_gamepads() else {
                return;
            };
            let axis = pads
                .iter()
                .filter_map(|p| p.dyn_into::<web_sys::Gamepad>().ok())
                .find(|p| p.connected())
                .and_then(|p| p.axes().get(0).as_f64())
                .map(|x| x as f32)
                .filter(|x| x.abs() > 0.15);
            self.input.on_axis(axis);
        }

        fn start(&mut self) {
            self.audio.resume();
            if sim::start(&mut self.state) {
                self.present();
            }
        }

        fn stop(&mut self) {
            if sim::stop(&mut self.state) {
                self.input.release_keys();
                self.present();
            }
        }

        fn restart(&mut self) {
            if sim::restart(&mut self.state) {
                self.present();
            }
        }

        fn toggle_sound(&mut self) {
            let on = self.settings.toggle_sound();
            self.settings.save();
            self.audio.set_master_volume(self.settings.effective_volume());
            if on {
                self.audio.resume();
            }
            set_text("sound-button", if on { "Sound: On" } else { "Sound: Off" });
            self.present();
        }

        fn toggle_debug(&mut self) {
            self.settings.toggle_debug();
            self.settings.save();
            self.update_hud();
        }

        /// Update HUD elements in DOM; only changed fields are written
        fn update_hud(&mut self) {
            let hud = Hud::from_state(&self.state, &self.settings);
            let prev = self.hud.take().unwrap_or_default();
            let first = prev == Hud::default();

            if first || hud.distance != prev.distance {
                set_text("hud-distance", &hud.distance);
            }
            if first || hud.speed != prev.speed {
                set_text("hud-speed", &hud.speed);
            }
            if first || hud.laps != prev.laps {
                set_optional_text("hud-laps", hud.laps.as_deref());
            }
            if first || hud.telemetry != prev.telemetry {
                set_optional_text("hud-debug", hud.telemetry.as_deref());
            }
            if first || hud.banner != prev.banner {
                set_optional_text("crash-banner", hud.banner.as_deref());
            }
            if first || hud.buttons != prev.buttons {
                set_visible("start-button", hud.buttons.start);
                set_visible("stop-button", hud.buttons.stop);
                set_visible("restart-button", hud.buttons.restart);
            }

            self.hud = Some(hud);
        }
    }

    fn document() -> Option<web_sys::Document> {
        web_sys::window()?.document()
    }

    /// Missing elements are skipped
    fn element(id: &str) -> Option<web_sys::HtmlElement> {
        document()?.get_element_by_id(id)?.dyn_into().ok()
    }

    fn set_text(id: &str, text: &str) {
        if let Some(el) = element(id) {
            el.set_text_content(Some(text));
        }
    }

    fn set_visible(id: &str, visible: bool) {
        if let Some(el) = element(id) {
            let display = if visible { "block" } else { "none" };
            let _ = el.style().set_property("display", display);
        }
    }

    fn set_optional_text(id: &str, text: Option<&str>) {
        if let Some(text) = text {
            set_text(id, text);
        }
        set_visible(id, text.is_some());
    }

    fn load_config(settings: &Settings) -> DriveConfig {
        let mut config = match drive_config_json() {
            Some(json) => DriveConfig::from_json(&json).unwrap_or_else(|e| {
                log::warn!("Invalid driveConfig, using defaults: {}", e);
                DriveConfig::default()
            }),
            None => DriveConfig::default(),
        };
        settings.apply_to(&mut config);
        config
    }

    pub fn run() {
        console_error_panic_hook::set_once();
        if console_log::init_with_level(log::Level::Info).is_err() {
            web_sys::console::warn_1(&"Logger already initialized".into());
        }

        log::info!("Tilt Drive starting...");

        let mut settings = Settings::load();
        if let Some(query) = web_sys::window().and_then(|w| w.location().search().ok()) {
            settings.apply_query(&query);
        }
        let config = load_config(&settings);
        let seed = js_sys::Date::now() as u64;
        log::info!("Road seed: {}", seed);

        let game = Rc::new(RefCell::new(Game::new(config, settings, seed)));
        {
            let mut g = game.borrow_mut();
            let sound = g.settings.sound_enabled;
            set_text("sound-button", if sound { "Sound: On" } else { "Sound: Off" });
            g.present();
        }

        setup_buttons(game.clone());
        setup_input_handlers(game.clone());
        setup_auto_stop(game.clone());

        request_animation_frame(game);

        log::info!("Tilt Drive running!");
    }

    fn on_click(id: &str, game: &Rc<RefCell<Game>>, action: fn(&Rc<RefCell<Game>>)) {
        let Some(btn) = element(id) else {
            log::warn!("Missing #{}; control disabled", id);
            return;
        };
        let game = game.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
            action(&game);
        });
        let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn setup_buttons(game: Rc<RefCell<Game>>) {
        on_click("start-button", &game, start_with_permission);
        on_click("stop-button", &game, |g| g.borrow_mut().stop());
        on_click("restart-button", &game, |g| g.borrow_mut().restart());
        on_click("sound-button", &game, |g| g.borrow_mut().toggle_sound());
        on_click("debug-button", &game, |g| g.borrow_mut().toggle_debug());
    }

    /// Start driving; on browsers that gate orientation events, ask first.
    /// Denial is not fatal: steering falls back to the keyboard.
    fn start_with_permission(game: &Rc<RefCell<Game>>) {
        let wants_tilt = {
            let g = game.borrow();
            g.settings.controls.uses_tilt()
                && g.input.permission() == tilt_drive::platform::TiltPermission::Unknown
        };
        if wants_tilt {
            let promise = request_orientation_permission();
            let game_cb = game.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let granted = match JsFuture::from(promise).await {
                    Ok(answer) => match answer.as_string().as_deref() {
                        Some("granted") => Some(true),
                        Some("not-required") => None,
                        _ => Some(false),
                    },
                    Err(e) => {
                        log::warn!("Orientation permission request failed: {:?}", e);
                        Some(false)
                    }
                };
                if let Some(granted) = granted {
                    game_cb.borrow_mut().input.set_permission(granted);
                }
            });
        }
        game.borrow_mut().start();
    }

    fn setup_input_handlers(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else { return };

        // Device tilt
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: DeviceOrientationEvent| {
                game.borrow_mut().input.on_orientation(event.gamma());
            });
            let _ = window.add_event_listener_with_callback(
                "deviceorientation",
                closure.as_ref().unchecked_ref(),
            );
            closure.forget();
        }

        // Keyboard
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                let key = event.key();
                if game.borrow_mut().input.on_key(&key, true) {
                    event.prevent_default();
                    return;
                }
                match key.as_str() {
                    " " | "Enter" => {
                        let phase = game.borrow().state.phase;
                        match phase {
                            GamePhase::Ready | GamePhase::Paused => start_with_permission(&game),
                            GamePhase::Restartable => game.borrow_mut().restart(),
                            _ => {}
                        }
                    }
                    "Escape" | "p" | "P" => game.borrow_mut().stop(),
                    "i" | "I" => {
                        let mut g = game.borrow_mut();
                        g.autopilot = !g.autopilot;
                        log::info!("Autopilot: {}", g.autopilot);
                    }
                    _ => {}
                }
            });
            let _ = window
                .add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
            closure.forget();
        }
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                game.borrow_mut().input.on_key(&event.key(), false);
            });
            let _ = window
                .add_event_listener_with_callback("keyup", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_auto_stop(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else { return };
        let Some(document) = window.document() else { return };

        // Visibility change (tab switch, minimize)
        {
            let game = game.clone();
            let document_clone = document.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                if document_clone.visibility_state() == web_sys::VisibilityState::Hidden {
                    let mut g = game.borrow_mut();
                    if g.settings.pause_on_blur && g.state.phase == GamePhase::Driving {
                        g.stop();
                        log::info!("Auto-stopped (tab hidden)");
                    }
                }
            });
            let _ = document.add_event_listener_with_callback(
                "visibilitychange",
                closure.as_ref().unchecked_ref(),
            );
            closure.forget();
        }

        // Window blur: keyup events will not arrive
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                game.borrow_mut().input.release_keys();
            });
            let _ = window.add_event_listener_with_callback("blur", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else { return };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        {
            let mut g = game.borrow_mut();

            let dt = if g.last_time > 0.0 {
                (((time - g.last_time) / 1000.0) as f32).min(MAX_FRAME_DT)
            } else {
                0.0
            };
            g.last_time = time;

            g.frame(dt);
        }

        request_animation_frame(game);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_game::run();
}

/// Headless autopilot run of the drive loop
#[cfg(not(target_arch = "wasm32"))]
#[derive(clap::Parser, Debug)]
#[command(name = "tilt-drive")]
#[command(about = "Drive a generated road with the autopilot and report the result", long_about = None)]
struct Cli {
    /// Road seed
    #[arg(long, default_value_t = 2024)]
    seed: u64,

    /// Simulated seconds to drive
    #[arg(long, default_value_t = 60.0, value_parser = parse_seconds)]
    seconds: f32,

    /// JSON drive config layered over the defaults
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,
}

#[cfg(not(target_arch = "wasm32"))]
fn parse_seconds(s: &str) -> Result<f32, String> {
    let seconds: f32 = s.parse().map_err(|e| format!("{}", e))?;
    if seconds.is_finite() && seconds > 0.0 {
        Ok(seconds)
    } else {
        Err(format!("must be a positive number of seconds (got {})", s))
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use clap::Parser;

    env_logger::init();
    let cli = Cli::parse();
    log::info!("Tilt Drive (native) starting...");
    log::info!("Headless autopilot run - use `trunk serve` for the web version");

    let config = match &cli.config {
        Some(path) => match std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|json| tilt_drive::DriveConfig::from_json(&json).map_err(|e| e.to_string()))
        {
            Ok(config) => config,
            Err(e) => {
                log::error!("Failed to load config {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => tilt_drive::DriveConfig::default(),
    };

    headless::run(config, cli.seed, cli.seconds);
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use glam::Vec3;

    use tilt_drive::Settings;
    use tilt_drive::platform::{Primitive, SceneHandle, SceneService, SceneSync, Transform};
    use tilt_drive::sim::{self, DriveState, GameEvent, GamePhase};
    use tilt_drive::tuning::DriveConfig;
    use tilt_drive::ui::Hud;

    const DT: f32 = 1.0 / 60.0;

    /// Scene stand-in that only counts calls
    #[derive(Default)]
    struct CountingScene {
        placed: usize,
        removed: usize,
    }

    impl SceneService for CountingScene {
        fn place(&mut self, _handle: SceneHandle, _primitive: &Primitive, _transform: &Transform) {
            self.placed += 1;
        }

        fn remove(&mut self, _handle: SceneHandle) {
            self.removed += 1;
        }

        fn camera(&mut self, _position: Vec3, _look_at: Vec3) {}
    }

    pub fn run(config: DriveConfig, seed: u64, seconds: f32) {
        let settings = Settings::default();
        let mut state = DriveState::new(config, seed);
        let mut sync = SceneSync::default();
        let mut scene = CountingScene::default();

        sim::start(&mut state);
        let frames = (seconds / DT) as usize;
        for _ in 0..frames {
            let input = sim::autopilot(&state);
            sim::tick(&mut state, &input, DT);
            sync.sync(&state, &mut scene);

            for event in state.drain_events() {
                match event {
                    GameEvent::Crashed { cause, distance } => {
                        log::warn!("Autopilot {} at {:.0} m", cause, distance)
                    }
                    other => log::debug!("{:?}", other),
                }
            }
            if state.phase == GamePhase::Restartable {
                sim::restart(&mut state);
            }
        }

        let hud = Hud::from_state(&state, &settings);
        log::info!(
            "Done: {} at {}, {} crashes, road {} segments, scene {} placed / {} removed",
            hud.distance,
            hud.speed,
            state.crashes,
            state.road.curve.len(),
            scene.placed,
            scene.removed
        );
        println!(
            "seed {} | {} | {} | crashes {}",
            seed, hud.distance, hud.speed, state.crashes
        );
    }
}
