//! SpeedBall entry point
//!
//! In the browser this wires input, focus and LocalStorage into the frame
//! loop and draws each `FrameView` on a 2D canvas. Natively it is a small
//! CLI for rendering backgrounds and running headless demo games.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::f64::consts::TAU;
    use std::rc::Rc;

    use wasm_bindgen::Clamped;
    use wasm_bindgen::prelude::*;
    use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, ImageData, KeyboardEvent};

    use speedball::noise::{Background, BackgroundJob, background_params};
    use speedball::persistence::{KeyValueStore, MemoryStore, SCRATCH_SLOT, SetupStore, StatsStore};
    use speedball::platform::{LocalStorage, now_ms};
    use speedball::sim::autopilot::demo_input;
    use speedball::sim::effects::EffectLayer;
    use speedball::sim::player::star_points;
    use speedball::sim::state::{Camera, FrameView};
    use speedball::sim::style::Hsl;
    use speedball::sim::{GameConfig, GameEvent, GamePhase, GameState, TickInput, tick};
    use speedball::Settings;

    /// Game instance holding all state
    struct Game {
        state: GameState,
        settings: Settings,
        store: Box<dyn KeyValueStore>,
        background: Background,
        background_job: Option<BackgroundJob>,
        background_image: Option<ImageData>,
        input: TickInput,
        last_time: f64,
        demo: bool,
        canvas: HtmlCanvasElement,
        ctx: CanvasRenderingContext2d,
    }

    impl Game {
        fn new(canvas: HtmlCanvasElement, ctx: CanvasRenderingContext2d, seed: u64) -> Self {
            let mut store: Box<dyn KeyValueStore> = match LocalStorage::open() {
                Ok(storage) => Box::new(storage),
                Err(e) => {
                    log::warn!("{}; progress will not be kept", e);
                    Box::new(MemoryStore::new())
                }
            };
            let settings = Settings::load(&*store);

            let (w, h) = (canvas.width(), canvas.height());
            let mut config = GameConfig::with_viewport(w as f32, h as f32);
            config.particle_scale = settings.particle_scale();
            config.trail_scale = settings.trail_scale();

            // A setup handed over from the customisation panel, if any
            let setup = SetupStore::new(&mut *store).retrieve(SCRATCH_SLOT).ok();

            let background_job = settings
                .background_enabled()
                .then(|| BackgroundJob::spawn(background_params(w, h), seed));

            Self {
                state: GameState::new(config, setup.as_ref(), seed),
                settings,
                store,
                background: Background::new(h as f32),
                background_job,
                background_image: None,
                input: TickInput::default(),
                last_time: 0.0,
                demo: false,
                canvas,
                ctx,
            }
        }

        fn update(&mut self, delta_ms: f32) {
            if let Some(job) = self.background_job.as_mut() {
                if self.background.poll(job) {
                    self.background_job = None;
                    self.background_image = self.background.field().and_then(|field| {
                        ImageData::new_with_u8_clamped_array_and_sh(Clamped(field.pixels()), field.width(), field.height())
                            .ok()
                    });
                }
            }

            let document_focused = web_sys::window()
                .and_then(|w| w.document())
                .and_then(|d| d.has_focus().ok())
                .unwrap_or(true);
            self.input.focused = document_focused || !self.settings.pause_on_blur;

            let input = if self.demo {
                TickInput {
                    focused: self.input.focused,
                    ..demo_input(&self.state)
                }
            } else {
                self.input.clone()
            };
            let events = tick(&mut self.state, &input, delta_ms);

            // Clear one-shot inputs after processing
            self.input.toggle_move = false;
            self.input.restart = false;

            if self.state.phase != GamePhase::Paused {
                self.background.update(delta_ms, self.state.scroll_speed());
            }

            for event in events {
                self.handle_event(event);
            }
        }

        fn handle_event(&mut self, event: GameEvent) {
            if let GameEvent::GameOver {
                distance,
                stars_earned,
                stars_collected,
            } = event
            {
                match StatsStore::new(&mut *self.store).record_run(distance, stars_earned, stars_collected) {
                    Ok(stats) => log::info!("Best distance so far: {}", stats.best_distance),
                    Err(e) => log::warn!("Could not save stats: {}", e),
                }
            }
        }

        fn render(&self) -> Result<(), JsValue> {
            let view = self.state.view();
            let ctx = &self.ctx;
            let (w, h) = (self.canvas.width() as f64, self.canvas.height() as f64);
            ctx.clear_rect(0.0, 0.0, w, h);

            if let Some(image) = &self.background_image {
                for y in self.background.draw_offsets() {
                    ctx.put_image_data(image, 0.0, y as f64)?;
                }
            }

            ctx.save();
            apply_camera(ctx, &view.camera)?;
            draw_track(ctx, &view);
            if view.trail.layer == EffectLayer::Normal {
                draw_trail(ctx, &view)?;
            }
            draw_powerups(ctx, &view);
            draw_player(ctx, &view)?;
            if view.trail.layer == EffectLayer::Overlay {
                draw_trail(ctx, &view)?;
            }
            ctx.restore();

            if self.settings.show_stats {
                draw_hud(ctx, &view)?;
            }
            draw_overlay(ctx, &view, w, h)?;
            Ok(())
        }
    }

    fn apply_camera(ctx: &CanvasRenderingContext2d, camera: &Camera) -> Result<(), JsValue> {
        ctx.translate(camera.origin.x as f64, camera.origin.y as f64)?;
        ctx.rotate(camera.rotation as f64)?;
        ctx.translate(-camera.target.x as f64, -camera.target.y as f64)
    }

    fn trace_polygon(ctx: &CanvasRenderingContext2d, points: impl IntoIterator<Item = glam::Vec2>) {
        ctx.begin_path();
        for (i, p) in points.into_iter().enumerate() {
            if i == 0 {
                ctx.move_to(p.x as f64, p.y as f64);
            } else {
                ctx.line_to(p.x as f64, p.y as f64);
            }
        }
        ctx.close_path();
    }

    fn draw_track(ctx: &CanvasRenderingContext2d, view: &FrameView) {
        for seg in &view.segments {
            let [(_, inner), _] = seg.gradient.stops(seg.hue);
            ctx.set_fill_style_str(&inner.to_css());
            ctx.fill_rect(seg.x as f64, seg.y as f64, seg.width as f64, seg.height as f64);
        }
        ctx.set_stroke_style_str(view.segments.first().map_or("skyblue", |s| s.border));
        ctx.set_line_width(2.0);
        for seg in &view.segments {
            ctx.stroke_rect(seg.x as f64, seg.y as f64, seg.width as f64, seg.height as f64);
        }
    }

    fn draw_trail(ctx: &CanvasRenderingContext2d, view: &FrameView) -> Result<(), JsValue> {
        let trail = &view.trail;
        for p in &trail.particles {
            ctx.set_fill_style_str(&p.color.to_css());
            ctx.begin_path();
            ctx.arc(p.pos.x as f64, p.pos.y as f64, (p.size * 0.5) as f64, 0.0, TAU)?;
            ctx.fill();
        }
        ctx.set_line_cap("round");
        ctx.set_shadow_blur(trail.blur as f64);
        ctx.set_shadow_color(&Hsl::shade(trail.hue, 50.0).to_css());
        ctx.set_stroke_style_str(&Hsl::shade(trail.hue, 60.0).to_css());
        for line in &trail.lines {
            ctx.set_line_width(line.width as f64);
            ctx.begin_path();
            ctx.move_to(line.p1.x as f64, line.p1.y as f64);
            ctx.line_to(line.p2.x as f64, line.p2.y as f64);
            ctx.stroke();
        }
        ctx.set_shadow_blur(0.0);
        Ok(())
    }

    fn draw_powerups(ctx: &CanvasRenderingContext2d, view: &FrameView) {
        for p in &view.powerups {
            let r = p.size * 0.5;
            ctx.set_global_alpha(p.alpha as f64);
            ctx.set_fill_style_str("gold");
            trace_polygon(ctx, star_points(r, r * 0.5, p.angle).into_iter().map(|q| q + p.pos));
            ctx.fill();
        }
        ctx.set_global_alpha(1.0);
    }

    fn draw_player(ctx: &CanvasRenderingContext2d, view: &FrameView) -> Result<(), JsValue> {
        let player = &view.player;
        ctx.save();
        ctx.translate(player.pos.x as f64, player.pos.y as f64)?;
        ctx.rotate(player.angle as f64)?;
        ctx.set_fill_style_str(&Hsl::shade(player.hue, 55.0).to_css());
        trace_polygon(ctx, player.body.iter().copied());
        ctx.fill();
        if let Some(face) = player.face {
            ctx.set_fill_style_str("black");
            ctx.begin_path();
            for eye in face.eyes {
                ctx.move_to((eye.x + face.eye_radius) as f64, eye.y as f64);
                ctx.arc(eye.x as f64, eye.y as f64, face.eye_radius as f64, 0.0, TAU)?;
            }
            ctx.fill();
            ctx.set_line_width(face.line_width as f64);
            ctx.begin_path();
            ctx.move_to(face.smile_from.x as f64, face.smile_from.y as f64);
            ctx.quadratic_curve_to(
                face.smile_control.x as f64,
                face.smile_control.y as f64,
                face.smile_to.x as f64,
                face.smile_to.y as f64,
            );
            ctx.stroke();
        }
        ctx.restore();
        Ok(())
    }

    fn draw_hud(ctx: &CanvasRenderingContext2d, view: &FrameView) -> Result<(), JsValue> {
        let hud = &view.hud;
        ctx.set_fill_style_str("white");
        ctx.set_font("16px monospace");
        ctx.fill_text(&format!("Speed: {:.1}", hud.speed), 16.0, 24.0)?;
        ctx.fill_text(&format!("Distance: {}", hud.distance), 16.0, 44.0)?;
        ctx.fill_text(&format!("Stars: {}", hud.stars_collected), 16.0, 64.0)?;
        ctx.fill_text(&format!("FPS: {}", hud.frame_rate), 16.0, 84.0)
    }

    fn draw_overlay(ctx: &CanvasRenderingContext2d, view: &FrameView, w: f64, h: f64) -> Result<(), JsValue> {
        ctx.set_text_align("center");
        ctx.set_fill_style_str("white");
        ctx.set_font("24px sans-serif");
        match view.phase {
            GamePhase::Ready => ctx.fill_text("Press Space to start", w * 0.5, h * 0.3)?,
            GamePhase::Paused => ctx.fill_text("Paused", w * 0.5, h * 0.3)?,
            GamePhase::GameOver => {
                ctx.fill_text(&format!("Distance: {}", view.hud.distance), w * 0.5, h * 0.425)?;
                ctx.fill_text("Press 'Enter' to start new game.", w * 0.5, h * 0.425 + 80.0)?;
            }
            GamePhase::Running => {}
        }
        ctx.set_text_align("start");

        if let Some(stars) = &view.stars {
            ctx.set_stroke_style_str("gold");
            ctx.set_fill_style_str("gold");
            for (i, slot) in stars.slots.iter().enumerate() {
                trace_polygon(ctx, stars.outline.iter().map(|p| *p + *slot));
                if (i as u32) < stars.shown {
                    ctx.fill();
                } else {
                    ctx.stroke();
                }
            }
            if let Some((slot, size, angle)) = stars.incoming {
                if let Some(centre) = stars.slots.get(slot) {
                    let r = size * 0.5;
                    trace_polygon(ctx, star_points(r, r * 0.5, angle).into_iter().map(|p| p + *centre));
                    ctx.fill();
                }
            }
        }
        Ok(())
    }

    pub fn run() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        if console_log::init_with_level(log::Level::Info).is_err() {
            web_sys::console::warn_1(&"Logger already initialised".into());
        }

        log::info!("SpeedBall starting...");

        let window = web_sys::window().ok_or("no window")?;
        let document = window.document().ok_or("no document")?;

        let canvas: HtmlCanvasElement = document.get_element_by_id("canvas").ok_or("no canvas")?.dyn_into()?;
        let dpr = window.device_pixel_ratio();
        canvas.set_width((canvas.client_width() as f64 * dpr) as u32);
        canvas.set_height((canvas.client_height() as f64 * dpr) as u32);

        let ctx: CanvasRenderingContext2d = canvas.get_context("2d")?.ok_or("no 2d context")?.dyn_into()?;

        let seed = now_ms() as u64;
        let game = Rc::new(RefCell::new(Game::new(canvas, ctx, seed)));
        log::info!("Game initialized with seed: {}", seed);

        setup_input_handlers(game.clone())?;
        request_animation_frame(game);

        log::info!("SpeedBall running!");
        Ok(())
    }

    fn setup_input_handlers(game: Rc<RefCell<Game>>) -> Result<(), JsValue> {
        let window = web_sys::window().ok_or("no window")?;

        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                let mut g = game.borrow_mut();
                match event.code().as_str() {
                    "Space" if !event.repeat() => {
                        event.prevent_default();
                        g.input.toggle_move = true;
                    }
                    "Enter" => g.input.restart = true,
                    "KeyI" => {
                        g.demo = !g.demo;
                        log::info!("Demo mode: {}", g.demo);
                    }
                    _ => {}
                }
            });
            window.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }

        {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                let mut g = game.borrow_mut();
                let Some(window) = web_sys::window() else { return };
                let dpr = window.device_pixel_ratio();
                let w = (g.canvas.client_width() as f64 * dpr) as u32;
                let h = (g.canvas.client_height() as f64 * dpr) as u32;
                g.canvas.set_width(w);
                g.canvas.set_height(h);
                g.state.resize(w as f32, h as f32);
            });
            window.add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }
        Ok(())
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

            let delta_ms = if g.last_time > 0.0 { (time - g.last_time) as f32 } else { 16.0 };
            g.last_time = time;

            g.update(delta_ms);
            if let Err(e) = g.render() {
                log::warn!("Render error: {:?}", e);
            }
        }

        request_animation_frame(game);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() -> Result<(), JsValue> {
    wasm_game::run()
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use std::path::PathBuf;
    use std::process::ExitCode;

    use clap::{Parser, Subcommand};

    use speedball::Settings;
    use speedball::noise::{NoiseField, Rgb, background_params};
    use speedball::persistence::{
        JsonFileStore, KeyValueStore, MemoryStore, SetupError, SetupStore, StatsStore, StoreError,
    };
    use speedball::settings::CodeOutcome;
    use speedball::sim::autopilot::demo_input;
    use speedball::sim::{GameConfig, GameEvent, GamePhase, GameState, tick};

    const FRAME_MS: f32 = 16.0;

    #[derive(Debug, thiserror::Error)]
    pub enum CliError {
        #[error(transparent)]
        Store(#[from] StoreError),
        #[error(transparent)]
        Setup(#[from] SetupError),
        #[error("could not write image: {0}")]
        Image(#[from] image::ImageError),
        #[error("invalid colour {0:?}, expected #rrggbb")]
        InvalidColor(String),
    }

    #[derive(Parser)]
    #[command(name = "speedball", about = "Headless tools for the SpeedBall track racer")]
    struct Cli {
        /// Enable verbose logging
        #[arg(short, long)]
        verbose: bool,

        #[command(subcommand)]
        command: Commands,
    }

    #[derive(Subcommand)]
    enum Commands {
        /// Render a Worley-noise background to a PNG
        Background {
            /// Viewport width; the image is this wide
            #[arg(long, default_value_t = 1280)]
            width: u32,
            /// Viewport height; the image is twice this tall
            #[arg(long, default_value_t = 720)]
            height: u32,
            #[arg(short, long, default_value_t = 42)]
            seed: u64,
            /// Colour next to a seed point
            #[arg(long)]
            start_color: Option<String>,
            /// Colour far from every seed point
            #[arg(long)]
            end_color: Option<String>,
            #[arg(short, long, default_value = "background.png")]
            out: PathBuf,
        },
        /// Play runs with the demo driver and record stats
        Simulate {
            #[arg(short, long, default_value_t = 42)]
            seed: u64,
            #[arg(short, long, default_value_t = 1)]
            runs: u32,
            /// Frames allowed per run before giving up
            #[arg(long, default_value_t = 20_000)]
            max_frames: u32,
            #[arg(long, default_value_t = 1280.0)]
            width: f32,
            #[arg(long, default_value_t = 720.0)]
            height: f32,
            /// Saved setup slot to play with
            #[arg(long)]
            setup: Option<u64>,
            /// JSON store file; memory only when omitted
            #[arg(long)]
            store: Option<PathBuf>,
        },
        /// List saved setups
        Setups {
            #[arg(long)]
            store: PathBuf,
        },
        /// Apply a maintenance code
        Code {
            code: String,
            #[arg(long)]
            store: PathBuf,
            /// Confirm destructive codes
            #[arg(short, long)]
            yes: bool,
        },
    }

    fn parse_color(value: Option<String>, default: Rgb) -> Result<Rgb, CliError> {
        match value {
            Some(hex) => Rgb::from_hex(&hex).ok_or(CliError::InvalidColor(hex)),
            None => Ok(default),
        }
    }

    fn open_store(path: Option<PathBuf>) -> Result<Box<dyn KeyValueStore>, CliError> {
        Ok(match path {
            Some(path) => Box::new(JsonFileStore::open(path)?),
            None => Box::new(MemoryStore::new()),
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn simulate(
        seed: u64,
        runs: u32,
        max_frames: u32,
        width: f32,
        height: f32,
        setup: Option<u64>,
        store: Option<PathBuf>,
    ) -> Result<(), CliError> {
        let mut store = open_store(store)?;
        let settings = Settings::load(&*store);
        let setup = setup
            .map(|slot| SetupStore::new(&mut *store).retrieve(slot))
            .transpose()?;

        let mut config = GameConfig::with_viewport(width, height);
        config.particle_scale = settings.particle_scale();
        config.trail_scale = settings.trail_scale();
        let mut state = GameState::new(config, setup.as_ref(), seed);

        for run in 0..runs {
            let mut frames = 0;
            let mut collected = 0;
            while state.phase != GamePhase::GameOver && frames < max_frames {
                let input = demo_input(&state);
                for event in tick(&mut state, &input, FRAME_MS) {
                    match event {
                        GameEvent::PowerUpCollected { total } => collected = total,
                        GameEvent::MilestoneReached { index } => log::debug!("Run {} milestone {}", run, index),
                        GameEvent::GameOver {
                            distance,
                            stars_earned,
                            stars_collected,
                        } => {
                            StatsStore::new(&mut *store).record_run(distance, stars_earned, stars_collected)?;
                        }
                        _ => {}
                    }
                }
                frames += 1;
            }
            let outcome = if state.phase == GamePhase::GameOver { "crashed" } else { "timed out" };
            println!(
                "run {}: {} after {} frames, distance {}, {} stars earned, {} power-ups",
                run,
                outcome,
                frames,
                state.distance(),
                state.stars_earned(),
                collected
            );
            state.restart();
        }

        let stats = StatsStore::new(&mut *store).load();
        println!(
            "best distance {}, cumulative {}, stars earned {}, stars collected {}",
            stats.best_distance, stats.cumulative_distance, stats.stars_earned, stats.stars_collected
        );
        Ok(())
    }

    fn execute(command: Commands) -> Result<(), CliError> {
        match command {
            Commands::Background {
                width,
                height,
                seed,
                start_color,
                end_color,
                out,
            } => {
                let mut params = background_params(width, height);
                params.start_color = parse_color(start_color, params.start_color)?;
                params.end_color = parse_color(end_color, params.end_color)?;
                let mut rng = rand_pcg::Pcg32::new(seed, 0);
                let field = NoiseField::generate(params, &mut rng);
                field.write_png(&out)?;
                println!("wrote {}x{} background to {}", field.width(), field.height(), out.display());
            }
            Commands::Simulate {
                seed,
                runs,
                max_frames,
                width,
                height,
                setup,
                store,
            } => simulate(seed, runs, max_frames, width, height, setup, store)?,
            Commands::Setups { store } => {
                let store = JsonFileStore::open(store)?;
                let setups = SetupStore::new(store).list();
                if setups.is_empty() {
                    println!("no saved setups");
                }
                for (slot, setup) in setups {
                    println!(
                        "{}: {:?} {} size {} hue {} with {}",
                        slot,
                        setup.setup_name,
                        setup.player_props.player_type.as_str(),
                        setup.player_props.size,
                        setup.player_props.hue,
                        setup.effect_props.kind().as_str()
                    );
                }
            }
            Commands::Code { code, store, yes } => {
                let mut store = JsonFileStore::open(store)?;
                let outcome = Settings::apply_code(&code, yes, &mut store)?;
                println!("{}", outcome.message());
                if outcome == CodeOutcome::Cancelled {
                    println!("pass --yes to confirm");
                }
            }
        }
        Ok(())
    }

    pub fn run() -> ExitCode {
        let cli = Cli::parse();

        let filter = if cli.verbose { "debug" } else { "info" };
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

        match execute(cli.command) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                log::error!("{}", e);
                ExitCode::FAILURE
            }
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> std::process::ExitCode {
    cli::run()
}
