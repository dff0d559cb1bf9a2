use std::collections::HashSet;
use std::num::NonZeroU32;
use std::path::Path;
use std::process::ExitCode;
use std::rc::Rc;
use std::time::{Duration, Instant};

use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use crate::camera::Camera;
use crate::config::Config;
use crate::error::{EngineError, Result};
use crate::input::{InputState, Motion};
use crate::present::BlitMap;
use crate::texture::TextureSet;
use crate::world::{Level, WorldMap};

mod camera;
mod config;
mod error;
mod input;
mod math;
mod present;
mod raycast;
mod render;
mod texture;
mod world;

const CONFIG_PATH: &str = "gridcaster.ron";

struct App {
    window: Option<Rc<Window>>,
    surface: Option<softbuffer::Surface<Rc<Window>, Rc<Window>>>,

    config: Config,
    world: WorldMap,
    camera: Camera,
    textures: TextureSet,
    motion: Motion,

    // FPS reporting
    frame_counter: u32,
    last_fps_print: Instant,

    // Internal framebuffer, stretched onto the window surface on present
    fb: Vec<u32>,
    fb_w: usize,
    fb_h: usize,
    blit: BlitMap,

    // Input and movement
    keys_down: HashSet<KeyCode>,
    last_tick: Instant,

    // A frame error stops the loop and fails the process
    failure: Option<EngineError>,
}

impl App {
    fn new(config: Config) -> Result<Self> {
        let level = match &config.level_path {
            Some(path) => Level::load(path)?,
            None => Level::builtin(),
        };
        info!(
            width = level.map.width(),
            height = level.map.height(),
            "world map ready"
        );

        let assets_dir = config.resolve_assets_dir();
        match &assets_dir {
            Some(dir) => info!(dir = %dir.display(), "loading textures"),
            None => info!("no assets directory configured; using procedural textures"),
        }
        let textures = TextureSet::load(assets_dir.as_deref())?;

        let camera = Camera::new(level.spawn, level.facing);
        let motion = Motion {
            move_speed: config.move_speed,
            turn_speed: config.turn_speed,
            eye_speed: config.eye_speed,
        };

        Ok(Self {
            window: None,
            surface: None,
            config,
            world: level.map,
            camera,
            textures,
            motion,
            frame_counter: 0,
            last_fps_print: Instant::now(),
            fb: Vec::new(),
            fb_w: 0,
            fb_h: 0,
            blit: BlitMap::empty(),
            keys_down: HashSet::new(),
            last_tick: Instant::now(),
            failure: None,
        })
    }

    fn tick(&mut self) -> Result<()> {
        // Compute dt with a cap so a paused window doesn't teleport the
        // camera on the next frame
        let now = Instant::now();
        let mut dt = now.duration_since(self.last_tick);
        self.last_tick = now;
        if dt > Duration::from_millis(100) {
            dt = Duration::from_millis(100);
        }

        let input = InputState::from_keys(&self.keys_down);
        let delta = input::map_input(input, self.camera.dir, &self.motion, dt.as_secs_f32());
        input::apply_delta(&mut self.camera, &self.world, delta)
    }

    fn rebuild_internal_fb_and_blit(&mut self, dst_w: usize, dst_h: usize) {
        if dst_w == 0 || dst_h == 0 {
            return;
        }

        // Internal height is fixed; width follows the window's aspect
        let target_h = self.config.internal_height.max(120);
        let aspect = dst_w as f32 / dst_h as f32;
        let mut target_w = (target_h as f32 * aspect).round() as usize;
        if target_w < 160 {
            target_w = 160;
        }
        if target_w % 2 != 0 {
            target_w += 1;
        }

        if target_w != self.fb_w || target_h != self.fb_h {
            self.fb_w = target_w;
            self.fb_h = target_h;
            self.fb = vec![0u32; self.fb_w * self.fb_h];
            info!(width = target_w, height = target_h, "internal framebuffer resized");
        }
        self.blit = BlitMap::build(dst_w, dst_h, self.fb_w, self.fb_h);
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: EngineError) {
        error!("frame failed: {err}");
        self.failure = Some(err);
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let attributes = Window::default_attributes()
            .with_title("gridcaster")
            .with_inner_size(LogicalSize::new(
                self.config.window_width as f64,
                self.config.window_height as f64,
            ));

        let window = Rc::new(event_loop.create_window(attributes).expect("create window"));

        let context = softbuffer::Context::new(window.clone()).expect("softbuffer context");
        let surface =
            softbuffer::Surface::new(&context, window.clone()).expect("softbuffer surface");

        let size = window.inner_size();
        self.rebuild_internal_fb_and_blit(size.width as usize, size.height as usize);

        self.surface = Some(surface);
        self.window = Some(window);

        self.last_tick = Instant::now();
        self.window.as_ref().unwrap().request_redraw();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("close requested; stopping");
                event_loop.exit();
            }

            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key,
                        state,
                        ..
                    },
                ..
            } => {
                if let PhysicalKey::Code(code) = physical_key {
                    match state {
                        ElementState::Pressed => {
                            self.keys_down.insert(code);
                        }
                        ElementState::Released => {
                            self.keys_down.remove(&code);
                        }
                    }
                }
            }

            WindowEvent::RedrawRequested => {
                if let Err(err) = self.tick() {
                    self.fail(event_loop, err);
                    return;
                }

                if self.fb_w == 0 || self.fb_h == 0 {
                    return;
                }
                if let Err(err) = render::render_frame(
                    &mut self.fb,
                    self.fb_w,
                    self.fb_h,
                    &self.world,
                    &self.camera,
                    &self.textures,
                    self.config.textured_floor,
                ) {
                    self.fail(event_loop, err);
                    return;
                }

                let (window, surface) = match (&self.window, &mut self.surface) {
                    (Some(w), Some(s)) if w.id() == id => (w, s),
                    _ => return,
                };

                let size = window.inner_size();
                let (dw, dh) = (size.width as usize, size.height as usize);
                if dw == 0 || dh == 0 {
                    return; // Minimized window, skip drawing
                }

                surface
                    .resize(
                        NonZeroU32::new(dw as u32).unwrap(),
                        NonZeroU32::new(dh as u32).unwrap(),
                    )
                    .unwrap();

                let mut buf = surface.buffer_mut().expect("buffer_mut");
                self.blit.stretch(&mut buf, dw, &self.fb);
                buf.present().unwrap();

                self.frame_counter += 1;
                let now = Instant::now();
                if now.duration_since(self.last_fps_print).as_secs_f32() >= 1.0 {
                    let fps = self.frame_counter as f32
                        / now.duration_since(self.last_fps_print).as_secs_f32();
                    info!("{fps:.1} fps");
                    self.frame_counter = 0;
                    self.last_fps_print = now;
                }

                self.window.as_ref().unwrap().request_redraw();
            }

            WindowEvent::Resized(new_size) => {
                let (dw, dh) = (new_size.width as usize, new_size.height as usize);
                self.rebuild_internal_fb_and_blit(dw, dh);
            }
            _ => (),
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = if Path::new(CONFIG_PATH).exists() {
        match Config::load(Path::new(CONFIG_PATH)) {
            Ok(config) => {
                info!("loaded {CONFIG_PATH}");
                config
            }
            Err(err) => {
                error!("bad config: {err}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        Config::default()
    };

    let mut app = match App::new(config) {
        Ok(app) => app,
        Err(err) => {
            error!("startup failed: {err}");
            return ExitCode::FAILURE;
        }
    };

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(err) => {
            error!("failed to create event loop: {err}");
            return ExitCode::FAILURE;
        }
    };
    // Wait pauses the loop between events; about_to_wait keeps frames
    // coming by requesting the next redraw
    event_loop.set_control_flow(ControlFlow::Wait);

    if let Err(err) = event_loop.run_app(&mut app) {
        error!("event loop stopped: {err}");
        return ExitCode::FAILURE;
    }

    match app.failure {
        Some(_) => ExitCode::FAILURE,
        None => ExitCode::SUCCESS,
    }
}
