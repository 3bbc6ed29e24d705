//! Wavelab - transverse, longitudinal and standing waves you can play with
//!
//! Parameters respond to the keyboard, to a shared state token, or to a
//! live pitch/loudness estimate from a microphone, a WAV file or a synth.

use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use wavelab::audio::{list_input_devices, CaptureSource};
use wavelab::cli::Args;
use wavelab::field::{ViewTransform, WaveMode};
use wavelab::params::{EstimatorConfig, RenderConfig};
use wavelab::rendering::{PixelSurface, RenderSystem};
use wavelab::session::{Session, SessionConfig, TickOutcome};
use wavelab::settings::{ExplanationDetail, SettingsStore};
use wavelab::snapshot::encode_token;

/// Multiplicative step for arrow-key edits
const EDIT_STEP: f32 = 1.1;
/// Multiplicative step for the speed multiplier
const SPEED_STEP: f32 = 1.25;

/// Main application state
struct App {
    // Window and presentation
    window: Option<Arc<Window>>,
    render_system: Option<RenderSystem>,
    surface: PixelSurface,

    // Simulation
    session: Session,
    capture_source: Option<CaptureSource>,

    // Preferences
    settings: SettingsStore,
    detail: ExplanationDetail,

    render_config: RenderConfig,
    start_time: Instant,
    title: String,
    init_error: Option<anyhow::Error>,
}

impl App {
    fn new(
        session: Session,
        render_config: RenderConfig,
        capture_source: Option<CaptureSource>,
        settings: SettingsStore,
    ) -> Self {
        let detail = settings.explanation_detail();
        Self {
            window: None,
            render_system: None,
            surface: PixelSurface::new(render_config.window_width, render_config.window_height),
            session,
            capture_source,
            settings,
            detail,
            render_config,
            start_time: Instant::now(),
            title: String::new(),
            init_error: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window_attributes = Window::default_attributes()
            .with_title("Wavelab")
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.render_config.window_width,
                self.render_config.window_height,
            ));
        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .context("Failed to create window")?,
        );

        let frame_size = (self.surface.width(), self.surface.height());
        let render_system = pollster::block_on(RenderSystem::new(Arc::clone(&window), frame_size))
            .context("Failed to initialize renderer")?;

        if let Some(source) = self.capture_source.clone() {
            // Failure leaves the session on manual parameters
            self.session.start_audio(&source);
        }

        println!("\nWavelab is running!");
        println!("Space pause | 1/2/3 mode | L/C/S view | arrows f/λ | K lock | M audio");
        println!("F freeze | [ ] scrub | V arrows | D band | -/= speed | T token | P screenshot | E detail | Esc quit\n");

        self.window = Some(window);
        self.render_system = Some(render_system);
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return; // Already initialized
        }
        if let Err(e) = self.init(event_loop) {
            self.init_error = Some(e);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(code),
                        ..
                    },
                ..
            } => self.handle_key(code, event_loop),
            WindowEvent::Resized(size) => {
                if let Some(render_system) = self.render_system.as_mut() {
                    render_system.resize(size.width, size.height);
                }
            }
            WindowEvent::Occluded(occluded) => {
                self.session.set_visible(!occluded);
            }
            WindowEvent::Focused(focused) => {
                self.session.set_visible(focused);
            }
            WindowEvent::RedrawRequested => {
                self.render_frame(event_loop);
            }
            _ => {}
        }
    }
}

impl App {
    /// Advance the session one tick and present the surface
    fn render_frame(&mut self, event_loop: &ActiveEventLoop) {
        let now = self.start_time.elapsed();
        let surface = if self.render_system.is_some() {
            Some(&mut self.surface)
        } else {
            None
        };

        match self.session.tick(now, surface) {
            TickOutcome::SkippedNoSurface => return,
            TickOutcome::Rendered | TickOutcome::Held => {}
        }

        if let Some(render_system) = self.render_system.as_mut() {
            match render_system.present(&self.surface) {
                Ok(()) => {}
                Err(wgpu::SurfaceError::OutOfMemory) => {
                    error!("GPU out of memory; exiting");
                    event_loop.exit();
                }
                Err(e) => warn!("Present skipped: {:?}", e),
            }
        }

        self.update_title();
    }

    fn update_title(&mut self) {
        let title = format!("Wavelab | {}", self.session.describe(self.detail));
        if title != self.title {
            if let Some(window) = &self.window {
                window.set_title(&title);
            }
            self.title = title;
        }
    }

    fn handle_key(&mut self, code: KeyCode, event_loop: &ActiveEventLoop) {
        let session = &mut self.session;
        match code {
            KeyCode::Escape => event_loop.exit(),
            KeyCode::Space => session.scheduler_mut().toggle(),

            KeyCode::Digit1 => session.set_mode(WaveMode::Transverse),
            KeyCode::Digit2 => session.set_mode(WaveMode::Longitudinal),
            KeyCode::Digit3 => session.set_mode(WaveMode::Standing),

            KeyCode::KeyL => session.set_view(ViewTransform::Lab),
            KeyCode::KeyC => session.set_view(ViewTransform::CoMoving),
            KeyCode::KeyS => session.set_view(ViewTransform::Stroboscopic),

            KeyCode::ArrowUp => {
                let frequency = session.params().frequency() * EDIT_STEP;
                session.params_mut().set_frequency(frequency);
            }
            KeyCode::ArrowDown => {
                let frequency = session.params().frequency() / EDIT_STEP;
                session.params_mut().set_frequency(frequency);
            }
            KeyCode::ArrowRight => {
                let wavelength = session.params().wavelength() * EDIT_STEP;
                session.params_mut().set_wavelength(wavelength);
            }
            KeyCode::ArrowLeft => {
                let wavelength = session.params().wavelength() / EDIT_STEP;
                session.params_mut().set_wavelength(wavelength);
            }
            KeyCode::KeyK => {
                let locked = !session.params().speed_lock();
                session.params_mut().set_speed_lock(locked);
                info!("Speed lock {}", if locked { "on" } else { "off" });
            }

            KeyCode::KeyR => session.scheduler_mut().reset_clock(),
            KeyCode::KeyF => {
                if session.mapper().is_frozen() {
                    session.mapper_mut().unfreeze();
                    info!("Live audio resumed");
                } else if session.mapper_mut().freeze() {
                    info!("Frozen on the last {:.1}s of audio", session.mapper().history().span_s());
                } else {
                    info!("Nothing captured to freeze yet");
                }
            }
            KeyCode::BracketLeft => session.mapper_mut().step(-1),
            KeyCode::BracketRight => session.mapper_mut().step(1),
            KeyCode::KeyM => self.toggle_audio(),

            KeyCode::KeyV => {
                let toggles = session.toggles_mut();
                toggles.show_velocity_arrows = !toggles.show_velocity_arrows;
            }
            KeyCode::KeyD => {
                let toggles = session.toggles_mut();
                toggles.show_density_band = !toggles.show_density_band;
            }
            KeyCode::Minus => {
                let speed = session.scheduler().speed() / SPEED_STEP;
                session.scheduler_mut().set_speed(speed);
            }
            KeyCode::Equal => {
                let speed = session.scheduler().speed() * SPEED_STEP;
                session.scheduler_mut().set_speed(speed);
            }

            KeyCode::KeyT => {
                let token = encode_token(&session.snapshot());
                println!("Share token: {}", token);
            }
            KeyCode::KeyP => self.save_screenshot(),
            KeyCode::KeyE => {
                self.detail = self.detail.cycle();
                self.settings.set_explanation_detail(self.detail);
            }
            _ => {}
        }
    }

    fn toggle_audio(&mut self) {
        if self.session.audio_driving() {
            self.session.stop_audio();
            return;
        }
        let source = self
            .capture_source
            .clone()
            .unwrap_or(CaptureSource::Microphone { device_index: None });
        self.session.start_audio(&source);
    }

    fn save_screenshot(&self) {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let path = format!("wavelab-{}.png", stamp);
        match self.surface.save_png(&path) {
            Ok(()) => info!("Saved screenshot {}", path),
            Err(e) => warn!("Screenshot failed: {}", e),
        }
    }
}

/// Render a single frame without a window and write it to `path`
fn headless_screenshot(session: &mut Session, render_config: &RenderConfig, args: &Args) -> Result<()> {
    let Some(path) = &args.screenshot else {
        return Ok(());
    };
    let mut surface = PixelSurface::new(render_config.window_width, render_config.window_height);
    session.render_at(&mut surface, args.screenshot_time.max(0.0));
    surface
        .save_png(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Saved screenshot {}", path.display());
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    if args.list_devices {
        let devices = list_input_devices().context("Failed to list input devices")?;
        if devices.is_empty() {
            println!("No audio input devices found");
        }
        for (index, name) in devices.iter().enumerate() {
            println!("{}: {}", index, name);
        }
        return Ok(());
    }

    let render_config = args.render_config()?;
    let capture_source = args.capture_source()?;
    let estimator = EstimatorConfig::default();
    estimator.validate()?;

    let mut session = Session::new(SessionConfig {
        estimator,
        render: render_config.clone(),
        ..SessionConfig::default()
    });
    session.apply_snapshot(&args.initial_snapshot());

    if args.screenshot.is_some() {
        return headless_screenshot(&mut session, &render_config, &args);
    }

    info!("Wavelab - interactive wave simulator");
    let settings = SettingsStore::open_default();
    let mut app = App::new(session, render_config, capture_source, settings);
    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    event_loop.run_app(&mut app).context("Event loop failed")?;

    if let Some(e) = app.init_error.take() {
        return Err(e);
    }
    Ok(())
}
