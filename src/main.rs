// Antigravity particle field viewer
// Opens a window, mounts one field and drives it from winit redraws:
// the scene renderer draws instanced 3D shapes, the canvas renderer flat dots.
// Without a GPU the window shows a painted "not supported" message instead.

use std::cell::Cell;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use winit::{
    event::{Event as WinitEvent, WindowEvent},
    event_loop::EventLoop,
    window::Window,
};

use antigravity::engine::{
    Color, FieldBehavior, FieldRenderer, FrameDriver, FrameScheduler, FrameToken, HostContainer, Mount,
    RenderError, RendererKind, SimulationConfig,
    camera::FieldCamera,
    canvas::CanvasRenderer,
    driver::mount_or_fallback,
    egui_canvas::EguiCanvas,
    fallback::paint_message,
    gpu::{GpuContext, WgpuScene},
    input::{HostEvent, InputState},
    scene::SceneRenderer,
};

// ============================================================================
// COMMAND LINE
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "antigravity", about = "Pointer-reactive particle fields")]
struct Cli {
    /// Built-in preset: antigravity, floating or particles
    #[arg(long, default_value = "antigravity")]
    preset: String,

    /// TOML file overriding preset values
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum)]
    renderer: Option<RendererKind>,

    /// Number of entities
    #[arg(long)]
    count: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,
}

impl Cli {
    fn simulation_config(&self) -> anyhow::Result<SimulationConfig> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => SimulationConfig::preset(&self.preset)?,
        };
        if let Some(renderer) = self.renderer {
            config.renderer = renderer;
        }
        if let Some(count) = self.count {
            config.count = count;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        config.validate()?;
        Ok(config)
    }
}

// ============================================================================
// HOST GLUE
// ============================================================================

/// Frames are requested on `AboutToWait` and delivered on `RedrawRequested`.
/// The slot holds the one token the driver is waiting for.
struct RedrawScheduler {
    slot: Rc<Cell<Option<FrameToken>>>,
    next: u64,
}

impl FrameScheduler for RedrawScheduler {
    fn request_frame(&mut self) -> FrameToken {
        self.next += 1;
        let token = FrameToken(self.next);
        self.slot.set(Some(token));
        token
    }

    fn cancel_frame(&mut self, token: FrameToken) {
        if self.slot.get() == Some(token) {
            self.slot.set(None);
        }
    }
}

type SoftSurface = softbuffer::Surface<Arc<Window>, Arc<Window>>;

/// The window itself. Without a GPU it paints the fallback message on the CPU.
struct WindowHost {
    window: Arc<Window>,
    ink: Color,
    background: Color,
    message: Option<String>,
    surface: Option<SoftSurface>,
}

impl WindowHost {
    fn new(window: Arc<Window>, config: &SimulationConfig) -> anyhow::Result<Self> {
        let ink = config.palette()?.first().copied().unwrap_or(Color::WHITE);
        let background = Color::from_hex(&config.background)?;
        Ok(Self { window, ink, background, message: None, surface: None })
    }

    fn soft_surface(window: &Arc<Window>) -> Result<SoftSurface, softbuffer::SoftBufferError> {
        let context = softbuffer::Context::new(window.clone())?;
        softbuffer::Surface::new(&context, window.clone())
    }

    fn repaint(&mut self) {
        let (Some(message), Some(surface)) = (self.message.as_deref(), self.surface.as_mut()) else {
            return;
        };
        let (ink, background) = (self.ink, self.background);
        let size = self.window.inner_size();
        let (Some(width), Some(height)) = (NonZeroU32::new(size.width), NonZeroU32::new(size.height)) else {
            return;
        };
        let painted = surface.resize(width, height).and_then(|()| {
            let mut buffer = surface.buffer_mut()?;
            paint_message(&mut buffer, size.width, size.height, message, ink, background);
            buffer.present()
        });
        if let Err(err) = painted {
            log::warn!("fallback paint failed: {err}");
        }
    }
}

impl HostContainer for WindowHost {
    fn show_fallback(&mut self, message: &str) {
        self.window.set_title(&format!("Antigravity - {message}"));
        self.message = Some(message.to_string());
        match Self::soft_surface(&self.window) {
            Ok(surface) => self.surface = Some(surface),
            Err(err) => log::warn!("no software surface for the fallback message: {err}"),
        }
        self.window.request_redraw();
    }
}

fn build_renderer(
    window: &Arc<Window>,
    config: &SimulationConfig,
) -> Result<Box<dyn FieldRenderer>, RenderError> {
    let gpu = pollster::block_on(GpuContext::new(window.clone()))?;
    let size = window.inner_size();

    Ok(match config.renderer {
        RendererKind::Scene => {
            let camera = match config.behavior {
                FieldBehavior::Ring => FieldCamera::ring(),
                FieldBehavior::Repel | FieldBehavior::Drift => FieldCamera::floating(),
            };
            Box::new(SceneRenderer::new(WgpuScene::new(gpu), camera))
        }
        RendererKind::Canvas => {
            Box::new(CanvasRenderer::new(EguiCanvas::new(window.clone(), gpu), size.width, size.height))
        }
    })
}

// ============================================================================
// MAIN
// ============================================================================

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = cli.simulation_config()?;
    log::info!("starting {:?} field with {:?} renderer", config.behavior, config.renderer);

    let event_loop = EventLoop::new()?;

    let window_attributes = Window::default_attributes()
        .with_title("Antigravity")
        .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));

    let window = Arc::new(event_loop.create_window(window_attributes)?);
    let size = window.inner_size();

    let slot = Rc::new(Cell::new(None));
    let scheduler = RedrawScheduler { slot: slot.clone(), next: 0 };
    let mut host = WindowHost::new(window.clone(), &config)?;

    let mount = mount_or_fallback(
        build_renderer(&window, &config),
        scheduler,
        config,
        (size.width, size.height),
        &mut host,
        || log::info!("field ready"),
    )?;

    let mut driver: Option<FrameDriver<Box<dyn FieldRenderer>, RedrawScheduler>> = match mount {
        Mount::Running(driver) => Some(driver),
        Mount::Fallback => None,
    };
    let mut input = InputState::new((size.width, size.height));

    event_loop.run(move |event, control_flow| {
        match event {
            WinitEvent::WindowEvent {
                ref event,
                window_id,
            } if window_id == window.id() => {
                if let WindowEvent::RedrawRequested = event {
                    let Some(driver) = driver.as_mut() else {
                        host.repaint();
                        return;
                    };
                    let Some(token) = slot.take() else {
                        return;
                    };
                    if let Err(err) = driver.on_frame(token, Instant::now()) {
                        log::error!("{err}, exiting");
                        driver.dispose();
                        control_flow.exit();
                    }
                    return;
                }

                let Some(host_event) = input.process_event(event) else {
                    return;
                };
                match (host_event, driver.as_mut()) {
                    (HostEvent::CloseRequested, running) => {
                        if let Some(driver) = running {
                            driver.dispose();
                        }
                        control_flow.exit();
                    }
                    (HostEvent::Resized { .. }, None) => window.request_redraw(),
                    (_, None) => {}
                    (HostEvent::PointerMoved(p), Some(driver)) => driver.on_pointer_move(p, Instant::now()),
                    (HostEvent::PointerLeft, Some(driver)) => driver.on_pointer_leave(),
                    (HostEvent::Resized { width, height }, Some(driver)) => {
                        let minimized = width == 0 || height == 0;
                        if let Some(HostEvent::VisibilityChanged { visible }) = input.set_visible(!minimized) {
                            driver.on_visibility_change(visible);
                        }
                        driver.on_resize(width, height);
                    }
                    (HostEvent::VisibilityChanged { visible }, Some(driver)) => {
                        driver.on_visibility_change(visible)
                    }
                }
            }
            WinitEvent::AboutToWait => {
                if slot.get().is_some() {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    })?;

    Ok(())
}
