// Frame driver: owns one mounted simulation and its animation loop
//
// Lifecycle:
//   mount() ─► Running ⇄ Paused (window hidden) ─► Disposed
//
// The host calls `on_frame` once per scheduled frame with the token it was
// handed by `FrameScheduler::request_frame`. A frame whose token is stale, or
// that arrives after dispose, does nothing. Input handlers only write the
// pointer tracker, the pending viewport and the pause flag; the next frame
// reads them.

use std::time::{Duration, Instant};

use glam::Vec2;
use rand::SeedableRng;
use rand::rngs::StdRng;

use super::components::Color;
use super::config::{ConfigError, SimulationConfig};
use super::field::Field;
use super::integrate::{FrameClock, step_field};
use super::pointer::PointerTracker;
use super::renderer::{FieldRenderer, FrameInfo, RenderError};

/// Shown in the host container when the 3D backend cannot be acquired.
pub const UNSUPPORTED_MESSAGE: &str = "3D rendering not supported";

/// Opaque handle for one scheduled frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameToken(pub u64);

/// Host primitive that calls the driver back once per display refresh.
pub trait FrameScheduler {
    fn request_frame(&mut self) -> FrameToken;
    fn cancel_frame(&mut self, token: FrameToken);
}

/// Where the static fallback message goes when rendering is unavailable.
pub trait HostContainer {
    fn show_fallback(&mut self, message: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Running,
    Paused,
    Disposed,
}

/// Per-second frame statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStats {
    pub fps: u32,
    pub frame_time_avg_ms: f32,
    pub entity_count: usize,
    pub ticks: u32,
}

#[derive(Default)]
struct StatsWindow {
    started: Option<Instant>,
    frames: u32,
    ticks: u32,
    busy: Duration,
    last: FrameStats,
}

pub struct FrameDriver<R: FieldRenderer, S: FrameScheduler> {
    state: DriverState,
    config: SimulationConfig,
    palette: Vec<Color>,
    background: Color,
    field: Field,
    pointer: PointerTracker,
    clock: FrameClock,
    renderer: R,
    scheduler: S,
    pending: Option<FrameToken>,
    last_frame: Option<Instant>,
    viewport: (u32, u32),
    pending_viewport: Option<(u32, u32)>,
    rng: StdRng,
    stats: StatsWindow,
}

/// Result of mounting against a host.
pub enum Mount<R: FieldRenderer, S: FrameScheduler> {
    Running(FrameDriver<R, S>),
    Fallback,
}

/// Mount when the renderer is available, otherwise show the static fallback
/// and never start a loop.
pub fn mount_or_fallback<R, S>(
    renderer: Result<R, RenderError>,
    scheduler: S,
    config: SimulationConfig,
    viewport: (u32, u32),
    host: &mut dyn HostContainer,
    on_ready: impl FnOnce(),
) -> Result<Mount<R, S>, ConfigError>
where
    R: FieldRenderer,
    S: FrameScheduler,
{
    match renderer {
        Ok(renderer) => Ok(Mount::Running(FrameDriver::mount(renderer, scheduler, config, viewport, on_ready)?)),
        Err(err) => {
            log::error!("renderer unavailable: {err}");
            host.show_fallback(UNSUPPORTED_MESSAGE);
            Ok(Mount::Fallback)
        }
    }
}

impl<R: FieldRenderer, S: FrameScheduler> FrameDriver<R, S> {
    /// Validate the config, size the renderer, generate the first field and
    /// schedule the first frame. `on_ready` runs once everything is in place.
    pub fn mount(
        mut renderer: R,
        scheduler: S,
        config: SimulationConfig,
        viewport: (u32, u32),
        on_ready: impl FnOnce(),
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let palette = config.palette()?;
        let background = Color::from_hex(&config.background)?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        renderer.resize(viewport.0, viewport.1);

        let mut driver = Self {
            state: DriverState::Running,
            pointer: PointerTracker::new(config.auto_animate, config.idle_timeout()),
            palette,
            background,
            field: Field::default(),
            clock: FrameClock::new(),
            renderer,
            scheduler,
            pending: None,
            last_frame: None,
            viewport,
            pending_viewport: None,
            rng,
            stats: StatsWindow::default(),
            config,
        };
        driver.regenerate();
        driver.pending = Some(driver.scheduler.request_frame());

        log::info!(
            "mounted {:?} field: {} entities, viewport {}x{}",
            driver.config.behavior,
            driver.field.len(),
            viewport.0,
            viewport.1
        );
        on_ready();
        Ok(driver)
    }

    // ------------------------------------------------------------------------
    // Host callbacks
    // ------------------------------------------------------------------------

    /// Per-frame callback. Returns `Err` only for errors the host must act on
    /// (out of memory); everything else is handled or logged here.
    pub fn on_frame(&mut self, token: FrameToken, now: Instant) -> Result<(), RenderError> {
        if self.state == DriverState::Disposed || self.pending != Some(token) {
            return Ok(());
        }
        self.pending = None;

        if self.state == DriverState::Paused {
            // Keep ticking cheaply so a resume is picked up on the next refresh.
            self.last_frame = None;
            self.pending = Some(self.scheduler.request_frame());
            return Ok(());
        }

        let started = Instant::now();

        if let Some((width, height)) = self.pending_viewport.take() {
            self.viewport = (width, height);
            self.renderer.resize(width, height);
            // A still cursor now sits over a different simulation point.
            self.pointer.reproject(&self.renderer);
            self.regenerate();
        }

        let elapsed = self
            .last_frame
            .map(|t| now.saturating_duration_since(t))
            .unwrap_or(Duration::ZERO);
        self.last_frame = Some(now);

        let ticks = self.clock.advance(elapsed);
        let bounds = self.renderer.simulation_bounds(&self.config);
        for _ in 0..ticks {
            let time = self.clock.time();
            let target = self.pointer.resolve(now, time, &bounds);
            step_field(&mut self.field, target, time, &self.config);
            self.clock.finish_tick();
        }
        let target = self.pointer.resolve(now, self.clock.time(), &bounds);

        let frame = FrameInfo {
            target,
            time: self.clock.time(),
            config: &self.config,
            palette: &self.palette,
            background: self.background,
        };
        let drawn = self.renderer.draw(&self.field, &frame);

        self.pending = Some(self.scheduler.request_frame());
        self.record_stats(now, started.elapsed(), ticks);

        match drawn {
            Ok(()) => Ok(()),
            Err(RenderError::SurfaceLost) => {
                log::warn!("surface lost, reconfiguring");
                self.renderer.resize(self.viewport.0, self.viewport.1);
                Ok(())
            }
            Err(err @ RenderError::OutOfMemory) => Err(err),
            Err(err) => {
                log::warn!("{err}");
                Ok(())
            }
        }
    }

    pub fn on_pointer_move(&mut self, screen: Vec2, now: Instant) {
        if self.state == DriverState::Disposed {
            return;
        }
        self.pointer.pointer_moved(screen, now, &self.renderer);
    }

    pub fn on_pointer_leave(&mut self) {
        if self.state == DriverState::Disposed {
            return;
        }
        self.pointer.pointer_left();
    }

    /// Record a new viewport; applied at the start of the next running frame.
    pub fn on_resize(&mut self, width: u32, height: u32) {
        if self.state == DriverState::Disposed {
            return;
        }
        if width == 0 || height == 0 {
            log::debug!("ignoring zero-area resize {width}x{height}");
            return;
        }
        self.pending_viewport = Some((width, height));
    }

    pub fn on_visibility_change(&mut self, visible: bool) {
        let next = match (self.state, visible) {
            (DriverState::Disposed, _) => return,
            (_, true) => DriverState::Running,
            (_, false) => DriverState::Paused,
        };
        if next != self.state {
            log::debug!("frame driver {:?} -> {:?}", self.state, next);
            self.state = next;
            self.last_frame = None;
        }
    }

    /// Cancel the pending frame, then release renderer resources. Idempotent.
    pub fn dispose(&mut self) {
        if self.state == DriverState::Disposed {
            return;
        }
        self.state = DriverState::Disposed;
        if let Some(token) = self.pending.take() {
            self.scheduler.cancel_frame(token);
        }
        self.renderer.release();
        log::info!("frame driver disposed");
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    pub fn pointer(&self) -> &PointerTracker {
        &self.pointer
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn pending_frame(&self) -> Option<FrameToken> {
        self.pending
    }

    /// Simulation time in seconds.
    pub fn time(&self) -> f32 {
        self.clock.time()
    }

    pub fn stats(&self) -> FrameStats {
        self.stats.last
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    /// Replace the whole field against the renderer's current bounds.
    fn regenerate(&mut self) {
        let bounds = self.renderer.simulation_bounds(&self.config);
        self.field = Field::generate(bounds, self.config.count, &self.config, &mut self.rng);
        log::info!("field regenerated: {} entities in {:?}", self.field.len(), bounds.size());
    }

    fn record_stats(&mut self, now: Instant, busy: Duration, ticks: u32) {
        let window = &mut self.stats;
        let started = *window.started.get_or_insert(now);
        window.frames += 1;
        window.ticks += ticks;
        window.busy += busy;

        if now.saturating_duration_since(started) >= Duration::from_secs(1) {
            window.last = FrameStats {
                fps: window.frames,
                frame_time_avg_ms: window.busy.as_secs_f32() * 1000.0 / window.frames as f32,
                entity_count: self.field.len(),
                ticks: window.ticks,
            };
            log::info!(
                "FPS: {} | Entities: {} | Frame: {:.2} ms",
                window.last.fps,
                window.last.entity_count,
                window.last.frame_time_avg_ms
            );
            window.started = Some(now);
            window.frames = 0;
            window.ticks = 0;
            window.busy = Duration::ZERO;
        }
    }
}

impl<R: FieldRenderer, S: FrameScheduler> Drop for FrameDriver<R, S> {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::field::Bounds;
    use crate::engine::pointer::{PointerProjection, ScreenSpace};
    use glam::Vec3;

    #[derive(Default)]
    struct Manual {
        next: u64,
        cancelled: Vec<FrameToken>,
    }

    impl FrameScheduler for Manual {
        fn request_frame(&mut self) -> FrameToken {
            self.next += 1;
            FrameToken(self.next)
        }
        fn cancel_frame(&mut self, token: FrameToken) {
            self.cancelled.push(token);
        }
    }

    #[derive(Default)]
    struct Recorder {
        size: (u32, u32),
        draws: u32,
        resizes: u32,
        releases: u32,
        fail_next: Option<RenderError>,
    }

    impl PointerProjection for Recorder {
        fn screen_to_simulation(&self, screen: Vec2) -> Option<Vec3> {
            ScreenSpace.screen_to_simulation(screen)
        }
    }

    impl FieldRenderer for Recorder {
        fn resize(&mut self, width: u32, height: u32) {
            self.size = (width, height);
            self.resizes += 1;
        }
        fn simulation_bounds(&self, _: &SimulationConfig) -> Bounds {
            Bounds::from_size(self.size.0 as f32, self.size.1 as f32)
        }
        fn draw(&mut self, _: &Field, _: &FrameInfo) -> Result<(), RenderError> {
            self.draws += 1;
            match self.fail_next.take() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }
        fn release(&mut self) {
            self.releases += 1;
        }
    }

    fn config() -> SimulationConfig {
        SimulationConfig { count: 40, seed: Some(7), ..SimulationConfig::particles() }
    }

    fn mounted() -> FrameDriver<Recorder, Manual> {
        FrameDriver::mount(Recorder::default(), Manual::default(), config(), (320, 240), || {}).unwrap()
    }

    fn frame(driver: &mut FrameDriver<Recorder, Manual>, now: Instant) {
        let token = driver.pending_frame().unwrap();
        driver.on_frame(token, now).unwrap();
    }

    #[test]
    fn mount_generates_field_and_schedules_first_frame() {
        let mut ready = false;
        let driver =
            FrameDriver::mount(Recorder::default(), Manual::default(), config(), (320, 240), || ready = true)
                .unwrap();
        assert!(ready);
        assert_eq!(driver.state(), DriverState::Running);
        assert_eq!(driver.field().len(), 40);
        assert_eq!(driver.renderer().size, (320, 240));
        assert!(driver.pending_frame().is_some());
    }

    #[test]
    fn invalid_config_does_not_mount() {
        let bad = SimulationConfig { damping: 1.0, ..config() };
        let mut ready = false;
        let mounted = FrameDriver::mount(Recorder::default(), Manual::default(), bad, (10, 10), || ready = true);
        assert!(mounted.is_err());
        assert!(!ready);
    }

    #[test]
    fn stale_tokens_are_ignored() {
        let mut driver = mounted();
        let t0 = Instant::now();
        driver.on_frame(FrameToken(999), t0).unwrap();
        assert_eq!(driver.renderer().draws, 0);
        frame(&mut driver, t0);
        assert_eq!(driver.renderer().draws, 1);
    }

    #[test]
    fn time_advances_in_whole_ticks() {
        let mut driver = mounted();
        let t0 = Instant::now();
        frame(&mut driver, t0);
        assert_eq!(driver.time(), 0.0);
        frame(&mut driver, t0 + Duration::from_millis(60));
        assert!((driver.time() - 3.0 / 60.0).abs() < 1e-5);
    }

    #[test]
    fn hidden_window_freezes_simulation() {
        let mut driver = mounted();
        let t0 = Instant::now();
        frame(&mut driver, t0);
        frame(&mut driver, t0 + Duration::from_millis(100));
        let before = driver.time();
        let positions: Vec<Vec3> = driver.field().iter().map(|e| e.position).collect();

        driver.on_visibility_change(false);
        assert_eq!(driver.state(), DriverState::Paused);
        frame(&mut driver, t0 + Duration::from_secs(5));
        frame(&mut driver, t0 + Duration::from_secs(10));
        assert_eq!(driver.time(), before);
        assert_eq!(driver.renderer().draws, 2);

        // The first frame after resuming sees no elapsed time.
        driver.on_visibility_change(true);
        frame(&mut driver, t0 + Duration::from_secs(60));
        assert_eq!(driver.time(), before);
        let after: Vec<Vec3> = driver.field().iter().map(|e| e.position).collect();
        assert_eq!(positions, after);
    }

    #[test]
    fn resize_regenerates_on_next_frame() {
        let mut driver = mounted();
        driver.on_resize(800, 600);
        assert_eq!(driver.renderer().size, (320, 240));

        frame(&mut driver, Instant::now());
        assert_eq!(driver.renderer().size, (800, 600));
        assert_eq!(driver.field().bounds(), Some(Bounds::from_size(800.0, 600.0)));
        assert_eq!(driver.field().len(), 40);
    }

    #[test]
    fn zero_area_resize_is_ignored() {
        let mut driver = mounted();
        driver.on_resize(0, 600);
        frame(&mut driver, Instant::now());
        assert_eq!(driver.renderer().size, (320, 240));
        assert_eq!(driver.renderer().resizes, 1);
    }

    #[test]
    fn lost_surface_is_reconfigured() {
        let mut driver = mounted();
        driver.renderer.fail_next = Some(RenderError::SurfaceLost);
        frame(&mut driver, Instant::now());
        assert_eq!(driver.renderer().resizes, 2);
        assert!(driver.pending_frame().is_some());
    }

    #[test]
    fn out_of_memory_reaches_the_host() {
        let mut driver = mounted();
        driver.renderer.fail_next = Some(RenderError::OutOfMemory);
        let token = driver.pending_frame().unwrap();
        assert!(matches!(driver.on_frame(token, Instant::now()), Err(RenderError::OutOfMemory)));
    }

    #[test]
    fn dispose_cancels_then_releases_once() {
        let mut driver = mounted();
        let pending = driver.pending_frame().unwrap();

        driver.dispose();
        driver.dispose();
        assert_eq!(driver.state(), DriverState::Disposed);
        assert_eq!(driver.scheduler().cancelled, vec![pending]);
        assert_eq!(driver.renderer().releases, 1);

        // A callback that was already in flight does nothing.
        driver.on_frame(pending, Instant::now()).unwrap();
        driver.on_pointer_move(Vec2::new(5.0, 5.0), Instant::now());
        driver.on_resize(10, 10);
        driver.on_visibility_change(true);
        assert_eq!(driver.renderer().draws, 0);
        assert_eq!(driver.state(), DriverState::Disposed);
    }

    #[test]
    fn pointer_moves_reach_the_tracker() {
        let mut driver = mounted();
        driver.on_pointer_move(Vec2::new(12.0, 34.0), Instant::now());
        assert_eq!(driver.pointer().target(), Vec3::new(12.0, 34.0, 0.0));
    }

    struct Host(Option<String>);

    impl HostContainer for Host {
        fn show_fallback(&mut self, message: &str) {
            self.0 = Some(message.to_string());
        }
    }

    #[test]
    fn unsupported_backend_shows_fallback() {
        let mut host = Host(None);
        let mut ready = false;
        let mount = mount_or_fallback::<Recorder, Manual>(
            Err(RenderError::Unsupported("none".into())),
            Manual::default(),
            config(),
            (100, 100),
            &mut host,
            || ready = true,
        )
        .unwrap();
        assert!(matches!(mount, Mount::Fallback));
        assert_eq!(host.0.as_deref(), Some(UNSUPPORTED_MESSAGE));
        assert!(!ready);
    }
}
