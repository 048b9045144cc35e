// Renderer seam shared by the canvas and scene adapters.
// Adapters only ever read the field; the driver owns it.

use glam::Vec3;
use thiserror::Error;

use super::components::Color;
use super::config::SimulationConfig;
use super::field::{Bounds, Field};
use super::pointer::PointerProjection;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no compatible graphics adapter: {0}")]
    Unsupported(String),

    #[error("failed to create surface: {0}")]
    Surface(String),

    #[error("failed to request device: {0}")]
    DeviceRequest(String),

    #[error("surface lost")]
    SurfaceLost,

    #[error("out of GPU memory")]
    OutOfMemory,

    #[error("frame skipped: {0}")]
    Skipped(String),
}

impl From<wgpu::SurfaceError> for RenderError {
    fn from(err: wgpu::SurfaceError) -> Self {
        match err {
            wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => RenderError::SurfaceLost,
            wgpu::SurfaceError::OutOfMemory => RenderError::OutOfMemory,
            other => RenderError::Skipped(other.to_string()),
        }
    }
}

/// Everything an adapter needs besides the field itself.
pub struct FrameInfo<'a> {
    pub target: Vec3,
    /// Simulation time in seconds.
    pub time: f32,
    pub config: &'a SimulationConfig,
    pub palette: &'a [Color],
    pub background: Color,
}

impl FrameInfo<'_> {
    pub fn color_of(&self, index: usize) -> Color {
        self.palette.get(index).copied().unwrap_or(Color::WHITE)
    }
}

pub trait FieldRenderer: PointerProjection {
    /// New drawable size in physical pixels.
    fn resize(&mut self, width: u32, height: u32);

    /// Volume new fields are generated in, for the current size.
    fn simulation_bounds(&self, config: &SimulationConfig) -> Bounds;

    fn draw(&mut self, field: &Field, frame: &FrameInfo) -> Result<(), RenderError>;

    /// Drop GPU resources. Called exactly once, after the pending frame is cancelled.
    fn release(&mut self);
}

/// Lets the host pick an adapter at runtime.
impl<T: FieldRenderer + ?Sized> FieldRenderer for Box<T> {
    fn resize(&mut self, width: u32, height: u32) {
        (**self).resize(width, height);
    }

    fn simulation_bounds(&self, config: &SimulationConfig) -> Bounds {
        (**self).simulation_bounds(config)
    }

    fn draw(&mut self, field: &Field, frame: &FrameInfo) -> Result<(), RenderError> {
        (**self).draw(field, frame)
    }

    fn release(&mut self) {
        (**self).release();
    }
}
