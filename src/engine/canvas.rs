// Immediate-mode 2D adapter: one filled dot per entity, optionally over a glow.

use glam::{Vec2, Vec3};

use super::components::Color;
use super::config::SimulationConfig;
use super::field::{Bounds, Field};
use super::pointer::{PointerProjection, ScreenSpace};
use super::renderer::{FieldRenderer, FrameInfo, RenderError};

/// Glow radius relative to the dot radius.
const GLOW_SCALE: f32 = 4.0;
/// Glow alpha relative to the dot opacity.
const GLOW_ALPHA: f32 = 0.3;

/// Minimal drawing surface, in pixel coordinates with the origin top-left.
pub trait Canvas2d {
    fn begin_frame(&mut self, clear: Color);
    fn radial_glow(&mut self, center: Vec2, radius: f32, color: Color, alpha: f32);
    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color, alpha: f32);
    fn end_frame(&mut self) -> Result<(), RenderError>;
    fn resize(&mut self, _width: u32, _height: u32) {}
    fn release(&mut self) {}
}

pub struct CanvasRenderer<C: Canvas2d> {
    canvas: C,
    size: Vec2,
}

impl<C: Canvas2d> CanvasRenderer<C> {
    pub fn new(canvas: C, width: u32, height: u32) -> Self {
        Self { canvas, size: Vec2::new(width as f32, height as f32) }
    }

    pub fn canvas(&self) -> &C {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut C {
        &mut self.canvas
    }
}

impl<C: Canvas2d> PointerProjection for CanvasRenderer<C> {
    fn screen_to_simulation(&self, screen: Vec2) -> Option<Vec3> {
        ScreenSpace.screen_to_simulation(screen)
    }
}

impl<C: Canvas2d> FieldRenderer for CanvasRenderer<C> {
    fn resize(&mut self, width: u32, height: u32) {
        self.size = Vec2::new(width as f32, height as f32);
        self.canvas.resize(width, height);
    }

    fn simulation_bounds(&self, _config: &SimulationConfig) -> Bounds {
        Bounds::from_size(self.size.x, self.size.y)
    }

    fn draw(&mut self, field: &Field, frame: &FrameInfo) -> Result<(), RenderError> {
        self.canvas.begin_frame(frame.background);

        for entity in field.iter() {
            let center = entity.position.truncate();
            let radius = entity.visual.size * frame.config.particle_size;
            let color = frame.color_of(entity.visual.color_index);
            if frame.config.glow {
                self.canvas
                    .radial_glow(center, radius * GLOW_SCALE, color, entity.visual.opacity * GLOW_ALPHA);
            }
            self.canvas.fill_circle(center, radius, color, entity.visual.opacity);
        }

        self.canvas.end_frame()
    }

    fn release(&mut self) {
        self.canvas.release();
    }
}
