// 2D canvas backed by egui's painter, drawn over a cleared wgpu surface.
// Coordinates come in as physical pixels and are converted to egui points.

use std::sync::Arc;

use glam::Vec2;
use winit::window::Window;

use super::canvas::Canvas2d;
use super::components::Color;
use super::gpu::GpuContext;
use super::renderer::RenderError;

/// Concentric rings used to fake a radial gradient.
const GLOW_RINGS: u32 = 4;

struct EguiResources {
    gpu: GpuContext,
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

pub struct EguiCanvas {
    window: Arc<Window>,
    resources: Option<EguiResources>,
    shapes: Vec<egui::Shape>,
    clear: Color,
}

impl EguiCanvas {
    pub fn new(window: Arc<Window>, gpu: GpuContext) -> Self {
        let egui_ctx = egui::Context::default();
        egui_ctx.set_visuals(egui::Visuals::dark());

        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        let egui_renderer = egui_wgpu::Renderer::new(
            &gpu.device,
            gpu.format(),
            None,  // no depth
            1,     // msaa samples
            false, // no dithering
        );

        Self {
            window,
            resources: Some(EguiResources { gpu, egui_ctx, egui_state, egui_renderer }),
            shapes: Vec::new(),
            clear: Color::WHITE,
        }
    }

    fn to_points(&self, p: Vec2) -> egui::Pos2 {
        let ppp = self.window.scale_factor() as f32;
        egui::pos2(p.x / ppp, p.y / ppp)
    }

    fn to_color(color: Color, alpha: f32) -> egui::Color32 {
        let [r, g, b, a] = color.to_rgba8(alpha);
        egui::Color32::from_rgba_unmultiplied(r, g, b, a)
    }
}

impl Canvas2d for EguiCanvas {
    fn begin_frame(&mut self, clear: Color) {
        self.clear = clear;
        self.shapes.clear();
    }

    fn radial_glow(&mut self, center: Vec2, radius: f32, color: Color, alpha: f32) {
        let center = self.to_points(center);
        let ppp = self.window.scale_factor() as f32;
        // Largest ring first; stacked rings brighten toward the middle.
        for ring in (1..=GLOW_RINGS).rev() {
            let r = radius * ring as f32 / GLOW_RINGS as f32 / ppp;
            self.shapes.push(egui::Shape::circle_filled(
                center,
                r,
                Self::to_color(color, alpha / GLOW_RINGS as f32),
            ));
        }
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color, alpha: f32) {
        let ppp = self.window.scale_factor() as f32;
        let shape = egui::Shape::circle_filled(self.to_points(center), radius / ppp, Self::to_color(color, alpha));
        self.shapes.push(shape);
    }

    fn end_frame(&mut self) -> Result<(), RenderError> {
        let Some(res) = self.resources.as_mut() else {
            return Err(RenderError::Skipped("canvas released".into()));
        };

        let output = res.gpu.acquire()?;
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let raw_input = res.egui_state.take_egui_input(&self.window);
        let shapes = &self.shapes;
        let full_output = res.egui_ctx.run(raw_input, |ctx| {
            let painter = ctx.layer_painter(egui::LayerId::new(
                egui::Order::Background,
                egui::Id::new("particle_canvas"),
            ));
            painter.extend(shapes.iter().cloned());
        });

        res.egui_state
            .handle_platform_output(&self.window, full_output.platform_output);

        let tris = res
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        for (id, image_delta) in &full_output.textures_delta.set {
            res.egui_renderer
                .update_texture(&res.gpu.device, &res.gpu.queue, *id, image_delta);
        }

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [res.gpu.config.width, res.gpu.config.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        let mut encoder = res.gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Canvas Encoder"),
        });

        res.egui_renderer
            .update_buffers(&res.gpu.device, &res.gpu.queue, &mut encoder, &tris, &screen_descriptor);

        let [r, g, b, a] = self.clear.to_linear(1.0);
        {
            let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Canvas Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: a as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            res.egui_renderer
                .render(&mut render_pass.forget_lifetime(), &tris, &screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            res.egui_renderer.free_texture(id);
        }

        res.gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if let Some(res) = self.resources.as_mut() {
            res.gpu.resize(width, height);
        }
    }

    fn release(&mut self) {
        self.shapes.clear();
        if self.resources.take().is_some() {
            log::info!("canvas GPU resources released");
        }
    }
}
