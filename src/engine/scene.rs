// Instanced 3D adapter
//
// Each frame every entity becomes one model matrix plus one RGBA color in the
// instance buffers. Instances are grouped into one contiguous batch per mesh
// so the backend can draw the whole field with one instanced draw per shape,
// all inside a single render pass.

use glam::{Mat4, Quat, Vec2, Vec3};

use super::camera::FieldCamera;
use super::components::Entity;
use super::config::{FieldBehavior, ShapeVariant, SimulationConfig};
use super::field::{Bounds, Field};
use super::pointer::PointerProjection;
use super::renderer::{FieldRenderer, FrameInfo, RenderError};

/// Ring scale falls to zero this far from the ring.
const RING_FALLOFF: f32 = 10.0;

// ============================================================================
// INSTANCE DATA (per-entity)
// ============================================================================

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceData {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
}

impl InstanceData {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
            2 => Float32x4,
            3 => Float32x4,
            4 => Float32x4,
            5 => Float32x4,
            6 => Float32x4,
        ];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<InstanceData>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,  // One per instance, not per vertex
            attributes: &ATTRIBUTES,
        }
    }
}

/// Contiguous run of instances sharing one mesh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceBatch {
    pub shape: ShapeVariant,
    pub range: std::ops::Range<u32>,
}

/// CPU side of the instance buffers, rewritten every frame.
#[derive(Debug, Default)]
pub struct InstanceBuffers {
    pub instances: Vec<InstanceData>,
    pub batches: Vec<InstanceBatch>,
    /// Set when `instances` changed and must be uploaded before drawing.
    pub transforms_dirty: bool,
    pub colors_dirty: bool,
}

impl InstanceBuffers {
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn mark_uploaded(&mut self) {
        self.transforms_dirty = false;
        self.colors_dirty = false;
    }
}

/// GPU side: uploads the buffers and issues the draws for one frame.
pub trait SceneBackend {
    fn resize(&mut self, width: u32, height: u32);
    fn render(&mut self, buffers: &mut InstanceBuffers, camera: &FieldCamera, clear: [f32; 4]) -> Result<(), RenderError>;
    fn release(&mut self) {}
}

// ============================================================================
// RENDERER
// ============================================================================

pub struct SceneRenderer<B: SceneBackend> {
    backend: B,
    camera: FieldCamera,
    buffers: InstanceBuffers,
    /// Reordering scratch, reused across frames.
    by_shape: Vec<Vec<InstanceData>>,
}

impl<B: SceneBackend> SceneRenderer<B> {
    pub fn new(backend: B, camera: FieldCamera) -> Self {
        Self {
            backend,
            camera,
            buffers: InstanceBuffers::default(),
            by_shape: vec![Vec::new(); ShapeVariant::CONCRETE.len()],
        }
    }

    pub fn camera(&self) -> &FieldCamera {
        &self.camera
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn buffers(&self) -> &InstanceBuffers {
        &self.buffers
    }

    fn fill_buffers(&mut self, field: &Field, frame: &FrameInfo) {
        for bucket in &mut self.by_shape {
            bucket.clear();
        }

        for entity in field.iter() {
            let color = frame.color_of(entity.visual.color_index).to_linear(entity.visual.opacity);
            let model = instance_transform(entity, frame);
            let slot = entity.visual.shape.mesh_index().unwrap_or(0);
            self.by_shape[slot].push(InstanceData { model: model.to_cols_array_2d(), color });
        }

        self.buffers.instances.clear();
        self.buffers.batches.clear();
        for (shape, bucket) in ShapeVariant::CONCRETE.iter().zip(&self.by_shape) {
            if bucket.is_empty() {
                continue;
            }
            let start = self.buffers.instances.len() as u32;
            self.buffers.instances.extend_from_slice(bucket);
            let end = self.buffers.instances.len() as u32;
            self.buffers.batches.push(InstanceBatch { shape: *shape, range: start..end });
        }
        self.buffers.transforms_dirty = true;
        self.buffers.colors_dirty = true;
    }
}

/// Model matrix for one entity this frame.
pub fn instance_transform(entity: &Entity, frame: &FrameInfo) -> Mat4 {
    let config = frame.config;
    let (rotation, scale) = match config.behavior {
        FieldBehavior::Ring => (facing(entity.position, frame.target), ring_scale(entity, frame)),
        FieldBehavior::Repel | FieldBehavior::Drift => {
            let tumble = Quat::from_euler(
                glam::EulerRot::XYZ,
                entity.visual.spin.x * frame.time,
                entity.visual.spin.y * frame.time,
                entity.visual.spin.z * frame.time,
            );
            (tumble * entity.visual.rotation, entity.visual.size * config.particle_size)
        }
    };
    Mat4::from_scale_rotation_translation(Vec3::splat(scale), rotation, entity.position)
}

/// Scale peaks on the ring and shrinks to zero `RING_FALLOFF` away from it.
pub fn ring_scale(entity: &Entity, frame: &FrameInfo) -> f32 {
    let config = frame.config;
    let to_target = (entity.position - frame.target).truncate().length();
    let proximity = (1.0 - (to_target - config.ring_radius).abs() / RING_FALLOFF).clamp(0.0, 1.0);
    let pulse = 0.8 + (entity.clock(frame.time) * config.pulse_speed).sin() * 0.2 * config.particle_variance;
    proximity * pulse * config.particle_size * entity.visual.size
}

/// Point the mesh's long (Y) axis at the target, in the entity's own depth plane.
fn facing(position: Vec3, target: Vec3) -> Quat {
    let look = Vec2::new(target.x - position.x, target.y - position.y);
    if look.length_squared() < 1e-10 {
        return Quat::IDENTITY;
    }
    Quat::from_rotation_arc(Vec3::Y, look.normalize().extend(0.0))
}

impl<B: SceneBackend> PointerProjection for SceneRenderer<B> {
    fn screen_to_simulation(&self, screen: Vec2) -> Option<Vec3> {
        self.camera.screen_to_simulation(screen)
    }
}

impl<B: SceneBackend> FieldRenderer for SceneRenderer<B> {
    fn resize(&mut self, width: u32, height: u32) {
        self.camera.set_viewport(width, height);
        self.backend.resize(width, height);
    }

    fn simulation_bounds(&self, config: &SimulationConfig) -> Bounds {
        self.camera.visible_bounds(config.depth_range)
    }

    fn draw(&mut self, field: &Field, frame: &FrameInfo) -> Result<(), RenderError> {
        self.fill_buffers(field, frame);
        let clear = frame.background.to_linear(1.0);
        self.backend.render(&mut self.buffers, &self.camera, clear)
    }

    fn release(&mut self) {
        self.buffers = InstanceBuffers::default();
        self.backend.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::components::Color;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[derive(Default)]
    struct Frames {
        renders: Vec<(usize, usize)>,
    }

    impl SceneBackend for Frames {
        fn resize(&mut self, _: u32, _: u32) {}
        fn render(&mut self, buffers: &mut InstanceBuffers, _: &FieldCamera, _: [f32; 4]) -> Result<(), RenderError> {
            assert!(buffers.transforms_dirty && buffers.colors_dirty);
            self.renders.push((buffers.len(), buffers.batches.len()));
            buffers.mark_uploaded();
            Ok(())
        }
    }

    fn frame(config: &SimulationConfig, target: Vec3) -> FrameInfo<'_> {
        FrameInfo { target, time: 0.0, config, palette: &[Color::WHITE], background: Color::WHITE }
    }

    #[test]
    fn ring_scale_peaks_on_ring() {
        let config = SimulationConfig { particle_variance: 0.0, ..SimulationConfig::antigravity() };
        let field = Field::generate(Bounds::from_size(1.0, 1.0), 1, &config, &mut StdRng::seed_from_u64(3));
        let mut entity = field.entities()[0].clone();
        let f = frame(&config, Vec3::ZERO);

        entity.position = Vec3::new(config.ring_radius, 0.0, 0.0);
        let on_ring = ring_scale(&entity, &f);
        assert!((on_ring - 0.8 * config.particle_size).abs() < 1e-5);

        entity.position = Vec3::new(config.ring_radius + 5.0, 0.0, 0.0);
        assert!(ring_scale(&entity, &f) < on_ring);

        entity.position = Vec3::new(100.0, 0.0, 0.0);
        assert_eq!(ring_scale(&entity, &f), 0.0);
    }

    #[test]
    fn one_batch_per_shape() {
        let config = SimulationConfig::floating();
        let mut renderer = SceneRenderer::new(Frames::default(), FieldCamera::floating());
        renderer.resize(800, 600);
        let bounds = renderer.simulation_bounds(&config);
        let field = Field::generate(bounds, 60, &config, &mut StdRng::seed_from_u64(4));

        renderer.draw(&field, &frame(&config, Vec3::ZERO)).unwrap();

        let buffers = renderer.buffers();
        assert_eq!(buffers.len(), 60);
        assert!(!buffers.transforms_dirty);
        let mut shapes: Vec<_> = buffers.batches.iter().map(|b| b.shape).collect();
        shapes.dedup();
        assert_eq!(shapes.len(), buffers.batches.len());
        let covered: u32 = buffers.batches.iter().map(|b| b.range.end - b.range.start).sum();
        assert_eq!(covered, 60);
        assert_eq!(renderer.backend().renders, vec![(60, buffers.batches.len())]);
    }

    #[test]
    fn empty_field_renders_nothing() {
        let config = SimulationConfig::antigravity();
        let mut renderer = SceneRenderer::new(Frames::default(), FieldCamera::ring());
        renderer.draw(&Field::default(), &frame(&config, Vec3::ZERO)).unwrap();
        assert_eq!(renderer.backend().renders, vec![(0, 0)]);
    }

    #[test]
    fn capsules_face_the_target() {
        let config = SimulationConfig::antigravity();
        let field = Field::generate(Bounds::from_size(1.0, 1.0), 1, &config, &mut StdRng::seed_from_u64(5));
        let mut entity = field.entities()[0].clone();
        entity.position = Vec3::new(3.0, 0.0, 0.0);
        let model = instance_transform(&entity, &frame(&config, Vec3::ZERO));
        let axis = model.transform_vector3(Vec3::Y).normalize_or_zero();
        // scale may be zero far from the ring; only check direction when visible
        if axis != Vec3::ZERO {
            assert!((axis - Vec3::NEG_X).length() < 1e-4, "{axis:?}");
        }
    }
}
