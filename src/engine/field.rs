// Entity field generation.
//
// A field is regenerated wholesale whenever the viewport changes: homes are
// sampled against the new bounds and nothing from the previous field survives.

use std::f32::consts::TAU;

use glam::{Quat, Vec3};
use rand::Rng;

use super::components::{Entity, VisualParams};
use super::config::{ShapeVariant, SimulationConfig};

/// Axis-aligned simulation volume. The canvas uses a flat box (min.z == max.z).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min: min.min(max), max: min.max(max) }
    }

    /// Pixel-space rectangle with the origin in the top-left corner.
    pub fn from_size(width: f32, height: f32) -> Self {
        Self::new(Vec3::ZERO, Vec3::new(width.max(0.0), height.max(0.0), 0.0))
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn contains(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    pub fn is_degenerate(&self) -> bool {
        let size = self.size();
        size.x <= 0.0 || size.y <= 0.0
    }
}

/// Ordered entity collection. Index order is the instance slot order.
#[derive(Debug, Clone, Default)]
pub struct Field {
    entities: Vec<Entity>,
    bounds: Option<Bounds>,
}

impl Field {
    /// Build a fresh field of exactly `count` entities inside `bounds`.
    pub fn generate(bounds: Bounds, count: usize, config: &SimulationConfig, rng: &mut impl Rng) -> Self {
        let bands = config.colors.len().max(1);
        let mut entities = Vec::with_capacity(count);

        for _ in 0..count {
            let home = Vec3::new(
                sample(rng, bounds.min.x, bounds.max.x),
                sample(rng, bounds.min.y, bounds.max.y),
                sample(rng, bounds.min.z, bounds.max.z),
            );

            let visual = VisualParams {
                size: sample(rng, config.size_range[0], config.size_range[1]),
                opacity: sample(rng, config.opacity_range[0], config.opacity_range[1]),
                color_index: color_band(home.y, &bounds, bands),
                shape: match config.shape_variant {
                    ShapeVariant::Mixed => {
                        ShapeVariant::FLOATING[rng.gen_range(0..ShapeVariant::FLOATING.len())]
                    }
                    shape => shape,
                },
                rotation: Quat::from_euler(
                    glam::EulerRot::XYZ,
                    rng.gen_range(0.0..TAU),
                    rng.gen_range(0.0..TAU),
                    rng.gen_range(0.0..TAU),
                ),
                spin: Vec3::new(
                    rng.gen_range(-0.3..0.3),
                    rng.gen_range(-0.3..0.3),
                    rng.gen_range(-0.3..0.3),
                ),
            };

            entities.push(Entity::at_home(
                home,
                rng.gen_range(0.0..TAU),
                sample(rng, config.frequency_range[0], config.frequency_range[1]),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(0.0..TAU),
                visual,
            ));
        }

        Self { entities, bounds: Some(bounds) }
    }

    /// Wrap hand-placed entities, e.g. a restored or scripted layout.
    pub fn from_entities(entities: Vec<Entity>, bounds: Option<Bounds>) -> Self {
        Self { entities, bounds }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entities_mut(&mut self) -> &mut [Entity] {
        &mut self.entities
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entity> {
        self.entities.iter()
    }

    /// Bounds the field was generated against. `None` for an empty default field.
    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }
}

/// Uniform sample in `[lo, hi]` that tolerates empty ranges.
fn sample(rng: &mut impl Rng, lo: f32, hi: f32) -> f32 {
    if hi > lo { rng.gen_range(lo..=hi) } else { lo }
}

/// Map a vertical coordinate to one of `bands` palette buckets, top to bottom
/// in bounds order (min.y is band 0).
pub fn color_band(y: f32, bounds: &Bounds, bands: usize) -> usize {
    let height = bounds.max.y - bounds.min.y;
    if bands <= 1 || height <= 0.0 {
        return 0;
    }
    let normalized = ((y - bounds.min.y) / height).clamp(0.0, 1.0);
    ((normalized * bands as f32).floor() as usize).min(bands - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn generates_exact_count_inside_bounds() {
        let bounds = Bounds::new(Vec3::new(-8.0, -5.0, -2.0), Vec3::new(8.0, 5.0, 2.0));
        let config = SimulationConfig::antigravity();
        for count in [0, 1, 17, 300] {
            let field = Field::generate(bounds, count, &config, &mut rng());
            assert_eq!(field.len(), count);
            for e in field.iter() {
                assert!(bounds.contains(e.home()), "{:?} outside {:?}", e.home(), bounds);
                assert_eq!(e.position, e.home());
                assert_eq!(e.velocity, Vec3::ZERO);
                assert!((0.0..TAU).contains(&e.phase));
            }
        }
    }

    #[test]
    fn zero_size_viewport_collapses_homes_to_origin() {
        let bounds = Bounds::from_size(0.0, 0.0);
        let field = Field::generate(bounds, 5, &SimulationConfig::particles(), &mut rng());
        assert_eq!(field.len(), 5);
        assert!(field.iter().all(|e| e.home() == Vec3::ZERO));
    }

    #[test]
    fn color_bands_follow_height() {
        let bounds = Bounds::from_size(100.0, 100.0);
        assert_eq!(color_band(0.0, &bounds, 4), 0);
        assert_eq!(color_band(30.0, &bounds, 4), 1);
        assert_eq!(color_band(99.0, &bounds, 4), 3);
        assert_eq!(color_band(100.0, &bounds, 4), 3);
        assert_eq!(color_band(50.0, &bounds, 1), 0);
    }

    #[test]
    fn mixed_shapes_resolve_to_concrete_meshes() {
        let config = SimulationConfig::floating();
        let field = Field::generate(Bounds::from_size(10.0, 10.0), 40, &config, &mut rng());
        assert!(field.iter().all(|e| e.visual.shape.mesh_index().is_some()));
    }

    #[test]
    fn mixed_shapes_come_from_the_floating_set() {
        let config = SimulationConfig::floating();
        let field = Field::generate(Bounds::from_size(10.0, 10.0), 400, &config, &mut rng());
        assert!(field.iter().all(|e| ShapeVariant::FLOATING.contains(&e.visual.shape)));
        for shape in ShapeVariant::FLOATING {
            assert!(field.iter().any(|e| e.visual.shape == shape), "{shape:?} never drawn");
        }
    }

    #[test]
    fn visual_params_respect_ranges() {
        let config = SimulationConfig::particles();
        let field = Field::generate(Bounds::from_size(400.0, 300.0), 200, &config, &mut rng());
        for e in field.iter() {
            assert!((1.0..=2.5).contains(&e.visual.size));
            assert!((0.2..=0.5).contains(&e.visual.opacity));
            assert_eq!(e.visual.color_index, 0);
        }
    }
}
