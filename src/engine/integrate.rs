// Per-tick force and integration step
//
// Every tick each entity picks a desired position (on the ring around the
// target, pushed aside, or resting at home), then its velocity is pulled
// toward it:
//
//   velocity = velocity * damping + (desired - position) * responsiveness
//   position = position + velocity
//
// Drift fields instead accumulate impulses, apply friction after the position
// update and bounce off the field bounds. Nothing here draws random numbers,
// so a tick is a pure function of the field, the target and the time.

use std::time::Duration;

use glam::{Vec2, Vec3};

use super::components::Entity;
use super::config::{FieldBehavior, ReferencePoint, SimulationConfig};
use super::field::{Bounds, Field};

/// Fixed simulation tick.
pub const TICK: f32 = 1.0 / 60.0;
/// Ticks run per frame at most; anything beyond is dropped.
pub const MAX_TICKS_PER_FRAME: u32 = 5;
/// Below this distance the pointer direction is undefined.
const DIRECTION_EPSILON: f32 = 1e-5;
/// Energy kept (and direction flipped) when a drifting entity hits a wall.
const BOUNCE: f32 = -0.5;

// ============================================================================
// FRAME CLOCK
// ============================================================================

/// Turns measured frame deltas into whole fixed ticks.
#[derive(Debug, Default, Clone)]
pub struct FrameClock {
    accumulator: f32,
    time: f32,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one frame's wall-clock delta, returning the number of ticks to run.
    pub fn advance(&mut self, elapsed: Duration) -> u32 {
        self.accumulator += elapsed.as_secs_f32();
        let mut ticks = 0;
        while self.accumulator >= TICK && ticks < MAX_TICKS_PER_FRAME {
            self.accumulator -= TICK;
            ticks += 1;
        }
        if ticks == MAX_TICKS_PER_FRAME {
            self.accumulator = 0.0;
        }
        ticks
    }

    /// Simulation time in seconds at the start of the next tick.
    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn finish_tick(&mut self) {
        self.time += TICK;
    }
}

// ============================================================================
// STEP
// ============================================================================

/// Advance every entity by one tick at simulation time `time`.
pub fn step_field(field: &mut Field, target: Vec3, time: f32, config: &SimulationConfig) {
    let bounds = field.bounds();
    for entity in field.entities_mut() {
        step_entity(entity, target, time, config, bounds.as_ref());
    }
}

pub fn step_entity(
    entity: &mut Entity,
    target: Vec3,
    time: f32,
    config: &SimulationConfig,
    bounds: Option<&Bounds>,
) {
    let reference = match config.reference {
        ReferencePoint::Home => entity.home(),
        ReferencePoint::Position => entity.position,
    };
    // The force is planar: depth never pulls an entity out of range.
    let offset = (reference - target).truncate();
    let distance = offset.length();
    let influenced = distance < config.influence_radius;
    let force = if influenced {
        (config.influence_radius - distance) / config.influence_radius
    } else {
        0.0
    };

    match config.behavior {
        FieldBehavior::Ring => {
            let desired = if influenced {
                ring_position(entity, target, offset, distance, time, config)
            } else {
                resting_position(entity, time, config)
            };
            pull_toward(entity, desired, config);
        }
        FieldBehavior::Repel => {
            let mut desired = resting_position(entity, time, config);
            if influenced && distance > DIRECTION_EPSILON {
                let away = offset / distance;
                desired += (away * force * config.push_distance).extend(0.0);
            }
            pull_toward(entity, desired, config);
        }
        FieldBehavior::Drift => {
            if influenced && distance > DIRECTION_EPSILON {
                let away = offset / distance;
                entity.velocity += (away * force * config.impulse_strength).extend(0.0);
            }
            let mut desired = resting_position(entity, time, config);
            desired.y += time * config.drift_speed;
            entity.velocity += (desired - entity.position) * config.responsiveness;
            entity.velocity = entity.velocity.clamp_length_max(config.max_speed);
            entity.position += entity.velocity;
            entity.velocity *= config.damping;
            if let Some(bounds) = bounds {
                reflect(entity, bounds);
            }
        }
    }
}

/// Point on the breathing ring around `target` for this entity.
fn ring_position(
    entity: &Entity,
    target: Vec3,
    offset: Vec2,
    distance: f32,
    time: f32,
    config: &SimulationConfig,
) -> Vec3 {
    let clock = entity.clock(time);
    let rotation = time * config.rotation_speed;
    let base_angle = if distance > DIRECTION_EPSILON {
        offset.y.atan2(offset.x)
    } else {
        entity.ring_angle
    };
    let angle = base_angle + rotation;

    let wave = (clock * config.wave_speed + angle).sin() * 0.5 * config.wave_amplitude;
    let deviation = entity.radius_offset * (5.0 / (config.field_strength + 0.1));
    let radius = config.ring_radius + wave + deviation;

    let depth = entity.home().z * config.depth_factor
        + clock.sin() * config.wave_amplitude * config.depth_factor;

    Vec3::new(
        target.x + radius * angle.cos(),
        target.y + radius * angle.sin(),
        depth,
    )
}

/// Home plus the gentle idle float.
fn resting_position(entity: &Entity, time: f32, config: &SimulationConfig) -> Vec3 {
    let home = entity.home();
    let bob = entity.clock(time).sin() * config.idle_bob;
    Vec3::new(home.x, home.y + bob, home.z * config.depth_factor)
}

fn pull_toward(entity: &mut Entity, desired: Vec3, config: &SimulationConfig) {
    let velocity = entity.velocity * config.damping + (desired - entity.position) * config.responsiveness;
    entity.velocity = velocity.clamp_length_max(config.max_speed);
    entity.position += entity.velocity;
}

fn reflect(entity: &mut Entity, bounds: &Bounds) {
    for axis in 0..3 {
        let (lo, hi) = (bounds.min[axis], bounds.max[axis]);
        let p = entity.position[axis];
        if p < lo || p > hi {
            entity.position[axis] = p.clamp(lo, hi);
            entity.velocity[axis] *= BOUNCE;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::components::VisualParams;
    use crate::engine::config::ShapeVariant;
    use glam::Quat;

    fn entity_at(home: Vec3) -> Entity {
        Entity::at_home(
            home,
            0.0,
            0.4,
            0.0,
            1.0,
            VisualParams {
                size: 1.0,
                opacity: 1.0,
                color_index: 0,
                shape: ShapeVariant::Sphere,
                rotation: Quat::IDENTITY,
                spin: Vec3::ZERO,
            },
        )
    }

    #[test]
    fn clock_runs_whole_ticks_and_keeps_remainder() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.advance(Duration::from_millis(10)), 0);
        assert_eq!(clock.advance(Duration::from_millis(10)), 1);
        assert_eq!(clock.advance(Duration::from_millis(34)), 2);
    }

    #[test]
    fn clock_caps_frame_spikes() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.advance(Duration::from_secs(3)), MAX_TICKS_PER_FRAME);
        // the backlog is dropped, not replayed
        assert_eq!(clock.advance(Duration::ZERO), 0);
    }

    #[test]
    fn repel_pushes_away_from_pointer() {
        let config = SimulationConfig::particles();
        let mut e = entity_at(Vec3::new(100.0, 100.0, 0.0));
        let target = Vec3::new(90.0, 100.0, 0.0);
        for _ in 0..200 {
            step_entity(&mut e, target, 0.0, &config, None);
        }
        // force = (80 - 10) / 80, pushed along +x
        let expected = 100.0 + 40.0 * (70.0 / 80.0);
        assert!((e.position.x - expected).abs() < 0.01, "{}", e.position.x);
        assert!((e.position.y - 100.0).abs() < 1e-3);
    }

    #[test]
    fn repel_skips_coincident_pointer() {
        let config = SimulationConfig::particles();
        let mut e = entity_at(Vec3::new(10.0, 10.0, 0.0));
        step_entity(&mut e, Vec3::new(10.0, 10.0, 0.0), 0.0, &config, None);
        assert_eq!(e.position, Vec3::new(10.0, 10.0, 0.0));
    }

    #[test]
    fn drift_bounces_off_walls() {
        let config = SimulationConfig::floating();
        let bounds = Bounds::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let mut e = entity_at(Vec3::ZERO);
        e.position = Vec3::new(0.99, 0.0, 0.0);
        e.velocity = Vec3::new(0.5, 0.0, 0.0);
        step_entity(&mut e, crate::engine::pointer::OFFSCREEN, 0.0, &config, Some(&bounds));
        assert_eq!(e.position.x, 1.0);
        assert!(e.velocity.x < 0.0);
    }

    #[test]
    fn drift_pushes_away_from_nearby_pointer() {
        let config = SimulationConfig { idle_bob: 0.0, ..SimulationConfig::floating() };
        let mut e = entity_at(Vec3::ZERO);
        step_entity(&mut e, Vec3::new(-1.0, 0.0, 0.0), 0.0, &config, None);
        assert!(e.position.x > 0.0);
    }

    #[test]
    fn velocity_is_clamped() {
        let config = SimulationConfig {
            damping: 0.0,
            responsiveness: 1.0,
            max_speed: 2.0,
            ..SimulationConfig::particles()
        };
        let mut e = entity_at(Vec3::new(100.0, 0.0, 0.0));
        e.position = Vec3::ZERO;
        step_entity(&mut e, crate::engine::pointer::OFFSCREEN, 0.0, &config, None);
        assert!((e.velocity.length() - 2.0).abs() < 1e-5);
        assert!((e.position.x - 2.0).abs() < 1e-5);
    }
}
