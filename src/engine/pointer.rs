// Pointer tracking: turns raw cursor events into the force target
//
// States:
//   Tracking      - cursor moved within the idle timeout; target follows it directly
//   AutoAnimating - idle timeout elapsed and auto-animate is on; target sweeps
//   Idle          - no recent input and no auto-animate; target holds its value
//
// Leaving the window parks the target off-screen until the next move.

use std::time::{Duration, Instant};

use glam::{Vec2, Vec3};

use super::field::Bounds;

/// Parked target: far enough away that no entity is ever inside the influence radius.
pub const OFFSCREEN: Vec3 = Vec3::new(-1.0e6, -1.0e6, 0.0);

/// Converts window pixel coordinates (origin top-left) into simulation space.
pub trait PointerProjection {
    fn screen_to_simulation(&self, screen: Vec2) -> Option<Vec3>;
}

impl<T: PointerProjection + ?Sized> PointerProjection for Box<T> {
    fn screen_to_simulation(&self, screen: Vec2) -> Option<Vec3> {
        (**self).screen_to_simulation(screen)
    }
}

/// Canvas projection: simulation space is pixel space.
pub struct ScreenSpace;

impl PointerProjection for ScreenSpace {
    fn screen_to_simulation(&self, screen: Vec2) -> Option<Vec3> {
        Some(screen.extend(0.0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerState {
    Idle,
    Tracking,
    AutoAnimating,
}

pub struct PointerTracker {
    target: Vec3,
    /// Last raw cursor position in window pixels.
    pub screen_position: Option<Vec2>,
    last_move: Option<Instant>,
    left: bool,
    state: PointerState,
    auto_animate: bool,
    idle_timeout: Duration,
}

impl PointerTracker {
    pub fn new(auto_animate: bool, idle_timeout: Duration) -> Self {
        Self {
            target: OFFSCREEN,
            screen_position: None,
            last_move: None,
            left: false,
            state: PointerState::Idle,
            auto_animate,
            idle_timeout,
        }
    }

    /// Record a cursor move. The target is assigned directly, no smoothing.
    pub fn pointer_moved(&mut self, screen: Vec2, now: Instant, projection: &dyn PointerProjection) {
        self.screen_position = Some(screen);
        let Some(target) = projection.screen_to_simulation(screen) else {
            return;
        };
        self.target = target;
        self.last_move = Some(now);
        self.left = false;
        self.state = PointerState::Tracking;
    }

    /// Run the last cursor position through `projection` again, after the
    /// camera behind it changed. The idle clock is left alone.
    pub fn reproject(&mut self, projection: &dyn PointerProjection) {
        if self.left || self.state == PointerState::AutoAnimating {
            return;
        }
        let Some(screen) = self.screen_position else {
            return;
        };
        if let Some(target) = projection.screen_to_simulation(screen) {
            self.target = target;
        }
    }

    pub fn pointer_left(&mut self) {
        self.screen_position = None;
        self.target = OFFSCREEN;
        self.left = true;
        self.state = PointerState::Idle;
    }

    /// Re-derive the target for this frame. `time` is simulation time in seconds.
    pub fn resolve(&mut self, now: Instant, time: f32, bounds: &Bounds) -> Vec3 {
        if self.left {
            return self.target;
        }

        let recent = self
            .last_move
            .is_some_and(|t| now.saturating_duration_since(t) <= self.idle_timeout);

        let next = if recent {
            PointerState::Tracking
        } else if self.auto_animate {
            self.target = sweep(time, bounds);
            PointerState::AutoAnimating
        } else {
            PointerState::Idle
        };

        if next != self.state {
            log::debug!("pointer {:?} -> {:?}", self.state, next);
            self.state = next;
        }
        self.target
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn state(&self) -> PointerState {
        self.state
    }
}

/// Deterministic Lissajous sweep over the middle half of the bounds.
pub fn sweep(time: f32, bounds: &Bounds) -> Vec3 {
    let center = bounds.center();
    let size = bounds.size();
    Vec3::new(
        center.x + (time * 0.5).sin() * size.x / 4.0,
        center.y + (time * 1.0).cos() * size.y / 4.0,
        center.z,
    )
}
