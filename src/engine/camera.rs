// Fixed perspective camera for the scene renderer
//
// Camera model:
//   - Eye sits on the +Z axis looking at the origin, Y up
//   - The world plane z = 0 is the plane the pointer lives on
//   - Aspect follows the window; every query reads the current aspect, so
//     resizing immediately changes both the visible bounds and unprojection

use glam::{Mat4, Vec2, Vec3};

use super::field::Bounds;
use super::pointer::PointerProjection;

pub struct FieldCamera {
    /// Distance from the origin along +Z.
    pub distance: f32,

    /// Vertical field of view in radians.
    pub fov: f32,
    pub near: f32,
    pub far: f32,

    /// Viewport in physical pixels. Private: kept non-zero by `set_viewport`.
    viewport: Vec2,
}

impl FieldCamera {
    pub fn new(distance: f32, fov_degrees: f32) -> Self {
        Self {
            distance,
            fov: fov_degrees.to_radians(),
            near: 0.1,
            far: distance * 4.0,
            viewport: Vec2::ONE,
        }
    }

    /// Camera used by the ring preset.
    pub fn ring() -> Self {
        Self::new(50.0, 35.0)
    }

    /// Closer, wider camera used by the floating-shapes preset.
    pub fn floating() -> Self {
        Self::new(8.0, 60.0)
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = Vec2::new(width.max(1) as f32, height.max(1) as f32);
    }

    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    pub fn aspect(&self) -> f32 {
        self.viewport.x / self.viewport.y
    }

    pub fn eye(&self) -> Vec3 {
        Vec3::new(0.0, 0.0, self.distance)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), Vec3::ZERO, Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect(), self.near, self.far)
    }

    /// Combined view-projection matrix ready to upload to the GPU.
    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// World-space width and height visible on the plane z = 0.
    pub fn visible_extent(&self) -> Vec2 {
        let height = 2.0 * self.distance * (self.fov * 0.5).tan();
        Vec2::new(height * self.aspect(), height)
    }

    /// Visible rectangle on z = 0, extruded over `depth`.
    pub fn visible_bounds(&self, depth: [f32; 2]) -> Bounds {
        let half = self.visible_extent() * 0.5;
        Bounds::new(Vec3::new(-half.x, -half.y, depth[0]), Vec3::new(half.x, half.y, depth[1]))
    }

    /// Cast a ray through the pixel and intersect it with the plane z = `plane_z`.
    pub fn unproject_to_plane(&self, screen: Vec2, plane_z: f32) -> Option<Vec3> {
        let ndc = Vec2::new(
            screen.x / self.viewport.x * 2.0 - 1.0,
            1.0 - screen.y / self.viewport.y * 2.0,
        );
        let inverse = self.view_projection().inverse();
        let near = inverse.project_point3(ndc.extend(0.0));
        let far = inverse.project_point3(ndc.extend(1.0));
        let dir = far - near;
        if dir.z.abs() < f32::EPSILON {
            return None;
        }
        let t = (plane_z - near.z) / dir.z;
        Some(near + dir * t)
    }
}

impl PointerProjection for FieldCamera {
    fn screen_to_simulation(&self, screen: Vec2) -> Option<Vec3> {
        self.unproject_to_plane(screen, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screen_center_hits_origin() {
        let mut cam = FieldCamera::ring();
        cam.set_viewport(1280, 720);
        let p = cam.unproject_to_plane(Vec2::new(640.0, 360.0), 0.0).unwrap();
        assert!(p.length() < 1e-3, "{p:?}");
    }

    #[test]
    fn screen_corners_hit_visible_bounds() {
        let mut cam = FieldCamera::floating();
        cam.set_viewport(800, 600);
        let bounds = cam.visible_bounds([0.0, 0.0]);
        let top_left = cam.unproject_to_plane(Vec2::ZERO, 0.0).unwrap();
        assert!((top_left.x - bounds.min.x).abs() < 1e-2);
        assert!((top_left.y - bounds.max.y).abs() < 1e-2);
    }

    #[test]
    fn resize_changes_unprojection() {
        let mut cam = FieldCamera::ring();
        cam.set_viewport(800, 600);
        let before = cam.unproject_to_plane(Vec2::new(800.0, 300.0), 0.0).unwrap();
        cam.set_viewport(1600, 600);
        let after = cam.unproject_to_plane(Vec2::new(800.0, 300.0), 0.0).unwrap();
        assert!(before.x > 1.0);
        assert!(after.x.abs() < 1e-3);
    }
}
