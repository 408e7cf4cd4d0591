//! Camera state for the 3D scene. The orbit camera circles the cassette
//! player around a fixed pivot; `focus` animates the camera toward the
//! screen when playback starts.

pub mod focus;

use glam::{Mat4, Vec3};
use winit::dpi::PhysicalSize;

use tapedeck_model::Ray;

const PITCH_LIMIT: f32 = 1.45;
const MIN_DISTANCE: f32 = 6.0;
const MAX_DISTANCE: f32 = 220.0;
const FOV_Y_RADIANS: f32 = 0.785_398_2;
const NEAR_PLANE: f32 = 0.1;
const FAR_PLANE: f32 = 2000.0;
const DRAG_RATE: f32 = 0.008;
const ZOOM_RATE: f32 = 0.12;
/// Per-frame decay of the residual spin after a drag release.
const INERTIA_DAMPING: f32 = 0.92;
const INERTIA_EPSILON: f32 = 1e-5;
/// Idle spin in radians per second, matching the showcase's slow turntable.
const AUTO_ROTATE_RATE: f32 = 0.25;

/// Orbit camera with a +Y world up. Yaw spins around the vertical axis,
/// pitch is clamped short of the poles so the up vector never flips.
#[derive(Debug, Clone, Copy)]
pub struct OrbitCamera {
    target: Vec3,
    yaw: f32,
    pitch: f32,
    distance: f32,
    yaw_velocity: f32,
    pitch_velocity: f32,
}

impl OrbitCamera {
    pub fn new(target: Vec3, yaw: f32, pitch: f32, distance: f32) -> Self {
        Self {
            target,
            yaw,
            pitch: pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT),
            distance: distance.clamp(MIN_DISTANCE, MAX_DISTANCE),
            yaw_velocity: 0.0,
            pitch_velocity: 0.0,
        }
    }

    /// Rebuild orbit parameters from an explicit pose, re-locking the up
    /// vector to +Y. Used when a focus animation hands the camera back.
    pub fn from_pose(eye: Vec3, target: Vec3) -> Self {
        let offset = eye - target;
        let distance = offset.length().max(MIN_DISTANCE);
        let yaw = offset.x.atan2(offset.z);
        let pitch = (offset.y / distance).clamp(-1.0, 1.0).asin();
        Self::new(target, yaw, pitch, distance)
    }

    pub fn eye(&self) -> Vec3 {
        let cos_pitch = self.pitch.cos();
        self.target
            + Vec3::new(
                self.distance * cos_pitch * self.yaw.sin(),
                self.distance * self.pitch.sin(),
                self.distance * cos_pitch * self.yaw.cos(),
            )
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn drag(&mut self, delta_x: f32, delta_y: f32) {
        let yaw_delta = -delta_x * DRAG_RATE;
        let pitch_delta = delta_y * DRAG_RATE;
        self.yaw += yaw_delta;
        self.pitch = (self.pitch + pitch_delta).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.yaw_velocity = yaw_delta;
        self.pitch_velocity = pitch_delta;
    }

    /// Carry the last drag delta forward with decay once the pointer is
    /// released, so a flick keeps the model spinning briefly.
    pub fn step_inertia(&mut self) {
        if self.yaw_velocity.abs() < INERTIA_EPSILON && self.pitch_velocity.abs() < INERTIA_EPSILON
        {
            self.yaw_velocity = 0.0;
            self.pitch_velocity = 0.0;
            return;
        }
        self.yaw += self.yaw_velocity;
        self.pitch = (self.pitch + self.pitch_velocity).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.yaw_velocity *= INERTIA_DAMPING;
        self.pitch_velocity *= INERTIA_DAMPING;
    }

    pub fn zoom(&mut self, scroll_delta: f32) {
        let factor = (-scroll_delta * ZOOM_RATE).exp();
        self.distance = (self.distance * factor).clamp(MIN_DISTANCE, MAX_DISTANCE);
    }

    pub fn auto_rotate(&mut self, dt_seconds: f32) {
        self.yaw += AUTO_ROTATE_RATE * dt_seconds;
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), self.target, Vec3::Y)
    }

    pub fn view_projection(&self, size: PhysicalSize<u32>) -> Mat4 {
        let aspect = size.width.max(1) as f32 / size.height.max(1) as f32;
        let projection = Mat4::perspective_rh(FOV_Y_RADIANS, aspect, NEAR_PLANE, FAR_PLANE);
        projection * self.view_matrix()
    }

    /// View-projection for an explicit pose, e.g. mid focus animation.
    pub fn pose_view_projection(eye: Vec3, target: Vec3, size: PhysicalSize<u32>) -> Mat4 {
        let aspect = size.width.max(1) as f32 / size.height.max(1) as f32;
        let projection = Mat4::perspective_rh(FOV_Y_RADIANS, aspect, NEAR_PLANE, FAR_PLANE);
        projection * Mat4::look_at_rh(eye, target, Vec3::Y)
    }

    /// World-space ray through the given window pixel.
    pub fn picking_ray(&self, pixel: (f32, f32), size: PhysicalSize<u32>) -> Ray {
        let ndc_x = (pixel.0 / size.width.max(1) as f32) * 2.0 - 1.0;
        let ndc_y = 1.0 - (pixel.1 / size.height.max(1) as f32) * 2.0;

        let inverse = self.view_projection(size).inverse();
        let near = inverse.project_point3(Vec3::new(ndc_x, ndc_y, 0.0));
        let far = inverse.project_point3(Vec3::new(ndc_x, ndc_y, 1.0));
        Ray::new(near, far - near)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eye_orbits_at_the_requested_distance() {
        let camera = OrbitCamera::new(Vec3::ZERO, 0.0, 0.0, 50.0);
        let eye = camera.eye();
        assert!((eye - Vec3::new(0.0, 0.0, 50.0)).length() < 1e-4);
        assert!((eye.distance(camera.target()) - 50.0).abs() < 1e-4);
    }

    #[test]
    fn pitch_is_clamped_short_of_the_poles() {
        let mut camera = OrbitCamera::new(Vec3::ZERO, 0.0, 0.0, 50.0);
        camera.drag(0.0, 10_000.0);
        let eye = camera.eye();
        // The camera never reaches straight overhead, so the horizontal
        // offset stays nonzero and look_at keeps a valid basis.
        let horizontal = (eye.x * eye.x + eye.z * eye.z).sqrt();
        assert!(horizontal > 1e-3);
    }

    #[test]
    fn zoom_respects_distance_bounds() {
        let mut camera = OrbitCamera::new(Vec3::ZERO, 0.0, 0.0, 50.0);
        for _ in 0..200 {
            camera.zoom(5.0);
        }
        assert!((camera.eye().distance(camera.target()) - MIN_DISTANCE).abs() < 1e-3);
        for _ in 0..200 {
            camera.zoom(-5.0);
        }
        assert!((camera.eye().distance(camera.target()) - MAX_DISTANCE).abs() < 1e-2);
    }

    #[test]
    fn drag_inertia_decays_to_rest() {
        let mut camera = OrbitCamera::new(Vec3::ZERO, 0.0, 0.0, 50.0);
        camera.drag(40.0, 0.0);
        let yaw_after_drag = camera.eye();

        camera.step_inertia();
        let yaw_after_step = camera.eye();
        assert!((yaw_after_step - yaw_after_drag).length() > 1e-5);

        for _ in 0..500 {
            camera.step_inertia();
        }
        let settled = camera.eye();
        camera.step_inertia();
        assert!((camera.eye() - settled).length() < 1e-4);
    }

    #[test]
    fn from_pose_round_trips_the_eye_position() {
        let eye = Vec3::new(10.0, 10.0, 10.0);
        let target = Vec3::new(1.0, 2.0, 3.0);
        let camera = OrbitCamera::from_pose(eye, target);
        assert!((camera.eye() - eye).length() < 1e-3);
        assert!((camera.target() - target).length() < 1e-5);
    }

    #[test]
    fn center_pixel_ray_points_at_the_target() {
        let camera = OrbitCamera::new(Vec3::ZERO, 0.4, 0.3, 60.0);
        let size = PhysicalSize::new(800, 600);
        let ray = camera.picking_ray((400.0, 300.0), size);
        let to_target = (camera.target() - camera.eye()).normalize();
        assert!(ray.direction.dot(to_target) > 0.999);
    }
}
