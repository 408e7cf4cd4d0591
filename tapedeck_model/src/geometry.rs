//! Ray intersection helpers for pointer picking. The viewer converts a
//! pointer-down event into a world-space ray and asks the model for the
//! nearest triangle hit; ties are broken by ray distance alone.

use glam::Vec3;

/// World-space ray with a normalized direction.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn point_at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }
}

/// Nearest intersection between a ray and a model node's mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub node: usize,
    pub distance: f32,
}

/// Möller–Trumbore ray/triangle intersection. Returns the distance along the
/// ray, or `None` when the ray misses or the triangle is behind the origin.
pub fn ray_triangle(ray: &Ray, a: Vec3, b: Vec3, c: Vec3) -> Option<f32> {
    const EPSILON: f32 = 1e-7;

    let edge1 = b - a;
    let edge2 = c - a;
    let h = ray.direction.cross(edge2);
    let det = edge1.dot(h);
    if det.abs() < EPSILON {
        return None;
    }

    let inv_det = 1.0 / det;
    let s = ray.origin - a;
    let u = s.dot(h) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = ray.direction.dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = edge2.dot(q) * inv_det;
    if t > EPSILON { Some(t) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_ray() -> Ray {
        Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0))
    }

    #[test]
    fn hits_facing_triangle() {
        let distance = ray_triangle(
            &unit_ray(),
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        )
        .expect("ray through the centroid should hit");
        assert!((distance - 5.0).abs() < 1e-5);
    }

    #[test]
    fn misses_triangle_off_to_the_side() {
        let hit = ray_triangle(
            &unit_ray(),
            Vec3::new(2.0, -1.0, 0.0),
            Vec3::new(4.0, -1.0, 0.0),
            Vec3::new(3.0, 1.0, 0.0),
        );
        assert!(hit.is_none());
    }

    #[test]
    fn ignores_triangle_behind_origin() {
        let hit = ray_triangle(
            &unit_ray(),
            Vec3::new(-1.0, -1.0, 10.0),
            Vec3::new(1.0, -1.0, 10.0),
            Vec3::new(0.0, 1.0, 10.0),
        );
        assert!(hit.is_none());
    }

    #[test]
    fn parallel_ray_misses() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::new(1.0, 0.0, 0.0));
        let hit = ray_triangle(
            &ray,
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        );
        assert!(hit.is_none());
    }
}
