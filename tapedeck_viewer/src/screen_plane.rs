//! Video overlay plane. A textured quad sized to the cassette screen is
//! placed just in front of the glass, oriented by the screen node's basis.
//! It is only built once both the model and the first video frame's
//! dimensions are known, and starts invisible until playback reveals it.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use tapedeck_model::{Model, SCREEN_FRAME};

/// Screen aperture in model units, measured against the cassette casing.
const SCREEN_WIDTH: f32 = 10.4;
const SCREEN_HEIGHT: f32 = 6.1;
/// Lift off the glass to dodge z-fighting.
const FORWARD_OFFSET: f32 = 0.06;
/// The focus framing aims slightly below the screen center so the transport
/// row stays in view.
const FOCUS_DROP: f32 = 1.2;

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct PlaneVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

/// World-space quad the decoded frames are mapped onto.
#[derive(Debug, Clone)]
pub struct ScreenPlane {
    pub vertices: [PlaneVertex; 4],
    pub center: Vec3,
    pub forward: Vec3,
}

impl ScreenPlane {
    /// Build the quad from the screen frame node, letterboxing the video
    /// aspect into the fixed screen aperture.
    pub fn from_model(model: &Model, video_width: u32, video_height: u32) -> Option<Self> {
        let frame = model.node(SCREEN_FRAME)?;
        let center = frame.world_position();
        let forward = frame.world_forward();
        let rotation = frame.world_rotation;
        let right = (rotation * Vec3::X).normalize_or_zero();
        let up = (rotation * Vec3::Y).normalize_or_zero();

        let video_aspect = video_width.max(1) as f32 / video_height.max(1) as f32;
        let screen_aspect = SCREEN_WIDTH / SCREEN_HEIGHT;
        let (half_width, half_height) = if video_aspect >= screen_aspect {
            (SCREEN_WIDTH * 0.5, SCREEN_WIDTH * 0.5 / video_aspect)
        } else {
            (SCREEN_HEIGHT * 0.5 * video_aspect, SCREEN_HEIGHT * 0.5)
        };

        let origin = center + forward * FORWARD_OFFSET;
        let corner = |sx: f32, sy: f32, u: f32, v: f32| PlaneVertex {
            position: (origin + right * (sx * half_width) + up * (sy * half_height)).to_array(),
            uv: [u, v],
        };

        Some(Self {
            vertices: [
                corner(-1.0, 1.0, 0.0, 0.0),
                corner(1.0, 1.0, 1.0, 0.0),
                corner(-1.0, -1.0, 0.0, 1.0),
                corner(1.0, -1.0, 1.0, 1.0),
            ],
            center,
            forward,
        })
    }

    /// Camera pose that frames the screen head-on: the target drops a little
    /// below the screen center, the eye backs off along the screen normal.
    pub fn focus_pose(&self, distance: f32) -> (Vec3, Vec3) {
        let target = self.center - Vec3::Y * FOCUS_DROP;
        (target + self.forward * distance, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn screen_only_model() -> Model {
        // Screen frame at (0, 4, 6) with identity rotation, facing +Z.
        let manifest = r#"{
            "name": "fixture",
            "nodes": [
                {
                    "name": "ScreenFrame",
                    "translation": [0.0, 4.0, 6.0],
                    "rotation_degrees": [0.0, 0.0, 0.0]
                }
            ]
        }"#;
        let mut file = tempfile::NamedTempFile::new().expect("creating model fixture");
        file.write_all(manifest.as_bytes()).expect("writing fixture");
        tapedeck_model::load_model(file.path(), &mut |_| {}).expect("loading fixture")
    }

    #[test]
    fn quad_sits_in_front_of_the_screen_node() {
        let model = screen_only_model();
        let plane = ScreenPlane::from_model(&model, 640, 360).expect("building plane");
        for vertex in &plane.vertices {
            assert!((vertex.position[2] - (6.0 + FORWARD_OFFSET)).abs() < 1e-4);
        }
        assert!((plane.forward - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn wide_video_letterboxes_to_the_screen_width() {
        let model = screen_only_model();
        let plane = ScreenPlane::from_model(&model, 1280, 360).expect("building plane");
        let left = Vec3::from_array(plane.vertices[0].position);
        let right = Vec3::from_array(plane.vertices[1].position);
        assert!(((right - left).length() - SCREEN_WIDTH).abs() < 1e-3);
        let top = Vec3::from_array(plane.vertices[0].position);
        let bottom = Vec3::from_array(plane.vertices[2].position);
        assert!((top - bottom).length() < SCREEN_HEIGHT);
    }

    #[test]
    fn missing_screen_node_yields_no_plane() {
        let manifest = r#"{"name": "fixture", "nodes": []}"#;
        let mut file = tempfile::NamedTempFile::new().expect("creating model fixture");
        file.write_all(manifest.as_bytes()).expect("writing fixture");
        let model = tapedeck_model::load_model(file.path(), &mut |_| {}).expect("loading fixture");
        assert!(ScreenPlane::from_model(&model, 640, 360).is_none());
    }

    #[test]
    fn focus_pose_backs_off_along_the_screen_normal() {
        let model = screen_only_model();
        let plane = ScreenPlane::from_model(&model, 640, 360).expect("building plane");
        let (eye, target) = plane.focus_pose(24.0);
        assert!((eye - Vec3::new(0.0, 4.0 - FOCUS_DROP, 30.0)).length() < 1e-3);
        assert!((target - Vec3::new(0.0, 4.0 - FOCUS_DROP, 6.0)).length() < 1e-5);
    }
}
