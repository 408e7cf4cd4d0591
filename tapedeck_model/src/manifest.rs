//! Model manifest parsing and world-transform resolution.
//!
//! The cassette-player model is a JSON manifest of named nodes. Each node
//! carries a local transform relative to its parent and, optionally, a
//! triangle mesh. Nodes are resolved into world space once at load time; the
//! viewer uploads the flattened geometry and keeps the world-space triangles
//! around for pointer picking.

use std::{
    collections::HashMap,
    fs::File,
    io::Read,
    path::Path,
};

use anyhow::{Context, Result, bail};
use glam::{Mat4, Quat, Vec3};
use serde::Deserialize;

use crate::geometry::{Ray, RayHit, ray_triangle};

/// Hotspot node names the showcase expects in the model. Absence of any one
/// of these disables hotspot wiring entirely.
pub const HOTSPOT_PLAY: &str = "PlayButton";
pub const HOTSPOT_PAUSE: &str = "PauseButton";
pub const HOTSPOT_FORWARD: &str = "ForwardButton";
pub const HOTSPOT_BACKWARD: &str = "BackwardButton";
pub const HOTSPOT_DOWNLOAD: &str = "DownloadTab";
/// Screen reference pair used only for geometric alignment.
pub const SCREEN_FRAME: &str = "ScreenFrame";
pub const SCREEN_GLASS: &str = "ScreenGlass";

const LOAD_CHUNK_BYTES: usize = 64 * 1024;

#[derive(Debug, Deserialize)]
struct ModelManifest {
    name: String,
    nodes: Vec<NodeManifest>,
}

#[derive(Debug, Deserialize)]
struct NodeManifest {
    name: String,
    #[serde(default)]
    parent: Option<String>,
    #[serde(default)]
    translation: [f32; 3],
    #[serde(default)]
    rotation_degrees: [f32; 3],
    #[serde(default = "default_scale")]
    scale: f32,
    #[serde(default = "default_color")]
    color: [f32; 4],
    #[serde(default)]
    mesh: Option<MeshManifest>,
}

#[derive(Debug, Deserialize)]
struct MeshManifest {
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    indices: Vec<u32>,
}

fn default_scale() -> f32 {
    1.0
}

fn default_color() -> [f32; 4] {
    [0.75, 0.75, 0.78, 1.0]
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

/// Triangle mesh resolved into world space.
#[derive(Debug, Clone)]
pub struct NodeMesh {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

#[derive(Debug, Clone)]
pub struct ModelNode {
    pub name: String,
    pub parent: Option<usize>,
    pub world: Mat4,
    pub world_rotation: Quat,
    pub color: [f32; 4],
    pub mesh: Option<NodeMesh>,
}

impl ModelNode {
    pub fn world_position(&self) -> Vec3 {
        self.world.w_axis.truncate()
    }

    /// Local +Z expressed in world space. The screen node's forward axis is
    /// what the focus animator backs the camera off along.
    pub fn world_forward(&self) -> Vec3 {
        (self.world_rotation * Vec3::Z).normalize_or_zero()
    }
}

/// Loaded model: nodes in manifest order with resolved world transforms.
#[derive(Debug, Clone)]
pub struct Model {
    pub name: String,
    nodes: Vec<ModelNode>,
    index_by_name: HashMap<String, usize>,
}

/// Indices of the named hotspot nodes. Present only when the model carries
/// every expected node; partial binding is never attempted.
#[derive(Debug, Clone, Copy)]
pub struct HotspotNodeSet {
    pub play: usize,
    pub pause: usize,
    pub forward: usize,
    pub backward: usize,
    pub download: usize,
    pub screen_frame: usize,
    pub screen_glass: usize,
}

impl Model {
    pub fn nodes(&self) -> &[ModelNode] {
        &self.nodes
    }

    pub fn node_index(&self, name: &str) -> Option<usize> {
        self.index_by_name.get(name).copied()
    }

    pub fn node(&self, name: &str) -> Option<&ModelNode> {
        self.node_index(name).map(|idx| &self.nodes[idx])
    }

    /// Look up the full hotspot node set, or `None` when any is missing.
    pub fn hotspot_nodes(&self) -> Option<HotspotNodeSet> {
        Some(HotspotNodeSet {
            play: self.node_index(HOTSPOT_PLAY)?,
            pause: self.node_index(HOTSPOT_PAUSE)?,
            forward: self.node_index(HOTSPOT_FORWARD)?,
            backward: self.node_index(HOTSPOT_BACKWARD)?,
            download: self.node_index(HOTSPOT_DOWNLOAD)?,
            screen_frame: self.node_index(SCREEN_FRAME)?,
            screen_glass: self.node_index(SCREEN_GLASS)?,
        })
    }

    /// Nearest intersection between a world-space ray and any node mesh.
    pub fn raycast(&self, ray: &Ray) -> Option<RayHit> {
        let mut nearest: Option<RayHit> = None;
        for (node_idx, node) in self.nodes.iter().enumerate() {
            let Some(mesh) = node.mesh.as_ref() else {
                continue;
            };
            for triangle in mesh.indices.chunks_exact(3) {
                let a = Vec3::from(mesh.vertices[triangle[0] as usize].position);
                let b = Vec3::from(mesh.vertices[triangle[1] as usize].position);
                let c = Vec3::from(mesh.vertices[triangle[2] as usize].position);
                if let Some(distance) = ray_triangle(ray, a, b, c) {
                    let closer = nearest
                        .map(|hit| distance < hit.distance)
                        .unwrap_or(true);
                    if closer {
                        nearest = Some(RayHit {
                            node: node_idx,
                            distance,
                        });
                    }
                }
            }
        }
        nearest
    }

    /// World-space bounding box over all mesh vertices.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut bounds: Option<(Vec3, Vec3)> = None;
        for node in &self.nodes {
            let Some(mesh) = node.mesh.as_ref() else {
                continue;
            };
            for vertex in &mesh.vertices {
                let point = Vec3::from(vertex.position);
                bounds = Some(match bounds {
                    None => (point, point),
                    Some((min, max)) => (min.min(point), max.max(point)),
                });
            }
        }
        bounds
    }
}

/// Read the manifest from disk, reporting byte-level progress in `[0, 1]`.
/// The callback fires at least once with `1.0` before parsing begins.
pub fn load_model(path: &Path, progress: &mut dyn FnMut(f32)) -> Result<Model> {
    let mut file =
        File::open(path).with_context(|| format!("opening model manifest {}", path.display()))?;
    let total = file
        .metadata()
        .with_context(|| format!("reading metadata for {}", path.display()))?
        .len();

    let mut data = Vec::with_capacity(total as usize);
    let mut chunk = vec![0u8; LOAD_CHUNK_BYTES];
    loop {
        let read = file
            .read(&mut chunk)
            .with_context(|| format!("reading model manifest {}", path.display()))?;
        if read == 0 {
            break;
        }
        data.extend_from_slice(&chunk[..read]);
        let fraction = if total > 0 {
            (data.len() as f64 / total as f64).min(1.0) as f32
        } else {
            1.0
        };
        progress(fraction);
    }
    progress(1.0);

    let manifest: ModelManifest = serde_json::from_slice(&data)
        .with_context(|| format!("parsing model manifest {}", path.display()))?;
    resolve_manifest(manifest)
}

fn resolve_manifest(manifest: ModelManifest) -> Result<Model> {
    let mut index_by_name = HashMap::with_capacity(manifest.nodes.len());
    for (idx, node) in manifest.nodes.iter().enumerate() {
        if index_by_name.insert(node.name.clone(), idx).is_some() {
            bail!("model node '{}' is defined twice", node.name);
        }
    }

    let mut parents = Vec::with_capacity(manifest.nodes.len());
    for node in &manifest.nodes {
        let parent = match node.parent.as_deref() {
            None => None,
            Some(name) => Some(*index_by_name.get(name).with_context(|| {
                format!("node '{}' references unknown parent '{}'", node.name, name)
            })?),
        };
        parents.push(parent);
    }

    // Parents must precede their children so a single pass resolves world
    // transforms.
    for (idx, parent) in parents.iter().enumerate() {
        if let Some(parent_idx) = parent {
            if *parent_idx >= idx {
                bail!(
                    "node '{}' must appear after its parent '{}'",
                    manifest.nodes[idx].name,
                    manifest.nodes[*parent_idx].name
                );
            }
        }
    }

    let mut nodes: Vec<ModelNode> = Vec::with_capacity(manifest.nodes.len());
    for (idx, node) in manifest.nodes.into_iter().enumerate() {
        let rotation = quat_from_degrees(node.rotation_degrees);
        let local = Mat4::from_scale_rotation_translation(
            Vec3::splat(node.scale),
            rotation,
            Vec3::from(node.translation),
        );
        let (world, world_rotation) = match parents[idx] {
            None => (local, rotation),
            Some(parent_idx) => {
                let parent = &nodes[parent_idx];
                (parent.world * local, parent.world_rotation * rotation)
            }
        };

        let mesh = match node.mesh {
            None => None,
            Some(mesh) => Some(resolve_mesh(&node.name, mesh, world, world_rotation)?),
        };

        nodes.push(ModelNode {
            name: node.name,
            parent: parents[idx],
            world,
            world_rotation,
            color: node.color,
            mesh,
        });
    }

    Ok(Model {
        name: manifest.name,
        nodes,
        index_by_name,
    })
}

fn resolve_mesh(
    node_name: &str,
    mesh: MeshManifest,
    world: Mat4,
    world_rotation: Quat,
) -> Result<NodeMesh> {
    if mesh.positions.len() != mesh.normals.len() {
        bail!(
            "mesh for '{}' has {} positions but {} normals",
            node_name,
            mesh.positions.len(),
            mesh.normals.len()
        );
    }
    if mesh.indices.len() % 3 != 0 {
        bail!(
            "mesh for '{}' has a non-triangle index count ({})",
            node_name,
            mesh.indices.len()
        );
    }
    for &index in &mesh.indices {
        if index as usize >= mesh.positions.len() {
            bail!(
                "mesh for '{}' indexes vertex {} out of {}",
                node_name,
                index,
                mesh.positions.len()
            );
        }
    }

    let vertices = mesh
        .positions
        .iter()
        .zip(&mesh.normals)
        .map(|(position, normal)| MeshVertex {
            position: world.transform_point3(Vec3::from(*position)).to_array(),
            normal: (world_rotation * Vec3::from(*normal))
                .normalize_or_zero()
                .to_array(),
        })
        .collect();

    Ok(NodeMesh {
        vertices,
        indices: mesh.indices,
    })
}

/// `{yaw, pitch, roll}` degrees around world +Y, local +X, local +Z, in the
/// viewer's right-handed Y-up basis.
fn quat_from_degrees(rotation: [f32; 3]) -> Quat {
    let yaw = Quat::from_rotation_y(rotation[0].to_radians());
    let pitch = Quat::from_rotation_x(rotation[1].to_radians());
    let roll = Quat::from_rotation_z(rotation[2].to_radians());
    yaw * pitch * roll
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn quad_mesh() -> &'static str {
        r#"{
            "positions": [[-1,-1,0],[1,-1,0],[1,1,0],[-1,1,0]],
            "normals": [[0,0,1],[0,0,1],[0,0,1],[0,0,1]],
            "indices": [0,1,2,0,2,3]
        }"#
    }

    fn write_manifest(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("creating manifest fixture");
        file.write_all(body.as_bytes()).expect("writing fixture");
        file
    }

    fn full_hotspot_manifest() -> String {
        let names = [
            HOTSPOT_PLAY,
            HOTSPOT_PAUSE,
            HOTSPOT_FORWARD,
            HOTSPOT_BACKWARD,
            HOTSPOT_DOWNLOAD,
            SCREEN_FRAME,
            SCREEN_GLASS,
        ];
        let nodes: Vec<String> = std::iter::once(format!(
            r#"{{"name":"Body","mesh":{}}}"#,
            quad_mesh()
        ))
        .chain(names.iter().enumerate().map(|(idx, name)| {
            format!(
                r#"{{"name":"{}","parent":"Body","translation":[{},0,1],"mesh":{}}}"#,
                name,
                idx as f32 * 3.0,
                quad_mesh()
            )
        }))
        .collect();
        format!(r#"{{"name":"walkman","nodes":[{}]}}"#, nodes.join(","))
    }

    #[test]
    fn loads_manifest_and_reports_monotonic_progress() {
        let file = write_manifest(&full_hotspot_manifest());
        let mut samples = Vec::new();
        let model = load_model(file.path(), &mut |fraction| samples.push(fraction))
            .expect("loading fixture model");

        assert_eq!(model.name, "walkman");
        assert_eq!(model.nodes().len(), 8);
        assert!(samples.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(samples.last().copied(), Some(1.0));
    }

    #[test]
    fn hotspot_set_requires_every_named_node() {
        let file = write_manifest(&full_hotspot_manifest());
        let model = load_model(file.path(), &mut |_| {}).expect("loading fixture model");
        assert!(model.hotspot_nodes().is_some());

        let partial = write_manifest(
            r#"{"name":"walkman","nodes":[{"name":"PlayButton"},{"name":"PauseButton"}]}"#,
        );
        let model = load_model(partial.path(), &mut |_| {}).expect("loading partial model");
        assert!(model.hotspot_nodes().is_none());
    }

    #[test]
    fn world_transforms_compose_through_parents() {
        let file = write_manifest(
            r#"{"name":"walkman","nodes":[
                {"name":"Body","translation":[0,1,0]},
                {"name":"Screen","parent":"Body","translation":[0,0,2],"rotation_degrees":[90,0,0]}
            ]}"#,
        );
        let model = load_model(file.path(), &mut |_| {}).expect("loading fixture model");
        let screen = model.node("Screen").expect("screen node");

        let position = screen.world_position();
        assert!((position - Vec3::new(0.0, 1.0, 2.0)).length() < 1e-5);

        // 90 degrees of yaw swings local +Z onto world +X.
        let forward = screen.world_forward();
        assert!((forward - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn unknown_parent_is_rejected() {
        let file = write_manifest(
            r#"{"name":"walkman","nodes":[{"name":"Screen","parent":"Ghost"}]}"#,
        );
        assert!(load_model(file.path(), &mut |_| {}).is_err());
    }

    #[test]
    fn raycast_prefers_nearest_node() {
        let file = write_manifest(
            r#"{"name":"walkman","nodes":[
                {"name":"Far","translation":[0,0,-4],"mesh":MESH},
                {"name":"Near","translation":[0,0,0],"mesh":MESH}
            ]}"#
            .replace("MESH", quad_mesh())
            .as_str(),
        );
        let model = load_model(file.path(), &mut |_| {}).expect("loading fixture model");

        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
        let hit = model.raycast(&ray).expect("ray should hit both quads");
        assert_eq!(model.nodes()[hit.node].name, "Near");
        assert!((hit.distance - 5.0).abs() < 1e-4);
    }

    #[test]
    fn raycast_miss_returns_none() {
        let file = write_manifest(&full_hotspot_manifest());
        let model = load_model(file.path(), &mut |_| {}).expect("loading fixture model");
        let ray = Ray::new(Vec3::new(0.0, 100.0, 5.0), Vec3::new(0.0, 1.0, 0.0));
        assert!(model.raycast(&ray).is_none());
    }
}
