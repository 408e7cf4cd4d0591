//! GPU geometry for the cassette model. Node meshes arrive in world space
//! from `tapedeck_model`, so the whole model flattens into one vertex and
//! one index buffer with per-vertex node colors baked in.

use bytemuck::{Pod, Zeroable, cast_slice};
use wgpu::util::DeviceExt;

use tapedeck_model::Model;

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub(super) struct ModelVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
}

pub(super) struct ModelGeometry {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

pub(super) fn build_model_geometry(device: &wgpu::Device, model: &Model) -> Option<ModelGeometry> {
    let (vertices, indices) = flatten_model(model);
    if indices.is_empty() {
        return None;
    }

    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("model-vertex-buffer"),
        contents: cast_slice(&vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("model-index-buffer"),
        contents: cast_slice(&indices),
        usage: wgpu::BufferUsages::INDEX,
    });

    Some(ModelGeometry {
        vertex_buffer,
        index_buffer,
        index_count: indices.len() as u32,
    })
}

fn flatten_model(model: &Model) -> (Vec<ModelVertex>, Vec<u32>) {
    let mut vertices = Vec::new();
    let mut indices = Vec::new();

    for node in model.nodes() {
        let Some(mesh) = node.mesh.as_ref() else {
            continue;
        };
        let base = vertices.len() as u32;
        vertices.extend(mesh.vertices.iter().map(|vertex| ModelVertex {
            position: vertex.position,
            normal: vertex.normal,
            color: node.color,
        }));
        indices.extend(mesh.indices.iter().map(|index| base + index));
    }

    (vertices, indices)
}

pub(super) const MODEL_VERTEX_LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
    array_stride: std::mem::size_of::<ModelVertex>() as u64,
    step_mode: wgpu::VertexStepMode::Vertex,
    attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x4],
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn flattening_offsets_indices_per_node() {
        let manifest = r#"{
            "name": "fixture",
            "nodes": [
                {
                    "name": "A",
                    "translation": [0.0, 0.0, 0.0],
                    "rotation_degrees": [0.0, 0.0, 0.0],
                    "mesh": {
                        "positions": [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
                        "normals": [[0.0, 0.0, 1.0], [0.0, 0.0, 1.0], [0.0, 0.0, 1.0]],
                        "indices": [0, 1, 2]
                    }
                },
                {
                    "name": "B",
                    "translation": [5.0, 0.0, 0.0],
                    "rotation_degrees": [0.0, 0.0, 0.0],
                    "mesh": {
                        "positions": [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
                        "normals": [[0.0, 0.0, 1.0], [0.0, 0.0, 1.0], [0.0, 0.0, 1.0]],
                        "indices": [0, 1, 2]
                    }
                }
            ]
        }"#;
        let mut file = tempfile::NamedTempFile::new().expect("creating model fixture");
        file.write_all(manifest.as_bytes()).expect("writing fixture");
        let model = tapedeck_model::load_model(file.path(), &mut |_| {}).expect("loading fixture");

        let (vertices, indices) = flatten_model(&model);
        assert_eq!(vertices.len(), 6);
        assert_eq!(indices, vec![0, 1, 2, 3, 4, 5]);
        // Second node's vertices carry its world translation.
        assert_eq!(vertices[3].position[0], 5.0);
    }
}
