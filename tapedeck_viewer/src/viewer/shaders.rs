use bytemuck::{Pod, Zeroable};

/// Lit model shader. The environment map is sampled equirectangularly for a
/// soft metallic reflection on the cassette body.
pub(super) const MODEL_SHADER_SOURCE: &str = r#"
struct Camera {
    view_proj: mat4x4<f32>,
    eye: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> camera: Camera;
@group(1) @binding(0)
var env_texture: texture_2d<f32>;
@group(1) @binding(1)
var env_sampler: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) color: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) color: vec4<f32>,
};

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = camera.view_proj * vec4<f32>(input.position, 1.0);
    out.world_position = input.position;
    out.normal = input.normal;
    out.color = input.color;
    return out;
}

const PI: f32 = 3.14159265;

fn sample_environment(direction: vec3<f32>) -> vec3<f32> {
    let dir = normalize(direction);
    let u = atan2(dir.x, dir.z) / (2.0 * PI) + 0.5;
    let v = acos(clamp(dir.y, -1.0, 1.0)) / PI;
    return textureSample(env_texture, env_sampler, vec2<f32>(u, v)).rgb;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let normal = normalize(input.normal);
    let view_dir = normalize(camera.eye.xyz - input.world_position);

    let key_dir = normalize(vec3<f32>(0.4, 0.8, 0.45));
    let diffuse = max(dot(normal, key_dir), 0.0);
    let hemisphere = 0.35 + 0.3 * (normal.y * 0.5 + 0.5);

    let reflected = reflect(-view_dir, normal);
    let reflection = sample_environment(reflected);
    let fresnel = pow(1.0 - max(dot(normal, view_dir), 0.0), 3.0);
    let gloss = 0.18 + 0.5 * fresnel;

    let lit = input.color.rgb * (hemisphere + diffuse * 0.55);
    let color = mix(lit, reflection, gloss);
    return vec4<f32>(color, input.color.a);
}
"#;

/// Textured quad floating in the 3D scene, used for the video screen plane.
pub(super) const PLANE_SHADER_SOURCE: &str = r#"
struct Camera {
    view_proj: mat4x4<f32>,
    eye: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> camera: Camera;
@group(1) @binding(0)
var frame_texture: texture_2d<f32>;
@group(1) @binding(1)
var frame_sampler: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) uv: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = camera.view_proj * vec4<f32>(input.position, 1.0);
    out.uv = input.uv;
    return out;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let uv = clamp(input.uv, vec2<f32>(0.0, 0.0), vec2<f32>(1.0, 1.0));
    return textureSample(frame_texture, frame_sampler, uv);
}
"#;

/// HUD panel shader: pre-transformed NDC quads sampling a panel texture.
pub(super) const HUD_SHADER_SOURCE: &str = r#"
struct VertexInput {
    @location(0) position: vec2<f32>,
    @location(1) uv: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.position = vec4<f32>(input.position, 0.0, 1.0);
    out.uv = input.uv;
    return out;
}

@group(0) @binding(0)
var panel_texture: texture_2d<f32>;
@group(0) @binding(1)
var panel_sampler: sampler;

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(panel_texture, panel_sampler, input.uv);
}
"#;

pub(super) const QUAD_INDICES: [u16; 6] = [0, 1, 2, 2, 1, 3];

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(super) struct CameraUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub eye: [f32; 4],
}
