//! wgpu bootstrap. Establishes the device, pipelines, environment texture,
//! and HUD panels up front so frame rendering stays lightweight.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use bytemuck::cast_slice;
use glam::Vec3;
use wgpu::util::DeviceExt;
use winit::{dpi::PhysicalSize, window::Window};

use tapedeck_model::EnvironmentMap;
use tapedeck_player::PlayerController;

use super::shaders::{
    CameraUniforms, HUD_SHADER_SOURCE, MODEL_SHADER_SOURCE, PLANE_SHADER_SOURCE, QUAD_INDICES,
};
use super::{SurfaceRequests, ViewerSetup, ViewerState, mesh};
use crate::overlays::{PanelConfig, TextPanel};
use crate::scene::OrbitCamera;
use crate::scene::focus::FocusAnimator;
use crate::screen_plane::PlaneVertex;
use crate::texture::prepare_rgba_upload;
use crate::ui_layout::{PanelSize, UiLayout};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Launch pose from the showcase: high over the shoulder, looking at the
/// cassette on the origin.
const INITIAL_EYE: Vec3 = Vec3::new(0.0, 60.0, 50.0);

const LOADING_PANEL: PanelConfig = PanelConfig {
    width: 420,
    height: 64,
    padding_x: 10,
    padding_y: 10,
    label: "loading-panel",
};
const NOW_PLAYING_PANEL: PanelConfig = PanelConfig {
    width: 420,
    height: 44,
    padding_x: 10,
    padding_y: 8,
    label: "now-playing-panel",
};
const PROGRESS_PANEL: PanelConfig = PanelConfig {
    width: 480,
    height: 20,
    padding_x: 3,
    padding_y: 3,
    label: "progress-panel",
};

struct WgpuBootstrap {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_format: wgpu::TextureFormat,
    present_mode: wgpu::PresentMode,
    alpha_mode: wgpu::CompositeAlphaMode,
}

pub(super) async fn new(window: Arc<Window>, setup: ViewerSetup) -> Result<ViewerState> {
    let size = window.inner_size();
    let wgpu = bootstrap_wgpu(window.clone()).await?;

    let texture_bind_group_layout = create_texture_bind_group_layout(&wgpu.device);
    let (camera_buffer, camera_bind_group, camera_bind_group_layout) =
        create_camera_resources(&wgpu.device);

    let background = environment_background(setup.environment.as_ref());
    let environment_bind_group = create_environment_texture(
        &wgpu.device,
        &wgpu.queue,
        &texture_bind_group_layout,
        setup.environment.as_ref(),
    )?;

    let hud_pipeline =
        create_hud_pipeline(&wgpu.device, &texture_bind_group_layout, wgpu.surface_format);
    let model_pipeline = create_scene_pipeline(
        &wgpu.device,
        &camera_bind_group_layout,
        &texture_bind_group_layout,
        wgpu.surface_format,
        MODEL_SHADER_SOURCE,
        "model",
        mesh::MODEL_VERTEX_LAYOUT,
        true,
    );
    let plane_pipeline = create_scene_pipeline(
        &wgpu.device,
        &camera_bind_group_layout,
        &texture_bind_group_layout,
        wgpu.surface_format,
        PLANE_SHADER_SOURCE,
        "screen-plane",
        PLANE_VERTEX_LAYOUT,
        false,
    );

    let quad_index_buffer = wgpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("quad-index-buffer"),
        contents: cast_slice(&QUAD_INDICES),
        usage: wgpu::BufferUsages::INDEX,
    });

    let depth_view = create_depth_view(&wgpu.device, size);

    let ui_layout = UiLayout::new(
        size,
        PanelSize {
            width: LOADING_PANEL.width as f32,
            height: LOADING_PANEL.height as f32,
        },
        PanelSize {
            width: NOW_PLAYING_PANEL.width as f32,
            height: NOW_PLAYING_PANEL.height as f32,
        },
        PanelSize {
            width: PROGRESS_PANEL.width as f32,
            height: PROGRESS_PANEL.height as f32,
        },
    )?;

    let loading_panel = TextPanel::new(
        &wgpu.device,
        &wgpu.queue,
        &texture_bind_group_layout,
        size,
        LOADING_PANEL,
    )?;
    let now_playing_panel = TextPanel::new(
        &wgpu.device,
        &wgpu.queue,
        &texture_bind_group_layout,
        size,
        NOW_PLAYING_PANEL,
    )?;
    let progress_panel = TextPanel::new(
        &wgpu.device,
        &wgpu.queue,
        &texture_bind_group_layout,
        size,
        PROGRESS_PANEL,
    )?;

    let controller = PlayerController::new(setup.playlist, 0);
    let factory = tapedeck_player::MediaSessionFactory::new(setup.media_dir);

    let mut state = ViewerState {
        window,
        surface: wgpu.surface,
        device: wgpu.device,
        queue: wgpu.queue,
        config: wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: wgpu.surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu.present_mode,
            alpha_mode: wgpu.alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 1,
        },
        size,
        background,
        texture_bind_group_layout,
        hud_pipeline,
        model_pipeline,
        plane_pipeline,
        camera_buffer,
        camera_bind_group,
        environment_bind_group,
        depth_view,
        quad_index_buffer,
        quad_index_count: QUAD_INDICES.len() as u32,
        model: None,
        load_progress: 0.0,
        load_failed: false,
        video_texture: None,
        screen_quad: None,
        overlay_visible: false,
        pending_focus: false,
        controller,
        factory,
        audio: setup.audio,
        requests: SurfaceRequests::default(),
        camera: OrbitCamera::from_pose(INITIAL_EYE, Vec3::ZERO),
        focus: FocusAnimator::new(),
        focus_override: None,
        dragging: false,
        drag_travel: 0.0,
        cursor: (0.0, 0.0),
        clock_origin: Instant::now(),
        last_update_ns: 0,
        font: setup.font,
        ui_layout,
        loading_panel,
        now_playing_panel,
        progress_panel,
        archive_path: setup.archive_path,
        download_dir: setup.download_dir,
    };

    state.surface.configure(&state.device, &state.config);
    super::layout::apply_panel_layouts(&mut state);

    Ok(state)
}

async fn bootstrap_wgpu(window: Arc<Window>) -> Result<WgpuBootstrap> {
    let instance = wgpu::Instance::default();
    let surface = instance
        .create_surface(window.clone())
        .context("creating wgpu surface")?;

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            compatible_surface: Some(&surface),
        })
        .await
        .context("requesting wgpu adapter")?;

    let (device, queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some("tapedeck-viewer-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
            },
            None,
        )
        .await
        .context("requesting wgpu device")?;

    let surface_caps = surface.get_capabilities(&adapter);
    let surface_format = surface_caps
        .formats
        .iter()
        .copied()
        .find(|format| format.is_srgb())
        .unwrap_or(surface_caps.formats[0]);
    let present_mode = surface_caps
        .present_modes
        .iter()
        .copied()
        .find(|mode| *mode == wgpu::PresentMode::Mailbox)
        .unwrap_or(wgpu::PresentMode::Fifo);
    let alpha_mode = surface_caps
        .alpha_modes
        .first()
        .copied()
        .unwrap_or(wgpu::CompositeAlphaMode::Opaque);

    Ok(WgpuBootstrap {
        surface,
        device,
        queue,
        surface_format,
        present_mode,
        alpha_mode,
    })
}

fn create_texture_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("texture-bind-group-layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}

fn create_camera_resources(
    device: &wgpu::Device,
) -> (wgpu::Buffer, wgpu::BindGroup, wgpu::BindGroupLayout) {
    let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("camera-bind-group-layout"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(
                    std::mem::size_of::<CameraUniforms>() as u64
                ),
            },
            count: None,
        }],
    });

    let initial = CameraUniforms {
        view_proj: glam::Mat4::IDENTITY.to_cols_array_2d(),
        eye: [0.0; 4],
    };
    let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("camera-uniform-buffer"),
        contents: cast_slice(&[initial]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("camera-bind-group"),
        layout: &layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }],
    });

    (buffer, bind_group, layout)
}

fn environment_background(environment: Option<&EnvironmentMap>) -> wgpu::Color {
    match environment {
        Some(map) => {
            let [r, g, b] = map.average_color();
            wgpu::Color {
                r: r as f64,
                g: g as f64,
                b: b as f64,
                a: 1.0,
            }
        }
        None => wgpu::Color {
            r: 0.05,
            g: 0.06,
            b: 0.09,
            a: 1.0,
        },
    }
}

fn create_environment_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    environment: Option<&EnvironmentMap>,
) -> Result<wgpu::BindGroup> {
    // With no environment on disk, fall back to a 1x1 neutral texel so the
    // reflection term samples a flat tint.
    let fallback = EnvironmentMap {
        width: 1,
        height: 1,
        pixels: vec![96, 104, 118, 255],
    };
    let map = environment.unwrap_or(&fallback);

    let extent = wgpu::Extent3d {
        width: map.width,
        height: map.height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("environment-texture"),
        size: extent,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    let upload = prepare_rgba_upload(map.width, map.height, &map.pixels)?;
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        upload.pixels(),
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(upload.bytes_per_row()),
            rows_per_image: Some(map.height),
        },
        extent,
    );

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("environment-sampler"),
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    });

    Ok(device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("environment-bind-group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&sampler),
            },
        ],
    }))
}

fn create_hud_pipeline(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    surface_format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("hud-shader"),
        source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(HUD_SHADER_SOURCE)),
    });
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("hud-pipeline-layout"),
        bind_group_layouts: &[bind_group_layout],
        push_constant_ranges: &[],
    });

    let vertex_layout = wgpu::VertexBufferLayout {
        array_stride: (std::mem::size_of::<[f32; 4]>()) as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2],
    };

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("hud-pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: "vs_main",
            buffers: &[vertex_layout],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: "fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format: surface_format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
    })
}

const PLANE_VERTEX_LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
    array_stride: std::mem::size_of::<PlaneVertex>() as u64,
    step_mode: wgpu::VertexStepMode::Vertex,
    attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2],
};

#[allow(clippy::too_many_arguments)]
fn create_scene_pipeline(
    device: &wgpu::Device,
    camera_layout: &wgpu::BindGroupLayout,
    texture_layout: &wgpu::BindGroupLayout,
    surface_format: wgpu::TextureFormat,
    shader_source: &str,
    label: &str,
    vertex_layout: wgpu::VertexBufferLayout<'static>,
    cull_back_faces: bool,
) -> wgpu::RenderPipeline {
    let shader_label = format!("{label}-shader");
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(shader_label.as_str()),
        source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(shader_source)),
    });
    let layout_label = format!("{label}-pipeline-layout");
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(layout_label.as_str()),
        bind_group_layouts: &[camera_layout, texture_layout],
        push_constant_ranges: &[],
    });

    let pipeline_label = format!("{label}-pipeline");
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(pipeline_label.as_str()),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: "vs_main",
            buffers: &[vertex_layout],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: "fs_main",
            targets: &[Some(wgpu::ColorTargetState {
                format: surface_format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            cull_mode: cull_back_faces.then_some(wgpu::Face::Back),
            ..wgpu::PrimitiveState::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
    })
}

pub(super) fn create_depth_view(
    device: &wgpu::Device,
    size: PhysicalSize<u32>,
) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("scene-depth-texture"),
        size: wgpu::Extent3d {
            width: size.width.max(1),
            height: size.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}
