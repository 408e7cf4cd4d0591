//! Central runtime state for the viewer. Owns the wgpu device/surface, the
//! cassette model geometry, the playback controller, and the HUD panels the
//! event loop in `main.rs` drives. Submodules cover lifecycle slices: `init`
//! for setup, `layout` for resize handling, `input` for pointer routing,
//! `update` for per-frame simulation, and `render` for draw passes.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use wgpu::SurfaceError;
use winit::{dpi::PhysicalSize, window::Window};

use tapedeck_model::{EnvironmentMap, Model};
use tapedeck_player::{
    AudioControl, MediaSessionFactory, PlayerController, PlayerSurface, Playlist,
};

use crate::hotspots::HotspotBindings;
use crate::overlays::{HudFont, TextPanel};
use crate::scene::focus::FocusAnimator;
use crate::scene::OrbitCamera;
use crate::screen_plane::ScreenPlane;
use crate::texture::VideoTexture;
use crate::ui_layout::UiLayout;

mod init;
mod input;
mod layout;
mod mesh;
mod render;
mod shaders;
mod update;

/// Startup knobs gathered in `main.rs`.
pub struct ViewerSetup {
    pub playlist: Playlist,
    pub media_dir: PathBuf,
    pub environment: Option<EnvironmentMap>,
    pub font: Arc<HudFont>,
    pub archive_path: PathBuf,
    pub download_dir: PathBuf,
    pub audio: Box<dyn AudioControl>,
}

/// Deferred effects the playback controller asks the presentation layer for.
/// Drained once per frame so the controller never borrows the GPU state.
#[derive(Default)]
struct SurfaceRequests {
    now_playing: Option<String>,
    indicator_visible: Option<bool>,
    overlay_visible: Option<bool>,
    focus_requested: bool,
}

impl PlayerSurface for SurfaceRequests {
    fn set_now_playing(&mut self, label: &str) {
        self.now_playing = Some(label.to_string());
    }

    fn set_indicator_visible(&mut self, visible: bool) {
        self.indicator_visible = Some(visible);
    }

    fn set_overlay_visible(&mut self, visible: bool) {
        self.overlay_visible = Some(visible);
    }

    fn request_screen_focus(&mut self) {
        self.focus_requested = true;
    }
}

struct ModelAssets {
    model: Model,
    geometry: mesh::ModelGeometry,
    bindings: HotspotBindings,
}

struct ScreenQuad {
    plane: ScreenPlane,
    vertex_buffer: wgpu::Buffer,
}

pub struct ViewerState {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    background: wgpu::Color,

    texture_bind_group_layout: wgpu::BindGroupLayout,
    hud_pipeline: wgpu::RenderPipeline,
    model_pipeline: wgpu::RenderPipeline,
    plane_pipeline: wgpu::RenderPipeline,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    environment_bind_group: wgpu::BindGroup,
    depth_view: wgpu::TextureView,
    quad_index_buffer: wgpu::Buffer,
    quad_index_count: u32,

    model: Option<ModelAssets>,
    load_progress: f32,
    load_failed: bool,

    video_texture: Option<VideoTexture>,
    screen_quad: Option<ScreenQuad>,
    overlay_visible: bool,
    pending_focus: bool,

    controller: PlayerController,
    factory: MediaSessionFactory,
    audio: Box<dyn AudioControl>,
    requests: SurfaceRequests,

    camera: OrbitCamera,
    focus: FocusAnimator,
    focus_override: Option<crate::scene::focus::CameraPose>,
    dragging: bool,
    drag_travel: f32,
    cursor: (f32, f32),
    clock_origin: Instant,
    last_update_ns: u64,

    font: Arc<HudFont>,
    ui_layout: UiLayout,
    loading_panel: TextPanel,
    now_playing_panel: TextPanel,
    progress_panel: TextPanel,

    archive_path: PathBuf,
    download_dir: PathBuf,
}

impl ViewerState {
    pub async fn new(window: Arc<Window>, setup: ViewerSetup) -> Result<Self> {
        init::new(window, setup).await
    }

    pub fn window(&self) -> &Window {
        self.window.as_ref()
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        layout::resize(self, new_size);
    }

    /// Monotonic nanoseconds since the viewer booted. Feeds the media clock
    /// and every animation.
    pub fn now_ns(&self) -> u64 {
        self.clock_origin.elapsed().as_nanos() as u64
    }

    pub fn set_load_progress(&mut self, fraction: f32) {
        self.load_progress = fraction.clamp(0.0, 1.0);
    }

    pub fn model_load_failed(&mut self) {
        self.load_failed = true;
    }

    /// Adopt the loaded model: upload geometry and build the hotspot table.
    pub fn install_model(&mut self, model: Model) {
        let geometry = mesh::build_model_geometry(&self.device, &model);
        let bindings = HotspotBindings::from_model(&model);
        match geometry {
            Some(geometry) => {
                println!(
                    "[tapedeck_viewer] model '{}' ready: {} nodes",
                    model.name,
                    model.nodes().len()
                );
                self.model = Some(ModelAssets {
                    model,
                    geometry,
                    bindings,
                });
                self.load_progress = 1.0;
            }
            None => {
                log::error!("model '{}' contains no triangles", model.name);
                self.load_failed = true;
            }
        }
    }

    pub fn pointer_moved(&mut self, x: f32, y: f32) {
        input::pointer_moved(self, x, y);
    }

    pub fn pointer_button(&mut self, pressed: bool) {
        input::pointer_button(self, pressed);
    }

    pub fn scroll(&mut self, delta: f32) {
        input::scroll(self, delta);
    }

    /// Per-frame simulation step, run before `render`.
    pub fn update(&mut self) {
        update::update(self);
    }

    pub fn render(&mut self) -> Result<(), SurfaceError> {
        render::render(self)
    }
}
