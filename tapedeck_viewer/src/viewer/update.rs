//! Per-frame simulation: playback ticking, frame upload, deferred surface
//! requests, the camera focus animation, and HUD contents.

use std::mem;

use bytemuck::cast_slice;
use wgpu::util::DeviceExt;

use super::{ScreenQuad, ViewerState};
use crate::scene::OrbitCamera;
use crate::scene::focus::CameraPose;
use crate::screen_plane::ScreenPlane;
use crate::texture::VideoTexture;

/// How far the focus animation parks the camera from the screen plane, in
/// model units.
const FOCUS_DISTANCE: f32 = 26.0;

pub(super) fn update(state: &mut ViewerState) {
    let now = state.now_ns();

    state.controller.tick(
        now,
        &mut state.factory,
        &mut state.requests,
        &mut *state.audio,
    );

    ensure_video_resources(state);
    upload_current_frame(state, now);
    drain_surface_requests(state, now);

    if state.pending_focus && state.screen_quad.is_some() {
        state.pending_focus = false;
        start_screen_focus(state, now);
    }

    if let Some(sample) = state.focus.sample(now) {
        if sample.finished {
            state.camera = OrbitCamera::from_pose(sample.pose.eye, sample.pose.target);
            state.focus_override = None;
        } else {
            state.focus_override = Some(sample.pose);
        }
    }

    // Residual drag spin plus the idle turntable. Both sit out while the
    // user drags or the focus animation owns the camera; the turntable also
    // waits for playback to pause.
    let dt_seconds = now.saturating_sub(state.last_update_ns) as f32 / 1e9;
    if !state.dragging && !state.focus.is_active() {
        state.camera.step_inertia();
        if state.controller.is_paused() {
            state.camera.auto_rotate(dt_seconds);
        }
    }
    state.last_update_ns = now;

    refresh_hud(state, now);
}

/// Keep the video texture and screen quad in step with the live session's
/// frame dimensions. The quad also needs the model, so it may trail the
/// texture until loading finishes.
fn ensure_video_resources(state: &mut ViewerState) {
    let Some((width, height)) = state.controller.video_dimensions() else {
        return;
    };

    let texture_matches = state
        .video_texture
        .as_ref()
        .is_some_and(|texture| texture.matches(width, height));
    if !texture_matches {
        state.video_texture = Some(VideoTexture::new(
            &state.device,
            &state.texture_bind_group_layout,
            width,
            height,
        ));
        state.screen_quad = None;
    }

    if state.screen_quad.is_none() {
        if let Some(assets) = state.model.as_ref() {
            if let Some(plane) = ScreenPlane::from_model(&assets.model, width, height) {
                let vertex_buffer =
                    state
                        .device
                        .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                            label: Some("screen-plane-vertices"),
                            contents: cast_slice(&plane.vertices),
                            usage: wgpu::BufferUsages::VERTEX,
                        });
                state.screen_quad = Some(ScreenQuad {
                    plane,
                    vertex_buffer,
                });
            }
        }
    }
}

fn upload_current_frame(state: &mut ViewerState, now_ns: u64) {
    let mut decode_failed = false;
    if let Some(result) = state.controller.frame(now_ns) {
        match result {
            Ok(frame) => {
                if let Some(texture) = state.video_texture.as_ref() {
                    if let Err(err) = texture.write_frame(&state.queue, frame) {
                        log::warn!("frame upload failed: {err:#}");
                    }
                }
            }
            Err(err) => {
                log::warn!("video decode failed: {err:#}");
                decode_failed = true;
            }
        }
    }
    if decode_failed {
        state.controller.pause(now_ns, &mut *state.audio);
    }
}

fn drain_surface_requests(state: &mut ViewerState, now_ns: u64) {
    let requests = mem::take(&mut state.requests);

    if let Some(label) = requests.now_playing {
        state
            .now_playing_panel
            .set_lines(&state.font, &[format!("Now playing: {label}")]);
    }
    if let Some(visible) = requests.indicator_visible {
        state.now_playing_panel.set_visible(visible);
    }
    if let Some(visible) = requests.overlay_visible {
        state.overlay_visible = visible;
    }
    if requests.focus_requested {
        start_screen_focus(state, now_ns);
    }
}

fn start_screen_focus(state: &mut ViewerState, now_ns: u64) {
    let Some(quad) = state.screen_quad.as_ref() else {
        // The quad does not exist until the model and the first session have
        // both arrived; remember the request and fire once it does.
        state.pending_focus = true;
        return;
    };

    let (eye, target) = quad.plane.focus_pose(FOCUS_DISTANCE);
    let start = state.focus_override.unwrap_or(CameraPose {
        eye: state.camera.eye(),
        target: state.camera.target(),
    });
    state
        .focus
        .start(start, CameraPose { eye, target }, now_ns);
}

fn refresh_hud(state: &mut ViewerState, now_ns: u64) {
    if state.model.is_some() {
        state.loading_panel.set_visible(false);
    } else if state.load_failed {
        state
            .loading_panel
            .set_lines(&state.font, &["Model failed to load".to_string()]);
    } else {
        let percent = (state.load_progress * 100.0).round() as u32;
        state
            .loading_panel
            .set_lines(&state.font, &[format!("Loading model {percent}%")]);
    }

    match state.controller.progress(now_ns) {
        Some(fraction) => state.progress_panel.set_bar(fraction),
        None => state.progress_panel.set_visible(false),
    }
}
