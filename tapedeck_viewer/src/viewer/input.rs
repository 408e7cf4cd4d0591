//! Pointer routing: orbit dragging, scroll zoom, and click picking against
//! the model's hotspot nodes.

use log::{info, warn};

use crate::hotspots::HotspotAction;
use crate::scene::OrbitCamera;

use super::ViewerState;

/// Total pointer travel (in pixels) below which a press/release pair still
/// counts as a click rather than a drag.
const CLICK_SLOP: f32 = 6.0;

pub(super) fn pointer_moved(state: &mut ViewerState, x: f32, y: f32) {
    if state.dragging {
        let dx = x - state.cursor.0;
        let dy = y - state.cursor.1;
        state.drag_travel += dx.abs() + dy.abs();
        state.camera.drag(dx, dy);
    }
    state.cursor = (x, y);
}

pub(super) fn pointer_button(state: &mut ViewerState, pressed: bool) {
    if pressed {
        state.dragging = true;
        state.drag_travel = 0.0;
        // Grabbing the scene interrupts a focus glide; the camera adopts the
        // pose the animation had reached.
        if state.focus.is_active() {
            if let Some(pose) = state.focus_override.take() {
                state.camera = OrbitCamera::from_pose(pose.eye, pose.target);
            }
            state.focus.cancel();
        }
    } else {
        let was_click = state.dragging && state.drag_travel < CLICK_SLOP;
        state.dragging = false;
        if was_click {
            click(state);
        }
    }
}

pub(super) fn scroll(state: &mut ViewerState, delta: f32) {
    state.camera.zoom(delta);
}

fn click(state: &mut ViewerState) {
    let ray = state.camera.picking_ray(state.cursor, state.size);
    let action = {
        let Some(assets) = state.model.as_ref() else {
            return;
        };
        match assets.bindings.pick(&assets.model, &ray) {
            Some(action) => action,
            None => return,
        }
    };
    dispatch(state, action);
}

fn dispatch(state: &mut ViewerState, action: HotspotAction) {
    let now = state.now_ns();
    match action {
        HotspotAction::Play => {
            if !state.controller.has_session() {
                let index = state.controller.current_index();
                if let Err(err) =
                    state
                        .controller
                        .load_by_index(index, now, &mut state.factory, &mut state.requests)
                {
                    warn!("failed to load stream {index}: {err:#}");
                    return;
                }
            }
            state
                .controller
                .play(now, &mut state.requests, &mut *state.audio);
        }
        HotspotAction::Pause => {
            state.controller.pause(now, &mut *state.audio);
        }
        HotspotAction::NextStream => {
            state.controller.next(
                now,
                &mut state.factory,
                &mut state.requests,
                &mut *state.audio,
            );
        }
        HotspotAction::PreviousStream => {
            state.controller.previous(
                now,
                &mut state.factory,
                &mut state.requests,
                &mut *state.audio,
            );
        }
        HotspotAction::Download => {
            match crate::download::export_archive(&state.archive_path, &state.download_dir) {
                Ok(path) => info!("audio archive saved to {}", path.display()),
                Err(err) => warn!("audio archive export failed: {err:#}"),
            }
        }
    }
}
