//! Resize handling: surface reconfiguration, depth texture recreation, and
//! HUD panel placement.

use winit::dpi::PhysicalSize;

use super::{ViewerState, init};
use crate::ui_layout::PanelKind;

pub(super) fn resize(state: &mut ViewerState, new_size: PhysicalSize<u32>) {
    if new_size.width == 0 || new_size.height == 0 {
        return;
    }

    state.size = new_size;
    state.config.width = new_size.width;
    state.config.height = new_size.height;
    state.surface.configure(&state.device, &state.config);
    state.depth_view = init::create_depth_view(&state.device, new_size);

    if let Err(err) = state.ui_layout.set_window_size(new_size) {
        log::warn!("HUD layout failed after resize: {err:#}");
        return;
    }
    apply_panel_layouts(state);
}

/// Push the computed panel rectangles into fresh vertex buffers.
pub(super) fn apply_panel_layouts(state: &mut ViewerState) {
    if let Some(rect) = state.ui_layout.panel_rect(PanelKind::Loading) {
        state
            .loading_panel
            .update_layout(&state.device, state.size, rect);
    }
    if let Some(rect) = state.ui_layout.panel_rect(PanelKind::NowPlaying) {
        state
            .now_playing_panel
            .update_layout(&state.device, state.size, rect);
    }
    if let Some(rect) = state.ui_layout.panel_rect(PanelKind::Progress) {
        state
            .progress_panel
            .update_layout(&state.device, state.size, rect);
    }
}
