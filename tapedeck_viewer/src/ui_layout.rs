//! Thin wrapper around the Taffy layout engine used to place the HUD panels.
//! Panels are absolute-positioned against the window edges; the resulting
//! rectangles are recomputed on resize so the overlay code never carries
//! layout math of its own.

use std::collections::HashMap;

use anyhow::{Context, Result};
use taffy::prelude::*;
use winit::dpi::PhysicalSize;

pub const PANEL_MARGIN: f32 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanelKind {
    /// Model download progress, centered near the top while loading.
    Loading,
    /// "Now playing" label in the top-left corner.
    NowPlaying,
    /// Playback progress bar along the bottom edge.
    Progress,
}

#[derive(Debug, Clone, Copy)]
pub struct PanelSize {
    pub width: f32,
    pub height: f32,
}

pub struct UiLayout {
    tree: TaffyTree<()>,
    root: NodeId,
    panel_nodes: HashMap<PanelKind, NodeId>,
    window_size: PhysicalSize<u32>,
}

impl UiLayout {
    pub fn new(
        window_size: PhysicalSize<u32>,
        loading: PanelSize,
        now_playing: PanelSize,
        progress: PanelSize,
    ) -> Result<Self> {
        let mut tree = TaffyTree::new();
        let mut panel_nodes: HashMap<PanelKind, NodeId> = HashMap::new();
        let mut children: Vec<NodeId> = Vec::new();

        let loading_node = tree
            .new_leaf(Style {
                position: Position::Absolute,
                inset: Rect {
                    left: LengthPercentageAuto::Percent(0.5),
                    right: LengthPercentageAuto::Auto,
                    top: LengthPercentageAuto::Length(PANEL_MARGIN * 3.0),
                    bottom: LengthPercentageAuto::Auto,
                },
                margin: Rect {
                    left: LengthPercentageAuto::Length(-loading.width * 0.5),
                    right: LengthPercentageAuto::Auto,
                    top: LengthPercentageAuto::Auto,
                    bottom: LengthPercentageAuto::Auto,
                },
                size: Size {
                    width: Dimension::Length(loading.width),
                    height: Dimension::Length(loading.height),
                },
                ..Default::default()
            })
            .context("creating loading panel node")?;
        panel_nodes.insert(PanelKind::Loading, loading_node);
        children.push(loading_node);

        let now_playing_node = tree
            .new_leaf(Style {
                position: Position::Absolute,
                inset: Rect {
                    left: LengthPercentageAuto::Length(PANEL_MARGIN),
                    right: LengthPercentageAuto::Auto,
                    top: LengthPercentageAuto::Length(PANEL_MARGIN),
                    bottom: LengthPercentageAuto::Auto,
                },
                size: Size {
                    width: Dimension::Length(now_playing.width),
                    height: Dimension::Length(now_playing.height),
                },
                ..Default::default()
            })
            .context("creating now-playing panel node")?;
        panel_nodes.insert(PanelKind::NowPlaying, now_playing_node);
        children.push(now_playing_node);

        let progress_node = tree
            .new_leaf(Style {
                position: Position::Absolute,
                inset: Rect {
                    left: LengthPercentageAuto::Length(PANEL_MARGIN),
                    right: LengthPercentageAuto::Auto,
                    top: LengthPercentageAuto::Auto,
                    bottom: LengthPercentageAuto::Length(PANEL_MARGIN),
                },
                size: Size {
                    width: Dimension::Length(progress.width),
                    height: Dimension::Length(progress.height),
                },
                ..Default::default()
            })
            .context("creating progress panel node")?;
        panel_nodes.insert(PanelKind::Progress, progress_node);
        children.push(progress_node);

        let root = tree
            .new_with_children(
                Style {
                    size: Size {
                        width: Dimension::Length(window_size.width as f32),
                        height: Dimension::Length(window_size.height as f32),
                    },
                    ..Default::default()
                },
                &children,
            )
            .context("creating UI root node")?;

        let mut layout = Self {
            tree,
            root,
            panel_nodes,
            window_size,
        };
        layout.recompute()?;
        Ok(layout)
    }

    pub fn set_window_size(&mut self, size: PhysicalSize<u32>) -> Result<()> {
        if self.window_size == size {
            return Ok(());
        }
        self.window_size = size;
        let mut style = self
            .tree
            .style(self.root)
            .context("fetching root style for resize")?
            .clone();
        style.size = Size {
            width: Dimension::Length(size.width as f32),
            height: Dimension::Length(size.height as f32),
        };
        self.tree
            .set_style(self.root, style)
            .context("updating root style for resize")?;
        self.recompute()
    }

    pub fn recompute(&mut self) -> Result<()> {
        self.tree
            .compute_layout(
                self.root,
                Size {
                    width: AvailableSpace::Definite(self.window_size.width as f32),
                    height: AvailableSpace::Definite(self.window_size.height as f32),
                },
            )
            .context("computing UI layout")
    }

    pub fn panel_rect(&self, panel: PanelKind) -> Option<ViewportRect> {
        let node = *self.panel_nodes.get(&panel)?;
        let layout = self.tree.layout(node).ok()?;
        Some(ViewportRect {
            x: layout.location.x,
            y: layout.location.y,
            width: layout.size.width,
            height: layout.size.height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> UiLayout {
        UiLayout::new(
            PhysicalSize::new(1280, 720),
            PanelSize {
                width: 400.0,
                height: 60.0,
            },
            PanelSize {
                width: 360.0,
                height: 48.0,
            },
            PanelSize {
                width: 480.0,
                height: 24.0,
            },
        )
        .expect("building layout")
    }

    #[test]
    fn panels_sit_against_their_window_edges() {
        let layout = layout();
        let now_playing = layout.panel_rect(PanelKind::NowPlaying).expect("now-playing rect");
        assert_eq!(now_playing.x, PANEL_MARGIN);
        assert_eq!(now_playing.y, PANEL_MARGIN);

        let progress = layout.panel_rect(PanelKind::Progress).expect("progress rect");
        assert_eq!(progress.y, 720.0 - PANEL_MARGIN - 24.0);
    }

    #[test]
    fn resize_moves_the_bottom_panel() {
        let mut layout = layout();
        layout
            .set_window_size(PhysicalSize::new(800, 600))
            .expect("resizing layout");
        let progress = layout.panel_rect(PanelKind::Progress).expect("progress rect");
        assert_eq!(progress.y, 600.0 - PANEL_MARGIN - 24.0);
    }
}
