//! Hotspot picking. Transport controls live on named nodes of the cassette
//! model; a click raycasts into the scene and the nearest hit is looked up
//! in a binding table built once when the model arrives. Nodes without a
//! binding (the screen pair included) absorb the click.

use std::collections::HashMap;

use tapedeck_model::{HotspotNodeSet, Model, Ray};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotspotAction {
    Play,
    Pause,
    NextStream,
    PreviousStream,
    Download,
}

/// Node-index to action table. Built from the model's named hotspot nodes;
/// a model missing any of them yields no bindings and clicks fall through.
#[derive(Debug, Default)]
pub struct HotspotBindings {
    actions: HashMap<usize, HotspotAction>,
}

impl HotspotBindings {
    pub fn from_model(model: &Model) -> Self {
        match model.hotspot_nodes() {
            Some(set) => Self::from_node_set(&set),
            None => {
                log::warn!("model is missing hotspot nodes, transport controls disabled");
                Self::default()
            }
        }
    }

    fn from_node_set(set: &HotspotNodeSet) -> Self {
        let mut actions = HashMap::new();
        actions.insert(set.play, HotspotAction::Play);
        actions.insert(set.pause, HotspotAction::Pause);
        actions.insert(set.forward, HotspotAction::NextStream);
        actions.insert(set.backward, HotspotAction::PreviousStream);
        actions.insert(set.download, HotspotAction::Download);
        Self { actions }
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Action bound to the node the ray hits first, if any. Hits on unbound
    /// nodes return `None`; the click is simply absorbed.
    pub fn pick(&self, model: &Model, ray: &Ray) -> Option<HotspotAction> {
        let hit = model.raycast(ray)?;
        self.actions.get(&hit.node).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use glam::Vec3;

    /// Minimal two-node model: a bound play button in front of an unbound
    /// casing panel. Node quads face +Z at z=0 (play) and z=-2 (casing).
    fn model_with_play_button() -> Model {
        let manifest = r#"{
            "name": "fixture",
            "nodes": [
                {
                    "name": "PlayButton",
                    "translation": [0.0, 0.0, 0.0],
                    "rotation_degrees": [0.0, 0.0, 0.0],
                    "mesh": {
                        "positions": [[-1.0, -1.0, 0.0], [1.0, -1.0, 0.0], [0.0, 1.0, 0.0]],
                        "normals": [[0.0, 0.0, 1.0], [0.0, 0.0, 1.0], [0.0, 0.0, 1.0]],
                        "indices": [0, 1, 2]
                    }
                },
                {
                    "name": "Casing",
                    "translation": [0.0, 0.0, -2.0],
                    "rotation_degrees": [0.0, 0.0, 0.0],
                    "mesh": {
                        "positions": [[-3.0, -3.0, 0.0], [3.0, -3.0, 0.0], [0.0, 3.0, 0.0]],
                        "normals": [[0.0, 0.0, 1.0], [0.0, 0.0, 1.0], [0.0, 0.0, 1.0]],
                        "indices": [0, 1, 2]
                    }
                }
            ]
        }"#;
        let mut file = tempfile::NamedTempFile::new().expect("creating model fixture");
        file.write_all(manifest.as_bytes()).expect("writing fixture");
        tapedeck_model::load_model(file.path(), &mut |_| {}).expect("loading fixture")
    }

    fn bindings_for(model: &Model) -> HotspotBindings {
        let play = model.node_index("PlayButton").expect("play node");
        let mut actions = HashMap::new();
        actions.insert(play, HotspotAction::Play);
        HotspotBindings { actions }
    }

    #[test]
    fn nearest_hit_wins() {
        let model = model_with_play_button();
        let bindings = bindings_for(&model);
        // Ray passes through both triangles; the play button is closer.
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
        assert_eq!(bindings.pick(&model, &ray), Some(HotspotAction::Play));
    }

    #[test]
    fn unbound_node_absorbs_the_click() {
        let model = model_with_play_button();
        let bindings = bindings_for(&model);
        // Off to the side, only the larger casing triangle is hit.
        let ray = Ray::new(Vec3::new(-2.0, -2.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
        assert_eq!(bindings.pick(&model, &ray), None);
    }

    #[test]
    fn miss_returns_no_action() {
        let model = model_with_play_button();
        let bindings = bindings_for(&model);
        let ray = Ray::new(Vec3::new(50.0, 50.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
        assert_eq!(bindings.pick(&model, &ray), None);
    }

    #[test]
    fn incomplete_model_disables_bindings() {
        let model = model_with_play_button();
        let bindings = HotspotBindings::from_model(&model);
        assert!(bindings.is_empty());
    }
}
