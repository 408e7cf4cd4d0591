//! Model assets for the tapedeck showcase viewer.
//!
//! The showcase ships a single cassette-player model described by a JSON
//! manifest: named nodes with parent links, transforms, and triangle meshes.
//! This crate parses the manifest, resolves world transforms, exposes the
//! named hotspot nodes the viewer binds actions to, and provides the ray
//! intersection used for pointer picking. It also decodes the equirectangular
//! environment map used for reflections.

pub mod environment;
pub mod geometry;
pub mod manifest;

pub use environment::{EnvironmentMap, load_environment};
pub use geometry::{Ray, RayHit, ray_triangle};
pub use manifest::{
    HOTSPOT_BACKWARD, HOTSPOT_DOWNLOAD, HOTSPOT_FORWARD, HOTSPOT_PAUSE, HOTSPOT_PLAY,
    HotspotNodeSet, MeshVertex, Model, ModelNode, NodeMesh, SCREEN_FRAME, SCREEN_GLASS,
    load_model,
};
