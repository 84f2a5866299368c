//! Presentation layer: markup rendering and the scroll simulation.

/// Scripted page simulation.
pub mod demo;
/// Loader state to markup.
pub mod render;

pub use demo::{DemoError, Manifest, ManifestEntry, Scene, SceneSettings};
pub use render::{RenderNode, RevealStyle, render, render_with, to_html};
