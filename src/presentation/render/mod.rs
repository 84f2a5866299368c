//! Presentation adapter: turns loader state into markup.

mod adapter;
mod html;
mod node;

pub use adapter::{RevealStyle, WRAPPER_CLASS, render, render_with};
pub use html::to_html;
pub use node::RenderNode;
