//! Domain entity definitions.

mod image;
mod options;

pub use image::{
    FallbackSource, ImageResource, ImageSources, LoadState, LoadView, Placeholder, ResourceKey,
    SourceCandidate,
};
pub use options::{ImageOptions, ImageOptionsBuilder, Layout, Loading, ObjectFit};
