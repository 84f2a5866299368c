//! Domain layer with core entities, errors and port definitions.

/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Port definitions.
pub mod ports;

pub use entities::{ImageOptions, ImageResource, LoadState, LoadView, ResourceKey};
pub use errors::{DecodeError, LoaderError};
pub use ports::{ImageElement, LoadListener, LoadStateCache, VisibilityDetector};
