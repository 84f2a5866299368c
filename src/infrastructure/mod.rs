//! Infrastructure layer with detector, element and cache adapters.

/// Loaded-resource bookkeeping.
pub mod cache;
/// Application configuration.
pub mod config;
/// Image fetching and decoding.
pub mod image;
/// Visibility detection.
pub mod visibility;

pub use cache::{CacheStats, LoadedResourceSet};
pub use config::{AppConfig, CliArgs, LoaderConfig, LogLevel, StorageManager};
pub use image::{FetchingImageElement, InstantImageElement};
pub use visibility::{Bounds, ImmediateDetector, ViewportConfig, ViewportDetector, select_detector};
