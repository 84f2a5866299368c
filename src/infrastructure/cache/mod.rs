//! Load-state caching.

pub mod loaded_set;

pub use loaded_set::{CacheStats, LoadedResourceSet};
