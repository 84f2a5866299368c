//! Lazyreveal - visibility-gated progressive image loading.
//!
//! This crate defers fetching an image until its container scrolls into
//! view, shows a placeholder meanwhile, and cross-fades to the decoded image.
//! Images already loaded once are remembered and shown without the fade.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing the loader state machine.
pub mod application;
/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing detector, element and cache adapters.
pub mod infrastructure;
/// Presentation layer containing markup rendering.
pub mod presentation;

/// Current version of the application.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name.
pub const NAME: &str = "lazyreveal";
