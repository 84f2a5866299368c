//! Image element adapters.
//!
//! This module provides:
//! - A fetching element backed by HTTP or the local filesystem
//! - An instant element for dry runs

pub mod element;

pub use element::{FetchError, FetchingImageElement, InstantImageElement};
