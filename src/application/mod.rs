//! Application layer with the loader state machine.

/// Loader services.
pub mod services;

pub use services::{ImageLoader, LoaderContext, LoaderEvent, Ticket};
