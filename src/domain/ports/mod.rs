mod image_element_port;
mod load_cache_port;
mod load_listener_port;
mod visibility_port;

pub use image_element_port::{FetchRequest, ImageElement, LoadSignal};
pub use load_cache_port::LoadStateCache;
pub use load_listener_port::{LoadListener, NoopListener, StartLoad};
pub use visibility_port::{ElementRef, VisibilityCallback, VisibilityDetector, VisibilityHandle};

#[cfg(test)]
pub mod mocks {
    pub use super::load_listener_port::MockLoadListener;
}
