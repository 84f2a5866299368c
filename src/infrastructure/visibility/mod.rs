//! Visibility detection adapters.
//!
//! This module provides:
//! - A viewport intersection observer driven by scroll and resize
//! - An always-visible fallback for hosts without one

pub mod immediate;
pub mod viewport;

use std::sync::Arc;

use tracing::warn;

use crate::domain::ports::VisibilityDetector;

pub use immediate::ImmediateDetector;
pub use viewport::{Bounds, ViewportConfig, ViewportDetector};

/// Picks the intersection primitive when the host provides one and
/// degrades to treating every element as visible otherwise.
#[must_use]
pub fn select_detector(primitive: Option<Arc<ViewportDetector>>) -> Arc<dyn VisibilityDetector> {
    match primitive {
        Some(detector) => detector,
        None => {
            warn!("No intersection primitive available, images load immediately");
            Arc::new(ImmediateDetector::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::ElementRef;

    #[test]
    fn test_fallback_accepts_any_target() {
        let detector = select_detector(None);
        let handle = detector.subscribe(Some(&ElementRef(42)), Arc::new(|| {}));
        assert!(handle.is_ok());
    }

    #[test]
    fn test_primitive_is_used_when_present() {
        let viewport = Arc::new(ViewportDetector::new(100, ViewportConfig::default()));
        let detector = select_detector(Some(viewport.clone()));

        // The viewport rejects elements it never registered.
        let result = detector.subscribe(Some(&ElementRef(42)), Arc::new(|| {}));
        assert!(result.is_err());
        assert_eq!(viewport.live_subscriptions(), 0);
    }
}
