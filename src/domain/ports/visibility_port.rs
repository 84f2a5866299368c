//! Port definition for viewport-intersection observation.

use std::sync::Arc;

use crate::domain::errors::LoaderError;

/// Opaque reference to a mounted host element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementRef(pub u64);

impl std::fmt::Display for ElementRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Callback invoked when an observed element becomes visible.
pub type VisibilityCallback = Arc<dyn Fn() + Send + Sync>;

/// Live subscription token returned by a detector.
///
/// Releasing is idempotent, and a handle that is dropped while still live
/// releases itself. The unsubscribe action runs at most once.
pub struct VisibilityHandle {
    id: u64,
    unsubscribe: Option<Box<dyn FnOnce() + Send>>,
}

impl VisibilityHandle {
    /// Creates a handle that runs `unsubscribe` on release.
    #[must_use]
    pub fn new(id: u64, unsubscribe: impl FnOnce() + Send + 'static) -> Self {
        Self {
            id,
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    /// Subscription id assigned by the detector.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Returns true until the handle has been released.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        self.unsubscribe.is_some()
    }

    /// Unsubscribes. Calling this again is a no-op.
    pub fn release(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl Drop for VisibilityHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for VisibilityHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisibilityHandle")
            .field("id", &self.id)
            .field("live", &self.is_live())
            .finish()
    }
}

/// Port for visibility detection.
/// Implementations must be thread-safe.
pub trait VisibilityDetector: Send + Sync {
    /// Starts observing `target`; `on_visible` is scheduled once the element
    /// intersects the viewport. Invocation is never synchronous with respect
    /// to the host's current callback.
    ///
    /// # Errors
    /// Returns `LoaderError::InvalidTarget` if `target` is `None` or unknown.
    fn subscribe(
        &self,
        target: Option<&ElementRef>,
        on_visible: VisibilityCallback,
    ) -> Result<VisibilityHandle, LoaderError>;

    /// Stops observing. Releasing twice is a no-op.
    fn release(&self, handle: &mut VisibilityHandle) {
        handle.release();
    }
}
