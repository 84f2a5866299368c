//! Fallback detector for hosts without an intersection primitive.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tracing::trace;

use crate::domain::errors::LoaderError;
use crate::domain::ports::{ElementRef, VisibilityCallback, VisibilityDetector, VisibilityHandle};

/// Treats every observed element as visible right away.
///
/// The callback is scheduled on the current tokio runtime when one is
/// available and skipped if the handle is released before it runs.
#[derive(Debug, Default)]
pub struct ImmediateDetector {
    next_subscription: AtomicU64,
}

impl ImmediateDetector {
    /// Creates the fallback detector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl VisibilityDetector for ImmediateDetector {
    fn subscribe(
        &self,
        target: Option<&ElementRef>,
        on_visible: VisibilityCallback,
    ) -> Result<VisibilityHandle, LoaderError> {
        let target = target.ok_or_else(|| LoaderError::invalid_target("no element to observe"))?;
        let id = self.next_subscription.fetch_add(1, Ordering::Relaxed) + 1;
        let active = Arc::new(AtomicBool::new(true));

        trace!(subscription = id, target = %target, "Treating element as visible");

        let fire = {
            let active = active.clone();
            move || {
                if active.load(Ordering::Acquire) {
                    on_visible();
                }
            }
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { fire() });
            }
            Err(_) => fire(),
        }

        Ok(VisibilityHandle::new(id, move || {
            active.store(false, Ordering::Release);
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, VisibilityCallback) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = count.clone();
        let callback: VisibilityCallback = Arc::new(move || {
            inner.fetch_add(1, Ordering::SeqCst);
        });
        (count, callback)
    }

    #[test]
    fn test_requires_target() {
        let (_, callback) = counter();
        let result = ImmediateDetector::new().subscribe(None, callback);
        assert!(matches!(result, Err(LoaderError::InvalidTarget { .. })));
    }

    #[tokio::test]
    async fn test_fires_after_yield() {
        let (count, callback) = counter();
        let detector = ImmediateDetector::new();
        let _handle = detector.subscribe(Some(&ElementRef(1)), callback).unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 0);
        tokio::task::yield_now().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_release_before_run_cancels() {
        let (count, callback) = counter();
        let detector = ImmediateDetector::new();
        let mut handle = detector.subscribe(Some(&ElementRef(1)), callback).unwrap();

        handle.release();
        tokio::task::yield_now().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_without_runtime_fires_inline() {
        let (count, callback) = counter();
        let _handle = ImmediateDetector::new()
            .subscribe(Some(&ElementRef(1)), callback)
            .unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
