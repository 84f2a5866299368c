//! Port definition for the underlying image element.

use std::sync::Arc;

use crate::domain::entities::{ImageSources, ResourceKey};
use crate::domain::errors::DecodeError;

/// Real sources handed to the element when fetching may begin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Key of the resource being fetched.
    pub key: ResourceKey,
    /// Candidate sources to assign in place of the deferred ones.
    pub sources: ImageSources,
}

/// Load-completion signal given to the element.
/// Firing more than once is allowed; the loader ignores repeats.
#[derive(Clone)]
pub struct LoadSignal(Arc<dyn Fn() + Send + Sync>);

impl LoadSignal {
    /// Wraps a notification closure.
    #[must_use]
    pub fn new(notify: impl Fn() + Send + Sync + 'static) -> Self {
        Self(Arc::new(notify))
    }

    /// Reports that the element finished loading.
    pub fn fire(&self) {
        (self.0)();
    }
}

impl std::fmt::Debug for LoadSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadSignal").finish_non_exhaustive()
    }
}

/// Port for the element that actually fetches and decodes the bitmap.
#[async_trait::async_trait]
pub trait ImageElement: Send + Sync {
    /// Assigns real source attributes and starts the fetch.
    /// `on_load` fires when the bytes are available.
    fn begin_fetch(&self, request: FetchRequest, on_load: LoadSignal);

    /// Best-effort decode of the fetched bitmap.
    async fn decode(&self) -> Result<(), DecodeError>;
}
