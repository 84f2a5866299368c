//! Port definition for the shared loaded-resource record.

use crate::domain::entities::ResourceKey;

/// Append-only record of resources that finished loading.
/// Implementations must be thread-safe and never remove entries.
pub trait LoadStateCache: Send + Sync {
    /// Returns true if `key` has completed loading before.
    fn has(&self, key: &ResourceKey) -> bool;

    /// Records `key` as loaded. Idempotent.
    fn mark_loaded(&self, key: ResourceKey);

    /// Returns the number of recorded resources.
    fn len(&self) -> usize;

    /// Returns true if nothing has loaded yet.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
