//! Loader error types.

use thiserror::Error;

/// Errors surfaced to the host by the loader and its collaborators.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum LoaderError {
    #[error("invalid observation target: {reason}")]
    InvalidTarget { reason: String },

    #[error("invalid image options: {reason}")]
    InvalidOptions { reason: String },

    #[error("loader has been unmounted")]
    Unmounted,
}

impl LoaderError {
    /// Creates invalid target error.
    #[must_use]
    pub fn invalid_target(reason: impl Into<String>) -> Self {
        Self::InvalidTarget {
            reason: reason.into(),
        }
    }

    /// Creates invalid options error.
    #[must_use]
    pub fn invalid_options(reason: impl Into<String>) -> Self {
        Self::InvalidOptions {
            reason: reason.into(),
        }
    }

    /// Returns whether the error stems from a host programming mistake.
    /// Such errors are never retried.
    #[must_use]
    pub const fn is_caller_bug(&self) -> bool {
        matches!(
            self,
            Self::InvalidTarget { .. } | Self::InvalidOptions { .. } | Self::Unmounted
        )
    }
}

/// Failure of the best-effort decode step. Never blocks reaching `Loaded`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum DecodeError {
    #[error("nothing fetched to decode")]
    NoData,

    #[error("unsupported or corrupt image: {message}")]
    Malformed { message: String },

    #[error("decode task aborted: {message}")]
    Aborted { message: String },
}

impl DecodeError {
    /// Creates malformed image error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    /// Creates aborted task error.
    #[must_use]
    pub fn aborted(message: impl Into<String>) -> Self {
        Self::Aborted {
            message: message.into(),
        }
    }
}
