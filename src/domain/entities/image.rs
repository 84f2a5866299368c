//! Domain types for progressive image loading.

use serde::{Deserialize, Serialize};

use super::options::Layout;

/// Stable identifier for an image resource.
/// Derived from the canonical serialization of its candidate sources.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceKey(pub String);

impl ResourceKey {
    /// Creates a new `ResourceKey` from any string-like input.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Derives the key from a set of candidate sources.
    #[must_use]
    pub fn from_sources(sources: &ImageSources) -> Self {
        // Serializing plain strings and options cannot fail.
        Self(serde_json::to_string(sources).unwrap_or_default())
    }

    /// Short hex digest of the key, suitable for log fields.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(self.0.as_bytes());
        let result = hasher.finalize();
        hex::encode(&result[..8])
    }

    /// Returns the inner string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.fingerprint())
    }
}

impl From<&str> for ResourceKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ResourceKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// The default `<img>` source used when no `<source>` candidate matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackSource {
    /// Plain `src` URL.
    pub src: String,
    /// Comma-separated `srcset` candidates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_set: Option<String>,
    /// `sizes` hint for the browser.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sizes: Option<String>,
}

/// One `<source>` candidate inside a `<picture>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceCandidate {
    /// Comma-separated `srcset` candidates.
    pub src_set: String,
    /// Media query the candidate applies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<String>,
    /// MIME type, e.g. `image/webp`.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// `sizes` hint for the browser.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sizes: Option<String>,
}

/// All candidate sources for one image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSources {
    /// Fallback `<img>` source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<FallbackSource>,
    /// Additional `<source>` candidates, in priority order.
    #[serde(default)]
    pub sources: Vec<SourceCandidate>,
}

impl ImageSources {
    /// Creates sources with only a fallback `src`.
    #[must_use]
    pub fn from_src(src: impl Into<String>) -> Self {
        Self {
            fallback: Some(FallbackSource {
                src: src.into(),
                src_set: None,
                sizes: None,
            }),
            sources: Vec::new(),
        }
    }

    /// Adds a `<source>` candidate.
    #[must_use]
    pub fn with_source(mut self, candidate: SourceCandidate) -> Self {
        self.sources.push(candidate);
        self
    }

    /// Returns true if there is nothing to fetch.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fallback.is_none() && self.sources.is_empty()
    }

    /// Effective `sizes`: the fallback's unless overridden.
    #[must_use]
    pub fn sizes(&self) -> Option<&str> {
        self.fallback.as_ref().and_then(|f| f.sizes.as_deref())
    }

    /// The URL a fetching element should request first.
    #[must_use]
    pub fn primary_url(&self) -> Option<&str> {
        if let Some(fallback) = &self.fallback {
            return Some(fallback.src.as_str());
        }
        self.sources
            .first()
            .and_then(|s| s.src_set.split(',').next())
            .and_then(|candidate| candidate.split_whitespace().next())
    }
}

/// Low-resolution stand-in shown before the main image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placeholder {
    /// Blurred or traced image URL (often a data URI).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
    /// Optional `<source>` candidates for the placeholder.
    #[serde(default)]
    pub sources: Vec<SourceCandidate>,
}

/// Descriptor of an image supplied by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageResource {
    /// Candidate sources of the full-resolution image.
    pub images: ImageSources,
    /// Intrinsic width in CSS pixels.
    pub width: u32,
    /// Intrinsic height in CSS pixels.
    pub height: u32,
    /// Layout mode.
    #[serde(default)]
    pub layout: Layout,
    /// Placeholder shown while the main image is pending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<Placeholder>,
    /// Alternative text; empty for purely presentational images.
    #[serde(default)]
    pub alt: String,
}

impl ImageResource {
    /// Creates a new resource from its sources and intrinsic size.
    #[must_use]
    pub fn new(images: ImageSources, width: u32, height: u32) -> Self {
        Self {
            images,
            width,
            height,
            layout: Layout::default(),
            placeholder: None,
            alt: String::new(),
        }
    }

    /// Sets the layout mode.
    #[must_use]
    pub const fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    /// Sets the placeholder.
    #[must_use]
    pub fn with_placeholder(mut self, placeholder: Placeholder) -> Self {
        self.placeholder = Some(placeholder);
        self
    }

    /// Sets the alternative text.
    #[must_use]
    pub fn with_alt(mut self, alt: impl Into<String>) -> Self {
        self.alt = alt.into();
        self
    }

    /// Key identifying this resource for caching and staleness checks.
    #[must_use]
    pub fn key(&self) -> ResourceKey {
        ResourceKey::from_sources(&self.images)
    }

    /// Height divided by width, or `None` for a degenerate width.
    #[must_use]
    pub fn aspect_ratio(&self) -> Option<f64> {
        (self.width > 0).then(|| f64::from(self.height) / f64::from(self.width))
    }
}

/// State of one loader in the reveal pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LoadState {
    /// Nothing has happened yet for the current resource.
    #[default]
    Idle,
    /// Waiting for the container to become visible.
    Observing,
    /// Real sources assigned; waiting for load and decode.
    Loading,
    /// Main image is ready for display.
    Loaded,
}

impl LoadState {
    /// Returns true once the main image sources should be populated.
    #[must_use]
    pub const fn sources_assigned(self) -> bool {
        matches!(self, Self::Loading | Self::Loaded)
    }

    /// Returns true if the main image is ready.
    #[must_use]
    pub const fn is_loaded(self) -> bool {
        matches!(self, Self::Loaded)
    }
}

impl std::fmt::Display for LoadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Observing => write!(f, "observing"),
            Self::Loading => write!(f, "loading"),
            Self::Loaded => write!(f, "loaded"),
        }
    }
}

/// Read-only snapshot consumed by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadView {
    /// Current state.
    pub state: LoadState,
    /// True when `Loaded` was reached from the loaded-resource set.
    /// Fade-in transitions are skipped in that case.
    pub was_cached: bool,
    /// The host defers offscreen fetches itself, so real sources are
    /// emitted from mount with `loading="lazy"`.
    pub native_lazy: bool,
}

impl LoadView {
    /// Returns true once the main image's real sources should be emitted.
    #[must_use]
    pub const fn sources_assigned(self) -> bool {
        self.native_lazy || self.state.sources_assigned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_stable_for_equal_sources() {
        let a = ImageSources::from_src("https://example.com/a.png");
        let b = ImageSources::from_src("https://example.com/a.png");
        assert_eq!(ResourceKey::from_sources(&a), ResourceKey::from_sources(&b));
    }

    #[test]
    fn test_key_differs_when_candidates_differ() {
        let a = ImageSources::from_src("https://example.com/a.png");
        let b = a.clone().with_source(SourceCandidate {
            src_set: "https://example.com/a.webp 400w".to_string(),
            media: None,
            mime_type: Some("image/webp".to_string()),
            sizes: None,
        });
        assert_ne!(ResourceKey::from_sources(&a), ResourceKey::from_sources(&b));
    }

    #[test]
    fn test_fingerprint_length() {
        let key = ResourceKey::new("img-1");
        assert_eq!(key.fingerprint().len(), 16);
        assert_eq!(key.to_string(), key.fingerprint());
    }

    #[test]
    fn test_primary_url_prefers_fallback() {
        let sources = ImageSources::from_src("/a.png").with_source(SourceCandidate {
            src_set: "/a.webp 400w, /b.webp 800w".to_string(),
            media: None,
            mime_type: None,
            sizes: None,
        });
        assert_eq!(sources.primary_url(), Some("/a.png"));

        let only_sources = ImageSources {
            fallback: None,
            sources: sources.sources.clone(),
        };
        assert_eq!(only_sources.primary_url(), Some("/a.webp"));
        assert_eq!(ImageSources::default().primary_url(), None);
    }

    #[test]
    fn test_load_state_ordering() {
        assert!(LoadState::Idle < LoadState::Observing);
        assert!(LoadState::Observing < LoadState::Loading);
        assert!(LoadState::Loading < LoadState::Loaded);
        assert!(!LoadState::Observing.sources_assigned());
        assert!(LoadState::Loading.sources_assigned());
    }

    #[test]
    fn test_native_lazy_view_assigns_sources_early() {
        let observing = LoadView {
            state: LoadState::Observing,
            ..LoadView::default()
        };
        assert!(!observing.sources_assigned());
        assert!(
            LoadView {
                native_lazy: true,
                ..observing
            }
            .sources_assigned()
        );
    }

    #[test]
    fn test_aspect_ratio() {
        let resource = ImageResource::new(ImageSources::from_src("/a.png"), 400, 200);
        assert_eq!(resource.aspect_ratio(), Some(0.5));
        let degenerate = ImageResource::new(ImageSources::from_src("/a.png"), 0, 200);
        assert_eq!(degenerate.aspect_ratio(), None);
    }
}
