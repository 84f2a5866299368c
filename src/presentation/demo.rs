//! Scripted page simulation: mount images from a manifest, scroll, report.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::application::services::{ImageLoader, LoaderContext};
use crate::domain::entities::{ImageOptions, ImageResource, LoadState, LoadView};
use crate::domain::errors::LoaderError;
use crate::domain::ports::{
    ElementRef, ImageElement, LoadListener, LoadStateCache, StartLoad, VisibilityDetector,
};
use crate::infrastructure::cache::LoadedResourceSet;
use crate::infrastructure::config::LoaderConfig;
use crate::infrastructure::image::{FetchError, FetchingImageElement, InstantImageElement};
use crate::infrastructure::visibility::{Bounds, ViewportDetector, select_detector};
use crate::presentation::render::{render_with, to_html};

/// Errors raised while building or running a scene.
#[derive(Debug, Error)]
pub enum DemoError {
    /// Manifest could not be read.
    #[error("failed to read manifest: {0}")]
    Io(#[from] std::io::Error),
    /// Manifest is not valid JSON for a page.
    #[error("invalid manifest: {0}")]
    Manifest(#[from] serde_json::Error),
    /// A loader rejected its entry.
    #[error("image {index}: {source}")]
    Loader {
        /// Position of the entry in the manifest.
        index: usize,
        /// Underlying loader error.
        #[source]
        source: LoaderError,
    },
    /// The fetching element could not be built.
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// One image placed on the simulated page.
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestEntry {
    /// Image descriptor.
    pub resource: ImageResource,
    /// Presentation options.
    #[serde(default)]
    pub options: ImageOptions,
    /// Offset of the container's top edge from the page start.
    #[serde(default)]
    pub top: i64,
    /// Container height; the intrinsic height when absent.
    #[serde(default)]
    pub height: Option<u32>,
    /// The image arrives server-rendered and already loaded.
    #[serde(default)]
    pub prerendered: bool,
}

/// Images of a simulated page, in document order.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    /// Placed images.
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Reads a JSON array of entries.
    ///
    /// # Errors
    /// Returns `DemoError` if the file cannot be read or parsed.
    pub fn from_path(path: &Path) -> Result<Self, DemoError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parses a JSON array of entries.
    ///
    /// # Errors
    /// Returns `DemoError::Manifest` on malformed input.
    pub fn from_json(json: &str) -> Result<Self, DemoError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// How a scene is wired.
#[derive(Debug, Clone, Default)]
pub struct SceneSettings {
    /// Height of the simulated viewport.
    pub viewport_height: u32,
    /// Loader tuning.
    pub loader: LoaderConfig,
    /// Signal loads without fetching.
    pub dry_run: bool,
    /// Behave as if the host had no intersection primitive.
    pub disable_intersection: bool,
}

struct LoggingListener {
    index: usize,
}

impl LoadListener for LoggingListener {
    fn on_start_load(&self, event: StartLoad) {
        debug!(image = self.index, was_cached = event.was_cached, "Start load");
    }

    fn on_load(&self) {
        info!(image = self.index, "Image loaded");
    }
}

struct MountedImage {
    loader: ImageLoader,
    container: Option<ElementRef>,
}

/// A page of mounted loaders sharing one detector and one loaded set.
pub struct Scene {
    images: Vec<MountedImage>,
    viewport: Option<Arc<ViewportDetector>>,
    cache: Arc<LoadedResourceSet>,
    settings: SceneSettings,
}

impl Scene {
    /// Mounts every manifest entry. `cache` may be shared with earlier
    /// scenes so previously loaded images skip the reveal.
    ///
    /// # Errors
    /// Returns `DemoError` if an entry has invalid options, its container
    /// cannot be observed, or the HTTP client cannot be built.
    pub fn mount(
        manifest: Manifest,
        settings: SceneSettings,
        cache: Arc<LoadedResourceSet>,
    ) -> Result<Self, DemoError> {
        let viewport = (!settings.disable_intersection).then(|| {
            Arc::new(ViewportDetector::new(
                settings.viewport_height,
                settings.loader.viewport(),
            ))
        });
        let detector: Arc<dyn VisibilityDetector> = select_detector(viewport.clone());
        let shared: Arc<dyn LoadStateCache> = cache.clone();
        let context = LoaderContext::new(detector, shared)
            .with_native_lazy_loading(settings.loader.native_lazy_loading);

        let mut images = Vec::with_capacity(manifest.entries.len());
        for (index, entry) in manifest.entries.into_iter().enumerate() {
            let element: Arc<dyn ImageElement> = if settings.dry_run {
                Arc::new(InstantImageElement)
            } else {
                Arc::new(FetchingImageElement::new(settings.loader.fetch_timeout())?)
            };

            let height = entry.height.unwrap_or(entry.resource.height);
            let container = match &viewport {
                Some(viewport) => viewport.register(Bounds::new(entry.top, height)),
                None => ElementRef(index as u64 + 1),
            };

            let mut loader = ImageLoader::new(&context, entry.resource, entry.options, element)
                .map_err(|source| DemoError::Loader { index, source })?
                .with_listener(Arc::new(LoggingListener { index }));
            let mounted = if entry.prerendered {
                loader.on_mount_prerendered(Some(container), true).map(|_| ())
            } else {
                loader.on_mount(Some(container))
            };
            mounted.map_err(|source| DemoError::Loader { index, source })?;

            images.push(MountedImage {
                loader,
                container: Some(container),
            });
        }

        info!(images = images.len(), "Scene mounted");
        if let Some(viewport) = &viewport {
            viewport.flush();
        }

        Ok(Self {
            images,
            viewport,
            cache,
            settings,
        })
    }

    /// Scrolls the viewport. A no-op without an intersection primitive.
    pub fn scroll_to(&self, offset: i64) {
        if let Some(viewport) = &self.viewport {
            let notified = viewport.scroll_to(offset);
            debug!(offset, notified, "Scrolled");
        }
    }

    /// Current scroll offset.
    #[must_use]
    pub fn offset(&self) -> i64 {
        self.viewport.as_ref().map_or(0, |viewport| viewport.offset())
    }

    /// Processes pending events and waits for in-flight loads to finish
    /// or time out.
    pub async fn settle(&mut self) {
        let limit = self.settings.loader.fetch_timeout();
        let waits_for_visibility = self.viewport.is_none();

        for (index, image) in self.images.iter_mut().enumerate() {
            image.loader.drain();
            let pending = match image.loader.state() {
                LoadState::Loading => true,
                LoadState::Observing => waits_for_visibility,
                LoadState::Idle | LoadState::Loaded => false,
            };
            if pending {
                let reached = image.loader.run_until_loaded(limit).await;
                if !reached.is_loaded() {
                    warn!(image = index, state = %reached, "Image did not finish loading");
                }
            }
            image.loader.settle().await;
        }
    }

    /// Snapshot of every loader, in document order.
    #[must_use]
    pub fn views(&self) -> Vec<LoadView> {
        self.images.iter().map(|image| image.loader.view()).collect()
    }

    /// Renders a text report of every image's state and markup.
    #[must_use]
    pub fn report(&self) -> String {
        let reveal = self.settings.loader.reveal();
        let mut out = String::new();
        let _ = writeln!(out, "== offset {} ==", self.offset());
        for (index, image) in self.images.iter().enumerate() {
            let view = image.loader.view();
            let _ = writeln!(
                out,
                "[{index}] {} {}{}",
                image.loader.key(),
                view.state,
                if view.was_cached { " (cached)" } else { "" }
            );
            let node = render_with(
                image.loader.resource(),
                image.loader.options(),
                view,
                &reveal,
            );
            let _ = writeln!(out, "{}", to_html(&node));
        }
        out
    }

    /// Summary line of the shared loaded set.
    #[must_use]
    pub fn cache_summary(&self) -> String {
        self.cache.stats().to_string()
    }

    /// Unmounts every loader and forgets its container.
    pub fn unmount(&mut self) {
        for image in &mut self.images {
            image.loader.on_unmount();
            if let (Some(viewport), Some(container)) = (&self.viewport, image.container.take()) {
                viewport.unregister(container);
            }
        }
        debug!("Scene unmounted");
    }
}

impl Drop for Scene {
    fn drop(&mut self) {
        self.unmount();
    }
}

/// Mounts `manifest`, visits each scroll offset and returns the reports.
///
/// # Errors
/// Returns `DemoError` if the scene cannot be mounted.
pub async fn run(
    manifest: Manifest,
    settings: SceneSettings,
    scroll: &[i64],
) -> Result<Vec<String>, DemoError> {
    let cache = Arc::new(LoadedResourceSet::new());
    let mut scene = Scene::mount(manifest, settings, cache)?;
    scene.settle().await;

    let mut reports = vec![scene.report()];
    for offset in scroll {
        scene.scroll_to(*offset);
        scene.settle().await;
        reports.push(scene.report());
    }
    reports.push(scene.cache_summary());
    Ok(reports)
}
