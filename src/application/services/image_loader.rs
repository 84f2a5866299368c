//! Progressive image loading state machine.
//!
//! Drives one mounted image through `Idle -> Observing -> Loading -> Loaded`.
//! Collaborator callbacks never touch the loader directly: they post
//! `LoaderEvent`s carrying the `Ticket` they were issued with, and the host
//! pumps them with [`ImageLoader::drain`] or [`ImageLoader::settle`]. An event
//! whose ticket no longer matches is stale and dropped.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, trace, warn};

use crate::domain::entities::{
    ImageOptions, ImageResource, LoadState, LoadView, Loading, ResourceKey,
};
use crate::domain::errors::{DecodeError, LoaderError};
use crate::domain::ports::{
    ElementRef, FetchRequest, ImageElement, LoadListener, LoadSignal, LoadStateCache,
    NoopListener, StartLoad, VisibilityDetector, VisibilityHandle,
};

/// Identifies the resource and reset generation a callback was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    key: ResourceKey,
    epoch: u64,
}

impl Ticket {
    /// Key the callback was issued for.
    #[must_use]
    pub const fn key(&self) -> &ResourceKey {
        &self.key
    }
}

/// Message posted by collaborators back to the loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoaderEvent {
    /// The container intersected the viewport.
    Visible(Ticket),
    /// The image element finished loading its bytes.
    LoadComplete(Ticket),
    /// The decode step finished, successfully or not.
    Decoded(Ticket, Result<(), DecodeError>),
    /// A server-rendered image finished loading in place.
    PrerenderedLoad(Ticket),
}

impl LoaderEvent {
    const fn ticket(&self) -> &Ticket {
        match self {
            Self::Visible(ticket)
            | Self::LoadComplete(ticket)
            | Self::Decoded(ticket, _)
            | Self::PrerenderedLoad(ticket) => ticket,
        }
    }
}

/// Collaborators shared by every loader on a page.
#[derive(Clone)]
pub struct LoaderContext {
    detector: Arc<dyn VisibilityDetector>,
    cache: Arc<dyn LoadStateCache>,
    native_lazy_loading: bool,
}

impl LoaderContext {
    /// Creates a context from a detector and a loaded-resource store.
    #[must_use]
    pub fn new(detector: Arc<dyn VisibilityDetector>, cache: Arc<dyn LoadStateCache>) -> Self {
        Self {
            detector,
            cache,
            native_lazy_loading: false,
        }
    }

    /// Declares whether the host defers offscreen image fetches itself
    /// (`loading="lazy"`). Such hosts get real sources from mount and may
    /// adopt server-rendered images without observing them.
    #[must_use]
    pub fn with_native_lazy_loading(mut self, supported: bool) -> Self {
        self.native_lazy_loading = supported;
        self
    }

    /// The shared loaded-resource store.
    #[must_use]
    pub fn cache(&self) -> &Arc<dyn LoadStateCache> {
        &self.cache
    }
}

impl std::fmt::Debug for LoaderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderContext")
            .field("loaded", &self.cache.len())
            .field("native_lazy_loading", &self.native_lazy_loading)
            .finish_non_exhaustive()
    }
}

/// State machine for one mounted image.
pub struct ImageLoader {
    resource: ImageResource,
    options: ImageOptions,
    key: ResourceKey,
    epoch: u64,
    state: LoadState,
    was_cached: bool,
    load_notified: bool,
    native_lazy: bool,
    prerendered: bool,
    mounted: bool,
    torn_down: bool,
    container: Option<ElementRef>,
    handle: Option<VisibilityHandle>,
    decode_task: Option<JoinHandle<()>>,
    detector: Arc<dyn VisibilityDetector>,
    cache: Arc<dyn LoadStateCache>,
    element: Arc<dyn ImageElement>,
    listener: Arc<dyn LoadListener>,
    event_tx: mpsc::UnboundedSender<LoaderEvent>,
    event_rx: mpsc::UnboundedReceiver<LoaderEvent>,
}

impl std::fmt::Debug for ImageLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageLoader")
            .field("key", &self.key)
            .field("epoch", &self.epoch)
            .field("state", &self.state)
            .field("was_cached", &self.was_cached)
            .field("torn_down", &self.torn_down)
            .finish_non_exhaustive()
    }
}

impl ImageLoader {
    /// Creates an unmounted loader.
    ///
    /// # Errors
    /// Returns `LoaderError::InvalidOptions` if `options` fail validation.
    pub fn new(
        context: &LoaderContext,
        resource: ImageResource,
        options: ImageOptions,
        element: Arc<dyn ImageElement>,
    ) -> Result<Self, LoaderError> {
        options.validate()?;
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let key = resource.key();

        Ok(Self {
            resource,
            options,
            key,
            epoch: 0,
            state: LoadState::Idle,
            was_cached: false,
            load_notified: false,
            native_lazy: context.native_lazy_loading,
            prerendered: false,
            mounted: false,
            torn_down: false,
            container: None,
            handle: None,
            decode_task: None,
            detector: context.detector.clone(),
            cache: context.cache.clone(),
            element,
            listener: Arc::new(NoopListener),
            event_tx,
            event_rx,
        })
    }

    /// Sets the collaborator notified on start-load and load.
    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn LoadListener>) -> Self {
        self.listener = listener;
        self
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> LoadState {
        self.state
    }

    /// Snapshot for the presentation layer.
    #[must_use]
    pub const fn view(&self) -> LoadView {
        LoadView {
            state: self.state,
            was_cached: self.was_cached,
            native_lazy: self.native_lazy,
        }
    }

    /// Resource currently displayed.
    #[must_use]
    pub const fn resource(&self) -> &ImageResource {
        &self.resource
    }

    /// Validated presentation options.
    #[must_use]
    pub const fn options(&self) -> &ImageOptions {
        &self.options
    }

    /// Key of the current resource.
    #[must_use]
    pub const fn key(&self) -> &ResourceKey {
        &self.key
    }

    /// Ticket that callbacks issued right now would carry.
    #[must_use]
    pub fn ticket(&self) -> Ticket {
        Ticket {
            key: self.key.clone(),
            epoch: self.epoch,
        }
    }

    /// Returns true while a visibility subscription is held.
    #[must_use]
    pub fn is_observing(&self) -> bool {
        self.handle.as_ref().is_some_and(VisibilityHandle::is_live)
    }

    /// Returns true after `on_unmount`.
    #[must_use]
    pub const fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Host hook: the container element has been mounted.
    ///
    /// # Errors
    /// Returns `LoaderError::InvalidTarget` if the detector cannot observe
    /// `container`, or `LoaderError::Unmounted` after teardown.
    pub fn on_mount(&mut self, container: Option<ElementRef>) -> Result<(), LoaderError> {
        if self.torn_down {
            return Err(LoaderError::Unmounted);
        }
        self.container = container;
        self.mounted = true;
        self.begin()
    }

    /// Host hook: the container was mounted around an image that the
    /// server already rendered with real sources.
    ///
    /// On hosts with native lazy loading the image is adopted as is: no
    /// observation, `on_start_load` right away, and `Loaded` either now
    /// (`complete`) or when the returned signal fires from the image's load
    /// event. Other hosts fall back to [`ImageLoader::on_mount`] and get no
    /// signal.
    ///
    /// # Errors
    /// Same as [`ImageLoader::on_mount`].
    pub fn on_mount_prerendered(
        &mut self,
        container: Option<ElementRef>,
        complete: bool,
    ) -> Result<Option<LoadSignal>, LoaderError> {
        if !self.native_lazy {
            self.on_mount(container)?;
            return Ok(None);
        }
        if self.torn_down {
            return Err(LoaderError::Unmounted);
        }
        self.container = container;
        self.mounted = true;
        if self.state != LoadState::Idle {
            return Ok(None);
        }

        self.prerendered = true;
        self.was_cached = false;
        self.state = LoadState::Loading;
        debug!(key = %self.key, complete, "Adopting server-rendered image");
        self.listener.on_start_load(StartLoad { was_cached: false });

        if complete {
            self.finish_loaded();
            return Ok(None);
        }

        let ticket = self.ticket();
        let tx = self.event_tx.clone();
        Ok(Some(LoadSignal::new(move || {
            let _ = tx.send(LoaderEvent::PrerenderedLoad(ticket.clone()));
        })))
    }

    /// Host hook: the image prop changed.
    /// A different key resets the loader to `Idle` and starts over.
    ///
    /// # Errors
    /// Same as [`ImageLoader::on_mount`].
    pub fn on_resource_change(&mut self, resource: ImageResource) -> Result<(), LoaderError> {
        if self.torn_down {
            return Err(LoaderError::Unmounted);
        }
        let key = resource.key();
        self.resource = resource;
        if key == self.key {
            return Ok(());
        }

        debug!(from = %self.key, to = %key, state = %self.state, "Resource changed, resetting");
        self.reset(key);
        if self.mounted {
            self.begin()
        } else {
            Ok(())
        }
    }

    /// Host hook: the component is being removed.
    /// Releases the subscription; later callbacks are ignored.
    pub fn on_unmount(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.mounted = false;
        self.release_handle();
        self.abort_decode();
        self.epoch += 1;
        debug!(key = %self.key, state = %self.state, "Loader unmounted");
    }

    /// Processes every queued event without waiting. Returns how many ran.
    pub fn drain(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(event) = self.event_rx.try_recv() {
            self.handle_event(event);
            processed += 1;
        }
        processed
    }

    /// Processes queued events and waits for an in-flight decode to report.
    /// A decode task that dies without reporting counts as a failed decode.
    pub async fn settle(&mut self) {
        loop {
            self.drain();
            if self.torn_down {
                break;
            }
            let Some(task) = self.decode_task.as_mut() else {
                break;
            };
            let wake = tokio::select! {
                event = self.event_rx.recv() => Wake::Event(event),
                joined = task => Wake::Joined(joined),
            };
            match wake {
                Wake::Event(Some(event)) => self.handle_event(event),
                Wake::Event(None) => break,
                Wake::Joined(joined) => self.on_decode_task_exit(joined),
            }
        }
    }

    /// Processes events as they arrive until `Loaded` or `limit` elapses.
    /// Returns the state reached.
    pub async fn run_until_loaded(&mut self, limit: Duration) -> LoadState {
        self.drain();
        let deadline = tokio::time::Instant::now() + limit;
        while !self.torn_down && !self.state.is_loaded() {
            match tokio::time::timeout_at(deadline, self.event_rx.recv()).await {
                Ok(Some(event)) => self.handle_event(event),
                Ok(None) | Err(_) => break,
            }
        }
        self.state
    }

    /// Applies one event. Stale and post-teardown events are no-ops.
    pub fn handle_event(&mut self, event: LoaderEvent) {
        if self.torn_down {
            trace!(?event, "Discarding event after teardown");
            return;
        }
        if *event.ticket() != self.ticket() {
            trace!(key = %event.ticket().key, "Discarding stale event");
            return;
        }

        match event {
            LoaderEvent::Visible(_) => self.on_visible(),
            LoaderEvent::LoadComplete(_) => self.on_load_complete(),
            LoaderEvent::Decoded(_, result) => self.on_decoded(result),
            LoaderEvent::PrerenderedLoad(_) => self.on_prerendered_load(),
        }
    }

    fn begin(&mut self) -> Result<(), LoaderError> {
        if self.state != LoadState::Idle {
            return Ok(());
        }

        if self.cache.has(&self.key) {
            self.was_cached = true;
            self.state = LoadState::Loaded;
            debug!(key = %self.key, "Resource already loaded, skipping observation");
            return Ok(());
        }

        if self.options.loading == Loading::Eager {
            self.start_loading(false);
            return Ok(());
        }

        self.release_handle();
        let ticket = self.ticket();
        let tx = self.event_tx.clone();
        let handle = self.detector.subscribe(
            self.container.as_ref(),
            Arc::new(move || {
                let _ = tx.send(LoaderEvent::Visible(ticket.clone()));
            }),
        )?;

        self.handle = Some(handle);
        self.state = LoadState::Observing;
        debug!(key = %self.key, "Observing container");
        Ok(())
    }

    fn on_visible(&mut self) {
        if self.state != LoadState::Observing {
            return;
        }
        self.release_handle();
        let was_cached = self.cache.has(&self.key);
        self.start_loading(was_cached);
    }

    fn start_loading(&mut self, was_cached: bool) {
        self.was_cached = was_cached;
        self.state = LoadState::Loading;
        debug!(key = %self.key, was_cached, "Loading main image");
        self.listener.on_start_load(StartLoad { was_cached });

        let ticket = self.ticket();
        let tx = self.event_tx.clone();
        self.element.begin_fetch(
            FetchRequest {
                key: self.key.clone(),
                sources: self.resource.images.clone(),
            },
            LoadSignal::new(move || {
                let _ = tx.send(LoaderEvent::LoadComplete(ticket.clone()));
            }),
        );
    }

    fn on_load_complete(&mut self) {
        if self.state != LoadState::Loading || self.decode_task.is_some() {
            trace!(key = %self.key, state = %self.state, "Ignoring repeated load signal");
            return;
        }

        let ticket = self.ticket();
        let tx = self.event_tx.clone();
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            trace!(key = %self.key, "No async runtime, skipping decode");
            let _ = tx.send(LoaderEvent::Decoded(ticket, Ok(())));
            return;
        };

        let element = self.element.clone();
        self.decode_task = Some(runtime.spawn(async move {
            let result = element.decode().await;
            let _ = tx.send(LoaderEvent::Decoded(ticket, result));
        }));
    }

    fn on_decode_task_exit(&mut self, joined: Result<(), JoinError>) {
        // A normal exit has already queued `Decoded`.
        self.drain();
        if self.decode_task.take().is_none() {
            return;
        }
        let message = match joined {
            Ok(()) => "decode task exited without reporting".to_string(),
            Err(e) => e.to_string(),
        };
        self.on_decoded(Err(DecodeError::aborted(message)));
    }

    fn on_prerendered_load(&mut self) {
        if self.state != LoadState::Loading || !self.prerendered {
            return;
        }
        self.finish_loaded();
    }

    fn on_decoded(&mut self, result: Result<(), DecodeError>) {
        if self.state != LoadState::Loading {
            return;
        }
        self.decode_task = None;

        if let Err(e) = result {
            warn!(key = %self.key, error = %e, "Decode failed, revealing anyway");
        }

        self.finish_loaded();
    }

    fn finish_loaded(&mut self) {
        self.cache.mark_loaded(self.key.clone());
        self.state = LoadState::Loaded;
        debug!(key = %self.key, "Main image loaded");

        if !self.load_notified {
            self.load_notified = true;
            self.listener.on_load();
        }
    }

    fn reset(&mut self, key: ResourceKey) {
        self.release_handle();
        self.abort_decode();
        self.epoch += 1;
        self.key = key;
        self.state = LoadState::Idle;
        self.was_cached = false;
        self.load_notified = false;
        self.prerendered = false;
    }

    fn release_handle(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            self.detector.release(&mut handle);
        }
    }

    fn abort_decode(&mut self) {
        if let Some(task) = self.decode_task.take() {
            task.abort();
        }
    }
}

enum Wake {
    Event(Option<LoaderEvent>),
    Joined(Result<(), JoinError>),
}

impl Drop for ImageLoader {
    fn drop(&mut self) {
        self.abort_decode();
    }
}
