//! Intersection observation over a scrollable viewport.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::domain::errors::LoaderError;
use crate::domain::ports::{ElementRef, VisibilityCallback, VisibilityDetector, VisibilityHandle};

/// Settings for the viewport observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewportConfig {
    /// Distance in pixels around the viewport that still counts as visible.
    pub root_margin: u32,
    /// Keep notifying each time a target re-enters the viewport.
    pub repeat_notifications: bool,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            root_margin: 200,
            repeat_notifications: false,
        }
    }
}

/// Vertical extent of a registered element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    /// Offset of the top edge from the document start.
    pub top: i64,
    /// Height in pixels.
    pub height: u32,
}

impl Bounds {
    /// Creates bounds from a top offset and height.
    #[must_use]
    pub const fn new(top: i64, height: u32) -> Self {
        Self { top, height }
    }

    fn bottom(self) -> i64 {
        self.top + i64::from(self.height)
    }
}

struct Subscription {
    target: ElementRef,
    callback: VisibilityCallback,
    visible: bool,
}

struct ViewportState {
    offset: i64,
    height: u32,
    config: ViewportConfig,
    elements: HashMap<ElementRef, Bounds>,
    subscriptions: BTreeMap<u64, Subscription>,
    next_element: u64,
    next_subscription: u64,
}

impl ViewportState {
    fn intersects(&self, bounds: Bounds) -> bool {
        let margin = i64::from(self.config.root_margin);
        let start = self.offset - margin;
        let end = self.offset + i64::from(self.height) + margin;
        bounds.top <= end && bounds.bottom() >= start
    }

    /// Collects callbacks of subscriptions that just became visible.
    fn take_due(&mut self) -> Vec<VisibilityCallback> {
        let mut due = Vec::new();
        let mut finished = Vec::new();

        let visibility: Vec<(u64, bool)> = self
            .subscriptions
            .iter()
            .map(|(id, sub)| {
                let now = self
                    .elements
                    .get(&sub.target)
                    .is_some_and(|bounds| self.intersects(*bounds));
                (*id, now)
            })
            .collect();

        for (id, now) in visibility {
            let Some(sub) = self.subscriptions.get_mut(&id) else {
                continue;
            };
            if now && !sub.visible {
                trace!(subscription = id, target = %sub.target, "Target entered viewport");
                due.push(sub.callback.clone());
                if !self.config.repeat_notifications {
                    finished.push(id);
                }
            }
            sub.visible = now;
        }

        for id in finished {
            self.subscriptions.remove(&id);
        }

        due
    }
}

/// Viewport intersection observer driven by host scroll and resize events.
///
/// Notifications are queued: `subscribe` never invokes a callback, the next
/// `flush`, `scroll_to` or `resize` does.
#[derive(Clone)]
pub struct ViewportDetector {
    state: Arc<Mutex<ViewportState>>,
}

impl ViewportDetector {
    /// Creates a detector for a viewport of `height` pixels at offset 0.
    #[must_use]
    pub fn new(height: u32, config: ViewportConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(ViewportState {
                offset: 0,
                height,
                config,
                elements: HashMap::new(),
                subscriptions: BTreeMap::new(),
                next_element: 1,
                next_subscription: 1,
            })),
        }
    }

    /// Registers a mounted element and returns its reference.
    pub fn register(&self, bounds: Bounds) -> ElementRef {
        let mut state = self.state.lock();
        let element = ElementRef(state.next_element);
        state.next_element += 1;
        state.elements.insert(element, bounds);
        element
    }

    /// Moves a registered element.
    pub fn set_bounds(&self, element: ElementRef, bounds: Bounds) {
        let mut state = self.state.lock();
        if let Some(existing) = state.elements.get_mut(&element) {
            *existing = bounds;
        }
    }

    /// Forgets an unmounted element. Its subscriptions never fire.
    pub fn unregister(&self, element: ElementRef) {
        self.state.lock().elements.remove(&element);
    }

    /// Scrolls the viewport and delivers due notifications.
    pub fn scroll_to(&self, offset: i64) -> usize {
        self.state.lock().offset = offset;
        self.flush()
    }

    /// Resizes the viewport and delivers due notifications.
    pub fn resize(&self, height: u32) -> usize {
        self.state.lock().height = height;
        self.flush()
    }

    /// Delivers notifications for targets that became visible since the last
    /// flush. Returns the number of callbacks invoked.
    pub fn flush(&self) -> usize {
        let due = self.state.lock().take_due();
        // Callbacks run without the lock so they may call back into the detector.
        for callback in &due {
            callback();
        }
        if !due.is_empty() {
            debug!(count = due.len(), "Delivered visibility notifications");
        }
        due.len()
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn live_subscriptions(&self) -> usize {
        self.state.lock().subscriptions.len()
    }

    /// Current scroll offset.
    #[must_use]
    pub fn offset(&self) -> i64 {
        self.state.lock().offset
    }

    fn unsubscribe(state: &Weak<Mutex<ViewportState>>, id: u64) {
        if let Some(state) = state.upgrade() {
            if state.lock().subscriptions.remove(&id).is_some() {
                trace!(subscription = id, "Visibility subscription released");
            }
        }
    }
}

impl std::fmt::Debug for ViewportDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ViewportDetector")
            .field("offset", &state.offset)
            .field("height", &state.height)
            .field("config", &state.config)
            .field("elements", &state.elements.len())
            .field("subscriptions", &state.subscriptions.len())
            .finish()
    }
}

impl VisibilityDetector for ViewportDetector {
    fn subscribe(
        &self,
        target: Option<&ElementRef>,
        on_visible: VisibilityCallback,
    ) -> Result<VisibilityHandle, LoaderError> {
        let target = target.ok_or_else(|| LoaderError::invalid_target("no element to observe"))?;

        let mut state = self.state.lock();
        if !state.elements.contains_key(target) {
            return Err(LoaderError::invalid_target(format!(
                "element {target} is not mounted"
            )));
        }

        let id = state.next_subscription;
        state.next_subscription += 1;
        state.subscriptions.insert(
            id,
            Subscription {
                target: *target,
                callback: on_visible,
                visible: false,
            },
        );
        trace!(subscription = id, target = %target, "Observing element");

        let weak = Arc::downgrade(&self.state);
        Ok(VisibilityHandle::new(id, move || {
            Self::unsubscribe(&weak, id);
        }))
    }
}
