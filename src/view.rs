//! Embedded view seams.
//!
//! The embedded view is owned by the platform. The controller only needs the
//! capabilities listed on [`EmbeddedView`]: lifecycle notifications, input
//! forwarding, focus, and access to the view's [`ViewTree`].

use crate::events::TouchEvent;
use crate::render::backend::DisplayHandle;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub mod null;
pub mod tree;

pub use tree::{AttachStateListener, DrawListener, ListenerId, Retention, ViewTree};

/// Identifier the host assigned to an embedded view.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ViewId(pub i64);

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle of the host view the embedding framework renders into.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct HostView {
    pub id: u64,
}

/// Creation parameters passed through to the view factory untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreationParams {
    pub view_type: String,
    pub args: BTreeMap<String, String>,
}

impl CreationParams {
    pub fn new<S: Into<String>>(view_type: S) -> Self {
        Self {
            view_type: view_type.into(),
            args: BTreeMap::new(),
        }
    }

    pub fn with_arg<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }
}

/// Accessibility event raised by an embedded view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessibilityEvent {
    pub kind: String,
    pub description: Option<String>,
}

/// Receives accessibility events from embedded views and forwards them to the host's bridge.
pub trait AccessibilityEventsDelegate: Send + Sync {
    /// Returns true when the event was delivered.
    fn request_send_accessibility_event(&self, view_id: ViewId, event: &AccessibilityEvent) -> bool;
}

/// Called with `(view, has_focus)` whenever the embedded view gains or loses focus.
pub type FocusListener = Arc<dyn Fn(ViewId, bool) + Send + Sync>;

/// Capabilities of the platform view hosted in a virtual display.
pub trait EmbeddedView: Send + Sync {
    fn id(&self) -> ViewId;

    /// Render tree of the view. Shared so that listeners can outlive a single presentation.
    fn tree(&self) -> &Arc<ViewTree>;

    fn is_focused(&self) -> bool;

    fn request_focus(&self) {}

    /// The view is now shown on `display`. Focus changes are reported through `focus_listener`.
    fn on_presented(&self, _display: &DisplayHandle, _focus_listener: FocusListener) {}

    /// The presentation showing the view was cancelled while the view was still part of it.
    fn on_withdrawn(&self) {}

    fn set_accessibility_delegate(&self, _delegate: Arc<dyn AccessibilityEventsDelegate>) {}

    fn on_host_attached(&self, _host: &HostView) {}

    fn on_host_detached(&self) {}

    fn on_input_connection_locked(&self) {}

    fn on_input_connection_unlocked(&self) {}

    /// Returns true when the event was consumed.
    fn dispatch_touch_event(&self, event: &TouchEvent) -> bool;
}

/// Creates embedded views on first show.
pub trait ViewFactory: Send + Sync {
    fn create(&self, view_id: ViewId, params: &CreationParams) -> anyhow::Result<Arc<dyn EmbeddedView>>;
}
