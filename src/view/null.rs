//! Null embedded view.
//!
//! A view that draws nothing but records everything the controller tells it.
//! Hosts without real content (and the tests) drive its [`ViewTree`] directly.
//!
//! Moving the view to another display, or withdrawing it, detaches its tree from
//! the old window. Attaching to the new window is up to the host: call
//! [`ViewTree::dispatch_attached`] and then [`ViewTree::dispatch_draw`] once the view
//! is on screen again. A resize completes only after that attach and draw.

use crate::events::TouchEvent;
use crate::render::backend::DisplayHandle;
use crate::view::{
    AccessibilityEventsDelegate, CreationParams, EmbeddedView, FocusListener, HostView, ViewFactory, ViewId,
    ViewTree,
};
use anyhow::anyhow;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A notification received by a [`NullView`].
#[derive(Debug, Clone, PartialEq)]
pub enum ViewCall {
    Presented { display_id: u32 },
    Withdrawn,
    FocusRequested,
    AccessibilityDelegateSet,
    HostAttached { host: HostView },
    HostDetached,
    InputConnectionLocked,
    InputConnectionUnlocked,
    Touch(TouchEvent),
}

#[derive(Default)]
struct NullViewState {
    calls: Vec<ViewCall>,
    focus_listener: Option<FocusListener>,
    display: Option<DisplayHandle>,
}

pub struct NullView {
    id: ViewId,
    params: CreationParams,
    tree: Arc<ViewTree>,
    focused: AtomicBool,
    state: Mutex<NullViewState>,
}

impl NullView {
    pub fn new(id: ViewId, params: CreationParams) -> Self {
        Self {
            id,
            params,
            tree: Arc::new(ViewTree::new()),
            focused: AtomicBool::new(false),
            state: Mutex::new(NullViewState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, NullViewState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn params(&self) -> &CreationParams {
        &self.params
    }

    pub fn calls(&self) -> Vec<ViewCall> {
        self.lock().calls.clone()
    }

    /// Display the view was last presented on.
    pub fn display(&self) -> Option<DisplayHandle> {
        self.lock().display.clone()
    }

    /// Changes focus the way user input would, reporting it to the focus listener.
    pub fn set_focused(&self, focused: bool) {
        let previous = self.focused.swap(focused, Ordering::SeqCst);
        if previous == focused {
            return;
        }

        let listener = self.lock().focus_listener.clone();
        if let Some(listener) = listener {
            listener(self.id, focused);
        }
    }

    fn record(&self, call: ViewCall) {
        self.lock().calls.push(call);
    }
}

impl EmbeddedView for NullView {
    fn id(&self) -> ViewId {
        self.id
    }

    fn tree(&self) -> &Arc<ViewTree> {
        &self.tree
    }

    fn is_focused(&self) -> bool {
        self.focused.load(Ordering::SeqCst)
    }

    fn request_focus(&self) {
        self.record(ViewCall::FocusRequested);
        self.set_focused(true);
    }

    fn on_presented(&self, display: &DisplayHandle, focus_listener: FocusListener) {
        let previous = {
            let mut state = self.lock();
            state.calls.push(ViewCall::Presented { display_id: display.display_id });
            state.focus_listener = Some(focus_listener);
            state.display.replace(display.clone())
        };

        if previous.is_some_and(|p| p.display_id != display.display_id) {
            self.tree.dispatch_detached();
        }
    }

    fn on_withdrawn(&self) {
        {
            let mut state = self.lock();
            state.calls.push(ViewCall::Withdrawn);
            state.display = None;
        }
        self.tree.dispatch_detached();
    }

    fn set_accessibility_delegate(&self, _delegate: Arc<dyn AccessibilityEventsDelegate>) {
        self.record(ViewCall::AccessibilityDelegateSet);
    }

    fn on_host_attached(&self, host: &HostView) {
        self.record(ViewCall::HostAttached { host: *host });
    }

    fn on_host_detached(&self) {
        self.record(ViewCall::HostDetached);
    }

    fn on_input_connection_locked(&self) {
        self.record(ViewCall::InputConnectionLocked);
    }

    fn on_input_connection_unlocked(&self) {
        self.record(ViewCall::InputConnectionUnlocked);
    }

    fn dispatch_touch_event(&self, event: &TouchEvent) -> bool {
        self.record(ViewCall::Touch(event.clone()));
        true
    }
}

/// Factory producing [`NullView`]s. Keeps the created views so the host can drive them.
#[derive(Default)]
pub struct NullViewFactory {
    created: Mutex<Vec<Arc<NullView>>>,
    refuse: AtomicBool,
    creations: AtomicUsize,
}

impl NullViewFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following `create` call fail.
    pub fn refuse_creation(&self) {
        self.refuse.store(true, Ordering::SeqCst);
    }

    pub fn creations(&self) -> usize {
        self.creations.load(Ordering::SeqCst)
    }

    /// Most recently created view.
    pub fn last_view(&self) -> Option<Arc<NullView>> {
        self.created.lock().unwrap_or_else(PoisonError::into_inner).last().cloned()
    }
}

impl ViewFactory for NullViewFactory {
    fn create(&self, view_id: ViewId, params: &CreationParams) -> anyhow::Result<Arc<dyn EmbeddedView>> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(anyhow!("NullViewFactory refused to create view {}", view_id));
        }

        let view = Arc::new(NullView::new(view_id, params.clone()));
        self.creations.fetch_add(1, Ordering::SeqCst);
        self.created.lock().unwrap_or_else(PoisonError::into_inner).push(view.clone());
        Ok(view)
    }
}

/// Accessibility delegate that accepts and drops every event.
#[derive(Debug, Default)]
pub struct NullAccessibilityDelegate;

impl AccessibilityEventsDelegate for NullAccessibilityDelegate {
    fn request_send_accessibility_event(&self, _view_id: ViewId, _event: &crate::view::AccessibilityEvent) -> bool {
        true
    }
}
