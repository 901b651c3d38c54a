//! Render tree observer registry.
//!
//! A [`ViewTree`] is the part of an embedded view's render tree the controller
//! observes: whether the view is attached to a window, and when the tree draws.
//! The platform glue calls the `dispatch_*` methods; listeners registered here are
//! invoked in registration order.
//!
//! Listeners decide their own lifetime by returning [`Retention::Remove`], which
//! deregisters them right after the call. The registry lock is never held while a
//! listener runs, so listeners may register or remove listeners themselves.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Identifier of a registered listener, unique within one tree.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// What happens to a listener after it was invoked.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Retention {
    Keep,
    Remove,
}

pub trait DrawListener: Send + Sync {
    fn on_draw(&self) -> Retention;
}

impl<F> DrawListener for F
where
    F: Fn() -> Retention + Send + Sync,
{
    fn on_draw(&self) -> Retention {
        self()
    }
}

pub trait AttachStateListener: Send + Sync {
    fn on_attached(&self) -> Retention;

    fn on_detached(&self) -> Retention {
        Retention::Keep
    }
}

#[derive(Default)]
struct TreeInner {
    attached: bool,
    draws: u64,
    draw_listeners: Vec<(ListenerId, Arc<dyn DrawListener>)>,
    attach_listeners: Vec<(ListenerId, Arc<dyn AttachStateListener>)>,
}

#[derive(Default)]
pub struct ViewTree {
    inner: Mutex<TreeInner>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for ViewTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("ViewTree")
            .field("attached", &inner.attached)
            .field("draws", &inner.draws)
            .field("draw_listeners", &inner.draw_listeners.len())
            .field("attach_listeners", &inner.attach_listeners.len())
            .finish()
    }
}

impl ViewTree {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, TreeInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_listener_id(&self) -> ListenerId {
        ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn is_attached(&self) -> bool {
        self.lock().attached
    }

    /// Number of draws dispatched so far.
    pub fn draw_count(&self) -> u64 {
        self.lock().draws
    }

    pub fn draw_listener_count(&self) -> usize {
        self.lock().draw_listeners.len()
    }

    pub fn attach_listener_count(&self) -> usize {
        self.lock().attach_listeners.len()
    }

    pub fn add_on_draw_listener(&self, listener: Arc<dyn DrawListener>) -> ListenerId {
        let id = self.next_listener_id();
        self.lock().draw_listeners.push((id, listener));
        id
    }

    pub fn remove_on_draw_listener(&self, id: ListenerId) -> bool {
        let mut inner = self.lock();
        let before = inner.draw_listeners.len();
        inner.draw_listeners.retain(|(lid, _)| *lid != id);
        inner.draw_listeners.len() != before
    }

    pub fn add_on_attach_state_listener(&self, listener: Arc<dyn AttachStateListener>) -> ListenerId {
        let id = self.next_listener_id();
        self.lock().attach_listeners.push((id, listener));
        id
    }

    pub fn remove_on_attach_state_listener(&self, id: ListenerId) -> bool {
        let mut inner = self.lock();
        let before = inner.attach_listeners.len();
        inner.attach_listeners.retain(|(lid, _)| *lid != id);
        inner.attach_listeners.len() != before
    }

    /// The view got attached to a window. Ignored when it already is.
    pub fn dispatch_attached(&self) {
        let snapshot = {
            let mut inner = self.lock();
            if inner.attached {
                return;
            }
            inner.attached = true;
            inner.attach_listeners.clone()
        };

        let done: Vec<ListenerId> = snapshot
            .into_iter()
            .filter(|(_, listener)| listener.on_attached() == Retention::Remove)
            .map(|(id, _)| id)
            .collect();
        self.forget_attach_listeners(&done);
    }

    /// The view got detached from its window. Ignored when it is not attached.
    pub fn dispatch_detached(&self) {
        let snapshot = {
            let mut inner = self.lock();
            if !inner.attached {
                return;
            }
            inner.attached = false;
            inner.attach_listeners.clone()
        };

        let done: Vec<ListenerId> = snapshot
            .into_iter()
            .filter(|(_, listener)| listener.on_detached() == Retention::Remove)
            .map(|(id, _)| id)
            .collect();
        self.forget_attach_listeners(&done);
    }

    /// The tree is about to draw a frame.
    pub fn dispatch_draw(&self) {
        let snapshot = {
            let mut inner = self.lock();
            inner.draws += 1;
            inner.draw_listeners.clone()
        };

        let done: Vec<ListenerId> = snapshot
            .into_iter()
            .filter(|(_, listener)| listener.on_draw() == Retention::Remove)
            .map(|(id, _)| id)
            .collect();

        if !done.is_empty() {
            self.lock().draw_listeners.retain(|(id, _)| !done.contains(id));
        }
    }

    fn forget_attach_listeners(&self, done: &[ListenerId]) {
        if !done.is_empty() {
            self.lock().attach_listeners.retain(|(id, _)| !done.contains(id));
        }
    }
}
