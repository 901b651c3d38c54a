//! Frame-ready notification.
//!
//! There is no direct signal telling us that a frame rendered at a new buffer size
//! has reached the consumable texture. The next draw of the embedded view's tree is
//! used as a proxy: [`FrameReadyNotifier`] runs a callback on the first draw after
//! it was scheduled and then deregisters itself.
//!
//! Some platforms do not merge draw listeners registered before the view is
//! attached to its window, so registration waits for the attachment when the tree
//! is not attached yet.

use crate::view::{AttachStateListener, DrawListener, ListenerId, Retention, ViewTree};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

pub mod scheduler;

pub use scheduler::{Scheduler, Task, TokioScheduler};

/// Listener currently installed on the tree on behalf of a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Installed {
    Nothing,
    Attach(ListenerId),
    Draw(ListenerId),
}

struct Shared {
    installed: Mutex<Installed>,
    cancelled: AtomicBool,
}

impl Shared {
    fn installed(&self) -> MutexGuard<'_, Installed> {
        self.installed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Draw listener that runs its callback on the first draw only.
struct OneShotDrawListener {
    fired: AtomicBool,
    callback: Mutex<Option<Task>>,
    shared: Arc<Shared>,
}

impl DrawListener for OneShotDrawListener {
    fn on_draw(&self) -> Retention {
        if self.fired.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err() {
            return Retention::Remove;
        }
        *self.shared.installed() = Installed::Nothing;

        if self.shared.cancelled.load(Ordering::SeqCst) {
            return Retention::Remove;
        }

        let callback = self.callback.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(callback) = callback {
            callback();
        }
        Retention::Remove
    }
}

/// Attach listener that installs the draw listener on the next attach.
struct DeferredDrawRegistration {
    tree: Weak<ViewTree>,
    draw: Arc<OneShotDrawListener>,
    done: AtomicBool,
    shared: Arc<Shared>,
}

impl AttachStateListener for DeferredDrawRegistration {
    fn on_attached(&self) -> Retention {
        if self.done.swap(true, Ordering::SeqCst) || self.shared.cancelled.load(Ordering::SeqCst) {
            return Retention::Remove;
        }

        match self.tree.upgrade() {
            Some(tree) => {
                let id = tree.add_on_draw_listener(self.draw.clone());
                *self.shared.installed() = Installed::Draw(id);
            }
            None => *self.shared.installed() = Installed::Nothing,
        }
        Retention::Remove
    }
}

/// Handle to a scheduled frame-ready callback.
pub struct FrameReadyRegistration {
    tree: Weak<ViewTree>,
    shared: Arc<Shared>,
}

impl FrameReadyRegistration {
    /// True while a listener is installed and the callback has not run.
    pub fn is_pending(&self) -> bool {
        !self.shared.cancelled.load(Ordering::SeqCst) && *self.shared.installed() != Installed::Nothing
    }

    /// Deregisters whatever is still installed. The callback will not run afterwards.
    pub fn cancel(&self) {
        self.shared.cancelled.store(true, Ordering::SeqCst);

        let installed = std::mem::replace(&mut *self.shared.installed(), Installed::Nothing);
        let Some(tree) = self.tree.upgrade() else {
            return;
        };
        match installed {
            Installed::Attach(id) => {
                tree.remove_on_attach_state_listener(id);
            }
            Installed::Draw(id) => {
                tree.remove_on_draw_listener(id);
            }
            Installed::Nothing => {}
        }
    }
}

impl std::fmt::Debug for FrameReadyRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameReadyRegistration")
            .field("installed", &*self.shared.installed())
            .field("cancelled", &self.shared.cancelled.load(Ordering::SeqCst))
            .finish()
    }
}

pub struct FrameReadyNotifier;

impl FrameReadyNotifier {
    /// Runs `callback` on the first draw of `tree`.
    ///
    /// When the tree is not attached yet, the draw listener is only installed once
    /// it attaches. If the tree never draws, the callback never runs.
    pub fn schedule(tree: &Arc<ViewTree>, callback: impl FnOnce() + Send + 'static) -> FrameReadyRegistration {
        if tree.is_attached() {
            let (registration, draw) = Self::prepare(tree, Box::new(callback));
            let mut installed = registration.shared.installed();
            let id = tree.add_on_draw_listener(draw);
            *installed = Installed::Draw(id);
            drop(installed);
            registration
        } else {
            Self::schedule_after_next_attach(tree, callback)
        }
    }

    /// Runs `callback` on the first draw following the next attach of `tree`,
    /// even when the tree is attached right now.
    pub fn schedule_after_next_attach(
        tree: &Arc<ViewTree>,
        callback: impl FnOnce() + Send + 'static,
    ) -> FrameReadyRegistration {
        let (registration, draw) = Self::prepare(tree, Box::new(callback));
        let deferred = Arc::new(DeferredDrawRegistration {
            tree: Arc::downgrade(tree),
            draw,
            done: AtomicBool::new(false),
            shared: registration.shared.clone(),
        });

        // Held across registration: a concurrent attach must not record its draw
        // listener before the attach listener is recorded.
        let mut installed = registration.shared.installed();
        let id = tree.add_on_attach_state_listener(deferred);
        *installed = Installed::Attach(id);
        drop(installed);

        registration
    }

    fn prepare(tree: &Arc<ViewTree>, callback: Task) -> (FrameReadyRegistration, Arc<OneShotDrawListener>) {
        let shared = Arc::new(Shared {
            installed: Mutex::new(Installed::Nothing),
            cancelled: AtomicBool::new(false),
        });
        let draw = Arc::new(OneShotDrawListener {
            fired: AtomicBool::new(false),
            callback: Mutex::new(Some(callback)),
            shared: shared.clone(),
        });
        let registration = FrameReadyRegistration {
            tree: Arc::downgrade(tree),
            shared,
        };
        (registration, draw)
    }
}
