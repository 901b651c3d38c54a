//! Virtual display controller.
//!
//! A [`VirtualDisplayController`] owns everything needed to show one embedded
//! view off-screen: the buffer texture the compositor reads, the drawing surface
//! over it, the virtual target rendering into that surface, and the
//! [`Presentation`] putting the view on the target's display.
//!
//! # Resizing
//!
//! The platform has no way to resize a virtual target in place. A resize tears
//! the target down and creates a new one on the same surface, moving the view
//! over to a new presentation:
//!
//! 1. record focus and detach the presentation state,
//! 2. unbind the surface from the old target, then release the target,
//! 3. resize the texture and create the new target on the surface,
//! 4. show a presentation built from the detached state, then cancel the old one.
//!
//! The surface must be unbound before the release, otherwise releasing the old
//! target destroys it. The old presentation is cancelled last so the view stays
//! visible through the swap.
//!
//! `resize` returns as soon as the new target is installed. The completion
//! callback runs later: after the view attaches to its new window, draws once, and
//! the configured propagation delay elapses.

use crate::config::DisplayConfig;
use crate::errors::DisplayError;
use crate::events::{DisplayEvent, ResizeOutcome, TouchEvent};
use crate::frame::{FrameReadyNotifier, FrameReadyRegistration, Scheduler};
use crate::presentation::Presentation;
use crate::render::backend::{
    BufferSize, BufferTexture, DisplayHandle, DisplayService, PhysicalBounds, TargetRequest, VirtualTarget,
};
use crate::render::size::resolve_buffer_size;
use crate::render::surface::SurfaceBinding;
use crate::view::{
    AccessibilityEventsDelegate, CreationParams, EmbeddedView, FocusListener, HostView, ViewFactory, ViewId,
};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Callback invoked once a resize is visible downstream.
pub type ResizeCallback = Box<dyn FnOnce(ResizeOutcome) + Send + 'static>;

/// Services shared by all controllers of a host.
#[derive(Clone)]
pub struct DisplayContext {
    pub display_service: Arc<dyn DisplayService>,
    pub scheduler: Arc<dyn Scheduler>,
    pub config: Arc<DisplayConfig>,
}

impl DisplayContext {
    pub fn new(display_service: Arc<dyn DisplayService>, scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            display_service,
            scheduler,
            config: Arc::new(DisplayConfig::default()),
        }
    }

    pub fn with_config(mut self, config: DisplayConfig) -> Self {
        self.config = Arc::new(config);
        self
    }
}

/// Per-view arguments for [`VirtualDisplayController::create`].
pub struct ControllerArgs {
    pub physical: PhysicalBounds,
    pub requested: BufferSize,
    pub view_id: ViewId,
    pub params: CreationParams,
    pub factory: Arc<dyn ViewFactory>,
    pub accessibility: Arc<dyn AccessibilityEventsDelegate>,
    /// Ownership moves to the controller. It is released on dispose, or right away when creation fails.
    pub texture: Box<dyn BufferTexture>,
    pub focus_listener: FocusListener,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerState {
    /// A virtual target is installed and the view is shown
    Active,
    /// A resize was issued and its completion has not been delivered yet
    Resizing,
    /// A resize lost the virtual target. Only `dispose` is meaningful from here.
    Failed(String),
    /// All resources are released
    Disposed,
}

/// Delivers a resize completion at most once.
struct CompletionSlot {
    view_id: ViewId,
    size: BufferSize,
    callback: Mutex<Option<ResizeCallback>>,
    cancel: CancellationToken,
    event_tx: broadcast::Sender<DisplayEvent>,
    /// Listener still waiting for the view to attach and draw, if any.
    registration: Mutex<Option<FrameReadyRegistration>>,
}

impl CompletionSlot {
    fn complete(&self, outcome: ResizeOutcome) -> bool {
        let callback = {
            let mut guard = self.callback.lock().unwrap_or_else(PoisonError::into_inner);
            if self.cancel.is_cancelled() {
                return false;
            }
            guard.take()
        };

        let Some(callback) = callback else {
            return false;
        };
        self.release_registration();

        log::debug!("View[{}]: resize to {} complete ({})", self.view_id, self.size, outcome);
        let _ = self.event_tx.send(DisplayEvent::FrameReady {
            view_id: self.view_id,
            size: self.size,
            outcome,
        });
        callback(outcome);
        true
    }

    fn is_done(&self) -> bool {
        self.cancel.is_cancelled() || self.callback.lock().unwrap_or_else(PoisonError::into_inner).is_none()
    }

    fn set_registration(&self, registration: FrameReadyRegistration) {
        // A slot completed or cancelled in the meantime does not keep the listener.
        if self.is_done() {
            registration.cancel();
            return;
        }
        *self.registration.lock().unwrap_or_else(PoisonError::into_inner) = Some(registration);
    }

    /// Removes the attach or draw listener from the view tree.
    fn release_registration(&self) {
        let registration = self.registration.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(registration) = registration {
            registration.cancel();
        }
    }
}

pub struct VirtualDisplayController {
    view_id: ViewId,
    config: Arc<DisplayConfig>,
    display_service: Arc<dyn DisplayService>,
    scheduler: Arc<dyn Scheduler>,
    focus_listener: FocusListener,
    density_dpi: u32,

    texture: Box<dyn BufferTexture>,
    surface: SurfaceBinding,
    target: Option<Box<dyn VirtualTarget>>,
    presentation: Presentation,
    buffer_size: BufferSize,

    state: ControllerState,
    pending: Vec<Arc<CompletionSlot>>,
    cancel: CancellationToken,
    event_tx: broadcast::Sender<DisplayEvent>,
}

impl VirtualDisplayController {
    /// Creates the virtual display and shows the embedded view on it.
    ///
    /// Fails with [`DisplayError::InvalidSize`] for a zero dimension and with
    /// [`DisplayError::TargetUnavailable`] when no buffer fits the physical display or
    /// the platform refuses the target. Nothing stays allocated on failure.
    pub fn create(context: DisplayContext, args: ControllerArgs) -> Result<Self, DisplayError> {
        let ControllerArgs {
            physical,
            requested,
            view_id,
            params,
            factory,
            accessibility,
            mut texture,
            focus_listener,
        } = args;
        let DisplayContext {
            display_service,
            scheduler,
            config,
        } = context;

        let size = match resolve_buffer_size(requested, physical) {
            Ok(size) => size,
            Err(e) => {
                log::warn!("View[{}]: no virtual display for {}: {}", view_id, requested, e);
                texture.release();
                return Err(e);
            }
        };

        texture.set_default_buffer_size(size);
        let surface = match texture.create_surface() {
            Ok(surface) => surface,
            Err(e) => {
                texture.release();
                return Err(DisplayError::TargetUnavailable(format!("cannot create drawing surface: {}", e)));
            }
        };

        let request = TargetRequest {
            name: config.target_name.clone(),
            size,
            density_dpi: physical.density_dpi,
            surface,
            flags: config.target_flags,
        };
        let mut target = match display_service.create_virtual_target(&request) {
            Ok(target) => target,
            Err(e) => {
                log::warn!("View[{}]: {} refused a {} target: {}", view_id, display_service.name(), size, e);
                texture.release();
                return Err(DisplayError::TargetUnavailable(e.to_string()));
            }
        };

        let mut binding = SurfaceBinding::new(surface);
        let mut presentation = Presentation::new(
            target.display(),
            factory,
            accessibility,
            view_id,
            params,
            focus_listener.clone(),
        );
        if let Err(e) = binding.bind(target.id()).and_then(|_| presentation.show()) {
            log::error!("View[{}]: cannot show embedded view: {}", view_id, e);
            presentation.cancel();
            target.release();
            texture.release();
            return Err(e);
        }

        let (event_tx, _) = broadcast::channel(config.event_capacity.max(1));
        let _ = event_tx.send(DisplayEvent::Created { view_id, size });
        log::info!(
            "View[{}]: virtual display {} created at {} ({} dpi)",
            view_id,
            target.display().display_id,
            size,
            physical.density_dpi
        );

        Ok(Self {
            view_id,
            config,
            display_service,
            scheduler,
            focus_listener,
            density_dpi: physical.density_dpi,
            texture,
            surface: binding,
            target: Some(target),
            presentation,
            buffer_size: size,
            state: ControllerState::Active,
            pending: Vec::new(),
            cancel: CancellationToken::new(),
            event_tx,
        })
    }

    pub fn view_id(&self) -> ViewId {
        self.view_id
    }

    /// Current state. `Resizing` while any resize completion is still outstanding.
    pub fn state(&self) -> ControllerState {
        match &self.state {
            ControllerState::Active if self.pending_resizes() > 0 => ControllerState::Resizing,
            state => state.clone(),
        }
    }

    pub fn buffer_size(&self) -> BufferSize {
        self.buffer_size
    }

    pub fn buffer_width(&self) -> u32 {
        self.buffer_size.width
    }

    pub fn buffer_height(&self) -> u32 {
        self.buffer_size.height
    }

    /// Identifier of the texture the compositor should sample.
    pub fn texture_id(&self) -> u64 {
        self.texture.id()
    }

    /// Display of the current virtual target, if one is installed.
    pub fn display(&self) -> Option<DisplayHandle> {
        self.target.as_ref().map(|t| t.display())
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<DisplayEvent> {
        self.event_tx.subscribe()
    }

    /// Number of resizes whose completion has not been delivered yet.
    pub fn pending_resizes(&self) -> usize {
        self.pending.iter().filter(|slot| !slot.is_done()).count()
    }

    /// Replaces the virtual target with one of `width` x `height` pixels.
    ///
    /// The buffer accessors report the new size as soon as this returns. The size is
    /// not clamped to the physical display. `on_complete` runs at most once, after a
    /// frame at the new size was drawn; it never runs if the controller is disposed first.
    ///
    /// Losing the virtual target halfway is unrecoverable: the controller moves to
    /// [`ControllerState::Failed`] and [`DisplayError::ResizeFailed`] is returned.
    pub fn resize(
        &mut self,
        width: u32,
        height: u32,
        on_complete: impl FnOnce(ResizeOutcome) + Send + 'static,
    ) -> Result<(), DisplayError> {
        match &self.state {
            ControllerState::Disposed => return Err(DisplayError::Disposed),
            ControllerState::Failed(reason) => return Err(DisplayError::Failed(reason.clone())),
            ControllerState::Active | ControllerState::Resizing => {}
        }

        let new_size = BufferSize::new(width, height);
        if new_size.is_empty() {
            return Err(DisplayError::InvalidSize { width, height });
        }

        self.prune_pending();
        let old_size = self.buffer_size;

        let focused = self.view().map_or(false, |v| v.is_focused());
        let Some(state) = self.presentation.detach_state() else {
            let reason = "presentation has no state to hand over".to_string();
            self.fail(reason.clone());
            return Err(DisplayError::ResizeFailed(reason));
        };
        let state = state.with_focus(focused);

        if let Some(mut old_target) = self.target.take() {
            old_target.set_surface(None);
            self.surface.unbind(old_target.id());
            old_target.release();
        }

        self.buffer_size = new_size;
        self.texture.set_default_buffer_size(new_size);

        let mut target = match self.display_service.create_virtual_target(&self.target_request(new_size)) {
            Ok(target) => target,
            Err(e) => {
                let reason = format!("cannot create a {} target: {}", new_size, e);
                if let Some(view) = state.view() {
                    view.on_withdrawn();
                }
                self.fail(reason.clone());
                return Err(DisplayError::ResizeFailed(reason));
            }
        };
        if let Err(e) = self.surface.bind(target.id()) {
            target.release();
            self.fail(e.to_string());
            return Err(DisplayError::ResizeFailed(e.to_string()));
        }

        let callback: ResizeCallback = Box::new(on_complete);
        let slot = Arc::new(CompletionSlot {
            view_id: self.view_id,
            size: new_size,
            callback: Mutex::new(Some(callback)),
            cancel: self.cancel.clone(),
            event_tx: self.event_tx.clone(),
            registration: Mutex::new(None),
        });
        match state.view() {
            Some(view) => slot.set_registration(self.schedule_frame_ready(view, slot.clone())),
            None => {
                let slot = slot.clone();
                self.scheduler.post_delayed(Duration::ZERO, Box::new(move || {
                    slot.complete(ResizeOutcome::NoContent);
                }));
            }
        }
        if let Some(timeout) = self.config.resize_timeout {
            let slot = slot.clone();
            self.scheduler.post_delayed(timeout, Box::new(move || {
                if slot.complete(ResizeOutcome::TimedOut) {
                    log::warn!("View[{}]: no frame drawn within {:?} after resize", slot.view_id, timeout);
                }
            }));
        }
        self.pending.push(slot);

        let mut presentation = Presentation::from_state(target.display(), state, self.focus_listener.clone());
        if let Err(e) = presentation.show() {
            self.target = Some(target);
            self.fail(e.to_string());
            return Err(DisplayError::ResizeFailed(e.to_string()));
        }

        // Cancel the old presentation only once the new one is visible.
        let mut old_presentation = std::mem::replace(&mut self.presentation, presentation);
        old_presentation.cancel();

        log::info!(
            "View[{}]: resized virtual display {} -> {} (display {})",
            self.view_id,
            old_size,
            new_size,
            target.display().display_id
        );
        self.target = Some(target);
        self.state = ControllerState::Active;
        let _ = self.event_tx.send(DisplayEvent::Resized {
            view_id: self.view_id,
            from: old_size,
            to: new_size,
        });
        Ok(())
    }

    /// Releases the presentation, the virtual target and the texture. Later calls are no-ops.
    pub fn dispose(&mut self) {
        if self.state == ControllerState::Disposed {
            log::debug!("View[{}]: dispose called on a disposed controller", self.view_id);
            return;
        }

        self.presentation.cancel();
        // Some platforms crash releasing a target whose presentation is still mid-detach.
        let _ = self.presentation.detach_state();

        self.cancel.cancel();
        for slot in self.pending.drain(..) {
            slot.release_registration();
        }

        if let Some(mut target) = self.target.take() {
            self.surface.unbind(target.id());
            target.release();
        }
        self.texture.release();

        self.state = ControllerState::Disposed;
        log::info!("View[{}]: virtual display disposed", self.view_id);
        let _ = self.event_tx.send(DisplayEvent::Disposed { view_id: self.view_id });
    }

    /// The embedded view, while one is shown.
    pub fn view(&self) -> Option<&Arc<dyn EmbeddedView>> {
        self.presentation.view()
    }

    pub fn dispatch_touch_event(&self, event: &TouchEvent) -> bool {
        self.presentation.dispatch_touch_event(event)
    }

    pub fn on_host_attached(&self, host: &HostView) {
        if let Some(view) = self.view() {
            view.on_host_attached(host);
        }
    }

    pub fn on_host_detached(&self) {
        if let Some(view) = self.view() {
            view.on_host_detached();
        }
    }

    pub fn on_input_connection_locked(&self) {
        if let Some(view) = self.view() {
            view.on_input_connection_locked();
        }
    }

    pub fn on_input_connection_unlocked(&self) {
        if let Some(view) = self.view() {
            view.on_input_connection_unlocked();
        }
    }

    /// Forgets delivered completions. Their listeners are gone from the view tree already.
    fn prune_pending(&mut self) {
        self.pending.retain(|slot| {
            if slot.is_done() {
                slot.release_registration();
                false
            } else {
                true
            }
        });
    }

    fn target_request(&self, size: BufferSize) -> TargetRequest {
        TargetRequest {
            name: self.config.target_name.clone(),
            size,
            density_dpi: self.density_dpi,
            surface: self.surface.surface(),
            flags: self.config.target_flags,
        }
    }

    /// Once the view re-attaches and draws, post the completion after the propagation delay.
    fn schedule_frame_ready(&self, view: &Arc<dyn EmbeddedView>, slot: Arc<CompletionSlot>) -> FrameReadyRegistration {
        let scheduler = self.scheduler.clone();
        let delay = self.config.propagation_delay;

        FrameReadyNotifier::schedule_after_next_attach(view.tree(), move || {
            scheduler.post_delayed(delay, Box::new(move || {
                slot.complete(ResizeOutcome::FrameReady);
            }));
        })
    }

    fn fail(&mut self, reason: String) {
        log::error!("View[{}]: virtual display lost: {}", self.view_id, reason);
        self.presentation.cancel();
        let _ = self.event_tx.send(DisplayEvent::Failed {
            view_id: self.view_id,
            reason: reason.clone(),
        });
        self.state = ControllerState::Failed(reason);
    }
}

impl Drop for VirtualDisplayController {
    fn drop(&mut self) {
        if self.state != ControllerState::Disposed {
            log::warn!("View[{}]: controller dropped without dispose", self.view_id);
            self.dispose();
        }
    }
}

impl std::fmt::Debug for VirtualDisplayController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualDisplayController")
            .field("view_id", &self.view_id)
            .field("state", &self.state)
            .field("buffer_size", &self.buffer_size)
            .field("presentation", &self.presentation.phase())
            .field("pending_resizes", &self.pending_resizes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::TouchAction;
    use crate::frame::TokioScheduler;
    use crate::render::backend::{SurfaceHandle, TargetId};
    use crate::render::backends::null::{NullBufferTexture, NullDisplayService, NullOp, NullRecorder};
    use crate::view::null::{NullAccessibilityDelegate, NullView, NullViewFactory, ViewCall};
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::{mpsc, oneshot};
    use tokio::time::Instant;

    struct Fixture {
        recorder: NullRecorder,
        service: Arc<NullDisplayService>,
        factory: Arc<NullViewFactory>,
        focus: Arc<Mutex<Vec<(ViewId, bool)>>>,
    }

    impl Fixture {
        fn new() -> Self {
            let recorder = NullRecorder::new();
            Self {
                service: Arc::new(NullDisplayService::new(recorder.clone())),
                recorder,
                factory: Arc::new(NullViewFactory::new()),
                focus: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn context(&self, config: DisplayConfig) -> DisplayContext {
            DisplayContext::new(self.service.clone(), Arc::new(TokioScheduler::current().unwrap())).with_config(config)
        }

        fn args(&self, width: u32, height: u32) -> ControllerArgs {
            let focus = self.focus.clone();
            ControllerArgs {
                physical: PhysicalBounds::new(1080, 1920, 420),
                requested: BufferSize::new(width, height),
                view_id: ViewId(7),
                params: CreationParams::new("webview"),
                factory: self.factory.clone(),
                accessibility: Arc::new(NullAccessibilityDelegate),
                texture: Box::new(NullBufferTexture::new(self.recorder.clone())),
                focus_listener: Arc::new(move |id: ViewId, focused: bool| focus.lock().unwrap().push((id, focused))),
            }
        }

        fn create(&self, width: u32, height: u32) -> VirtualDisplayController {
            self.create_with(DisplayConfig::default(), width, height)
        }

        fn create_with(&self, config: DisplayConfig, width: u32, height: u32) -> VirtualDisplayController {
            VirtualDisplayController::create(self.context(config), self.args(width, height)).unwrap()
        }

        fn view(&self) -> Arc<NullView> {
            self.factory.last_view().unwrap()
        }

        fn count(&self, pred: impl Fn(&NullOp) -> bool) -> usize {
            self.recorder.count(pred)
        }

        fn created_targets(&self) -> Vec<(TargetId, BufferSize, SurfaceHandle)> {
            self.recorder
                .ops()
                .into_iter()
                .filter_map(|op| match op {
                    NullOp::TargetCreated { target, size, surface, .. } => Some((target, size, surface)),
                    _ => None,
                })
                .collect()
        }
    }

    fn is_texture_released(op: &NullOp) -> bool {
        matches!(op, NullOp::TextureReleased { .. })
    }

    fn is_target_released(op: &NullOp) -> bool {
        matches!(op, NullOp::TargetReleased { .. })
    }

    #[tokio::test(start_paused = true)]
    async fn create_shows_view_on_new_target() {
        let fx = Fixture::new();
        let c = fx.create(800, 600);

        assert_eq!(c.state(), ControllerState::Active);
        assert_eq!(c.buffer_size(), BufferSize::new(800, 600));
        assert_eq!(c.view().unwrap().id(), ViewId(7));
        assert_eq!(c.display().unwrap().display_id, 1);

        let ops = fx.recorder.ops();
        assert!(matches!(
            &ops[..],
            [
                NullOp::TextureSized { .. },
                NullOp::SurfaceCreated { .. },
                NullOp::TargetCreated { density_dpi: 420, .. },
            ]
        ));
        let view = fx.view();
        assert_eq!(view.params().view_type, "webview");
        assert!(view.calls().contains(&ViewCall::Presented { display_id: 1 }));
    }

    #[tokio::test(start_paused = true)]
    async fn create_clamps_oversized_request_to_physical_display() {
        let fx = Fixture::new();
        let c = fx.create(2000, 4000);

        assert_eq!(c.buffer_size(), BufferSize::new(960, 1920));
        assert_eq!(fx.created_targets()[0].1, BufferSize::new(960, 1920));
        assert_eq!(
            fx.count(|op| matches!(op, NullOp::TargetCreated { name, .. } if name == "virtual-display")),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn create_rejects_zero_dimension() {
        let fx = Fixture::new();
        let err = VirtualDisplayController::create(fx.context(DisplayConfig::default()), fx.args(0, 500)).unwrap_err();

        assert!(matches!(err, DisplayError::InvalidSize { width: 0, height: 500 }));
        assert_eq!(fx.factory.creations(), 0);
        assert_eq!(fx.count(|op| matches!(op, NullOp::TargetCreated { .. })), 0);
        assert_eq!(fx.count(is_texture_released), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn create_fails_when_target_refused() {
        let fx = Fixture::new();
        fx.service.fail_next_create();
        let err = VirtualDisplayController::create(fx.context(DisplayConfig::default()), fx.args(800, 600)).unwrap_err();

        assert!(matches!(err, DisplayError::TargetUnavailable(_)));
        assert_eq!(fx.factory.creations(), 0);
        assert_eq!(fx.count(is_texture_released), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn create_releases_target_when_view_cannot_be_created() {
        let fx = Fixture::new();
        fx.factory.refuse_creation();
        let err = VirtualDisplayController::create(fx.context(DisplayConfig::default()), fx.args(800, 600)).unwrap_err();

        assert!(matches!(err, DisplayError::ViewCreation(_)));
        assert_eq!(fx.count(is_target_released), 1);
        assert_eq!(fx.count(is_texture_released), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn resize_updates_buffer_size_before_completion() {
        let fx = Fixture::new();
        let mut c = fx.create(800, 600);
        let done = Arc::new(AtomicBool::new(false));
        let flag = done.clone();

        c.resize(400, 300, move |_| flag.store(true, Ordering::SeqCst)).unwrap();

        assert_eq!(c.buffer_width(), 400);
        assert_eq!(c.buffer_height(), 300);
        assert_eq!(c.state(), ControllerState::Resizing);
        assert_eq!(c.pending_resizes(), 1);
        assert!(!done.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn resize_is_not_clamped() {
        let fx = Fixture::new();
        let mut c = fx.create(800, 600);

        c.resize(3000, 3000, |_| {}).unwrap();
        assert_eq!(c.buffer_size(), BufferSize::new(3000, 3000));
        assert_eq!(fx.created_targets()[1].1, BufferSize::new(3000, 3000));
    }

    #[tokio::test(start_paused = true)]
    async fn resize_detaches_surface_before_releasing_old_target() {
        let fx = Fixture::new();
        let mut c = fx.create(800, 600);
        c.resize(400, 300, |_| {}).unwrap();

        let targets = fx.created_targets();
        assert_eq!(targets.len(), 2);
        let (old, _, surface) = targets[0];
        let (new, _, new_surface) = targets[1];
        assert_eq!(surface, new_surface);

        let detached = fx
            .recorder
            .position(|op| *op == NullOp::TargetSurfaceSet { target: old, surface: None })
            .unwrap();
        let released = fx.recorder.position(|op| *op == NullOp::TargetReleased { target: old }).unwrap();
        let sized = fx
            .recorder
            .position(|op| matches!(op, NullOp::TextureSized { size, .. } if *size == BufferSize::new(400, 300)))
            .unwrap();
        let created = fx
            .recorder
            .position(|op| matches!(op, NullOp::TargetCreated { target, .. } if *target == new))
            .unwrap();

        assert!(detached < released);
        assert!(released < sized);
        assert!(sized < created);
        assert_eq!(fx.count(|op| matches!(op, NullOp::SurfaceDestroyed { .. })), 0);
        assert_eq!(fx.count(|op| matches!(op, NullOp::SurfaceCreated { .. })), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn resize_moves_same_view_to_new_display() {
        let fx = Fixture::new();
        let mut c = fx.create(800, 600);
        c.resize(400, 300, |_| {}).unwrap();

        assert_eq!(fx.factory.creations(), 1);
        let view = fx.view();
        let calls = view.calls();
        assert!(calls.contains(&ViewCall::Presented { display_id: 2 }));
        assert!(!calls.contains(&ViewCall::Withdrawn));
        assert_eq!(view.display().unwrap().display_id, 2);
        assert_eq!(c.display().unwrap().size, BufferSize::new(400, 300));
        assert_eq!(c.view().unwrap().id(), ViewId(7));
    }

    #[tokio::test(start_paused = true)]
    async fn resize_restores_focus() {
        let fx = Fixture::new();
        let mut c = fx.create(800, 600);
        let view = fx.view();
        view.set_focused(true);

        c.resize(400, 300, |_| {}).unwrap();

        let calls = view.calls();
        let presented = calls.iter().position(|c| *c == ViewCall::Presented { display_id: 2 }).unwrap();
        let focused = calls.iter().rposition(|c| *c == ViewCall::FocusRequested).unwrap();
        assert!(presented < focused);
        assert!(view.is_focused());
        assert_eq!(*fx.focus.lock().unwrap(), vec![(ViewId(7), true)]);
    }

    #[tokio::test(start_paused = true)]
    async fn resize_does_not_focus_unfocused_view() {
        let fx = Fixture::new();
        let mut c = fx.create(800, 600);
        c.resize(400, 300, |_| {}).unwrap();

        assert!(!fx.view().calls().contains(&ViewCall::FocusRequested));
        assert!(!fx.view().is_focused());
    }

    #[tokio::test(start_paused = true)]
    async fn completion_waits_for_attach_draw_and_delay() {
        let fx = Fixture::new();
        let mut c = fx.create(800, 600);
        let tree = fx.view().tree().clone();
        let (tx, mut rx) = oneshot::channel();

        c.resize(400, 300, move |outcome| {
            let _ = tx.send((outcome, Instant::now()));
        })
        .unwrap();

        // a draw before the view re-attached does not count
        tree.dispatch_draw();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(rx.try_recv().is_err());

        tree.dispatch_attached();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(rx.try_recv().is_err());

        let drawn_at = Instant::now();
        tree.dispatch_draw();
        let (outcome, completed_at) = rx.await.unwrap();

        assert_eq!(outcome, ResizeOutcome::FrameReady);
        assert!(completed_at - drawn_at >= Duration::from_millis(128));
        assert_eq!(c.pending_resizes(), 0);
        assert_eq!(c.state(), ControllerState::Active);
        assert_eq!(tree.draw_listener_count(), 0);
        assert_eq!(tree.attach_listener_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn completes_for_host_that_attached_before_resize() {
        let fx = Fixture::new();
        let mut c = fx.create(800, 600);
        let tree = fx.view().tree().clone();
        tree.dispatch_attached();
        tree.dispatch_draw();

        let (tx, rx) = oneshot::channel();
        c.resize(400, 300, move |o| {
            let _ = tx.send(o);
        })
        .unwrap();
        // moving to the new display took the view off its old window
        assert!(!tree.is_attached());

        tree.dispatch_attached();
        tree.dispatch_draw();
        assert_eq!(rx.await.unwrap(), ResizeOutcome::FrameReady);
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_resizes_each_complete_once() {
        let fx = Fixture::new();
        let mut c = fx.create(800, 600);
        let tree = fx.view().tree().clone();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let first = tx.clone();
        c.resize(400, 300, move |o| {
            let _ = first.send((400, o));
        })
        .unwrap();
        c.resize(200, 100, move |o| {
            let _ = tx.send((200, o));
        })
        .unwrap();
        assert_eq!(c.pending_resizes(), 2);

        tree.dispatch_attached();
        tree.dispatch_draw();
        tree.dispatch_draw();

        let mut seen = vec![rx.recv().await.unwrap(), rx.recv().await.unwrap()];
        seen.sort_by_key(|(w, _)| *w);
        assert_eq!(seen, vec![(200, ResizeOutcome::FrameReady), (400, ResizeOutcome::FrameReady)]);
        assert!(rx.recv().await.is_none());
        assert_eq!(c.pending_resizes(), 0);
        assert_eq!(c.buffer_size(), BufferSize::new(200, 100));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_completes_when_nothing_draws() {
        let fx = Fixture::new();
        let config = DisplayConfig::builder().resize_timeout(Duration::from_secs(1)).build().unwrap();
        let mut c = fx.create_with(config, 800, 600);
        let tree = fx.view().tree().clone();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let start = Instant::now();

        c.resize(400, 300, move |o| {
            let _ = tx.send((o, Instant::now()));
        })
        .unwrap();

        let (outcome, at) = rx.recv().await.unwrap();
        assert_eq!(outcome, ResizeOutcome::TimedOut);
        assert!(at - start >= Duration::from_secs(1));

        // a late frame does not complete the resize again
        tree.dispatch_attached();
        tree.dispatch_draw();
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_resizes_leave_no_listeners_behind() {
        let fx = Fixture::new();
        let config = DisplayConfig::builder().resize_timeout(Duration::from_secs(1)).build().unwrap();
        let mut c = fx.create_with(config, 800, 600);
        let tree = fx.view().tree().clone();

        for _ in 0..3 {
            let (tx, rx) = oneshot::channel();
            c.resize(400, 300, move |o| {
                let _ = tx.send(o);
            })
            .unwrap();
            assert_eq!(tree.attach_listener_count(), 1);

            assert_eq!(rx.await.unwrap(), ResizeOutcome::TimedOut);
            assert_eq!(tree.attach_listener_count(), 0);
            assert_eq!(c.state(), ControllerState::Active);
        }

        c.dispose();
        assert_eq!(tree.attach_listener_count(), 0);
        assert_eq!(tree.draw_listener_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn frame_ready_wins_over_later_timeout() {
        let fx = Fixture::new();
        let config = DisplayConfig::builder().resize_timeout(Duration::from_secs(1)).build().unwrap();
        let mut c = fx.create_with(config, 800, 600);
        let tree = fx.view().tree().clone();
        let (tx, mut rx) = mpsc::unbounded_channel();

        c.resize(400, 300, move |o| {
            let _ = tx.send(o);
        })
        .unwrap();
        tree.dispatch_attached();
        tree.dispatch_draw();

        assert_eq!(rx.recv().await, Some(ResizeOutcome::FrameReady));
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn resize_failure_is_fatal() {
        let fx = Fixture::new();
        let mut c = fx.create(800, 600);
        let mut events = c.subscribe_events();
        fx.service.fail_next_create();

        let err = c.resize(400, 300, |_| {}).unwrap_err();
        assert!(matches!(err, DisplayError::ResizeFailed(_)));
        assert!(matches!(c.state(), ControllerState::Failed(_)));
        assert!(c.view().is_none());
        assert!(c.display().is_none());
        assert!(fx.view().calls().contains(&ViewCall::Withdrawn));
        assert!(matches!(events.recv().await.unwrap(), DisplayEvent::Failed { .. }));

        assert!(matches!(c.resize(200, 100, |_| {}), Err(DisplayError::Failed(_))));

        c.dispose();
        assert_eq!(fx.count(is_target_released), 1);
        assert_eq!(fx.count(is_texture_released), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn resize_rejects_zero_dimension() {
        let fx = Fixture::new();
        let mut c = fx.create(800, 600);

        let err = c.resize(0, 300, |_| {}).unwrap_err();
        assert!(matches!(err, DisplayError::InvalidSize { width: 0, height: 300 }));
        assert_eq!(c.buffer_size(), BufferSize::new(800, 600));
        assert_eq!(c.state(), ControllerState::Active);
        assert_eq!(fx.count(is_target_released), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dispose_releases_everything_once() {
        let fx = Fixture::new();
        let mut c = fx.create(800, 600);

        c.dispose();
        c.dispose();

        assert_eq!(c.state(), ControllerState::Disposed);
        assert_eq!(fx.count(is_target_released), 1);
        assert_eq!(fx.count(is_texture_released), 1);
        assert!(c.view().is_none());
        let calls = fx.view().calls();
        assert_eq!(calls.iter().filter(|c| **c == ViewCall::Withdrawn).count(), 1);
        assert!(matches!(c.resize(400, 300, |_| {}), Err(DisplayError::Disposed)));
    }

    #[tokio::test(start_paused = true)]
    async fn dispose_cancels_pending_completion() {
        let fx = Fixture::new();
        let mut c = fx.create(800, 600);
        let tree = fx.view().tree().clone();
        let done = Arc::new(AtomicBool::new(false));
        let flag = done.clone();

        c.resize(400, 300, move |_| flag.store(true, Ordering::SeqCst)).unwrap();
        c.dispose();

        assert_eq!(tree.attach_listener_count(), 0);
        tree.dispatch_attached();
        tree.dispatch_draw();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(!done.load(Ordering::SeqCst));
        assert_eq!(c.pending_resizes(), 0);
        // the creation target during the resize, the resized one on dispose
        assert_eq!(fx.count(is_target_released), 2);
        assert_eq!(fx.count(is_texture_released), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dispose_after_draw_suppresses_delayed_completion() {
        let fx = Fixture::new();
        let mut c = fx.create(800, 600);
        let tree = fx.view().tree().clone();
        let done = Arc::new(AtomicBool::new(false));
        let flag = done.clone();

        c.resize(400, 300, move |_| flag.store(true, Ordering::SeqCst)).unwrap();
        tree.dispatch_attached();
        tree.dispatch_draw();
        // the completion is now waiting out the propagation delay
        c.dispose();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(!done.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn drop_disposes() {
        let fx = Fixture::new();
        {
            let _c = fx.create(800, 600);
        }
        assert_eq!(fx.count(is_target_released), 1);
        assert_eq!(fx.count(is_texture_released), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn forwards_host_and_input_calls_while_shown() {
        let fx = Fixture::new();
        let mut c = fx.create(800, 600);
        let touch = TouchEvent::single(TouchAction::Down, 10.0, 20.0, 5);

        c.on_host_attached(&HostView { id: 3 });
        c.on_input_connection_locked();
        c.on_input_connection_unlocked();
        assert!(c.dispatch_touch_event(&touch));
        c.on_host_detached();

        let forwarded: Vec<ViewCall> = fx
            .view()
            .calls()
            .into_iter()
            .filter(|c| !matches!(c, ViewCall::Presented { .. } | ViewCall::AccessibilityDelegateSet))
            .collect();
        assert_eq!(
            forwarded,
            vec![
                ViewCall::HostAttached { host: HostView { id: 3 } },
                ViewCall::InputConnectionLocked,
                ViewCall::InputConnectionUnlocked,
                ViewCall::Touch(touch.clone()),
                ViewCall::HostDetached,
            ]
        );

        c.dispose();
        let before = fx.view().calls().len();
        assert!(!c.dispatch_touch_event(&touch));
        c.on_host_attached(&HostView { id: 3 });
        c.on_input_connection_locked();
        assert_eq!(fx.view().calls().len(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn lifecycle_events_are_broadcast() {
        let fx = Fixture::new();
        let mut c = fx.create(800, 600);
        let mut events = c.subscribe_events();
        let tree = fx.view().tree().clone();

        c.resize(400, 300, |_| {}).unwrap();
        assert_eq!(
            events.recv().await.unwrap(),
            DisplayEvent::Resized {
                view_id: ViewId(7),
                from: BufferSize::new(800, 600),
                to: BufferSize::new(400, 300),
            }
        );

        tree.dispatch_attached();
        tree.dispatch_draw();
        assert_eq!(
            events.recv().await.unwrap(),
            DisplayEvent::FrameReady {
                view_id: ViewId(7),
                size: BufferSize::new(400, 300),
                outcome: ResizeOutcome::FrameReady,
            }
        );

        c.dispose();
        assert_eq!(events.recv().await.unwrap(), DisplayEvent::Disposed { view_id: ViewId(7) });
    }
}
