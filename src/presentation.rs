//! Presentation of one embedded view on one virtual target.
//!
//! A [`Presentation`] attaches the embedded view to the display of a single
//! virtual target. When the target is replaced, the presentation hands its
//! [`PresentationState`] to a successor bound to the new target, so the view,
//! its focus and its accessibility wiring survive the swap.
//!
//! Lifecycle: `Created → Shown → (Detached) → Cancelled`. A detached or
//! cancelled presentation never shows again.

use crate::errors::DisplayError;
use crate::events::TouchEvent;
use crate::render::backend::DisplayHandle;
use crate::view::{AccessibilityEventsDelegate, CreationParams, EmbeddedView, FocusListener, ViewFactory, ViewId};
use std::sync::Arc;

/// State carried from one presentation to its successor. Immutable once built.
#[derive(Clone)]
pub struct PresentationState {
    view_id: ViewId,
    params: CreationParams,
    view: Option<Arc<dyn EmbeddedView>>,
    accessibility: Arc<dyn AccessibilityEventsDelegate>,
    focused: bool,
}

impl PresentationState {
    pub fn view_id(&self) -> ViewId {
        self.view_id
    }

    pub fn params(&self) -> &CreationParams {
        &self.params
    }

    pub fn view(&self) -> Option<&Arc<dyn EmbeddedView>> {
        self.view.as_ref()
    }

    pub fn accessibility(&self) -> &Arc<dyn AccessibilityEventsDelegate> {
        &self.accessibility
    }

    pub fn focused(&self) -> bool {
        self.focused
    }

    /// Same state with the focus flag replaced.
    pub fn with_focus(self, focused: bool) -> Self {
        Self { focused, ..self }
    }
}

impl std::fmt::Debug for PresentationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresentationState")
            .field("view_id", &self.view_id)
            .field("params", &self.params)
            .field("has_view", &self.view.is_some())
            .field("focused", &self.focused)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentationPhase {
    Created,
    Shown,
    Detached,
    Cancelled,
}

pub struct Presentation {
    display: DisplayHandle,
    factory: Option<Arc<dyn ViewFactory>>,
    focus_listener: FocusListener,
    state: Option<PresentationState>,
    phase: PresentationPhase,
}

impl Presentation {
    /// Presentation that creates its view through `factory` when shown.
    pub fn new(
        display: DisplayHandle,
        factory: Arc<dyn ViewFactory>,
        accessibility: Arc<dyn AccessibilityEventsDelegate>,
        view_id: ViewId,
        params: CreationParams,
        focus_listener: FocusListener,
    ) -> Self {
        Self {
            display,
            factory: Some(factory),
            focus_listener,
            state: Some(PresentationState {
                view_id,
                params,
                view: None,
                accessibility,
                focused: false,
            }),
            phase: PresentationPhase::Created,
        }
    }

    /// Successor presentation built from the state of a detached one.
    pub fn from_state(display: DisplayHandle, state: PresentationState, focus_listener: FocusListener) -> Self {
        Self {
            display,
            factory: None,
            focus_listener,
            state: Some(state),
            phase: PresentationPhase::Created,
        }
    }

    pub fn phase(&self) -> PresentationPhase {
        self.phase
    }

    pub fn display(&self) -> &DisplayHandle {
        &self.display
    }

    /// Makes the view visible on this presentation's display. Only valid once, right after creation.
    pub fn show(&mut self) -> Result<(), DisplayError> {
        if self.phase != PresentationPhase::Created {
            return Err(DisplayError::InvalidState(format!(
                "cannot show a presentation in phase {:?}",
                self.phase
            )));
        }
        let state = self
            .state
            .as_mut()
            .ok_or_else(|| DisplayError::InvalidState("presentation has no state".into()))?;

        let view = if let Some(view) = state.view.clone() {
            view
        } else {
            let view_id = state.view_id;
            let factory = self
                .factory
                .as_ref()
                .ok_or_else(|| DisplayError::ViewCreation(format!("no view factory for view {}", view_id)))?;
            let view = factory
                .create(view_id, &state.params)
                .map_err(|e| DisplayError::ViewCreation(e.to_string()))?;
            state.view = Some(view.clone());
            view
        };

        view.set_accessibility_delegate(state.accessibility.clone());
        view.on_presented(&self.display, self.focus_listener.clone());
        if state.focused {
            view.request_focus();
        }

        log::debug!(
            "View[{}]: presented on display {} ({})",
            state.view_id,
            self.display.display_id,
            self.display.size
        );
        self.phase = PresentationPhase::Shown;
        Ok(())
    }

    /// Extracts the state for a successor. The presentation becomes inert.
    pub fn detach_state(&mut self) -> Option<PresentationState> {
        match self.phase {
            PresentationPhase::Detached | PresentationPhase::Cancelled => None,
            PresentationPhase::Created | PresentationPhase::Shown => {
                self.phase = PresentationPhase::Detached;
                let state = self.state.take()?;
                let focused = state.view.as_ref().map_or(state.focused, |v| v.is_focused());
                Some(state.with_focus(focused))
            }
        }
    }

    /// Destroys the presentation. A view still owned by it is withdrawn from the display.
    pub fn cancel(&mut self) {
        if self.phase == PresentationPhase::Cancelled {
            return;
        }

        if self.phase == PresentationPhase::Shown {
            if let Some(view) = self.state.as_ref().and_then(|s| s.view.as_ref()) {
                view.on_withdrawn();
            }
        }
        self.state = None;
        self.phase = PresentationPhase::Cancelled;
    }

    /// The embedded view, while shown.
    pub fn view(&self) -> Option<&Arc<dyn EmbeddedView>> {
        if self.phase != PresentationPhase::Shown {
            return None;
        }
        self.state.as_ref().and_then(|s| s.view.as_ref())
    }

    pub fn dispatch_touch_event(&self, event: &TouchEvent) -> bool {
        match self.view() {
            Some(view) => view.dispatch_touch_event(event),
            None => false,
        }
    }
}
