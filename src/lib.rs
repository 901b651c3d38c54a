//! Virtual display hosting for embedded platform views.
//!
//! An embedded view rendered off-screen into a virtual display whose output lands
//! in a buffer texture the host composites. The crate manages that display for the
//! lifetime of the view:
//!
//! - [`VirtualDisplayController`] creates the display and shows the view on it,
//!   resizes it by swapping in a new virtual target while keeping the same view,
//!   and releases everything on dispose.
//! - [`frame::FrameReadyNotifier`] tells when a frame at the new size was drawn.
//! - [`render`] defines the platform seams (display service, virtual target, buffer
//!   texture) together with a null backend.
//! - [`view`] defines the embedded view seam, its render tree, and a null view.
//!
//! ```no_run
//! use std::sync::Arc;
//! use virtual_display::frame::TokioScheduler;
//! use virtual_display::render::backends::null::{NullBufferTexture, NullDisplayService, NullRecorder};
//! use virtual_display::render::{BufferSize, PhysicalBounds};
//! use virtual_display::view::null::{NullAccessibilityDelegate, NullViewFactory};
//! use virtual_display::view::{CreationParams, ViewId};
//! use virtual_display::{ControllerArgs, DisplayContext, VirtualDisplayController};
//!
//! # async fn run() -> Result<(), virtual_display::DisplayError> {
//! let recorder = NullRecorder::new();
//! let context = DisplayContext::new(
//!     Arc::new(NullDisplayService::new(recorder.clone())),
//!     Arc::new(TokioScheduler::current()?),
//! );
//! let mut controller = VirtualDisplayController::create(context, ControllerArgs {
//!     physical: PhysicalBounds::new(1080, 1920, 420),
//!     requested: BufferSize::new(800, 600),
//!     view_id: ViewId(1),
//!     params: CreationParams::new("webview"),
//!     factory: Arc::new(NullViewFactory::new()),
//!     accessibility: Arc::new(NullAccessibilityDelegate),
//!     texture: Box::new(NullBufferTexture::new(recorder)),
//!     focus_listener: Arc::new(|_: ViewId, _: bool| {}),
//! })?;
//!
//! controller.resize(400, 300, |outcome| log::info!("resize done: {}", outcome))?;
//! controller.dispose();
//! # Ok(()) }
//! ```

pub mod config;
pub mod controller;
pub mod errors;
pub mod events;
pub mod frame;
pub mod presentation;
pub mod render;
pub mod view;

pub use config::DisplayConfig;
pub use controller::{ControllerArgs, ControllerState, DisplayContext, VirtualDisplayController};
pub use errors::DisplayError;
pub use events::{DisplayEvent, ResizeOutcome};
