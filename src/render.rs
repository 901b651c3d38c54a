//! Off-screen render targets and the buffer they draw into.

pub mod backend;

/// Display backends.
pub mod backends {
    /// Headless backend recording every operation
    pub mod null;
}

pub mod size;
pub mod surface;

pub use backend::{
    BufferSize, BufferTexture, DisplayHandle, DisplayService, PhysicalBounds, SurfaceHandle, TargetFlags, TargetId,
    TargetRequest, VirtualTarget,
};
pub use size::resolve_buffer_size;
pub use surface::SurfaceBinding;
