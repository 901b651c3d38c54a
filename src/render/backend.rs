use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Size of the consumable buffer in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BufferSize {
    pub width: u32,
    pub height: u32,
}

impl BufferSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns true when either dimension is zero. Such a buffer cannot be rendered into.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Returns the aspect ratio (`width / height`), or `0.0` when the height is `0`.
    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            0.0
        } else {
            self.width as f64 / self.height as f64
        }
    }

    /// Returns true when this size fits inside the given physical bounds.
    pub fn fits_within(&self, bounds: &PhysicalBounds) -> bool {
        self.width <= bounds.width && self.height <= bounds.height
    }
}

impl fmt::Display for BufferSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Metrics of the real display. Queried by the caller at creation time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalBounds {
    pub width: u32,
    pub height: u32,
    pub density_dpi: u32,
}

impl PhysicalBounds {
    pub fn new(width: u32, height: u32, density_dpi: u32) -> Self {
        Self { width, height, density_dpi }
    }
}

/// Opaque identity of a virtual target instance.
///
/// Treat it as an opaque handle; the [`Uuid`] inside is an implementation detail.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetId(Uuid);

impl TargetId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TargetId {
    fn default() -> Self {
        Self::new()
    }
}

/// Opaque handle to the native drawing surface created over a buffer texture.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SurfaceHandle(pub u64);

/// The display context exposed by a virtual target. Presentations are bound to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayHandle {
    pub display_id: u32,
    pub size: BufferSize,
    pub density_dpi: u32,
}

bitflags! {
    /// Flags passed to the display service when creating a virtual target.
    pub struct TargetFlags: u32 {
        const PUBLIC           = 0b00001;
        const PRESENTATION     = 0b00010;
        const SECURE           = 0b00100;
        const OWN_CONTENT_ONLY = 0b01000;
        const AUTO_MIRROR      = 0b10000;
    }
}

/// Everything the display service needs to create one virtual target.
#[derive(Debug, Clone)]
pub struct TargetRequest {
    pub name: String,
    pub size: BufferSize,
    pub density_dpi: u32,
    pub surface: SurfaceHandle,
    pub flags: TargetFlags,
}

/// Platform service that creates off-screen render targets. Calls occur on the UI thread.
pub trait DisplayService: Send + Sync {
    fn name(&self) -> &str;

    /// Create a new virtual target rendering into `request.surface`.
    fn create_virtual_target(&self, request: &TargetRequest) -> anyhow::Result<Box<dyn VirtualTarget>>;
}

/// An off-screen render target. Exclusively owned by one controller.
pub trait VirtualTarget: Send {
    fn id(&self) -> TargetId;

    /// Display context presentations attach to.
    fn display(&self) -> DisplayHandle;

    fn size(&self) -> BufferSize;

    /// Rebind (or with `None`, unbind) the drawing surface this target renders into.
    fn set_surface(&mut self, surface: Option<SurfaceHandle>);

    /// Release the target. Releasing a target that still holds a surface may destroy that surface.
    fn release(&mut self);
}

/// Shared, externally allocated buffer read asynchronously by the compositor.
pub trait BufferTexture: Send {
    fn id(&self) -> u64;

    /// Set the backing size of the buffers produced into this texture.
    fn set_default_buffer_size(&mut self, size: BufferSize);

    /// Create the native drawing surface over this texture.
    fn create_surface(&mut self) -> anyhow::Result<SurfaceHandle>;

    /// Return the texture to its allocator.
    fn release(&mut self);
}
