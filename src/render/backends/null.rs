//! Null display backend.
//!
//! Collaborators that do not display anything. Every call is appended to a shared
//! [`NullRecorder`], which makes the backend useful for headless hosts and for
//! checking the ordering of operations the controller performs.

use crate::render::backend::{
    BufferSize, BufferTexture, DisplayHandle, DisplayService, SurfaceHandle, TargetId, TargetRequest,
    VirtualTarget,
};
use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

/// A single operation observed by the null backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NullOp {
    TextureSized { texture: u64, size: BufferSize },
    SurfaceCreated { texture: u64, surface: SurfaceHandle },
    TextureReleased { texture: u64 },
    TargetCreated { target: TargetId, name: String, size: BufferSize, density_dpi: u32, surface: SurfaceHandle },
    TargetCreateRefused { size: BufferSize },
    TargetSurfaceSet { target: TargetId, surface: Option<SurfaceHandle> },
    TargetReleased { target: TargetId },
    /// A target was released while still bound to a surface, which destroys the surface.
    SurfaceDestroyed { surface: SurfaceHandle },
}

/// Shared, append-only log of [`NullOp`]s.
#[derive(Clone, Default, Debug)]
pub struct NullRecorder {
    ops: Arc<Mutex<Vec<NullOp>>>,
}

impl NullRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, op: NullOp) {
        log::trace!("null backend: {:?}", op);
        self.ops.lock().unwrap_or_else(PoisonError::into_inner).push(op);
    }

    /// Snapshot of all operations recorded so far.
    pub fn ops(&self) -> Vec<NullOp> {
        self.ops.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Number of recorded operations matching `pred`.
    pub fn count(&self, pred: impl Fn(&NullOp) -> bool) -> usize {
        self.ops.lock().unwrap_or_else(PoisonError::into_inner).iter().filter(|op| pred(op)).count()
    }

    /// Index of the first recorded operation matching `pred`.
    pub fn position(&self, pred: impl Fn(&NullOp) -> bool) -> Option<usize> {
        self.ops.lock().unwrap_or_else(PoisonError::into_inner).iter().position(|op| pred(op))
    }
}

/// Display service that hands out [`NullVirtualTarget`]s.
pub struct NullDisplayService {
    recorder: NullRecorder,
    next_display_id: AtomicU32,
    fail_next: AtomicBool,
}

impl NullDisplayService {
    pub fn new(recorder: NullRecorder) -> Self {
        Self {
            recorder,
            next_display_id: AtomicU32::new(1),
            fail_next: AtomicBool::new(false),
        }
    }

    /// Makes the next `create_virtual_target` call fail.
    pub fn fail_next_create(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn recorder(&self) -> &NullRecorder {
        &self.recorder
    }
}

impl DisplayService for NullDisplayService {
    fn name(&self) -> &str {
        "NullDisplayService"
    }

    fn create_virtual_target(&self, request: &TargetRequest) -> Result<Box<dyn VirtualTarget>> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            self.recorder.push(NullOp::TargetCreateRefused { size: request.size });
            return Err(anyhow!("NullDisplayService refused to create a {} target", request.size));
        }

        let target = NullVirtualTarget {
            id: TargetId::new(),
            display: DisplayHandle {
                display_id: self.next_display_id.fetch_add(1, Ordering::SeqCst),
                size: request.size,
                density_dpi: request.density_dpi,
            },
            surface: Some(request.surface),
            released: false,
            recorder: self.recorder.clone(),
        };

        self.recorder.push(NullOp::TargetCreated {
            target: target.id,
            name: request.name.clone(),
            size: request.size,
            density_dpi: request.density_dpi,
            surface: request.surface,
        });

        Ok(Box::new(target))
    }
}

pub struct NullVirtualTarget {
    id: TargetId,
    display: DisplayHandle,
    surface: Option<SurfaceHandle>,
    released: bool,
    recorder: NullRecorder,
}

impl VirtualTarget for NullVirtualTarget {
    fn id(&self) -> TargetId {
        self.id
    }

    fn display(&self) -> DisplayHandle {
        self.display.clone()
    }

    fn size(&self) -> BufferSize {
        self.display.size
    }

    fn set_surface(&mut self, surface: Option<SurfaceHandle>) {
        self.surface = surface;
        self.recorder.push(NullOp::TargetSurfaceSet { target: self.id, surface });
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        if let Some(surface) = self.surface.take() {
            self.recorder.push(NullOp::SurfaceDestroyed { surface });
        }
        self.recorder.push(NullOp::TargetReleased { target: self.id });
    }
}

/// Buffer texture without any pixel storage.
pub struct NullBufferTexture {
    id: u64,
    size: BufferSize,
    next_surface: u64,
    released: bool,
    recorder: NullRecorder,
}

impl NullBufferTexture {
    pub fn new(recorder: NullRecorder) -> Self {
        Self {
            id: NEXT_TEXTURE_ID.fetch_add(1, Ordering::SeqCst),
            size: BufferSize::default(),
            next_surface: 1,
            released: false,
            recorder,
        }
    }

    pub fn size(&self) -> BufferSize {
        self.size
    }
}

impl BufferTexture for NullBufferTexture {
    fn id(&self) -> u64 {
        self.id
    }

    fn set_default_buffer_size(&mut self, size: BufferSize) {
        self.size = size;
        self.recorder.push(NullOp::TextureSized { texture: self.id, size });
    }

    fn create_surface(&mut self) -> Result<SurfaceHandle> {
        if self.released {
            return Err(anyhow!("texture {} has been released", self.id));
        }

        let surface = SurfaceHandle((self.id << 32) | self.next_surface);
        self.next_surface += 1;
        self.recorder.push(NullOp::SurfaceCreated { texture: self.id, surface });
        Ok(surface)
    }

    fn release(&mut self) {
        self.released = true;
        self.recorder.push(NullOp::TextureReleased { texture: self.id });
    }
}
