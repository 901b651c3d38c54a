use crate::errors::DisplayError;
use crate::render::backend::{SurfaceHandle, TargetId};

/// Ownership record for the drawing surface shared by successive virtual targets.
///
/// The surface outlives every target that renders into it. At any instant at most
/// one target owns it; a resize moves ownership from the old target to the new one
/// through an explicit `unbind` followed by a `bind`.
#[derive(Debug)]
pub struct SurfaceBinding {
    surface: SurfaceHandle,
    owner: Option<TargetId>,
}

impl SurfaceBinding {
    pub fn new(surface: SurfaceHandle) -> Self {
        Self { surface, owner: None }
    }

    pub fn surface(&self) -> SurfaceHandle {
        self.surface
    }

    pub fn owner(&self) -> Option<TargetId> {
        self.owner
    }

    /// Records `target` as the owner. Fails when another target still owns the surface.
    pub fn bind(&mut self, target: TargetId) -> Result<(), DisplayError> {
        match self.owner {
            Some(current) if current != target => Err(DisplayError::InvalidState(format!(
                "surface {:?} is still owned by target {:?}",
                self.surface, current
            ))),
            _ => {
                self.owner = Some(target);
                Ok(())
            }
        }
    }

    /// Clears ownership held by `target`. Returns false when `target` was not the owner.
    pub fn unbind(&mut self, target: TargetId) -> bool {
        if self.owner == Some(target) {
            self.owner = None;
            true
        } else {
            false
        }
    }
}
