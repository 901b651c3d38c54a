//! Buffer size resolution.
//!
//! The buffer behind a virtual target may never be larger than the physical
//! display. [`resolve_buffer_size`] returns the requested size when it fits and
//! otherwise the largest size with the same aspect ratio that does.
//!
//! ```
//! use virtual_display::render::{resolve_buffer_size, BufferSize, PhysicalBounds};
//!
//! let physical = PhysicalBounds::new(1080, 1920, 420);
//! let resolved = resolve_buffer_size(BufferSize::new(2000, 4000), physical).unwrap();
//! assert_eq!(resolved, BufferSize::new(960, 1920));
//! ```

use crate::errors::DisplayError;
use crate::render::backend::{BufferSize, PhysicalBounds};

/// Computes the buffer size actually allocated for a `requested` size on a display with `physical` bounds.
///
/// Returns [`DisplayError::InvalidSize`] for a zero dimension and
/// [`DisplayError::TargetUnavailable`] when no scaled size fits.
pub fn resolve_buffer_size(requested: BufferSize, physical: PhysicalBounds) -> Result<BufferSize, DisplayError> {
    if requested.is_empty() {
        return Err(DisplayError::InvalidSize {
            width: requested.width,
            height: requested.height,
        });
    }

    if requested.fits_within(&physical) {
        return Ok(requested);
    }

    let aspect = requested.aspect_ratio();

    // Fit by height first, then by width.
    let candidate_width = (physical.height as f64 * aspect) as u32;
    let resolved = if candidate_width <= physical.width {
        BufferSize::new(candidate_width, physical.height)
    } else {
        let candidate_height = (physical.width as f64 / aspect) as u32;
        if candidate_height > physical.height {
            return Err(DisplayError::TargetUnavailable(format!(
                "no size with the aspect ratio of {} fits in {}x{}",
                requested, physical.width, physical.height
            )));
        }
        BufferSize::new(physical.width, candidate_height)
    };

    if resolved.is_empty() {
        return Err(DisplayError::TargetUnavailable(format!(
            "{} scales down to an empty buffer on a {}x{} display",
            requested, physical.width, physical.height
        )));
    }

    log::warn!(
        "Resizing virtual display of size [{}, {}] to size [{}, {}] since it's larger than the device display size [{}, {}]",
        requested.width,
        requested.height,
        resolved.width,
        resolved.height,
        physical.width,
        physical.height
    );

    Ok(resolved)
}
