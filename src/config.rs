//! Controller configuration.
//!
//! `DisplayConfig` controls how a
//! [`VirtualDisplayController`](crate::controller::VirtualDisplayController)
//! requests virtual targets from the platform and how it reports resize
//! completion back to the caller.
//!
//! `DisplayConfig` provides sensible defaults via [`Default`] and a fluent
//! [`DisplayConfig::builder()`] for customization with validation.
//!
//! # Examples
//!
//! ## Use defaults
//! ```rust
//! use virtual_display::config::DisplayConfig;
//! use std::time::Duration;
//!
//! let cfg = DisplayConfig::default();
//! assert_eq!(cfg.target_name, "virtual-display");
//! assert_eq!(cfg.propagation_delay, Duration::from_millis(128));
//! ```
//!
//! ## Customize with the builder
//! ```rust
//! use virtual_display::config::DisplayConfig;
//! use std::time::Duration;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = DisplayConfig::builder()
//!     .target_name("my-embedded-view")
//!     .propagation_delay(Duration::from_millis(64))
//!     .resize_timeout(Duration::from_secs(2))
//!     .build()?; // returns Result<DisplayConfig, DisplayConfigError>
//! # Ok(()) }
//! ```
//!
//! # Fields (summary)
//! - `target_name`: Name handed to the display service for every virtual target.
//! - `target_flags`: Flags handed to the display service (default: none).
//! - `propagation_delay`: Wait between the first draw after a resize and the
//!   completion callback (default: 128ms).
//! - `resize_timeout`: Optional upper bound on waiting for that first draw. When
//!   it elapses the completion fires with [`ResizeOutcome::TimedOut`](crate::events::ResizeOutcome).
//! - `event_capacity`: Capacity of the [`DisplayEvent`](crate::events::DisplayEvent) broadcast channel.
//!
//! # Notes
//!
//! The propagation delay is a heuristic. Nothing observable tells us when a
//! frame drawn into the virtual target has reached the consumable texture, so
//! we wait a little after the draw before calling back.

use crate::render::backend::TargetFlags;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_TARGET_NAME: &str = "virtual-display";
pub const DEFAULT_PROPAGATION_DELAY: Duration = Duration::from_millis(128);
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct DisplayConfig {
    pub target_name: String,
    pub target_flags: TargetFlags,
    pub propagation_delay: Duration,
    pub resize_timeout: Option<Duration>,
    pub event_capacity: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            target_name: DEFAULT_TARGET_NAME.to_string(),
            target_flags: TargetFlags::empty(),
            propagation_delay: DEFAULT_PROPAGATION_DELAY,
            resize_timeout: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl DisplayConfig {
    pub fn builder() -> DisplayConfigBuilder {
        DisplayConfigBuilder::default()
    }
}

/// Builder for [`DisplayConfig`].
#[derive(Debug, Clone, Default)]
pub struct DisplayConfigBuilder {
    inner: DisplayConfig,
}

impl DisplayConfigBuilder {
    #[inline]
    fn map(mut self, f: impl FnOnce(&mut DisplayConfig)) -> Self {
        f(&mut self.inner);
        self
    }

    pub fn target_name<S: Into<String>>(self, name: S) -> Self { self.map(|c| c.target_name = name.into()) }
    pub fn target_flags(self, flags: TargetFlags) -> Self { self.map(|c| c.target_flags = flags) }
    pub fn propagation_delay(self, delay: Duration) -> Self { self.map(|c| c.propagation_delay = delay) }
    pub fn resize_timeout(self, timeout: Duration) -> Self { self.map(|c| c.resize_timeout = Some(timeout)) }
    pub fn no_resize_timeout(self) -> Self { self.map(|c| c.resize_timeout = None) }
    pub fn event_capacity(self, n: usize) -> Self { self.map(|c| c.event_capacity = n) }

    /// Apply multiple changes in one go.
    pub fn with(self, f: impl FnOnce(&mut DisplayConfig)) -> Self { self.map(f) }

    /// Validate and build the final config.
    pub fn build(self) -> Result<DisplayConfig, DisplayConfigError> {
        validate(&self.inner)?;
        Ok(self.inner)
    }
}

// ---------- Validation ----------

#[derive(Debug, Clone, PartialEq)]
pub enum DisplayConfigError {
    EmptyTargetName,
    ZeroEventCapacity,
    TimeoutBeforeDelay { timeout: Duration, delay: Duration },
}

impl fmt::Display for DisplayConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayConfigError::EmptyTargetName =>
                write!(f, "target_name must not be empty"),
            DisplayConfigError::ZeroEventCapacity =>
                write!(f, "event_capacity must be at least 1"),
            DisplayConfigError::TimeoutBeforeDelay { timeout, delay } =>
                write!(f, "resize_timeout ({timeout:?}) is shorter than propagation_delay ({delay:?})"),
        }
    }
}
impl std::error::Error for DisplayConfigError {}

fn validate(c: &DisplayConfig) -> Result<(), DisplayConfigError> {
    if c.target_name.trim().is_empty() {
        return Err(DisplayConfigError::EmptyTargetName);
    }
    if c.event_capacity == 0 {
        return Err(DisplayConfigError::ZeroEventCapacity);
    }
    if let Some(timeout) = c.resize_timeout {
        if timeout < c.propagation_delay {
            return Err(DisplayConfigError::TimeoutBeforeDelay {
                timeout,
                delay: c.propagation_delay,
            });
        }
    }
    Ok(())
}
