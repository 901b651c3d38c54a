//! Input and lifecycle event types.
//!
//! This module defines the touch input forwarded to embedded views and the
//! lifecycle events a [`VirtualDisplayController`](crate::controller::VirtualDisplayController)
//! broadcasts to its subscribers.
//!
//! # Main Types
//!
//! - [`TouchAction`]: Phase of a touch gesture.
//! - [`TouchEvent`]: A touch event forwarded verbatim to the embedded view.
//! - [`ResizeOutcome`]: How a resize completion was reached.
//! - [`DisplayEvent`]: Lifecycle events emitted by the controller.

use crate::render::backend::BufferSize;
use crate::view::ViewId;
use std::fmt::{Debug, Display};

/// Phase of a touch gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchAction {
    /// First pointer went down
    Down,
    /// One or more pointers moved
    Move,
    /// Last pointer went up
    Up,
    /// The gesture was aborted
    Cancel,
    /// An additional pointer went down
    PointerDown,
    /// A non-last pointer went up
    PointerUp,
}

impl Display for TouchAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TouchAction::Down => write!(f, "Down"),
            TouchAction::Move => write!(f, "Move"),
            TouchAction::Up => write!(f, "Up"),
            TouchAction::Cancel => write!(f, "Cancel"),
            TouchAction::PointerDown => write!(f, "PointerDown"),
            TouchAction::PointerUp => write!(f, "PointerUp"),
        }
    }
}

/// A single pointer of a touch event, in buffer pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchPointer {
    pub id: i32,
    pub x: f32,
    pub y: f32,
    pub pressure: f32,
}

/// Touch event forwarded to the embedded view.
#[derive(Debug, Clone, PartialEq)]
pub struct TouchEvent {
    pub action: TouchAction,
    pub pointers: Vec<TouchPointer>,
    /// Event time in milliseconds, in the host's clock
    pub timestamp_ms: u64,
}

impl TouchEvent {
    /// Single-pointer event at full pressure.
    pub fn single(action: TouchAction, x: f32, y: f32, timestamp_ms: u64) -> Self {
        Self {
            action,
            pointers: vec![TouchPointer { id: 0, x, y, pressure: 1.0 }],
            timestamp_ms,
        }
    }
}

/// How the completion of a resize was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeOutcome {
    /// A draw was observed after the new target was installed and the propagation delay elapsed
    FrameReady,
    /// The configured resize timeout elapsed before a draw was observed
    TimedOut,
    /// There was no embedded view to observe
    NoContent,
}

impl Display for ResizeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResizeOutcome::FrameReady => write!(f, "frame ready"),
            ResizeOutcome::TimedOut => write!(f, "timed out"),
            ResizeOutcome::NoContent => write!(f, "no content"),
        }
    }
}

/// Events emitted by a controller.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayEvent {
    // Lifecycle
    /// Controller created with the given (resolved) buffer size
    Created { view_id: ViewId, size: BufferSize },
    /// The synchronous part of a resize finished
    Resized { view_id: ViewId, from: BufferSize, to: BufferSize },
    /// The resize completion was delivered
    FrameReady { view_id: ViewId, size: BufferSize, outcome: ResizeOutcome },
    /// The controller lost its virtual target and cannot recover
    Failed { view_id: ViewId, reason: String },
    /// The controller released all its resources
    Disposed { view_id: ViewId },
}
