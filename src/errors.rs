#[derive(Debug, thiserror::Error)]
pub enum DisplayError {
    #[error("Invalid buffer size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    #[error("Virtual target unavailable: {0}")]
    TargetUnavailable(String),

    #[error("Resize failed: {0}")]
    ResizeFailed(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("View creation failed: {0}")]
    ViewCreation(String),

    #[error("Controller failed earlier: {0}")]
    Failed(String),

    #[error("Controller is disposed")]
    Disposed,
}
