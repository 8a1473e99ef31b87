//! Capture engine error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Selected window is invalid, minimized, or not visible")]
    InvalidSelection,

    #[error("Owning thread of the selected window could not be resolved")]
    ThreadUnresolved,

    #[error("Backend is unavailable on this platform: {0}")]
    BackendUnavailable(String),

    #[error("Backend worker is gone")]
    WorkerGone,
}

pub type CaptureResult<T> = Result<T, CaptureError>;
