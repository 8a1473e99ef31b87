//! Captured frame data structures

use bytes::Bytes;

/// One captured frame, BGRA, as produced by whichever backend ran.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    /// Raw pixel data.
    pub data: Bytes,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Bytes per row, may include padding.
    pub stride: u32,
    /// Position of the frame's first pixel in virtual-screen coordinates.
    pub top_left: (i32, i32),
}

impl CapturedFrame {
    /// A black frame of the given size. Delivered when the selected window
    /// is minimized or momentarily off the current desktop, so the far side
    /// keeps a live (if empty) stream instead of an error.
    pub fn black(width: u32, height: u32) -> Self {
        let stride = width * 4;
        Self {
            data: Bytes::from(vec![0u8; (stride * height) as usize]),
            width,
            height,
            stride,
            top_left: (0, 0),
        }
    }
}

/// Result of one capture request.
///
/// Exactly one outcome is delivered per request, on the thread that issued
/// it. A transient outcome never carries a frame: the caller retries on its
/// own schedule rather than receiving stale or partially-decided content.
#[derive(Debug, Clone)]
pub enum CaptureOutcome {
    Frame(CapturedFrame),
    /// Retry on the next scheduled capture request.
    TransientError,
    /// The session must end.
    PermanentError,
}

impl CaptureOutcome {
    pub fn is_frame(&self) -> bool {
        matches!(self, CaptureOutcome::Frame(_))
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, CaptureOutcome::TransientError)
    }

    pub fn is_permanent(&self) -> bool {
        matches!(self, CaptureOutcome::PermanentError)
    }
}

/// Receives the outcome of each capture request.
pub trait CaptureHandler: Send + Sync {
    fn on_capture_result(&self, outcome: CaptureOutcome);
}

impl<F: Fn(CaptureOutcome) + Send + Sync> CaptureHandler for F {
    fn on_capture_result(&self, outcome: CaptureOutcome) {
        self(outcome)
    }
}
