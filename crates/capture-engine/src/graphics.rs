//! Asynchronous per-window graphics-capture glue
//!
//! The platform's graphics-capture session delivers frames on its own
//! callback thread; the synchronous capture call here hands back whatever
//! the most recent notification produced. This path is chosen only for
//! recognized window classes and bypasses the occlusion logic entirely.

use std::sync::Arc;

use bytes::BytesMut;
use parking_lot::Mutex;
use tracing::debug;

use window_system::{WindowId, WindowSystemQueries};

use crate::{CaptureOutcome, CaptureResult, CapturedFrame};

/// Window classes captured through the graphics-capture path. These host
/// compositor-rendered content that the plain block-copy backends cannot
/// read back.
pub const GRAPHICS_CAPTURE_CLASSES: &[&str] =
    &["ApplicationFrameWindow", "Windows.UI.Core.CoreWindow"];

/// True when the selected window should take the graphics-capture path.
pub fn wants_graphics_capture(queries: &dyn WindowSystemQueries, id: WindowId) -> bool {
    match queries.class_name(id) {
        Some(class) => GRAPHICS_CAPTURE_CLASSES.contains(&class.as_str()),
        None => false,
    }
}

/// The platform capture session. Implemented outside this crate; `start`
/// begins asynchronous frame delivery through the supplied notifier and
/// fails when the platform API is unavailable.
pub trait GraphicsCaptureSession: Send {
    fn start(&mut self, notifier: FrameNotifier) -> CaptureResult<()>;
    fn stop(&mut self);
}

#[derive(Default)]
struct FrameSlot {
    latest: Mutex<Option<CapturedFrame>>,
}

/// Clonable handle the platform session uses to publish arriving frames.
/// Runs on a callback thread outside the caller's control flow; the handoff
/// is a short critical section around the latest-frame slot.
#[derive(Clone)]
pub struct FrameNotifier {
    slot: Arc<FrameSlot>,
}

impl FrameNotifier {
    pub fn frame_arrived(&self, frame: CapturedFrame) {
        *self.slot.latest.lock() = Some(frame);
    }
}

/// Synchronous face of the asynchronous capture session.
pub struct GraphicsCaptureBackend {
    session: Box<dyn GraphicsCaptureSession>,
    slot: Arc<FrameSlot>,
    output: BytesMut,
    output_size: (u32, u32),
}

impl GraphicsCaptureBackend {
    pub fn new(mut session: Box<dyn GraphicsCaptureSession>) -> CaptureResult<Self> {
        let slot = Arc::new(FrameSlot::default());
        session.start(FrameNotifier { slot: slot.clone() })?;
        Ok(Self {
            session,
            slot,
            output: BytesMut::new(),
            output_size: (0, 0),
        })
    }

    /// Deliver the most recent notified frame, or a transient error when no
    /// notification arrived yet. The output buffer is resized whenever the
    /// captured window's content size changed between notifications; the
    /// session itself keeps running across resizes.
    pub fn capture_frame(&mut self) -> CaptureOutcome {
        let Some(source) = self.slot.latest.lock().clone() else {
            return CaptureOutcome::TransientError;
        };

        if (source.width, source.height) != self.output_size {
            debug!(
                width = source.width,
                height = source.height,
                "graphics capture content size changed, resizing output"
            );
            self.output = BytesMut::with_capacity(source.data.len());
            self.output_size = (source.width, source.height);
        }
        self.output.clear();
        self.output.extend_from_slice(&source.data);

        CaptureOutcome::Frame(CapturedFrame {
            data: self.output.split().freeze(),
            width: source.width,
            height: source.height,
            stride: source.stride,
            top_left: source.top_left,
        })
    }
}

impl Drop for GraphicsCaptureBackend {
    fn drop(&mut self) {
        self.session.stop();
    }
}
