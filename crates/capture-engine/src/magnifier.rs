//! Serialized coordinator for the compositor-aware alternate backend
//!
//! The magnification-style backend can compose the desktop with a set of
//! windows excluded from the output, but the platform API tolerates exactly
//! one capture at a time and must run on the thread that created it. The
//! coordinator owns that thread, serializes every caller through a mutex
//! wrapping a blocking request/response handoff, and is shared between
//! sessions as a reference-counted handle. Construction failure disables the
//! backend for the remainder of the process without ending any session.

use std::sync::{Arc, Weak};
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, Sender};
use parking_lot::Mutex;
use tracing::{info, warn};

use window_system::WindowId;

use crate::{CaptureError, CaptureOutcome, CaptureResult, CapturedFrame};

/// Pixel acquisition seam for the alternate backend: capture the composed
/// desktop of the monitor at the coordinate origin, with `exclude` omitted
/// from the output. Implemented per platform outside this crate.
pub trait ComposedCapture: Send {
    fn capture_excluding(&mut self, exclude: &[WindowId]) -> CaptureResult<CapturedFrame>;
}

/// Constructs the platform backend on the coordinator's worker thread. The
/// factory resolves the qualifying monitor (the one at the desktop
/// coordinate origin) and fails when the platform API is unavailable.
pub type ComposedCaptureFactory =
    dyn Fn() -> CaptureResult<Box<dyn ComposedCapture>> + Send + Sync;

struct Request {
    exclude: Vec<WindowId>,
    reply: Sender<CaptureResult<CapturedFrame>>,
}

struct Link {
    request_tx: Option<Sender<Request>>,
    handle: Option<JoinHandle<()>>,
}

struct CoordinatorInner {
    link: Mutex<Link>,
}

impl CoordinatorInner {
    fn spawn(factory: &Arc<ComposedCaptureFactory>) -> CaptureResult<Arc<Self>> {
        let (request_tx, request_rx) = bounded::<Request>(0);
        let (init_tx, init_rx) = bounded::<CaptureResult<()>>(1);
        let factory = factory.clone();

        let handle = std::thread::Builder::new()
            .name("magnifier-coordinator".to_string())
            .spawn(move || {
                let mut backend = match factory() {
                    Ok(backend) => {
                        let _ = init_tx.send(Ok(()));
                        backend
                    }
                    Err(err) => {
                        let _ = init_tx.send(Err(err));
                        return;
                    }
                };
                for request in request_rx {
                    let result = backend.capture_excluding(&request.exclude);
                    let _ = request.reply.send(result);
                }
            })
            .map_err(|_| CaptureError::WorkerGone)?;

        match init_rx.recv() {
            Ok(Ok(())) => {
                info!("alternate capture backend initialized");
                Ok(Arc::new(Self {
                    link: Mutex::new(Link {
                        request_tx: Some(request_tx),
                        handle: Some(handle),
                    }),
                }))
            }
            Ok(Err(err)) => {
                let _ = handle.join();
                Err(err)
            }
            Err(_) => {
                let _ = handle.join();
                Err(CaptureError::WorkerGone)
            }
        }
    }
}

impl Drop for CoordinatorInner {
    fn drop(&mut self) {
        let link = self.link.get_mut();
        // Disconnecting the request channel ends the worker loop; joining
        // makes teardown of the platform backend deterministic.
        link.request_tx = None;
        if let Some(handle) = link.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Reference-counted handle to the shared alternate backend.
///
/// Cloning shares the same worker; the worker and its platform backend are
/// torn down when the last handle is released.
#[derive(Clone)]
pub struct MagnifierCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl MagnifierCoordinator {
    /// Capture a composed frame with `exclude` omitted from the output.
    ///
    /// Callers are fully serialized: a second request blocks until the first
    /// completes, then receives its own independent result. There is no
    /// timeout; the call always terminates with one outcome.
    pub fn capture_excluding(&self, exclude: &[WindowId]) -> CaptureOutcome {
        let link = self.inner.link.lock();
        let Some(request_tx) = link.request_tx.as_ref() else {
            return CaptureOutcome::PermanentError;
        };
        let (reply_tx, reply_rx) = bounded(1);
        if request_tx
            .send(Request {
                exclude: exclude.to_vec(),
                reply: reply_tx,
            })
            .is_err()
        {
            return CaptureOutcome::PermanentError;
        }
        match reply_rx.recv() {
            Ok(Ok(frame)) => CaptureOutcome::Frame(frame),
            // The backend momentarily failed; the caller retries next cycle.
            Ok(Err(_)) => CaptureOutcome::TransientError,
            Err(_) => CaptureOutcome::PermanentError,
        }
    }
}

enum Slot {
    Idle,
    Active(Weak<CoordinatorInner>),
    /// Construction failed once; the backend stays unavailable for the rest
    /// of the process.
    Disabled,
}

/// Lazily constructs the process-wide coordinator and hands out handles.
///
/// Sessions share one registry; the first acquisition constructs the worker,
/// later ones reuse it while any handle is alive, and a fresh worker is
/// built if all handles were released in between.
pub struct MagnifierRegistry {
    factory: Arc<ComposedCaptureFactory>,
    slot: Mutex<Slot>,
}

impl MagnifierRegistry {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> CaptureResult<Box<dyn ComposedCapture>> + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(factory),
            slot: Mutex::new(Slot::Idle),
        }
    }

    pub fn acquire(&self) -> CaptureResult<MagnifierCoordinator> {
        let mut slot = self.slot.lock();
        match &*slot {
            Slot::Disabled => {
                return Err(CaptureError::BackendUnavailable(
                    "alternate backend disabled after construction failure".to_string(),
                ))
            }
            Slot::Active(weak) => {
                if let Some(inner) = weak.upgrade() {
                    return Ok(MagnifierCoordinator { inner });
                }
            }
            Slot::Idle => {}
        }
        match CoordinatorInner::spawn(&self.factory) {
            Ok(inner) => {
                *slot = Slot::Active(Arc::downgrade(&inner));
                Ok(MagnifierCoordinator { inner })
            }
            Err(err) => {
                warn!(error = %err, "alternate backend construction failed, disabling");
                *slot = Slot::Disabled;
                Err(err)
            }
        }
    }
}
