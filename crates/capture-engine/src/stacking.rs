//! Background tracker of windows stacked above the selection
//!
//! Ordinary z-order enumeration misses a family of shell windows (modern
//! popups, the task switcher, IME flyouts, the taskbar and start menu). This
//! monitor merges a direct probe of those well-known window classes with an
//! enumeration pass, at a fixed cadence on its own thread, and stamps the
//! moment the merged set last changed. The backend selector debounces on
//! that stamp so no frame is captured mid-reorder.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Sender};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info};

use window_system::{WindowId, WindowSystemQueries};

use crate::{SelectedWindowContext, STACKING_MONITOR_HZ};

/// Compositor-hosted classes that exist above everything yet evade top-level
/// enumeration.
pub const CORE_WINDOW_CLASSES: &[&str] = &[
    "Windows.UI.Core.CoreWindow",
    "Shell_InputSwitchTopLevelWindow",
];

/// The taskbar. When it is visible its companion classes below can appear at
/// the stack root.
pub const TASKBAR_CLASS: &str = "Shell_TrayWnd";

/// Classes that only surface while the start menu / taskbar UI is open.
pub const START_MENU_COMPANION_CLASSES: &[&str] = &[
    "TaskListThumbnailWnd",
    "#32768",
    "tooltips_class32",
    "Xaml_WindowedPopupClass",
    "SysShadow",
];

/// Number of `has_changed_within` queries after a new selection that return
/// false unconditionally, covering the monitor's initial pass latency.
const GRACE_QUERIES: u32 = 2;

/// Immutable view of the windows currently above the selection.
///
/// Published whole; readers see either the prior or the new snapshot, never
/// a partial one.
#[derive(Debug, Clone, Default)]
pub struct StackingSnapshot {
    /// Sorted, de-duplicated set of windows above the selection.
    pub above: Vec<WindowId>,
    /// When the set (or a move/resize) was last observed to change.
    pub last_changed: Option<Instant>,
    /// A visited window was mid-move/resize on the last pass.
    pub window_moving: bool,
}

struct MonitorShared {
    queries: Arc<dyn WindowSystemQueries>,
    selected: RwLock<Option<WindowId>>,
    snapshot: RwLock<Arc<StackingSnapshot>>,
}

impl MonitorShared {
    /// One full pass: probe well-known classes, enumerate overlapping
    /// windows above the selection, merge, and stamp on change. The content
    /// rect is recomputed fresh each pass since the window can move.
    fn run_pass(&self) {
        let Some(selected) = *self.selected.read() else {
            return;
        };
        let content_rect = self.queries.content_rect(selected).unwrap_or_default();
        let context =
            SelectedWindowContext::new(self.queries.clone(), selected, content_rect);
        let queries = self.queries.as_ref();

        let mut moving = false;
        let mut above = Vec::new();

        // Enumeration pass: every qualifying window visited before the
        // selection. Windows vanishing mid-walk read as invisible.
        for id in queries.top_level_windows() {
            if !moving && queries.is_thread_in_move_size(id) {
                moving = true;
            }
            if id == selected {
                break;
            }
            if !queries.is_visible_on_current_desktop(id) {
                continue;
            }
            if let Some(ctx) = &context {
                if ctx.is_owned_by(id) || ctx.is_shell_descendant(id) {
                    continue;
                }
            }
            if let Some(rect) = queries.content_rect(id) {
                if rect.overlaps(&content_rect) {
                    above.push(id);
                }
            }
        }

        // Well-known class probe.
        let mut probed = Vec::new();
        for class in CORE_WINDOW_CLASSES {
            for id in queries.find_windows_of_class(class) {
                if !queries.is_cloaked(id) {
                    probed.push(id);
                }
            }
        }
        let taskbar = queries
            .find_windows_of_class(TASKBAR_CLASS)
            .into_iter()
            .find(|id| queries.is_visible_on_current_desktop(*id));
        if let Some(taskbar) = taskbar {
            probed.push(taskbar);
            for class in START_MENU_COMPANION_CLASSES {
                for id in queries.find_windows_of_class(class) {
                    let related = context
                        .as_ref()
                        .is_some_and(|ctx| ctx.is_owned_by(id) || ctx.is_shell_descendant(id));
                    if !related && queries.is_visible_on_current_desktop(id) {
                        probed.push(id);
                    }
                }
            }
        }
        // Probed windows count only when they actually cover the selection.
        for id in probed {
            if let Some(rect) = queries.content_rect(id) {
                if rect.overlaps(&content_rect) {
                    above.push(id);
                }
            }
        }

        above.sort_unstable();
        above.dedup();

        let previous = self.snapshot.read().clone();
        if moving || previous.above != above {
            debug!(
                count = above.len(),
                moving, "stacking set changed above selection"
            );
            *self.snapshot.write() = Arc::new(StackingSnapshot {
                above,
                last_changed: Some(Instant::now()),
                window_moving: moving,
            });
        }
    }
}

struct Worker {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

/// Debounced tracker of which windows sit above the selected window.
///
/// The worker thread is spawned lazily on the first change query and torn
/// down (cancel + join) on drop. Selecting a new window resets the state
/// synchronously.
pub struct StackingMonitor {
    shared: Arc<MonitorShared>,
    worker: Mutex<Option<Worker>>,
    grace: AtomicU32,
}

impl StackingMonitor {
    pub fn new(queries: Arc<dyn WindowSystemQueries>) -> Self {
        Self {
            shared: Arc::new(MonitorShared {
                queries,
                selected: RwLock::new(None),
                snapshot: RwLock::new(Arc::new(StackingSnapshot::default())),
            }),
            worker: Mutex::new(None),
            grace: AtomicU32::new(GRACE_QUERIES),
        }
    }

    /// Point the monitor at a new selection. Clears the published set and
    /// re-arms the grace period, synchronously.
    pub fn select_window(&self, id: WindowId) {
        *self.shared.selected.write() = Some(id);
        *self.shared.snapshot.write() = Arc::new(StackingSnapshot::default());
        self.grace.store(GRACE_QUERIES, Ordering::SeqCst);
    }

    /// True when the stacking set changed within the last `ms` milliseconds.
    ///
    /// The first two queries after a selection return false unconditionally.
    /// The background worker is spawned lazily on first use.
    pub fn has_changed_within(&self, ms: u64) -> bool {
        self.ensure_worker();
        let granted = self
            .grace
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |g| g.checked_sub(1))
            .is_ok();
        if granted {
            return false;
        }
        self.shared
            .snapshot
            .read()
            .last_changed
            .is_some_and(|at| at.elapsed() <= Duration::from_millis(ms))
    }

    /// Current merged set of windows above the selection, for seeding the
    /// occlusion test with windows enumeration alone would miss.
    pub fn windows_above(&self) -> Vec<WindowId> {
        self.shared.snapshot.read().above.clone()
    }

    pub fn snapshot(&self) -> Arc<StackingSnapshot> {
        self.shared.snapshot.read().clone()
    }

    /// Run one pass synchronously, for callers that need up-to-date data
    /// before the next scheduled tick.
    pub fn refresh_now(&self) {
        self.shared.run_pass();
    }

    fn ensure_worker(&self) {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return;
        }
        let shared = self.shared.clone();
        let (stop_tx, stop_rx) = bounded::<()>(0);
        let period = Duration::from_millis(1000 / STACKING_MONITOR_HZ);
        let spawned = std::thread::Builder::new()
            .name("stacking-monitor".to_string())
            .spawn(move || loop {
                match stop_rx.recv_timeout(period) {
                    Ok(()) | Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
                    Err(crossbeam_channel::RecvTimeoutError::Timeout) => shared.run_pass(),
                }
            });
        match spawned {
            Ok(handle) => {
                info!("stacking monitor started");
                *worker = Some(Worker { stop_tx, handle });
            }
            // Degraded mode: change queries fall back to the grace period
            // and explicit refreshes.
            Err(err) => error!(error = %err, "failed to spawn stacking monitor thread"),
        }
    }
}

impl Drop for StackingMonitor {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.lock().take() {
            drop(worker.stop_tx);
            let _ = worker.handle.join();
        }
    }
}
