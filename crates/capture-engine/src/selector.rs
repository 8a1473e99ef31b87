//! Backend-selection state machine - the per-frame hot path
//!
//! Combines the occlusion detector and the stacking monitor to route every
//! capture request to one of the mutually exclusive strategies: full-screen
//! capture cropped to the window, plain per-window capture, the serialized
//! compositor-aware alternate backend, or the asynchronous graphics-capture
//! path. Enforces the anti-flicker debounce and never delivers a frame whose
//! decision went stale while the pixels were being produced.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use window_system::{Rect, RegionKind, WindowId, WindowSnapshot, WindowSystemQueries};

use crate::{
    wants_graphics_capture, CaptureError, CaptureHandler, CaptureOutcome, CaptureResult,
    CapturedFrame, GraphicsCaptureBackend, GraphicsCaptureSession, MagnifierCoordinator,
    MagnifierRegistry, OcclusionDetector, SelectedWindowContext, StackingMonitor,
    COMPOSITOR_WINDOW_CLASSES, SCREEN_TRANSITION_MS, STACK_SETTLE_MS,
};

/// Which capture strategy produced (or will produce) the current frames.
///
/// Returns to `Unknown` only on a new selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureBackendKind {
    Unknown,
    Screen,
    Window,
    Magnifier,
    GraphicsCapture,
}

/// Full-screen capture path; frames are cropped to the window downstream.
pub trait ScreenCapture: Send {
    fn capture_screen(&mut self) -> CaptureResult<CapturedFrame>;
}

/// Plain per-window capture path (block copy of the window surface).
pub trait WindowCapture: Send {
    fn capture_window(&mut self, id: WindowId) -> CaptureResult<CapturedFrame>;
}

/// Builds a platform graphics-capture session for one window.
pub type GraphicsSessionFactory =
    dyn Fn(WindowId) -> CaptureResult<Box<dyn GraphicsCaptureSession>> + Send + Sync;

/// The pixel-producing collaborators, all injected.
pub struct CaptureBackends {
    pub screen: Box<dyn ScreenCapture>,
    pub window: Box<dyn WindowCapture>,
    pub magnifier: Option<Arc<MagnifierRegistry>>,
    pub graphics: Option<Box<GraphicsSessionFactory>>,
}

#[derive(Debug, Clone)]
pub struct SelectorOptions {
    /// The sharer's own UI, never counted as an occluder and excluded from
    /// composed output.
    pub excluded_window: Option<WindowId>,
    /// Enable shell-specific occlusion exceptions.
    pub shell_exceptions: bool,
    /// Allow the graphics-capture path for recognized window classes.
    pub allow_graphics_capture: bool,
    /// Allow the compositor-aware alternate backend.
    pub allow_magnifier: bool,
}

impl Default for SelectorOptions {
    fn default() -> Self {
        Self {
            excluded_window: None,
            shell_exceptions: true,
            allow_graphics_capture: true,
            allow_magnifier: true,
        }
    }
}

/// Per-frame backend selection for one sharing session.
pub struct BackendSelector {
    queries: Arc<dyn WindowSystemQueries>,
    options: SelectorOptions,
    screen: Box<dyn ScreenCapture>,
    window: Box<dyn WindowCapture>,
    magnifier_registry: Option<Arc<MagnifierRegistry>>,
    magnifier: Option<MagnifierCoordinator>,
    graphics_factory: Option<Box<GraphicsSessionFactory>>,
    graphics: Option<GraphicsCaptureBackend>,
    monitor: StackingMonitor,
    handler: Option<Arc<dyn CaptureHandler>>,
    state: CaptureBackendKind,
    selection: Option<WindowSnapshot>,
}

impl BackendSelector {
    pub fn new(
        queries: Arc<dyn WindowSystemQueries>,
        backends: CaptureBackends,
        options: SelectorOptions,
    ) -> Self {
        let monitor = StackingMonitor::new(queries.clone());
        Self {
            queries,
            options,
            screen: backends.screen,
            window: backends.window,
            magnifier_registry: backends.magnifier,
            magnifier: None,
            graphics_factory: backends.graphics,
            graphics: None,
            monitor,
            handler: None,
            state: CaptureBackendKind::Unknown,
            selection: None,
        }
    }

    /// Register the callback that receives every capture outcome.
    pub fn start(&mut self, handler: Arc<dyn CaptureHandler>) {
        self.handler = Some(handler);
    }

    pub fn state(&self) -> CaptureBackendKind {
        self.state
    }

    pub fn selection(&self) -> Option<&WindowSnapshot> {
        self.selection.as_ref()
    }

    /// Select the window to capture. Fails when the window is invalid,
    /// minimized, or not visible. Resets the state machine to `Unknown`,
    /// discards the per-selection graphics session, and synchronously resets
    /// and re-seeds the stacking monitor.
    pub fn select_source(&mut self, id: WindowId) -> CaptureResult<()> {
        let queries = self.queries.as_ref();
        if !queries.is_window(id)
            || queries.is_minimized(id)
            || !queries.is_visible_on_current_desktop(id)
        {
            return Err(CaptureError::InvalidSelection);
        }
        let (thread_id, process_id) = queries
            .thread_process_id(id)
            .ok_or(CaptureError::ThreadUnresolved)?;
        let snapshot = WindowSnapshot {
            id,
            title: queries.title(id).unwrap_or_default(),
            process_id,
            thread_id,
            rect: queries.window_rect(id).unwrap_or_default(),
        };
        info!(window = %id, title = %snapshot.title, "source selected");

        self.selection = Some(snapshot);
        self.set_state(CaptureBackendKind::Unknown);
        self.graphics = None;
        self.monitor.select_window(id);
        // Seed the set of always-above system windows before the first
        // occlusion test runs.
        self.monitor.refresh_now();
        Ok(())
    }

    /// Force one synchronous stacking pass ahead of the next scheduled tick.
    pub fn refresh_stacking(&self) {
        self.monitor.refresh_now();
    }

    /// Run one capture cycle. Exactly one outcome reaches the registered
    /// handler, on this thread.
    pub fn capture_frame(&mut self) {
        let Some(selected) = self.selection.as_ref().map(|s| s.id) else {
            warn!("capture requested with no selection");
            self.deliver(CaptureOutcome::PermanentError);
            return;
        };
        if !self.queries.is_window(selected) {
            warn!(window = %selected, "selected window has been destroyed");
            self.deliver(CaptureOutcome::PermanentError);
            return;
        }

        // The stack is still settling; capturing now would hand out a frame
        // taken mid-reorder.
        if self.monitor.has_changed_within(STACK_SETTLE_MS) {
            debug!("stacking changed within debounce window");
            self.deliver(CaptureOutcome::TransientError);
            return;
        }

        // Recognized classes take the asynchronous graphics-capture path and
        // skip the occlusion machinery entirely.
        if self.options.allow_graphics_capture
            && wants_graphics_capture(self.queries.as_ref(), selected)
        {
            if let Some(outcome) = self.capture_graphics(selected) {
                self.deliver(outcome);
                return;
            }
        }

        // One screen-or-not decision per cycle; it is reused at delivery,
        // never recomputed mid-flight.
        let use_screen = self.should_use_screen(selected);
        debug!(use_screen, state = ?self.state, "capture cycle decision");

        if use_screen {
            if self.state != CaptureBackendKind::Unknown && self.state != CaptureBackendKind::Screen
            {
                // Entering full-screen capture plays the shell's transition
                // animation; give it one beat so the first frame is clean.
                debug!(
                    delay_ms = SCREEN_TRANSITION_MS,
                    "transitioning to screen capture"
                );
                std::thread::sleep(Duration::from_millis(SCREEN_TRANSITION_MS));
                self.set_state(CaptureBackendKind::Screen);
                self.deliver(CaptureOutcome::TransientError);
                return;
            }
            self.set_state(CaptureBackendKind::Screen);
            let result = self.screen.capture_screen();
            self.finish(selected, result);
            return;
        }

        if self.needs_composed_capture(selected) {
            if let Some(frame) = self.capture_magnifier() {
                self.set_state(CaptureBackendKind::Magnifier);
                self.deliver_checked(frame);
                return;
            }
        }

        self.set_state(CaptureBackendKind::Window);
        let result = self.window.capture_window(selected);
        self.finish(selected, result);
    }

    /// The selected window's rect in virtual-screen coordinates (origin at
    /// the virtual desktop's top-left), using the active backend's own
    /// coordinate offset. The alternate backend is anchored to the monitor
    /// at the desktop coordinate origin, so its frames carry no offset.
    pub fn window_rect_in_virtual_screen(&self) -> Rect {
        let Some(selection) = &self.selection else {
            return Rect::default();
        };
        let queries = self.queries.as_ref();
        let Some(content) = queries.content_rect(selection.id) else {
            return Rect::default();
        };
        let rect = match queries.window_rect(selection.id) {
            Some(window_rect) => content.intersect(&window_rect),
            None => content,
        };
        let screen = queries.virtual_screen_rect();
        let rect = rect.intersect(&screen);
        match self.state {
            CaptureBackendKind::Magnifier => rect,
            _ => rect.translate(-screen.left, -screen.top),
        }
    }

    /// The cascading "can we capture the whole screen and crop" gate.
    fn should_use_screen(&self, selected: WindowId) -> bool {
        let queries = self.queries.as_ref();
        if !queries.is_visible_on_current_desktop(selected) {
            return false;
        }
        if queries.is_layered(selected) {
            match queries.layered_attributes(selected) {
                Some(attrs) if !attrs.is_non_opaque() => {}
                // Blended or per-pixel alpha: a cropped screen frame would
                // bake underlying content into the capture.
                _ => return false,
            }
        }
        let Some(window_rect) = queries.window_rect(selected) else {
            return false;
        };
        if window_rect.is_empty() {
            return false;
        }
        let Some(mut content_rect) = queries.content_rect(selected) else {
            return false;
        };
        match queries.window_region(selected) {
            RegionKind::Complex => return false,
            RegionKind::Rectangular(region) => {
                // The region is reported in window coordinates.
                let region = region.translate(window_rect.left, window_rect.top);
                content_rect = content_rect.intersect(&region);
                if content_rect.is_empty() {
                    return false;
                }
            }
            RegionKind::Unset => {}
        }
        // A maximized window only shows its content area; the border hangs
        // off screen. Hence the content rect, not the window rect.
        if !queries.virtual_screen_rect().contains_rect(&content_rect) {
            return false;
        }

        let Some(context) =
            SelectedWindowContext::new(self.queries.clone(), selected, content_rect)
        else {
            // Cannot resolve the selection's thread: assume occluded.
            return false;
        };
        let known_above = self.monitor.windows_above();
        OcclusionDetector::new(
            &context,
            self.options.excluded_window,
            self.options.shell_exceptions,
        )
        .is_topmost(&known_above)
    }

    fn needs_composed_capture(&self, id: WindowId) -> bool {
        if !self.options.allow_magnifier || self.magnifier_registry.is_none() {
            return false;
        }
        if self.queries.is_layered(id) {
            return true;
        }
        matches!(
            self.queries.class_name(id),
            Some(class) if COMPOSITOR_WINDOW_CLASSES.contains(&class.as_str())
        )
    }

    fn capture_graphics(&mut self, selected: WindowId) -> Option<CaptureOutcome> {
        if self.graphics.is_none() {
            let factory = self.graphics_factory.as_ref()?;
            match factory(selected).and_then(GraphicsCaptureBackend::new) {
                Ok(backend) => self.graphics = Some(backend),
                Err(err) => {
                    debug!(error = %err, "graphics capture unavailable, using plain path");
                    return None;
                }
            }
        }
        self.set_state(CaptureBackendKind::GraphicsCapture);
        Some(self.graphics.as_mut()?.capture_frame())
    }

    fn capture_magnifier(&mut self) -> Option<CapturedFrame> {
        if self.magnifier.is_none() {
            let registry = self.magnifier_registry.as_ref()?;
            match registry.acquire() {
                Ok(coordinator) => self.magnifier = Some(coordinator),
                Err(err) => {
                    debug!(error = %err, "alternate backend unavailable");
                    return None;
                }
            }
        }
        let coordinator = self.magnifier.as_ref()?;
        let mut exclude = self.monitor.windows_above();
        if let Some(excluded) = self.options.excluded_window {
            exclude.push(excluded);
        }
        match coordinator.capture_excluding(&exclude) {
            CaptureOutcome::Frame(frame) => Some(frame),
            _ => {
                debug!("alternate backend produced no frame, falling back");
                None
            }
        }
    }

    fn finish(&self, selected: WindowId, result: CaptureResult<CapturedFrame>) {
        match result {
            Ok(frame) => self.deliver_checked(frame),
            Err(err) => {
                if !self.queries.is_window(selected) {
                    warn!(window = %selected, "window destroyed during capture");
                    self.deliver(CaptureOutcome::PermanentError);
                } else {
                    debug!(error = %err, "backend failed to produce a frame");
                    self.deliver(CaptureOutcome::TransientError);
                }
            }
        }
    }

    /// Delivery gate: a frame whose decision went stale while the pixels
    /// were produced is discarded, never substituted.
    fn deliver_checked(&self, frame: CapturedFrame) {
        if self.monitor.has_changed_within(STACK_SETTLE_MS) {
            debug!("stacking changed during capture, discarding frame");
            self.deliver(CaptureOutcome::TransientError);
        } else {
            self.deliver(CaptureOutcome::Frame(frame));
        }
    }

    fn deliver(&self, outcome: CaptureOutcome) {
        match &self.handler {
            Some(handler) => handler.on_capture_result(outcome),
            None => warn!("capture outcome dropped: no handler registered"),
        }
    }

    fn set_state(&mut self, state: CaptureBackendKind) {
        if self.state != state {
            info!(from = ?self.state, to = ?state, "capture backend changed");
            self.state = state;
        }
    }
}
