//! Window query trait abstraction

use crate::{LayeredAttributes, Rect, RegionKind, WindowId};

/// Stateless read-only queries over live windows.
///
/// Implemented per platform outside this workspace and injected into the
/// capture engine. Every method must tolerate a stale `WindowId`: a window
/// that no longer exists reads as invisible/unknowable, never as an error.
pub trait WindowSystemQueries: Send + Sync {
    /// All top-level windows in current front-to-back z-order.
    fn top_level_windows(&self) -> Vec<WindowId>;

    /// All child windows of `id`, front-to-back, across all generations.
    fn child_windows(&self, id: WindowId) -> Vec<WindowId>;

    /// The window handle still refers to a live window.
    fn is_window(&self, id: WindowId) -> bool;

    fn is_minimized(&self, id: WindowId) -> bool;

    /// Visible, and on the virtual desktop the user is currently looking at.
    fn is_visible_on_current_desktop(&self, id: WindowId) -> bool;

    /// Hidden by the compositor while still nominally existing.
    fn is_cloaked(&self, id: WindowId) -> bool;

    fn title(&self, id: WindowId) -> Option<String>;

    fn class_name(&self, id: WindowId) -> Option<String>;

    /// Owning (thread id, process id) pair, or `None` for a dead window.
    fn thread_process_id(&self, id: WindowId) -> Option<(u32, u32)>;

    /// Root of the owner chain (the application main window for a dialog).
    fn root_owner(&self, id: WindowId) -> Option<WindowId>;

    /// Structural parent, one step up the surface tree.
    fn parent(&self, id: WindowId) -> Option<WindowId>;

    /// Full window bounds including decoration, in desktop coordinates.
    fn window_rect(&self, id: WindowId) -> Option<Rect>;

    /// Drawable content area, in desktop coordinates. Preferred over
    /// `window_rect` for overlap tests: a maximized window only shows its
    /// content area on screen.
    fn content_rect(&self, id: WindowId) -> Option<Rect>;

    /// The window carries title-bar decoration.
    fn has_caption(&self, id: WindowId) -> bool;

    fn is_layered(&self, id: WindowId) -> bool;

    /// Opacity attributes of a layered window; `None` when they cannot be
    /// read (per-pixel alpha windows), which callers treat as non-opaque.
    fn layered_attributes(&self, id: WindowId) -> Option<LayeredAttributes>;

    fn window_region(&self, id: WindowId) -> RegionKind;

    /// The window's GUI thread is currently in a move or resize loop.
    fn is_thread_in_move_size(&self, id: WindowId) -> bool;

    /// Every live window of the given class, including ones that evade
    /// top-level enumeration.
    fn find_windows_of_class(&self, class: &str) -> Vec<WindowId>;

    /// Bounds of the full virtual desktop across all monitors.
    fn virtual_screen_rect(&self) -> Rect;

    /// Recognized transient notification overlay (browser/system toasts).
    fn is_transient_notification(&self, id: WindowId) -> bool;
}
