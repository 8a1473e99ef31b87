//! Selected-window identity and classification
//!
//! Snapshot of the selected window taken at selection time, used to decide
//! whether another window on the stack belongs to the selection (owned
//! popups, shell-hosted descendants) or genuinely sits above it.

use std::sync::Arc;

use window_system::{Rect, WindowId, WindowSystemQueries};

/// Per-selection classifier over the live window stack.
pub struct SelectedWindowContext {
    queries: Arc<dyn WindowSystemQueries>,
    selected: WindowId,
    content_rect: Rect,
    thread_id: u32,
    process_id: u32,
}

impl SelectedWindowContext {
    /// Returns `None` when the selected window's owning thread cannot be
    /// resolved (window gone or inaccessible). Callers must then assume the
    /// window is occluded rather than proceed with a half-built context.
    pub fn new(
        queries: Arc<dyn WindowSystemQueries>,
        selected: WindowId,
        content_rect: Rect,
    ) -> Option<Self> {
        let (thread_id, process_id) = queries.thread_process_id(selected)?;
        Some(Self {
            queries,
            selected,
            content_rect,
            thread_id,
            process_id,
        })
    }

    pub fn selected_window(&self) -> WindowId {
        self.selected
    }

    pub fn content_rect(&self) -> Rect {
        self.content_rect
    }

    pub fn queries(&self) -> &dyn WindowSystemQueries {
        self.queries.as_ref()
    }

    pub fn is_same_window(&self, id: WindowId) -> bool {
        id == self.selected
    }

    /// True when `id`'s root-owner chain resolves to the selected window, or
    /// `id` shares the selection's owning thread. The owner-chain check
    /// covers drop-down menus and dialog pop-ups; the same-thread check
    /// covers context menus and tooltips, which are not formally owned.
    pub fn is_owned_by(&self, id: WindowId) -> bool {
        if self.queries.root_owner(id) == Some(self.selected) {
            return true;
        }
        match self.queries.thread_process_id(id) {
            Some((thread_id, process_id)) => {
                thread_id == self.thread_id && process_id == self.process_id
            }
            None => false,
        }
    }

    /// True when `id`'s parent chain resolves to the selected window and
    /// `id` itself carries no title-bar decoration. Modern-shell popups are
    /// hosted inside the selected window's own surface tree under a foreign
    /// process id, so the owner chain misses them; windows with a caption
    /// are real child applications and stay excluded.
    pub fn is_shell_descendant(&self, id: WindowId) -> bool {
        let mut current = id;
        while let Some(parent) = self.queries.parent(current) {
            if parent == self.selected {
                return !self.queries.has_caption(id);
            }
            current = parent;
        }
        false
    }

    /// True when `id`'s current bounds intersect the selected window's
    /// captured content rect. A window that can no longer be queried is
    /// treated as not overlapping.
    pub fn overlaps(&self, id: WindowId) -> bool {
        match self.queries.content_rect(id) {
            Some(rect) => rect.overlaps(&self.content_rect),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use window_system::testing::{FakeWindow, FakeWindowSystem};

    fn context_for(
        system: Arc<FakeWindowSystem>,
        selected: WindowId,
    ) -> Option<SelectedWindowContext> {
        let rect = system.content_rect(selected)?;
        SelectedWindowContext::new(system, selected, rect)
    }

    #[test]
    fn construction_fails_for_dead_window() {
        let system = Arc::new(FakeWindowSystem::new());
        assert!(SelectedWindowContext::new(
            system,
            WindowId(42),
            Rect::from_xywh(0, 0, 10, 10)
        )
        .is_none());
    }

    #[test]
    fn owned_by_root_owner_chain() {
        let system = Arc::new(FakeWindowSystem::new());
        let main = system.add(FakeWindow::new(1).thread_process(10, 100));
        let dialog = system.add_on_top(FakeWindow::new(2).owned_by(main).thread_process(20, 200));
        let ctx = context_for(system, main).unwrap();
        assert!(ctx.is_owned_by(dialog));
    }

    #[test]
    fn owned_by_same_thread() {
        let system = Arc::new(FakeWindowSystem::new());
        let main = system.add(FakeWindow::new(1).thread_process(10, 100));
        let tooltip = system.add_on_top(FakeWindow::new(2).thread_process(10, 100));
        let unrelated = system.add_on_top(FakeWindow::new(3).thread_process(11, 100));
        let ctx = context_for(system, main).unwrap();
        assert!(ctx.is_owned_by(tooltip));
        assert!(!ctx.is_owned_by(unrelated));
    }

    #[test]
    fn shell_descendant_requires_no_caption() {
        let system = Arc::new(FakeWindowSystem::new());
        let main = system.add(FakeWindow::new(1));
        let popup = system.add(FakeWindow::new(2).child_of(main).no_caption());
        let hosted_app = system.add(FakeWindow::new(3).child_of(main));
        let ctx = context_for(system, main).unwrap();
        assert!(ctx.is_shell_descendant(popup));
        assert!(!ctx.is_shell_descendant(hosted_app));
    }

    #[test]
    fn shell_descendant_walks_generations() {
        let system = Arc::new(FakeWindowSystem::new());
        let main = system.add(FakeWindow::new(1));
        let inner = system.add(FakeWindow::new(2).child_of(main).no_caption());
        let popup = system.add(FakeWindow::new(3).child_of(inner).no_caption());
        let ctx = context_for(system, main).unwrap();
        assert!(ctx.is_shell_descendant(popup));
    }

    #[test]
    fn overlap_uses_content_rect_and_tolerates_gone_windows() {
        let system = Arc::new(FakeWindowSystem::new());
        let main = system.add(FakeWindow::new(1).rect(Rect::from_xywh(0, 0, 100, 100)));
        let near = system.add_on_top(FakeWindow::new(2).rect(Rect::from_xywh(50, 50, 100, 100)));
        let far = system.add_on_top(FakeWindow::new(3).rect(Rect::from_xywh(500, 500, 10, 10)));
        let ctx = context_for(system.clone(), main).unwrap();
        assert!(ctx.overlaps(near));
        assert!(!ctx.overlaps(far));

        system.remove(near);
        assert!(!ctx.overlaps(near));
    }
}
