//! One-shot topmost test for the selected window
//!
//! Walks the live z-order front-to-back and decides whether any eligible
//! window overlaps the selection's content rect before the selection itself
//! is reached. The decision sequence is one ordered, short-circuit list of
//! named predicates; the same list runs once over the top-level stack and
//! once over the selection's own child subtree.

use tracing::debug;

use window_system::WindowId;

use crate::SelectedWindowContext;

/// Window classes the system compositor stacks above everything while they
/// host no user-visible content. Skipped only when shell exceptions are on.
pub const COMPOSITOR_WINDOW_CLASSES: &[&str] = &["Windows.UI.Core.CoreWindow"];

enum Visit {
    /// Reached the selected window; everything below it is irrelevant.
    Selected,
    /// Not a candidate occluder; keep walking.
    Skip,
    /// Overlaps the content rect; the selection is not topmost.
    Occluding,
}

/// One-shot "is the selected window topmost" test.
pub struct OcclusionDetector<'a> {
    context: &'a SelectedWindowContext,
    /// The sharer's own UI, never counted as an occluder.
    excluded: Option<WindowId>,
    /// Policy flag enabling shell-specific exceptions (compositor window
    /// classes, shell-hosted descendants).
    shell_exceptions: bool,
}

impl<'a> OcclusionDetector<'a> {
    pub fn new(
        context: &'a SelectedWindowContext,
        excluded: Option<WindowId>,
        shell_exceptions: bool,
    ) -> Self {
        Self {
            context,
            excluded,
            shell_exceptions,
        }
    }

    /// Runs the cascading test. `known_above` carries windows the stacking
    /// monitor has flagged as persistently above the selection even though
    /// plain enumeration misses them; any of them overlapping the content
    /// rect fails the test outright.
    pub fn is_topmost(&self, known_above: &[WindowId]) -> bool {
        for &id in known_above {
            if self.context.overlaps(id) {
                debug!(window = %id, "known-above window overlaps selection");
                return false;
            }
        }

        let queries = self.context.queries();
        if !self.pass(queries.top_level_windows(), false) {
            return false;
        }

        // The selection may be covered by its own floating children. The
        // child pass runs the identical predicate list; exhausting it without
        // meeting the selected window keeps the top-level verdict.
        self.pass(queries.child_windows(self.context.selected_window()), true)
    }

    /// One front-to-back pass. `topmost_when_exhausted` is the verdict when
    /// the walk ends without reaching the selected window: false for the
    /// top-level stack (the selection should always be in it), true for the
    /// child subtree.
    fn pass(&self, windows: Vec<WindowId>, topmost_when_exhausted: bool) -> bool {
        for id in windows {
            match self.visit(id) {
                Visit::Selected => return true,
                Visit::Skip => continue,
                Visit::Occluding => {
                    debug!(window = %id, "selection occluded");
                    return false;
                }
            }
        }
        topmost_when_exhausted
    }

    fn visit(&self, id: WindowId) -> Visit {
        let context = self.context;
        if context.is_same_window(id) {
            return Visit::Selected;
        }
        if Some(id) == self.excluded {
            return Visit::Skip;
        }

        let queries = context.queries();
        // A window that disappears mid-enumeration reads as invisible here.
        if !queries.is_visible_on_current_desktop(id) {
            return Visit::Skip;
        }
        if queries.is_transient_notification(id) {
            return Visit::Skip;
        }
        if context.is_owned_by(id) {
            return Visit::Skip;
        }
        if self.shell_exceptions {
            if let Some(class) = queries.class_name(id) {
                if COMPOSITOR_WINDOW_CLASSES.contains(&class.as_str()) {
                    return Visit::Skip;
                }
            }
            if context.is_shell_descendant(id) {
                return Visit::Skip;
            }
        }

        if context.overlaps(id) {
            Visit::Occluding
        } else {
            Visit::Skip
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use window_system::testing::{FakeWindow, FakeWindowSystem};
    use window_system::{Rect, WindowSystemQueries};

    fn context(system: &Arc<FakeWindowSystem>, selected: WindowId) -> SelectedWindowContext {
        let rect = system.content_rect(selected).unwrap();
        SelectedWindowContext::new(system.clone(), selected, rect).unwrap()
    }

    #[test]
    fn alone_on_screen_is_topmost() {
        let system = Arc::new(FakeWindowSystem::new());
        let main = system.add(FakeWindow::new(1).rect(Rect::from_xywh(0, 0, 1920, 1080)));
        let ctx = context(&system, main);
        assert!(OcclusionDetector::new(&ctx, None, false).is_topmost(&[]));
    }

    #[test]
    fn overlapping_window_above_occludes() {
        let system = Arc::new(FakeWindowSystem::new());
        let main = system.add(FakeWindow::new(1).rect(Rect::from_xywh(0, 0, 800, 600)));
        let ctx = context(&system, main);
        let detector = OcclusionDetector::new(&ctx, None, false);
        assert!(detector.is_topmost(&[]));

        // Scenario B: an unrelated window opens directly over the selection.
        system.add_on_top(
            FakeWindow::new(2)
                .rect(Rect::from_xywh(100, 100, 400, 300))
                .thread_process(2, 2),
        );
        assert!(!detector.is_topmost(&[]));
    }

    #[test]
    fn window_below_selection_is_irrelevant() {
        let system = Arc::new(FakeWindowSystem::new());
        let main = system.add(FakeWindow::new(1).rect(Rect::from_xywh(0, 0, 800, 600)));
        system.add(
            FakeWindow::new(2)
                .rect(Rect::from_xywh(0, 0, 800, 600))
                .thread_process(2, 2),
        );
        let ctx = context(&system, main);
        assert!(OcclusionDetector::new(&ctx, None, false).is_topmost(&[]));
    }

    #[test]
    fn idempotent_without_stacking_change() {
        let system = Arc::new(FakeWindowSystem::new());
        let main = system.add(FakeWindow::new(1).rect(Rect::from_xywh(0, 0, 800, 600)));
        system.add_on_top(
            FakeWindow::new(2)
                .rect(Rect::from_xywh(10, 10, 100, 100))
                .thread_process(2, 2),
        );
        let ctx = context(&system, main);
        let detector = OcclusionDetector::new(&ctx, None, false);
        let first = detector.is_topmost(&[]);
        for _ in 0..5 {
            assert_eq!(detector.is_topmost(&[]), first);
        }
    }

    #[test]
    fn excluded_window_is_ignored() {
        let system = Arc::new(FakeWindowSystem::new());
        let main = system.add(FakeWindow::new(1).rect(Rect::from_xywh(0, 0, 800, 600)));
        let sharer_ui = system.add_on_top(
            FakeWindow::new(2)
                .rect(Rect::from_xywh(0, 0, 200, 200))
                .thread_process(2, 2),
        );
        let ctx = context(&system, main);
        assert!(!OcclusionDetector::new(&ctx, None, false).is_topmost(&[]));
        assert!(OcclusionDetector::new(&ctx, Some(sharer_ui), false).is_topmost(&[]));
    }

    #[test]
    fn invisible_and_notification_windows_are_ignored() {
        let system = Arc::new(FakeWindowSystem::new());
        let main = system.add(FakeWindow::new(1).rect(Rect::from_xywh(0, 0, 800, 600)));
        system.add_on_top(
            FakeWindow::new(2)
                .rect(Rect::from_xywh(0, 0, 200, 200))
                .thread_process(2, 2)
                .hidden(),
        );
        system.add_on_top(
            FakeWindow::new(3)
                .rect(Rect::from_xywh(0, 0, 200, 200))
                .thread_process(3, 3)
                .transient_notification(),
        );
        let ctx = context(&system, main);
        assert!(OcclusionDetector::new(&ctx, None, false).is_topmost(&[]));
    }

    #[test]
    fn owned_popup_is_ignored() {
        let system = Arc::new(FakeWindowSystem::new());
        let main = system.add(
            FakeWindow::new(1)
                .rect(Rect::from_xywh(0, 0, 800, 600))
                .thread_process(10, 100),
        );
        // A dialog owned by the selection, and a tooltip on the same thread.
        system.add_on_top(
            FakeWindow::new(2)
                .rect(Rect::from_xywh(100, 100, 300, 200))
                .owned_by(main)
                .thread_process(20, 200),
        );
        system.add_on_top(
            FakeWindow::new(3)
                .rect(Rect::from_xywh(50, 50, 100, 50))
                .thread_process(10, 100),
        );
        let ctx = context(&system, main);
        assert!(OcclusionDetector::new(&ctx, None, false).is_topmost(&[]));
    }

    #[test]
    fn compositor_class_skipped_only_with_shell_exceptions() {
        let system = Arc::new(FakeWindowSystem::new());
        let main = system.add(FakeWindow::new(1).rect(Rect::from_xywh(0, 0, 800, 600)));
        system.add_on_top(
            FakeWindow::new(2)
                .rect(Rect::from_xywh(0, 0, 400, 400))
                .class("Windows.UI.Core.CoreWindow")
                .thread_process(2, 2),
        );
        let ctx = context(&system, main);
        assert!(!OcclusionDetector::new(&ctx, None, false).is_topmost(&[]));
        assert!(OcclusionDetector::new(&ctx, None, true).is_topmost(&[]));
    }

    #[test]
    fn floating_foreign_child_occludes_via_child_pass() {
        let system = Arc::new(FakeWindowSystem::new());
        let main = system.add(
            FakeWindow::new(1)
                .rect(Rect::from_xywh(0, 0, 800, 600))
                .thread_process(10, 100),
        );
        // Hosted by another process inside the selection's surface tree,
        // with its own caption: a real window riding on top of the client
        // area, not a shell popup.
        system.add(
            FakeWindow::new(2)
                .child_of(main)
                .rect(Rect::from_xywh(100, 100, 300, 200))
                .thread_process(20, 200),
        );
        let ctx = context(&system, main);
        assert!(!OcclusionDetector::new(&ctx, None, true).is_topmost(&[]));
    }

    #[test]
    fn caption_less_shell_popup_child_is_ignored() {
        let system = Arc::new(FakeWindowSystem::new());
        let main = system.add(
            FakeWindow::new(1)
                .rect(Rect::from_xywh(0, 0, 800, 600))
                .thread_process(10, 100),
        );
        system.add(
            FakeWindow::new(2)
                .child_of(main)
                .rect(Rect::from_xywh(100, 100, 300, 200))
                .thread_process(20, 200)
                .no_caption(),
        );
        let ctx = context(&system, main);
        assert!(OcclusionDetector::new(&ctx, None, true).is_topmost(&[]));
    }

    #[test]
    fn selection_missing_from_enumeration_is_not_topmost() {
        let system = Arc::new(FakeWindowSystem::new());
        let main = system.add(
            FakeWindow::new(1)
                .rect(Rect::from_xywh(0, 0, 800, 600))
                .not_enumerable(),
        );
        let ctx = context(&system, main);
        assert!(!OcclusionDetector::new(&ctx, None, false).is_topmost(&[]));
    }

    #[test]
    fn known_above_overlap_fails_fast() {
        let system = Arc::new(FakeWindowSystem::new());
        let main = system.add(FakeWindow::new(1).rect(Rect::from_xywh(0, 0, 800, 600)));
        // Exists but evades enumeration, like a shell flyout.
        let flyout = system.add(
            FakeWindow::new(2)
                .rect(Rect::from_xywh(0, 0, 100, 100))
                .thread_process(2, 2)
                .not_enumerable(),
        );
        let ctx = context(&system, main);
        let detector = OcclusionDetector::new(&ctx, None, false);
        assert!(detector.is_topmost(&[]));
        assert!(!detector.is_topmost(&[flyout]));
    }

    #[test]
    fn window_vanishing_mid_walk_reads_invisible() {
        let system = Arc::new(FakeWindowSystem::new());
        let main = system.add(FakeWindow::new(1).rect(Rect::from_xywh(0, 0, 800, 600)));
        let above = system.add_on_top(
            FakeWindow::new(2)
                .rect(Rect::from_xywh(0, 0, 400, 400))
                .thread_process(2, 2),
        );
        let ctx = context(&system, main);
        system.remove(above);
        // The stale id may still be handed in as known-above; it must read
        // as not overlapping rather than fail.
        assert!(OcclusionDetector::new(&ctx, None, false).is_topmost(&[above]));
    }
}
