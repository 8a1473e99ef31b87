//! Scripted in-memory window system for tests
//!
//! `FakeWindowSystem` holds a mutable window stack behind a lock so tests can
//! restack, move, and destroy windows between capture cycles, the same way
//! the live desktop changes under the engine.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::{LayeredAttributes, Rect, RegionKind, WindowId, WindowSystemQueries};

/// One scripted window. Built fluently, then added to a [`FakeWindowSystem`].
#[derive(Debug, Clone)]
pub struct FakeWindow {
    pub id: WindowId,
    pub title: String,
    pub class: String,
    pub rect: Rect,
    pub content_rect: Rect,
    pub thread_id: u32,
    pub process_id: u32,
    pub root_owner: Option<WindowId>,
    pub parent: Option<WindowId>,
    pub visible: bool,
    pub cloaked: bool,
    pub minimized: bool,
    pub caption: bool,
    pub layered: bool,
    pub layered_attributes: Option<LayeredAttributes>,
    pub region: RegionKind,
    pub in_move_size: bool,
    pub transient_notification: bool,
    /// Whether top-level enumeration reports this window. Some shell windows
    /// exist but never show up in the enumeration order.
    pub enumerable: bool,
}

impl FakeWindow {
    pub fn new(id: u64) -> Self {
        Self {
            id: WindowId(id),
            title: format!("window-{id}"),
            class: "TestWindowClass".to_string(),
            rect: Rect::from_xywh(0, 0, 800, 600),
            content_rect: Rect::from_xywh(0, 0, 800, 600),
            thread_id: id as u32,
            process_id: id as u32,
            root_owner: None,
            parent: None,
            visible: true,
            cloaked: false,
            minimized: false,
            caption: true,
            layered: false,
            layered_attributes: None,
            region: RegionKind::Unset,
            in_move_size: false,
            transient_notification: false,
            enumerable: true,
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn class(mut self, class: &str) -> Self {
        self.class = class.to_string();
        self
    }

    /// Set both the window rect and the content rect.
    pub fn rect(mut self, rect: Rect) -> Self {
        self.rect = rect;
        self.content_rect = rect;
        self
    }

    pub fn content_rect(mut self, rect: Rect) -> Self {
        self.content_rect = rect;
        self
    }

    pub fn thread_process(mut self, thread_id: u32, process_id: u32) -> Self {
        self.thread_id = thread_id;
        self.process_id = process_id;
        self
    }

    pub fn owned_by(mut self, owner: WindowId) -> Self {
        self.root_owner = Some(owner);
        self
    }

    pub fn child_of(mut self, parent: WindowId) -> Self {
        self.parent = Some(parent);
        self.enumerable = false;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn cloaked(mut self) -> Self {
        self.cloaked = true;
        self
    }

    pub fn minimized(mut self) -> Self {
        self.minimized = true;
        self
    }

    pub fn no_caption(mut self) -> Self {
        self.caption = false;
        self
    }

    pub fn layered(mut self, attributes: Option<LayeredAttributes>) -> Self {
        self.layered = true;
        self.layered_attributes = attributes;
        self
    }

    pub fn region(mut self, region: RegionKind) -> Self {
        self.region = region;
        self
    }

    pub fn transient_notification(mut self) -> Self {
        self.transient_notification = true;
        self
    }

    pub fn not_enumerable(mut self) -> Self {
        self.enumerable = false;
        self
    }
}

#[derive(Default)]
struct Stack {
    /// Front-to-back order of every known window.
    order: Vec<WindowId>,
    windows: HashMap<WindowId, FakeWindow>,
    virtual_screen: Rect,
}

/// In-memory `WindowSystemQueries` implementation.
pub struct FakeWindowSystem {
    stack: RwLock<Stack>,
}

impl Default for FakeWindowSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeWindowSystem {
    pub fn new() -> Self {
        Self {
            stack: RwLock::new(Stack {
                order: Vec::new(),
                windows: HashMap::new(),
                virtual_screen: Rect::from_xywh(0, 0, 1920, 1080),
            }),
        }
    }

    pub fn set_virtual_screen(&self, rect: Rect) {
        self.stack.write().virtual_screen = rect;
    }

    /// Add a window at the back of the stack.
    pub fn add(&self, window: FakeWindow) -> WindowId {
        let id = window.id;
        let mut stack = self.stack.write();
        stack.order.push(id);
        stack.windows.insert(id, window);
        id
    }

    /// Add a window at the front of the stack (topmost).
    pub fn add_on_top(&self, window: FakeWindow) -> WindowId {
        let id = window.id;
        let mut stack = self.stack.write();
        stack.order.insert(0, id);
        stack.windows.insert(id, window);
        id
    }

    /// Move an existing window to the front of the stack.
    pub fn raise(&self, id: WindowId) {
        let mut stack = self.stack.write();
        stack.order.retain(|w| *w != id);
        stack.order.insert(0, id);
    }

    /// Destroy a window; all subsequent queries see it as gone.
    pub fn remove(&self, id: WindowId) {
        let mut stack = self.stack.write();
        stack.order.retain(|w| *w != id);
        stack.windows.remove(&id);
    }

    pub fn set_rect(&self, id: WindowId, rect: Rect) {
        let mut stack = self.stack.write();
        if let Some(w) = stack.windows.get_mut(&id) {
            w.rect = rect;
            w.content_rect = rect;
        }
    }

    pub fn set_visible(&self, id: WindowId, visible: bool) {
        let mut stack = self.stack.write();
        if let Some(w) = stack.windows.get_mut(&id) {
            w.visible = visible;
        }
    }

    pub fn set_minimized(&self, id: WindowId, minimized: bool) {
        let mut stack = self.stack.write();
        if let Some(w) = stack.windows.get_mut(&id) {
            w.minimized = minimized;
        }
    }

    pub fn set_in_move_size(&self, id: WindowId, moving: bool) {
        let mut stack = self.stack.write();
        if let Some(w) = stack.windows.get_mut(&id) {
            w.in_move_size = moving;
        }
    }

    fn with<R>(&self, id: WindowId, f: impl FnOnce(&FakeWindow) -> R) -> Option<R> {
        self.stack.read().windows.get(&id).map(f)
    }
}

impl WindowSystemQueries for FakeWindowSystem {
    fn top_level_windows(&self) -> Vec<WindowId> {
        let stack = self.stack.read();
        stack
            .order
            .iter()
            .filter(|id| {
                stack
                    .windows
                    .get(id)
                    .is_some_and(|w| w.parent.is_none() && w.enumerable)
            })
            .copied()
            .collect()
    }

    fn child_windows(&self, id: WindowId) -> Vec<WindowId> {
        let stack = self.stack.read();
        // All generations, front-to-back, same as the top-level order.
        let mut result = Vec::new();
        let mut frontier = vec![id];
        while let Some(current) = frontier.pop() {
            for candidate in &stack.order {
                let Some(w) = stack.windows.get(candidate) else {
                    continue;
                };
                if w.parent == Some(current) {
                    result.push(*candidate);
                    frontier.push(*candidate);
                }
            }
        }
        result
    }

    fn is_window(&self, id: WindowId) -> bool {
        self.stack.read().windows.contains_key(&id)
    }

    fn is_minimized(&self, id: WindowId) -> bool {
        self.with(id, |w| w.minimized).unwrap_or(false)
    }

    fn is_visible_on_current_desktop(&self, id: WindowId) -> bool {
        self.with(id, |w| w.visible && !w.cloaked && !w.minimized)
            .unwrap_or(false)
    }

    fn is_cloaked(&self, id: WindowId) -> bool {
        self.with(id, |w| w.cloaked).unwrap_or(false)
    }

    fn title(&self, id: WindowId) -> Option<String> {
        self.with(id, |w| w.title.clone())
    }

    fn class_name(&self, id: WindowId) -> Option<String> {
        self.with(id, |w| w.class.clone())
    }

    fn thread_process_id(&self, id: WindowId) -> Option<(u32, u32)> {
        self.with(id, |w| (w.thread_id, w.process_id))
    }

    fn root_owner(&self, id: WindowId) -> Option<WindowId> {
        let stack = self.stack.read();
        let mut current = id;
        loop {
            match stack.windows.get(&current) {
                Some(w) => match w.root_owner {
                    Some(owner) => current = owner,
                    None => return Some(current),
                },
                None => return None,
            }
        }
    }

    fn parent(&self, id: WindowId) -> Option<WindowId> {
        self.with(id, |w| w.parent).flatten()
    }

    fn window_rect(&self, id: WindowId) -> Option<Rect> {
        self.with(id, |w| w.rect)
    }

    fn content_rect(&self, id: WindowId) -> Option<Rect> {
        self.with(id, |w| w.content_rect)
    }

    fn has_caption(&self, id: WindowId) -> bool {
        self.with(id, |w| w.caption).unwrap_or(false)
    }

    fn is_layered(&self, id: WindowId) -> bool {
        self.with(id, |w| w.layered).unwrap_or(false)
    }

    fn layered_attributes(&self, id: WindowId) -> Option<LayeredAttributes> {
        self.with(id, |w| w.layered_attributes).flatten()
    }

    fn window_region(&self, id: WindowId) -> RegionKind {
        self.with(id, |w| w.region).unwrap_or(RegionKind::Unset)
    }

    fn is_thread_in_move_size(&self, id: WindowId) -> bool {
        self.with(id, |w| w.in_move_size).unwrap_or(false)
    }

    fn find_windows_of_class(&self, class: &str) -> Vec<WindowId> {
        let stack = self.stack.read();
        stack
            .order
            .iter()
            .filter(|id| {
                stack
                    .windows
                    .get(id)
                    .is_some_and(|w| w.class == class && w.parent.is_none())
            })
            .copied()
            .collect()
    }

    fn virtual_screen_rect(&self) -> Rect {
        self.stack.read().virtual_screen
    }

    fn is_transient_notification(&self, id: WindowId) -> bool {
        self.with(id, |w| w.transient_notification).unwrap_or(false)
    }
}
