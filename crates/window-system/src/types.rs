//! Window identifiers and desktop geometry

/// Opaque, platform-assigned window handle.
///
/// A `WindowId` may become invalid at any moment (the window was destroyed);
/// every query taking one must tolerate a stale id without failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub u64);

impl std::fmt::Display for WindowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// Axis-aligned rectangle in desktop coordinates.
///
/// Edge-based and signed: the virtual desktop can extend into negative
/// coordinates when a secondary monitor sits left of or above the primary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Build from origin and size.
    pub fn from_xywh(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn is_empty(&self) -> bool {
        self.right <= self.left || self.bottom <= self.top
    }

    /// Intersection of two rects; empty rect when they do not overlap.
    pub fn intersect(&self, other: &Rect) -> Rect {
        let rect = Rect::new(
            self.left.max(other.left),
            self.top.max(other.top),
            self.right.min(other.right),
            self.bottom.min(other.bottom),
        );
        if rect.is_empty() {
            Rect::default()
        } else {
            rect
        }
    }

    /// True when the two rects share a non-empty area.
    pub fn overlaps(&self, other: &Rect) -> bool {
        !self.intersect(other).is_empty()
    }

    /// True when `other` lies entirely within this rect.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.left >= self.left
            && other.top >= self.top
            && other.right <= self.right
            && other.bottom <= self.bottom
    }

    pub fn translate(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(
            self.left + dx,
            self.top + dy,
            self.right + dx,
            self.bottom + dy,
        )
    }
}

/// Window clip region, as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    /// No region set; the window draws in its full rect.
    Unset,
    /// A single rectangular region, in window coordinates.
    Rectangular(Rect),
    /// A multi-rect or otherwise non-rectangular region.
    Complex,
}

/// Opacity attributes of a layered window.
///
/// `None` for either field means the platform could not report it (per-pixel
/// alpha windows); callers must assume such windows are non-opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LayeredAttributes {
    /// The window uses a transparency color key.
    pub color_key: bool,
    /// Whole-window alpha, when set (255 = opaque).
    pub alpha: Option<u8>,
}

impl LayeredAttributes {
    /// True when the window blends with content underneath it.
    pub fn is_non_opaque(&self) -> bool {
        self.color_key || self.alpha.is_some_and(|a| a < 255)
    }
}

/// Identity of the selected window, captured once at selection time.
///
/// Immutable for the lifetime of that selection; a new selection builds a
/// new snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSnapshot {
    pub id: WindowId,
    pub title: String,
    pub process_id: u32,
    pub thread_id: u32,
    pub rect: Rect,
}
