//! Capture Engine - Backend selection for window sharing
//!
//! Decides, for every captured frame of a window-sharing session, which
//! capture strategy to use and whether the selected window is currently
//! unoccluded. Pixel acquisition itself lives outside this crate: the engine
//! drives injected backends and only owns the decision logic, meaning the
//! occlusion test, the stacking-change monitor, and the backend-selection
//! state machine.

mod context;
mod error;
mod frame;
mod graphics;
mod magnifier;
mod occlusion;
mod selector;
mod stacking;

pub use context::*;
pub use error::*;
pub use frame::*;
pub use graphics::*;
pub use magnifier::*;
pub use occlusion::*;
pub use selector::*;
pub use stacking::*;

/// A stacking change within this many milliseconds suppresses frame delivery.
pub const STACK_SETTLE_MS: u64 = 500;

/// Pause inserted before the first screen-backed frame after a backend
/// transition, masking the visual pop of full-screen transition animations.
pub const SCREEN_TRANSITION_MS: u64 = 34;

/// Cadence of the background stacking monitor.
pub const STACKING_MONITOR_HZ: u64 = 30;
