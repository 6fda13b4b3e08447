//! The seam between the tiling core and the platform.
//!
//! Everything the reactor knows about applications and windows comes through
//! [`WindowSystem`]. All geometry crossing this boundary uses the top-left
//! origin convention; implementations convert at their edge.

use std::fmt;

pub use nix::libc::pid_t;
use thiserror::Error;

use crate::sys::geometry::{Point, Rect};

pub const AX_WINDOW_ROLE: &str = "AXWindow";
pub const AX_STANDARD_WINDOW_SUBROLE: &str = "AXStandardWindow";

/// A regular (non-background) running application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningApp {
    pub pid: pid_t,
    pub bundle_id: Option<String>,
    pub is_active: bool,
    pub is_hidden: bool,
}

/// Live attributes of a single window, queried fresh on every enumeration.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowInfo {
    pub pid: pid_t,
    pub title: String,
    pub frame: Rect,
    pub role: String,
    pub subrole: String,
    pub minimized: bool,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("window is no longer valid")]
    InvalidWindow,
    #[error("application with pid {0} is not running")]
    AppNotRunning(pid_t),
    #[error("failed to launch {bundle_id}: {reason}")]
    LaunchFailed { bundle_id: String, reason: String },
    #[error("menu item `{0}` not found")]
    MenuItemNotFound(String),
    #[error("platform call failed: {0}")]
    Platform(String),
}

pub type Result<T> = std::result::Result<T, Error>;

pub trait WindowSystem {
    /// Opaque handle to a window, valid until the window closes.
    type Window: Clone + PartialEq + fmt::Debug;

    /// Regular applications in the order the platform reports them.
    fn regular_apps(&self) -> Vec<RunningApp>;

    /// Fresh flags for a single application.
    fn app(&self, pid: pid_t) -> Option<RunningApp>;

    fn app_windows(&self, pid: pid_t) -> Result<Vec<Self::Window>>;

    fn window_info(&self, window: &Self::Window) -> Result<WindowInfo>;

    fn focused_window(&self) -> Option<Self::Window>;

    fn set_frame(&self, window: &Self::Window, frame: Rect) -> Result<()>;

    fn set_minimized(&self, window: &Self::Window, minimized: bool) -> Result<()>;

    fn raise(&self, window: &Self::Window) -> Result<()>;

    /// Brings the application to the front, ignoring other apps' active state.
    fn activate_app(&self, pid: pid_t) -> Result<()>;

    fn hide_app(&self, pid: pid_t) -> Result<()>;

    fn unhide_app(&self, pid: pid_t) -> Result<()>;

    fn cursor_location(&self) -> Option<Point>;

    fn warp_cursor(&self, point: Point) -> Result<()>;

    /// Starts the application without waiting for it to finish launching.
    /// Non-empty `args` request a fresh instance that receives them.
    fn launch_app(&self, bundle_id: &str, args: &[String]) -> Result<()>;

    /// Presses the menu item reached by following `path` from the menu bar.
    fn press_menu_item(&self, pid: pid_t, path: &[String]) -> Result<()>;
}
