pub mod geometry;
pub mod hotkey;
pub mod keyboard;
pub mod timer;
pub mod window_system;

#[cfg(target_os = "macos")]
pub mod macos;
