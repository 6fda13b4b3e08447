use thiserror::Error;

use crate::sys::window_system;

#[derive(Debug, Error)]
pub enum ReactorError {
    #[error("Display {0} does not exist")]
    DisplayNotFound(usize),
    #[error("No focused window")]
    NoFocusedWindow,
    #[error("Application {0} is not running")]
    AppNotRunning(String),
    #[error("Window system call failed: {0}")]
    WindowSystem(#[from] window_system::Error),
}
