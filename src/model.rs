pub mod apps_cache;
pub mod display;
pub mod focus_memory;

pub use apps_cache::AppsCache;
pub use display::{Display, DisplayKey, display_at};
pub use focus_memory::{FocusMemory, FocusRecord};
