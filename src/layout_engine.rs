mod engine;
mod floating;

pub use engine::{LayoutMode, LayoutModes, compute_frames};
pub use floating::{FloatReason, FloatingClassifier, WindowKey};

#[cfg(test)]
mod tests;
