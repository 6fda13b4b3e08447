use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};

use crate::sys::geometry::{Point, Rect};

/// A connected display as reported by the platform, in its enumeration order.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Display {
    pub index: usize,
    pub frame: Rect,
    /// The frame minus menu bar and dock.
    pub visible_frame: Rect,
}

/// Identity of a display derived from its geometric origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DisplayKey(u64);

impl DisplayKey {
    pub fn from_origin(origin: Point) -> Self {
        let mut hasher = FxHasher::default();
        origin.x.to_bits().hash(&mut hasher);
        origin.y.to_bits().hash(&mut hasher);
        DisplayKey(hasher.finish())
    }
}

impl Display {
    pub fn key(&self) -> DisplayKey { DisplayKey::from_origin(self.frame.origin) }

    /// The area tiled windows are laid out in.
    pub fn tiling_bounds(&self, gap: f64) -> Rect { self.visible_frame.inset(gap) }

    pub fn contains(&self, point: Point) -> bool { self.frame.contains(point) }
}

/// Index of the display whose frame contains `point`.
pub fn display_at(displays: &[Display], point: Point) -> Option<usize> {
    displays.iter().position(|d| d.contains(point))
}
