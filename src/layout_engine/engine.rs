use serde::{Deserialize, Serialize};

use crate::common::collections::HashMap;
use crate::sys::geometry::Rect;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
    /// Every tiled window covers the whole display.
    #[default]
    Full,
    /// One master pane on the left, the rest stacked in a right column.
    MasterStack,
}

impl LayoutMode {
    pub fn toggled(self) -> LayoutMode {
        match self {
            LayoutMode::Full => LayoutMode::MasterStack,
            LayoutMode::MasterStack => LayoutMode::Full,
        }
    }
}

/// Computes one frame per window, in window order.
///
/// `bounds` is the usable area already inset by `gap` on every side; `gap`
/// here only separates panes from each other.
pub fn compute_frames(count: usize, bounds: Rect, gap: f64, mode: LayoutMode) -> Vec<Rect> {
    match mode {
        LayoutMode::Full => vec![bounds; count],
        LayoutMode::MasterStack => master_stack(count, bounds, gap),
    }
}

fn master_stack(count: usize, bounds: Rect, gap: f64) -> Vec<Rect> {
    match count {
        0 => vec![],
        1 => vec![bounds],
        _ => {
            let Rect { origin, size } = bounds;
            let master_width = (size.width - gap) / 2.0;
            let stack_width = size.width - gap - master_width;
            let stack_x = origin.x + master_width + gap;

            let stack_count = count - 1;
            let gaps = gap * stack_count.saturating_sub(1) as f64;
            let stack_height = (size.height - gaps) / stack_count as f64;
            let bottom = origin.y + size.height;

            let mut frames = Vec::with_capacity(count);
            frames.push(Rect::new(origin.x, origin.y, master_width, size.height));
            for i in 0..stack_count {
                let y = origin.y + i as f64 * (stack_height + gap);
                // The last pane absorbs rounding so the column ends exactly at
                // the bottom edge.
                let height = if i + 1 == stack_count { bottom - y } else { stack_height };
                frames.push(Rect::new(stack_x, y, stack_width, height));
            }
            frames
        }
    }
}

/// Per-display layout mode, keyed by display index. Absent means `Full`.
#[derive(Debug, Default, Clone)]
pub struct LayoutModes {
    modes: HashMap<usize, LayoutMode>,
}

impl LayoutModes {
    pub fn mode(&self, display: usize) -> LayoutMode {
        self.modes.get(&display).copied().unwrap_or_default()
    }

    pub fn toggle(&mut self, display: usize) -> LayoutMode {
        let mode = self.mode(display).toggled();
        self.modes.insert(display, mode);
        mode
    }

    pub fn reset(&mut self) { self.modes.clear(); }
}
