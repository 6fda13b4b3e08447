use pretty_assertions::assert_eq;
use test_log::test;

use crate::layout_engine::{LayoutMode, LayoutModes, compute_frames};
use crate::sys::geometry::{IsWithin, Rect, SameAs};

fn bounds() -> Rect { Rect::new(0.0, 25.0, 1440.0, 875.0).inset(GAP) }

const GAP: f64 = 8.0;

fn assert_no_overlap(frames: &[Rect]) {
    for (i, a) in frames.iter().enumerate() {
        for b in &frames[i + 1..] {
            assert!(a.intersection(b).area() < 1e-6, "{a:?} overlaps {b:?}");
        }
    }
}

mod full {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;

    #[test]
    fn every_frame_is_the_bounds() {
        for count in 0..6 {
            let frames = compute_frames(count, bounds(), GAP, LayoutMode::Full);
            assert_eq!(frames.len(), count);
            assert!(frames.iter().all(|f| *f == bounds()));
        }
    }
}

mod master_stack {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;

    #[test]
    fn no_windows() {
        assert_eq!(compute_frames(0, bounds(), GAP, LayoutMode::MasterStack), Vec::<Rect>::new());
    }

    #[test]
    fn single_window_gets_everything() {
        assert_eq!(
            compute_frames(1, bounds(), GAP, LayoutMode::MasterStack),
            vec![bounds()]
        );
    }

    #[test]
    fn two_windows_split_the_width() {
        let b = Rect::new(0.0, 0.0, 1000.0, 800.0);
        let frames = compute_frames(2, b, 10.0, LayoutMode::MasterStack);
        assert_eq!(
            frames,
            vec![
                Rect::new(0.0, 0.0, 495.0, 800.0),
                Rect::new(505.0, 0.0, 495.0, 800.0),
            ]
        );
    }

    #[test]
    fn stack_is_ordered_top_to_bottom() {
        let b = Rect::new(0.0, 0.0, 1000.0, 800.0);
        let frames = compute_frames(4, b, 10.0, LayoutMode::MasterStack);
        assert_eq!(frames.len(), 4);
        assert!(frames[0].same_as(Rect::new(0.0, 0.0, 495.0, 800.0)));
        // (800 - 2 * 10) / 3 = 260
        assert!(frames[1].same_as(Rect::new(505.0, 0.0, 495.0, 260.0)));
        assert!(frames[2].same_as(Rect::new(505.0, 270.0, 495.0, 260.0)));
        assert!(frames[3].same_as(Rect::new(505.0, 540.0, 495.0, 260.0)));
    }

    #[test]
    fn widths_and_heights_add_up() {
        let b = bounds();
        for count in 2..12 {
            let frames = compute_frames(count, b, GAP, LayoutMode::MasterStack);
            assert_eq!(frames.len(), count);

            let master = frames[0];
            let stack = &frames[1..];
            assert!((master.size.width + GAP + stack[0].size.width).is_within(1e-9, b.size.width));
            assert!(master.size.height.is_within(1e-9, b.size.height));

            let heights: f64 = stack.iter().map(|f| f.size.height).sum();
            let gaps = GAP * (stack.len() - 1) as f64;
            assert!(
                (heights + gaps).is_within(1e-9, b.size.height),
                "count {count}: {heights} + {gaps} != {}",
                b.size.height
            );
            assert!(stack.last().unwrap().max().y.is_within(1e-9, b.max().y));
            assert_no_overlap(&frames);
            assert!(frames.iter().all(|f| b.inset(-1e-6).contains_rect(*f)));
        }
    }

    #[test]
    fn zero_gap_still_tiles_exactly() {
        let b = Rect::new(0.0, 0.0, 300.0, 300.0);
        let frames = compute_frames(4, b, 0.0, LayoutMode::MasterStack);
        let area: f64 = frames.iter().map(Rect::area).sum();
        assert!(area.is_within(1e-6, b.area()));
        assert_no_overlap(&frames);
    }
}

mod modes {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;

    #[test]
    fn absent_display_defaults_to_full() {
        let modes = LayoutModes::default();
        assert_eq!(modes.mode(0), LayoutMode::Full);
        assert_eq!(modes.mode(7), LayoutMode::Full);
    }

    #[test]
    fn toggle_is_per_display() {
        let mut modes = LayoutModes::default();
        assert_eq!(modes.toggle(1), LayoutMode::MasterStack);
        assert_eq!(modes.mode(0), LayoutMode::Full);
        assert_eq!(modes.mode(1), LayoutMode::MasterStack);
        assert_eq!(modes.toggle(1), LayoutMode::Full);
    }

    #[test]
    fn reset_returns_every_display_to_full() {
        let mut modes = LayoutModes::default();
        modes.toggle(0);
        modes.toggle(2);
        modes.reset();
        assert_eq!(modes.mode(0), LayoutMode::Full);
        assert_eq!(modes.mode(2), LayoutMode::Full);
    }
}
