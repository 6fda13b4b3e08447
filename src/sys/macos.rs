//! The macOS implementation of the platform seams.

pub mod axuielement;
pub mod event_tap;
pub mod keyboard;
pub mod notification_center;
pub mod observer;
pub mod window_system;

use objc2_core_foundation::{CGPoint, CGRect, CGSize};

use crate::sys::geometry::{Point, Rect, Size};

impl From<CGPoint> for Point {
    fn from(p: CGPoint) -> Self { Point::new(p.x, p.y) }
}

impl From<Point> for CGPoint {
    fn from(p: Point) -> Self { CGPoint::new(p.x, p.y) }
}

impl From<Size> for CGSize {
    fn from(s: Size) -> Self { CGSize::new(s.width, s.height) }
}

impl From<CGRect> for Rect {
    fn from(r: CGRect) -> Self { Rect::new(r.origin.x, r.origin.y, r.size.width, r.size.height) }
}
