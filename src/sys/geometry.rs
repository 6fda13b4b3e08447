//! Geometry primitives shared by the layout engine and the window system.
//!
//! All rectangles in the core use a single convention: origin at the top-left
//! of the main display, y growing downward. Conversions from the bottom-left
//! convention happen at the adapter edge through [`CoordinateConverter`].

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self { Self { x, y } }
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self { Self { width, height } }
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    pub fn min(&self) -> Point { self.origin }

    pub fn max(&self) -> Point {
        Point::new(
            self.origin.x + self.size.width,
            self.origin.y + self.size.height,
        )
    }

    pub fn mid(&self) -> Point {
        Point::new(
            self.origin.x + self.size.width / 2.0,
            self.origin.y + self.size.height / 2.0,
        )
    }

    /// Shrinks the rectangle by `amount` on every side. Never produces a
    /// negative size.
    pub fn inset(&self, amount: f64) -> Rect {
        Rect::new(
            self.origin.x + amount,
            self.origin.y + amount,
            (self.size.width - 2.0 * amount).max(0.0),
            (self.size.height - 2.0 * amount).max(0.0),
        )
    }

    /// A rectangle of `size` centred within `self`.
    pub fn centered(&self, size: Size) -> Rect {
        let mid = self.mid();
        Rect {
            origin: Point::new(mid.x - size.width / 2.0, mid.y - size.height / 2.0),
            size,
        }
    }

    pub fn has_area(&self) -> bool { self.size.width > 0.0 && self.size.height > 0.0 }

    pub fn intersection(&self, other: &Rect) -> Rect {
        let min_x = f64::max(self.min().x, other.min().x);
        let max_x = f64::min(self.max().x, other.max().x);
        let min_y = f64::max(self.min().y, other.min().y);
        let max_y = f64::min(self.max().y, other.max().y);
        Rect::new(
            min_x,
            min_y,
            f64::max(max_x - min_x, 0.),
            f64::max(max_y - min_y, 0.),
        )
    }

    /// Half-open containment, so a point on the shared edge of two adjacent
    /// displays belongs to exactly one of them.
    pub fn contains(&self, point: Point) -> bool {
        (self.min().x..self.max().x).contains(&point.x)
            && (self.min().y..self.max().y).contains(&point.y)
    }

    pub fn contains_rect(&self, other: Rect) -> bool {
        self.min().x <= other.min().x
            && self.min().y <= other.min().y
            && self.max().x >= other.max().x
            && self.max().y >= other.max().y
    }

    pub fn area(&self) -> f64 { self.size.width * self.size.height }
}

pub trait IsWithin {
    fn is_within(&self, how_much: f64, other: Self) -> bool;
}

impl IsWithin for Rect {
    fn is_within(&self, how_much: f64, other: Self) -> bool {
        self.origin.is_within(how_much, other.origin) && self.size.is_within(how_much, other.size)
    }
}

impl IsWithin for Point {
    fn is_within(&self, how_much: f64, other: Self) -> bool {
        self.x.is_within(how_much, other.x) && self.y.is_within(how_much, other.y)
    }
}

impl IsWithin for Size {
    fn is_within(&self, how_much: f64, other: Self) -> bool {
        self.width.is_within(how_much, other.width) && self.height.is_within(how_much, other.height)
    }
}

impl IsWithin for f64 {
    fn is_within(&self, how_much: f64, other: Self) -> bool { (self - other).abs() < how_much }
}

pub trait SameAs: IsWithin + Sized {
    fn same_as(&self, other: Self) -> bool { self.is_within(0.1, other) }
}

impl SameAs for Rect {}
impl SameAs for Point {}
impl SameAs for Size {}

/// Bridges the bottom-left origin convention (screen enumeration) and the
/// top-left convention (window mutation and everything in the core).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateConverter {
    /// Height of the main display, which anchors both conventions.
    main_height: f64,
}

impl CoordinateConverter {
    pub fn from_height(main_height: f64) -> Self { Self { main_height } }

    pub fn main_height(&self) -> f64 { self.main_height }

    pub fn convert_point(&self, point: Point) -> Point {
        Point::new(point.x, self.main_height - point.y)
    }

    pub fn convert_rect(&self, rect: Rect) -> Rect {
        Rect::new(
            rect.origin.x,
            self.main_height - rect.origin.y - rect.size.height,
            rect.size.width,
            rect.size.height,
        )
    }
}
