use std::fmt::{self, Debug, Formatter};

use serde::{Deserialize, Serialize};

use crate::geom::{Axis, Point, Side, Size};

/// An axis-aligned rectangle, anchored at its top-left corner.
#[derive(Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// The x coordinate of the left edge.
    pub x: f64,
    /// The y coordinate of the top edge.
    pub y: f64,
    /// The width.
    pub w: f64,
    /// The height.
    pub h: f64,
}

impl Rect {
    /// The zero rectangle at the origin.
    pub const fn zero() -> Self {
        Self { x: 0.0, y: 0.0, w: 0.0, h: 0.0 }
    }

    /// Create a new rectangle from position and extent.
    pub const fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Create a rectangle of the given size centred on `center`.
    pub const fn from_center(center: Point, size: Size) -> Self {
        Self {
            x: center.x - size.w / 2.0,
            y: center.y - size.h / 2.0,
            w: size.w,
            h: size.h,
        }
    }

    /// Create a rectangle spanning the two corner points.
    pub fn from_corners(a: Point, b: Point) -> Self {
        let min = a.min(b);
        let max = a.max(b);
        Self { x: min.x, y: min.y, w: max.x - min.x, h: max.y - min.y }
    }

    /// The x coordinate of the left edge.
    pub const fn left(self) -> f64 {
        self.x
    }

    /// The x coordinate of the right edge.
    pub const fn right(self) -> f64 {
        self.x + self.w
    }

    /// The y coordinate of the top edge.
    pub const fn top(self) -> f64 {
        self.y
    }

    /// The y coordinate of the bottom edge.
    pub const fn bottom(self) -> f64 {
        self.y + self.h
    }

    /// The centre point.
    pub const fn center(self) -> Point {
        Point { x: self.x + self.w / 2.0, y: self.y + self.h / 2.0 }
    }

    /// The top-left corner.
    pub const fn origin(self) -> Point {
        Point { x: self.x, y: self.y }
    }

    /// The extent as a size.
    pub const fn size(self) -> Size {
        Size { w: self.w, h: self.h }
    }

    /// The start coordinate along the given axis.
    pub const fn start(self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
        }
    }

    /// The end coordinate along the given axis.
    pub const fn end(self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.right(),
            Axis::Y => self.bottom(),
        }
    }

    /// The extent along the given axis.
    pub const fn extent(self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.w,
            Axis::Y => self.h,
        }
    }

    /// The coordinate of the given side's border line.
    pub const fn side(self, side: Side) -> f64 {
        match side {
            Side::Left => self.left(),
            Side::Top => self.top(),
            Side::Right => self.right(),
            Side::Bottom => self.bottom(),
        }
    }

    /// The midpoint of the given side's border.
    pub const fn side_center(self, side: Side) -> Point {
        let c = self.center();
        match side {
            Side::Left => Point { x: self.left(), y: c.y },
            Side::Top => Point { x: c.x, y: self.top() },
            Side::Right => Point { x: self.right(), y: c.y },
            Side::Bottom => Point { x: c.x, y: self.bottom() },
        }
    }

    /// Whether the point lies within the rectangle (borders included).
    pub const fn contains_point(self, p: Point) -> bool {
        p.x >= self.left()
            && p.x <= self.right()
            && p.y >= self.top()
            && p.y <= self.bottom()
    }

    /// Whether `other` lies wholly within this rectangle.
    pub const fn contains_rect(self, other: Self) -> bool {
        other.left() >= self.left()
            && other.right() <= self.right()
            && other.top() >= self.top()
            && other.bottom() <= self.bottom()
    }

    /// Whether the two rectangles overlap (shared borders count).
    pub const fn overlaps(self, other: Self) -> bool {
        self.left() <= other.right()
            && self.right() >= other.left()
            && self.top() <= other.bottom()
            && self.bottom() >= other.top()
    }

    /// Whether the two rectangles are within `margin` of each other.
    pub const fn nearby(self, other: Self, margin: f64) -> bool {
        self.expand(margin).overlaps(other)
    }

    /// The rectangle grown by `margin` on every side.
    pub const fn expand(self, margin: f64) -> Self {
        Self {
            x: self.x - margin,
            y: self.y - margin,
            w: self.w + 2.0 * margin,
            h: self.h + 2.0 * margin,
        }
    }

    /// The smallest rectangle containing both.
    pub fn union(self, other: Self) -> Self {
        let left = self.left().min(other.left());
        let top = self.top().min(other.top());
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Self { x: left, y: top, w: right - left, h: bottom - top }
    }

    /// The rectangle moved by `delta`.
    pub const fn translate(self, delta: Point) -> Self {
        Self { x: self.x + delta.x, y: self.y + delta.y, w: self.w, h: self.h }
    }

    /// The rectangle moved so that its centre is `center`.
    pub const fn with_center(self, center: Point) -> Self {
        Self::from_center(center, self.size())
    }

    /// The bounding box of an iterator of rectangles, if any.
    pub fn bbox(rects: impl IntoIterator<Item = Rect>) -> Option<Rect> {
        rects.into_iter().reduce(Rect::union)
    }
}

impl Debug for Rect {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "Rect({:?}, {:?}, {:?}, {:?})", self.x, self.y, self.w, self.h)
    }
}
