use std::fmt::{self, Debug, Formatter};
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

use crate::geom::{Axis, Size};

/// A point in 2D, in diagram pixels.
#[derive(Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// The x coordinate.
    pub x: f64,
    /// The y coordinate.
    pub y: f64,
}

impl Point {
    /// The origin point.
    pub const fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    /// Create a new point from x and y coordinates.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Create an instance with two equal components.
    pub const fn splat(value: f64) -> Self {
        Self { x: value, y: value }
    }

    /// Create a new point with y set to zero.
    pub const fn with_x(x: f64) -> Self {
        Self { x, y: 0.0 }
    }

    /// Create a new point with x set to zero.
    pub const fn with_y(y: f64) -> Self {
        Self { x: 0.0, y }
    }

    /// The component for the given axis.
    pub const fn get(self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
        }
    }

    /// A mutable reference to the component for the given axis.
    pub const fn get_mut(&mut self, axis: Axis) -> &mut f64 {
        match axis {
            Axis::X => &mut self.x,
            Axis::Y => &mut self.y,
        }
    }

    /// The component-wise minimum of this and another point.
    pub fn min(self, other: Self) -> Self {
        Self { x: self.x.min(other.x), y: self.y.min(other.y) }
    }

    /// The component-wise maximum of this and another point.
    pub fn max(self, other: Self) -> Self {
        Self { x: self.x.max(other.x), y: self.y.max(other.y) }
    }

    /// Maps the point with the given function.
    pub fn map(self, f: impl Fn(f64) -> f64) -> Self {
        Self { x: f(self.x), y: f(self.y) }
    }

    /// Round both components to the nearest integer.
    pub fn rounded(self) -> Self {
        self.map(f64::round)
    }

    /// The distance between this point and the origin.
    pub fn hypot(self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Whether this point is within `tolerance` of `other` on both axes.
    pub fn approx_eq(self, other: Self, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance && (self.y - other.y).abs() <= tolerance
    }

    /// Convert to a size.
    pub const fn to_size(self) -> Size {
        Size { w: self.x, h: self.y }
    }
}

impl Debug for Point {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "Point({:?}, {:?})", self.x, self.y)
    }
}

impl Neg for Point {
    type Output = Self;

    fn neg(self) -> Self {
        Self { x: -self.x, y: -self.y }
    }
}

impl Add for Point {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self { x: self.x + other.x, y: self.y + other.y }
    }
}

impl AddAssign for Point {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Sub for Point {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self { x: self.x - other.x, y: self.y - other.y }
    }
}

impl SubAssign for Point {
    fn sub_assign(&mut self, other: Self) {
        *self = *self - other;
    }
}

impl Mul<f64> for Point {
    type Output = Self;

    fn mul(self, factor: f64) -> Self {
        Self { x: self.x * factor, y: self.y * factor }
    }
}

impl Div<f64> for Point {
    type Output = Self;

    fn div(self, divisor: f64) -> Self {
        Self { x: self.x / divisor, y: self.y / divisor }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_approx_eq() {
        let a = Point::new(10.0, 20.0);
        assert!(a.approx_eq(Point::new(10.9, 19.1), 1.0));
        assert!(!a.approx_eq(Point::new(11.1, 20.0), 1.0));
        assert!(!a.approx_eq(Point::new(10.0, 21.5), 1.0));
    }

    #[test]
    fn test_point_axis_access() {
        let mut p = Point::new(1.0, 2.0);
        assert_eq!(p.get(Axis::X), 1.0);
        *p.get_mut(Axis::Y) = 5.0;
        assert_eq!(p, Point::new(1.0, 5.0));
    }
}
