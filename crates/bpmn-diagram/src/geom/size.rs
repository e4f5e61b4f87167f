use std::fmt::{self, Debug, Formatter};
use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

use crate::geom::{Axis, Point};

/// A size in 2D, in diagram pixels.
#[derive(Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Size {
    /// The width.
    pub w: f64,
    /// The height.
    pub h: f64,
}

impl Size {
    /// The zero size.
    pub const fn zero() -> Self {
        Self { w: 0.0, h: 0.0 }
    }

    /// Create a new size from width and height.
    pub const fn new(w: f64, h: f64) -> Self {
        Self { w, h }
    }

    /// Create an instance with two equal components.
    pub const fn splat(value: f64) -> Self {
        Self { w: value, h: value }
    }

    /// The extent along the given axis.
    pub const fn get(self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.w,
            Axis::Y => self.h,
        }
    }

    /// The component-wise maximum of this and another size.
    pub fn max(self, other: Self) -> Self {
        Self { w: self.w.max(other.w), h: self.h.max(other.h) }
    }

    /// Convert to a point.
    pub const fn to_point(self) -> Point {
        Point { x: self.w, y: self.h }
    }
}

impl Debug for Size {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "Size({:?}, {:?})", self.w, self.h)
    }
}

impl Add for Size {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self { w: self.w + other.w, h: self.h + other.h }
    }
}

impl Sub for Size {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self { w: self.w - other.w, h: self.h - other.h }
    }
}

impl Mul<f64> for Size {
    type Output = Self;

    fn mul(self, factor: f64) -> Self {
        Self { w: self.w * factor, h: self.h * factor }
    }
}
