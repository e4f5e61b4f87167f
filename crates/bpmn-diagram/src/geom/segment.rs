//! Segment predicates.

use crate::geom::{Point, Rect};

/// Outcodes for Cohen-Sutherland clipping.
const INSIDE: u8 = 0b0000;
const LEFT: u8 = 0b0001;
const RIGHT: u8 = 0b0010;
const BOTTOM: u8 = 0b0100;
const TOP: u8 = 0b1000;

fn outcode(p: Point, rect: Rect) -> u8 {
    let mut code = INSIDE;
    if p.x < rect.left() {
        code |= LEFT;
    } else if p.x > rect.right() {
        code |= RIGHT;
    }
    if p.y < rect.top() {
        code |= TOP;
    } else if p.y > rect.bottom() {
        code |= BOTTOM;
    }
    code
}

/// Whether the segment from `p1` to `p2` passes through the rectangle.
///
/// Uses Cohen-Sutherland outcode clipping. A segment that merely touches the
/// border counts as intersecting.
pub fn segment_intersects_rect(p1: Point, p2: Point, rect: Rect) -> bool {
    let mut a = p1;
    let mut b = p2;
    let mut code_a = outcode(a, rect);
    let mut code_b = outcode(b, rect);

    loop {
        if code_a | code_b == INSIDE {
            // Both endpoints inside.
            return true;
        }
        if code_a & code_b != INSIDE {
            // Both endpoints share an outside zone.
            return false;
        }

        // Clip the endpoint that is outside against one border it violates.
        let out = if code_a != INSIDE { code_a } else { code_b };
        let p = if out & TOP != 0 {
            Point::new(a.x + (b.x - a.x) * (rect.top() - a.y) / (b.y - a.y), rect.top())
        } else if out & BOTTOM != 0 {
            Point::new(
                a.x + (b.x - a.x) * (rect.bottom() - a.y) / (b.y - a.y),
                rect.bottom(),
            )
        } else if out & RIGHT != 0 {
            Point::new(rect.right(), a.y + (b.y - a.y) * (rect.right() - a.x) / (b.x - a.x))
        } else {
            Point::new(rect.left(), a.y + (b.y - a.y) * (rect.left() - a.x) / (b.x - a.x))
        };

        if out == code_a {
            a = p;
            code_a = outcode(a, rect);
        } else {
            b = p;
            code_b = outcode(b, rect);
        }
    }
}

/// The cross product of `b - a` and `c - a`.
fn cross(a: Point, b: Point, c: Point) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Whether the two segments properly cross each other.
///
/// This is the strict test: it returns `false` when an endpoint of one
/// segment merely touches the other segment, and for collinear overlap.
pub fn segments_intersect(a1: Point, a2: Point, b1: Point, b2: Point) -> bool {
    let d1 = cross(b1, b2, a1);
    let d2 = cross(b1, b2, a2);
    let d3 = cross(a1, a2, b1);
    let d4 = cross(a1, a2, b2);
    d1 * d2 < 0.0 && d3 * d4 < 0.0
}
