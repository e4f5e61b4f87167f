//! The default Manhattan connection router.
//!
//! Produces strictly orthogonal polylines between two shapes, docking at
//! border midpoints. This is the router behind
//! [`layout_connection`](crate::modeler::layout_connection) and the fallback
//! for everything the layered solver did not route.

use smallvec::smallvec;

use crate::geom::{
    Point, Rect, Side, WAYPOINT_TOLERANCE, Waypoints, build_z_route, deduplicate_waypoints,
};

/// Clearance used when a route has to wrap around its endpoints.
const DETOUR_MARGIN: f64 = 20.0;

/// Route an orthogonal polyline from `source` to `target`.
///
/// Every segment of the result is strictly horizontal or vertical.
pub fn route_orthogonal(source: Rect, target: Rect) -> Waypoints {
    let sc = source.center();
    let tc = target.center();
    let dx = tc.x - sc.x;
    let dy = tc.y - sc.y;

    let route = if dy.abs() <= WAYPOINT_TOLERANCE && target.left() >= source.right() {
        // Same row, target ahead: straight.
        smallvec![Point::new(source.right(), sc.y), Point::new(target.left(), sc.y)]
    } else if dx.abs() <= WAYPOINT_TOLERANCE
        && (target.top() >= source.bottom() || target.bottom() <= source.top())
    {
        // Same column: straight between the facing borders.
        if dy >= 0.0 {
            smallvec![Point::new(sc.x, source.bottom()), Point::new(sc.x, target.top())]
        } else {
            smallvec![Point::new(sc.x, source.top()), Point::new(sc.x, target.bottom())]
        }
    } else if target.left() > source.right() {
        // Target ahead: Z through the horizontal midline.
        build_z_route(source.right(), sc.y, target.left(), tc.y)
    } else if target.top() > source.bottom() || target.bottom() < source.top() {
        // Vertical clearance (forward or backward): Z through the vertical
        // midline between the shapes.
        let (exit, entry) = if dy >= 0.0 {
            (source.bottom(), target.top())
        } else {
            (source.top(), target.bottom())
        };
        let mid = (exit + entry) / 2.0;
        smallvec![
            Point::new(sc.x, exit),
            Point::new(sc.x, mid),
            Point::new(tc.x, mid),
            Point::new(tc.x, entry),
        ]
    } else if target.right() < source.left() {
        // Backward in the same band: U below both shapes.
        let below = source.bottom().max(target.bottom()) + DETOUR_MARGIN;
        let out = source.right() + DETOUR_MARGIN;
        let back = target.left() - DETOUR_MARGIN;
        smallvec![
            Point::new(source.right(), sc.y),
            Point::new(out, sc.y),
            Point::new(out, below),
            Point::new(back, below),
            Point::new(back, tc.y),
            Point::new(target.left(), tc.y),
        ]
    } else {
        // Overlapping shapes: nothing sensible to wrap around.
        smallvec![sc, tc]
    };

    deduplicate_waypoints(&route, WAYPOINT_TOLERANCE)
}

/// The border point where a connection toward `toward` docks on `rect`.
///
/// Picks the border by the dominant direction from the rect centre and docks
/// at that border's midpoint.
pub fn crop_endpoint(rect: Rect, toward: Point) -> Point {
    rect.side_center(dock_side(rect, toward))
}

/// The border of `rect` facing `toward`.
pub fn dock_side(rect: Rect, toward: Point) -> Side {
    let center = rect.center();
    let dx = toward.x - center.x;
    let dy = toward.y - center.y;
    if dx.abs() >= dy.abs() {
        if dx >= 0.0 { Side::Right } else { Side::Left }
    } else if dy >= 0.0 {
        Side::Bottom
    } else {
        Side::Top
    }
}
