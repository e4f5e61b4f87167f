//! Waypoint polyline helpers.

use smallvec::SmallVec;

use crate::geom::Point;

/// A connection's waypoint polyline.
pub type Waypoints = SmallVec<[Point; 4]>;

/// The default tolerance for waypoint equality, in pixels.
pub const WAYPOINT_TOLERANCE: f64 = 1.0;

/// Oscillation collapse runs at most this many passes.
const MAX_PASSES: usize = 20;

/// Copy a waypoint slice into a fresh polyline.
pub fn clone_waypoints(waypoints: &[Point]) -> Waypoints {
    waypoints.iter().copied().collect()
}

/// Remove duplicate and backtracking waypoints.
///
/// Beyond dropping adjacent duplicates, this collapses backtracking
/// oscillations: a sub-sequence `A → B → A` becomes `A`. One pass removes
/// adjacent duplicates; bounded follow-up passes mark every point pair
/// `(i - 1, i)` for which `pts[i]` revisits `pts[i - 2]` and drop all marked
/// points at once, until a pass changes nothing.
///
/// A `tolerance` of zero means strict equality; the default used throughout
/// the engine is [`WAYPOINT_TOLERANCE`].
pub fn deduplicate_waypoints(waypoints: &[Point], tolerance: f64) -> Waypoints {
    let eq = |a: Point, b: Point| {
        if tolerance == 0.0 {
            a.x == b.x && a.y == b.y
        } else {
            a.approx_eq(b, tolerance)
        }
    };

    let mut pts = Waypoints::new();
    for &p in waypoints {
        if pts.last().is_some_and(|&last| eq(last, p)) {
            continue;
        }
        pts.push(p);
    }

    for _ in 0..MAX_PASSES {
        let mut dropped = vec![false; pts.len()];
        for i in 2..pts.len() {
            if eq(pts[i], pts[i - 2]) {
                dropped[i - 1] = true;
                dropped[i] = true;
            }
        }
        if !dropped.iter().any(|&d| d) {
            break;
        }

        let mut kept = Waypoints::new();
        for (&p, &drop) in pts.iter().zip(&dropped) {
            if drop || kept.last().is_some_and(|&last| eq(last, p)) {
                continue;
            }
            kept.push(p);
        }
        pts = kept;
    }

    pts
}

/// Build an orthogonal Z-route between two horizontally facing dock points.
///
/// Degenerates to a straight two-point route when the centre ys align.
pub fn build_z_route(src_right: f64, src_cy: f64, tgt_left: f64, tgt_cy: f64) -> Waypoints {
    let mut route = Waypoints::new();
    route.push(Point::new(src_right, src_cy));
    if (src_cy - tgt_cy).abs() > WAYPOINT_TOLERANCE {
        let mid = (src_right + tgt_left) / 2.0;
        route.push(Point::new(mid, src_cy));
        route.push(Point::new(mid, tgt_cy));
    }
    route.push(Point::new(tgt_left, tgt_cy));
    route
}
