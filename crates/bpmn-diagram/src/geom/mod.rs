//! Geometry primitives for diagram layout.

mod axes;
mod dir;
mod point;
mod polyline;
mod rect;
mod segment;
mod side;
mod size;

pub use self::axes::Axis;
pub use self::dir::Dir;
pub use self::point::Point;
pub use self::polyline::{
    WAYPOINT_TOLERANCE, Waypoints, build_z_route, clone_waypoints, deduplicate_waypoints,
};
pub use self::rect::Rect;
pub use self::segment::{segment_intersects_rect, segments_intersect};
pub use self::side::Side;
pub use self::size::Size;
