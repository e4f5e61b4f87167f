//! Pre-layout snapshots.
//!
//! The modeler has two side-effects the engine must be able to undo: moving
//! flow nodes re-shuffles lane membership, and generic move behaviour would
//! detach boundary events from their hosts. Both are captured before the
//! pipeline mutates anything and restored (or consulted) afterwards.

use rustc_hash::FxHashSet;

use crate::element::{Id, ShapeKind};
use crate::geom::{Axis, Point, Rect, Side};
use crate::modeler::set_bounds_direct;
use crate::registry::Diagram;

/// A lane's identity and membership before layout.
#[derive(Debug, Clone)]
pub struct LaneSnapshot {
    /// The lane id.
    pub lane_id: Id,
    /// The lane's x position before layout.
    pub original_x: f64,
    /// The lane's y position before layout.
    pub original_y: f64,
    /// The members of the lane's `flowNodeRef` list before layout.
    pub node_ids: FxHashSet<Id>,
}

/// Capture all lanes of a pool, in registry order.
pub fn capture_lanes(diagram: &Diagram, pool: &Id) -> Vec<LaneSnapshot> {
    diagram
        .lanes_of(pool)
        .map(|lane| {
            let node_ids = match &lane.kind {
                ShapeKind::Lane { flow_node_refs } => flow_node_refs.iter().cloned().collect(),
                _ => FxHashSet::default(),
            };
            LaneSnapshot {
                lane_id: lane.id.clone(),
                original_x: lane.bounds.x,
                original_y: lane.bounds.y,
                node_ids,
            }
        })
        .collect()
}

/// A boundary event's attachment before layout.
#[derive(Debug, Clone)]
pub struct BoundarySnapshot {
    /// The boundary event id.
    pub id: Id,
    /// The host the event is attached to.
    pub host_id: Id,
    /// The host border the event sat on.
    pub border: Side,
    /// The fractional position of the event centre along that border.
    pub offset_on_border: f64,
}

/// Capture every boundary event's attachment, in registry order.
pub fn capture_boundaries(diagram: &Diagram) -> Vec<BoundarySnapshot> {
    diagram
        .shapes()
        .filter_map(|shape| {
            let host_id = shape.host()?.clone();
            let host = diagram.shape(&host_id)?.bounds;
            let border = nearest_border(host, shape.bounds.center());
            Some(BoundarySnapshot {
                id: shape.id.clone(),
                host_id,
                border,
                offset_on_border: border_offset(host, border, shape.bounds.center()),
            })
        })
        .collect()
}

impl BoundarySnapshot {
    /// Re-centre the boundary event on its host's border at the captured
    /// offset, wherever the host is now.
    ///
    /// Boundary events cannot go through `move_elements`, so this writes the
    /// bounds directly.
    pub fn restore(&self, diagram: &mut Diagram) {
        let Some(host) = diagram.shape(&self.host_id).map(|shape| shape.bounds) else {
            return;
        };
        let Some(event) = diagram.shape(&self.id).map(|shape| shape.bounds) else {
            return;
        };
        let center = border_point(host, self.border, self.offset_on_border);
        set_bounds_direct(diagram, &self.id, event.with_center(center));
    }
}

/// The host border a point is closest to, by normalised distance from the
/// host centre.
pub fn nearest_border(host: Rect, point: Point) -> Side {
    let center = host.center();
    let dx = (point.x - center.x) / host.w.max(1.0);
    let dy = (point.y - center.y) / host.h.max(1.0);
    if dx.abs() > dy.abs() {
        if dx >= 0.0 { Side::Right } else { Side::Left }
    } else if dy >= 0.0 {
        Side::Bottom
    } else {
        Side::Top
    }
}

/// The fractional position of `point` along the given border of `host`.
pub fn border_offset(host: Rect, border: Side, point: Point) -> f64 {
    let (start, extent) = match border.axis() {
        Axis::X => (host.left(), host.w),
        Axis::Y => (host.top(), host.h),
    };
    let along = match border.axis() {
        Axis::X => point.x,
        Axis::Y => point.y,
    };
    ((along - start) / extent.max(1.0)).clamp(0.0, 1.0)
}

/// The point on the given border of `host` at a fractional offset.
pub fn border_point(host: Rect, border: Side, offset: f64) -> Point {
    match border {
        Side::Top => Point::new(host.left() + offset * host.w, host.top()),
        Side::Bottom => Point::new(host.left() + offset * host.w, host.bottom()),
        Side::Left => Point::new(host.left(), host.top() + offset * host.h),
        Side::Right => Point::new(host.right(), host.top() + offset * host.h),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::DiagramBuilder;
    use crate::modeler::move_elements;

    #[test]
    fn test_boundary_snapshot_restores_after_host_move() {
        let mut diagram = DiagramBuilder::new()
            .task("host", 100.0, 100.0)
            .boundary_event("catch", "host")
            .finish();

        let snapshots = capture_boundaries(&diagram);
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].border, Side::Bottom);
        assert!((snapshots[0].offset_on_border - 0.5).abs() < 1e-9);

        move_elements(&mut diagram, &[Id::from("host")], Point::new(250.0, -40.0)).unwrap();
        // Knock the event off its border to prove restore fixes it.
        set_bounds_direct(
            &mut diagram,
            &Id::from("catch"),
            Rect::new(0.0, 0.0, 36.0, 36.0),
        );

        snapshots[0].restore(&mut diagram);
        let host = diagram.shape(&Id::from("host")).unwrap().bounds;
        let catch = diagram.shape(&Id::from("catch")).unwrap().bounds;
        assert_eq!(catch.center(), Point::new(host.left() + host.w / 2.0, host.bottom()));
    }

    #[test]
    fn test_lane_snapshot_captures_membership() {
        let diagram = DiagramBuilder::new()
            .participant("pool", Rect::new(0.0, 0.0, 600.0, 500.0))
            .lane("upper", "pool", Rect::new(30.0, 0.0, 570.0, 250.0), &["a", "b"])
            .lane("lower", "pool", Rect::new(30.0, 250.0, 570.0, 250.0), &[])
            .finish();

        let snapshots = capture_lanes(&diagram, &Id::from("pool"));
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].node_ids.len(), 2);
        assert_eq!(snapshots[0].original_y, 0.0);
        assert_eq!(snapshots[1].original_y, 250.0);
    }
}
