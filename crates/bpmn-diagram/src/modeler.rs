//! The modeler façade.
//!
//! Every geometry mutation of the diagram goes through the functions in this
//! module; they keep the diagram-interchange bounds, labels and lane
//! membership in sync. The layout engine never writes bounds anywhere else,
//! with one sanctioned exception: [`set_bounds_direct`] for boundary events
//! and column-mode lanes, where the regular behaviours would get in the way.

use ecow::EcoString;
use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::element::{Id, ShapeKind};
use crate::geom::{Point, Rect, WAYPOINT_TOLERANCE, deduplicate_waypoints};
use crate::orthogonal::route_orthogonal;
use crate::registry::Diagram;

/// An error raised by a modeler operation.
#[derive(Debug, Clone, Error)]
pub enum ModelerError {
    /// The referenced element does not exist or has the wrong kind.
    #[error("unknown element: {0}")]
    Unknown(Id),
    /// Boundary events may not be moved through `move_elements`; the generic
    /// attach behaviour would detach them from their host.
    #[error("boundary event {0} cannot be moved directly")]
    BoundaryMove(Id),
    /// The operation would violate a model invariant.
    #[error("operation rejected: {0}")]
    Rejected(EcoString),
    /// A connection must keep at least two waypoints.
    #[error("connection {0} would be left with fewer than two waypoints")]
    DegenerateWaypoints(Id),
}

/// Move shapes (and everything they carry) by `delta`.
///
/// The moved set is closed over descendants and attached boundary events, so
/// moving a container moves its contents once. Connections whose endpoints
/// both move are translated along. Flow nodes that end up over a different
/// lane of their pool are re-assigned in the lanes' `flowNodeRef` lists, a
/// side-effect callers snapshot around when they need the original
/// membership.
pub fn move_elements(diagram: &mut Diagram, ids: &[Id], delta: Point) -> Result<(), ModelerError> {
    if delta == Point::zero() || ids.is_empty() {
        return Ok(());
    }

    for id in ids {
        let shape = diagram.shape(id).ok_or_else(|| ModelerError::Unknown(id.clone()))?;
        if matches!(shape.kind, ShapeKind::BoundaryEvent { .. }) {
            return Err(ModelerError::BoundaryMove(id.clone()));
        }
    }

    // Close the moved set over descendants and attached boundary events.
    let mut seen: FxHashSet<Id> = FxHashSet::default();
    let mut moved: Vec<Id> = Vec::new();
    let mut stack: Vec<Id> = ids.to_vec();
    while let Some(id) = stack.pop() {
        if !seen.insert(id.clone()) {
            continue;
        }
        for child in diagram.children(&id) {
            stack.push(child.id.clone());
        }
        for boundary in diagram.boundaries_of(&id) {
            stack.push(boundary.id.clone());
        }
        moved.push(id);
    }

    for id in &moved {
        if let Some(shape) = diagram.shape_mut(id) {
            shape.bounds = shape.bounds.translate(delta);
            shape.di = shape.bounds;
            if let Some(label) = &mut shape.label {
                label.bounds = label.bounds.translate(delta);
                label.di = label.bounds;
            }
        }
    }

    // Translate connections contained in the moved set.
    let contained: Vec<Id> = diagram
        .connections()
        .filter(|c| seen.contains(&c.source) && seen.contains(&c.target))
        .map(|c| c.id.clone())
        .collect();
    for id in &contained {
        if let Some(connection) = diagram.connection_mut(id) {
            for waypoint in &mut connection.waypoints {
                *waypoint += delta;
            }
            for original in connection.original.iter_mut().flatten() {
                *original += delta;
            }
            if let Some(label) = &mut connection.label {
                label.bounds = label.bounds.translate(delta);
                label.di = label.bounds;
            }
        }
    }

    for id in &moved {
        reassign_lane(diagram, id);
    }

    Ok(())
}

/// Re-assign a flow node to the lane of its pool that now contains its
/// centre. Leaves membership alone when no lane contains the centre.
fn reassign_lane(diagram: &mut Diagram, id: &Id) {
    let Some(shape) = diagram.shape(id) else { return };
    if !shape.is_flow_node() {
        return;
    }
    let center = shape.bounds.center();

    // Find the enclosing pool.
    let mut pool = None;
    let mut current = shape.parent.clone();
    while let Some(current_id) = current {
        match diagram.shape(&current_id) {
            Some(parent) if parent.kind == ShapeKind::Participant => {
                pool = Some(current_id);
                break;
            }
            Some(parent) => current = parent.parent.clone(),
            None => break,
        }
    }
    let Some(pool) = pool else { return };

    let lanes: Vec<(Id, Rect)> =
        diagram.lanes_of(&pool).map(|lane| (lane.id.clone(), lane.bounds)).collect();
    let Some((target_lane, _)) =
        lanes.iter().find(|(_, bounds)| bounds.contains_point(center))
    else {
        return;
    };

    for (lane_id, _) in &lanes {
        let keep = lane_id == target_lane;
        if let Some(lane) = diagram.shape_mut(lane_id)
            && let ShapeKind::Lane { flow_node_refs } = &mut lane.kind
        {
            if keep {
                if !flow_node_refs.contains(id) {
                    tracing::trace!(node = %id, lane = %lane_id, "lane membership updated");
                    flow_node_refs.push(id.clone());
                }
            } else {
                flow_node_refs.retain(|node| node != id);
            }
        }
    }
}

/// Resize a shape to the given bounds.
///
/// Participants will not shrink below their children; lanes resized through
/// the modeler drag their siblings to the same width (pools tile lanes
/// equally on the horizontal axis).
pub fn resize_shape(diagram: &mut Diagram, id: &Id, bounds: Rect) -> Result<(), ModelerError> {
    let shape = diagram.shape(id).ok_or_else(|| ModelerError::Unknown(id.clone()))?;

    if shape.kind == ShapeKind::Participant {
        let children_bbox = Rect::bbox(
            diagram.children(id).filter(|child| child.is_flow_node()).map(|child| child.bounds),
        );
        if let Some(children_bbox) = children_bbox
            && !bounds.contains_rect(children_bbox)
        {
            return Err(ModelerError::Rejected(EcoString::from(
                "participant cannot shrink below its children",
            )));
        }
    }

    let sibling_width = match &shape.kind {
        ShapeKind::Lane { .. } => Some((shape.parent.clone(), bounds.x, bounds.w)),
        _ => None,
    };

    let shape = diagram.shape_mut(id).ok_or_else(|| ModelerError::Unknown(id.clone()))?;
    shape.bounds = bounds;
    shape.di = bounds;

    // The lane-resize behaviour: all lanes of a pool share x and width.
    if let Some((Some(pool), x, w)) = sibling_width {
        let siblings: Vec<Id> =
            diagram.lanes_of(&pool).map(|lane| lane.id.clone()).collect();
        for sibling in siblings {
            if let Some(lane) = diagram.shape_mut(&sibling) {
                lane.bounds.x = x;
                lane.bounds.w = w;
                lane.di = lane.bounds;
            }
        }
    }

    Ok(())
}

/// Replace a connection's waypoints.
///
/// The waypoints are deduplicated first and must keep at least two points.
pub fn update_waypoints(
    diagram: &mut Diagram,
    id: &Id,
    waypoints: &[Point],
) -> Result<(), ModelerError> {
    let deduplicated = deduplicate_waypoints(waypoints, WAYPOINT_TOLERANCE);
    if deduplicated.len() < 2 {
        return Err(ModelerError::DegenerateWaypoints(id.clone()));
    }
    let connection =
        diagram.connection_mut(id).ok_or_else(|| ModelerError::Unknown(id.clone()))?;
    connection.waypoints = deduplicated;
    Ok(())
}

/// Re-route a connection with the default orthogonal router, cropping the
/// endpoints to the shape borders.
pub fn layout_connection(diagram: &mut Diagram, id: &Id) -> Result<(), ModelerError> {
    let connection =
        diagram.connection(id).ok_or_else(|| ModelerError::Unknown(id.clone()))?;
    let source = diagram
        .shape(&connection.source)
        .ok_or_else(|| ModelerError::Unknown(connection.source.clone()))?
        .bounds;
    let target = diagram
        .shape(&connection.target)
        .ok_or_else(|| ModelerError::Unknown(connection.target.clone()))?
        .bounds;

    let waypoints = route_orthogonal(source, target);
    let connection =
        diagram.connection_mut(id).ok_or_else(|| ModelerError::Unknown(id.clone()))?;
    connection.waypoints = waypoints;
    connection.original = [Some(source.center()), Some(target.center())];
    Ok(())
}

/// Re-position an element's external label, keeping DI in sync.
///
/// Works for shapes and connections alike; elements without a label are
/// left untouched.
pub fn move_label(diagram: &mut Diagram, id: &Id, bounds: Rect) -> Result<(), ModelerError> {
    let label = match diagram.elements_label_mut(id) {
        Some(label) => label,
        None => return Err(ModelerError::Unknown(id.clone())),
    };
    label.bounds = bounds;
    label.di = bounds;
    Ok(())
}

/// Record the pre-cropped docking points of a connection's endpoints.
///
/// Interactive editors use these to re-crop a connection after one of its
/// endpoints moves; the engine refreshes them whenever it rewrites a route.
pub fn set_docking(
    diagram: &mut Diagram,
    id: &Id,
    start: Option<Point>,
    end: Option<Point>,
) -> Result<(), ModelerError> {
    let connection =
        diagram.connection_mut(id).ok_or_else(|| ModelerError::Unknown(id.clone()))?;
    connection.original = [start, end];
    Ok(())
}

/// Assign a flow node to a lane, removing it from the lane's siblings.
pub fn assign_to_lane(diagram: &mut Diagram, node: &Id, lane: &Id) -> Result<(), ModelerError> {
    let pool = diagram
        .shape(lane)
        .and_then(|shape| shape.parent.clone())
        .ok_or_else(|| ModelerError::Unknown(lane.clone()))?;

    let siblings: Vec<Id> = diagram.lanes_of(&pool).map(|sibling| sibling.id.clone()).collect();
    if !siblings.contains(lane) {
        return Err(ModelerError::Unknown(lane.clone()));
    }
    for sibling in siblings {
        let keep = &sibling == lane;
        if let Some(shape) = diagram.shape_mut(&sibling)
            && let ShapeKind::Lane { flow_node_refs } = &mut shape.kind
        {
            if keep {
                if !flow_node_refs.contains(node) {
                    flow_node_refs.push(node.clone());
                }
            } else {
                flow_node_refs.retain(|member| member != node);
            }
        }
    }
    Ok(())
}

/// Write bounds without any behaviours, keeping DI in sync.
///
/// This is the sanctioned bypass for boundary events (which `move_elements`
/// refuses) and column-mode lanes (where the equal-width behaviour of
/// [`resize_shape`] is wrong).
pub fn set_bounds_direct(diagram: &mut Diagram, id: &Id, bounds: Rect) {
    if let Some(shape) = diagram.shape_mut(id) {
        shape.bounds = bounds;
        shape.di = bounds;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::DiagramBuilder;
    use crate::geom::Rect;

    #[test]
    fn test_move_carries_children_and_boundaries() {
        let mut diagram = DiagramBuilder::new()
            .subprocess("sub", 0.0, 0.0)
            .task("inner", 50.0, 50.0)
            .parent("inner", "sub")
            .boundary_event("catch", "sub")
            .finish();

        move_elements(&mut diagram, &[Id::from("sub")], Point::new(100.0, 10.0)).unwrap();

        let sub = diagram.shape(&Id::from("sub")).unwrap();
        let inner = diagram.shape(&Id::from("inner")).unwrap();
        let catch = diagram.shape(&Id::from("catch")).unwrap();
        assert_eq!(sub.bounds.origin(), Point::new(100.0, 10.0));
        assert_eq!(inner.bounds.origin(), Point::new(150.0, 60.0));
        // The boundary event kept its spot on the host border.
        assert_eq!(catch.bounds.center(), Point::new(250.0, 210.0));
        assert_eq!(sub.di, sub.bounds);
    }

    #[test]
    fn test_move_rejects_boundary_events() {
        let mut diagram = DiagramBuilder::new()
            .task("host", 0.0, 0.0)
            .boundary_event("catch", "host")
            .finish();

        let result = move_elements(&mut diagram, &[Id::from("catch")], Point::new(10.0, 0.0));
        assert!(matches!(result, Err(ModelerError::BoundaryMove(_))));
    }

    #[test]
    fn test_move_reassigns_lanes() {
        let mut diagram = DiagramBuilder::new()
            .participant("pool", Rect::new(0.0, 0.0, 600.0, 500.0))
            .lane("upper", "pool", Rect::new(30.0, 0.0, 570.0, 250.0), &["a"])
            .lane("lower", "pool", Rect::new(30.0, 250.0, 570.0, 250.0), &[])
            .task("a", 100.0, 85.0)
            .parent("a", "pool")
            .finish();

        move_elements(&mut diagram, &[Id::from("a")], Point::new(0.0, 250.0)).unwrap();

        let upper = diagram.shape(&Id::from("upper")).unwrap();
        let lower = diagram.shape(&Id::from("lower")).unwrap();
        let ShapeKind::Lane { flow_node_refs: upper_refs } = &upper.kind else { panic!() };
        let ShapeKind::Lane { flow_node_refs: lower_refs } = &lower.kind else { panic!() };
        assert!(upper_refs.is_empty());
        assert_eq!(lower_refs.as_slice(), &[Id::from("a")]);
    }

    #[test]
    fn test_lane_resize_equalises_siblings() {
        let mut diagram = DiagramBuilder::new()
            .participant("pool", Rect::new(0.0, 0.0, 600.0, 500.0))
            .lane("upper", "pool", Rect::new(30.0, 0.0, 570.0, 250.0), &[])
            .lane("lower", "pool", Rect::new(30.0, 250.0, 570.0, 250.0), &[])
            .finish();

        resize_shape(&mut diagram, &Id::from("upper"), Rect::new(30.0, 0.0, 400.0, 250.0))
            .unwrap();

        let lower = diagram.shape(&Id::from("lower")).unwrap();
        assert_eq!(lower.bounds.w, 400.0);
    }

    #[test]
    fn test_participant_resize_respects_children() {
        let mut diagram = DiagramBuilder::new()
            .participant("pool", Rect::new(0.0, 0.0, 600.0, 300.0))
            .task("a", 400.0, 100.0)
            .parent("a", "pool")
            .finish();

        let shrink = resize_shape(&mut diagram, &Id::from("pool"), Rect::new(0.0, 0.0, 300.0, 300.0));
        assert!(matches!(shrink, Err(ModelerError::Rejected(_))));

        let grow = resize_shape(&mut diagram, &Id::from("pool"), Rect::new(0.0, 0.0, 800.0, 300.0));
        assert!(grow.is_ok());
    }

    #[test]
    fn test_update_waypoints_validates() {
        let mut diagram = DiagramBuilder::new()
            .task("a", 0.0, 0.0)
            .task("b", 300.0, 0.0)
            .flow("f", "a", "b")
            .finish();

        let collapsed = [Point::new(10.0, 10.0), Point::new(10.0, 10.0)];
        let result = update_waypoints(&mut diagram, &Id::from("f"), &collapsed);
        assert!(matches!(result, Err(ModelerError::DegenerateWaypoints(_))));
    }

    #[test]
    fn test_layout_connection_is_orthogonal_and_cropped() {
        let mut diagram = DiagramBuilder::new()
            .task("a", 0.0, 0.0)
            .task("b", 300.0, 200.0)
            .flow("f", "a", "b")
            .finish();

        layout_connection(&mut diagram, &Id::from("f")).unwrap();

        let connection = diagram.connection(&Id::from("f")).unwrap();
        assert_eq!(connection.waypoints.first(), Some(&Point::new(100.0, 40.0)));
        assert_eq!(connection.waypoints.last(), Some(&Point::new(300.0, 240.0)));
        for pair in connection.waypoints.windows(2) {
            assert!(pair[0].x == pair[1].x || pair[0].y == pair[1].y);
        }
        assert_eq!(connection.original[0], Some(Point::new(50.0, 40.0)));
    }
}
