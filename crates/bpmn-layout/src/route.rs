//! Connection routing after node placement.
//!
//! The solver routes what it can; boundary outflows, cross-pool message
//! flows, associations and self-loops get an explicit
//! fallback here, followed by the polish passes: parallel message-flow
//! spacing and a final orthogonal snap.

use bpmn_diagram::geom::{
    Point, Rect, Side, WAYPOINT_TOLERANCE, Waypoints, build_z_route,
};
use bpmn_diagram::modeler::{layout_connection, set_docking, update_waypoints};
use bpmn_diagram::snapshot::nearest_border;
use bpmn_diagram::{Diagram, Id, ShapeKind};
use rustc_hash::FxHashSet;
use smallvec::smallvec;

use crate::elk::{ElkNode, proxied_flow};
use crate::options::consts::{
    ENDPOINT_SNAP_TOLERANCE, MESSAGE_FLOW_STEP, PARALLEL_MESSAGE_TOLERANCE,
    SEGMENT_ORTHO_SNAP, SELF_LOOP_MARGIN_H, SELF_LOOP_MARGIN_V,
};

/// Convert the solver's edge sections into waypoints, diagram-wide.
///
/// Boundary proxy edges carry no real connection; they are skipped, and the
/// real boundary outflow gets its fallback route later. Returns the ids of
/// the connections that actually received a solver route, so the fallback
/// pass can pick up the rest.
pub fn apply_solver_routes(
    diagram: &mut Diagram,
    solved: &ElkNode,
    origin: Point,
) -> FxHashSet<Id> {
    let mut routed = FxHashSet::default();
    apply_node_routes(diagram, solved, origin, &mut routed);
    routed
}

fn apply_node_routes(
    diagram: &mut Diagram,
    node: &ElkNode,
    node_origin: Point,
    routed: &mut FxHashSet<Id>,
) {
    for edge in &node.edges {
        if proxied_flow(&edge.id).is_some() {
            continue;
        }
        let Some(section) = edge.sections.first() else { continue };

        let mut waypoints: Waypoints = Waypoints::new();
        waypoints.push(section.start_point + node_origin);
        for bend in &section.bend_points {
            waypoints.push(*bend + node_origin);
        }
        waypoints.push(section.end_point + node_origin);
        for waypoint in &mut waypoints {
            *waypoint = waypoint.rounded();
        }

        snap_sub_ortho(&mut waypoints);
        snap_straight_endpoints(diagram, &edge.id, &mut waypoints);

        if update_waypoints(diagram, &edge.id, &waypoints).is_ok() {
            let _ = set_docking(
                diagram,
                &edge.id,
                waypoints.first().copied(),
                waypoints.last().copied(),
            );
            routed.insert(edge.id.clone());
        }
    }

    for child in &node.children {
        let child_origin = node_origin
            + Point::new(child.x.unwrap_or_default(), child.y.unwrap_or_default());
        apply_node_routes(diagram, child, child_origin, routed);
    }
}

/// Snap near-orthogonal segments to strict orthogonal.
///
/// A segment whose smaller-axis delta is below [`SEGMENT_ORTHO_SNAP`] drags
/// its second point onto the first one's coordinate, propagating forward.
fn snap_sub_ortho(waypoints: &mut [Point]) {
    for i in 1..waypoints.len() {
        let previous = waypoints[i - 1];
        let dx = (waypoints[i].x - previous.x).abs();
        let dy = (waypoints[i].y - previous.y).abs();
        if dx < dy {
            if dx > 0.0 && dx < SEGMENT_ORTHO_SNAP {
                waypoints[i].x = previous.x;
            }
        } else if dy > 0.0 && dy < SEGMENT_ORTHO_SNAP {
            waypoints[i].y = previous.y;
        }
    }
}

/// For a straight horizontal two-point route near both centre lines, dock
/// exactly on the facing shape borders.
fn snap_straight_endpoints(diagram: &Diagram, id: &Id, waypoints: &mut Waypoints) {
    if waypoints.len() != 2 {
        return;
    }
    let Some(connection) = diagram.connection(id) else { return };
    let Some(source) = diagram.shape(&connection.source).map(|shape| shape.bounds) else {
        return;
    };
    let Some(target) = diagram.shape(&connection.target).map(|shape| shape.bounds) else {
        return;
    };

    let horizontal = (waypoints[0].y - waypoints[1].y).abs() <= WAYPOINT_TOLERANCE;
    if horizontal
        && (waypoints[0].y - source.center().y).abs() <= ENDPOINT_SNAP_TOLERANCE
        && (waypoints[1].y - target.center().y).abs() <= ENDPOINT_SNAP_TOLERANCE
    {
        waypoints[0] = Point::new(source.right(), source.center().y);
        waypoints[1] = Point::new(target.left(), target.center().y);
    }
}

/// Route everything the solver never sees.
///
/// Self-loops get their rectangular detour, boundary outflows an L-shape
/// from the host border, cross-pool message flows a vertical dog-leg (or
/// the default router when the pools overlap vertically), associations a
/// straight centre line.
pub fn route_fallbacks(diagram: &mut Diagram, scope: Option<&Id>) {
    let in_scope = |id: &Id| match scope {
        Some(scope) => diagram.is_inside(id, scope),
        None => true,
    };

    let ids: Vec<Id> = diagram
        .connections()
        .filter(|connection| in_scope(&connection.source) || in_scope(&connection.target))
        .map(|connection| connection.id.clone())
        .collect();

    for id in &ids {
        let Some(connection) = diagram.connection(id) else { continue };
        let source_id = connection.source.clone();
        let target_id = connection.target.clone();

        if source_id == target_id {
            route_self_loop(diagram, id, &source_id);
            continue;
        }
        if connection.is_association() {
            route_association(diagram, id, &source_id, &target_id);
            continue;
        }
        if connection.is_message_flow() {
            route_message_flow(diagram, id, &source_id, &target_id);
            continue;
        }
        let from_boundary = diagram
            .shape(&source_id)
            .is_some_and(|shape| shape.host().is_some());
        if from_boundary {
            route_boundary_outflow(diagram, id, &source_id, &target_id);
        }
    }
}

/// The explicit five-point self-loop: out the right side at the upper
/// quarter, around below, back in through the bottom centre.
fn route_self_loop(diagram: &mut Diagram, id: &Id, shape_id: &Id) {
    let Some(bounds) = diagram.shape(shape_id).map(|shape| shape.bounds) else { return };
    let exit_y = bounds.top() + bounds.h / 4.0;
    let out_x = bounds.right() + SELF_LOOP_MARGIN_H;
    let below_y = bounds.bottom() + SELF_LOOP_MARGIN_V;
    let route: Waypoints = smallvec![
        Point::new(bounds.right(), exit_y),
        Point::new(out_x, exit_y),
        Point::new(out_x, below_y),
        Point::new(bounds.center().x, below_y),
        Point::new(bounds.center().x, bounds.bottom()),
    ];
    // Keep the old route if the rewrite is rejected.
    let _ = update_waypoints(diagram, id, &route);
}

/// Associations draw as a straight line between the centres.
fn route_association(diagram: &mut Diagram, id: &Id, source: &Id, target: &Id) {
    let (Some(from), Some(to)) = (diagram.shape(source), diagram.shape(target)) else {
        return;
    };
    let route: Waypoints = smallvec![from.bounds.center(), to.bounds.center()];
    let _ = update_waypoints(diagram, id, &route);
}

/// Cross-pool message flows drop vertically, run across, and drop again.
/// Message flows whose endpoints overlap vertically go through the default
/// router instead.
fn route_message_flow(diagram: &mut Diagram, id: &Id, source: &Id, target: &Id) {
    let (Some(from), Some(to)) = (
        diagram.shape(source).map(|shape| shape.bounds),
        diagram.shape(target).map(|shape| shape.bounds),
    ) else {
        return;
    };

    let downward = to.top() > from.bottom();
    let upward = to.bottom() < from.top();
    if !downward && !upward {
        let _ = layout_connection(diagram, id);
        return;
    }

    let (exit, entry) = if downward {
        (from.bottom(), to.top())
    } else {
        (from.top(), to.bottom())
    };
    let mid = (exit + entry) / 2.0;
    let route: Waypoints = smallvec![
        Point::new(from.center().x, exit),
        Point::new(from.center().x, mid),
        Point::new(to.center().x, mid),
        Point::new(to.center().x, entry),
    ];
    let _ = update_waypoints(diagram, id, &route);
    let _ = set_docking(diagram, id, Some(from.center()), Some(to.center()));
}

/// A boundary outflow leaves the host border the event sits on and runs an
/// L to the target's entry edge.
fn route_boundary_outflow(diagram: &mut Diagram, id: &Id, boundary: &Id, target: &Id) {
    let Some(event) = diagram.shape(boundary) else { return };
    let Some(host) = event.host().and_then(|host| diagram.shape(host)) else { return };
    let Some(to) = diagram.shape(target).map(|shape| shape.bounds) else { return };

    let event_bounds = event.bounds;
    let border = nearest_border(host.bounds, event_bounds.center());

    let route: Waypoints = match border {
        Side::Bottom | Side::Top => {
            let exit = Point::new(event_bounds.center().x, event_bounds.side(border));
            if exit.x > to.left() && exit.x < to.right() {
                // Target straight below/above: drop into its facing border.
                let entry_y = if to.center().y >= exit.y { to.top() } else { to.bottom() };
                smallvec![exit, Point::new(exit.x, entry_y)]
            } else {
                let entry_x = if to.center().x >= exit.x { to.left() } else { to.right() };
                smallvec![
                    exit,
                    Point::new(exit.x, to.center().y),
                    Point::new(entry_x, to.center().y),
                ]
            }
        }
        Side::Left | Side::Right => {
            let exit = Point::new(event_bounds.side(border), event_bounds.center().y);
            if exit.y > to.top() && exit.y < to.bottom() {
                let entry_x = if to.center().x >= exit.x { to.left() } else { to.right() };
                smallvec![exit, Point::new(entry_x, exit.y)]
            } else {
                let entry_y = if to.center().y >= exit.y { to.top() } else { to.bottom() };
                smallvec![
                    exit,
                    Point::new(to.center().x, exit.y),
                    Point::new(to.center().x, entry_y),
                ]
            }
        }
    };
    let _ = update_waypoints(diagram, id, &route);
}

/// Spread the horizontal legs of parallel message-flow dog-legs.
///
/// Message flows whose source centres sit within
/// [`PARALLEL_MESSAGE_TOLERANCE`] of each other form a group; each group's
/// mid legs fan out by [`MESSAGE_FLOW_STEP`] around their mean.
pub fn space_parallel_message_flows(diagram: &mut Diagram) {
    let mut legs: Vec<(Id, f64, f64)> = diagram
        .connections()
        .filter(|connection| connection.is_message_flow())
        .filter_map(|connection| {
            let waypoints = &connection.waypoints;
            if waypoints.len() != 4 {
                return None;
            }
            let mid_is_horizontal =
                (waypoints[1].y - waypoints[2].y).abs() <= WAYPOINT_TOLERANCE;
            mid_is_horizontal.then(|| {
                (connection.id.clone(), waypoints[0].x, waypoints[1].y)
            })
        })
        .collect();
    legs.sort_by(|a, b| a.1.total_cmp(&b.1));

    let mut group_start = 0;
    while group_start < legs.len() {
        let mut group_end = group_start + 1;
        while group_end < legs.len()
            && legs[group_end].1 - legs[group_end - 1].1 <= PARALLEL_MESSAGE_TOLERANCE
        {
            group_end += 1;
        }

        let group = &legs[group_start..group_end];
        if group.len() >= 2 {
            let mean: f64 =
                group.iter().map(|(_, _, y)| *y).sum::<f64>() / group.len() as f64;
            for (slot, (id, _, _)) in group.iter().enumerate() {
                let offset =
                    (slot as f64 - (group.len() as f64 - 1.0) / 2.0) * MESSAGE_FLOW_STEP;
                rewrite_mid_leg(diagram, id, mean + offset);
            }
        }
        group_start = group_end;
    }
}

fn rewrite_mid_leg(diagram: &mut Diagram, id: &Id, y: f64) {
    let Some(connection) = diagram.connection(id) else { return };
    if connection.waypoints.len() != 4 {
        return;
    }
    let mut waypoints = connection.waypoints.clone();
    waypoints[1].y = y;
    waypoints[2].y = y;
    // Keep the dog-leg if the rewrite collapses it.
    let _ = update_waypoints(diagram, id, &waypoints);
}

/// The final orthogonal snap over every connection.
///
/// Segments already orthogonal within a pixel are left alone, truly
/// diagonal segments (both deltas at or above the snap tolerance) as well;
/// everything between gets its smaller delta zeroed.
pub fn snap_orthogonal_all(diagram: &mut Diagram) {
    let ids: Vec<Id> = diagram.connections().map(|connection| connection.id.clone()).collect();
    for id in &ids {
        let Some(connection) = diagram.connection(id) else { continue };
        let mut waypoints = connection.waypoints.clone();
        let mut changed = false;
        for i in 1..waypoints.len() {
            let previous = waypoints[i - 1];
            let dx = (waypoints[i].x - previous.x).abs();
            let dy = (waypoints[i].y - previous.y).abs();
            if dx.min(dy) < 1.0 {
                continue;
            }
            if dx >= SEGMENT_ORTHO_SNAP && dy >= SEGMENT_ORTHO_SNAP {
                continue;
            }
            if dx < dy {
                waypoints[i].x = previous.x;
            } else {
                waypoints[i].y = previous.y;
            }
            changed = true;
        }
        if changed {
            let _ = update_waypoints(diagram, id, &waypoints);
        }
    }
}

/// Repair connections bridging a re-laid-out subset and the untouched rest.
///
/// Same-row neighbours get a straight route, forward cross-row a Z, and
/// backward loop-backs a U around the subset's flow bounding box. The box
/// deliberately excludes participants and lanes.
pub fn repair_neighbour_edges(diagram: &mut Diagram, subset: &FxHashSet<Id>) {
    let scope_bbox = Rect::bbox(
        diagram
            .shapes()
            .filter(|shape| {
                shape.is_flow_node()
                    && !matches!(
                        shape.kind,
                        ShapeKind::Participant | ShapeKind::Lane { .. }
                    )
                    && subset.contains(&shape.id)
            })
            .map(|shape| shape.bounds),
    );
    let Some(scope_bbox) = scope_bbox else { return };

    let bridging: Vec<Id> = diagram
        .connections()
        .filter(|connection| {
            connection.is_sequence_flow()
                && (subset.contains(&connection.source) != subset.contains(&connection.target))
        })
        .map(|connection| connection.id.clone())
        .collect();

    for id in &bridging {
        let Some(connection) = diagram.connection(id) else { continue };
        let (Some(source), Some(target)) = (
            diagram.shape(&connection.source).map(|shape| shape.bounds),
            diagram.shape(&connection.target).map(|shape| shape.bounds),
        ) else {
            continue;
        };

        let same_row =
            (source.center().y - target.center().y).abs() <= ENDPOINT_SNAP_TOLERANCE;
        let forward = target.left() >= source.right();

        let route: Waypoints = if same_row && forward {
            smallvec![
                Point::new(source.right(), source.center().y),
                Point::new(target.left(), target.center().y),
            ]
        } else if forward {
            build_z_route(
                source.right(),
                source.center().y,
                target.left(),
                target.center().y,
            )
        } else {
            // Loop back around the subset's bounding box.
            let below = scope_bbox.bottom().max(source.bottom()).max(target.bottom())
                + SELF_LOOP_MARGIN_V;
            let out = source.right() + SELF_LOOP_MARGIN_H;
            let back = target.left() - SELF_LOOP_MARGIN_H;
            smallvec![
                Point::new(source.right(), source.center().y),
                Point::new(out, source.center().y),
                Point::new(out, below),
                Point::new(back, below),
                Point::new(back, target.center().y),
                Point::new(target.left(), target.center().y),
            ]
        };
        let _ = update_waypoints(diagram, id, &route);
    }
}
