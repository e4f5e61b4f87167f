//! Boundary-event post-processing.
//!
//! After nodes have moved, boundary events are re-attached to their hosts,
//! given a border and a spot on it, and their exception chains are laid out
//! as a row below (or above) the host, off the happy path.

use bpmn_diagram::geom::{Point, Rect, Side};
use bpmn_diagram::modeler::{move_elements, set_bounds_direct};
use bpmn_diagram::snapshot::{BoundarySnapshot, border_point};
use bpmn_diagram::{Diagram, Id};
use indexmap::IndexMap;
use rustc_hash::FxHashSet;

use crate::exception::{ExceptionChain, exception_chains};
use crate::options::consts::{BOUNDARY_CHAIN_GAP, ENDPOINT_SNAP_TOLERANCE};

/// Restore every captured boundary attachment.
///
/// Runs right after the solver moved the hosts around: each event goes back
/// to its original border at its original fractional offset.
pub fn restore_boundaries(diagram: &mut Diagram, snapshots: &[BoundarySnapshot]) {
    for snapshot in snapshots {
        snapshot.restore(diagram);
    }
}

/// Choose a border for every boundary event and place it there.
///
/// The default border is the bottom one; an event whose first outgoing flow
/// has a live target follows the dominant direction toward that target
/// instead. A lone event docks at the 2/3 position of its border, several
/// events on the same border spread evenly.
pub fn place_boundary_events(diagram: &mut Diagram, scope: Option<&Id>) {
    let in_scope = |id: &Id| match scope {
        Some(scope) => diagram.is_inside(id, scope),
        None => true,
    };

    // Group events per host and border.
    let mut groups: IndexMap<(Id, Side), Vec<Id>> = IndexMap::new();
    let events: Vec<(Id, Id)> = diagram
        .shapes()
        .filter_map(|shape| {
            let host = shape.host()?;
            (in_scope(host)).then(|| (shape.id.clone(), host.clone()))
        })
        .collect();

    for (event, host) in events {
        let Some(host_bounds) = diagram.shape(&host).map(|shape| shape.bounds) else {
            continue;
        };
        let border = choose_border(diagram, &event, host_bounds);
        groups.entry((host, border)).or_default().push(event);
    }

    for ((host, border), events) in &groups {
        let Some(host_bounds) = diagram.shape(host).map(|shape| shape.bounds) else {
            continue;
        };
        for (slot, event) in events.iter().enumerate() {
            let offset = if events.len() == 1 {
                2.0 / 3.0
            } else {
                (slot + 1) as f64 / (events.len() + 1) as f64
            };
            let center = border_point(host_bounds, *border, offset);
            let Some(bounds) = diagram.shape(event).map(|shape| shape.bounds) else {
                continue;
            };
            set_bounds_direct(diagram, event, bounds.with_center(center));
        }
    }
}

/// The border an event should sit on: bottom unless the first valid target
/// pulls it elsewhere.
fn choose_border(diagram: &Diagram, event: &Id, host: Rect) -> Side {
    let target = diagram
        .connections_from(event)
        .filter(|connection| connection.is_sequence_flow())
        .find_map(|connection| diagram.shape(&connection.target));
    let Some(target) = target else { return Side::Bottom };

    let delta = target.bounds.center() - host.center();
    if delta.y.abs() >= delta.x.abs() {
        if delta.y >= 0.0 { Side::Bottom } else { Side::Top }
    } else if delta.x >= 0.0 {
        Side::Right
    } else {
        Side::Left
    }
}

/// Lay out every exception chain of the scope.
///
/// A chain runs left to right beside its boundary event, on a common centre
/// line one chain gap below the event (above, for a top border), sized by
/// the tallest chain element. Off-path end events fed by the chain are
/// pulled onto the same secondary row.
pub fn place_exception_chains(diagram: &mut Diagram, scope: Option<&Id>, gap: f64) {
    let chains = exception_chains(diagram, scope);
    for chain in &chains {
        place_chain(diagram, chain, gap);
    }
}

fn place_chain(diagram: &mut Diagram, chain: &ExceptionChain, gap: f64) {
    if chain.elements.is_empty() {
        return;
    }
    let Some(event) = diagram.shape(&chain.boundary).map(|shape| shape.bounds) else {
        return;
    };
    let Some(host) = diagram
        .shape(&chain.boundary)
        .and_then(|shape| shape.host())
        .and_then(|host| diagram.shape(host))
        .map(|shape| shape.bounds)
    else {
        return;
    };

    let tallest = chain
        .elements
        .iter()
        .filter_map(|id| diagram.shape(id))
        .map(|shape| shape.bounds.h)
        .fold(0.0, f64::max);

    // Below the event by default; above when the event sits on the top
    // border.
    let above = event.center().y < host.center().y;
    let row = if above {
        event.center().y - BOUNDARY_CHAIN_GAP - tallest / 2.0
    } else {
        event.center().y + BOUNDARY_CHAIN_GAP + tallest / 2.0
    };

    let mut cursor = event.right() + gap;
    for id in &chain.elements {
        let Some(bounds) = diagram.shape(id).map(|shape| shape.bounds) else { continue };
        let target = Point::new(cursor + bounds.w / 2.0, row);
        let delta = target - bounds.center();
        let _ = move_elements(diagram, std::slice::from_ref(id), delta);
        cursor += bounds.w + gap;
    }

    align_off_path_ends(diagram, chain, row);
}

/// End events targeted by the chain but outside it join the secondary row.
fn align_off_path_ends(diagram: &mut Diagram, chain: &ExceptionChain, row: f64) {
    let members: FxHashSet<&Id> = chain.elements.iter().collect();
    let targets: Vec<Id> = chain
        .elements
        .iter()
        .flat_map(|member| diagram.connections_from(member))
        .filter(|connection| connection.is_sequence_flow())
        .map(|connection| connection.target.clone())
        .filter(|target| !members.contains(target))
        .collect();

    for target in targets {
        let Some(shape) = diagram.shape(&target) else { continue };
        if !shape.is_end_event() {
            continue;
        }
        let center = shape.bounds.center();
        if (center.y - row).abs() <= ENDPOINT_SNAP_TOLERANCE {
            continue;
        }
        let _ = move_elements(
            diagram,
            std::slice::from_ref(&target),
            Point::new(0.0, row - center.y),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bpmn_diagram::DiagramBuilder;
    use bpmn_diagram::snapshot::capture_boundaries;

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-6, "{actual} != {expected}");
    }

    #[test]
    fn test_boundary_restored_and_placed_at_two_thirds() {
        let mut builder = DiagramBuilder::new();
        builder.task("host", 300.0, 200.0).boundary_event("catch", "host");
        let mut diagram = builder.finish();

        let snapshots = capture_boundaries(&diagram);
        // Simulate the solver scattering things.
        set_bounds_direct(&mut diagram, &Id::from("catch"), Rect::new(0.0, 0.0, 36.0, 36.0));
        restore_boundaries(&mut diagram, &snapshots);
        place_boundary_events(&mut diagram, None);

        let host = diagram.shape(&Id::from("host")).unwrap().bounds;
        let catch = diagram.shape(&Id::from("catch")).unwrap().bounds;
        assert_close(catch.center().y, host.bottom());
        assert_close(catch.center().x, host.left() + host.w * 2.0 / 3.0);
    }

    #[test]
    fn test_two_events_spread_evenly() {
        let mut builder = DiagramBuilder::new();
        builder
            .task("host", 300.0, 200.0)
            .boundary_event("b1", "host")
            .boundary_event("b2", "host");
        let mut diagram = builder.finish();

        place_boundary_events(&mut diagram, None);

        let host = diagram.shape(&Id::from("host")).unwrap().bounds;
        let b1 = diagram.shape(&Id::from("b1")).unwrap().bounds.center();
        let b2 = diagram.shape(&Id::from("b2")).unwrap().bounds.center();
        assert_close(b1.x, host.left() + host.w / 3.0);
        assert_close(b2.x, host.left() + host.w * 2.0 / 3.0);
        assert_close(b1.y, host.bottom());
    }

    #[test]
    fn test_chain_runs_on_secondary_row() {
        let mut builder = DiagramBuilder::new();
        builder
            .start_event("s", 0.0, 200.0)
            .task("host", 100.0, 180.0)
            .boundary_event("catch", "host")
            .task("fix", 0.0, 400.0)
            .end_event("done", 160.0, 400.0)
            .flow("f1", "s", "host")
            .flow("f2", "catch", "fix")
            .flow("f3", "fix", "done");
        let mut diagram = builder.finish();

        place_boundary_events(&mut diagram, None);
        place_exception_chains(&mut diagram, None, 50.0);

        let catch = diagram.shape(&Id::from("catch")).unwrap().bounds;
        let fix = diagram.shape(&Id::from("fix")).unwrap().bounds;
        let done = diagram.shape(&Id::from("done")).unwrap().bounds;

        // Chain row sits one gap below the event, sized by the tallest
        // element.
        assert_close(fix.center().y, catch.center().y + 50.0 + 40.0);
        assert_close(done.center().y, fix.center().y);
        // Left to right from the event.
        assert_close(fix.left(), catch.right() + 50.0);
        assert_close(done.left(), fix.right() + 50.0);
    }
}
