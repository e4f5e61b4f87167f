//! Artifact placement.
//!
//! Runs after node placement. Data objects and stores hang below the flow
//! element they are associated with, annotations float above it, unlinked
//! artifacts collect in rows above/below the whole flow, and groups wrap
//! their members.

use bpmn_diagram::geom::Rect;
use bpmn_diagram::modeler::{move_elements, resize_shape};
use bpmn_diagram::{
    ArtifactKind, Diagram, Id, ShapeKind, SpatialGrid, is_artifact_link,
};
use indexmap::IndexMap;

/// The horizontal gap between artifact siblings.
const ARTIFACT_GAP: f64 = 20.0;
/// The vertical clearance between an artifact and its linked element.
const ARTIFACT_OFFSET: f64 = 40.0;
/// The step used when nudging an artifact out of an overlap.
const SHIFT_STEP: f64 = 20.0;
/// The padding a group keeps around its members.
const GROUP_PADDING: f64 = 30.0;
/// Overlap resolution gives up after this many nudges.
const MAX_SHIFTS: usize = 200;

/// Place the artifacts of a scope.
pub fn place_artifacts(diagram: &mut Diagram, scope: Option<&Id>) {
    let in_scope = |id: &Id| match scope {
        Some(scope) => diagram.is_inside(id, scope),
        None => true,
    };
    let Some(flow_bbox) = diagram.flow_bbox(scope) else { return };

    // Group artifacts by the flow element they are associated with.
    let mut linked: IndexMap<Id, Vec<Id>> = IndexMap::new();
    let mut unlinked: Vec<Id> = Vec::new();
    let artifacts: Vec<Id> = diagram
        .shapes()
        .filter(|shape| {
            matches!(
                shape.kind,
                ShapeKind::Artifact(
                    ArtifactKind::DataObject
                        | ArtifactKind::DataStore
                        | ArtifactKind::TextAnnotation
                )
            ) && in_scope(&shape.id)
        })
        .map(|shape| shape.id.clone())
        .collect();

    for artifact in &artifacts {
        match linked_element(diagram, artifact) {
            Some(element) => linked.entry(element).or_default().push(artifact.clone()),
            None => unlinked.push(artifact.clone()),
        }
    }

    // Occupied space, indexed for cheap proximity queries: every flow node
    // up front, every placed artifact as it lands.
    let mut occupied = SpatialGrid::new();
    for shape in diagram.shapes() {
        if shape.is_flow_node() && in_scope(&shape.id) {
            occupied.insert(shape.id.clone(), shape.bounds);
        }
    }

    for (element, group) in &linked {
        let Some(anchor) = diagram.shape(element).map(|shape| shape.bounds) else {
            continue;
        };
        let (below, above): (Vec<&Id>, Vec<&Id>) = group.iter().partition(|artifact| {
            !matches!(
                diagram.shape(artifact).map(|shape| &shape.kind),
                Some(ShapeKind::Artifact(ArtifactKind::TextAnnotation))
            )
        });

        spread_siblings(diagram, &below, anchor, flow_bbox, &mut occupied, true);
        spread_siblings(diagram, &above, anchor, flow_bbox, &mut occupied, false);
    }

    place_unlinked(diagram, &unlinked, flow_bbox, &mut occupied);
    wrap_groups(diagram, scope, flow_bbox);
}

/// The flow element an artifact is associated with, if any.
fn linked_element(diagram: &Diagram, artifact: &Id) -> Option<Id> {
    diagram.connections().find_map(|connection| {
        if !is_artifact_link(connection.kind) {
            return None;
        }
        let other = if connection.source == *artifact {
            &connection.target
        } else if connection.target == *artifact {
            &connection.source
        } else {
            return None;
        };
        diagram.shape(other).filter(|shape| shape.is_flow_node()).map(|shape| shape.id.clone())
    })
}

/// Spread a group of siblings horizontally, centred on the anchor, below or
/// above it, dodging occupied space.
fn spread_siblings(
    diagram: &mut Diagram,
    siblings: &[&Id],
    anchor: Rect,
    flow_bbox: Rect,
    occupied: &mut SpatialGrid,
    below: bool,
) {
    if siblings.is_empty() {
        return;
    }

    let sizes: Vec<Rect> = siblings
        .iter()
        .filter_map(|id| diagram.shape(id))
        .map(|shape| shape.bounds)
        .collect();
    let total: f64 =
        sizes.iter().map(|rect| rect.w).sum::<f64>() + (sizes.len() - 1) as f64 * ARTIFACT_GAP;

    let mut x = anchor.center().x - total / 2.0;
    for (id, current) in siblings.iter().zip(&sizes) {
        let y = if below {
            anchor.bottom() + ARTIFACT_OFFSET
        } else {
            anchor.top() - ARTIFACT_OFFSET - current.h
        };
        let target = resolve_overlap(
            Rect::new(x, y, current.w, current.h),
            flow_bbox,
            occupied,
            below,
        );
        let delta = target.center() - current.center();
        let _ = move_elements(diagram, std::slice::from_ref(*id), delta);
        occupied.insert((*id).clone(), target);
        x += current.w + ARTIFACT_GAP;
    }
}

/// Nudge a rect out of occupied space: rightward while the horizontal budget
/// lasts, vertically otherwise.
///
/// The budget is `flow_max_x + search_height`: the flow bbox height doubles
/// as the width allowance, faithfully preserving the original behaviour.
fn resolve_overlap(rect: Rect, flow_bbox: Rect, occupied: &SpatialGrid, below: bool) -> Rect {
    let budget = flow_bbox.right() + flow_bbox.h;
    let start_x = rect.x;
    let mut rect = rect;
    for _ in 0..MAX_SHIFTS {
        let collides = occupied
            .candidates(rect, None)
            .iter()
            .filter_map(|id| occupied.bounds(id))
            .any(|other| other.overlaps(rect));
        if !collides {
            break;
        }
        if rect.right() + SHIFT_STEP <= budget {
            rect.x += SHIFT_STEP;
        } else {
            rect.x = start_x;
            rect.y += if below { SHIFT_STEP } else { -SHIFT_STEP };
        }
    }
    rect
}

/// Unlinked artifacts: annotations in a row above the flow, data references
/// in a row below it.
fn place_unlinked(
    diagram: &mut Diagram,
    unlinked: &[Id],
    flow_bbox: Rect,
    occupied: &mut SpatialGrid,
) {
    let mut top_x = flow_bbox.left();
    let mut bottom_x = flow_bbox.left();

    for id in unlinked {
        let Some(shape) = diagram.shape(id) else { continue };
        let current = shape.bounds;
        let annotation =
            matches!(shape.kind, ShapeKind::Artifact(ArtifactKind::TextAnnotation));

        let target = if annotation {
            let rect = Rect::new(
                top_x,
                flow_bbox.top() - ARTIFACT_OFFSET - current.h,
                current.w,
                current.h,
            );
            top_x += current.w + ARTIFACT_GAP;
            rect
        } else {
            let rect =
                Rect::new(bottom_x, flow_bbox.bottom() + ARTIFACT_OFFSET, current.w, current.h);
            bottom_x += current.w + ARTIFACT_GAP;
            rect
        };

        let target = resolve_overlap(target, flow_bbox, occupied, !annotation);
        let delta = target.center() - current.center();
        let _ = move_elements(diagram, std::slice::from_ref(id), delta);
        occupied.insert(id.clone(), target);
    }
}

/// Resize groups around their members, or clamp empty groups into the flow.
fn wrap_groups(diagram: &mut Diagram, scope: Option<&Id>, flow_bbox: Rect) {
    let groups: Vec<Id> = diagram
        .shapes()
        .filter(|shape| {
            matches!(shape.kind, ShapeKind::Artifact(ArtifactKind::Group { .. }))
                && match scope {
                    Some(scope) => diagram.is_inside(&shape.id, scope),
                    None => true,
                }
        })
        .map(|shape| shape.id.clone())
        .collect();

    for group in groups {
        let Some(shape) = diagram.shape(&group) else { continue };
        let current = shape.bounds;
        let members =
            Rect::bbox(diagram.group_members(shape).map(|member| member.bounds));
        match members {
            Some(bbox) => {
                if resize_shape(diagram, &group, bbox.expand(GROUP_PADDING)).is_err() {
                    tracing::trace!(group = %group, "group resize rejected");
                }
            }
            None => {
                // Nothing to wrap: keep the size, centre on the flow. If the
                // modeler rejects the move, the group keeps its spot.
                let delta = flow_bbox.center() - current.center();
                let _ = move_elements(diagram, std::slice::from_ref(&group), delta);
            }
        }
    }
}
