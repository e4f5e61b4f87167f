//! The R-engine: a topology-driven deterministic rebuild.
//!
//! Analyses the flow graph per container, places every node with one
//! forward sweep, then runs the shared finishing passes: lanes, artifacts,
//! routing, boundary events, participant stacking.

mod position;

pub use self::position::{PositionConfig, compute_positions};

use bpmn_diagram::geom::{Axis, Point, Rect};
use bpmn_diagram::modeler::{layout_connection, move_elements, move_label, resize_shape};
use bpmn_diagram::{Diagram, Id, ShapeKind};
use rustc_hash::FxHashSet;
use tracing::debug;

use crate::crossing::detect_crossing_flows;
use crate::error::LayoutResult;
use crate::exception::exception_chains;
use crate::hierarchy::{ContainerTree, build_container_hierarchy};
use crate::lanes::{lane_center_map, layout_lanes};
use crate::options::{LayoutOptions, consts};
use crate::pipeline::{Cancellation, Pipeline, PipelineContext, Step};
use crate::topology::{
    detect_back_edges, detect_gateway_patterns, extract_flow_graph, topological_sort,
};
use crate::{artifacts, boundary, route, scope_containers, validate_scope};

/// What a rebuild run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildReport {
    /// Shapes moved further than the significant-move threshold.
    pub repositioned_count: usize,
    /// Connections that received a fresh route.
    pub rerouted_count: usize,
}

struct RebuildCtx<'a> {
    diagram: &'a mut Diagram,
    options: LayoutOptions,
    scope: Option<Id>,
    tree: ContainerTree,
    rerouted: FxHashSet<Id>,
    repositioned: usize,
}

impl PipelineContext for RebuildCtx<'_> {
    fn diagram(&self) -> &Diagram {
        self.diagram
    }
}

/// Rebuild the layout of a diagram (or of one scope container) from its
/// topology alone.
pub fn rebuild_layout(
    diagram: &mut Diagram,
    options: &LayoutOptions,
) -> LayoutResult<RebuildReport> {
    rebuild_layout_with(diagram, options, &Cancellation::new())
}

/// [`rebuild_layout`] with an external cancellation flag.
pub fn rebuild_layout_with(
    diagram: &mut Diagram,
    options: &LayoutOptions,
    cancellation: &Cancellation,
) -> LayoutResult<RebuildReport> {
    validate_scope(diagram, options.scope_element_id.as_ref())?;

    let mut ctx = RebuildCtx {
        diagram,
        options: options.clone(),
        scope: options.scope_element_id.clone(),
        tree: ContainerTree::default(),
        rerouted: FxHashSet::default(),
        repositioned: 0,
    };

    let pipeline = Pipeline::new(vec![
        Step::new("analyse-containers", analyse_containers),
        Step::new("position-nodes", position_nodes).tracked(),
        Step::new("layout-lanes", lanes_step),
        Step::new("place-artifacts", artifacts_step),
        Step::new("stack-participants", stack_participants)
            .skip_if(|ctx: &RebuildCtx| ctx.diagram.participants().count() < 2),
        Step::new("route-connections", route_step).tracked(),
        Step::new("space-message-flows", message_spacing_step),
        Step::new("adjust-labels", label_step),
        Step::new("detect-crossings", crossing_step),
    ]);
    pipeline.run(&mut ctx, cancellation)?;

    Ok(RebuildReport {
        repositioned_count: ctx.repositioned,
        rerouted_count: ctx.rerouted.len(),
    })
}

fn analyse_containers(ctx: &mut RebuildCtx) -> LayoutResult<()> {
    ctx.tree = build_container_hierarchy(ctx.diagram);
    Ok(())
}

/// Position every container's nodes, deepest containers first.
fn position_nodes(ctx: &mut RebuildCtx) -> LayoutResult<()> {
    let order = scope_containers(ctx.diagram, &ctx.tree, ctx.scope.as_ref());
    for container in order {
        rebuild_container(ctx, &container)?;
    }
    Ok(())
}

fn rebuild_container(ctx: &mut RebuildCtx, container: &Id) -> LayoutResult<()> {
    let root = container == ctx.diagram.root();
    let scope = (!root).then(|| container.clone());

    let graph = extract_flow_graph(ctx.diagram, scope.as_ref());
    if graph.is_empty() {
        return Ok(());
    }
    let back_edges = detect_back_edges(&graph);
    let layering = topological_sort(&graph, &back_edges);
    let patterns = detect_gateway_patterns(&graph, &back_edges);

    // Exception-chain members are placed beside their boundary events, not
    // by the sweep.
    let exclude: FxHashSet<Id> = exception_chains(ctx.diagram, scope.as_ref())
        .into_iter()
        .flat_map(|chain| chain.elements)
        .collect();
    let pinned = FxHashSet::default();

    let lane_centers = scope
        .as_ref()
        .filter(|id| {
            ctx.diagram
                .shape(id)
                .is_some_and(|shape| shape.kind == ShapeKind::Participant)
        })
        .map(|pool| lane_center_map(ctx.diagram, pool, ctx.options.direction));

    let config = PositionConfig {
        origin: container_origin(ctx.diagram, scope.as_ref()),
        gap: ctx.options.gap(),
        branch_spacing: ctx.options.branch_spacing(),
        exclude: &exclude,
        pinned: &pinned,
        lane_centers: lane_centers.as_ref(),
    };
    let placed = compute_positions(&graph, &layering, &back_edges, &patterns, &config);

    // The sweep works left to right; for top-down layouts the table is
    // transposed around the origin.
    let transpose = ctx.options.direction.axis() == Axis::Y;
    for (id, target) in &placed {
        let mut target = *target;
        if transpose {
            let center = target.center();
            let relative = center - config.origin;
            target = target
                .with_center(config.origin + Point::new(relative.y, relative.x));
        }
        let quantised = Point::new(
            ctx.options.quantise(target.x),
            ctx.options.quantise(target.y),
        );
        let delta = quantised - Point::new(
            ctx.diagram.shape(id).map_or(0.0, |shape| shape.bounds.x),
            ctx.diagram.shape(id).map_or(0.0, |shape| shape.bounds.y),
        );
        if delta.hypot() > consts::SIGNIFICANT_MOVE
            && move_elements(ctx.diagram, std::slice::from_ref(id), delta).is_ok()
        {
            ctx.repositioned += 1;
        }
    }

    // Forward flows first, back edges after.
    let mut forward: Vec<Id> = Vec::new();
    let mut backward: Vec<Id> = Vec::new();
    for (_, node) in graph.iter() {
        for flow in &node.outgoing_flows {
            if back_edges.contains(flow) {
                backward.push(flow.clone());
            } else {
                forward.push(flow.clone());
            }
        }
    }
    for flow in forward.iter().chain(&backward) {
        if layout_connection(ctx.diagram, flow).is_ok() {
            ctx.rerouted.insert(flow.clone());
        }
    }

    boundary::place_boundary_events(ctx.diagram, scope.as_ref());
    boundary::place_exception_chains(ctx.diagram, scope.as_ref(), ctx.options.gap());

    // A rebuilt subprocess wraps its children.
    if let Some(container_id) = &scope
        && ctx
            .diagram
            .shape(container_id)
            .is_some_and(|shape| shape.is_expanded_subprocess())
    {
        let children = Rect::bbox(
            ctx.diagram.children(container_id).map(|child| child.bounds),
        );
        if let Some(children) = children {
            let _ = resize_shape(
                ctx.diagram,
                container_id,
                children.expand(consts::SUBPROCESS_PADDING),
            );
        }
    }
    Ok(())
}

/// Where a container's flow starts.
fn container_origin(diagram: &Diagram, scope: Option<&Id>) -> Point {
    match scope.and_then(|id| diagram.shape(id)) {
        Some(shape) => {
            let bounds = shape.bounds;
            let label_band = match shape.kind {
                ShapeKind::Participant => consts::POOL_LABEL_BAND,
                _ => 0.0,
            };
            Point::new(
                bounds.x + label_band + consts::SUBPROCESS_PADDING + 18.0,
                bounds.y + (bounds.h / 2.0).max(consts::SUBPROCESS_PADDING + 18.0),
            )
        }
        None => {
            let (x, y) = consts::REBUILD_ORIGIN;
            Point::new(x, y)
        }
    }
}

fn lanes_step(ctx: &mut RebuildCtx) -> LayoutResult<()> {
    let pools: Vec<Id> = ctx.diagram.participants().map(|pool| pool.id.clone()).collect();
    for pool in pools {
        if let Some(scope) = &ctx.scope
            && !ctx.diagram.is_inside(&pool, scope)
        {
            continue;
        }
        layout_lanes(ctx.diagram, &pool, ctx.options.direction, ctx.options.lane_strategy);
    }
    Ok(())
}

fn artifacts_step(ctx: &mut RebuildCtx) -> LayoutResult<()> {
    artifacts::place_artifacts(ctx.diagram, ctx.scope.as_ref());
    Ok(())
}

/// Stack the participants along the cross axis with the pool gap.
fn stack_participants(ctx: &mut RebuildCtx) -> LayoutResult<()> {
    let mut pools: Vec<(Id, Rect)> = ctx
        .diagram
        .participants()
        .map(|pool| (pool.id.clone(), pool.bounds))
        .collect();
    if pools.len() < 2 {
        return Ok(());
    }
    pools.sort_by(|a, b| a.1.y.total_cmp(&b.1.y));

    let mut cursor = pools[0].1.y;
    for (pool, bounds) in &pools {
        let delta = Point::new(0.0, cursor - bounds.y);
        if delta.hypot() > consts::SIGNIFICANT_MOVE {
            let _ = move_elements(ctx.diagram, std::slice::from_ref(pool), delta);
        }
        cursor += bounds.h + consts::POOL_GAP;
    }
    Ok(())
}

/// Fresh routes for everything the per-container pass could not finish:
/// sequence flows displaced by the lane and stacking passes, self-loops,
/// boundary outflows, associations and message flows, plus the final
/// orthogonal snap.
fn route_step(ctx: &mut RebuildCtx) -> LayoutResult<()> {
    let flows: Vec<Id> = ctx
        .diagram
        .connections()
        .filter(|connection| connection.is_sequence_flow())
        .filter(|connection| connection.source != connection.target)
        .map(|connection| connection.id.clone())
        .collect();
    for flow in &flows {
        let from_boundary = ctx
            .diagram
            .connection(flow)
            .and_then(|connection| ctx.diagram.shape(&connection.source))
            .is_some_and(|shape| shape.host().is_some());
        if !from_boundary && layout_connection(ctx.diagram, flow).is_ok() {
            ctx.rerouted.insert(flow.clone());
        }
    }

    route::route_fallbacks(ctx.diagram, ctx.scope.as_ref());

    // In subset mode, connections bridging the re-laid-out scope and the
    // untouched rest need explicit repair.
    if let Some(scope) = &ctx.scope {
        let subset: FxHashSet<Id> = ctx
            .diagram
            .shapes()
            .filter(|shape| shape.is_flow_node() && ctx.diagram.is_inside(&shape.id, scope))
            .map(|shape| shape.id.clone())
            .collect();
        route::repair_neighbour_edges(ctx.diagram, &subset);
    }

    route::snap_orthogonal_all(ctx.diagram);
    Ok(())
}

fn message_spacing_step(ctx: &mut RebuildCtx) -> LayoutResult<()> {
    route::space_parallel_message_flows(ctx.diagram);
    Ok(())
}

fn label_step(ctx: &mut RebuildCtx) -> LayoutResult<()> {
    adjust_labels(ctx.diagram, ctx.scope.as_ref());
    Ok(())
}

fn crossing_step(ctx: &mut RebuildCtx) -> LayoutResult<()> {
    let report = detect_crossing_flows(ctx.diagram);
    debug!(crossings = report.count, "rebuild finished");
    Ok(())
}

/// Re-seat external labels: connection labels over the middle segment,
/// event and gateway labels below their shape.
pub(crate) fn adjust_labels(diagram: &mut Diagram, scope: Option<&Id>) {
    let connections: Vec<Id> = diagram
        .connections()
        .filter(|connection| {
            connection.label.is_some()
                && match scope {
                    Some(scope) => diagram.is_inside(&connection.source, scope),
                    None => true,
                }
        })
        .map(|connection| connection.id.clone())
        .collect();
    for id in connections {
        let Some(connection) = diagram.connection(&id) else { continue };
        let waypoints = &connection.waypoints;
        if waypoints.len() < 2 {
            continue;
        }
        let middle = (waypoints.len() - 1) / 2;
        let (a, b) = (waypoints[middle], waypoints[middle + 1]);
        let midpoint = (a + b) / 2.0;
        let horizontal = (a.y - b.y).abs() <= (a.x - b.x).abs();
        let Some(label) = connection.label.as_ref() else { continue };
        let size = label.bounds.size();
        let center = if horizontal {
            Point::new(midpoint.x, midpoint.y - consts::LABEL_GAP - size.h / 2.0)
        } else {
            Point::new(midpoint.x - consts::LABEL_GAP - size.w / 2.0, midpoint.y)
        };
        let _ = move_label(diagram, &id, Rect::from_center(center, size));
    }

    let shapes: Vec<Id> = diagram
        .shapes()
        .filter(|shape| {
            shape.label.is_some()
                && (matches!(shape.kind, ShapeKind::Event(_)) || shape.is_gateway())
                && match scope {
                    Some(scope) => diagram.is_inside(&shape.id, scope),
                    None => true,
                }
        })
        .map(|shape| shape.id.clone())
        .collect();
    for id in shapes {
        let Some(shape) = diagram.shape(&id) else { continue };
        let bounds = shape.bounds;
        let Some(label) = shape.label.as_ref() else { continue };
        let size = label.bounds.size();
        let center = Point::new(
            bounds.center().x,
            bounds.bottom() + consts::SHAPE_LABEL_GAP + size.h / 2.0,
        );
        let _ = move_label(diagram, &id, Rect::from_center(center, size));
    }
}
