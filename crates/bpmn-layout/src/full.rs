//! The E-engine: layered layout through the external solver, wrapped in
//! the post-processing pipeline.

use bpmn_diagram::geom::Point;
use bpmn_diagram::modeler::layout_connection;
use bpmn_diagram::snapshot::{BoundarySnapshot, capture_boundaries};
use bpmn_diagram::{Diagram, Id};
use ecow::eco_format;
use rustc_hash::FxHashSet;

use crate::crossing::detect_crossing_flows;
use crate::elk::{ElkNode, LayeredSolver, apply_positions, build_container_graph};
use crate::error::{LayoutError, LayoutResult};
use crate::lanes::layout_lanes;
use crate::options::{LayoutOptions, consts};
use crate::pipeline::{Cancellation, Pipeline, PipelineContext, Step};
use crate::rebuild::adjust_labels;
use crate::{artifacts, boundary, route, validate_scope};

/// What a full layout run found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutReport {
    /// The number of crossing connection pairs left after layout.
    pub crossing_flows: usize,
    /// The crossing pairs themselves.
    pub crossing_flow_pairs: Vec<(Id, Id)>,
}

struct FullCtx<'a> {
    diagram: &'a mut Diagram,
    options: LayoutOptions,
    solver: &'a dyn LayeredSolver,
    scope: Option<Id>,
    graph: Option<ElkNode>,
    solved: Option<ElkNode>,
    snapshots: Vec<BoundarySnapshot>,
    routed: FxHashSet<Id>,
    report: LayoutReport,
}

impl PipelineContext for FullCtx<'_> {
    fn diagram(&self) -> &Diagram {
        self.diagram
    }
}

impl FullCtx<'_> {
    /// Where solver coordinates are anchored in diagram space.
    fn origin(&self) -> Point {
        match self.scope.as_ref().and_then(|scope| self.diagram.shape(scope)) {
            Some(shape) => shape.bounds.origin(),
            None => {
                let (x, y) = consts::FULL_ORIGIN;
                Point::new(x, y)
            }
        }
    }
}

/// Lay out a diagram with the layered solver.
pub fn layout_diagram(
    diagram: &mut Diagram,
    solver: &dyn LayeredSolver,
    options: &LayoutOptions,
) -> LayoutResult<LayoutReport> {
    layout_diagram_with(diagram, solver, options, &Cancellation::new())
}

/// [`layout_diagram`] with an external cancellation flag.
pub fn layout_diagram_with(
    diagram: &mut Diagram,
    solver: &dyn LayeredSolver,
    options: &LayoutOptions,
    cancellation: &Cancellation,
) -> LayoutResult<LayoutReport> {
    validate_scope(diagram, options.scope_element_id.as_ref())?;

    let mut ctx = FullCtx {
        diagram,
        options: options.clone(),
        solver,
        scope: options.scope_element_id.clone(),
        graph: None,
        solved: None,
        snapshots: Vec::new(),
        routed: FxHashSet::default(),
        report: LayoutReport::default(),
    };

    let pipeline = Pipeline::new(vec![
        Step::new("capture-snapshots", capture_snapshots),
        Step::new("build-graph", build_graph),
        Step::new("solve", solve),
        Step::new("apply-positions", apply_solved_positions).tracked(),
        Step::new("apply-routes", apply_solved_routes),
        Step::new("finalise-lanes", finalise_lanes),
        Step::new("restore-boundaries", restore_boundaries).tracked(),
        Step::new("place-artifacts", place_artifacts),
        Step::new("route-connections", route_connections),
        Step::new("detect-crossings", detect_crossings),
    ]);
    pipeline.run(&mut ctx, cancellation)?;

    Ok(ctx.report)
}

fn capture_snapshots(ctx: &mut FullCtx) -> LayoutResult<()> {
    ctx.snapshots = capture_boundaries(ctx.diagram);
    Ok(())
}

fn build_graph(ctx: &mut FullCtx) -> LayoutResult<()> {
    ctx.graph =
        Some(build_container_graph(ctx.diagram, ctx.scope.as_ref(), &ctx.options));
    Ok(())
}

/// The pipeline's single suspension point: hand the tree to the solver and
/// block until it returns.
fn solve(ctx: &mut FullCtx) -> LayoutResult<()> {
    let graph = ctx.graph.take().unwrap_or_default();
    let solved = ctx
        .solver
        .solve(graph)
        .map_err(|error| LayoutError::Solver(eco_format!("{error}")))?;
    ctx.solved = Some(solved);
    Ok(())
}

fn apply_solved_positions(ctx: &mut FullCtx) -> LayoutResult<()> {
    let Some(solved) = ctx.solved.take() else { return Ok(()) };
    let origin = ctx.origin();
    apply_positions(ctx.diagram, &solved, origin);
    ctx.solved = Some(solved);
    Ok(())
}

fn apply_solved_routes(ctx: &mut FullCtx) -> LayoutResult<()> {
    let Some(solved) = ctx.solved.take() else { return Ok(()) };
    let origin = ctx.origin();
    ctx.routed = route::apply_solver_routes(ctx.diagram, &solved, origin);
    ctx.solved = Some(solved);
    Ok(())
}

fn finalise_lanes(ctx: &mut FullCtx) -> LayoutResult<()> {
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

fn restore_boundaries(ctx: &mut FullCtx) -> LayoutResult<()> {
    boundary::restore_boundaries(ctx.diagram, &ctx.snapshots);
    boundary::place_boundary_events(ctx.diagram, ctx.scope.as_ref());
    boundary::place_exception_chains(ctx.diagram, ctx.scope.as_ref(), ctx.options.gap());
    Ok(())
}

fn place_artifacts(ctx: &mut FullCtx) -> LayoutResult<()> {
    artifacts::place_artifacts(ctx.diagram, ctx.scope.as_ref());
    Ok(())
}

fn route_connections(ctx: &mut FullCtx) -> LayoutResult<()> {
    // Sequence flows the solver never routed (and that are not fallback
    // kinds) go through the default orthogonal router; node positions have
    // changed under them.
    let unrouted: Vec<Id> = ctx
        .diagram
        .connections()
        .filter(|connection| {
            connection.is_sequence_flow()
                && connection.source != connection.target
                && !ctx.routed.contains(&connection.id)
                && match &ctx.scope {
                    Some(scope) => {
                        ctx.diagram.is_inside(&connection.source, scope)
                            || ctx.diagram.is_inside(&connection.target, scope)
                    }
                    None => true,
                }
        })
        .map(|connection| connection.id.clone())
        .collect();
    for id in &unrouted {
        let from_boundary = ctx
            .diagram
            .connection(id)
            .and_then(|connection| ctx.diagram.shape(&connection.source))
            .is_some_and(|shape| shape.host().is_some());
        if !from_boundary {
            let _ = layout_connection(ctx.diagram, id);
        }
    }

    route::route_fallbacks(ctx.diagram, ctx.scope.as_ref());

    // In subset mode, repair the connections bridging into the untouched
    // rest of the diagram.
    if let Some(scope) = &ctx.scope {
        let subset: FxHashSet<Id> = ctx
            .diagram
            .shapes()
            .filter(|shape| shape.is_flow_node() && ctx.diagram.is_inside(&shape.id, scope))
            .map(|shape| shape.id.clone())
            .collect();
        route::repair_neighbour_edges(ctx.diagram, &subset);
    }

    route::space_parallel_message_flows(ctx.diagram);
    route::snap_orthogonal_all(ctx.diagram);
    adjust_labels(ctx.diagram, ctx.scope.as_ref());
    Ok(())
}

fn detect_crossings(ctx: &mut FullCtx) -> LayoutResult<()> {
    let report = detect_crossing_flows(ctx.diagram);
    ctx.report = LayoutReport {
        crossing_flows: report.count,
        crossing_flow_pairs: report.pairs,
    };
    Ok(())
}
