//! Automatic layout for BPMN 2.0 process diagrams.
//!
//! Given a diagram whose semantics are known but whose coordinates are
//! missing or poor, this crate computes final positions for every shape and
//! orthogonal waypoint polylines for every connection. Two engines produce
//! the same kind of output:
//!
//! - [`rebuild_layout`], the R-engine: a topology-driven rebuild that
//!   analyses the flow graph, detects cycles and gateway fans, assigns
//!   layers and places nodes with a single forward sweep. Deterministic,
//!   best for small and structured diagrams.
//! - [`layout_diagram`], the E-engine: Sugiyama-style layered layout
//!   delegated to an external [`LayeredSolver`], wrapped in a
//!   post-processing pipeline that snaps positions, finalises lanes,
//!   re-attaches boundary events, re-routes connections and reports the
//!   remaining edge crossings.
//!
//! Both engines mutate the diagram exclusively through the modeler façade
//! of [`bpmn_diagram`] and run single-threaded; the solver call is the only
//! suspension point.

pub mod elk;
pub mod topology;

mod artifacts;
mod boundary;
mod crossing;
mod error;
mod exception;
mod full;
mod hierarchy;
mod lanes;
mod options;
mod pipeline;
mod rebuild;
mod route;
mod strategy;

pub use bpmn_diagram::{Diagram, DiagramBuilder, Id};

pub use self::crossing::{
    CrossingReport, LaneMetrics, compute_lane_crossing_metrics, detect_crossing_flows,
    reduce_crossings,
};
pub use self::error::{LayoutError, LayoutResult};
pub use self::exception::{ExceptionChain, boundary_events, exception_chains};
pub use self::full::{LayoutReport, layout_diagram, layout_diagram_with};
pub use self::hierarchy::{Container, ContainerTree, build_container_hierarchy};
pub use self::options::{Compactness, LaneStrategy, LayoutOptions, consts};
pub use self::pipeline::{Cancellation, Pipeline, PipelineContext, Step};
pub use self::rebuild::{RebuildReport, rebuild_layout, rebuild_layout_with};
pub use self::strategy::{
    DiagramStats, Strategy, StrategyDecision, collect_stats, select_layout_strategy,
};
pub use self::elk::LayeredSolver;

use bpmn_diagram::ShapeKind;

/// Check that a scope id names a participant or an expanded subprocess.
pub(crate) fn validate_scope(
    diagram: &Diagram,
    scope: Option<&Id>,
) -> LayoutResult<()> {
    let Some(scope) = scope else { return Ok(()) };
    let valid = diagram.shape(scope).is_some_and(|shape| {
        shape.kind == ShapeKind::Participant || shape.is_expanded_subprocess()
    });
    if valid { Ok(()) } else { Err(LayoutError::InvalidScope(scope.clone())) }
}

/// The containers to rebuild, deepest first, restricted to a scope subtree.
pub(crate) fn scope_containers(
    diagram: &Diagram,
    tree: &ContainerTree,
    scope: Option<&Id>,
) -> Vec<Id> {
    tree.rebuild_order()
        .into_iter()
        .filter(|container| match scope {
            Some(scope) => diagram.is_inside(container, scope),
            None => true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_scope_is_reported() {
        let diagram = DiagramBuilder::new().task("t", 0.0, 0.0).finish();
        let options = LayoutOptions {
            scope_element_id: Some(Id::from("t")),
            ..Default::default()
        };
        let result = rebuild_layout(&mut diagram.clone(), &options);
        assert!(matches!(result, Err(LayoutError::InvalidScope(id)) if id == Id::from("t")));

        let missing = LayoutOptions {
            scope_element_id: Some(Id::from("nope")),
            ..Default::default()
        };
        let result = rebuild_layout(&mut diagram.clone(), &missing);
        assert!(matches!(result, Err(LayoutError::InvalidScope(_))));
    }

    #[test]
    fn test_empty_diagram_is_a_no_op() {
        let mut diagram = Diagram::new();
        let report = rebuild_layout(&mut diagram, &LayoutOptions::default()).unwrap();
        assert_eq!(report, RebuildReport::default());
    }
}
