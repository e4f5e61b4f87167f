//! End-to-end runs of the layered (E-engine) pipeline with a small
//! in-tree solver.

mod common;

use bpmn_diagram::geom::Rect;
use bpmn_diagram::{DiagramBuilder, GatewayKind};
use bpmn_layout::{
    Cancellation, Id, LayoutError, LayoutOptions, Strategy, layout_diagram,
    layout_diagram_with, select_layout_strategy,
};
use common::{FailingSolver, StackSolver};

fn chain_fixture() -> bpmn_layout::Diagram {
    DiagramBuilder::new()
        .start_event("s", 0.0, 0.0)
        .task("t1", 5.0, 5.0)
        .gateway("g", GatewayKind::Exclusive, 10.0, 10.0)
        .task("t2", 15.0, 15.0)
        .end_event("e", 20.0, 20.0)
        .flow("f1", "s", "t1")
        .flow("f2", "t1", "g")
        .flow("f3", "g", "t2")
        .flow("f4", "t2", "e")
        .finish()
}

#[test]
fn full_layout_produces_clean_routes() {
    let mut diagram = chain_fixture();
    let report = layout_diagram(&mut diagram, &StackSolver, &LayoutOptions::default()).unwrap();

    // A simple chain lays out without crossings.
    assert_eq!(report.crossing_flows, 0);
    assert!(report.crossing_flow_pairs.is_empty());

    // Nodes flow left to right from the full-layout origin.
    let xs: Vec<f64> = ["s", "t1", "g", "t2", "e"]
        .iter()
        .map(|id| diagram.shape(&Id::from(*id)).unwrap().bounds.center().x)
        .collect();
    assert!(xs.windows(2).all(|pair| pair[0] < pair[1]), "not monotonic: {xs:?}");
    assert!(diagram.shape(&Id::from("s")).unwrap().bounds.x >= 180.0);

    // Universal invariants: enough waypoints, no near-duplicate neighbours.
    for connection in diagram.connections() {
        assert!(connection.waypoints.len() >= 2);
        for pair in connection.waypoints.windows(2) {
            assert!(!pair[0].approx_eq(pair[1], 1.0));
        }
    }
}

#[test]
fn solver_failure_aborts_the_pipeline() {
    let mut diagram = chain_fixture();
    let before: Vec<Rect> = diagram.shapes().map(|shape| shape.bounds).collect();

    let error =
        layout_diagram(&mut diagram, &FailingSolver, &LayoutOptions::default()).unwrap_err();
    let LayoutError::Step { name, source } = error else {
        panic!("expected a step failure");
    };
    assert_eq!(name, "solve");
    assert!(matches!(*source, LayoutError::Solver(_)));

    // Nothing moved: the failure struck before any position was applied.
    let after: Vec<Rect> = diagram.shapes().map(|shape| shape.bounds).collect();
    assert_eq!(before, after);
}

#[test]
fn cancellation_keeps_committed_state() {
    let mut diagram = chain_fixture();
    let cancellation = Cancellation::new();
    cancellation.cancel();

    let result = layout_diagram_with(
        &mut diagram,
        &StackSolver,
        &LayoutOptions::default(),
        &cancellation,
    );
    assert!(matches!(result, Err(LayoutError::Cancelled)));
}

#[test]
fn pool_is_resized_and_boundaries_reattached() {
    let mut builder = DiagramBuilder::new();
    builder
        .participant("pool", Rect::new(0.0, 0.0, 400.0, 300.0))
        .start_event("s", 10.0, 100.0)
        .parent("s", "pool")
        .task("host", 100.0, 100.0)
        .parent("host", "pool")
        .end_event("e", 300.0, 100.0)
        .parent("e", "pool")
        .boundary_event("catch", "host")
        .flow("f1", "s", "host")
        .flow("f2", "host", "e");
    let mut diagram = builder.finish();

    layout_diagram(&mut diagram, &StackSolver, &LayoutOptions::default()).unwrap();

    let pool = diagram.shape(&Id::from("pool")).unwrap().bounds;
    for id in ["s", "host", "e"] {
        let bounds = diagram.shape(&Id::from(id)).unwrap().bounds;
        assert!(pool.contains_rect(bounds), "{id} escaped the pool");
    }

    // The boundary event still straddles its host's border.
    let host = diagram.shape(&Id::from("host")).unwrap().bounds;
    let catch = diagram.shape(&Id::from("catch")).unwrap().bounds.center();
    let on_border = (catch.y - host.bottom()).abs() < 1.0
        || (catch.y - host.top()).abs() < 1.0
        || (catch.x - host.left()).abs() < 1.0
        || (catch.x - host.right()).abs() < 1.0;
    assert!(on_border, "boundary event not on host border");
}

#[test]
fn strategy_matches_diagram_shape() {
    let trivial = chain_fixture();
    assert_eq!(select_layout_strategy(&trivial).strategy, Strategy::Deterministic);

    let mut builder = DiagramBuilder::new();
    builder
        .participant("p1", Rect::new(0.0, 0.0, 400.0, 200.0))
        .participant("p2", Rect::new(0.0, 300.0, 400.0, 200.0));
    let collaboration = builder.finish();
    assert_eq!(
        select_layout_strategy(&collaboration).strategy,
        Strategy::Collaboration
    );
}

#[test]
fn scope_restricts_layout_to_a_container() {
    let mut builder = DiagramBuilder::new();
    builder
        .participant("pool", Rect::new(0.0, 0.0, 400.0, 300.0))
        .task("inside", 50.0, 100.0)
        .parent("inside", "pool")
        .task("outside", 1000.0, 1000.0);
    let mut diagram = builder.finish();

    let options = LayoutOptions {
        scope_element_id: Some(Id::from("pool")),
        ..Default::default()
    };
    layout_diagram(&mut diagram, &StackSolver, &options).unwrap();

    // The out-of-scope task never moves.
    let outside = diagram.shape(&Id::from("outside")).unwrap().bounds;
    assert_eq!(outside.origin(), bpmn_diagram::geom::Point::new(1000.0, 1000.0));
}
