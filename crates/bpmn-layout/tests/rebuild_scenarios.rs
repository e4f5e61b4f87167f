//! End-to-end scenarios for the deterministic rebuild engine.

use bpmn_diagram::geom::{Point, Rect};
use bpmn_diagram::{DiagramBuilder, GatewayKind, ShapeKind};
use bpmn_layout::{Id, LayoutOptions, rebuild_layout};

fn center(diagram: &bpmn_layout::Diagram, id: &str) -> Point {
    diagram.shape(&Id::from(id)).unwrap().bounds.center()
}

#[test]
fn linear_chain_lands_on_one_row() {
    let mut diagram = DiagramBuilder::new()
        .start_event("s", 0.0, 0.0)
        .task("t1", 40.0, 90.0)
        .task("t2", 10.0, 30.0)
        .task("t3", 70.0, 60.0)
        .end_event("e", 20.0, 10.0)
        .flow("f1", "s", "t1")
        .flow("f2", "t1", "t2")
        .flow("f3", "t2", "t3")
        .flow("f4", "t3", "e")
        .finish();

    let report = rebuild_layout(&mut diagram, &LayoutOptions::default()).unwrap();

    // centre_{i+1} = right_i + gap + width_{i+1}/2 from the rebuild origin.
    assert_eq!(center(&diagram, "s"), Point::new(180.0, 200.0));
    assert_eq!(center(&diagram, "t1"), Point::new(298.0, 200.0));
    assert_eq!(center(&diagram, "t2"), Point::new(448.0, 200.0));
    assert_eq!(center(&diagram, "t3"), Point::new(598.0, 200.0));
    assert_eq!(center(&diagram, "e"), Point::new(716.0, 200.0));
    assert!(report.repositioned_count >= 4);
    assert_eq!(report.rerouted_count, 4);

    // Every sequence flow is strictly orthogonal with ≥2 distinct points.
    for connection in diagram.connections() {
        assert!(connection.waypoints.len() >= 2);
        for pair in connection.waypoints.windows(2) {
            assert!(!pair[0].approx_eq(pair[1], 1.0));
            assert!(pair[0].x == pair[1].x || pair[0].y == pair[1].y);
        }
    }
}

#[test]
fn exclusive_diamond_is_symmetric() {
    let mut diagram = DiagramBuilder::new()
        .start_event("s", 0.0, 0.0)
        .gateway("g1", GatewayKind::Exclusive, 10.0, 0.0)
        .task("a", 20.0, 0.0)
        .task("b", 30.0, 0.0)
        .gateway("g2", GatewayKind::Exclusive, 40.0, 0.0)
        .end_event("e", 50.0, 0.0)
        .flow("f1", "s", "g1")
        .flow("f2", "g1", "a")
        .flow("f3", "g1", "b")
        .flow("f4", "a", "g2")
        .flow("f5", "b", "g2")
        .flow("f6", "g2", "e")
        .finish();

    rebuild_layout(&mut diagram, &LayoutOptions::default()).unwrap();

    let g1 = center(&diagram, "g1");
    let a = center(&diagram, "a");
    let b = center(&diagram, "b");
    let g2 = center(&diagram, "g2");

    // Branches fan out symmetrically around the split's row.
    assert_eq!(a.y, g1.y - 65.0);
    assert_eq!(b.y, g1.y + 65.0);
    assert_eq!(a.x, b.x);
    // The merge returns to the split's row, right of both branches.
    assert_eq!(g2.y, g1.y);
    assert!(g2.x > a.x + 50.0);
}

#[test]
fn parallel_fan_rows() {
    let mut diagram = DiagramBuilder::new()
        .start_event("s", 0.0, 0.0)
        .gateway("g", GatewayKind::Parallel, 10.0, 0.0)
        .task("a", 20.0, 0.0)
        .task("b", 30.0, 40.0)
        .task("c", 40.0, 80.0)
        .flow("f1", "s", "g")
        .flow("f2", "g", "a")
        .flow("f3", "g", "b")
        .flow("f4", "g", "c")
        .finish();

    rebuild_layout(&mut diagram, &LayoutOptions::default()).unwrap();

    assert_eq!(center(&diagram, "a").y, 70.0);
    assert_eq!(center(&diagram, "b").y, 200.0);
    assert_eq!(center(&diagram, "c").y, 330.0);
    assert_eq!(center(&diagram, "a").x, center(&diagram, "b").x);
    assert_eq!(center(&diagram, "b").x, center(&diagram, "c").x);
}

#[test]
fn boundary_event_and_chain() {
    let mut diagram = DiagramBuilder::new()
        .start_event("s", 0.0, 0.0)
        .task("host", 10.0, 0.0)
        .end_event("e", 20.0, 0.0)
        .boundary_event("catch", "host")
        .task("fix", 250.0, 400.0)
        .flow("f1", "s", "host")
        .flow("f2", "host", "e")
        .flow("f3", "catch", "fix")
        .finish();

    rebuild_layout(&mut diagram, &LayoutOptions::default()).unwrap();

    let host = diagram.shape(&Id::from("host")).unwrap().bounds;
    let catch = diagram.shape(&Id::from("catch")).unwrap().bounds;
    let fix = diagram.shape(&Id::from("fix")).unwrap().bounds;

    // The boundary event's centre sits on the host border.
    assert!((catch.center().y - host.bottom()).abs() < 1.0);
    assert!(catch.center().x > host.left() && catch.center().x < host.right());
    // The chain hangs below the happy path, right of the event.
    assert!(fix.center().y > host.bottom());
    assert!(fix.left() >= catch.right());

    // The outflow leaves the host border downward.
    let flow = diagram.connection(&Id::from("f3")).unwrap();
    assert!(flow.waypoints[0].y >= catch.bottom() - 1.0);
}

#[test]
fn lane_row_mode_bands() {
    let mut builder = DiagramBuilder::new();
    builder
        .participant("pool", Rect::new(0.0, 0.0, 600.0, 0.0))
        .lane("l1", "pool", Rect::new(30.0, 0.0, 570.0, 100.0), &["a"])
        .lane("l2", "pool", Rect::new(30.0, 100.0, 570.0, 100.0), &["b"])
        .task("a", 100.0, 10.0)
        .parent("a", "pool")
        .task("b", 100.0, 110.0)
        .parent("b", "pool")
        .flow("f", "a", "b");
    let mut diagram = builder.finish();

    rebuild_layout(&mut diagram, &LayoutOptions::default()).unwrap();

    let pool = diagram.shape(&Id::from("pool")).unwrap().bounds;
    let l1 = diagram.shape(&Id::from("l1")).unwrap().bounds;
    let l2 = diagram.shape(&Id::from("l2")).unwrap().bounds;

    // Bands of max(content + 60, 250) tile the pool.
    assert_eq!(l1.h, 250.0);
    assert_eq!(l2.h, 250.0);
    assert_eq!(pool.h, 500.0);
    assert!((l1.bottom() - l2.top()).abs() < 1.0);
    assert_eq!(center(&diagram, "a").y, l1.center().y);
    assert_eq!(center(&diagram, "b").y, l2.center().y);
}

#[test]
fn single_start_event_sits_at_origin() {
    let mut diagram = DiagramBuilder::new().start_event("s", 500.0, 700.0).finish();
    rebuild_layout(&mut diagram, &LayoutOptions::default()).unwrap();
    assert_eq!(center(&diagram, "s"), Point::new(180.0, 200.0));
}

#[test]
fn expanded_subprocess_wraps_children() {
    let mut builder = DiagramBuilder::new();
    builder
        .start_event("s", 0.0, 0.0)
        .subprocess("sub", 10.0, 0.0)
        .start_event("inner_s", 20.0, 20.0)
        .parent("inner_s", "sub")
        .task("inner_t", 30.0, 20.0)
        .parent("inner_t", "sub")
        .flow("inner_f", "inner_s", "inner_t")
        .flow("f", "s", "sub");
    let mut diagram = builder.finish();

    rebuild_layout(&mut diagram, &LayoutOptions::default()).unwrap();

    let sub = diagram.shape(&Id::from("sub")).unwrap().bounds;
    for child in ["inner_s", "inner_t"] {
        let bounds = diagram.shape(&Id::from(child)).unwrap().bounds;
        assert!(sub.contains_rect(bounds), "{child} escaped the subprocess");
    }
}

#[test]
fn back_edge_keeps_forward_layout() {
    let mut diagram = DiagramBuilder::new()
        .start_event("s", 0.0, 0.0)
        .task("a", 10.0, 0.0)
        .task("b", 20.0, 0.0)
        .end_event("e", 30.0, 0.0)
        .flow("f1", "s", "a")
        .flow("f2", "a", "b")
        .flow("f3", "b", "a")
        .flow("f4", "b", "e")
        .finish();

    rebuild_layout(&mut diagram, &LayoutOptions::default()).unwrap();

    // The loop does not disturb the forward left-to-right order.
    assert!(center(&diagram, "s").x < center(&diagram, "a").x);
    assert!(center(&diagram, "a").x < center(&diagram, "b").x);
    assert!(center(&diagram, "b").x < center(&diagram, "e").x);
}

#[test]
fn grid_quantum_snaps_positions() {
    let mut diagram = DiagramBuilder::new()
        .start_event("s", 0.0, 0.0)
        .task("t", 10.0, 0.0)
        .flow("f", "s", "t")
        .finish();

    let options = LayoutOptions { grid_quantum: Some(20.0), ..Default::default() };
    rebuild_layout(&mut diagram, &options).unwrap();

    let t = diagram.shape(&Id::from("t")).unwrap().bounds;
    assert_eq!(t.x % 20.0, 0.0);
    assert_eq!(t.y % 20.0, 0.0);
}

#[test]
fn top_down_direction_transposes_the_sweep() {
    let mut diagram = DiagramBuilder::new()
        .start_event("s", 0.0, 0.0)
        .task("t", 10.0, 0.0)
        .task("u", 20.0, 0.0)
        .flow("f1", "s", "t")
        .flow("f2", "t", "u")
        .finish();

    let options = LayoutOptions {
        direction: bpmn_diagram::geom::Dir::TTB,
        ..Default::default()
    };
    rebuild_layout(&mut diagram, &options).unwrap();

    // The chain flows downward on one column instead of rightward.
    let s = center(&diagram, "s");
    let t = center(&diagram, "t");
    let u = center(&diagram, "u");
    assert_eq!(s.x, t.x);
    assert_eq!(t.x, u.x);
    assert!(s.y < t.y && t.y < u.y);
}

#[test]
fn participants_stack_with_the_pool_gap() {
    let mut builder = DiagramBuilder::new();
    builder
        .participant("p1", Rect::new(0.0, 40.0, 400.0, 200.0))
        .participant("p2", Rect::new(0.0, 400.0, 400.0, 180.0))
        .task("a", 100.0, 100.0)
        .parent("a", "p1")
        .task("b", 100.0, 460.0)
        .parent("b", "p2")
        .message_flow("m", "a", "b");
    let mut diagram = builder.finish();

    rebuild_layout(&mut diagram, &LayoutOptions::default()).unwrap();

    let p1 = diagram.shape(&Id::from("p1")).unwrap().bounds;
    let p2 = diagram.shape(&Id::from("p2")).unwrap().bounds;
    assert_eq!(p2.top(), p1.bottom() + 68.0);

    // The message flow drops from the upper pool into the lower one; with
    // the endpoints re-aligned onto one column the dog-leg degenerates to a
    // straight vertical run through the pool gap.
    let flow = diagram.connection(&Id::from("m")).unwrap();
    assert!(flow.waypoints.len() >= 3);
    let x = flow.waypoints[0].x;
    assert!(flow.waypoints.iter().all(|p| (p.x - x).abs() < 1.0));
    assert!(flow.waypoints[1].y > p1.bottom() && flow.waypoints[1].y < p2.top());
}

#[test]
fn labels_follow_their_elements() {
    let mut builder = DiagramBuilder::new();
    builder
        .start_event("s", 0.0, 0.0)
        .task("t", 10.0, 0.0)
        .flow("f", "s", "t")
        .label("s", 60.0, 14.0)
        .label("f", 40.0, 14.0);
    let mut diagram = builder.finish();

    rebuild_layout(&mut diagram, &LayoutOptions::default()).unwrap();

    let s = diagram.shape(&Id::from("s")).unwrap();
    let label = s.label.as_ref().unwrap();
    // The event label is re-seated below the event.
    assert_eq!(label.bounds.center().x, s.bounds.center().x);
    assert!(label.bounds.top() >= s.bounds.bottom());
    assert_eq!(label.di, label.bounds);

    // The flow label hovers near its (straight) segment.
    let flow = diagram.connection(&Id::from("f")).unwrap();
    let label = flow.label.as_ref().unwrap();
    let mid_x = (flow.waypoints[0].x + flow.waypoints[1].x) / 2.0;
    assert_eq!(label.bounds.center().x, mid_x);
    assert!(label.bounds.bottom() <= flow.waypoints[0].y);
}

#[test]
fn lanes_keep_partition_invariant() {
    let mut builder = DiagramBuilder::new();
    builder
        .participant("pool", Rect::new(0.0, 0.0, 600.0, 500.0))
        .lane("l1", "pool", Rect::new(30.0, 0.0, 570.0, 250.0), &["a"])
        .lane("l2", "pool", Rect::new(30.0, 250.0, 570.0, 250.0), &[])
        .task("a", 100.0, 85.0)
        .parent("a", "pool")
        .task("orphan", 100.0, 335.0)
        .parent("orphan", "pool");
    let mut diagram = builder.finish();

    rebuild_layout(&mut diagram, &LayoutOptions::default()).unwrap();

    // Every flow node in the pool belongs to exactly one lane.
    let mut seen = 0;
    for lane in ["l1", "l2"] {
        let shape = diagram.shape(&Id::from(lane)).unwrap();
        let ShapeKind::Lane { flow_node_refs } = &shape.kind else { panic!() };
        seen += flow_node_refs.len();
    }
    assert_eq!(seen, 2);
}
