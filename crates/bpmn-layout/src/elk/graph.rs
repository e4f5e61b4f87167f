//! Building the solver's compound graph.

use bpmn_diagram::{Diagram, Id, ShapeKind};
use rustc_hash::FxHashSet;

use super::options::BpmnElkOptions;
use super::solver::{ElkEdge, ElkNode, proxy_id};
use crate::options::LayoutOptions;

/// Build the solver tree for a container (or the canvas root).
///
/// Children are the container's direct shapes minus infrastructure,
/// connections, artifacts, lanes and boundary events; participants and
/// expanded subprocesses with content recurse as compound nodes. Edges are
/// the connections fully inside the child set. Boundary events do not
/// become nodes: their outgoing flows turn into synthetic host→target proxy
/// edges so the solver still reserves space for the targets.
pub fn build_container_graph(
    diagram: &Diagram,
    container: Option<&Id>,
    options: &LayoutOptions,
) -> ElkNode {
    let scope = container.unwrap_or(diagram.root());
    let mut root = ElkNode { id: scope.clone(), ..Default::default() };
    if container.is_none() {
        root.layout_options = BpmnElkOptions::root(options).to_map();
    }

    // Direct children; flow nodes under a lane count as the pool's own.
    let mut child_ids: FxHashSet<Id> = FxHashSet::default();
    let mut order: Vec<Id> = Vec::new();
    let mut add = |id: &Id, set: &mut FxHashSet<Id>, order: &mut Vec<Id>| {
        if set.insert(id.clone()) {
            order.push(id.clone());
        }
    };
    for shape in diagram.children(scope) {
        match &shape.kind {
            ShapeKind::Infrastructure | ShapeKind::BoundaryEvent { .. } => {}
            ShapeKind::Artifact(_) => {}
            ShapeKind::Lane { .. } => {
                for nested in diagram.children(&shape.id) {
                    if nested.is_flow_node() {
                        add(&nested.id, &mut child_ids, &mut order);
                    }
                }
            }
            _ => add(&shape.id, &mut child_ids, &mut order),
        }
    }

    for id in &order {
        let Some(shape) = diagram.shape(id) else { continue };
        let compound = shape.is_container() && has_layoutable_content(diagram, id);
        let mut child = if compound {
            build_container_graph(diagram, Some(id), options)
        } else {
            ElkNode::leaf(id.clone(), shape.bounds.w, shape.bounds.h)
        };
        if compound {
            child.layout_options = container_options(diagram, shape, options).to_map();
        }
        root.children.push(child);
    }

    // Edges fully inside the child set.
    for connection in diagram.connections() {
        let relevant = connection.is_sequence_flow()
            || connection.is_message_flow()
            || connection.is_association();
        if relevant
            && child_ids.contains(&connection.source)
            && child_ids.contains(&connection.target)
        {
            root.edges.push(ElkEdge {
                id: connection.id.clone(),
                sources: vec![connection.source.clone()],
                targets: vec![connection.target.clone()],
                sections: Vec::new(),
            });
        }
    }

    // Boundary proxy edges.
    for shape in diagram.shapes() {
        let Some(host) = shape.host() else { continue };
        if !child_ids.contains(host) {
            continue;
        }
        for connection in diagram.connections_from(&shape.id) {
            if !connection.is_sequence_flow() || !child_ids.contains(&connection.target) {
                continue;
            }
            root.edges.push(ElkEdge {
                id: proxy_id(&connection.id),
                sources: vec![host.clone()],
                targets: vec![connection.target.clone()],
                sections: Vec::new(),
            });
        }
    }

    root
}

/// Whether a container has anything the solver should lay out.
fn has_layoutable_content(diagram: &Diagram, container: &Id) -> bool {
    diagram.children(container).any(|shape| {
        shape.is_flow_node()
            || (matches!(shape.kind, ShapeKind::Lane { .. })
                && diagram.children(&shape.id).any(|nested| nested.is_flow_node()))
    })
}

/// The per-variant option set of a compound child.
fn container_options(
    diagram: &Diagram,
    shape: &bpmn_diagram::Shape,
    options: &LayoutOptions,
) -> BpmnElkOptions {
    match &shape.kind {
        ShapeKind::Participant => {
            if diagram.lanes_of(&shape.id).next().is_some() {
                BpmnElkOptions::participant_with_lanes(options)
            } else {
                BpmnElkOptions::participant(options)
            }
        }
        _ if shape.is_event_subprocess() => BpmnElkOptions::event_subprocess(options),
        _ => BpmnElkOptions::subprocess(options),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bpmn_diagram::DiagramBuilder;
    use bpmn_diagram::geom::Rect;

    #[test]
    fn test_compound_recursion_and_edges() {
        let mut builder = DiagramBuilder::new();
        builder
            .participant("pool", Rect::new(0.0, 0.0, 600.0, 300.0))
            .task("a", 50.0, 100.0)
            .parent("a", "pool")
            .task("b", 300.0, 100.0)
            .parent("b", "pool")
            .flow("f", "a", "b");
        let diagram = builder.finish();

        let root = build_container_graph(&diagram, None, &LayoutOptions::default());
        assert_eq!(root.children.len(), 1);
        let pool = &root.children[0];
        assert_eq!(pool.id, Id::from("pool"));
        assert_eq!(pool.children.len(), 2);
        assert_eq!(pool.edges.len(), 1);
        assert!(pool.layout_options.contains_key("elk.padding"));
        // The flow lives in the pool, not at the root.
        assert!(root.edges.is_empty());
    }

    #[test]
    fn test_boundary_becomes_proxy_edge() {
        let mut builder = DiagramBuilder::new();
        builder
            .task("host", 0.0, 0.0)
            .task("target", 300.0, 200.0)
            .boundary_event("catch", "host")
            .flow("f", "catch", "target");
        let diagram = builder.finish();

        let root = build_container_graph(&diagram, None, &LayoutOptions::default());
        // The boundary event is not a node.
        assert!(root.children.iter().all(|child| child.id != Id::from("catch")));
        // Its outflow became host -> target.
        let proxy = root.edges.iter().find(|edge| edge.id.starts_with("__boundary_proxy__"));
        let proxy = proxy.expect("proxy edge");
        assert_eq!(proxy.sources, vec![Id::from("host")]);
        assert_eq!(proxy.targets, vec![Id::from("target")]);
    }

    #[test]
    fn test_lane_children_belong_to_pool() {
        let mut builder = DiagramBuilder::new();
        builder
            .participant("pool", Rect::new(0.0, 0.0, 600.0, 300.0))
            .lane("lane", "pool", Rect::new(30.0, 0.0, 570.0, 300.0), &["a"])
            .task("a", 50.0, 100.0)
            .parent("a", "lane");
        let diagram = builder.finish();

        let root = build_container_graph(&diagram, None, &LayoutOptions::default());
        let pool = &root.children[0];
        assert_eq!(pool.children.len(), 1);
        assert_eq!(pool.children[0].id, Id::from("a"));
        assert_eq!(pool.layout_options["elk.padding"], "[top=40,left=60,bottom=40,right=30]");
    }
}
