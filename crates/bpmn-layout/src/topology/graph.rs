//! Flow-graph extraction.

use bpmn_diagram::geom::Rect;
use bpmn_diagram::{Diagram, Id};
use indexmap::IndexMap;

/// One node of a [`FlowGraph`].
#[derive(Debug, Clone, Default)]
pub struct FlowNode {
    /// The node's bounding box at extraction time.
    pub bounds: Rect,
    /// Whether the node is a gateway.
    pub gateway: bool,
    /// Predecessor node ids, in registry order of the flows.
    pub incoming: Vec<Id>,
    /// Successor node ids, in registry order of the flows.
    pub outgoing: Vec<Id>,
    /// The sequence flows arriving here, parallel to `incoming`.
    pub incoming_flows: Vec<Id>,
    /// The sequence flows leaving here, parallel to `outgoing`.
    pub outgoing_flows: Vec<Id>,
}

/// The sequence-flow graph of one container scope.
#[derive(Debug, Clone, Default)]
pub struct FlowGraph {
    nodes: IndexMap<Id, FlowNode>,
    /// Nodes without incoming flows, start-event kinds first, then by
    /// original y.
    pub starts: Vec<Id>,
    /// Nodes without outgoing flows, in node order.
    pub ends: Vec<Id>,
}

impl FlowGraph {
    /// The number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether the graph contains the node.
    pub fn contains(&self, id: &Id) -> bool {
        self.nodes.contains_key(id)
    }

    /// Look up a node.
    pub fn node(&self, id: &Id) -> Option<&FlowNode> {
        self.nodes.get(id)
    }

    /// All node ids, in extraction order.
    pub fn ids(&self) -> impl Iterator<Item = &Id> {
        self.nodes.keys()
    }

    /// All nodes with their ids, in extraction order.
    pub fn iter(&self) -> impl Iterator<Item = (&Id, &FlowNode)> {
        self.nodes.iter()
    }
}

/// Extract the flow graph of a container scope.
///
/// The nodes are the flow nodes directly contained in the container (or the
/// canvas root); children of the container's lanes count as direct. The
/// edges are the sequence flows with both endpoints in that node set.
pub fn extract_flow_graph(diagram: &Diagram, container: Option<&Id>) -> FlowGraph {
    let scope = container.unwrap_or(diagram.root());

    let mut graph = FlowGraph::default();
    for shape in diagram.children(scope) {
        if shape.is_flow_node() {
            graph.nodes.insert(
                shape.id.clone(),
                FlowNode {
                    bounds: shape.bounds,
                    gateway: shape.is_gateway(),
                    ..Default::default()
                },
            );
        } else if matches!(shape.kind, bpmn_diagram::ShapeKind::Lane { .. }) {
            for nested in diagram.children(&shape.id) {
                if nested.is_flow_node() {
                    graph.nodes.insert(
                        nested.id.clone(),
                        FlowNode {
                            bounds: nested.bounds,
                            gateway: nested.is_gateway(),
                            ..Default::default()
                        },
                    );
                }
            }
        }
    }

    for connection in diagram.connections() {
        if !connection.is_sequence_flow()
            || !graph.nodes.contains_key(&connection.source)
            || !graph.nodes.contains_key(&connection.target)
        {
            continue;
        }
        let source = connection.source.clone();
        let target = connection.target.clone();
        let node = &mut graph.nodes[&source];
        node.outgoing.push(target.clone());
        node.outgoing_flows.push(connection.id.clone());
        let node = &mut graph.nodes[&target];
        node.incoming.push(source);
        node.incoming_flows.push(connection.id.clone());
    }

    graph.starts = graph
        .nodes
        .iter()
        .filter(|(_, node)| node.incoming.is_empty())
        .map(|(id, _)| id.clone())
        .collect();
    graph.starts.sort_by(|a, b| {
        let start_a = diagram.shape(a).is_some_and(|shape| shape.is_start_event());
        let start_b = diagram.shape(b).is_some_and(|shape| shape.is_start_event());
        start_b
            .cmp(&start_a)
            .then_with(|| graph.nodes[a].bounds.y.total_cmp(&graph.nodes[b].bounds.y))
    });

    graph.ends = graph
        .nodes
        .iter()
        .filter(|(_, node)| node.outgoing.is_empty())
        .map(|(id, _)| id.clone())
        .collect();

    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use bpmn_diagram::DiagramBuilder;

    #[test]
    fn test_extract_simple_chain() {
        let diagram = DiagramBuilder::new()
            .start_event("s", 0.0, 0.0)
            .task("t", 100.0, 0.0)
            .end_event("e", 300.0, 0.0)
            .flow("f1", "s", "t")
            .flow("f2", "t", "e")
            .finish();

        let graph = extract_flow_graph(&diagram, None);
        assert_eq!(graph.len(), 3);
        assert_eq!(graph.starts, vec![Id::from("s")]);
        assert_eq!(graph.ends, vec![Id::from("e")]);
        let t = graph.node(&Id::from("t")).unwrap();
        assert_eq!(t.incoming, vec![Id::from("s")]);
        assert_eq!(t.outgoing_flows, vec![Id::from("f2")]);
    }

    #[test]
    fn test_starts_sorted_start_events_first_then_y() {
        let diagram = DiagramBuilder::new()
            .task("loose", 0.0, 10.0)
            .start_event("s_low", 0.0, 300.0)
            .start_event("s_high", 0.0, 50.0)
            .finish();

        let graph = extract_flow_graph(&diagram, None);
        assert_eq!(
            graph.starts,
            vec![Id::from("s_high"), Id::from("s_low"), Id::from("loose")]
        );
    }

    #[test]
    fn test_excludes_boundary_events_and_artifacts() {
        let diagram = DiagramBuilder::new()
            .task("t", 0.0, 0.0)
            .boundary_event("b", "t")
            .artifact("note", bpmn_diagram::ArtifactKind::TextAnnotation, 0.0, 200.0)
            .finish();

        let graph = extract_flow_graph(&diagram, None);
        assert_eq!(graph.len(), 1);
        assert!(graph.contains(&Id::from("t")));
    }
}
