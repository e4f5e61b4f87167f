//! Longest-path layer assignment.

use std::collections::VecDeque;

use bpmn_diagram::Id;
use rustc_hash::{FxHashMap, FxHashSet};

use super::graph::FlowGraph;

/// The result of layering a flow graph.
#[derive(Debug, Clone, Default)]
pub struct Layering {
    /// The longest-path layer of every node.
    pub layers: FxHashMap<Id, usize>,
    /// All nodes, sorted by layer, then by original y.
    pub sorted: Vec<Id>,
}

impl Layering {
    /// The layer of a node; disconnected nodes sit at layer 0.
    pub fn layer(&self, id: &Id) -> usize {
        self.layers.get(id).copied().unwrap_or(0)
    }
}

/// Order the graph with a modified Kahn sweep, ignoring back edges.
///
/// Each node is assigned its longest-path distance from the sources. The
/// queue is seeded with zero-in-degree nodes, falling back to the graph's
/// start list when a residual cycle leaves none. Disconnected nodes keep
/// layer 0.
pub fn topological_sort(graph: &FlowGraph, back_edges: &FxHashSet<Id>) -> Layering {
    let mut in_degree: FxHashMap<&Id, usize> = FxHashMap::default();
    for (id, node) in graph.iter() {
        let forward = node
            .incoming_flows
            .iter()
            .filter(|flow| !back_edges.contains(*flow))
            .count();
        in_degree.insert(id, forward);
    }

    let mut layers: FxHashMap<Id, usize> = graph.ids().map(|id| (id.clone(), 0)).collect();

    let mut queue: VecDeque<&Id> =
        graph.ids().filter(|id| in_degree[id] == 0).collect();
    if queue.is_empty() {
        queue.extend(graph.starts.iter());
    }

    let mut enqueued: FxHashSet<&Id> = queue.iter().copied().collect();
    while let Some(id) = queue.pop_front() {
        let layer = layers[id];
        let node = graph.node(id).expect("node in graph");
        for (successor, flow) in node.outgoing.iter().zip(&node.outgoing_flows) {
            if back_edges.contains(flow) {
                continue;
            }
            // Longest path: only ever move a node to a later layer.
            if layer + 1 > layers[successor] {
                layers.insert(successor.clone(), layer + 1);
            }
            let remaining = in_degree.get_mut(successor).expect("successor in graph");
            *remaining = remaining.saturating_sub(1);
            if *remaining == 0 && enqueued.insert(successor) {
                queue.push_back(successor);
            }
        }
    }

    let mut sorted: Vec<Id> = graph.ids().cloned().collect();
    sorted.sort_by(|a, b| {
        layers[a].cmp(&layers[b]).then_with(|| {
            let ya = graph.node(a).map_or(0.0, |node| node.bounds.y);
            let yb = graph.node(b).map_or(0.0, |node| node.bounds.y);
            ya.total_cmp(&yb)
        })
    });

    Layering { layers, sorted }
}

#[cfg(test)]
mod tests {
    use super::super::cycles::detect_back_edges;
    use super::super::graph::extract_flow_graph;
    use super::*;
    use bpmn_diagram::{DiagramBuilder, GatewayKind};

    #[test]
    fn test_linear_extension_on_dag() {
        let diagram = DiagramBuilder::new()
            .start_event("s", 0.0, 0.0)
            .gateway("g", GatewayKind::Exclusive, 100.0, 0.0)
            .task("a", 200.0, -100.0)
            .task("b", 200.0, 100.0)
            .task("join", 400.0, 0.0)
            .flow("f1", "s", "g")
            .flow("f2", "g", "a")
            .flow("f3", "g", "b")
            .flow("f4", "a", "join")
            .flow("f5", "b", "join")
            .finish();

        let graph = extract_flow_graph(&diagram, None);
        let back = detect_back_edges(&graph);
        let layering = topological_sort(&graph, &back);

        // Every forward edge goes to a strictly later layer.
        for (id, node) in graph.iter() {
            for (successor, flow) in node.outgoing.iter().zip(&node.outgoing_flows) {
                if !back.contains(flow) {
                    assert!(layering.layer(id) < layering.layer(successor));
                }
            }
        }
        assert_eq!(layering.layer(&Id::from("s")), 0);
        assert_eq!(layering.layer(&Id::from("join")), 3);
    }

    #[test]
    fn test_longest_path_dominates() {
        // s -> a -> b -> e and a short-cut s -> e: e must sit after b.
        let diagram = DiagramBuilder::new()
            .start_event("s", 0.0, 0.0)
            .task("a", 100.0, 0.0)
            .task("b", 200.0, 0.0)
            .end_event("e", 300.0, 0.0)
            .flow("f1", "s", "a")
            .flow("f2", "a", "b")
            .flow("f3", "b", "e")
            .flow("f4", "s", "e")
            .finish();

        let graph = extract_flow_graph(&diagram, None);
        let layering = topological_sort(&graph, &FxHashSet::default());
        assert_eq!(layering.layer(&Id::from("e")), 3);
    }

    #[test]
    fn test_sorted_by_layer_then_y() {
        let diagram = DiagramBuilder::new()
            .start_event("s", 0.0, 100.0)
            .task("low", 100.0, 300.0)
            .task("high", 100.0, 0.0)
            .flow("f1", "s", "low")
            .flow("f2", "s", "high")
            .finish();

        let graph = extract_flow_graph(&diagram, None);
        let layering = topological_sort(&graph, &FxHashSet::default());
        assert_eq!(
            layering.sorted,
            vec![Id::from("s"), Id::from("high"), Id::from("low")]
        );
    }

    #[test]
    fn test_disconnected_nodes_stay_at_layer_zero() {
        let diagram = DiagramBuilder::new()
            .task("island", 500.0, 0.0)
            .start_event("s", 0.0, 0.0)
            .task("a", 100.0, 0.0)
            .flow("f1", "s", "a")
            .finish();

        let graph = extract_flow_graph(&diagram, None);
        let layering = topological_sort(&graph, &FxHashSet::default());
        assert_eq!(layering.layer(&Id::from("island")), 0);
    }
}
