//! Back-edge detection.

use bpmn_diagram::Id;
use rustc_hash::{FxHashMap, FxHashSet};

use super::graph::FlowGraph;

#[derive(Copy, Clone, Eq, PartialEq)]
enum Mark {
    White,
    Grey,
    Black,
}

/// Find the sequence flows that close cycles.
///
/// Depth-first search with tri-colour marking, seeded from the graph's
/// sorted start nodes so the search tree follows the natural forward
/// direction, then from any remaining unvisited node. An edge into a node
/// that is still on the DFS stack (grey) is a back edge.
pub fn detect_back_edges(graph: &FlowGraph) -> FxHashSet<Id> {
    let mut marks: FxHashMap<&Id, Mark> =
        graph.ids().map(|id| (id, Mark::White)).collect();
    let mut back_edges = FxHashSet::default();

    let seeds: Vec<&Id> = graph.starts.iter().chain(graph.ids()).collect();
    for seed in seeds {
        if marks[seed] != Mark::White {
            continue;
        }

        // Iterative DFS: one frame per grey node, tracking how many of its
        // successors have been expanded.
        let mut stack: Vec<(&Id, usize)> = vec![(seed, 0)];
        marks.insert(seed, Mark::Grey);
        while let Some(&(id, cursor)) = stack.last() {
            let node = graph.node(id).expect("node in graph");
            let Some(successor) = node.outgoing.get(cursor) else {
                marks.insert(id, Mark::Black);
                stack.pop();
                continue;
            };
            stack.last_mut().expect("frame").1 += 1;

            match marks[successor] {
                Mark::White => {
                    marks.insert(successor, Mark::Grey);
                    stack.push((successor, 0));
                }
                Mark::Grey => {
                    back_edges.insert(node.outgoing_flows[cursor].clone());
                }
                Mark::Black => {}
            }
        }
    }

    back_edges
}

#[cfg(test)]
mod tests {
    use super::super::graph::extract_flow_graph;
    use super::*;
    use bpmn_diagram::DiagramBuilder;

    #[test]
    fn test_no_back_edges_in_dag() {
        let diagram = DiagramBuilder::new()
            .start_event("s", 0.0, 0.0)
            .task("a", 100.0, 0.0)
            .task("b", 300.0, 0.0)
            .flow("f1", "s", "a")
            .flow("f2", "a", "b")
            .finish();

        let graph = extract_flow_graph(&diagram, None);
        assert!(detect_back_edges(&graph).is_empty());
    }

    #[test]
    fn test_loop_back_edge() {
        // s -> a -> b -> a closes a cycle through f3.
        let diagram = DiagramBuilder::new()
            .start_event("s", 0.0, 0.0)
            .task("a", 100.0, 0.0)
            .task("b", 300.0, 0.0)
            .flow("f1", "s", "a")
            .flow("f2", "a", "b")
            .flow("f3", "b", "a")
            .finish();

        let graph = extract_flow_graph(&diagram, None);
        let back = detect_back_edges(&graph);
        assert_eq!(back.len(), 1);
        assert!(back.contains(&Id::from("f3")));
    }

    #[test]
    fn test_forward_bias_from_start() {
        // Without seeding from the start event, a DFS beginning at b would
        // flag a->b instead of the actual loop-back b->a.
        let diagram = DiagramBuilder::new()
            .task("b", 300.0, 0.0)
            .task("a", 100.0, 0.0)
            .start_event("s", 0.0, 0.0)
            .flow("f3", "b", "a")
            .flow("f1", "s", "a")
            .flow("f2", "a", "b")
            .finish();

        let graph = extract_flow_graph(&diagram, None);
        let back = detect_back_edges(&graph);
        assert_eq!(back.len(), 1);
        assert!(back.contains(&Id::from("f3")));
    }

    #[test]
    fn test_self_loop_is_a_back_edge() {
        let diagram = DiagramBuilder::new()
            .task("a", 0.0, 0.0)
            .flow("f", "a", "a")
            .finish();

        let graph = extract_flow_graph(&diagram, None);
        let back = detect_back_edges(&graph);
        assert!(back.contains(&Id::from("f")));
    }
}
