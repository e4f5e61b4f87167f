//! Gateway split/merge pattern detection.

use bpmn_diagram::Id;
use rustc_hash::FxHashSet;

use super::graph::FlowGraph;

/// A gateway fan: a split, its branches and (for closed fans) the merge.
#[derive(Debug, Clone)]
pub struct GatewayPattern {
    /// The splitting gateway.
    pub split: Id,
    /// The merge all branches reconverge on, absent for open fans.
    pub merge: Option<Id>,
    /// Per branch, the elements on that branch in traversal order.
    ///
    /// For closed fans these are the elements strictly between split and
    /// merge; for open fans the elements exclusively reachable from the
    /// branch head.
    pub branches: Vec<Vec<Id>>,
}

impl GatewayPattern {
    /// Whether the fan reconverges.
    pub fn is_closed(&self) -> bool {
        self.merge.is_some()
    }
}

/// Detect gateway fans.
///
/// A gateway with at least two forward (non-back-edge) outgoing flows opens
/// a fan. Each branch is traced forward; the merge is the first node common
/// to every branch's reach, preferring gateways. With a merge, branch lists
/// stop there exclusively (closed fan); without one, each branch keeps only
/// what no other branch can also reach (open fan) and shared tails fall
/// through to predecessor-based placement.
pub fn detect_gateway_patterns(
    graph: &FlowGraph,
    back_edges: &FxHashSet<Id>,
) -> Vec<GatewayPattern> {
    let mut patterns = Vec::new();

    for (id, node) in graph.iter() {
        if !node.gateway {
            continue;
        }
        let heads: Vec<&Id> = node
            .outgoing
            .iter()
            .zip(&node.outgoing_flows)
            .filter(|(_, flow)| !back_edges.contains(*flow))
            .map(|(successor, _)| successor)
            .collect();
        if heads.len() < 2 {
            continue;
        }

        let reaches: Vec<Vec<&Id>> =
            heads.iter().map(|head| forward_reach(graph, head, id, back_edges)).collect();
        let merge = find_merge(graph, id, &reaches, back_edges);

        let branches = match &merge {
            Some(merge) => heads
                .iter()
                .map(|head| branch_until(graph, head, id, merge, back_edges))
                .collect(),
            None => exclusive_branches(&reaches),
        };

        patterns.push(GatewayPattern {
            split: id.clone(),
            merge: merge.cloned(),
            branches,
        });
    }

    patterns
}

/// Everything reachable forward from `from`, in BFS order, never expanding
/// back into the split or along back edges. Includes `from` itself.
fn forward_reach<'a>(
    graph: &'a FlowGraph,
    from: &'a Id,
    split: &Id,
    back_edges: &FxHashSet<Id>,
) -> Vec<&'a Id> {
    let mut seen: FxHashSet<&Id> = FxHashSet::default();
    let mut order: Vec<&'a Id> = Vec::new();
    let mut queue: std::collections::VecDeque<&'a Id> = [from].into();
    seen.insert(from);
    while let Some(id) = queue.pop_front() {
        if id == split && id != from {
            continue;
        }
        order.push(id);
        let Some(node) = graph.node(id) else { continue };
        for (successor, flow) in node.outgoing.iter().zip(&node.outgoing_flows) {
            if back_edges.contains(flow) || !seen.insert(successor) {
                continue;
            }
            queue.push_back(successor);
        }
    }
    order
}

/// The first node reachable from the split that every branch reaches,
/// preferring gateways.
fn find_merge<'a>(
    graph: &'a FlowGraph,
    split: &'a Id,
    reaches: &[Vec<&'a Id>],
    back_edges: &FxHashSet<Id>,
) -> Option<&'a Id> {
    let sets: Vec<FxHashSet<&Id>> =
        reaches.iter().map(|reach| reach.iter().copied().collect()).collect();

    let mut first_common: Option<&Id> = None;
    for candidate in forward_reach(graph, split, split, back_edges) {
        if candidate == split {
            continue;
        }
        if !sets.iter().all(|set| set.contains(candidate)) {
            continue;
        }
        if graph.node(candidate).is_some_and(|node| node.gateway) {
            return Some(candidate);
        }
        first_common = first_common.or(Some(candidate));
    }
    first_common
}

/// The elements of one closed-fan branch: a bounded depth-first walk from
/// the branch head that stops at the merge (exclusive) and at the split.
fn branch_until(
    graph: &FlowGraph,
    head: &Id,
    split: &Id,
    merge: &Id,
    back_edges: &FxHashSet<Id>,
) -> Vec<Id> {
    let mut seen: FxHashSet<&Id> = FxHashSet::default();
    let mut order: Vec<Id> = Vec::new();
    let mut stack: Vec<&Id> = vec![head];
    let budget = graph.len().saturating_mul(2);
    while let Some(id) = stack.pop() {
        if order.len() > budget {
            break;
        }
        if id == merge || id == split || !seen.insert(id) {
            continue;
        }
        order.push(id.clone());
        let Some(node) = graph.node(id) else { continue };
        // Reverse so the first successor is expanded first.
        for (successor, flow) in node.outgoing.iter().zip(&node.outgoing_flows).rev() {
            if !back_edges.contains(flow) {
                stack.push(successor);
            }
        }
    }
    order
}

/// For an open fan, reduce every branch to the elements no other branch
/// reaches.
fn exclusive_branches(reaches: &[Vec<&Id>]) -> Vec<Vec<Id>> {
    reaches
        .iter()
        .enumerate()
        .map(|(index, reach)| {
            reach
                .iter()
                .copied()
                .filter(|id| {
                    reaches
                        .iter()
                        .enumerate()
                        .filter(|(other, _)| *other != index)
                        .all(|(_, other_reach)| !other_reach.contains(id))
                })
                .cloned()
                .collect()
        })
        .collect()
}
