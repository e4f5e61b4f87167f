//! The R-engine position table.
//!
//! A single forward sweep over the topologically sorted flow graph computes
//! a target centre for every node: start nodes stack at the origin, branch
//! elements fan out symmetrically around their split, merges re-align with
//! their split, and everything else follows its rightmost placed
//! predecessor.

use bpmn_diagram::Id;
use bpmn_diagram::geom::{Point, Rect};
use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::topology::{FlowGraph, GatewayPattern, Layering};

/// Inputs of the position sweep.
pub struct PositionConfig<'a> {
    /// The centre of the first start node.
    pub origin: Point,
    /// The gap between a node's right edge and its successor's left edge.
    pub gap: f64,
    /// The centre-to-centre distance between stacked branches.
    pub branch_spacing: f64,
    /// Elements placed by other passes (exception chains); never computed.
    pub exclude: &'a FxHashSet<Id>,
    /// Elements that keep their current position; successors flow on from
    /// there.
    pub pinned: &'a FxHashSet<Id>,
    /// Per-element lane centre y, overriding the computed y.
    pub lane_centers: Option<&'a FxHashMap<Id, f64>>,
}

/// The role a node plays in some gateway pattern.
struct PatternRole<'a> {
    pattern: &'a GatewayPattern,
    /// Branch index and the element preceding this one on the branch.
    branch: Option<(usize, Id)>,
}

/// Compute target bounds for every non-excluded node of the graph.
pub fn compute_positions(
    graph: &FlowGraph,
    layering: &Layering,
    back_edges: &FxHashSet<Id>,
    patterns: &[GatewayPattern],
    config: &PositionConfig,
) -> IndexMap<Id, Rect> {
    let mut placed: IndexMap<Id, Rect> = IndexMap::new();

    // Which pattern claims a node as merge, and which as branch element.
    let mut merges: FxHashMap<&Id, &GatewayPattern> = FxHashMap::default();
    let mut members: FxHashMap<&Id, PatternRole> = FxHashMap::default();
    for pattern in patterns {
        if let Some(merge) = &pattern.merge {
            merges.entry(merge).or_insert(pattern);
        }
        for (index, branch) in pattern.branches.iter().enumerate() {
            for (position, id) in branch.iter().enumerate() {
                let previous = match position {
                    0 => pattern.split.clone(),
                    _ => branch[position - 1].clone(),
                };
                members.entry(id).or_insert(PatternRole {
                    pattern,
                    branch: Some((index, previous)),
                });
            }
        }
    }

    let place =
        |placed: &mut IndexMap<Id, Rect>, id: &Id, center: Point| {
            let size = graph.node(id).map_or_else(Default::default, |node| node.bounds.size());
            placed.insert(id.clone(), Rect::from_center(center, size));
        };

    // Pre-place the start nodes, stacked below the origin.
    let mut start_slots = 0usize;
    for id in &graph.starts {
        if config.exclude.contains(id) {
            continue;
        }
        if config.pinned.contains(id) {
            place(&mut placed, id, current_center(graph, id));
            continue;
        }
        let center = Point::new(
            config.origin.x,
            config.origin.y + start_slots as f64 * config.branch_spacing,
        );
        place(&mut placed, id, center);
        start_slots += 1;
    }

    for id in &layering.sorted {
        if placed.contains_key(id) || config.exclude.contains(id) {
            continue;
        }
        if config.pinned.contains(id) {
            place(&mut placed, id, current_center(graph, id));
            continue;
        }

        let half_width =
            graph.node(id).map_or(0.0, |node| node.bounds.w / 2.0);

        let center = if let Some(pattern) = merges.get(id) {
            // Merge: back on the split's row, right of the widest branch.
            let split_center = placed
                .get(&pattern.split)
                .map_or(config.origin, |rect| rect.center());
            let branch_right = pattern
                .branches
                .iter()
                .flatten()
                .filter_map(|member| placed.get(member))
                .map(|rect| rect.right())
                .fold(f64::NEG_INFINITY, f64::max);
            let after = if branch_right.is_finite() {
                branch_right
            } else {
                placed.get(&pattern.split).map_or(config.origin.x, |rect| rect.right())
            };
            Point::new(after + config.gap + half_width, split_center.y)
        } else if let Some(PatternRole { pattern, branch: Some((index, previous)) }) =
            members.get(id)
        {
            // Branch element: fan out vertically around the split, advance
            // from the previous element on the branch.
            let split_center = placed
                .get(&pattern.split)
                .map_or(config.origin, |rect| rect.center());
            let count = pattern.branches.len();
            let offset =
                (*index as f64 - (count as f64 - 1.0) / 2.0) * config.branch_spacing;
            let previous_right = placed
                .get(previous)
                .map_or(split_center.x, |rect| rect.right());
            Point::new(previous_right + config.gap + half_width, split_center.y + offset)
        } else {
            // Plain successor: continue from the rightmost placed forward
            // predecessor. With several feeding branches, centre between
            // them instead of inheriting one branch's row.
            let predecessors: Vec<Rect> = graph
                .node(id)
                .map(|node| {
                    node.incoming
                        .iter()
                        .zip(&node.incoming_flows)
                        .filter(|(_, flow)| !back_edges.contains(*flow))
                        .filter_map(|(predecessor, _)| placed.get(predecessor))
                        .copied()
                        .collect()
                })
                .unwrap_or_default();

            match predecessors.len() {
                0 => {
                    // Disconnected: stack with the start nodes.
                    let center = Point::new(
                        config.origin.x,
                        config.origin.y + start_slots as f64 * config.branch_spacing,
                    );
                    start_slots += 1;
                    center
                }
                1 => {
                    let rect = predecessors[0];
                    Point::new(rect.right() + config.gap + half_width, rect.center().y)
                }
                _ => {
                    let rightmost = predecessors
                        .iter()
                        .copied()
                        .max_by(|a, b| a.right().total_cmp(&b.right()))
                        .unwrap_or_default();
                    let mean_y = predecessors.iter().map(|rect| rect.center().y).sum::<f64>()
                        / predecessors.len() as f64;
                    Point::new(rightmost.right() + config.gap + half_width, mean_y)
                }
            }
        };

        // A task assigned to a lane stays on its lane's row.
        let center = match config.lane_centers.and_then(|centers| centers.get(id)) {
            Some(&lane_y) => Point::new(center.x, lane_y),
            None => center,
        };

        place(&mut placed, id, center);
    }

    resolve_position_overlaps(&mut placed, config.branch_spacing);
    placed
}

fn current_center(graph: &FlowGraph, id: &Id) -> Point {
    graph.node(id).map_or(Point::zero(), |node| node.bounds.center())
}

/// Spread groups of nodes that landed on the identical spot.
///
/// Positions are grouped by rounded x, then rounded y; every group of two or
/// more elements on the same spot is fanned out symmetrically around that y
/// at half the branch spacing.
fn resolve_position_overlaps(placed: &mut IndexMap<Id, Rect>, branch_spacing: f64) {
    let mut groups: FxHashMap<(i64, i64), Vec<Id>> = FxHashMap::default();
    for (id, rect) in placed.iter() {
        let center = rect.center();
        let key = (center.x.round() as i64, center.y.round() as i64);
        groups.entry(key).or_default().push(id.clone());
    }

    let mut keys: Vec<(i64, i64)> = groups.keys().copied().collect();
    keys.sort_unstable();
    for key in keys {
        let group = &groups[&key];
        if group.len() < 2 {
            continue;
        }
        let spacing = branch_spacing / 2.0;
        let base = key.1 as f64;
        for (slot, id) in group.iter().enumerate() {
            let offset = (slot as f64 - (group.len() as f64 - 1.0) / 2.0) * spacing;
            if let Some(rect) = placed.get_mut(id) {
                *rect = rect.with_center(Point::new(rect.center().x, base + offset));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{
        detect_back_edges, detect_gateway_patterns, extract_flow_graph, topological_sort,
    };
    use bpmn_diagram::{DiagramBuilder, GatewayKind};

    fn config<'a>(
        exclude: &'a FxHashSet<Id>,
        pinned: &'a FxHashSet<Id>,
    ) -> PositionConfig<'a> {
        PositionConfig {
            origin: Point::new(180.0, 200.0),
            gap: 50.0,
            branch_spacing: 130.0,
            exclude,
            pinned,
            lane_centers: None,
        }
    }

    #[test]
    fn test_linear_chain_positions() {
        let diagram = DiagramBuilder::new()
            .start_event("s", 0.0, 0.0)
            .task("t1", 10.0, 0.0)
            .task("t2", 20.0, 0.0)
            .task("t3", 30.0, 0.0)
            .end_event("e", 40.0, 0.0)
            .flow("f1", "s", "t1")
            .flow("f2", "t1", "t2")
            .flow("f3", "t2", "t3")
            .flow("f4", "t3", "e")
            .finish();

        let graph = extract_flow_graph(&diagram, None);
        let back = detect_back_edges(&graph);
        let layering = topological_sort(&graph, &back);
        let patterns = detect_gateway_patterns(&graph, &back);
        let exclude = FxHashSet::default();
        let pinned = FxHashSet::default();
        let placed =
            compute_positions(&graph, &layering, &back, &patterns, &config(&exclude, &pinned));

        // centre_{i+1} = right_i + gap + width_{i+1} / 2, all on one row.
        assert_eq!(placed[&Id::from("s")].center(), Point::new(180.0, 200.0));
        assert_eq!(placed[&Id::from("t1")].center(), Point::new(298.0, 200.0));
        assert_eq!(placed[&Id::from("t2")].center(), Point::new(448.0, 200.0));
        assert_eq!(placed[&Id::from("t3")].center(), Point::new(598.0, 200.0));
        assert_eq!(placed[&Id::from("e")].center(), Point::new(716.0, 200.0));
    }

    #[test]
    fn test_diamond_positions() {
        let diagram = DiagramBuilder::new()
            .start_event("s", 0.0, 0.0)
            .task("r", 10.0, 0.0)
            .gateway("g1", GatewayKind::Exclusive, 20.0, 0.0)
            .task("a", 30.0, -10.0)
            .task("b", 30.0, 10.0)
            .gateway("g2", GatewayKind::Exclusive, 40.0, 0.0)
            .end_event("e", 50.0, 0.0)
            .flow("f1", "s", "r")
            .flow("f2", "r", "g1")
            .flow("f3", "g1", "a")
            .flow("f4", "g1", "b")
            .flow("f5", "a", "g2")
            .flow("f6", "b", "g2")
            .flow("f7", "g2", "e")
            .finish();

        let graph = extract_flow_graph(&diagram, None);
        let back = detect_back_edges(&graph);
        let layering = topological_sort(&graph, &back);
        let patterns = detect_gateway_patterns(&graph, &back);
        let exclude = FxHashSet::default();
        let pinned = FxHashSet::default();
        let placed =
            compute_positions(&graph, &layering, &back, &patterns, &config(&exclude, &pinned));

        // s(180) -> r right 348 -> g1 centre 423, branches ±65 around 200.
        let g1 = placed[&Id::from("g1")].center();
        assert_eq!(g1, Point::new(423.0, 200.0));
        let a = placed[&Id::from("a")].center();
        let b = placed[&Id::from("b")].center();
        assert_eq!(a, Point::new(548.0, 135.0));
        assert_eq!(b, Point::new(548.0, 265.0));
        // The merge comes back to the split's row, right of both branches.
        let g2 = placed[&Id::from("g2")].center();
        assert_eq!(g2, Point::new(673.0, 200.0));
        assert_eq!(placed[&Id::from("e")].center(), Point::new(766.0, 200.0));
    }

    #[test]
    fn test_three_branch_fan_rows() {
        let diagram = DiagramBuilder::new()
            .start_event("s", 0.0, 0.0)
            .gateway("g", GatewayKind::Parallel, 10.0, 0.0)
            .task("a", 20.0, -10.0)
            .task("b", 20.0, 0.0)
            .task("c", 20.0, 10.0)
            .flow("f1", "s", "g")
            .flow("f2", "g", "a")
            .flow("f3", "g", "b")
            .flow("f4", "g", "c")
            .finish();

        let graph = extract_flow_graph(&diagram, None);
        let back = detect_back_edges(&graph);
        let layering = topological_sort(&graph, &back);
        let patterns = detect_gateway_patterns(&graph, &back);
        let exclude = FxHashSet::default();
        let pinned = FxHashSet::default();
        let placed =
            compute_positions(&graph, &layering, &back, &patterns, &config(&exclude, &pinned));

        let ys: Vec<f64> = ["a", "b", "c"]
            .iter()
            .map(|id| placed[&Id::from(*id)].center().y)
            .collect();
        assert_eq!(ys, vec![70.0, 200.0, 330.0]);
        let xs: Vec<f64> = ["a", "b", "c"]
            .iter()
            .map(|id| placed[&Id::from(*id)].center().x)
            .collect();
        assert!(xs.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_pinned_elements_keep_position() {
        let diagram = DiagramBuilder::new()
            .start_event("s", 700.0, 400.0)
            .task("t", 10.0, 0.0)
            .flow("f", "s", "t")
            .finish();

        let graph = extract_flow_graph(&diagram, None);
        let layering = topological_sort(&graph, &FxHashSet::default());
        let exclude = FxHashSet::default();
        let mut pinned = FxHashSet::default();
        pinned.insert(Id::from("s"));
        let placed = compute_positions(
            &graph,
            &layering,
            &FxHashSet::default(),
            &[],
            &config(&exclude, &pinned),
        );

        // The pinned start keeps its spot; the successor flows from it.
        assert_eq!(placed[&Id::from("s")].center(), Point::new(718.0, 418.0));
        assert_eq!(placed[&Id::from("t")].center(), Point::new(836.0, 418.0));
    }

    #[test]
    fn test_overlap_resolution_spreads_identical_spots() {
        let mut placed: IndexMap<Id, Rect> = IndexMap::new();
        placed.insert(Id::from("a"), Rect::from_center(Point::new(100.0, 100.0), bpmn_diagram::geom::Size::new(100.0, 80.0)));
        placed.insert(Id::from("b"), Rect::from_center(Point::new(100.0, 100.0), bpmn_diagram::geom::Size::new(100.0, 80.0)));

        resolve_position_overlaps(&mut placed, 130.0);
        let a = placed[&Id::from("a")].center().y;
        let b = placed[&Id::from("b")].center().y;
        assert_eq!(a, 67.5);
        assert_eq!(b, 132.5);
    }
}
