//! Shared test fixtures: a minimal layered solver.

use bpmn_layout::elk::{ElkNode, ElkSection, LayeredSolver, SolverError};
use bpmn_layout::Id;
use bpmn_diagram::geom::{Point, Rect};
use rustc_hash::FxHashMap;

/// A deliberately simple layered solver: longest-path layering, children
/// stacked per layer, straight Z edge sections. Good enough to drive the
/// pipeline end to end without the production engine.
pub struct StackSolver;

const PADDING: f64 = 40.0;
const LAYER_GAP: f64 = 80.0;
const NODE_GAP: f64 = 60.0;

impl LayeredSolver for StackSolver {
    fn solve(&self, mut root: ElkNode) -> Result<ElkNode, SolverError> {
        solve_node(&mut root)?;
        Ok(root)
    }
}

fn solve_node(node: &mut ElkNode) -> Result<(), SolverError> {
    for child in &mut node.children {
        if !child.children.is_empty() {
            solve_node(child)?;
        }
    }
    if node.children.is_empty() {
        return Ok(());
    }

    let index: FxHashMap<Id, usize> = node
        .children
        .iter()
        .enumerate()
        .map(|(position, child)| (child.id.clone(), position))
        .collect();

    for edge in &node.edges {
        for endpoint in edge.sources.iter().chain(&edge.targets) {
            if !index.contains_key(endpoint) {
                return Err(SolverError::new(format!("unknown node {endpoint}")));
            }
        }
    }

    // Longest-path layers by bounded relaxation.
    let count = node.children.len();
    let mut layers = vec![0usize; count];
    for _ in 0..count {
        for edge in &node.edges {
            let (Some(&source), Some(&target)) =
                (index.get(&edge.sources[0]), index.get(&edge.targets[0]))
            else {
                continue;
            };
            if source != target && layers[source] + 1 > layers[target] {
                layers[target] = layers[source] + 1;
            }
        }
    }

    // Place layer by layer.
    let max_layer = layers.iter().copied().max().unwrap_or(0);
    let mut x = PADDING;
    let mut total_height = 0.0_f64;
    let mut rects: Vec<Rect> = vec![Rect::zero(); count];
    for layer in 0..=max_layer {
        let mut y = PADDING;
        let mut width = 0.0_f64;
        for (position, child) in node.children.iter_mut().enumerate() {
            if layers[position] != layer {
                continue;
            }
            let w = child.width.unwrap_or(100.0);
            let h = child.height.unwrap_or(80.0);
            child.x = Some(x);
            child.y = Some(y);
            rects[position] = Rect::new(x, y, w, h);
            y += h + NODE_GAP;
            width = width.max(w);
        }
        total_height = total_height.max(y - NODE_GAP);
        x += width + LAYER_GAP;
    }

    node.width = Some(x - LAYER_GAP + PADDING);
    node.height = Some(total_height + PADDING);

    // Straight or Z sections between facing borders.
    for edge in &mut node.edges {
        let (Some(&source), Some(&target)) =
            (index.get(&edge.sources[0]), index.get(&edge.targets[0]))
        else {
            continue;
        };
        if source == target {
            continue;
        }
        let from = rects[source];
        let to = rects[target];
        let start = Point::new(from.right(), from.center().y);
        let end = Point::new(to.left(), to.center().y);
        let bend_points = if (start.y - end.y).abs() <= 1.0 {
            Vec::new()
        } else {
            let mid = (start.x + end.x) / 2.0;
            vec![Point::new(mid, start.y), Point::new(mid, end.y)]
        };
        edge.sections = vec![ElkSection { start_point: start, bend_points, end_point: end }];
    }

    Ok(())
}

/// A solver that always fails, for error-path tests.
pub struct FailingSolver;

impl LayeredSolver for FailingSolver {
    fn solve(&self, _root: ElkNode) -> Result<ElkNode, SolverError> {
        Err(SolverError::new("solver exploded"))
    }
}
