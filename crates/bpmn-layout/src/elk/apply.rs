//! Applying solver positions back onto the diagram.

use bpmn_diagram::Diagram;
use bpmn_diagram::geom::{Point, Rect};
use bpmn_diagram::modeler::{move_elements, resize_shape};

use super::solver::ElkNode;
use crate::options::consts::{SIGNIFICANT_MOVE, SIGNIFICANT_RESIZE};

/// What position application did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Shapes moved by more than the significant-move threshold.
    pub moved: usize,
    /// Compounds resized by more than the significant-resize threshold.
    pub resized: usize,
}

/// Apply the solver result recursively.
///
/// Solver coordinates are parent-relative; `origin` anchors the root
/// children in diagram space. Every node is moved first, then its subtree
/// is applied, then the node is resized to the solver extent, in that
/// order so a compound's children land inside its final bounds and the
/// participant resize guard never trips.
pub fn apply_positions(diagram: &mut Diagram, solved: &ElkNode, origin: Point) -> ApplyReport {
    let mut report = ApplyReport::default();
    apply_children(diagram, solved, origin, &mut report);
    report
}

fn apply_children(
    diagram: &mut Diagram,
    node: &ElkNode,
    parent_origin: Point,
    report: &mut ApplyReport,
) {
    for child in &node.children {
        let (Some(x), Some(y)) = (child.x, child.y) else {
            apply_children(diagram, child, parent_origin, report);
            continue;
        };
        let target = parent_origin + Point::new(x, y);

        let Some(current) = diagram.shape(&child.id).map(|shape| shape.bounds) else {
            continue;
        };
        let delta = target - current.origin();
        if delta.hypot() > SIGNIFICANT_MOVE
            && move_elements(diagram, std::slice::from_ref(&child.id), delta).is_ok()
        {
            report.moved += 1;
        }

        apply_children(diagram, child, target, report);

        if let (Some(width), Some(height)) = (child.width, child.height) {
            let Some(current) = diagram.shape(&child.id).map(|shape| shape.bounds) else {
                continue;
            };
            if (current.w - width).abs() >= SIGNIFICANT_RESIZE
                || (current.h - height).abs() >= SIGNIFICANT_RESIZE
            {
                let resized = resize_shape(
                    diagram,
                    &child.id,
                    Rect::new(current.x, current.y, width, height),
                );
                if resized.is_ok() {
                    report.resized += 1;
                }
            }
        }
    }
}
