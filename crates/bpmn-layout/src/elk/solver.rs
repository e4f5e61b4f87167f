//! The layered-solver interface.
//!
//! The solver itself is an external black box; this module pins down the
//! interchange tree it consumes and produces. All coordinates in the tree
//! are relative to the parent node.

use bpmn_diagram::Id;
use bpmn_diagram::geom::Point;
use ecow::EcoString;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A node of the solver interchange tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElkNode {
    /// The element id (or a synthetic id for proxies).
    pub id: Id,
    /// Child nodes, present for compound nodes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ElkNode>,
    /// The edges contained in this node.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edges: Vec<ElkEdge>,
    /// String-keyed layout options, see [`BpmnElkOptions`].
    ///
    /// [`BpmnElkOptions`]: super::BpmnElkOptions
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub layout_options: IndexMap<EcoString, EcoString>,
    /// The x position relative to the parent, set by the solver.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    /// The y position relative to the parent, set by the solver.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    /// The node width; an input for leaves, an output for compounds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    /// The node height; an input for leaves, an output for compounds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

impl ElkNode {
    /// A leaf node with the given extent.
    pub fn leaf(id: Id, width: f64, height: f64) -> Self {
        Self { id, width: Some(width), height: Some(height), ..Default::default() }
    }
}

/// An edge of the solver interchange tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElkEdge {
    /// The edge id; boundary proxies carry [`BOUNDARY_PROXY_PREFIX`].
    pub id: Id,
    /// Source node ids (always one here).
    pub sources: Vec<Id>,
    /// Target node ids (always one here).
    pub targets: Vec<Id>,
    /// The routed sections, set by the solver.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<ElkSection>,
}

/// One routed run of an edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElkSection {
    /// Where the section starts.
    pub start_point: Point,
    /// Interior bend points.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bend_points: Vec<Point>,
    /// Where the section ends.
    pub end_point: Point,
}

/// The id prefix of synthetic host→target edges standing in for boundary
/// events.
pub const BOUNDARY_PROXY_PREFIX: &str = "__boundary_proxy__";

/// The id of a proxy edge for the given flow.
pub fn proxy_id(flow: &Id) -> Id {
    let mut id = EcoString::from(BOUNDARY_PROXY_PREFIX);
    id.push_str(flow);
    id
}

/// Whether an edge id names a boundary proxy, and for which flow.
pub fn proxied_flow(id: &Id) -> Option<Id> {
    id.strip_prefix(BOUNDARY_PROXY_PREFIX).map(Id::from)
}

/// An error reported by the layered solver.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct SolverError {
    /// What went wrong.
    pub message: EcoString,
}

impl SolverError {
    /// Create an error from a message.
    pub fn new(message: impl Into<EcoString>) -> Self {
        Self { message: message.into() }
    }
}

/// The external layered layout engine.
///
/// This is the pipeline's single suspension point: implementations may
/// drive an async engine internally, but `solve` blocks until the result is
/// available.
pub trait LayeredSolver {
    /// Lay out the tree, filling in positions, sizes and edge sections.
    fn solve(&self, root: ElkNode) -> Result<ElkNode, SolverError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interchange_tree_wire_format() {
        let mut node = ElkNode::leaf(Id::from("task"), 100.0, 80.0);
        node.layout_options
            .insert(EcoString::from("elk.direction"), EcoString::from("RIGHT"));
        let root = ElkNode {
            id: Id::from("root"),
            children: vec![node],
            edges: vec![ElkEdge {
                id: Id::from("flow"),
                sources: vec![Id::from("task")],
                targets: vec![Id::from("task")],
                sections: vec![ElkSection {
                    start_point: Point::new(1.0, 2.0),
                    bend_points: Vec::new(),
                    end_point: Point::new(3.0, 4.0),
                }],
            }],
            ..Default::default()
        };

        let json = serde_json::to_value(&root).unwrap();
        // Key casing is part of the solver contract.
        assert_eq!(json["children"][0]["layoutOptions"]["elk.direction"], "RIGHT");
        assert_eq!(json["edges"][0]["sections"][0]["startPoint"]["x"], 1.0);
        assert!(json["children"][0].get("layout_options").is_none());

        let back: ElkNode = serde_json::from_value(json).unwrap();
        assert_eq!(back.children[0].width, Some(100.0));
    }
}
