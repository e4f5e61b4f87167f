//! The layered-solver side of the E-engine: the interchange tree, the
//! option vocabulary, graph building and position application.

mod apply;
mod graph;
mod options;
mod solver;

pub use self::apply::{ApplyReport, apply_positions};
pub use self::graph::build_container_graph;
pub use self::options::{
    BpmnElkOptions, CrossingMinimization, CycleBreaking, EdgeRouting, ElkAlgorithm,
    ElkDirection, ElkPadding, NodePlacement,
};
pub use self::solver::{
    BOUNDARY_PROXY_PREFIX, ElkEdge, ElkNode, ElkSection, LayeredSolver, SolverError,
    proxied_flow, proxy_id,
};
