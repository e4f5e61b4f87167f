//! Flow-graph topology analysis.
//!
//! Everything the engines need to know about the sequence-flow structure of
//! one container scope: the graph itself, its back edges, a longest-path
//! layering and the gateway fan patterns.

mod cycles;
mod graph;
mod layering;
mod patterns;

pub use self::cycles::detect_back_edges;
pub use self::graph::{FlowGraph, FlowNode, extract_flow_graph};
pub use self::layering::{Layering, topological_sort};
pub use self::patterns::{GatewayPattern, detect_gateway_patterns};
