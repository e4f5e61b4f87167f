//! Layout strategy selection.

use bpmn_diagram::{Diagram, ShapeKind};

/// The layout strategy recommended for a diagram.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Strategy {
    /// Small, structured diagram: the deterministic R-engine rebuild.
    Deterministic,
    /// Multiple pools or message flows: collaboration layout.
    Collaboration,
    /// Multiple lanes: lane-aware layout.
    Lanes,
    /// Everything else: the full layered pipeline.
    Full,
}

/// Element counts the strategy rules look at.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct DiagramStats {
    /// Flow nodes (tasks, events, gateways, subprocesses, call activities).
    pub flow_nodes: usize,
    /// Sequence flows.
    pub sequence_flows: usize,
    /// Message flows.
    pub message_flows: usize,
    /// Participant pools.
    pub participants: usize,
    /// Lanes.
    pub lanes: usize,
    /// Expanded subprocesses.
    pub expanded_subprocesses: usize,
    /// Boundary events.
    pub boundary_events: usize,
    /// Mean outgoing-flow count over gateways with at least two outgoing.
    pub avg_gateway_branching: f64,
}

/// A strategy decision with its inputs and rationale.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyDecision {
    /// The selected strategy.
    pub strategy: Strategy,
    /// Why it was selected.
    pub reason: &'static str,
    /// How confident the rule set is, in `0.0..=1.0`.
    pub confidence: f64,
    /// The counted inputs.
    pub stats: DiagramStats,
}

/// Count the elements the strategy rules depend on.
pub fn collect_stats(diagram: &Diagram) -> DiagramStats {
    let mut stats = DiagramStats::default();
    let mut branching_sum = 0usize;
    let mut splits = 0usize;

    for shape in diagram.shapes() {
        if shape.host().is_some() {
            stats.boundary_events += 1;
            continue;
        }
        match &shape.kind {
            ShapeKind::Participant => stats.participants += 1,
            ShapeKind::Lane { .. } => stats.lanes += 1,
            _ => {}
        }
        if shape.is_flow_node() {
            stats.flow_nodes += 1;
        }
        if shape.is_expanded_subprocess() {
            stats.expanded_subprocesses += 1;
        }
        if shape.is_gateway() {
            let outgoing = diagram
                .connections_from(&shape.id)
                .filter(|connection| connection.is_sequence_flow())
                .count();
            if outgoing >= 2 {
                branching_sum += outgoing;
                splits += 1;
            }
        }
    }

    for connection in diagram.connections() {
        if connection.is_sequence_flow() {
            stats.sequence_flows += 1;
        } else if connection.is_message_flow() {
            stats.message_flows += 1;
        }
    }

    stats.avg_gateway_branching =
        if splits == 0 { 0.0 } else { branching_sum as f64 / splits as f64 };
    stats
}

/// Pick a layout strategy for the diagram.
///
/// Rules in priority order: a trivial diagram gets the deterministic
/// rebuild; two or more participants or any message flow means
/// collaboration; two or more lanes means lane layout; anything else gets
/// the full layered pipeline. Trivial means at most 20 flow nodes, no
/// lanes, boundary events, expanded subprocesses or message flows, and a
/// mean gateway branching of at most 2.5.
pub fn select_layout_strategy(diagram: &Diagram) -> StrategyDecision {
    let stats = collect_stats(diagram);

    let trivial = stats.flow_nodes <= 20
        && stats.lanes == 0
        && stats.boundary_events == 0
        && stats.expanded_subprocesses == 0
        && stats.message_flows == 0
        && stats.avg_gateway_branching <= 2.5;

    if trivial {
        return StrategyDecision {
            strategy: Strategy::Deterministic,
            reason: "small structured diagram, deterministic rebuild suffices",
            confidence: 0.9,
            stats,
        };
    }
    if stats.participants >= 2 || stats.message_flows > 0 {
        return StrategyDecision {
            strategy: Strategy::Collaboration,
            reason: "multiple participants or message flows present",
            confidence: 0.8,
            stats,
        };
    }
    if stats.lanes >= 2 {
        return StrategyDecision {
            strategy: Strategy::Lanes,
            reason: "multiple lanes present",
            confidence: 0.75,
            stats,
        };
    }
    StrategyDecision {
        strategy: Strategy::Full,
        reason: "general diagram, full layered layout",
        confidence: 0.6,
        stats,
    }
}
