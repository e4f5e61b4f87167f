//! Boundary events and their exception chains.

use bpmn_diagram::{Diagram, Id};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;

/// A boundary event and the flow nodes that exclusively follow it.
#[derive(Debug, Clone)]
pub struct ExceptionChain {
    /// The boundary event the chain hangs off.
    pub boundary: Id,
    /// The chain members in breadth-first order from the boundary event.
    pub elements: Vec<Id>,
}

/// The boundary events whose hosts live in the given scope, registry order.
pub fn boundary_events(diagram: &Diagram, scope: Option<&Id>) -> Vec<Id> {
    diagram
        .shapes()
        .filter(|shape| match shape.host() {
            Some(host) => match scope {
                Some(scope) => diagram.is_inside(host, scope),
                None => true,
            },
            None => false,
        })
        .map(|shape| shape.id.clone())
        .collect()
}

/// Identify the exception chains of a scope.
///
/// A flow node belongs to the exception-chain set when every one of its
/// incoming sequence flows comes from a boundary event or from another
/// member of the set, computed as a fixed point. Each boundary event then
/// claims the members it reaches first, in breadth-first order.
pub fn exception_chains(diagram: &Diagram, scope: Option<&Id>) -> Vec<ExceptionChain> {
    let in_scope = |id: &Id| match scope {
        Some(scope) => diagram.is_inside(id, scope),
        None => true,
    };

    // Incoming/outgoing sequence-flow adjacency over flow nodes and
    // boundary events in scope.
    let mut incoming: FxHashMap<Id, Vec<Id>> = FxHashMap::default();
    let mut outgoing: FxHashMap<Id, Vec<Id>> = FxHashMap::default();
    for connection in diagram.connections() {
        if !connection.is_sequence_flow() {
            continue;
        }
        let ok = |id: &Id| {
            diagram
                .shape(id)
                .is_some_and(|shape| shape.is_flow_node() || shape.host().is_some())
                && in_scope(id)
        };
        if !ok(&connection.source) || !ok(&connection.target) {
            continue;
        }
        incoming
            .entry(connection.target.clone())
            .or_default()
            .push(connection.source.clone());
        outgoing
            .entry(connection.source.clone())
            .or_default()
            .push(connection.target.clone());
    }

    let is_boundary =
        |id: &Id| diagram.shape(id).is_some_and(|shape| shape.host().is_some());

    // Fixed-point expansion of the chain set.
    let mut chain: FxHashSet<Id> = FxHashSet::default();
    loop {
        let mut grew = false;
        for shape in diagram.shapes() {
            if !shape.is_flow_node() || chain.contains(&shape.id) || !in_scope(&shape.id) {
                continue;
            }
            let Some(sources) = incoming.get(&shape.id) else { continue };
            if sources.is_empty() {
                continue;
            }
            if sources.iter().all(|source| is_boundary(source) || chain.contains(source)) {
                chain.insert(shape.id.clone());
                grew = true;
            }
        }
        if !grew {
            break;
        }
    }

    // Each boundary event claims its reachable chain members.
    let mut claimed: FxHashSet<Id> = FxHashSet::default();
    boundary_events(diagram, scope)
        .into_iter()
        .map(|boundary| {
            let mut elements = Vec::new();
            let mut queue: VecDeque<Id> = [boundary.clone()].into();
            while let Some(id) = queue.pop_front() {
                let Some(successors) = outgoing.get(&id) else { continue };
                for successor in successors {
                    if chain.contains(successor) && claimed.insert(successor.clone()) {
                        elements.push(successor.clone());
                        queue.push_back(successor.clone());
                    }
                }
            }
            ExceptionChain { boundary, elements }
        })
        .collect()
}
