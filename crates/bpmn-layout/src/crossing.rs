//! Edge crossing detection and reduction.

use bpmn_diagram::geom::{Point, segments_intersect};
use bpmn_diagram::modeler::update_waypoints;
use bpmn_diagram::{Diagram, Id};
use rustc_hash::FxHashSet;

use crate::options::consts::{CROSSING_MARGIN, CROSSING_NUDGE, ORTHO_CLASS_TOLERANCE};

/// The crossings found in a diagram.
#[derive(Debug, Clone, Default)]
pub struct CrossingReport {
    /// The number of crossing connection pairs.
    pub count: usize,
    /// The crossing pairs, each reported once with the ids in id order.
    pub pairs: Vec<(Id, Id)>,
}

#[derive(Debug, Clone, Copy)]
struct HSegment {
    y: f64,
    x1: f64,
    x2: f64,
    connection: usize,
}

#[derive(Debug, Clone, Copy)]
struct VSegment {
    x: f64,
    y1: f64,
    y2: f64,
    connection: usize,
}

/// Detect crossing flows.
///
/// Orthogonal routes go through an H×V sweep: horizontal segments sorted by
/// y, every vertical segment binary-searched against them with strict
/// interval margins, so endpoint touches never count. Connections with a
/// diagonal segment fall back to pairwise strict segment intersection.
/// The total is `O((n + k) log n)` in the segment count.
pub fn detect_crossing_flows(diagram: &Diagram) -> CrossingReport {
    let connections: Vec<(&Id, &[Point])> = diagram
        .connections()
        .filter(|connection| !connection.is_association())
        .map(|connection| (&connection.id, connection.waypoints.as_slice()))
        .collect();

    let mut horizontal: Vec<HSegment> = Vec::new();
    let mut vertical: Vec<VSegment> = Vec::new();
    let mut diagonal: Vec<usize> = Vec::new();

    for (index, (_, waypoints)) in connections.iter().enumerate() {
        let mut has_diagonal = false;
        for pair in waypoints.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if (a.y - b.y).abs() <= ORTHO_CLASS_TOLERANCE {
                horizontal.push(HSegment {
                    y: (a.y + b.y) / 2.0,
                    x1: a.x.min(b.x),
                    x2: a.x.max(b.x),
                    connection: index,
                });
            } else if (a.x - b.x).abs() <= ORTHO_CLASS_TOLERANCE {
                vertical.push(VSegment {
                    x: (a.x + b.x) / 2.0,
                    y1: a.y.min(b.y),
                    y2: a.y.max(b.y),
                    connection: index,
                });
            } else {
                has_diagonal = true;
            }
        }
        if has_diagonal {
            diagonal.push(index);
        }
    }

    horizontal.sort_by(|a, b| a.y.total_cmp(&b.y));

    let mut seen: FxHashSet<(usize, usize)> = FxHashSet::default();
    let mut pairs: Vec<(usize, usize)> = Vec::new();
    let mut record = |a: usize, b: usize| {
        if a == b {
            return;
        }
        let key = (a.min(b), a.max(b));
        if seen.insert(key) {
            pairs.push(key);
        }
    };

    for v in &vertical {
        let low = v.y1 + CROSSING_MARGIN;
        let high = v.y2 - CROSSING_MARGIN;
        let from = horizontal.partition_point(|h| h.y <= low);
        for h in &horizontal[from..] {
            if h.y >= high {
                break;
            }
            if v.x > h.x1 + CROSSING_MARGIN && v.x < h.x2 - CROSSING_MARGIN {
                record(v.connection, h.connection);
            }
        }
    }

    // Pairwise fall-back for connections that have a diagonal segment.
    for &index in &diagonal {
        let (_, waypoints) = connections[index];
        for (other, (_, other_waypoints)) in connections.iter().enumerate() {
            if other == index {
                continue;
            }
            'segments: for pair in waypoints.windows(2) {
                for other_pair in other_waypoints.windows(2) {
                    if segments_intersect(pair[0], pair[1], other_pair[0], other_pair[1]) {
                        record(index, other);
                        break 'segments;
                    }
                }
            }
        }
    }

    let mut pairs: Vec<(Id, Id)> = pairs
        .into_iter()
        .map(|(a, b)| {
            let id_a = connections[a].0.clone();
            let id_b = connections[b].0.clone();
            if id_a <= id_b { (id_a, id_b) } else { (id_b, id_a) }
        })
        .collect();
    pairs.sort();
    pairs.dedup();

    CrossingReport { count: pairs.len(), pairs }
}

/// Lane coherence metrics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LaneMetrics {
    /// Sequence flows whose endpoints are both lane-assigned.
    pub total_lane_flows: usize,
    /// Of those, the flows whose endpoints sit in different lanes.
    pub crossing_lane_flows: usize,
    /// The ids of the crossing flows.
    pub crossing_flow_ids: Vec<Id>,
    /// `round(100 · (total − crossing) / total)`; 100 for no lane flows.
    pub lane_coherence_score: u32,
}

/// Compute how well the sequence flows respect the lanes.
pub fn compute_lane_crossing_metrics(diagram: &Diagram) -> LaneMetrics {
    let mut metrics = LaneMetrics::default();

    for connection in diagram.connections() {
        if !connection.is_sequence_flow() {
            continue;
        }
        let source_lane = diagram.lane_of(&connection.source).map(|lane| lane.id.clone());
        let target_lane = diagram.lane_of(&connection.target).map(|lane| lane.id.clone());
        let (Some(source_lane), Some(target_lane)) = (source_lane, target_lane) else {
            continue;
        };
        metrics.total_lane_flows += 1;
        if source_lane != target_lane {
            metrics.crossing_lane_flows += 1;
            metrics.crossing_flow_ids.push(connection.id.clone());
        }
    }

    metrics.lane_coherence_score = if metrics.total_lane_flows == 0 {
        100
    } else {
        let kept = metrics.total_lane_flows - metrics.crossing_lane_flows;
        ((100.0 * kept as f64) / metrics.total_lane_flows as f64).round() as u32
    };
    metrics
}

/// Try to remove crossings by nudging internal vertical runs sideways.
///
/// Strictly local: a nudge is kept only when it removes the targeted
/// crossing without adding new crossings to the nudged edge. Nodes are never
/// reordered. Returns how many crossings were removed.
pub fn reduce_crossings(diagram: &mut Diagram) -> usize {
    let report = detect_crossing_flows(diagram);
    let mut removed = 0;

    for (a, b) in &report.pairs {
        if !still_crossing(diagram, a, b) {
            continue;
        }
        'edges: for edge in [a, b] {
            for offset in [CROSSING_NUDGE, -CROSSING_NUDGE] {
                let Some(original) = diagram.connection(edge).map(|c| c.waypoints.clone())
                else {
                    continue;
                };
                let Some(nudged) = nudge_vertical_run(&original, offset) else { continue };

                let before = crossings_of(diagram, edge);
                if update_waypoints(diagram, edge, &nudged).is_err() {
                    continue;
                }
                if !still_crossing(diagram, a, b) && crossings_of(diagram, edge) <= before {
                    removed += 1;
                    break 'edges;
                }
                // Revert.
                let _ = update_waypoints(diagram, edge, &original);
            }
        }
    }

    removed
}

fn still_crossing(diagram: &Diagram, a: &Id, b: &Id) -> bool {
    detect_crossing_flows(diagram)
        .pairs
        .iter()
        .any(|(x, y)| (x == a && y == b) || (x == b && y == a))
}

fn crossings_of(diagram: &Diagram, edge: &Id) -> usize {
    detect_crossing_flows(diagram)
        .pairs
        .iter()
        .filter(|(a, b)| a == edge || b == edge)
        .count()
}

/// Shift the first internal vertical run of a polyline sideways.
fn nudge_vertical_run(waypoints: &[Point], offset: f64) -> Option<Vec<Point>> {
    if waypoints.len() < 4 {
        return None;
    }
    let mut nudged = waypoints.to_vec();
    for i in 1..nudged.len() - 2 {
        let vertical = (nudged[i].x - nudged[i + 1].x).abs() <= ORTHO_CLASS_TOLERANCE;
        if vertical {
            nudged[i].x += offset;
            nudged[i + 1].x += offset;
            return Some(nudged);
        }
    }
    None
}
