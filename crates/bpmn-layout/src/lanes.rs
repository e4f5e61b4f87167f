//! Lane band computation.
//!
//! Lanes tile their pool along one axis: horizontally flowing diagrams get
//! row bands stacked top to bottom, vertically flowing diagrams get column
//! bands left to right. Each lane's nodes move as a group onto their band;
//! afterwards the pool is resized to the band sum.

use bpmn_diagram::geom::{Axis, Dir, Point, Rect};
use bpmn_diagram::modeler::{assign_to_lane, move_elements, resize_shape, set_bounds_direct};
use bpmn_diagram::snapshot::{LaneSnapshot, capture_lanes};
use bpmn_diagram::{Diagram, Id, ShapeKind};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

use crate::options::{LaneStrategy, consts};

/// Per-element lane centre on the cross axis, for the R-engine override.
///
/// Uses the lanes' current bounds: the map guides positioning before the
/// bands are recomputed.
pub fn lane_center_map(diagram: &Diagram, pool: &Id, dir: Dir) -> FxHashMap<Id, f64> {
    let cross = dir.axis().other();
    let mut centers = FxHashMap::default();
    for lane in diagram.lanes_of(pool) {
        let center = lane.bounds.center().get(cross);
        if let ShapeKind::Lane { flow_node_refs } = &lane.kind {
            for node in flow_node_refs {
                centers.insert(node.clone(), center);
            }
        }
    }
    centers
}

/// Lay out the lanes of one pool.
///
/// Returns whether the pool was handled in column mode, in which case the
/// lane geometry was written directly and downstream compaction must not
/// re-resize the lanes through the modeler (its equal-width behaviour would
/// destroy the distinct band widths).
pub fn layout_lanes(
    diagram: &mut Diagram,
    pool: &Id,
    dir: Dir,
    strategy: LaneStrategy,
) -> bool {
    let mut snapshots = capture_lanes(diagram, pool);
    if snapshots.is_empty() {
        return false;
    }

    assign_orphans(diagram, pool, &mut snapshots, dir);

    // Band order: original cross-axis position, optionally optimised.
    let cross = dir.axis().other();
    snapshots.sort_by(|a, b| match cross {
        Axis::Y => a.original_y.total_cmp(&b.original_y),
        Axis::X => a.original_x.total_cmp(&b.original_x),
    });
    if strategy == LaneStrategy::Optimize {
        optimise_lane_order(diagram, &mut snapshots);
    }

    match cross {
        Axis::Y => {
            layout_row_bands(diagram, pool, &snapshots);
            false
        }
        Axis::X => {
            layout_column_bands(diagram, pool, &snapshots);
            true
        }
    }
}

/// Assign pool nodes that belong to no lane to the nearest lane by
/// cross-axis centre distance.
fn assign_orphans(diagram: &mut Diagram, pool: &Id, snapshots: &mut [LaneSnapshot], dir: Dir) {
    let cross = dir.axis().other();
    let assigned: FxHashSet<Id> =
        snapshots.iter().flat_map(|snapshot| snapshot.node_ids.iter().cloned()).collect();

    let orphans: Vec<(Id, f64)> = diagram
        .children(pool)
        .filter(|shape| shape.is_flow_node() && !assigned.contains(&shape.id))
        .map(|shape| (shape.id.clone(), shape.bounds.center().get(cross)))
        .collect();

    for (orphan, center) in orphans {
        let nearest = snapshots
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                let da = (lane_center(diagram, a, cross) - center).abs();
                let db = (lane_center(diagram, b, cross) - center).abs();
                da.total_cmp(&db)
            })
            .map(|(index, _)| index);
        let Some(index) = nearest else { continue };
        snapshots[index].node_ids.insert(orphan.clone());
        let lane_id = snapshots[index].lane_id.clone();
        let _ = assign_to_lane(diagram, &orphan, &lane_id);
        trace!(node = %orphan, lane = %lane_id, "assigned orphan to nearest lane");
    }
}

fn lane_center(diagram: &Diagram, snapshot: &LaneSnapshot, cross: Axis) -> f64 {
    diagram
        .shape(&snapshot.lane_id)
        .map_or(0.0, |lane| lane.bounds.center().get(cross))
}

/// Minimise the summed lane distance of cross-lane sequence flows.
///
/// Exhaustive for up to six lanes, greedy adjacent swaps beyond that.
fn optimise_lane_order(diagram: &Diagram, snapshots: &mut Vec<LaneSnapshot>) {
    let lane_of: FxHashMap<Id, usize> = snapshots
        .iter()
        .enumerate()
        .flat_map(|(index, snapshot)| {
            snapshot.node_ids.iter().cloned().map(move |node| (node, index))
        })
        .collect();

    let flows: Vec<(usize, usize)> = diagram
        .connections()
        .filter(|connection| connection.is_sequence_flow())
        .filter_map(|connection| {
            let source = *lane_of.get(&connection.source)?;
            let target = *lane_of.get(&connection.target)?;
            (source != target).then_some((source, target))
        })
        .collect();
    if flows.is_empty() {
        return;
    }

    let cost = |order: &[usize]| -> usize {
        let mut slot = vec![0usize; order.len()];
        for (position, lane) in order.iter().enumerate() {
            slot[*lane] = position;
        }
        flows.iter().map(|(source, target)| slot[*source].abs_diff(slot[*target])).sum()
    };

    let count = snapshots.len();
    let mut best: Vec<usize> = (0..count).collect();

    if count <= 6 {
        let mut best_cost = cost(&best);
        let mut order: Vec<usize> = (0..count).collect();
        permute(&mut order, 0, &mut |candidate| {
            let candidate_cost = cost(candidate);
            if candidate_cost < best_cost {
                best_cost = candidate_cost;
                best = candidate.to_vec();
            }
        });
    } else {
        let mut improved = true;
        while improved {
            improved = false;
            for i in 0..count - 1 {
                best.swap(i, i + 1);
                let swapped = cost(&best);
                best.swap(i, i + 1);
                if swapped < cost(&best) {
                    best.swap(i, i + 1);
                    improved = true;
                }
            }
        }
    }

    let reordered: Vec<LaneSnapshot> =
        best.iter().map(|&index| snapshots[index].clone()).collect();
    *snapshots = reordered;
}

fn permute(order: &mut Vec<usize>, at: usize, visit: &mut impl FnMut(&[usize])) {
    if at == order.len() {
        visit(order);
        return;
    }
    for i in at..order.len() {
        order.swap(at, i);
        permute(order, at + 1, visit);
        order.swap(at, i);
    }
}

/// Row mode: bands stack top to bottom inside the pool.
fn layout_row_bands(diagram: &mut Diagram, pool: &Id, snapshots: &[LaneSnapshot]) {
    let Some(pool_bounds) = diagram.shape(pool).map(|shape| shape.bounds) else { return };

    let mut band_top = pool_bounds.y;
    let mut bands: Vec<(Id, Rect)> = Vec::new();
    for snapshot in snapshots {
        let nodes: Vec<Rect> = snapshot
            .node_ids
            .iter()
            .filter_map(|id| diagram.shape(id))
            .map(|shape| shape.bounds)
            .collect();

        let content_h = Rect::bbox(nodes.iter().copied()).map_or(0.0, |bbox| bbox.h);
        let band_h =
            (content_h + 2.0 * consts::LANE_PADDING).max(consts::LANE_MIN_HEIGHT);
        let band = Rect::new(
            pool_bounds.x + consts::POOL_LABEL_BAND,
            band_top,
            pool_bounds.w - consts::POOL_LABEL_BAND,
            band_h,
        );

        shift_group_into_band(diagram, snapshot, &nodes, band, Axis::Y);
        bands.push((snapshot.lane_id.clone(), band));
        band_top += band_h;
    }

    for (lane, band) in &bands {
        let _ = resize_shape(diagram, lane, *band);
    }

    // Correct the pool to the band sum, then re-verify the lanes: the pool
    // resize may have redistributed them.
    let total: f64 = bands.iter().map(|(_, band)| band.h).sum();
    let _ = resize_shape(
        diagram,
        pool,
        Rect::new(pool_bounds.x, pool_bounds.y, pool_bounds.w, total),
    );
    for (lane, band) in &bands {
        if diagram.shape(lane).is_some_and(|shape| shape.bounds != *band) {
            let _ = resize_shape(diagram, lane, *band);
        }
    }
}

/// Column mode: bands run left to right; geometry is written directly
/// because the modeler's lane resize would equalise the widths.
fn layout_column_bands(diagram: &mut Diagram, pool: &Id, snapshots: &[LaneSnapshot]) {
    let Some(pool_bounds) = diagram.shape(pool).map(|shape| shape.bounds) else { return };

    let mut band_left = pool_bounds.x;
    let mut bands: Vec<(Id, Rect)> = Vec::new();
    for snapshot in snapshots {
        let nodes: Vec<Rect> = snapshot
            .node_ids
            .iter()
            .filter_map(|id| diagram.shape(id))
            .map(|shape| shape.bounds)
            .collect();

        let content_w = Rect::bbox(nodes.iter().copied()).map_or(0.0, |bbox| bbox.w);
        let band_w = (content_w + 2.0 * consts::LANE_PADDING).max(consts::LANE_MIN_WIDTH);
        let band = Rect::new(
            band_left,
            pool_bounds.y + consts::POOL_LABEL_BAND,
            band_w,
            pool_bounds.h - consts::POOL_LABEL_BAND,
        );

        shift_group_into_band(diagram, snapshot, &nodes, band, Axis::X);
        bands.push((snapshot.lane_id.clone(), band));
        band_left += band_w;
    }

    for (lane, band) in &bands {
        set_bounds_direct(diagram, lane, *band);
    }

    let total: f64 = bands.iter().map(|(_, band)| band.w).sum();
    set_bounds_direct(
        diagram,
        pool,
        Rect::new(pool_bounds.x, pool_bounds.y, total, pool_bounds.h),
    );
}

/// Move a lane's nodes as one group so their median centre lands on the band
/// centre, clamped so nothing leaves the band.
fn shift_group_into_band(
    diagram: &mut Diagram,
    snapshot: &LaneSnapshot,
    nodes: &[Rect],
    band: Rect,
    axis: Axis,
) {
    if nodes.is_empty() {
        return;
    }

    let mut centers: Vec<f64> = nodes.iter().map(|rect| rect.center().get(axis)).collect();
    centers.sort_by(f64::total_cmp);
    let median = centers[centers.len() / 2];

    let mut delta = band.center().get(axis) - median;

    // Clamp: the group must stay inside the band.
    let min_start = nodes.iter().map(|rect| rect.start(axis)).fold(f64::INFINITY, f64::min);
    let max_end = nodes.iter().map(|rect| rect.end(axis)).fold(f64::NEG_INFINITY, f64::max);
    let low = band.start(axis) - min_start;
    let high = band.end(axis) - max_end;
    if low <= high {
        delta = delta.clamp(low, high);
    } else {
        // Content larger than the band: align starts.
        delta = low;
    }

    if delta.abs() < consts::SIGNIFICANT_MOVE {
        return;
    }

    let ids: Vec<Id> = snapshot.node_ids.iter().cloned().collect();
    let vector = match axis {
        Axis::X => Point::new(delta, 0.0),
        Axis::Y => Point::new(0.0, delta),
    };
    let _ = move_elements(diagram, &ids, vector);
}
