//! Public layout options and contract constants.

use bpmn_diagram::Id;
use bpmn_diagram::geom::Dir;

/// How tightly the layout packs nodes.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Compactness {
    /// Tighter gaps and spacings (×0.8).
    Compact,
    /// The default spacing.
    #[default]
    Normal,
    /// Wider gaps and spacings (×1.25).
    Spacious,
}

impl Compactness {
    /// The factor applied to gaps and spacings.
    pub const fn factor(self) -> f64 {
        match self {
            Self::Compact => 0.8,
            Self::Normal => 1.0,
            Self::Spacious => 1.25,
        }
    }
}

/// What to do with the existing lane order.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash)]
pub enum LaneStrategy {
    /// Keep the original order.
    #[default]
    Preserve,
    /// Reorder lanes to minimise cross-lane flow distance.
    Optimize,
}

/// Options for a layout run.
#[derive(Debug, Clone)]
pub struct LayoutOptions {
    /// The main layout direction.
    pub direction: Dir,
    /// The gap between nodes within a layer; engine default when `None`.
    pub node_spacing: Option<f64>,
    /// The gap between layers; engine default when `None`.
    pub layer_spacing: Option<f64>,
    /// Restrict layout to this participant or subprocess.
    pub scope_element_id: Option<Id>,
    /// Keep the first-found happy path on one row.
    pub preserve_happy_path: bool,
    /// Quantise node positions to multiples of this, if set.
    pub grid_quantum: Option<f64>,
    /// How tightly to pack.
    pub compactness: Compactness,
    /// What to do with the lane order.
    pub lane_strategy: LaneStrategy,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            direction: Dir::LTR,
            node_spacing: None,
            layer_spacing: None,
            scope_element_id: None,
            preserve_happy_path: true,
            grid_quantum: None,
            compactness: Compactness::Normal,
            lane_strategy: LaneStrategy::Preserve,
        }
    }
}

impl LayoutOptions {
    /// The effective gap between a node and its successor.
    ///
    /// Successors sit one layer further along the flow direction, so this is
    /// driven by the layer spacing.
    pub fn gap(&self) -> f64 {
        self.layer_spacing.unwrap_or(consts::GAP) * self.compactness.factor()
    }

    /// The effective centre-to-centre distance between parallel branches.
    pub fn branch_spacing(&self) -> f64 {
        self.node_spacing.unwrap_or(consts::BRANCH_SPACING) * self.compactness.factor()
    }

    /// Snap a coordinate to the configured grid, if any.
    pub fn quantise(&self, value: f64) -> f64 {
        match self.grid_quantum {
            Some(quantum) if quantum > 0.0 => (value / quantum).round() * quantum,
            _ => value,
        }
    }
}

/// The layout contract's default dimensions and tolerances.
pub mod consts {
    /// The origin for a rebuild (R-engine) run.
    pub const REBUILD_ORIGIN: (f64, f64) = (180.0, 200.0);
    /// The origin for a full (E-engine) run.
    pub const FULL_ORIGIN: (f64, f64) = (180.0, 80.0);
    /// The default gap between consecutive nodes.
    pub const GAP: f64 = 50.0;
    /// The default centre-to-centre distance between branches.
    pub const BRANCH_SPACING: f64 = 130.0;
    /// The width of a pool's label band.
    pub const POOL_LABEL_BAND: f64 = 30.0;
    /// The vertical gap between stacked pools.
    pub const POOL_GAP: f64 = 68.0;
    /// The minimum height of a lane in row mode.
    pub const LANE_MIN_HEIGHT: f64 = 250.0;
    /// The minimum width of a lane in column mode.
    pub const LANE_MIN_WIDTH: f64 = 200.0;
    /// The padding between lane content and the lane border, per axis.
    pub const LANE_PADDING: f64 = 30.0;
    /// The padding inside an expanded subprocess.
    pub const SUBPROCESS_PADDING: f64 = 40.0;
    /// A move below this threshold does not count as a move.
    pub const SIGNIFICANT_MOVE: f64 = 0.5;
    /// A resize below this threshold does not count as a resize.
    pub const SIGNIFICANT_RESIZE: f64 = 5.0;
    /// Segments with a smaller-axis delta below this snap to orthogonal.
    pub const SEGMENT_ORTHO_SNAP: f64 = 8.0;
    /// Endpoints within this distance of a border snap onto it.
    pub const ENDPOINT_SNAP_TOLERANCE: f64 = 10.0;
    /// The horizontal margin of a self-loop route.
    pub const SELF_LOOP_MARGIN_H: f64 = 20.0;
    /// The vertical margin of a self-loop route.
    pub const SELF_LOOP_MARGIN_V: f64 = 20.0;
    /// How far a boundary target may sit before the border choice ignores it.
    pub const BOUNDARY_PROXIMITY_TOLERANCE: f64 = 60.0;
    /// Message flows with source centres within this distance are parallel.
    pub const PARALLEL_MESSAGE_TOLERANCE: f64 = 60.0;
    /// Segment classification tolerance for crossing detection.
    pub const ORTHO_CLASS_TOLERANCE: f64 = 3.0;
    /// Interval margin for crossing detection.
    pub const CROSSING_MARGIN: f64 = 0.5;
    /// The gap between a boundary event and its exception chain.
    pub const BOUNDARY_CHAIN_GAP: f64 = 50.0;
    /// The offset applied when nudging an edge to remove a crossing.
    pub const CROSSING_NUDGE: f64 = 12.0;
    /// The step between parallel message-flow mid legs.
    pub const MESSAGE_FLOW_STEP: f64 = 20.0;
    /// The gap between a connection label and its segment.
    pub const LABEL_GAP: f64 = 10.0;
    /// The gap between an event or gateway and its external label.
    pub const SHAPE_LABEL_GAP: f64 = 8.0;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compactness_scales_gap() {
        let mut options = LayoutOptions::default();
        assert_eq!(options.gap(), 50.0);
        options.compactness = Compactness::Compact;
        assert_eq!(options.gap(), 40.0);
        options.layer_spacing = Some(100.0);
        assert_eq!(options.gap(), 80.0);
    }

    #[test]
    fn test_grid_quantise() {
        let options = LayoutOptions { grid_quantum: Some(10.0), ..Default::default() };
        assert_eq!(options.quantise(43.0), 40.0);
        assert_eq!(options.quantise(45.0), 50.0);
        let plain = LayoutOptions::default();
        assert_eq!(plain.quantise(43.0), 43.0);
    }
}
