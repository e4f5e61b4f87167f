//! The typed vocabulary of solver options.

use bpmn_diagram::geom::Dir;
use ecow::{EcoString, eco_format};
use indexmap::IndexMap;

use crate::options::LayoutOptions;

/// The algorithm; only the layered engine is ever requested.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub enum ElkAlgorithm {
    /// Sugiyama-style layered layout.
    #[default]
    Layered,
}

/// The solver's layout direction.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub enum ElkDirection {
    /// Left to right.
    #[default]
    Right,
    /// Top to bottom.
    Down,
    /// Right to left.
    Left,
    /// Bottom to top.
    Up,
}

impl From<Dir> for ElkDirection {
    fn from(dir: Dir) -> Self {
        match dir {
            Dir::LTR => Self::Right,
            Dir::TTB => Self::Down,
            Dir::RTL => Self::Left,
            Dir::BTT => Self::Up,
        }
    }
}

/// How the solver routes edges.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub enum EdgeRouting {
    /// Orthogonal segments, the BPMN convention.
    #[default]
    Orthogonal,
    /// Spline curves.
    Splines,
    /// Straight polylines.
    Polyline,
    /// Leave the choice to the solver.
    Undefined,
}

/// The node-placement strategy.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub enum NodePlacement {
    /// Network simplex, the most balanced results.
    #[default]
    NetworkSimplex,
    /// Brandes-Köpf alignment.
    BrandesKoepf,
    /// Linear segments.
    LinearSegments,
    /// Simple stacking.
    Simple,
}

/// The crossing-minimisation strategy.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub enum CrossingMinimization {
    /// Layer-sweep heuristic.
    #[default]
    LayerSweep,
    /// Keep the interactive order.
    Interactive,
    /// No crossing minimisation.
    None,
}

/// The cycle-breaking strategy.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub enum CycleBreaking {
    /// Depth-first back-edge reversal.
    #[default]
    DepthFirst,
    /// Greedy heuristic.
    Greedy,
    /// Respect interactive positions.
    Interactive,
    /// Respect model order.
    ModelOrder,
}

/// Padding between a compound node's border and its children.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ElkPadding {
    /// Top padding.
    pub top: f64,
    /// Left padding.
    pub left: f64,
    /// Bottom padding.
    pub bottom: f64,
    /// Right padding.
    pub right: f64,
}

impl ElkPadding {
    /// Equal padding on all sides.
    pub const fn splat(value: f64) -> Self {
        Self { top: value, left: value, bottom: value, right: value }
    }
}

/// The option set attached to one node of the solver tree.
///
/// Rendered into the string-keyed map the solver actually consumes; the
/// closed value sets above document the vocabulary.
#[derive(Debug, Clone, PartialEq)]
pub struct BpmnElkOptions {
    /// The algorithm.
    pub algorithm: ElkAlgorithm,
    /// The layout direction.
    pub direction: ElkDirection,
    /// Edge routing style.
    pub edge_routing: EdgeRouting,
    /// Node placement strategy.
    pub node_placement: NodePlacement,
    /// Crossing minimisation strategy.
    pub crossing_minimization: CrossingMinimization,
    /// Cycle breaking strategy.
    pub cycle_breaking: CycleBreaking,
    /// In-layer node spacing.
    pub node_spacing: f64,
    /// Between-layer spacing.
    pub layer_spacing: f64,
    /// Edge-to-node spacing.
    pub edge_node_spacing: f64,
    /// Spacing between disconnected components.
    pub component_spacing: f64,
    /// Compound padding, when attached to a compound node.
    pub padding: Option<ElkPadding>,
}

impl BpmnElkOptions {
    /// The root option set for a layout run.
    pub fn root(options: &LayoutOptions) -> Self {
        let factor = options.compactness.factor();
        Self {
            algorithm: ElkAlgorithm::Layered,
            direction: options.direction.into(),
            edge_routing: EdgeRouting::Orthogonal,
            node_placement: NodePlacement::NetworkSimplex,
            crossing_minimization: CrossingMinimization::LayerSweep,
            cycle_breaking: if options.preserve_happy_path {
                CycleBreaking::DepthFirst
            } else {
                CycleBreaking::Greedy
            },
            node_spacing: options.node_spacing.unwrap_or(60.0) * factor,
            layer_spacing: options.layer_spacing.unwrap_or(80.0) * factor,
            edge_node_spacing: 30.0 * factor,
            component_spacing: 40.0 * factor,
            padding: None,
        }
    }

    /// Options for a plain participant.
    pub fn participant(options: &LayoutOptions) -> Self {
        Self { padding: Some(ElkPadding::splat(30.0)), ..Self::root(options) }
    }

    /// Options for a participant with lanes: extra headroom on the lane
    /// label side.
    pub fn participant_with_lanes(options: &LayoutOptions) -> Self {
        Self {
            padding: Some(ElkPadding { top: 40.0, left: 60.0, bottom: 40.0, right: 30.0 }),
            ..Self::root(options)
        }
    }

    /// Options for an expanded subprocess.
    pub fn subprocess(options: &LayoutOptions) -> Self {
        Self { padding: Some(ElkPadding::splat(40.0)), ..Self::root(options) }
    }

    /// Options for an event subprocess: packed more tightly.
    pub fn event_subprocess(options: &LayoutOptions) -> Self {
        let mut these = Self::subprocess(options);
        these.node_spacing *= 0.8;
        these.layer_spacing *= 0.8;
        these
    }

    /// Render into the string-keyed map the solver consumes.
    pub fn to_map(&self) -> IndexMap<EcoString, EcoString> {
        let mut map = IndexMap::new();
        let mut set = |key: &str, value: EcoString| {
            map.insert(EcoString::from(key), value);
        };

        set("elk.algorithm", EcoString::from(match self.algorithm {
            ElkAlgorithm::Layered => "layered",
        }));
        set("elk.direction", EcoString::from(match self.direction {
            ElkDirection::Right => "RIGHT",
            ElkDirection::Down => "DOWN",
            ElkDirection::Left => "LEFT",
            ElkDirection::Up => "UP",
        }));
        set("elk.edgeRouting", EcoString::from(match self.edge_routing {
            EdgeRouting::Orthogonal => "ORTHOGONAL",
            EdgeRouting::Splines => "SPLINES",
            EdgeRouting::Polyline => "POLYLINE",
            EdgeRouting::Undefined => "UNDEFINED",
        }));
        set(
            "elk.layered.nodePlacement.strategy",
            EcoString::from(match self.node_placement {
                NodePlacement::NetworkSimplex => "NETWORK_SIMPLEX",
                NodePlacement::BrandesKoepf => "BRANDES_KOEPF",
                NodePlacement::LinearSegments => "LINEAR_SEGMENTS",
                NodePlacement::Simple => "SIMPLE",
            }),
        );
        set(
            "elk.layered.crossingMinimization.strategy",
            EcoString::from(match self.crossing_minimization {
                CrossingMinimization::LayerSweep => "LAYER_SWEEP",
                CrossingMinimization::Interactive => "INTERACTIVE",
                CrossingMinimization::None => "NONE",
            }),
        );
        set(
            "elk.layered.cycleBreaking.strategy",
            EcoString::from(match self.cycle_breaking {
                CycleBreaking::DepthFirst => "DEPTH_FIRST",
                CycleBreaking::Greedy => "GREEDY",
                CycleBreaking::Interactive => "INTERACTIVE",
                CycleBreaking::ModelOrder => "MODEL_ORDER",
            }),
        );
        set("elk.spacing.nodeNode", eco_format!("{}", self.node_spacing));
        set(
            "elk.layered.spacing.nodeNodeBetweenLayers",
            eco_format!("{}", self.layer_spacing),
        );
        set("elk.spacing.edgeNode", eco_format!("{}", self.edge_node_spacing));
        set("elk.spacing.componentComponent", eco_format!("{}", self.component_spacing));
        if let Some(padding) = self.padding {
            set(
                "elk.padding",
                eco_format!(
                    "[top={},left={},bottom={},right={}]",
                    padding.top, padding.left, padding.bottom, padding.right
                ),
            );
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_map_vocabulary() {
        let options = LayoutOptions::default();
        let map = BpmnElkOptions::root(&options).to_map();
        assert_eq!(map["elk.algorithm"], "layered");
        assert_eq!(map["elk.direction"], "RIGHT");
        assert_eq!(map["elk.edgeRouting"], "ORTHOGONAL");
        assert_eq!(map["elk.layered.nodePlacement.strategy"], "NETWORK_SIMPLEX");
        assert_eq!(map["elk.spacing.nodeNode"], "60");
    }

    #[test]
    fn test_padding_renders_bracketed() {
        let options = LayoutOptions::default();
        let map = BpmnElkOptions::subprocess(&options).to_map();
        assert_eq!(map["elk.padding"], "[top=40,left=40,bottom=40,right=40]");
    }

    #[test]
    fn test_direction_follows_options() {
        let options = LayoutOptions { direction: Dir::TTB, ..Default::default() };
        let map = BpmnElkOptions::root(&options).to_map();
        assert_eq!(map["elk.direction"], "DOWN");
    }
}
