//! The BPMN diagram element model.
//!
//! This crate holds everything the layout engine operates on but does not
//! itself compute: geometry primitives, the spatial index, the element
//! registry, the modeler façade that is the registry's single writer, and
//! the default orthogonal connection router.
//!
//! Elements reference each other by stable string id; the registry resolves
//! the references. Parsing and serialising the BPMN XML wire format is the
//! caller's concern: diagrams arrive here fully resolved, and only bounds,
//! waypoints and lane membership are ever mutated.

pub mod geom;
pub mod modeler;
pub mod snapshot;

mod builder;
mod element;
mod grid;
mod orthogonal;
mod registry;

pub use self::builder::DiagramBuilder;
pub use self::element::{
    ActivityKind, ArtifactKind, Connection, ConnectionKind, Element, EventDefinition,
    EventKind, EventPosition, GatewayKind, Id, Label, Shape, ShapeKind, TaskKind,
};
pub use self::grid::SpatialGrid;
pub use self::orthogonal::{crop_endpoint, dock_side, route_orthogonal};
pub use self::registry::{Diagram, ROOT_ID, is_artifact_link};
