//! Programmatic diagram construction.
//!
//! The builder is the importer-facing way to assemble a [`Diagram`]: shapes
//! get their contract default sizes, connections get a provisional straight
//! polyline, and DI bounds stay in sync throughout.

use smallvec::smallvec;

use crate::element::{
    ActivityKind, ArtifactKind, Connection, ConnectionKind, EventDefinition, EventKind,
    EventPosition, GatewayKind, Id, Label, Shape, ShapeKind, TaskKind,
};
use crate::geom::{Point, Rect, Size, Waypoints};
use crate::registry::Diagram;

/// Builds a [`Diagram`] shape by shape.
#[derive(Debug, Default)]
pub struct DiagramBuilder {
    diagram: Diagram,
}

impl DiagramBuilder {
    /// Start with an empty diagram.
    pub fn new() -> Self {
        Self { diagram: Diagram::new() }
    }

    /// Insert a shape with explicit bounds.
    pub fn shape_at(&mut self, id: &str, kind: ShapeKind, bounds: Rect) -> &mut Self {
        self.diagram.insert_shape(Shape::new(Id::from(id), kind, bounds));
        self
    }

    /// Insert a shape of its default size at the given position.
    pub fn shape(&mut self, id: &str, kind: ShapeKind, x: f64, y: f64) -> &mut Self {
        let size = kind.default_size();
        self.shape_at(id, kind, Rect::new(x, y, size.w, size.h))
    }

    /// Re-parent a previously inserted shape.
    pub fn parent(&mut self, id: &str, parent: &str) -> &mut Self {
        if let Some(shape) = self.diagram.shape_mut(&Id::from(id)) {
            shape.parent = Some(Id::from(parent));
        }
        self
    }

    /// Insert a plain task.
    pub fn task(&mut self, id: &str, x: f64, y: f64) -> &mut Self {
        self.shape(id, ShapeKind::Activity(ActivityKind::Task(TaskKind::None)), x, y)
    }

    /// Insert a start event.
    pub fn start_event(&mut self, id: &str, x: f64, y: f64) -> &mut Self {
        self.event(id, EventPosition::Start, x, y)
    }

    /// Insert an intermediate event.
    pub fn intermediate_event(&mut self, id: &str, x: f64, y: f64) -> &mut Self {
        self.event(id, EventPosition::Intermediate, x, y)
    }

    /// Insert an end event.
    pub fn end_event(&mut self, id: &str, x: f64, y: f64) -> &mut Self {
        self.event(id, EventPosition::End, x, y)
    }

    fn event(&mut self, id: &str, position: EventPosition, x: f64, y: f64) -> &mut Self {
        let kind = ShapeKind::Event(EventKind { position, definition: EventDefinition::None });
        self.shape(id, kind, x, y)
    }

    /// Insert a gateway.
    pub fn gateway(&mut self, id: &str, kind: GatewayKind, x: f64, y: f64) -> &mut Self {
        self.shape(id, ShapeKind::Gateway(kind), x, y)
    }

    /// Insert an expanded subprocess.
    pub fn subprocess(&mut self, id: &str, x: f64, y: f64) -> &mut Self {
        let kind = ShapeKind::Activity(ActivityKind::SubProcess { expanded: true, event: false });
        self.shape(id, kind, x, y)
    }

    /// Insert a participant pool.
    pub fn participant(&mut self, id: &str, bounds: Rect) -> &mut Self {
        self.shape_at(id, ShapeKind::Participant, bounds)
    }

    /// Insert a lane into a pool.
    pub fn lane(&mut self, id: &str, pool: &str, bounds: Rect, refs: &[&str]) -> &mut Self {
        let flow_node_refs = refs.iter().map(|&r| Id::from(r)).collect();
        self.shape_at(id, ShapeKind::Lane { flow_node_refs }, bounds);
        self.parent(id, pool)
    }

    /// Insert a boundary event attached to `host`, centred on the host's
    /// bottom border.
    pub fn boundary_event(&mut self, id: &str, host: &str) -> &mut Self {
        let host_id = Id::from(host);
        let kind = ShapeKind::BoundaryEvent {
            host: host_id.clone(),
            definition: EventDefinition::Error,
        };
        let size = kind.default_size();
        let (bounds, parent) = match self.diagram.shape(&host_id) {
            Some(host_shape) => (
                Rect::from_center(host_shape.bounds.side_center(crate::geom::Side::Bottom), size),
                host_shape.parent.clone(),
            ),
            None => (Rect::new(0.0, 0.0, size.w, size.h), None),
        };
        let mut shape = Shape::new(Id::from(id), kind, bounds);
        shape.parent = parent;
        self.diagram.insert_shape(shape);
        self
    }

    /// Insert an artifact.
    pub fn artifact(&mut self, id: &str, kind: ArtifactKind, x: f64, y: f64) -> &mut Self {
        self.shape(id, ShapeKind::Artifact(kind), x, y)
    }

    /// Attach an external label of the given size to a shape or connection.
    ///
    /// The label starts out next to its element; layout re-seats it.
    pub fn label(&mut self, id: &str, w: f64, h: f64) -> &mut Self {
        let id = Id::from(id);
        if let Some(shape) = self.diagram.shape_mut(&id) {
            let below = Point::new(shape.bounds.center().x, shape.bounds.bottom() + h);
            shape.label = Some(Label::new(Rect::from_center(below, Size::new(w, h))));
        } else if let Some(connection) = self.diagram.connection_mut(&id) {
            let at = connection.waypoints.first().copied().unwrap_or_default();
            connection.label = Some(Label::new(Rect::from_center(at, Size::new(w, h))));
        }
        self
    }

    /// Insert a sequence flow with a provisional straight polyline.
    pub fn flow(&mut self, id: &str, source: &str, target: &str) -> &mut Self {
        self.connect(id, ConnectionKind::SequenceFlow, source, target)
    }

    /// Insert a message flow with a provisional straight polyline.
    pub fn message_flow(&mut self, id: &str, source: &str, target: &str) -> &mut Self {
        self.connect(id, ConnectionKind::MessageFlow, source, target)
    }

    /// Insert a connection of the given kind.
    pub fn connect(
        &mut self,
        id: &str,
        kind: ConnectionKind,
        source: &str,
        target: &str,
    ) -> &mut Self {
        let source = Id::from(source);
        let target = Id::from(target);
        let waypoints = self.straight(&source, &target);
        self.diagram.insert_connection(Connection::new(
            Id::from(id),
            kind,
            source,
            target,
            waypoints,
        ));
        self
    }

    fn straight(&self, source: &Id, target: &Id) -> Waypoints {
        let from = self.diagram.shape(source).map_or(Point::zero(), |s| s.bounds.center());
        let to = self.diagram.shape(target).map_or(Point::zero(), |s| s.bounds.center());
        smallvec![from, to]
    }

    /// Finish building.
    pub fn finish(&mut self) -> Diagram {
        std::mem::take(&mut self.diagram)
    }
}

impl From<DiagramBuilder> for Diagram {
    fn from(mut builder: DiagramBuilder) -> Self {
        builder.finish()
    }
}
