//! The in-memory diagram element model.
//!
//! Elements reference each other by stable id, never by owning pointers:
//! connections hold weak source/target ids, boundary events a weak host id,
//! and every shape an optional parent id. The registry resolves them.

use ecow::EcoString;

use crate::geom::{Point, Rect, Waypoints};

/// A stable element id.
pub type Id = EcoString;

/// The refinement of a task.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TaskKind {
    /// A plain task.
    #[default]
    None,
    /// A user task.
    User,
    /// A service task.
    Service,
    /// A script task.
    Script,
    /// A manual task.
    Manual,
    /// A send task.
    Send,
    /// A receive task.
    Receive,
    /// A business rule task.
    BusinessRule,
}

/// An activity: a task, subprocess or call activity.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ActivityKind {
    /// A task of some refinement.
    Task(TaskKind),
    /// A subprocess, collapsed or expanded, optionally an event subprocess.
    SubProcess {
        /// Whether the subprocess is drawn expanded with its children inside.
        expanded: bool,
        /// Whether this is an event subprocess (`triggeredByEvent`).
        event: bool,
    },
    /// A call activity.
    CallActivity,
}

/// Where an event sits in the flow.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum EventPosition {
    /// A start event.
    Start,
    /// An intermediate (catching or throwing) event.
    Intermediate,
    /// An end event.
    End,
}

/// The definition attached to an event.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash)]
pub enum EventDefinition {
    /// A blank event.
    #[default]
    None,
    /// A message event.
    Message,
    /// A timer event.
    Timer,
    /// An error event.
    Error,
    /// An escalation event.
    Escalation,
    /// A signal event.
    Signal,
    /// A conditional event.
    Conditional,
    /// A compensation event.
    Compensation,
    /// A terminate event.
    Terminate,
    /// A link event.
    Link,
}

/// An event in the flow.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct EventKind {
    /// Where the event sits in the flow.
    pub position: EventPosition,
    /// The attached definition.
    pub definition: EventDefinition,
}

/// The routing behaviour of a gateway.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum GatewayKind {
    /// An exclusive (XOR) gateway.
    Exclusive,
    /// A parallel (AND) gateway.
    Parallel,
    /// An inclusive (OR) gateway.
    Inclusive,
    /// An event-based gateway.
    EventBased,
    /// A complex gateway.
    Complex,
}

/// A non-flow artifact.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum ArtifactKind {
    /// A data object reference.
    DataObject,
    /// A data store reference.
    DataStore,
    /// A text annotation.
    TextAnnotation,
    /// A group, optionally tied to a category value.
    Group {
        /// The `categoryValueRef` shared by the group's members, if any.
        category: Option<Id>,
    },
}

/// What kind of shape an element is.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum ShapeKind {
    /// A task, subprocess or call activity.
    Activity(ActivityKind),
    /// A start, intermediate or end event.
    Event(EventKind),
    /// A gateway.
    Gateway(GatewayKind),
    /// An event attached to an activity's border.
    BoundaryEvent {
        /// The activity the event is attached to.
        host: Id,
        /// The attached definition.
        definition: EventDefinition,
    },
    /// A pool wrapping one process.
    Participant,
    /// A rectangular sub-region of a participant.
    Lane {
        /// The flow nodes assigned to this lane (`flowNodeRef`).
        flow_node_refs: Vec<Id>,
    },
    /// A data object, data store, annotation or group.
    Artifact(ArtifactKind),
    /// Canvas root, planes and other non-semantic shapes.
    Infrastructure,
}

impl ShapeKind {
    /// The default extent a shape of this kind is created with.
    ///
    /// These sizes are part of the layout contract: tasks 100×80, events
    /// 36×36, gateways 50×50, containers 300×200.
    pub fn default_size(&self) -> crate::geom::Size {
        use crate::geom::Size;
        match self {
            Self::Activity(ActivityKind::SubProcess { expanded: true, .. }) => {
                Size::new(300.0, 200.0)
            }
            Self::Activity(_) => Size::new(100.0, 80.0),
            Self::Event(_) | Self::BoundaryEvent { .. } => Size::new(36.0, 36.0),
            Self::Gateway(_) => Size::new(50.0, 50.0),
            Self::Participant => Size::new(300.0, 200.0),
            Self::Lane { .. } => Size::new(270.0, 200.0),
            Self::Artifact(ArtifactKind::TextAnnotation) => Size::new(100.0, 30.0),
            Self::Artifact(ArtifactKind::Group { .. }) => Size::new(300.0, 300.0),
            Self::Artifact(_) => Size::new(36.0, 50.0),
            Self::Infrastructure => Size::zero(),
        }
    }
}

/// What kind of connection an element is.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ConnectionKind {
    /// A sequence flow within one process.
    SequenceFlow,
    /// A message flow between pools.
    MessageFlow,
    /// An association to an artifact.
    Association,
    /// A data input association.
    DataInputAssociation,
    /// A data output association.
    DataOutputAssociation,
}

/// An external label with its own bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    /// The label's bounding box.
    pub bounds: Rect,
    /// The diagram-interchange mirror of `bounds`.
    pub di: Rect,
}

impl Label {
    /// Create a label whose DI bounds mirror its bounds.
    pub fn new(bounds: Rect) -> Self {
        Self { bounds, di: bounds }
    }
}

/// A shape in the diagram.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    /// The stable id.
    pub id: Id,
    /// What the shape is.
    pub kind: ShapeKind,
    /// The bounding box.
    pub bounds: Rect,
    /// The owning parent shape, if any.
    pub parent: Option<Id>,
    /// An external label, if any.
    pub label: Option<Label>,
    /// The diagram-interchange mirror of `bounds`.
    pub di: Rect,
    /// Rarely used BPMN-XML attributes, kept verbatim.
    pub attrs: Vec<(EcoString, EcoString)>,
}

impl Shape {
    /// Create a shape whose DI bounds mirror its bounds.
    pub fn new(id: Id, kind: ShapeKind, bounds: Rect) -> Self {
        Self { id, kind, bounds, parent: None, label: None, di: bounds, attrs: Vec::new() }
    }

    /// The host id if this is a boundary event.
    pub fn host(&self) -> Option<&Id> {
        match &self.kind {
            ShapeKind::BoundaryEvent { host, .. } => Some(host),
            _ => None,
        }
    }

    /// Whether this shape is a node of the flow graph.
    ///
    /// Boundary events are not: they attach to the graph from the outside.
    pub fn is_flow_node(&self) -> bool {
        matches!(
            self.kind,
            ShapeKind::Activity(_) | ShapeKind::Event(_) | ShapeKind::Gateway(_)
        )
    }

    /// Whether this shape can contain flow nodes.
    pub fn is_container(&self) -> bool {
        matches!(
            self.kind,
            ShapeKind::Participant
                | ShapeKind::Activity(ActivityKind::SubProcess { expanded: true, .. })
        )
    }

    /// Whether this shape is an expanded subprocess.
    pub fn is_expanded_subprocess(&self) -> bool {
        matches!(
            self.kind,
            ShapeKind::Activity(ActivityKind::SubProcess { expanded: true, .. })
        )
    }

    /// Whether this shape is an event subprocess.
    pub fn is_event_subprocess(&self) -> bool {
        matches!(
            self.kind,
            ShapeKind::Activity(ActivityKind::SubProcess { event: true, .. })
        )
    }

    /// Whether this shape is a start event.
    pub fn is_start_event(&self) -> bool {
        matches!(
            self.kind,
            ShapeKind::Event(EventKind { position: EventPosition::Start, .. })
        )
    }

    /// Whether this shape is an end event.
    pub fn is_end_event(&self) -> bool {
        matches!(
            self.kind,
            ShapeKind::Event(EventKind { position: EventPosition::End, .. })
        )
    }

    /// Whether this shape is a gateway.
    pub fn is_gateway(&self) -> bool {
        matches!(self.kind, ShapeKind::Gateway(_))
    }

    /// Whether this shape is an artifact.
    pub fn is_artifact(&self) -> bool {
        matches!(self.kind, ShapeKind::Artifact(_))
    }
}

/// A connection between two elements.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    /// The stable id.
    pub id: Id,
    /// What the connection is.
    pub kind: ConnectionKind,
    /// The source element id (weak).
    pub source: Id,
    /// The target element id (weak).
    pub target: Id,
    /// The waypoint polyline, at least two points.
    pub waypoints: Waypoints,
    /// The pre-cropped docking points for the two endpoints, if known.
    pub original: [Option<Point>; 2],
    /// An external label, if any.
    pub label: Option<Label>,
}

impl Connection {
    /// Create a connection with the given endpoints and waypoints.
    pub fn new(
        id: Id,
        kind: ConnectionKind,
        source: Id,
        target: Id,
        waypoints: Waypoints,
    ) -> Self {
        Self { id, kind, source, target, waypoints, original: [None, None], label: None }
    }

    /// Whether this is a sequence flow.
    pub fn is_sequence_flow(&self) -> bool {
        self.kind == ConnectionKind::SequenceFlow
    }

    /// Whether this is a message flow.
    pub fn is_message_flow(&self) -> bool {
        self.kind == ConnectionKind::MessageFlow
    }

    /// Whether this is one of the association kinds.
    pub fn is_association(&self) -> bool {
        matches!(
            self.kind,
            ConnectionKind::Association
                | ConnectionKind::DataInputAssociation
                | ConnectionKind::DataOutputAssociation
        )
    }
}

/// An element of the diagram.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    /// A shape.
    Shape(Shape),
    /// A connection.
    Connection(Connection),
}

impl Element {
    /// The element's id.
    pub fn id(&self) -> &Id {
        match self {
            Self::Shape(shape) => &shape.id,
            Self::Connection(connection) => &connection.id,
        }
    }

    /// This element as a shape, if it is one.
    pub fn as_shape(&self) -> Option<&Shape> {
        match self {
            Self::Shape(shape) => Some(shape),
            Self::Connection(_) => None,
        }
    }

    /// This element as a connection, if it is one.
    pub fn as_connection(&self) -> Option<&Connection> {
        match self {
            Self::Shape(_) => None,
            Self::Connection(connection) => Some(connection),
        }
    }
}
