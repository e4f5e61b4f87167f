//! The element registry.

use indexmap::IndexMap;

use crate::element::{
    ArtifactKind, Connection, ConnectionKind, Element, Id, Shape, ShapeKind,
};
use crate::geom::Rect;

/// The id of the implicit canvas root.
pub const ROOT_ID: &str = "__root__";

/// An id-keyed registry of diagram elements.
///
/// Insertion order is preserved and observable, so that every traversal over
/// the registry is deterministic for a given diagram.
#[derive(Debug, Clone)]
pub struct Diagram {
    elements: IndexMap<Id, Element>,
    root: Id,
}

impl Diagram {
    /// Create an empty diagram with an infrastructure root.
    pub fn new() -> Self {
        let root = Id::from(ROOT_ID);
        let mut elements = IndexMap::new();
        elements.insert(
            root.clone(),
            Element::Shape(Shape::new(root.clone(), ShapeKind::Infrastructure, Rect::zero())),
        );
        Self { elements, root }
    }

    /// The canvas root id.
    pub fn root(&self) -> &Id {
        &self.root
    }

    /// Look up an element by id.
    pub fn get(&self, id: &Id) -> Option<&Element> {
        self.elements.get(id)
    }

    /// All elements in insertion order.
    pub fn get_all(&self) -> impl Iterator<Item = &Element> {
        self.elements.values()
    }

    /// All elements matching a predicate, in insertion order.
    pub fn filter<'a>(
        &'a self,
        predicate: impl Fn(&Element) -> bool + 'a,
    ) -> impl Iterator<Item = &'a Element> {
        self.elements.values().filter(move |element| predicate(element))
    }

    /// Look up a shape by id.
    pub fn shape(&self, id: &Id) -> Option<&Shape> {
        self.get(id)?.as_shape()
    }

    /// Look up a connection by id.
    pub fn connection(&self, id: &Id) -> Option<&Connection> {
        self.get(id)?.as_connection()
    }

    pub(crate) fn shape_mut(&mut self, id: &Id) -> Option<&mut Shape> {
        match self.elements.get_mut(id) {
            Some(Element::Shape(shape)) => Some(shape),
            _ => None,
        }
    }

    pub(crate) fn connection_mut(&mut self, id: &Id) -> Option<&mut Connection> {
        match self.elements.get_mut(id) {
            Some(Element::Connection(connection)) => Some(connection),
            _ => None,
        }
    }

    pub(crate) fn elements_label_mut(&mut self, id: &Id) -> Option<&mut crate::element::Label> {
        match self.elements.get_mut(id)? {
            Element::Shape(shape) => shape.label.as_mut(),
            Element::Connection(connection) => connection.label.as_mut(),
        }
    }

    /// Insert a shape, parenting it to the root when it has no parent.
    pub fn insert_shape(&mut self, mut shape: Shape) {
        if shape.parent.is_none() && shape.id != self.root {
            shape.parent = Some(self.root.clone());
        }
        shape.di = shape.bounds;
        self.elements.insert(shape.id.clone(), Element::Shape(shape));
    }

    /// Insert a connection.
    pub fn insert_connection(&mut self, connection: Connection) {
        self.elements
            .insert(connection.id.clone(), Element::Connection(connection));
    }

    /// Remove an element.
    ///
    /// Removing a shape cascades: connections referencing it and boundary
    /// events hosted on it are removed as well, because those references are
    /// weak and must never dangle.
    pub fn remove(&mut self, id: &Id) {
        let Some(removed) = self.elements.shift_remove(id) else { return };
        if let Element::Shape(_) = removed {
            let dependent: Vec<Id> = self
                .elements
                .values()
                .filter(|element| match element {
                    Element::Connection(c) => c.source == *id || c.target == *id,
                    Element::Shape(s) => s.host() == Some(id),
                })
                .map(|element| element.id().clone())
                .collect();
            for dependent_id in dependent {
                self.remove(&dependent_id);
            }
        }
    }

    /// All shapes, in insertion order.
    pub fn shapes(&self) -> impl Iterator<Item = &Shape> {
        self.elements.values().filter_map(Element::as_shape)
    }

    /// All connections, in insertion order.
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.elements.values().filter_map(Element::as_connection)
    }

    /// The direct shape children of a container.
    pub fn children<'a>(&'a self, parent: &'a Id) -> impl Iterator<Item = &'a Shape> {
        self.shapes().filter(move |shape| shape.parent.as_ref() == Some(parent))
    }

    /// All connections with the given source.
    pub fn connections_from<'a>(
        &'a self,
        source: &'a Id,
    ) -> impl Iterator<Item = &'a Connection> {
        self.connections().filter(move |c| c.source == *source)
    }

    /// All connections with the given target.
    pub fn connections_to<'a>(&'a self, target: &'a Id) -> impl Iterator<Item = &'a Connection> {
        self.connections().filter(move |c| c.target == *target)
    }

    /// The boundary events attached to a host.
    pub fn boundaries_of<'a>(&'a self, host: &'a Id) -> impl Iterator<Item = &'a Shape> {
        self.shapes().filter(move |shape| shape.host() == Some(host))
    }

    /// All participants, in insertion order.
    pub fn participants(&self) -> impl Iterator<Item = &Shape> {
        self.shapes().filter(|shape| shape.kind == ShapeKind::Participant)
    }

    /// The lanes directly contained in a pool, in insertion order.
    pub fn lanes_of<'a>(&'a self, pool: &'a Id) -> impl Iterator<Item = &'a Shape> {
        self.children(pool)
            .filter(|shape| matches!(shape.kind, ShapeKind::Lane { .. }))
    }

    /// The lane whose `flowNodeRef` list contains the given node.
    pub fn lane_of(&self, node: &Id) -> Option<&Shape> {
        self.shapes().find(|shape| match &shape.kind {
            ShapeKind::Lane { flow_node_refs } => flow_node_refs.contains(node),
            _ => false,
        })
    }

    /// The group members of a `bpmn:Group`: direct children plus elements
    /// sharing its category value.
    pub fn group_members<'a>(&'a self, group: &'a Shape) -> impl Iterator<Item = &'a Shape> {
        let category = match &group.kind {
            ShapeKind::Artifact(ArtifactKind::Group { category }) => category.clone(),
            _ => None,
        };
        self.shapes().filter(move |shape| {
            shape.id != group.id
                && (shape.parent.as_ref() == Some(&group.id)
                    || (category.is_some()
                        && shape.attrs.iter().any(|(key, value)| {
                            key == "categoryValueRef"
                                && category.as_deref() == Some(value.as_str())
                        })))
        })
    }

    /// The bounding box over all flow nodes in a scope (or the whole
    /// diagram), excluding boundary events.
    pub fn flow_bbox(&self, scope: Option<&Id>) -> Option<Rect> {
        Rect::bbox(
            self.shapes()
                .filter(|shape| shape.is_flow_node())
                .filter(|shape| match scope {
                    Some(scope) => self.is_inside(&shape.id, scope),
                    None => true,
                })
                .map(|shape| shape.bounds),
        )
    }

    /// Whether `id` is `ancestor` or transitively parented below it.
    pub fn is_inside(&self, id: &Id, ancestor: &Id) -> bool {
        let mut current = Some(id);
        while let Some(current_id) = current {
            if current_id == ancestor {
                return true;
            }
            current = self.shape(current_id).and_then(|shape| shape.parent.as_ref());
        }
        false
    }

    /// All sequence flows between two flow nodes inside a container scope.
    pub fn sequence_flows_in<'a>(
        &'a self,
        scope: &'a Id,
    ) -> impl Iterator<Item = &'a Connection> {
        self.connections().filter(move |c| {
            c.is_sequence_flow()
                && self.is_inside(&c.source, scope)
                && self.is_inside(&c.target, scope)
        })
    }
}

impl Default for Diagram {
    fn default() -> Self {
        Self::new()
    }
}

/// Connection kinds that link an artifact to a flow element.
pub fn is_artifact_link(kind: ConnectionKind) -> bool {
    matches!(
        kind,
        ConnectionKind::Association
            | ConnectionKind::DataInputAssociation
            | ConnectionKind::DataOutputAssociation
    )
}
