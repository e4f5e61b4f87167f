//! The container hierarchy and its rebuild schedule.

use bpmn_diagram::{Diagram, Id, ShapeKind};
use indexmap::IndexMap;

/// One container: the root process, a participant or an expanded subprocess.
#[derive(Debug, Clone)]
pub struct Container {
    /// The container's id (the canvas root for the implicit process).
    pub id: Id,
    /// The parent container, if any.
    pub parent: Option<Id>,
    /// Child containers, regular subprocesses before event subprocesses,
    /// ties broken by original y.
    pub children: Vec<Id>,
    /// The flow nodes whose nearest container ancestor is this container.
    pub flow_nodes: Vec<Id>,
    /// Whether this is an event subprocess.
    pub event_subprocess: bool,
}

/// The tree of containers of a diagram.
#[derive(Debug, Clone, Default)]
pub struct ContainerTree {
    containers: IndexMap<Id, Container>,
    roots: Vec<Id>,
}

impl ContainerTree {
    /// Look up a container.
    pub fn get(&self, id: &Id) -> Option<&Container> {
        self.containers.get(id)
    }

    /// The top-level containers.
    pub fn roots(&self) -> &[Id] {
        &self.roots
    }

    /// All containers, deepest first, so that a parent is always rebuilt
    /// after its children and knows their final sizes.
    pub fn rebuild_order(&self) -> Vec<Id> {
        let mut order = Vec::with_capacity(self.containers.len());
        for root in &self.roots {
            self.post_order(root, &mut order);
        }
        order
    }

    fn post_order(&self, id: &Id, order: &mut Vec<Id>) {
        if let Some(container) = self.containers.get(id) {
            for child in &container.children {
                self.post_order(child, order);
            }
        }
        order.push(id.clone());
    }
}

/// Discover the containers of a diagram and their relationships.
pub fn build_container_hierarchy(diagram: &Diagram) -> ContainerTree {
    let mut tree = ContainerTree::default();

    // The canvas root acts as the implicit process container.
    tree.containers.insert(
        diagram.root().clone(),
        Container {
            id: diagram.root().clone(),
            parent: None,
            children: Vec::new(),
            flow_nodes: Vec::new(),
            event_subprocess: false,
        },
    );

    for shape in diagram.shapes() {
        if shape.kind == ShapeKind::Participant || shape.is_expanded_subprocess() {
            tree.containers.insert(
                shape.id.clone(),
                Container {
                    id: shape.id.clone(),
                    parent: None,
                    children: Vec::new(),
                    flow_nodes: Vec::new(),
                    event_subprocess: shape.is_event_subprocess(),
                },
            );
        }
    }

    // Wire parents through the nearest container ancestor; top-level
    // containers hang off the implicit process.
    let ids: Vec<Id> = tree.containers.keys().cloned().collect();
    for id in &ids {
        if id == diagram.root() {
            continue;
        }
        let parent = nearest_container(diagram, &tree, id)
            .unwrap_or_else(|| diagram.root().clone());
        tree.containers[id].parent = Some(parent.clone());
        tree.containers[&parent].children.push(id.clone());
    }
    tree.roots = vec![diagram.root().clone()];

    // Assign flow nodes to their nearest container ancestor.
    for shape in diagram.shapes() {
        if !shape.is_flow_node() {
            continue;
        }
        if let Some(container) = nearest_container(diagram, &tree, &shape.id) {
            tree.containers[&container].flow_nodes.push(shape.id.clone());
        } else {
            let root = diagram.root().clone();
            tree.containers[&root].flow_nodes.push(shape.id.clone());
        }
    }

    // Order children: regular subprocesses first, event subprocesses last,
    // ties by original y.
    let ids: Vec<Id> = tree.containers.keys().cloned().collect();
    for id in ids {
        let mut children = std::mem::take(&mut tree.containers[&id].children);
        children.sort_by(|a, b| {
            let ea = tree.containers[a].event_subprocess;
            let eb = tree.containers[b].event_subprocess;
            let ya = diagram.shape(a).map_or(0.0, |shape| shape.bounds.y);
            let yb = diagram.shape(b).map_or(0.0, |shape| shape.bounds.y);
            ea.cmp(&eb).then_with(|| ya.total_cmp(&yb))
        });
        tree.containers[&id].children = children;
    }

    tree
}

/// The nearest strict container ancestor of a shape.
fn nearest_container(diagram: &Diagram, tree: &ContainerTree, id: &Id) -> Option<Id> {
    let mut current = diagram.shape(id).and_then(|shape| shape.parent.clone());
    while let Some(ancestor) = current {
        if ancestor == *diagram.root() {
            return None;
        }
        if tree.containers.contains_key(&ancestor) {
            return Some(ancestor);
        }
        current = diagram.shape(&ancestor).and_then(|shape| shape.parent.clone());
    }
    None
}
