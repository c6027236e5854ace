use std::collections::{HashMap, HashSet};
use std::fmt;

use egui::{Pos2, Vec2, pos2};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::text::{NodeMetrics, TextMeasure};

/// Session-local node identity. Allocated once per node and never reused.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocalId(pub u64);

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Identity assigned by the tree store once a node has been persisted.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerId(pub Uuid);

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MindmapId(pub Uuid);

impl fmt::Display for MindmapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for MindmapId {
    type Err = uuid::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(MindmapId)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
    Concept,
    Formula,
    Exercise,
    Example,
}

impl NodeType {
    /// Types offered by the "add child" action.
    pub const CREATABLE: [NodeType; 3] = [NodeType::Concept, NodeType::Formula, NodeType::Exercise];

    pub fn default_label(self) -> &'static str {
        match self {
            NodeType::Concept => "New Concept",
            NodeType::Formula => "New Formula",
            NodeType::Exercise => "New Exercise",
            NodeType::Example => "New Example",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            NodeType::Concept => "Concept",
            NodeType::Formula => "Formula",
            NodeType::Exercise => "Exercise",
            NodeType::Example => "Example",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MindNode {
    pub local_id: LocalId,
    pub server_id: Option<ServerId>,
    pub label: String,
    pub content: String,
    pub node_type: NodeType,
    /// World coordinates of the node center.
    pub pos: Pos2,
    pub radius_hint: f32,
    pub level: u32,
    pub parent: Option<LocalId>,
}

/// Derived connector between a node and its parent. `id` is the child's id,
/// since each non-root node has exactly one incoming edge.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Edge {
    pub id: LocalId,
    pub source: LocalId,
    pub target: LocalId,
}

#[derive(Clone, Debug, Default)]
pub struct NodePatch {
    pub label: Option<String>,
    pub content: Option<String>,
    pub node_type: Option<NodeType>,
    pub pos: Option<Pos2>,
    pub parent: Option<LocalId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("parent node {0} does not exist")]
    InvalidParent(LocalId),
    #[error("node {0} not found")]
    NodeNotFound(LocalId),
    #[error("the root node cannot be deleted")]
    RootDeletionForbidden,
    #[error("cannot move {node} under {new_parent}: it is one of its own descendants")]
    CyclicReparentRejected { node: LocalId, new_parent: LocalId },
    #[error("tree invariant violated: {0}")]
    Corrupt(String),
}

// New children land on a ring of CHILD_RING_RADIUS +/- CHILD_RING_JITTER around the parent.
pub const CHILD_RING_RADIUS: f32 = 150.0;
pub const CHILD_RING_JITTER: f32 = 50.0;
pub const DEFAULT_ROOT_LABEL: &str = "Central Topic";

#[derive(Clone, Debug)]
pub struct MindmapGraph {
    nodes: Vec<MindNode>,
    root: LocalId,
    next_id: u64,
    selected: Option<LocalId>,
    // bumped by every edit; selection and radius refreshes do not count
    revision: u64,
}

impl MindmapGraph {
    /// A graph holding only an unsaved root node at `center`.
    pub fn with_root(label: impl Into<String>, center: Pos2) -> Self {
        Self::with_root_from(1, label, center)
    }

    // Continues id allocation at `next_id` so ids stay unique across reloads.
    pub(crate) fn with_root_from(next_id: u64, label: impl Into<String>, center: Pos2) -> Self {
        let root = LocalId(next_id);
        let node = MindNode {
            local_id: root,
            server_id: None,
            label: label.into(),
            content: String::new(),
            node_type: NodeType::Concept,
            pos: center,
            radius_hint: NodeMetrics::default().base_radius,
            level: 0,
            parent: None,
        };
        Self { nodes: vec![node], root, next_id: next_id + 1, selected: None, revision: 0 }
    }

    /// Assemble a graph from already-linked nodes. Levels are recomputed and the
    /// result is validated.
    pub(crate) fn from_parts(nodes: Vec<MindNode>, root: LocalId, next_id: u64) -> Result<Self, GraphError> {
        let mut g = Self { nodes, root, next_id, selected: None, revision: 0 };
        g.recompute_levels();
        g.validate_tree()?;
        Ok(g)
    }

    pub fn root(&self) -> LocalId { self.root }
    pub fn nodes(&self) -> &[MindNode] { &self.nodes }
    pub fn node_count(&self) -> usize { self.nodes.len() }
    pub fn next_id_hint(&self) -> u64 { self.next_id }
    pub fn selected(&self) -> Option<LocalId> { self.selected }
    pub fn revision(&self) -> u64 { self.revision }

    pub fn contains(&self, id: LocalId) -> bool {
        self.index_of(id).is_some()
    }

    pub fn get(&self, id: LocalId) -> Option<&MindNode> {
        self.index_of(id).map(|i| &self.nodes[i])
    }

    fn index_of(&self, id: LocalId) -> Option<usize> {
        self.nodes.iter().position(|n| n.local_id == id)
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    fn alloc_id(&mut self) -> LocalId {
        let id = LocalId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn find_by_server_id(&self, sid: ServerId) -> Option<&MindNode> {
        self.nodes.iter().find(|n| n.server_id == Some(sid))
    }

    pub fn children(&self, id: LocalId) -> Vec<LocalId> {
        self.nodes
            .iter()
            .filter(|n| n.parent == Some(id))
            .map(|n| n.local_id)
            .collect()
    }

    /// `id` followed by all of its descendants, parents before children.
    pub fn subtree_preorder(&self, id: LocalId) -> Vec<LocalId> {
        let mut children_of: HashMap<LocalId, Vec<LocalId>> = HashMap::new();
        for n in &self.nodes {
            if let Some(p) = n.parent {
                children_of.entry(p).or_default().push(n.local_id);
            }
        }
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            out.push(cur);
            if let Some(kids) = children_of.get(&cur) {
                // reversed so the first child is visited first
                stack.extend(kids.iter().rev().copied());
            }
        }
        out
    }

    pub fn is_descendant_or_self(&self, candidate: LocalId, ancestor: LocalId) -> bool {
        let mut cur = Some(candidate);
        let mut steps = 0usize;
        while let Some(id) = cur {
            if id == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.nodes.len() {
                break;
            }
            cur = self.get(id).and_then(|n| n.parent);
        }
        false
    }

    pub fn add_node(&mut self, parent: LocalId, node_type: NodeType) -> Result<LocalId, GraphError> {
        self.add_node_with_rng(parent, node_type, &mut rand::thread_rng())
    }

    /// Append a child of `parent` at a random point on a small ring around it.
    pub fn add_node_with_rng<R: Rng + ?Sized>(
        &mut self,
        parent: LocalId,
        node_type: NodeType,
        rng: &mut R,
    ) -> Result<LocalId, GraphError> {
        let (parent_pos, parent_level) = match self.get(parent) {
            Some(p) => (p.pos, p.level),
            None => return Err(GraphError::InvalidParent(parent)),
        };
        let angle = rng.gen_range(0.0..std::f32::consts::TAU);
        let dist = CHILD_RING_RADIUS + rng.gen_range(-CHILD_RING_JITTER..=CHILD_RING_JITTER);
        let id = self.alloc_id();
        self.nodes.push(MindNode {
            local_id: id,
            server_id: None,
            label: node_type.default_label().to_string(),
            content: String::new(),
            node_type,
            pos: parent_pos + Vec2::angled(angle) * dist,
            radius_hint: NodeMetrics::default().base_radius,
            level: parent_level + 1,
            parent: Some(parent),
        });
        self.touch();
        log::debug!("added {} under {} ({:?})", id, parent, node_type);
        Ok(id)
    }

    /// Remove `id` and its whole subtree. Returns the removed ids in pre-order.
    pub fn delete_node(&mut self, id: LocalId) -> Result<Vec<LocalId>, GraphError> {
        if id == self.root {
            return Err(GraphError::RootDeletionForbidden);
        }
        if !self.contains(id) {
            return Err(GraphError::NodeNotFound(id));
        }
        let doomed = self.subtree_preorder(id);
        let doomed_set: HashSet<LocalId> = doomed.iter().copied().collect();
        self.nodes.retain(|n| !doomed_set.contains(&n.local_id));
        if self.selected.is_some_and(|s| doomed_set.contains(&s)) {
            self.selected = None;
        }
        self.touch();
        log::debug!("deleted {} node(s) rooted at {}", doomed.len(), id);
        Ok(doomed)
    }

    pub fn update_node(&mut self, id: LocalId, patch: NodePatch) -> Result<(), GraphError> {
        let idx = self.index_of(id).ok_or(GraphError::NodeNotFound(id))?;
        if let Some(new_parent) = patch.parent {
            if !self.contains(new_parent) {
                return Err(GraphError::InvalidParent(new_parent));
            }
            if self.is_descendant_or_self(new_parent, id) {
                return Err(GraphError::CyclicReparentRejected { node: id, new_parent });
            }
        }

        let node = &mut self.nodes[idx];
        if let Some(label) = patch.label {
            node.label = label;
        }
        if let Some(content) = patch.content {
            node.content = content;
        }
        if let Some(t) = patch.node_type {
            node.node_type = t;
        }
        if let Some(pos) = patch.pos {
            node.pos = pos;
        }
        if let Some(new_parent) = patch.parent {
            if node.parent != Some(new_parent) {
                node.parent = Some(new_parent);
                self.recompute_levels();
            }
        }
        self.touch();
        Ok(())
    }

    pub fn set_position(&mut self, id: LocalId, pos: Pos2) -> Result<(), GraphError> {
        let idx = self.index_of(id).ok_or(GraphError::NodeNotFound(id))?;
        self.nodes[idx].pos = pos;
        self.touch();
        Ok(())
    }

    /// Record the store identity of a node that was saved while unsaved.
    /// Not an edit: the revision is left alone.
    pub(crate) fn assign_server_id(&mut self, id: LocalId, sid: ServerId) -> Result<(), GraphError> {
        let idx = self.index_of(id).ok_or(GraphError::NodeNotFound(id))?;
        self.nodes[idx].server_id = Some(sid);
        Ok(())
    }

    pub fn select(&mut self, id: Option<LocalId>) -> Result<(), GraphError> {
        if let Some(id) = id {
            if !self.contains(id) {
                return Err(GraphError::NodeNotFound(id));
            }
        }
        self.selected = id;
        Ok(())
    }

    /// One edge per non-root node, in node order.
    pub fn derive_edges(&self) -> Vec<Edge> {
        self.nodes
            .iter()
            .filter_map(|n| {
                n.parent.map(|p| Edge { id: n.local_id, source: p, target: n.local_id })
            })
            .collect()
    }

    pub fn refresh_radii(&mut self, metrics: &NodeMetrics, measure: &dyn TextMeasure) {
        for n in &mut self.nodes {
            n.radius_hint = metrics.radius_for(&n.label, measure);
        }
    }

    pub(crate) fn positions_mut(&mut self) -> impl Iterator<Item = (LocalId, &mut Pos2)> {
        self.touch();
        self.nodes.iter_mut().map(|n| (n.local_id, &mut n.pos))
    }

    fn recompute_levels(&mut self) {
        let order = self.subtree_preorder(self.root);
        let mut levels: HashMap<LocalId, u32> = HashMap::with_capacity(order.len());
        for id in order {
            let level = self
                .get(id)
                .and_then(|n| n.parent)
                .and_then(|p| levels.get(&p).copied())
                .map(|l| l + 1)
                .unwrap_or(0);
            levels.insert(id, level);
        }
        for n in &mut self.nodes {
            if let Some(l) = levels.get(&n.local_id) {
                n.level = *l;
            }
        }
    }

    /// Check the tree invariant: a single parentless root, every parent
    /// present, no cycles, and consistent levels.
    pub fn validate_tree(&self) -> Result<(), GraphError> {
        let roots: Vec<LocalId> = self.nodes.iter().filter(|n| n.parent.is_none()).map(|n| n.local_id).collect();
        if roots != [self.root] {
            return Err(GraphError::Corrupt(format!("expected single root {}, found {:?}", self.root, roots)));
        }
        let ids: HashSet<LocalId> = self.nodes.iter().map(|n| n.local_id).collect();
        if ids.len() != self.nodes.len() {
            return Err(GraphError::Corrupt("duplicate local ids".into()));
        }
        for n in &self.nodes {
            let mut steps = 0usize;
            let mut cur = n;
            while let Some(p) = cur.parent {
                steps += 1;
                if steps > self.nodes.len() {
                    return Err(GraphError::Corrupt(format!("cycle through {}", n.local_id)));
                }
                let child = cur.local_id;
                cur = self
                    .get(p)
                    .ok_or_else(|| GraphError::Corrupt(format!("{} has missing parent {}", child, p)))?;
            }
            let expected = n.parent.and_then(|p| self.get(p)).map(|p| p.level + 1).unwrap_or(0);
            if n.level != expected {
                return Err(GraphError::Corrupt(format!("{} has level {} (expected {})", n.local_id, n.level, expected)));
            }
        }
        Ok(())
    }
}

impl Default for MindmapGraph {
    fn default() -> Self {
        Self::with_root(DEFAULT_ROOT_LABEL, pos2(400.0, 300.0))
    }
}
