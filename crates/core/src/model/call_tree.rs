use std::cell::OnceCell;
use std::ops::Index;

use serde::{Deserialize, Serialize};

use super::cost_centre::{Cost, CostCentre, CostCentreNo};
use crate::shared_str::SharedStr;

/// Handle to a node inside one [`CallTree`]. Ids are arena slots: unique
/// within their tree and handed out in increasing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Inherited cost as a percentage of the parent's. A component is `None`
/// for roots and when the parent's inherited value is zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Relative {
    pub time: Option<f64>,
    pub alloc: Option<f64>,
}

/// One entry of a call tree.
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    pub(crate) centre: CostCentre,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    /// Contributing nodes of an unflattened sum, keyed by their numbers.
    pub(crate) summands: Vec<(CostCentreNo, NodeId)>,
    inherited: OnceCell<Cost>,
    relative: OnceCell<Relative>,
}

impl Node {
    fn new(id: NodeId, centre: CostCentre) -> Self {
        Self {
            id,
            centre,
            parent: None,
            children: Vec::new(),
            summands: Vec::new(),
            inherited: OnceCell::new(),
            relative: OnceCell::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn centre(&self) -> &CostCentre {
        &self.centre
    }

    pub fn no(&self) -> &CostCentreNo {
        &self.centre.no
    }

    pub fn name(&self) -> &SharedStr {
        &self.centre.name
    }

    pub fn module(&self) -> &SharedStr {
        &self.centre.module
    }

    pub fn source(&self) -> &SharedStr {
        &self.centre.source
    }

    pub fn entries(&self) -> u64 {
        self.centre.entries
    }

    pub fn individual(&self) -> Cost {
        self.centre.individual
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// A sum node is either an unflattened merge or a synthetic root.
    pub fn is_sum(&self) -> bool {
        !self.summands.is_empty() || self.centre.no.is_synthetic()
    }

    fn clear_caches(&mut self) {
        self.inherited.take();
        self.relative.take();
    }
}

/// Read-only column snapshot of a node, in presentation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeFields {
    pub no: String,
    pub name: SharedStr,
    pub entries: u64,
    pub individual_time: f64,
    pub individual_alloc: f64,
    pub inherited_time: f64,
    pub inherited_alloc: f64,
    pub relative_time: Option<f64>,
    pub relative_alloc: Option<f64>,
    pub module: SharedStr,
    pub source: SharedStr,
}

/// An owned copy of a node detached from any tree, optionally carrying a
/// copy of its subtree. Paths handed between trees are made of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathNode {
    pub centre: CostCentre,
    pub children: Vec<PathNode>,
}

impl PathNode {
    pub fn leaf(centre: CostCentre) -> Self {
        Self {
            centre,
            children: Vec::new(),
        }
    }
}

/// A forest of cost-centre nodes stored in an arena.
///
/// Each node owns its children through the `children` id list; `parent`
/// is a plain back-reference. Nodes dropped out of the structure by a
/// merge stay in the arena (summands point at them) and are freed with
/// the tree.
#[derive(Debug, Clone, Default)]
pub struct CallTree {
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
}

impl CallTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty tree holding only a synthetic root, used as the target of
    /// merges and inversions.
    pub fn with_synthetic_root() -> (Self, NodeId) {
        let mut tree = Self::new();
        let root = tree.push(CostCentre::synthetic_root(), None);
        (tree, root)
    }

    /// Number of nodes in the arena, including detached ones.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self[id].children
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self[id].children.len()
    }

    pub fn child(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self[id].children.get(index).copied()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self[id].parent
    }

    /// Id that the next allocated node will receive; greater than every id
    /// already present.
    pub fn next_id(&self) -> NodeId {
        NodeId(self.nodes.len())
    }

    /// Allocate a node and attach it as the last child of `parent`, or as a
    /// new root when `parent` is `None`.
    pub fn push(&mut self, centre: CostCentre, parent: Option<NodeId>) -> NodeId {
        let id = self.alloc(centre);
        match parent {
            Some(parent) => self.append_child(parent, id),
            None => self.roots.push(id),
        }
        id
    }

    /// Allocate a node that belongs to no parent and no root list yet.
    pub(crate) fn alloc(&mut self, centre: CostCentre) -> NodeId {
        let id = self.next_id();
        self.nodes.push(Node::new(id, centre));
        id
    }

    pub(crate) fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Replace the child at `index` of `parent` with `child`, re-parenting it.
    pub(crate) fn replace_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children[index] = child;
    }

    /// Individual cost plus the inherited cost of every child. Computed on
    /// first read and cached until [`CallTree::invalidate`].
    pub fn inherited(&self, id: NodeId) -> Cost {
        let node = &self[id];
        *node.inherited.get_or_init(|| {
            node.centre.individual
                + node
                    .children
                    .iter()
                    .map(|&child| self.inherited(child))
                    .sum::<Cost>()
        })
    }

    /// Inherited cost as a percentage of the larger of this node's and its
    /// parent's inherited cost, rounded to two decimals.
    pub fn relative(&self, id: NodeId) -> Relative {
        let node = &self[id];
        *node.relative.get_or_init(|| {
            let Some(parent) = node.parent else {
                return Relative::default();
            };
            let own = self.inherited(id);
            let base = self.inherited(parent);
            Relative {
                time: percentage(own.time, base.time),
                alloc: percentage(own.alloc, base.alloc),
            }
        })
    }

    /// Drop every cached aggregate so the next read re-derives it.
    pub fn invalidate(&mut self) {
        for node in &mut self.nodes {
            node.clear_caches();
        }
    }

    pub fn fields(&self, id: NodeId) -> NodeFields {
        let node = &self[id];
        let inherited = self.inherited(id);
        let relative = self.relative(id);
        NodeFields {
            no: node.centre.no.to_string(),
            name: node.centre.name.clone(),
            entries: node.centre.entries,
            individual_time: node.centre.individual.time,
            individual_alloc: node.centre.individual.alloc,
            inherited_time: inherited.time,
            inherited_alloc: inherited.alloc,
            relative_time: relative.time,
            relative_alloc: relative.alloc,
            module: node.centre.module.clone(),
            source: node.centre.source.clone(),
        }
    }

    /// Every node reachable from `id`, depth-first in child order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            order.push(current);
            stack.extend(self[current].children.iter().rev());
        }
        order
    }

    /// Every node reachable from the roots, depth-first in child order.
    pub fn preorder(&self) -> Vec<NodeId> {
        self.roots
            .iter()
            .flat_map(|&root| self.descendants(root))
            .collect()
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self[id].parent, |&current| self[current].parent)
    }

    pub fn depth(&self, id: NodeId) -> usize {
        self.ancestors(id).count()
    }

    /// Detached copy of a node, with a copy of its whole subtree when
    /// `with_children` is set.
    pub fn copy(&self, id: NodeId, with_children: bool) -> PathNode {
        let node = &self[id];
        PathNode {
            centre: node.centre.clone(),
            children: if with_children {
                node.children
                    .iter()
                    .map(|&child| self.copy(child, true))
                    .collect()
            } else {
                Vec::new()
            },
        }
    }

    /// Allocate a detached copy (and its subtree) in this arena.
    pub(crate) fn alloc_path_node(&mut self, path_node: PathNode) -> NodeId {
        let PathNode { centre, children } = path_node;
        let id = self.alloc(centre);
        for child in children {
            let child_id = self.alloc_path_node(child);
            self.append_child(id, child_id);
        }
        id
    }

    /// A new single-root tree holding a copy of the subtree at `id`.
    pub fn narrow(&self, id: NodeId) -> CallTree {
        let mut tree = CallTree::new();
        let root = tree.alloc_path_node(self.copy(id, true));
        tree.roots.push(root);
        tree
    }
}

impl Index<NodeId> for CallTree {
    type Output = Node;

    /// Panics when `id` was not handed out by this tree.
    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }
}

fn percentage(own: f64, parent: f64) -> Option<f64> {
    if parent == 0.0 {
        return None;
    }
    let base = own.max(parent);
    Some((100.0 * own / base * 100.0).round() / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn centre(no: u64, name: &str, time: f64, alloc: f64) -> CostCentre {
        CostCentre {
            no: CostCentreNo::Original(no),
            name: name.into(),
            module: "Main".into(),
            source: "<no>".into(),
            entries: 1,
            individual: Cost::new(time, alloc),
        }
    }

    fn sample() -> (CallTree, NodeId, NodeId, NodeId) {
        let mut tree = CallTree::new();
        let root = tree.push(centre(1, "main", 20.0, 10.0), None);
        let a = tree.push(centre(2, "a", 5.0, 5.0), Some(root));
        let b = tree.push(centre(3, "b", 2.0, 0.0), Some(a));
        (tree, root, a, b)
    }

    #[test]
    fn inherited_sums_subtree() {
        let (tree, root, a, b) = sample();
        assert_eq!(tree.inherited(b), Cost::new(2.0, 0.0));
        assert_eq!(tree.inherited(a), Cost::new(7.0, 5.0));
        assert_eq!(tree.inherited(root), Cost::new(27.0, 15.0));
    }

    #[test]
    fn relative_uses_parent_inherited() {
        let (tree, root, a, b) = sample();
        assert_eq!(tree.relative(root), Relative::default());
        let rel = tree.relative(a);
        assert_eq!(rel.time, Some(25.93));
        assert_eq!(rel.alloc, Some(33.33));
        // Parent alloc is 5, child alloc is 0.
        assert_eq!(tree.relative(b).alloc, Some(0.0));
    }

    #[test]
    fn relative_is_absent_when_parent_is_zero() {
        let mut tree = CallTree::new();
        let root = tree.push(centre(1, "main", 0.0, 0.0), None);
        let child = tree.push(centre(2, "idle", 0.0, 0.0), Some(root));
        assert_eq!(tree.relative(child), Relative::default());
    }

    #[test]
    fn relative_never_exceeds_hundred() {
        let mut tree = CallTree::new();
        let root = tree.push(centre(1, "main", 0.0, 0.0), None);
        let child = tree.push(centre(2, "a", 4.0, 4.0), Some(root));
        assert_eq!(tree.relative(child).time, Some(100.0));

        // Parent stays cached at 4.0 while the child grows to 10.0.
        let node = tree.node_mut(child);
        node.centre.individual = Cost::new(10.0, 2.0);
        node.clear_caches();
        assert_eq!(tree.inherited(root).time, 4.0);
        assert_eq!(tree.inherited(child).time, 10.0);
        let relative = tree.relative(child);
        assert_eq!(relative.time, Some(100.0));
        assert_eq!(relative.alloc, Some(50.0));
    }

    #[test]
    fn caches_survive_until_invalidated() {
        let (mut tree, root, a, _) = sample();
        assert_eq!(tree.inherited(root).time, 27.0);
        tree.node_mut(a).centre.individual.time = 15.0;
        assert_eq!(tree.inherited(root).time, 27.0);
        tree.invalidate();
        assert_eq!(tree.inherited(root).time, 37.0);
    }

    #[test]
    fn preorder_follows_child_order() {
        let (mut tree, root, a, b) = sample();
        let c = tree.push(centre(4, "c", 1.0, 1.0), Some(root));
        assert_eq!(tree.preorder(), vec![root, a, b, c]);
        assert_eq!(tree.ancestors(b).collect::<Vec<_>>(), vec![a, root]);
        assert_eq!(tree.depth(b), 2);
    }

    #[test]
    fn narrow_copies_subtree_into_new_tree() {
        let (tree, _, a, _) = sample();
        let narrowed = tree.narrow(a);
        assert_eq!(narrowed.roots().len(), 1);
        let root = narrowed.roots()[0];
        assert_eq!(narrowed[root].name(), "a");
        assert_eq!(narrowed[root].parent(), None);
        assert_eq!(narrowed.child_count(root), 1);
        assert_eq!(narrowed.inherited(root), Cost::new(7.0, 5.0));
        assert_eq!(narrowed.relative(root), Relative::default());
    }

    #[test]
    fn fields_expose_columns() {
        let (tree, _, a, _) = sample();
        let fields = tree.fields(a);
        assert_eq!(fields.no, "2");
        assert_eq!(fields.name, "a");
        assert_eq!(fields.inherited_time, 7.0);
        assert_eq!(fields.relative_time, Some(25.93));
        assert_eq!(fields.source, "<no>");
    }
}
